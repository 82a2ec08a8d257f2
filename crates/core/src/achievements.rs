//! Badge rules and their evaluation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::model::{Achievement, Curriculum, ProgressDocument, UserProfile, MAX_SKILL_LEVEL};

/// Quiz score that counts towards the streak badge.
pub const STRONG_QUIZ_SCORE: u8 = 80;

/// Strong quiz results needed for the streak badge.
pub const QUIZ_STREAK_LENGTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BadgeCategory {
    Progress,
    Quiz,
    Profile,
}

/// Everything a badge predicate may look at.
#[derive(Debug, Clone, Copy)]
pub struct BadgeContext<'a> {
    pub progress: &'a ProgressDocument,
    pub profile: &'a UserProfile,
    pub curriculum: &'a Curriculum,
}

/// One row of the badge table.
#[derive(Debug, Clone, Copy)]
pub struct BadgeRule {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub category: BadgeCategory,
    pub predicate: fn(&BadgeContext<'_>) -> bool,
}

/// The fixed badge table, in evaluation order.
pub const BADGES: &[BadgeRule] = &[
    BadgeRule {
        id: "first_lesson",
        title: "First Steps",
        description: "Complete your first lesson",
        category: BadgeCategory::Progress,
        predicate: first_lesson,
    },
    BadgeRule {
        id: "first_module",
        title: "Module Master",
        description: "Complete an entire module",
        category: BadgeCategory::Progress,
        predicate: first_module,
    },
    BadgeRule {
        id: "perfect_quiz",
        title: "Perfect Score",
        description: "Score 100% on a quiz",
        category: BadgeCategory::Quiz,
        predicate: perfect_quiz,
    },
    BadgeRule {
        id: "quiz_streak",
        title: "Quiz Whiz",
        description: "Score 80% or more on three quizzes",
        category: BadgeCategory::Quiz,
        predicate: quiz_streak,
    },
    BadgeRule {
        id: "half_way",
        title: "Half Way There",
        description: "Complete half of all lessons",
        category: BadgeCategory::Progress,
        predicate: half_way,
    },
    BadgeRule {
        id: "all_modules",
        title: "Course Champion",
        description: "Complete every module",
        category: BadgeCategory::Progress,
        predicate: all_modules,
    },
    BadgeRule {
        id: "profile_complete",
        title: "Know Thyself",
        description: "Fill in your learning profile",
        category: BadgeCategory::Profile,
        predicate: profile_complete,
    },
    BadgeRule {
        id: "skill_expert",
        title: "Subject Expert",
        description: "Reach the top level in any skill",
        category: BadgeCategory::Profile,
        predicate: skill_expert,
    },
];

/// Looks up a badge by id.
#[must_use]
pub fn badge(id: &str) -> Option<&'static BadgeRule> {
    BADGES.iter().find(|rule| rule.id == id)
}

/// Returns the badges from `rules` that are eligible now and not yet in
/// `already_unlocked`, stamped with `now`, in table order.
///
/// Apart from the timestamp the result depends only on the inputs.
#[must_use]
pub fn evaluate(
    rules: &[BadgeRule],
    context: &BadgeContext<'_>,
    already_unlocked: &BTreeSet<String>,
    now: DateTime<Utc>,
) -> Vec<Achievement> {
    rules
        .iter()
        .filter(|rule| !already_unlocked.contains(rule.id))
        .filter(|rule| (rule.predicate)(context))
        .map(|rule| Achievement::new(rule.id, now))
        .collect()
}

// ─── Predicates ────────────────────────────────────────────────────────────────

// A recorded quiz result means a lesson was finished even if the lesson map
// has not been written yet.
fn first_lesson(ctx: &BadgeContext<'_>) -> bool {
    ctx.progress
        .modules
        .values()
        .any(|module| module.lessons.values().any(|done| *done))
        || !ctx.progress.quiz_results.is_empty()
}

fn first_module(ctx: &BadgeContext<'_>) -> bool {
    ctx.progress.modules.values().any(|module| module.completed)
}

fn perfect_quiz(ctx: &BadgeContext<'_>) -> bool {
    ctx.progress.quiz_results.iter().any(|result| result.is_perfect())
}

fn quiz_streak(ctx: &BadgeContext<'_>) -> bool {
    ctx.progress
        .quiz_results
        .iter()
        .filter(|result| result.score >= STRONG_QUIZ_SCORE)
        .count()
        >= QUIZ_STREAK_LENGTH
}

fn half_way(ctx: &BadgeContext<'_>) -> bool {
    let total = ctx.curriculum.total_lessons();
    total > 0 && ctx.progress.completed_lesson_count() * 2 >= total
}

// An empty module map is not "all complete".
fn all_modules(ctx: &BadgeContext<'_>) -> bool {
    !ctx.progress.modules.is_empty() && ctx.progress.modules.values().all(|module| module.completed)
}

fn profile_complete(ctx: &BadgeContext<'_>) -> bool {
    ctx.profile.is_complete()
}

fn skill_expert(ctx: &BadgeContext<'_>) -> bool {
    ctx.profile
        .skill_levels
        .values()
        .any(|level| *level >= MAX_SKILL_LEVEL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::apply_lesson_completion;
    use crate::model::{LessonId, ModuleId, ModuleProgress, QuizResult, SkillCategoryId};
    use crate::time::fixed_now;

    fn ids(achievements: &[Achievement]) -> BTreeSet<String> {
        achievements.iter().map(|a| a.id.clone()).collect()
    }

    fn run(doc: &ProgressDocument, profile: &UserProfile, curriculum: &Curriculum) -> Vec<Achievement> {
        let ctx = BadgeContext {
            progress: doc,
            profile,
            curriculum,
        };
        evaluate(BADGES, &ctx, &BTreeSet::new(), fixed_now())
    }

    #[test]
    fn badge_ids_are_unique() {
        let unique: BTreeSet<_> = BADGES.iter().map(|rule| rule.id).collect();
        assert_eq!(unique.len(), BADGES.len());
        assert_eq!(badge("half_way").unwrap().category, BadgeCategory::Progress);
        assert!(badge("missing").is_none());
    }

    #[test]
    fn empty_document_unlocks_nothing() {
        let curriculum = Curriculum::from_lesson_counts(&[2, 2]).unwrap();
        let result = run(&ProgressDocument::new(), &UserProfile::default(), &curriculum);
        assert!(result.is_empty());
    }

    #[test]
    fn perfect_quiz_alone_implies_first_lesson() {
        let curriculum = Curriculum::from_lesson_counts(&[2, 2]).unwrap();
        let mut doc = ProgressDocument::new();
        doc.quiz_results
            .push(QuizResult::new(ModuleId::new(1), LessonId::new(1), 100, 30));

        let unlocked = ids(&run(&doc, &UserProfile::default(), &curriculum));
        assert!(unlocked.contains("perfect_quiz"));
        assert!(unlocked.contains("first_lesson"));
        assert!(!unlocked.contains("quiz_streak"));
    }

    #[test]
    fn already_unlocked_badges_are_skipped() {
        let curriculum = Curriculum::from_lesson_counts(&[1]).unwrap();
        let mut doc = ProgressDocument::new();
        apply_lesson_completion(&mut doc, ModuleId::new(1), LessonId::new(1), 1).unwrap();
        let profile = UserProfile::default();
        let ctx = BadgeContext {
            progress: &doc,
            profile: &profile,
            curriculum: &curriculum,
        };

        let first = evaluate(BADGES, &ctx, &BTreeSet::new(), fixed_now());
        assert_eq!(
            ids(&first),
            ["all_modules", "first_lesson", "first_module", "half_way"]
                .into_iter()
                .map(String::from)
                .collect::<BTreeSet<String>>()
        );

        let second = evaluate(BADGES, &ctx, &ids(&first), fixed_now());
        assert!(second.is_empty());
    }

    #[test]
    fn all_modules_needs_at_least_one_module() {
        let curriculum = Curriculum::from_lesson_counts(&[1]).unwrap();
        let doc = ProgressDocument::new();
        let unlocked = ids(&run(&doc, &UserProfile::default(), &curriculum));
        assert!(!unlocked.contains("all_modules"));

        let mut partial = ProgressDocument::new();
        partial.modules.insert(
            ModuleId::new(1),
            ModuleProgress {
                completed: true,
                ..ModuleProgress::default()
            },
        );
        partial.modules.insert(ModuleId::new(2), ModuleProgress::default());
        let unlocked = ids(&run(&partial, &UserProfile::default(), &curriculum));
        assert!(unlocked.contains("first_module"));
        assert!(!unlocked.contains("all_modules"));
    }

    #[test]
    fn half_way_uses_curriculum_total() {
        let curriculum = Curriculum::from_lesson_counts(&[2, 3]).unwrap();
        let mut doc = ProgressDocument::new();
        apply_lesson_completion(&mut doc, ModuleId::new(1), LessonId::new(1), 2).unwrap();
        apply_lesson_completion(&mut doc, ModuleId::new(1), LessonId::new(2), 2).unwrap();
        assert!(!ids(&run(&doc, &UserProfile::default(), &curriculum)).contains("half_way"));

        apply_lesson_completion(&mut doc, ModuleId::new(2), LessonId::new(1), 3).unwrap();
        assert!(ids(&run(&doc, &UserProfile::default(), &curriculum)).contains("half_way"));
    }

    #[test]
    fn quiz_streak_counts_strong_scores() {
        let curriculum = Curriculum::from_lesson_counts(&[3]).unwrap();
        let mut doc = ProgressDocument::new();
        for (lesson, score) in [(1, 80), (2, 79), (3, 95)] {
            doc.quiz_results
                .push(QuizResult::new(ModuleId::new(1), LessonId::new(lesson), score, 10));
        }
        assert!(!ids(&run(&doc, &UserProfile::default(), &curriculum)).contains("quiz_streak"));

        doc.quiz_results
            .push(QuizResult::new(ModuleId::new(1), LessonId::new(2), 88, 10));
        assert!(ids(&run(&doc, &UserProfile::default(), &curriculum)).contains("quiz_streak"));
    }

    #[test]
    fn profile_badges() {
        let curriculum = Curriculum::from_lesson_counts(&[1]).unwrap();
        let mut profile = UserProfile {
            role: "developer".into(),
            industry: "healthcare".into(),
            experience: "beginner".into(),
            ..UserProfile::default()
        };
        profile.learning_goals.insert("policies".into());
        profile.set_skill_level(SkillCategoryId::new("apis").unwrap(), 10);

        let unlocked = ids(&run(&ProgressDocument::new(), &profile, &curriculum));
        assert!(unlocked.contains("profile_complete"));
        assert!(unlocked.contains("skill_expert"));
    }

    #[test]
    fn results_follow_table_order_and_carry_timestamp() {
        let curriculum = Curriculum::from_lesson_counts(&[1]).unwrap();
        let mut doc = ProgressDocument::new();
        apply_lesson_completion(&mut doc, ModuleId::new(1), LessonId::new(1), 1).unwrap();
        let result = run(&doc, &UserProfile::default(), &curriculum);
        let order: Vec<_> = result.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(order, vec!["first_lesson", "first_module", "half_way", "all_modules"]);
        assert!(result.iter().all(|a| a.unlocked_at == fixed_now()));
    }
}
