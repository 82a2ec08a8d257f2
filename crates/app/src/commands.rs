use std::error::Error;
use std::fmt;

use course_core::achievements::BADGES;
use course_core::completion::{course_percentage, is_module_unlocked_in, module_percentage};
use course_core::model::{LessonId, ModuleId, ModuleProgress, ProfileDraft, QuizResult};
use services::CourseServices;

use crate::args::{Command, ProfileArgs};

#[derive(Debug)]
enum CommandError {
    UnknownLesson { module_id: ModuleId, lesson_id: LessonId },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::UnknownLesson {
                module_id,
                lesson_id,
            } => write!(f, "module {module_id} has no lesson {lesson_id}"),
        }
    }
}

impl Error for CommandError {}

pub async fn run(services: &mut CourseServices, command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Status => {
            print_status(services);
            Ok(())
        }
        Command::Complete {
            module_id,
            lesson_id,
        } => {
            ensure_lesson(services, module_id, lesson_id)?;
            let progress = services.complete_lesson(module_id, lesson_id).await;
            print_module_line(services, module_id, &progress);
            Ok(())
        }
        Command::Quiz {
            module_id,
            lesson_id,
            score,
            seconds,
        } => {
            ensure_lesson(services, module_id, lesson_id)?;
            let result = QuizResult::new(module_id, lesson_id, score, seconds);
            let progress = services.record_quiz_result(result).await;
            services
                .engine_mut()
                .record_time_spent(module_id, lesson_id, seconds)
                .await;
            println!("quiz {module_id}-{lesson_id}: {score}%");
            print_module_line(services, module_id, &progress);
            Ok(())
        }
        Command::Achievements => {
            print_achievements(services).await;
            Ok(())
        }
        Command::Path => {
            print_path(services).await;
            Ok(())
        }
        Command::Profile(args) => update_profile(services, args).await,
    }
}

fn ensure_lesson(
    services: &CourseServices,
    module_id: ModuleId,
    lesson_id: LessonId,
) -> Result<(), CommandError> {
    if services.curriculum().contains(module_id, lesson_id) {
        Ok(())
    } else {
        Err(CommandError::UnknownLesson {
            module_id,
            lesson_id,
        })
    }
}

fn print_status(services: &CourseServices) {
    let curriculum = services.curriculum();
    let doc = services.document();
    if !doc.user_name.is_empty() {
        println!("Learner: {}", doc.user_name);
    }
    for module_id in curriculum.module_ids() {
        let progress = doc.module(module_id).cloned().unwrap_or_default();
        print_module_line(services, module_id, &progress);
    }
    println!(
        "Overall: {}% ({} quiz attempts, {} min studied)",
        course_percentage(doc, &curriculum),
        doc.quiz_results.len(),
        doc.total_time_spent() / 60
    );
}

fn print_module_line(services: &CourseServices, module_id: ModuleId, progress: &ModuleProgress) {
    let curriculum = services.curriculum();
    let doc = services.document();
    let total = curriculum.lesson_count(module_id);
    let state = if progress.completed {
        "completed"
    } else if progress.is_started() {
        "in progress"
    } else if is_module_unlocked_in(doc, &curriculum, module_id) {
        "unlocked"
    } else {
        "locked"
    };
    println!(
        "Module {module_id}: {}/{total} lessons, {}% [{state}]",
        progress.completed_lessons().min(total),
        module_percentage(doc, module_id, total)
    );
}

async fn print_achievements(services: &CourseServices) {
    let unlocked = services.achievements().unlocked().await;
    for rule in BADGES {
        match unlocked.get(rule.id) {
            Some(achievement) => println!(
                "[x] {} - {} (unlocked {})",
                rule.title,
                rule.description,
                achievement.unlocked_at.format("%Y-%m-%d")
            ),
            None => println!("[ ] {} - {}", rule.title, rule.description),
        }
    }
    println!("{}/{} badges", unlocked.len(), BADGES.len());
}

async fn print_path(services: &CourseServices) {
    let path = services.personalization().learning_path().await;
    match path.role {
        Some(role) => println!("Learning path for role {role}"),
        None => println!("Learning path (no role set)"),
    }
    for entry in &path.entries {
        let marker = if Some(entry.module_id) == path.current {
            ">"
        } else {
            " "
        };
        let state = match (entry.completed, entry.unlocked) {
            (true, _) => "done",
            (false, true) => "open",
            (false, false) => "locked",
        };
        println!(
            "{marker} Module {} [{state}] weight {} ({})",
            entry.module_id,
            entry.weight,
            entry.importance.as_str()
        );
    }
    if let Some(next) = path.next {
        println!("Up next: module {next}");
    }
}

async fn update_profile(
    services: &mut CourseServices,
    args: ProfileArgs,
) -> Result<(), Box<dyn Error>> {
    let personalization = services.personalization();
    let current = personalization.profile().await;
    let mut draft = ProfileDraft::from_profile(&current);
    if let Some(role) = args.role {
        draft.role = role;
    }
    if let Some(industry) = args.industry {
        draft.industry = industry;
    }
    if let Some(experience) = args.experience {
        draft.experience = experience;
    }
    if !args.goals.is_empty() {
        draft.learning_goals = args.goals;
    }
    if let Some(style) = args.style {
        draft.learning_style = style;
    }

    let profile = personalization.update_profile(draft).await?;
    if let Some(name) = args.name {
        services.engine_mut().set_user_name(&name).await;
    }

    println!(
        "Profile saved: role={} industry={} experience={} goals={}",
        display_or_dash(&profile.role),
        display_or_dash(&profile.industry),
        display_or_dash(&profile.experience),
        profile
            .learning_goals
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}
