use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::ids::{LessonId, ModuleId};
use crate::model::lenient;

/// Highest score a quiz attempt can record.
pub const MAX_QUIZ_SCORE: u8 = 100;

//
// ─── MODULE PROGRESS ───────────────────────────────────────────────────────────
//

/// Per-module completion state.
///
/// A lesson key being present means the learner visited or attempted the
/// lesson; a `true` value means it is completed. `completed` is derived from
/// the lesson map and kept alongside it in storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgress {
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub lessons: BTreeMap<LessonId, bool>,
}

impl ModuleProgress {
    /// Number of lessons marked completed.
    #[must_use]
    pub fn completed_lessons(&self) -> usize {
        self.lessons.values().filter(|done| **done).count()
    }

    /// Returns true if at least one lesson is completed.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.lessons.values().any(|done| *done)
    }

    #[must_use]
    pub fn is_lesson_completed(&self, lesson_id: LessonId) -> bool {
        self.lessons.get(&lesson_id).copied().unwrap_or(false)
    }
}

//
// ─── QUIZ RESULT ───────────────────────────────────────────────────────────────
//

/// One quiz attempt, appended to the document's chronological log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub module_id: ModuleId,
    pub lesson_id: LessonId,
    #[serde(deserialize_with = "lenient::quiz_score")]
    pub score: u8,
    #[serde(default, deserialize_with = "lenient::seconds")]
    pub time_spent_seconds: u64,
}

impl QuizResult {
    /// Creates a quiz result, clamping the score to `0..=100`.
    #[must_use]
    pub fn new(module_id: ModuleId, lesson_id: LessonId, score: u8, time_spent_seconds: u64) -> Self {
        Self {
            module_id,
            lesson_id,
            score: score.min(MAX_QUIZ_SCORE),
            time_spent_seconds,
        }
    }

    #[must_use]
    pub fn is_perfect(&self) -> bool {
        self.score == MAX_QUIZ_SCORE
    }
}

//
// ─── PROGRESS DOCUMENT ─────────────────────────────────────────────────────────
//

/// The full persisted record of a learner's completion state.
///
/// Stored as JSON under `plainidCourseProgress`:
/// `{"modules": {...}, "quizResults": [...], "timeSpent": {...}, "userName": ""}`.
/// Every field defaults so partially written records still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDocument {
    #[serde(default)]
    pub modules: BTreeMap<ModuleId, ModuleProgress>,
    #[serde(default)]
    pub quiz_results: Vec<QuizResult>,
    /// Seconds spent per lesson, keyed by `"{moduleId}-{lessonId}"`.
    #[serde(default, deserialize_with = "lenient::seconds_map")]
    pub time_spent: BTreeMap<String, u64>,
    #[serde(default)]
    pub user_name: String,
}

impl ProgressDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Key used by `time_spent` for a lesson.
    #[must_use]
    pub fn time_key(module_id: ModuleId, lesson_id: LessonId) -> String {
        format!("{module_id}-{lesson_id}")
    }

    #[must_use]
    pub fn module(&self, module_id: ModuleId) -> Option<&ModuleProgress> {
        self.modules.get(&module_id)
    }

    #[must_use]
    pub fn is_module_completed(&self, module_id: ModuleId) -> bool {
        self.module(module_id).is_some_and(|m| m.completed)
    }

    #[must_use]
    pub fn is_lesson_completed(&self, module_id: ModuleId, lesson_id: LessonId) -> bool {
        self.module(module_id)
            .is_some_and(|m| m.is_lesson_completed(lesson_id))
    }

    /// Completed lessons across every module.
    #[must_use]
    pub fn completed_lesson_count(&self) -> usize {
        self.modules.values().map(ModuleProgress::completed_lessons).sum()
    }

    /// Modules whose `completed` flag is set, in ascending id order.
    #[must_use]
    pub fn completed_module_ids(&self) -> Vec<ModuleId> {
        self.modules
            .iter()
            .filter(|(_, progress)| progress.completed)
            .map(|(id, _)| *id)
            .collect()
    }

    #[must_use]
    pub fn time_spent_on(&self, module_id: ModuleId, lesson_id: LessonId) -> u64 {
        self.time_spent
            .get(&Self::time_key(module_id, lesson_id))
            .copied()
            .unwrap_or(0)
    }

    /// Total recorded study time in seconds.
    #[must_use]
    pub fn total_time_spent(&self) -> u64 {
        self.time_spent.values().copied().fold(0, u64::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_numbers_keep_the_rest_of_the_document() {
        let json = r#"{
            "modules": {"1": {"completed": false, "lessons": {"1": true, "2": true}}},
            "quizResults": [{"moduleId": 1, "lessonId": 2, "score": 92.6, "timeSpentSeconds": 12.5}],
            "timeSpent": {"1-1": 30.2, "1-2": -4},
            "userName": "Ada"
        }"#;
        let doc: ProgressDocument = serde_json::from_str(json).unwrap();

        assert_eq!(doc.user_name, "Ada");
        assert_eq!(doc.completed_lesson_count(), 2);
        assert_eq!(doc.quiz_results[0].score, 93);
        assert_eq!(doc.quiz_results[0].time_spent_seconds, 13);
        assert_eq!(doc.time_spent_on(ModuleId::new(1), LessonId::new(1)), 30);
        assert_eq!(doc.time_spent_on(ModuleId::new(1), LessonId::new(2)), 0);
    }

    #[test]
    fn empty_document_round_trips_with_camel_case_keys() {
        let json = serde_json::to_string(&ProgressDocument::new()).unwrap();
        assert_eq!(
            json,
            r#"{"modules":{},"quizResults":[],"timeSpent":{},"userName":""}"#
        );
    }

    #[test]
    fn partial_records_fill_defaults() {
        let doc: ProgressDocument =
            serde_json::from_str(r#"{"modules":{"1":{"lessons":{"2":true}}}}"#).unwrap();
        let module = doc.module(ModuleId::new(1)).unwrap();
        assert!(!module.completed);
        assert!(module.is_lesson_completed(LessonId::new(2)));
        assert!(doc.quiz_results.is_empty());
        assert!(doc.user_name.is_empty());
    }

    #[test]
    fn quiz_score_is_clamped() {
        let result = QuizResult::new(ModuleId::new(1), LessonId::new(1), 250, 12);
        assert_eq!(result.score, 100);
        assert!(result.is_perfect());
    }

    #[test]
    fn quiz_result_uses_seconds_field_name() {
        let result = QuizResult::new(ModuleId::new(2), LessonId::new(3), 80, 45);
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(
            json,
            r#"{"moduleId":2,"lessonId":3,"score":80,"timeSpentSeconds":45}"#
        );
    }

    #[test]
    fn counts_completed_lessons_and_modules() {
        let mut doc = ProgressDocument::new();
        let mut first = ModuleProgress::default();
        first.lessons.insert(LessonId::new(1), true);
        first.lessons.insert(LessonId::new(2), true);
        first.completed = true;
        let mut second = ModuleProgress::default();
        second.lessons.insert(LessonId::new(1), false);
        doc.modules.insert(ModuleId::new(1), first);
        doc.modules.insert(ModuleId::new(2), second);

        assert_eq!(doc.completed_lesson_count(), 2);
        assert_eq!(doc.completed_module_ids(), vec![ModuleId::new(1)]);
        assert!(!doc.module(ModuleId::new(2)).unwrap().is_started());
    }

    #[test]
    fn time_key_format() {
        assert_eq!(ProgressDocument::time_key(ModuleId::new(4), LessonId::new(2)), "4-2");
    }
}
