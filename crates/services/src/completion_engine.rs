use std::sync::Arc;

use tracing::{debug, info, warn};

use course_core::completion::{
    LessonCompletion, apply_curriculum_completion, apply_lesson_completion, reconcile,
    register_lesson_visit,
};
use course_core::model::{
    CourseEvent, Curriculum, LessonId, ModuleId, ModuleProgress, ProgressDocument, QuizResult,
};
use storage::ProgressStore;

use crate::Clock;
use crate::events::EventBus;

/// Single writer of record for lesson and module completion.
///
/// Owns the in-memory progress document. Every mutation is written through
/// to the [`ProgressStore`] before events are published, so subscribers that
/// re-read the store observe the new state. Operations never fail: invalid
/// input is logged and ignored, storage failures are logged and retried on
/// the next write or [`CompletionEngine::flush`].
pub struct CompletionEngine {
    store: Arc<ProgressStore>,
    bus: Arc<EventBus>,
    clock: Clock,
    doc: ProgressDocument,
    unsaved: bool,
}

impl CompletionEngine {
    /// Load the stored document and repair `completed` flags that drifted
    /// from their lessons.
    pub async fn hydrate(
        store: Arc<ProgressStore>,
        bus: Arc<EventBus>,
        clock: Clock,
        curriculum: &Curriculum,
    ) -> Self {
        let mut doc = store.load_progress().await;
        let repaired = reconcile(&mut doc, curriculum);

        let mut engine = Self {
            store,
            bus,
            clock,
            doc,
            unsaved: false,
        };
        if !repaired.is_empty() {
            info!(modules = ?repaired, "repaired stale module completion flags");
            engine.persist().await;
        }
        engine
    }

    #[must_use]
    pub fn document(&self) -> &ProgressDocument {
        &self.doc
    }

    #[must_use]
    pub fn module(&self, module_id: ModuleId) -> Option<&ModuleProgress> {
        self.doc.module(module_id)
    }

    /// True while the last write could not be made durable.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Mark a lesson completed.
    ///
    /// `total_lessons` is the module's lesson count from the curriculum. The
    /// module's `completed` flag is recomputed against it. `lesson-completed`
    /// is published on every valid call, `module-completed` only when the
    /// module turns complete. Returns the module's state after the write.
    pub async fn complete_lesson(
        &mut self,
        module_id: ModuleId,
        lesson_id: LessonId,
        total_lessons: usize,
    ) -> ModuleProgress {
        let Some(outcome) =
            apply_lesson_completion(&mut self.doc, module_id, lesson_id, total_lessons)
        else {
            warn!(%module_id, %lesson_id, "ignoring lesson completion with invalid id");
            return self.doc.module(module_id).cloned().unwrap_or_default();
        };

        self.announce(module_id, lesson_id, outcome).await
    }

    /// Mark a lesson completed, judging the module against the lessons the
    /// curriculum lists for it. Lessons the curriculum does not list are
    /// logged and ignored.
    pub async fn complete_curriculum_lesson(
        &mut self,
        curriculum: &Curriculum,
        module_id: ModuleId,
        lesson_id: LessonId,
    ) -> ModuleProgress {
        let Some(outcome) =
            apply_curriculum_completion(&mut self.doc, curriculum, module_id, lesson_id)
        else {
            warn!(%module_id, %lesson_id, "ignoring completion of a lesson outside the curriculum");
            return self.doc.module(module_id).cloned().unwrap_or_default();
        };
        self.announce(module_id, lesson_id, outcome).await
    }

    /// Append a quiz attempt and complete its lesson.
    pub async fn record_quiz_result(
        &mut self,
        result: QuizResult,
        total_lessons: usize,
    ) -> ModuleProgress {
        let (module_id, lesson_id) = (result.module_id, result.lesson_id);
        if !module_id.is_positive() || !lesson_id.is_positive() {
            warn!(%module_id, %lesson_id, "ignoring quiz result with invalid id");
            return self.doc.module(module_id).cloned().unwrap_or_default();
        }
        debug!(%module_id, %lesson_id, score = result.score, "quiz result recorded");
        self.doc.quiz_results.push(result);
        self.complete_lesson(module_id, lesson_id, total_lessons).await
    }

    /// Curriculum-checked [`CompletionEngine::record_quiz_result`]. Attempts on
    /// lessons the curriculum does not list are not recorded.
    pub async fn record_curriculum_quiz(
        &mut self,
        curriculum: &Curriculum,
        result: QuizResult,
    ) -> ModuleProgress {
        let (module_id, lesson_id) = (result.module_id, result.lesson_id);
        if !curriculum.contains(module_id, lesson_id) {
            warn!(%module_id, %lesson_id, "ignoring quiz result outside the curriculum");
            return self.doc.module(module_id).cloned().unwrap_or_default();
        }
        debug!(%module_id, %lesson_id, score = result.score, "quiz result recorded");
        self.doc.quiz_results.push(result);
        self.complete_curriculum_lesson(curriculum, module_id, lesson_id)
            .await
    }

    /// Register that a lesson was opened. Completed lessons stay completed.
    pub async fn visit_lesson(&mut self, module_id: ModuleId, lesson_id: LessonId) {
        if !module_id.is_positive() || !lesson_id.is_positive() {
            warn!(%module_id, %lesson_id, "ignoring lesson visit with invalid id");
            return;
        }
        if register_lesson_visit(&mut self.doc, module_id, lesson_id) {
            self.persist().await;
        }
    }

    /// Add study time to a lesson, mirrored into the analytics record.
    pub async fn record_time_spent(&mut self, module_id: ModuleId, lesson_id: LessonId, seconds: u64) {
        if !module_id.is_positive() || !lesson_id.is_positive() {
            warn!(%module_id, %lesson_id, "ignoring study time with invalid id");
            return;
        }
        if seconds == 0 {
            return;
        }
        let key = ProgressDocument::time_key(module_id, lesson_id);
        let total = self.doc.time_spent.entry(key.clone()).or_insert(0);
        *total = total.saturating_add(seconds);
        let total = *total;
        self.persist().await;

        let mut analytics = self.store.load_analytics().await;
        if analytics.session_start == 0 {
            analytics.session_start = self.clock.now_millis();
        }
        let tracked = analytics.time_spent.entry(key).or_insert(0);
        *tracked = (*tracked).max(total);
        if let Err(err) = self.store.save_analytics(&analytics).await {
            warn!(error = %err, "analytics not persisted");
        }
    }

    pub async fn set_user_name(&mut self, name: &str) {
        let name = name.trim();
        if self.doc.user_name == name {
            return;
        }
        self.doc.user_name = name.to_string();
        self.persist().await;
    }

    /// Re-persist the document if the last write failed. Meant for unload,
    /// visibility-change and periodic autosave hooks; a no-op otherwise.
    ///
    /// Returns true when the document is durable.
    pub async fn flush(&mut self) -> bool {
        if self.unsaved {
            self.persist().await;
        }
        !self.unsaved
    }

    async fn announce(
        &mut self,
        module_id: ModuleId,
        lesson_id: LessonId,
        outcome: LessonCompletion,
    ) -> ModuleProgress {
        self.persist().await;

        self.bus
            .publish(&CourseEvent::LessonCompleted {
                module_id,
                lesson_id,
            })
            .await;
        if outcome.module_newly_completed {
            info!(%module_id, "module completed");
            self.bus
                .publish(&CourseEvent::ModuleCompleted { module_id })
                .await;
        }

        outcome.progress
    }

    async fn persist(&mut self) {
        match self.store.save_progress(&self.doc).await {
            Ok(()) => self.unsaved = false,
            Err(err) => {
                self.unsaved = true;
                warn!(error = %err, "progress not persisted, keeping it in memory");
            }
        }
    }
}
