use std::sync::Arc;

use course_core::model::{
    Curriculum, LessonId, ModuleId, ModuleProgress, ProgressDocument, QuizResult,
};
use storage::{ProgressStore, Storage};

use crate::Clock;
use crate::achievement_service::AchievementService;
use crate::completion_engine::CompletionEngine;
use crate::error::CourseServicesError;
use crate::events::{EventBus, SubscriptionId};
use crate::personalization_service::PersonalizationService;
use crate::registry::Collaborators;

/// Assembles the progress core over one storage backend and wires the
/// event subscribers.
pub struct CourseServices {
    clock: Clock,
    curriculum: Arc<Curriculum>,
    store: Arc<ProgressStore>,
    bus: Arc<EventBus>,
    engine: CompletionEngine,
    achievements: Arc<AchievementService>,
    personalization: Arc<PersonalizationService>,
    subscriptions: Vec<SubscriptionId>,
}

impl CourseServices {
    /// Build services over a non-persistent in-memory store.
    pub async fn in_memory(
        clock: Clock,
        curriculum: Arc<Curriculum>,
        collaborators: Collaborators,
    ) -> Self {
        Self::from_storage(Storage::in_memory(), clock, curriculum, collaborators).await
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `CourseServicesError` if the database cannot be opened or migrated.
    pub async fn sqlite(
        db_url: &str,
        clock: Clock,
        curriculum: Arc<Curriculum>,
        collaborators: Collaborators,
    ) -> Result<Self, CourseServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock, curriculum, collaborators).await)
    }

    pub async fn from_storage(
        storage: Storage,
        clock: Clock,
        curriculum: Arc<Curriculum>,
        collaborators: Collaborators,
    ) -> Self {
        let store = Arc::new(ProgressStore::new(Arc::clone(&storage.kv)));
        let bus = Arc::new(EventBus::new());

        let personalization = Arc::new(PersonalizationService::new(
            Arc::clone(&store),
            Arc::clone(&bus),
            Arc::clone(&curriculum),
        ));
        let achievements = Arc::new(AchievementService::new(
            clock,
            Arc::clone(&store),
            Arc::clone(&bus),
            Arc::clone(&curriculum),
            collaborators,
        ));
        // Profile changes from a completed module are stored before the
        // badges are evaluated.
        let subscriptions = vec![
            bus.subscribe(personalization.clone()),
            bus.subscribe(achievements.clone()),
        ];

        let engine =
            CompletionEngine::hydrate(Arc::clone(&store), Arc::clone(&bus), clock, &curriculum)
                .await;

        Self {
            clock,
            curriculum,
            store,
            bus,
            engine,
            achievements,
            personalization,
            subscriptions,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn curriculum(&self) -> Arc<Curriculum> {
        Arc::clone(&self.curriculum)
    }

    #[must_use]
    pub fn store(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.store)
    }

    #[must_use]
    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    #[must_use]
    pub fn engine(&self) -> &CompletionEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut CompletionEngine {
        &mut self.engine
    }

    #[must_use]
    pub fn document(&self) -> &ProgressDocument {
        self.engine.document()
    }

    #[must_use]
    pub fn achievements(&self) -> Arc<AchievementService> {
        Arc::clone(&self.achievements)
    }

    #[must_use]
    pub fn personalization(&self) -> Arc<PersonalizationService> {
        Arc::clone(&self.personalization)
    }

    /// Complete a lesson the curriculum lists. Unknown lessons are logged and
    /// leave the document untouched.
    pub async fn complete_lesson(
        &mut self,
        module_id: ModuleId,
        lesson_id: LessonId,
    ) -> ModuleProgress {
        self.engine
            .complete_curriculum_lesson(&self.curriculum, module_id, lesson_id)
            .await
    }

    pub async fn record_quiz_result(&mut self, result: QuizResult) -> ModuleProgress {
        self.engine
            .record_curriculum_quiz(&self.curriculum, result)
            .await
    }
}

// The services subscribed to the bus hold the bus themselves.
impl Drop for CourseServices {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.bus.unsubscribe(id);
        }
    }
}
