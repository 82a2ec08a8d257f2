use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use course_core::completion::is_module_unlocked_in;
use course_core::model::{CourseEvent, Curriculum, ModuleId, ProfileDraft, UserProfile};
use course_core::personalization::{
    Importance, Role, current_module, derive_order, importance, module_skills, next_module, weight,
};
use storage::ProgressStore;

use crate::error::{ProfileUpdateError, SubscriberError};
use crate::events::{EventBus, EventSubscriber};

/// One module as shown on the personalized learning path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningPathEntry {
    pub module_id: ModuleId,
    pub weight: u8,
    pub importance: Importance,
    pub completed: bool,
    pub unlocked: bool,
}

/// The learner's modules in role order, with the module to resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningPath {
    pub role: Option<Role>,
    pub order: Vec<ModuleId>,
    pub current: Option<ModuleId>,
    pub next: Option<ModuleId>,
    pub entries: Vec<LearningPathEntry>,
}

/// Owns the learner profile and derives the personalized module order.
///
/// Nothing is cached: every call re-reads the profile and progress.
pub struct PersonalizationService {
    store: Arc<ProgressStore>,
    bus: Arc<EventBus>,
    curriculum: Arc<Curriculum>,
}

impl PersonalizationService {
    #[must_use]
    pub fn new(store: Arc<ProgressStore>, bus: Arc<EventBus>, curriculum: Arc<Curriculum>) -> Self {
        Self {
            store,
            bus,
            curriculum,
        }
    }

    pub async fn profile(&self) -> UserProfile {
        self.store.load_profile().await
    }

    /// Validate and store profile answers, then announce `profile-updated`.
    ///
    /// A failed write is logged; the event still fires with the new profile.
    ///
    /// # Errors
    ///
    /// Returns `ProfileUpdateError::Invalid` if the draft fails validation.
    /// Nothing is stored in that case.
    pub async fn update_profile(
        &self,
        draft: ProfileDraft,
    ) -> Result<UserProfile, ProfileUpdateError> {
        let profile = draft.validate()?;
        self.save_and_announce(&profile).await;
        Ok(profile)
    }

    pub async fn learning_path(&self) -> LearningPath {
        let profile = self.store.load_profile().await;
        let progress = self.store.load_progress().await;
        let role = Role::parse(&profile.role);

        let order = derive_order(role, &self.curriculum.module_ids());
        let current = current_module(&order, &progress);
        let next = next_module(&order, &progress);
        let entries = order
            .iter()
            .map(|module_id| LearningPathEntry {
                module_id: *module_id,
                weight: weight(role, *module_id),
                importance: importance(role, *module_id),
                completed: progress.is_module_completed(*module_id),
                unlocked: is_module_unlocked_in(&progress, &self.curriculum, *module_id),
            })
            .collect();

        LearningPath {
            role,
            order,
            current,
            next,
            entries,
        }
    }

    /// Record a finished module on the profile and raise its skills.
    async fn record_module_completion(&self, module_id: ModuleId) {
        let mut profile = self.store.load_profile().await;
        if !profile.mark_module_completed(module_id) {
            debug!(%module_id, "module already on profile");
            return;
        }
        for skill in module_skills(module_id) {
            profile.raise_skill(skill, 1);
        }
        info!(%module_id, "profile updated from module completion");
        self.save_and_announce(&profile).await;
    }

    async fn save_and_announce(&self, profile: &UserProfile) {
        if let Err(err) = self.store.save_profile(profile).await {
            warn!(error = %err, "profile not persisted");
        }
        self.bus
            .publish(&CourseEvent::ProfileUpdated {
                profile: profile.clone(),
            })
            .await;
    }
}

#[async_trait]
impl EventSubscriber for PersonalizationService {
    fn name(&self) -> &str {
        "personalization"
    }

    async fn on_event(&self, event: &CourseEvent) -> Result<(), SubscriberError> {
        if let CourseEvent::ModuleCompleted { module_id } = event {
            self.record_module_completion(*module_id).await;
        }
        Ok(())
    }
}
