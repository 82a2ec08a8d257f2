use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use course_core::achievements::{BADGES, BadgeContext, badge, evaluate};
use course_core::model::{Achievement, AchievementSet, CourseEvent, Curriculum};
use storage::ProgressStore;

use crate::Clock;
use crate::error::SubscriberError;
use crate::events::{EventBus, EventSubscriber};
use crate::registry::Collaborators;

/// Evaluates the badge table against stored state and records new badges.
///
/// State is always re-read from the [`ProgressStore`], so the service can be
/// triggered by events, by a timer or directly, in any order.
pub struct AchievementService {
    clock: Clock,
    store: Arc<ProgressStore>,
    bus: Arc<EventBus>,
    curriculum: Arc<Curriculum>,
    collaborators: Collaborators,
}

impl AchievementService {
    #[must_use]
    pub fn new(
        clock: Clock,
        store: Arc<ProgressStore>,
        bus: Arc<EventBus>,
        curriculum: Arc<Curriculum>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            clock,
            store,
            bus,
            curriculum,
            collaborators,
        }
    }

    /// Badges unlocked so far, in unlock order.
    pub async fn unlocked(&self) -> AchievementSet {
        self.store.load_achievements().await
    }

    /// Evaluate, persist and announce newly earned badges.
    ///
    /// Each new badge is published as `achievement-unlocked` in table order.
    /// Only the first one is shown through the notifier. Returns the new
    /// badges; an empty list when nothing changed.
    pub async fn check(&self) -> Vec<Achievement> {
        let progress = self.store.load_progress().await;
        let profile = self.store.load_profile().await;
        let mut unlocked = self.store.load_achievements().await;

        let context = BadgeContext {
            progress: &progress,
            profile: &profile,
            curriculum: &self.curriculum,
        };
        let fresh = evaluate(BADGES, &context, &unlocked.ids(), self.clock.now());
        if fresh.is_empty() {
            return fresh;
        }

        unlocked.extend(fresh.iter().cloned());
        if let Err(err) = self.store.save_achievements(&unlocked).await {
            warn!(error = %err, "achievements not persisted");
        }

        for (index, achievement) in fresh.iter().enumerate() {
            info!(badge = %achievement.id, "achievement unlocked");
            if index == 0 {
                self.notify(achievement);
            }
            self.bus
                .publish(&CourseEvent::AchievementUnlocked {
                    achievement: achievement.clone(),
                })
                .await;
        }
        fresh
    }

    fn notify(&self, achievement: &Achievement) {
        let Some(notifier) = self.collaborators.notifier() else {
            return;
        };
        match badge(&achievement.id) {
            Some(rule) => notifier.notify(rule.title, rule.description),
            None => notifier.notify("Achievement unlocked", &achievement.id),
        }
    }

    /// Issues the certificate when every curriculum module is complete.
    ///
    /// Only called on a `module-completed` edge, which cannot repeat once the
    /// whole curriculum is finished.
    async fn issue_certificate_if_finished(&self) {
        let Some(issuer) = self.collaborators.certificate_issuer() else {
            return;
        };
        let progress = self.store.load_progress().await;
        let finished = self
            .curriculum
            .module_ids()
            .into_iter()
            .all(|module_id| progress.is_module_completed(module_id));
        if finished {
            info!("curriculum completed, issuing certificate");
            issuer.issue(&progress.user_name, self.clock.now());
        }
    }
}

#[async_trait]
impl EventSubscriber for AchievementService {
    fn name(&self) -> &str {
        "achievements"
    }

    async fn on_event(&self, event: &CourseEvent) -> Result<(), SubscriberError> {
        match event {
            CourseEvent::LessonCompleted { .. } | CourseEvent::ProfileUpdated { .. } => {
                self.check().await;
            }
            CourseEvent::ModuleCompleted { .. } => {
                self.check().await;
                self.issue_certificate_if_finished().await;
            }
            CourseEvent::AchievementUnlocked { .. } => {
                debug!("ignoring achievement event");
            }
        }
        Ok(())
    }
}
