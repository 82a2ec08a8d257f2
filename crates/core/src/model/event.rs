use serde::{Deserialize, Serialize};

use crate::model::achievement::Achievement;
use crate::model::ids::{LessonId, ModuleId};
use crate::model::profile::UserProfile;

/// Events announced between independently initialized course components.
///
/// Serialized with the event name under `type` and the payload under
/// `detail`, e.g. `{"type":"lesson-completed","detail":{"moduleId":1,"lessonId":2}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "kebab-case")]
pub enum CourseEvent {
    #[serde(rename_all = "camelCase")]
    LessonCompleted {
        module_id: ModuleId,
        lesson_id: LessonId,
    },
    #[serde(rename_all = "camelCase")]
    ModuleCompleted { module_id: ModuleId },
    ProfileUpdated { profile: UserProfile },
    AchievementUnlocked { achievement: Achievement },
}

impl CourseEvent {
    /// Wire name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            CourseEvent::LessonCompleted { .. } => "lesson-completed",
            CourseEvent::ModuleCompleted { .. } => "module-completed",
            CourseEvent::ProfileUpdated { .. } => "profile-updated",
            CourseEvent::AchievementUnlocked { .. } => "achievement-unlocked",
        }
    }
}
