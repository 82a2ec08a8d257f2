mod achievement;
mod curriculum;
mod event;
mod ids;
pub mod lenient;
mod profile;
mod progress;

pub use ids::{LessonId, ModuleId, ParseIdError, SkillCategoryId};

pub use achievement::{Achievement, AchievementSet};
pub use curriculum::{Curriculum, CurriculumError};
pub use event::CourseEvent;
pub use profile::{MAX_LEARNING_GOALS, MAX_SKILL_LEVEL, ProfileDraft, ProfileError, UserProfile};
pub use progress::{MAX_QUIZ_SCORE, ModuleProgress, ProgressDocument, QuizResult};
