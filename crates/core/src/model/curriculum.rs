use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LessonId, ModuleId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CurriculumError {
    #[error("curriculum must contain at least one module")]
    Empty,

    #[error("module id must be positive")]
    InvalidModuleId,

    #[error("module {0} has no lessons")]
    EmptyModule(ModuleId),

    #[error("module {module} has an invalid lesson id")]
    InvalidLessonId { module: ModuleId },

    #[error("module {module} lists lesson {lesson} more than once")]
    DuplicateLesson { module: ModuleId, lesson: LessonId },
}

/// Curriculum shape: the ordered lessons of each module.
///
/// Owned by the content layer and handed to the progress core at call time;
/// the core never hard-codes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<ModuleId, Vec<LessonId>>", into = "BTreeMap<ModuleId, Vec<LessonId>>")]
pub struct Curriculum {
    modules: BTreeMap<ModuleId, Vec<LessonId>>,
}

impl Curriculum {
    /// Builds a curriculum from module → ordered lesson ids.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError` when the map is empty, a module has no
    /// lessons, an id is zero, or a lesson id repeats within a module.
    pub fn new(modules: BTreeMap<ModuleId, Vec<LessonId>>) -> Result<Self, CurriculumError> {
        if modules.is_empty() {
            return Err(CurriculumError::Empty);
        }
        for (module, lessons) in &modules {
            if !module.is_positive() {
                return Err(CurriculumError::InvalidModuleId);
            }
            if lessons.is_empty() {
                return Err(CurriculumError::EmptyModule(*module));
            }
            let mut seen = BTreeSet::new();
            for lesson in lessons {
                if !lesson.is_positive() {
                    return Err(CurriculumError::InvalidLessonId { module: *module });
                }
                if !seen.insert(*lesson) {
                    return Err(CurriculumError::DuplicateLesson {
                        module: *module,
                        lesson: *lesson,
                    });
                }
            }
        }
        Ok(Self { modules })
    }

    /// Builds a curriculum whose modules `1..=n` hold lessons `1..=count`.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError` under the same rules as [`Curriculum::new`].
    pub fn from_lesson_counts(counts: &[u64]) -> Result<Self, CurriculumError> {
        let modules = counts
            .iter()
            .zip(1_u64..)
            .map(|(count, module)| {
                (
                    ModuleId::new(module),
                    (1..=*count).map(LessonId::new).collect(),
                )
            })
            .collect();
        Self::new(modules)
    }

    /// Module ids in ascending order.
    #[must_use]
    pub fn module_ids(&self) -> Vec<ModuleId> {
        self.modules.keys().copied().collect()
    }

    /// Position of `module_id` in curriculum order, if the curriculum has it.
    #[must_use]
    pub fn module_position(&self, module_id: ModuleId) -> Option<usize> {
        self.modules.keys().position(|id| *id == module_id)
    }

    /// The module listed immediately before `module_id`.
    #[must_use]
    pub fn previous_module(&self, module_id: ModuleId) -> Option<ModuleId> {
        self.modules.range(..module_id).next_back().map(|(id, _)| *id)
    }

    #[must_use]
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn lessons(&self, module_id: ModuleId) -> &[LessonId] {
        self.modules.get(&module_id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn lesson_count(&self, module_id: ModuleId) -> usize {
        self.lessons(module_id).len()
    }

    #[must_use]
    pub fn total_lessons(&self) -> usize {
        self.modules.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn contains(&self, module_id: ModuleId, lesson_id: LessonId) -> bool {
        self.lessons(module_id).contains(&lesson_id)
    }
}

impl TryFrom<BTreeMap<ModuleId, Vec<LessonId>>> for Curriculum {
    type Error = CurriculumError;

    fn try_from(value: BTreeMap<ModuleId, Vec<LessonId>>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Curriculum> for BTreeMap<ModuleId, Vec<LessonId>> {
    fn from(value: Curriculum) -> Self {
        value.modules
    }
}
