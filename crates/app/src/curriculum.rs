use std::error::Error;
use std::path::Path;

use course_core::model::{Curriculum, CurriculumError};

/// Lesson counts of the six built-in modules.
pub const BUILTIN_LESSON_COUNTS: [u64; 6] = [4, 5, 4, 5, 4, 3];

/// The course shipped with the binary.
///
/// # Errors
///
/// Never fails for the built-in table; the error is propagated rather than
/// unwrapped.
pub fn builtin() -> Result<Curriculum, CurriculumError> {
    Curriculum::from_lesson_counts(&BUILTIN_LESSON_COUNTS)
}

/// Load a curriculum from a JSON object mapping module ids to lesson id
/// lists, e.g. `{"1": [1, 2, 3], "2": [1, 2]}`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid JSON, or
/// describes an invalid curriculum.
pub fn load(path: &Path) -> Result<Curriculum, Box<dyn Error>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("cannot read curriculum {}: {err}", path.display()))?;
    let curriculum: Curriculum = serde_json::from_str(&raw)
        .map_err(|err| format!("invalid curriculum {}: {err}", path.display()))?;
    Ok(curriculum)
}
