use thiserror::Error;

use crate::model::{CurriculumError, ProfileError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Curriculum(#[from] CurriculumError),
}
