//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::ProfileError;
use storage::ProgressStoreError;
use storage::sqlite::SqliteInitError;

/// Failure reported by an event subscriber. The bus logs it and keeps
/// dispatching to the remaining subscribers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubscriberError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Store(#[from] ProgressStoreError),
}

/// Errors emitted by `PersonalizationService::update_profile`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileUpdateError {
    #[error(transparent)]
    Invalid(#[from] ProfileError),
}

/// Errors emitted while bootstrapping course services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
