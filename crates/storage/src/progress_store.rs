//! Typed access to the course records kept in key/value storage.
//!
//! Reads never fail: absent or malformed records load as their empty
//! defaults. Writes that the backend rejects are kept in a per-session
//! memory copy, so the course stays usable for the rest of the session even
//! when nothing can be persisted.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use course_core::model::{AchievementSet, ProgressDocument, UserProfile, lenient};

use crate::repository::{KeyValueStore, StorageError};

/// Storage keys. These are shared with existing stored data and must not change.
pub mod keys {
    pub const COURSE_PROGRESS: &str = "plainidCourseProgress";
    pub const USER_PROFILE: &str = "plainidUserProfile";
    pub const ACHIEVEMENTS: &str = "plainidAchievements";
    pub const COURSE_ANALYTICS: &str = "courseAnalytics";
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressStoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("could not encode {key}: {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Session analytics stored under `courseAnalytics`.
///
/// `time_spent` uses the same `"{moduleId}-{lessonId}"` keys and second
/// units as the progress document; `session_start` is epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseAnalytics {
    #[serde(default, deserialize_with = "lenient::seconds_map")]
    pub time_spent: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactions: Option<serde_json::Value>,
    #[serde(default)]
    pub session_start: i64,
}

/// Typed wrapper over a [`KeyValueStore`] for the course records.
pub struct ProgressStore {
    kv: Arc<dyn KeyValueStore>,
    // Values whose last durable write failed; newer than the backend's copy.
    unsaved: Mutex<HashMap<&'static str, String>>,
    degraded: AtomicBool,
}

impl ProgressStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            unsaved: Mutex::new(HashMap::new()),
            degraded: AtomicBool::new(false),
        }
    }

    /// True once the backend has failed during this session.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Load the progress document, backfilling lesson time from analytics.
    ///
    /// Missing or malformed data yields an empty document.
    pub async fn load_progress(&self) -> ProgressDocument {
        let mut doc: ProgressDocument = self.load_or_default(keys::COURSE_PROGRESS).await;
        let analytics = self.load_analytics().await;
        backfill_time_spent(&mut doc, &analytics);
        doc
    }

    /// Overwrite the stored progress document.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` when the document could not be made
    /// durable. The value is still kept for the rest of the session.
    pub async fn save_progress(&self, doc: &ProgressDocument) -> Result<(), ProgressStoreError> {
        self.save(keys::COURSE_PROGRESS, doc).await
    }

    /// Load the user profile, repaired to satisfy goal and skill bounds.
    pub async fn load_profile(&self) -> UserProfile {
        self.load_or_default::<UserProfile>(keys::USER_PROFILE)
            .await
            .normalize()
    }

    /// # Errors
    ///
    /// Returns `ProgressStoreError` when the profile could not be made durable.
    pub async fn save_profile(&self, profile: &UserProfile) -> Result<(), ProgressStoreError> {
        self.save(keys::USER_PROFILE, profile).await
    }

    pub async fn load_achievements(&self) -> AchievementSet {
        self.load_or_default(keys::ACHIEVEMENTS).await
    }

    /// # Errors
    ///
    /// Returns `ProgressStoreError` when the list could not be made durable.
    pub async fn save_achievements(
        &self,
        achievements: &AchievementSet,
    ) -> Result<(), ProgressStoreError> {
        self.save(keys::ACHIEVEMENTS, achievements).await
    }

    pub async fn load_analytics(&self) -> CourseAnalytics {
        self.load_or_default(keys::COURSE_ANALYTICS).await
    }

    /// # Errors
    ///
    /// Returns `ProgressStoreError` when the record could not be made durable.
    pub async fn save_analytics(
        &self,
        analytics: &CourseAnalytics,
    ) -> Result<(), ProgressStoreError> {
        self.save(keys::COURSE_ANALYTICS, analytics).await
    }

    async fn load_or_default<T>(&self, key: &'static str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let Some(raw) = self.read(key).await else {
            return T::default();
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "ignoring malformed stored record");
                T::default()
            }
        }
    }

    async fn read(&self, key: &'static str) -> Option<String> {
        if let Some(value) = self.unsaved_copy(key) {
            return Some(value);
        }
        match self.kv.get(key).await {
            Ok(value) => value,
            Err(err) => {
                self.mark_degraded(&err);
                None
            }
        }
    }

    async fn save<T: Serialize>(&self, key: &'static str, value: &T) -> Result<(), ProgressStoreError> {
        let raw = serde_json::to_string(value)
            .map_err(|source| ProgressStoreError::Encode { key, source })?;

        match self.kv.set(key, &raw).await {
            Ok(()) => {
                self.unsaved_guard().remove(key);
                Ok(())
            }
            Err(err) => {
                self.mark_degraded(&err);
                self.unsaved_guard().insert(key, raw);
                Err(err.into())
            }
        }
    }

    fn unsaved_copy(&self, key: &'static str) -> Option<String> {
        self.unsaved_guard().get(key).cloned()
    }

    fn unsaved_guard(&self) -> std::sync::MutexGuard<'_, HashMap<&'static str, String>> {
        self.unsaved.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_degraded(&self, err: &StorageError) {
        if self.degraded.swap(true, Ordering::Relaxed) {
            debug!(error = %err, "storage still unavailable");
        } else {
            warn!(error = %err, "storage unavailable, progress is kept in memory for this session");
        }
    }
}

/// Keeps the larger of the document's and the analytics' time per lesson.
fn backfill_time_spent(doc: &mut ProgressDocument, analytics: &CourseAnalytics) {
    for (key, seconds) in &analytics.time_spent {
        let entry = doc.time_spent.entry(key.clone()).or_insert(0);
        *entry = (*entry).max(*seconds);
    }
}
