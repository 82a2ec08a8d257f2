use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An unlocked badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub unlocked_at: DateTime<Utc>,
}

impl Achievement {
    #[must_use]
    pub fn new(id: impl Into<String>, unlocked_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            unlocked_at,
        }
    }
}

/// Append-only collection of unlocked achievements, persisted as a JSON list
/// under `plainidAchievements`.
///
/// Ids are unique; once present an entry is never removed and its
/// `unlocked_at` never changes. Entries keep their unlock order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Achievement>", into = "Vec<Achievement>")]
pub struct AchievementSet {
    entries: Vec<Achievement>,
}

impl AchievementSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an achievement. Returns false, leaving the existing entry
    /// untouched, if the id is already unlocked.
    pub fn insert(&mut self, achievement: Achievement) -> bool {
        if self.contains(&achievement.id) {
            return false;
        }
        self.entries.push(achievement);
        true
    }

    /// Adds every achievement not yet present, returning how many were new.
    pub fn extend(&mut self, achievements: impl IntoIterator<Item = Achievement>) -> usize {
        achievements
            .into_iter()
            .map(|achievement| usize::from(self.insert(achievement)))
            .sum()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Achievement> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    #[must_use]
    pub fn ids(&self) -> BTreeSet<String> {
        self.entries.iter().map(|entry| entry.id.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Achievement> {
        self.entries.iter()
    }
}

impl From<Vec<Achievement>> for AchievementSet {
    // Stored lists may carry duplicates from older writers; the first entry wins.
    fn from(value: Vec<Achievement>) -> Self {
        let mut set = Self::new();
        set.extend(value);
        set
    }
}

impl From<AchievementSet> for Vec<Achievement> {
    fn from(value: AchievementSet) -> Self {
        value.entries
    }
}
