use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier for a curriculum module.
///
/// Stored as a plain integer, both as a JSON value and as a JSON object key.
/// Only positive values address a real module; `0` is representable so that
/// malformed input can be carried to the point where it is rejected.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(u64);

impl ModuleId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns true when the id can address a module.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

/// Identifier for a lesson, unique within its module.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LessonId(u64);

impl LessonId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

/// Identifier for a skill category tracked on the user profile
/// (e.g. `policy-modeling`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillCategoryId(String);

impl SkillCategoryId {
    /// Builds a skill id, returning `None` for blank input.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleId({})", self.0)
    }
}

impl fmt::Debug for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LessonId({})", self.0)
    }
}

impl fmt::Debug for SkillCategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SkillCategoryId({:?})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SkillCategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for ModuleId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(ModuleId::new)
            .map_err(|_| ParseIdError { kind: "ModuleId" })
    }
}

impl FromStr for LessonId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(LessonId::new)
            .map_err(|_| ParseIdError { kind: "LessonId" })
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn module_id_display_and_parse() {
        let id: ModuleId = "3".parse().unwrap();
        assert_eq!(id, ModuleId::new(3));
        assert_eq!(id.to_string(), "3");
    }

    #[test]
    fn negative_ids_do_not_parse() {
        assert!("-1".parse::<ModuleId>().is_err());
        assert!("abc".parse::<LessonId>().is_err());
    }

    #[test]
    fn zero_is_not_positive() {
        assert!(!ModuleId::new(0).is_positive());
        assert!(LessonId::new(1).is_positive());
    }

    #[test]
    fn ids_serialize_as_plain_integers_and_keys() {
        let mut map = BTreeMap::new();
        map.insert(ModuleId::new(2), LessonId::new(7));
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"2":7}"#);

        let back: BTreeMap<ModuleId, LessonId> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn blank_skill_ids_are_rejected() {
        assert!(SkillCategoryId::new("   ").is_none());
        assert_eq!(
            SkillCategoryId::new(" policy-modeling ").unwrap().as_str(),
            "policy-modeling"
        );
    }
}
