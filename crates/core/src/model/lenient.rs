//! Tolerant readers for the numeric fields of stored records.
//!
//! Records may have been written by other clients with fractional or
//! negative numbers. Those are rounded and clamped into range so one odd
//! field never discards the rest of the record.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::model::ids::SkillCategoryId;
use crate::model::profile::MAX_SKILL_LEVEL;
use crate::model::progress::MAX_QUIZ_SCORE;

#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl Number {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn to_u64(self) -> u64 {
        match self {
            Number::Unsigned(value) => value,
            Number::Signed(value) => u64::try_from(value).unwrap_or(0),
            // `as` saturates at u64::MAX.
            Number::Float(value) if value.is_finite() && value > 0.0 => value.round() as u64,
            Number::Float(_) => 0,
        }
    }

    fn clamp_to(self, max: u8) -> u8 {
        u8::try_from(self.to_u64()).map_or(max, |value| value.min(max))
    }
}

/// Non-negative whole seconds.
///
/// # Errors
///
/// Fails only when the value is not a number.
pub fn seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Number::deserialize(deserializer).map(Number::to_u64)
}

/// Quiz score in `0..=100`.
///
/// # Errors
///
/// Fails only when the value is not a number.
pub fn quiz_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    Number::deserialize(deserializer).map(|n| n.clamp_to(MAX_QUIZ_SCORE))
}

/// `"{moduleId}-{lessonId}"` → seconds map.
///
/// # Errors
///
/// Fails when the value is not an object of numbers.
pub fn seconds_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Number>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(key, n)| (key, n.to_u64())).collect())
}

/// Skill category → level in `0..=10`.
///
/// # Errors
///
/// Fails when the value is not an object of numbers keyed by valid skill ids.
pub fn skill_levels<'de, D>(deserializer: D) -> Result<BTreeMap<SkillCategoryId, u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<SkillCategoryId, Number>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(skill, n)| (skill, n.clamp_to(MAX_SKILL_LEVEL)))
        .collect())
}
