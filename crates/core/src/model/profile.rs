use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ModuleId, SkillCategoryId};
use crate::model::lenient;

/// Upper bound for a skill level.
pub const MAX_SKILL_LEVEL: u8 = 10;

/// A profile lists at most this many learning goals.
pub const MAX_LEARNING_GOALS: usize = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("at most {max} learning goals may be selected, got {got}")]
    TooManyGoals { max: usize, got: usize },
}

/// Learner profile used for personalization, stored under
/// `plainidUserProfile`.
///
/// Fields are public for reads; writes that must respect the goal and
/// skill bounds go through [`ProfileDraft::validate`], [`UserProfile::set_skill_level`]
/// and [`UserProfile::raise_skill`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub learning_goals: BTreeSet<String>,
    #[serde(default)]
    pub learning_style: String,
    #[serde(default)]
    pub completed_modules: BTreeSet<ModuleId>,
    #[serde(default, deserialize_with = "lenient::skill_levels")]
    pub skill_levels: BTreeMap<SkillCategoryId, u8>,
}

impl UserProfile {
    /// Repairs a profile read from storage so it satisfies the goal and
    /// skill bounds again.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        if self.learning_goals.len() > MAX_LEARNING_GOALS {
            self.learning_goals = self
                .learning_goals
                .into_iter()
                .take(MAX_LEARNING_GOALS)
                .collect();
        }
        for level in self.skill_levels.values_mut() {
            *level = (*level).min(MAX_SKILL_LEVEL);
        }
        self
    }

    #[must_use]
    pub fn skill_level(&self, skill: &SkillCategoryId) -> u8 {
        self.skill_levels.get(skill).copied().unwrap_or(0)
    }

    /// Sets a skill level, clamped to `0..=10`.
    pub fn set_skill_level(&mut self, skill: SkillCategoryId, level: u8) {
        self.skill_levels.insert(skill, level.min(MAX_SKILL_LEVEL));
    }

    /// Raises a skill by `delta`, saturating at the maximum level.
    pub fn raise_skill(&mut self, skill: SkillCategoryId, delta: u8) {
        let level = self.skill_level(&skill).saturating_add(delta);
        self.set_skill_level(skill, level);
    }

    /// Records a finished module. Returns false if it was already recorded.
    pub fn mark_module_completed(&mut self, module_id: ModuleId) -> bool {
        self.completed_modules.insert(module_id)
    }

    /// True when the onboarding questions have all been answered.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.role.is_empty()
            && !self.industry.is_empty()
            && !self.experience.is_empty()
            && !self.learning_goals.is_empty()
    }
}

/// Unvalidated profile input, typically collected from onboarding.
///
/// Progress-derived fields (`completed_modules`, `skill_levels`) are carried
/// over from the existing profile by the caller.
#[derive(Clone, Debug, Default)]
pub struct ProfileDraft {
    pub role: String,
    pub industry: String,
    pub experience: String,
    pub learning_goals: Vec<String>,
    pub learning_style: String,
    pub completed_modules: BTreeSet<ModuleId>,
    pub skill_levels: BTreeMap<SkillCategoryId, u8>,
}

impl ProfileDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a draft from an existing profile.
    #[must_use]
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            role: profile.role.clone(),
            industry: profile.industry.clone(),
            experience: profile.experience.clone(),
            learning_goals: profile.learning_goals.iter().cloned().collect(),
            learning_style: profile.learning_style.clone(),
            completed_modules: profile.completed_modules.clone(),
            skill_levels: profile.skill_levels.clone(),
        }
    }

    /// Validate and normalize the draft into a profile.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::TooManyGoals` if more than three distinct,
    /// non-blank learning goals are given.
    pub fn validate(self) -> Result<UserProfile, ProfileError> {
        let learning_goals: BTreeSet<String> = self
            .learning_goals
            .into_iter()
            .map(|goal| goal.trim().to_string())
            .filter(|goal| !goal.is_empty())
            .collect();
        if learning_goals.len() > MAX_LEARNING_GOALS {
            return Err(ProfileError::TooManyGoals {
                max: MAX_LEARNING_GOALS,
                got: learning_goals.len(),
            });
        }

        let skill_levels = self
            .skill_levels
            .into_iter()
            .map(|(skill, level)| (skill, level.min(MAX_SKILL_LEVEL)))
            .collect();

        Ok(UserProfile {
            role: normalize(self.role),
            industry: normalize(self.industry),
            experience: normalize(self.experience),
            learning_goals,
            learning_style: normalize(self.learning_style),
            completed_modules: self.completed_modules,
            skill_levels,
        })
    }
}

fn normalize(value: String) -> String {
    value.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(id: &str) -> SkillCategoryId {
        SkillCategoryId::new(id).unwrap()
    }

    #[test]
    fn stored_skill_levels_are_rounded_and_clamped() {
        let json = r#"{"role": "developer", "skillLevels": {"apis": 2.6, "policies": 14, "governance": -1}}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();

        assert_eq!(profile.role, "developer");
        assert_eq!(profile.skill_level(&skill("apis")), 3);
        assert_eq!(profile.skill_level(&skill("policies")), MAX_SKILL_LEVEL);
        assert_eq!(profile.skill_level(&skill("governance")), 0);
    }

    #[test]
    fn validate_trims_and_dedups_goals() {
        let profile = ProfileDraft {
            role: "  developer ".into(),
            learning_goals: vec!["apis".into(), " apis ".into(), "".into(), "policies".into()],
            ..ProfileDraft::default()
        }
        .validate()
        .unwrap();

        assert_eq!(profile.role, "developer");
        assert_eq!(profile.learning_goals.len(), 2);
    }

    #[test]
    fn validate_rejects_a_fourth_goal() {
        let err = ProfileDraft {
            learning_goals: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            ..ProfileDraft::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ProfileError::TooManyGoals { max: 3, got: 4 });
    }

    #[test]
    fn skill_levels_stay_in_bounds() {
        let mut profile = UserProfile::default();
        profile.set_skill_level(skill("authz"), 42);
        assert_eq!(profile.skill_level(&skill("authz")), 10);

        profile.set_skill_level(skill("apis"), 9);
        profile.raise_skill(skill("apis"), 5);
        assert_eq!(profile.skill_level(&skill("apis")), 10);

        let mut draft = ProfileDraft::new();
        draft.skill_levels.insert(skill("policy"), 200);
        let validated = draft.validate().unwrap();
        assert_eq!(validated.skill_level(&skill("policy")), 10);
    }

    #[test]
    fn normalize_repairs_stored_profiles() {
        let raw = r#"{"role":"architect","learningGoals":["a","b","c","d"],"skillLevels":{"apis":15}}"#;
        let profile: UserProfile = serde_json::from_str(raw).unwrap();
        let profile = profile.normalize();
        assert_eq!(profile.learning_goals.len(), 3);
        assert_eq!(profile.skill_level(&skill("apis")), 10);
    }

    #[test]
    fn completion_of_onboarding() {
        let mut profile = UserProfile {
            role: "developer".into(),
            industry: "finance".into(),
            experience: "intermediate".into(),
            ..UserProfile::default()
        };
        assert!(!profile.is_complete());
        profile.learning_goals.insert("apis".into());
        assert!(profile.is_complete());
    }

    #[test]
    fn marking_a_module_twice_reports_no_change() {
        let mut profile = UserProfile::default();
        assert!(profile.mark_module_completed(ModuleId::new(2)));
        assert!(!profile.mark_module_completed(ModuleId::new(2)));
    }
}
