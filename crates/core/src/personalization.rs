//! Role-based module ordering and weighting.
//!
//! The tables are static: a role maps to a preferred visiting order and to a
//! 0..=10 importance weight per module. Learners without a recognised role
//! get the curriculum's natural ascending order.

use std::fmt;
use std::str::FromStr;

use crate::model::{ModuleId, ProgressDocument, SkillCategoryId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Developer,
    Architect,
    SecurityAdmin,
    BusinessAnalyst,
    ProductManager,
    Executive,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Developer,
        Role::Architect,
        Role::SecurityAdmin,
        Role::BusinessAnalyst,
        Role::ProductManager,
        Role::Executive,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Developer => "developer",
            Role::Architect => "architect",
            Role::SecurityAdmin => "security-admin",
            Role::BusinessAnalyst => "business-analyst",
            Role::ProductManager => "product-manager",
            Role::Executive => "executive",
        }
    }

    /// Parses the free-form role stored on a profile. Unknown or blank
    /// values yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
    }

    fn sequence(self) -> [u64; 6] {
        match self {
            Role::Developer => [1, 4, 2, 3, 5, 6],
            Role::Architect => [1, 3, 2, 4, 5, 6],
            Role::SecurityAdmin => [1, 2, 6, 3, 5, 4],
            Role::BusinessAnalyst => [1, 2, 5, 6, 3, 4],
            Role::ProductManager => [1, 6, 2, 4, 3, 5],
            Role::Executive => [1, 6, 2, 5, 3, 4],
        }
    }

    // Weight of modules 1..=6.
    fn weights(self) -> [u8; 6] {
        match self {
            Role::Developer => [8, 7, 6, 10, 7, 4],
            Role::Architect => [9, 9, 9, 8, 8, 6],
            Role::SecurityAdmin => [8, 10, 7, 5, 7, 9],
            Role::BusinessAnalyst => [7, 9, 4, 3, 8, 7],
            Role::ProductManager => [8, 7, 5, 6, 5, 9],
            Role::Executive => [9, 6, 3, 2, 5, 10],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for parsing a role from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError(String);

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseRoleError(s.to_string()))
    }
}

/// How strongly a module matters for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Importance {
    None,
    Low,
    Medium,
    High,
}

impl Importance {
    /// Maps a 0..=10 weight: ≥9 high, ≥7 medium, ≥5 low, otherwise none.
    #[must_use]
    pub fn from_weight(weight: u8) -> Self {
        match weight {
            9.. => Importance::High,
            7..=8 => Importance::Medium,
            5..=6 => Importance::Low,
            _ => Importance::None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Importance::None => "none",
            Importance::Low => "low",
            Importance::Medium => "medium",
            Importance::High => "high",
        }
    }
}

/// Module visiting order for a role.
///
/// A known role gets its static sequence restricted to `module_ids`, with any
/// curriculum modules the sequence does not mention appended in ascending
/// order. Without a role the order is `module_ids` ascending.
#[must_use]
pub fn derive_order(role: Option<Role>, module_ids: &[ModuleId]) -> Vec<ModuleId> {
    let mut natural = module_ids.to_vec();
    natural.sort_unstable();
    natural.dedup();

    let Some(role) = role else {
        return natural;
    };

    let mut order: Vec<ModuleId> = role
        .sequence()
        .into_iter()
        .map(ModuleId::new)
        .filter(|id| natural.contains(id))
        .collect();
    for id in natural {
        if !order.contains(&id) {
            order.push(id);
        }
    }
    order
}

/// First module in `order` that is not completed. When everything is
/// completed this is the last module of `order`, so the UI always has a
/// module to highlight. `None` only for an empty order.
#[must_use]
pub fn current_module(order: &[ModuleId], doc: &ProgressDocument) -> Option<ModuleId> {
    order
        .iter()
        .copied()
        .find(|id| !doc.is_module_completed(*id))
        .or_else(|| order.last().copied())
}

/// Module after the current one in `order`, used for continue navigation.
#[must_use]
pub fn next_module(order: &[ModuleId], doc: &ProgressDocument) -> Option<ModuleId> {
    let current = current_module(order, doc)?;
    let idx = order.iter().position(|id| *id == current)?;
    order.get(idx + 1).copied()
}

/// Static 0..=10 weight of a module for a role. Unknown roles and modules
/// outside the table weigh 0.
#[must_use]
pub fn weight(role: Option<Role>, module_id: ModuleId) -> u8 {
    let Some(role) = role else {
        return 0;
    };
    let Some(idx) = module_id
        .value()
        .checked_sub(1)
        .and_then(|idx| usize::try_from(idx).ok())
    else {
        return 0;
    };
    role.weights().get(idx).copied().unwrap_or(0)
}

#[must_use]
pub fn importance(role: Option<Role>, module_id: ModuleId) -> Importance {
    Importance::from_weight(weight(role, module_id))
}

/// Skill categories a module trains, raised when the module completes.
#[must_use]
pub fn module_skills(module_id: ModuleId) -> Vec<SkillCategoryId> {
    let ids: &[&str] = match module_id.value() {
        1 => &["authorization-fundamentals"],
        2 => &["policy-modeling"],
        3 => &["identity-integration"],
        4 => &["api-authorization", "policy-modeling"],
        5 => &["data-authorization"],
        6 => &["governance"],
        _ => &[],
    };
    ids.iter().filter_map(|id| SkillCategoryId::new(*id)).collect()
}
