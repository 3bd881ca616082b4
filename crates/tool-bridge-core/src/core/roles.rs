// crates/tool-bridge-core/src/core/roles.rs
// ============================================================================
// Module: Role Hierarchy
// Description: Ordered privilege levels and policy-to-level mapping.
// Purpose: Classify operations by the lowest role that may see them in listings.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Role levels form a closed total order. A [`PolicyRoleMap`] translates a
//! subset of policy names into levels; policies outside the map never
//! influence catalog visibility but still gate invocation in full.
//!
//! ## Invariants
//! - `Viewer < Member < Manager < Admin`, and higher permits everything lower permits.
//! - `MinimumRole::Unknown` is distinct from `MinimumRole::Unrestricted`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::requirement::AuthorizationRequirement;

// ============================================================================
// SECTION: Role Levels
// ============================================================================

/// Ordinal privilege tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoleLevel {
    /// Read-only caller.
    Viewer,
    /// Regular member.
    Member,
    /// Manager with elevated write access.
    Manager,
    /// Administrator.
    Admin,
}

impl RoleLevel {
    /// All levels, lowest first.
    pub const ALL: [Self; 4] = [Self::Viewer, Self::Member, Self::Manager, Self::Admin];

    /// Returns the stable role name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "Viewer",
            Self::Member => "Member",
            Self::Manager => "Manager",
            Self::Admin => "Admin",
        }
    }

    /// Returns the numeric rank (0 for the lowest level).
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Viewer => 0,
            Self::Member => 1,
            Self::Manager => 2,
            Self::Admin => 3,
        }
    }

    /// Parses a role name, returning `None` for names outside the hierarchy.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == name)
    }
}

impl fmt::Display for RoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role name is not part of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRoleError(pub String);

impl FromStr for RoleLevel {
    type Err = UnknownRoleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| UnknownRoleError(value.to_string()))
    }
}

// ============================================================================
// SECTION: Minimum Role
// ============================================================================

/// Listing classification for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "role", rename_all = "snake_case")]
pub enum MinimumRole {
    /// No visibility restriction beyond an authenticated caller.
    Unrestricted,
    /// Callers at or above this level may see the operation.
    Role(RoleLevel),
    /// Restricted by requirements that map to no level; hidden from listings.
    Unknown,
}

impl MinimumRole {
    /// Returns true when a caller at `level` may see the operation.
    #[must_use]
    pub fn admits(self, level: RoleLevel) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Role(minimum) => level >= minimum,
            Self::Unknown => false,
        }
    }
}

// ============================================================================
// SECTION: Policy Map
// ============================================================================

/// Static mapping from policy names to minimum role levels.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PolicyRoleMap {
    /// Mapped policies keyed by name.
    entries: BTreeMap<String, RoleLevel>,
}

impl PolicyRoleMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with `policy` mapped to `level`.
    #[must_use]
    pub fn with(mut self, policy: impl Into<String>, level: RoleLevel) -> Self {
        self.entries.insert(policy.into(), level);
        self
    }

    /// Builds the stock map: `RequireMember`, `RequireManager`, `RequireAdmin`.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with("RequireMember", RoleLevel::Member)
            .with("RequireManager", RoleLevel::Manager)
            .with("RequireAdmin", RoleLevel::Admin)
    }

    /// Returns the level mapped to `policy`, if any.
    #[must_use]
    pub fn level_for(&self, policy: &str) -> Option<RoleLevel> {
        self.entries.get(policy).copied()
    }

    /// Returns the number of mapped policies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no policies are mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Computes the listing classification for a set of requirements.
    ///
    /// The strictest mapped policy wins. Plain authentication markers carry
    /// no classification, so an operation guarded only by them is
    /// unrestricted for listing purposes.
    #[must_use]
    pub fn minimum_role(&self, requirements: &[AuthorizationRequirement]) -> MinimumRole {
        let mut strictest: Option<RoleLevel> = None;
        let mut classified = false;
        for requirement in requirements {
            if requirement.is_plain() {
                continue;
            }
            classified = true;
            if let Some(level) = requirement.policy.as_deref().and_then(|name| self.level_for(name))
            {
                strictest = Some(strictest.map_or(level, |current| current.max(level)));
            }
        }
        match (strictest, classified) {
            (Some(level), _) => MinimumRole::Role(level),
            (None, false) => MinimumRole::Unrestricted,
            (None, true) => MinimumRole::Unknown,
        }
    }
}

impl FromIterator<(String, RoleLevel)> for PolicyRoleMap {
    fn from_iter<T: IntoIterator<Item = (String, RoleLevel)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use super::MinimumRole;
    use super::PolicyRoleMap;
    use super::RoleLevel;
    use crate::core::requirement::AuthorizationRequirement;

    #[test]
    fn levels_are_totally_ordered() {
        assert!(RoleLevel::Viewer < RoleLevel::Member);
        assert!(RoleLevel::Member < RoleLevel::Manager);
        assert!(RoleLevel::Manager < RoleLevel::Admin);
        assert_eq!(RoleLevel::Admin.rank(), 3);
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert_eq!(RoleLevel::parse("Manager"), Some(RoleLevel::Manager));
        assert_eq!(RoleLevel::parse("manager"), None);
        assert!("Owner".parse::<RoleLevel>().is_err());
    }

    #[test]
    fn strictest_mapped_policy_wins() {
        let map = PolicyRoleMap::standard();
        let requirements = vec![
            AuthorizationRequirement::policy("RequireAdmin"),
            AuthorizationRequirement::policy("RequireMember"),
        ];
        assert_eq!(map.minimum_role(&requirements), MinimumRole::Role(RoleLevel::Admin));
    }

    #[test]
    fn unmapped_policy_is_unknown_not_unrestricted() {
        let map = PolicyRoleMap::standard();
        let requirements = vec![AuthorizationRequirement::policy("RequireAuditor")];
        assert_eq!(map.minimum_role(&requirements), MinimumRole::Unknown);
        assert_eq!(map.minimum_role(&[]), MinimumRole::Unrestricted);
    }

    #[test]
    fn plain_authentication_markers_do_not_classify() {
        let map = PolicyRoleMap::standard();
        let requirements = vec![AuthorizationRequirement::authenticated()];
        assert_eq!(map.minimum_role(&requirements), MinimumRole::Unrestricted);
    }

    #[test]
    fn unknown_minimum_role_admits_nobody() {
        for level in RoleLevel::ALL {
            assert!(!MinimumRole::Unknown.admits(level));
            assert!(MinimumRole::Unrestricted.admits(level));
        }
    }
}
