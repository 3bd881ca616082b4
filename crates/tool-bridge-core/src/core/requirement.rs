// crates/tool-bridge-core/src/core/requirement.rs
// ============================================================================
// Module: Authorization Requirements
// Description: Declarative authorization conditions attached to operations.
// Purpose: Carry policy and role-set requirements from registration to the pre-filter.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A requirement is either a plain authentication marker, a named policy, a
//! set of acceptable role names, or a policy plus a role set (both must
//! pass). Requirements are collected, never merged or discarded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Declared authorization condition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthorizationRequirement {
    /// Policy name checked through the policy oracle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    /// Role names; the caller must hold at least one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<BTreeSet<String>>,
}

/// Malformed requirement metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequirementError {
    /// Policy name is empty or whitespace.
    #[error("requirement policy name is blank")]
    BlankPolicy,
    /// Role set contains no names.
    #[error("requirement role set is empty")]
    EmptyRoleSet,
    /// Role set contains an empty or whitespace name.
    #[error("requirement role set contains a blank role name")]
    BlankRole,
}

// ============================================================================
// SECTION: Constructors
// ============================================================================

impl AuthorizationRequirement {
    /// Plain "must be authenticated" marker.
    #[must_use]
    pub const fn authenticated() -> Self {
        Self {
            policy: None,
            roles: None,
        }
    }

    /// Requirement satisfied by the named policy.
    #[must_use]
    pub fn policy(name: impl Into<String>) -> Self {
        Self {
            policy: Some(name.into()),
            roles: None,
        }
    }

    /// Requirement satisfied when the caller holds any of `names`.
    #[must_use]
    pub fn any_role<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            policy: None,
            roles: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    /// Adds a role set to this requirement.
    #[must_use]
    pub fn and_roles<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Returns true when the requirement only demands authentication.
    #[must_use]
    pub const fn is_plain(&self) -> bool {
        self.policy.is_none() && self.roles.is_none()
    }

    /// Checks the requirement metadata for blank names and empty sets.
    ///
    /// # Errors
    ///
    /// Returns [`RequirementError`] when the metadata is malformed.
    pub fn validate(&self) -> Result<(), RequirementError> {
        if let Some(policy) = &self.policy
            && policy.trim().is_empty()
        {
            return Err(RequirementError::BlankPolicy);
        }
        if let Some(roles) = &self.roles {
            if roles.is_empty() {
                return Err(RequirementError::EmptyRoleSet);
            }
            if roles.iter().any(|role| role.trim().is_empty()) {
                return Err(RequirementError::BlankRole);
            }
        }
        Ok(())
    }
}

impl fmt::Display for AuthorizationRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.policy, &self.roles) {
            (None, None) => f.write_str("authenticated"),
            (Some(policy), None) => write!(f, "policy:{policy}"),
            (None, Some(roles)) => write!(f, "roles:{}", join_roles(roles)),
            (Some(policy), Some(roles)) => {
                write!(f, "policy:{policy}+roles:{}", join_roles(roles))
            }
        }
    }
}

/// Joins role names with `|` for display.
fn join_roles(roles: &BTreeSet<String>) -> String {
    roles.iter().map(String::as_str).collect::<Vec<_>>().join("|")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
