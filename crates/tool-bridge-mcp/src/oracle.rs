// crates/tool-bridge-mcp/src/oracle.rs
// ============================================================================
// Module: Claims Oracle
// Description: Config-driven authentication and policy oracle.
// Purpose: Answer bridge oracle queries from caller role claims.
// Dependencies: tool-bridge-config, tool-bridge-core, async-trait
// ============================================================================

//! ## Overview
//! [`ClaimsOracle`] implements both [`AuthOracle`] and [`RoleResolver`] over
//! the configured policy set. It only reads the [`CallerContext`] it is
//! given, so it is safe to share across concurrent requests.
//!
//! ## Invariants
//! - A policy name that is not configured is an [`OracleError`], never a deny.
//! - The resolved role is the highest known role among the caller's claims.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use async_trait::async_trait;
use tool_bridge_config::PolicyConfig;
use tool_bridge_core::AuthOracle;
use tool_bridge_core::CallerContext;
use tool_bridge_core::OracleError;
use tool_bridge_core::RoleLevel;
use tool_bridge_core::RoleResolver;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Evaluation rule for a named policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyRule {
    /// Caller's resolved role must be at least this level.
    MinimumRole(RoleLevel),
    /// Caller must hold at least one of these role names.
    AnyRole(BTreeSet<String>),
}

impl PolicyRule {
    /// Evaluates the rule for a caller.
    fn admits(&self, caller: &CallerContext) -> bool {
        match self {
            Self::MinimumRole(level) => highest_role(caller).is_some_and(|role| role >= *level),
            Self::AnyRole(roles) => caller.has_any_role(roles),
        }
    }
}

/// Oracle backed by caller claims and configured policies.
#[derive(Debug, Clone, Default)]
pub struct ClaimsOracle {
    /// Policies keyed by name.
    policies: BTreeMap<String, PolicyRule>,
}

impl ClaimsOracle {
    /// Creates an oracle with no policies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a policy rule.
    #[must_use]
    pub fn with_policy(mut self, name: impl Into<String>, rule: PolicyRule) -> Self {
        self.policies.insert(name.into(), rule);
        self
    }

    /// Builds the oracle from validated policy configuration.
    #[must_use]
    pub fn from_config(policies: &[PolicyConfig]) -> Self {
        let policies = policies
            .iter()
            .map(|policy| {
                let rule = policy.minimum_role.map_or_else(
                    || PolicyRule::AnyRole(policy.any_role.iter().cloned().collect()),
                    PolicyRule::MinimumRole,
                );
                (policy.name.clone(), rule)
            })
            .collect();
        Self {
            policies,
        }
    }

    /// Returns the configured policy names.
    pub fn policy_names(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }
}

#[async_trait]
impl AuthOracle for ClaimsOracle {
    async fn is_authenticated(&self, caller: &CallerContext) -> Result<bool, OracleError> {
        Ok(caller.authenticated)
    }

    async fn check_policy(
        &self,
        caller: &CallerContext,
        policy: &str,
    ) -> Result<bool, OracleError> {
        let rule = self
            .policies
            .get(policy)
            .ok_or_else(|| OracleError::UnknownPolicy(policy.to_string()))?;
        Ok(rule.admits(caller))
    }
}

#[async_trait]
impl RoleResolver for ClaimsOracle {
    async fn resolve_role(&self, caller: &CallerContext) -> Result<Option<RoleLevel>, OracleError> {
        if !caller.authenticated {
            return Ok(None);
        }
        Ok(highest_role(caller))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Highest role level named in the caller's role claims.
fn highest_role(caller: &CallerContext) -> Option<RoleLevel> {
    caller.roles.iter().filter_map(|role| RoleLevel::parse(role)).max()
}
