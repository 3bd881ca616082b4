// crates/tool-bridge-core/src/runtime/authz.rs
// ============================================================================
// Module: Authorization Pre-Filter
// Description: Evaluates declared requirements before an operation runs.
// Purpose: Enforce anonymous override, authentication, and AND-combined requirements.
// Dependencies: crate::{core, interfaces}, serde, thiserror, tokio, tokio-util
// ============================================================================

//! ## Overview
//! The pre-filter runs once per invocation:
//! 1. An anonymous operation is allowed with no oracle calls.
//! 2. An operation without requirements is allowed with no oracle calls.
//! 3. Otherwise authentication is checked exactly once.
//! 4. Every requirement is checked in order; the first failure denies.
//!
//! Oracle failures and cancellation are errors, never decisions. A denial
//! is an ordinary value; the protocol boundary decides how to surface it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::core::AuthorizationRequirement;
use crate::core::OperationDescriptor;
use crate::interfaces::AuthOracle;
use crate::interfaces::CallerContext;
use crate::interfaces::OracleError;

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Why an invocation was allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowReason {
    /// Operation or its group is anonymous.
    Anonymous,
    /// Operation declares no requirements.
    NoRequirements,
    /// Caller is authenticated and every requirement passed.
    RequirementsSatisfied,
    /// Authorization enforcement is disabled.
    EnforcementDisabled,
}

impl AllowReason {
    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::NoRequirements => "no_requirements",
            Self::RequirementsSatisfied => "requirements_satisfied",
            Self::EnforcementDisabled => "enforcement_disabled",
        }
    }
}

/// Why an invocation was denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenyReason {
    /// Caller is not authenticated.
    AuthenticationRequired,
    /// Policy oracle returned false for this policy.
    PolicyDenied {
        /// Policy name.
        policy: String,
    },
    /// Caller holds none of the required roles.
    RoleDenied {
        /// Acceptable role names.
        roles: BTreeSet<String>,
    },
}

/// Pre-filter verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "detail", rename_all = "snake_case")]
pub enum AuthzDecision {
    /// Invocation may proceed.
    Allow(AllowReason),
    /// Invocation must not proceed.
    Deny(DenyReason),
}

impl AuthzDecision {
    /// Returns true for allow decisions.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }
}

/// Pre-filter failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// An oracle call failed.
    #[error("authorization oracle fault: {0}")]
    OracleFault(String),
    /// The request was cancelled during evaluation.
    #[error("authorization cancelled")]
    Cancelled,
}

impl From<OracleError> for AuthzError {
    fn from(err: OracleError) -> Self {
        Self::OracleFault(err.to_string())
    }
}

// ============================================================================
// SECTION: Pre-Filter
// ============================================================================

/// Evaluates operation requirements against host oracles.
#[derive(Clone)]
pub struct AuthorizationPreFilter {
    /// Authentication and policy oracle.
    oracle: Arc<dyn AuthOracle>,
    /// When false every invocation is allowed.
    enforce: bool,
}

impl AuthorizationPreFilter {
    /// Creates an enforcing pre-filter.
    #[must_use]
    pub fn new(oracle: Arc<dyn AuthOracle>) -> Self {
        Self {
            oracle,
            enforce: true,
        }
    }

    /// Returns a copy with enforcement switched on or off.
    #[must_use]
    pub fn with_enforcement(mut self, enforce: bool) -> Self {
        self.enforce = enforce;
        self
    }

    /// Returns whether requirements are enforced.
    #[must_use]
    pub const fn enforces(&self) -> bool {
        self.enforce
    }

    /// Evaluates `descriptor` for `caller`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::OracleFault`] when an oracle fails and
    /// [`AuthzError::Cancelled`] when `cancel` fires first.
    pub async fn evaluate(
        &self,
        descriptor: &OperationDescriptor,
        caller: &CallerContext,
        cancel: &CancellationToken,
    ) -> Result<AuthzDecision, AuthzError> {
        if !self.enforce {
            return Ok(AuthzDecision::Allow(AllowReason::EnforcementDisabled));
        }
        if descriptor.allow_anonymous {
            return Ok(AuthzDecision::Allow(AllowReason::Anonymous));
        }
        if descriptor.requirements.is_empty() {
            return Ok(AuthzDecision::Allow(AllowReason::NoRequirements));
        }
        let authenticated = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AuthzError::Cancelled),
            result = self.oracle.is_authenticated(caller) => result?,
        };
        if !authenticated {
            return Ok(AuthzDecision::Deny(DenyReason::AuthenticationRequired));
        }
        for requirement in &descriptor.requirements {
            if let Some(denied) = self.check(requirement, caller, cancel).await? {
                return Ok(AuthzDecision::Deny(denied));
            }
        }
        Ok(AuthzDecision::Allow(AllowReason::RequirementsSatisfied))
    }

    /// Checks one requirement; returns the deny reason when it fails.
    async fn check(
        &self,
        requirement: &AuthorizationRequirement,
        caller: &CallerContext,
        cancel: &CancellationToken,
    ) -> Result<Option<DenyReason>, AuthzError> {
        if let Some(policy) = &requirement.policy {
            let passed = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(AuthzError::Cancelled),
                result = self.oracle.check_policy(caller, policy) => result?,
            };
            if !passed {
                return Ok(Some(DenyReason::PolicyDenied {
                    policy: policy.clone(),
                }));
            }
        }
        if let Some(roles) = &requirement.roles
            && !caller.has_any_role(roles)
        {
            return Ok(Some(DenyReason::RoleDenied {
                roles: roles.clone(),
            }));
        }
        Ok(None)
    }
}
