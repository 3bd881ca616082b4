// crates/tool-bridge-core/src/interfaces/mod.rs
// ============================================================================
// Module: Tool Bridge Interfaces
// Description: Host-supplied oracles and the per-request caller context.
// Purpose: Define the contract surfaces the bridge consults but never implements.
// Dependencies: async-trait, serde, thiserror
// ============================================================================

//! ## Overview
//! The bridge delegates every truth decision to host oracles. Caller
//! context is an explicit value threaded through each call; nothing in the
//! bridge reads ambient or thread-local request state. Oracles must be safe
//! to call concurrently and should fail closed on missing data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::roles::RoleLevel;

// ============================================================================
// SECTION: Caller Context
// ============================================================================

/// Per-request caller context resolved by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallerContext {
    /// Caller subject, when known.
    pub subject: Option<String>,
    /// Whether the transport authenticated the caller.
    pub authenticated: bool,
    /// Role claims.
    pub roles: BTreeSet<String>,
    /// Additional string claims.
    pub claims: BTreeMap<String, String>,
    /// Transport request identifier for correlation.
    pub request_id: Option<String>,
}

impl CallerContext {
    /// Unauthenticated caller with no claims.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Authenticated caller with the given subject and role claims.
    #[must_use]
    pub fn authenticated<I, S>(subject: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subject: Some(subject.into()),
            authenticated: true,
            roles: roles.into_iter().map(Into::into).collect(),
            claims: BTreeMap::new(),
            request_id: None,
        }
    }

    /// Returns a copy with a request identifier attached.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Returns a copy with an extra claim attached.
    #[must_use]
    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(key.into(), value.into());
        self
    }

    /// Returns true when the caller holds at least one of `roles`.
    #[must_use]
    pub fn has_any_role(&self, roles: &BTreeSet<String>) -> bool {
        roles.iter().any(|role| self.roles.contains(role))
    }
}

// ============================================================================
// SECTION: Oracles
// ============================================================================

/// Oracle failures. These are configuration or infrastructure faults and
/// never count as an allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// Policy name is not known to the oracle.
    #[error("unknown policy: {0}")]
    UnknownPolicy(String),
    /// Oracle backend failed.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

/// Authentication and policy oracle.
#[async_trait]
pub trait AuthOracle: Send + Sync {
    /// Returns whether the caller is authenticated.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when the check cannot be performed.
    async fn is_authenticated(&self, caller: &CallerContext) -> Result<bool, OracleError>;

    /// Returns whether the caller satisfies the named policy.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when the policy is unknown or the check fails.
    async fn check_policy(&self, caller: &CallerContext, policy: &str)
    -> Result<bool, OracleError>;
}

/// Resolves a caller's role level for catalog filtering.
#[async_trait]
pub trait RoleResolver: Send + Sync {
    /// Returns the caller's role level, or `None` when unresolved.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when resolution fails.
    async fn resolve_role(&self, caller: &CallerContext) -> Result<Option<RoleLevel>, OracleError>;
}
