// crates/tool-bridge-core/src/runtime/bridge.rs
// ============================================================================
// Module: Tool Bridge Facade
// Description: Protocol-neutral catalog listing and invocation.
// Purpose: Chain lookup, pre-filter, activation, execution, and normalization.
// Dependencies: crate::{core, interfaces, runtime}, serde, thiserror, tokio-util
// ============================================================================

//! ## Overview
//! [`ToolBridge`] is what a transport talks to. `catalog` resolves the
//! caller's identity and filters the registry; `invoke` looks the operation
//! up, runs the pre-filter, creates a fresh [`InvocationScope`], runs the
//! operation and normalizes its return. Each step that may wait observes
//! the request's cancellation token.
//!
//! ## Invariants
//! - Bound operations are activated only after the pre-filter allows.
//! - A denied invocation never runs the operation.
//! - Marshalling failures surface as errors, never as empty values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::core::NormalizedResult;
use crate::core::OperationCall;
use crate::core::OperationDescriptor;
use crate::core::OperationError;
use crate::core::rename_fields;
use crate::interfaces::AuthOracle;
use crate::interfaces::CallerContext;
use crate::interfaces::RoleResolver;
use crate::runtime::authz::AllowReason;
use crate::runtime::authz::AuthorizationPreFilter;
use crate::runtime::authz::AuthzDecision;
use crate::runtime::authz::AuthzError;
use crate::runtime::authz::DenyReason;
use crate::runtime::normalizer::normalize;
use crate::runtime::registry::OperationRegistry;
use crate::runtime::scope::InvocationScope;
use crate::runtime::scope::ScopeClock;
use crate::runtime::visibility::CallerIdentity;
use crate::runtime::visibility::is_visible;
use crate::runtime::visibility::resolve_identity;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Invocation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    /// No operation with this canonical name.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    /// Caller is not authenticated.
    #[error("authentication required")]
    AuthenticationRequired,
    /// A requirement failed.
    #[error("requirement denied: {requirement}")]
    PolicyDenied {
        /// Failing requirement, for internal logs only.
        requirement: String,
    },
    /// A failure outcome reached the normalizer.
    #[error("Controller returned error result: {outcome_kind}")]
    MarshallingFailure {
        /// Outcome kind name.
        outcome_kind: String,
    },
    /// An oracle failed.
    #[error("authorization oracle fault: {0}")]
    OracleFault(String),
    /// Arguments were rejected by the operation.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// The operation failed.
    #[error("operation failed: {0}")]
    OperationFailed(String),
    /// The request was cancelled.
    #[error("request cancelled")]
    Cancelled,
}

impl InvokeError {
    /// Returns a stable kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownOperation(_) => "unknown_operation",
            Self::AuthenticationRequired => "authentication_required",
            Self::PolicyDenied { .. } => "policy_denied",
            Self::MarshallingFailure { .. } => "marshalling_failure",
            Self::OracleFault(_) => "oracle_fault",
            Self::InvalidArguments(_) => "invalid_arguments",
            Self::OperationFailed(_) => "operation_failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true for authentication and requirement denials.
    #[must_use]
    pub const fn is_access_denied(&self) -> bool {
        matches!(self, Self::AuthenticationRequired | Self::PolicyDenied { .. })
    }
}

impl From<AuthzError> for InvokeError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::OracleFault(detail) => Self::OracleFault(detail),
            AuthzError::Cancelled => Self::Cancelled,
        }
    }
}

impl From<OperationError> for InvokeError {
    fn from(err: OperationError) -> Self {
        match err {
            OperationError::InvalidArguments(detail) => Self::InvalidArguments(detail),
            OperationError::Failed(detail) => Self::OperationFailed(detail),
            OperationError::Cancelled => Self::Cancelled,
        }
    }
}

impl From<DenyReason> for InvokeError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::AuthenticationRequired => Self::AuthenticationRequired,
            DenyReason::PolicyDenied { policy } => Self::PolicyDenied {
                requirement: format!("policy:{policy}"),
            },
            DenyReason::RoleDenied { roles } => Self::PolicyDenied {
                requirement: format!(
                    "roles:{}",
                    roles.iter().map(String::as_str).collect::<Vec<_>>().join("|")
                ),
            },
        }
    }
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Bridge behavior toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeSettings {
    /// Run the pre-filter before invocations.
    pub enforce_authorization: bool,
    /// Apply the registry naming convention to payload object keys.
    pub rename_fields: bool,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            enforce_authorization: true,
            rename_fields: false,
        }
    }
}

/// Successful invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invoked {
    /// Canonical operation name.
    pub operation: String,
    /// Normalized payload (null for void completions).
    pub payload: Value,
    /// False for void completions.
    pub present: bool,
    /// Scope the invocation ran in.
    pub scope: InvocationScope,
    /// Why the pre-filter allowed the call.
    pub allowed: AllowReason,
}

// ============================================================================
// SECTION: Bridge
// ============================================================================

/// Protocol-neutral tool bridge.
#[derive(Clone)]
pub struct ToolBridge {
    /// Sealed operation catalog.
    registry: OperationRegistry,
    /// Authorization pre-filter.
    prefilter: AuthorizationPreFilter,
    /// Authentication oracle for catalog identity.
    oracle: Arc<dyn AuthOracle>,
    /// Role resolver for catalog identity.
    resolver: Arc<dyn RoleResolver>,
    /// Scope source.
    clock: Arc<ScopeClock>,
    /// Behavior toggles.
    settings: BridgeSettings,
}

impl ToolBridge {
    /// Creates a bridge over a sealed registry.
    #[must_use]
    pub fn new(
        registry: OperationRegistry,
        oracle: Arc<dyn AuthOracle>,
        resolver: Arc<dyn RoleResolver>,
        settings: BridgeSettings,
    ) -> Self {
        let prefilter = AuthorizationPreFilter::new(Arc::clone(&oracle))
            .with_enforcement(settings.enforce_authorization);
        Self {
            registry,
            prefilter,
            oracle,
            resolver,
            clock: Arc::new(ScopeClock::new()),
            settings,
        }
    }

    /// Returns the registry.
    #[must_use]
    pub const fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Returns the behavior toggles.
    #[must_use]
    pub const fn settings(&self) -> BridgeSettings {
        self.settings
    }

    /// Resolves the caller's identity for this request.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::OracleFault`] or [`InvokeError::Cancelled`].
    pub async fn identify(
        &self,
        caller: &CallerContext,
        cancel: &CancellationToken,
    ) -> Result<CallerIdentity, InvokeError> {
        Ok(resolve_identity(caller, self.oracle.as_ref(), self.resolver.as_ref(), cancel).await?)
    }

    /// Lists the operations visible to `caller`, in canonical-name order.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::OracleFault`] or [`InvokeError::Cancelled`].
    pub async fn catalog(
        &self,
        caller: &CallerContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<&OperationDescriptor>, InvokeError> {
        let identity = self.identify(caller, cancel).await?;
        Ok(self
            .registry
            .iter()
            .filter(|descriptor| is_visible(identity.resolved_role, descriptor))
            .collect())
    }

    /// Invokes an operation by canonical name.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError`] for unknown operations, denials, oracle
    /// faults, operation failures, marshalling failures, and cancellation.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Value,
        caller: &CallerContext,
        cancel: &CancellationToken,
    ) -> Result<Invoked, InvokeError> {
        let descriptor = self
            .registry
            .get(name)
            .ok_or_else(|| InvokeError::UnknownOperation(name.to_string()))?;
        let allowed = match self.prefilter.evaluate(descriptor, caller, cancel).await? {
            AuthzDecision::Allow(reason) => reason,
            AuthzDecision::Deny(reason) => return Err(reason.into()),
        };
        if cancel.is_cancelled() {
            return Err(InvokeError::Cancelled);
        }

        let scope = self.clock.next_scope();
        let call = OperationCall {
            arguments,
            caller: caller.clone(),
            cancel: cancel.clone(),
            scope,
        };
        let raw = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(InvokeError::Cancelled),
            result = descriptor.invoker.call(call) => result?,
        };
        match normalize(raw, cancel).await? {
            NormalizedResult::Value { payload, present } => {
                let payload = if self.settings.rename_fields {
                    rename_fields(payload, self.registry.naming())
                        .map_err(|err| InvokeError::OperationFailed(err.to_string()))?
                } else {
                    payload
                };
                Ok(Invoked {
                    operation: descriptor.name.clone(),
                    payload,
                    present,
                    scope,
                    allowed,
                })
            }
            NormalizedResult::MarshallingFailure { outcome_kind } => {
                Err(InvokeError::MarshallingFailure { outcome_kind })
            }
        }
    }
}
