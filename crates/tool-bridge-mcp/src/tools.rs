// crates/tool-bridge-mcp/src/tools.rs
// ============================================================================
// Module: MCP Tool Router
// Description: Tool routing for the Tool Bridge MCP server.
// Purpose: Map MCP tool requests onto the protocol-neutral bridge.
// Dependencies: tool-bridge-core, serde
// ============================================================================

//! ## Overview
//! The tool router is a thin wrapper over [`ToolBridge`]. It renders the
//! visible catalog as MCP tool definitions, forwards calls, records the
//! invocation decision to the audit sink, and collapses every access denial
//! into one caller-facing error.
//! Security posture: tool inputs are untrusted; deny detail stays in the audit
//! log.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tool_bridge_core::CallerContext;
use tool_bridge_core::InvokeError;
use tool_bridge_core::Invoked;
use tool_bridge_core::OperationDescriptor;
use tool_bridge_core::ToolBridge;

use crate::audit::McpAuditSink;
use crate::audit::ToolAuthzEvent;
use crate::auth::AuthError;
use crate::auth::TOKEN_FINGERPRINT_CLAIM;

// ============================================================================
// SECTION: Tool Definitions
// ============================================================================

/// MCP tool definition as listed by `tools/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDefinition {
    /// Canonical tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema for arguments.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl From<&OperationDescriptor> for ToolDefinition {
    fn from(descriptor: &OperationDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            input_schema: descriptor.input_schema.clone(),
        }
    }
}

// ============================================================================
// SECTION: Tool Router
// ============================================================================

/// Tool router for MCP requests.
#[derive(Clone)]
pub struct ToolRouter {
    /// Protocol-neutral bridge.
    bridge: ToolBridge,
    /// Audit sink for invocation decisions.
    audit: Arc<dyn McpAuditSink>,
}

impl ToolRouter {
    /// Creates a new tool router.
    #[must_use]
    pub fn new(bridge: ToolBridge, audit: Arc<dyn McpAuditSink>) -> Self {
        Self {
            bridge,
            audit,
        }
    }

    /// Returns the underlying bridge.
    #[must_use]
    pub const fn bridge(&self) -> &ToolBridge {
        &self.bridge
    }

    /// Lists the tools visible to the caller, in canonical-name order.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when identity resolution fails or is cancelled.
    pub async fn list_tools(
        &self,
        caller: &CallerContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolDefinition>, ToolError> {
        let catalog = self.bridge.catalog(caller, cancel).await?;
        Ok(catalog.into_iter().map(ToolDefinition::from).collect())
    }

    /// Invokes a tool by name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when the tool is unknown, access is denied, or
    /// the invocation fails.
    pub async fn call_tool(
        &self,
        caller: &CallerContext,
        name: &str,
        arguments: Value,
        cancel: &CancellationToken,
    ) -> Result<Invoked, ToolError> {
        let result = self.bridge.invoke(name, arguments, caller, cancel).await;
        self.record_decision(caller, name, &result);
        result.map_err(ToolError::from)
    }

    /// Records the invocation decision when one was reached.
    fn record_decision(
        &self,
        caller: &CallerContext,
        name: &str,
        result: &Result<Invoked, InvokeError>,
    ) {
        let (decision, reason) = match result {
            Ok(invoked) => ("allow", invoked.allowed.as_str().to_string()),
            Err(err) if err.is_access_denied() => ("deny", err.to_string()),
            Err(err @ InvokeError::OracleFault(_)) => ("error", err.to_string()),
            Err(_) => return,
        };
        let fingerprint = caller.claims.get(TOKEN_FINGERPRINT_CLAIM).cloned();
        self.audit.record_authz(
            &ToolAuthzEvent::new(
                caller.request_id.clone(),
                name,
                caller.subject.clone(),
                decision,
                reason,
            )
            .with_token_fingerprint(fingerprint),
        );
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Caller-facing tool errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// Tool name not recognized.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// Missing or invalid authentication.
    #[error("unauthenticated")]
    Unauthenticated(String),
    /// Authentication or requirement denial; detail is audit-only.
    #[error("access denied")]
    AccessDenied,
    /// Arguments were rejected.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// A framework-level error outcome reached the normalizer.
    #[error("{0}")]
    MarshallingFailure(String),
    /// The operation failed.
    #[error("operation failed: {0}")]
    OperationFailed(String),
    /// Internal failure; detail is audit-only.
    #[error("internal error")]
    Internal(String),
    /// The request was cancelled.
    #[error("request cancelled")]
    Cancelled,
    /// Tool payload serialization failed.
    #[error("serialization failure")]
    Serialization,
}

impl ToolError {
    /// Returns a stable kind label, sent as `data.kind`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::AccessDenied => "access_denied",
            Self::InvalidParams(_) => "invalid_params",
            Self::MarshallingFailure(_) => "marshalling_failure",
            Self::OperationFailed(_) => "operation_failed",
            Self::Internal(_) => "internal",
            Self::Cancelled => "cancelled",
            Self::Serialization => "serialization",
        }
    }
}

impl From<InvokeError> for ToolError {
    fn from(err: InvokeError) -> Self {
        match err {
            InvokeError::UnknownOperation(name) => Self::UnknownTool(name),
            InvokeError::AuthenticationRequired | InvokeError::PolicyDenied { .. } => {
                Self::AccessDenied
            }
            err @ InvokeError::MarshallingFailure { .. } => {
                Self::MarshallingFailure(err.to_string())
            }
            InvokeError::OracleFault(detail) => Self::Internal(detail),
            InvokeError::InvalidArguments(detail) => Self::InvalidParams(detail),
            InvokeError::OperationFailed(detail) => Self::OperationFailed(detail),
            InvokeError::Cancelled => Self::Cancelled,
        }
    }
}

impl From<AuthError> for ToolError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated(detail) => Self::Unauthenticated(detail),
        }
    }
}
