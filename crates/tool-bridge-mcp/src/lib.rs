// crates/tool-bridge-mcp/src/lib.rs
// ============================================================================
// Module: Tool Bridge MCP
// Description: MCP server exposing registered host operations as tools.
// Purpose: Provide JSON-RPC transports, caller authentication, and audit hooks.
// Dependencies: tool-bridge-core, tool-bridge-config, axum, tokio
// ============================================================================

//! ## Overview
//! Tool Bridge MCP serves the operation registry over the Model Context
//! Protocol. Every `tools/call` goes through [`tool_bridge_core::ToolBridge`],
//! so listing and invocation share one registry, one pre-filter, and one
//! normalizer. Transport metadata is turned into an explicit
//! [`tool_bridge_core::CallerContext`] before any oracle is consulted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod oracle;
pub mod server;
pub mod telemetry;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::McpAuditEvent;
pub use audit::McpAuditSink;
pub use audit::McpFileAuditSink;
pub use audit::McpNoopAuditSink;
pub use audit::McpStderrAuditSink;
pub use audit::SecurityAuditEvent;
pub use audit::ToolAuthzEvent;
pub use auth::AuthContext;
pub use auth::AuthError;
pub use auth::AuthMethod;
pub use auth::CallerAuthn;
pub use auth::DefaultCallerAuthn;
pub use auth::RequestContext;
pub use oracle::ClaimsOracle;
pub use oracle::PolicyRule;
pub use server::McpServer;
pub use server::McpServerError;
pub use telemetry::MCP_LATENCY_BUCKETS_MS;
pub use telemetry::McpMethod;
pub use telemetry::McpMetricEvent;
pub use telemetry::McpMetrics;
pub use telemetry::McpOutcome;
pub use telemetry::NoopMetrics;
pub use tools::ToolDefinition;
pub use tools::ToolError;
pub use tools::ToolRouter;
