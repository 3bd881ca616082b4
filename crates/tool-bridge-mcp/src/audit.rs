// crates/tool-bridge-mcp/src/audit.rs
// ============================================================================
// Module: MCP Audit Logging
// Description: Structured audit events for MCP requests and tool decisions.
// Purpose: Emit JSON-line audit records without leaking caller-facing detail.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are serialized as JSON lines and handed to a pluggable
//! [`McpAuditSink`]. Three event kinds exist: `mcp_request` for every
//! JSON-RPC request, `tool_authz` for every invocation decision, and
//! `security_audit` for startup posture warnings. Internal deny reasons only
//! ever appear in `tool_authz` records.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use tool_bridge_config::ServerTransport;

use crate::telemetry::McpMethod;
use crate::telemetry::McpOutcome;

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// MCP request audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct McpAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Transport type used for the request.
    pub transport: ServerTransport,
    /// Peer IP address if known.
    pub peer_ip: Option<String>,
    /// JSON-RPC method classification.
    pub method: McpMethod,
    /// Tool name when available (tools/call).
    pub tool: Option<String>,
    /// Request outcome.
    pub outcome: McpOutcome,
    /// JSON-RPC error code when present.
    pub error_code: Option<i64>,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
    /// Authenticated subject when known.
    pub subject: Option<String>,
    /// Bearer token fingerprint (sha256, hex) when a token was accepted.
    pub token_fingerprint: Option<String>,
}

/// Inputs required to construct a request audit event.
pub struct McpAuditEventParams {
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Transport type used for the request.
    pub transport: ServerTransport,
    /// Peer IP address if known.
    pub peer_ip: Option<String>,
    /// JSON-RPC method classification.
    pub method: McpMethod,
    /// Tool name when available (tools/call).
    pub tool: Option<String>,
    /// Request outcome.
    pub outcome: McpOutcome,
    /// JSON-RPC error code when present.
    pub error_code: Option<i64>,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
    /// Authenticated subject when known.
    pub subject: Option<String>,
    /// Bearer token fingerprint (sha256, hex) when a token was accepted.
    pub token_fingerprint: Option<String>,
}

impl McpAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: McpAuditEventParams) -> Self {
        Self {
            event: "mcp_request",
            timestamp_ms: now_ms(),
            request_id: params.request_id,
            transport: params.transport,
            peer_ip: params.peer_ip,
            method: params.method,
            tool: params.tool,
            outcome: params.outcome,
            error_code: params.error_code,
            error_kind: params.error_kind,
            request_bytes: params.request_bytes,
            response_bytes: params.response_bytes,
            subject: params.subject,
            token_fingerprint: params.token_fingerprint,
        }
    }
}

/// Invocation decision audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolAuthzEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Canonical tool name.
    pub tool: String,
    /// Caller subject when known.
    pub subject: Option<String>,
    /// Decision label: `allow`, `deny`, or `error`.
    pub decision: &'static str,
    /// Internal reason; never sent to the caller.
    pub reason: String,
    /// Bearer token fingerprint (sha256, hex) when a token was accepted.
    pub token_fingerprint: Option<String>,
}

impl ToolAuthzEvent {
    /// Builds an event with a consistent timestamp.
    #[must_use]
    pub fn new(
        request_id: Option<String>,
        tool: impl Into<String>,
        subject: Option<String>,
        decision: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            event: "tool_authz",
            timestamp_ms: now_ms(),
            request_id,
            tool: tool.into(),
            subject,
            decision,
            reason: reason.into(),
            token_fingerprint: None,
        }
    }

    /// Returns a copy attributed to a bearer token fingerprint.
    #[must_use]
    pub fn with_token_fingerprint(mut self, fingerprint: Option<String>) -> Self {
        self.token_fingerprint = fingerprint;
        self
    }
}

/// Security posture audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Security event kind.
    pub kind: String,
    /// Optional message.
    pub message: Option<String>,
    /// Auth mode label.
    pub auth_mode: &'static str,
    /// Whether the authorization pre-filter is enforced.
    pub enforce_authorization: bool,
}

impl SecurityAuditEvent {
    /// Creates a new security audit event with a consistent timestamp.
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        message: Option<String>,
        auth_mode: &'static str,
        enforce_authorization: bool,
    ) -> Self {
        Self {
            event: "security_audit",
            timestamp_ms: now_ms(),
            kind: kind.into(),
            message,
            auth_mode,
            enforce_authorization,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for MCP events.
pub trait McpAuditSink: Send + Sync {
    /// Record a request audit event.
    fn record(&self, event: &McpAuditEvent);

    /// Record an invocation decision.
    fn record_authz(&self, _event: &ToolAuthzEvent) {}

    /// Record a security posture audit event.
    fn record_security(&self, _event: &SecurityAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct McpStderrAuditSink;

impl McpAuditSink for McpStderrAuditSink {
    fn record(&self, event: &McpAuditEvent) {
        write_stderr(event);
    }

    fn record_authz(&self, event: &ToolAuthzEvent) {
        write_stderr(event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        write_stderr(event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct McpFileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl McpFileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized event.
    fn append(&self, event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl McpAuditSink for McpFileAuditSink {
    fn record(&self, event: &McpAuditEvent) {
        self.append(event);
    }

    fn record_authz(&self, event: &ToolAuthzEvent) {
        self.append(event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        self.append(event);
    }
}

/// No-op audit sink.
pub struct McpNoopAuditSink;

impl McpAuditSink for McpNoopAuditSink {
    fn record(&self, _event: &McpAuditEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

/// Writes one serialized event to stderr.
fn write_stderr(event: &impl Serialize) {
    if let Ok(payload) = serde_json::to_string(event) {
        let _ = writeln!(std::io::stderr(), "{payload}");
    }
}
