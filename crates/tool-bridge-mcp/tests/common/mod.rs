// crates/tool-bridge-mcp/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared configs, registries, and audit sinks for MCP tests.
// Purpose: Build servers' collaborators without any network transport.
// Dependencies: tool-bridge-mcp, tool-bridge-config, tool-bridge-core
// ============================================================================

//! ## Overview
//! Shared fixtures for MCP integration tests.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use serde_json::Value;
use serde_json::json;
use tool_bridge_config::ToolBridgeConfig;
use tool_bridge_core::AuthorizationRequirement;
use tool_bridge_core::BridgeSettings;
use tool_bridge_core::GroupSpec;
use tool_bridge_core::Invoker;
use tool_bridge_core::OperationRegistry;
use tool_bridge_core::OperationReturn;
use tool_bridge_core::OperationSpec;
use tool_bridge_core::RegistryBuilder;
use tool_bridge_core::ToolBridge;
use tool_bridge_mcp::ClaimsOracle;
use tool_bridge_mcp::McpAuditEvent;
use tool_bridge_mcp::McpAuditSink;
use tool_bridge_mcp::ToolAuthzEvent;
use tool_bridge_mcp::ToolRouter;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Audit sink that keeps every decision in memory.
#[derive(Default)]
pub struct RecordingAudit {
    /// Request events.
    pub requests: Mutex<Vec<McpAuditEvent>>,
    /// Invocation decisions.
    pub decisions: Mutex<Vec<ToolAuthzEvent>>,
}

impl McpAuditSink for RecordingAudit {
    fn record(&self, event: &McpAuditEvent) {
        self.requests.lock().unwrap().push(event.clone());
    }

    fn record_authz(&self, event: &ToolAuthzEvent) {
        self.decisions.lock().unwrap().push(event.clone());
    }
}

/// Parses a TOML config, panicking on failure.
pub fn config_from_toml(toml: &str) -> ToolBridgeConfig {
    ToolBridgeConfig::from_toml(toml).expect("config")
}

/// Bearer-token HTTP config with three principals.
pub fn bearer_config() -> ToolBridgeConfig {
    config_from_toml(
        r#"
[server]
transport = "http"
bind = "0.0.0.0:8080"

[server.auth]
mode = "bearer_token"

[[server.auth.principals]]
subject = "alice"
token = "alice-token"
roles = ["Member"]

[[server.auth.principals]]
subject = "bob"
token = "bob-token"
roles = ["Manager", "Auditor"]

[[server.auth.principals]]
subject = "carol"
token = "carol-token"
roles = ["Admin"]

[[policies]]
name = "RequireMember"
minimum_role = "Member"

[[policies]]
name = "RequireAdmin"
minimum_role = "Admin"

[[policies]]
name = "RequireAuditor"
any_role = ["Auditor"]
"#,
    )
}

/// Static operation returning `value`.
pub fn value_op(identifier: &str, value: Value) -> OperationSpec {
    OperationSpec::new(
        identifier,
        Invoker::function(move |_call| {
            let value = value.clone();
            async move { Ok(OperationReturn::Value(value)) }
        }),
    )
}

/// Registry exercising every visibility class.
pub fn sample_registry(config: &ToolBridgeConfig) -> OperationRegistry {
    RegistryBuilder::new(config.registry_options())
        .group(
            GroupSpec::new("reports")
                .require(AuthorizationRequirement::authenticated())
                .operation(value_op("Summary", json!({"total": 3})))
                .operation(
                    value_op("CreateAsync", json!({"created": true}))
                        .require(AuthorizationRequirement::policy("RequireMember")),
                )
                .operation(
                    value_op("PurgeAsync", json!({"purged": true}))
                        .require(AuthorizationRequirement::policy("RequireAdmin")),
                )
                .operation(
                    value_op("Ledger", json!({"entries": []}))
                        .require(AuthorizationRequirement::policy("RequireAuditor")),
                )
                .operation(value_op("Banner", json!("welcome")).allow_anonymous()),
        )
        .build()
        .expect("registry")
}

/// Tool router over the sample registry with a recording audit sink.
pub fn sample_router(config: &ToolBridgeConfig) -> (ToolRouter, Arc<RecordingAudit>) {
    let oracle = Arc::new(ClaimsOracle::from_config(&config.policies));
    let bridge = ToolBridge::new(
        sample_registry(config),
        oracle.clone(),
        oracle,
        BridgeSettings::default(),
    );
    let audit = Arc::new(RecordingAudit::default());
    (ToolRouter::new(bridge, audit.clone()), audit)
}
