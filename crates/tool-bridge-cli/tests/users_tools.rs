// crates/tool-bridge-cli/tests/users_tools.rs
// ============================================================================
// Module: Sample Host Tool Tests
// Description: End-to-end invocation of the sample user directory.
// Purpose: Ensure the sample host behaves through the bridge for each role.
// Dependencies: tool-bridge-cli, tool-bridge-core, tool-bridge-mcp, tokio
// ============================================================================

//! ## Overview
//! Invokes the sample operations through [`ToolBridge`] with the claims
//! oracle built from the default policy set.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tool_bridge_cli::build_registry;
use tool_bridge_cli::users::UserStore;
use tool_bridge_config::ToolBridgeConfig;
use tool_bridge_core::BridgeSettings;
use tool_bridge_core::CallerContext;
use tool_bridge_core::InvokeError;
use tool_bridge_core::Invoked;
use tool_bridge_core::ToolBridge;
use tool_bridge_mcp::ClaimsOracle;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn bridge_with(config: &ToolBridgeConfig) -> (ToolBridge, Arc<UserStore>) {
    let store = Arc::new(UserStore::seeded());
    let registry = build_registry(config, &store).unwrap();
    let oracle = Arc::new(ClaimsOracle::from_config(&config.policies));
    let settings = BridgeSettings {
        enforce_authorization: true,
        rename_fields: config.tools.rename_fields,
    };
    (ToolBridge::new(registry, oracle.clone(), oracle, settings), store)
}

fn bridge() -> (ToolBridge, Arc<UserStore>) {
    bridge_with(&ToolBridgeConfig::default())
}

fn caller(role: &str) -> CallerContext {
    CallerContext::authenticated(format!("{role}-subject"), [role])
}

async fn call(
    bridge: &ToolBridge,
    caller: &CallerContext,
    name: &str,
    arguments: Value,
) -> Result<Invoked, InvokeError> {
    bridge.invoke(name, arguments, caller, &CancellationToken::new()).await
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn get_by_id_returns_user_or_not_found_payload() {
    let (bridge, _) = bridge();
    let viewer = caller("Viewer");
    let found = call(&bridge, &viewer, "get_by_id", json!({"id": 1})).await.unwrap();
    assert_eq!(found.payload["name"], json!("Alice Smith"));
    assert_eq!(found.payload["role"], json!("Member"));

    let missing = call(&bridge, &viewer, "get_by_id", json!({"id": 42})).await.unwrap();
    assert_eq!(missing.payload, json!({"error": "User not found", "id": 42}));
    assert!(missing.present);
}

#[tokio::test]
async fn get_all_resolves_the_deferred_list() {
    let (bridge, _) = bridge();
    let invoked = call(&bridge, &caller("Viewer"), "get_all", Value::Null).await.unwrap();
    assert_eq!(invoked.payload.as_array().map(Vec::len), Some(6));
}

#[tokio::test]
async fn unauthenticated_callers_reach_only_anonymous_operations() {
    let (bridge, _) = bridge();
    let anonymous = CallerContext::anonymous();
    let err = call(&bridge, &anonymous, "get_all", json!({})).await.unwrap_err();
    assert_eq!(err, InvokeError::AuthenticationRequired);

    let public = call(&bridge, &anonymous, "get_public_info", json!({})).await.unwrap();
    assert_eq!(public.payload["server_version"], json!(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn create_requires_member() {
    let (bridge, store) = bridge();
    let arguments = json!({"name": "Dana", "email": "dana@example.com"});
    let err = call(&bridge, &caller("Viewer"), "create", arguments.clone()).await.unwrap_err();
    assert!(matches!(err, InvokeError::PolicyDenied { .. }));
    assert_eq!(store.all().unwrap().len(), 6);

    let created = call(&bridge, &caller("Member"), "create", arguments).await.unwrap();
    assert_eq!(created.payload["id"], json!(103));
    assert_eq!(store.all().unwrap().len(), 7);
}

#[tokio::test]
async fn create_rejects_malformed_arguments() {
    let (bridge, _) = bridge();
    let err = call(&bridge, &caller("Member"), "create", json!({"name": "Dana"}))
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::InvalidArguments(_)));
}

#[tokio::test]
async fn update_requires_manager_and_reports_missing_users() {
    let (bridge, store) = bridge();
    let arguments = json!({"id": 2, "name": "Robert Jones", "email": "robert@example.com"});
    let err = call(&bridge, &caller("Member"), "update", arguments.clone()).await.unwrap_err();
    assert!(matches!(err, InvokeError::PolicyDenied { .. }));

    let updated = call(&bridge, &caller("Manager"), "update", arguments).await.unwrap();
    assert_eq!(updated.payload["name"], json!("Robert Jones"));
    assert_eq!(store.get(2).unwrap().unwrap().email, "robert@example.com");

    let missing = call(
        &bridge,
        &caller("Admin"),
        "update",
        json!({"id": 77, "name": "x", "email": "y"}),
    )
    .await
    .unwrap();
    assert_eq!(missing.payload, json!({"error": "User not found", "id": 77}));
}

#[tokio::test]
async fn promote_requires_admin() {
    let (bridge, _) = bridge();
    let err = call(&bridge, &caller("Manager"), "promote_to_manager", json!({"id": 101}))
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::PolicyDenied { .. }));

    let promoted =
        call(&bridge, &caller("Admin"), "promote_to_manager", json!({"id": 101})).await.unwrap();
    assert_eq!(promoted.payload["role"], json!("Manager"));
}

#[tokio::test]
async fn scope_ids_differ_across_invocations() {
    let (bridge, _) = bridge();
    let viewer = caller("Viewer");
    let (first, second) = tokio::join!(
        call(&bridge, &viewer, "get_scope_id", json!({})),
        call(&bridge, &viewer, "get_scope_id", json!({})),
    );
    let first = first.unwrap();
    let second = second.unwrap();
    assert_ne!(first.payload["request_id"], second.payload["request_id"]);
    assert_eq!(first.payload["request_id"], json!(first.scope.id().to_string()));
    assert_ne!(first.scope.created_at_ns(), second.scope.created_at_ns());
}

#[tokio::test]
async fn delete_is_not_a_tool_and_server_version_is_open() {
    let (bridge, _) = bridge();
    let err = call(&bridge, &caller("Admin"), "delete", json!({"id": 1})).await.unwrap_err();
    assert_eq!(err, InvokeError::UnknownOperation("delete".to_string()));

    let version =
        call(&bridge, &CallerContext::anonymous(), "server_version", json!({})).await.unwrap();
    assert_eq!(version.payload, json!({"version": env!("CARGO_PKG_VERSION")}));
}

#[tokio::test]
async fn catalog_and_invocation_agree_for_viewers() {
    let (bridge, _) = bridge();
    let viewer = caller("Viewer");
    let cancel = CancellationToken::new();
    let listed: Vec<String> = bridge
        .catalog(&viewer, &cancel)
        .await
        .unwrap()
        .into_iter()
        .map(|descriptor| descriptor.name.clone())
        .collect();
    assert!(!listed.contains(&"create".to_string()));
    for name in &listed {
        let arguments = if name == "get_by_id" { json!({"id": 1}) } else { json!({}) };
        let result = call(&bridge, &viewer, name, arguments).await;
        assert!(result.is_ok(), "{name} should be invokable");
    }
}
