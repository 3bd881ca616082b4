// crates/tool-bridge-core/tests/bridge.rs
// ============================================================================
// Module: Tool Bridge Tests
// Description: End-to-end invocation and catalog behavior of the facade.
// Purpose: Validate ordering, scope isolation, error mapping, and cancellation.
// Dependencies: tool-bridge-core, tokio
// ============================================================================

//! Tool bridge facade tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap for clarity."
)]

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::ScriptedOracle;
use common::returns;
use common::users_group;
use serde_json::Value;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tool_bridge_core::AllowReason;
use tool_bridge_core::AuthorizationRequirement;
use tool_bridge_core::BridgeSettings;
use tool_bridge_core::CallerContext;
use tool_bridge_core::GroupSpec;
use tool_bridge_core::InvocationScope;
use tool_bridge_core::InvokeError;
use tool_bridge_core::Invoker;
use tool_bridge_core::OperationError;
use tool_bridge_core::OperationReturn;
use tool_bridge_core::OperationSpec;
use tool_bridge_core::RegistryBuilder;
use tool_bridge_core::RegistryOptions;
use tool_bridge_core::RoleLevel;
use tool_bridge_core::StatusOutcome;
use tool_bridge_core::ToolBridge;

/// Scope-tracking collaborator activated per invocation.
struct ScopeTracker {
    scope: InvocationScope,
}

fn scope_group(activations: Arc<AtomicUsize>) -> GroupSpec {
    let scoped = Invoker::bound(
        move |scope: &InvocationScope| {
            activations.fetch_add(1, Ordering::SeqCst);
            ScopeTracker { scope: *scope }
        },
        |tracker: ScopeTracker, _call| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(OperationReturn::Value(json!({
                "scope_id": tracker.scope.id().to_string(),
                "created_at_ns": tracker.scope.created_at_ns(),
            })))
        },
    );
    GroupSpec::new("scopes").operation(
        OperationSpec::new("GetScopeId", scoped)
            .require(AuthorizationRequirement::policy("RequireMember")),
    )
}

fn bridge_with(oracle: ScriptedOracle, groups: Vec<GroupSpec>) -> ToolBridge {
    let mut builder = RegistryBuilder::new(RegistryOptions::default());
    for group in groups {
        builder.add_group(group);
    }
    let registry = builder.build().expect("registry");
    let oracle = Arc::new(oracle);
    ToolBridge::new(registry, oracle.clone(), oracle, BridgeSettings::default())
}

fn member() -> CallerContext {
    CallerContext::authenticated("alice", ["Member"])
}

#[tokio::test]
async fn allowed_invocation_returns_normalized_payload() {
    let bridge = bridge_with(
        ScriptedOracle::authenticated().with_policy("RequireMember", true),
        vec![users_group()],
    );
    let cancel = CancellationToken::new();
    let invoked = bridge.invoke("create", json!({}), &member(), &cancel).await.unwrap();
    assert_eq!(invoked.payload, json!({"id": 4}));
    assert!(invoked.present);
    assert_eq!(invoked.allowed, AllowReason::RequirementsSatisfied);
}

#[tokio::test]
async fn unknown_operation_is_reported() {
    let bridge = bridge_with(ScriptedOracle::authenticated(), vec![users_group()]);
    let cancel = CancellationToken::new();
    let err = bridge.invoke("delete", json!({}), &member(), &cancel).await.unwrap_err();
    assert_eq!(err, InvokeError::UnknownOperation("delete".to_string()));
}

#[tokio::test]
async fn denied_invocation_never_activates_the_operation() {
    let activations = Arc::new(AtomicUsize::new(0));
    let bridge = bridge_with(
        ScriptedOracle::authenticated().with_policy("RequireMember", false),
        vec![scope_group(activations.clone())],
    );
    let cancel = CancellationToken::new();
    let err = bridge.invoke("get_scope_id", Value::Null, &member(), &cancel).await.unwrap_err();
    assert!(err.is_access_denied());
    assert_eq!(err.kind(), "policy_denied");
    assert_eq!(activations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unauthenticated_invocation_is_access_denied() {
    let bridge = bridge_with(ScriptedOracle::anonymous(), vec![users_group()]);
    let cancel = CancellationToken::new();
    let err = bridge
        .invoke("get_all", json!({}), &CallerContext::anonymous(), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, InvokeError::AuthenticationRequired);
    assert!(err.is_access_denied());
}

#[tokio::test]
async fn anonymous_operation_runs_for_unauthenticated_callers() {
    let bridge = bridge_with(ScriptedOracle::anonymous(), vec![users_group()]);
    let cancel = CancellationToken::new();
    let invoked = bridge
        .invoke("get_public_info", json!({}), &CallerContext::anonymous(), &cancel)
        .await
        .unwrap();
    assert_eq!(invoked.allowed, AllowReason::Anonymous);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_invocations_get_isolated_scopes() {
    let activations = Arc::new(AtomicUsize::new(0));
    let bridge = bridge_with(
        ScriptedOracle::authenticated().with_policy("RequireMember", true),
        vec![scope_group(activations.clone())],
    );
    let mut handles = Vec::new();
    for _ in 0 .. 16 {
        let bridge = bridge.clone();
        handles.push(tokio::spawn(async move {
            let cancel = CancellationToken::new();
            bridge.invoke("get_scope_id", json!({}), &member(), &cancel).await.unwrap()
        }));
    }
    let mut ids = BTreeSet::new();
    let mut stamps = Vec::new();
    for handle in handles {
        let invoked = handle.await.unwrap();
        ids.insert(invoked.payload["scope_id"].as_str().unwrap().to_string());
        stamps.push(invoked.scope.created_at_ns());
    }
    assert_eq!(ids.len(), 16);
    assert_eq!(activations.load(Ordering::SeqCst), 16);
    stamps.sort_unstable();
    assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test]
async fn sequential_scopes_strictly_increase() {
    let bridge = bridge_with(
        ScriptedOracle::authenticated().with_policy("RequireMember", true),
        vec![scope_group(Arc::new(AtomicUsize::new(0)))],
    );
    let cancel = CancellationToken::new();
    let first = bridge.invoke("get_scope_id", json!({}), &member(), &cancel).await.unwrap();
    let second = bridge.invoke("get_scope_id", json!({}), &member(), &cancel).await.unwrap();
    assert_ne!(first.scope.id(), second.scope.id());
    assert!(first.scope.created_at_ns() < second.scope.created_at_ns());
}

#[tokio::test]
async fn failure_outcome_surfaces_as_marshalling_error() {
    let group = GroupSpec::new("ops").operation(OperationSpec::new(
        "Find",
        Invoker::function(|_call| async { Ok(OperationReturn::from(StatusOutcome::not_found())) }),
    ));
    let bridge = bridge_with(ScriptedOracle::anonymous(), vec![group]);
    let cancel = CancellationToken::new();
    let err = bridge
        .invoke("find", json!({}), &CallerContext::anonymous(), &cancel)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        InvokeError::MarshallingFailure {
            outcome_kind: "NotFoundResult".to_string()
        }
    );
    assert_eq!(err.to_string(), "Controller returned error result: NotFoundResult");
}

#[tokio::test]
async fn argument_errors_map_to_invalid_arguments() {
    #[derive(serde::Deserialize)]
    struct Args {
        #[allow(dead_code, reason = "Only decoding is exercised.")]
        id: u64,
    }
    let group = GroupSpec::new("ops").operation(OperationSpec::new(
        "Lookup",
        Invoker::function(|call| async move {
            let _args: Args = call.decode()?;
            Ok(OperationReturn::Null)
        }),
    ));
    let bridge = bridge_with(ScriptedOracle::anonymous(), vec![group]);
    let cancel = CancellationToken::new();
    let err = bridge
        .invoke("lookup", json!({"id": "x"}), &CallerContext::anonymous(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::InvalidArguments(_)));
}

#[tokio::test]
async fn operation_failures_are_propagated() {
    let group = GroupSpec::new("ops").operation(OperationSpec::new(
        "Explode",
        Invoker::function(|_call| async { Err(OperationError::Failed("disk full".to_string())) }),
    ));
    let bridge = bridge_with(ScriptedOracle::anonymous(), vec![group]);
    let cancel = CancellationToken::new();
    let err = bridge
        .invoke("explode", json!({}), &CallerContext::anonymous(), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, InvokeError::OperationFailed("disk full".to_string()));
}

#[tokio::test]
async fn cancellation_reaches_the_running_operation() {
    let group = GroupSpec::new("ops").operation(OperationSpec::new(
        "Slow",
        Invoker::function(|_call| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(OperationReturn::Null)
        }),
    ));
    let bridge = bridge_with(ScriptedOracle::anonymous(), vec![group]);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.cancel();
    });
    let err = bridge
        .invoke("slow", json!({}), &CallerContext::anonymous(), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, InvokeError::Cancelled);
}

#[tokio::test]
async fn operation_sees_the_invocation_token() {
    let group = GroupSpec::new("ops").operation(OperationSpec::new(
        "Watch",
        Invoker::function(|call| async move {
            Ok(OperationReturn::Value(json!(call.cancel.is_cancelled())))
        }),
    ));
    let bridge = bridge_with(ScriptedOracle::anonymous(), vec![group]);
    let cancel = CancellationToken::new();
    let invoked = bridge
        .invoke("watch", json!({}), &CallerContext::anonymous(), &cancel)
        .await
        .unwrap();
    assert_eq!(invoked.payload, json!(false));
}

#[tokio::test]
async fn catalog_is_filtered_by_resolved_role() {
    let bridge = bridge_with(
        ScriptedOracle::authenticated().with_role(RoleLevel::Manager),
        vec![users_group()],
    );
    let cancel = CancellationToken::new();
    let listed: Vec<String> = bridge
        .catalog(&member(), &cancel)
        .await
        .unwrap()
        .into_iter()
        .map(|descriptor| descriptor.name.clone())
        .collect();
    assert_eq!(listed, vec!["create", "get_all", "get_by_id", "get_public_info", "update"]);
}

#[tokio::test]
async fn unauthenticated_catalog_is_empty() {
    let bridge = bridge_with(ScriptedOracle::anonymous(), vec![users_group()]);
    let cancel = CancellationToken::new();
    let listed = bridge.catalog(&CallerContext::anonymous(), &cancel).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn field_renaming_applies_the_naming_convention() {
    let group = GroupSpec::new("ops").operation(OperationSpec::new(
        "Profile",
        returns(json!({"DisplayName": "Alice", "LastLogin": null})),
    ));
    let registry = RegistryBuilder::new(RegistryOptions::default()).group(group).build().unwrap();
    let oracle = Arc::new(ScriptedOracle::anonymous());
    let settings = BridgeSettings {
        rename_fields: true,
        ..BridgeSettings::default()
    };
    let bridge = ToolBridge::new(registry, oracle.clone(), oracle, settings);
    let cancel = CancellationToken::new();
    let invoked = bridge
        .invoke("profile", json!({}), &CallerContext::anonymous(), &cancel)
        .await
        .unwrap();
    assert_eq!(invoked.payload, json!({"display_name": "Alice", "last_login": null}));
}

#[tokio::test]
async fn field_renaming_fails_instead_of_dropping_colliding_keys() {
    let group = GroupSpec::new("ops").operation(OperationSpec::new(
        "Profile",
        returns(json!({"UserId": 1, "user_id": 2})),
    ));
    let registry = RegistryBuilder::new(RegistryOptions::default()).group(group).build().unwrap();
    let oracle = Arc::new(ScriptedOracle::anonymous());
    let settings = BridgeSettings {
        rename_fields: true,
        ..BridgeSettings::default()
    };
    let bridge = ToolBridge::new(registry, oracle.clone(), oracle, settings);
    let cancel = CancellationToken::new();
    let err = bridge
        .invoke("profile", json!({}), &CallerContext::anonymous(), &cancel)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        InvokeError::OperationFailed("payload fields collide after renaming: user_id".to_string())
    );
}
