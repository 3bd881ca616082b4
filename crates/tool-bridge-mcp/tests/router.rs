// crates/tool-bridge-mcp/tests/router.rs
// ============================================================================
// Module: Tool Router Tests
// Description: Catalog rendering, invocation, and decision auditing.
// Purpose: Validate that listing and invocation agree for each caller.
// Dependencies: tool-bridge-mcp, tool-bridge-core, tokio
// ============================================================================

//! Tool router tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap for clarity."
)]

mod common;

use common::bearer_config;
use common::sample_router;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tool_bridge_core::CallerContext;
use tool_bridge_mcp::ToolError;

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Runtime::new().unwrap().block_on(future)
}

fn listed(caller: &CallerContext) -> Vec<String> {
    let (router, _) = sample_router(&bearer_config());
    let cancel = CancellationToken::new();
    block_on(router.list_tools(caller, &cancel))
        .unwrap()
        .into_iter()
        .map(|tool| tool.name)
        .collect()
}

#[test]
fn listing_follows_the_role_ladder() {
    let member = CallerContext::authenticated("alice", ["Member"]);
    let admin = CallerContext::authenticated("carol", ["Admin"]);
    assert_eq!(listed(&member), vec!["banner", "create", "summary"]);
    assert_eq!(listed(&admin), vec!["banner", "create", "purge", "summary"]);
}

#[test]
fn role_set_policies_stay_out_of_listings_but_remain_invokable() {
    let bob = CallerContext::authenticated("bob", ["Manager", "Auditor"]);
    assert!(!listed(&bob).contains(&"ledger".to_string()));

    let (router, _) = sample_router(&bearer_config());
    let cancel = CancellationToken::new();
    let invoked = block_on(router.call_tool(&bob, "ledger", json!({}), &cancel)).unwrap();
    assert_eq!(invoked.payload, json!({"entries": []}));
}

#[test]
fn anonymous_callers_get_an_empty_listing_but_may_invoke_anonymous_tools() {
    assert!(listed(&CallerContext::anonymous()).is_empty());

    let (router, _) = sample_router(&bearer_config());
    let cancel = CancellationToken::new();
    let invoked =
        block_on(router.call_tool(&CallerContext::anonymous(), "banner", json!(null), &cancel))
            .unwrap();
    assert_eq!(invoked.payload, json!("welcome"));
}

#[test]
fn denials_collapse_to_access_denied_and_are_audited() {
    let (router, audit) = sample_router(&bearer_config());
    let cancel = CancellationToken::new();
    let alice = CallerContext::authenticated("alice", ["Member"]).with_request_id("r-1");
    let err = block_on(router.call_tool(&alice, "purge", json!({}), &cancel)).unwrap_err();
    assert_eq!(err, ToolError::AccessDenied);
    assert_eq!(err.kind(), "access_denied");

    let err =
        block_on(router.call_tool(&CallerContext::anonymous(), "summary", json!({}), &cancel))
            .unwrap_err();
    assert_eq!(err, ToolError::AccessDenied);

    let decisions = audit.decisions.lock().unwrap();
    assert_eq!(decisions.len(), 2);
    assert_eq!(decisions[0].decision, "deny");
    assert_eq!(decisions[0].request_id.as_deref(), Some("r-1"));
    assert_eq!(decisions[0].subject.as_deref(), Some("alice"));
    assert!(decisions[0].reason.contains("RequireAdmin"));
    assert_eq!(decisions[1].reason, "authentication required");
}

#[test]
fn unlisted_tools_still_answer_denials_with_access_denied() {
    let (router, audit) = sample_router(&bearer_config());
    let cancel = CancellationToken::new();
    let carol = CallerContext::authenticated("carol", ["Admin"]);
    assert!(!listed(&carol).contains(&"ledger".to_string()));

    let err = block_on(router.call_tool(&carol, "ledger", json!({}), &cancel)).unwrap_err();
    assert_eq!(err, ToolError::AccessDenied);
    let decisions = audit.decisions.lock().unwrap();
    assert_eq!(decisions[0].decision, "deny");
    assert!(decisions[0].reason.contains("RequireAuditor"));
}

#[test]
fn allowed_calls_record_the_allow_reason() {
    let (router, audit) = sample_router(&bearer_config());
    let cancel = CancellationToken::new();
    let alice = CallerContext::authenticated("alice", ["Member"]);
    block_on(router.call_tool(&alice, "create", json!({}), &cancel)).unwrap();
    block_on(router.call_tool(&alice, "banner", json!({}), &cancel)).unwrap();
    let decisions = audit.decisions.lock().unwrap();
    assert_eq!(decisions[0].reason, "requirements_satisfied");
    assert_eq!(decisions[1].reason, "anonymous");
}

#[test]
fn unknown_tools_are_not_audited_as_decisions() {
    let (router, audit) = sample_router(&bearer_config());
    let cancel = CancellationToken::new();
    let carol = CallerContext::authenticated("carol", ["Admin"]);
    let err = block_on(router.call_tool(&carol, "drop_tables", json!({}), &cancel)).unwrap_err();
    assert_eq!(err, ToolError::UnknownTool("drop_tables".to_string()));
    assert!(audit.decisions.lock().unwrap().is_empty());
}

#[test]
fn definitions_carry_description_and_schema() {
    let (router, _) = sample_router(&bearer_config());
    let cancel = CancellationToken::new();
    let carol = CallerContext::authenticated("carol", ["Admin"]);
    let tools = block_on(router.list_tools(&carol, &cancel)).unwrap();
    let rendered = serde_json::to_value(&tools[0]).unwrap();
    assert_eq!(rendered["name"], "banner");
    assert_eq!(rendered["inputSchema"]["type"], "object");
}
