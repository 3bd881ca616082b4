// crates/tool-bridge-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Scripted oracles and sample registries for core tests.
// Purpose: Count oracle calls and build deterministic catalogs.
// Dependencies: tool-bridge-core, async-trait, serde_json
// ============================================================================

//! ## Overview
//! Shared fixtures: a scripted oracle that records every call, and a
//! user-directory style registry mirroring the usual host layout.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use serde_json::json;
use tool_bridge_core::AuthOracle;
use tool_bridge_core::AuthorizationRequirement;
use tool_bridge_core::CallerContext;
use tool_bridge_core::GroupSpec;
use tool_bridge_core::Invoker;
use tool_bridge_core::OperationRegistry;
use tool_bridge_core::OperationReturn;
use tool_bridge_core::OperationSpec;
use tool_bridge_core::OracleError;
use tool_bridge_core::RegistryBuilder;
use tool_bridge_core::RegistryOptions;
use tool_bridge_core::RoleLevel;
use tool_bridge_core::RoleResolver;

// ============================================================================
// SECTION: Scripted Oracle
// ============================================================================

/// Oracle with fixed answers that records every call.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    /// Answer for authentication checks.
    pub authenticated: bool,
    /// Answers per policy; missing policies fault.
    pub policies: BTreeMap<String, bool>,
    /// Role returned by the resolver.
    pub role: Option<RoleLevel>,
    /// When set, every call faults with this message.
    pub fault: Option<String>,
    /// Number of authentication checks.
    pub auth_calls: AtomicUsize,
    /// Policies checked, in order.
    pub policy_calls: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    /// Oracle for an authenticated caller.
    pub fn authenticated() -> Self {
        Self {
            authenticated: true,
            ..Self::default()
        }
    }

    /// Oracle for an unauthenticated caller.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Adds a policy answer.
    pub fn with_policy(mut self, name: &str, passes: bool) -> Self {
        self.policies.insert(name.to_string(), passes);
        self
    }

    /// Sets the resolved role.
    pub fn with_role(mut self, role: RoleLevel) -> Self {
        self.role = Some(role);
        self
    }

    /// Makes every call fault.
    pub fn faulting(mut self, message: &str) -> Self {
        self.fault = Some(message.to_string());
        self
    }

    /// Number of authentication checks so far.
    pub fn auth_count(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    /// Policies checked so far.
    pub fn policies_checked(&self) -> Vec<String> {
        self.policy_calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Total oracle calls so far.
    pub fn total_calls(&self) -> usize {
        self.auth_count() + self.policies_checked().len()
    }
}

#[async_trait]
impl AuthOracle for ScriptedOracle {
    async fn is_authenticated(&self, _caller: &CallerContext) -> Result<bool, OracleError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fault {
            return Err(OracleError::Unavailable(message.clone()));
        }
        Ok(self.authenticated)
    }

    async fn check_policy(
        &self,
        _caller: &CallerContext,
        policy: &str,
    ) -> Result<bool, OracleError> {
        if let Ok(mut calls) = self.policy_calls.lock() {
            calls.push(policy.to_string());
        }
        if let Some(message) = &self.fault {
            return Err(OracleError::Unavailable(message.clone()));
        }
        self.policies
            .get(policy)
            .copied()
            .ok_or_else(|| OracleError::UnknownPolicy(policy.to_string()))
    }
}

#[async_trait]
impl RoleResolver for ScriptedOracle {
    async fn resolve_role(
        &self,
        _caller: &CallerContext,
    ) -> Result<Option<RoleLevel>, OracleError> {
        Ok(self.role)
    }
}

/// Wraps an oracle for sharing.
pub fn shared(oracle: ScriptedOracle) -> Arc<ScriptedOracle> {
    Arc::new(oracle)
}

// ============================================================================
// SECTION: Sample Registry
// ============================================================================

/// Static invoker returning `value`.
pub fn returns(value: serde_json::Value) -> Invoker {
    Invoker::function(move |_call| {
        let value = value.clone();
        async move { Ok(OperationReturn::Value(value)) }
    })
}

/// Users group with a bare group-level authentication marker.
pub fn users_group() -> GroupSpec {
    GroupSpec::new("users")
        .require(AuthorizationRequirement::authenticated())
        .operation(OperationSpec::new("GetById", returns(json!({"id": 1}))))
        .operation(OperationSpec::new("GetAllAsync", returns(json!([]))))
        .operation(
            OperationSpec::new("CreateAsync", returns(json!({"id": 4})))
                .require(AuthorizationRequirement::policy("RequireMember")),
        )
        .operation(
            OperationSpec::new("UpdateAsync", returns(json!({"id": 1})))
                .require(AuthorizationRequirement::policy("RequireManager")),
        )
        .operation(
            OperationSpec::new("PromoteToManagerAsync", returns(json!({"id": 1})))
                .require(AuthorizationRequirement::policy("RequireAdmin")),
        )
        .operation(
            OperationSpec::new("GetPublicInfo", returns(json!({"service": "users"})))
                .allow_anonymous(),
        )
        .operation(OperationSpec::new("Delete", returns(json!(true))).hidden())
}

/// Builds the sample registry.
pub fn users_registry() -> OperationRegistry {
    RegistryBuilder::new(RegistryOptions::default())
        .group(users_group())
        .build()
        .expect("sample registry builds")
}
