// crates/tool-bridge-core/src/runtime/visibility.rs
// ============================================================================
// Module: Visibility Filter
// Description: Role-based selection of catalog entries for a caller.
// Purpose: Decide which operation names appear in a listing.
// Dependencies: crate::{core, interfaces}, serde, tokio-util
// ============================================================================

//! ## Overview
//! Listings are filtered by the caller's resolved role. A caller with no
//! resolved role sees nothing. Otherwise an operation is listed when it is
//! unrestricted or its minimum role is at or below the caller's role.
//! Operations classified as unknown are never listed; they remain fully
//! enforced by the pre-filter if invoked by name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::core::OperationDescriptor;
use crate::core::RoleLevel;
use crate::interfaces::AuthOracle;
use crate::interfaces::CallerContext;
use crate::interfaces::RoleResolver;
use crate::runtime::authz::AuthzError;

// ============================================================================
// SECTION: Caller Identity
// ============================================================================

/// Identity derived for a single request. Never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallerIdentity {
    /// Whether the authentication oracle accepted the caller.
    pub authenticated: bool,
    /// Role level resolved for the caller.
    pub resolved_role: Option<RoleLevel>,
}

/// Derives a fresh identity for `caller`.
///
/// The role resolver is only consulted for authenticated callers.
///
/// # Errors
///
/// Returns [`AuthzError`] when an oracle fails or `cancel` fires.
pub async fn resolve_identity(
    caller: &CallerContext,
    oracle: &dyn AuthOracle,
    resolver: &dyn RoleResolver,
    cancel: &CancellationToken,
) -> Result<CallerIdentity, AuthzError> {
    let authenticated = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(AuthzError::Cancelled),
        result = oracle.is_authenticated(caller) => result?,
    };
    if !authenticated {
        return Ok(CallerIdentity {
            authenticated,
            resolved_role: None,
        });
    }
    let resolved_role = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(AuthzError::Cancelled),
        result = resolver.resolve_role(caller) => result?,
    };
    Ok(CallerIdentity {
        authenticated,
        resolved_role,
    })
}

// ============================================================================
// SECTION: Filtering
// ============================================================================

/// Returns true when a caller at `caller_role` may see `descriptor`.
#[must_use]
pub fn is_visible(caller_role: Option<RoleLevel>, descriptor: &OperationDescriptor) -> bool {
    caller_role.is_some_and(|role| descriptor.minimum_role.admits(role))
}

/// Returns the names visible to a caller at `caller_role`.
pub fn visible_names<'a, I>(caller_role: Option<RoleLevel>, catalog: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a OperationDescriptor>,
{
    catalog
        .into_iter()
        .filter(|descriptor| is_visible(caller_role, descriptor))
        .map(|descriptor| descriptor.name.clone())
        .collect()
}
