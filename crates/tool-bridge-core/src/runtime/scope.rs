// crates/tool-bridge-core/src/runtime/scope.rs
// ============================================================================
// Module: Invocation Scopes
// Description: Fresh per-invocation identity with monotonic creation time.
// Purpose: Isolate bound operations so no invocation observes another's state.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! Each invocation that passes the pre-filter gets its own
//! [`InvocationScope`]. Bound operations activate their instance from it,
//! so request-scoped collaborators are never shared.
//!
//! ## Invariants
//! - Every scope carries a fresh v4 identifier.
//! - Scopes drawn from one [`ScopeClock`] have strictly increasing
//!   `created_at_ns`, even when created concurrently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Identity of a single invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationScope {
    /// Unique scope identifier.
    id: Uuid,
    /// Creation time in nanoseconds since the Unix epoch.
    created_at_ns: u64,
}

impl InvocationScope {
    /// Returns the scope identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the creation timestamp in nanoseconds since the Unix epoch.
    #[must_use]
    pub const fn created_at_ns(&self) -> u64 {
        self.created_at_ns
    }
}

/// Source of invocation scopes.
#[derive(Debug, Default)]
pub struct ScopeClock {
    /// Last timestamp handed out.
    last_ns: AtomicU64,
}

impl ScopeClock {
    /// Creates a clock with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new scope.
    pub fn next_scope(&self) -> InvocationScope {
        let now = wall_clock_ns();
        let previous = self
            .last_ns
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        InvocationScope {
            id: Uuid::new_v4(),
            created_at_ns: now.max(previous.saturating_add(1)),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads the wall clock in nanoseconds, saturating on overflow.
fn wall_clock_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
}
