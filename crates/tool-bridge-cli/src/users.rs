// crates/tool-bridge-cli/src/users.rs
// ============================================================================
// Module: Sample User Directory
// Description: In-memory host module exposed through the tool bridge.
// Purpose: Exercise every bridge feature end to end from the CLI binary.
// Dependencies: tool-bridge-core, serde, serde_json
// ============================================================================

//! ## Overview
//! A small user directory that plays the part of a host application. The
//! `users` group requires authentication and carries one operation per
//! bridge feature:
//! - `GetById`, `GetAllAsync`: authenticated reads.
//! - `CreateAsync`, `UpdateAsync`, `PromoteToManagerAsync`: policy-gated writes
//!   (`RequireMember`, `RequireManager`, `RequireAdmin`).
//! - `GetScopeId`: a bound operation returning its invocation scope.
//! - `GetPublicInfo`: anonymous.
//! - `Delete`: registered but not exposed as a tool.
//!
//! The `system` group holds the static `ServerVersion` operation.
//!
//! Missing users are a domain result, not a failure: lookups return
//! `{"error": "User not found", "id": ..}` as an ordinary payload.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use tool_bridge_core::AuthorizationRequirement;
use tool_bridge_core::GroupSpec;
use tool_bridge_core::InvocationScope;
use tool_bridge_core::Invoker;
use tool_bridge_core::OperationCall;
use tool_bridge_core::OperationError;
use tool_bridge_core::OperationReturn;
use tool_bridge_core::OperationSpec;
use tool_bridge_core::RoleLevel;
use tool_bridge_core::StatusOutcome;
use tool_bridge_core::Wrapped;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Group name for user operations.
pub const USERS_GROUP: &str = "users";
/// Group name for system operations.
pub const SYSTEM_GROUP: &str = "system";
/// Version reported by `server_version` and `get_public_info`.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// SECTION: Model
// ============================================================================

/// Directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Numeric identifier.
    pub id: u32,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Assigned role.
    pub role: RoleLevel,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at_ms: u64,
}

/// Arguments naming a single user.
#[derive(Debug, Deserialize)]
struct UserIdArgs {
    /// User identifier.
    id: u32,
}

/// Arguments for `CreateAsync`.
#[derive(Debug, Deserialize)]
struct CreateUserArgs {
    /// Display name.
    name: String,
    /// Contact email.
    email: String,
}

/// Arguments for `UpdateAsync`.
#[derive(Debug, Deserialize)]
struct UpdateUserArgs {
    /// User identifier.
    id: u32,
    /// New display name.
    name: String,
    /// New contact email.
    email: String,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Shared in-memory user store.
#[derive(Debug)]
pub struct UserStore {
    /// Users in insertion order.
    users: Mutex<Vec<User>>,
}

impl Default for UserStore {
    fn default() -> Self {
        Self::seeded()
    }
}

impl UserStore {
    /// Creates a store holding the seed users.
    #[must_use]
    pub fn seeded() -> Self {
        Self {
            users: Mutex::new(seed_users()),
        }
    }

    /// Restores the seed users.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Failed`] when the store lock is poisoned.
    pub fn reset(&self) -> Result<(), OperationError> {
        *self.lock()? = seed_users();
        Ok(())
    }

    /// Looks up a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Failed`] when the store lock is poisoned.
    pub fn get(&self, id: u32) -> Result<Option<User>, OperationError> {
        Ok(self.lock()?.iter().find(|user| user.id == id).cloned())
    }

    /// Returns every user.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Failed`] when the store lock is poisoned.
    pub fn all(&self) -> Result<Vec<User>, OperationError> {
        Ok(self.lock()?.clone())
    }

    /// Adds a member with the next free id.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Failed`] when the store lock is poisoned or
    /// the id space is exhausted.
    pub fn add(&self, name: String, email: String) -> Result<User, OperationError> {
        let mut users = self.lock()?;
        let next_id = users
            .iter()
            .map(|user| user.id)
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| OperationError::Failed("user id space exhausted".to_string()))?;
        let user = User {
            id: next_id,
            name,
            email,
            role: RoleLevel::Member,
            created_at_ms: now_ms(),
        };
        users.push(user.clone());
        Ok(user)
    }

    /// Applies `change` to the user with `id`, returning the updated user.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Failed`] when the store lock is poisoned.
    pub fn modify<F>(&self, id: u32, change: F) -> Result<Option<User>, OperationError>
    where
        F: FnOnce(&mut User),
    {
        let mut users = self.lock()?;
        Ok(users.iter_mut().find(|user| user.id == id).map(|user| {
            change(user);
            user.clone()
        }))
    }

    /// Acquires the store lock.
    fn lock(&self) -> Result<MutexGuard<'_, Vec<User>>, OperationError> {
        self.users
            .lock()
            .map_err(|_| OperationError::Failed("user store lock poisoned".to_string()))
    }
}

/// Returns the seed users.
fn seed_users() -> Vec<User> {
    let created_at_ms = now_ms();
    [
        (1, "Alice Smith", "alice@example.com", RoleLevel::Member),
        (2, "Bob Jones", "bob@example.com", RoleLevel::Manager),
        (3, "Carol White", "carol@example.com", RoleLevel::Admin),
        (100, "Admin User", "admin", RoleLevel::Admin),
        (101, "Regular User", "user", RoleLevel::Member),
        (102, "Viewer User", "viewer", RoleLevel::Viewer),
    ]
    .into_iter()
    .map(|(id, name, email, role)| User {
        id,
        name: name.to_string(),
        email: email.to_string(),
        role,
        created_at_ms,
    })
    .collect()
}

// ============================================================================
// SECTION: Scope Tracker
// ============================================================================

/// Per-invocation collaborator activated from the invocation scope.
#[derive(Debug, Clone, Copy)]
pub struct ScopeTracker {
    /// Scope the tracker was activated for.
    scope: InvocationScope,
}

impl ScopeTracker {
    /// Activates a tracker for `scope`.
    #[must_use]
    pub const fn activate(scope: &InvocationScope) -> Self {
        Self {
            scope: *scope,
        }
    }

    /// Renders the tracker identity.
    fn report(self) -> Value {
        json!({
            "request_id": self.scope.id().to_string(),
            "created_at_ns": self.scope.created_at_ns(),
            "message": "Each call returns a different request id",
        })
    }
}

// ============================================================================
// SECTION: Registration
// ============================================================================

/// Returns every group of the sample host.
#[must_use]
pub fn groups(store: &Arc<UserStore>) -> Vec<GroupSpec> {
    vec![users_group(store), system_group()]
}

/// Builds the `users` group.
#[must_use]
pub fn users_group(store: &Arc<UserStore>) -> GroupSpec {
    GroupSpec::new(USERS_GROUP)
        .require(AuthorizationRequirement::authenticated())
        .operation(
            OperationSpec::new("GetById", with_store(store, get_by_id))
                .description("Gets a user by their ID")
                .input_schema(id_schema()),
        )
        .operation(
            OperationSpec::new("GetAllAsync", with_store(store, get_all))
                .description("Gets all users"),
        )
        .operation(
            OperationSpec::new("CreateAsync", with_store(store, create))
                .description("Creates a new user - requires Member role")
                .input_schema(json!({
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "email": {"type": "string"}
                    },
                    "required": ["name", "email"]
                }))
                .require(AuthorizationRequirement::policy("RequireMember")),
        )
        .operation(
            OperationSpec::new("UpdateAsync", with_store(store, update))
                .description("Updates a user - requires Manager role")
                .input_schema(json!({
                    "type": "object",
                    "properties": {
                        "id": {"type": "integer"},
                        "name": {"type": "string"},
                        "email": {"type": "string"}
                    },
                    "required": ["id", "name", "email"]
                }))
                .require(AuthorizationRequirement::policy("RequireManager")),
        )
        .operation(
            OperationSpec::new("PromoteToManagerAsync", with_store(store, promote))
                .description("Promotes a user to Manager - requires Admin role")
                .input_schema(id_schema())
                .require(AuthorizationRequirement::policy("RequireAdmin")),
        )
        .operation(
            OperationSpec::new(
                "GetScopeId",
                Invoker::bound(ScopeTracker::activate, |tracker: ScopeTracker, _call| async move {
                    Ok(OperationReturn::from(StatusOutcome::ok(tracker.report())))
                }),
            )
            .description("Returns the current invocation scope ID"),
        )
        .operation(
            OperationSpec::new(
                "GetPublicInfo",
                Invoker::function(|_call| async {
                    Ok(OperationReturn::Value(json!({
                        "message": "This is public information accessible without authentication",
                        "timestamp_ms": now_ms(),
                        "server_version": SERVER_VERSION,
                    })))
                }),
            )
            .description("Gets public information without authentication")
            .allow_anonymous(),
        )
        .operation(
            OperationSpec::new(
                "Delete",
                Invoker::function(|_call| async {
                    Ok(OperationReturn::from(StatusOutcome::no_content()))
                }),
            )
            .description("Deletes a user")
            .input_schema(id_schema())
            .hidden(),
        )
}

/// Builds the `system` group.
#[must_use]
pub fn system_group() -> GroupSpec {
    GroupSpec::new(SYSTEM_GROUP).operation(
        OperationSpec::new(
            "ServerVersion",
            Invoker::function(|_call| async {
                Ok(OperationReturn::Value(json!({"version": SERVER_VERSION})))
            }),
        )
        .description("Returns the server version"),
    )
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Store-backed operation body.
type StoreBody = fn(&UserStore, &OperationCall) -> Result<OperationReturn, OperationError>;

/// Wraps a store-backed body in a static invoker.
fn with_store(store: &Arc<UserStore>, body: StoreBody) -> Invoker {
    let store = Arc::clone(store);
    Invoker::function(move |call| {
        let store = Arc::clone(&store);
        async move { body(&store, &call) }
    })
}

/// `GetById`: returns the user or a not-found payload.
fn get_by_id(store: &UserStore, call: &OperationCall) -> Result<OperationReturn, OperationError> {
    let args: UserIdArgs = call.decode()?;
    Ok(match store.get(args.id)? {
        Some(user) => StatusOutcome::ok(to_value(&user)?).into(),
        None => OperationReturn::Value(not_found(args.id)),
    })
}

/// `GetAllAsync`: resolves the user list as a deferred outcome.
fn get_all(store: &UserStore, _call: &OperationCall) -> Result<OperationReturn, OperationError> {
    let payload = to_value(&store.all()?)?;
    Ok(OperationReturn::deferred(async move {
        Ok(OperationReturn::from(StatusOutcome::ok(payload)))
    }))
}

/// `CreateAsync`: adds a member.
fn create(store: &UserStore, call: &OperationCall) -> Result<OperationReturn, OperationError> {
    let args: CreateUserArgs = call.decode()?;
    if args.name.trim().is_empty() {
        return Err(OperationError::InvalidArguments("name must be non-empty".to_string()));
    }
    let user = store.add(args.name, args.email)?;
    Ok(StatusOutcome::created(to_value(&user)?).into())
}

/// `UpdateAsync`: replaces name and email.
fn update(store: &UserStore, call: &OperationCall) -> Result<OperationReturn, OperationError> {
    let args: UpdateUserArgs = call.decode()?;
    let UpdateUserArgs {
        id,
        name,
        email,
    } = args;
    let updated = store.modify(id, |user| {
        user.name = name;
        user.email = email;
    })?;
    Ok(match updated {
        Some(user) => Wrapped::Direct(to_value(&user)?).into(),
        None => Wrapped::Direct(not_found(id)).into(),
    })
}

/// `PromoteToManagerAsync`: raises a user to Manager.
fn promote(store: &UserStore, call: &OperationCall) -> Result<OperationReturn, OperationError> {
    let args: UserIdArgs = call.decode()?;
    Ok(match store.modify(args.id, |user| user.role = RoleLevel::Manager)? {
        Some(user) => Wrapped::Outcome(StatusOutcome::ok(to_value(&user)?)).into(),
        None => OperationReturn::Value(not_found(args.id)),
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Domain not-found payload.
fn not_found(id: u32) -> Value {
    json!({"error": "User not found", "id": id})
}

/// Schema for operations taking a single `id`.
fn id_schema() -> Value {
    json!({
        "type": "object",
        "properties": {"id": {"type": "integer", "minimum": 0}},
        "required": ["id"]
    })
}

/// Serializes a payload.
fn to_value<T: Serialize>(value: &T) -> Result<Value, OperationError> {
    serde_json::to_value(value).map_err(|err| OperationError::Failed(err.to_string()))
}

/// Returns the current time in milliseconds since the Unix epoch.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}
