// crates/tool-bridge-mcp/src/auth.rs
// ============================================================================
// Module: MCP Caller Authentication
// Description: Turns transport metadata into an explicit caller context.
// Purpose: Provide fail-closed local-only and bearer token authentication.
// Dependencies: tool-bridge-config, tool-bridge-core, sha2
// ============================================================================

//! ## Overview
//! This module authenticates MCP requests from transport metadata and
//! produces the [`CallerContext`] the bridge threads through every oracle
//! call. Local-only mode trusts stdio and loopback peers as the configured
//! local principal. Bearer token mode maps static tokens to principals.
//!
//! ## Invariants
//! - Raw tokens never leave this module; only SHA-256 fingerprints do.
//! - Principals are held by token fingerprint, not by raw token.
//! - A malformed or unknown token is rejected, never downgraded to anonymous.
//! - A missing authorization header in bearer mode yields an anonymous caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::net::IpAddr;

use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;
use tool_bridge_config::ServerAuthConfig;
use tool_bridge_config::ServerAuthMode;
use tool_bridge_config::ServerTransport;
use tool_bridge_core::CallerContext;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted authorization header size.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;
/// Caller claim carrying the bearer token fingerprint.
pub const TOKEN_FINGERPRINT_CLAIM: &str = "token_fingerprint";

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request transport metadata used for authentication.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Transport used by the caller.
    pub transport: ServerTransport,
    /// Peer IP address when available.
    pub peer_ip: Option<IpAddr>,
    /// Authorization header value (HTTP).
    pub auth_header: Option<String>,
    /// Optional request identifier for auditing.
    pub request_id: Option<String>,
}

impl RequestContext {
    /// Builds a stdio request context.
    #[must_use]
    pub const fn stdio() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            peer_ip: None,
            auth_header: None,
            request_id: None,
        }
    }

    /// Builds an HTTP request context.
    #[must_use]
    pub const fn http(peer_ip: Option<IpAddr>, auth_header: Option<String>) -> Self {
        Self {
            transport: ServerTransport::Http,
            peer_ip,
            auth_header,
            request_id: None,
        }
    }

    /// Returns a copy with the request identifier set.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Returns true when the peer IP is loopback.
    #[must_use]
    pub fn peer_is_loopback(&self) -> bool {
        self.peer_ip.is_some_and(|ip| ip.is_loopback())
    }
}

// ============================================================================
// SECTION: Auth Context
// ============================================================================

/// Authentication method used for the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Local-only stdio or loopback access.
    Local,
    /// Bearer token authentication.
    BearerToken,
    /// No credentials presented.
    Anonymous,
}

impl AuthMethod {
    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::BearerToken => "bearer_token",
            Self::Anonymous => "anonymous",
        }
    }
}

/// Result of authenticating a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Authentication method.
    pub method: AuthMethod,
    /// Principal subject, absent for anonymous callers.
    pub subject: Option<String>,
    /// Role claims granted to the principal.
    pub roles: BTreeSet<String>,
    /// Bearer token fingerprint (sha256, hex).
    pub token_fingerprint: Option<String>,
}

impl AuthContext {
    /// Anonymous context with no claims.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            method: AuthMethod::Anonymous,
            subject: None,
            roles: BTreeSet::new(),
            token_fingerprint: None,
        }
    }

    /// Returns true when a principal was established.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        !matches!(self.method, AuthMethod::Anonymous)
    }

    /// Builds the caller context handed to the bridge.
    #[must_use]
    pub fn caller(&self, request_id: Option<&str>) -> CallerContext {
        let mut caller = CallerContext {
            subject: self.subject.clone(),
            authenticated: self.is_authenticated(),
            roles: self.roles.clone(),
            request_id: request_id.map(str::to_string),
            ..CallerContext::default()
        };
        caller.claims.insert("auth_method".to_string(), self.method.as_str().to_string());
        if let Some(fingerprint) = &self.token_fingerprint {
            caller.claims.insert(TOKEN_FINGERPRINT_CLAIM.to_string(), fingerprint.clone());
        }
        caller
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authentication errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Missing or invalid authentication.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
}

// ============================================================================
// SECTION: Traits
// ============================================================================

/// Caller authentication for MCP requests.
pub trait CallerAuthn: Send + Sync {
    /// Authenticates a request from its transport metadata.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when presented credentials are invalid or the
    /// transport is not permitted.
    fn authenticate(&self, ctx: &RequestContext) -> Result<AuthContext, AuthError>;
}

// ============================================================================
// SECTION: Default Authentication
// ============================================================================

/// Principal granted by a bearer token.
#[derive(Debug, Clone)]
struct Principal {
    /// Principal subject.
    subject: String,
    /// Role claims.
    roles: BTreeSet<String>,
}

/// Default caller authentication derived from server config.
pub struct DefaultCallerAuthn {
    /// Configured mode.
    mode: ServerAuthMode,
    /// Subject assigned to local callers.
    local_subject: String,
    /// Roles assigned to local callers.
    local_roles: BTreeSet<String>,
    /// Token fingerprint to principal map for bearer mode.
    principals: BTreeMap<String, Principal>,
}

impl DefaultCallerAuthn {
    /// Builds the authenticator from server auth configuration.
    #[must_use]
    pub fn from_config(config: &ServerAuthConfig) -> Self {
        let principals = config
            .principals
            .iter()
            .map(|principal| {
                (
                    token_fingerprint(&principal.token),
                    Principal {
                        subject: principal.subject.clone(),
                        roles: principal.roles.iter().cloned().collect(),
                    },
                )
            })
            .collect();
        Self {
            mode: config.mode,
            local_subject: config.local_subject.clone(),
            local_roles: config.local_roles.iter().cloned().collect(),
            principals,
        }
    }

    /// Returns the configured auth mode.
    #[must_use]
    pub const fn mode(&self) -> ServerAuthMode {
        self.mode
    }

    /// Authenticates a local-only request.
    fn authenticate_local(&self, ctx: &RequestContext) -> Result<AuthContext, AuthError> {
        let permitted = match ctx.transport {
            ServerTransport::Stdio => true,
            ServerTransport::Http => ctx.peer_is_loopback(),
        };
        if !permitted {
            return Err(AuthError::Unauthenticated(
                "local-only mode requires loopback access".to_string(),
            ));
        }
        Ok(AuthContext {
            method: AuthMethod::Local,
            subject: Some(self.local_subject.clone()),
            roles: self.local_roles.clone(),
            token_fingerprint: None,
        })
    }

    /// Authenticates a bearer token request.
    fn authenticate_bearer(&self, ctx: &RequestContext) -> Result<AuthContext, AuthError> {
        let Some(header) = ctx.auth_header.as_deref() else {
            return Ok(AuthContext::anonymous());
        };
        let fingerprint = token_fingerprint(parse_bearer_token(header)?);
        let principal = self
            .principals
            .get(&fingerprint)
            .ok_or_else(|| AuthError::Unauthenticated("invalid bearer token".to_string()))?;
        Ok(AuthContext {
            method: AuthMethod::BearerToken,
            subject: Some(principal.subject.clone()),
            roles: principal.roles.clone(),
            token_fingerprint: Some(fingerprint),
        })
    }
}

impl CallerAuthn for DefaultCallerAuthn {
    fn authenticate(&self, ctx: &RequestContext) -> Result<AuthContext, AuthError> {
        match self.mode {
            ServerAuthMode::LocalOnly => self.authenticate_local(ctx),
            ServerAuthMode::BearerToken => self.authenticate_bearer(ctx),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the hex SHA-256 fingerprint of a token.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Extracts the token from a `Bearer` authorization header.
fn parse_bearer_token(header: &str) -> Result<&str, AuthError> {
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Unauthenticated("authorization header too large".to_string()));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Unauthenticated("invalid authorization header".to_string()));
    }
    Ok(token)
}
