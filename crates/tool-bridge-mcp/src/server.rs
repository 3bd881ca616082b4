// crates/tool-bridge-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: MCP server implementations for stdio and HTTP transports.
// Purpose: Expose registered host operations as tools via JSON-RPC 2.0.
// Dependencies: tool-bridge-core, tool-bridge-config, axum, tokio
// ============================================================================

//! ## Overview
//! The MCP server exposes the operation registry using JSON-RPC 2.0 over
//! Content-Length framed stdio or HTTP POST. Every request is authenticated
//! from transport metadata and routed through [`crate::tools::ToolRouter`].
//! Requests run concurrently up to `max_inflight`; each one gets its own
//! cancellation token. On stdio the token is cancelled by
//! `notifications/cancelled`, on HTTP by the client dropping the connection.
//! Security posture: inputs are untrusted; access denials are collapsed into
//! one generic error and detail goes to the audit sink only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Instant;

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::sync::Semaphore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tool_bridge_config::ServerAuthMode;
use tool_bridge_config::ServerTransport;
use tool_bridge_config::ToolBridgeConfig;
use tool_bridge_core::BridgeSettings;
use tool_bridge_core::Invoked;
use tool_bridge_core::OperationRegistry;
use tool_bridge_core::ToolBridge;

use crate::audit::McpAuditEvent;
use crate::audit::McpAuditEventParams;
use crate::audit::McpAuditSink;
use crate::audit::McpFileAuditSink;
use crate::audit::McpNoopAuditSink;
use crate::audit::McpStderrAuditSink;
use crate::audit::SecurityAuditEvent;
use crate::auth::AuthContext;
use crate::auth::CallerAuthn;
use crate::auth::DefaultCallerAuthn;
use crate::auth::RequestContext;
use crate::oracle::ClaimsOracle;
use crate::telemetry::McpMethod;
use crate::telemetry::McpMetricEvent;
use crate::telemetry::McpMetrics;
use crate::telemetry::McpOutcome;
use crate::telemetry::NoopMetrics;
use crate::tools::ToolDefinition;
use crate::tools::ToolError;
use crate::tools::ToolRouter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// MCP protocol revision reported by `initialize`.
const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
/// Server name reported by `initialize`.
const SERVER_NAME: &str = "tool-bridge";
/// Pending stdio responses before request tasks wait on the writer.
const STDIO_WRITE_QUEUE: usize = 64;
/// Response body used when a response cannot be serialized.
const SERIALIZATION_FALLBACK: &[u8] = br#"{"jsonrpc":"2.0","id":null,"error":{"code":-32060,"message":"serialization failure","data":{"kind":"serialization"}}}"#;

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server configuration.
    config: ToolBridgeConfig,
    /// Shared request handling state.
    state: ServerState,
}

impl McpServer {
    /// Builds a new MCP server from configuration and a sealed registry.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when configuration is invalid or the audit
    /// sink cannot be opened.
    pub fn from_config(
        config: ToolBridgeConfig,
        registry: OperationRegistry,
    ) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let audit = build_audit_sink(&config)?;
        let state = build_server_state(&config, registry, audit, Arc::new(NoopMetrics));
        emit_security_posture(&config, state.audit.as_ref());
        Ok(Self {
            config,
            state,
        })
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn McpMetrics>) -> Self {
        self.state.metrics = metrics;
        self
    }

    /// Serves requests using the configured transport.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the server fails.
    pub async fn serve(self) -> Result<(), McpServerError> {
        let state = Arc::new(self.state);
        match self.config.server.transport {
            ServerTransport::Stdio => serve_stdio(state).await,
            ServerTransport::Http => serve_http(&self.config, state).await,
        }
    }
}

/// Builds the request handling state from configuration.
fn build_server_state(
    config: &ToolBridgeConfig,
    registry: OperationRegistry,
    audit: Arc<dyn McpAuditSink>,
    metrics: Arc<dyn McpMetrics>,
) -> ServerState {
    let oracle = Arc::new(ClaimsOracle::from_config(&config.policies));
    let settings = BridgeSettings {
        enforce_authorization: config.server.auth.enforce_authorization,
        rename_fields: config.tools.rename_fields,
    };
    let bridge = ToolBridge::new(registry, oracle.clone(), oracle, settings);
    ServerState {
        router: ToolRouter::new(bridge, Arc::clone(&audit)),
        authn: Arc::new(DefaultCallerAuthn::from_config(&config.server.auth)),
        audit,
        metrics,
        transport: config.server.transport,
        require_authentication: config.server.auth.require_authentication,
        max_body_bytes: config.server.max_body_bytes,
        inflight: Arc::new(Semaphore::new(config.server.max_inflight)),
    }
}

/// Builds the audit sink selected by configuration.
fn build_audit_sink(config: &ToolBridgeConfig) -> Result<Arc<dyn McpAuditSink>, McpServerError> {
    if !config.server.audit.enabled {
        return Ok(Arc::new(McpNoopAuditSink));
    }
    match config.server.audit.path.as_deref() {
        Some(path) => {
            let sink = McpFileAuditSink::new(Path::new(path.trim()))
                .map_err(|err| McpServerError::Init(format!("audit log: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(McpStderrAuditSink)),
    }
}

/// Records startup warnings for permissive security settings.
fn emit_security_posture(config: &ToolBridgeConfig, audit: &dyn McpAuditSink) {
    let auth = &config.server.auth;
    let mode = auth.mode.as_str();
    let mut warnings = Vec::new();
    if auth.mode == ServerAuthMode::LocalOnly {
        warnings.push((
            "local_only_auth",
            "server running in local-only mode; configure server.auth for bearer_token",
        ));
    }
    if !auth.enforce_authorization {
        warnings.push((
            "authorization_disabled",
            "authorization pre-filter disabled; every tool call is allowed",
        ));
    }
    if !auth.require_authentication {
        warnings.push((
            "authentication_optional",
            "unauthenticated callers may list and call tools",
        ));
    }
    for (kind, message) in warnings {
        audit.record_security(&SecurityAuditEvent::new(
            kind,
            Some(message.to_string()),
            mode,
            auth.enforce_authorization,
        ));
    }
}

/// Shared server state for transport handlers.
struct ServerState {
    /// Tool router for request dispatch.
    router: ToolRouter,
    /// Caller authentication.
    authn: Arc<dyn CallerAuthn>,
    /// Audit sink for request events.
    audit: Arc<dyn McpAuditSink>,
    /// Metrics sink.
    metrics: Arc<dyn McpMetrics>,
    /// Configured transport, for audit labels.
    transport: ServerTransport,
    /// Reject unauthenticated callers on tool methods.
    require_authentication: bool,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
    /// In-flight request limiter.
    inflight: Arc<Semaphore>,
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// In-flight stdio requests keyed by serialized JSON-RPC id.
///
/// An id is registered at most once; a second request reusing a live id is
/// refused so each cancellation reaches exactly one request.
#[derive(Default)]
struct InflightRequests {
    /// Cancellation tokens of running requests.
    tokens: Mutex<BTreeMap<String, CancellationToken>>,
}

impl InflightRequests {
    /// Registers `key`; returns false when the id is already in flight.
    fn register(&self, key: &str, cancel: &CancellationToken) -> bool {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        if tokens.contains_key(key) {
            return false;
        }
        tokens.insert(key.to_string(), cancel.clone());
        true
    }

    /// Forgets a finished request.
    fn release(&self, key: &str) {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner).remove(key);
    }

    /// Cancels the request named by a `notifications/cancelled` payload.
    fn cancel(&self, params: Option<&Value>) {
        let Some(request_id) = params.and_then(|params| params.get("requestId")) else {
            return;
        };
        let tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = tokens.get(&request_id.to_string()) {
            token.cancel();
        }
    }
}

/// Serves JSON-RPC requests over stdin/stdout until stdin closes.
async fn serve_stdio(state: Arc<ServerState>) -> Result<(), McpServerError> {
    let mut reader = BufReader::new(tokio::io::stdin());
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(STDIO_WRITE_QUEUE);
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(payload) = rx.recv().await {
            write_framed(&mut stdout, &payload).await?;
        }
        Ok::<(), McpServerError>(())
    });
    let inflight = Arc::new(InflightRequests::default());

    while let Some(bytes) = read_framed(&mut reader, state.max_body_bytes).await? {
        let context = RequestContext::stdio();
        let request_bytes = bytes.len();
        let request = match parse_request(&bytes) {
            Ok(request) => request,
            Err(rejected) => {
                let (_, body) = finish(
                    &state,
                    &context,
                    McpMethod::Invalid,
                    rejected,
                    request_bytes,
                    Instant::now(),
                );
                if let Some(body) = body {
                    tx.send(body).await.map_err(|_| closed_writer())?;
                }
                continue;
            }
        };
        if request.method == "notifications/cancelled" {
            inflight.cancel(request.params.as_ref());
            continue;
        }

        let cancel = CancellationToken::new();
        let key = request.id.as_ref().map(Value::to_string);
        if let Some(key) = &key
            && !inflight.register(key, &cancel)
        {
            let method = McpMethod::classify(&request.method);
            let rejected = duplicate_request(request.id.unwrap_or(Value::Null));
            let (_, body) =
                finish(&state, &context, method, rejected, request_bytes, Instant::now());
            if let Some(body) = body {
                tx.send(body).await.map_err(|_| closed_writer())?;
            }
            continue;
        }
        let permit = Arc::clone(&state.inflight)
            .acquire_owned()
            .await
            .map_err(|_| McpServerError::Transport("request limiter closed".to_string()))?;
        let state = Arc::clone(&state);
        let tx = tx.clone();
        let inflight = Arc::clone(&inflight);
        tokio::spawn(async move {
            let _permit = permit;
            let (_, body) = process(&state, context, request, request_bytes, &cancel).await;
            if let Some(key) = &key {
                inflight.release(key);
            }
            // Cancelled requests get no response.
            if let Some(body) = body
                && !cancel.is_cancelled()
            {
                let _ = tx.send(body).await;
            }
        });
    }

    drop(tx);
    writer.await.map_err(|_| McpServerError::Transport("stdio writer failed".to_string()))?
}

/// Rejection for a request whose id is already in flight.
fn duplicate_request(id: Value) -> Handled {
    Handled::reply(
        StatusCode::BAD_REQUEST,
        JsonRpcResponse::failure(id, -32600, "request id already in flight", "invalid_request"),
    )
}

/// Error for a stdio writer that has already stopped.
fn closed_writer() -> McpServerError {
    McpServerError::Transport("stdio writer closed".to_string())
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Serves JSON-RPC requests over HTTP.
async fn serve_http(
    config: &ToolBridgeConfig,
    state: Arc<ServerState>,
) -> Result<(), McpServerError> {
    let addr = config.server.bind_addr().map_err(|err| McpServerError::Config(err.to_string()))?;
    let app = http_router(&config.server.endpoint_path, state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|_| McpServerError::Transport("http bind failed".to_string()))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|_| McpServerError::Transport("http server failed".to_string()))
}

/// Builds the single-route HTTP application.
fn http_router(endpoint_path: &str, state: Arc<ServerState>) -> Router {
    Router::new().route(endpoint_path, post(handle_http)).with_state(state)
}

/// Handles HTTP JSON-RPC requests.
async fn handle_http(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let started = Instant::now();
    let context = http_request_context(peer, &headers);
    let Ok(bytes) = axum::body::to_bytes(body, state.max_body_bytes).await else {
        let rejected = Handled::reply(
            StatusCode::PAYLOAD_TOO_LARGE,
            JsonRpcResponse::failure(
                Value::Null,
                -32070,
                "request body too large",
                "payload_too_large",
            ),
        );
        let (status, body) =
            finish(&state, &context, McpMethod::Invalid, rejected, state.max_body_bytes, started);
        return http_response(status, body);
    };
    let Ok(_permit) = Arc::clone(&state.inflight).try_acquire_owned() else {
        let rejected = Handled::reply(
            StatusCode::SERVICE_UNAVAILABLE,
            JsonRpcResponse::failure(Value::Null, -32071, "server overloaded", "overloaded"),
        );
        let (status, body) =
            finish(&state, &context, McpMethod::Other, rejected, bytes.len(), started);
        return http_response(status, body);
    };
    // Dropping the handler future (client disconnect) cancels the request.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let (status, body) = match parse_request(&bytes) {
        Ok(request) => process(&state, context, request, bytes.len(), &cancel).await,
        Err(rejected) => {
            finish(&state, &context, McpMethod::Invalid, rejected, bytes.len(), started)
        }
    };
    http_response(status, body)
}

/// Builds the HTTP response for a processed request.
fn http_response(status: StatusCode, body: Option<Vec<u8>>) -> Response {
    match body {
        Some(body) => (status, [(CONTENT_TYPE, "application/json")], body).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Builds a request context from HTTP metadata.
fn http_request_context(peer: SocketAddr, headers: &HeaderMap) -> RequestContext {
    let auth_header =
        headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_string);
    RequestContext::http(Some(peer.ip()), auth_header)
}

// ============================================================================
// SECTION: JSON-RPC Handling
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    id: Option<Value>,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    #[serde(default)]
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    jsonrpc: &'static str,
    /// Request identifier.
    id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Success envelope.
    const fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error envelope.
    fn failure(id: Value, code: i64, message: impl Into<String>, kind: &'static str) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: JsonRpcErrorData {
                    kind,
                },
            }),
        }
    }
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Human-readable error message.
    message: String,
    /// Structured error detail.
    data: JsonRpcErrorData,
}

/// Structured JSON-RPC error detail.
#[derive(Debug, Serialize)]
struct JsonRpcErrorData {
    /// Stable error kind label.
    kind: &'static str,
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// Tool list response payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Visible tool definitions.
    tools: Vec<ToolDefinition>,
}

/// Tool call response payload.
#[derive(Debug, Serialize)]
struct ToolCallResult {
    /// Tool output content; empty for void completions.
    content: Vec<ToolContent>,
    /// Normalized payload.
    #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
    structured_content: Option<Value>,
    /// Always false; failures are JSON-RPC errors.
    #[serde(rename = "isError")]
    is_error: bool,
}

/// Tool output payloads for JSON-RPC responses.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// Serialized JSON text.
    Text {
        /// JSON text.
        text: String,
    },
}

/// Result of handling one request, before serialization.
struct Handled {
    /// HTTP status for the response.
    status: StatusCode,
    /// Response envelope; `None` for notifications.
    response: Option<JsonRpcResponse>,
    /// Tool name for tools/call.
    tool: Option<String>,
    /// Authenticated subject when known.
    subject: Option<String>,
    /// Accepted bearer token fingerprint.
    token_fingerprint: Option<String>,
}

impl Handled {
    /// Response with no tool or subject attribution.
    const fn reply(status: StatusCode, response: JsonRpcResponse) -> Self {
        Self {
            status,
            response: Some(response),
            tool: None,
            subject: None,
            token_fingerprint: None,
        }
    }

    /// No response (notification).
    const fn silent() -> Self {
        Self {
            status: StatusCode::ACCEPTED,
            response: None,
            tool: None,
            subject: None,
            token_fingerprint: None,
        }
    }

    /// Error response for a tool failure.
    fn tool_error(id: Value, error: &ToolError) -> Self {
        let (status, response) = jsonrpc_error(id, error);
        Self::reply(status, response)
    }

    /// Attaches tool and caller attribution.
    fn attributed(mut self, tool: Option<String>, auth: &AuthContext) -> Self {
        self.tool = tool;
        self.subject.clone_from(&auth.subject);
        self.token_fingerprint.clone_from(&auth.token_fingerprint);
        self
    }
}

/// Parses a JSON-RPC request payload.
fn parse_request(bytes: &[u8]) -> Result<JsonRpcRequest, Handled> {
    serde_json::from_slice(bytes).map_err(|_| {
        Handled::reply(
            StatusCode::BAD_REQUEST,
            JsonRpcResponse::failure(
                Value::Null,
                -32600,
                "invalid json-rpc request",
                "invalid_request",
            ),
        )
    })
}

/// Handles one parsed request and records audit and metrics.
async fn process(
    state: &ServerState,
    context: RequestContext,
    request: JsonRpcRequest,
    request_bytes: usize,
    cancel: &CancellationToken,
) -> (StatusCode, Option<Vec<u8>>) {
    let started = Instant::now();
    let method = McpMethod::classify(&request.method);
    let context = match &request.id {
        Some(id) => context.with_request_id(id.to_string()),
        None => context,
    };
    let handled = handle_request(state, &context, request, cancel).await;
    finish(state, &context, method, handled, request_bytes, started)
}

/// Serializes a handled request and records audit and metrics.
fn finish(
    state: &ServerState,
    context: &RequestContext,
    method: McpMethod,
    handled: Handled,
    request_bytes: usize,
    started: Instant,
) -> (StatusCode, Option<Vec<u8>>) {
    let body = handled.response.as_ref().map(serialize_response);
    let error = handled.response.as_ref().and_then(|response| response.error.as_ref());
    let error_code = error.map(|error| error.code);
    let error_kind = error.map(|error| error.data.kind);
    let outcome = if error.is_some() { McpOutcome::Error } else { McpOutcome::Ok };
    let response_bytes = body.as_ref().map_or(0, Vec::len);
    state.audit.record(&McpAuditEvent::new(McpAuditEventParams {
        request_id: context.request_id.clone(),
        transport: state.transport,
        peer_ip: context.peer_ip.map(|ip| ip.to_string()),
        method,
        tool: handled.tool.clone(),
        outcome,
        error_code,
        error_kind,
        request_bytes,
        response_bytes,
        subject: handled.subject,
        token_fingerprint: handled.token_fingerprint,
    }));
    let metric = McpMetricEvent {
        transport: state.transport,
        method,
        tool: handled.tool,
        outcome,
        error_code,
        error_kind,
        request_bytes,
        response_bytes,
    };
    state.metrics.record_request(metric.clone());
    state.metrics.record_latency(metric, started.elapsed());
    (handled.status, body)
}

/// Serializes a response envelope.
fn serialize_response(response: &JsonRpcResponse) -> Vec<u8> {
    serde_json::to_vec(response).unwrap_or_else(|_| SERIALIZATION_FALLBACK.to_vec())
}

/// Dispatches a JSON-RPC request.
async fn handle_request(
    state: &ServerState,
    context: &RequestContext,
    request: JsonRpcRequest,
    cancel: &CancellationToken,
) -> Handled {
    let Some(id) = request.id else {
        return Handled::silent();
    };
    if request.jsonrpc != "2.0" {
        return Handled::reply(
            StatusCode::BAD_REQUEST,
            JsonRpcResponse::failure(id, -32600, "invalid json-rpc version", "invalid_request"),
        );
    }
    match request.method.as_str() {
        "initialize" => {
            Handled::reply(StatusCode::OK, JsonRpcResponse::success(id, initialize_result()))
        }
        "ping" => Handled::reply(StatusCode::OK, JsonRpcResponse::success(id, json!({}))),
        "tools/list" | "tools/call" => {
            handle_tool_request(state, context, id, &request.method, request.params, cancel).await
        }
        _ => Handled::reply(
            StatusCode::BAD_REQUEST,
            JsonRpcResponse::failure(id, -32601, "method not found", "method_not_found"),
        ),
    }
}

/// Authenticates and dispatches `tools/list` and `tools/call`.
async fn handle_tool_request(
    state: &ServerState,
    context: &RequestContext,
    id: Value,
    method: &str,
    params: Option<Value>,
    cancel: &CancellationToken,
) -> Handled {
    let auth = match state.authn.authenticate(context) {
        Ok(auth) => auth,
        Err(err) => return Handled::tool_error(id, &ToolError::from(err)),
    };
    let caller = auth.caller(context.request_id.as_deref());
    if state.require_authentication && !caller.authenticated {
        let error = ToolError::Unauthenticated("authentication required".to_string());
        return Handled::tool_error(id, &error).attributed(None, &auth);
    }

    if method == "tools/list" {
        let handled = match state.router.list_tools(&caller, cancel).await {
            Ok(tools) => match serde_json::to_value(ToolListResult {
                tools,
            }) {
                Ok(value) => Handled::reply(StatusCode::OK, JsonRpcResponse::success(id, value)),
                Err(_) => Handled::tool_error(id, &ToolError::Serialization),
            },
            Err(err) => Handled::tool_error(id, &err),
        };
        return handled.attributed(None, &auth);
    }

    let call = match serde_json::from_value::<ToolCallParams>(params.unwrap_or(Value::Null)) {
        Ok(call) => call,
        Err(_) => {
            let error = ToolError::InvalidParams("invalid tool params".to_string());
            return Handled::tool_error(id, &error).attributed(None, &auth);
        }
    };
    let tool = Some(call.name.clone());
    let handled = match state.router.call_tool(&caller, &call.name, call.arguments, cancel).await {
        Ok(invoked) => match render_call_result(&invoked) {
            Ok(value) => Handled::reply(StatusCode::OK, JsonRpcResponse::success(id, value)),
            Err(err) => Handled::tool_error(id, &err),
        },
        Err(err) => Handled::tool_error(id, &err),
    };
    handled.attributed(tool, &auth)
}

/// Renders a successful invocation as an MCP tool result.
fn render_call_result(invoked: &Invoked) -> Result<Value, ToolError> {
    let content = if invoked.present {
        let text = serde_json::to_string(&invoked.payload).map_err(|_| ToolError::Serialization)?;
        vec![ToolContent::Text {
            text,
        }]
    } else {
        Vec::new()
    };
    serde_json::to_value(ToolCallResult {
        content,
        structured_content: invoked.present.then(|| invoked.payload.clone()),
        is_error: false,
    })
    .map_err(|_| ToolError::Serialization)
}

/// Result payload for `initialize`.
fn initialize_result() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": {"tools": {"listChanged": false}},
        "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")},
    })
}

/// Builds a JSON-RPC error response for a tool failure.
fn jsonrpc_error(id: Value, error: &ToolError) -> (StatusCode, JsonRpcResponse) {
    let (status, code) = match error {
        ToolError::UnknownTool(_) => (StatusCode::BAD_REQUEST, -32601),
        ToolError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, -32001),
        ToolError::AccessDenied => (StatusCode::FORBIDDEN, -32003),
        ToolError::InvalidParams(_) => (StatusCode::BAD_REQUEST, -32602),
        ToolError::OperationFailed(_) => (StatusCode::OK, -32030),
        ToolError::MarshallingFailure(_) => (StatusCode::OK, -32040),
        ToolError::Internal(_) => (StatusCode::OK, -32050),
        ToolError::Serialization => (StatusCode::OK, -32060),
        ToolError::Cancelled => (StatusCode::OK, -32800),
    };
    (status, JsonRpcResponse::failure(id, code, error.to_string(), error.kind()))
}

// ============================================================================
// SECTION: Framing Helpers
// ============================================================================

/// Reads a framed stdio payload using MCP Content-Length headers.
///
/// Returns `Ok(None)` when the stream ends between frames.
async fn read_framed<R>(
    reader: &mut R,
    max_body_bytes: usize,
) -> Result<Option<Vec<u8>>, McpServerError>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut saw_header = false;
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .await
            .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
        if bytes == 0 {
            if saw_header {
                return Err(McpServerError::Transport("stdio closed mid-frame".to_string()));
            }
            return Ok(None);
        }
        if line.trim().is_empty() {
            break;
        }
        saw_header = true;
        if let Some(value) = line.strip_prefix("Content-Length:") {
            let parsed = value
                .trim()
                .parse::<usize>()
                .map_err(|_| McpServerError::Transport("invalid content length".to_string()))?;
            content_length = Some(parsed);
        }
    }
    let len = content_length
        .ok_or_else(|| McpServerError::Transport("missing content length".to_string()))?;
    if len > max_body_bytes {
        return Err(McpServerError::Transport("payload too large".to_string()));
    }
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
    Ok(Some(buf))
}

/// Writes a framed stdio payload using MCP Content-Length headers.
async fn write_framed<W>(writer: &mut W, payload: &[u8]) -> Result<(), McpServerError>
where
    W: AsyncWrite + Unpin,
{
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer
        .write_all(header.as_bytes())
        .await
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer
        .write_all(payload)
        .await
        .map_err(|_| McpServerError::Transport("stdio write failed".to_string()))?;
    writer.flush().await.map_err(|_| McpServerError::Transport("stdio write failed".to_string()))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
