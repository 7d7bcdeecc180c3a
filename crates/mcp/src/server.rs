// MCP server: reads framed JSON-RPC from an input stream, routes each
// request and writes exactly one response line per answered request.

use crate::codec::{Frame, FrameError, LineCodec};
use crate::metrics::{DispatchMetrics, FailureKind, MetricsSnapshot, Outcome};
use crate::protocol::*;
use crate::tools::ToolRegistry;
use anyhow::{Context, Result};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Frames read ahead of the dispatcher while a request is being handled.
const INBOUND_QUEUE_DEPTH: usize = 64;

/// A `tools/call` that could not be dispatched to a tool.
struct CallFailure {
    kind: FailureKind,
    error: JsonRpcError,
}

impl CallFailure {
    fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            error: JsonRpcError::handler_error(message),
        }
    }
}

pub struct McpServer {
    registry: ToolRegistry,
    server_info: ServerInfo,
    metrics: DispatchMetrics,
    shutdown: CancellationToken,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            server_info: ServerInfo::default(),
            metrics: DispatchMetrics::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Cancelling this token stops [`serve`](Self::serve) between messages.
    ///
    /// A call still waiting on the remote service is abandoned and its
    /// response is not written. The token is also cancelled by the
    /// `shutdown` method, after its response has gone out.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Serve on the process's stdin/stdout until stdin closes or shutdown.
    pub async fn serve_stdio(&self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve until `reader` reaches end of stream or shutdown is requested.
    ///
    /// Reading runs on its own task so input keeps being framed while a
    /// remote call is outstanding. Requests are handled one at a time, in
    /// arrival order. Each response is written whole or not at all.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);
        let reader_task = tokio::spawn(read_frames(reader, tx));
        let mut sink = FramedWrite::new(writer, LineCodec::new());

        info!(tools = self.registry.len(), "MCP server ready");

        loop {
            let frame = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                frame = rx.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };

            let response = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                response = self.handle_frame(frame) => response,
            };

            let Some(response) = response else {
                continue;
            };

            if let Err(e) = sink.send(&response).await {
                reader_task.abort();
                return Err(e).context("Failed to write response");
            }
        }

        self.log_summary();

        if self.shutdown.is_cancelled() {
            // The reader may be parked in a read that never completes.
            reader_task.abort();
            info!("Shutdown requested, stopping");
            return Ok(());
        }

        match reader_task.await {
            Ok(Ok(())) => {
                info!("Input closed, shutting down");
                Ok(())
            }
            Ok(Err(e)) => Err(e).context("Failed to read input"),
            Err(e) => Err(e).context("Input reader task failed"),
        }
    }

    fn log_summary(&self) {
        let snapshot = self.metrics.snapshot();
        info!(
            total = snapshot.total_messages,
            succeeded = snapshot.successful_messages,
            failed = snapshot.failed_messages,
            errors = ?snapshot.error_counts,
            average_ms = snapshot.average_processing_ms,
            "Dispatcher stopped"
        );
    }

    /// Produce the response for one frame, if it warrants one.
    pub async fn handle_frame(&self, frame: Frame) -> Option<JsonRpcResponse> {
        match frame {
            Frame::Line(line) => self.handle_line(&line).await,
            Frame::Oversized => {
                self.metrics
                    .record(Outcome::Failed(FailureKind::ParseError), Duration::ZERO);
                Some(JsonRpcResponse::parse_error(
                    "Message exceeds the maximum line length",
                ))
            }
        }
    }

    /// Decode and dispatch one line.
    ///
    /// Blank lines and notifications get no response. A line that is not
    /// valid UTF-8 or not a request envelope gets a parse error with a
    /// `null` id.
    pub async fn handle_line(&self, line: &[u8]) -> Option<JsonRpcResponse> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return None;
        }

        let started = Instant::now();
        // from_slice rejects invalid UTF-8 instead of repairing it.
        let request: JsonRpcRequest = match serde_json::from_slice(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Failed to decode request");
                self.metrics
                    .record(Outcome::Failed(FailureKind::ParseError), started.elapsed());
                return Some(JsonRpcResponse::parse_error(e.to_string()));
            }
        };

        if request.is_notification() {
            self.handle_notification(&request);
            self.metrics.record(Outcome::Succeeded, started.elapsed());
            return None;
        }

        Some(self.handle_request(request).await)
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => debug!("Client initialized"),
            "notifications/cancelled" => {
                // Calls in flight run to completion; nothing to cancel.
                debug!("Client cancelled a request")
            }
            method => debug!(method, "Ignoring notification"),
        }
    }

    /// Route a request that carries an id.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let started = Instant::now();
        let (response, outcome) = self.dispatch(request).await;
        self.metrics.record(outcome, started.elapsed());

        match &response.error {
            Some(error) => debug!(error = %error, "Request failed"),
            None => debug!("Request completed"),
        }
        response
    }

    async fn dispatch(&self, request: JsonRpcRequest) -> (JsonRpcResponse, Outcome) {
        let id = request.id.unwrap_or(Value::Null);
        debug!(method = %request.method, id = %id, "Request received");

        match request.method.as_str() {
            "initialize" => (
                JsonRpcResponse::success(id, &self.initialize_result()),
                Outcome::Succeeded,
            ),
            "ping" => (
                JsonRpcResponse::success(id, &serde_json::json!({})),
                Outcome::Succeeded,
            ),
            "tools/list" => (
                JsonRpcResponse::success(
                    id,
                    &ListToolsResult {
                        tools: self.registry.list_schemas(),
                    },
                ),
                Outcome::Succeeded,
            ),
            "tools/call" => match self.call_tool(request.params).await {
                Ok(result) => {
                    let outcome = if result.is_error() {
                        Outcome::Failed(FailureKind::ToolError)
                    } else {
                        Outcome::Succeeded
                    };
                    (JsonRpcResponse::success(id, &result), outcome)
                }
                Err(failure) => (
                    JsonRpcResponse::error(id, failure.error),
                    Outcome::Failed(failure.kind),
                ),
            },
            "status" => (
                JsonRpcResponse::success(id, &self.status_result()),
                Outcome::Succeeded,
            ),
            "shutdown" => {
                info!("Shutdown requested by client");
                self.shutdown.cancel();
                let result = ShutdownResult {
                    status: "shutdown_complete".to_string(),
                    timestamp: Utc::now(),
                };
                (JsonRpcResponse::success(id, &result), Outcome::Succeeded)
            }
            method => (
                JsonRpcResponse::error(id, JsonRpcError::method_not_implemented(method)),
                Outcome::Failed(FailureKind::UnknownMethod),
            ),
        }
    }

    fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.server_info.clone(),
        }
    }

    fn status_result(&self) -> StatusResult {
        StatusResult {
            status: "ready".to_string(),
            server_info: self.server_info.clone(),
            metrics: self.metrics.snapshot(),
            timestamp: Utc::now(),
        }
    }

    /// Dispatch `tools/call`.
    ///
    /// `Err` is a protocol failure (no usable tool name). Anything that
    /// happens inside a known tool comes back as `Ok`, error-marked if needed.
    async fn call_tool(&self, params: Option<Value>) -> Result<CallToolResult, CallFailure> {
        let params = params.unwrap_or(Value::Null);

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| CallFailure::new(FailureKind::MissingToolName, "Missing tool name"))?;

        let tool = self.registry.get(name).ok_or_else(|| {
            CallFailure::new(FailureKind::UnknownTool, format!("Unknown tool: {}", name))
        })?;

        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));

        tool.execute(arguments).await.map_err(|e| {
            CallFailure::new(
                FailureKind::ToolFailure,
                format!("Tool {} failed: {:#}", name, e),
            )
        })
    }
}

/// Frame `reader` and forward each frame until end of stream.
async fn read_frames<R>(reader: R, tx: mpsc::Sender<Frame>) -> Result<(), FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut frames = FramedRead::new(reader, LineCodec::new());

    while let Some(frame) = frames.next().await {
        if tx.send(frame?).await.is_err() {
            // Dispatcher is gone; stop reading.
            break;
        }
    }
    Ok(())
}
