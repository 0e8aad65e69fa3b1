//! MCP Server
//!
//! Reads newline-delimited JSON-RPC messages and writes one response per
//! request. Tool calls run concurrently; a single writer task serializes
//! their responses onto the output stream.

use super::handlers::ToolHandlers;
use super::protocol::*;
use super::tools::get_tools;
use crate::compliance::{ClassifiedError, ErrorKind};
use crate::gcp::http::sanitize_for_log;
use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Name reported in the `initialize` handshake
pub const SERVER_NAME: &str = "compliance-manager-mcp";

/// MCP Server
pub struct McpServer {
    handlers: Arc<ToolHandlers>,
}

impl McpServer {
    pub fn new(handlers: ToolHandlers) -> Self {
        Self {
            handlers: Arc::new(handlers),
        }
    }

    /// Run the server, reading from stdin and writing to stdout
    pub async fn run(&self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve until `reader` is exhausted and every in-flight call has answered
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_responses(writer, rx));

        tracing::info!("Server started, waiting for messages...");

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let read_result = loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break Ok(()),
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Failed to read input: {}", e);
                    break Err(e);
                }
            }

            // A bad line is answered and skipped; only EOF or an I/O error stops the loop
            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    tracing::warn!("Discarding input line that is not UTF-8: {}", e);
                    send(
                        &tx,
                        JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {}", e)),
                    );
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }
            tracing::debug!("<- {}", sanitize_for_log(line));

            self.dispatch(line, &tx);
        };

        tracing::info!("Input closed, waiting for in-flight calls");

        // The writer stops once every spawned call has dropped its sender
        drop(tx);
        writer_task.await??;
        read_result?;

        tracing::info!("Server shutting down");
        Ok(())
    }

    fn dispatch(&self, line: &str, tx: &UnboundedSender<JsonRpcResponse>) {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                send(tx, JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {}", e)));
                return;
            }
        };

        if request.is_notification() {
            tracing::debug!("Notification: {}", request.method);
            return;
        }

        let id = request.id;
        let response = match request.method.as_str() {
            "initialize" => to_response(
                id,
                &InitializeResult {
                    protocol_version: PROTOCOL_VERSION.into(),
                    capabilities: ServerCapabilities {
                        tools: ToolsCapability {
                            list_changed: false,
                        },
                    },
                    server_info: ServerInfo {
                        name: SERVER_NAME.into(),
                        version: crate::VERSION.into(),
                    },
                },
            ),

            "ping" => JsonRpcResponse::success(id, json!({})),

            "tools/list" => to_response(id, &ToolsListResult { tools: get_tools() }),

            "tools/call" => {
                let params: ToolCallParams = match serde_json::from_value(request.params) {
                    Ok(params) => params,
                    Err(e) => {
                        send(tx, JsonRpcResponse::error(id, INVALID_PARAMS, e.to_string()));
                        return;
                    }
                };
                self.spawn_tool_call(id, params, tx.clone());
                return;
            }

            method => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Unknown method: {}", method),
            ),
        };

        send(tx, response);
    }

    fn spawn_tool_call(
        &self,
        id: Option<Value>,
        params: ToolCallParams,
        tx: UnboundedSender<JsonRpcResponse>,
    ) {
        let handlers = Arc::clone(&self.handlers);

        tokio::spawn(async move {
            let ToolCallParams { name, arguments } = params;
            tracing::info!("Calling tool: {}", name);

            let tool = name.clone();
            let call = tokio::spawn(async move { handlers.call(&tool, arguments).await });

            let response = match call.await {
                Ok(Some(mapping)) => to_response(id, &ToolCallResult::from_mapping(mapping)),
                Ok(None) => {
                    JsonRpcResponse::error(id, INVALID_PARAMS, format!("Unknown tool: {}", name))
                }
                Err(e) => {
                    tracing::error!("Tool {} aborted: {}", name, e);
                    let error = ClassifiedError::new(
                        ErrorKind::Unexpected,
                        format!("Tool '{}' aborted: {}", name, e),
                    );
                    to_response(id, &ToolCallResult::from_mapping(error.to_json()))
                }
            };

            send(&tx, response);
        });
    }
}

fn to_response<T: Serialize>(id: Option<Value>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Serialization error: {}", e)),
    }
}

fn send(tx: &UnboundedSender<JsonRpcResponse>, response: JsonRpcResponse) {
    if tx.send(response).is_err() {
        tracing::warn!("Response dropped, output writer has stopped");
    }
}

async fn write_responses<W>(mut writer: W, mut rx: UnboundedReceiver<JsonRpcResponse>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut out = serde_json::to_string(&response)?;
        tracing::debug!("-> {}", sanitize_for_log(&out));

        out.push('\n');
        writer.write_all(out.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
