// MCP server: line-delimited JSON-RPC 2.0 over stdio

use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, ServerCapabilities, ServerInfo,
    ToolsCapability, PROTOCOL_VERSION,
};
use crate::tools::ToolRegistry;
use anyhow::{Context, Result};
use bytes::BytesMut;
use futures::StreamExt;
use nestpath_core::{Expander, Value};
use std::io;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, FramedRead, LinesCodec, LinesCodecError};

type Outcome = std::result::Result<serde_json::Value, JsonRpcError>;

/// Longest message line accepted before it is rejected as a parse error
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8 * 1024 * 1024;

/// One input line, or a line that was dropped before it could be parsed
#[derive(Debug)]
enum Frame {
    Line(String),
    Unreadable(&'static str),
}

/// Line codec that yields unreadable lines as frames instead of ending the stream.
///
/// `LinesCodec` has already consumed (or is discarding) the offending line when it
/// reports these errors, so decoding resumes at the next line.
struct MessageCodec {
    lines: LinesCodec,
}

impl MessageCodec {
    fn new(max_line_length: usize) -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(max_line_length),
        }
    }

    fn recover(
        decoded: std::result::Result<Option<String>, LinesCodecError>,
    ) -> std::result::Result<Option<Frame>, LinesCodecError> {
        match decoded {
            Ok(line) => Ok(line.map(Frame::Line)),
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                Ok(Some(Frame::Unreadable("line exceeds maximum length")))
            }
            Err(LinesCodecError::Io(e)) if e.kind() == io::ErrorKind::InvalidData => {
                Ok(Some(Frame::Unreadable("line is not valid UTF-8")))
            }
            Err(e) => Err(e),
        }
    }
}

impl Decoder for MessageCodec {
    type Item = Frame;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> std::result::Result<Option<Frame>, Self::Error> {
        Self::recover(self.lines.decode(buf))
    }

    fn decode_eof(
        &mut self,
        buf: &mut BytesMut,
    ) -> std::result::Result<Option<Frame>, Self::Error> {
        Self::recover(self.lines.decode_eof(buf))
    }
}

pub struct McpServer {
    registry: ToolRegistry,
    server_info: ServerInfo,
    argument_expander: Option<Expander>,
    max_line_length: usize,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            server_info: ServerInfo {
                name: "nestpath".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            argument_expander: None,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// Name reported to clients in `serverInfo`
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.server_info.name = name.into();
        self
    }

    /// Expand base64 payloads in tool arguments before dispatch
    pub fn with_argument_expansion(mut self, expander: Expander) -> Self {
        self.argument_expander = Some(expander);
        self
    }

    /// Longest accepted message line in bytes; longer lines get a parse error
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Serve on the process stdin/stdout until input closes
    pub async fn start(&self) -> Result<()> {
        tracing::info!("MCP server listening on stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve one JSON-RPC message per line from `reader`, writing responses to `writer`
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut frames = FramedRead::new(reader, MessageCodec::new(self.max_line_length));

        while let Some(frame) = frames.next().await {
            let response = match frame.context("Failed to read message")? {
                Frame::Line(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    self.handle_message(&line).await
                }
                Frame::Unreadable(reason) => {
                    tracing::warn!(reason, "Failed to read message");
                    Some(JsonRpcResponse::error(
                        serde_json::Value::Null,
                        JsonRpcError::parse_error(),
                    ))
                }
            };

            if let Some(response) = response {
                write_response(&mut writer, &response).await?;
            }
        }

        tracing::info!("Input closed, shutting down");
        Ok(())
    }

    /// Handle a raw message line; `None` means no response is due
    pub async fn handle_message(&self, line: &str) -> Option<JsonRpcResponse> {
        let raw: serde_json::Value = match serde_json::from_str(line) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse message");
                return Some(JsonRpcResponse::error(
                    serde_json::Value::Null,
                    JsonRpcError::parse_error(),
                ));
            }
        };

        let id = raw.get("id").cloned().unwrap_or(serde_json::Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(raw) {
            Ok(request) => request,
            Err(_) => return Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request())),
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request()));
        }

        self.handle_request(request).await
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        tracing::debug!(method = %request.method, "Handling request");

        if request.is_notification() {
            tracing::debug!(method = %request.method, "Notification received");
            return None;
        }

        let outcome = match request.method.as_str() {
            "initialize" => self.initialize(request.params),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(request.params).await,
            method => Err(JsonRpcError::method_not_found(method)),
        };

        let id = request.id.unwrap_or(serde_json::Value::Null);
        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn initialize(&self, params: Option<serde_json::Value>) -> Outcome {
        if let Some(params) = params {
            match serde_json::from_value::<InitializeParams>(params) {
                Ok(params) => {
                    let client = params
                        .client_info
                        .map(|info| format!("{} {}", info.name, info.version))
                        .unwrap_or_else(|| "unknown client".to_string());
                    tracing::info!(
                        "Client connected: {} (protocol {})",
                        client.trim(),
                        params.protocol_version
                    );
                }
                Err(e) => return Err(JsonRpcError::invalid_params(e.to_string())),
            }
        }

        to_outcome(InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.server_info.clone(),
        })
    }

    fn list_tools(&self) -> Outcome {
        to_outcome(ListToolsResult {
            tools: self.registry.list_schemas(),
        })
    }

    async fn call_tool(&self, params: Option<serde_json::Value>) -> Outcome {
        let params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("Missing params for tools/call"))
            .and_then(|params| {
                serde_json::from_value(params).map_err(|e| {
                    JsonRpcError::invalid_params(format!("Invalid tools/call params: {}", e))
                })
            })?;

        let tool = self
            .registry
            .get(&params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name)))?;

        let arguments: serde_json::Value = match &self.argument_expander {
            Some(expander) => expander.expand(&Value::from(params.arguments)).into(),
            None => params.arguments,
        };

        let result = match tool.execute(arguments).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = %params.name, error = %e, "Tool execution failed");
                CallToolResult::error(format!("{:#}", e))
            }
        };

        to_outcome(result)
    }
}

async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut out = serde_json::to_string(response)?;
    out.push('\n');
    writer
        .write_all(out.as_bytes())
        .await
        .context("Failed to write response")?;
    writer.flush().await?;
    Ok(())
}

fn to_outcome(result: impl serde::Serialize) -> Outcome {
    serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::default_registry;
    use serde_json::json;

    fn server() -> McpServer {
        McpServer::new(default_registry(Expander::default()))
    }

    async fn call(server: &McpServer, message: serde_json::Value) -> JsonRpcResponse {
        server
            .handle_message(&message.to_string())
            .await
            .expect("expected a response")
    }

    fn tool_text(response: &JsonRpcResponse) -> String {
        let result = response.result.as_ref().unwrap();
        result["content"][0]["text"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = call(
            &server().with_name("custom"),
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "initialize",
                "params": {
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {"name": "test-client", "version": "0.0.1"}
                }
            }),
        )
        .await;

        assert_eq!(response.id, json!(1));
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "custom");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn test_tools_list() {
        let response = call(
            &server(),
            json!({"jsonrpc": "2.0", "id": "list", "method": "tools/list"}),
        )
        .await;

        let result = response.result.unwrap();
        let names: Vec<&str> = result["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["base64_expand", "path_get", "path_has", "path_parse", "path_set"]
        );
        assert!(result["tools"][0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn test_tools_call() {
        let response = call(
            &server(),
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "tools/call",
                "params": {
                    "name": "path_set",
                    "arguments": {"data": {"a": [1, 2, 3]}, "path": "a[-1]", "value": 9}
                }
            }),
        )
        .await;

        assert!(response.error.is_none());
        let value: serde_json::Value = serde_json::from_str(&tool_text(&response)).unwrap();
        assert_eq!(value, json!({"a": [1, 2, 9]}));
    }

    #[tokio::test]
    async fn test_tool_failure_is_tool_result() {
        let response = call(
            &server(),
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": {"name": "path_get", "arguments": {"data": {}}}
            }),
        )
        .await;

        assert!(response.error.is_none());
        assert_eq!(response.result.as_ref().unwrap()["isError"], true);
        assert!(tool_text(&response).starts_with("Error: Invalid arguments for path_get"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let response = call(
            &server(),
            json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": {"name": "nope", "arguments": {}}
            }),
        )
        .await;

        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = server();

        let response = server.handle_message("{not json").await.unwrap();
        assert_eq!(response.error.unwrap().code, JsonRpcError::PARSE_ERROR);
        assert_eq!(response.id, serde_json::Value::Null);

        let response = call(&server, json!({"jsonrpc": "1.0", "id": 4, "method": "ping"})).await;
        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_REQUEST);
        assert_eq!(response.id, json!(4));

        let response = call(&server, json!({"jsonrpc": "2.0", "id": 5})).await;
        assert_eq!(response.error.unwrap().code, JsonRpcError::INVALID_REQUEST);

        let response = call(&server, json!({"jsonrpc": "2.0", "id": 6, "method": "resources/list"})).await;
        assert_eq!(response.error.unwrap().code, JsonRpcError::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = server();
        let message = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(server.handle_message(&message.to_string()).await.is_none());

        let message = json!({"jsonrpc": "2.0", "method": "ping"});
        assert!(server.handle_message(&message.to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_argument_expansion() {
        let server = server().with_argument_expansion(Expander::default());
        // {"a": {"b": 42}}
        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0",
                "id": 8,
                "method": "tools/call",
                "params": {
                    "name": "path_get",
                    "arguments": {"data": "eyJhIjogeyJiIjogNDJ9fQ==", "path": "a.b"}
                }
            }),
        )
        .await;

        assert_eq!(tool_text(&response), "42");
    }

    #[tokio::test]
    async fn test_serve_over_lines() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"path_has","arguments":{"data":{"x":1},"path":"x"}}}"#,
            "\n",
        );
        let mut output = Vec::new();

        server().serve(input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<serde_json::Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"], json!({}));
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(responses[1]["result"]["content"][0]["text"], "true");
    }

    fn parse_responses(output: Vec<u8>) -> Vec<serde_json::Value> {
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_serve_survives_invalid_utf8() {
        let mut input = Vec::new();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        input.extend_from_slice(b"\n\xff\xfe\n");
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#);
        input.extend_from_slice(b"\n");
        let mut output = Vec::new();

        server().serve(input.as_slice(), &mut output).await.unwrap();

        let responses = parse_responses(output);
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["id"], serde_json::Value::Null);
        assert_eq!(responses[1]["error"]["code"], JsonRpcError::PARSE_ERROR);
        assert_eq!(responses[2]["id"], 2);
        assert_eq!(responses[2]["result"], json!({}));
    }

    #[tokio::test]
    async fn test_serve_rejects_overlong_line() {
        let input = format!(
            "{}\n{}\n{}\n",
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "x".repeat(500),
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
        );
        let mut output = Vec::new();

        server()
            .with_max_line_length(64)
            .serve(input.as_bytes(), &mut output)
            .await
            .unwrap();

        let responses = parse_responses(output);
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["error"]["code"], JsonRpcError::PARSE_ERROR);
        assert_eq!(responses[2]["id"], 2);
    }

    #[tokio::test]
    async fn test_unterminated_last_line_is_answered() {
        let input = r#"{"jsonrpc":"2.0","id":9,"method":"ping"}"#;
        let mut output = Vec::new();

        server().serve(input.as_bytes(), &mut output).await.unwrap();

        let responses = parse_responses(output);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 9);
    }

    #[tokio::test]
    async fn test_notification_tool_call_gets_no_response() {
        let message = json!({
            "jsonrpc": "2.0",
            "method": "tools/call",
            "params": {"name": "path_has", "arguments": {"data": {}, "path": "a"}}
        });
        assert!(server().handle_message(&message.to_string()).await.is_none());
    }
}
