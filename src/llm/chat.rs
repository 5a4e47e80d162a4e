//! Chat-capability client: one MCP tool call in, one text response out.
//! Every call site here wants a single completion, so there's no
//! ensemble-invocation envelope to model.

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, Content};
use rmcp::service::Peer;
use rmcp::transport::TokioChildProcess;
use rmcp::{RoleClient, ServiceExt};
use std::borrow::Cow;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat model unavailable: {0}")]
    Unavailable(String),
    #[error("chat model invocation failed: {0}")]
    InvocationFailed(String),
    #[error("chat model response was not parseable: {0}")]
    ParseError(String),
}

/// A single chat completion request. `system` carries the grounding/
/// instruction prompt; `user`
/// carries the assembled context + question.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn is_available(&self) -> bool;

    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError>;
}

/// Preconfigured-response client for tests.
pub struct MockChatClient {
    available: bool,
    responses: Mutex<std::collections::VecDeque<Result<String, ChatError>>>,
    default_response: Option<String>,
}

impl MockChatClient {
    pub fn available() -> Self {
        Self { available: true, responses: Mutex::new(Default::default()), default_response: None }
    }

    pub fn unavailable() -> Self {
        Self { available: false, responses: Mutex::new(Default::default()), default_response: None }
    }

    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = Some(response.into());
        self
    }

    pub async fn push_response(&self, response: impl Into<String>) {
        self.responses.lock().await.push_back(Ok(response.into()));
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn complete(&self, _request: &ChatRequest) -> Result<String, ChatError> {
        if !self.available {
            return Err(ChatError::Unavailable("mock client configured as unavailable".to_string()));
        }
        let mut queue = self.responses.lock().await;
        if let Some(next) = queue.pop_front() {
            return next;
        }
        self.default_response.clone().ok_or_else(|| ChatError::InvocationFailed("no mock response queued".to_string()))
    }
}

/// Production client — spawns a chat-serving subprocess and communicates
/// via MCP JSON-RPC over stdin/stdout.
pub struct SubprocessChatClient {
    command: String,
    args: Vec<String>,
    peer: Mutex<Option<Peer<RoleClient>>>,
}

impl SubprocessChatClient {
    pub fn new() -> Self {
        Self { command: "llm-orc".to_string(), args: vec!["m".into(), "serve".into(), "--transport".into(), "stdio".into()], peer: Mutex::new(None) }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    async fn connect(&self) -> Result<Peer<RoleClient>, ChatError> {
        let mut cmd = tokio::process::Command::new(&self.command);
        for arg in &self.args {
            cmd.arg(arg);
        }
        let transport = TokioChildProcess::new(cmd).map_err(|e| ChatError::Unavailable(format!("failed to spawn chat subprocess: {e}")))?;
        let service = ().serve(transport).await.map_err(|e| ChatError::Unavailable(format!("MCP handshake failed: {e}")))?;
        Ok(service.peer().clone())
    }

    async fn get_peer(&self) -> Result<Peer<RoleClient>, ChatError> {
        let mut guard = self.peer.lock().await;
        if let Some(ref peer) = *guard {
            return Ok(peer.clone());
        }
        let peer = self.connect().await?;
        *guard = Some(peer.clone());
        Ok(peer)
    }
}

impl Default for SubprocessChatClient {
    fn default() -> Self {
        Self::new()
    }
}

fn extract_text_content(content: &[Content]) -> String {
    content.iter().filter_map(|c| c.as_text().map(|tc| tc.text.as_str())).collect::<Vec<_>>().join("\n")
}

#[async_trait]
impl ChatClient for SubprocessChatClient {
    async fn is_available(&self) -> bool {
        self.get_peer().await.is_ok()
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let peer = self.get_peer().await?;
        let mut arguments: HashMap<String, serde_json::Value> = HashMap::new();
        arguments.insert("system".to_string(), serde_json::Value::String(request.system.clone()));
        arguments.insert("user".to_string(), serde_json::Value::String(request.user.clone()));
        let arguments: serde_json::Map<String, serde_json::Value> = arguments.into_iter().collect();

        let result = peer
            .call_tool(CallToolRequestParams { meta: None, name: Cow::Borrowed("complete"), arguments: Some(arguments), task: None })
            .await
            .map_err(|e| ChatError::InvocationFailed(format!("MCP call_tool failed: {e}")))?;

        if result.is_error == Some(true) {
            return Err(ChatError::InvocationFailed(extract_text_content(&result.content)));
        }
        Ok(extract_text_content(&result.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_client_returns_queued_responses_in_order() {
        let client = MockChatClient::available();
        client.push_response("first").await;
        client.push_response("second").await;
        let req = ChatRequest { system: "s".into(), user: "u".into() };
        assert_eq!(client.complete(&req).await.unwrap(), "first");
        assert_eq!(client.complete(&req).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn unavailable_client_errors() {
        let client = MockChatClient::unavailable();
        assert!(!client.is_available().await);
        let req = ChatRequest { system: "s".into(), user: "u".into() };
        assert!(client.complete(&req).await.is_err());
    }

    #[tokio::test]
    async fn subprocess_client_reports_unavailable_when_binary_missing() {
        let client = SubprocessChatClient::new().with_command("__nonexistent_chat_binary__");
        assert!(!client.is_available().await);
    }
}
