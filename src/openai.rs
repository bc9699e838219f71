use std::fmt;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::config::Config;

/// Custom error types for chat-completion API interactions
#[derive(Error, Debug)]
pub enum OpenAiError {
    #[error("The model endpoint is currently busy. Please try again in a few moments.")]
    ServerBusy,

    #[error("Network connection failed: {message}")]
    NetworkError { message: String },

    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {message}")]
    ParseError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

impl OpenAiError {
    pub fn is_server_busy(&self) -> bool {
        matches!(self, OpenAiError::ServerBusy)
    }

    pub fn is_network_error(&self) -> bool {
        matches!(self, OpenAiError::NetworkError { .. })
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            OpenAiError::ServerBusy => {
                "🚫 The model endpoint is busy. Please try again in a few moments.".to_string()
            }
            OpenAiError::NetworkError { .. } => {
                "🌐 Network connection failed. Please check your internet connection and try again."
                    .to_string()
            }
            OpenAiError::Timeout { seconds } => {
                format!(
                    "⏰ Request timed out after {} seconds. The server might be overloaded.",
                    seconds
                )
            }
            OpenAiError::ApiError { status, .. } => match *status {
                401 => "🔑 The API key was rejected.".to_string(),
                429 => {
                    "🚫 Rate limit exceeded. Please wait a moment before trying again.".to_string()
                }
                _ => format!("❌ API error ({}). Please try again later.", status),
            },
            OpenAiError::ParseError { .. } => {
                "⚠️ Failed to parse server response. Please try again.".to_string()
            }
            OpenAiError::ConfigError { message } => {
                format!("⚙️ Configuration error: {}", message)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::plain(Role::Tool, content)
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object, as sent by the model
    pub arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

/// A function the model may call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: FunctionSpec,
}

#[derive(Debug, Clone, Serialize)]
struct FunctionSpec {
    name: String,
    description: String,
    parameters: JsonValue,
}

impl ToolSpec {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: JsonValue,
    ) -> Self {
        Self {
            tool_type: "function",
            function: FunctionSpec {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// A chat-completion call. Tools and JSON mode are opt-in.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
    pub forced_tool: Option<String>,
    pub json_mode: bool,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            forced_tool: None,
            json_mode: false,
        }
    }

    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }

    /// Offers `tool` and requires the model to call it.
    pub fn with_forced_tool(mut self, tool: ToolSpec) -> Self {
        self.forced_tool = Some(tool.name().to_string());
        self.tools.push(tool);
        self
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolSpec],
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<JsonValue>,
    max_tokens: u32,
    temperature: f32,
}

fn no_tools(tools: &&[ToolSpec]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// OpenAI-compatible chat-completion client
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    config: Config,
    max_attempts: u32,
    initial_backoff: Duration,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(config: Config) -> Result<Self, OpenAiError> {
        config.validate().map_err(|e| OpenAiError::ConfigError {
            message: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(concat!("chiller_audit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OpenAiError::ConfigError {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            config,
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
        })
    }

    /// Overrides the transient-failure retry policy.
    pub fn with_retry_policy(mut self, max_attempts: u32, initial_backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.initial_backoff = initial_backoff;
        self
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Sends a request, retrying busy and network failures with exponential backoff.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatMessage, OpenAiError> {
        let mut attempts = 0;
        let mut backoff = self.initial_backoff;

        loop {
            match self.chat_once(request).await {
                Ok(message) => return Ok(message),
                Err(e)
                    if (e.is_server_busy() || e.is_network_error())
                        && attempts < self.max_attempts - 1 =>
                {
                    attempts += 1;
                    tracing::warn!(
                        "Request attempt {} failed: {}, retrying in {:?}",
                        attempts,
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send arbitrary chat messages in JSON mode and return the raw assistant content.
    pub async fn send_messages_raw(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<String, OpenAiError> {
        let reply = self.chat(&ChatRequest::new(messages).with_json_mode()).await?;
        reply.content.ok_or_else(|| OpenAiError::ParseError {
            message: "Empty content in API response".to_string(),
        })
    }

    async fn chat_once(&self, request: &ChatRequest) -> Result<ChatMessage, OpenAiError> {
        let wire = WireRequest {
            model: &self.config.model,
            messages: &request.messages,
            response_format: request
                .json_mode
                .then_some(ResponseFormat { format_type: "json_object" }),
            tools: &request.tools,
            tool_choice: request.forced_tool.as_ref().map(|name| {
                serde_json::json!({ "type": "function", "function": { "name": name } })
            }),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&wire)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.handle_error_response(status, response).await);
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            OpenAiError::ParseError {
                message: format!("Failed to parse API response: {}", e),
            }
        })?;

        api_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| OpenAiError::ParseError {
                message: "No choices in API response".to_string(),
            })
    }

    /// Map reqwest errors to our custom error types
    fn map_reqwest_error(&self, error: reqwest::Error) -> OpenAiError {
        if error.is_timeout() {
            return OpenAiError::Timeout {
                seconds: self.config.timeout,
            };
        }

        if error.is_connect() {
            return OpenAiError::NetworkError {
                message: "Failed to connect to server".to_string(),
            };
        }

        if error.is_request() {
            return OpenAiError::NetworkError {
                message: "Request failed".to_string(),
            };
        }

        OpenAiError::NetworkError {
            message: format!("Request error: {}", error),
        }
    }

    async fn handle_error_response(
        &self,
        status: StatusCode,
        response: reqwest::Response,
    ) -> OpenAiError {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        match status {
            StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::BAD_GATEWAY
            | StatusCode::GATEWAY_TIMEOUT => OpenAiError::ServerBusy,
            _ => OpenAiError::ApiError {
                status: status.as_u16(),
                message: error_text,
            },
        }
    }
}
