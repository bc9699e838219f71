use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};
use tracing::{info, warn};

use crate::document;
use crate::openai::{ChatMessage, ChatRequest, OpenAiClient, ToolCall, ToolSpec};
use crate::schema::{self, SITE_META_DATA, TECHNICAL_DATA};
use crate::types::{CandidateRecord, ExtractionRequest};

use super::{Agent, AgentError};

const READ_DOCUMENT_TOOL: &str = "read_document";

/// Pulls a candidate record out of an audit report with one tool round:
/// the model is made to call `read_document`, then answers in JSON mode.
#[derive(Clone)]
pub struct ExtractorAgent {
    client: OpenAiClient,
}

#[derive(Debug, Deserialize)]
struct ReadDocumentArgs {
    #[serde(default)]
    file_path: Option<String>,
}

impl ExtractorAgent {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }

    fn system_prompt() -> String {
        format!(
            r#"
            You are a data processor for chiller plant audit reports. Use the `read_document` tool to read the report, then extract the data points below.
            Output ONLY a JSON object matching the schema. Do not add commentary or markdown.

            Descriptions in the schema indicate expected data and type; replace them with actual values in your output.
            Every per-chiller list must contain exactly one value per chiller, in chiller order, so its length equals how_many_chiller.
            If a value truly cannot be found in the report, use null rather than inventing it.

            Schema:
            {}
            "#,
            schema::render_prompt_schema()
        )
    }

    fn user_prompt(request: &ExtractionRequest) -> String {
        let mut prompt = format!(
            "Please extract the required data from the document `{}` and return it in the structured format.",
            request.document.display()
        );
        if let Some(error) = &request.prior_error {
            prompt.push_str(
                "\n\nYour previous extraction was rejected by the validator for these reasons:\n",
            );
            prompt.push_str(error);
            prompt.push_str("\n\nRead the document again and return a corrected, complete JSON object.");
        }
        prompt
    }

    fn read_document_tool() -> ToolSpec {
        ToolSpec::function(
            READ_DOCUMENT_TOOL,
            "Read and extract the text of the audit report",
            json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the report file"
                    }
                },
                "required": ["file_path"]
            }),
        )
    }

    /// Answers one tool call. The bound document is the only readable file.
    async fn answer_tool_call(
        call: &ToolCall,
        document: &Path,
        cached: &mut Option<String>,
    ) -> Result<String, AgentError> {
        if call.function.name != READ_DOCUMENT_TOOL {
            warn!("ExtractorAgent: model called unknown tool {}", call.function.name);
            return Ok(format!("Error: unknown tool `{}`", call.function.name));
        }

        let args: ReadDocumentArgs =
            serde_json::from_str(&call.function.arguments).unwrap_or(ReadDocumentArgs {
                file_path: None,
            });
        if let Some(requested) = args.file_path.as_deref()
            && Path::new(requested) != document
        {
            warn!(
                "ExtractorAgent: model asked for {}, serving {}",
                requested,
                document.display()
            );
        }

        if let Some(text) = cached {
            return Ok(text.clone());
        }
        let text = document::read_document(document).await?;
        *cached = Some(text.clone());
        Ok(text)
    }
}

#[async_trait]
impl Agent for ExtractorAgent {
    type Input = ExtractionRequest;
    type Output = CandidateRecord;

    async fn execute(&self, request: &Self::Input) -> Result<Self::Output, AgentError> {
        let mut messages = vec![
            ChatMessage::system(Self::system_prompt()),
            ChatMessage::user(Self::user_prompt(request)),
        ];

        info!(
            "ExtractorAgent: requesting extraction of {} (retry: {})",
            request.document.display(),
            request.prior_error.is_some()
        );
        let first = self
            .client
            .chat(&ChatRequest::new(messages.clone()).with_forced_tool(Self::read_document_tool()))
            .await?;

        let raw = if first.tool_calls().is_empty() {
            warn!("ExtractorAgent: model answered without reading the document");
            first
                .content
                .ok_or_else(|| AgentError::Unexpected("empty model response".into()))?
        } else {
            let calls = first.tool_calls().to_vec();
            messages.push(first);
            let mut cached = None;
            for call in &calls {
                info!("ExtractorAgent: tool call {} ({})", call.function.name, call.id);
                let result = Self::answer_tool_call(call, &request.document, &mut cached).await?;
                messages.push(ChatMessage::tool_result(&call.id, result));
            }
            self.client.send_messages_raw(messages).await?
        };

        info!("ExtractorAgent: received model response, parsing JSON");
        parse_candidate(&raw)
    }
}

/// Parses model output into a record. Only non-JSON or non-object output is
/// an error; a malformed section becomes empty so validation reports it.
pub fn parse_candidate(raw: &str) -> Result<CandidateRecord, AgentError> {
    let value: JsonValue = serde_json::from_str(strip_code_fence(raw))?;
    let JsonValue::Object(mut root) = value else {
        return Err(AgentError::Unexpected(format!(
            "expected a JSON object, got: {}",
            truncate(raw, 120)
        )));
    };

    let mut section = |name: &str| match root.remove(name) {
        Some(JsonValue::Object(map)) => map,
        Some(other) => {
            warn!("ExtractorAgent: `{}` is not an object: {}", name, other);
            Map::new()
        }
        None => Map::new(),
    };

    Ok(CandidateRecord {
        site_meta_data: section(SITE_META_DATA),
        technical_data: section(TECHNICAL_DATA),
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.strip_prefix("json").unwrap_or(rest);
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
