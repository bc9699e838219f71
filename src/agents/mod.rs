use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] crate::openai::OpenAiError),
    #[error(transparent)]
    Document(#[from] crate::document::DocumentError),
    #[error("model returned unusable output: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Unexpected: {0}")]
    Unexpected(String),
}

#[async_trait]
pub trait Agent {
    type Input: Send + Sync;
    type Output: Send + Sync;
    async fn execute(&self, input: &Self::Input) -> Result<Self::Output, AgentError>;
}

pub mod extractor;
pub mod validator;

pub use extractor::ExtractorAgent;
pub use validator::ValidatorAgent;
