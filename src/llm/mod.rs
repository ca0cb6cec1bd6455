pub mod models;
pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

use models::RunStatus;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Network Error: {0}")]
    Network(String),
    #[error("API Error: {0}")]
    Api(String),
    #[error("Rate Limited")]
    RateLimited,
    #[error("Invalid Response")]
    InvalidResponse,
}

/// Remote assistant API surface: conversation threads, asynchronous runs, and
/// plain completions for the auxiliary calls (topic classification, search
/// summarization). Implementations are shared as `Arc<dyn AssistantGateway>`.
#[async_trait]
pub trait AssistantGateway: Send + Sync {
    fn name(&self) -> &str;

    async fn create_thread(&self) -> Result<String, GatewayError>;

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), GatewayError>;

    /// Start an asynchronous run against a thread, returning its opaque id.
    async fn create_run(
        &self,
        thread_id: &str,
        instructions: &str,
    ) -> Result<String, GatewayError>;

    async fn run_status(&self, thread_id: &str, run_id: &str)
        -> Result<RunStatus, GatewayError>;

    /// Newest assistant-authored message text on the thread, if any.
    async fn latest_message(&self, thread_id: &str) -> Result<Option<String>, GatewayError>;

    /// One-shot chat completion, used for classification and summarization.
    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
        temperature: f32,
    ) -> Result<String, GatewayError>;
}
