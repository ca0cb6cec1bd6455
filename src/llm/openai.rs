use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::info;

use crate::config::OpenAiConfig;
use crate::llm::{models::RunStatus, AssistantGateway, GatewayError};

const ASSISTANT_NAME: &str = "Pet Health Assistant";

const ASSISTANT_INSTRUCTIONS: &str = "You are a pet health assistant. Your role is to provide helpful advice about pet health care. \
When responding, consider the pet's information that will be provided in each conversation. \
Always be clear, professional, and focused on pet health-related matters.";

pub struct OpenAiGateway {
    client: Client,
    api_key: String,
    base_url: String,
    assistant_id: String,
    completion_model: String,
}

impl OpenAiGateway {
    /// Create the assistant definition on the remote API and return a ready
    /// gateway. Mirrors the boot-time initialization the server performs once.
    pub async fn connect(config: &OpenAiConfig) -> Result<Self, GatewayError> {
        if config.api_key.is_empty() {
            return Err(GatewayError::Api("OpenAI API key is not configured".into()));
        }

        let client = Client::new();

        info!("Creating assistant...");
        let body = json!({
            "name": ASSISTANT_NAME,
            "instructions": ASSISTANT_INSTRUCTIONS,
            "model": config.assistant_model,
        });

        let response = client
            .post(format!("{}/assistants", config.api_base))
            .header("Authorization", format!("Bearer {}", config.api_key))
            .header("OpenAI-Beta", "assistants=v2")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let json = Self::check(response).await?;
        let assistant_id = json["id"]
            .as_str()
            .ok_or(GatewayError::InvalidResponse)?
            .to_string();
        info!("Assistant created successfully: {}", assistant_id);

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.api_base.clone(),
            assistant_id,
            completion_model: config.completion_model.clone(),
        })
    }

    async fn check(response: reqwest::Response) -> Result<serde_json::Value, GatewayError> {
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(GatewayError::RateLimited);
            }
            return Err(GatewayError::Api(format!("OpenAI Error {}: {}", status, text)));
        }
        response
            .json()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))
    }

    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, GatewayError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", "assistants=v2")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Self::check(response).await
    }

    async fn get(&self, path: &str) -> Result<serde_json::Value, GatewayError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", "assistants=v2")
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Self::check(response).await
    }
}

#[async_trait]
impl AssistantGateway for OpenAiGateway {
    fn name(&self) -> &str {
        "openai"
    }

    async fn create_thread(&self) -> Result<String, GatewayError> {
        let json = self.post("/threads", json!({})).await?;
        let thread_id = json["id"]
            .as_str()
            .ok_or(GatewayError::InvalidResponse)?
            .to_string();
        info!("Thread created: {}", thread_id);
        Ok(thread_id)
    }

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), GatewayError> {
        self.post(
            &format!("/threads/{}/messages", thread_id),
            json!({ "role": "user", "content": content }),
        )
        .await?;
        Ok(())
    }

    async fn create_run(
        &self,
        thread_id: &str,
        instructions: &str,
    ) -> Result<String, GatewayError> {
        let json = self
            .post(
                &format!("/threads/{}/runs", thread_id),
                json!({
                    "assistant_id": self.assistant_id,
                    "instructions": instructions,
                }),
            )
            .await?;

        let run_id = json["id"]
            .as_str()
            .ok_or(GatewayError::InvalidResponse)?
            .to_string();
        info!("Run created: {}", run_id);
        Ok(run_id)
    }

    async fn run_status(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<RunStatus, GatewayError> {
        let json = self
            .get(&format!("/threads/{}/runs/{}", thread_id, run_id))
            .await?;

        let status = json["status"].as_str().ok_or(GatewayError::InvalidResponse)?;
        let last_error = json["last_error"]["message"].as_str();
        Ok(RunStatus::from_api(status, last_error))
    }

    async fn latest_message(&self, thread_id: &str) -> Result<Option<String>, GatewayError> {
        let json = self
            .get(&format!("/threads/{}/messages?limit=1", thread_id))
            .await?;

        // The newest message is first; user messages mean nothing has been
        // generated yet.
        let Some(first) = json["data"].get(0) else {
            return Ok(None);
        };
        if first["role"].as_str() != Some("assistant") {
            return Ok(None);
        }
        Ok(first["content"][0]["text"]["value"]
            .as_str()
            .map(|s| s.to_string()))
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
        temperature: f32,
    ) -> Result<String, GatewayError> {
        let body = json!({
            "model": self.completion_model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_content },
            ],
            "temperature": temperature,
        });

        let json = self.post("/chat/completions", body).await?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(GatewayError::InvalidResponse)?
            .to_string();
        Ok(content)
    }
}
