//! Unified OpenAI-compatible provider.
//!
//! One struct serves both collaborator roles: `/embeddings` for the
//! semantic search passes and `/chat/completions` for the generative
//! fallback tier. Works against any OpenAI-compatible endpoint.

use async_trait::async_trait;
use serde_json::{json, Value};

use helpclaw_core::config::ProviderConfig;
use helpclaw_core::error::{HelpClawError, Result};
use helpclaw_core::traits::{EmbeddingProvider, GenerativeProvider};

/// Built-in system prompt for the generative fallback tier, used when the
/// config does not override it.
const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a customer support assistant for an e-commerce store.

Goals:
- Help customers with questions about products, orders, shipping, refunds, and general support.
- Always be friendly, concise, and professional.
- Strictly follow the store policies and FAQs provided in the knowledge base context.

Rules:
- Use ONLY information from the provided knowledge base context and general reasoning for basic conversational help.
- If something is not clearly stated in the knowledge base, do NOT invent policies or guarantees.
- Do NOT make medical diagnoses or give personalized medical advice; tell the customer to consult their doctor.
- When you are unsure, say you will forward the request to a human agent instead of guessing.

Answer in clear, simple English. Keep answers focused and helpful.";

/// HTTP provider for any OpenAI-compatible API.
pub struct OpenAiCompatibleProvider {
    api_key: String,
    base_url: String,
    embedding_model: String,
    chat_model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    /// Create from configuration.
    ///
    /// API key resolution: `config.api_key` > `OPENAI_API_KEY` env var.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let api_key = if !config.api_key.is_empty() {
            config.api_key.clone()
        } else {
            std::env::var("OPENAI_API_KEY").unwrap_or_default()
        };

        let system_prompt = if config.system_prompt.is_empty() {
            DEFAULT_SYSTEM_PROMPT.to_string()
        } else {
            config.system_prompt.clone()
        };

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| HelpClawError::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            embedding_model: config.embedding_model.clone(),
            chat_model: config.chat_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            system_prompt,
            client,
        })
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            req
        } else {
            req.header("Authorization", format!("Bearer {}", self.api_key))
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body);
        let resp = self
            .apply_auth(req)
            .send()
            .await
            .map_err(|e| HelpClawError::Http(format!("Connection failed ({url}): {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(HelpClawError::Provider(format!(
                "API error {status}: {text}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| HelpClawError::Http(e.to_string()))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai_compatible"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let body = json!({
            "model": self.embedding_model,
            "input": texts,
        });
        let json = self.post("/embeddings", &body).await?;

        let data = json["data"]
            .as_array()
            .ok_or_else(|| HelpClawError::Provider("No data in embeddings response".into()))?;

        let mut vectors = Vec::with_capacity(data.len());
        for item in data {
            let vector: Vec<f32> = item["embedding"]
                .as_array()
                .ok_or_else(|| HelpClawError::Provider("Missing embedding vector".into()))?
                .iter()
                .filter_map(|v| v.as_f64())
                .map(|v| v as f32)
                .collect();
            vectors.push(vector);
        }
        tracing::debug!("🧠 Embedded {} texts via {}", vectors.len(), self.embedding_model);
        Ok(vectors)
    }
}

#[async_trait]
impl GenerativeProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai_compatible"
    }

    async fn generate(&self, prompt: &str, context: &str) -> Result<String> {
        let user_content = format!(
            "Customer message:\n{prompt}\n\nRelevant knowledge base:\n{context}"
        );
        let body = json!({
            "model": self.chat_model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "system", "content": self.system_prompt },
                { "role": "user", "content": user_content },
            ],
        });

        tracing::info!("🤖 Calling {} for fallback generation", self.chat_model);
        let json = self.post("/chat/completions", &body).await?;

        let content = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .ok_or_else(|| HelpClawError::Provider("No choices in response".into()))?;

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_defaults() {
        let config = ProviderConfig::default();
        let provider = OpenAiCompatibleProvider::from_config(&config).unwrap();
        assert_eq!(provider.base_url, "https://api.openai.com/v1");
        assert_eq!(provider.chat_model, "gpt-4o-mini");
        assert!(provider.system_prompt.contains("customer support assistant"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = ProviderConfig {
            base_url: "http://localhost:11434/v1/".into(),
            ..Default::default()
        };
        let provider = OpenAiCompatibleProvider::from_config(&config).unwrap();
        assert_eq!(provider.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn test_custom_system_prompt() {
        let config = ProviderConfig {
            system_prompt: "You are a test bot.".into(),
            ..Default::default()
        };
        let provider = OpenAiCompatibleProvider::from_config(&config).unwrap();
        assert_eq!(provider.system_prompt, "You are a test bot.");
    }
}
