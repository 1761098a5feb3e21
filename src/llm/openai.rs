//! OpenAI 兼容 API 能力实现
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；图像生成走
//! images/generations 接口。429 映射为 RateLimited，交给节流包装退避。

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use serde_json::json;

use crate::core::error::LlmError;
use crate::llm::traits::LlmCapability;

const SYSTEM_PROMPT: &str =
    "You are the content engine of an adaptive learning system. \
     Answer exactly in the format the prompt requests; when JSON is requested, \
     output a single JSON object and nothing else.";

/// OpenAI 兼容客户端：chat completions + 图像生成
pub struct OpenAiCapability {
    client: Client<OpenAIConfig>,
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    image_model: String,
}

impl OpenAiCapability {
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        image_model: &str,
        api_key: Option<&str>,
    ) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());
        let base_url = base_url
            .map(String::from)
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        let config = OpenAIConfig::new()
            .with_api_base(&base_url)
            .with_api_key(&api_key);

        Self {
            client: Client::with_config(config),
            http: reqwest::Client::new(),
            base_url,
            api_key,
            model: model.to_string(),
            image_model: image_model.to_string(),
        }
    }

    fn map_error(e: impl std::fmt::Display) -> LlmError {
        let msg = e.to_string();
        let lower = msg.to_lowercase();
        if lower.contains("429") || lower.contains("rate limit") {
            LlmError::RateLimited
        } else {
            LlmError::Api(msg)
        }
    }
}

#[async_trait]
impl LlmCapability for OpenAiCapability {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_PROMPT)
            .build()
            .map_err(Self::map_error)?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(Self::map_error)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestMessage::System(system),
                ChatCompletionRequestMessage::User(user),
            ])
            .build()
            .map_err(Self::map_error)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(Self::map_error)?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(LlmError::MalformedResponse("empty completion".to_string()));
        }
        Ok(content)
    }

    async fn generate_image(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/images/generations", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.image_model,
            "prompt": prompt,
            "n": 1,
            "size": "1024x1024",
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_error)?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(LlmError::Api(format!(
                "image generation failed: {}",
                response.status()
            )));
        }

        let parsed: serde_json::Value = response.json().await.map_err(Self::map_error)?;
        parsed["data"][0]["url"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| LlmError::MalformedResponse("missing image url".to_string()))
    }
}
