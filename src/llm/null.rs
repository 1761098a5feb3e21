//! 空能力后端：无 API Key 时的降级实现
//!
//! generate 返回带提示词预览的占位文本（下游 JSON 解析会安全失败并走回退），
//! generate_image 返回占位图 URL。enabled() == false。

use async_trait::async_trait;

use crate::core::error::LlmError;
use crate::llm::traits::LlmCapability;

pub struct NullCapability;

#[async_trait]
impl LlmCapability for NullCapability {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let preview: String = prompt.chars().take(240).collect();
        Ok(format!("LLM disabled. Prompt preview: {}", preview))
    }

    async fn generate_image(&self, _prompt: &str) -> Result<String, LlmError> {
        Ok("https://placehold.co/600x400?text=Infographic".to_string())
    }

    fn enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_capability_preview_is_bounded() {
        let cap = NullCapability;
        let long_prompt = "x".repeat(1000);
        let out = cap.generate(&long_prompt).await.unwrap();
        assert!(out.starts_with("LLM disabled."));
        assert!(out.len() < 300);
        assert!(!cap.enabled());
    }
}
