//! 信息图 sense：两段式（先组图像提示词，再调图像生成）

use std::sync::Arc;

use chrono::Utc;

use crate::core::domain::{Artifact, SenseType};
use crate::llm::LlmCapability;

pub async fn generate(capability: &Arc<dyn LlmCapability>, topic: &str) -> Artifact {
    let image_prompt = compose_image_prompt(capability, topic).await;
    let url = capability.generate_image(&image_prompt).await.ok();

    Artifact {
        id: uuid::Uuid::new_v4().to_string(),
        sense: SenseType::Infographic,
        title: format!("Infographic: {}", topic),
        body: image_prompt,
        url,
        created_at: Utc::now(),
    }
}

/// 第一段：让文本模型把主题扩写成图像提示词；失败或禁用时用固定模板
async fn compose_image_prompt(capability: &Arc<dyn LlmCapability>, topic: &str) -> String {
    if capability.enabled() {
        let request = format!(
            "Write one concise image-generation prompt for an educational \
             infographic about: {}. Plain text, one paragraph, no markdown.",
            topic
        );
        if let Ok(prompt) = capability.generate(&request).await {
            if !prompt.trim().is_empty() {
                return prompt.trim().to_string();
            }
        }
    }
    format!(
        "Clean educational infographic explaining {}, labeled diagram, flat design",
        topic
    )
}
