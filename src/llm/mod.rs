//! LLM 能力层：trait、OpenAI 兼容后端、空后端、节流包装与输出解析

pub mod null;
pub mod openai;
pub mod paced;
pub mod parse;
pub mod traits;

use std::sync::Arc;

pub use null::NullCapability;
pub use openai::OpenAiCapability;
pub use paced::PacedCapability;
pub use parse::{extract_json_block, parse_json_block};
pub use traits::{LlmCapability, LlmError};

use crate::config::LlmSection;

/// 按配置装配能力栈：openai 后端 + 节流包装；无 key 或 provider=null 时降级为空后端
pub fn build_capability(cfg: &LlmSection) -> Arc<dyn LlmCapability> {
    let has_key = std::env::var("OPENAI_API_KEY").is_ok();
    if cfg.provider != "openai" || !has_key {
        tracing::info!(provider = %cfg.provider, has_key, "llm capability disabled, using null backend");
        return Arc::new(NullCapability);
    }
    let inner: Arc<dyn LlmCapability> = Arc::new(OpenAiCapability::new(
        cfg.base_url.as_deref(),
        &cfg.model,
        &cfg.image_model,
        None,
    ));
    Arc::new(PacedCapability::new(inner, &cfg.pacing))
}
