//! LLM 能力抽象
//!
//! 所有 agent 只依赖该 trait；enabled() == false 时调用方应走模板/字面量回退路径。

use async_trait::async_trait;

pub use crate::core::error::LlmError;

/// 文本与图像生成能力
#[async_trait]
pub trait LlmCapability: Send + Sync {
    /// 单轮文本生成；prompt 内自带指令与上下文
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// 图像生成，返回可访问的 URL
    async fn generate_image(&self, prompt: &str) -> Result<String, LlmError>;

    /// false 表示能力不可用（Null 后端），调用方据此选择确定性回退
    fn enabled(&self) -> bool {
        true
    }
}
