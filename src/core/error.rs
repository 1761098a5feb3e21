//! 错误类型：LLM 能力层与会话层
//!
//! 策略：上游不可用 → 重试退避后走确定性回退；响应格式错误 → 宽容提取后用默认值；
//! 前置条件缺失 → agent 返回 None；会话未启动 → 门面层返回 {ok:false, error}。

use thiserror::Error;

/// LLM 能力调用错误
#[derive(Error, Debug)]
pub enum LlmError {
    /// 命中限流，可退避重试
    #[error("rate limited by upstream")]
    RateLimited,

    #[error("api error: {0}")]
    Api(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// 会话层错误（不会越过门面边界，由 ApiResponse 承载）
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session not started")]
    NotStarted,

    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
