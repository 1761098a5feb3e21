//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MENTOR__*` 覆盖（双下划线表示嵌套，如 `MENTOR__LLM__MODEL=gpt-4o`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::error::SessionError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub runtime: RuntimeSection,
    #[serde(default)]
    pub research: ResearchSection,
    #[serde(default)]
    pub persistence: PersistenceSection,
}

/// [llm] 段：后端选择、模型名与外呼节流
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / null；无 API Key 时自动降级为 null
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// 图像生成模型（infographic sense 使用）
    #[serde(default = "default_image_model")]
    pub image_model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub pacing: PacingSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            image_model: default_image_model(),
            base_url: None,
            pacing: PacingSection::default(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

/// [llm.pacing] 段：进程级请求间隔与限流退避
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingSection {
    /// 相邻外呼请求的最小间隔（毫秒）
    pub min_interval_ms: u64,
    /// 限流重试次数上限
    pub retry_attempts: u32,
    /// 指数退避基数（毫秒）
    pub backoff_base_ms: u64,
}

impl Default for PacingSection {
    fn default() -> Self {
        Self {
            min_interval_ms: 500,
            retry_attempts: 3,
            backoff_base_ms: 800,
        }
    }
}

/// [runtime] 段：管线调度参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    /// 单次 ingest 中 Sense Runner 触发的额外 pass 上限
    pub max_extra_passes: usize,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self { max_extra_passes: 1 }
    }
}

/// [research] 段：课程起草前的外部检索
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResearchSection {
    pub enabled: bool,
    pub timeout_secs: u64,
}

impl Default for ResearchSection {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 15,
        }
    }
}

/// [persistence] 段：会话状态存储路径
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PersistenceSection {
    /// 未设置时不持久化（纯内存会话）
    pub db_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmSection::default(),
            runtime: RuntimeSection::default(),
            research: ResearchSection::default(),
            persistence: PersistenceSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 MENTOR__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 MENTOR__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, SessionError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MENTOR")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    Ok(c.try_deserialize()?)
}
