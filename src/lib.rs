//! Mentor - 自适应学习多智能体系统
//!
//! 把一个学习目标变成自适应的课程与课节流：固定优先级的 agent 管线观察共享
//! 状态，产出不可变补丁与意图，按确定顺序串行执行；呈现类意图经 Sense Runner
//! 解析后以合成信号回灌第二轮 pass；最终由 UI 构建 agent 投影出布局文档。

pub mod agents;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod research;
pub mod runtime;
pub mod senses;
pub mod surface;

pub use config::{load_config, AppConfig};
pub use crate::core::{
    AgentIntent, AgentUpdate, EvidenceSignal, IntentKind, LearningGoal, Phase, SharedState,
    StatePatch,
};
pub use runtime::{ApiResponse, SessionSupervisor, SessionView, SupervisorStatus, UiDirective};
