//! Agent 接口与全部具体 agent
//!
//! 每个 agent 独立观察共享状态与新信号，产出不可变补丁与意图；返回 None 表示
//! 本轮无贡献。observe 内部不向外抛错：能力失败降级为回退或 None。
//! 静默契约：对任何可达状态，空信号批次不得产生补丁或意图。

pub mod curriculum;
pub mod interjection;
pub mod mermaid_fix;
pub mod planner;
pub mod question;
pub mod quiz_check;
pub mod revision_depth;
pub mod sense_orchestrator;
pub mod step_builder;
pub mod synthesis;
pub mod teaching;
pub mod ui_builder;
pub mod understanding;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::core::intent::AgentUpdate;
use crate::core::state::{EvidenceSignal, SharedState};

pub use curriculum::CurriculumAgent;
pub use interjection::InterjectionAgent;
pub use mermaid_fix::MermaidFixAgent;
pub use planner::PlannerAgent;
pub use question::QuestionAgent;
pub use quiz_check::QuizCheckAgent;
pub use revision_depth::RevisionDepthAgent;
pub use sense_orchestrator::SenseOrchestratorAgent;
pub use step_builder::LearningStepBuilderAgent;
pub use synthesis::SynthesisAgent;
pub use teaching::TeachingAgent;
pub use ui_builder::UiBuilderAgent;
pub use understanding::UnderstandingAgent;

/// 角色仅作记账与日志标注，不参与调度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    Perception,
    Planning,
    Content,
    Assessment,
    Presentation,
}

/// 一次 observe 的输入：当前时刻、本批新信号、已打补丁的共享状态
pub struct AgentInput<'a> {
    pub now: DateTime<Utc>,
    pub new_signals: &'a [EvidenceSignal],
    pub state: &'a SharedState,
}

#[async_trait]
pub trait Agent: Send + Sync {
    fn id(&self) -> &str;
    fn role(&self) -> AgentRole;
    /// 数值越大越先执行；同值按注册顺序
    fn priority(&self) -> i32;
    async fn observe(&self, input: AgentInput<'_>) -> Option<AgentUpdate>;
}

/// 批次里是否存在指定 action 的 ui-intent 信号
pub(crate) fn find_ui_intent<'a>(
    signals: &'a [EvidenceSignal],
    action: &str,
) -> Option<&'a EvidenceSignal> {
    signals
        .iter()
        .find(|s| s.kind() == "ui-intent" && s.action() == action)
}

/// 批次是否全部为 sense-output 回灌信号（第二轮 pass 的批次）
pub(crate) fn all_sense_output(signals: &[EvidenceSignal]) -> bool {
    !signals.is_empty() && signals.iter().all(|s| s.kind() == "sense-output")
}
