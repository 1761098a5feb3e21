//! Agent 意图：同类最新覆盖 + 显式消费
//!
//! pending 列表按 kind 去重（后写覆盖先写），agent 通过 AgentUpdate.consumes
//! 声明已消费的 kind，由协调器统一移除。不依赖"同类型再次出现"之类的启发式。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::domain::SenseType;
use crate::core::state::StatePatch;

/// 跨 agent 传递的意图；type 为 kebab-case 判别标签
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum AgentIntent {
    DraftCurriculum {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    AskQuestions {},
    BeginTeaching {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit_id: Option<String>,
    },
    PresentSense {
        sense: SenseType,
        topic: String,
    },
    BuildStep {
        unit_id: String,
    },
    ScheduleRevision {
        node_id: String,
        due_at: DateTime<Utc>,
    },
    RequestOutput {
        prompt: String,
    },
    DeepenTopic {
        node_id: String,
    },
    ApplyPractice {
        node_id: String,
    },
    LoadExperiment {
        topic: String,
    },
}

/// 意图种类，用于去重与消费匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentKind {
    DraftCurriculum,
    AskQuestions,
    BeginTeaching,
    PresentSense,
    BuildStep,
    ScheduleRevision,
    RequestOutput,
    DeepenTopic,
    ApplyPractice,
    LoadExperiment,
}

impl AgentIntent {
    pub fn kind(&self) -> IntentKind {
        match self {
            AgentIntent::DraftCurriculum { .. } => IntentKind::DraftCurriculum,
            AgentIntent::AskQuestions {} => IntentKind::AskQuestions,
            AgentIntent::BeginTeaching { .. } => IntentKind::BeginTeaching,
            AgentIntent::PresentSense { .. } => IntentKind::PresentSense,
            AgentIntent::BuildStep { .. } => IntentKind::BuildStep,
            AgentIntent::ScheduleRevision { .. } => IntentKind::ScheduleRevision,
            AgentIntent::RequestOutput { .. } => IntentKind::RequestOutput,
            AgentIntent::DeepenTopic { .. } => IntentKind::DeepenTopic,
            AgentIntent::ApplyPractice { .. } => IntentKind::ApplyPractice,
            AgentIntent::LoadExperiment { .. } => IntentKind::LoadExperiment,
        }
    }
}

/// 向 pending 列表追加意图：同 kind 已存在则先移除，保证"最新覆盖"
pub fn push_latest_wins(pending: &mut Vec<AgentIntent>, intent: AgentIntent) {
    let kind = intent.kind();
    pending.retain(|i| i.kind() != kind);
    pending.push(intent);
}

/// 在 pending 中查找某 kind 的意图
pub fn find_pending(pending: &[AgentIntent], kind: IntentKind) -> Option<&AgentIntent> {
    pending.iter().find(|i| i.kind() == kind)
}

/// 单个 agent 一次 observe 的产出
#[derive(Debug, Clone, Default)]
pub struct AgentUpdate {
    pub state_patch: Option<StatePatch>,
    pub intents: Vec<AgentIntent>,
    /// 本次已消费的 pending 意图种类，协调器据此从 pending 中移除
    pub consumes: Vec<IntentKind>,
    pub notes: Vec<String>,
}

impl AgentUpdate {
    pub fn with_patch(patch: StatePatch) -> Self {
        Self {
            state_patch: Some(patch),
            ..Default::default()
        }
    }

    pub fn note(msg: impl Into<String>) -> Self {
        Self {
            notes: vec![msg.into()],
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_wins_per_kind() {
        let mut pending = Vec::new();
        push_latest_wins(
            &mut pending,
            AgentIntent::PresentSense {
                sense: SenseType::Visual,
                topic: "ownership".into(),
            },
        );
        push_latest_wins(&mut pending, AgentIntent::AskQuestions {});
        push_latest_wins(
            &mut pending,
            AgentIntent::PresentSense {
                sense: SenseType::Infographic,
                topic: "borrowing".into(),
            },
        );
        assert_eq!(pending.len(), 2);
        match find_pending(&pending, IntentKind::PresentSense) {
            Some(AgentIntent::PresentSense { sense, topic }) => {
                assert_eq!(*sense, SenseType::Infographic);
                assert_eq!(topic, "borrowing");
            }
            other => panic!("unexpected pending intent: {:?}", other),
        }
    }
}
