//! 呈现编排 agent：决定下一个 sense
//!
//! 只在 intake / learning 阶段对新信号反应；sense-output 回灌批次不再触发，
//! 避免自激励。选择顺序：没有论断 → visual；有活动步骤 → 最弱节点偏好或
//! 步骤自带 senses；置信度偏低 → infographic；否则 experiment。

use async_trait::async_trait;

use crate::agents::{Agent, AgentInput, AgentRole};
use crate::core::domain::{Phase, SenseType};
use crate::core::intent::{AgentIntent, AgentUpdate};

pub struct SenseOrchestratorAgent;

const LOW_CONFIDENCE: f64 = 0.5;

#[async_trait]
impl Agent for SenseOrchestratorAgent {
    fn id(&self) -> &str {
        "sense-orchestrator"
    }

    fn role(&self) -> AgentRole {
        AgentRole::Presentation
    }

    fn priority(&self) -> i32 {
        82
    }

    async fn observe(&self, input: AgentInput<'_>) -> Option<AgentUpdate> {
        if input.new_signals.is_empty() || crate::agents::all_sense_output(input.new_signals) {
            return None;
        }
        let state = input.state;
        if !matches!(state.phase, Some(Phase::Intake) | Some(Phase::Learning)) {
            return None;
        }

        let (sense, topic) = match (&state.thesis, &state.active_step) {
            (None, _) => (SenseType::Visual, state.goal.title.clone()),
            (Some(_), Some(step)) => {
                let preferred = state
                    .thesis_graph
                    .as_ref()
                    .and_then(|g| g.weakest_node())
                    .and_then(|n| n.preferred_sense)
                    .or_else(|| step.senses.first().copied())
                    .unwrap_or(SenseType::Infographic);
                (preferred, step.title.clone())
            }
            (Some(thesis), None) => {
                if thesis.confidence < LOW_CONFIDENCE {
                    (SenseType::Infographic, state.goal.title.clone())
                } else {
                    (SenseType::Experiment, state.goal.title.clone())
                }
            }
        };

        tracing::debug!(?sense, %topic, "presenting sense");
        Some(AgentUpdate {
            intents: vec![AgentIntent::PresentSense { sense, topic }],
            ..Default::default()
        })
    }
}
