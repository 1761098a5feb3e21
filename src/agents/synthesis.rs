//! 综合 agent：提示学习者输出自己的洞见
//!
//! 学习阶段每个非回灌批次发一条 request-output 意图，提示词围绕当前单元。

use async_trait::async_trait;

use crate::agents::{Agent, AgentInput, AgentRole};
use crate::core::domain::Phase;
use crate::core::intent::{AgentIntent, AgentUpdate};

pub struct SynthesisAgent;

#[async_trait]
impl Agent for SynthesisAgent {
    fn id(&self) -> &str {
        "synthesis"
    }

    fn role(&self) -> AgentRole {
        AgentRole::Content
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn observe(&self, input: AgentInput<'_>) -> Option<AgentUpdate> {
        if input.new_signals.is_empty() || crate::agents::all_sense_output(input.new_signals) {
            return None;
        }
        let state = input.state;
        if state.phase != Some(Phase::Learning) {
            return None;
        }
        let focus = state
            .active_step
            .as_ref()
            .map(|s| s.title.clone())
            .unwrap_or_else(|| state.goal.title.clone());

        Some(AgentUpdate {
            intents: vec![AgentIntent::RequestOutput {
                prompt: format!(
                    "Write one insight in your own words connecting {} to something \
                     you already knew.",
                    focus
                ),
            }],
            ..Default::default()
        })
    }
}
