//! 深度/复习 agent：学习节奏的建议性意图
//!
//! 学习阶段每个非回灌批次给出一条建议：深挖、安排复习（24 小时后到期）、
//! 或做练习。建议以意图形式留在 pending，由外层系统取用。

use async_trait::async_trait;
use chrono::Duration;

use crate::agents::{Agent, AgentInput, AgentRole};
use crate::core::domain::Phase;
use crate::core::intent::{AgentIntent, AgentUpdate};

pub struct RevisionDepthAgent;

#[async_trait]
impl Agent for RevisionDepthAgent {
    fn id(&self) -> &str {
        "revision-depth"
    }

    fn role(&self) -> AgentRole {
        AgentRole::Planning
    }

    fn priority(&self) -> i32 {
        60
    }

    async fn observe(&self, input: AgentInput<'_>) -> Option<AgentUpdate> {
        if input.new_signals.is_empty() || crate::agents::all_sense_output(input.new_signals) {
            return None;
        }
        let state = input.state;
        if state.phase != Some(Phase::Learning) {
            return None;
        }
        let graph = state.thesis_graph.as_ref()?;
        let weakest = graph.weakest_node()?;
        let confidence = graph.mean_confidence();

        let intent = if state.depth_level < 3 && confidence > 0.6 {
            AgentIntent::DeepenTopic {
                node_id: weakest.id.clone(),
            }
        } else if confidence < 0.4 {
            AgentIntent::ScheduleRevision {
                node_id: weakest.id.clone(),
                due_at: input.now + Duration::hours(24),
            }
        } else {
            AgentIntent::ApplyPractice {
                node_id: weakest.id.clone(),
            }
        };

        Some(AgentUpdate {
            intents: vec![intent],
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{ConceptNode, LearningGoal, ThesisGraph};
    use crate::core::state::{EvidenceSignal, SharedState};
    use chrono::Utc;
    use serde_json::json;

    fn state_with_confidence(confidence: f64) -> SharedState {
        let mut state = SharedState::new(LearningGoal::new("g", "Ecology"));
        state.phase = Some(Phase::Learning);
        state.thesis_graph = Some(ThesisGraph {
            nodes: vec![ConceptNode::new("concept-g", "Ecology", confidence)],
            edges: vec![],
        });
        state
    }

    #[tokio::test]
    async fn test_low_confidence_schedules_revision() {
        let state = state_with_confidence(0.2);
        let signals = vec![EvidenceSignal::direct("u", "g", json!({"kind": "revisit"}))];
        let now = Utc::now();
        let update = RevisionDepthAgent
            .observe(AgentInput {
                now,
                new_signals: &signals,
                state: &state,
            })
            .await
            .unwrap();
        match update.intents.as_slice() {
            [AgentIntent::ScheduleRevision { due_at, .. }] => {
                assert_eq!(*due_at, now + Duration::hours(24));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_shallow_but_confident_deepens() {
        let state = state_with_confidence(0.8);
        let signals = vec![EvidenceSignal::direct("u", "g", json!({"kind": "revisit"}))];
        let update = RevisionDepthAgent
            .observe(AgentInput {
                now: Utc::now(),
                new_signals: &signals,
                state: &state,
            })
            .await
            .unwrap();
        assert!(matches!(
            update.intents.as_slice(),
            [AgentIntent::DeepenTopic { .. }]
        ));
    }
}
