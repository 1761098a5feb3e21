//! 学习步骤 agent：推进单元与构造当前步骤
//!
//! next-unit 信号把当前单元标记完成并指向下一个；否则在学习阶段且没有
//! 活动步骤时，取待定单元或第一个未完成单元建步。课程全部完成后保持沉默。

use async_trait::async_trait;

use crate::agents::{Agent, AgentInput, AgentRole};
use crate::core::domain::{CourseUnit, LearningStep, Phase, ProgressStatus, SenseType};
use crate::core::intent::{AgentIntent, AgentUpdate};
use crate::core::state::StatePatch;

pub struct LearningStepBuilderAgent;

fn step_for(unit: &CourseUnit) -> LearningStep {
    LearningStep {
        unit_id: unit.id.clone(),
        title: unit.title.clone(),
        objective: unit.objective.clone(),
        senses: vec![SenseType::Visual, SenseType::Experiment],
    }
}

#[async_trait]
impl Agent for LearningStepBuilderAgent {
    fn id(&self) -> &str {
        "learning-step-builder"
    }

    fn role(&self) -> AgentRole {
        AgentRole::Planning
    }

    fn priority(&self) -> i32 {
        70
    }

    async fn observe(&self, input: AgentInput<'_>) -> Option<AgentUpdate> {
        let state = input.state;
        let curriculum = state.curriculum.as_ref()?;

        // 分支 1：显式推进
        if let Some(signal) = crate::agents::find_ui_intent(input.new_signals, "next-unit") {
            let current_id = signal
                .str_field("unitId")
                .map(str::to_string)
                .or_else(|| state.active_step.as_ref().map(|s| s.unit_id.clone()))?;
            let mut progress = state.curriculum_progress.clone();
            progress.insert(current_id.clone(), ProgressStatus::Done);

            return Some(match curriculum.next_unit_after(&current_id) {
                Some(next) => {
                    progress.insert(next.id.clone(), ProgressStatus::InProgress);
                    tracing::info!(from = %current_id, to = %next.id, "advancing to next unit");
                    AgentUpdate {
                        state_patch: Some(StatePatch {
                            curriculum_progress: Some(progress),
                            active_step: Some(Some(step_for(next))),
                            pending_unit_id: Some(Some(next.id.clone())),
                            ..Default::default()
                        }),
                        intents: vec![AgentIntent::BuildStep {
                            unit_id: next.id.clone(),
                        }],
                        ..Default::default()
                    }
                }
                None => AgentUpdate {
                    state_patch: Some(StatePatch {
                        curriculum_progress: Some(progress),
                        active_step: Some(None),
                        pending_unit_id: Some(None),
                        ..Default::default()
                    }),
                    notes: vec!["curriculum complete".to_string()],
                    ..Default::default()
                },
            });
        }

        // 分支 2：学习阶段缺活动步骤时建步
        if state.phase != Some(Phase::Learning) || state.active_step.is_some() {
            return None;
        }
        let unit = match &state.pending_unit_id {
            Some(id) => curriculum.find_unit(id).map(|(_, u)| u),
            None => curriculum.modules.iter().flat_map(|m| m.units.iter()).find(|u| {
                state.curriculum_progress.get(&u.id) != Some(&ProgressStatus::Done)
            }),
        }?;

        let mut progress = state.curriculum_progress.clone();
        progress.insert(unit.id.clone(), ProgressStatus::InProgress);
        tracing::info!(unit = %unit.id, "building learning step");

        Some(AgentUpdate {
            state_patch: Some(StatePatch {
                curriculum_progress: Some(progress),
                active_step: Some(Some(step_for(unit))),
                pending_unit_id: Some(Some(unit.id.clone())),
                ..Default::default()
            }),
            intents: vec![AgentIntent::BuildStep {
                unit_id: unit.id.clone(),
            }],
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::curriculum::fallback_curriculum;
    use crate::core::domain::LearningGoal;
    use crate::core::state::{EvidenceSignal, SharedState};
    use chrono::Utc;
    use serde_json::json;

    fn learning_state() -> SharedState {
        let mut state = SharedState::new(LearningGoal::new("goal-1", "Optics"));
        let plan = fallback_curriculum("goal-1", "Optics");
        state.curriculum_progress = crate::core::domain::full_progress(&plan.tree);
        state.curriculum = Some(plan);
        state.phase = Some(Phase::Learning);
        state
    }

    #[tokio::test]
    async fn test_builds_first_unit_when_idle() {
        let state = learning_state();
        let update = LearningStepBuilderAgent
            .observe(AgentInput {
                now: Utc::now(),
                new_signals: &[],
                state: &state,
            })
            .await
            .unwrap();
        let patch = update.state_patch.unwrap();
        let step = patch.active_step.unwrap().unwrap();
        assert_eq!(step.unit_id, "unit-1");
        assert!(matches!(
            update.intents.as_slice(),
            [AgentIntent::BuildStep { unit_id }] if unit_id == "unit-1"
        ));
    }

    #[tokio::test]
    async fn test_silent_once_step_is_active() {
        let mut state = learning_state();
        state.active_step = Some(LearningStep {
            unit_id: "unit-1".into(),
            title: "t".into(),
            objective: String::new(),
            senses: vec![],
        });
        let update = LearningStepBuilderAgent
            .observe(AgentInput {
                now: Utc::now(),
                new_signals: &[],
                state: &state,
            })
            .await;
        assert!(update.is_none());
    }

    #[tokio::test]
    async fn test_next_unit_marks_done_and_advances() {
        let mut state = learning_state();
        state.active_step = Some(LearningStep {
            unit_id: "unit-1".into(),
            title: "t".into(),
            objective: String::new(),
            senses: vec![],
        });
        let signals = vec![EvidenceSignal::direct(
            "u",
            "goal-1",
            json!({"kind": "ui-intent", "action": "next-unit", "unitId": "unit-1"}),
        )];
        let update = LearningStepBuilderAgent
            .observe(AgentInput {
                now: Utc::now(),
                new_signals: &signals,
                state: &state,
            })
            .await
            .unwrap();
        let patch = update.state_patch.unwrap();
        let progress = patch.curriculum_progress.unwrap();
        assert_eq!(progress.get("unit-1"), Some(&ProgressStatus::Done));
        assert_eq!(progress.get("unit-2"), Some(&ProgressStatus::InProgress));
        assert_eq!(patch.active_step.unwrap().unwrap().unit_id, "unit-2");
    }

    #[tokio::test]
    async fn test_completing_last_unit_goes_quiet() {
        let mut state = learning_state();
        for id in ["unit-1", "unit-2"] {
            state
                .curriculum_progress
                .insert(id.to_string(), ProgressStatus::Done);
        }
        state.active_step = Some(LearningStep {
            unit_id: "unit-3".into(),
            title: "t".into(),
            objective: String::new(),
            senses: vec![],
        });
        let signals = vec![EvidenceSignal::direct(
            "u",
            "goal-1",
            json!({"kind": "ui-intent", "action": "next-unit", "unitId": "unit-3"}),
        )];
        let update = LearningStepBuilderAgent
            .observe(AgentInput {
                now: Utc::now(),
                new_signals: &signals,
                state: &state,
            })
            .await
            .unwrap();
        let patch = update.state_patch.unwrap();
        assert!(patch.active_step.unwrap().is_none());
        assert!(update.intents.is_empty());

        // 全部完成后，空批次保持沉默
        let mut done_state = learning_state();
        for id in ["unit-1", "unit-2", "unit-3"] {
            done_state
                .curriculum_progress
                .insert(id.to_string(), ProgressStatus::Done);
        }
        let update = LearningStepBuilderAgent
            .observe(AgentInput {
                now: Utc::now(),
                new_signals: &[],
                state: &done_state,
            })
            .await;
        assert!(update.is_none());
    }
}
