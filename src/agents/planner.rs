//! 规划 agent：决定管线下一步该做什么
//!
//! 任何 LLM 调用之前先走规则快路：load-experiment、已交答卷待起草课程、
//! 纯导航/内容信号旁路。只有真正模糊的局面才让模型在
//! {ask-questions, draft-curriculum, none} 里三选一；解析失败退化为安全 no-op。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::agents::{Agent, AgentInput, AgentRole};
use crate::core::domain::Phase;
use crate::core::intent::{AgentIntent, AgentUpdate};
use crate::core::state::StatePatch;
use crate::llm::{parse_json_block, LlmCapability};

pub struct PlannerAgent {
    capability: Arc<dyn LlmCapability>,
}

impl PlannerAgent {
    pub fn new(capability: Arc<dyn LlmCapability>) -> Self {
        Self { capability }
    }
}

#[derive(Deserialize)]
struct PlannerDecision {
    decision: String,
}

/// 这些信号由下游专职 agent 处理，规划器不做决策
const BYPASS_KINDS: &[&str] = &["sense-output"];
const BYPASS_ACTIONS: &[&str] = &[
    "next-unit",
    "open-unit",
    "fix-mermaid",
    "check-quiz",
    "sdui-interaction",
];

#[async_trait]
impl Agent for PlannerAgent {
    fn id(&self) -> &str {
        "planner"
    }

    fn role(&self) -> AgentRole {
        AgentRole::Planning
    }

    fn priority(&self) -> i32 {
        90
    }

    async fn observe(&self, input: AgentInput<'_>) -> Option<AgentUpdate> {
        if input.new_signals.is_empty() {
            return None;
        }
        let state = input.state;

        let mut update = AgentUpdate::default();

        // 首次接触：确立 intake 阶段
        if state.phase.is_none() {
            update.state_patch = Some(StatePatch {
                phase: Some(Phase::Intake),
                ..Default::default()
            });
            update.notes.push("entering intake".to_string());
        }

        // 快路 1：实验加载请求直接转意图
        if let Some(signal) = crate::agents::find_ui_intent(input.new_signals, "load-experiment") {
            let topic = signal
                .str_field("topic")
                .map(str::to_string)
                .or_else(|| state.active_step.as_ref().map(|s| s.title.clone()))
                .unwrap_or_else(|| state.goal.title.clone());
            update.intents.push(AgentIntent::LoadExperiment { topic });
            return Some(update);
        }

        // 快路 2：答卷已交且课程未起草
        let answered = state.answers.as_ref().map(|a| !a.is_empty()).unwrap_or(false);
        if answered && state.curriculum.is_none() {
            update.intents.push(AgentIntent::DraftCurriculum {
                reason: Some("answers submitted".to_string()),
            });
            return Some(update);
        }

        // 快路 3：纯导航/内容批次旁路
        let all_bypass = input.new_signals.iter().all(|s| {
            BYPASS_KINDS.contains(&s.kind())
                || (s.kind() == "ui-intent" && BYPASS_ACTIONS.contains(&s.action()))
        });
        if all_bypass {
            update.notes.push("routine signals, no planning".to_string());
            return Some(update);
        }

        // 已在学习阶段且课程就绪，无需全局决策
        if state.curriculum.is_some() {
            return Some(update);
        }

        // 模糊局面交给模型裁决
        let prompt = format!(
            "You orchestrate an adaptive learning session.\n\
             Goal: {}\nPhase: {:?}\nHas questionnaire: {}\nHas answers: {}\n\
             Pick the next decision as JSON: {{\"decision\": \"ask-questions\" | \
             \"draft-curriculum\" | \"none\"}}.",
            state.goal.title,
            state.phase,
            state.questions.is_some(),
            answered,
        );
        match self.capability.generate(&prompt).await {
            Ok(raw) => match parse_json_block::<PlannerDecision>(&raw) {
                Ok(d) if d.decision == "ask-questions" && state.questions.is_none() => {
                    update.intents.push(AgentIntent::AskQuestions {});
                }
                Ok(d) if d.decision == "draft-curriculum" && state.curriculum.is_none() => {
                    update.intents.push(AgentIntent::DraftCurriculum { reason: None });
                }
                Ok(_) => {
                    update.notes.push("planner: no action".to_string());
                }
                Err(e) => {
                    tracing::debug!(error = %e, "planner decision unparsable, holding position");
                    update.notes.push("planner: undecided".to_string());
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "planner llm call failed");
                update.notes.push("planner: capability unavailable".to_string());
            }
        }

        Some(update)
    }
}
