//! 问卷 agent：生成 4 道入门题
//!
//! 仅在 pending 中有 ask-questions 意图且尚无问卷时出手；模型失败或禁用时
//! 使用固定模板。固定题号约定：q3 是学习目的，q4 是 0-10 信心分。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::agents::{Agent, AgentInput, AgentRole};
use crate::core::domain::{IntakeQuestion, Phase, QuestionKind};
use crate::core::intent::{find_pending, AgentUpdate, IntentKind};
use crate::core::state::StatePatch;
use crate::llm::{parse_json_block, LlmCapability};

pub struct QuestionAgent {
    capability: Arc<dyn LlmCapability>,
}

impl QuestionAgent {
    pub fn new(capability: Arc<dyn LlmCapability>) -> Self {
        Self { capability }
    }

    async fn draft_questions(&self, goal_title: &str) -> Vec<IntakeQuestion> {
        if self.capability.enabled() {
            let prompt = format!(
                "Write exactly 4 intake questions for a learner starting on: {}.\n\
                 Return JSON: {{\"questions\": [{{\"id\": \"q1\", \"prompt\": \"...\", \
                 \"kind\": \"text\"|\"choice\"|\"scale\", \"options\": []}}]}}.\n\
                 q3 must ask what the learner wants to achieve; q4 must ask for a \
                 0-10 confidence rating.",
                goal_title
            );
            if let Ok(raw) = self.capability.generate(&prompt).await {
                if let Ok(parsed) = parse_json_block::<QuestionsPayload>(&raw) {
                    if parsed.questions.len() == 4 {
                        return parsed.questions;
                    }
                }
            }
            tracing::debug!("question draft failed, using template");
        }
        template_questions(goal_title)
    }
}

#[derive(Deserialize)]
struct QuestionsPayload {
    questions: Vec<IntakeQuestion>,
}

/// 确定性模板问卷
pub fn template_questions(goal_title: &str) -> Vec<IntakeQuestion> {
    vec![
        IntakeQuestion {
            id: "q1".into(),
            prompt: format!("In your own words, what do you already know about {}?", goal_title),
            kind: QuestionKind::Text,
            options: vec![],
        },
        IntakeQuestion {
            id: "q2".into(),
            prompt: format!("How much have you studied {} before?", goal_title),
            kind: QuestionKind::Choice,
            options: vec![
                "No exposure".into(),
                "Some basics".into(),
                "Intermediate".into(),
                "Advanced".into(),
            ],
        },
        IntakeQuestion {
            id: "q3".into(),
            prompt: format!("What do you want to achieve by learning {}?", goal_title),
            kind: QuestionKind::Text,
            options: vec![],
        },
        IntakeQuestion {
            id: "q4".into(),
            prompt: format!(
                "On a scale of 0-10, how confident do you feel about {}?",
                goal_title
            ),
            kind: QuestionKind::Scale,
            options: vec![],
        },
    ]
}

#[async_trait]
impl Agent for QuestionAgent {
    fn id(&self) -> &str {
        "question"
    }

    fn role(&self) -> AgentRole {
        AgentRole::Content
    }

    fn priority(&self) -> i32 {
        85
    }

    async fn observe(&self, input: AgentInput<'_>) -> Option<AgentUpdate> {
        let state = input.state;
        if state.questions.is_some() {
            return None;
        }
        find_pending(&state.pending_intents, IntentKind::AskQuestions)?;

        let questions = self.draft_questions(&state.goal.title).await;
        tracing::info!(count = questions.len(), "intake questionnaire ready");

        Some(AgentUpdate {
            state_patch: Some(StatePatch {
                questions: Some(questions),
                phase: Some(Phase::Questionnaire),
                ..Default::default()
            }),
            consumes: vec![IntentKind::AskQuestions],
            notes: vec!["questionnaire drafted".to_string()],
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::LearningGoal;
    use crate::core::intent::AgentIntent;
    use crate::core::state::SharedState;
    use crate::llm::NullCapability;
    use chrono::Utc;

    #[tokio::test]
    async fn test_requires_pending_intent() {
        let state = SharedState::new(LearningGoal::new("goal-1", "Calculus"));
        let agent = QuestionAgent::new(Arc::new(NullCapability));
        let update = agent
            .observe(AgentInput {
                now: Utc::now(),
                new_signals: &[],
                state: &state,
            })
            .await;
        assert!(update.is_none());
    }

    #[tokio::test]
    async fn test_template_fallback_and_consume() {
        let mut state = SharedState::new(LearningGoal::new("goal-1", "Calculus"));
        state.pending_intents.push(AgentIntent::AskQuestions {});
        let agent = QuestionAgent::new(Arc::new(NullCapability));
        let update = agent
            .observe(AgentInput {
                now: Utc::now(),
                new_signals: &[],
                state: &state,
            })
            .await
            .unwrap();
        let patch = update.state_patch.unwrap();
        let questions = patch.questions.unwrap();
        assert_eq!(questions.len(), 4);
        assert_eq!(questions[1].kind, QuestionKind::Choice);
        assert_eq!(questions[1].options.len(), 4);
        assert_eq!(patch.phase, Some(Phase::Questionnaire));
        assert_eq!(update.consumes, vec![IntentKind::AskQuestions]);
    }

    #[tokio::test]
    async fn test_never_regenerates_existing_questionnaire() {
        let mut state = SharedState::new(LearningGoal::new("goal-1", "Calculus"));
        state.questions = Some(template_questions("Calculus"));
        state.pending_intents.push(AgentIntent::AskQuestions {});
        let agent = QuestionAgent::new(Arc::new(NullCapability));
        let update = agent
            .observe(AgentInput {
                now: Utc::now(),
                new_signals: &[],
                state: &state,
            })
            .await;
        assert!(update.is_none());
    }
}
