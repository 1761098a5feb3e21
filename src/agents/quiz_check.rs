//! 测验判分 agent
//!
//! check-quiz 信号携带 unitId、mediaIndex 与学习者答案。能力在线时由模型
//! 判分；禁用或失败时退化为对参考答案的大小写不敏感字面比对。结果记录在
//! `unitId:mediaIndex` 键下。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::agents::{Agent, AgentInput, AgentRole};
use crate::core::domain::QuizResult;
use crate::core::intent::AgentUpdate;
use crate::core::state::StatePatch;
use crate::llm::{parse_json_block, LlmCapability};

pub struct QuizCheckAgent {
    capability: Arc<dyn LlmCapability>,
}

impl QuizCheckAgent {
    pub fn new(capability: Arc<dyn LlmCapability>) -> Self {
        Self { capability }
    }

    async fn grade(&self, question: &str, expected: Option<&str>, answer: &str) -> QuizResult {
        if self.capability.enabled() {
            let prompt = format!(
                "Grade this quiz answer.\nQuestion: {question}\nReference answer: \
                 {reference}\nLearner answer: {answer}\n\
                 Return JSON: {{\"ok\": true|false, \"message\": \"one short sentence\"}}",
                question = question,
                reference = expected.unwrap_or("(use your judgement)"),
                answer = answer,
            );
            if let Ok(raw) = self.capability.generate(&prompt).await {
                if let Ok(result) = parse_json_block::<GradePayload>(&raw) {
                    return QuizResult {
                        ok: result.ok,
                        message: result.message,
                    };
                }
            }
            tracing::debug!("quiz grading fell back to literal match");
        }
        literal_grade(expected, answer)
    }
}

#[derive(Deserialize)]
struct GradePayload {
    ok: bool,
    #[serde(default)]
    message: String,
}

/// 字面比对：去空白、大小写不敏感
fn literal_grade(expected: Option<&str>, answer: &str) -> QuizResult {
    match expected {
        Some(expected) => {
            let ok = expected.trim().eq_ignore_ascii_case(answer.trim());
            QuizResult {
                ok,
                message: if ok {
                    "Correct!".to_string()
                } else {
                    format!("Not quite. Expected something like: {}", expected)
                },
            }
        }
        None => QuizResult {
            ok: false,
            message: "No reference answer available for this quiz.".to_string(),
        },
    }
}

#[async_trait]
impl Agent for QuizCheckAgent {
    fn id(&self) -> &str {
        "quiz-check"
    }

    fn role(&self) -> AgentRole {
        AgentRole::Assessment
    }

    fn priority(&self) -> i32 {
        85
    }

    async fn observe(&self, input: AgentInput<'_>) -> Option<AgentUpdate> {
        let signal = crate::agents::find_ui_intent(input.new_signals, "check-quiz")?;
        let state = input.state;
        let unit_id = signal.str_field("unitId")?;
        let media_index = signal.f64_field("mediaIndex")? as usize;
        let answer = signal.str_field("answer").unwrap_or("");

        let content = state.knowledge_repository.get(unit_id)?;
        let item = content.media.get(media_index)?;

        let result = self
            .grade(&item.content, item.answer.as_deref(), answer)
            .await;
        tracing::info!(unit = %unit_id, media_index, ok = result.ok, "quiz graded");

        let mut results = state.quiz_results.clone();
        results.insert(format!("{}:{}", unit_id, media_index), result);

        Some(AgentUpdate {
            state_patch: Some(StatePatch {
                quiz_results: Some(results),
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_grade_is_case_insensitive() {
        let r = literal_grade(Some("Photosynthesis"), "  photosynthesis ");
        assert!(r.ok);
        let r = literal_grade(Some("Photosynthesis"), "respiration");
        assert!(!r.ok);
        assert!(r.message.contains("Photosynthesis"));
    }

    #[test]
    fn test_missing_reference_answer_fails_closed() {
        let r = literal_grade(None, "anything");
        assert!(!r.ok);
    }
}
