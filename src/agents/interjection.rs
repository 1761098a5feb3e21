//! 插话 agent：为当前单元补充至多两条旁白
//!
//! 只在有新信号、当前单元内容已生成且 interjections 为空时出手；
//! 能力禁用或失败直接沉默，空列表留待下次机会。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::agents::{Agent, AgentInput, AgentRole};
use crate::core::intent::AgentUpdate;
use crate::core::state::StatePatch;
use crate::llm::{parse_json_block, LlmCapability};

const MAX_INTERJECTIONS: usize = 2;

pub struct InterjectionAgent {
    capability: Arc<dyn LlmCapability>,
}

impl InterjectionAgent {
    pub fn new(capability: Arc<dyn LlmCapability>) -> Self {
        Self { capability }
    }
}

#[derive(Deserialize)]
struct InterjectionsPayload {
    interjections: Vec<String>,
}

#[async_trait]
impl Agent for InterjectionAgent {
    fn id(&self) -> &str {
        "interjection"
    }

    fn role(&self) -> AgentRole {
        AgentRole::Content
    }

    fn priority(&self) -> i32 {
        65
    }

    async fn observe(&self, input: AgentInput<'_>) -> Option<AgentUpdate> {
        if input.new_signals.is_empty() || !self.capability.enabled() {
            return None;
        }
        let state = input.state;
        let step = state.active_step.as_ref()?;
        let content = state.knowledge_repository.get(&step.unit_id)?;
        if !content.interjections.is_empty() {
            return None;
        }

        let prompt = format!(
            "The learner is studying \"{}\". Write at most {} short, encouraging \
             interjections a mentor might drop in mid-lesson. Return JSON: \
             {{\"interjections\": [\"...\"]}}",
            content.title, MAX_INTERJECTIONS
        );
        let raw = self.capability.generate(&prompt).await.ok()?;
        let mut parsed = parse_json_block::<InterjectionsPayload>(&raw).ok()?;
        parsed.interjections.truncate(MAX_INTERJECTIONS);
        if parsed.interjections.is_empty() {
            return None;
        }

        let mut repo = state.knowledge_repository.clone();
        if let Some(entry) = repo.get_mut(&step.unit_id) {
            entry.interjections = parsed.interjections;
        }

        Some(AgentUpdate {
            state_patch: Some(StatePatch {
                knowledge_repository: Some(repo),
                ..Default::default()
            }),
            notes: vec![format!("interjections added for {}", step.unit_id)],
            ..Default::default()
        })
    }
}
