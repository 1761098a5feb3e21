//! Mermaid 修复 agent：只修被指名的那一条媒体
//!
//! fix-mermaid 信号携带 unitId、mediaIndex 与渲染端手里那份失败的 code；
//! 以信号里的 code 为待修源（缺失时退回仓库里的版本），修复后强制
//! kind = "mermaid"。其余情况一律沉默。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agents::{Agent, AgentInput, AgentRole};
use crate::core::intent::AgentUpdate;
use crate::core::state::StatePatch;
use crate::llm::LlmCapability;

pub struct MermaidFixAgent {
    capability: Arc<dyn LlmCapability>,
}

impl MermaidFixAgent {
    pub fn new(capability: Arc<dyn LlmCapability>) -> Self {
        Self { capability }
    }
}

/// 回复可能带 ``` 围栏，剥掉后取正文
fn strip_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("mermaid").unwrap_or(rest);
        let rest = rest.trim_start_matches('\n');
        match rest.rfind("```") {
            Some(end) => rest[..end].trim().to_string(),
            None => rest.trim().to_string(),
        }
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl Agent for MermaidFixAgent {
    fn id(&self) -> &str {
        "mermaid-fix"
    }

    fn role(&self) -> AgentRole {
        AgentRole::Content
    }

    fn priority(&self) -> i32 {
        80
    }

    async fn observe(&self, input: AgentInput<'_>) -> Option<AgentUpdate> {
        let signal = crate::agents::find_ui_intent(input.new_signals, "fix-mermaid")?;
        if !self.capability.enabled() {
            return None;
        }
        let state = input.state;
        let unit_id = signal.str_field("unitId")?;
        let media_index = signal.f64_field("mediaIndex")? as usize;
        let content = state.knowledge_repository.get(unit_id)?;
        let item = content.media.get(media_index)?;
        // 渲染端看到的才是真正渲染失败的版本
        let broken = signal.str_field("code").unwrap_or(&item.content);

        let prompt = format!(
            "The following Mermaid diagram fails to render. Repair it and output \
             only the corrected Mermaid code, nothing else.\n\n{}",
            broken
        );
        let raw = match self.capability.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(unit = %unit_id, media_index, error = %e, "mermaid fix failed");
                return None;
            }
        };
        let fixed = strip_fences(&raw);
        if fixed.is_empty() {
            return None;
        }

        let mut repo = state.knowledge_repository.clone();
        if let Some(entry) = repo.get_mut(unit_id) {
            if let Some(media) = entry.media.get_mut(media_index) {
                media.content = fixed;
                media.kind = "mermaid".to_string();
            }
        }
        tracing::info!(unit = %unit_id, media_index, "mermaid diagram repaired");

        Some(AgentUpdate {
            state_patch: Some(StatePatch {
                knowledge_repository: Some(repo),
                ..Default::default()
            }),
            notes: vec![format!("mermaid fixed at {}:{}", unit_id, media_index)],
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences_variants() {
        assert_eq!(strip_fences("graph TD\nA-->B"), "graph TD\nA-->B");
        assert_eq!(
            strip_fences("```mermaid\ngraph TD\nA-->B\n```"),
            "graph TD\nA-->B"
        );
        assert_eq!(strip_fences("```\ngraph LR\n```"), "graph LR");
    }
}
