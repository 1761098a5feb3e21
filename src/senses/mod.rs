//! Sense Runner：把呈现意图变成产出物
//!
//! experiment → 交互 HTML；infographic → 两段式图像；其余标签 → 静态模板。
//! 对调用方永不返回 Err：能力失败时产出"不可用"占位产物。

pub mod experiment;
pub mod infographic;
pub mod template;

use std::sync::Arc;

use crate::core::domain::{Artifact, SenseType};
use crate::core::intent::AgentIntent;
use crate::llm::LlmCapability;

pub struct SenseRunner {
    capability: Arc<dyn LlmCapability>,
}

impl SenseRunner {
    pub fn new(capability: Arc<dyn LlmCapability>) -> Self {
        Self { capability }
    }

    /// 处理一轮 pass 收集到的呈现类意图，产出 artifacts
    pub async fn run(&self, intents: &[AgentIntent]) -> Vec<Artifact> {
        let mut artifacts = Vec::new();
        for intent in intents {
            match intent {
                AgentIntent::PresentSense { sense, topic } => {
                    tracing::debug!(?sense, topic, "sense runner dispatch");
                    artifacts.push(self.dispatch(*sense, topic).await);
                }
                AgentIntent::LoadExperiment { topic } => {
                    tracing::debug!(topic, "sense runner load experiment");
                    artifacts.push(experiment::generate(&self.capability, topic).await);
                }
                _ => {}
            }
        }
        artifacts
    }

    async fn dispatch(&self, sense: SenseType, topic: &str) -> Artifact {
        match sense {
            SenseType::Experiment => experiment::generate(&self.capability, topic).await,
            SenseType::Infographic => infographic::generate(&self.capability, topic).await,
            other => template::render(other, topic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::NullCapability;

    #[tokio::test]
    async fn test_runner_never_fails_with_null_capability() {
        let runner = SenseRunner::new(Arc::new(NullCapability));
        let intents = vec![
            AgentIntent::PresentSense {
                sense: SenseType::Experiment,
                topic: "gravity".into(),
            },
            AgentIntent::PresentSense {
                sense: SenseType::Infographic,
                topic: "gravity".into(),
            },
            AgentIntent::PresentSense {
                sense: SenseType::Narrative,
                topic: "gravity".into(),
            },
            AgentIntent::LoadExperiment {
                topic: "pendulum".into(),
            },
        ];
        let artifacts = runner.run(&intents).await;
        assert_eq!(artifacts.len(), 4);
        // 实验在能力禁用时产出占位 HTML
        assert!(artifacts[0].body.contains("unavailable"));
        // 信息图后端虽禁用仍给出占位 URL
        assert!(artifacts[1].url.is_some());
    }

    #[tokio::test]
    async fn test_non_presentation_intents_are_ignored() {
        let runner = SenseRunner::new(Arc::new(NullCapability));
        let artifacts = runner
            .run(&[AgentIntent::AskQuestions {}, AgentIntent::DraftCurriculum { reason: None }])
            .await;
        assert!(artifacts.is_empty());
    }
}
