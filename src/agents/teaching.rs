//! 教学 agent：按单元生成讲解内容
//!
//! 触发：open-unit 信号、begin-teaching / build-step 意图、或待定单元 id。
//! 单元内容在知识仓库里按 id 缓存，命中缓存绝不重新生成；生成失败（能力
//! 在线但调用失败）返回 None，留待下次重试；能力禁用走确定性模板。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::agents::{Agent, AgentInput, AgentRole};
use crate::core::domain::{
    CourseUnit, LearningStep, MediaItem, SenseType, TeachingContent,
};
use crate::core::intent::{find_pending, AgentIntent, AgentUpdate, IntentKind};
use crate::core::state::StatePatch;
use crate::llm::{parse_json_block, LlmCapability};

pub struct TeachingAgent {
    capability: Arc<dyn LlmCapability>,
}

impl TeachingAgent {
    pub fn new(capability: Arc<dyn LlmCapability>) -> Self {
        Self { capability }
    }

    async fn generate_content(&self, unit: &CourseUnit, goal_title: &str) -> Option<TeachingContent> {
        if !self.capability.enabled() {
            return Some(template_content(unit, goal_title));
        }
        let prompt = format!(
            "UNIT: {title}\nObjective: {objective}\nLearning goal: {goal}\n\
             Teach this unit from first principles. Return JSON:\n\
             {{\"title\": \"...\", \"explanation\": \"... may contain ::media:N:: and \
             ::sense:N:: markers ...\", \"firstPrinciples\": [\"...\"], \
             \"media\": [{{\"kind\": \"mermaid\"|\"code\"|\"quiz\"|\"image\", \
             \"content\": \"...\", \"caption\": \"...\", \"answer\": \"...\"}}], \
             \"senses\": [\"experiment\"|\"infographic\"|\"visual\"|\"narrative\"], \
             \"interjections\": []}}",
            title = unit.title,
            objective = unit.objective,
            goal = goal_title,
        );
        let raw = match self.capability.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(unit = %unit.id, error = %e, "teaching generation failed");
                return None;
            }
        };
        match parse_json_block::<TeachingPayload>(&raw) {
            Ok(payload) => Some(payload.into_content(unit)),
            Err(e) => {
                tracing::warn!(unit = %unit.id, error = %e, "teaching response unparsable");
                None
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeachingPayload {
    #[serde(default)]
    title: String,
    explanation: String,
    #[serde(default)]
    first_principles: Vec<String>,
    #[serde(default)]
    media: Vec<MediaItem>,
    #[serde(default)]
    senses: Vec<SenseType>,
    #[serde(default)]
    interjections: Vec<String>,
}

impl TeachingPayload {
    fn into_content(self, unit: &CourseUnit) -> TeachingContent {
        TeachingContent {
            title: if self.title.is_empty() {
                unit.title.clone()
            } else {
                self.title
            },
            explanation: self.explanation,
            first_principles: self.first_principles,
            media: self.media,
            senses: self.senses,
            interjections: self.interjections,
        }
    }
}

/// 能力禁用时的确定性单元内容
fn template_content(unit: &CourseUnit, goal_title: &str) -> TeachingContent {
    TeachingContent {
        title: unit.title.clone(),
        explanation: format!(
            "This unit covers {title} as part of your path through {goal}. \
             {objective} Work through the material below, then check your \
             understanding with the quiz. ::media:0::",
            title = unit.title,
            goal = goal_title,
            objective = unit.objective,
        ),
        first_principles: vec![format!("Start from what {} is for", unit.title)],
        media: vec![MediaItem {
            kind: "quiz".into(),
            content: format!("In one sentence, what is the point of {}?", unit.title),
            caption: None,
            answer: None,
        }],
        senses: vec![SenseType::Visual],
        interjections: vec![],
    }
}

/// 解析本轮要教的单元：open-unit 信号 > begin-teaching 意图 > 待定单元
fn resolve_unit<'a>(input: &AgentInput<'a>) -> Option<&'a CourseUnit> {
    let state = input.state;
    let curriculum = state.curriculum.as_ref()?;

    if let Some(signal) = crate::agents::find_ui_intent(input.new_signals, "open-unit") {
        if let Some(id) = signal.str_field("unitId") {
            if let Some((_, unit)) = curriculum.find_unit(id) {
                return Some(unit);
            }
        }
        if let Some(title) = signal.str_field("title") {
            if let Some((_, unit)) = curriculum.find_unit_fuzzy(title) {
                return Some(unit);
            }
        }
        return None;
    }

    if let Some(AgentIntent::BeginTeaching { unit_id: Some(id) }) =
        find_pending(&state.pending_intents, IntentKind::BeginTeaching)
    {
        if let Some((_, unit)) = curriculum.find_unit(id) {
            return Some(unit);
        }
    }

    // 残留的待定单元（如上次生成失败）只在有新信号的轮次重试，空批次保持静默
    if input.new_signals.is_empty() {
        return None;
    }
    let pending = state.pending_unit_id.as_ref()?;
    curriculum.find_unit(pending).map(|(_, u)| u)
}

#[async_trait]
impl Agent for TeachingAgent {
    fn id(&self) -> &str {
        "teaching"
    }

    fn role(&self) -> AgentRole {
        AgentRole::Content
    }

    fn priority(&self) -> i32 {
        68
    }

    async fn observe(&self, input: AgentInput<'_>) -> Option<AgentUpdate> {
        let state = input.state;
        let unit = resolve_unit(&input)?;
        let consumes = vec![IntentKind::BeginTeaching, IntentKind::BuildStep];

        // 缓存命中：内容只生成一次
        if state.knowledge_repository.contains_key(&unit.id) {
            let mut patch = StatePatch::default();
            let mut changed = false;
            if state.pending_unit_id.as_deref() == Some(unit.id.as_str()) {
                patch.pending_unit_id = Some(None);
                changed = true;
            }
            if state.active_step.as_ref().map(|s| s.unit_id.as_str()) != Some(unit.id.as_str()) {
                patch.active_step = Some(Some(LearningStep {
                    unit_id: unit.id.clone(),
                    title: unit.title.clone(),
                    objective: unit.objective.clone(),
                    senses: state
                        .knowledge_repository
                        .get(&unit.id)
                        .map(|c| c.senses.clone())
                        .unwrap_or_default(),
                }));
                changed = true;
            }
            let has_stale_intents = !state.pending_intents.is_empty()
                && state.pending_intents.iter().any(|i| {
                    matches!(i.kind(), IntentKind::BeginTeaching | IntentKind::BuildStep)
                });
            if !changed && !has_stale_intents {
                return None;
            }
            return Some(AgentUpdate {
                state_patch: if changed { Some(patch) } else { None },
                consumes,
                notes: vec![format!("unit {} served from cache", unit.id)],
                ..Default::default()
            });
        }

        let content = self
            .generate_content(unit, &state.goal.title)
            .await?;
        tracing::info!(unit = %unit.id, media = content.media.len(), "unit content generated");

        let mut repo = state.knowledge_repository.clone();
        repo.insert(unit.id.clone(), content);

        Some(AgentUpdate {
            state_patch: Some(StatePatch {
                knowledge_repository: Some(repo),
                pending_unit_id: Some(None),
                ..Default::default()
            }),
            consumes,
            notes: vec![format!("unit {} taught", unit.id)],
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::curriculum::fallback_curriculum;
    use crate::core::domain::{LearningGoal, Phase};
    use crate::core::state::{EvidenceSignal, SharedState};
    use crate::llm::NullCapability;
    use chrono::Utc;
    use serde_json::json;

    fn learning_state() -> SharedState {
        let mut state = SharedState::new(LearningGoal::new("goal-1", "Optics"));
        state.curriculum = Some(fallback_curriculum("goal-1", "Optics"));
        state.phase = Some(Phase::Learning);
        state
    }

    fn revisit_signal() -> Vec<EvidenceSignal> {
        vec![EvidenceSignal::direct(
            "u",
            "goal-1",
            json!({"kind": "revisit"}),
        )]
    }

    #[tokio::test]
    async fn test_pending_unit_generates_and_clears() {
        let mut state = learning_state();
        state.pending_unit_id = Some("unit-1".into());
        let signals = revisit_signal();
        let agent = TeachingAgent::new(Arc::new(NullCapability));
        let update = agent
            .observe(AgentInput {
                now: Utc::now(),
                new_signals: &signals,
                state: &state,
            })
            .await
            .unwrap();
        let patch = update.state_patch.unwrap();
        assert!(patch.knowledge_repository.unwrap().contains_key("unit-1"));
        assert_eq!(patch.pending_unit_id, Some(None));
    }

    #[tokio::test]
    async fn test_cached_unit_is_never_regenerated() {
        let mut state = learning_state();
        let unit = state.curriculum.as_ref().unwrap().first_unit().unwrap().clone();
        let original = template_content(&unit, "Optics");
        state
            .knowledge_repository
            .insert("unit-1".into(), original.clone());
        state.active_step = Some(LearningStep {
            unit_id: "unit-1".into(),
            title: unit.title.clone(),
            objective: String::new(),
            senses: vec![],
        });
        let signals = vec![EvidenceSignal::direct(
            "u",
            "goal-1",
            json!({"kind": "ui-intent", "action": "open-unit", "unitId": "unit-1"}),
        )];
        let agent = TeachingAgent::new(Arc::new(NullCapability));
        let update = agent
            .observe(AgentInput {
                now: Utc::now(),
                new_signals: &signals,
                state: &state,
            })
            .await;
        // 缓存命中且无状态可改：沉默，explanation 原样保留
        assert!(update.is_none());
        assert_eq!(
            state.knowledge_repository["unit-1"].explanation,
            original.explanation
        );
    }

    #[tokio::test]
    async fn test_open_unit_by_fuzzy_title() {
        let state = learning_state();
        let signals = vec![EvidenceSignal::direct(
            "u",
            "goal-1",
            json!({"kind": "ui-intent", "action": "open-unit", "title": "hands-on"}),
        )];
        let agent = TeachingAgent::new(Arc::new(NullCapability));
        let update = agent
            .observe(AgentInput {
                now: Utc::now(),
                new_signals: &signals,
                state: &state,
            })
            .await
            .unwrap();
        let patch = update.state_patch.unwrap();
        assert!(patch.knowledge_repository.unwrap().contains_key("unit-3"));
    }

    #[tokio::test]
    async fn test_pending_unit_is_not_retried_on_empty_batch() {
        use std::sync::atomic::{AtomicU32, Ordering};

        use crate::core::error::LlmError;

        struct CountingCapability {
            calls: AtomicU32,
        }

        #[async_trait]
        impl LlmCapability for CountingCapability {
            async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::Api("transient".to_string()))
            }
            async fn generate_image(&self, _prompt: &str) -> Result<String, LlmError> {
                Err(LlmError::Api("transient".to_string()))
            }
        }

        // 上次生成失败的残留：pending 仍指向 unit-1
        let mut state = learning_state();
        state.pending_unit_id = Some("unit-1".into());
        let capability = Arc::new(CountingCapability {
            calls: AtomicU32::new(0),
        });
        let agent = TeachingAgent::new(capability.clone());

        // 空批次：不触发任何能力调用
        let update = agent
            .observe(AgentInput {
                now: Utc::now(),
                new_signals: &[],
                state: &state,
            })
            .await;
        assert!(update.is_none());
        assert_eq!(capability.calls.load(Ordering::SeqCst), 0);

        // 新信号到来才重试（这里依旧失败，留待下次）
        let signals = revisit_signal();
        let update = agent
            .observe(AgentInput {
                now: Utc::now(),
                new_signals: &signals,
                state: &state,
            })
            .await;
        assert!(update.is_none());
        assert_eq!(capability.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_trigger_means_silence() {
        let state = learning_state();
        let agent = TeachingAgent::new(Arc::new(NullCapability));
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
