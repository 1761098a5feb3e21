//! 会话运行时：两段式 ingest
//!
//! 一次 ingest：归一化门面信号 → 入信号环 → 跑一轮完整 pass → 若收集到呈现
//! 意图则交给 Sense Runner，把产物包成 sense-output 信号再跑一轮（额外轮次
//! 有配置上限）→ 整体落盘。对外只报告最终一轮的意图与备注。
//! 单会话内协作式单线程，只有能力调用处让出。

use chrono::Utc;
use serde_json::{json, Value};

use crate::core::intent::{AgentIntent, IntentKind};
use crate::core::state::{EvidenceSignal, SharedState, SignalType};
use crate::memory::SessionStore;
use crate::runtime::coordinator::{Coordinator, PassOutcome};
use crate::senses::SenseRunner;

pub struct SessionRuntime {
    pub state: SharedState,
    coordinator: Coordinator,
    sense_runner: SenseRunner,
    store: Option<SessionStore>,
    user_id: String,
    max_extra_passes: usize,
}

/// 一次 ingest 的对外结果：最终轮次的意图与备注
#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub intents: Vec<AgentIntent>,
    pub notes: Vec<String>,
}

impl SessionRuntime {
    pub fn new(
        state: SharedState,
        coordinator: Coordinator,
        sense_runner: SenseRunner,
        store: Option<SessionStore>,
        user_id: String,
        max_extra_passes: usize,
    ) -> Self {
        Self {
            state,
            coordinator,
            sense_runner,
            store,
            user_id,
            max_extra_passes,
        }
    }

    pub async fn ingest(&mut self, signals: &[EvidenceSignal]) -> IngestOutcome {
        let now = Utc::now();
        let batch = normalize_signals(signals);
        if !batch.is_empty() {
            self.state.push_signals(&batch);
        }

        let mut outcome = self.coordinator.run_pass(&mut self.state, &batch, now).await;

        let mut extra = 0;
        while extra < self.max_extra_passes && has_presentation_intent(&outcome) {
            let artifacts = self.sense_runner.run(&outcome.intents).await;
            self.state
                .pending_intents
                .retain(|i| !is_presentation_kind(i.kind()));
            if artifacts.is_empty() {
                break;
            }

            let feedback: Vec<EvidenceSignal> = artifacts
                .iter()
                .map(|a| sense_output_signal(&self.user_id, &self.state.goal.id, a))
                .collect();
            self.state.artifacts.extend(artifacts);
            self.state.last_updated_at = Utc::now();
            self.state.push_signals(&feedback);

            tracing::debug!(pass = extra + 2, signals = feedback.len(), "extra pass with sense output");
            outcome = self
                .coordinator
                .run_pass(&mut self.state, &feedback, Utc::now())
                .await;
            extra += 1;
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.user_id, &self.state) {
                tracing::error!(error = %e, "failed to persist session state");
            }
        }

        IngestOutcome {
            intents: outcome.intents,
            notes: outcome.notes,
        }
    }
}

fn is_presentation_kind(kind: IntentKind) -> bool {
    matches!(kind, IntentKind::PresentSense | IntentKind::LoadExperiment)
}

fn has_presentation_intent(outcome: &PassOutcome) -> bool {
    outcome.intents.iter().any(|i| is_presentation_kind(i.kind()))
}

fn sense_output_signal(user_id: &str, goal_id: &str, artifact: &crate::core::domain::Artifact) -> EvidenceSignal {
    EvidenceSignal {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        goal_id: goal_id.to_string(),
        signal_type: SignalType::Indirect,
        observed_at: Utc::now(),
        payload: json!({
            "kind": "sense-output",
            "artifactId": artifact.id,
            "sense": artifact.sense,
            "title": artifact.title,
        }),
    }
}

/// 门面级信号归一化：提交类 ui-intent 统一映射为 answers / amend-curriculum
fn normalize_signals(signals: &[EvidenceSignal]) -> Vec<EvidenceSignal> {
    signals
        .iter()
        .map(|signal| {
            if signal.kind() != "ui-intent" {
                return signal.clone();
            }
            match signal.action() {
                "submit-intake" | "submit-answers" => {
                    // field() 先解析 data 嵌套；老客户端把答案放在 answers 键下
                    let values = signal
                        .field("values")
                        .or_else(|| signal.field("answers"))
                        .cloned()
                        .unwrap_or_else(|| Value::Object(Default::default()));
                    let mut mapped = signal.clone();
                    mapped.payload = json!({"kind": "answers", "answers": values});
                    mapped
                }
                "amend-curriculum" => {
                    let mut mapped = signal.clone();
                    let mut payload = signal.payload.clone();
                    if let Some(obj) = payload.as_object_mut() {
                        obj.insert("kind".to_string(), json!("amend-curriculum"));
                        obj.remove("action");
                    }
                    mapped.payload = payload;
                    mapped
                }
                _ => signal.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_answers_is_normalized() {
        let signal = EvidenceSignal::direct(
            "u",
            "g",
            json!({"kind": "ui-intent", "action": "submit-answers", "values": {"q1": "hi"}}),
        );
        let batch = normalize_signals(&[signal]);
        assert_eq!(batch[0].kind(), "answers");
        assert_eq!(batch[0].payload["answers"]["q1"], "hi");
    }

    #[test]
    fn test_submit_answers_data_nesting_is_normalized() {
        let signal = EvidenceSignal::direct(
            "u",
            "g",
            json!({"kind": "ui-intent", "action": "submit-answers",
                   "data": {"values": {"q1": "hi"}}}),
        );
        let batch = normalize_signals(&[signal]);
        assert_eq!(batch[0].kind(), "answers");
        assert_eq!(batch[0].payload["answers"]["q1"], "hi");
    }

    #[test]
    fn test_other_signals_pass_through() {
        let signal = EvidenceSignal::direct("u", "g", json!({"kind": "quiz", "correct": true}));
        let batch = normalize_signals(&[signal.clone()]);
        assert_eq!(batch[0].payload, signal.payload);
    }
}
