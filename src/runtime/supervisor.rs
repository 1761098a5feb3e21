//! 会话门面：对外 API 与状态广播
//!
//! start / signal / state 一律返回 ApiResponse，错误不越过边界。watch 通道
//! 在每次 ingest 前后广播 Thinking / Idle；并从结果状态推导一个粗粒度的
//! UI 指令（问卷 / 课程 / 学习）。

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::agents;
use crate::config::AppConfig;
use crate::core::domain::LearningGoal;
use crate::core::error::SessionError;
use crate::core::state::{EvidenceSignal, SharedState};
use crate::llm::LlmCapability;
use crate::memory::SessionStore;
use crate::research::{HttpResearchProvider, ResearchProvider};
use crate::runtime::coordinator::Coordinator;
use crate::runtime::session::SessionRuntime;
use crate::senses::SenseRunner;

/// 对外应答：永不 Err，失败体现在 ok/error 字段
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SupervisorStatus {
    Idle,
    Thinking,
}

/// 渲染端的粗粒度指令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UiDirective {
    Questionnaire,
    Curriculum,
    Learning,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub state: SharedState,
    pub directive: UiDirective,
    pub notes: Vec<String>,
}

pub struct SessionSupervisor {
    config: AppConfig,
    capability: Arc<dyn LlmCapability>,
    runtime: Option<SessionRuntime>,
    user_id: String,
    status_tx: watch::Sender<SupervisorStatus>,
}

impl SessionSupervisor {
    pub fn new(
        config: AppConfig,
        capability: Arc<dyn LlmCapability>,
        user_id: &str,
    ) -> (Self, watch::Receiver<SupervisorStatus>) {
        let (status_tx, status_rx) = watch::channel(SupervisorStatus::Idle);
        (
            Self {
                config,
                capability,
                runtime: None,
                user_id: user_id.to_string(),
                status_tx,
            },
            status_rx,
        )
    }

    fn build_agents(&self) -> Vec<Arc<dyn agents::Agent>> {
        let cap = &self.capability;
        let research: Option<Arc<dyn ResearchProvider>> = if self.config.research.enabled {
            Some(Arc::new(HttpResearchProvider::new(&self.config.research)))
        } else {
            None
        };
        vec![
            Arc::new(agents::UnderstandingAgent),
            Arc::new(agents::PlannerAgent::new(cap.clone())),
            Arc::new(agents::QuestionAgent::new(cap.clone())),
            Arc::new(agents::QuizCheckAgent::new(cap.clone())),
            Arc::new(agents::SenseOrchestratorAgent),
            Arc::new(agents::MermaidFixAgent::new(cap.clone())),
            Arc::new(agents::CurriculumAgent::new(cap.clone(), research)),
            Arc::new(agents::LearningStepBuilderAgent),
            Arc::new(agents::TeachingAgent::new(cap.clone())),
            Arc::new(agents::InterjectionAgent::new(cap.clone())),
            Arc::new(agents::RevisionDepthAgent),
            Arc::new(agents::SynthesisAgent),
            Arc::new(agents::UiBuilderAgent),
        ]
    }

    /// 开启（或从存储恢复）一个学习目标的会话，并灌入 kickoff 信号
    pub async fn start(&mut self, topic: &str) -> ApiResponse<SessionView> {
        let goal_id = slug_for(topic);
        let store = match &self.config.persistence.db_path {
            Some(path) => match SessionStore::open(path) {
                Ok(store) => Some(store),
                Err(e) => {
                    tracing::warn!(error = %e, "persistence unavailable, running in memory");
                    None
                }
            },
            None => None,
        };

        let state = store
            .as_ref()
            .and_then(|s| s.load(&self.user_id, &goal_id).ok().flatten())
            .unwrap_or_else(|| SharedState::new(LearningGoal::new(goal_id.clone(), topic)));

        let coordinator = Coordinator::new(self.build_agents());
        let sense_runner = SenseRunner::new(self.capability.clone());
        self.runtime = Some(SessionRuntime::new(
            state,
            coordinator,
            sense_runner,
            store,
            self.user_id.clone(),
            self.config.runtime.max_extra_passes,
        ));
        tracing::info!(goal = %goal_id, topic, "session started");

        let kickoff = EvidenceSignal::direct(&self.user_id, &goal_id, json!({"kind": "kickoff"}));
        self.signal_value(kickoff).await
    }

    /// 注入一条外部信号
    pub async fn signal(&mut self, payload: Value) -> ApiResponse<SessionView> {
        let Some(runtime) = &self.runtime else {
            return ApiResponse::failure(SessionError::NotStarted.to_string());
        };
        let signal =
            EvidenceSignal::direct(&self.user_id, &runtime.state.goal.id.clone(), payload);
        self.signal_value(signal).await
    }

    async fn signal_value(&mut self, signal: EvidenceSignal) -> ApiResponse<SessionView> {
        let Some(runtime) = &mut self.runtime else {
            return ApiResponse::failure(SessionError::NotStarted.to_string());
        };
        let _ = self.status_tx.send(SupervisorStatus::Thinking);
        let outcome = runtime.ingest(std::slice::from_ref(&signal)).await;
        let _ = self.status_tx.send(SupervisorStatus::Idle);

        ApiResponse::success(SessionView {
            directive: derive_directive(&runtime.state),
            state: runtime.state.clone(),
            notes: outcome.notes,
        })
    }

    /// 当前状态快照
    pub fn state(&self) -> ApiResponse<SessionView> {
        match &self.runtime {
            Some(runtime) => ApiResponse::success(SessionView {
                directive: derive_directive(&runtime.state),
                state: runtime.state.clone(),
                notes: Vec::new(),
            }),
            None => ApiResponse::failure(SessionError::NotStarted.to_string()),
        }
    }
}

fn derive_directive(state: &SharedState) -> UiDirective {
    if state.curriculum.is_some() {
        if state.active_step.is_some() {
            UiDirective::Learning
        } else {
            UiDirective::Curriculum
        }
    } else {
        UiDirective::Questionnaire
    }
}

fn slug_for(topic: &str) -> String {
    let slug: String = topic
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::NullCapability;

    fn config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.persistence.db_path = None;
        cfg.research.enabled = false;
        cfg
    }

    #[tokio::test]
    async fn test_signal_before_start_fails_closed() {
        let (mut supervisor, _rx) =
            SessionSupervisor::new(config(), Arc::new(NullCapability), "user-1");
        let response = supervisor.signal(json!({"kind": "kickoff"})).await;
        assert!(!response.ok);
        assert_eq!(response.error.as_deref(), Some("session not started"));
        assert!(!supervisor.state().ok);
    }

    #[tokio::test]
    async fn test_start_reaches_intake() {
        let (mut supervisor, rx) =
            SessionSupervisor::new(config(), Arc::new(NullCapability), "user-1");
        let response = supervisor.start("Linear algebra").await;
        assert!(response.ok);
        let view = response.data.unwrap();
        assert_eq!(view.directive, UiDirective::Questionnaire);
        assert_eq!(
            view.state.phase,
            Some(crate::core::domain::Phase::Intake)
        );
        assert_eq!(*rx.borrow(), SupervisorStatus::Idle);
    }
}
