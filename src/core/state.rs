//! 共享会话状态与补丁合并
//!
//! 状态只由运行时应用 StatePatch 修改（浅覆盖：补丁中已设置的字段整体替换对应
//! 状态字段），agent 不直接改动状态。recent_signals 为定长环（最新在前）。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::domain::{
    Artifact, CurriculumPlan, IntakeQuestion, LearningGoal, LearningStep, Phase, ProgressStatus,
    QuizResult, TeachingContent, Thesis, ThesisGraph, ValueVector,
};
use crate::core::intent::AgentIntent;
use crate::surface::SurfaceNode;

/// recent_signals 环容量
pub const RECENT_SIGNALS_CAP: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalType {
    Direct,
    Indirect,
}

/// 进入管线的证据信号；payload 为自由 JSON，约定 `kind` 字段区分种类
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceSignal {
    pub id: String,
    pub user_id: String,
    pub goal_id: String,
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub observed_at: DateTime<Utc>,
    pub payload: Value,
}

impl EvidenceSignal {
    pub fn direct(user_id: &str, goal_id: &str, payload: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            goal_id: goal_id.to_string(),
            signal_type: SignalType::Direct,
            observed_at: Utc::now(),
            payload,
        }
    }

    /// payload.kind（缺失则为空串）
    pub fn kind(&self) -> &str {
        self.payload.get("kind").and_then(Value::as_str).unwrap_or("")
    }

    /// ui-intent 信号的 payload.action
    pub fn action(&self) -> &str {
        self.payload
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    pub fn f64_field(&self, key: &str) -> Option<f64> {
        self.field(key).and_then(Value::as_f64)
    }

    /// 取参数字段：渲染端把参数嵌在 payload.data 下，顶层同名字段兜底
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload
            .get("data")
            .and_then(|data| data.get(key))
            .or_else(|| self.payload.get(key))
    }
}

/// 每个 (user, goal) 会话一份的共享状态
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedState {
    pub goal: LearningGoal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thesis: Option<Thesis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thesis_graph: Option<ThesisGraph>,
    #[serde(default)]
    pub value_vector: ValueVector,
    /// 当前教学深度 1..=5
    pub depth_level: u8,
    /// 用户已知水平 0..=5
    pub knowledge_level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<IntakeQuestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curriculum: Option<CurriculumPlan>,
    #[serde(default)]
    pub curriculum_progress: BTreeMap<String, ProgressStatus>,
    #[serde(default)]
    pub knowledge_repository: BTreeMap<String, TeachingContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_step: Option<LearningStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_unit_id: Option<String>,
    #[serde(default)]
    pub pending_intents: Vec<AgentIntent>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    /// 最新在前的信号环，容量 RECENT_SIGNALS_CAP
    #[serde(default)]
    pub recent_signals: Vec<EvidenceSignal>,
    /// 每单元瞬态表单状态（重渲染时保留半填写的输入）
    #[serde(default)]
    pub unit_states: BTreeMap<String, Value>,
    /// 键形如 `unitId:mediaIndex`
    #[serde(default)]
    pub quiz_results: BTreeMap<String, QuizResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_surface: Option<SurfaceNode>,
    pub last_updated_at: DateTime<Utc>,
}

impl SharedState {
    pub fn new(goal: LearningGoal) -> Self {
        Self {
            goal,
            phase: None,
            thesis: None,
            thesis_graph: None,
            value_vector: ValueVector::default(),
            depth_level: 1,
            knowledge_level: 0,
            user_purpose: None,
            questions: None,
            answers: None,
            curriculum: None,
            curriculum_progress: BTreeMap::new(),
            knowledge_repository: BTreeMap::new(),
            active_step: None,
            pending_unit_id: None,
            pending_intents: Vec::new(),
            artifacts: Vec::new(),
            recent_signals: Vec::new(),
            unit_states: BTreeMap::new(),
            quiz_results: BTreeMap::new(),
            learning_surface: None,
            last_updated_at: Utc::now(),
        }
    }

    /// 批量入环：最新在前，超容截断
    pub fn push_signals(&mut self, batch: &[EvidenceSignal]) {
        for signal in batch.iter().rev() {
            self.recent_signals.insert(0, signal.clone());
        }
        self.recent_signals.truncate(RECENT_SIGNALS_CAP);
    }

    /// 浅覆盖合并：补丁中设置的字段整体替换状态字段，并盖上时间戳
    pub fn apply(&mut self, patch: StatePatch, now: DateTime<Utc>) {
        if let Some(phase) = patch.phase {
            self.phase = Some(phase);
        }
        if let Some(thesis) = patch.thesis {
            self.thesis = Some(thesis);
        }
        if let Some(graph) = patch.thesis_graph {
            self.thesis_graph = Some(graph);
        }
        if let Some(mut vv) = patch.value_vector {
            vv.clamp_all();
            self.value_vector = vv;
        }
        if let Some(depth) = patch.depth_level {
            self.depth_level = depth.clamp(1, 5);
        }
        if let Some(level) = patch.knowledge_level {
            self.knowledge_level = level.min(5);
        }
        if let Some(purpose) = patch.user_purpose {
            self.user_purpose = Some(purpose);
        }
        if let Some(questions) = patch.questions {
            self.questions = Some(questions);
        }
        if let Some(answers) = patch.answers {
            self.answers = Some(answers);
        }
        if let Some(curriculum) = patch.curriculum {
            self.curriculum = Some(curriculum);
        }
        if let Some(progress) = patch.curriculum_progress {
            self.curriculum_progress = progress;
        }
        if let Some(repo) = patch.knowledge_repository {
            self.knowledge_repository = repo;
        }
        if let Some(step) = patch.active_step {
            self.active_step = step;
        }
        if let Some(unit) = patch.pending_unit_id {
            self.pending_unit_id = unit;
        }
        if let Some(artifacts) = patch.artifacts {
            self.artifacts = artifacts;
        }
        if let Some(states) = patch.unit_states {
            self.unit_states = states;
        }
        if let Some(results) = patch.quiz_results {
            self.quiz_results = results;
        }
        if let Some(surface) = patch.learning_surface {
            self.learning_surface = Some(surface);
        }
        self.last_updated_at = now;
    }
}

/// 状态补丁；None 表示不触碰该字段
///
/// active_step / pending_unit_id 用双层 Option：外层 None 不触碰，
/// 内层 None 表示显式清空。
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub phase: Option<Phase>,
    pub thesis: Option<Thesis>,
    pub thesis_graph: Option<ThesisGraph>,
    pub value_vector: Option<ValueVector>,
    pub depth_level: Option<u8>,
    pub knowledge_level: Option<u8>,
    pub user_purpose: Option<String>,
    pub questions: Option<Vec<IntakeQuestion>>,
    pub answers: Option<BTreeMap<String, Value>>,
    pub curriculum: Option<CurriculumPlan>,
    pub curriculum_progress: Option<BTreeMap<String, ProgressStatus>>,
    pub knowledge_repository: Option<BTreeMap<String, TeachingContent>>,
    pub active_step: Option<Option<LearningStep>>,
    pub pending_unit_id: Option<Option<String>>,
    pub artifacts: Option<Vec<Artifact>>,
    pub unit_states: Option<BTreeMap<String, Value>>,
    pub quiz_results: Option<BTreeMap<String, QuizResult>>,
    pub learning_surface: Option<SurfaceNode>,
}

impl StatePatch {
    pub fn is_empty(&self) -> bool {
        self.phase.is_none()
            && self.thesis.is_none()
            && self.thesis_graph.is_none()
            && self.value_vector.is_none()
            && self.depth_level.is_none()
            && self.knowledge_level.is_none()
            && self.user_purpose.is_none()
            && self.questions.is_none()
            && self.answers.is_none()
            && self.curriculum.is_none()
            && self.curriculum_progress.is_none()
            && self.knowledge_repository.is_none()
            && self.active_step.is_none()
            && self.pending_unit_id.is_none()
            && self.artifacts.is_none()
            && self.unit_states.is_none()
            && self.quiz_results.is_none()
            && self.learning_surface.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> SharedState {
        SharedState::new(LearningGoal::new("goal-1", "Rust ownership"))
    }

    #[test]
    fn test_patch_shallow_overwrite() {
        let mut s = state();
        let before = s.last_updated_at;
        let now = Utc::now();
        s.apply(
            StatePatch {
                phase: Some(Phase::Intake),
                depth_level: Some(9),
                ..Default::default()
            },
            now,
        );
        assert_eq!(s.phase, Some(Phase::Intake));
        // depth 钳位到 1..=5
        assert_eq!(s.depth_level, 5);
        assert!(s.last_updated_at >= before);
    }

    #[test]
    fn test_patch_clears_active_step_explicitly() {
        let mut s = state();
        s.active_step = Some(LearningStep {
            unit_id: "u1".into(),
            title: "Unit 1".into(),
            objective: String::new(),
            senses: vec![],
        });
        s.apply(
            StatePatch {
                active_step: Some(None),
                ..Default::default()
            },
            Utc::now(),
        );
        assert!(s.active_step.is_none());
    }

    #[test]
    fn test_recent_signals_ring_caps_at_limit() {
        let mut s = state();
        for i in 0..(RECENT_SIGNALS_CAP + 30) {
            let sig = EvidenceSignal::direct("u", "g", json!({"kind": "kickoff", "seq": i}));
            s.push_signals(&[sig]);
        }
        assert_eq!(s.recent_signals.len(), RECENT_SIGNALS_CAP);
        // 最新在前
        let newest = s.recent_signals[0].payload["seq"].as_u64().unwrap();
        assert_eq!(newest as usize, RECENT_SIGNALS_CAP + 29);
    }

    #[test]
    fn test_fields_resolve_data_nesting_first() {
        let nested = EvidenceSignal::direct(
            "u",
            "g",
            json!({"kind": "ui-intent", "action": "fix-mermaid",
                   "data": {"unitId": "u1", "mediaIndex": 0, "code": "graph TD; A->B("}}),
        );
        assert_eq!(nested.str_field("unitId"), Some("u1"));
        assert_eq!(nested.f64_field("mediaIndex"), Some(0.0));
        assert_eq!(nested.str_field("code"), Some("graph TD; A->B("));

        // 顶层字段兜底
        let flat = EvidenceSignal::direct("u", "g", json!({"kind": "quiz", "concept": "X"}));
        assert_eq!(flat.str_field("concept"), Some("X"));
    }

    #[test]
    fn test_state_json_roundtrip() {
        let s = state();
        let blob = serde_json::to_string(&s).unwrap();
        let back: SharedState = serde_json::from_str(&blob).unwrap();
        assert_eq!(back.goal.id, "goal-1");
        assert_eq!(back.depth_level, 1);
    }
}
