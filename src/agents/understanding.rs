//! 理解 agent：维护概念图谱与学习者画像
//!
//! 每批新信号都会经过这里：保证目标概念节点存在、按信号种类微调节点置信度与
//! 价值向量、吸收问卷答案、保存表单瞬态，并把论断置信度刷新为节点均值。

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::agents::{Agent, AgentInput, AgentRole};
use crate::core::domain::{Thesis, ThesisGraph};
use crate::core::intent::AgentUpdate;
use crate::core::state::{EvidenceSignal, StatePatch};

pub struct UnderstandingAgent;

/// 目标节点创建时的初始置信度
const GOAL_NODE_BASE_CONFIDENCE: f64 = 0.2;
/// 行为节点创建时的初始置信度
const BEHAVIOR_NODE_BASE_CONFIDENCE: f64 = 0.3;

fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// 信号指向的概念节点 id 与标签；无 concept/topic 字段时落到目标节点
fn target_node(signal: &EvidenceSignal, goal_id: &str, goal_title: &str) -> (String, String) {
    match signal.str_field("concept").or_else(|| signal.str_field("topic")) {
        Some(label) => (format!("concept-{}", slugify(label)), label.to_string()),
        None => (format!("concept-{}", goal_id), goal_title.to_string()),
    }
}

struct Profile {
    answers: Option<BTreeMap<String, Value>>,
    user_purpose: Option<String>,
    knowledge_level: Option<u8>,
    goal_boost: f64,
}

/// 从答案表提取画像：q3 为学习目的，q4 是 0-10 的信心分，折半取整为已知水平
fn profile_from_answers(answers: &BTreeMap<String, Value>, goal_boost: f64) -> Profile {
    let user_purpose = answers
        .get("q3")
        .and_then(Value::as_str)
        .map(str::to_string);
    let knowledge_level = answers.get("q4").and_then(|v| {
        let n = v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))?;
        Some(((n / 2.0).round() as i64).clamp(0, 5) as u8)
    });
    Profile {
        answers: Some(answers.clone()),
        user_purpose,
        knowledge_level,
        goal_boost,
    }
}

fn answers_map(value: Option<&Value>) -> Option<BTreeMap<String, Value>> {
    let map = value?.as_object()?;
    Some(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

#[async_trait]
impl Agent for UnderstandingAgent {
    fn id(&self) -> &str {
        "understanding"
    }

    fn role(&self) -> AgentRole {
        AgentRole::Perception
    }

    fn priority(&self) -> i32 {
        100
    }

    async fn observe(&self, input: AgentInput<'_>) -> Option<AgentUpdate> {
        if input.new_signals.is_empty() {
            return None;
        }
        let state = input.state;
        let now = input.now;

        let mut graph = state.thesis_graph.clone().unwrap_or_default();
        let mut vv = state.value_vector.clone();
        let mut profile: Option<Profile> = None;
        let mut unit_states: Option<BTreeMap<String, Value>> = None;
        let mut notes = Vec::new();

        let goal_node_id = format!("concept-{}", state.goal.id);
        graph.ensure_node(&goal_node_id, &state.goal.title, GOAL_NODE_BASE_CONFIDENCE);

        for signal in input.new_signals {
            match signal.kind() {
                "quiz" => {
                    let correct = signal
                        .field("correct")
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    let (id, label) = target_node(signal, &state.goal.id, &state.goal.title);
                    let node = graph.ensure_node(&id, &label, BEHAVIOR_NODE_BASE_CONFIDENCE);
                    node.nudge(if correct { 0.15 } else { -0.2 }, now);
                    vv.practice += 0.05;
                    vv.depth += if correct { 0.02 } else { -0.01 };
                }
                "time-spent" => {
                    let seconds = signal.f64_field("seconds").unwrap_or(0.0);
                    let (id, label) = target_node(signal, &state.goal.id, &state.goal.title);
                    let node = graph.ensure_node(&id, &label, BEHAVIOR_NODE_BASE_CONFIDENCE);
                    if seconds > 60.0 {
                        // 停留过久视为卡壳
                        node.nudge(-0.05, now);
                        vv.depth += 0.03;
                    } else {
                        node.nudge(0.02, now);
                        vv.curiosity += 0.01;
                    }
                }
                "revisit" => {
                    let (id, label) = target_node(signal, &state.goal.id, &state.goal.title);
                    let node = graph.ensure_node(&id, &label, BEHAVIOR_NODE_BASE_CONFIDENCE);
                    node.nudge(0.05, now);
                    vv.revision += 0.05;
                }
                "answers" => {
                    if let Some(map) = answers_map(signal.field("answers")) {
                        profile = Some(profile_from_answers(&map, 0.4));
                        notes.push("answers absorbed".to_string());
                    }
                }
                "ui-intent" => match signal.action() {
                    "submit-answers" => {
                        if let Some(map) = answers_map(signal.field("values")) {
                            profile = Some(profile_from_answers(&map, 0.3));
                            notes.push("answers absorbed from form".to_string());
                        }
                    }
                    "sdui-interaction" => {
                        if let (Some(unit_id), Some(values)) =
                            (signal.str_field("unitId"), signal.field("values"))
                        {
                            let states = unit_states
                                .get_or_insert_with(|| state.unit_states.clone());
                            states.insert(unit_id.to_string(), values.clone());
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }

        if let Some(ref p) = profile {
            if let Some(node) = graph.node_mut(&goal_node_id) {
                node.nudge(p.goal_boost, now);
            }
        }

        vv.clamp_all();
        let thesis = refresh_thesis(state.thesis.as_ref(), &graph, &state.goal.title);

        let mut patch = StatePatch {
            thesis_graph: Some(graph),
            thesis: Some(thesis),
            value_vector: Some(vv),
            unit_states,
            ..Default::default()
        };
        if let Some(p) = profile {
            patch.answers = p.answers;
            patch.user_purpose = p.user_purpose;
            patch.knowledge_level = p.knowledge_level;
        }

        Some(AgentUpdate {
            state_patch: Some(patch),
            notes,
            ..Default::default()
        })
    }
}

/// 论断置信度恒等于节点均值；已有的 summary/claims/gaps 原样保留
fn refresh_thesis(existing: Option<&Thesis>, graph: &ThesisGraph, goal_title: &str) -> Thesis {
    let confidence = graph.mean_confidence();
    match existing {
        Some(t) => Thesis {
            confidence,
            ..t.clone()
        },
        None => Thesis {
            summary: format!("Learner model for {}", goal_title),
            claims: Vec::new(),
            gaps: vec!["Identify missing mental models".to_string()],
            confidence,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::LearningGoal;
    use crate::core::state::SharedState;
    use chrono::Utc;
    use serde_json::json;

    async fn run(state: &SharedState, signals: Vec<EvidenceSignal>) -> Option<AgentUpdate> {
        let agent = UnderstandingAgent;
        let input = AgentInput {
            now: Utc::now(),
            new_signals: &signals,
            state,
        };
        agent.observe(input).await
    }

    fn kickoff_state() -> SharedState {
        SharedState::new(LearningGoal::new("goal-1", "Rust ownership"))
    }

    #[tokio::test]
    async fn test_empty_batch_is_silent() {
        let state = kickoff_state();
        assert!(run(&state, vec![]).await.is_none());
    }

    #[tokio::test]
    async fn test_kickoff_creates_goal_node_only() {
        let state = kickoff_state();
        let update = run(
            &state,
            vec![EvidenceSignal::direct("u", "goal-1", json!({"kind": "kickoff"}))],
        )
        .await
        .unwrap();
        let patch = update.state_patch.unwrap();
        let graph = patch.thesis_graph.unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].id, "concept-goal-1");
        assert!((graph.nodes[0].confidence - 0.2).abs() < 1e-9);
        let thesis = patch.thesis.unwrap();
        assert!((thesis.confidence - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_quiz_signal_nudges_concept_and_practice() {
        let state = kickoff_state();
        let update = run(
            &state,
            vec![EvidenceSignal::direct(
                "u",
                "goal-1",
                json!({"kind": "quiz", "correct": true, "concept": "Borrow Checker"}),
            )],
        )
        .await
        .unwrap();
        let patch = update.state_patch.unwrap();
        let graph = patch.thesis_graph.unwrap();
        let node = graph.node("concept-borrow-checker").unwrap();
        assert!((node.confidence - 0.45).abs() < 1e-9);
        let vv = patch.value_vector.unwrap();
        assert!((vv.practice - 0.55).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_answers_derive_purpose_and_level() {
        let state = kickoff_state();
        let update = run(
            &state,
            vec![EvidenceSignal::direct(
                "u",
                "goal-1",
                json!({"kind": "answers", "answers": {
                    "q1": "I know a bit",
                    "q3": "Build a web server",
                    "q4": 8
                }}),
            )],
        )
        .await
        .unwrap();
        let patch = update.state_patch.unwrap();
        assert_eq!(patch.user_purpose.as_deref(), Some("Build a web server"));
        assert_eq!(patch.knowledge_level, Some(4));
        // 答案吸收后目标节点得到 +0.4 提升
        let graph = patch.thesis_graph.unwrap();
        let goal = graph.node("concept-goal-1").unwrap();
        assert!((goal.confidence - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_confidence_never_leaves_unit_interval() {
        let mut state = kickoff_state();
        let mut signals = Vec::new();
        for _ in 0..20 {
            signals.push(EvidenceSignal::direct(
                "u",
                "goal-1",
                json!({"kind": "quiz", "correct": false, "concept": "Lifetimes"}),
            ));
        }
        let update = run(&state, signals).await.unwrap();
        let patch = update.state_patch.unwrap();
        let graph = patch.thesis_graph.clone().unwrap();
        for node in &graph.nodes {
            assert!(node.confidence >= 0.0 && node.confidence <= 1.0);
        }
        state.apply(patch, Utc::now());
        assert!(state.value_vector.depth >= 0.0);
    }
}
