//! UI 构建 agent：把状态投影为布局文档
//!
//! 永远最后执行，看到的是本轮全部补丁之后的状态。纯过程式组装：问卷表单、
//! 课程总览、学习面（按 ::media:N:: / ::sense:N:: 标记把讲解文本与媒体、
//! sense 产物交错排布）。与上一版结构相等时沉默，避免多余重渲染。

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use crate::agents::{Agent, AgentInput, AgentRole};
use crate::core::domain::{Artifact, MediaItem, Phase, SenseType, TeachingContent};
use crate::core::intent::AgentUpdate;
use crate::core::state::{SharedState, StatePatch};
use crate::surface::SurfaceNode;

pub struct UiBuilderAgent;

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"::(media|sense):(\d+)::").expect("marker regex is valid"))
}

#[async_trait]
impl Agent for UiBuilderAgent {
    fn id(&self) -> &str {
        "ui-builder"
    }

    fn role(&self) -> AgentRole {
        AgentRole::Presentation
    }

    fn priority(&self) -> i32 {
        -100
    }

    async fn observe(&self, input: AgentInput<'_>) -> Option<AgentUpdate> {
        let state = input.state;
        let surface = compose(state);

        // 结构比对：没变就不重渲染
        if state.learning_surface.as_ref() == Some(&surface) {
            return None;
        }
        Some(AgentUpdate {
            state_patch: Some(StatePatch {
                learning_surface: Some(surface),
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}

fn compose(state: &SharedState) -> SurfaceNode {
    let answered = state.answers.as_ref().map(|a| !a.is_empty()).unwrap_or(false);
    if let (Some(questions), false) = (&state.questions, answered) {
        return intake_form(state, questions);
    }
    if state.phase == Some(Phase::Learning) {
        if let Some(step) = &state.active_step {
            if let Some(content) = state.knowledge_repository.get(&step.unit_id) {
                return learning_surface(state, &step.unit_id, content);
            }
        }
        if state.curriculum.is_some() {
            return curriculum_overview(state);
        }
    }
    welcome_surface(state)
}

fn welcome_surface(state: &SharedState) -> SurfaceNode {
    SurfaceNode::column(vec![
        SurfaceNode::heading(&state.goal.title, 1),
        SurfaceNode::text("Setting up your learning session..."),
    ])
}

fn intake_form(state: &SharedState, questions: &[crate::core::domain::IntakeQuestion]) -> SurfaceNode {
    let form_state = state.unit_states.get("intake");
    let mut children = vec![
        SurfaceNode::heading(&state.goal.title, 1),
        SurfaceNode::text("A few questions first, so the curriculum fits you."),
    ];
    for q in questions {
        children.push(SurfaceNode::text(&q.prompt));
        let value = form_state
            .and_then(|f| f.get(&q.id))
            .and_then(Value::as_str)
            .unwrap_or("");
        children.push(match q.kind {
            crate::core::domain::QuestionKind::Choice => {
                SurfaceNode::select(&q.id, &q.options, value)
            }
            _ => SurfaceNode::input(&q.id, "Your answer", value),
        });
    }
    children.push(SurfaceNode::button("Submit", "submit-answers", json!({})));
    SurfaceNode::column(children)
}

fn curriculum_overview(state: &SharedState) -> SurfaceNode {
    let mut children = vec![SurfaceNode::heading(&state.goal.title, 1)];
    if let Some(plan) = &state.curriculum {
        for module in &plan.modules {
            let mut card_children = vec![SurfaceNode::text(&module.summary)];
            for unit in &module.units {
                card_children.push(SurfaceNode::button(
                    &unit.title,
                    "open-unit",
                    json!({"unitId": unit.id}),
                ));
            }
            children.push(SurfaceNode::card(&module.title, card_children));
        }
    }
    SurfaceNode::column(children)
}

fn learning_surface(state: &SharedState, unit_id: &str, content: &TeachingContent) -> SurfaceNode {
    let mut children = vec![SurfaceNode::heading(&content.title, 1)];
    let mut used_media = vec![false; content.media.len()];

    // 正文与标记交错
    let text = &content.explanation;
    let mut cursor = 0;
    for caps in marker_regex().captures_iter(text) {
        let m = caps.get(0).map(|m| (m.start(), m.end()));
        let Some((start, end)) = m else { continue };
        let segment = text[cursor..start].trim();
        if !segment.is_empty() {
            children.push(SurfaceNode::text(segment));
        }
        cursor = end;

        let index: usize = match caps[2].parse() {
            Ok(i) => i,
            Err(_) => continue,
        };
        match &caps[1] {
            "media" => {
                if let Some(item) = content.media.get(index) {
                    used_media[index] = true;
                    children.push(media_node(state, unit_id, index, item));
                }
            }
            _ => {
                if let Some(sense) = content.senses.get(index) {
                    children.push(sense_node(state, *sense, &content.title));
                }
            }
        }
    }
    let tail = text[cursor..].trim();
    if !tail.is_empty() {
        children.push(SurfaceNode::text(tail));
    }

    // 未被标记引用的媒体追加在正文后
    for (index, item) in content.media.iter().enumerate() {
        if !used_media[index] {
            children.push(media_node(state, unit_id, index, item));
        }
    }

    for note in &content.interjections {
        children.push(SurfaceNode::card("Mentor's note", vec![SurfaceNode::text(note)]));
    }

    // 实验 sense 有产物前先放加载占位卡
    if content.senses.contains(&SenseType::Experiment)
        && latest_artifact(state, SenseType::Experiment).is_none()
    {
        children.push(SurfaceNode::card(
            "Experiment",
            vec![SurfaceNode::button(
                "Load experiment",
                "load-experiment",
                json!({"topic": content.title}),
            )],
        ));
    }

    children.push(SurfaceNode::divider());
    children.push(SurfaceNode::row(vec![
        SurfaceNode::button("Next", "next-unit", json!({"unitId": unit_id})),
        SurfaceNode::button("Deep dive", "deepen-topic", json!({"unitId": unit_id})),
    ]));
    SurfaceNode::column(children)
}

fn media_node(state: &SharedState, unit_id: &str, index: usize, item: &MediaItem) -> SurfaceNode {
    match item.kind.as_str() {
        "mermaid" => SurfaceNode::mermaid(&item.content, unit_id, index),
        "code" => SurfaceNode::code_block(&item.content, item.caption.as_deref().unwrap_or("text")),
        "quiz" => {
            let mut nodes = vec![SurfaceNode::quiz(&item.content, unit_id, index)];
            if let Some(result) = state.quiz_results.get(&format!("{}:{}", unit_id, index)) {
                nodes.push(SurfaceNode::text(&result.message));
            }
            SurfaceNode::column(nodes)
        }
        "image" => SurfaceNode::image(&item.content, item.caption.as_deref().unwrap_or("")),
        _ => SurfaceNode::text(&item.content),
    }
}

fn sense_node(state: &SharedState, sense: SenseType, topic: &str) -> SurfaceNode {
    match latest_artifact(state, sense) {
        Some(artifact) => match sense {
            SenseType::Experiment => SurfaceNode::experiment_viewer(&artifact.body, &artifact.title),
            SenseType::Infographic => {
                SurfaceNode::image(artifact.url.as_deref().unwrap_or(""), &artifact.title)
            }
            _ => SurfaceNode::card(&artifact.title, vec![SurfaceNode::text(&artifact.body)]),
        },
        None => SurfaceNode::card(
            "Coming up",
            vec![SurfaceNode::text(&format!(
                "An extra perspective on {} is on its way.",
                topic
            ))],
        ),
    }
}

fn latest_artifact(state: &SharedState, sense: SenseType) -> Option<&Artifact> {
    state.artifacts.iter().rev().find(|a| a.sense == sense)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::question::template_questions;
    use crate::agents::{AgentInput, Agent};
    use crate::core::domain::LearningGoal;
    use crate::surface::ComponentName;
    use chrono::Utc;

    fn flatten<'a>(node: &'a SurfaceNode, out: &mut Vec<&'a SurfaceNode>) {
        out.push(node);
        match node {
            SurfaceNode::Flex { children, .. } | SurfaceNode::Component { children, .. } => {
                for child in children {
                    flatten(child, out);
                }
            }
        }
    }

    fn components(node: &SurfaceNode) -> Vec<ComponentName> {
        let mut all = Vec::new();
        flatten(node, &mut all);
        all.iter()
            .filter_map(|n| match n {
                SurfaceNode::Component { component_name, .. } => Some(*component_name),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_intake_form_has_inputs_and_submit() {
        let mut state = SharedState::new(LearningGoal::new("g", "Astronomy"));
        state.phase = Some(Phase::Questionnaire);
        state.questions = Some(template_questions("Astronomy"));
        let surface = compose(&state);
        let names = components(&surface);
        assert!(names.contains(&ComponentName::Select));
        assert_eq!(names.iter().filter(|n| **n == ComponentName::Input).count(), 3);
        assert!(names.contains(&ComponentName::Button));
    }

    #[tokio::test]
    async fn test_markers_interleave_media() {
        let mut state = SharedState::new(LearningGoal::new("g", "Astronomy"));
        state.phase = Some(Phase::Learning);
        state.active_step = Some(crate::core::domain::LearningStep {
            unit_id: "unit-1".into(),
            title: "Stars".into(),
            objective: String::new(),
            senses: vec![],
        });
        state.knowledge_repository.insert(
            "unit-1".into(),
            TeachingContent {
                title: "Stars".into(),
                explanation: "Intro text ::media:0:: closing text".into(),
                first_principles: vec![],
                media: vec![MediaItem {
                    kind: "mermaid".into(),
                    content: "graph TD\nA-->B".into(),
                    caption: None,
                    answer: None,
                }],
                senses: vec![],
                interjections: vec![],
            },
        );
        let surface = compose(&state);
        let names = components(&surface);
        let mermaid_pos = names.iter().position(|n| *n == ComponentName::MermaidBlock);
        assert!(mermaid_pos.is_some());
        // 文本被标记一分为二
        assert!(names.iter().filter(|n| **n == ComponentName::Text).count() >= 2);
    }

    #[tokio::test]
    async fn test_unchanged_surface_is_silent() {
        let mut state = SharedState::new(LearningGoal::new("g", "Astronomy"));
        state.learning_surface = Some(compose(&state));
        let update = UiBuilderAgent
            .observe(AgentInput {
                now: Utc::now(),
                new_signals: &[],
                state: &state,
            })
            .await;
        assert!(update.is_none());
    }
}
