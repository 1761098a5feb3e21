//! 课程 agent：把目标起草成课程树
//!
//! 触发条件：pending 中有 draft-curriculum、问卷要么不存在要么已作答、课程
//! 尚未存在。可选检索为提示词提供事实基础。模型返回的任意 JSON 树经深度
//! 有界的递归清洗；任何失败都替换为静态三模块回退课程。成功即进入学习阶段，
//! 并为树上每个节点建立进度项。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::agents::{Agent, AgentInput, AgentRole};
use crate::core::domain::{
    full_progress, CourseModule, CourseUnit, CurriculumNode, CurriculumPlan, Phase,
};
use crate::core::intent::{find_pending, AgentUpdate, IntentKind};
use crate::core::state::StatePatch;
use crate::llm::{extract_json_block, LlmCapability};
use crate::research::ResearchProvider;

/// 树清洗的最大递归深度
const MAX_TREE_DEPTH: usize = 8;
/// 检索上下文注入提示词的字符上限
const RESEARCH_CONTEXT_CHARS: usize = 4000;

pub struct CurriculumAgent {
    capability: Arc<dyn LlmCapability>,
    research: Option<Arc<dyn ResearchProvider>>,
}

impl CurriculumAgent {
    pub fn new(
        capability: Arc<dyn LlmCapability>,
        research: Option<Arc<dyn ResearchProvider>>,
    ) -> Self {
        Self {
            capability,
            research,
        }
    }

    async fn draft(&self, input: &AgentInput<'_>) -> CurriculumPlan {
        let state = input.state;
        if !self.capability.enabled() {
            return fallback_curriculum(&state.goal.id, &state.goal.title);
        }

        let research_context = match &self.research {
            Some(provider) => provider
                .research(&state.goal.title)
                .await
                .as_prompt_context(RESEARCH_CONTEXT_CHARS),
            None => String::new(),
        };

        let prompt = format!(
            "Design a curriculum for the learning goal: {goal}.\n\
             Learner purpose: {purpose}\nKnowledge level (0-5): {level}\n\
             {research}\
             Produce 10-15 modules, each with 2-4 units. Return JSON:\n\
             {{\"modules\": [{{\"id\": \"...\", \"title\": \"...\", \"summary\": \"...\", \
             \"units\": [{{\"id\": \"...\", \"title\": \"...\", \"objective\": \"...\"}}]}}], \
             \"tree\": {{\"id\": \"root\", \"title\": \"...\", \"children\": []}}}}",
            goal = state.goal.title,
            purpose = state.user_purpose.as_deref().unwrap_or("unspecified"),
            level = state.knowledge_level,
            research = if research_context.is_empty() {
                String::new()
            } else {
                format!("Reference material:\n{}\n", research_context)
            },
        );

        match self.capability.generate(&prompt).await {
            Ok(raw) => match parse_plan(&raw, &state.goal.title) {
                Some(plan) => plan,
                None => {
                    tracing::warn!("curriculum response unusable, substituting fallback");
                    fallback_curriculum(&state.goal.id, &state.goal.title)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "curriculum llm call failed, substituting fallback");
                fallback_curriculum(&state.goal.id, &state.goal.title)
            }
        }
    }
}

fn parse_plan(raw: &str, goal_title: &str) -> Option<CurriculumPlan> {
    let block = extract_json_block(raw)?;
    let value: Value = serde_json::from_str(block).ok()?;
    let modules = sanitize_modules(value.get("modules")?)?;
    if modules.is_empty() {
        return None;
    }
    let tree = match value.get("tree") {
        Some(tree) => sanitize_tree(tree, 0, &mut 0),
        None => None,
    }
    .unwrap_or_else(|| tree_from_modules(goal_title, &modules));
    Some(CurriculumPlan { tree, modules })
}

fn sanitize_modules(value: &Value) -> Option<Vec<CourseModule>> {
    let items = value.as_array()?;
    let mut modules = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let units = item
            .get("units")
            .and_then(Value::as_array)
            .map(|units| {
                units
                    .iter()
                    .enumerate()
                    .map(|(j, u)| CourseUnit {
                        id: str_or(u, "id", &format!("unit-{}-{}", i + 1, j + 1)),
                        title: str_or(u, "title", "Untitled unit"),
                        objective: str_or(u, "objective", ""),
                    })
                    .collect()
            })
            .unwrap_or_default();
        modules.push(CourseModule {
            id: str_or(item, "id", &format!("module-{}", i + 1)),
            title: str_or(item, "title", "Untitled module"),
            summary: str_or(item, "summary", ""),
            units,
        });
    }
    Some(modules)
}

/// 深度有界的递归树清洗；缺失 id/title 用序号默认值补齐
fn sanitize_tree(value: &Value, depth: usize, counter: &mut usize) -> Option<CurriculumNode> {
    if depth >= MAX_TREE_DEPTH {
        return None;
    }
    let obj = value.as_object()?;
    *counter += 1;
    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("node-{}", counter));
    let title = obj
        .get("title")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "Untitled".to_string());
    let children = obj
        .get("children")
        .and_then(Value::as_array)
        .map(|kids| {
            kids.iter()
                .filter_map(|k| sanitize_tree(k, depth + 1, counter))
                .collect()
        })
        .unwrap_or_default();
    Some(CurriculumNode { id, title, children })
}

/// 模型未给树时，从模块表派生
fn tree_from_modules(goal_title: &str, modules: &[CourseModule]) -> CurriculumNode {
    CurriculumNode {
        id: "root".to_string(),
        title: goal_title.to_string(),
        children: modules
            .iter()
            .map(|m| CurriculumNode {
                id: m.id.clone(),
                title: m.title.clone(),
                children: m
                    .units
                    .iter()
                    .map(|u| CurriculumNode {
                        id: u.id.clone(),
                        title: u.title.clone(),
                        children: vec![],
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn str_or(value: &Value, key: &str, default: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default.to_string())
}

/// 静态回退课程：基础 / 体系 / 应用 三模块
pub fn fallback_curriculum(goal_id: &str, goal_title: &str) -> CurriculumPlan {
    let modules = vec![
        CourseModule {
            id: "module-1".into(),
            title: format!("Foundations of {}", goal_title),
            summary: "Core vocabulary and mental models".into(),
            units: vec![CourseUnit {
                id: "unit-1".into(),
                title: format!("{}: core concepts", goal_title),
                objective: "Build a working definition of the key ideas".into(),
            }],
        },
        CourseModule {
            id: "module-2".into(),
            title: format!("How {} fits together", goal_title),
            summary: "Relationships between the main parts".into(),
            units: vec![CourseUnit {
                id: "unit-2".into(),
                title: format!("{}: the system view", goal_title),
                objective: "Connect the concepts into one coherent picture".into(),
            }],
        },
        CourseModule {
            id: "module-3".into(),
            title: format!("Applying {}", goal_title),
            summary: "Practice on realistic problems".into(),
            units: vec![CourseUnit {
                id: "unit-3".into(),
                title: format!("{}: hands-on", goal_title),
                objective: "Use the ideas on a concrete task".into(),
            }],
        },
    ];
    let tree = CurriculumNode {
        id: format!("goal-{}", goal_id),
        title: goal_title.to_string(),
        children: vec![
            CurriculumNode {
                id: "foundations".into(),
                title: modules[0].title.clone(),
                children: vec![CurriculumNode {
                    id: "unit-1".into(),
                    title: modules[0].units[0].title.clone(),
                    children: vec![],
                }],
            },
            CurriculumNode {
                id: "systems".into(),
                title: modules[1].title.clone(),
                children: vec![CurriculumNode {
                    id: "unit-2".into(),
                    title: modules[1].units[0].title.clone(),
                    children: vec![],
                }],
            },
            CurriculumNode {
                id: "applications".into(),
                title: modules[2].title.clone(),
                children: vec![CurriculumNode {
                    id: "unit-3".into(),
                    title: modules[2].units[0].title.clone(),
                    children: vec![],
                }],
            },
        ],
    };
    CurriculumPlan { tree, modules }
}

#[async_trait]
impl Agent for CurriculumAgent {
    fn id(&self) -> &str {
        "curriculum"
    }

    fn role(&self) -> AgentRole {
        AgentRole::Content
    }

    fn priority(&self) -> i32 {
        75
    }

    async fn observe(&self, input: AgentInput<'_>) -> Option<AgentUpdate> {
        let state = input.state;
        find_pending(&state.pending_intents, IntentKind::DraftCurriculum)?;

        if state.curriculum.is_some() {
            // 陈旧意图：课程已在，只做消费
            return Some(AgentUpdate {
                consumes: vec![IntentKind::DraftCurriculum],
                notes: vec!["curriculum already drafted".to_string()],
                ..Default::default()
            });
        }
        // 问卷已发出但尚未作答：等答卷，不消费意图
        let unanswered = state.questions.is_some()
            && state.answers.as_ref().map(|a| a.is_empty()).unwrap_or(true);
        if unanswered {
            return None;
        }

        let plan = self.draft(&input).await;
        let progress = full_progress(&plan.tree);
        tracing::info!(
            modules = plan.modules.len(),
            tree_nodes = progress.len(),
            "curriculum drafted"
        );

        Some(AgentUpdate {
            state_patch: Some(StatePatch {
                curriculum: Some(plan),
                curriculum_progress: Some(progress),
                phase: Some(Phase::Learning),
                ..Default::default()
            }),
            consumes: vec![IntentKind::DraftCurriculum],
            notes: vec!["curriculum drafted".to_string()],
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{LearningGoal, ProgressStatus};
    use crate::core::intent::AgentIntent;
    use crate::core::state::SharedState;
    use crate::llm::NullCapability;
    use chrono::Utc;
    use serde_json::json;

    fn pending_state() -> SharedState {
        let mut state = SharedState::new(LearningGoal::new("goal-1", "Thermodynamics"));
        state
            .pending_intents
            .push(AgentIntent::DraftCurriculum { reason: None });
        state
    }

    #[tokio::test]
    async fn test_fallback_is_deterministic() {
        let a = fallback_curriculum("goal-1", "Thermodynamics");
        let b = fallback_curriculum("goal-1", "Thermodynamics");
        assert_eq!(a.modules.len(), 3);
        let ids: Vec<_> = a.tree.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["foundations", "systems", "applications"]);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[tokio::test]
    async fn test_disabled_capability_uses_fallback_and_fills_progress() {
        let state = pending_state();
        let agent = CurriculumAgent::new(Arc::new(NullCapability), None);
        let update = agent
            .observe(AgentInput {
                now: Utc::now(),
                new_signals: &[],
                state: &state,
            })
            .await
            .unwrap();
        let patch = update.state_patch.unwrap();
        let plan = patch.curriculum.unwrap();
        let progress = patch.curriculum_progress.unwrap();
        let mut tree_ids = Vec::new();
        plan.tree.collect_ids(&mut tree_ids);
        for id in &tree_ids {
            assert_eq!(progress.get(id), Some(&ProgressStatus::NotStarted));
        }
        assert_eq!(progress.len(), tree_ids.len());
        assert_eq!(patch.phase, Some(Phase::Learning));
        assert_eq!(update.consumes, vec![IntentKind::DraftCurriculum]);
    }

    #[tokio::test]
    async fn test_waits_for_unanswered_questionnaire() {
        let mut state = pending_state();
        state.questions = Some(crate::agents::question::template_questions("Thermodynamics"));
        let agent = CurriculumAgent::new(Arc::new(NullCapability), None);
        let update = agent
            .observe(AgentInput {
                now: Utc::now(),
                new_signals: &[],
                state: &state,
            })
            .await;
        assert!(update.is_none());
    }

    #[test]
    fn test_sanitize_tree_bounds_depth_and_fills_defaults() {
        // 构造 12 层嵌套，超出 MAX_TREE_DEPTH 的部分被剪掉
        let mut node = json!({"id": "leaf", "title": "Leaf", "children": []});
        for _ in 0..12 {
            node = json!({"title": "", "children": [node]});
        }
        let mut counter = 0;
        let tree = sanitize_tree(&node, 0, &mut counter).unwrap();
        let mut depth = 0;
        let mut cursor = &tree;
        while let Some(child) = cursor.children.first() {
            cursor = child;
            depth += 1;
        }
        assert!(depth < MAX_TREE_DEPTH);
        assert!(tree.id.starts_with("node-"));
        assert_eq!(tree.title, "Untitled");
    }
}
