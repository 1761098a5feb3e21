//! 领域模型：学习目标、概念图谱、课程树、教学内容
//!
//! 所有对外结构统一 camelCase 序列化，与 UI 层约定一致。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 会话阶段：intake → questionnaire → curriculum → learning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Intake,
    Questionnaire,
    Curriculum,
    Learning,
}

/// 学习目标，会话创建后不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningGoal {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub domains: Vec<String>,
    /// 期望深度 1..=5
    pub desired_depth: u8,
    pub created_at: DateTime<Utc>,
}

impl LearningGoal {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            domains: Vec::new(),
            desired_depth: 3,
            created_at: Utc::now(),
        }
    }
}

/// 呈现方式标签；未知标签落到 Other，由模板 sense 兜底
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SenseType {
    Experiment,
    Infographic,
    Visual,
    Narrative,
    #[serde(other)]
    Other,
}

/// 概念节点；confidence 恒在 [0,1]，decay_rate 仅声明不参与计算
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptNode {
    pub id: String,
    pub label: String,
    pub confidence: f64,
    pub decay_rate: f64,
    pub last_interaction_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_sense: Option<SenseType>,
}

impl ConceptNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>, confidence: f64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
            decay_rate: 0.02,
            last_interaction_at: Utc::now(),
            preferred_sense: None,
        }
    }

    /// 按增量调整置信度并钳位到 [0,1]，同时刷新交互时间
    pub fn nudge(&mut self, delta: f64, now: DateTime<Utc>) {
        self.confidence = (self.confidence + delta).clamp(0.0, 1.0);
        self.last_interaction_at = now;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptEdge {
    pub from: String,
    pub to: String,
    pub relation: String,
}

/// 概念图谱：节点键形如 `concept-<slug>`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThesisGraph {
    #[serde(default)]
    pub nodes: Vec<ConceptNode>,
    #[serde(default)]
    pub edges: Vec<ConceptEdge>,
}

impl ThesisGraph {
    pub fn node(&self, id: &str) -> Option<&ConceptNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut ConceptNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// 不存在则插入，存在则原样返回可变引用
    pub fn ensure_node(
        &mut self,
        id: &str,
        label: &str,
        confidence: f64,
    ) -> &mut ConceptNode {
        match self.nodes.iter().position(|n| n.id == id) {
            Some(pos) => &mut self.nodes[pos],
            None => {
                self.nodes.push(ConceptNode::new(id, label, confidence));
                let last = self.nodes.len() - 1;
                &mut self.nodes[last]
            }
        }
    }

    /// 全体节点置信度均值；空图谱为 0
    pub fn mean_confidence(&self) -> f64 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        self.nodes.iter().map(|n| n.confidence).sum::<f64>() / self.nodes.len() as f64
    }

    /// 置信度最低的节点
    pub fn weakest_node(&self) -> Option<&ConceptNode> {
        self.nodes
            .iter()
            .min_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}

/// 对用户理解状态的综合论断；confidence 跟随图谱均值
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thesis {
    pub summary: String,
    #[serde(default)]
    pub claims: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
    pub confidence: f64,
}

/// 五维学习价值向量，各维钳位 [0,1]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueVector {
    pub curiosity: f64,
    pub depth: f64,
    pub practice: f64,
    pub revision: f64,
    pub collaboration: f64,
}

impl Default for ValueVector {
    fn default() -> Self {
        Self {
            curiosity: 0.5,
            depth: 0.5,
            practice: 0.5,
            revision: 0.5,
            collaboration: 0.5,
        }
    }
}

impl ValueVector {
    pub fn clamp_all(&mut self) {
        self.curiosity = self.curiosity.clamp(0.0, 1.0);
        self.depth = self.depth.clamp(0.0, 1.0);
        self.practice = self.practice.clamp(0.0, 1.0);
        self.revision = self.revision.clamp(0.0, 1.0);
        self.collaboration = self.collaboration.clamp(0.0, 1.0);
    }
}

/// 入门问卷题目
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeQuestion {
    pub id: String,
    pub prompt: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Text,
    Choice,
    Scale,
}

/// 课程树节点（root → module → unit 三层，深度有界）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumNode {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub children: Vec<CurriculumNode>,
}

impl CurriculumNode {
    /// 先序收集全部节点 id（进度表要求对树 id 全覆盖）
    pub fn collect_ids(&self, out: &mut Vec<String>) {
        out.push(self.id.clone());
        for child in &self.children {
            child.collect_ids(out);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUnit {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub objective: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseModule {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub units: Vec<CourseUnit>,
}

/// 课程计划：树与扁平模块表保持同步
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumPlan {
    pub tree: CurriculumNode,
    pub modules: Vec<CourseModule>,
}

impl CurriculumPlan {
    pub fn find_unit(&self, unit_id: &str) -> Option<(&CourseModule, &CourseUnit)> {
        for module in &self.modules {
            if let Some(unit) = module.units.iter().find(|u| u.id == unit_id) {
                return Some((module, unit));
            }
        }
        None
    }

    /// 按标题模糊匹配单元（大小写不敏感的包含匹配）
    pub fn find_unit_fuzzy(&self, needle: &str) -> Option<(&CourseModule, &CourseUnit)> {
        let needle = needle.to_lowercase();
        for module in &self.modules {
            if let Some(unit) = module
                .units
                .iter()
                .find(|u| u.title.to_lowercase().contains(&needle))
            {
                return Some((module, unit));
            }
        }
        None
    }

    /// 扁平模块顺序中某单元的下一个单元
    pub fn next_unit_after(&self, unit_id: &str) -> Option<&CourseUnit> {
        let flat: Vec<&CourseUnit> = self.modules.iter().flat_map(|m| m.units.iter()).collect();
        let pos = flat.iter().position(|u| u.id == unit_id)?;
        flat.get(pos + 1).copied()
    }

    pub fn first_unit(&self) -> Option<&CourseUnit> {
        self.modules.iter().flat_map(|m| m.units.iter()).next()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Done,
}

/// 教学媒体条目；quiz 类附带参考答案
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub kind: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

/// 单元教学内容；仓库按 unit id 缓存，explanation 生成后不再重算
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeachingContent {
    pub title: String,
    pub explanation: String,
    #[serde(default)]
    pub first_principles: Vec<String>,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default)]
    pub senses: Vec<SenseType>,
    #[serde(default)]
    pub interjections: Vec<String>,
}

/// 当前学习步骤，由 pending_unit_id 解析而来
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningStep {
    pub unit_id: String,
    pub title: String,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub senses: Vec<SenseType>,
}

/// Sense Runner 产出物
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    pub sense: SenseType,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub ok: bool,
    pub message: String,
}

/// 进度表：对课程树全部节点 id 初始化为 NotStarted
pub fn full_progress(tree: &CurriculumNode) -> BTreeMap<String, ProgressStatus> {
    let mut ids = Vec::new();
    tree.collect_ids(&mut ids);
    ids.into_iter()
        .map(|id| (id, ProgressStatus::NotStarted))
        .collect()
}
