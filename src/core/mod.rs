//! 核心层：领域模型、共享状态、意图与错误

pub mod domain;
pub mod error;
pub mod intent;
pub mod state;

pub use domain::{
    Artifact, ConceptEdge, ConceptNode, CourseModule, CourseUnit, CurriculumNode, CurriculumPlan,
    IntakeQuestion, LearningGoal, LearningStep, MediaItem, Phase, ProgressStatus, QuestionKind,
    QuizResult, SenseType, TeachingContent, Thesis, ThesisGraph, ValueVector,
};
pub use error::{LlmError, SessionError};
pub use intent::{find_pending, push_latest_wins, AgentIntent, AgentUpdate, IntentKind};
pub use state::{EvidenceSignal, SharedState, SignalType, StatePatch, RECENT_SIGNALS_CAP};
