//! 运行时：协调器、会话 ingest 循环与对外门面

pub mod coordinator;
pub mod session;
pub mod supervisor;

pub use coordinator::{Coordinator, PassOutcome};
pub use session::{IngestOutcome, SessionRuntime};
pub use supervisor::{ApiResponse, SessionSupervisor, SessionView, SupervisorStatus, UiDirective};
