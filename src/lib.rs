pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod preparation;
pub mod storage;
pub mod studio;
pub mod workspace;

pub use config::{GenerationConfig, HistoryConfig, PreparationConfig, StudioConfig};
pub use error::{Result, StudioError};
pub use models::*;
pub use preparation::ImagePreparer;
pub use storage::{FileHistoryBackend, HistoryBackend, HistoryStore, MemoryHistoryBackend};
pub use studio::{
    AttemptError, AttemptExecutor, GenerationController, HttpExecutor, RetryPolicy,
    SimulatedExecutor, StudioClient,
};
pub use workspace::{Workspace, WorkspaceStatus};
