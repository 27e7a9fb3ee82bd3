//! 核心编排层：错误与恢复、生成状态、解锁判断、生成编排器

pub mod error;
pub mod orchestrator;
pub mod recovery;
pub mod state;
pub mod unlock;

pub use error::{ErrorKind, GenerationError};
pub use orchestrator::{GenerationSettings, Orchestrator, RequestSettings, RetryOutcome};
pub use recovery::{RecoveryAction, RecoveryEngine};
pub use state::{AiState, GenerationStage, RetryCommand};
pub use unlock::{is_unlocked, unlock_status, UnlockStatus, ALL_SERIES};
