pub mod api;
pub mod config;
pub mod error;
pub mod message;
pub mod persona;
pub mod secret;
pub mod step;

// Re-export common types
pub use error::{ChatError, ErrorKind, Result};
pub use message::{Message, MessageRole};
pub use step::{OrchestratorResult, Step, StepResult};
