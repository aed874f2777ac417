pub mod gemini_api_agent;
pub mod generation;
pub mod orchestrator;
pub mod prompt;
pub mod schema;

pub use gemini_api_agent::GeminiApiAgent;
pub use generation::{GenerationClient, GenerationError, Turn, TurnRole};
pub use orchestrator::StepOrchestrator;
pub use prompt::{PromptBuilder, detect_promo_trigger};
pub use schema::{PromoPolicy, StepOutcome, validate_reply};
