//! Persona domain module.
//!
//! # Module Structure
//!
//! - `model`: Persona configuration (`PersonaConfig`, `PersonaSummary`)
//! - `repository`: Read-only lookup trait
//! - `preset`: Built-in personas
//!
//! # Usage
//!
//! ```ignore
//! use persona_core::persona::{PersonaConfig, PersonaRepository, get_default_presets};
//! ```

mod model;
mod preset;
mod repository;

// Re-export public API
pub use model::{PersonaConfig, PersonaSummary};
pub use preset::{CHAICODE_AFFILIATE_URL, get_default_presets};
pub use repository::PersonaRepository;
