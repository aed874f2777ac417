pub mod config_service;
pub mod paths;
pub mod persona_repository;
pub mod secret_service;

pub use crate::config_service::{AppConfig, ConfigService};
pub use crate::persona_repository::InMemoryPersonaRepository;
pub use crate::secret_service::SecretServiceImpl;
