//! In-memory PersonaRepository implementation.

use persona_core::persona::{PersonaConfig, PersonaRepository};

/// Holds the personas resolved at startup.
#[derive(Debug, Clone)]
pub struct InMemoryPersonaRepository {
    personas: Vec<PersonaConfig>,
}

impl InMemoryPersonaRepository {
    pub fn new(personas: Vec<PersonaConfig>) -> Self {
        Self { personas }
    }
}

impl PersonaRepository for InMemoryPersonaRepository {
    fn get_all(&self) -> Vec<PersonaConfig> {
        self.personas.clone()
    }

    fn find(&self, id: &str) -> Option<PersonaConfig> {
        self.personas.iter().find(|p| p.id == id).cloned()
    }
}
