//! Persona repository trait.
//!
//! Defines the interface for looking up persona configurations.

use super::model::{PersonaConfig, PersonaSummary};

/// An abstract, read-only source of persona configurations.
///
/// Personas are loaded once at startup and never change afterwards, so the
/// lookups are synchronous and infallible.
pub trait PersonaRepository: Send + Sync {
    /// Retrieves all personas, in declaration order.
    fn get_all(&self) -> Vec<PersonaConfig>;

    /// Finds a persona by its route id.
    fn find(&self, id: &str) -> Option<PersonaConfig>;

    /// Lists the public view of every persona.
    fn summaries(&self) -> Vec<PersonaSummary> {
        self.get_all().iter().map(PersonaSummary::from).collect()
    }
}
