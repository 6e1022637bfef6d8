//! Persona model and store.
//!
//! The store exclusively owns every [`PersonaRecord`]; other components
//! only hold transient copies while producing or applying an update.

pub mod store;
pub mod types;

pub use store::{InMemoryPersonaStore, PersonaStore};
pub use types::{new_persona_id, CampaignIdea, PersonaDraft, PersonaPatch, PersonaRecord};
