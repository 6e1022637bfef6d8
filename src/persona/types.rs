//! Core types for the persona model.
//!
//! A [`PersonaRecord`] is the unit of storage. [`PersonaDraft`] is the
//! id-less field-set a generation backend produces, and [`PersonaPatch`]
//! names only the fields a partial update overwrites.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a fresh persona identifier.
pub fn new_persona_id() -> String {
    format!("persona-{}", Uuid::new_v4().simple())
}

// ─────────────────────────────────────────────────────────────────
// Persona Record
// ─────────────────────────────────────────────────────────────────

/// A fictional customer archetype used for marketing planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaRecord {
    /// Assigned once at creation, never reassigned.
    pub id: String,

    /// Short archetype title (e.g. "The Pragmatic Professional").
    pub heading: String,

    pub name: String,
    pub age: u32,
    pub gender: String,
    pub occupation: String,
    pub location: String,

    /// Avatar URL derived from name and gender, if any.
    #[serde(default)]
    pub photo_url: Option<String>,

    #[serde(default)]
    pub background: String,
    pub quote: String,
    pub goal: String,
    pub channel: String,
    pub behaviour_traits: Vec<String>,
    pub pain_points: Vec<String>,
    pub recommended_messaging: String,
}

impl PersonaRecord {
    /// Promote a validated draft into a stored record.
    pub fn from_draft(id: String, photo_url: Option<String>, draft: PersonaDraft) -> Self {
        Self {
            id,
            heading: draft.heading,
            name: draft.name,
            age: draft.age,
            gender: draft.gender,
            occupation: draft.occupation,
            location: draft.location,
            photo_url,
            background: draft.background,
            quote: draft.quote,
            goal: draft.goal,
            channel: draft.channel,
            behaviour_traits: draft.behaviour_traits,
            pain_points: draft.pain_points,
            recommended_messaging: draft.recommended_messaging,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Persona Draft (generation output, no id)
// ─────────────────────────────────────────────────────────────────

/// Persona field-set as returned by the generation service.
///
/// `id` and `photo_url` are intentionally absent: any such keys in the
/// reply are ignored and assigned by the gateway instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaDraft {
    pub heading: String,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub occupation: String,
    pub location: String,
    #[serde(default)]
    pub background: String,
    pub quote: String,
    pub goal: String,
    pub channel: String,
    pub behaviour_traits: Vec<String>,
    pub pain_points: Vec<String>,
    pub recommended_messaging: String,
}

impl PersonaDraft {
    /// Check constraints serde cannot express.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.heading.trim().is_empty() {
            return Err("heading must not be empty".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.age == 0 {
            return Err("age must be a positive integer".to_string());
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────
// Partial Update
// ─────────────────────────────────────────────────────────────────

/// A change request naming only the fields to overwrite.
///
/// Serializes to exactly the fields that are set, which is also the
/// `data` payload pushed to refinement channel clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behaviour_traits: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pain_points: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_messaging: Option<String>,
}

impl PersonaPatch {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    /// Names of the fields this patch overwrites, in record order.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        macro_rules! collect {
            ($($field:ident),*) => {
                $(if self.$field.is_some() { fields.push(stringify!($field)); })*
            };
        }
        collect!(
            heading, name, age, gender, occupation, location, photo_url, background, quote,
            goal, channel, behaviour_traits, pain_points, recommended_messaging
        );
        fields
    }

    /// Reject values a stored record may never hold.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if matches!(self.heading, Some(ref heading) if heading.trim().is_empty()) {
            return Err("heading must not be empty".to_string());
        }
        if matches!(self.name, Some(ref name) if name.trim().is_empty()) {
            return Err("name must not be empty".to_string());
        }
        if self.age == Some(0) {
            return Err("age must be a positive integer".to_string());
        }
        Ok(())
    }

    /// Merge the set fields into `record`, leaving all others untouched.
    pub fn apply_to(&self, record: &mut PersonaRecord) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(ref value) = self.$field { record.$field = value.clone(); })*
            };
        }
        merge!(
            heading, name, age, gender, occupation, location, background, quote, goal, channel,
            behaviour_traits, pain_points, recommended_messaging
        );
        if let Some(ref url) = self.photo_url {
            record.photo_url = Some(url.clone());
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Campaign Idea
// ─────────────────────────────────────────────────────────────────

/// A short angle + format pair suggesting how to reach a persona.
///
/// Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignIdea {
    pub angle: String,
    pub format: String,
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
