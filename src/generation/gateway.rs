//! Generation gateway
//!
//! Issues one backend call per logical operation and treats the reply as
//! untrusted: it is parsed, checked against the expected schema and only
//! then turned into persona records, partial updates or campaign ideas.
//! Transport problems surface as `GenerationUnavailable` (from the
//! backend); anything wrong with the reply content is `GenerationFormat`.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::persona::{new_persona_id, CampaignIdea, PersonaDraft, PersonaPatch, PersonaRecord};

use super::backend::{GenerationBackend, GenerationKind, GenerationRequest};
use super::prompt::{self, PersonaInputs};

/// Avatar service keyed by a stable seed
const AVATAR_BASE_URL: &str = "https://i.pravatar.cc/500";

// ─────────────────────────────────────────────────────────────────
// Reply helpers
// ─────────────────────────────────────────────────────────────────

/// Strip surrounding whitespace and an optional Markdown code fence.
pub fn extract_json_payload(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string ("json") on the opening fence line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Deterministic avatar URL seeded by name and gender.
pub fn avatar_url(name: &str, gender: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.trim().as_bytes());
    hasher.update(b"|");
    hasher.update(gender.trim().to_lowercase().as_bytes());
    let seed = hex::encode(hasher.finalize());
    format!("{}?u={}", AVATAR_BASE_URL, &seed[..16])
}

fn parse_object(reply: &str) -> Result<serde_json::Map<String, Value>> {
    let payload = extract_json_payload(reply);
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| Error::generation_format(format!("reply is not valid JSON: {}", e)))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::generation_format(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn take_list(mut map: serde_json::Map<String, Value>, key: &str) -> Result<Vec<Value>> {
    match map.remove(key) {
        Some(Value::Array(items)) if items.is_empty() => {
            Err(Error::generation_format(format!("\"{}\" list is empty", key)))
        }
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(Error::generation_format(format!(
            "\"{}\" must be a list, got {}",
            key,
            json_type_name(&other)
        ))),
        None => Err(Error::generation_format(format!("reply is missing the \"{}\" key", key))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

// ─────────────────────────────────────────────────────────────────
// Gateway
// ─────────────────────────────────────────────────────────────────

/// Validating front door to the generation backend.
pub struct GenerationGateway {
    backend: Arc<dyn GenerationBackend>,
    persona_count: usize,
    campaign_count: usize,
}

impl GenerationGateway {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        persona_count: usize,
        campaign_count: usize,
    ) -> Self {
        Self {
            backend,
            persona_count,
            campaign_count,
        }
    }

    /// Name of the backend in use
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    async fn call(&self, kind: GenerationKind, prompt: String, context: Value) -> Result<String> {
        let start = Instant::now();
        debug!(
            backend = self.backend.name(),
            operation = kind.as_str(),
            prompt_len = prompt.len(),
            "Calling generation backend"
        );

        let result = self
            .backend
            .generate(GenerationRequest::new(kind, prompt, context))
            .await;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(reply) => debug!(
                operation = kind.as_str(),
                elapsed_ms,
                reply_len = reply.len(),
                "Generation call completed"
            ),
            Err(e) => warn!(operation = kind.as_str(), elapsed_ms, error = %e, "Generation call failed"),
        }
        result
    }

    /// Generate and validate a batch of new persona records.
    ///
    /// Records are not stored here; the caller persists them.
    pub async fn create_personas(&self, inputs: &PersonaInputs) -> Result<Vec<PersonaRecord>> {
        let prompt = prompt::persona_batch_prompt(inputs, self.persona_count)?;
        let context = json!({
            "count": self.persona_count,
            "survey": inputs.survey,
            "reviews": inputs.reviews,
            "positioning": inputs.positioning,
        });

        let reply = self.call(GenerationKind::CreatePersonas, prompt, context).await?;
        let items = take_list(parse_object(&reply)?, "personas")?;

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let draft: PersonaDraft = serde_json::from_value(item).map_err(|e| {
                Error::generation_format(format!("persona {} is invalid: {}", index, e))
            })?;
            draft.validate().map_err(|e| {
                Error::generation_format(format!("persona {} is invalid: {}", index, e))
            })?;

            let photo_url = avatar_url(&draft.name, &draft.gender);
            records.push(PersonaRecord::from_draft(new_persona_id(), Some(photo_url), draft));
        }

        info!(count = records.len(), "Generated personas");
        Ok(records)
    }

    /// Ask for the fields an instruction changes on `record`.
    ///
    /// Unknown keys and `id` are ignored; a reply naming no known field
    /// is rejected.
    pub async fn refine_persona(
        &self,
        record: &PersonaRecord,
        instruction: &str,
    ) -> Result<PersonaPatch> {
        let prompt = prompt::refinement_prompt(record, instruction)?;
        let context = json!({
            "persona": record,
            "instruction": instruction,
        });

        let reply = self.call(GenerationKind::RefinePersona, prompt, context).await?;
        let mut fields = parse_object(&reply)?;
        fields.remove("id");

        let patch: PersonaPatch = serde_json::from_value(Value::Object(fields))
            .map_err(|e| Error::generation_format(format!("refinement has invalid fields: {}", e)))?;

        patch
            .validate()
            .map_err(|e| Error::generation_format(format!("refinement is invalid: {}", e)))?;
        if patch.is_empty() {
            return Err(Error::generation_format("refinement named no persona fields"));
        }

        debug!(persona_id = %record.id, fields = ?patch.changed_fields(), "Refinement parsed");
        Ok(patch)
    }

    /// Generate a fresh list of campaign ideas for `record`.
    pub async fn generate_campaigns(&self, record: &PersonaRecord) -> Result<Vec<CampaignIdea>> {
        let prompt = prompt::campaign_prompt(record, self.campaign_count)?;
        let context = json!({
            "persona": record,
            "count": self.campaign_count,
        });

        let reply = self.call(GenerationKind::GenerateCampaigns, prompt, context).await?;
        let items = take_list(parse_object(&reply)?, "campaigns")?;

        let mut ideas = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let idea: CampaignIdea = serde_json::from_value(item).map_err(|e| {
                Error::generation_format(format!("campaign {} is invalid: {}", index, e))
            })?;
            if idea.angle.trim().is_empty() || idea.format.trim().is_empty() {
                return Err(Error::generation_format(format!(
                    "campaign {} has an empty angle or format",
                    index
                )));
            }
            ideas.push(idea);
        }

        info!(persona_id = %record.id, count = ideas.len(), "Generated campaign ideas");
        Ok(ideas)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
