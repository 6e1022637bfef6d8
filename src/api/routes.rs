//! HTTP route handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::generation::PersonaInputs;
use crate::persona::{CampaignIdea, PersonaPatch, PersonaRecord};

use super::{channel, AppState};

// ─────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────

/// GET /
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Persona Spark API is running" }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "backend": state.gateway.backend_name(),
        "personas": state.store.len(),
        "channels": state.channels.connection_count(),
    }))
}

// ─────────────────────────────────────────────────────────────────
// Personas
// ─────────────────────────────────────────────────────────────────

/// Response body for persona creation
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePersonasResponse {
    pub personas: Vec<PersonaRecord>,
}

async fn read_upload(multipart: &mut Multipart) -> Result<PersonaInputs> {
    let mut survey = None;
    let mut reviews = None;
    let mut positioning = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::UploadMalformed {
            message: e.body_text(),
        })?
    {
        let name = field.name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| Error::UploadMalformed {
            message: format!("field '{}': {}", name, e.body_text()),
        })?;
        let text = String::from_utf8_lossy(&bytes).into_owned();

        match name.as_str() {
            "survey_data" => survey = Some(text),
            "customer_reviews" => reviews = Some(text),
            "product_positioning" => positioning = Some(text),
            other => debug!(field = %other, "Ignoring unknown upload field"),
        }
    }

    let missing = |field: &str| Error::bad_request(format!("missing form field '{}'", field));
    Ok(PersonaInputs {
        survey: survey.ok_or_else(|| missing("survey_data"))?,
        reviews: reviews.ok_or_else(|| missing("customer_reviews"))?,
        positioning: positioning.ok_or_else(|| missing("product_positioning"))?,
    })
}

/// POST /api/generate-personas
pub async fn create_personas(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CreatePersonasResponse>)> {
    let inputs = read_upload(&mut multipart).await?;
    info!(
        survey_bytes = inputs.survey.len(),
        reviews_bytes = inputs.reviews.len(),
        "Creating personas"
    );

    let personas = state.gateway.create_personas(&inputs).await?;
    for persona in &personas {
        state.store.put(persona.clone());
    }

    Ok((StatusCode::CREATED, Json(CreatePersonasResponse { personas })))
}

/// GET /api/personas
pub async fn list_personas(State(state): State<AppState>) -> Json<Vec<PersonaRecord>> {
    Json(state.store.list())
}

/// GET /api/personas/{id}
pub async fn get_persona(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PersonaRecord>> {
    Ok(Json(state.store.get(&id)?))
}

/// Fields a direct update may change
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaUpdateRequest {
    pub heading: Option<String>,
    pub name: Option<String>,
    pub age: Option<u32>,
    pub pain_points: Option<Vec<String>>,
}

impl From<PersonaUpdateRequest> for PersonaPatch {
    fn from(request: PersonaUpdateRequest) -> Self {
        PersonaPatch {
            heading: request.heading,
            name: request.name,
            age: request.age,
            pain_points: request.pain_points,
            ..Default::default()
        }
    }
}

/// PUT /api/personas/{id}/refine
pub async fn refine_persona(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<PersonaUpdateRequest>, JsonRejection>,
) -> Result<Json<PersonaRecord>> {
    let Json(request) = payload.map_err(|rejection| Error::bad_request(rejection.body_text()))?;
    let patch = PersonaPatch::from(request);
    if patch.is_empty() {
        return Err(Error::bad_request("no update data provided"));
    }
    patch.validate().map_err(Error::bad_request)?;

    let updated = state.store.apply_partial(&id, &patch)?;
    info!(persona_id = %id, fields = ?patch.changed_fields(), "Persona updated");
    Ok(Json(updated))
}

/// GET /api/personas/{id}/generate-campaigns
pub async fn generate_campaigns(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CampaignIdea>>> {
    let record = state.store.get(&id)?;
    let ideas = state.gateway.generate_campaigns(&record).await?;
    Ok(Json(ideas))
}

// ─────────────────────────────────────────────────────────────────
// Refinement channel
// ─────────────────────────────────────────────────────────────────

/// GET /ws/refine/{client_id}/{persona_id}
pub async fn refine_stream(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path((client_id, persona_id)): Path<(String, String)>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| channel::serve_socket(socket, state, client_id, persona_id))
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
