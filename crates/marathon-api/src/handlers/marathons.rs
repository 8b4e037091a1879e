//! Handlers for marathon, participant and rule configuration endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/marathons` | Body: `{"domain","name","topics":[..]}`; 409 if the domain is taken |
//! | `POST` | `/marathons/:domain/participants` | Body: `{"reference"}`; also initialises slot state |
//! | `GET`  | `/marathons/:domain/participants/:reference` | Participant with its submissions |
//! | `POST` | `/marathons/:domain/rules` | Body: `{"ruleKey","severity","params","enabled"}` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use marathon_core::{
  participant::{NewMarathon, NewParticipant, Participant, ParticipantKey},
  rule::RuleConfigRecord,
  store::RecordStore,
  slot::SlotStore,
  submission::Submission,
};
use marathon_rules::create_rule;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppState, MarathonStore, error::ApiError, handlers::require_participant};

// ─── Marathons ────────────────────────────────────────────────────────────────

/// `POST /marathons`
pub async fn register_marathon<S: MarathonStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewMarathon>,
) -> Result<impl IntoResponse, ApiError> {
  if body.domain.trim().is_empty() {
    return Err(ApiError::BadRequest("domain must not be empty".into()));
  }
  if body.topics.is_empty() {
    return Err(ApiError::BadRequest("a marathon needs at least one topic".into()));
  }
  if state.store.get_marathon(&body.domain).await.map_err(ApiError::store)?.is_some() {
    return Err(ApiError::Conflict(format!("marathon {} already exists", body.domain)));
  }

  let marathon = state.store.register_marathon(body).await.map_err(ApiError::store)?;
  info!(domain = %marathon.domain, topics = marathon.topics.len(), "marathon registered");
  Ok((StatusCode::CREATED, Json(marathon)))
}

// ─── Participants ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterParticipantBody {
  pub reference: String,
}

/// `POST /marathons/:domain/participants`
///
/// Creates the durable participant with one submission per topic, then the
/// zeroed upload state the pipelines write against.
pub async fn register_participant<S: MarathonStore>(
  State(state): State<AppState<S>>,
  Path(domain): Path<String>,
  Json(body): Json<RegisterParticipantBody>,
) -> Result<impl IntoResponse, ApiError> {
  if body.reference.trim().is_empty() {
    return Err(ApiError::BadRequest("reference must not be empty".into()));
  }
  let marathon = state
    .store
    .get_marathon(&domain)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("marathon {domain} not found")))?;

  let key = ParticipantKey::new(&domain, &body.reference);
  if state.store.get_participant(&key).await.map_err(ApiError::store)?.is_some() {
    return Err(ApiError::Conflict(format!("participant {key} already exists")));
  }

  let participant = state
    .store
    .register_participant(NewParticipant { domain, reference: body.reference })
    .await
    .map_err(ApiError::store)?;
  state
    .store
    .init_participant_state(&key, marathon.topics.len())
    .await
    .map_err(ApiError::store)?;

  info!(
    domain = %key.domain,
    reference = %key.reference,
    participant_id = participant.id,
    expected = marathon.topics.len(),
    "participant registered"
  );
  Ok((StatusCode::CREATED, Json(participant)))
}

#[derive(Debug, Serialize)]
pub struct ParticipantView {
  #[serde(flatten)]
  pub participant: Participant,
  pub submissions: Vec<Submission>,
}

/// `GET /marathons/:domain/participants/:reference`
pub async fn get_participant<S: MarathonStore>(
  State(state): State<AppState<S>>,
  Path((domain, reference)): Path<(String, String)>,
) -> Result<Json<ParticipantView>, ApiError> {
  let key = ParticipantKey::new(domain, reference);
  let participant = require_participant(&*state.store, &key).await?;
  let submissions = state.store.submissions(participant.id).await.map_err(ApiError::store)?;
  Ok(Json(ParticipantView { participant, submissions }))
}

// ─── Rules ────────────────────────────────────────────────────────────────────

/// `POST /marathons/:domain/rules`
///
/// The params are checked by building the rule before anything is stored;
/// the normalised params are what gets persisted.
pub async fn save_rule<S: MarathonStore>(
  State(state): State<AppState<S>>,
  Path(domain): Path<String>,
  Json(body): Json<RuleConfigRecord>,
) -> Result<Json<RuleConfigRecord>, ApiError> {
  let config = create_rule(body.rule_key, body.severity, &body.params)?;

  if state.store.get_marathon(&domain).await.map_err(ApiError::store)?.is_none() {
    return Err(ApiError::NotFound(format!("marathon {domain} not found")));
  }

  let record = config.to_record(body.enabled);
  state
    .store
    .save_rule_config(&domain, record.clone())
    .await
    .map_err(ApiError::store)?;
  info!(domain = %domain, rule = %record.rule_key, enabled = record.enabled, "rule configured");
  Ok(Json(record))
}
