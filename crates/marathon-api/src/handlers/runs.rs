//! Finalize and validation runs.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/finalize` | Body: `[{"domain","reference"}, ..]`; always 200 with a per-signal report |
//! | `POST` | `/marathons/:domain/participants/:reference/validate` | Re-runs every enabled rule |
//! | `GET`  | `/marathons/:domain/participants/:reference/validations` | Stored findings |

use axum::{
  Json,
  extract::{Path, State},
};
use marathon_coordinator::{BatchReport, FinalizedSignal};
use marathon_core::{participant::ParticipantKey, rule::ValidationResult, store::RecordStore};
use tracing::info;

use crate::{AppState, MarathonStore, error::ApiError, handlers::require_participant};

/// `POST /finalize`
///
/// Every signal is acknowledged; failures are reported per signal with a
/// `retryable` flag instead of failing the request.
pub async fn finalize<S: MarathonStore>(
  State(state): State<AppState<S>>,
  Json(signals): Json<Vec<FinalizedSignal>>,
) -> Json<BatchReport> {
  let received = signals.len();
  let report = state.coordinator.handle_batch(signals).await;
  info!(
    received,
    finalized = report.finalized(),
    failed = report.failed(),
    retryable = report.retryable().count(),
    "finalize batch handled"
  );
  Json(report)
}

/// `POST /marathons/:domain/participants/:reference/validate`
pub async fn validate<S: MarathonStore>(
  State(state): State<AppState<S>>,
  Path((domain, reference)): Path<(String, String)>,
) -> Result<Json<Vec<ValidationResult>>, ApiError> {
  let key = ParticipantKey::new(domain, reference);
  let results = state.validator.validate_participant(&key).await?;
  Ok(Json(results))
}

/// `GET /marathons/:domain/participants/:reference/validations`
pub async fn validations<S: MarathonStore>(
  State(state): State<AppState<S>>,
  Path((domain, reference)): Path<(String, String)>,
) -> Result<Json<Vec<ValidationResult>>, ApiError> {
  let key = ParticipantKey::new(domain, reference);
  let participant = require_participant(&*state.store, &key).await?;
  let results = state
    .store
    .validation_results(participant.id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(results))
}
