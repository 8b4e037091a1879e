//! Pipeline completion callbacks, one per pipeline.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `PUT` | `/slots/:domain/:reference/:index/upload` | Body: `{"key","previewKey","size","mimeType"}` |
//! | `PUT` | `/slots/:domain/:reference/:index/thumbnail` | Body: `{"thumbnailKey"}` |
//! | `PUT` | `/slots/:domain/:reference/:index/exif` | Body: raw extractor payload (JSON object) |
//!
//! Every callback is an idempotent upsert, so pipelines may redeliver.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use marathon_core::{
  exif::{self, ExifData},
  participant::{ParticipantKey, SlotKey},
  slot::SlotStore,
  store::RecordStore,
  submission::{Submission, UploadedObject},
};
use serde::Deserialize;
use tracing::debug;

use crate::{AppState, MarathonStore, error::ApiError, handlers::require_participant};

/// Resolve the slot addressed by the path, checking it lies within the
/// participant's expected photo count.
async fn require_slot<S: SlotStore>(
  slots: &S,
  domain: String,
  reference: String,
  index: u32,
) -> Result<SlotKey, ApiError> {
  let key = ParticipantKey::new(domain, reference);
  let state = slots
    .get_participant_state(&key)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("no upload state for {key}")))?;
  let expected = state.processed_indexes.len();
  if index as usize >= expected {
    return Err(ApiError::BadRequest(format!(
      "order index {index} is out of range for {expected} expected photos"
    )));
  }
  Ok(key.slot(index))
}

/// `PUT /slots/:domain/:reference/:index/upload`
///
/// Records the object metadata on the submission, then flags the slot.
pub async fn upload<S: MarathonStore>(
  State(state): State<AppState<S>>,
  Path((domain, reference, index)): Path<(String, String, u32)>,
  Json(body): Json<UploadedObject>,
) -> Result<Json<Submission>, ApiError> {
  let slot = require_slot(&*state.store, domain, reference, index).await?;
  require_participant(&*state.store, &slot.participant()).await?;

  let submission = state.store.record_upload(&slot, body).await.map_err(ApiError::store)?;
  state.store.set_uploaded(&slot).await.map_err(ApiError::store)?;
  debug!(slot = %slot, "upload recorded");
  Ok(Json(submission))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailBody {
  pub thumbnail_key: String,
}

/// `PUT /slots/:domain/:reference/:index/thumbnail`
pub async fn thumbnail<S: MarathonStore>(
  State(state): State<AppState<S>>,
  Path((domain, reference, index)): Path<(String, String, u32)>,
  Json(body): Json<ThumbnailBody>,
) -> Result<StatusCode, ApiError> {
  if body.thumbnail_key.trim().is_empty() {
    return Err(ApiError::BadRequest("thumbnailKey must not be empty".into()));
  }
  let slot = require_slot(&*state.store, domain, reference, index).await?;
  state
    .store
    .set_thumbnail(&slot, &body.thumbnail_key)
    .await
    .map_err(ApiError::store)?;
  debug!(slot = %slot, "thumbnail recorded");
  Ok(StatusCode::NO_CONTENT)
}

/// `PUT /slots/:domain/:reference/:index/exif`
///
/// The payload is sanitized before it is stored; the slot is marked
/// processed only after the payload is in place.
pub async fn exif<S: MarathonStore>(
  State(state): State<AppState<S>>,
  Path((domain, reference, index)): Path<(String, String, u32)>,
  Json(body): Json<serde_json::Value>,
) -> Result<Json<ExifData>, ApiError> {
  let clean = exif::sanitize(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let slot = require_slot(&*state.store, domain, reference, index).await?;
  state.store.set_exif(&slot, &clean).await.map_err(ApiError::store)?;
  state.store.set_exif_processed(&slot).await.map_err(ApiError::store)?;
  debug!(slot = %slot, tags = clean.len(), "exif recorded");
  Ok(Json(clean))
}
