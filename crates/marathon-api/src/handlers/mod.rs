//! Route handlers, grouped by resource.

pub mod marathons;
pub mod progress;
pub mod runs;
pub mod slots;

use marathon_core::{
  participant::{Participant, ParticipantKey},
  store::RecordStore,
};

use crate::error::ApiError;

/// Load a participant or fail with 404.
pub(crate) async fn require_participant<R: RecordStore>(
  records: &R,
  key: &ParticipantKey,
) -> Result<Participant, ApiError> {
  records
    .get_participant(key)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("participant {key} not found")))
}
