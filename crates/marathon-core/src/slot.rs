//! The per-photo state store: ephemeral slot facts written independently by
//! the upload, exif and thumbnail pipelines.
//!
//! Every write is an idempotent upsert keyed by the `(domain, reference,
//! order_index)` triple, so replaying a pipeline completion event never
//! corrupts state. Reads never pad missing slots with defaults.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  exif::ExifData,
  participant::{ParticipantKey, SlotKey},
};

// ─── State records ───────────────────────────────────────────────────────────

/// Upload bookkeeping for a whole participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantUploadState {
  pub domain:            String,
  pub reference:         String,
  /// One entry per expected photo; non-zero once that slot received an upload.
  pub processed_indexes: Vec<u8>,
}

impl ParticipantUploadState {
  pub fn upload_count(&self) -> u32 {
    self.processed_indexes.iter().filter(|&&i| i != 0).count() as u32
  }

  /// Every order index this participant is expected to fill.
  pub fn index_range(&self) -> Vec<u32> { (0..self.processed_indexes.len() as u32).collect() }
}

/// Pipeline facts for one slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSlotState {
  pub order_index:    u32,
  pub uploaded:       bool,
  pub thumbnail_key:  Option<String>,
  pub exif_processed: bool,
}

impl SubmissionSlotState {
  /// All three pipelines have reported for this slot.
  pub fn is_complete(&self) -> bool {
    self.uploaded && self.exif_processed && self.thumbnail_key.is_some()
  }
}

/// Sanitized EXIF payload for one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExifSlotState {
  pub order_index: u32,
  pub exif:        ExifData,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the per-photo state store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait SlotStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create the participant's upload state with `expected` zeroed entries.
  /// Re-initialising keeps already-processed entries and resizes to
  /// `expected`.
  fn init_participant_state<'a>(
    &'a self,
    key: &'a ParticipantKey,
    expected: usize,
  ) -> impl Future<Output = Result<ParticipantUploadState, Self::Error>> + Send + 'a;

  /// Mark the slot uploaded and flag its entry in `processed_indexes`.
  ///
  /// Fails if the participant state does not exist or the index is beyond
  /// the expected photo count.
  fn set_uploaded<'a>(
    &'a self,
    slot: &'a SlotKey,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn set_thumbnail<'a>(
    &'a self,
    slot: &'a SlotKey,
    thumbnail_key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn set_exif_processed<'a>(
    &'a self,
    slot: &'a SlotKey,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Store the (already sanitized) exif payload for a slot.
  fn set_exif<'a>(
    &'a self,
    slot: &'a SlotKey,
    exif: &'a ExifData,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn get_participant_state<'a>(
    &'a self,
    key: &'a ParticipantKey,
  ) -> impl Future<Output = Result<Option<ParticipantUploadState>, Self::Error>> + Send + 'a;

  /// Slot states for the requested indexes, ordered by order index. Indexes
  /// with no stored state are absent from the result.
  fn get_all_submission_states<'a>(
    &'a self,
    key: &'a ParticipantKey,
    indexes: &'a [u32],
  ) -> impl Future<Output = Result<Vec<SubmissionSlotState>, Self::Error>> + Send + 'a;

  /// Exif states for the requested indexes, ordered by order index. Indexes
  /// with no stored payload are absent from the result.
  fn get_all_exif_states<'a>(
    &'a self,
    key: &'a ParticipantKey,
    indexes: &'a [u32],
  ) -> impl Future<Output = Result<Vec<ExifSlotState>, Self::Error>> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn upload_count_counts_non_zero_entries() {
    let state = ParticipantUploadState {
      domain:            "spring".into(),
      reference:         "p-001".into(),
      processed_indexes: vec![1, 0, 1, 2, 0],
    };
    assert_eq!(state.upload_count(), 3);
    assert_eq!(state.index_range(), vec![0, 1, 2, 3, 4]);
  }

  #[test]
  fn slot_is_complete_only_when_all_pipelines_reported() {
    let mut slot = SubmissionSlotState { order_index: 0, uploaded: true, ..Default::default() };
    assert!(!slot.is_complete());
    slot.exif_processed = true;
    slot.thumbnail_key = Some("thumb/0.jpg".into());
    assert!(slot.is_complete());
  }
}
