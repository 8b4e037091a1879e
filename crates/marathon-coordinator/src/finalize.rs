//! The finalization coordinator.
//!
//! Finalize is a pure recomputation from slot-state truth: it reads the
//! participant's upload state and every slot, merges them into one update per
//! slot, and overwrites the durable records. Replaying a signal with unchanged
//! slot data produces identical records, which is what makes at-least-once
//! delivery safe.
//!
//! The two slot reads run concurrently, as do the two record writes. A batch
//! of signals is processed with bounded concurrency. Slot state and durable
//! records live in different stores and are not written atomically together.

use std::collections::HashMap;

use futures::{stream, StreamExt as _};
use marathon_core::{
  exif::ExifData,
  lifecycle::{ParticipantStatus, SubmissionStatus},
  participant::{Participant, ParticipantKey},
  progress::{RunProgress, RunStateNotifier, RunTask},
  slot::{ExifSlotState, SlotStore, SubmissionSlotState},
  store::RecordStore,
  submission::SubmissionUpdate,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::FinalizeError;

/// Signals processed at once by [`FinalizationCoordinator::handle_batch`]
/// unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 2;

pub const STEP_READ_PARTICIPANT_STATE: &str = "read-participant-state";
pub const STEP_READ_SLOT_STATES: &str = "read-slot-states";
pub const STEP_MERGE_SLOT_STATES: &str = "merge-slot-states";
pub const STEP_WRITE_RECORDS: &str = "write-records";

const STEPS: [&str; 4] = [
  STEP_READ_PARTICIPANT_STATE,
  STEP_READ_SLOT_STATES,
  STEP_MERGE_SLOT_STATES,
  STEP_WRITE_RECORDS,
];

// ─── Signals and reports ─────────────────────────────────────────────────────

/// "All of this participant's uploads are in." Delivered at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedSignal {
  pub domain:    String,
  pub reference: String,
}

impl FinalizedSignal {
  pub fn key(&self) -> ParticipantKey { ParticipantKey::new(&self.domain, &self.reference) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStatus {
  Finalized,
  Failed,
}

/// What happened to one signal of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalOutcome {
  pub domain:       String,
  pub reference:    String,
  pub status:       SignalStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub upload_count: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error_kind:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:        Option<String>,
  /// Redelivering this signal may succeed.
  pub retryable:    bool,
}

impl SignalOutcome {
  fn finalized(participant: &Participant) -> Self {
    Self {
      domain:       participant.domain.clone(),
      reference:    participant.reference.clone(),
      status:       SignalStatus::Finalized,
      upload_count: Some(participant.upload_count),
      error_kind:   None,
      error:        None,
      retryable:    false,
    }
  }

  fn failed(key: &ParticipantKey, err: &FinalizeError) -> Self {
    Self {
      domain:       key.domain.clone(),
      reference:    key.reference.clone(),
      status:       SignalStatus::Failed,
      upload_count: None,
      error_kind:   Some(err.kind().to_owned()),
      error:        Some(err.to_string()),
      retryable:    err.is_retryable(),
    }
  }
}

/// Per-signal outcomes of a batch, in the order the signals arrived. Every
/// signal is acknowledged regardless of its outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
  pub outcomes: Vec<SignalOutcome>,
}

impl BatchReport {
  pub fn finalized(&self) -> usize {
    self.outcomes.iter().filter(|o| o.status == SignalStatus::Finalized).count()
  }

  pub fn failed(&self) -> usize { self.outcomes.len() - self.finalized() }

  /// Failed signals an upstream delivery layer could redeliver.
  pub fn retryable(&self) -> impl Iterator<Item = &SignalOutcome> {
    self.outcomes.iter().filter(|o| o.retryable)
  }
}

// ─── Merge ───────────────────────────────────────────────────────────────────

/// Build one update per slot. A slot whose exif was never marked processed,
/// or whose payload is missing, gets an empty exif object.
pub fn merge_slot_states(
  slots: Vec<SubmissionSlotState>,
  exifs: Vec<ExifSlotState>,
) -> Vec<SubmissionUpdate> {
  let mut exif_by_index: HashMap<u32, ExifData> =
    exifs.into_iter().map(|e| (e.order_index, e.exif)).collect();

  slots
    .into_iter()
    .map(|slot| {
      let exif = if slot.exif_processed {
        exif_by_index.remove(&slot.order_index).unwrap_or_default()
      } else {
        ExifData::new()
      };
      SubmissionUpdate {
        order_index: slot.order_index,
        status: SubmissionStatus::Uploaded,
        thumbnail_key: slot.thumbnail_key,
        exif,
        uploaded: slot.uploaded,
      }
    })
    .collect()
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

pub struct FinalizationCoordinator<S, R, N> {
  slots:       S,
  records:     R,
  notifier:    N,
  concurrency: usize,
}

impl<S, R, N> FinalizationCoordinator<S, R, N>
where
  S: SlotStore,
  R: RecordStore,
  N: RunStateNotifier,
{
  pub fn new(slots: S, records: R, notifier: N) -> Self {
    Self { slots, records, notifier, concurrency: DEFAULT_CONCURRENCY }
  }

  /// Cap on signals processed at once by [`Self::handle_batch`]. Zero is
  /// treated as one.
  pub fn with_concurrency(mut self, concurrency: usize) -> Self {
    self.concurrency = concurrency.max(1);
    self
  }

  /// Finalize one participant. Nothing durable is written unless the
  /// participant state, the slot states and the participant row all exist.
  pub async fn finalize(&self, key: &ParticipantKey) -> Result<Participant, FinalizeError> {
    let progress = RunProgress::new(&self.notifier, key, RunTask::Finalize);
    for step in STEPS {
      progress.pending(step);
    }
    let fail = |step: &str, err: FinalizeError| {
      progress.error(step, err.to_string());
      err
    };

    // 1. Upload bookkeeping.
    progress.running(STEP_READ_PARTICIPANT_STATE);
    let state = self
      .slots
      .get_participant_state(key)
      .await
      .map_err(|e| fail(STEP_READ_PARTICIPANT_STATE, FinalizeError::state_read(key, e)))?
      .ok_or_else(|| {
        fail(STEP_READ_PARTICIPANT_STATE, FinalizeError::MissingParticipantState(key.clone()))
      })?;
    let upload_count = state.upload_count();
    let indexes = state.index_range();
    progress.success(STEP_READ_PARTICIPANT_STATE);

    // 2. Every slot, both halves at once.
    progress.running(STEP_READ_SLOT_STATES);
    let (slots, exifs) = tokio::join!(
      self.slots.get_all_submission_states(key, &indexes),
      self.slots.get_all_exif_states(key, &indexes),
    );
    let slots = slots.map_err(|e| fail(STEP_READ_SLOT_STATES, FinalizeError::state_read(key, e)))?;
    let exifs = exifs.map_err(|e| fail(STEP_READ_SLOT_STATES, FinalizeError::state_read(key, e)))?;
    if slots.is_empty() || exifs.is_empty() {
      return Err(fail(STEP_READ_SLOT_STATES, FinalizeError::MissingSlotStates(key.clone())));
    }
    progress.success(STEP_READ_SLOT_STATES);

    progress.running(STEP_MERGE_SLOT_STATES);
    let incomplete = slots.iter().filter(|s| !s.is_complete()).count();
    let updates = merge_slot_states(slots, exifs);
    progress.success(STEP_MERGE_SLOT_STATES);

    // 3. Durable records.
    progress.running(STEP_WRITE_RECORDS);
    let participant = self
      .records
      .get_participant(key)
      .await
      .map_err(|e| fail(STEP_WRITE_RECORDS, FinalizeError::state_read(key, e)))?
      .ok_or_else(|| fail(STEP_WRITE_RECORDS, FinalizeError::MissingParticipant(key.clone())))?;
    if participant.status == ParticipantStatus::Verified {
      return Err(fail(STEP_WRITE_RECORDS, FinalizeError::AlreadyVerified(key.clone())));
    }

    let (applied, completed) = tokio::join!(
      self.records.apply_submission_updates(participant.id, updates),
      self.records.complete_participant(participant.id, upload_count),
    );
    let applied = applied.map_err(|e| fail(STEP_WRITE_RECORDS, FinalizeError::write_failed(key, e)))?;
    // Verified between the read above and the update.
    let completed = completed
      .map_err(|e| fail(STEP_WRITE_RECORDS, FinalizeError::write_failed(key, e)))?
      .ok_or_else(|| fail(STEP_WRITE_RECORDS, FinalizeError::AlreadyVerified(key.clone())))?;
    progress.success(STEP_WRITE_RECORDS);

    info!(
      domain = %key.domain,
      reference = %key.reference,
      participant_id = completed.id,
      upload_count,
      submissions = applied,
      incomplete_slots = incomplete,
      "participant finalized"
    );
    Ok(completed)
  }

  /// Finalize every signal of a batch, at most `concurrency` at a time.
  /// Failures are logged and reported, never propagated.
  pub async fn handle_batch(&self, signals: Vec<FinalizedSignal>) -> BatchReport {
    let mut outcomes: Vec<(usize, SignalOutcome)> = stream::iter(signals.into_iter().enumerate())
      .map(|(position, signal)| async move {
        let key = signal.key();
        let outcome = match self.finalize(&key).await {
          Ok(participant) => SignalOutcome::finalized(&participant),
          Err(err) => {
            if err.is_retryable() {
              error!(domain = %key.domain, reference = %key.reference, error = %err, "finalize failed");
            } else {
              warn!(
                domain = %key.domain,
                reference = %key.reference,
                kind = err.kind(),
                error = %err,
                "finalize skipped"
              );
            }
            SignalOutcome::failed(&key, &err)
          }
        };
        (position, outcome)
      })
      .buffer_unordered(self.concurrency)
      .collect()
      .await;

    outcomes.sort_by_key(|(position, _)| *position);
    BatchReport { outcomes: outcomes.into_iter().map(|(_, o)| o).collect() }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn slot(order_index: u32, uploaded: bool, exif_processed: bool) -> SubmissionSlotState {
    SubmissionSlotState {
      order_index,
      uploaded,
      thumbnail_key: uploaded.then(|| format!("thumb/{order_index}.jpg")),
      exif_processed,
    }
  }

  fn exif_state(order_index: u32, make: &str) -> ExifSlotState {
    ExifSlotState {
      order_index,
      exif: json!({ "Make": make }).as_object().cloned().unwrap_or_default(),
    }
  }

  #[test]
  fn merge_joins_exif_by_order_index() {
    let updates = merge_slot_states(
      vec![slot(0, true, true), slot(1, true, true), slot(2, false, true)],
      vec![exif_state(1, "Nikon"), exif_state(0, "Canon")],
    );

    assert_eq!(updates.len(), 3);
    assert_eq!(updates[0].exif.get("Make"), Some(&json!("Canon")));
    assert_eq!(updates[1].exif.get("Make"), Some(&json!("Nikon")));
    // Processed but no payload stored.
    assert!(updates[2].exif.is_empty());
    assert!(updates.iter().all(|u| u.status == SubmissionStatus::Uploaded));
    assert!(!updates[2].uploaded);
    assert_eq!(updates[0].thumbnail_key.as_deref(), Some("thumb/0.jpg"));
  }

  #[test]
  fn unprocessed_exif_is_ignored() {
    let updates = merge_slot_states(vec![slot(0, true, false)], vec![exif_state(0, "Canon")]);
    assert!(updates[0].exif.is_empty());
  }

  #[test]
  fn report_counts_and_retryables() {
    let key = ParticipantKey::new("spring", "p-001");
    let report = BatchReport {
      outcomes: vec![
        SignalOutcome::failed(&key, &FinalizeError::MissingSlotStates(key.clone())),
        SignalOutcome::failed(&key, &FinalizeError::write_failed(&key, "disk full")),
      ],
    };
    assert_eq!(report.finalized(), 0);
    assert_eq!(report.failed(), 2);
    let retryable: Vec<_> = report.retryable().collect();
    assert_eq!(retryable.len(), 1);
    assert_eq!(retryable[0].error_kind.as_deref(), Some("write_failed"));
  }
}
