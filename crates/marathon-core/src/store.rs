//! The `RecordStore` trait: durable marathon, participant, submission, rule
//! and finding records.
//!
//! The trait is implemented by storage backends (e.g. `marathon-store-sqlite`).
//! The coordinator and the HTTP layer depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use crate::{
  lifecycle::ParticipantStatus,
  participant::{Marathon, NewMarathon, NewParticipant, Participant, ParticipantKey, SlotKey},
  rule::{RuleConfigRecord, ValidationResult},
  submission::{Submission, SubmissionUpdate, UploadedObject},
};

/// Abstraction over the relational store.
///
/// Batch writes (`apply_submission_updates`, `replace_validation_results`)
/// are atomic on their own. No operation spans more than one of them.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Marathons ─────────────────────────────────────────────────────────

  /// Create a marathon with its ordered topics.
  fn register_marathon(
    &self,
    input: NewMarathon,
  ) -> impl Future<Output = Result<Marathon, Self::Error>> + Send + '_;

  /// Retrieve a marathon and its topics by domain. Returns `None` if absent.
  fn get_marathon<'a>(
    &'a self,
    domain: &'a str,
  ) -> impl Future<Output = Result<Option<Marathon>, Self::Error>> + Send + 'a;

  // ── Participants ──────────────────────────────────────────────────────

  /// Create an `initialized` participant and one `initialized` submission
  /// per topic of its marathon.
  fn register_participant(
    &self,
    input: NewParticipant,
  ) -> impl Future<Output = Result<Participant, Self::Error>> + Send + '_;

  fn get_participant<'a>(
    &'a self,
    key: &'a ParticipantKey,
  ) -> impl Future<Output = Result<Option<Participant>, Self::Error>> + Send + 'a;

  /// Move a participant along its lifecycle. Returns an error if the
  /// transition is not an edge of [`ParticipantStatus::can_transition_to`].
  fn set_participant_status<'a>(
    &'a self,
    key: &'a ParticipantKey,
    status: ParticipantStatus,
  ) -> impl Future<Output = Result<Participant, Self::Error>> + Send + 'a;

  /// Overwrite `upload_count` and set the status to `completed`. A verified
  /// participant is left untouched and `None` is returned.
  fn complete_participant(
    &self,
    participant_id: i64,
    upload_count: u32,
  ) -> impl Future<Output = Result<Option<Participant>, Self::Error>> + Send + '_;

  // ── Submissions ───────────────────────────────────────────────────────

  /// All submissions of a participant, ordered by order index.
  fn submissions(
    &self,
    participant_id: i64,
  ) -> impl Future<Output = Result<Vec<Submission>, Self::Error>> + Send + '_;

  /// Record the object metadata of a landed upload on the slot's submission.
  fn record_upload<'a>(
    &'a self,
    slot: &'a SlotKey,
    object: UploadedObject,
  ) -> impl Future<Output = Result<Submission, Self::Error>> + Send + 'a;

  /// Apply all per-slot updates for one participant in a single transaction.
  /// Returns the number of rows touched.
  fn apply_submission_updates(
    &self,
    participant_id: i64,
    updates: Vec<SubmissionUpdate>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Rules and findings ────────────────────────────────────────────────

  /// Insert or replace the marathon's configuration for `record.rule_key`.
  fn save_rule_config<'a>(
    &'a self,
    domain: &'a str,
    record: RuleConfigRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Enabled rule configurations of a marathon, in the order they were first
  /// configured.
  fn enabled_rule_configs<'a>(
    &'a self,
    domain: &'a str,
  ) -> impl Future<Output = Result<Vec<RuleConfigRecord>, Self::Error>> + Send + 'a;

  /// Delete every finding of the participant and insert `results`, in one
  /// transaction.
  fn replace_validation_results(
    &self,
    participant_id: i64,
    results: Vec<ValidationResult>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn validation_results(
    &self,
    participant_id: i64,
  ) -> impl Future<Output = Result<Vec<ValidationResult>, Self::Error>> + Send + '_;
}
