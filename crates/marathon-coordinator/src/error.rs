//! Error types for `marathon-coordinator`.

use marathon_core::participant::ParticipantKey;
use marathon_rules::RuleError;
use thiserror::Error;

/// A storage backend error with its concrete type erased.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a single finalize signal did not complete.
#[derive(Debug, Error)]
pub enum FinalizeError {
  #[error("participant state not found for {0}")]
  MissingParticipantState(ParticipantKey),

  #[error("submission states or exif states not found for {0}")]
  MissingSlotStates(ParticipantKey),

  /// Slot state exists but the durable participant row does not.
  #[error("participant not found: {0}")]
  MissingParticipant(ParticipantKey),

  #[error("participant {0} is already verified")]
  AlreadyVerified(ParticipantKey),

  #[error("failed to read state for {key}: {source}")]
  StateRead {
    key:    ParticipantKey,
    #[source]
    source: BoxError,
  },

  #[error("failed to write records for {key}: {source}")]
  WriteFailed {
    key:    ParticipantKey,
    #[source]
    source: BoxError,
  },
}

impl FinalizeError {
  pub(crate) fn state_read(key: &ParticipantKey, source: impl Into<BoxError>) -> Self {
    Self::StateRead { key: key.clone(), source: source.into() }
  }

  pub(crate) fn write_failed(key: &ParticipantKey, source: impl Into<BoxError>) -> Self {
    Self::WriteFailed { key: key.clone(), source: source.into() }
  }

  /// Infrastructure failures may succeed on redelivery; data failures will
  /// not until the data changes.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::StateRead { .. } | Self::WriteFailed { .. })
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Self::MissingParticipantState(_) => "missing_participant_state",
      Self::MissingSlotStates(_) => "missing_slot_states",
      Self::MissingParticipant(_) => "missing_participant",
      Self::AlreadyVerified(_) => "already_verified",
      Self::StateRead { .. } => "state_read",
      Self::WriteFailed { .. } => "write_failed",
    }
  }
}

#[derive(Debug, Error)]
pub enum ValidateError {
  #[error("participant not found: {0}")]
  MissingParticipant(ParticipantKey),

  /// A stored rule configuration or a submission could not be turned into
  /// engine input.
  #[error(transparent)]
  Rule(#[from] RuleError),

  #[error("failed to read records for {key}: {source}")]
  Read {
    key:    ParticipantKey,
    #[source]
    source: BoxError,
  },

  #[error("failed to store findings for {key}: {source}")]
  WriteFailed {
    key:    ParticipantKey,
    #[source]
    source: BoxError,
  },
}
