//! Status lifecycles for participants and their submissions.
//!
//! A participant moves through `Initialized → ReadyToUpload → Processing`
//! while the upload, exif and thumbnail pipelines fill in its slots
//! independently and in any order. `Completed` is entered only through a
//! successful finalize; `Verified` is set by staff outside this system.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

// ─── Participant ─────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParticipantStatus {
  Initialized,
  ReadyToUpload,
  Processing,
  Completed,
  Verified,
}

impl ParticipantStatus {
  /// Whether `self → next` is an edge of the participant lifecycle.
  ///
  /// Re-entering `Completed` from `Completed` is allowed so that a replayed
  /// finalize signal is a no-op transition.
  pub fn can_transition_to(self, next: Self) -> bool {
    use ParticipantStatus::*;
    matches!(
      (self, next),
      (Initialized, ReadyToUpload)
        | (ReadyToUpload, Processing)
        | (Initialized | ReadyToUpload | Processing | Completed, Completed)
        | (Completed, Verified)
    )
  }
}

// ─── Submission ──────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubmissionStatus {
  Initialized,
  Uploaded,
  Validated,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn finalize_can_complete_from_any_pre_verified_state() {
    for from in [
      ParticipantStatus::Initialized,
      ParticipantStatus::ReadyToUpload,
      ParticipantStatus::Processing,
      ParticipantStatus::Completed,
    ] {
      assert!(from.can_transition_to(ParticipantStatus::Completed), "{from}");
    }
  }

  #[test]
  fn verified_is_never_demoted() {
    assert!(!ParticipantStatus::Verified.can_transition_to(ParticipantStatus::Completed));
    assert!(!ParticipantStatus::Verified.can_transition_to(ParticipantStatus::Processing));
  }

  #[test]
  fn verified_requires_completed() {
    assert!(ParticipantStatus::Completed.can_transition_to(ParticipantStatus::Verified));
    assert!(!ParticipantStatus::Processing.can_transition_to(ParticipantStatus::Verified));
  }

  #[test]
  fn status_strings_are_snake_case() {
    assert_eq!(ParticipantStatus::ReadyToUpload.as_ref(), "ready_to_upload");
    assert_eq!(
      "ready_to_upload".parse::<ParticipantStatus>().unwrap(),
      ParticipantStatus::ReadyToUpload
    );
    assert_eq!(SubmissionStatus::Uploaded.to_string(), "uploaded");
  }
}
