//! Error type for `marathon-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] marathon_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("marathon not found: {0}")]
  MarathonNotFound(String),

  #[error("marathon already registered: {0}")]
  MarathonExists(String),

  #[error("participant not found: {0}")]
  ParticipantNotFound(String),

  #[error("participant already registered: {0}")]
  ParticipantExists(String),

  /// No submission row exists for the slot (unknown participant or topic).
  #[error("submission not found: {0}")]
  SubmissionNotFound(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
