//! Error types for `marathon-core`.

use thiserror::Error;

use crate::lifecycle::ParticipantStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("participant state not found: {0}")]
  ParticipantStateNotFound(String),

  #[error("order index {index} is out of range for {len} expected photos")]
  IndexOutOfRange { index: u32, len: usize },

  #[error("invalid participant transition: {from} -> {to}")]
  InvalidTransition {
    from: ParticipantStatus,
    to:   ParticipantStatus,
  },

  #[error("unknown discriminant: {0:?}")]
  UnknownDiscriminant(String),

  #[error("exif payload must be a JSON object")]
  ExifNotAnObject,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl From<strum::ParseError> for Error {
  fn from(e: strum::ParseError) -> Self { Self::UnknownDiscriminant(e.to_string()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
