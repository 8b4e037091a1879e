//! Error type for `marathon-rules`.

use marathon_core::rule::RuleKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
  /// The params payload does not have the shape the rule requires, or fails
  /// a semantic check.
  #[error("invalid params for rule {key}: {reason}")]
  InvalidParams { key: RuleKey, reason: String },

  #[error("invalid validation input: {0}")]
  InvalidInput(String),
}

impl RuleError {
  pub(crate) fn params(key: RuleKey, reason: impl Into<String>) -> Self {
    Self::InvalidParams { key, reason: reason.into() }
  }
}

pub type Result<T, E = RuleError> = std::result::Result<T, E>;
