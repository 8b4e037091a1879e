//! Validation rule configuration records and findings.
//!
//! The evaluation engine lives in `marathon-rules`; this module holds only the
//! shapes that cross the storage boundary.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// The closed set of rules a marathon can enable.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RuleKey {
  AllowedFileTypes,
  MaxFileSize,
  StrictTimestampOrdering,
  SameDevice,
  WithinTimerange,
  NoModification,
}

impl RuleKey {
  /// Participant-wide rules produce a single finding without a file name.
  pub fn is_participant_wide(self) -> bool {
    matches!(self, Self::StrictTimestampOrdering | Self::SameDevice)
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
  Error,
  Warning,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Outcome {
  Passed,
  Failed,
}

/// A rule configuration as persisted per marathon. `params` is unchecked JSON
/// until it is turned into a typed rule by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfigRecord {
  pub rule_key: RuleKey,
  pub severity: Severity,
  #[serde(default = "empty_params")]
  pub params:   serde_json::Value,
  #[serde(default = "enabled_by_default")]
  pub enabled:  bool,
}

fn empty_params() -> serde_json::Value { serde_json::Value::Object(Default::default()) }

fn enabled_by_default() -> bool { true }

/// A single finding. Identified by `(participant, rule_key, file_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
  pub rule_key:  RuleKey,
  pub severity:  Severity,
  pub outcome:   Outcome,
  pub message:   String,
  /// Absent for participant-wide rules.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub file_name: Option<String>,
}

impl ValidationResult {
  pub fn is_failed(&self) -> bool { self.outcome == Outcome::Failed }
}
