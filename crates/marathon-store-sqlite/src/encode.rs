//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Status and rule enums are stored
//! as their serialized discriminants. Exif payloads, rule params and the
//! processed-index array are stored as compact JSON.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use marathon_core::{
  exif::ExifData,
  participant::Participant,
  rule::{RuleConfigRecord, ValidationResult},
  slot::ParticipantUploadState,
  submission::Submission,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Discriminants ───────────────────────────────────────────────────────────

/// Parse a strum-backed enum column.
pub fn decode_enum<T>(s: &str) -> Result<T>
where
  T: FromStr,
  marathon_core::Error: From<T::Err>,
{
  s.parse::<T>()
    .map_err(|e| Error::Core(marathon_core::Error::from(e)))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_exif(exif: &ExifData) -> Result<String> { Ok(serde_json::to_string(exif)?) }

pub fn decode_exif(s: &str) -> Result<ExifData> { Ok(serde_json::from_str(s)?) }

pub fn decode_indexes(s: &str) -> Result<Vec<u8>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `participants` row joined with its marathon.
pub struct RawParticipant {
  pub participant_id: i64,
  pub marathon_id:    i64,
  pub domain:         String,
  pub reference:      String,
  pub status:         String,
  pub upload_count:   i64,
  pub created_at:     String,
}

/// Column list matching [`RawParticipant::from_row`].
pub const PARTICIPANT_COLUMNS: &str = "p.participant_id, p.marathon_id, m.domain, p.reference, \
                                       p.status, p.upload_count, p.created_at";

impl RawParticipant {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      participant_id: row.get(0)?,
      marathon_id:    row.get(1)?,
      domain:         row.get(2)?,
      reference:      row.get(3)?,
      status:         row.get(4)?,
      upload_count:   row.get(5)?,
      created_at:     row.get(6)?,
    })
  }

  pub fn into_participant(self) -> Result<Participant> {
    Ok(Participant {
      id:           self.participant_id,
      marathon_id:  self.marathon_id,
      domain:       self.domain,
      reference:    self.reference,
      status:       decode_enum(&self.status)?,
      upload_count: self.upload_count.max(0) as u32,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read from a `submissions` row joined with its topic.
pub struct RawSubmission {
  pub submission_id:  i64,
  pub participant_id: i64,
  pub topic_id:       i64,
  pub order_index:    i64,
  pub status:         String,
  pub key:            Option<String>,
  pub thumbnail_key:  Option<String>,
  pub preview_key:    Option<String>,
  pub exif_json:      String,
  pub size:           Option<i64>,
  pub mime_type:      Option<String>,
  pub uploaded:       bool,
}

/// Column list matching [`RawSubmission::from_row`].
pub const SUBMISSION_COLUMNS: &str = "s.submission_id, s.participant_id, s.topic_id, \
                                      t.order_index, s.status, s.key, s.thumbnail_key, \
                                      s.preview_key, s.exif_json, s.size, s.mime_type, s.uploaded";

impl RawSubmission {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      submission_id:  row.get(0)?,
      participant_id: row.get(1)?,
      topic_id:       row.get(2)?,
      order_index:    row.get(3)?,
      status:         row.get(4)?,
      key:            row.get(5)?,
      thumbnail_key:  row.get(6)?,
      preview_key:    row.get(7)?,
      exif_json:      row.get(8)?,
      size:           row.get(9)?,
      mime_type:      row.get(10)?,
      uploaded:       row.get(11)?,
    })
  }

  pub fn into_submission(self) -> Result<Submission> {
    Ok(Submission {
      id:             self.submission_id,
      participant_id: self.participant_id,
      topic_id:       self.topic_id,
      order_index:    self.order_index as u32,
      status:         decode_enum(&self.status)?,
      key:            self.key,
      thumbnail_key:  self.thumbnail_key,
      preview_key:    self.preview_key,
      exif:           decode_exif(&self.exif_json)?,
      size:           self.size.map(|s| s.max(0) as u64),
      mime_type:      self.mime_type,
      uploaded:       self.uploaded,
    })
  }
}

/// Raw values read from a `rule_configs` row.
pub struct RawRuleConfig {
  pub rule_key:    String,
  pub severity:    String,
  pub params_json: String,
  pub enabled:     bool,
}

impl RawRuleConfig {
  pub fn into_record(self) -> Result<RuleConfigRecord> {
    Ok(RuleConfigRecord {
      rule_key: decode_enum(&self.rule_key)?,
      severity: decode_enum(&self.severity)?,
      params:   serde_json::from_str(&self.params_json)?,
      enabled:  self.enabled,
    })
  }
}

/// Raw values read from a `validation_results` row.
pub struct RawValidationResult {
  pub rule_key:  String,
  pub severity:  String,
  pub outcome:   String,
  pub message:   String,
  pub file_name: Option<String>,
}

impl RawValidationResult {
  pub fn into_result(self) -> Result<ValidationResult> {
    Ok(ValidationResult {
      rule_key:  decode_enum(&self.rule_key)?,
      severity:  decode_enum(&self.severity)?,
      outcome:   decode_enum(&self.outcome)?,
      message:   self.message,
      file_name: self.file_name,
    })
  }
}

/// Raw values read from a `participant_states` row.
pub struct RawParticipantState {
  pub domain:            String,
  pub reference:         String,
  pub processed_indexes: String,
}

impl RawParticipantState {
  pub fn into_state(self) -> Result<ParticipantUploadState> {
    Ok(ParticipantUploadState {
      domain:            self.domain,
      reference:         self.reference,
      processed_indexes: decode_indexes(&self.processed_indexes)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use marathon_core::lifecycle::ParticipantStatus;

  use super::*;

  #[test]
  fn datetimes_survive_rfc3339() {
    let now = Utc::now();
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }

  #[test]
  fn unknown_discriminant_is_a_core_error() {
    let status: ParticipantStatus = decode_enum("ready_to_upload").unwrap();
    assert_eq!(status, ParticipantStatus::ReadyToUpload);

    let err = decode_enum::<ParticipantStatus>("archived").unwrap_err();
    assert!(matches!(err, Error::Core(marathon_core::Error::UnknownDiscriminant(_))));
  }
}
