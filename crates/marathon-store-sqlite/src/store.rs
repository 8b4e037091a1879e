//! [`SqliteStore`], the SQLite implementation of [`RecordStore`].
//!
//! The [`SlotStore`](marathon_core::slot::SlotStore) half lives in
//! `slots.rs`.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use marathon_core::{
  lifecycle::{ParticipantStatus, SubmissionStatus},
  participant::{Marathon, NewMarathon, NewParticipant, Participant, ParticipantKey, SlotKey, Topic},
  rule::{RuleConfigRecord, ValidationResult},
  store::RecordStore,
  submission::{Submission, SubmissionUpdate, UploadedObject},
};

use crate::{
  encode::{
    decode_dt, encode_dt, encode_exif, RawParticipant, RawRuleConfig, RawSubmission,
    RawValidationResult, PARTICIPANT_COLUMNS, SUBMISSION_COLUMNS,
  },
  schema::SCHEMA,
  Error, Result,
};

/// Outcome of an insert that is refused when its parent is missing or the
/// row already exists.
enum Insert {
  Created(i64),
  MissingParent,
  Duplicate,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Marathon records and per-photo slot state backed by a single SQLite file.
///
/// Cloning shares the inner connection.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn participant_by_id(&self, participant_id: i64) -> Result<Participant> {
    let raw: Option<RawParticipant> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {PARTICIPANT_COLUMNS}
                 FROM participants p JOIN marathons m ON m.marathon_id = p.marathon_id
                WHERE p.participant_id = ?1"
            ),
            rusqlite::params![participant_id],
            RawParticipant::from_row,
          )
          .optional()?)
      })
      .await?;

    raw
      .ok_or_else(|| Error::ParticipantNotFound(participant_id.to_string()))?
      .into_participant()
  }

  async fn submission_by_id(&self, submission_id: i64) -> Result<Submission> {
    let raw: RawSubmission = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "SELECT {SUBMISSION_COLUMNS}
               FROM submissions s JOIN topics t ON t.topic_id = s.topic_id
              WHERE s.submission_id = ?1"
          ),
          rusqlite::params![submission_id],
          RawSubmission::from_row,
        )?)
      })
      .await?;

    raw.into_submission()
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  // ── Marathons ─────────────────────────────────────────────────────────────

  async fn register_marathon(&self, input: NewMarathon) -> Result<Marathon> {
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let domain = input.domain.clone();
    let name = input.name.clone();
    let topic_names = input.topics.clone();

    let inserted: Option<(i64, Vec<i64>)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists = tx
          .query_row(
            "SELECT 1 FROM marathons WHERE domain = ?1",
            rusqlite::params![domain],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if exists {
          return Ok(None);
        }

        tx.execute(
          "INSERT INTO marathons (domain, name, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![domain, name, at_str],
        )?;
        let marathon_id = tx.last_insert_rowid();

        let mut topic_ids = Vec::with_capacity(topic_names.len());
        {
          let mut stmt = tx.prepare(
            "INSERT INTO topics (marathon_id, order_index, name) VALUES (?1, ?2, ?3)",
          )?;
          for (index, topic) in topic_names.iter().enumerate() {
            stmt.execute(rusqlite::params![marathon_id, index as i64, topic])?;
            topic_ids.push(tx.last_insert_rowid());
          }
        }

        tx.commit()?;
        Ok(Some((marathon_id, topic_ids)))
      })
      .await?;

    let (marathon_id, topic_ids) =
      inserted.ok_or_else(|| Error::MarathonExists(input.domain.clone()))?;

    let topics = topic_ids
      .into_iter()
      .zip(input.topics)
      .enumerate()
      .map(|(index, (id, name))| Topic { id, order_index: index as u32, name })
      .collect();

    Ok(Marathon {
      id: marathon_id,
      domain: input.domain,
      name: input.name,
      topics,
      created_at,
    })
  }

  async fn get_marathon<'a>(&'a self, domain: &'a str) -> Result<Option<Marathon>> {
    let domain_owned = domain.to_owned();

    type Row = (i64, String, String, String);
    let raw: Option<(Row, Vec<(i64, i64, String)>)> = self
      .conn
      .call(move |conn| {
        let marathon: Option<Row> = conn
          .query_row(
            "SELECT marathon_id, domain, name, created_at FROM marathons WHERE domain = ?1",
            rusqlite::params![domain_owned],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
          )
          .optional()?;

        let Some(marathon) = marathon else {
          return Ok(None);
        };

        let mut stmt = conn.prepare(
          "SELECT topic_id, order_index, name FROM topics
            WHERE marathon_id = ?1 ORDER BY order_index",
        )?;
        let topics: Vec<(i64, i64, String)> = stmt
          .query_map(rusqlite::params![marathon.0], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some((marathon, topics)))
      })
      .await?;

    let Some(((id, domain, name, created_at), topics)) = raw else {
      return Ok(None);
    };

    Ok(Some(Marathon {
      id,
      domain,
      name,
      topics: topics
        .into_iter()
        .map(|(id, order_index, name)| Topic { id, order_index: order_index as u32, name })
        .collect(),
      created_at: decode_dt(&created_at)?,
    }))
  }

  // ── Participants ──────────────────────────────────────────────────────────

  async fn register_participant(&self, input: NewParticipant) -> Result<Participant> {
    let at_str = encode_dt(Utc::now());
    let domain = input.domain.clone();
    let reference = input.reference.clone();
    let initial_status = ParticipantStatus::Initialized.as_ref().to_owned();
    let submission_status = SubmissionStatus::Initialized.as_ref().to_owned();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let marathon_id: Option<i64> = tx
          .query_row(
            "SELECT marathon_id FROM marathons WHERE domain = ?1",
            rusqlite::params![domain],
            |row| row.get(0),
          )
          .optional()?;
        let Some(marathon_id) = marathon_id else {
          return Ok(Insert::MissingParent);
        };

        let exists = tx
          .query_row(
            "SELECT 1 FROM participants WHERE marathon_id = ?1 AND reference = ?2",
            rusqlite::params![marathon_id, reference],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if exists {
          return Ok(Insert::Duplicate);
        }

        tx.execute(
          "INSERT INTO participants (marathon_id, reference, status, upload_count, created_at)
           VALUES (?1, ?2, ?3, 0, ?4)",
          rusqlite::params![marathon_id, reference, initial_status, at_str],
        )?;
        let participant_id = tx.last_insert_rowid();

        tx.execute(
          "INSERT INTO submissions (participant_id, topic_id, status)
           SELECT ?1, topic_id, ?2 FROM topics WHERE marathon_id = ?3",
          rusqlite::params![participant_id, submission_status, marathon_id],
        )?;

        tx.commit()?;
        Ok(Insert::Created(participant_id))
      })
      .await?;

    let key = ParticipantKey::new(input.domain, input.reference);
    match outcome {
      Insert::Created(id) => self.participant_by_id(id).await,
      Insert::MissingParent => Err(Error::MarathonNotFound(key.domain)),
      Insert::Duplicate => Err(Error::ParticipantExists(key.to_string())),
    }
  }

  async fn get_participant<'a>(&'a self, key: &'a ParticipantKey) -> Result<Option<Participant>> {
    let domain = key.domain.clone();
    let reference = key.reference.clone();

    let raw: Option<RawParticipant> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {PARTICIPANT_COLUMNS}
                 FROM participants p JOIN marathons m ON m.marathon_id = p.marathon_id
                WHERE m.domain = ?1 AND p.reference = ?2"
            ),
            rusqlite::params![domain, reference],
            RawParticipant::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawParticipant::into_participant).transpose()
  }

  async fn set_participant_status<'a>(
    &'a self,
    key: &'a ParticipantKey,
    status: ParticipantStatus,
  ) -> Result<Participant> {
    let mut participant = self
      .get_participant(key)
      .await?
      .ok_or_else(|| Error::ParticipantNotFound(key.to_string()))?;

    if !participant.status.can_transition_to(status) {
      return Err(
        marathon_core::Error::InvalidTransition { from: participant.status, to: status }.into(),
      );
    }

    let id = participant.id;
    let status_str = status.as_ref().to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE participants SET status = ?1 WHERE participant_id = ?2",
          rusqlite::params![status_str, id],
        )?;
        Ok(())
      })
      .await?;

    participant.status = status;
    Ok(participant)
  }

  async fn complete_participant(
    &self,
    participant_id: i64,
    upload_count: u32,
  ) -> Result<Option<Participant>> {
    let status_str = ParticipantStatus::Completed.as_ref().to_owned();
    let verified_str = ParticipantStatus::Verified.as_ref().to_owned();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE participants SET status = ?1, upload_count = ?2
            WHERE participant_id = ?3 AND status != ?4",
          rusqlite::params![status_str, upload_count as i64, participant_id, verified_str],
        )?)
      })
      .await?;

    // Zero rows: either no such participant (an error) or a verified one.
    let participant = self.participant_by_id(participant_id).await?;
    Ok((changed > 0).then_some(participant))
  }

  // ── Submissions ───────────────────────────────────────────────────────────

  async fn submissions(&self, participant_id: i64) -> Result<Vec<Submission>> {
    let raws: Vec<RawSubmission> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBMISSION_COLUMNS}
             FROM submissions s JOIN topics t ON t.topic_id = s.topic_id
            WHERE s.participant_id = ?1
            ORDER BY t.order_index"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![participant_id], RawSubmission::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubmission::into_submission).collect()
  }

  async fn record_upload<'a>(&'a self, slot: &'a SlotKey, object: UploadedObject) -> Result<Submission> {
    let domain = slot.domain.clone();
    let reference = slot.reference.clone();
    let order_index = slot.order_index as i64;

    let submission_id: Option<i64> = self
      .conn
      .call(move |conn| {
        let id: Option<i64> = conn
          .query_row(
            "SELECT s.submission_id
               FROM submissions s
               JOIN participants p ON p.participant_id = s.participant_id
               JOIN marathons m    ON m.marathon_id    = p.marathon_id
               JOIN topics t       ON t.topic_id       = s.topic_id
              WHERE m.domain = ?1 AND p.reference = ?2 AND t.order_index = ?3",
            rusqlite::params![domain, reference, order_index],
            |row| row.get(0),
          )
          .optional()?;

        if let Some(id) = id {
          conn.execute(
            "UPDATE submissions SET key = ?1, preview_key = ?2, size = ?3, mime_type = ?4
              WHERE submission_id = ?5",
            rusqlite::params![
              object.key,
              object.preview_key,
              object.size as i64,
              object.mime_type,
              id,
            ],
          )?;
        }
        Ok(id)
      })
      .await?;

    let id = submission_id.ok_or_else(|| Error::SubmissionNotFound(slot.to_string()))?;
    self.submission_by_id(id).await
  }

  async fn apply_submission_updates(
    &self,
    participant_id: i64,
    updates: Vec<SubmissionUpdate>,
  ) -> Result<usize> {
    let rows = updates
      .into_iter()
      .map(|u| -> Result<_> {
        Ok((
          u.order_index as i64,
          u.status.as_ref().to_owned(),
          u.thumbnail_key,
          encode_exif(&u.exif)?,
          u.uploaded,
        ))
      })
      .collect::<Result<Vec<_>>>()?;

    let touched = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut touched = 0;
        {
          let mut stmt = tx.prepare(
            "UPDATE submissions
                SET status = ?1, thumbnail_key = ?2, exif_json = ?3, uploaded = ?4
              WHERE participant_id = ?5
                AND topic_id = (
                  SELECT t.topic_id FROM topics t
                    JOIN participants p ON p.marathon_id = t.marathon_id
                   WHERE p.participant_id = ?5 AND t.order_index = ?6
                )",
          )?;
          for (order_index, status, thumbnail_key, exif_json, uploaded) in rows {
            touched += stmt.execute(rusqlite::params![
              status,
              thumbnail_key,
              exif_json,
              uploaded,
              participant_id,
              order_index,
            ])?;
          }
        }
        tx.commit()?;
        Ok(touched)
      })
      .await?;

    Ok(touched)
  }

  // ── Rules and findings ────────────────────────────────────────────────────

  async fn save_rule_config<'a>(&'a self, domain: &'a str, record: RuleConfigRecord) -> Result<()> {
    let domain_owned = domain.to_owned();
    let rule_key = record.rule_key.as_ref().to_owned();
    let severity = record.severity.as_ref().to_owned();
    let params_json = serde_json::to_string(&record.params)?;
    let enabled = record.enabled;

    let saved = self
      .conn
      .call(move |conn| {
        let marathon_id: Option<i64> = conn
          .query_row(
            "SELECT marathon_id FROM marathons WHERE domain = ?1",
            rusqlite::params![domain_owned],
            |row| row.get(0),
          )
          .optional()?;
        let Some(marathon_id) = marathon_id else {
          return Ok(false);
        };

        conn.execute(
          "INSERT INTO rule_configs (marathon_id, rule_key, severity, params_json, enabled)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (marathon_id, rule_key) DO UPDATE SET
             severity    = excluded.severity,
             params_json = excluded.params_json,
             enabled     = excluded.enabled",
          rusqlite::params![marathon_id, rule_key, severity, params_json, enabled],
        )?;
        Ok(true)
      })
      .await?;

    if !saved {
      return Err(Error::MarathonNotFound(domain.to_owned()));
    }
    Ok(())
  }

  async fn enabled_rule_configs<'a>(&'a self, domain: &'a str) -> Result<Vec<RuleConfigRecord>> {
    let domain_owned = domain.to_owned();

    let raws: Vec<RawRuleConfig> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT r.rule_key, r.severity, r.params_json, r.enabled
             FROM rule_configs r JOIN marathons m ON m.marathon_id = r.marathon_id
            WHERE m.domain = ?1 AND r.enabled = 1
            ORDER BY r.rule_config_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![domain_owned], |row| {
            Ok(RawRuleConfig {
              rule_key:    row.get(0)?,
              severity:    row.get(1)?,
              params_json: row.get(2)?,
              enabled:     row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRuleConfig::into_record).collect()
  }

  async fn replace_validation_results(
    &self,
    participant_id: i64,
    results: Vec<ValidationResult>,
  ) -> Result<()> {
    let rows: Vec<_> = results
      .into_iter()
      .map(|r| {
        (
          r.rule_key.as_ref().to_owned(),
          r.severity.as_ref().to_owned(),
          r.outcome.as_ref().to_owned(),
          r.message,
          r.file_name,
        )
      })
      .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM validation_results WHERE participant_id = ?1",
          rusqlite::params![participant_id],
        )?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO validation_results
               (participant_id, position, rule_key, severity, outcome, message, file_name)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          )?;
          for (position, (rule_key, severity, outcome, message, file_name)) in
            rows.into_iter().enumerate()
          {
            stmt.execute(rusqlite::params![
              participant_id,
              position as i64,
              rule_key,
              severity,
              outcome,
              message,
              file_name,
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn validation_results(&self, participant_id: i64) -> Result<Vec<ValidationResult>> {
    let raws: Vec<RawValidationResult> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT rule_key, severity, outcome, message, file_name
             FROM validation_results
            WHERE participant_id = ?1
            ORDER BY position",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![participant_id], |row| {
            Ok(RawValidationResult {
              rule_key:  row.get(0)?,
              severity:  row.get(1)?,
              outcome:   row.get(2)?,
              message:   row.get(3)?,
              file_name: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawValidationResult::into_result).collect()
  }
}
