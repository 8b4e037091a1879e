//! [`SlotStore`] impl for [`SqliteStore`].
//!
//! Every write is a single upsert (or a single transaction) so pipelines that
//! report the same slot concurrently never lose each other's flags.

use std::collections::BTreeSet;

use rusqlite::OptionalExtension as _;

use marathon_core::{
  exif::ExifData,
  participant::{ParticipantKey, SlotKey},
  slot::{ExifSlotState, ParticipantUploadState, SlotStore, SubmissionSlotState},
};

use crate::{
  encode::{decode_exif, encode_exif, RawParticipantState},
  store::SqliteStore,
  Error, Result,
};

/// What `set_uploaded` found when it tried to flag the slot.
enum Flagged {
  Done,
  MissingState,
  OutOfRange(usize),
}

impl SqliteStore {
  /// Upsert one column of a slot-state row.
  async fn upsert_slot_column(
    &self,
    slot: &SlotKey,
    column: &'static str,
    value: rusqlite::types::Value,
  ) -> Result<()> {
    let domain = slot.domain.clone();
    let reference = slot.reference.clone();
    let order_index = slot.order_index as i64;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO slot_states (domain, reference, order_index, {column})
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (domain, reference, order_index) DO UPDATE SET
               {column} = excluded.{column}"
          ),
          rusqlite::params![domain, reference, order_index, value],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

impl SlotStore for SqliteStore {
  type Error = Error;

  async fn init_participant_state<'a>(
    &'a self,
    key: &'a ParticipantKey,
    expected: usize,
  ) -> Result<ParticipantUploadState> {
    let domain = key.domain.clone();
    let reference = key.reference.clone();

    let processed_indexes: Vec<u8> = {
      let (domain, reference) = (domain.clone(), reference.clone());
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;

          let existing: Option<String> = tx
            .query_row(
              "SELECT processed_indexes FROM participant_states
                WHERE domain = ?1 AND reference = ?2",
              rusqlite::params![domain, reference],
              |row| row.get(0),
            )
            .optional()?;

          let mut indexes: Vec<u8> = match existing {
            Some(json) => serde_json::from_str(&json)
              .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?,
            None => Vec::new(),
          };
          indexes.resize(expected, 0);
          let encoded =
            serde_json::to_string(&indexes).map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;

          tx.execute(
            "INSERT INTO participant_states (domain, reference, processed_indexes)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (domain, reference) DO UPDATE SET
               processed_indexes = excluded.processed_indexes",
            rusqlite::params![domain, reference, encoded],
          )?;
          tx.commit()?;
          Ok(indexes)
        })
        .await?
    };

    Ok(ParticipantUploadState { domain, reference, processed_indexes })
  }

  async fn set_uploaded<'a>(&'a self, slot: &'a SlotKey) -> Result<()> {
    let domain = slot.domain.clone();
    let reference = slot.reference.clone();
    let order_index = slot.order_index as i64;

    // The flag and the slot row are written in one transaction; the flag is
    // set in place with json_set so concurrent uploads never race.
    let flagged = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let len: Option<i64> = tx
          .query_row(
            "SELECT json_array_length(processed_indexes) FROM participant_states
              WHERE domain = ?1 AND reference = ?2",
            rusqlite::params![domain, reference],
            |row| row.get(0),
          )
          .optional()?;
        let Some(len) = len else {
          return Ok(Flagged::MissingState);
        };
        if order_index >= len {
          return Ok(Flagged::OutOfRange(len as usize));
        }

        tx.execute(
          "UPDATE participant_states
              SET processed_indexes = json_set(processed_indexes, '$[' || ?3 || ']', 1)
            WHERE domain = ?1 AND reference = ?2",
          rusqlite::params![domain, reference, order_index],
        )?;
        tx.execute(
          "INSERT INTO slot_states (domain, reference, order_index, uploaded)
           VALUES (?1, ?2, ?3, 1)
           ON CONFLICT (domain, reference, order_index) DO UPDATE SET uploaded = 1",
          rusqlite::params![domain, reference, order_index],
        )?;

        tx.commit()?;
        Ok(Flagged::Done)
      })
      .await?;

    match flagged {
      Flagged::Done => Ok(()),
      Flagged::MissingState => {
        Err(marathon_core::Error::ParticipantStateNotFound(slot.participant().to_string()).into())
      }
      Flagged::OutOfRange(len) => {
        Err(marathon_core::Error::IndexOutOfRange { index: slot.order_index, len }.into())
      }
    }
  }

  async fn set_thumbnail<'a>(&'a self, slot: &'a SlotKey, thumbnail_key: &'a str) -> Result<()> {
    self
      .upsert_slot_column(slot, "thumbnail_key", thumbnail_key.to_owned().into())
      .await
  }

  async fn set_exif_processed<'a>(&'a self, slot: &'a SlotKey) -> Result<()> {
    self
      .upsert_slot_column(slot, "exif_processed", rusqlite::types::Value::Integer(1))
      .await
  }

  async fn set_exif<'a>(&'a self, slot: &'a SlotKey, exif: &'a ExifData) -> Result<()> {
    let domain = slot.domain.clone();
    let reference = slot.reference.clone();
    let order_index = slot.order_index as i64;
    let exif_json = encode_exif(exif)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO exif_states (domain, reference, order_index, exif_json)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (domain, reference, order_index) DO UPDATE SET
             exif_json = excluded.exif_json",
          rusqlite::params![domain, reference, order_index, exif_json],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_participant_state<'a>(
    &'a self,
    key: &'a ParticipantKey,
  ) -> Result<Option<ParticipantUploadState>> {
    let domain = key.domain.clone();
    let reference = key.reference.clone();

    let raw: Option<RawParticipantState> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT domain, reference, processed_indexes FROM participant_states
              WHERE domain = ?1 AND reference = ?2",
            rusqlite::params![domain, reference],
            |row| {
              Ok(RawParticipantState {
                domain:            row.get(0)?,
                reference:         row.get(1)?,
                processed_indexes: row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawParticipantState::into_state).transpose()
  }

  async fn get_all_submission_states<'a>(
    &'a self,
    key: &'a ParticipantKey,
    indexes: &'a [u32],
  ) -> Result<Vec<SubmissionSlotState>> {
    let domain = key.domain.clone();
    let reference = key.reference.clone();
    let wanted: BTreeSet<u32> = indexes.iter().copied().collect();

    let rows: Vec<(i64, bool, Option<String>, bool)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT order_index, uploaded, thumbnail_key, exif_processed FROM slot_states
            WHERE domain = ?1 AND reference = ?2
            ORDER BY order_index",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![domain, reference], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .filter(|(index, ..)| wanted.contains(&(*index as u32)))
        .map(|(index, uploaded, thumbnail_key, exif_processed)| SubmissionSlotState {
          order_index: index as u32,
          uploaded,
          thumbnail_key,
          exif_processed,
        })
        .collect(),
    )
  }

  async fn get_all_exif_states<'a>(
    &'a self,
    key: &'a ParticipantKey,
    indexes: &'a [u32],
  ) -> Result<Vec<ExifSlotState>> {
    let domain = key.domain.clone();
    let reference = key.reference.clone();
    let wanted: BTreeSet<u32> = indexes.iter().copied().collect();

    let rows: Vec<(i64, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT order_index, exif_json FROM exif_states
            WHERE domain = ?1 AND reference = ?2
            ORDER BY order_index",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![domain, reference], |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .filter(|(index, _)| wanted.contains(&(*index as u32)))
      .map(|(index, exif_json)| {
        Ok(ExifSlotState { order_index: index as u32, exif: decode_exif(&exif_json)? })
      })
      .collect()
  }
}
