//! Marathons, topics and participants: the durable identity records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lifecycle::ParticipantStatus;

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Identifies a participant across both stores: the marathon's domain plus the
/// participant's external-facing reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantKey {
  pub domain:    String,
  pub reference: String,
}

impl ParticipantKey {
  pub fn new(domain: impl Into<String>, reference: impl Into<String>) -> Self {
    Self { domain: domain.into(), reference: reference.into() }
  }

  pub fn slot(&self, order_index: u32) -> SlotKey {
    SlotKey {
      domain: self.domain.clone(),
      reference: self.reference.clone(),
      order_index,
    }
  }
}

impl fmt::Display for ParticipantKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.domain, self.reference)
  }
}

/// Identifies one photo slot: `(domain, reference, order_index)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotKey {
  pub domain:      String,
  pub reference:   String,
  pub order_index: u32,
}

impl SlotKey {
  pub fn participant(&self) -> ParticipantKey {
    ParticipantKey::new(self.domain.clone(), self.reference.clone())
  }
}

impl fmt::Display for SlotKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}#{}", self.domain, self.reference, self.order_index)
  }
}

// ─── Marathon ────────────────────────────────────────────────────────────────

/// One photo required of every participant, at a fixed position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
  pub id:          i64,
  pub order_index: u32,
  pub name:        String,
}

/// A contest instance, addressed by its unique subdomain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marathon {
  pub id:         i64,
  pub domain:     String,
  pub name:       String,
  /// Ordered by `order_index`; its length is the photo count per participant.
  pub topics:     Vec<Topic>,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::RecordStore::register_marathon`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMarathon {
  pub domain: String,
  pub name:   String,
  /// Topic names in order; position becomes the order index.
  pub topics: Vec<String>,
}

// ─── Participant ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
  pub id:           i64,
  pub marathon_id:  i64,
  pub domain:       String,
  pub reference:    String,
  pub status:       ParticipantStatus,
  /// Recomputed from slot state on every finalize, never incremented.
  pub upload_count: u32,
  pub created_at:   DateTime<Utc>,
}

impl Participant {
  pub fn key(&self) -> ParticipantKey { ParticipantKey::new(&self.domain, &self.reference) }
}

/// Input to [`crate::store::RecordStore::register_participant`]. One
/// `initialized` submission row is created per topic of the marathon.
#[derive(Debug, Clone, Deserialize)]
pub struct NewParticipant {
  pub domain:    String,
  pub reference: String,
}
