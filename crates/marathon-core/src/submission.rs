//! Durable submission records and the updates finalize applies to them.

use serde::{Deserialize, Serialize};

use crate::{exif::ExifData, lifecycle::SubmissionStatus};

/// One photo of one participant, tied to a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
  pub id:             i64,
  pub participant_id: i64,
  pub topic_id:       i64,
  /// Copied from the topic; the slot this submission reconciles with.
  pub order_index:    u32,
  pub status:         SubmissionStatus,
  /// Object-storage key of the original upload.
  pub key:            Option<String>,
  pub thumbnail_key:  Option<String>,
  pub preview_key:    Option<String>,
  pub exif:           ExifData,
  pub size:           Option<u64>,
  pub mime_type:      Option<String>,
  pub uploaded:       bool,
}

impl Submission {
  /// The last path segment of the object key.
  pub fn file_name(&self) -> Option<&str> {
    self
      .key
      .as_deref()
      .and_then(|k| k.rsplit('/').next())
      .filter(|name| !name.is_empty())
  }
}

/// Object metadata reported by the upload pipeline when a raw upload lands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedObject {
  pub key:         String,
  pub preview_key: Option<String>,
  pub size:        u64,
  pub mime_type:   String,
}

/// The per-slot merge result applied by finalize, addressed by order index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionUpdate {
  pub order_index:   u32,
  pub status:        SubmissionStatus,
  pub thumbnail_key: Option<String>,
  pub exif:          ExifData,
  pub uploaded:      bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn submission(key: Option<&str>) -> Submission {
    Submission {
      id:             1,
      participant_id: 1,
      topic_id:       1,
      order_index:    0,
      status:         SubmissionStatus::Initialized,
      key:            key.map(str::to_owned),
      thumbnail_key:  None,
      preview_key:    None,
      exif:           ExifData::new(),
      size:           None,
      mime_type:      None,
      uploaded:       false,
    }
  }

  #[test]
  fn file_name_is_last_key_segment() {
    let s = submission(Some("spring/p-001/0/IMG_0042.JPG"));
    assert_eq!(s.file_name(), Some("IMG_0042.JPG"));
  }

  #[test]
  fn file_name_absent_without_key() {
    assert_eq!(submission(None).file_name(), None);
    assert_eq!(submission(Some("dir/")).file_name(), None);
  }
}
