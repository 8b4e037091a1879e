//! The per-photo input the rules evaluate.

use marathon_core::{exif::ExifData, submission::Submission};
use serde::{Deserialize, Serialize};

use crate::{Result, RuleError};

/// What the engine knows about one photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationInput {
  pub exif:        ExifData,
  pub file_name:   String,
  pub file_size:   u64,
  pub order_index: u32,
  pub mime_type:   String,
}

impl ValidationInput {
  /// Reduce a durable submission to its rule input. The upload must have
  /// landed: key, size and mime type are required.
  pub fn from_submission(submission: &Submission) -> Result<Self> {
    let missing = |field: &str| {
      RuleError::InvalidInput(format!(
        "submission #{} has no {field}",
        submission.order_index
      ))
    };

    Ok(Self {
      exif:        submission.exif.clone(),
      file_name:   submission.file_name().ok_or_else(|| missing("file name"))?.to_owned(),
      file_size:   submission.size.ok_or_else(|| missing("file size"))?,
      order_index: submission.order_index,
      mime_type:   submission.mime_type.clone().ok_or_else(|| missing("mime type"))?,
    })
  }

  pub fn validate(&self) -> Result<()> {
    if self.file_name.trim().is_empty() {
      return Err(RuleError::InvalidInput(format!(
        "input #{} has an empty file name",
        self.order_index
      )));
    }
    if self.mime_type.trim().is_empty() {
      return Err(RuleError::InvalidInput(format!(
        "{} has an empty mime type",
        self.file_name
      )));
    }
    Ok(())
  }

  /// Normalized file type: the extension of the file name, or the mime
  /// subtype when the name has none.
  pub fn file_type(&self) -> Option<String> {
    let from_name = self
      .file_name
      .rsplit_once('.')
      .map(|(_, ext)| ext)
      .filter(|ext| !ext.is_empty());

    let from_mime = || {
      self
        .mime_type
        .split_once('/')
        .map(|(_, subtype)| subtype.split('+').next().unwrap_or(subtype))
        .filter(|subtype| !subtype.is_empty())
    };

    from_name.or_else(from_mime).map(normalize_file_type)
  }
}

/// Lowercase, drop a leading dot and fold `jpeg` into `jpg`.
pub fn normalize_file_type(raw: &str) -> String {
  let lower = raw.trim().trim_start_matches('.').to_ascii_lowercase();
  match lower.as_str() {
    "jpeg" => "jpg".to_owned(),
    _ => lower,
  }
}

#[cfg(test)]
mod tests {
  use marathon_core::lifecycle::SubmissionStatus;

  use super::*;

  fn input(file_name: &str, mime_type: &str) -> ValidationInput {
    ValidationInput {
      exif:        ExifData::new(),
      file_name:   file_name.into(),
      file_size:   10,
      order_index: 0,
      mime_type:   mime_type.into(),
    }
  }

  #[test]
  fn file_type_prefers_extension_then_mime() {
    assert_eq!(input("IMG_1.JPEG", "image/png").file_type().as_deref(), Some("jpg"));
    assert_eq!(input("scan", "image/jpeg").file_type().as_deref(), Some("jpg"));
    assert_eq!(input("vector", "image/svg+xml").file_type().as_deref(), Some("svg"));
    assert_eq!(input("trailing.", "image/heic").file_type().as_deref(), Some("heic"));
  }

  #[test]
  fn validate_rejects_blank_fields() {
    assert!(input("a.jpg", "image/jpeg").validate().is_ok());
    assert!(matches!(input(" ", "image/jpeg").validate(), Err(RuleError::InvalidInput(_))));
    assert!(matches!(input("a.jpg", "").validate(), Err(RuleError::InvalidInput(_))));
  }

  #[test]
  fn exif_is_a_required_field() {
    let full = serde_json::json!({
      "exif": {},
      "fileName": "a.jpg",
      "fileSize": 10,
      "orderIndex": 0,
      "mimeType": "image/jpeg",
    });
    assert!(serde_json::from_value::<ValidationInput>(full.clone()).is_ok());

    let mut missing = full;
    missing.as_object_mut().unwrap().remove("exif");
    assert!(serde_json::from_value::<ValidationInput>(missing).is_err());
  }

  #[test]
  fn from_submission_requires_a_landed_upload() {
    let mut submission = Submission {
      id:             1,
      participant_id: 1,
      topic_id:       1,
      order_index:    2,
      status:         SubmissionStatus::Uploaded,
      key:            Some("spring/p-001/2/DSC_0001.NEF".into()),
      thumbnail_key:  None,
      preview_key:    None,
      exif:           ExifData::new(),
      size:           Some(2048),
      mime_type:      Some("image/x-nikon-nef".into()),
      uploaded:       true,
    };

    let input = ValidationInput::from_submission(&submission).unwrap();
    assert_eq!(input.file_name, "DSC_0001.NEF");
    assert_eq!(input.file_size, 2048);
    assert_eq!(input.order_index, 2);

    submission.size = None;
    let err = ValidationInput::from_submission(&submission).unwrap_err();
    assert!(err.to_string().contains("file size"));
  }
}
