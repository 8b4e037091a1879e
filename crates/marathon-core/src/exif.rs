//! EXIF payload sanitization and capture-time parsing.
//!
//! The metadata-extraction pipeline hands over whatever the extractor
//! produced. Before it is stored the payload is reduced to plain JSON:
//!
//! - binary blobs (maker notes, embedded thumbnails, long byte arrays) are
//!   dropped;
//! - control characters are stripped from strings and the result trimmed;
//! - date/time tags are rewritten to one canonical text form,
//!   `YYYY-MM-DDTHH:MM:SS[.fff][±HH:MM]`;
//! - `null` values are dropped.
//!
//! Nested objects and short arrays are sanitized recursively.

use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Arbitrary key-value metadata extracted from a photo.
pub type ExifData = Map<String, Value>;

/// Tags that carry raw bytes rather than metadata.
const BINARY_TAGS: &[&str] = &[
  "MakerNote",
  "ThumbnailImage",
  "PreviewImage",
  "JpgFromRaw",
  "PrintIM",
  "ICC_Profile",
  "ApplicationNotes",
];

/// Numeric arrays longer than this are treated as byte buffers.
const MAX_NUMERIC_ARRAY: usize = 64;

/// Naive formats accepted for date/time values, most specific first.
const NAIVE_FORMATS: &[&str] = &[
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y:%m:%d %H:%M:%S%.f",
  "%Y-%m-%d %H:%M:%S%.f",
];

/// Offset-carrying formats accepted besides RFC 3339.
const OFFSET_FORMATS: &[&str] = &["%Y:%m:%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];

/// Sanitize a raw extractor payload. Fails only if `raw` is not an object.
pub fn sanitize(raw: &Value) -> Result<ExifData> {
  match raw {
    Value::Object(map) => Ok(sanitize_map(map)),
    _ => Err(Error::ExifNotAnObject),
  }
}

fn sanitize_map(map: &Map<String, Value>) -> ExifData {
  map
    .iter()
    .filter(|(k, _)| !BINARY_TAGS.contains(&k.as_str()))
    .filter_map(|(k, v)| sanitize_value(k, v).map(|v| (k.clone(), v)))
    .collect()
}

fn sanitize_value(key: &str, value: &Value) -> Option<Value> {
  match value {
    Value::Null => None,
    Value::Bool(_) | Value::Number(_) => Some(value.clone()),
    Value::String(s) => {
      let cleaned: String = s.chars().filter(|c| !c.is_control()).collect();
      let cleaned = cleaned.trim();
      if is_date_tag(key)
        && let Some(canonical) = normalize_datetime(cleaned)
      {
        return Some(Value::String(canonical));
      }
      Some(Value::String(cleaned.to_owned()))
    }
    Value::Array(items) => {
      if items.len() > MAX_NUMERIC_ARRAY && items.iter().all(Value::is_number) {
        return None;
      }
      Some(Value::Array(
        items.iter().filter_map(|item| sanitize_value(key, item)).collect(),
      ))
    }
    Value::Object(map) => Some(Value::Object(sanitize_map(map))),
  }
}

fn is_date_tag(key: &str) -> bool { key.contains("Date") || key.ends_with("Time") }

/// Rewrite a recognised date/time string into the canonical form. Returns
/// `None` for anything that does not parse.
pub fn normalize_datetime(s: &str) -> Option<String> {
  if let Some(dt) = parse_with_offset(s) {
    return Some(dt.format("%Y-%m-%dT%H:%M:%S%.f%:z").to_string());
  }
  parse_naive(s).map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

/// Parse any accepted date/time form into wall-clock time. Offsets are
/// dropped: capture times are compared as the camera recorded them.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
  let s = s.trim();
  parse_with_offset(s)
    .map(|dt| dt.naive_local())
    .or_else(|| parse_naive(s))
}

fn parse_with_offset(s: &str) -> Option<DateTime<chrono::FixedOffset>> {
  DateTime::parse_from_rfc3339(s).ok().or_else(|| {
    OFFSET_FORMATS
      .iter()
      .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
  })
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
  NAIVE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Tags consulted for the capture time, in priority order.
pub const CAPTURE_TIME_TAGS: &[&str] = &["DateTimeOriginal", "CreateDate", "DateTime"];

/// The photo's capture time, if any capture-time tag holds a parseable value.
pub fn capture_time(exif: &ExifData) -> Option<NaiveDateTime> {
  CAPTURE_TIME_TAGS
    .iter()
    .filter_map(|tag| exif.get(*tag).and_then(Value::as_str))
    .find_map(parse_datetime)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn non_object_payload_is_rejected() {
    assert!(matches!(sanitize(&json!([1, 2])), Err(Error::ExifNotAnObject)));
  }

  #[test]
  fn binary_tags_and_nulls_are_dropped() {
    let raw = json!({
      "Make": "FUJIFILM",
      "MakerNote": "\u{0}\u{1}garbage",
      "LensModel": null,
    });
    let clean = sanitize(&raw).unwrap();
    assert_eq!(clean.len(), 1);
    assert_eq!(clean["Make"], "FUJIFILM");
  }

  #[test]
  fn long_numeric_arrays_are_dropped() {
    let bytes: Vec<u8> = (0..200).map(|i| i as u8).collect();
    let raw = json!({ "Blob": bytes, "GPSVersionID": [2, 3, 0, 0] });
    let clean = sanitize(&raw).unwrap();
    assert!(!clean.contains_key("Blob"));
    assert_eq!(clean["GPSVersionID"], json!([2, 3, 0, 0]));
  }

  #[test]
  fn control_characters_are_stripped() {
    let raw = json!({ "Model": "X-T5\u{0}\u{0}\n" });
    assert_eq!(sanitize(&raw).unwrap()["Model"], "X-T5");
  }

  #[test]
  fn exif_dates_are_canonicalised() {
    let raw = json!({
      "DateTimeOriginal": "2024:05:18 10:00:00",
      "OffsetTime": "+02:00",
      "CreateDate": "2024:05:18 10:00:00+02:00",
      "ModifyDate": "not a date",
    });
    let clean = sanitize(&raw).unwrap();
    assert_eq!(clean["DateTimeOriginal"], "2024-05-18T10:00:00");
    assert_eq!(clean["CreateDate"], "2024-05-18T10:00:00+02:00");
    assert_eq!(clean["ModifyDate"], "not a date");
    assert_eq!(clean["OffsetTime"], "+02:00");
  }

  #[test]
  fn nested_objects_are_sanitized() {
    let raw = json!({ "GPS": { "GPSLatitude": 59.3, "GPSDateStamp": "2024:05:18 00:00:00", "x": null } });
    let clean = sanitize(&raw).unwrap();
    assert_eq!(clean["GPS"], json!({ "GPSLatitude": 59.3, "GPSDateStamp": "2024-05-18T00:00:00" }));
  }

  #[test]
  fn capture_time_prefers_original() {
    let exif = sanitize(&json!({
      "DateTime": "2024:05:18 12:00:00",
      "DateTimeOriginal": "2024:05:18 09:30:00",
    }))
    .unwrap();
    let t = capture_time(&exif).unwrap();
    assert_eq!(t.format("%H:%M").to_string(), "09:30");
  }

  #[test]
  fn capture_time_falls_through_unparseable_tags() {
    let exif = sanitize(&json!({
      "DateTimeOriginal": "garbage",
      "CreateDate": "2024-05-18T08:00:00Z",
    }))
    .unwrap();
    let t = capture_time(&exif).unwrap();
    assert_eq!(t.format("%H:%M").to_string(), "08:00");
  }

  #[test]
  fn capture_time_absent() {
    assert!(capture_time(&ExifData::new()).is_none());
  }
}
