use chrono::NaiveDateTime;
use marathon_core::exif::{capture_time, parse_datetime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{Check, Rule};
use crate::input::ValidationInput;

/// Every photo must have been taken inside the contest window, inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WithinTimerange {
  #[serde(serialize_with = "ser_datetime", deserialize_with = "de_datetime")]
  pub start: NaiveDateTime,
  #[serde(serialize_with = "ser_datetime", deserialize_with = "de_datetime")]
  pub end:   NaiveDateTime,
}

fn ser_datetime<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
  s.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

fn de_datetime<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
  let raw = String::deserialize(d)?;
  parse_datetime(&raw)
    .ok_or_else(|| serde::de::Error::custom(format!("unrecognised date/time {raw:?}")))
}

impl WithinTimerange {
  pub(crate) fn validate(&self) -> Result<(), String> {
    if self.start > self.end {
      return Err(format!("start {} is after end {}", self.start, self.end));
    }
    Ok(())
  }
}

impl Rule for WithinTimerange {
  fn evaluate(&self, inputs: &[&ValidationInput]) -> Vec<Check> {
    inputs
      .iter()
      .map(|input| match capture_time(&input.exif) {
        None => Check::file(input, false, "No capture time found"),
        Some(at) if (self.start..=self.end).contains(&at) => {
          Check::file(input, true, format!("Taken at {at}, inside the contest window"))
        }
        Some(at) => Check::file(
          input,
          false,
          format!("Taken at {at}, outside the contest window {} to {}", self.start, self.end),
        ),
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use marathon_core::rule::Outcome;
  use serde_json::json;

  use super::*;

  fn window() -> WithinTimerange {
    serde_json::from_value(json!({
      "start": "2024-05-01T09:00:00",
      "end": "2024:05:01 18:00:00",
    }))
    .unwrap()
  }

  fn shot(exif: serde_json::Value) -> ValidationInput {
    ValidationInput {
      exif:        exif.as_object().cloned().unwrap_or_default(),
      file_name:   "a.jpg".into(),
      file_size:   1,
      order_index: 0,
      mime_type:   "image/jpeg".into(),
    }
  }

  #[test]
  fn bounds_are_inclusive() {
    let rule = window();
    let inside = shot(json!({ "CreateDate": "2024:05:01 18:00:00" }));
    let outside = shot(json!({ "DateTimeOriginal": "2024:05:01 18:00:01" }));

    let checks = rule.evaluate(&[&inside, &outside]);
    assert_eq!(checks[0].outcome, Outcome::Passed);
    assert_eq!(checks[1].outcome, Outcome::Failed);
  }

  #[test]
  fn missing_capture_time_fails() {
    let checks = window().evaluate(&[&shot(json!({ "Make": "Canon" }))]);
    assert_eq!(checks[0].outcome, Outcome::Failed);
    assert_eq!(checks[0].message, "No capture time found");
  }

  #[test]
  fn inverted_window_is_invalid() {
    let rule: WithinTimerange = serde_json::from_value(json!({
      "start": "2024-05-02T00:00:00",
      "end": "2024-05-01T00:00:00",
    }))
    .unwrap();
    assert!(rule.validate().is_err());
    assert!(serde_json::from_value::<WithinTimerange>(json!({ "start": "soon", "end": "later" })).is_err());
  }
}
