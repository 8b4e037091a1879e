use std::collections::BTreeSet;

use marathon_core::exif::ExifData;
use serde::{Deserialize, Serialize};

use super::{Check, Rule};
use crate::input::ValidationInput;

/// Every photo must carry the same `Make` and `Model`. A missing tag is a
/// value of its own, so an untagged photo next to a tagged one fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SameDevice {}

fn tag(exif: &ExifData, name: &str) -> Option<String> {
  exif
    .get(name)
    .and_then(|v| v.as_str())
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
}

type Device = (Option<String>, Option<String>);

fn device(exif: &ExifData) -> Device { (tag(exif, "Make"), tag(exif, "Model")) }

fn describe((make, model): &Device) -> String {
  format!(
    "{} {}",
    make.as_deref().unwrap_or("unknown make"),
    model.as_deref().unwrap_or("unknown model")
  )
}

impl Rule for SameDevice {
  fn evaluate(&self, inputs: &[&ValidationInput]) -> Vec<Check> {
    let devices: BTreeSet<_> = inputs.iter().map(|input| device(&input.exif)).collect();

    let check = if devices.len() <= 1 {
      Check::participant(true, "All photos were taken with the same device")
    } else {
      let names: Vec<_> = devices.iter().map(describe).collect();
      Check::participant(
        false,
        format!("Photos were taken with {} different devices: {}", devices.len(), names.join(", ")),
      )
    };
    vec![check]
  }
}
