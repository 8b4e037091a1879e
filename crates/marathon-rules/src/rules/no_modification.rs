use marathon_core::exif::ExifData;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Check, Rule};
use crate::input::ValidationInput;

/// Tags an editor writes its name into.
pub const EDITOR_TAGS: &[&str] =
  &["Software", "ProcessingSoftware", "CreatorTool", "HistorySoftwareAgent"];

/// Editor names matched case-insensitively as substrings.
pub const KNOWN_EDITORS: &[&str] = &[
  "photoshop",
  "lightroom",
  "gimp",
  "snapseed",
  "affinity photo",
  "capture one",
  "darktable",
  "rawtherapee",
  "luminar",
  "pixelmator",
  "vsco",
  "facetune",
  "picsart",
  "dxo photolab",
  "on1 photo raw",
];

/// Photos must not carry the signature of a known photo editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NoModification {
  /// Extra editor names on top of [`KNOWN_EDITORS`].
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub blocked_software: Vec<String>,
}

/// Every string stored under `tag`, including inside arrays.
fn tag_strings<'a>(exif: &'a ExifData, tag: &str) -> Vec<&'a str> {
  match exif.get(tag) {
    Some(Value::String(s)) => vec![s.as_str()],
    Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
    _ => Vec::new(),
  }
}

impl NoModification {
  fn blocked_names(&self) -> impl Iterator<Item = String> + '_ {
    KNOWN_EDITORS
      .iter()
      .map(|s| (*s).to_owned())
      .chain(
        self
          .blocked_software
          .iter()
          .map(|s| s.trim().to_lowercase())
          .filter(|s| !s.is_empty()),
      )
  }

  /// The first `(tag, value)` naming a blocked editor.
  fn editor_signature<'a>(&self, exif: &'a ExifData) -> Option<(&'static str, &'a str)> {
    EDITOR_TAGS.iter().find_map(|tag| {
      tag_strings(exif, tag).into_iter().find_map(|value| {
        let lower = value.to_lowercase();
        self
          .blocked_names()
          .any(|name| lower.contains(&name))
          .then_some((*tag, value))
      })
    })
  }
}

impl Rule for NoModification {
  fn evaluate(&self, inputs: &[&ValidationInput]) -> Vec<Check> {
    inputs
      .iter()
      .map(|input| match self.editor_signature(&input.exif) {
        Some((tag, software)) => {
          Check::file(input, false, format!("Edited with {software} (found in {tag})"))
        }
        None => Check::file(input, true, "No editing software detected"),
      })
      .collect()
  }
}
