//! One module per rule. Each params type is also the rule itself: it
//! implements [`Rule`] over the participant's full input set.

mod allowed_file_types;
mod max_file_size;
mod no_modification;
mod same_device;
mod timestamp_ordering;
mod within_timerange;

pub use allowed_file_types::AllowedFileTypes;
pub use max_file_size::MaxFileSize;
pub use no_modification::{NoModification, EDITOR_TAGS, KNOWN_EDITORS};
pub use same_device::SameDevice;
pub use timestamp_ordering::StrictTimestampOrdering;
pub use within_timerange::WithinTimerange;

use marathon_core::rule::Outcome;

use crate::input::ValidationInput;

/// A single evaluated check, before the engine attaches rule key and
/// severity.
#[derive(Debug, Clone, PartialEq)]
pub struct Check {
  pub file_name: Option<String>,
  pub outcome:   Outcome,
  pub message:   String,
}

impl Check {
  pub fn file(input: &ValidationInput, passed: bool, message: impl Into<String>) -> Self {
    Self {
      file_name: Some(input.file_name.clone()),
      outcome:   outcome(passed),
      message:   message.into(),
    }
  }

  pub fn participant(passed: bool, message: impl Into<String>) -> Self {
    Self { file_name: None, outcome: outcome(passed), message: message.into() }
  }
}

fn outcome(passed: bool) -> Outcome {
  if passed { Outcome::Passed } else { Outcome::Failed }
}

/// A validation rule. `inputs` are ordered by order index.
pub trait Rule {
  fn evaluate(&self, inputs: &[&ValidationInput]) -> Vec<Check>;
}
