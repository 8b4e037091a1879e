use marathon_core::exif::capture_time;
use serde::{Deserialize, Serialize};

use super::{Check, Rule};
use crate::input::ValidationInput;

/// Photos must have been taken in topic order. Photos without a readable
/// capture time are left out of the comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrictTimestampOrdering {}

impl Rule for StrictTimestampOrdering {
  fn evaluate(&self, inputs: &[&ValidationInput]) -> Vec<Check> {
    let timed: Vec<_> = inputs
      .iter()
      .filter_map(|input| capture_time(&input.exif).map(|at| (*input, at)))
      .collect();

    let out_of_order: Vec<String> = timed
      .windows(2)
      .filter(|pair| pair[1].1 < pair[0].1)
      .map(|pair| format!("{} was taken before {}", pair[1].0.file_name, pair[0].0.file_name))
      .collect();

    let check = if out_of_order.is_empty() {
      Check::participant(true, "Capture times follow the topic order")
    } else {
      Check::participant(
        false,
        format!("Photos are out of topic order: {}", out_of_order.join("; ")),
      )
    };
    vec![check]
  }
}
