use serde::{Deserialize, Serialize};

use super::{Check, Rule};
use crate::input::ValidationInput;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MaxFileSize {
  pub max_bytes: u64,
}

impl MaxFileSize {
  pub(crate) fn validate(&self) -> Result<(), String> {
    if self.max_bytes == 0 {
      return Err("maxBytes must be greater than zero".into());
    }
    Ok(())
  }
}

impl Rule for MaxFileSize {
  fn evaluate(&self, inputs: &[&ValidationInput]) -> Vec<Check> {
    inputs
      .iter()
      .map(|input| {
        if input.file_size <= self.max_bytes {
          Check::file(input, true, format!("File size {} bytes is within the limit", input.file_size))
        } else {
          Check::file(
            input,
            false,
            format!(
              "File size {} bytes exceeds the limit of {} bytes",
              input.file_size, self.max_bytes
            ),
          )
        }
      })
      .collect()
  }
}
