use serde::{Deserialize, Serialize};

use super::{Check, Rule};
use crate::input::{normalize_file_type, ValidationInput};

/// Every file's type must be on the allow-list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AllowedFileTypes {
  pub allowed_file_types: Vec<String>,
}

impl AllowedFileTypes {
  pub(crate) fn validate(&self) -> Result<(), String> {
    if self.allowed_file_types.iter().all(|t| t.trim().is_empty()) {
      return Err("allowedFileTypes must not be empty".into());
    }
    Ok(())
  }

  fn allows(&self, file_type: &str) -> bool {
    self
      .allowed_file_types
      .iter()
      .any(|allowed| normalize_file_type(allowed) == file_type)
  }
}

impl Rule for AllowedFileTypes {
  fn evaluate(&self, inputs: &[&ValidationInput]) -> Vec<Check> {
    inputs
      .iter()
      .map(|input| match input.file_type() {
        Some(file_type) if self.allows(&file_type) => {
          Check::file(input, true, format!("File type {file_type} is allowed"))
        }
        Some(file_type) => Check::file(
          input,
          false,
          format!(
            "File type {file_type} is not allowed (allowed: {})",
            self.allowed_file_types.join(", ")
          ),
        ),
        None => Check::file(input, false, "File type could not be determined"),
      })
      .collect()
  }
}
