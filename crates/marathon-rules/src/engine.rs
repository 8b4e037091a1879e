//! Building rule configurations and running them over a participant's photos.

use marathon_core::rule::{RuleConfigRecord, RuleKey, Severity, ValidationResult};
use tracing::debug;

use crate::{input::ValidationInput, params::RuleParams, Result};

/// A checked rule configuration, ready to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleConfig {
  pub severity: Severity,
  pub params:   RuleParams,
}

impl RuleConfig {
  pub fn key(&self) -> RuleKey { self.params.key() }

  /// Check a persisted configuration. The `enabled` flag is not consulted.
  pub fn from_record(record: &RuleConfigRecord) -> Result<Self> {
    create_rule(record.rule_key, record.severity, &record.params)
  }

  pub fn to_record(&self, enabled: bool) -> RuleConfigRecord {
    RuleConfigRecord {
      rule_key: self.key(),
      severity: self.severity,
      params: self.params.to_json(),
      enabled,
    }
  }
}

/// Build a rule from its key, severity and raw params. Fails fast with
/// [`RuleError::InvalidParams`](crate::RuleError::InvalidParams).
pub fn create_rule(
  key: RuleKey,
  severity: Severity,
  params: &serde_json::Value,
) -> Result<RuleConfig> {
  Ok(RuleConfig { severity, params: RuleParams::from_parts(key, params)? })
}

/// Apply every rule, in order, to the full input set.
///
/// All inputs are checked before any rule runs; one malformed input fails the
/// whole run. File-scoped findings are ordered by order index; participant-wide
/// rules never name a file.
pub fn run_validations(
  configs: &[RuleConfig],
  inputs: &[ValidationInput],
) -> Result<Vec<ValidationResult>> {
  for input in inputs {
    input.validate()?;
  }

  let mut ordered: Vec<&ValidationInput> = inputs.iter().collect();
  ordered.sort_by_key(|input| input.order_index);

  let results: Vec<ValidationResult> = configs
    .iter()
    .flat_map(|config| {
      let key = config.key();
      config
        .params
        .rule()
        .evaluate(&ordered)
        .into_iter()
        .map(move |check| ValidationResult {
          rule_key:  key,
          severity:  config.severity,
          outcome:   check.outcome,
          message:   check.message,
          file_name: if key.is_participant_wide() { None } else { check.file_name },
        })
    })
    .collect();

  debug!(
    rules = configs.len(),
    inputs = inputs.len(),
    failed = results.iter().filter(|r| r.is_failed()).count(),
    "validation run finished"
  );
  Ok(results)
}
