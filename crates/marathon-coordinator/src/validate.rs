//! Running a marathon's rules over one participant.

use marathon_core::{
  lifecycle::SubmissionStatus,
  participant::ParticipantKey,
  progress::{RunProgress, RunStateNotifier, RunTask},
  rule::ValidationResult,
  store::RecordStore,
};
use marathon_rules::{run_validations, RuleConfig, ValidationInput};
use tracing::info;

use crate::ValidateError;

pub const STEP_LOAD_SUBMISSIONS: &str = "load-submissions";
pub const STEP_EVALUATE_RULES: &str = "evaluate-rules";
pub const STEP_STORE_RESULTS: &str = "store-results";

const STEPS: [&str; 3] = [STEP_LOAD_SUBMISSIONS, STEP_EVALUATE_RULES, STEP_STORE_RESULTS];

pub struct ValidationService<R, N> {
  records:  R,
  notifier: N,
}

impl<R, N> ValidationService<R, N>
where
  R: RecordStore,
  N: RunStateNotifier,
{
  pub fn new(records: R, notifier: N) -> Self { Self { records, notifier } }

  /// Evaluate the marathon's enabled rules against the participant's
  /// uploaded submissions and replace every stored finding with the result.
  /// Slots whose raw file never landed are skipped.
  ///
  /// A malformed rule configuration or submission fails the run before
  /// anything is stored, leaving the previous findings in place.
  pub async fn validate_participant(
    &self,
    key: &ParticipantKey,
  ) -> Result<Vec<ValidationResult>, ValidateError> {
    let progress = RunProgress::new(&self.notifier, key, RunTask::Validate);
    for step in STEPS {
      progress.pending(step);
    }
    let fail = |step: &str, err: ValidateError| {
      progress.error(step, err.to_string());
      err
    };
    let read = |e: R::Error| ValidateError::Read { key: key.clone(), source: e.into() };

    progress.running(STEP_LOAD_SUBMISSIONS);
    let participant = self
      .records
      .get_participant(key)
      .await
      .map_err(|e| fail(STEP_LOAD_SUBMISSIONS, read(e)))?
      .ok_or_else(|| fail(STEP_LOAD_SUBMISSIONS, ValidateError::MissingParticipant(key.clone())))?;

    let (records, submissions) = tokio::join!(
      self.records.enabled_rule_configs(&key.domain),
      self.records.submissions(participant.id),
    );
    let records = records.map_err(|e| fail(STEP_LOAD_SUBMISSIONS, read(e)))?;
    let submissions = submissions.map_err(|e| fail(STEP_LOAD_SUBMISSIONS, read(e)))?;
    progress.success(STEP_LOAD_SUBMISSIONS);

    progress.running(STEP_EVALUATE_RULES);
    let configs = records
      .iter()
      .map(RuleConfig::from_record)
      .collect::<Result<Vec<_>, _>>()
      .map_err(|e| fail(STEP_EVALUATE_RULES, e.into()))?;
    let inputs = submissions
      .iter()
      .filter(|s| s.status == SubmissionStatus::Uploaded && s.uploaded)
      .map(ValidationInput::from_submission)
      .collect::<Result<Vec<_>, _>>()
      .map_err(|e| fail(STEP_EVALUATE_RULES, e.into()))?;
    let results =
      run_validations(&configs, &inputs).map_err(|e| fail(STEP_EVALUATE_RULES, e.into()))?;
    progress.success(STEP_EVALUATE_RULES);

    progress.running(STEP_STORE_RESULTS);
    self
      .records
      .replace_validation_results(participant.id, results.clone())
      .await
      .map_err(|e| {
        fail(STEP_STORE_RESULTS, ValidateError::WriteFailed { key: key.clone(), source: e.into() })
      })?;
    progress.success(STEP_STORE_RESULTS);

    info!(
      domain = %key.domain,
      reference = %key.reference,
      participant_id = participant.id,
      rules = configs.len(),
      photos = inputs.len(),
      failed = results.iter().filter(|r| r.is_failed()).count(),
      "participant validated"
    );
    Ok(results)
  }
}
