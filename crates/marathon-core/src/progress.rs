//! Run-state progress events.
//!
//! Long-running tasks publish ordered step-status events on a named channel
//! per participant and task, so an observer can render live status. Delivery
//! is best-effort and never affects the outcome of the task.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::participant::ParticipantKey;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunTask {
  Finalize,
  Validate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StepStatus {
  Pending,
  Running,
  Success,
  Error,
}

/// Name of the channel carrying `task` events for one participant.
pub fn channel_name(key: &ParticipantKey, task: RunTask) -> String {
  format!("run-state:{}:{}:{}", key.domain, key.reference, task)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStateEvent {
  pub id:      Uuid,
  pub channel: String,
  pub step:    String,
  pub status:  StepStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  pub at:      DateTime<Utc>,
}

// ─── Notifier ────────────────────────────────────────────────────────────────

/// Sink for run-state events. Publishing is synchronous and infallible;
/// implementations drop events they cannot deliver.
pub trait RunStateNotifier: Send + Sync {
  fn publish(&self, event: RunStateEvent);
}

impl<T: RunStateNotifier + ?Sized> RunStateNotifier for Arc<T> {
  fn publish(&self, event: RunStateEvent) { (**self).publish(event) }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl RunStateNotifier for NoopNotifier {
  fn publish(&self, _event: RunStateEvent) {}
}

/// A notifier bound to one participant's channel for one task.
pub struct RunProgress<'a, N: ?Sized> {
  notifier: &'a N,
  channel:  String,
}

impl<'a, N: RunStateNotifier + ?Sized> RunProgress<'a, N> {
  pub fn new(notifier: &'a N, key: &ParticipantKey, task: RunTask) -> Self {
    Self { notifier, channel: channel_name(key, task) }
  }

  pub fn channel(&self) -> &str { &self.channel }

  pub fn pending(&self, step: &str) { self.emit(step, StepStatus::Pending, None) }

  pub fn running(&self, step: &str) { self.emit(step, StepStatus::Running, None) }

  pub fn success(&self, step: &str) { self.emit(step, StepStatus::Success, None) }

  pub fn error(&self, step: &str, message: impl Into<String>) {
    self.emit(step, StepStatus::Error, Some(message.into()))
  }

  fn emit(&self, step: &str, status: StepStatus, message: Option<String>) {
    self.notifier.publish(RunStateEvent {
      id: Uuid::new_v4(),
      channel: self.channel.clone(),
      step: step.to_owned(),
      status,
      message,
      at: Utc::now(),
    });
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;

  #[derive(Default)]
  struct Recorder(Mutex<Vec<RunStateEvent>>);

  impl RunStateNotifier for Recorder {
    fn publish(&self, event: RunStateEvent) { self.0.lock().unwrap().push(event); }
  }

  #[test]
  fn channel_is_per_participant_and_task() {
    let key = ParticipantKey::new("spring", "p-001");
    assert_eq!(channel_name(&key, RunTask::Finalize), "run-state:spring:p-001:finalize");
    assert_eq!(channel_name(&key, RunTask::Validate), "run-state:spring:p-001:validate");
  }

  #[test]
  fn progress_emits_ordered_steps_on_its_channel() {
    let recorder = Recorder::default();
    let key = ParticipantKey::new("spring", "p-001");
    let progress = RunProgress::new(&recorder, &key, RunTask::Finalize);

    progress.pending("read-participant-state");
    progress.running("read-participant-state");
    progress.error("read-participant-state", "boom");

    let events = recorder.0.lock().unwrap();
    let statuses: Vec<_> = events.iter().map(|e| e.status).collect();
    assert_eq!(statuses, [StepStatus::Pending, StepStatus::Running, StepStatus::Error]);
    assert!(events.iter().all(|e| e.channel == "run-state:spring:p-001:finalize"));
    assert_eq!(events[2].message.as_deref(), Some("boom"));
  }
}
