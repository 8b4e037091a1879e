//! In-process run-state fan-out on a tokio broadcast channel.

use futures::{Stream, StreamExt as _};
use marathon_core::progress::{RunStateEvent, RunStateNotifier};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

/// Publishes every event on one broadcast channel; subscribers filter by
/// channel name. Events published while nobody listens are dropped.
#[derive(Clone)]
pub struct BroadcastNotifier {
  tx: broadcast::Sender<RunStateEvent>,
}

impl BroadcastNotifier {
  /// `capacity` events are buffered per subscriber before it starts lagging.
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity.max(1));
    Self { tx }
  }

  pub fn subscriber_count(&self) -> usize { self.tx.receiver_count() }

  /// Events published on `channel` from now on. A lagging subscriber skips
  /// the events it missed.
  pub fn subscribe<C: Into<String>>(
    &self,
    channel: C,
  ) -> impl Stream<Item = RunStateEvent> + Send + 'static + use<C> {
    let channel = channel.into();
    BroadcastStream::new(self.tx.subscribe()).filter_map(move |result| {
      let event = match result {
        Ok(event) if event.channel == channel => Some(event),
        Ok(_) => None,
        Err(e) => {
          warn!(channel = %channel, error = %e, "run-state subscriber lagged");
          None
        }
      };
      futures::future::ready(event)
    })
  }
}

impl RunStateNotifier for BroadcastNotifier {
  fn publish(&self, event: RunStateEvent) {
    if self.tx.send(event).is_err() {
      debug!("run-state event dropped, no subscribers");
    }
  }
}

#[cfg(test)]
mod tests {
  use futures::StreamExt;
  use marathon_core::{
    participant::ParticipantKey,
    progress::{RunProgress, RunTask, StepStatus},
  };

  use super::*;

  #[tokio::test]
  async fn subscribers_only_see_their_channel() {
    let notifier = BroadcastNotifier::new(16);
    let spring = ParticipantKey::new("spring", "p-001");
    let other = ParticipantKey::new("spring", "p-002");

    let finalize = RunProgress::new(&notifier, &spring, RunTask::Finalize);
    let mut stream = Box::pin(notifier.subscribe(finalize.channel().to_owned()));

    RunProgress::new(&notifier, &other, RunTask::Finalize).running("read-slot-states");
    RunProgress::new(&notifier, &spring, RunTask::Validate).running("evaluate-rules");
    finalize.running("read-participant-state");
    finalize.success("read-participant-state");

    let first = stream.next().await.unwrap();
    let second = stream.next().await.unwrap();
    assert_eq!(first.step, "read-participant-state");
    assert_eq!(first.status, StepStatus::Running);
    assert_eq!(second.status, StepStatus::Success);
    assert_eq!(first.channel, "run-state:spring:p-001:finalize");
  }

  #[test]
  fn publishing_without_subscribers_is_fine() {
    let notifier = BroadcastNotifier::new(4);
    let key = ParticipantKey::new("spring", "p-001");
    RunProgress::new(&notifier, &key, RunTask::Finalize).pending("write-records");
    assert_eq!(notifier.subscriber_count(), 0);
  }
}
