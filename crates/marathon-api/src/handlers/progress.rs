//! `GET /progress/:domain/:reference/:task`: live run-state events as SSE.
//!
//! Each event is sent with the step status as its SSE event name and the
//! serialized [`RunStateEvent`] as data. Only events published after the
//! client connects are delivered.
//!
//! [`RunStateEvent`]: marathon_core::progress::RunStateEvent

use std::{convert::Infallible, time::Duration};

use axum::{
  extract::{Path, State},
  response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use marathon_core::{
  participant::ParticipantKey,
  progress::{RunTask, channel_name},
};
use tracing::{debug, warn};

use crate::{AppState, MarathonStore};

pub async fn stream<S: MarathonStore>(
  State(state): State<AppState<S>>,
  Path((domain, reference, task)): Path<(String, String, RunTask)>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
  let channel = channel_name(&ParticipantKey::new(domain, reference), task);
  debug!(channel = %channel, "progress subscriber connected");

  let events = state.notifier.subscribe(channel).filter_map(|event| async move {
    match Event::default()
      .id(event.id.to_string())
      .event(event.status.as_ref())
      .json_data(&event)
    {
      Ok(sse) => Some(Ok(sse)),
      Err(e) => {
        warn!(error = %e, "failed to serialize run-state event");
        None
      }
    }
  });

  Sse::new(events).keep_alive(
    KeepAlive::new()
      .interval(Duration::from_secs(15))
      .text("keep-alive"),
  )
}
