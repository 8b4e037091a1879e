//! HTTP ingress for the photo marathon backend.
//!
//! Exposes an axum [`Router`] over any backend implementing both
//! [`SlotStore`] and [`RecordStore`]: pipeline completion callbacks write slot
//! state, finalize signals arrive in batches, validation runs on demand and
//! run-state progress streams out as server-sent events. Every route requires
//! HTTP Basic auth.

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  middleware,
  routing::{get, post, put},
};
use marathon_coordinator::{BroadcastNotifier, FinalizationCoordinator, ValidationService};
use marathon_core::{slot::SlotStore, store::RecordStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_auth};
use handlers::{marathons, progress, runs, slots};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `MARATHON_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  pub store_path:           PathBuf,
  pub auth_username:        String,
  pub auth_password_hash:   String,
  /// Finalize signals processed at once per batch.
  #[serde(default = "default_finalize_concurrency")]
  pub finalize_concurrency: usize,
  /// Run-state events buffered per progress subscriber.
  #[serde(default = "default_progress_buffer")]
  pub progress_buffer:      usize,
}

fn default_finalize_concurrency() -> usize { marathon_coordinator::finalize::DEFAULT_CONCURRENCY }

fn default_progress_buffer() -> usize { 128 }

// ─── Application state ────────────────────────────────────────────────────────

/// A backend serving both the per-photo slot state and the durable records.
pub trait MarathonStore: SlotStore + RecordStore + Clone + 'static {}

impl<T: SlotStore + RecordStore + Clone + 'static> MarathonStore for T {}

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:       Arc<S>,
  pub coordinator: Arc<FinalizationCoordinator<S, S, BroadcastNotifier>>,
  pub validator:   Arc<ValidationService<S, BroadcastNotifier>>,
  pub notifier:    BroadcastNotifier,
  pub auth:        Arc<AuthConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:       self.store.clone(),
      coordinator: self.coordinator.clone(),
      validator:   self.validator.clone(),
      notifier:    self.notifier.clone(),
      auth:        self.auth.clone(),
    }
  }
}

impl<S: MarathonStore> AppState<S> {
  /// Wire the coordinator and the validation service to `store`, publishing
  /// progress on one shared notifier.
  pub fn new(store: S, auth: AuthConfig, finalize_concurrency: usize, progress_buffer: usize) -> Self {
    let notifier = BroadcastNotifier::new(progress_buffer);
    let coordinator =
      FinalizationCoordinator::new(store.clone(), store.clone(), notifier.clone())
        .with_concurrency(finalize_concurrency);
    let validator = ValidationService::new(store.clone(), notifier.clone());
    Self {
      store: Arc::new(store),
      coordinator: Arc::new(coordinator),
      validator: Arc::new(validator),
      notifier,
      auth: Arc::new(auth),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S: MarathonStore>(state: AppState<S>) -> Router {
  let auth = state.auth.clone();
  Router::new()
    // Marathons and participants
    .route("/marathons", post(marathons::register_marathon::<S>))
    .route("/marathons/{domain}/participants", post(marathons::register_participant::<S>))
    .route(
      "/marathons/{domain}/participants/{reference}",
      get(marathons::get_participant::<S>),
    )
    .route("/marathons/{domain}/rules", post(marathons::save_rule::<S>))
    // Pipeline callbacks
    .route("/slots/{domain}/{reference}/{index}/upload", put(slots::upload::<S>))
    .route("/slots/{domain}/{reference}/{index}/thumbnail", put(slots::thumbnail::<S>))
    .route("/slots/{domain}/{reference}/{index}/exif", put(slots::exif::<S>))
    // Runs
    .route("/finalize", post(runs::finalize::<S>))
    .route(
      "/marathons/{domain}/participants/{reference}/validate",
      post(runs::validate::<S>),
    )
    .route(
      "/marathons/{domain}/participants/{reference}/validations",
      get(runs::validations::<S>),
    )
    // Progress
    .route("/progress/{domain}/{reference}/{task}", get(progress::stream::<S>))
    .route_layer(middleware::from_fn_with_state(auth, require_auth))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
