//! Finalization and validation orchestration.
//!
//! [`FinalizationCoordinator`] turns the per-photo slot state written by the
//! upload, exif and thumbnail pipelines into durable submission and
//! participant records. [`ValidationService`] runs a marathon's rules over a
//! participant's uploaded photos and replaces the stored findings. Both
//! report step progress through a [`RunStateNotifier`].
//!
//! [`RunStateNotifier`]: marathon_core::progress::RunStateNotifier

pub mod error;
pub mod finalize;
pub mod notifier;
pub mod validate;

pub use error::{FinalizeError, ValidateError};
pub use finalize::{BatchReport, FinalizationCoordinator, FinalizedSignal, SignalOutcome};
pub use notifier::BroadcastNotifier;
pub use validate::ValidationService;
