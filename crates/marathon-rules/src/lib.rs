//! The validation rule engine.
//!
//! A marathon configures a set of rules, each with a severity and a params
//! payload. [`create_rule`] turns one configuration into a typed
//! [`RuleConfig`]; [`run_validations`] applies a set of them to every photo of
//! a participant and returns one finding per file (or one per participant for
//! participant-wide rules), passed findings included.

pub mod engine;
pub mod error;
pub mod input;
pub mod params;
pub mod rules;

pub use engine::{create_rule, run_validations, RuleConfig};
pub use error::{Result, RuleError};
pub use input::ValidationInput;
pub use params::RuleParams;
