//! `clarity-core` — the operations lab-automation scripts run against a
//! Clarity-style LIMS, written purely against the `LimsClient` trait.
//!
//! The two operations with real machinery:
//!
//! - [`HistoryWalker`] walks a step-history DAG backward to find, for each
//!   current-step artifact, its ancestor artifact at an earlier step —
//!   following every divergent process path and preferring the most
//!   recently run one.
//! - [`StepRouter`] enqueues artifacts into a downstream step in bounded
//!   batches with per-batch retry, so one giant request can never outlive
//!   the service timeout.
//!
//! Around them: sample lookups ([`samples`]), step-execution views
//! ([`steps`]), and tunables ([`config`]).

pub mod config;
pub mod error;
pub mod history;
pub mod router;
pub mod samples;
pub mod steps;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{ClarityConfig, RouterConfig, WalkerConfig};
pub use error::ClarityError;
pub use history::HistoryWalker;
pub use router::{FailedBatch, RoutingOutcome, StepRouter};
pub use samples::{artifacts_from_samples, get_samples};
pub use steps::{artifact_map, step_artifacts, Direction};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ClarityError>;
