//! Progress reporting for the integration pipeline.
//!
//! The pipeline runs synchronously to completion; progress updates are
//! informational only and there is no cancellation.
//!
//! # Example
//!
//! ```rust,ignore
//! let result = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run()?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the integration pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStage {
    /// Reading the sales and customers sources
    Loading,
    /// Inner-joining sales with customers
    Joining,
    /// Correcting amounts and filling names
    Repairing,
    /// Parsing, filtering and formatting sale dates
    NormalizingDates,
    /// Persisting the cleaned table
    Writing,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl IntegrationStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Sources",
            Self::Joining => "Joining Tables",
            Self::Repairing => "Repairing Values",
            Self::NormalizingDates => "Normalizing Dates",
            Self::Writing => "Writing Output",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run taken by this stage (0.0 - 1.0).
    pub fn weight(&self) -> f32 {
        match self {
            Self::Loading => 0.25,
            Self::Joining => 0.10,
            Self::Repairing => 0.20,
            Self::NormalizingDates => 0.25,
            Self::Writing => 0.20,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Loading => 0.0,
            Self::Joining => 0.25,
            Self::Repairing => 0.35,
            Self::NormalizingDates => 0.55,
            Self::Writing => 0.80,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// A progress update emitted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: IntegrationStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: IntegrationStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: IntegrationStage::Complete,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: IntegrationStage::Failed,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

/// Receives progress updates from the pipeline.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_stage_weights_sum_to_one() {
        let total: f32 = [
            IntegrationStage::Loading,
            IntegrationStage::Joining,
            IntegrationStage::Repairing,
            IntegrationStage::NormalizingDates,
            IntegrationStage::Writing,
        ]
        .iter()
        .map(|s| s.weight())
        .sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_base_progress_chains_weights() {
        let next = IntegrationStage::Joining;
        let prev = IntegrationStage::Loading;
        assert!((prev.base_progress() + prev.weight() - next.base_progress()).abs() < 1e-6);
    }

    #[test]
    fn test_progress_update_clamps() {
        let update = ProgressUpdate::new(IntegrationStage::Writing, 2.0, "done");
        assert_eq!(update.stage_progress, 1.0);
        assert!(update.progress <= 1.0);
    }

    #[test]
    fn test_closure_reporter_receives_updates() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = ClosureProgressReporter::new(move |update: ProgressUpdate| {
            sink.lock().unwrap().push(update.stage);
        });

        reporter.report(ProgressUpdate::new(IntegrationStage::Joining, 0.0, "join"));
        reporter.report(ProgressUpdate::complete("ok"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![IntegrationStage::Joining, IntegrationStage::Complete]
        );
    }

    #[test]
    fn test_stage_serialization() {
        let json = serde_json::to_string(&IntegrationStage::NormalizingDates).unwrap();
        assert_eq!(json, "\"normalizing_dates\"");
    }
}
