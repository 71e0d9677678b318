//! Pipeline module.
//!
//! This module provides the integration pipeline and related components.

mod builder;
pub mod progress;
mod verify;

pub use builder::{Pipeline, PipelineBuilder};
pub use progress::{ClosureProgressReporter, IntegrationStage, ProgressReporter, ProgressUpdate};
