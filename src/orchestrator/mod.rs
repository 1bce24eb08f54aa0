//! Study-level orchestration.
//!
//! Sequences driver operations for one study and runs batches of studies.
//! Everything goes through [`StudyDriver`], so the sequencing is testable
//! without the external application.

mod batch;
mod study;

pub use batch::{run_batch, BatchReport, StudyOutcome, StudyStatus};
pub use study::{Orchestrator, StudyDriver, StudyPlan};
