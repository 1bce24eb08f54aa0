//! Automation of the INM 7.0 noise-modeling application.
//!
//! [`driver::InmDriver`] drives the application through a [`automation::UiBackend`],
//! [`orchestrator`] sequences a study end to end and runs batches, and
//! [`model`] holds the option records both layers share.

pub mod automation;
pub mod config;
pub mod driver;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod prepare;
