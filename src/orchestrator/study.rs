//! One study, end to end.

use crate::automation::UiBackend;
use crate::driver::InmDriver;
use crate::error::{DriverError, Result};
use crate::model::{ExportOptions, GridSetup, RunOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// The driver operations a study run needs.
pub trait StudyDriver {
    fn launch(&mut self) -> Result<()>;
    fn open_study(&mut self, path: &str) -> Result<()>;
    fn open_grid_setup(&mut self) -> Result<()>;
    fn set_grid(&mut self, grid: &GridSetup) -> Result<()>;
    fn set_run_options(&mut self, run: &RunOptions) -> Result<()>;
    fn run_study(&mut self) -> Result<()>;
    fn export_output(&mut self, export: &ExportOptions) -> Result<()>;
    fn close_study(&mut self) -> Result<()>;
    fn close_inm(&mut self) -> Result<()>;
}

impl<B: UiBackend> StudyDriver for InmDriver<B> {
    fn launch(&mut self) -> Result<()> {
        InmDriver::launch(self)
    }

    fn open_study(&mut self, path: &str) -> Result<()> {
        InmDriver::open_study(self, path)
    }

    fn open_grid_setup(&mut self) -> Result<()> {
        InmDriver::open_grid_setup(self)
    }

    fn set_grid(&mut self, grid: &GridSetup) -> Result<()> {
        InmDriver::set_grid(self, grid)
    }

    fn set_run_options(&mut self, run: &RunOptions) -> Result<()> {
        InmDriver::set_run_options(self, run)
    }

    fn run_study(&mut self) -> Result<()> {
        InmDriver::run_study(self)
    }

    fn export_output(&mut self, export: &ExportOptions) -> Result<()> {
        InmDriver::export_output(self, export)
    }

    fn close_study(&mut self) -> Result<()> {
        InmDriver::close_study(self)
    }

    fn close_inm(&mut self) -> Result<()> {
        InmDriver::close_inm(self)
    }
}

/// Everything needed to compute one study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyPlan {
    /// Folder name under the studies root.
    pub study: String,
    pub grids: Vec<GridSetup>,
    pub run_options: RunOptions,
    /// No exports when absent.
    pub export_options: Option<ExportOptions>,
}

impl StudyPlan {
    pub fn validate(&self) -> Result<()> {
        if self.grids.is_empty() {
            return Err(DriverError::InvalidOptions(format!(
                "study {} has no grid",
                self.study
            )));
        }
        for (idx, grid) in self.grids.iter().enumerate() {
            grid.validate()
                .map_err(|e| DriverError::InvalidOptions(format!("grid {}: {e}", idx + 1)))?;
        }
        Ok(())
    }
}

pub struct Orchestrator {
    studies_root: PathBuf,
}

impl Orchestrator {
    pub fn new(studies_root: impl Into<PathBuf>) -> Self {
        Self {
            studies_root: studies_root.into(),
        }
    }

    /// Absolute folder of a study; relative roots resolve against the working directory.
    pub fn study_path(&self, study: &str) -> Result<PathBuf> {
        let root: &Path = &self.studies_root;
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()?.join(root)
        };
        Ok(root.join(study))
    }

    /// Launch, open, set up grids and options, run, export, close. No resume.
    pub fn run_scenario<D: StudyDriver>(&self, driver: &mut D, plan: &StudyPlan) -> Result<()> {
        plan.validate()?;
        let path = self.study_path(&plan.study)?;

        driver.launch()?;
        driver.open_study(&path.to_string_lossy())?;
        driver.open_grid_setup()?;
        for grid in &plan.grids {
            driver.set_grid(grid)?;
        }
        driver.set_run_options(&plan.run_options)?;
        driver.run_study()?;
        if let Some(export) = &plan.export_options {
            driver.export_output(export)?;
        }
        driver.close_study()?;
        info!(study = %plan.study, "study complete");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::GridType;

    /// Records every call; can fail a named operation.
    #[derive(Default)]
    pub(crate) struct RecordingDriver {
        pub calls: Vec<String>,
        pub fail_on: Option<(&'static str, fn() -> DriverError)>,
    }

    impl RecordingDriver {
        fn record(&mut self, call: String) -> Result<()> {
            let name = call.split('(').next().unwrap_or_default().to_string();
            self.calls.push(call);
            match &self.fail_on {
                Some((op, err)) if *op == name => Err(err()),
                _ => Ok(()),
            }
        }
    }

    impl StudyDriver for RecordingDriver {
        fn launch(&mut self) -> Result<()> {
            self.record("launch".into())
        }
        fn open_study(&mut self, path: &str) -> Result<()> {
            self.record(format!("open_study({path})"))
        }
        fn open_grid_setup(&mut self) -> Result<()> {
            self.record("open_grid_setup".into())
        }
        fn set_grid(&mut self, grid: &GridSetup) -> Result<()> {
            self.record(format!("set_grid({})", grid.grid_type.label()))
        }
        fn set_run_options(&mut self, run: &RunOptions) -> Result<()> {
            self.record(format!("set_run_options({})", run.noise_metric))
        }
        fn run_study(&mut self) -> Result<()> {
            self.record("run_study".into())
        }
        fn export_output(&mut self, _export: &ExportOptions) -> Result<()> {
            self.record("export_output".into())
        }
        fn close_study(&mut self) -> Result<()> {
            self.record("close_study".into())
        }
        fn close_inm(&mut self) -> Result<()> {
            self.record("close_inm".into())
        }
    }

    pub(crate) fn plan(study: &str) -> StudyPlan {
        StudyPlan {
            study: study.to_string(),
            grids: vec![
                GridSetup {
                    grid_type: GridType::Contour,
                    ..GridSetup::default()
                },
                GridSetup::default(),
            ],
            run_options: RunOptions::default(),
            export_options: None,
        }
    }

    #[test]
    fn grids_are_set_in_order_before_run_options() {
        let orchestrator = Orchestrator::new("/studies");
        let mut driver = RecordingDriver::default();
        orchestrator.run_scenario(&mut driver, &plan("A")).unwrap();
        let path = Path::new("/studies").join("A");
        assert_eq!(
            driver.calls,
            vec![
                "launch".to_string(),
                format!("open_study({})", path.display()),
                "open_grid_setup".to_string(),
                "set_grid(Contour)".to_string(),
                "set_grid(Location)".to_string(),
                "set_run_options(LAMAX)".to_string(),
                "run_study".to_string(),
                "close_study".to_string(),
            ]
        );
    }

    #[test]
    fn export_runs_only_when_requested() {
        let orchestrator = Orchestrator::new("/studies");
        let mut driver = RecordingDriver::default();
        let with_export = StudyPlan {
            export_options: Some(ExportOptions::default()),
            ..plan("A")
        };
        orchestrator.run_scenario(&mut driver, &with_export).unwrap();
        let run = driver.calls.iter().position(|c| c == "run_study").unwrap();
        assert_eq!(driver.calls[run + 1], "export_output");
    }

    #[test]
    fn plan_without_grids_is_rejected_before_launch() {
        let orchestrator = Orchestrator::new("/studies");
        let mut driver = RecordingDriver::default();
        let empty = StudyPlan {
            grids: Vec::new(),
            ..plan("A")
        };
        let err = orchestrator.run_scenario(&mut driver, &empty).unwrap_err();
        assert!(matches!(err, DriverError::InvalidOptions(_)));
        assert!(driver.calls.is_empty());
    }

    #[test]
    fn driver_failure_stops_the_sequence() {
        let orchestrator = Orchestrator::new("/studies");
        fn timeout() -> DriverError {
            DriverError::Timeout {
                what: "run to finish".into(),
                waited: std::time::Duration::from_secs(300),
            }
        }
        let mut driver = RecordingDriver {
            fail_on: Some(("run_study", timeout as fn() -> DriverError)),
            ..RecordingDriver::default()
        };
        assert!(orchestrator.run_scenario(&mut driver, &plan("A")).is_err());
        assert_eq!(driver.calls.last().map(String::as_str), Some("run_study"));
    }

    #[test]
    fn relative_root_resolves_against_working_directory() {
        let orchestrator = Orchestrator::new("INM Studies");
        let path = orchestrator.study_path("A").unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("INM Studies/A"));
    }
}
