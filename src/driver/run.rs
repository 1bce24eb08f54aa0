//! Run Options dialog and run execution.

use super::{Ctx, InmDriver};
use crate::automation::{ControlSpec, Role, UiBackend, WindowId, WindowQuery};
use crate::error::{DriverError, Result};
use crate::model::{NoiseMetric, RunOptions, RunType};
use tracing::{debug, info};

/// Title of the tool's information message boxes.
const INFO_TITLE: &str = "INM 7.0";

/// Upper bound on interposed dialogs before the run status dialog shows up.
const MAX_START_DIALOGS: usize = 16;

impl<B: UiBackend> InmDriver<B> {
    pub fn set_run_options(&mut self, run: &RunOptions) -> Result<()> {
        self.with_retry("set_run_options", |ctx| ctx.set_run_options(run))
    }

    /// Start the run for the first scenario and block until it completes.
    pub fn run_study(&mut self) -> Result<()> {
        self.with_retry("run_study", |ctx| ctx.run_study())
    }
}

impl<B: UiBackend> Ctx<'_, B> {
    fn set_run_options(&mut self, run: &RunOptions) -> Result<()> {
        self.close_all_windows()?;
        self.click_menu_item("Run->Run Options")?;
        self.cascade()?;
        let dialog = self.ui.top_window()?;

        self.select_text(dialog, &ControlSpec::combo("Run Type"), run.run_type.label())?;
        if run.do_terrain {
            self.check(dialog, &ControlSpec::check_box("Do Terrain"))?;
        }
        self.select_text(
            dialog,
            &ControlSpec::combo("Lateral Attenuation"),
            &run.lateral_attenuation,
        )?;
        if run.use_bank_angle {
            self.check(dialog, &ControlSpec::check_box("Use Bank Angle"))?;
        }

        let token = run.noise_metric_token();
        self.session.noise_metric = Some(token.clone());

        if run.run_type != RunType::SingleMetric {
            debug!(run_type = run.run_type.label(), "metric and contour options left untouched");
            return Ok(());
        }

        self.select_text(dialog, &ControlSpec::combo("Noise Metric"), &token)?;
        if run.do_contours {
            self.set_contours(dialog, run)?;
        }

        if run.do_population_points {
            self.check(dialog, &ControlSpec::check_box("Do Population Points"))?;
        }
        if run.do_location_points {
            self.check(dialog, &ControlSpec::check_box("Do Location Points"))?;
        }
        if run.do_standard_grids {
            self.check(dialog, &ControlSpec::check_box("Do Standard Grids"))?;
        }
        if run.do_detailed_grids {
            self.check(dialog, &ControlSpec::check_box("Do Detailed Grids"))?;
            if run.save_all_flights {
                self.check(dialog, &ControlSpec::check_box("Save 100% Flights"))?;
            }
        }

        for metric in NoiseMetric::ALL {
            if run.includes(metric) {
                self.check(dialog, &ControlSpec::check_box(metric.name()))?;
            }
        }
        Ok(())
    }

    fn set_contours(&mut self, dialog: WindowId, run: &RunOptions) -> Result<()> {
        let refinement = ControlSpec::combo("Refinement");
        self.check(dialog, &ControlSpec::check_box("Do Contours"))?;
        if run.use_boundary_file {
            self.check(dialog, &ControlSpec::check_box("Use Boundary File"))?;
        }
        if run.fixed_grid {
            self.click(dialog, &ControlSpec::radio("Fixed Grid"))?;
            if run.fixed_spacing {
                self.click(dialog, &ControlSpec::radio("Fixed Spacing"))?;
                self.set_text(dialog, &ControlSpec::edit("Spacing"), &run.spacing.to_string())?;
            } else {
                self.click(dialog, &ControlSpec::radio("Refinement"))?;
                self.select_index(dialog, &refinement, run.refinement as usize)?;
            }
        } else {
            self.click(dialog, &ControlSpec::radio("Recursive Grid"))?;
            self.select_index(dialog, &refinement, run.refinement as usize)?;
            self.set_text(dialog, &ControlSpec::edit("Tolerance"), &run.tolerance.to_string())?;
            self.set_text(dialog, &ControlSpec::edit("Low Cutoff"), &run.low_cutoff.to_string())?;
            self.set_text(dialog, &ControlSpec::edit("High Cutoff"), &run.high_cutoff.to_string())?;
        }
        Ok(())
    }

    fn run_study(&mut self) -> Result<()> {
        self.close_all_windows()?;
        let main = self.main()?;
        self.ui.invoke_menu(main, "Run->Run Start...")?;
        self.settle(main)?;

        let start = self.ui.find_window(&WindowQuery::exact("Run Start"))?;
        self.select_index(start, &ControlSpec::list_box_labeled("Scenario List"), 0)?;
        self.click(start, &ControlSpec::list_box_labeled("Include --- >"))?;
        self.click(start, &ControlSpec::button("OK"))?;

        self.dismiss_start_dialogs(main)?;
        info!("Running study...");

        let timeout = self.settings.run_timeout;
        if !self.wait_ready(main, timeout)? {
            return Err(DriverError::Timeout {
                what: "run to finish".into(),
                waited: timeout,
            });
        }
        info!("Run finished!");
        Ok(())
    }

    /// Clear warnings and information boxes until the (untitled) run status dialog is on top.
    fn dismiss_start_dialogs(&mut self, main: WindowId) -> Result<()> {
        for _ in 0..MAX_START_DIALOGS {
            self.ui.maximize(main)?;
            self.settle(main)?;
            let top = self.ui.top_window()?;
            match self.ui.window_title(top)?.as_str() {
                // the study already has results
                "Warning" => self.click(top, &ControlSpec::button("Oui"))?,
                INFO_TITLE => {
                    let message =
                        self.first_text(top, &ControlSpec::new(Role::Static, "Static2"))?;
                    info!("{message}");
                    self.click(top, &ControlSpec::button("OK"))?;
                }
                _ => return Ok(()),
            }
        }
        Err(DriverError::WindowNotFound(format!(
            "run status dialog (still dismissing dialogs after {MAX_START_DIALOGS})"
        )))
    }
}
