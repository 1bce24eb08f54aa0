//! Output exports.
//!
//! Each export opens an output view from the Output menu and saves it through
//! the tool's own Export As dialog into `<study>/OUTPUT1/<metric>/`. Graphics
//! go through the separate shapefile dialog instead.

use super::{directory_segments, Ctx, InmDriver};
use crate::automation::{Action, ControlSpec, UiBackend, WindowId, WindowQuery};
use crate::error::{DriverError, Result};
use crate::model::{normalize_metric_token, ExportKind, ExportOptions, ExportUnits};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// File name for an export: the dialog's proposed name suffixed with the study folder.
pub fn export_file_name(default_name: &str, study_folder: &str) -> String {
    format!("{default_name}_{study_folder}")
}

/// Destination folder of every export for a metric.
pub fn output_dir(study: &str, metric: &str) -> PathBuf {
    Path::new(study).join("OUTPUT1").join(metric.trim())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finish {
    Table,
    Shapefile,
    /// The report has no export dialog, only a confirmation.
    ConfirmReport,
}

#[derive(Debug, Clone, Copy)]
struct Route {
    menu: &'static str,
    /// Only invoke the menu item when it is enabled.
    gated: bool,
    /// Selection dialog confirmed right after the menu command.
    select: Option<&'static str>,
    /// View to wait for before exporting.
    view: Option<&'static str>,
    /// An "ERROR" box may pop up when the study has no coverage data.
    dismiss_error: bool,
    finish: Finish,
}

impl Route {
    fn new(menu: &'static str, select: Option<&'static str>, finish: Finish) -> Self {
        Self {
            menu,
            gated: true,
            select,
            view: None,
            dismiss_error: false,
            finish,
        }
    }

    fn ungated(mut self) -> Self {
        self.gated = false;
        self
    }

    fn view(mut self, title: &'static str) -> Self {
        self.view = Some(title);
        self
    }
}

const OUTPUT_SELECT: Option<&str> = Some("Output Select");
const SCENARIO_SELECT: Option<&str> = Some("Scenario Select");

fn route(kind: ExportKind) -> Route {
    match kind {
        ExportKind::OutputGraphics => {
            Route::new("Output->Output Graphics...", OUTPUT_SELECT, Finish::Shapefile)
                .ungated()
                .view("Output")
        }
        ExportKind::ContourPoints => {
            Route::new("Output->Contour Points...", OUTPUT_SELECT, Finish::Table)
                .ungated()
                .view("Contour Points")
        }
        ExportKind::ContourAreaAndPop => {
            Route::new("Output->Contour Area and Pop...", OUTPUT_SELECT, Finish::Table)
                .ungated()
                .view("Contour Area and Population")
        }
        ExportKind::AreaContourCoverage => Route {
            dismiss_error: true,
            ..Route::new("Output->Area Contour Coverage...", None, Finish::Table).ungated()
        },
        ExportKind::StandardGrids => {
            Route::new("Output->Standard Grids...", SCENARIO_SELECT, Finish::Table)
        }
        ExportKind::DetailedGrids => {
            Route::new("Output->Detailed Grids...", SCENARIO_SELECT, Finish::Table)
        }
        ExportKind::NoiseAtPopPoints => {
            Route::new("Output->Noise at Pop Points...", SCENARIO_SELECT, Finish::Table)
        }
        ExportKind::NoiseAtLocPoints => {
            Route::new("Output->Noise at Loc Points...", SCENARIO_SELECT, Finish::Table)
        }
        ExportKind::FlightPathReport => Route::new(
            "Output->Flight Path Report...",
            SCENARIO_SELECT,
            Finish::ConfirmReport,
        ),
    }
}

impl<B: UiBackend> InmDriver<B> {
    /// Export every enabled output of the open study.
    ///
    /// The output metric is taken from the Run Options dialog, so exports
    /// match the last run even when options were set in another session.
    pub fn export_output(&mut self, export: &ExportOptions) -> Result<()> {
        self.with_retry("export_output", |ctx| {
            ctx.sync_output_metric()?;
            for kind in export.kinds() {
                ctx.export_kind(kind, export)?;
            }
            Ok(())
        })
    }
}

impl<B: UiBackend> Ctx<'_, B> {
    fn sync_output_metric(&mut self) -> Result<()> {
        self.click_menu_item("Run->Run Options")?;
        let dialog = self.ui.top_window()?;
        let current = self.first_text(dialog, &ControlSpec::combo("Noise Metric"))?;
        let token = normalize_metric_token(&current);
        self.close_all_windows()?;

        self.click_menu_item("Output->Output Setup")?;
        let setup = self.ui.top_window()?;
        self.select_text(setup, &ControlSpec::combo("Metric"), &token)?;
        self.close_all_windows()?;

        debug!(metric = token.trim(), "output metric set");
        self.session.noise_metric = Some(token);
        Ok(())
    }

    fn export_kind(&mut self, kind: ExportKind, export: &ExportOptions) -> Result<()> {
        let route = route(kind);
        debug!(?kind, menu = route.menu, "exporting");
        if route.gated {
            self.click_menu_item(route.menu)?;
        } else {
            self.invoke_menu(route.menu)?;
        }

        if route.dismiss_error && self.probe_window(&WindowQuery::exact("ERROR"))? {
            let popup = self.ui.top_window()?;
            self.click(popup, &ControlSpec::button("OK"))?;
        }
        if let Some(title) = route.select {
            self.confirm_select(title)?;
        }
        if let Some(view) = route.view {
            self.wait_for_view(view)?;
        }

        match route.finish {
            Finish::Table => {
                self.cascade()?;
                self.export_table(export.file_type.as_deref())
            }
            Finish::Shapefile => {
                self.cascade()?;
                self.export_shapefile(export.graphics_units)
            }
            Finish::ConfirmReport => {
                let confirm = self.ui.top_window()?;
                self.click(confirm, &ControlSpec::button("OK"))
            }
        }
    }

    /// Wait for an output view, clicking through any OK dialogs shown before it.
    fn wait_for_view(&mut self, view: &str) -> Result<()> {
        let ok = ControlSpec::button("OK");
        let frame = ControlSpec::view(view);
        let start = Instant::now();
        loop {
            let top = self.ui.top_window()?;
            if self.probe_control(top, &ok)? {
                self.click(top, &ok)?;
            } else if self.probe_control(top, &frame)? {
                return Ok(());
            }
            if start.elapsed() >= self.settings.dialog_timeout {
                return Err(DriverError::WindowNotFound(format!("{view} view")));
            }
            std::thread::sleep(self.settings.poll_interval);
        }
    }

    /// Create the metric's output folder and return it with the bare metric name.
    fn prepare_output_dir(&mut self) -> Result<(PathBuf, String)> {
        let study = self
            .session
            .path_to_study
            .clone()
            .ok_or_else(|| DriverError::InvalidOptions("no study open".into()))?;
        let metric = self
            .session
            .noise_metric
            .as_deref()
            .map(|m| m.trim().to_string())
            .ok_or_else(|| DriverError::InvalidOptions("output metric unknown".into()))?;
        let dir = output_dir(&study, &metric);
        std::fs::create_dir_all(&dir)?;
        Ok((dir, metric))
    }

    /// Segments to pick in a folder list, minus the drive if the list already starts on it.
    fn destination_segments(&mut self, window: WindowId, list: &ControlSpec, dir: &Path) -> Result<Vec<String>> {
        let mut segments = directory_segments(&dir.to_string_lossy());
        let control = self.locate(window, list)?;
        if self.ui.focused_item(control)? == Some(0) && !segments.is_empty() {
            segments.remove(0);
        }
        Ok(segments)
    }

    fn export_table(&mut self, file_type: Option<&str>) -> Result<()> {
        let (dir, metric) = self.prepare_output_dir()?;

        self.click_menu_item("File->Export As...")?;
        let dialog = self.ui.find_window(&WindowQuery::starts_with("Export As"))?;

        let name_field = ControlSpec::edit("File Name");
        let default_name = self.first_text(dialog, &name_field)?;
        let folder = self.session.study_folder.clone().unwrap_or_default();
        let file_name = export_file_name(&default_name, &folder);
        if let Some(file_type) = file_type {
            self.select_text(dialog, &ControlSpec::combo("List Files or Type"), file_type)?;
        }
        self.set_text(dialog, &name_field, &file_name)?;

        let list = ControlSpec::list_box();
        let segments = self.destination_segments(dialog, &list, &dir)?;
        self.click(dialog, &list)?;
        self.navigate(dialog, &list, &segments)?;

        // still an "Export As" window after the last ENTER: overwrite confirmation
        if self.probe_window(&WindowQuery::starts_with("Export As"))? {
            let confirm = self.ui.top_window()?;
            self.click(confirm, &ControlSpec::button("Replace"))?;
        }
        self.close_all_windows()?;
        info!("{file_name} output created for {metric}");
        Ok(())
    }

    fn export_shapefile(&mut self, units: ExportUnits) -> Result<()> {
        let (dir, metric) = self.prepare_output_dir()?;

        self.click_menu_item("File->Export as ShapeFile...")?;
        let dialog = self.ui.find_window(&WindowQuery::exact("Export As Shapefile"))?;
        self.select_text(dialog, &ControlSpec::combo("Export Units"), units.label())?;
        self.click(dialog, &ControlSpec::button("Browse"))?;

        let browser = self.ui.find_window(&WindowQuery::starts_with("Directories"))?;
        let list = ControlSpec::list_box();
        self.act(browser, &list, Action::Focus)?;
        let segments = self.destination_segments(browser, &list, &dir)?;
        self.ui.send_keys(browser, "{HOME}")?;
        for segment in &segments {
            self.select_text(browser, &list, segment)?;
            self.ui.send_keys(browser, "{ENTER}")?;
        }
        self.click(browser, &ControlSpec::button("OK"))?;
        self.click(dialog, &ControlSpec::button("OK"))?;
        info!("shapefile output created for {metric}");
        Ok(())
    }
}
