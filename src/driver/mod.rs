//! INM automation driver.
//!
//! `InmDriver` owns the automation backend and the session state, and exposes
//! one method per user-level operation (open a study, add a grid, run, export).
//! Every operation except `launch` runs inside the same envelope: on a lookup
//! failure it logs the error, closes every open sub-window to get back to the
//! bare main window, and starts the operation over with the same arguments,
//! up to `DriverSettings::max_attempts` times.

mod export;
mod grid;
mod navigate;
mod run;
mod study;

pub use export::{export_file_name, output_dir};
pub use navigate::{directory_segments, find_item, study_folder_name};

use crate::automation::{Action, ControlId, ControlSpec, UiBackend, WindowId, WindowQuery};
use crate::error::{DriverError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::warn;

/// Process image killed before every launch.
pub const INM_IMAGE: &str = "inm.exe";
/// Every INM main window title starts with this.
pub const MAIN_TITLE_PREFIX: &str = "INM";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverSettings {
    /// Attempts per operation before giving up with `RetriesExhausted`.
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub launch_timeout: Duration,
    /// Upper bound on a computation run.
    #[serde(with = "humantime_serde")]
    pub run_timeout: Duration,
    /// How long to wait for an output view to open.
    #[serde(with = "humantime_serde")]
    pub dialog_timeout: Duration,
    /// How long to wait for the main window to go busy after a menu command.
    #[serde(with = "humantime_serde")]
    pub settle_timeout: Duration,
    /// Existence probe for optional dialogs.
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_millis(500),
            launch_timeout: Duration::from_secs(30),
            run_timeout: Duration::from_secs(300),
            dialog_timeout: Duration::from_secs(30),
            settle_timeout: Duration::from_secs(5),
            probe_timeout: Duration::from_millis(10),
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// What the driver believes the application currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub main_window: Option<WindowId>,
    /// Absolute path of the open study, as typed into the folder picker.
    pub path_to_study: Option<String>,
    /// Last component of `path_to_study`; suffixes export file names.
    pub study_folder: Option<String>,
    /// Six-character metric token of the last configured run.
    pub noise_metric: Option<String>,
}

pub struct InmDriver<B> {
    ui: B,
    inm_exe: PathBuf,
    session: Session,
    settings: DriverSettings,
}

/// Borrowed view of the driver handed to one attempt of an operation.
pub(crate) struct Ctx<'a, B> {
    pub ui: &'a mut B,
    pub session: &'a mut Session,
    pub settings: &'a DriverSettings,
}

impl<B: UiBackend> InmDriver<B> {
    pub fn new(ui: B, inm_exe: impl Into<PathBuf>, settings: DriverSettings) -> Self {
        Self {
            ui,
            inm_exe: inm_exe.into(),
            session: Session::default(),
            settings,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn backend(&self) -> &B {
        &self.ui
    }

    fn ctx(&mut self) -> Ctx<'_, B> {
        Ctx {
            ui: &mut self.ui,
            session: &mut self.session,
            settings: &self.settings,
        }
    }

    /// Run `op` until it succeeds, fails for a non-transient reason, or runs out of attempts.
    fn with_retry<T>(
        &mut self,
        operation: &'static str,
        mut op: impl FnMut(&mut Ctx<'_, B>) -> Result<T>,
    ) -> Result<T> {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let mut ctx = self.ctx();
            let err = match op(&mut ctx) {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => e,
            };
            warn!(operation, attempt, kind = err.kind(), "{err}");
            if attempt >= max_attempts {
                return Err(DriverError::RetriesExhausted {
                    operation,
                    attempts: attempt,
                    source: Box::new(err),
                });
            }
            if let Err(close_err) = ctx.close_all_windows() {
                warn!(operation, kind = close_err.kind(), "close all failed: {close_err}");
            }
            if !ctx.settings.retry_delay.is_zero() {
                std::thread::sleep(ctx.settings.retry_delay);
            }
            attempt += 1;
        }
    }

    /// `Window->Close All`, when enabled.
    pub fn close_all_windows(&mut self) -> Result<()> {
        self.ctx().close_all_windows()
    }

    /// `Window->Cascade`, when enabled.
    pub fn cascade_windows(&mut self) -> Result<()> {
        self.ctx().cascade()
    }

    /// Invoke a main-window menu item if it is enabled. Returns whether it was invoked.
    pub fn click_menu_item(&mut self, path: &str) -> Result<bool> {
        self.with_retry("click_menu_item", |ctx| ctx.click_menu_item(path))
    }
}

impl<B: UiBackend> Ctx<'_, B> {
    pub fn main(&self) -> Result<WindowId> {
        self.session.main_window.ok_or(DriverError::NotLaunched)
    }

    pub fn click_menu_item(&mut self, path: &str) -> Result<bool> {
        let main = self.main()?;
        let item = self.ui.menu_item(main, path)?;
        if item.enabled {
            self.ui.invoke_menu(main, path)?;
        }
        Ok(item.enabled)
    }

    /// Invoke a menu item without checking its state first.
    pub fn invoke_menu(&mut self, path: &str) -> Result<()> {
        let main = self.main()?;
        self.ui.invoke_menu(main, path)
    }

    pub fn close_all_windows(&mut self) -> Result<()> {
        self.click_menu_item("Window->Close All").map(|_| ())
    }

    pub fn cascade(&mut self) -> Result<()> {
        self.click_menu_item("Window->Cascade").map(|_| ())
    }

    pub fn locate(&mut self, window: WindowId, spec: &ControlSpec) -> Result<ControlId> {
        self.ui.locate(window, spec)
    }

    pub fn act(&mut self, window: WindowId, spec: &ControlSpec, action: Action) -> Result<()> {
        let control = self.ui.locate(window, spec)?;
        self.ui.invoke(control, &action)
    }

    pub fn click(&mut self, window: WindowId, spec: &ControlSpec) -> Result<()> {
        self.act(window, spec, Action::Click)
    }

    pub fn check(&mut self, window: WindowId, spec: &ControlSpec) -> Result<()> {
        self.act(window, spec, Action::Check)
    }

    pub fn select_index(&mut self, window: WindowId, spec: &ControlSpec, index: usize) -> Result<()> {
        self.act(window, spec, Action::SelectIndex(index))
    }

    pub fn select_text(&mut self, window: WindowId, spec: &ControlSpec, text: &str) -> Result<()> {
        self.act(window, spec, Action::SelectText(text.to_string()))
    }

    pub fn set_text(&mut self, window: WindowId, spec: &ControlSpec, text: &str) -> Result<()> {
        let control = self.ui.locate(window, spec)?;
        self.ui.set_text(control, text)
    }

    /// First text of a control (current selection of a combo box, content of an edit).
    pub fn first_text(&mut self, window: WindowId, spec: &ControlSpec) -> Result<String> {
        let control = self.ui.locate(window, spec)?;
        self.ui
            .read_text(control)?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::MatchFailed(format!("{spec} has no text")))
    }

    /// Poll `probe` every `poll_interval` until it answers true or `timeout` elapses.
    /// Always probes at least once.
    pub fn wait_until(
        &mut self,
        timeout: Duration,
        mut probe: impl FnMut(&mut B) -> Result<bool>,
    ) -> Result<bool> {
        let start = Instant::now();
        loop {
            if probe(&mut *self.ui)? {
                return Ok(true);
            }
            if start.elapsed() >= timeout {
                return Ok(false);
            }
            std::thread::sleep(self.settings.poll_interval);
        }
    }

    pub fn wait_ready(&mut self, window: WindowId, timeout: Duration) -> Result<bool> {
        self.wait_until(timeout, |ui| ui.is_ready(window))
    }

    /// Give a menu command a moment to put the main window into its busy state.
    pub fn settle(&mut self, window: WindowId) -> Result<()> {
        let timeout = self.settings.settle_timeout;
        self.wait_until(timeout, |ui| ui.is_ready(window).map(|ready| !ready))?;
        Ok(())
    }

    pub fn probe_window(&mut self, query: &WindowQuery) -> Result<bool> {
        let timeout = self.settings.probe_timeout;
        self.wait_until(timeout, |ui| ui.window_exists(query))
    }

    pub fn probe_control(&mut self, window: WindowId, spec: &ControlSpec) -> Result<bool> {
        let timeout = self.settings.probe_timeout;
        self.wait_until(timeout, |ui| ui.control_exists(window, spec))
    }
}
