//! Application and study lifecycle.

use super::{directory_segments, study_folder_name, Ctx, InmDriver, Session, INM_IMAGE, MAIN_TITLE_PREFIX};
use crate::automation::{Action, ControlSpec, UiBackend, WindowQuery};
use crate::error::{DriverError, Result};
use tracing::{debug, info};

impl<B: UiBackend> InmDriver<B> {
    /// Kill any running instance, start the tool and wait for its main window.
    ///
    /// Not retried: every failure comes back as [`DriverError::Launch`].
    pub fn launch(&mut self) -> Result<()> {
        let exe = self.inm_exe.clone();
        let timeout = self.settings.launch_timeout;
        let mut ctx = self.ctx();

        ctx.ui.terminate(INM_IMAGE).map_err(as_launch)?;
        info!(exe = %exe.display(), "starting INM");
        ctx.ui.spawn(&exe).map_err(as_launch)?;
        let main = ctx
            .ui
            .find_window(&WindowQuery::starts_with(MAIN_TITLE_PREFIX))
            .map_err(as_launch)?;
        if !ctx.wait_ready(main, timeout).map_err(as_launch)? {
            return Err(DriverError::Launch(format!(
                "main window not ready after {}",
                humantime::format_duration(timeout)
            )));
        }
        *ctx.session = Session {
            main_window: Some(main),
            ..Session::default()
        };
        Ok(())
    }

    /// Open the study at `path` (absolute, as the tool's folder picker shows it).
    pub fn open_study(&mut self, path: &str) -> Result<()> {
        info!("Opening study {path}");
        self.with_retry("open_study", |ctx| ctx.open_study(path))
    }

    /// Close the open study, if any.
    pub fn close_study(&mut self) -> Result<()> {
        self.with_retry("close_study", |ctx| ctx.close_study())
    }

    /// Exit the tool. A no-op when it was never launched.
    pub fn close_inm(&mut self) -> Result<()> {
        if self.session.main_window.is_none() {
            return Ok(());
        }
        self.with_retry("close_inm", |ctx| ctx.click_menu_item("File->Exit"))?;
        self.session = Session::default();
        Ok(())
    }
}

fn as_launch(err: DriverError) -> DriverError {
    match err {
        DriverError::Launch(_) => err,
        other => DriverError::Launch(other.to_string()),
    }
}

impl<B: UiBackend> Ctx<'_, B> {
    fn open_study(&mut self, path: &str) -> Result<()> {
        self.close_study()?;

        let segments = directory_segments(path);
        let main = self.main()?;
        self.ui.invoke_menu(main, "File->Open Study...")?;
        self.settle(main)?;

        let dialog = self.ui.top_window()?;
        let list = ControlSpec::list_box();
        self.act(dialog, &list, Action::Focus)?;
        self.navigate(dialog, &list, &segments)?;
        self.click(dialog, &ControlSpec::button("OK"))?;

        // the main window title now carries the study path
        let titled = WindowQuery::contains(format!("[Study {}]", path.to_uppercase()));
        let main = self.ui.find_window(&titled)?;
        self.session.main_window = Some(main);
        self.session.path_to_study = Some(path.to_string());
        self.session.study_folder = Some(study_folder_name(path));
        Ok(())
    }

    pub fn close_study(&mut self) -> Result<()> {
        const CLOSE_STUDY: &str = "File->Close Study";

        let main = self.main()?;
        let item = self.ui.menu_item(main, CLOSE_STUDY)?;
        let closing = item.enabled && item.text.contains("Close");
        if closing {
            self.ui.invoke_menu(main, CLOSE_STUDY)?;
        } else {
            debug!("no study open");
        }
        let main = self
            .ui
            .find_window(&WindowQuery::starts_with(MAIN_TITLE_PREFIX))?;
        self.session.main_window = Some(main);
        if closing {
            self.session.path_to_study = None;
            self.session.study_folder = None;
        }
        Ok(())
    }
}
