//! Scripted stand-in for the INM window system.
//!
//! Controls live in one flat namespace keyed by role and label; `locate`
//! succeeds for any control unless a failure has been injected. Every
//! interaction is appended to `calls` so tests can assert on what the driver
//! touched and in which order.

use super::{Action, ControlId, ControlSpec, MenuItemState, Role, UiBackend, WindowId, WindowQuery};
use crate::error::{DriverError, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

pub(crate) const MAIN_TITLE: &str = "INM 7.0";
pub(crate) const DEFAULT_TOP: &str = "Dialog";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Terminate(String),
    Spawn(PathBuf),
    Menu(String),
    Maximize(String),
    Act {
        window: String,
        spec: ControlSpec,
        action: Action,
    },
    SetText {
        window: String,
        spec: ControlSpec,
        text: String,
    },
    Keys {
        window: String,
        keys: String,
    },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ControlState {
    pub texts: Vec<String>,
    pub items: Vec<String>,
    pub checked: bool,
    pub focused_item: Option<usize>,
}

pub(crate) struct FakeUi {
    titles: Vec<String>,
    present: Vec<bool>,
    /// Titles returned by successive `top_window` calls before falling back to `default_top`.
    pub top_queue: VecDeque<String>,
    pub default_top: String,
    /// Windows that only ever show up to `window_exists` probes (confirmations, error popups).
    pub probe_windows: HashSet<String>,
    /// View titles reported by `control_exists`.
    pub views: HashSet<String>,
    /// Number of interposed dialogs whose OK button is visible to `control_exists`.
    pub pending_ok: usize,
    pub menus: HashMap<String, MenuItemState>,
    pub controls: HashMap<ControlSpec, ControlState>,
    /// `is_ready` answers false this many times before answering `ready`.
    pub not_ready_polls: u32,
    pub ready: bool,
    pub fail_spawn: bool,
    fail_locate: Vec<(ControlSpec, u32)>,
    fail_window: Vec<(String, u32)>,
    located: Vec<(WindowId, ControlSpec)>,
    pub calls: Vec<Call>,
}

impl FakeUi {
    pub fn new() -> Self {
        let mut ui = Self {
            titles: Vec::new(),
            present: Vec::new(),
            top_queue: VecDeque::new(),
            default_top: DEFAULT_TOP.to_string(),
            probe_windows: HashSet::new(),
            views: HashSet::new(),
            pending_ok: 0,
            menus: HashMap::new(),
            controls: HashMap::new(),
            not_ready_polls: 0,
            ready: true,
            fail_spawn: false,
            fail_locate: Vec::new(),
            fail_window: Vec::new(),
            located: Vec::new(),
            calls: Vec::new(),
        };
        ui.add_window(MAIN_TITLE);
        for title in [
            "Scenario Select",
            "Output Select",
            "Run Start",
            "Export As",
            "Export As Shapefile",
            "Directories",
        ] {
            ui.add_window(title);
        }
        for view in ["Output", "Contour Points", "Contour Area and Population"] {
            ui.views.insert(view.to_string());
        }
        ui
    }

    pub fn add_window(&mut self, title: &str) -> WindowId {
        if let Some(idx) = self.titles.iter().position(|t| t == title) {
            self.present[idx] = true;
            return WindowId(idx as u64);
        }
        self.titles.push(title.to_string());
        self.present.push(true);
        WindowId((self.titles.len() - 1) as u64)
    }

    pub fn control(&mut self, spec: ControlSpec) -> &mut ControlState {
        self.controls.entry(spec).or_default()
    }

    pub fn set_items(&mut self, spec: ControlSpec, items: &[&str]) {
        self.control(spec).items = items.iter().map(|s| s.to_string()).collect();
    }

    pub fn set_texts(&mut self, spec: ControlSpec, texts: &[&str]) {
        self.control(spec).texts = texts.iter().map(|s| s.to_string()).collect();
    }

    pub fn disable_menu(&mut self, path: &str) {
        let text = path.rsplit("->").next().unwrap_or(path).to_string();
        self.menus.insert(
            path.to_string(),
            MenuItemState {
                enabled: false,
                text,
            },
        );
    }

    /// Make the next `times` lookups of `spec` fail.
    pub fn fail_locate(&mut self, spec: ControlSpec, times: u32) {
        self.fail_locate.push((spec, times));
    }

    /// Make the next `times` lookups of windows whose title contains `fragment` fail.
    pub fn fail_window(&mut self, fragment: &str, times: u32) {
        self.fail_window.push((fragment.to_string(), times));
    }

    pub fn menu_count(&self, path: &str) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Menu(p) if p == path))
            .count()
    }

    pub fn menus_invoked(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Menu(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    /// Whether any action or text entry hit a control with this label.
    pub fn touched(&self, label: &str) -> bool {
        self.calls.iter().any(|c| match c {
            Call::Act { spec, .. } | Call::SetText { spec, .. } => spec.label == label,
            _ => false,
        })
    }

    pub fn actions_on(&self, spec: &ControlSpec) -> Vec<Action> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Act { spec: s, action, .. } if s == spec => Some(action.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn texts_set(&self, spec: &ControlSpec) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::SetText { spec: s, text, .. } if s == spec => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn keys_sent(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Keys { .. }))
            .count()
    }

    fn title(&self, window: WindowId) -> String {
        self.titles
            .get(window.0 as usize)
            .cloned()
            .unwrap_or_default()
    }

    fn handle(&self, control: ControlId) -> Result<(String, ControlSpec)> {
        self.located
            .get(control.0 as usize)
            .map(|(w, spec)| (self.title(*w), spec.clone()))
            .ok_or_else(|| DriverError::MatchFailed(format!("stale control {}", control.0)))
    }

    fn take_failure<T: PartialEq>(list: &mut [(T, u32)], hit: impl Fn(&T) -> bool) -> bool {
        for (key, remaining) in list.iter_mut() {
            if *remaining > 0 && hit(key) {
                *remaining -= 1;
                return true;
            }
        }
        false
    }
}

impl UiBackend for FakeUi {
    fn terminate(&mut self, image_name: &str) -> Result<()> {
        self.calls.push(Call::Terminate(image_name.to_string()));
        Ok(())
    }

    fn spawn(&mut self, executable: &Path) -> Result<()> {
        self.calls.push(Call::Spawn(executable.to_path_buf()));
        if self.fail_spawn {
            return Err(DriverError::Launch(format!(
                "cannot execute {}",
                executable.display()
            )));
        }
        Ok(())
    }

    fn find_window(&mut self, query: &WindowQuery) -> Result<WindowId> {
        if Self::take_failure(&mut self.fail_window, |frag| query.matches_fragment(frag)) {
            return Err(DriverError::WindowNotFound(query.to_string()));
        }
        self.titles
            .iter()
            .zip(&self.present)
            .position(|(t, present)| *present && query.matches(t))
            .map(|idx| WindowId(idx as u64))
            .ok_or_else(|| DriverError::WindowNotFound(query.to_string()))
    }

    fn window_exists(&mut self, query: &WindowQuery) -> Result<bool> {
        Ok(self.probe_windows.iter().any(|t| query.matches(t)))
    }

    fn top_window(&mut self) -> Result<WindowId> {
        let title = self
            .top_queue
            .pop_front()
            .unwrap_or_else(|| self.default_top.clone());
        Ok(self.add_window(&title))
    }

    fn window_title(&mut self, window: WindowId) -> Result<String> {
        Ok(self.title(window))
    }

    fn is_ready(&mut self, _window: WindowId) -> Result<bool> {
        if self.not_ready_polls > 0 {
            self.not_ready_polls -= 1;
            return Ok(false);
        }
        Ok(self.ready)
    }

    fn maximize(&mut self, window: WindowId) -> Result<()> {
        let title = self.title(window);
        self.calls.push(Call::Maximize(title));
        Ok(())
    }

    fn menu_item(&mut self, _window: WindowId, path: &str) -> Result<MenuItemState> {
        Ok(self.menus.get(path).cloned().unwrap_or_else(|| MenuItemState {
            enabled: true,
            text: path.rsplit("->").next().unwrap_or(path).to_string(),
        }))
    }

    fn invoke_menu(&mut self, _window: WindowId, path: &str) -> Result<()> {
        self.calls.push(Call::Menu(path.to_string()));
        Ok(())
    }

    fn locate(&mut self, window: WindowId, spec: &ControlSpec) -> Result<ControlId> {
        if Self::take_failure(&mut self.fail_locate, |s| s == spec) {
            return Err(DriverError::ControlNotFound {
                window: self.title(window),
                role: spec.role.to_string(),
                label: spec.label.clone(),
            });
        }
        self.located.push((window, spec.clone()));
        Ok(ControlId((self.located.len() - 1) as u64))
    }

    fn control_exists(&mut self, _window: WindowId, spec: &ControlSpec) -> Result<bool> {
        Ok(match spec.role {
            Role::View => self.views.contains(&spec.label),
            Role::Button if spec.label == "OK" => self.pending_ok > 0,
            _ => self.controls.contains_key(spec),
        })
    }

    fn invoke(&mut self, control: ControlId, action: &Action) -> Result<()> {
        let (window, spec) = self.handle(control)?;
        match action {
            Action::Check => self.control(spec.clone()).checked = true,
            Action::Uncheck => self.control(spec.clone()).checked = false,
            Action::Click if spec.role == Role::CheckBox => {
                let state = self.control(spec.clone());
                state.checked = !state.checked;
            }
            Action::Click if spec.role == Role::Button && spec.label == "OK" => {
                self.pending_ok = self.pending_ok.saturating_sub(1);
            }
            _ => {}
        }
        self.calls.push(Call::Act {
            window,
            spec,
            action: action.clone(),
        });
        Ok(())
    }

    fn read_text(&mut self, control: ControlId) -> Result<Vec<String>> {
        let (_, spec) = self.handle(control)?;
        Ok(self.control(spec).texts.clone())
    }

    fn set_text(&mut self, control: ControlId, text: &str) -> Result<()> {
        let (window, spec) = self.handle(control)?;
        self.control(spec.clone()).texts = vec![text.to_string()];
        self.calls.push(Call::SetText {
            window,
            spec,
            text: text.to_string(),
        });
        Ok(())
    }

    fn item_texts(&mut self, control: ControlId) -> Result<Vec<String>> {
        let (_, spec) = self.handle(control)?;
        Ok(self.control(spec).items.clone())
    }

    fn focused_item(&mut self, control: ControlId) -> Result<Option<usize>> {
        let (_, spec) = self.handle(control)?;
        Ok(self.control(spec).focused_item)
    }

    fn is_checked(&mut self, control: ControlId) -> Result<bool> {
        let (_, spec) = self.handle(control)?;
        Ok(self.control(spec).checked)
    }

    fn send_keys(&mut self, window: WindowId, keys: &str) -> Result<()> {
        let window = self.title(window);
        self.calls.push(Call::Keys {
            window,
            keys: keys.to_string(),
        });
        Ok(())
    }
}

impl WindowQuery {
    fn matches_fragment(&self, fragment: &str) -> bool {
        match self {
            WindowQuery::Exact(t) | WindowQuery::StartsWith(t) | WindowQuery::Contains(t) => {
                t.contains(fragment)
            }
        }
    }
}
