//! Capability interface over the external application's window system.
//!
//! The driver never talks to the window manager directly. Everything goes
//! through [`UiBackend`]: window lookup, menu state, and control operations
//! addressed by role and label. Production runs use [`BridgeBackend`], which
//! forwards each call to an automation host process; tests use a scripted fake.

mod bridge;
#[cfg(test)]
pub(crate) mod fake;

pub use bridge::{BridgeBackend, HostCommand};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Opaque window handle issued by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u64);

/// Opaque control handle issued by [`UiBackend::locate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlId(pub u64);

/// How a top-level window is matched by title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match", content = "title", rename_all = "snake_case")]
pub enum WindowQuery {
    Exact(String),
    StartsWith(String),
    Contains(String),
}

impl WindowQuery {
    pub fn exact(title: impl Into<String>) -> Self {
        WindowQuery::Exact(title.into())
    }

    pub fn starts_with(prefix: impl Into<String>) -> Self {
        WindowQuery::StartsWith(prefix.into())
    }

    pub fn contains(fragment: impl Into<String>) -> Self {
        WindowQuery::Contains(fragment.into())
    }

    pub fn matches(&self, title: &str) -> bool {
        match self {
            WindowQuery::Exact(t) => title == t,
            WindowQuery::StartsWith(p) => title.starts_with(p.as_str()),
            WindowQuery::Contains(f) => title.contains(f.as_str()),
        }
    }
}

impl fmt::Display for WindowQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowQuery::Exact(t) => write!(f, "{t:?}"),
            WindowQuery::StartsWith(p) => write!(f, "{p:?}*"),
            WindowQuery::Contains(s) => write!(f, "*{s:?}*"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Button,
    CheckBox,
    RadioButton,
    ComboBox,
    Edit,
    ListBox,
    Static,
    /// MDI child frame showing an output table or graphic.
    View,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A control addressed by role and visible label, e.g. `Edit "X (nmi)"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlSpec {
    pub role: Role,
    pub label: String,
}

impl ControlSpec {
    pub fn new(role: Role, label: impl Into<String>) -> Self {
        Self {
            role,
            label: label.into(),
        }
    }

    pub fn button(label: impl Into<String>) -> Self {
        Self::new(Role::Button, label)
    }

    pub fn check_box(label: impl Into<String>) -> Self {
        Self::new(Role::CheckBox, label)
    }

    pub fn radio(label: impl Into<String>) -> Self {
        Self::new(Role::RadioButton, label)
    }

    pub fn combo(label: impl Into<String>) -> Self {
        Self::new(Role::ComboBox, label)
    }

    pub fn edit(label: impl Into<String>) -> Self {
        Self::new(Role::Edit, label)
    }

    /// The unlabeled list box of a dialog.
    pub fn list_box() -> Self {
        Self::new(Role::ListBox, "")
    }

    pub fn list_box_labeled(label: impl Into<String>) -> Self {
        Self::new(Role::ListBox, label)
    }

    pub fn view(title: impl Into<String>) -> Self {
        Self::new(Role::View, title)
    }
}

impl fmt::Display for ControlSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.role, self.label)
    }
}

/// Something done to a located control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "arg", rename_all = "snake_case")]
pub enum Action {
    Click,
    Focus,
    Check,
    Uncheck,
    SelectIndex(usize),
    SelectText(String),
}

/// State of a menu item on the main window's menu bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemState {
    pub enabled: bool,
    pub text: String,
}

/// Primitive operations on the external application.
///
/// Lookups that find nothing return [`crate::error::DriverError::WindowNotFound`]
/// or [`crate::error::DriverError::ControlNotFound`]; the driver treats those as
/// transient. Probes (`window_exists`, `control_exists`) answer immediately and
/// leave polling to the caller.
pub trait UiBackend {
    /// Force-terminate every process with this image name. Not an error if none runs.
    fn terminate(&mut self, image_name: &str) -> Result<()>;

    fn spawn(&mut self, executable: &Path) -> Result<()>;

    fn find_window(&mut self, query: &WindowQuery) -> Result<WindowId>;

    fn window_exists(&mut self, query: &WindowQuery) -> Result<bool>;

    /// The foreground window of the application (usually the active dialog).
    fn top_window(&mut self) -> Result<WindowId>;

    fn window_title(&mut self, window: WindowId) -> Result<String>;

    /// Whether the window is visible, enabled and not blocked by a modal dialog.
    fn is_ready(&mut self, window: WindowId) -> Result<bool>;

    fn maximize(&mut self, window: WindowId) -> Result<()>;

    /// Menu item addressed by a `->` separated path, e.g. `File->Open Study...`.
    fn menu_item(&mut self, window: WindowId, path: &str) -> Result<MenuItemState>;

    fn invoke_menu(&mut self, window: WindowId, path: &str) -> Result<()>;

    fn locate(&mut self, window: WindowId, spec: &ControlSpec) -> Result<ControlId>;

    fn control_exists(&mut self, window: WindowId, spec: &ControlSpec) -> Result<bool>;

    fn invoke(&mut self, control: ControlId, action: &Action) -> Result<()>;

    /// Texts of the control; for a combo box the first entry is the current selection.
    fn read_text(&mut self, control: ControlId) -> Result<Vec<String>>;

    fn set_text(&mut self, control: ControlId, text: &str) -> Result<()>;

    fn item_texts(&mut self, control: ControlId) -> Result<Vec<String>>;

    fn focused_item(&mut self, control: ControlId) -> Result<Option<usize>>;

    fn is_checked(&mut self, control: ControlId) -> Result<bool>;

    /// Send keystrokes to the window, in pywinauto/SendKeys notation (`{ENTER}`).
    fn send_keys(&mut self, window: WindowId, keys: &str) -> Result<()>;
}
