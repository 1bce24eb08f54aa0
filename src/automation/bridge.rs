//! Automation host bridge.
//!
//! The live window manager is only reachable from a Windows automation host.
//! The bridge spawns that host once and exchanges one JSON object per line
//! over its stdin/stdout:
//!
//! ```text
//! -> {"op":"locate","window":3,"spec":{"role":"Edit","label":"X (nmi)"}}
//! <- {"ok":true,"value":17}
//! <- {"ok":false,"kind":"not_found","message":"no Edit labelled 'X (nmi)'"}
//! ```
//!
//! The pywinauto host in `host/inm_host.py` is compiled into the binary and
//! run with `python -c` unless the configuration names another host.

use super::{Action, ControlId, ControlSpec, MenuItemState, UiBackend, WindowId, WindowQuery};
use crate::error::{DriverError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Source of the pywinauto automation host.
pub const BUNDLED_HOST: &str = include_str!("../../host/inm_host.py");

/// Command line of the automation host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostCommand {
    pub program: PathBuf,
    /// Arguments of `program`; when empty, `program` is a Python interpreter
    /// and runs the bundled host.
    pub args: Vec<String>,
    /// Longest wait for the answer to a single request.
    #[serde(with = "humantime_serde")]
    pub reply_timeout: Duration,
}

impl Default for HostCommand {
    fn default() -> Self {
        Self {
            program: PathBuf::from("python"),
            args: Vec::new(),
            reply_timeout: Duration::from_secs(60),
        }
    }
}

impl HostCommand {
    fn command_args(&self) -> Vec<String> {
        if self.args.is_empty() {
            vec!["-u".to_string(), "-c".to_string(), BUNDLED_HOST.to_string()]
        } else {
            self.args.clone()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request<'a> {
    Terminate { image_name: &'a str },
    Spawn { executable: &'a Path },
    FindWindow { query: &'a WindowQuery },
    WindowExists { query: &'a WindowQuery },
    TopWindow,
    WindowTitle { window: WindowId },
    IsReady { window: WindowId },
    Maximize { window: WindowId },
    MenuItem { window: WindowId, path: &'a str },
    InvokeMenu { window: WindowId, path: &'a str },
    Locate { window: WindowId, spec: &'a ControlSpec },
    ControlExists { window: WindowId, spec: &'a ControlSpec },
    Invoke { control: ControlId, action: &'a Action },
    ReadText { control: ControlId },
    SetText { control: ControlId, text: &'a str },
    ItemTexts { control: ControlId },
    FocusedItem { control: ControlId },
    IsChecked { control: ControlId },
    SendKeys { window: WindowId, keys: &'a str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum FailureKind {
    NotFound,
    MatchFailed,
    Failed,
}

#[derive(Debug, Deserialize)]
struct Response {
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    kind: Option<FailureKind>,
    #[serde(default)]
    message: String,
}

/// Failure reported by the host, before it is given lookup context.
#[derive(Debug)]
enum CallError {
    Host { kind: FailureKind, message: String },
    Driver(DriverError),
}

impl CallError {
    /// Map to a driver error; `not_found` builds the error for a failed lookup.
    fn into_driver(self, not_found: impl FnOnce(String) -> DriverError) -> DriverError {
        match self {
            CallError::Host {
                kind: FailureKind::NotFound,
                message,
            } => not_found(message),
            CallError::Host {
                kind: FailureKind::MatchFailed,
                message,
            } => DriverError::MatchFailed(message),
            CallError::Host {
                kind: FailureKind::Failed,
                message,
            } => DriverError::Backend(message),
            CallError::Driver(e) => e,
        }
    }

    /// For calls on an already located handle, a lookup failure means the handle went stale.
    fn stale(self) -> DriverError {
        self.into_driver(DriverError::MatchFailed)
    }
}

impl From<DriverError> for CallError {
    fn from(e: DriverError) -> Self {
        CallError::Driver(e)
    }
}

fn decode_response<T: DeserializeOwned>(line: &str) -> std::result::Result<T, CallError> {
    let resp: Response = serde_json::from_str(line.trim())
        .map_err(|e| DriverError::Protocol(format!("bad response {line:?}: {e}")))?;
    if !resp.ok {
        return Err(CallError::Host {
            kind: resp.kind.unwrap_or(FailureKind::Failed),
            message: resp.message,
        });
    }
    serde_json::from_value(resp.value)
        .map_err(|e| CallError::Driver(DriverError::Protocol(format!("bad value: {e}"))))
}

/// [`UiBackend`] that forwards every call to an automation host subprocess.
pub struct BridgeBackend {
    child: Child,
    stdin: ChildStdin,
    replies: Receiver<io::Result<String>>,
    reply_timeout: Duration,
    /// Set once a reply is overdue; a late answer would be taken for the next request's.
    stalled: bool,
}

impl BridgeBackend {
    pub fn start(cmd: &HostCommand) -> Result<Self> {
        debug!(program = %cmd.program.display(), custom_args = !cmd.args.is_empty(), "starting automation host");
        let mut child = Command::new(&cmd.program)
            .args(cmd.command_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                DriverError::Launch(format!(
                    "cannot start automation host {}: {e}",
                    cmd.program.display()
                ))
            })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DriverError::Protocol("host stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DriverError::Protocol("host stdout not captured".into()))?;

        let (tx, replies) = mpsc::channel();
        thread::Builder::new()
            .name("inm-host-reader".into())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            child,
            stdin,
            replies,
            reply_timeout: cmd.reply_timeout,
            stalled: false,
        })
    }

    fn call<T: DeserializeOwned>(&mut self, req: &Request<'_>) -> std::result::Result<T, CallError> {
        if self.stalled {
            return Err(DriverError::Protocol("automation host stopped answering".into()).into());
        }
        let request = serde_json::to_value(req)
            .map_err(|e| DriverError::Protocol(format!("cannot encode request: {e}")))?;
        let op = request["op"].as_str().unwrap_or("request").to_string();
        debug!(%request, "host call");
        writeln!(self.stdin, "{request}").map_err(DriverError::from)?;
        self.stdin.flush().map_err(DriverError::from)?;

        match self.replies.recv_timeout(self.reply_timeout) {
            Ok(line) => decode_response(&line.map_err(DriverError::from)?),
            Err(RecvTimeoutError::Timeout) => {
                self.stalled = true;
                Err(DriverError::Timeout {
                    what: format!("automation host reply to {op}"),
                    waited: self.reply_timeout,
                }
                .into())
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(DriverError::Protocol("automation host closed its output".into()).into())
            }
        }
    }
}

impl Drop for BridgeBackend {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            warn!("failed to stop automation host: {e}");
        }
        if let Err(e) = self.child.wait() {
            warn!("failed to reap automation host: {e}");
        }
    }
}

impl UiBackend for BridgeBackend {
    fn terminate(&mut self, image_name: &str) -> Result<()> {
        self.call(&Request::Terminate { image_name })
            .map_err(CallError::stale)
    }

    fn spawn(&mut self, executable: &Path) -> Result<()> {
        self.call(&Request::Spawn { executable })
            .map_err(|e| e.into_driver(DriverError::Launch))
    }

    fn find_window(&mut self, query: &WindowQuery) -> Result<WindowId> {
        self.call(&Request::FindWindow { query })
            .map_err(|e| e.into_driver(|_| DriverError::WindowNotFound(query.to_string())))
    }

    fn window_exists(&mut self, query: &WindowQuery) -> Result<bool> {
        self.call(&Request::WindowExists { query })
            .map_err(CallError::stale)
    }

    fn top_window(&mut self) -> Result<WindowId> {
        self.call(&Request::TopWindow)
            .map_err(|e| e.into_driver(DriverError::WindowNotFound))
    }

    fn window_title(&mut self, window: WindowId) -> Result<String> {
        self.call(&Request::WindowTitle { window })
            .map_err(CallError::stale)
    }

    fn is_ready(&mut self, window: WindowId) -> Result<bool> {
        self.call(&Request::IsReady { window })
            .map_err(CallError::stale)
    }

    fn maximize(&mut self, window: WindowId) -> Result<()> {
        self.call(&Request::Maximize { window })
            .map_err(CallError::stale)
    }

    fn menu_item(&mut self, window: WindowId, path: &str) -> Result<MenuItemState> {
        self.call(&Request::MenuItem { window, path })
            .map_err(|e| e.into_driver(|_| DriverError::MatchFailed(format!("menu item {path}"))))
    }

    fn invoke_menu(&mut self, window: WindowId, path: &str) -> Result<()> {
        self.call(&Request::InvokeMenu { window, path })
            .map_err(|e| e.into_driver(|_| DriverError::MatchFailed(format!("menu item {path}"))))
    }

    fn locate(&mut self, window: WindowId, spec: &ControlSpec) -> Result<ControlId> {
        self.call(&Request::Locate { window, spec }).map_err(|e| {
            e.into_driver(|message| DriverError::ControlNotFound {
                window: message,
                role: spec.role.to_string(),
                label: spec.label.clone(),
            })
        })
    }

    fn control_exists(&mut self, window: WindowId, spec: &ControlSpec) -> Result<bool> {
        self.call(&Request::ControlExists { window, spec })
            .map_err(CallError::stale)
    }

    fn invoke(&mut self, control: ControlId, action: &Action) -> Result<()> {
        self.call(&Request::Invoke { control, action })
            .map_err(CallError::stale)
    }

    fn read_text(&mut self, control: ControlId) -> Result<Vec<String>> {
        self.call(&Request::ReadText { control })
            .map_err(CallError::stale)
    }

    fn set_text(&mut self, control: ControlId, text: &str) -> Result<()> {
        self.call(&Request::SetText { control, text })
            .map_err(CallError::stale)
    }

    fn item_texts(&mut self, control: ControlId) -> Result<Vec<String>> {
        self.call(&Request::ItemTexts { control })
            .map_err(CallError::stale)
    }

    fn focused_item(&mut self, control: ControlId) -> Result<Option<usize>> {
        self.call(&Request::FocusedItem { control })
            .map_err(CallError::stale)
    }

    fn is_checked(&mut self, control: ControlId) -> Result<bool> {
        self.call(&Request::IsChecked { control })
            .map_err(CallError::stale)
    }

    fn send_keys(&mut self, window: WindowId, keys: &str) -> Result<()> {
        self.call(&Request::SendKeys { window, keys })
            .map_err(CallError::stale)
    }
}
