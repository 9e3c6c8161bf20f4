//! [`WindowManager`] implementation backed by Hyprland IPC.
//!
//! Communicates directly with Hyprland through its Unix socket at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket.sock`.
//! Windows are addressed by their Hyprland address (`0x…`).

use crate::arranger::layout::{Rect, WorkArea};
use crate::traits::{WindowInfo, WindowManager, WindowState};
use serde::Deserialize;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

/// Hyprland-backed window manager.
///
/// No connection is held; each call opens a short-lived IPC request.
#[derive(Debug, Clone, Copy, Default)]
pub struct HyprlandWm;

/// Errors that can occur when talking to Hyprland.
#[derive(Debug, thiserror::Error)]
#[error("hyprland IPC error: {0}")]
pub struct HyprlandWmError(String);

impl HyprlandWm {
    pub fn new() -> Self {
        Self
    }
}

fn socket_path() -> Result<PathBuf, HyprlandWmError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .map_err(|_| HyprlandWmError("XDG_RUNTIME_DIR not set".into()))?;
    let his = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
        .map_err(|_| HyprlandWmError("HYPRLAND_INSTANCE_SIGNATURE not set".into()))?;
    Ok(PathBuf::from(format!(
        "{}/hypr/{}/.socket.sock",
        runtime_dir, his
    )))
}

fn ipc_request(command: &str) -> Result<String, HyprlandWmError> {
    let path = socket_path()?;
    let mut stream = UnixStream::connect(&path)
        .map_err(|e| HyprlandWmError(format!("connect to {}: {}", path.display(), e)))?;
    stream
        .write_all(command.as_bytes())
        .map_err(|e| HyprlandWmError(format!("write: {}", e)))?;

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .map_err(|e| HyprlandWmError(format!("read: {}", e)))?;
    String::from_utf8(response).map_err(|e| HyprlandWmError(format!("utf-8: {}", e)))
}

fn ipc_json(data_command: &str) -> Result<String, HyprlandWmError> {
    ipc_request(&format!("j/{}", data_command))
}

/// Send a dispatch and check for `"ok"`.
fn ipc_dispatch(args: &str) -> Result<(), HyprlandWmError> {
    log::debug!("dispatch {}", args);
    let response = ipc_request(&format!("/dispatch {}", args))?;
    if response.trim() == "ok" {
        Ok(())
    } else {
        Err(HyprlandWmError(format!("dispatch {}: {}", args, response.trim())))
    }
}

// Subsets of the JSON returned by `j/clients` and `j/monitors`.

/// `fullscreen` is a bool on older Hyprland releases and a mode number on
/// newer ones.
#[derive(Deserialize)]
#[serde(untagged)]
enum FullscreenJson {
    Flag(bool),
    Mode(i64),
}

impl FullscreenJson {
    fn is_set(&self) -> bool {
        match self {
            Self::Flag(b) => *b,
            Self::Mode(m) => *m != 0,
        }
    }
}

#[derive(Deserialize)]
struct ClientJson {
    address: String,
    title: String,
    #[serde(default = "default_true")]
    mapped: bool,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    fullscreen: Option<FullscreenJson>,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct MonitorJson {
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    #[serde(default = "default_scale")]
    scale: f64,
    /// `[left, top, right, bottom]` space taken by bars.
    #[serde(default)]
    reserved: [i32; 4],
    #[serde(default)]
    focused: bool,
}

fn default_scale() -> f64 {
    1.0
}

fn parse_clients(json: &str) -> Result<Vec<WindowInfo>, HyprlandWmError> {
    let clients: Vec<ClientJson> =
        serde_json::from_str(json).map_err(|e| HyprlandWmError(format!("parse: {}", e)))?;
    Ok(clients
        .into_iter()
        .filter(|c| c.mapped)
        .map(|c| {
            let state = if c.hidden {
                WindowState::Minimized
            } else if c.fullscreen.as_ref().is_some_and(FullscreenJson::is_set) {
                WindowState::Maximized
            } else {
                WindowState::Normal
            };
            WindowInfo {
                address: c.address,
                title: c.title,
                state,
            }
        })
        .collect())
}

/// Logical work area of the focused monitor (first monitor if none is
/// focused), minus reserved edges.
fn parse_work_area(json: &str) -> Result<WorkArea, HyprlandWmError> {
    let monitors: Vec<MonitorJson> =
        serde_json::from_str(json).map_err(|e| HyprlandWmError(format!("parse: {}", e)))?;
    let m = monitors
        .iter()
        .find(|m| m.focused)
        .or_else(|| monitors.first())
        .ok_or_else(|| HyprlandWmError("no monitors".into()))?;

    let scale = if m.scale > 0.0 { m.scale } else { 1.0 };
    let width = (m.width as f64 / scale).round() as i32;
    let height = (m.height as f64 / scale).round() as i32;
    let [left, top, right, bottom] = m.reserved;
    Ok(WorkArea {
        x: m.x + left,
        y: m.y + top,
        width: (width - left - right).max(1),
        height: (height - top - bottom).max(1),
    })
}

impl WindowManager for HyprlandWm {
    type Error = HyprlandWmError;

    fn windows(&self) -> Result<Vec<WindowInfo>, Self::Error> {
        parse_clients(&ipc_json("clients")?)
    }

    fn work_area(&self) -> Result<WorkArea, Self::Error> {
        parse_work_area(&ipc_json("monitors")?)
    }

    fn restore(&self, window: &WindowInfo) -> Result<(), Self::Error> {
        match window.state {
            WindowState::Normal => Ok(()),
            // Hidden windows live on a special workspace; pull them onto the
            // active one.
            WindowState::Minimized => ipc_dispatch(&format!(
                "movetoworkspacesilent e+0,address:{}",
                window.address
            )),
            WindowState::Maximized => {
                ipc_dispatch(&format!("focuswindow address:{}", window.address))?;
                ipc_dispatch("fullscreenstate 0 0")
            }
        }
    }

    fn move_resize(&self, window: &WindowInfo, rect: Rect) -> Result<(), Self::Error> {
        let addr = &window.address;
        // Tiled windows ignore exact placement.
        ipc_dispatch(&format!("setfloating address:{}", addr))?;
        ipc_dispatch(&format!(
            "resizewindowpixel exact {} {},address:{}",
            rect.width, rect.height, addr
        ))?;
        ipc_dispatch(&format!(
            "movewindowpixel exact {} {},address:{}",
            rect.x, rect.y, addr
        ))
    }

    fn activate(&self, window: &WindowInfo) -> Result<(), Self::Error> {
        ipc_dispatch(&format!("focuswindow address:{}", window.address))
    }

    fn close(&self, window: &WindowInfo) -> Result<(), Self::Error> {
        ipc_dispatch(&format!("closewindow address:{}", window.address))
    }
}
