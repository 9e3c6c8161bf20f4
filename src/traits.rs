//! Traits and events that decouple relaydeck from any specific window
//! manager, process launcher or GUI toolkit.
//!
//! The relay only talks to the GUI through [`PanelEvent`]s, and the
//! [`Arranger`](crate::arranger::Arranger) only talks to the desktop through
//! [`WindowManager`] and [`Launcher`].

use crate::arranger::layout::{Rect, WorkArea};
use crate::protocol::CommandKind;
use std::net::SocketAddr;

/// Window state relevant to tiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowState {
    #[default]
    Normal,
    Minimized,
    Maximized,
}

/// A top-level window as reported by the window manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    /// Opaque handle meaningful to the window manager.
    pub address: String,
    pub title: String,
    pub state: WindowState,
}

/// Abstraction over a window manager that can enumerate and place windows.
///
/// An implementation might talk to Hyprland via IPC, or it might be a
/// recording stub used in tests.
pub trait WindowManager {
    /// The error type produced by this window manager.
    type Error: std::error::Error + Send + 'static;

    /// Every top-level window currently known.
    fn windows(&self) -> Result<Vec<WindowInfo>, Self::Error>;

    /// The usable area of the primary (or focused) monitor, excluding
    /// panels and docks.
    fn work_area(&self) -> Result<WorkArea, Self::Error>;

    /// Bring a minimized or maximized window back to a normal, movable state.
    fn restore(&self, window: &WindowInfo) -> Result<(), Self::Error>;

    /// Place `window` exactly at `rect`.
    fn move_resize(&self, window: &WindowInfo, rect: Rect) -> Result<(), Self::Error>;

    /// Raise and focus `window`.
    fn activate(&self, window: &WindowInfo) -> Result<(), Self::Error>;

    /// Ask `window` to close.
    fn close(&self, window: &WindowInfo) -> Result<(), Self::Error>;
}

/// Something that can open a URL in a new browser window.
pub trait Launcher {
    fn launch(&self, url: &str) -> std::io::Result<()>;
}

/// Notifications sent from the relay's network thread to the GUI thread
/// over an [`mpsc`](std::sync::mpsc) channel.
///
/// The GUI drains these on its own loop; nothing on the network side ever
/// touches widget state.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    /// The listener is bound and accepting connections.
    Listening { addr: SocketAddr },
    /// A client registered under `identifier`.
    ClientAdded {
        identifier: String,
        image_url: Option<String>,
        clients: usize,
    },
    /// The client registered under `identifier` went away.
    ClientRemoved { identifier: String, clients: usize },
    /// A broadcast was handed to `attempted` connections.
    Broadcasted { kind: CommandKind, attempted: usize },
    /// The relay stopped; `error` is set if it died rather than shut down.
    RelayStopped { error: Option<String> },
}
