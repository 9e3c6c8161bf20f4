//! **relaydeck**: a desktop control panel that relays commands to browser
//! extension clients over WebSocket, plus a browser grid arranger.
//!
//! Each client connects to the local relay, registers a product identifier
//! and then receives the `start`, `stop` and `apply_settings` commands the
//! operator broadcasts, together with its own per-product parameters.
//!
//! # Architecture
//!
//! * [`relay`]: the WebSocket server, running on its own thread with a
//!   single-threaded tokio runtime.  It owns the
//!   [`ConnectionRegistry`](relay::ConnectionRegistry) and fans commands out
//!   to every registered client.
//! * [`panel`]: the toolkit-independent control panel model (product cards,
//!   command assembly, status text), fed by [`traits::PanelEvent`]s.
//! * [`arranger`]: opens URL lists in browser windows and tiles them,
//!   talking to the desktop only through [`traits::WindowManager`] and
//!   [`traits::Launcher`].
//! * [`ui`]: GTK4 windows for both (feature `gui-gtk`).
//!
//! Concrete desktop integration lives in [`hyprland`].

pub mod arranger;
pub mod config;
#[cfg(unix)]
pub mod hyprland;
pub mod logging;
pub mod panel;
pub mod params;
pub mod protocol;
pub mod relay;
pub mod traits;
#[cfg(feature = "gui-gtk")]
pub mod ui;
