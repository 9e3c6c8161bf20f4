//! Hyprland-specific implementations.
//!
//! This module provides the concrete backend for the
//! [`WindowManager`](crate::traits::WindowManager) trait used by the browser
//! grid arranger, powered by Hyprland's IPC socket.
//!
//! Nothing outside this module should reference Hyprland directly.

pub mod wm;
