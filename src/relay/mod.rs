//! WebSocket relay between the control panel and browser-extension clients.
//!
//! Clients connect, announce a product identifier, and from then on
//! receive every command the operator broadcasts.

pub mod broadcast;
pub mod connection;
pub mod registry;
pub mod server;

pub use broadcast::broadcast;
pub use connection::{ClientHandle, ConnectionId, SendError};
pub use registry::{ConnectionRegistry, RegisterError};
pub use server::{RelayCommand, RelayError, RelayHandle, RelayServer};
