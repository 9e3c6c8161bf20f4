//! Entry point for the **relaydeck** control panel.
//!
//! Starts the WebSocket relay on its own thread, then runs the control
//! panel on the main thread.
//!
//! When the `gui-gtk` feature is enabled the main thread runs the GLib main
//! loop (GTK4 requires it).  Without the feature, the relay's events are
//! logged by a simple blocking loop instead, which is enough to watch
//! clients come and go.

use log::{error, info};
use relaydeck::config::Config;
use relaydeck::logging;
use relaydeck::relay::{RelayHandle, RelayServer};
use relaydeck::traits::PanelEvent;
use std::path::Path;
use std::sync::mpsc;

const LOG_FILE: &str = "control_panel_log.txt";

fn main() {
    logging::init_or_stderr(Path::new(LOG_FILE));
    info!("relaydeck control panel starting");

    let config = Config::load_or_default();

    let (event_tx, event_rx) = mpsc::channel::<PanelEvent>();
    let mut server = RelayServer::new(config.relay.clone());
    server.set_notifier(event_tx);

    let (relay, startup_error) = match server.spawn() {
        Ok(handle) => {
            info!("relay bound to {}", handle.local_addr());
            (Some(handle), None)
        }
        Err(e) => {
            error!("failed to start relay on {}: {}", config.relay.listen, e);
            (None, Some(e.to_string()))
        }
    };

    start_event_loop(&config, relay, event_rx, startup_error);
    info!("relaydeck control panel exiting");
}

#[cfg(feature = "gui-gtk")]
fn start_event_loop(
    config: &Config,
    relay: Option<RelayHandle>,
    events: mpsc::Receiver<PanelEvent>,
    startup_error: Option<String>,
) {
    if let Err(e) = relaydeck::ui::panel::run_panel(config, relay, events, startup_error) {
        error!("failed to initialise GTK4: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "gui-gtk"))]
fn start_event_loop(
    _config: &Config,
    relay: Option<RelayHandle>,
    events: mpsc::Receiver<PanelEvent>,
    startup_error: Option<String>,
) {
    if let Some(e) = startup_error {
        error!("relay not running: {}", e);
        std::process::exit(1);
    }
    info!("running headless; relay events follow");
    // Keep the relay alive while its events are drained.
    let _relay = relay;
    for event in events {
        info!("relay event: {:?}", event);
        if matches!(event, PanelEvent::RelayStopped { .. }) {
            break;
        }
    }
}
