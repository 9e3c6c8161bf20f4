//! GTK4 front-ends for the control panel and the browser grid arranger.
//!
//! Both windows run on the **main thread** inside a GLib main loop.  Work
//! that happens elsewhere (the relay thread, window launching) reports back
//! over `std::sync::mpsc` channels that the loop polls with
//! `glib::timeout_add_local`; no widget is touched off the main thread.
//!
//! # CSS selectors
//!
//! | Selector         | Targets                                   |
//! |------------------|-------------------------------------------|
//! | `.globals`       | Global settings row                       |
//! | `.clock`         | Live clock label                          |
//! | `.product-card`  | One frame per connected client            |
//! | `.image-url`     | Image URL label inside a card             |
//! | `.status`        | Status bar label (both windows)           |
//!
//! A user stylesheet at `$XDG_CONFIG_HOME/relaydeck/style.css` replaces the
//! built-in one.

pub mod arranger;
pub mod panel;

use gtk4::gdk;
use log::{info, warn};
use std::path::Path;

const DEFAULT_CSS: &str = r#"
.globals {
    padding: 8px;
}

.clock {
    font-family: monospace;
    font-size: 1.4em;
    font-weight: bold;
}

.product-card {
    padding: 6px;
    margin: 4px;
}

.product-card textview {
    min-height: 72px;
}

.image-url {
    font-size: 0.8em;
    opacity: 0.7;
}

.status {
    padding: 4px 8px;
    border-top: 1px solid alpha(currentColor, 0.2);
}
"#;

/// Register the user stylesheet if present, the built-in one otherwise.
pub fn load_css(css_path: &Path) {
    let provider = gtk4::CssProvider::new();

    let css_content = if css_path.exists() {
        match std::fs::read_to_string(css_path) {
            Ok(content) => {
                info!("user CSS: {} ({} bytes)", css_path.display(), content.len());
                content
            }
            Err(e) => {
                warn!("CSS read failed ({}): {}; using built-in", css_path.display(), e);
                DEFAULT_CSS.to_string()
            }
        }
    } else {
        DEFAULT_CSS.to_string()
    };

    #[allow(deprecated)]
    provider.load_from_data(&css_content);

    match gdk::Display::default() {
        Some(display) => gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        ),
        None => warn!("no GDK display; CSS will not be applied"),
    }
}
