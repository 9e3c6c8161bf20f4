//! **relaydeck-arrange**: opens the configured URL list in browser windows
//! and tiles them over the current monitor.
//!
//! With the `gui-gtk` feature a small window offers open / refresh /
//! arrange / close actions and per-window selection.  Without it the tool
//! opens every URL, waits for the windows, arranges all browser windows and
//! exits.

use log::{error, info};
use relaydeck::arranger::Arranger;
use relaydeck::config::Config;
use relaydeck::logging;
use std::path::Path;

const LOG_FILE: &str = "arranger_log.txt";

#[cfg(unix)]
fn main() {
    use relaydeck::hyprland::wm::HyprlandWm;

    logging::init_or_stderr(Path::new(LOG_FILE));
    info!("relaydeck arranger starting");

    let config = Config::load_or_default();
    let arranger = Arranger::new(HyprlandWm::new(), config.arranger);
    if let Err(e) = run(arranger) {
        error!("{}", e);
        std::process::exit(1);
    }
    info!("relaydeck arranger exiting");
}

#[cfg(not(unix))]
fn main() {
    logging::init_or_stderr(Path::new(LOG_FILE));
    error!("no window manager backend for this platform");
    std::process::exit(1);
}

#[cfg(all(unix, feature = "gui-gtk"))]
fn run<W>(arranger: Arranger<W>) -> Result<(), Box<dyn std::error::Error>>
where
    W: relaydeck::traits::WindowManager + Send + 'static,
{
    relaydeck::ui::arranger::run_arranger(arranger)?;
    Ok(())
}

#[cfg(all(unix, not(feature = "gui-gtk")))]
fn run<W>(mut arranger: Arranger<W>) -> Result<(), Box<dyn std::error::Error>>
where
    W: relaydeck::traits::WindowManager,
{
    use relaydeck::arranger::launcher::{load_urls, resolve_browser, ProcessLauncher};
    use relaydeck::config::config_dir;

    let path = arranger.config().url_file_in(&config_dir());
    let urls = load_urls(&path)?;
    if urls.is_empty() {
        info!("no URLs in {}, nothing to open", path.display());
    } else {
        let browser = resolve_browser(arranger.config().browser_path.as_deref())?;
        let opened = arranger.open_urls(&ProcessLauncher::new(browser), &urls)?;
        info!("opened {} of {} window(s)", opened, urls.len());
    }
    arranger.refresh()?;
    let placed = arranger.arrange()?;
    info!("arranged {} window(s)", placed);
    Ok(())
}
