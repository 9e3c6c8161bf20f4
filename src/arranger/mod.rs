//! Browser grid arranger.
//!
//! Opens a list of URLs in separate browser windows and tiles the browser
//! windows over the work area of the current monitor.  All desktop access
//! goes through a [`WindowManager`] and a [`Launcher`], so the whole flow can
//! be driven by mocks.

pub mod launcher;
pub mod layout;

use crate::config::ArrangerConfig;
use crate::traits::{Launcher, WindowInfo, WindowManager, WindowState};
use log::{info, warn};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Errors from the arranger.  Per-window failures are logged, not returned.
#[derive(Debug, thiserror::Error)]
pub enum ArrangerError {
    #[error("cannot read URL file {}: {source}", path.display())]
    UrlFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no browser executable found")]
    BrowserNotFound,
    #[error("URL list is empty")]
    NoUrls,
    #[error("no browser window could be launched")]
    NothingLaunched,
    #[error("window manager: {0}")]
    WindowManager(String),
}

fn wm_error(e: impl std::error::Error) -> ArrangerError {
    ArrangerError::WindowManager(e.to_string())
}

/// Detected browser windows, their selection, and the windows this
/// arranger opened itself.
pub struct Arranger<W: WindowManager> {
    wm: W,
    config: ArrangerConfig,
    windows: Vec<WindowInfo>,
    selected: Vec<bool>,
    opened: Vec<String>,
}

impl<W: WindowManager> Arranger<W> {
    pub fn new(wm: W, config: ArrangerConfig) -> Self {
        Self {
            wm,
            config,
            windows: Vec::new(),
            selected: Vec::new(),
            opened: Vec::new(),
        }
    }

    pub fn config(&self) -> &ArrangerConfig {
        &self.config
    }

    /// Browser windows found by the last [`refresh`](Self::refresh).
    pub fn windows(&self) -> &[WindowInfo] {
        &self.windows
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    pub fn set_selected(&mut self, index: usize, selected: bool) {
        if let Some(s) = self.selected.get_mut(index) {
            *s = selected;
        }
    }

    /// Addresses of windows opened by [`open_urls`](Self::open_urls) and not
    /// yet closed.
    pub fn opened(&self) -> &[String] {
        &self.opened
    }

    fn is_browser(&self, window: &WindowInfo) -> bool {
        self.config
            .browser_titles
            .iter()
            .any(|marker| window.title.contains(marker.as_str()))
    }

    fn browser_windows(&self) -> Result<Vec<WindowInfo>, ArrangerError> {
        Ok(self
            .wm
            .windows()
            .map_err(wm_error)?
            .into_iter()
            .filter(|w| self.is_browser(w))
            .collect())
    }

    /// Re-enumerate browser windows.  Every detected window starts selected.
    pub fn refresh(&mut self) -> Result<usize, ArrangerError> {
        self.windows = self.browser_windows()?;
        self.selected = vec![true; self.windows.len()];
        info!("detected {} browser window(s)", self.windows.len());
        Ok(self.windows.len())
    }

    /// Open each URL in a new browser window and wait for the windows to
    /// appear.  Returns the number of new windows seen before the timeout.
    pub fn open_urls<L: Launcher>(
        &mut self,
        launcher: &L,
        urls: &[String],
    ) -> Result<usize, ArrangerError> {
        if urls.is_empty() {
            return Err(ArrangerError::NoUrls);
        }
        let before: HashSet<String> = self
            .browser_windows()?
            .into_iter()
            .map(|w| w.address)
            .collect();

        let mut launched = 0;
        for url in urls {
            match launcher.launch(url) {
                Ok(()) => {
                    info!("opening {}", url);
                    launched += 1;
                }
                Err(e) => warn!("failed to open {}: {}", url, e),
            }
        }
        if launched == 0 {
            return Err(ArrangerError::NothingLaunched);
        }

        let timeout = Duration::from_millis(self.config.launch_timeout_ms);
        let poll = Duration::from_millis(self.config.poll_interval_ms);
        let deadline = Instant::now() + timeout;
        let new_windows = loop {
            let fresh: Vec<String> = self
                .browser_windows()?
                .into_iter()
                .map(|w| w.address)
                .filter(|a| !before.contains(a))
                .collect();
            if fresh.len() >= launched || Instant::now() >= deadline {
                break fresh;
            }
            std::thread::sleep(poll);
        };

        if new_windows.len() < launched {
            warn!(
                "only {}/{} browser window(s) appeared within {:?}",
                new_windows.len(),
                launched,
                timeout
            );
        }
        let count = new_windows.len();
        self.opened.extend(new_windows);
        self.refresh()?;
        Ok(count)
    }

    /// Close every window opened by this arranger that still exists.
    pub fn close_opened(&mut self) -> Result<usize, ArrangerError> {
        let current = self.wm.windows().map_err(wm_error)?;
        let mut closed = 0;
        for address in self.opened.drain(..) {
            let Some(window) = current.iter().find(|w| w.address == address) else {
                continue;
            };
            match self.wm.close(window) {
                Ok(()) => closed += 1,
                Err(e) => warn!("failed to close {}: {}", window.title, e),
            }
        }
        info!("closed {} window(s)", closed);
        self.refresh()?;
        Ok(closed)
    }

    /// Tile the selected windows over the work area.  Returns how many were
    /// placed.
    pub fn arrange(&self) -> Result<usize, ArrangerError> {
        let targets: Vec<&WindowInfo> = self
            .windows
            .iter()
            .enumerate()
            .filter(|(i, _)| self.is_selected(*i))
            .map(|(_, w)| w)
            .collect();
        if targets.is_empty() {
            info!("no windows selected, nothing to arrange");
            return Ok(0);
        }

        let area = self.wm.work_area().map_err(wm_error)?;
        let rects = layout::layout(targets.len(), area);
        let settle = Duration::from_millis(self.config.restore_settle_ms);

        let mut placed = 0;
        for (window, rect) in targets.into_iter().zip(rects) {
            if window.state != WindowState::Normal {
                if let Err(e) = self.wm.restore(window) {
                    warn!("failed to restore {}: {}", window.title, e);
                    continue;
                }
                std::thread::sleep(settle);
            }
            if let Err(e) = self.wm.move_resize(window, rect) {
                warn!("failed to place {}: {}", window.title, e);
                continue;
            }
            if let Err(e) = self.wm.activate(window) {
                warn!("failed to activate {}: {}", window.title, e);
            }
            placed += 1;
        }
        info!("arranged {} window(s) over {:?}", placed, area);
        Ok(placed)
    }
}
