//! URL list loading and browser discovery/launch.

use super::ArrangerError;
use crate::traits::Launcher;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Read the URL file: one URL per line, surrounding whitespace trimmed,
/// blank lines skipped.
pub fn load_urls(path: &Path) -> Result<Vec<String>, ArrangerError> {
    let text = std::fs::read_to_string(path).map_err(|source| ArrangerError::UrlFile {
        path: path.to_path_buf(),
        source,
    })?;
    let urls: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();
    info!("loaded {} URL(s) from {}", urls.len(), path.display());
    Ok(urls)
}

/// Standard install locations of Chrome, in search order.
#[cfg(windows)]
pub fn default_browser_candidates() -> Vec<PathBuf> {
    const SUFFIX: &str = r"Google\Chrome\Application\chrome.exe";
    ["ProgramFiles", "ProgramFiles(x86)", "LOCALAPPDATA"]
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .map(|base| PathBuf::from(base).join(SUFFIX))
        .collect()
}

/// Standard install locations of Chrome/Chromium, in search order.
#[cfg(not(windows))]
pub fn default_browser_candidates() -> Vec<PathBuf> {
    [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/opt/google/chrome/chrome",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}

/// First candidate that exists on disk.
pub fn find_browser(candidates: &[PathBuf]) -> Option<PathBuf> {
    let found = candidates.iter().find(|p| p.is_file()).cloned();
    match &found {
        Some(p) => info!("browser found at {}", p.display()),
        None => debug!("no browser among {:?}", candidates),
    }
    found
}

/// Resolve the browser: the configured override if it exists, otherwise the
/// standard locations.
pub fn resolve_browser(configured: Option<&Path>) -> Result<PathBuf, ArrangerError> {
    let candidates: Vec<PathBuf> = match configured {
        Some(p) => vec![p.to_path_buf()],
        None => default_browser_candidates(),
    };
    find_browser(&candidates).ok_or(ArrangerError::BrowserNotFound)
}

/// Spawns `<browser> <url> --new-window` as a detached child process.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    executable: PathBuf,
}

impl ProcessLauncher {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&self, url: &str) -> std::io::Result<()> {
        let child = Command::new(&self.executable)
            .arg(url)
            .arg("--new-window")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        debug!("launched pid {} for {}", child.id(), url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_urls_trims_and_skips_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  https://a.example/1  ").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "https://b.example/2").unwrap();
        writeln!(file, "   ").unwrap();
        let urls = load_urls(file.path()).unwrap();
        assert_eq!(urls, vec!["https://a.example/1", "https://b.example/2"]);
    }

    #[test]
    fn load_urls_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(load_urls(file.path()).unwrap().is_empty());
    }

    #[test]
    fn load_urls_missing_file() {
        let err = load_urls(Path::new("/nonexistent/itemurl.txt")).unwrap_err();
        assert!(matches!(err, ArrangerError::UrlFile { .. }));
        assert!(err.to_string().contains("itemurl.txt"));
    }

    #[test]
    fn find_browser_picks_first_existing() {
        let dir = tempfile::tempdir().unwrap();
        let second = dir.path().join("chrome-b");
        let third = dir.path().join("chrome-c");
        std::fs::write(&second, b"").unwrap();
        std::fs::write(&third, b"").unwrap();
        let candidates = vec![dir.path().join("missing"), second.clone(), third];
        assert_eq!(find_browser(&candidates), Some(second));
    }

    #[test]
    fn find_browser_none() {
        assert_eq!(find_browser(&[PathBuf::from("/nonexistent/chrome")]), None);
        assert_eq!(find_browser(&[]), None);
    }

    #[test]
    fn configured_browser_must_exist() {
        let err = resolve_browser(Some(Path::new("/nonexistent/chrome"))).unwrap_err();
        assert!(matches!(err, ArrangerError::BrowserNotFound));

        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(
            resolve_browser(Some(file.path())).unwrap(),
            file.path().to_path_buf()
        );
    }

    #[test]
    fn launching_missing_executable_fails() {
        let launcher = ProcessLauncher::new("/nonexistent/chrome");
        assert!(launcher.launch("https://a.example").is_err());
    }
}
