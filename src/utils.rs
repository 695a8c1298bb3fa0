use crate::{Result, ScrapeError};
use std::path::PathBuf;

#[cfg(target_os = "macos")]
const STANDARD_LOCATIONS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
];

#[cfg(target_os = "linux")]
const STANDARD_LOCATIONS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/opt/google/chrome/chrome",
];

#[cfg(target_os = "windows")]
const STANDARD_LOCATIONS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\Chromium\Application\chrome.exe",
];

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
const STANDARD_LOCATIONS: &[&str] = &[];

const PATH_BINARIES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// `CHROMIUM_PATH`, then well-known install locations, then `PATH`.
/// `CHROME_PATH` is already folded into the config by the time this runs.
pub fn find_chrome_executable() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
    }

    if let Some(path) = STANDARD_LOCATIONS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    {
        return Ok(path);
    }

    PATH_BINARIES
        .iter()
        .find_map(|binary| which::which(binary).ok())
        .ok_or_else(|| {
            ScrapeError::LaunchFailed(
                "Could not find Chrome/Chromium executable. Set browser.chrome_path or CHROME_PATH"
                    .into(),
            )
        })
}

/// Compares two page URLs ignoring the fragment.
pub fn same_page(a: &str, b: &str) -> bool {
    match (url::Url::parse(a), url::Url::parse(b)) {
        (Ok(mut a), Ok(mut b)) => {
            a.set_fragment(None);
            b.set_fragment(None);
            a == b
        }
        _ => a == b,
    }
}
