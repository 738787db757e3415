//! Theme detection through the Windows registry. Works on Windows 10 and
//! later; changes are picked up by the poll watcher re-reading the value.

use log::error;
use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE};
use winreg::RegKey;

use crate::platforms::{parse_version, ThemeProbe};

const PERSONALIZE_KEY: &str = "Software\\Microsoft\\Windows\\CurrentVersion\\Themes\\Personalize";
const APPS_USE_LIGHT_THEME: &str = "AppsUseLightTheme";

const CURRENT_VERSION_KEY: &str = "SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion";

pub(crate) struct WindowsProbe;

impl ThemeProbe for WindowsProbe {
    fn query(&self) -> bool {
        is_dark_value(read_apps_use_light_theme())
    }
}

fn read_apps_use_light_theme() -> Option<u32> {
    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let subkey = hkcu.open_subkey(PERSONALIZE_KEY).ok()?;
    subkey.get_value::<u32, _>(APPS_USE_LIGHT_THEME).ok()
}

/// Dark exactly when the value exists and is zero; a missing key or value
/// means light, not an error.
fn is_dark_value(value: Option<u32>) -> bool {
    value == Some(0)
}

/// Windows version from the registry. Windows 10+ exposes the numeric
/// form; older systems only carry the dotted string.
pub(crate) fn os_version() -> (u32, u32) {
    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let key = match hklm.open_subkey(CURRENT_VERSION_KEY) {
        Ok(key) => key,
        Err(err) => {
            error!("couldn't read the windows version from the registry: {}", err);
            return (0, 0);
        }
    };
    if let Ok(major) = key.get_value::<u32, _>("CurrentMajorVersionNumber") {
        let minor = key.get_value::<u32, _>("CurrentMinorVersionNumber").unwrap_or(0);
        return (major, minor);
    }
    match key.get_value::<String, _>("CurrentVersion") {
        Ok(version) => parse_version(&version),
        Err(err) => {
            error!("couldn't read the windows version from the registry: {}", err);
            (0, 0)
        }
    }
}
