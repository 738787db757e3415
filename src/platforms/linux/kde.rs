//! Theme detection for KDE Plasma through the kdeglobals config file.
//! There is no monitor stream here; changes are picked up by the poll
//! watcher re-reading the file.

use std::path::{Path, PathBuf};

use ini::Ini;
use log::error;

use crate::platforms::{is_dark_name, ThemeProbe};

const SYSTEM_KDEGLOBALS: &str = "/etc/xdg/kdeglobals";

/// Look-and-feel packages that are dark without carrying "dark" in their
/// name.
const DARK_LOOK_AND_FEEL_PACKAGES: &[&str] = &[
    "org.kde.breezedark.desktop",
    "org.kde.oxygen",
    "org.kde.arc-dark",
    "org.kde.numix-dark",
    "org.kde.papirus-dark",
    "org.kde.suru-dark",
];

pub(crate) struct KdeProbe;

impl ThemeProbe for KdeProbe {
    fn query(&self) -> bool {
        match look_and_feel_package() {
            Some(package) => is_dark_package(&package),
            None => false,
        }
    }
}

/// The user's kdeglobals, or the system-wide one when the user has none.
fn kdeglobals_path() -> Option<PathBuf> {
    if let Some(path) = dirs::home_dir().map(|home| home.join(".config/kdeglobals")) {
        if path.exists() {
            return Some(path);
        }
    }
    let system = Path::new(SYSTEM_KDEGLOBALS);
    if system.exists() {
        return Some(system.to_path_buf());
    }
    None
}

fn look_and_feel_package() -> Option<String> {
    let path = kdeglobals_path()?;
    let cfg = match Ini::load_from_file(&path) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("couldn't read {}: {}", path.display(), err);
            return None;
        }
    };
    cfg.section(Some("KDE"))
        .and_then(|section| section.get("LookAndFeelPackage"))
        .map(str::to_string)
}

fn is_dark_package(package: &str) -> bool {
    DARK_LOOK_AND_FEEL_PACKAGES.contains(&package) || is_dark_name(package)
}
