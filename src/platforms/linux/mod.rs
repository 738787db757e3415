//! Linux desktop support. Which mechanism applies depends on the desktop
//! environment: GNOME-family desktops answer `gsettings` queries and emit
//! a monitor stream, KDE keeps its look-and-feel selection in kdeglobals.

pub(crate) mod gsettings;
pub(crate) mod kde;

use detect_desktop_environment::DesktopEnvironment;

use super::Desktop;

pub(crate) fn desktop_kind() -> Desktop {
    match DesktopEnvironment::detect() {
        Some(
            DesktopEnvironment::Gnome
            | DesktopEnvironment::Cinnamon
            | DesktopEnvironment::Mate
            | DesktopEnvironment::Unity,
        ) => Desktop::Gsettings,
        Some(DesktopEnvironment::Kde) => Desktop::Kde,
        _ => Desktop::Unknown,
    }
}
