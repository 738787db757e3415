//! Platform identification and backend selection. The descriptor for the
//! running system is computed once per process; turning it into a backend
//! flavor is a pure function so the selection logic is testable with
//! made-up descriptors.

#[cfg(any(
    target_os = "linux",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd"
))]
pub(crate) mod linux;

#[cfg(target_os = "macos")]
pub(crate) mod macos;

#[cfg(target_os = "windows")]
pub(crate) mod windows;

use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;

use crate::watcher::stream::{LineParser, MonitorCommand};

/// One-shot query of the current theme from its platform source.
/// Implementations absorb every failure into a light-theme answer.
pub(crate) trait ThemeProbe: Send + Sync {
    /// Returns true when the platform reports a dark theme.
    fn query(&self) -> bool;
}

/// Probe for systems without a supported theme source.
pub(crate) struct FallbackProbe;

impl ThemeProbe for FallbackProbe {
    fn query(&self) -> bool {
        false
    }
}

/// The shared theme-name classification: a theme is dark when its name
/// contains "dark", case-insensitively.
pub(crate) fn is_dark_name(name: &str) -> bool {
    name.to_lowercase().contains("dark")
}

/// Parses a dotted version string, tolerating missing components.
pub(crate) fn parse_version(version: &str) -> (u32, u32) {
    let mut parts = version.trim().split('.');
    let mut next = || {
        parts
            .next()
            .and_then(|p| p.parse::<u32>().ok())
            .unwrap_or(0)
    };
    (next(), next())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OsFamily {
    Windows,
    Linux,
    MacOs,
    Other,
}

/// Desktop-environment capability, only meaningful for the Linux family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Desktop {
    /// GNOME-family desktop that answers `gsettings` queries.
    Gsettings,
    /// KDE Plasma, detected through kdeglobals.
    Kde,
    Unknown,
}

/// What the OS reports about itself, computed once per process.
#[derive(Clone, Debug)]
pub(crate) struct PlatformDescriptor {
    pub(crate) family: OsFamily,
    pub(crate) version: (u32, u32),
    pub(crate) desktop: Desktop,
}

impl PlatformDescriptor {
    fn for_current_os() -> Self {
        #[cfg(target_os = "windows")]
        return PlatformDescriptor {
            family: OsFamily::Windows,
            version: windows::os_version(),
            desktop: Desktop::Unknown,
        };

        #[cfg(any(
            target_os = "linux",
            target_os = "freebsd",
            target_os = "dragonfly",
            target_os = "netbsd",
            target_os = "openbsd"
        ))]
        return PlatformDescriptor {
            family: OsFamily::Linux,
            version: (0, 0),
            desktop: linux::desktop_kind(),
        };

        #[cfg(target_os = "macos")]
        return PlatformDescriptor {
            family: OsFamily::MacOs,
            version: macos::os_version(),
            desktop: Desktop::Unknown,
        };

        #[cfg(not(any(
            target_os = "windows",
            target_os = "linux",
            target_os = "freebsd",
            target_os = "dragonfly",
            target_os = "netbsd",
            target_os = "openbsd",
            target_os = "macos"
        )))]
        PlatformDescriptor {
            family: OsFamily::Other,
            version: (0, 0),
            desktop: Desktop::Unknown,
        }
    }
}

lazy_static! {
    static ref PLATFORM: PlatformDescriptor = PlatformDescriptor::for_current_os();
}

pub(crate) fn current() -> &'static PlatformDescriptor {
    &PLATFORM
}

/// The backend chosen for a platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flavor {
    Windows,
    Gnome,
    Kde,
    MacOs,
    Unsupported,
}

/// How a chosen backend watches for changes.
#[derive(Clone, Copy)]
pub(crate) enum Mechanism {
    /// Re-query the probe at a fixed interval on a background thread.
    Poll { interval: Duration },
    /// Follow the stdout of a long-lived monitor subprocess.
    Stream {
        command: MonitorCommand,
        parser: LineParser,
    },
    /// A native notification observer delivers events; no background
    /// thread of our own.
    #[allow(dead_code)]
    Native,
    /// Unsupported platform: listeners are accepted but never called.
    Disabled,
}

pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Maps a platform descriptor to the backend flavor, in the fixed
/// precedence order: Windows 10+, Linux desktops, macOS 10.14+, fallback.
pub(crate) fn select(descriptor: &PlatformDescriptor) -> Flavor {
    match descriptor.family {
        OsFamily::Windows if descriptor.version.0 >= 10 => Flavor::Windows,
        OsFamily::Linux => match descriptor.desktop {
            Desktop::Gsettings => Flavor::Gnome,
            Desktop::Kde => Flavor::Kde,
            Desktop::Unknown => Flavor::Unsupported,
        },
        OsFamily::MacOs if descriptor.version >= (10, 14) => Flavor::MacOs,
        _ => Flavor::Unsupported,
    }
}

/// Builds the probe/mechanism pair for a flavor. Flavors whose platform
/// code is not compiled in collapse to the fallback.
pub(crate) fn backend(flavor: Flavor) -> (Arc<dyn ThemeProbe>, Mechanism) {
    match flavor {
        #[cfg(target_os = "windows")]
        Flavor::Windows => (
            Arc::new(windows::WindowsProbe),
            Mechanism::Poll {
                interval: POLL_INTERVAL,
            },
        ),
        #[cfg(any(
            target_os = "linux",
            target_os = "freebsd",
            target_os = "dragonfly",
            target_os = "netbsd",
            target_os = "openbsd"
        ))]
        Flavor::Gnome => (
            Arc::new(linux::gsettings::GsettingsProbe),
            Mechanism::Stream {
                command: linux::gsettings::MONITOR,
                parser: linux::gsettings::parse_monitor_dark,
            },
        ),
        #[cfg(any(
            target_os = "linux",
            target_os = "freebsd",
            target_os = "dragonfly",
            target_os = "netbsd",
            target_os = "openbsd"
        ))]
        Flavor::Kde => (
            Arc::new(linux::kde::KdeProbe),
            Mechanism::Poll {
                interval: POLL_INTERVAL,
            },
        ),
        #[cfg(target_os = "macos")]
        Flavor::MacOs => (Arc::new(macos::MacProbe), Mechanism::Native),
        _ => (Arc::new(FallbackProbe), Mechanism::Disabled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn descriptor(family: OsFamily, version: (u32, u32), desktop: Desktop) -> PlatformDescriptor {
        PlatformDescriptor {
            family,
            version,
            desktop,
        }
    }

    #[test]
    fn windows_10_and_later_use_the_registry_backend() {
        let d = descriptor(OsFamily::Windows, (10, 0), Desktop::Unknown);
        assert_matches!(select(&d), Flavor::Windows);

        let d = descriptor(OsFamily::Windows, (11, 0), Desktop::Unknown);
        assert_matches!(select(&d), Flavor::Windows);
    }

    #[test]
    fn older_windows_is_unsupported() {
        let d = descriptor(OsFamily::Windows, (6, 3), Desktop::Unknown);
        assert_matches!(select(&d), Flavor::Unsupported);
    }

    #[test]
    fn linux_selection_follows_the_desktop() {
        let d = descriptor(OsFamily::Linux, (0, 0), Desktop::Gsettings);
        assert_matches!(select(&d), Flavor::Gnome);

        let d = descriptor(OsFamily::Linux, (0, 0), Desktop::Kde);
        assert_matches!(select(&d), Flavor::Kde);

        let d = descriptor(OsFamily::Linux, (0, 0), Desktop::Unknown);
        assert_matches!(select(&d), Flavor::Unsupported);
    }

    #[test]
    fn macos_needs_mojave_or_later() {
        let d = descriptor(OsFamily::MacOs, (10, 13), Desktop::Unknown);
        assert_matches!(select(&d), Flavor::Unsupported);

        let d = descriptor(OsFamily::MacOs, (10, 14), Desktop::Unknown);
        assert_matches!(select(&d), Flavor::MacOs);

        let d = descriptor(OsFamily::MacOs, (14, 3), Desktop::Unknown);
        assert_matches!(select(&d), Flavor::MacOs);
    }

    #[test]
    fn other_platforms_fall_back() {
        let d = descriptor(OsFamily::Other, (99, 0), Desktop::Unknown);
        assert_matches!(select(&d), Flavor::Unsupported);
    }

    #[test]
    fn fallback_probe_reports_light() {
        assert!(!FallbackProbe.query());
    }

    #[test]
    fn dark_names_match_case_insensitively() {
        assert!(is_dark_name("Breeze-Dark"));
        assert!(is_dark_name("adwaita-DARK"));
        assert!(is_dark_name("dark"));
        assert!(!is_dark_name("Breeze"));
        assert!(!is_dark_name(""));
    }

    #[test]
    fn version_strings_parse_leniently() {
        assert_eq!(parse_version("10.14"), (10, 14));
        assert_eq!(parse_version("11"), (11, 0));
        assert_eq!(parse_version("14.3.1"), (14, 3));
        assert_eq!(parse_version(" 13.2\n"), (13, 2));
        assert_eq!(parse_version("garbage"), (0, 0));
        assert_eq!(parse_version(""), (0, 0));
    }
}
