//! Theme detection through `gsettings`, covering GNOME and its relatives.

use std::process::Command;

use log::error;

use crate::error::{DetectError, Result};
use crate::platforms::{is_dark_name, ThemeProbe};
use crate::watcher::stream::{parse_monitor_line, MonitorCommand};

const SCHEMA: &str = "org.gnome.desktop.interface";
const KEY: &str = "gtk-theme";

/// Long-lived command whose stdout streams `gtk-theme: '<name>'` lines.
pub(crate) const MONITOR: MonitorCommand = MonitorCommand {
    program: "gsettings",
    args: &["monitor", SCHEMA, KEY],
};

pub(crate) struct GsettingsProbe;

impl ThemeProbe for GsettingsProbe {
    fn query(&self) -> bool {
        match query_theme_name() {
            Ok(name) => is_dark_name(&name),
            Err(err) => {
                error!("couldn't query the gtk theme via gsettings: {}", err);
                false
            }
        }
    }
}

/// One-shot `gsettings get`, yielding the quote-stripped theme name from
/// the first output line.
fn query_theme_name() -> Result<String> {
    let output = Command::new("gsettings")
        .args(["get", SCHEMA, KEY])
        .output()?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().next().ok_or(DetectError::EmptyOutput)?;
    Ok(line.trim().trim_matches('\'').to_string())
}

/// Line parser handed to the stream watcher.
pub(crate) fn parse_monitor_dark(line: &str) -> Result<bool> {
    parse_monitor_line(line).map(|name| is_dark_name(&name))
}
