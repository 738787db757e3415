//! Subprocess-stream change watcher. A long-lived monitor command (on
//! Linux desktops: `gsettings monitor`) prints one line per settings
//! change; each line is parsed and compared against the last known value.
//! The child process is owned by the watcher and force-killed on stop,
//! which also unblocks the reader.

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::Arc;

use log::{debug, error, warn};

use crate::error::{DetectError, Result};
use crate::listeners::ListenerRegistry;
use crate::platforms::ThemeProbe;
use crate::watcher::{spawn_loop, WatcherHandle, WatcherShared};

/// Maps one monitor line to the new dark-state, or fails for lines the
/// loop should skip.
pub(crate) type LineParser = fn(&str) -> Result<bool>;

/// The monitor command a stream watcher keeps running.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MonitorCommand {
    pub(crate) program: &'static str,
    pub(crate) args: &'static [&'static str],
}

/// Extracts the value token from a `key: '<value>'` monitor line, with
/// surrounding quotes stripped. Lines with fewer than two whitespace
/// tokens are malformed.
pub(crate) fn parse_monitor_line(line: &str) -> Result<String> {
    let mut tokens = line.split_whitespace();
    let _key = tokens.next();
    match tokens.next() {
        Some(value) => Ok(value.trim_matches(|c| c == '\'' || c == '"').to_string()),
        None => Err(DetectError::MalformedOutput(line.to_string())),
    }
}

pub(crate) fn spawn(
    command: MonitorCommand,
    parser: LineParser,
    probe: Arc<dyn ThemeProbe>,
    listeners: Arc<ListenerRegistry>,
) -> WatcherHandle {
    let shared = Arc::new(WatcherShared::new());
    let loop_shared = shared.clone();
    spawn_loop("os-theme-monitor", shared, move || {
        run(&loop_shared, command, parser, probe.as_ref(), &listeners);
    })
}

fn run(
    shared: &WatcherShared,
    command: MonitorCommand,
    parser: LineParser,
    probe: &dyn ThemeProbe,
    listeners: &ListenerRegistry,
) {
    if !shared.mark_running() {
        shared.mark_terminated();
        return;
    }

    let mut child = match Command::new(command.program)
        .args(command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(err) => {
            error!(
                "failed to start theme monitor process {:?}: {}",
                command.program, err
            );
            shared.mark_terminated();
            return;
        }
    };

    let stdout = match child.stdout.take() {
        Some(stdout) => stdout,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            error!("theme monitor process has no stdout");
            shared.mark_terminated();
            return;
        }
    };
    shared.adopt_child(child);

    // A stop raised between mark_running and adopt_child found no child
    // to kill; bail here instead of entering a read nothing can unblock.
    // mark_terminated reaps the just-adopted child.
    if shared.stop_requested() {
        shared.mark_terminated();
        return;
    }

    let last = probe.query();
    debug!("theme stream watcher started, dark: {}", last);
    pump_lines(BufReader::new(stdout), shared, parser, listeners, last);

    // mark_terminated reaps the monitor process if it is still alive.
    shared.mark_terminated();
}

/// Reads monitor lines until the stream ends or a stop is requested.
/// Malformed lines are skipped; a read error or EOF ends the loop, which
/// the caller records as `Terminated`.
fn pump_lines<R: BufRead>(
    reader: R,
    shared: &WatcherShared,
    parser: LineParser,
    listeners: &ListenerRegistry,
    mut last: bool,
) {
    for line in reader.lines() {
        if shared.stop_requested() {
            return;
        }
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                error!("failed to read from theme monitor process: {}", err);
                return;
            }
        };
        match parser(&line) {
            Ok(current) => {
                if current != last {
                    last = current;
                    debug!("theme change detected, dark: {}", current);
                    listeners.notify_all(current);
                }
            }
            Err(err) => warn!("skipping malformed theme monitor line: {}", err),
        }
    }
    if !shared.stop_requested() {
        error!("theme monitor stream ended unexpectedly");
    }
}
