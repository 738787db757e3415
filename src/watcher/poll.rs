//! Interval-poll change watcher. Used where the platform offers no change
//! stream of its own: the Windows registry value and the KDE kdeglobals
//! file are simply re-read once a second.

use std::sync::Arc;
use std::time::Duration;

use log::debug;

use crate::listeners::ListenerRegistry;
use crate::platforms::ThemeProbe;
use crate::watcher::{spawn_loop, WatcherHandle, WatcherShared};

pub(crate) fn spawn(
    probe: Arc<dyn ThemeProbe>,
    listeners: Arc<ListenerRegistry>,
    interval: Duration,
) -> WatcherHandle {
    let shared = Arc::new(WatcherShared::new());
    let loop_shared = shared.clone();
    spawn_loop("os-theme-poll", shared, move || {
        run(&loop_shared, probe.as_ref(), &listeners, interval);
    })
}

fn run(
    shared: &WatcherShared,
    probe: &dyn ThemeProbe,
    listeners: &ListenerRegistry,
    interval: Duration,
) {
    if !shared.mark_running() {
        shared.mark_terminated();
        return;
    }

    // The first change is measured against the real current state, not
    // against a sentinel.
    let mut last = probe.query();
    debug!("theme poll watcher started, dark: {}", last);

    loop {
        if shared.wait_for(interval) {
            break;
        }
        let current = probe.query();
        if current != last {
            last = current;
            debug!("theme change detected, dark: {}", current);
            listeners.notify_all(current);
        }
    }

    shared.mark_terminated();
}
