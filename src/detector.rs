//! The detector facade. Picks the backend for the running platform at
//! first use and manages the watcher lifecycle: the first registered
//! listener starts it, removing the last one stops it.

use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;
use log::debug;

use crate::listeners::ListenerRegistry;
pub use crate::listeners::ThemeListener;
use crate::platforms::{self, Flavor, Mechanism, ThemeProbe};
use crate::watcher::{poll, stream, WatcherHandle};

lazy_static! {
    static ref DETECTOR: OsThemeDetector = OsThemeDetector::for_current_platform();
}

/// The process-wide detector, constructed for the running platform on
/// first access and reused afterwards.
pub fn detector() -> &'static OsThemeDetector {
    &DETECTOR
}

/// Detects the theme used by the operating system and notifies registered
/// listeners when it changes.
pub struct OsThemeDetector {
    probe: Arc<dyn ThemeProbe>,
    mechanism: Mechanism,
    listeners: Arc<ListenerRegistry>,
    /// The one live watcher, if any. Guarding start/stop behind this lock
    /// is what keeps a second watcher from ever overlapping the first.
    watcher: Mutex<Option<WatcherHandle>>,
}

impl OsThemeDetector {
    fn for_current_platform() -> Self {
        let flavor = platforms::select(platforms::current());
        debug!("selected theme detection backend: {:?}", flavor);
        let (probe, mechanism) = platforms::backend(flavor);
        Self::with_backend(probe, mechanism)
    }

    pub(crate) fn with_backend(probe: Arc<dyn ThemeProbe>, mechanism: Mechanism) -> Self {
        let detector = OsThemeDetector {
            probe,
            mechanism,
            listeners: Arc::new(ListenerRegistry::new()),
            watcher: Mutex::new(None),
        };

        #[cfg(target_os = "macos")]
        if let Mechanism::Native = detector.mechanism {
            platforms::macos::install_observer(
                detector.probe.clone(),
                detector.listeners.clone(),
            );
        }

        detector
    }

    /// Whether theme detection works on this system at all. When false,
    /// [`is_dark`](Self::is_dark) always reports a light theme and
    /// listeners are never invoked.
    pub fn is_supported() -> bool {
        platforms::select(platforms::current()) != Flavor::Unsupported
    }

    /// Queries the current theme. `true` means dark. Never fails; an
    /// unreadable source reports a light theme.
    pub fn is_dark(&self) -> bool {
        self.probe.query()
    }

    /// Registers a listener to be invoked with the new dark-state on
    /// every detected change. Returns false when the same listener handle
    /// is already registered. The first registration starts the
    /// background watcher; so does the next one after a watcher died from
    /// a transport failure.
    pub fn register_listener(&self, listener: ThemeListener) -> bool {
        let added = self.listeners.add(listener);
        self.ensure_watcher();
        added
    }

    /// Removes a listener by handle identity. Removing one that is not
    /// registered is a no-op returning false. Removing the last listener
    /// stops the watcher and waits for it to drain.
    pub fn remove_listener(&self, listener: &ThemeListener) -> bool {
        let removed = self.listeners.remove(listener);
        let mut watcher = self.watcher.lock().unwrap();
        if self.listeners.is_empty() {
            if let Some(handle) = watcher.take() {
                debug!("last theme listener removed, stopping watcher");
                handle.stop();
            }
        }
        removed
    }

    fn ensure_watcher(&self) {
        let mut watcher = self.watcher.lock().unwrap();
        // A concurrent remove_listener may have emptied the registry
        // between our add and this point; it holds the same lock, so
        // checking here keeps "no listeners, no watcher" exact.
        if self.listeners.is_empty() {
            return;
        }
        let usable = watcher.as_ref().map(|h| !h.is_terminated()).unwrap_or(false);
        if usable {
            return;
        }
        // Join a dead handle before replacing it; a fresh watcher may
        // only start once its predecessor has fully drained.
        if let Some(dead) = watcher.take() {
            dead.stop();
        }
        *watcher = self.start_watcher();
    }

    fn start_watcher(&self) -> Option<WatcherHandle> {
        match &self.mechanism {
            Mechanism::Poll { interval } => Some(poll::spawn(
                self.probe.clone(),
                self.listeners.clone(),
                *interval,
            )),
            Mechanism::Stream { command, parser } => Some(stream::spawn(
                *command,
                *parser,
                self.probe.clone(),
                self.listeners.clone(),
            )),
            // The native observer needs no thread; Disabled has nothing
            // to watch.
            Mechanism::Native | Mechanism::Disabled => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn has_live_watcher(&self) -> bool {
        self.watcher
            .lock()
            .unwrap()
            .as_ref()
            .map(|h| !h.is_terminated())
            .unwrap_or(false)
    }
}
