use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use log::{debug, error};

/// A callback invoked with the new dark-state on every detected theme
/// change. Listeners are compared by `Arc` identity: cloning the handle
/// refers to the same registration.
pub type ThemeListener = Arc<dyn Fn(bool) + Send + Sync + 'static>;

/// Thread-safe set of registered listeners, shared between the caller's
/// threads and the watcher thread. All access goes through this type;
/// there is no other synchronization around the listener set.
pub(crate) struct ListenerRegistry {
    inner: Mutex<Vec<ThemeListener>>,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        ListenerRegistry {
            inner: Mutex::new(Vec::new()),
        }
    }

    /// Adds a listener. Returns false if the same `Arc` is already
    /// registered, in which case the set is unchanged.
    pub(crate) fn add(&self, listener: ThemeListener) -> bool {
        let mut listeners = self.inner.lock().unwrap();
        if listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        debug!("number of registered theme listeners: {}", listeners.len());
        true
    }

    /// Removes a listener by identity. Removing one that was never
    /// registered is a no-op returning false.
    pub(crate) fn remove(&self, listener: &ThemeListener) -> bool {
        let mut listeners = self.inner.lock().unwrap();
        match listeners.iter().position(|l| Arc::ptr_eq(l, listener)) {
            Some(idx) => {
                listeners.remove(idx);
                true
            }
            None => false,
        }
    }

    #[allow(dead_code)]
    pub(crate) fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Point-in-time copy of the set, safe to iterate while other threads
    /// keep adding and removing on the live set.
    pub(crate) fn snapshot(&self) -> Vec<ThemeListener> {
        self.inner.lock().unwrap().clone()
    }

    /// Invokes every currently registered listener with `dark`,
    /// sequentially. A panicking listener is caught and logged so the
    /// remaining listeners still run and the calling watcher survives.
    pub(crate) fn notify_all(&self, dark: bool) {
        for listener in self.snapshot() {
            if catch_unwind(AssertUnwindSafe(|| listener(dark))).is_err() {
                error!("theme listener panicked while being notified");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_listener() -> (ThemeListener, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let listener: ThemeListener = Arc::new(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        (listener, hits)
    }

    #[test]
    fn add_is_idempotent_per_identity() {
        let registry = ListenerRegistry::new();
        let (listener, hits) = counting_listener();

        assert!(registry.add(listener.clone()));
        assert!(!registry.add(listener.clone()));
        assert_eq!(registry.len(), 1);

        registry.notify_all(true);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn distinct_closures_are_distinct_registrations() {
        let registry = ListenerRegistry::new();
        let (a, _) = counting_listener();
        let (b, _) = counting_listener();

        assert!(registry.add(a));
        assert!(registry.add(b));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn removing_unknown_listener_is_a_noop() {
        let registry = ListenerRegistry::new();
        let (registered, hits) = counting_listener();
        let (stranger, _) = counting_listener();

        registry.add(registered);
        assert!(!registry.remove(&stranger));
        assert_eq!(registry.len(), 1);

        registry.notify_all(false);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_then_clear() {
        let registry = ListenerRegistry::new();
        let (a, _) = counting_listener();
        let (b, _) = counting_listener();

        registry.add(a.clone());
        registry.add(b);
        assert!(registry.remove(&a));
        assert_eq!(registry.len(), 1);

        registry.clear();
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn panicking_listener_does_not_block_the_rest() {
        let registry = ListenerRegistry::new();
        let bad: ThemeListener = Arc::new(|_| panic!("listener on fire"));
        let (good, hits) = counting_listener();

        registry.add(bad);
        registry.add(good);

        registry.notify_all(true);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registry_survives_concurrent_use() {
        let registry = Arc::new(ListenerRegistry::new());

        let mut churners = Vec::new();
        for _ in 0..4 {
            let registry = registry.clone();
            churners.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    let (listener, _) = counting_listener();
                    assert!(registry.add(listener.clone()));
                    registry.notify_all(true);
                    assert!(registry.remove(&listener));
                }
            }));
        }

        let notifier = {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for _ in 0..200 {
                    registry.notify_all(false);
                }
            })
        };

        for churner in churners {
            churner.join().unwrap();
        }
        notifier.join().unwrap();

        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_detached_from_live_set() {
        let registry = ListenerRegistry::new();
        let (a, _) = counting_listener();
        registry.add(a.clone());

        let snap = registry.snapshot();
        registry.remove(&a);

        assert_eq!(snap.len(), 1);
        assert_eq!(registry.len(), 0);
    }
}
