//! Theme detection through the Apple Foundation framework. The probe
//! reads `AppleInterfaceStyle` from the user defaults; change events come
//! from a distributed-notification observer instead of a background loop.

use std::ffi::{c_char, CStr, CString};
use std::process::Command;
use std::sync::{Arc, Mutex, Once};

use log::error;
use objc::declare::ClassDecl;
use objc::runtime::{Object, Sel};
use objc::{class, msg_send, sel, sel_impl};

use crate::error::{DetectError, Result};
use crate::listeners::ListenerRegistry;
use crate::platforms::{is_dark_name, parse_version, ThemeProbe};

const INTERFACE_STYLE_KEY: &str = "AppleInterfaceStyle";
const THEME_CHANGED_NOTIFICATION: &str = "AppleInterfaceThemeChangedNotification";

pub(crate) struct MacProbe;

impl ThemeProbe for MacProbe {
    fn query(&self) -> bool {
        match interface_style() {
            Ok(Some(style)) => is_dark_name(&style),
            // The key is absent entirely while the light theme is active.
            Ok(None) => false,
            Err(err) => {
                error!("couldn't query the interface style: {}", err);
                false
            }
        }
    }
}

unsafe fn nsstring(value: &str) -> *mut Object {
    let cstr = CString::new(value).unwrap_or_default();
    msg_send![class!(NSString), stringWithUTF8String: cstr.as_ptr()]
}

fn interface_style() -> Result<Option<String>> {
    unsafe {
        let defaults: *mut Object = msg_send![class!(NSUserDefaults), standardUserDefaults];
        if defaults.is_null() {
            return Err(DetectError::Native("no standard user defaults".to_string()));
        }
        let key = nsstring(INTERFACE_STYLE_KEY);
        let style: *mut Object = msg_send![defaults, stringForKey: key];
        if style.is_null() {
            return Ok(None);
        }
        let utf8: *const c_char = msg_send![style, UTF8String];
        if utf8.is_null() {
            return Err(DetectError::Native("interface style is not a string".to_string()));
        }
        Ok(Some(CStr::from_ptr(utf8).to_string_lossy().into_owned()))
    }
}

/// Where the native observer delivers. Set by [`install_observer`];
/// process-wide because the notification callback cannot capture state.
static OBSERVER_SINK: Mutex<Option<(Arc<dyn ThemeProbe>, Arc<ListenerRegistry>)>> =
    Mutex::new(None);

static REGISTER_OBSERVER: Once = Once::new();

/// Registers the distributed-notification observer for theme changes,
/// exactly once per process. Each delivery re-queries the probe and
/// notifies all listeners; the platform event is already edge-triggered,
/// so no comparison against a last known value happens here.
pub(crate) fn install_observer(probe: Arc<dyn ThemeProbe>, listeners: Arc<ListenerRegistry>) {
    *OBSERVER_SINK.lock().unwrap() = Some((probe, listeners));
    REGISTER_OBSERVER.call_once(|| unsafe { register_native_observer() });
}

extern "C" fn handle_theme_changed(_this: &Object, _cmd: Sel, _notification: *mut Object) {
    // Runs on the notification center's delivery thread; must not block
    // it for long.
    let sink = OBSERVER_SINK.lock().unwrap().clone();
    if let Some((probe, listeners)) = sink {
        listeners.notify_all(probe.query());
    }
}

unsafe fn register_native_observer() {
    let mut decl = match ClassDecl::new("OsThemeChangesObserver", class!(NSObject)) {
        Some(decl) => decl,
        None => {
            error!("couldn't declare the theme observer class");
            return;
        }
    };
    decl.add_method(
        sel!(handleAppleThemeChanged:),
        handle_theme_changed as extern "C" fn(&Object, Sel, *mut Object),
    );
    let class = decl.register();

    let observer: *mut Object = msg_send![class, new];
    let center: *mut Object = msg_send![
        class!(NSDistributedNotificationCenter),
        defaultCenter
    ];
    if center.is_null() {
        error!("couldn't reach the distributed notification center");
        return;
    }
    let name = nsstring(THEME_CHANGED_NOTIFICATION);
    let () = msg_send![
        center,
        addObserver: observer
        selector: sel!(handleAppleThemeChanged:)
        name: name
        object: std::ptr::null_mut::<Object>()
    ];
}

pub(crate) fn os_version() -> (u32, u32) {
    match Command::new("sw_vers").arg("-productVersion").output() {
        Ok(output) => parse_version(&String::from_utf8_lossy(&output.stdout)),
        Err(err) => {
            error!("couldn't query the macos version: {}", err);
            (0, 0)
        }
    }
}
