//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Frame scheduling (requestAnimationFrame on web, manual stepping natively)
//! - Time
//! - Device detection

use crate::settings::{DeviceCapabilities, PerformanceMode};

/// Token for one requested frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Requests frame callbacks from the host.
///
/// The callback itself is installed once by the platform; the session only
/// asks for (and cancels) the next invocation.
pub trait FrameScheduler {
    fn schedule(&mut self) -> FrameHandle;
    fn cancel(&mut self, handle: FrameHandle);
}

/// Scheduler driven by hand: the owner polls `take_pending()` and then ticks
/// the session with a timestamp of its choosing.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pending: Option<FrameHandle>,
    next_id: u64,
    /// Total frames ever requested
    pub requested: u64,
    pub cancelled: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// Consume the pending frame request, as a host firing it would
    pub fn take_pending(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }
}

impl FrameScheduler for ManualScheduler {
    fn schedule(&mut self) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        self.pending = Some(handle);
        self.requested += 1;
        handle
    }

    fn cancel(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
            self.cancelled += 1;
        }
    }
}

/// Milliseconds from a monotonic clock
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

/// Milliseconds from a monotonic clock
#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_secs_f64() * 1000.0
}

/// Reduce what the browser tells us to the capabilities the game cares about
pub fn capabilities_from_user_agent(
    user_agent: &str,
    min_screen_dim: f64,
    hardware_concurrency: f64,
) -> DeviceCapabilities {
    let ua = user_agent.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| ua.contains(n));

    let handheld = has(&[
        "android", "webos", "iphone", "ipad", "ipod", "blackberry", "iemobile", "opera mini",
    ]);
    let android_tablet = ua.contains("android") && !ua.contains("mobile");
    let is_tablet = has(&["ipad", "tablet", "playbook"])
        || android_tablet
        || (handheld && min_screen_dim > 600.0);
    let is_mobile = handheld && !is_tablet;

    // Unknown core counts report 0
    let is_low_end_device = hardware_concurrency > 0.0 && hardware_concurrency <= 2.0;

    DeviceCapabilities {
        is_mobile,
        is_tablet,
        is_low_end_device,
        performance_mode: if is_low_end_device {
            PerformanceMode::Low
        } else if is_mobile {
            PerformanceMode::Balanced
        } else {
            PerformanceMode::High
        },
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::{RafScheduler, detect_capabilities};

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;

    use super::{FrameHandle, FrameScheduler, capabilities_from_user_agent};
    use crate::settings::DeviceCapabilities;

    type FrameCallback = Closure<dyn FnMut(f64)>;

    /// requestAnimationFrame-backed scheduler.
    ///
    /// Clones share the installed callback, so the platform can keep one
    /// clone to `install()` into after the session has taken ownership.
    #[derive(Clone, Default)]
    pub struct RafScheduler {
        callback: Rc<RefCell<Option<FrameCallback>>>,
    }

    impl RafScheduler {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn install(&self, callback: FrameCallback) {
            *self.callback.borrow_mut() = Some(callback);
        }
    }

    impl FrameScheduler for RafScheduler {
        fn schedule(&mut self) -> FrameHandle {
            let id = match (web_sys::window(), self.callback.borrow().as_ref()) {
                (Some(window), Some(cb)) => window
                    .request_animation_frame(cb.as_ref().unchecked_ref())
                    .unwrap_or_else(|e| {
                        log::error!("requestAnimationFrame failed: {:?}", e);
                        0
                    }),
                _ => {
                    log::warn!("Frame requested before a callback was installed");
                    0
                }
            };
            FrameHandle(id as u64)
        }

        fn cancel(&mut self, handle: FrameHandle) {
            if handle.0 == 0 {
                return;
            }
            if let Some(window) = web_sys::window() {
                let _ = window.cancel_animation_frame(handle.0 as i32);
            }
        }
    }

    /// Inspect the running browser
    pub fn detect_capabilities() -> DeviceCapabilities {
        let Some(window) = web_sys::window() else {
            return DeviceCapabilities::default();
        };
        let navigator = window.navigator();
        let user_agent = navigator.user_agent().unwrap_or_default();
        let dim = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        let min_dim = dim(window.inner_width()).min(dim(window.inner_height()));

        let caps = capabilities_from_user_agent(&user_agent, min_dim, navigator.hardware_concurrency());
        log::info!(
            "Device: mobile={} tablet={} low_end={} mode={}",
            caps.is_mobile,
            caps.is_tablet,
            caps.is_low_end_device,
            caps.performance_mode.as_str()
        );
        caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_scheduler_cancel() {
        let mut scheduler = ManualScheduler::new();
        let first = scheduler.schedule();
        let second = scheduler.schedule();
        assert_ne!(first, second);

        // Stale handle doesn't cancel the newer request
        scheduler.cancel(first);
        assert_eq!(scheduler.pending(), Some(second));

        scheduler.cancel(second);
        assert_eq!(scheduler.pending(), None);
        assert_eq!(scheduler.cancelled, 1);
        assert_eq!(scheduler.requested, 2);
    }

    #[test]
    fn test_take_pending_fires_once() {
        let mut scheduler = ManualScheduler::new();
        scheduler.schedule();
        assert!(scheduler.take_pending().is_some());
        assert!(scheduler.take_pending().is_none());
    }

    #[test]
    fn test_clock_is_monotonic() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
    }

    #[test]
    fn test_device_detection() {
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148";
        let caps = capabilities_from_user_agent(iphone, 390.0, 6.0);
        assert!(caps.is_mobile && !caps.is_tablet);
        assert_eq!(caps.performance_mode, PerformanceMode::Balanced);

        let ipad = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X)";
        let caps = capabilities_from_user_agent(ipad, 820.0, 8.0);
        assert!(caps.is_tablet && !caps.is_mobile);

        let android_tab = "Mozilla/5.0 (Linux; Android 13; SM-X700)";
        assert!(capabilities_from_user_agent(android_tab, 800.0, 8.0).is_tablet);

        let old_phone = "Mozilla/5.0 (Linux; Android 8; Moto E) Mobile Safari";
        let caps = capabilities_from_user_agent(old_phone, 360.0, 2.0);
        assert!(caps.is_mobile && caps.is_low_end_device);
        assert_eq!(caps.performance_mode, PerformanceMode::Low);

        let desktop = "Mozilla/5.0 (X11; Linux x86_64) Firefox/130.0";
        assert_eq!(
            capabilities_from_user_agent(desktop, 1080.0, 0.0),
            DeviceCapabilities::default()
        );
    }
}
