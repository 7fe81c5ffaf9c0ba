use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;

/// Drives the dispatcher from `requestAnimationFrame`.
///
/// `mark_dirty()` requests a frame; any number of marks before the next
/// vsync collapse into one call of the frame function. When the frame
/// function returns `true` another frame is requested immediately, which
/// keeps the loop alive while the palette animates or a flight is running.
pub struct FrameScheduler {
    inner: Rc<Inner>,
}

struct Inner {
    window: Option<web_sys::Window>,
    dirty: Cell<bool>,
    scheduled: Cell<bool>,
    raf_id: Cell<Option<i32>>,
    callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl Inner {
    fn request(&self) {
        if self.scheduled.get() {
            return;
        }
        self.scheduled.set(true);
        let callback = self.callback.borrow();
        let (Some(cb), Some(window)) = (callback.as_ref(), self.window.as_ref()) else {
            self.scheduled.set(false);
            return;
        };
        match window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            Ok(id) => self.raf_id.set(Some(id)),
            Err(_) => self.scheduled.set(false),
        }
    }
}

impl FrameScheduler {
    pub fn new(frame_fn: impl Fn() -> bool + 'static) -> Self {
        let inner = Rc::new(Inner {
            window: web_sys::window(),
            dirty: Cell::new(false),
            scheduled: Cell::new(false),
            raf_id: Cell::new(None),
            callback: RefCell::new(None),
        });

        let inner_cb = inner.clone();
        let cb = Closure::<dyn FnMut()>::new(move || {
            inner_cb.scheduled.set(false);
            inner_cb.raf_id.set(None);
            if !inner_cb.dirty.replace(false) {
                return;
            }
            if frame_fn() {
                inner_cb.dirty.set(true);
                inner_cb.request();
            }
        });
        *inner.callback.borrow_mut() = Some(cb);

        Self { inner }
    }

    pub fn mark_dirty(&self) {
        self.inner.dirty.set(true);
        self.inner.request();
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        if let Some(raf_id) = self.inner.raf_id.replace(None)
            && let Some(window) = self.inner.window.as_ref()
        {
            let _ = window.cancel_animation_frame(raf_id);
        }
        self.inner.scheduled.set(false);
        self.inner.dirty.set(false);
        // Break the callback->inner reference cycle on teardown.
        self.inner.callback.borrow_mut().take();
    }
}

/// Rolling frame-rate sample, logged to the console every few seconds while
/// frames are being drawn.
#[derive(Debug, Default)]
pub struct FrameStats {
    frames: u32,
    window_start: f64,
}

const FPS_LOG_INTERVAL_MS: f64 = 5_000.0;

impl FrameStats {
    /// Count one frame at `now`. Returns the frame rate when a sample
    /// window closes.
    pub fn record(&mut self, now: f64) -> Option<f64> {
        self.frames += 1;
        if self.window_start == 0.0 || now < self.window_start {
            self.window_start = now;
            self.frames = 1;
            return None;
        }
        let elapsed = now - self.window_start;
        if elapsed < FPS_LOG_INTERVAL_MS {
            return None;
        }
        let fps = (self.frames - 1) as f64 / (elapsed / 1000.0);
        self.frames = 1;
        self.window_start = now;
        Some(fps)
    }
}
