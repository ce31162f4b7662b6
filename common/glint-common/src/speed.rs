//! Fast-forward state shared between the input resolver, which writes it while resolving
//! bindings, and the speed controller, which applies it to the video backend once per frame

use crate::frontend::VideoBackend;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct FastForwardFlag(Arc<AtomicBool>);

impl FastForwardFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, fast_forward: bool) {
        self.0.store(fast_forward, Ordering::Relaxed);
    }
}

/// Applies the fast-forward flag to a video backend by toggling non-blocking presentation,
/// only touching the backend when the flag actually changes.
#[derive(Debug, Clone)]
pub struct SpeedController {
    flag: FastForwardFlag,
    applied: bool,
}

impl SpeedController {
    #[must_use]
    pub fn new(flag: FastForwardFlag) -> Self {
        Self { flag, applied: false }
    }

    #[must_use]
    pub fn fast_forwarding(&self) -> bool {
        self.applied
    }

    /// Returns whether the backend state was changed.
    pub fn update<V: VideoBackend + ?Sized>(&mut self, video: &mut V) -> bool {
        let fast_forward = self.flag.get();
        if fast_forward == self.applied {
            return false;
        }

        log::debug!("Fast forward {}", if fast_forward { "enabled" } else { "disabled" });

        video.set_nonblock_state(fast_forward);
        self.applied = fast_forward;
        true
    }
}
