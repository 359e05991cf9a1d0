//! Synthetic-tap fallback for answering a call
//!
//! When no answer control can be found or activated, a short fixed sequence
//! of screen-relative taps is dispatched at the places answer buttons tend
//! to live. Taps are fire-and-forget: the generator never learns whether a
//! tap landed, so it paces the whole sequence and lets the caller decide
//! what success means. Platforms without synthetic input degrade to a
//! logged no-op.

use crate::delay::interruptible_sleep;
use crate::platform::{GestureDispatcher, ScreenSize};
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::{debug, warn};

/// Pause between taps so the UI can transition under them.
pub const DEFAULT_TAP_PACING: Duration = Duration::from_millis(800);

/// Candidate tap positions, screen-relative: bottom-centre, bottom-left
/// quadrant, bottom-right quadrant.
pub fn tap_sequence(width: i32, height: i32) -> [(i32, i32); 3] {
    [
        (width / 2, scale(height, 0.85)),
        (width / 4, scale(height, 0.80)),
        (scale(width, 0.75), scale(height, 0.80)),
    ]
}

fn scale(extent: i32, factor: f32) -> i32 {
    (extent as f32 * factor) as i32
}

/// Dispatch the tap sequence, one tap at a time with `pacing` between taps.
///
/// The `alive` flag is checked before every tap and during every pause, so
/// tearing the owner down cancels the sequence mid-way. Returns true when at
/// least one tap was dispatched (dispatch-level only, never a confirmation
/// that the call was answered).
pub fn run_tap_sequence(
    dispatcher: &dyn GestureDispatcher,
    screen: ScreenSize,
    pacing: Duration,
    alive: &AtomicBool,
) -> bool {
    if !dispatcher.is_supported() {
        warn!("Synthetic input not supported on this platform, skipping tap fallback");
        return false;
    }
    if screen.width <= 0 || screen.height <= 0 {
        warn!("Invalid screen dimensions {screen:?}, skipping tap fallback");
        return false;
    }

    let mut dispatched = false;
    for (x, y) in tap_sequence(screen.width, screen.height) {
        match dispatcher.dispatch_tap(x, y) {
            Ok(()) => {
                debug!("Dispatched tap at ({x}, {y})");
                dispatched = true;
            }
            Err(e) => warn!("Tap at ({x}, {y}) failed: {e}"),
        }
        if !interruptible_sleep(pacing, alive) {
            debug!("Tap sequence cancelled, owner torn down");
            break;
        }
    }
    dispatched
}
