//! Native call detection
//!
//! Subscribes to the platform's call-state change notifications and counts
//! transitions into the ringing state, kicking the native auto-answer path
//! for each one. The underlying signal is already rate-limited by the OS, so
//! no debounce is needed; a ringing signal with no matching teardown is
//! treated as an independent event and never blocks future detections.

use crate::auto_answer::AutoAnswerer;
use crate::event::{publish, CallEvent, CallSource, CountChanged, EventSender, PipelineEvent};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Native call state as delivered by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallState {
    #[default]
    Idle,
    Ringing,
    /// A call is active (dialling or connected).
    OffHook,
}

impl CallState {
    /// Parse the platform's state label. Unknown labels yield `None` and are
    /// ignored by the monitor.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "IDLE" => Some(Self::Idle),
            "RINGING" => Some(Self::Ringing),
            "OFFHOOK" => Some(Self::OffHook),
            _ => None,
        }
    }
}

/// Monitors native cellular call state.
pub struct TelephonyMonitor {
    answerer: Arc<AutoAnswerer>,
    events: EventSender,
    count: AtomicU64,
    last_state: Mutex<CallState>,
}

impl TelephonyMonitor {
    pub fn new(answerer: Arc<AutoAnswerer>, events: EventSender) -> Self {
        Self {
            answerer,
            events,
            count: AtomicU64::new(0),
            last_state: Mutex::new(CallState::Idle),
        }
    }

    /// Entry point for the raw platform callback.
    pub fn on_call_state_label(&self, label: &str) {
        match CallState::parse(label) {
            Some(state) => self.on_call_state(state),
            None => debug!("Ignoring unknown call state label '{label}'"),
        }
    }

    /// Process a call-state change. Counts only transitions into Ringing,
    /// then returns to Idle tracking on any other state.
    pub fn on_call_state(&self, state: CallState) {
        let previous = {
            let mut last = self.last_state.lock();
            std::mem::replace(&mut *last, state)
        };

        if state != CallState::Ringing || previous == CallState::Ringing {
            return;
        }

        let total = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Native incoming call detected, total {total}");

        publish(
            &self.events,
            PipelineEvent::CallDetected(CallEvent::new(CallSource::Native, None)),
        );
        publish(
            &self.events,
            PipelineEvent::CountChanged(CountChanged {
                source: CallSource::Native,
                total,
            }),
        );

        let attempt = self.answerer.answer_native_call();
        debug!(
            "Native answer attempt finished (succeeded: {})",
            attempt.succeeded
        );
    }

    /// Process-lifetime native call total.
    pub fn call_count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }
}
