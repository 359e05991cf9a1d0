//! Accessibility-based call detection
//!
//! The last-resort detector, for call screens that never post a usable
//! notification. UI events from the monitored app are settled for a short
//! delay, then the active window is scanned for an incoming-call indicator
//! and, when one is found, for an answer control to activate. When no
//! control can be clicked the synthetic tap fallback fires.
//!
//! The monitor doubles as the receiver of the delegated answer signal: the
//! notification path raises it when it has no better strategy left, and the
//! monitor then attempts an answer directly after a foregrounding delay,
//! without re-checking for the indicator.

use crate::classify::KeywordSets;
use crate::config::{DetectionConfig, TimingConfig};
use crate::delay::DelayQueue;
use crate::event::{publish, CallEvent, CallSource, CountChanged, EventSender, PipelineEvent};
use crate::gesture::run_tap_sequence;
use crate::platform::{AccessibilityHost, DelegateSignal, GestureDispatcher};
use crate::scanner::{find_and_activate_answer_control, find_incoming_call_indicator, ControlSearch};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The UI event kinds worth scanning after. Embedders map the platform's
/// raw event stream onto these and drop everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEventKind {
    WindowStateChanged,
    WindowContentChanged,
    NotificationStateChanged,
}

struct Inner {
    host: Arc<dyn AccessibilityHost>,
    gestures: Arc<dyn GestureDispatcher>,
    events: EventSender,
    target_package: String,
    keywords: KeywordSets,
    settle_delay: Duration,
    delegate_delay: Duration,
    tap_pacing: Duration,
    alive: Arc<AtomicBool>,
    count: AtomicU64,
}

impl Inner {
    /// Event path: scan only proceeds past an incoming-call indicator.
    fn scan_and_answer(&self) {
        let Some(root) = self.host.active_root() else {
            debug!("No active window root, skipping scan");
            return;
        };

        if !find_incoming_call_indicator(root.as_ref(), &self.keywords) {
            return;
        }

        let total = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Incoming call screen detected via accessibility, total {total}");

        publish(
            &self.events,
            PipelineEvent::CallDetected(CallEvent::new(CallSource::AppAccessibility, None)),
        );
        publish(
            &self.events,
            PipelineEvent::CountChanged(CountChanged {
                source: CallSource::AppAccessibility,
                total,
            }),
        );

        self.attempt_answer();
    }

    /// Activate an answer control on the current window, falling back to
    /// synthetic taps. Used by both the event path (after the indicator
    /// check) and the delegate path (directly).
    fn attempt_answer(&self) {
        let Some(root) = self.host.active_root() else {
            debug!("No active window root, cannot attempt answer");
            return;
        };

        let screen = self.host.screen_size();
        let outcome = find_and_activate_answer_control(root.as_ref(), &self.keywords, screen);
        drop(root);

        match outcome {
            ControlSearch::AnswerLabel => info!("Activated answer control by label"),
            ControlSearch::LowerScreen => {
                info!("Activated lower-screen control as answer candidate")
            }
            ControlSearch::NotFound => {
                debug!("No activatable answer control, trying tap fallback");
                if !self.gestures.is_supported() {
                    return;
                }
                match screen {
                    Some(screen) => {
                        run_tap_sequence(
                            self.gestures.as_ref(),
                            screen,
                            self.tap_pacing,
                            &self.alive,
                        );
                    }
                    None => warn!("No display metrics, tap fallback unavailable"),
                }
            }
        }
    }
}

/// Monitors accessibility UI events from the target app.
pub struct AccessibilityMonitor {
    inner: Arc<Inner>,
    queue: DelayQueue,
}

impl AccessibilityMonitor {
    pub fn new(
        host: Arc<dyn AccessibilityHost>,
        gestures: Arc<dyn GestureDispatcher>,
        events: EventSender,
        detection: &DetectionConfig,
        keywords: KeywordSets,
        timing: TimingConfig,
    ) -> Self {
        let alive = Arc::new(AtomicBool::new(true));
        let queue = DelayQueue::new("accessibility-scan", Arc::clone(&alive));
        let inner = Arc::new(Inner {
            host,
            gestures,
            events,
            target_package: detection.target_package.clone(),
            keywords,
            settle_delay: timing.ui_settle_delay(),
            delegate_delay: timing.delegate_delay(),
            tap_pacing: timing.tap_pacing(),
            alive,
            count: AtomicU64::new(0),
        });
        Self { inner, queue }
    }

    /// Entry point for the platform's UI event callback. Events from other
    /// packages are dropped before any scheduling happens.
    pub fn on_ui_event(&self, package: &str, kind: UiEventKind) {
        if !self.inner.alive.load(Ordering::SeqCst) {
            return;
        }
        if package != self.inner.target_package {
            return;
        }

        debug!("Scheduling scan after {kind:?} from {package}");
        let inner = Arc::clone(&self.inner);
        self.queue
            .schedule(self.inner.settle_delay, move || inner.scan_and_answer());
    }

    /// Process-lifetime accessibility call total.
    pub fn call_count(&self) -> u64 {
        self.inner.count.load(Ordering::SeqCst)
    }

    /// Stop scanning and cancel anything still queued. Signals and events
    /// arriving afterwards are no-ops.
    pub fn teardown(&self) {
        self.inner.alive.store(false, Ordering::SeqCst);
        self.queue.shutdown();
    }
}

impl DelegateSignal for AccessibilityMonitor {
    /// Delegated answer request from the notification path. The indicator
    /// check is skipped: the requester has already classified the call, and
    /// the delay only covers the app foregrounding its call screen.
    fn request_auto_answer(&self) {
        if !self.inner.alive.load(Ordering::SeqCst) {
            debug!("Ignoring delegated answer request, monitor inactive");
            return;
        }

        info!("Delegated answer request accepted");
        let inner = Arc::clone(&self.inner);
        self.queue
            .schedule(self.inner.delegate_delay, move || inner.attempt_answer());
    }
}

impl Drop for AccessibilityMonitor {
    fn drop(&mut self) {
        self.teardown();
    }
}
