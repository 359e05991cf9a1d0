//! Detection service wiring
//!
//! Assembles the three monitors around a shared auto-answer orchestrator
//! and gates their lifetime on the readiness chain. The embedder owns the
//! OS callback plumbing and forwards raw signals here; while the service is
//! disarmed every forwarded signal is a silent no-op.

use crate::accessibility_monitor::{AccessibilityMonitor, UiEventKind};
use crate::auto_answer::AutoAnswerer;
use crate::config::Config;
use crate::event::{CountTotals, EventSender};
use crate::flags::FlagStore;
use crate::notification_monitor::NotificationMonitor;
use crate::platform::{
    AccessibilityHost, DelegateSignal, GestureDispatcher, NotificationRecord, PermissionGate,
    TelephonyController,
};
use crate::readiness::{Readiness, ReadinessMachine, SetupPrompt};
use crate::telephony_monitor::TelephonyMonitor;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors from service lifecycle operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The setup chain has not reached Ready; arming is refused.
    #[error("setup incomplete, blocked at {0:?}")]
    NotReady(Readiness),
}

/// The platform seams the embedder must provide.
pub struct PlatformBindings {
    pub telephony: Arc<dyn TelephonyController>,
    pub gestures: Arc<dyn GestureDispatcher>,
    pub accessibility: Arc<dyn AccessibilityHost>,
    pub permissions: Arc<dyn PermissionGate>,
}

struct Armed {
    answerer: Arc<AutoAnswerer>,
    telephony: Arc<TelephonyMonitor>,
    notifications: Arc<NotificationMonitor>,
    accessibility: Arc<AccessibilityMonitor>,
}

/// The incoming-call detection pipeline, armed and disarmed as a unit.
pub struct DetectionService {
    bindings: PlatformBindings,
    flags: Arc<dyn FlagStore>,
    config: Config,
    events: EventSender,
    armed: Mutex<Option<Armed>>,
}

impl DetectionService {
    pub fn new(
        bindings: PlatformBindings,
        flags: Arc<dyn FlagStore>,
        config: Config,
        events: EventSender,
    ) -> Self {
        Self {
            bindings,
            flags,
            config,
            events,
            armed: Mutex::new(None),
        }
    }

    /// Run the readiness chain against the live permission state.
    pub fn evaluate_readiness(&self) -> Readiness {
        ReadinessMachine::evaluate(self.bindings.permissions.as_ref(), self.flags.as_ref())
    }

    /// One-time welcome checklist for the embedder to present on first
    /// launch. Informational only; arming is not gated on it.
    pub fn take_welcome(&self) -> Option<SetupPrompt> {
        ReadinessMachine::take_welcome(self.flags.as_ref())
    }

    /// Arm the detection pipeline. Refused unless the readiness chain
    /// evaluates Ready right now. Arming twice is a no-op.
    pub fn arm(&self) -> Result<(), ServiceError> {
        let readiness = self.evaluate_readiness();
        if !readiness.is_ready() {
            return Err(ServiceError::NotReady(readiness));
        }

        let mut armed = self.armed.lock();
        if armed.is_some() {
            return Ok(());
        }

        let keywords = self.config.keywords.sets();

        let accessibility = Arc::new(AccessibilityMonitor::new(
            Arc::clone(&self.bindings.accessibility),
            Arc::clone(&self.bindings.gestures),
            self.events.clone(),
            &self.config.detection,
            keywords.clone(),
            self.config.timing,
        ));

        let answerer = Arc::new(AutoAnswerer::new(
            Arc::clone(&self.bindings.telephony),
            Arc::clone(&self.bindings.gestures),
            Arc::clone(&self.bindings.accessibility),
            Some(Arc::clone(&accessibility) as Arc<dyn DelegateSignal>),
            keywords.clone(),
            self.config.timing.tap_pacing(),
        ));

        let telephony = Arc::new(TelephonyMonitor::new(
            Arc::clone(&answerer),
            self.events.clone(),
        ));
        let notifications = Arc::new(NotificationMonitor::new(
            Arc::clone(&answerer),
            self.events.clone(),
            &self.config.detection,
            keywords,
        ));

        info!(
            "Detection pipeline armed for {}",
            self.config.detection.target_package
        );
        *armed = Some(Armed {
            answerer,
            telephony,
            notifications,
            accessibility,
        });
        Ok(())
    }

    /// Tear the pipeline down. Pending delayed work is dropped; signals
    /// forwarded afterwards are ignored.
    pub fn disarm(&self) {
        let armed = self.armed.lock().take();
        if let Some(armed) = armed {
            armed.accessibility.teardown();
            armed.answerer.shutdown();
            info!("Detection pipeline disarmed");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.lock().is_some()
    }

    /// Forward a native call-state label from the platform.
    pub fn on_call_state_label(&self, label: &str) {
        let monitor = self.armed.lock().as_ref().map(|a| Arc::clone(&a.telephony));
        if let Some(monitor) = monitor {
            monitor.on_call_state_label(label);
        }
    }

    /// Forward a posted notification from the platform.
    pub fn on_notification_posted(&self, record: &NotificationRecord) {
        let monitor = self
            .armed
            .lock()
            .as_ref()
            .map(|a| Arc::clone(&a.notifications));
        if let Some(monitor) = monitor {
            monitor.on_notification_posted(record);
        }
    }

    /// Forward a removed notification from the platform.
    pub fn on_notification_removed(&self, package: &str) {
        let monitor = self
            .armed
            .lock()
            .as_ref()
            .map(|a| Arc::clone(&a.notifications));
        if let Some(monitor) = monitor {
            monitor.on_notification_removed(package);
        }
    }

    /// Forward a UI accessibility event from the platform.
    pub fn on_ui_event(&self, package: &str, kind: UiEventKind) {
        let monitor = self
            .armed
            .lock()
            .as_ref()
            .map(|a| Arc::clone(&a.accessibility));
        if let Some(monitor) = monitor {
            monitor.on_ui_event(package, kind);
        }
    }

    /// Per-source detection totals since arming. All zeroes while disarmed.
    pub fn counts(&self) -> CountTotals {
        match self.armed.lock().as_ref() {
            Some(armed) => CountTotals {
                native: armed.telephony.call_count(),
                app_notification: armed.notifications.call_count(),
                app_accessibility: armed.accessibility.call_count(),
            },
            None => CountTotals::default(),
        }
    }
}

impl Drop for DetectionService {
    fn drop(&mut self) {
        self.disarm();
    }
}
