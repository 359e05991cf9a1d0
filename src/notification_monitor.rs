//! Notification-based call detection
//!
//! Watches notifications posted by the monitored messaging app and decides
//! which of them announce an incoming call. A match bumps the detection
//! counter and hands the notification to the auto-answer strategy chain.
//!
//! Classification is text-only: the notification's fields are concatenated
//! and checked against the call-phrase keyword set plus the configured
//! literal markers. Posts from any other package are ignored no matter what
//! their text says.

use crate::auto_answer::AutoAnswerer;
use crate::classify::{classify_call_text, KeywordSets};
use crate::config::DetectionConfig;
use crate::event::{publish, CallEvent, CallSource, CountChanged, EventSender, PipelineEvent};
use crate::platform::NotificationRecord;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Monitors posted notifications for incoming-call announcements.
pub struct NotificationMonitor {
    answerer: Arc<AutoAnswerer>,
    events: EventSender,
    target_package: String,
    extra_call_markers: Vec<String>,
    keywords: KeywordSets,
    count: AtomicU64,
}

impl NotificationMonitor {
    pub fn new(
        answerer: Arc<AutoAnswerer>,
        events: EventSender,
        detection: &DetectionConfig,
        keywords: KeywordSets,
    ) -> Self {
        Self {
            answerer,
            events,
            target_package: detection.target_package.clone(),
            extra_call_markers: detection
                .extra_call_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            keywords,
            count: AtomicU64::new(0),
        }
    }

    /// Entry point for the platform's notification-posted callback.
    pub fn on_notification_posted(&self, record: &NotificationRecord) {
        if record.package != self.target_package {
            return;
        }

        let combined = record.combined_text();
        if !self.is_call_announcement(&combined) {
            debug!("Notification from {} is not a call: {record:?}", record.package);
            return;
        }

        let total = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "Incoming call notification detected from {}, total {total}",
            record.package
        );

        publish(
            &self.events,
            PipelineEvent::CallDetected(CallEvent::new(
                CallSource::AppNotification,
                Some(combined),
            )),
        );
        publish(
            &self.events,
            PipelineEvent::CountChanged(CountChanged {
                source: CallSource::AppNotification,
                total,
            }),
        );

        let attempts = self.answerer.answer_app_call(record);
        for attempt in &attempts {
            debug!(
                "Answer attempt {:?} (succeeded: {})",
                attempt.strategy, attempt.succeeded
            );
        }
        if !attempts.iter().any(|a| a.succeeded) {
            info!("No answer strategy reported success for this call");
        }
    }

    /// Entry point for the platform's notification-removed callback. Removal
    /// carries no call semantics; it is logged for diagnosis only.
    pub fn on_notification_removed(&self, package: &str) {
        if package == self.target_package {
            debug!("Notification removed for {package}");
        }
    }

    /// Process-lifetime notification call total.
    pub fn call_count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    fn is_call_announcement(&self, combined: &str) -> bool {
        if classify_call_text(combined, &self.keywords) {
            return true;
        }
        self.extra_call_markers.iter().any(|m| combined.contains(m.as_str()))
    }
}
