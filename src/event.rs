//! Detection events and count aggregation
//!
//! Monitors publish fire-and-forget events over a crossbeam channel: one per
//! detected call, and one per counter change. The aggregator merges the
//! per-source totals for presentation. Consumers see eventually-consistent
//! snapshots, never transactional ones.

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where a detected call came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSource {
    /// The native cellular telephony subsystem.
    Native,
    /// A posted notification from the target messaging app.
    AppNotification,
    /// The target messaging app's on-screen call UI.
    AppAccessibility,
}

/// One positively classified incoming call. Consumed immediately; never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEvent {
    pub id: Uuid,
    pub source: CallSource,
    pub timestamp: DateTime<Utc>,
    /// The text that triggered classification, when there was any.
    pub raw_text: Option<String>,
}

impl CallEvent {
    pub fn new(source: CallSource, raw_text: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            timestamp: Utc::now(),
            raw_text,
        }
    }
}

/// A counter moved. `total` is the new per-source total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountChanged {
    pub source: CallSource,
    pub total: u64,
}

/// Everything the pipeline reports outward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    CallDetected(CallEvent),
    CountChanged(CountChanged),
}

/// Sender half handed to each monitor. Sends never block and never fail the
/// caller: a disconnected consumer just drops the event.
pub type EventSender = Sender<PipelineEvent>;

/// Create the pipeline event channel.
pub fn event_channel() -> (EventSender, Receiver<PipelineEvent>) {
    crossbeam_channel::unbounded()
}

/// Publish an event, ignoring a gone consumer.
pub fn publish(sender: &EventSender, event: PipelineEvent) {
    if sender.send(event).is_err() {
        tracing::debug!("Event consumer disconnected, dropping event");
    }
}

/// Merges counter updates from all monitors into per-source totals.
///
/// Presentation-side collaborator: drain on whatever cadence the UI wants
/// and read the snapshot.
pub struct CountAggregator {
    receiver: Receiver<PipelineEvent>,
    totals: Mutex<CountTotals>,
}

/// Snapshot of all per-source totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountTotals {
    pub native: u64,
    pub app_notification: u64,
    pub app_accessibility: u64,
}

impl CountTotals {
    fn apply(&mut self, update: CountChanged) {
        match update.source {
            CallSource::Native => self.native = update.total,
            CallSource::AppNotification => self.app_notification = update.total,
            CallSource::AppAccessibility => self.app_accessibility = update.total,
        }
    }
}

impl CountAggregator {
    pub fn new(receiver: Receiver<PipelineEvent>) -> Self {
        Self {
            receiver,
            totals: Mutex::new(CountTotals::default()),
        }
    }

    /// Drain pending events and return the merged totals.
    pub fn drain(&self) -> CountTotals {
        let mut totals = self.totals.lock();
        while let Ok(event) = self.receiver.try_recv() {
            match event {
                PipelineEvent::CountChanged(update) => totals.apply(update),
                PipelineEvent::CallDetected(call) => {
                    tracing::debug!(source = ?call.source, id = %call.id, "Call detected");
                }
            }
        }
        *totals
    }

    /// Last merged totals without draining.
    pub fn totals(&self) -> CountTotals {
        *self.totals.lock()
    }
}
