//! Layered auto-answer strategies
//!
//! A detected call is answered by trying an ordered chain of best-effort
//! strategies until one succeeds. No single method is guaranteed to work:
//! native accept needs an elevated privilege, notification actions go stale,
//! the target app may render a screen the scanner cannot read. Every
//! strategy is wrapped so its failure is a uniform negative result; nothing
//! in this module ever propagates an error to the calling monitor.

use crate::classify::{classify_answer_label, KeywordSets};
use crate::delay::DelayQueue;
use crate::gesture;
use crate::platform::{
    AccessibilityHost, DelegateSignal, GestureDispatcher, NotificationRecord, TelephonyController,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One rung of the strategy chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStrategy {
    /// Programmatic accept through the telephony subsystem (native calls
    /// only).
    NativeAccept,
    /// Invoking a notification action labelled as "answer".
    NotificationAction,
    /// Firing the notification's primary intent to foreground the app.
    ContentIntent,
    /// Delegating to the accessibility monitor's scan-and-answer procedure.
    AccessibilityDelegate,
    /// Synthetic taps at common answer-button positions.
    Gesture,
}

/// Outcome of one strategy. `succeeded` is dispatch-level only: a dispatched
/// tap or fired intent may still not have answered the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerAttempt {
    pub strategy: AnswerStrategy,
    pub succeeded: bool,
}

impl AnswerAttempt {
    pub fn ok(strategy: AnswerStrategy) -> Self {
        Self {
            strategy,
            succeeded: true,
        }
    }

    pub fn failed(strategy: AnswerStrategy) -> Self {
        Self {
            strategy,
            succeeded: false,
        }
    }
}

/// Executes the strategy chain for both the native and the app call paths.
pub struct AutoAnswerer {
    telephony: Arc<dyn TelephonyController>,
    gestures: Arc<dyn GestureDispatcher>,
    accessibility: Arc<dyn AccessibilityHost>,
    delegate: Option<Arc<dyn DelegateSignal>>,
    keywords: KeywordSets,
    tap_pacing: Duration,
    alive: Arc<AtomicBool>,
    queue: DelayQueue,
}

impl AutoAnswerer {
    pub fn new(
        telephony: Arc<dyn TelephonyController>,
        gestures: Arc<dyn GestureDispatcher>,
        accessibility: Arc<dyn AccessibilityHost>,
        delegate: Option<Arc<dyn DelegateSignal>>,
        keywords: KeywordSets,
        tap_pacing: Duration,
    ) -> Self {
        let alive = Arc::new(AtomicBool::new(true));
        let queue = DelayQueue::new("auto-answer", Arc::clone(&alive));
        Self {
            telephony,
            gestures,
            accessibility,
            delegate,
            keywords,
            tap_pacing,
            alive,
            queue,
        }
    }

    /// Native path: accept the ringing cellular call, silently a no-op when
    /// the privilege or platform support is absent.
    pub fn answer_native_call(&self) -> AnswerAttempt {
        if !self.telephony.supports_accept() {
            debug!("Native accept unavailable (privilege or platform version)");
            return AnswerAttempt::failed(AnswerStrategy::NativeAccept);
        }
        match self.telephony.accept_ringing_call() {
            Ok(()) => {
                info!("Native call answered via telephony subsystem");
                AnswerAttempt::ok(AnswerStrategy::NativeAccept)
            }
            Err(e) => {
                warn!("Native accept failed: {e}");
                AnswerAttempt::failed(AnswerStrategy::NativeAccept)
            }
        }
    }

    /// App path: run the chain against a call notification from the target
    /// app. Stops at the first confirmed success; later strategies are
    /// attempted when an earlier one only "fired" without confirmation.
    pub fn answer_app_call(&self, record: &NotificationRecord) -> Vec<AnswerAttempt> {
        let mut chain = Vec::new();

        let action = self.try_notification_action(record);
        let action_ok = action.succeeded;
        chain.push(action);
        if action_ok {
            return chain;
        }

        // Weaker fallback: foreground the app through its content intent,
        // then hand the answer attempt to the accessibility monitor, which
        // applies its own foregrounding delay before scanning.
        let content = self.try_content_intent(record);
        let content_fired = content.succeeded;
        chain.push(content);

        let delegate = self.try_delegate();
        let delegate_fired = delegate.succeeded;
        chain.push(delegate);

        if !content_fired && !delegate_fired {
            chain.push(self.try_gesture());
        }

        chain
    }

    /// Tear down: cancels any scheduled gesture work.
    pub fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.queue.shutdown();
    }

    fn try_notification_action(&self, record: &NotificationRecord) -> AnswerAttempt {
        for action in &record.actions {
            if !classify_answer_label(&action.label, &self.keywords) {
                continue;
            }
            debug!("Found answer action '{}'", action.label);
            match action.handle.invoke() {
                Ok(()) => {
                    info!("Answer action '{}' invoked", action.label);
                    return AnswerAttempt::ok(AnswerStrategy::NotificationAction);
                }
                // A cancelled intent is a strategy failure, keep scanning.
                Err(e) => warn!("Answer action '{}' failed: {e}", action.label),
            }
        }
        debug!("No usable answer action on the notification");
        AnswerAttempt::failed(AnswerStrategy::NotificationAction)
    }

    fn try_content_intent(&self, record: &NotificationRecord) -> AnswerAttempt {
        let Some(content) = &record.content else {
            debug!("Notification has no content intent");
            return AnswerAttempt::failed(AnswerStrategy::ContentIntent);
        };
        match content.invoke() {
            Ok(()) => {
                info!("Content intent fired to foreground the app");
                AnswerAttempt::ok(AnswerStrategy::ContentIntent)
            }
            Err(e) => {
                warn!("Content intent failed: {e}");
                AnswerAttempt::failed(AnswerStrategy::ContentIntent)
            }
        }
    }

    fn try_delegate(&self) -> AnswerAttempt {
        let Some(delegate) = &self.delegate else {
            debug!("No accessibility delegate wired");
            return AnswerAttempt::failed(AnswerStrategy::AccessibilityDelegate);
        };
        delegate.request_auto_answer();
        info!("Auto-answer delegated to the accessibility monitor");
        AnswerAttempt::ok(AnswerStrategy::AccessibilityDelegate)
    }

    /// Last resort, reached only when nothing else fired. The paced tap
    /// sequence is deferred to the delay queue so the delivering callback
    /// thread is never blocked.
    fn try_gesture(&self) -> AnswerAttempt {
        if !self.gestures.is_supported() {
            debug!("Synthetic input unsupported, gesture strategy unavailable");
            return AnswerAttempt::failed(AnswerStrategy::Gesture);
        }
        let Some(screen) = self.accessibility.screen_size() else {
            warn!("No display metrics, gesture strategy unavailable");
            return AnswerAttempt::failed(AnswerStrategy::Gesture);
        };

        let gestures = Arc::clone(&self.gestures);
        let alive = Arc::clone(&self.alive);
        let pacing = self.tap_pacing;
        self.queue.schedule(Duration::ZERO, move || {
            gesture::run_tap_sequence(gestures.as_ref(), screen, pacing, &alive);
        });
        AnswerAttempt::ok(AnswerStrategy::Gesture)
    }
}

impl Drop for AutoAnswerer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{
        ActionHandle, NotificationAction, PlatformError, ScreenSize, UiNode,
    };
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    struct FakeTelephony {
        supported: bool,
        fails: bool,
        accepts: AtomicUsize,
    }

    impl TelephonyController for FakeTelephony {
        fn supports_accept(&self) -> bool {
            self.supported
        }
        fn accept_ringing_call(&self) -> Result<(), PlatformError> {
            if self.fails {
                return Err(PlatformError::Unavailable("telecom".to_string()));
            }
            self.accepts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeGestures {
        supported: bool,
        taps: Mutex<Vec<(i32, i32)>>,
    }

    impl GestureDispatcher for FakeGestures {
        fn is_supported(&self) -> bool {
            self.supported
        }
        fn dispatch_tap(&self, x: i32, y: i32) -> Result<(), PlatformError> {
            self.taps.lock().push((x, y));
            Ok(())
        }
    }

    struct FakeHost {
        screen: Option<ScreenSize>,
    }

    impl AccessibilityHost for FakeHost {
        fn active_root(&self) -> Option<Box<dyn UiNode>> {
            None
        }
        fn screen_size(&self) -> Option<ScreenSize> {
            self.screen
        }
    }

    struct FakeHandle {
        stale: bool,
        invocations: AtomicUsize,
    }

    impl FakeHandle {
        fn fresh() -> Arc<Self> {
            Arc::new(Self {
                stale: false,
                invocations: AtomicUsize::new(0),
            })
        }
        fn stale() -> Arc<Self> {
            Arc::new(Self {
                stale: true,
                invocations: AtomicUsize::new(0),
            })
        }
    }

    impl ActionHandle for FakeHandle {
        fn invoke(&self) -> Result<(), PlatformError> {
            if self.stale {
                return Err(PlatformError::StaleHandle);
            }
            self.invocations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeDelegate {
        requests: AtomicUsize,
    }

    impl DelegateSignal for FakeDelegate {
        fn request_auto_answer(&self) {
            self.requests.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn answerer(
        telephony_supported: bool,
        gestures_supported: bool,
        delegate: Option<Arc<FakeDelegate>>,
    ) -> AutoAnswerer {
        AutoAnswerer::new(
            Arc::new(FakeTelephony {
                supported: telephony_supported,
                fails: false,
                accepts: AtomicUsize::new(0),
            }),
            Arc::new(FakeGestures {
                supported: gestures_supported,
                taps: Mutex::new(Vec::new()),
            }),
            Arc::new(FakeHost {
                screen: Some(ScreenSize {
                    width: 1080,
                    height: 1920,
                }),
            }),
            delegate.map(|d| d as Arc<dyn DelegateSignal>),
            KeywordSets::default(),
            Duration::from_millis(1),
        )
    }

    fn call_record(actions: Vec<NotificationAction>, content: Option<Arc<FakeHandle>>) -> NotificationRecord {
        NotificationRecord {
            package: "com.whatsapp".to_string(),
            body: Some("Incoming voice call".to_string()),
            actions,
            content: content.map(|c| c as Arc<dyn ActionHandle>),
            ..Default::default()
        }
    }

    #[test]
    fn test_native_accept_success() {
        let telephony = Arc::new(FakeTelephony {
            supported: true,
            fails: false,
            accepts: AtomicUsize::new(0),
        });
        let answerer = AutoAnswerer::new(
            Arc::clone(&telephony) as Arc<dyn TelephonyController>,
            Arc::new(FakeGestures {
                supported: false,
                taps: Mutex::new(Vec::new()),
            }),
            Arc::new(FakeHost { screen: None }),
            None,
            KeywordSets::default(),
            Duration::from_millis(1),
        );
        let attempt = answerer.answer_native_call();
        assert!(attempt.succeeded);
        assert_eq!(attempt.strategy, AnswerStrategy::NativeAccept);
        assert_eq!(telephony.accepts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_native_accept_without_privilege_fails_silently() {
        let answerer = answerer(false, false, None);
        let attempt = answerer.answer_native_call();
        assert!(!attempt.succeeded);
    }

    #[test]
    fn test_answer_action_stops_the_chain() {
        let handle = FakeHandle::fresh();
        let record = call_record(
            vec![
                NotificationAction {
                    label: "Decline".to_string(),
                    handle: FakeHandle::fresh(),
                },
                NotificationAction {
                    label: "Answer".to_string(),
                    handle: Arc::clone(&handle) as Arc<dyn ActionHandle>,
                },
            ],
            Some(FakeHandle::fresh()),
        );

        let answerer = answerer(false, true, None);
        let chain = answerer.answer_app_call(&record);

        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].strategy, AnswerStrategy::NotificationAction);
        assert!(chain[0].succeeded);
        assert_eq!(handle.invocations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stale_action_falls_through_to_content_and_delegate() {
        let content = FakeHandle::fresh();
        let delegate = Arc::new(FakeDelegate {
            requests: AtomicUsize::new(0),
        });
        let record = call_record(
            vec![NotificationAction {
                label: "Answer".to_string(),
                handle: FakeHandle::stale(),
            }],
            Some(Arc::clone(&content)),
        );

        let answerer = answerer(false, true, Some(Arc::clone(&delegate)));
        let chain = answerer.answer_app_call(&record);

        let strategies: Vec<_> = chain.iter().map(|a| a.strategy).collect();
        assert_eq!(
            strategies,
            vec![
                AnswerStrategy::NotificationAction,
                AnswerStrategy::ContentIntent,
                AnswerStrategy::AccessibilityDelegate,
            ]
        );
        assert!(!chain[0].succeeded);
        assert!(chain[1].succeeded);
        assert!(chain[2].succeeded);
        assert_eq!(content.invocations.load(Ordering::SeqCst), 1);
        assert_eq!(delegate.requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_gesture_reached_only_when_nothing_fired() {
        let record = call_record(Vec::new(), None);
        let answerer = answerer(false, true, None);
        let chain = answerer.answer_app_call(&record);

        let strategies: Vec<_> = chain.iter().map(|a| a.strategy).collect();
        assert_eq!(
            strategies,
            vec![
                AnswerStrategy::NotificationAction,
                AnswerStrategy::ContentIntent,
                AnswerStrategy::AccessibilityDelegate,
                AnswerStrategy::Gesture,
            ]
        );
        assert!(chain[3].succeeded);
    }

    #[test]
    fn test_all_strategies_fail_without_panicking() {
        let record = call_record(Vec::new(), None);
        let answerer = answerer(false, false, None);
        let chain = answerer.answer_app_call(&record);

        assert_eq!(chain.len(), 4);
        assert!(chain.iter().all(|attempt| !attempt.succeeded));
    }
}
