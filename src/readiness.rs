//! Setup readiness state machine
//!
//! Sequences the permission and settings checks that must pass before the
//! detection pipeline may be armed. The chain is re-run in full on every
//! foreground re-entry, so a permission revoked behind the app's back
//! demotes the state back to the step that can fix it.
//!
//! Steps fall in two classes. Programmatically checkable ones (runtime
//! permissions, the notification-listener registry, battery exemption) are
//! verified live on every run. Unverifiable ones (OEM autostart, the manual
//! checklist) are tracked by persisted set-once flags and never re-prompt.

use crate::flags::{
    FlagStore, FLAG_AUTOSTART_ADDRESSED, FLAG_BATTERY_ADDRESSED, FLAG_FINAL_CHECKLIST_SHOWN,
    FLAG_FIRST_RUN,
};
use crate::platform::PermissionGate;
use tracing::{debug, info};

/// The ordered setup steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SetupStep {
    BasicPermissions,
    NotificationAccess,
    BatteryOptimization,
    Autostart,
    FinalManual,
}

/// The single prompt the embedder must present for a step.
///
/// All variants but `ShowWelcome` belong to a blocked step; `ShowWelcome`
/// is informational only and comes from [`ReadinessMachine::take_welcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupPrompt {
    ShowWelcome,
    RequestPermissions,
    OpenNotificationSettings,
    OpenBatterySettings,
    OpenAutostartSettings,
    ShowFinalChecklist,
}

/// Outcome of a readiness evaluation.
///
/// `Blocked` with `prompt: None` means the blocking condition is still
/// unmet but its prompt has already been shown once and is never repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Blocked {
        step: SetupStep,
        prompt: Option<SetupPrompt>,
    },
}

impl Readiness {
    pub fn is_ready(self) -> bool {
        matches!(self, Readiness::Ready)
    }

    fn blocked(step: SetupStep, prompt: SetupPrompt) -> Self {
        Readiness::Blocked {
            step,
            prompt: Some(prompt),
        }
    }
}

/// Evaluates the full setup chain against the live permission state.
pub struct ReadinessMachine;

impl ReadinessMachine {
    /// One-time welcome checklist, consulted before the chain. Returns the
    /// informational prompt exactly once per install; it never blocks and
    /// is independent of the permission state.
    pub fn take_welcome(flags: &dyn FlagStore) -> Option<SetupPrompt> {
        if flags.get(FLAG_FIRST_RUN) {
            return None;
        }
        info!("First launch, surfacing welcome checklist");
        flags.set(FLAG_FIRST_RUN, true);
        Some(SetupPrompt::ShowWelcome)
    }

    /// Run the whole chain from the top and return the first blocking step,
    /// or `Ready` when the pipeline may be armed.
    ///
    /// Set-once prompt flags are written as a side effect the first time
    /// their prompt is emitted, so the caller presenting the prompt needs no
    /// bookkeeping of its own.
    pub fn evaluate(gate: &dyn PermissionGate, flags: &dyn FlagStore) -> Readiness {
        if !gate.runtime_permissions_granted() {
            debug!("Runtime permissions missing");
            return Readiness::blocked(
                SetupStep::BasicPermissions,
                SetupPrompt::RequestPermissions,
            );
        }

        if !gate.notification_listener_enabled() {
            debug!("Notification listener not enabled");
            return Readiness::blocked(
                SetupStep::NotificationAccess,
                SetupPrompt::OpenNotificationSettings,
            );
        }

        // The battery prompt is shown at most once; the condition keeps
        // gating Ready below even after the prompt is spent.
        let battery_unmet = gate.supports_battery_exemption() && !gate.battery_exempt();
        if battery_unmet && !flags.get(FLAG_BATTERY_ADDRESSED) {
            flags.set(FLAG_BATTERY_ADDRESSED, true);
            return Readiness::blocked(
                SetupStep::BatteryOptimization,
                SetupPrompt::OpenBatterySettings,
            );
        }

        // Vendor autostart cannot be verified, so this step prompts once and
        // then always passes.
        if !flags.get(FLAG_AUTOSTART_ADDRESSED) {
            flags.set(FLAG_AUTOSTART_ADDRESSED, true);
            return Readiness::blocked(
                SetupStep::Autostart,
                SetupPrompt::OpenAutostartSettings,
            );
        }

        // The manual checklist only appears while something checkable is
        // still unmet; a clean run never sees it.
        if battery_unmet && !flags.get(FLAG_FINAL_CHECKLIST_SHOWN) {
            flags.set(FLAG_FINAL_CHECKLIST_SHOWN, true);
            return Readiness::blocked(SetupStep::FinalManual, SetupPrompt::ShowFinalChecklist);
        }

        if battery_unmet {
            debug!("Battery exemption still missing, prompt already spent");
            return Readiness::Blocked {
                step: SetupStep::BatteryOptimization,
                prompt: None,
            };
        }

        Readiness::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::MemoryFlagStore;
    use parking_lot::Mutex;

    struct FakeGate {
        permissions: Mutex<bool>,
        listener: Mutex<bool>,
        battery_supported: bool,
        battery_exempt: Mutex<bool>,
    }

    impl FakeGate {
        fn new(battery_supported: bool) -> Self {
            Self {
                permissions: Mutex::new(false),
                listener: Mutex::new(false),
                battery_supported,
                battery_exempt: Mutex::new(false),
            }
        }

        fn grant_all(&self) {
            *self.permissions.lock() = true;
            *self.listener.lock() = true;
            *self.battery_exempt.lock() = true;
        }
    }

    impl PermissionGate for FakeGate {
        fn runtime_permissions_granted(&self) -> bool {
            *self.permissions.lock()
        }

        fn notification_listener_enabled(&self) -> bool {
            *self.listener.lock()
        }

        fn supports_battery_exemption(&self) -> bool {
            self.battery_supported
        }

        fn battery_exempt(&self) -> bool {
            *self.battery_exempt.lock()
        }
    }

    #[test]
    fn test_fresh_install_blocks_on_permissions() {
        let gate = FakeGate::new(true);
        let flags = MemoryFlagStore::new();

        let state = ReadinessMachine::evaluate(&gate, &flags);
        assert_eq!(
            state,
            Readiness::blocked(SetupStep::BasicPermissions, SetupPrompt::RequestPermissions)
        );
    }

    #[test]
    fn test_listener_checked_after_permissions() {
        let gate = FakeGate::new(true);
        *gate.permissions.lock() = true;
        let flags = MemoryFlagStore::new();

        let state = ReadinessMachine::evaluate(&gate, &flags);
        assert_eq!(
            state,
            Readiness::blocked(
                SetupStep::NotificationAccess,
                SetupPrompt::OpenNotificationSettings
            )
        );
    }

    #[test]
    fn test_clean_run_reaches_ready_after_autostart_prompt() {
        let gate = FakeGate::new(true);
        gate.grant_all();
        let flags = MemoryFlagStore::new();

        // The one unverifiable prompt fires once, then the chain completes.
        let first = ReadinessMachine::evaluate(&gate, &flags);
        assert_eq!(
            first,
            Readiness::blocked(SetupStep::Autostart, SetupPrompt::OpenAutostartSettings)
        );
        let second = ReadinessMachine::evaluate(&gate, &flags);
        assert!(second.is_ready());
    }

    #[test]
    fn test_battery_prompt_spent_after_one_showing() {
        let gate = FakeGate::new(true);
        *gate.permissions.lock() = true;
        *gate.listener.lock() = true;

        let flags = MemoryFlagStore::new();

        let first = ReadinessMachine::evaluate(&gate, &flags);
        assert_eq!(
            first,
            Readiness::blocked(
                SetupStep::BatteryOptimization,
                SetupPrompt::OpenBatterySettings
            )
        );

        // User declined the exemption; the chain marches through autostart
        // and the final checklist, then parks on the unmet battery gate
        // without ever re-prompting.
        let second = ReadinessMachine::evaluate(&gate, &flags);
        assert_eq!(
            second,
            Readiness::blocked(SetupStep::Autostart, SetupPrompt::OpenAutostartSettings)
        );
        let third = ReadinessMachine::evaluate(&gate, &flags);
        assert_eq!(
            third,
            Readiness::blocked(SetupStep::FinalManual, SetupPrompt::ShowFinalChecklist)
        );
        let fourth = ReadinessMachine::evaluate(&gate, &flags);
        assert_eq!(
            fourth,
            Readiness::Blocked {
                step: SetupStep::BatteryOptimization,
                prompt: None,
            }
        );

        // Exemption granted later unblocks without further prompting.
        *gate.battery_exempt.lock() = true;
        assert!(ReadinessMachine::evaluate(&gate, &flags).is_ready());
    }

    #[test]
    fn test_unsupported_battery_platform_skips_step() {
        let gate = FakeGate::new(false);
        gate.grant_all();
        let flags = MemoryFlagStore::new();
        flags.set(FLAG_AUTOSTART_ADDRESSED, true);

        assert!(ReadinessMachine::evaluate(&gate, &flags).is_ready());
    }

    #[test]
    fn test_final_checklist_skipped_when_everything_checkable_passes() {
        let gate = FakeGate::new(true);
        gate.grant_all();
        let flags = MemoryFlagStore::new();
        flags.set(FLAG_AUTOSTART_ADDRESSED, true);

        assert!(ReadinessMachine::evaluate(&gate, &flags).is_ready());
        assert!(!flags.get(FLAG_FINAL_CHECKLIST_SHOWN));
    }

    #[test]
    fn test_revoked_permission_demotes_ready() {
        let gate = FakeGate::new(true);
        gate.grant_all();
        let flags = MemoryFlagStore::new();
        flags.set(FLAG_AUTOSTART_ADDRESSED, true);

        assert!(ReadinessMachine::evaluate(&gate, &flags).is_ready());

        *gate.listener.lock() = false;
        let state = ReadinessMachine::evaluate(&gate, &flags);
        assert_eq!(
            state,
            Readiness::blocked(
                SetupStep::NotificationAccess,
                SetupPrompt::OpenNotificationSettings
            )
        );
    }

    #[test]
    fn test_welcome_surfaced_exactly_once() {
        let flags = MemoryFlagStore::new();

        assert_eq!(
            ReadinessMachine::take_welcome(&flags),
            Some(SetupPrompt::ShowWelcome)
        );
        assert!(flags.get(FLAG_FIRST_RUN));
        assert_eq!(ReadinessMachine::take_welcome(&flags), None);
    }

    #[test]
    fn test_welcome_never_blocks_and_survives_evaluate() {
        let gate = FakeGate::new(true);
        gate.grant_all();
        let flags = MemoryFlagStore::new();
        flags.set(FLAG_AUTOSTART_ADDRESSED, true);

        // Evaluating first does not swallow the welcome, and taking the
        // welcome does not change the chain's outcome.
        assert!(ReadinessMachine::evaluate(&gate, &flags).is_ready());
        assert_eq!(
            ReadinessMachine::take_welcome(&flags),
            Some(SetupPrompt::ShowWelcome)
        );
        assert!(ReadinessMachine::evaluate(&gate, &flags).is_ready());
    }
}
