use ci_mode_core::context::InvocationContext;
use ci_mode_core::hook::{HookAction, HookPhase, ModeHook};
use ci_mode_core::mode::Mode;
use crate::{TIMEOUT_CLEANUP_ORDER, TIMEOUT_ORDER};

/// TIMEOUT:n: arms the deadline the wrapped action races against.
pub struct TimeoutHook;

impl ModeHook for TimeoutHook {
    fn name(&self) -> &str { "timeout" }

    fn order(&self) -> u32 { TIMEOUT_ORDER }

    fn description(&self) -> &str {
        "Arms a deadline of n seconds; the wrapped action is killed when it elapses"
    }

    fn evaluate(&self, context: &InvocationContext) -> HookAction {
        // TIMEOUT:0 is not applicable
        match context.mode().timeout() {
            Some(deadline) => {
                log::debug!("Script '{}' limited to {}s", context.script(), deadline.as_secs());
                HookAction::ArmTimeout { seconds: deadline.as_secs() }
            }
            None => HookAction::Continue,
        }
    }
}

/// Disarms the deadline once the wrapped action is over.
pub struct TimeoutCleanupHook;

impl ModeHook for TimeoutCleanupHook {
    fn name(&self) -> &str { "timeout-cleanup" }

    fn phase(&self) -> HookPhase { HookPhase::End }

    fn order(&self) -> u32 { TIMEOUT_CLEANUP_ORDER }

    fn description(&self) -> &str {
        "Cancels a pending TIMEOUT deadline"
    }

    fn evaluate(&self, context: &InvocationContext) -> HookAction {
        match context.mode() {
            Mode::Timeout(_) => HookAction::CancelTimeout,
            _ => HookAction::Continue,
        }
    }
}
