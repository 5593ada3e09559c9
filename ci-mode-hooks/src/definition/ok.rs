use ci_mode_core::context::InvocationContext;
use ci_mode_core::hook::{ExitReason, HookAction, ModeHook};
use ci_mode_core::mode::Mode;
use crate::OK_ORDER;

/// OK: reports success without running anything.
pub struct OkHook;

impl ModeHook for OkHook {
    fn name(&self) -> &str { "ok" }

    fn order(&self) -> u32 { OK_ORDER }

    fn description(&self) -> &str {
        "Exits with 0 before the wrapped action runs"
    }

    fn evaluate(&self, context: &InvocationContext) -> HookAction {
        if *context.mode() != Mode::Ok {
            return HookAction::Continue;
        }
        log::info!("Script '{}' simulated as successful", context.script());
        HookAction::Exit { code: 0, reason: ExitReason::Ok }
    }
}
