use ci_mode_core::context::InvocationContext;
use ci_mode_core::hook::{ExitReason, HookAction, ModeHook};
use ci_mode_core::mode::Mode;
use crate::SKIP_ORDER;

/// SKIP: same exit status as OK, reported as skipped.
pub struct SkipHook;

impl ModeHook for SkipHook {
    fn name(&self) -> &str { "skip" }

    fn order(&self) -> u32 { SKIP_ORDER }

    fn description(&self) -> &str {
        "Exits with 0 and records the script as skipped"
    }

    fn evaluate(&self, context: &InvocationContext) -> HookAction {
        if *context.mode() != Mode::Skip {
            return HookAction::Continue;
        }
        log::info!("Script '{}' skipped", context.script());
        HookAction::Exit { code: 0, reason: ExitReason::Skip }
    }
}
