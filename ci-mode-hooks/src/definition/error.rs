use ci_mode_core::context::InvocationContext;
use ci_mode_core::hook::{ExitReason, HookAction, ModeHook};
use ci_mode_core::mode::Mode;
use crate::ERROR_ORDER;

pub struct ErrorHook;

impl ModeHook for ErrorHook {
    fn name(&self) -> &str { "error" }

    fn order(&self) -> u32 { ERROR_ORDER }

    fn description(&self) -> &str {
        "Exits with the configured error code (default 1) before the wrapped action runs"
    }

    fn evaluate(&self, context: &InvocationContext) -> HookAction {
        if *context.mode() != Mode::Error {
            return HookAction::Continue;
        }
        let code = context.error_code();
        log::info!("Script '{}' simulated as failing with {}", context.script(), code);
        HookAction::Exit { code, reason: ExitReason::Error }
    }
}
