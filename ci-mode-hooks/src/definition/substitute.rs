use ci_mode_core::context::InvocationContext;
use ci_mode_core::hook::{HookAction, ModeHook};
use crate::TEST_ORDER;

/// TEST:path: runs the mock script in place of the wrapped action.
pub struct SubstituteHook;

impl ModeHook for SubstituteHook {
    fn name(&self) -> &str { "test" }

    fn order(&self) -> u32 { TEST_ORDER }

    fn description(&self) -> &str {
        "Runs the given script instead of the wrapped action and exits with its status"
    }

    fn evaluate(&self, context: &InvocationContext) -> HookAction {
        // The file may have vanished since resolution; then behave like EXEC
        match context.mode().test_script() {
            Some(path) => HookAction::Substitute { path: path.to_path_buf() },
            None => HookAction::Continue,
        }
    }
}
