use ci_mode_core::context::InvocationContext;
use ci_mode_core::hook::{HookAction, ModeHook};
use ci_mode_core::mode::Mode;
use crate::DRY_ORDER;

/// DRY: flags the run as a dry run and lets the wrapped action go ahead.
pub struct DryRunHook;

impl ModeHook for DryRunHook {
    fn name(&self) -> &str { "dry" }

    fn order(&self) -> u32 { DRY_ORDER }

    fn description(&self) -> &str {
        "Sets the dry-run variable to true, the wrapped action still runs"
    }

    fn evaluate(&self, context: &InvocationContext) -> HookAction {
        if *context.mode() != Mode::Dry {
            return HookAction::Continue;
        }
        log::info!("Script '{}' runs as a dry run", context.script());
        HookAction::SetEnv {
            name: context.config().dry_run_var.clone(),
            value: "true".to_string(),
        }
    }
}
