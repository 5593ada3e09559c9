//! Build-cache skip: when a cache marker says the last build is still good,
//! an EXEC invocation ends early with success.

use std::path::Path;
use derive_more::Display;
use ci_mode_core::context::InvocationContext;
use ci_mode_core::hook::{ExitReason, HookAction, ModeHook};
use crate::CACHE_ORDER;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CacheDecision {
    #[display("Continue")]
    Continue,
    #[display("Skip")]
    Skip,
}

/// `Skip` when the marker exists, unless the build is forced.
pub fn decide(marker: Option<&Path>, force: bool) -> CacheDecision {
    if force {
        return CacheDecision::Continue;
    }
    match marker {
        Some(marker) if marker.exists() => CacheDecision::Skip,
        _ => CacheDecision::Continue,
    }
}

/// Truthy values of the force-build variable
pub fn is_forced(value: Option<&str>) -> bool {
    matches!(
        value.map(|value| value.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes")
    )
}

pub struct CacheSkipHook;

impl ModeHook for CacheSkipHook {
    fn name(&self) -> &str { "cache" }

    fn order(&self) -> u32 { CACHE_ORDER }

    fn description(&self) -> &str {
        "Exits with 0 when the cache marker exists and the build is not forced"
    }

    fn evaluate(&self, context: &InvocationContext) -> HookAction {
        if !context.mode().is_exec() {
            return HookAction::Continue;
        }
        let Some(marker) = context.config().cache_marker.as_deref() else {
            return HookAction::Continue;
        };
        let force = is_forced(context.env_var(&context.config().force_build_key()));

        match decide(Some(marker), force) {
            CacheDecision::Skip => {
                log::info!("Script '{}' is up to date ({} present)", context.script(), marker.display());
                HookAction::Exit { code: 0, reason: ExitReason::Cached }
            }
            CacheDecision::Continue => HookAction::Continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use ci_mode_core::config::RunnerConfig;
    use ci_mode_core::mode::Mode;
    use ci_mode_core::resolver::{ModeScope, Resolution};
    use tempfile::TempDir;

    fn context(mode: Mode, marker: &Path, env: &[(&str, &str)]) -> InvocationContext {
        let config = RunnerConfig {
            cache_marker: Some(marker.to_path_buf()),
            ..Default::default()
        };
        let resolution = Resolution {
            script: "build.sh".into(),
            mode,
            scope: ModeScope::Default,
            error_code: 1,
        };
        let env = env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<HashMap<_, _>>();
        InvocationContext::new(Arc::new(config), resolution, env)
    }

    #[test]
    fn decision_follows_marker_and_force() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join(".built");

        assert_eq!(decide(Some(&marker), false), CacheDecision::Continue);
        std::fs::write(&marker, "").unwrap();
        assert_eq!(decide(Some(&marker), false), CacheDecision::Skip);
        assert_eq!(decide(Some(&marker), true), CacheDecision::Continue);
        assert_eq!(decide(None, false), CacheDecision::Continue);
        assert_eq!(CacheDecision::Skip.to_string(), "Skip");
    }

    #[test]
    fn force_values() {
        assert!(is_forced(Some("1")));
        assert!(is_forced(Some(" TRUE ")));
        assert!(!is_forced(Some("0")));
        assert!(!is_forced(None));
    }

    #[test]
    fn hook_skips_exec_when_marker_present() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join(".built");
        std::fs::write(&marker, "").unwrap();

        assert_eq!(
            CacheSkipHook.evaluate(&context(Mode::Exec, &marker, &[])),
            HookAction::Exit { code: 0, reason: ExitReason::Cached }
        );
        assert!(CacheSkipHook.evaluate(&context(Mode::Exec, &marker, &[("CI_MODE_FORCE_BUILD", "1")])).is_continue());
        assert!(CacheSkipHook.evaluate(&context(Mode::Dry, &marker, &[])).is_continue());
    }
}
