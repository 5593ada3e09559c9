//! Entry point of a built-in hook running as an isolated child process.
//!
//! The child never resolves on its own when the parent published a
//! resolution; it evaluates one handler and prints the decision as contract
//! lines. A TEST substitution goes back as a `substitute` directive: the
//! parent runs the mock, so its output never travels over the contract pipe.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use ci_mode_core::config::RunnerConfig;
use ci_mode_core::context::InvocationContext;
use ci_mode_core::error::{CiModeError, CiResult};
use ci_mode_core::hook::HookPhase;
use ci_mode_core::resolver::ModeResolver;
use crate::find_hook;

pub async fn run_child(
    name: &str,
    phase: HookPhase,
    config: RunnerConfig,
    env: HashMap<String, String>,
    out: &mut dyn Write,
) -> CiResult<()> {
    let hook = find_hook(name, phase).ok_or_else(|| CiModeError::UnknownHook(format!("{phase}/{name}")))?;

    let resolver = ModeResolver::new(&config);
    let resolution = match resolver.inherited(&env) {
        Some(resolution) => resolution,
        None => {
            let script = env.get(&config.script_name_key()).cloned();
            resolver.resolve(script.as_deref(), &env)
        }
    };
    let ctx = InvocationContext::new(Arc::new(config), resolution, env);

    if let Some(directive) = hook.evaluate(&ctx).to_contract() {
        writeln!(out, "{directive}")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    async fn printed(name: &str, phase: HookPhase, pairs: &[(&str, &str)]) -> String {
        let mut out = Vec::new();
        run_child(name, phase, RunnerConfig::default(), env(pairs), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn prints_the_decision_of_the_published_mode() {
        assert_eq!(
            printed("error", HookPhase::Begin, &[("CI_MODE_RESOLVED", "ERROR"), ("CI_MODE_ERROR_CODE", "7")]).await,
            "contract:exit:7\n"
        );
        assert_eq!(printed("dry", HookPhase::Begin, &[("CI_MODE_RESOLVED", "DRY")]).await, "contract:env:DRY_RUN=true\n");
        assert_eq!(printed("timeout", HookPhase::Begin, &[("CI_MODE_RESOLVED", "TIMEOUT:5")]).await, "contract:timeout:5\n");
        assert_eq!(
            printed("timeout-cleanup", HookPhase::End, &[("CI_MODE_RESOLVED", "TIMEOUT:5")]).await,
            "contract:timeout:cancel\n"
        );
    }

    #[tokio::test]
    async fn non_matching_mode_prints_nothing() {
        assert_eq!(printed("ok", HookPhase::Begin, &[("CI_MODE_RESOLVED", "EXEC")]).await, "");
    }

    #[tokio::test]
    async fn published_mode_wins_over_the_environment() {
        let pairs = [("CI_MODE", "ERROR"), ("CI_MODE_RESOLVED", "OK")];
        assert_eq!(printed("ok", HookPhase::Begin, &pairs).await, "contract:exit:0\n");
        assert_eq!(printed("error", HookPhase::Begin, &pairs).await, "");
    }

    #[tokio::test]
    async fn resolves_itself_without_a_parent() {
        assert_eq!(printed("skip", HookPhase::Begin, &[("CI_MODE", "SKIP")]).await, "contract:exit:0\n");
    }

    #[tokio::test]
    async fn unknown_hook_is_an_error() {
        let mut out = Vec::new();
        let error = run_child("nope", HookPhase::Begin, RunnerConfig::default(), HashMap::new(), &mut out)
            .await
            .unwrap_err();
        assert!(matches!(error, CiModeError::UnknownHook(_)));

        let error = run_child("ok", HookPhase::End, RunnerConfig::default(), HashMap::new(), &mut out)
            .await
            .unwrap_err();
        assert!(matches!(error, CiModeError::UnknownHook(_)));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn substitution_is_left_to_the_parent() {
        let dir = tempfile::TempDir::new().unwrap();
        let mock = dir.path().join("mock.sh");
        let ran = dir.path().join("ran");
        std::fs::write(&mock, format!("touch {}\nexit 3\n", ran.display())).unwrap();
        let mode = format!("TEST:{}", mock.display());

        assert_eq!(
            printed("test", HookPhase::Begin, &[("CI_MODE_RESOLVED", mode.as_str())]).await,
            format!("contract:substitute:{}\n", mock.display())
        );
        assert!(!ran.exists());
    }
}
