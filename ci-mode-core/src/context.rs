use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use derive_more::Display;
use uuid::Uuid;
use crate::config::RunnerConfig;
use crate::hook::ExitReason;
use crate::mode::Mode;
use crate::resolver::{ModeSource, Resolution};
use crate::watcher::WatcherHandle;

/// Lifecycle of one invocation.
///
/// `Terminated` is only reachable from `BeginHooksRunning`; `EndHooksRunning`
/// is reached from every path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum InvocationState {
    Init,
    ModeResolved,
    BeginHooksRunning,
    Terminated,
    WrappedActionRunning,
    EndHooksRunning,
    Done,
}

/// Who ended the invocation early, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Termination {
    pub hook: String,
    pub code: i32,
    pub reason: ExitReason,
}

/// Per-invocation state handed to every hook and to the dispatcher.
#[derive(Debug)]
pub struct InvocationContext {
    pub id: Uuid,
    config: Arc<RunnerConfig>,
    resolution: Resolution,
    /// Environment snapshot the mode was resolved from
    env_vars: HashMap<String, String>,
    /// Variables set by hooks, visible to every later step
    env_overrides: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
    pub watcher: Option<WatcherHandle>,
    exit_code: Option<i32>,
    termination: Option<Termination>,
    states: Vec<InvocationState>,
}

impl InvocationContext {
    pub fn new(config: Arc<RunnerConfig>, resolution: Resolution, env_vars: HashMap<String, String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            resolution,
            env_vars,
            env_overrides: BTreeMap::new(),
            working_dir: None,
            watcher: None,
            exit_code: None,
            termination: None,
            states: vec![InvocationState::Init],
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    pub fn mode(&self) -> &Mode {
        &self.resolution.mode
    }

    pub fn script(&self) -> &str {
        &self.resolution.script
    }

    pub fn error_code(&self) -> i32 {
        self.resolution.error_code
    }

    pub fn set_env(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.env_overrides.insert(name.into(), value.into());
    }

    pub fn env_overrides(&self) -> &BTreeMap<String, String> {
        &self.env_overrides
    }

    /// Hook-set value first, then the snapshot.
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env_overrides
            .get(name)
            .or_else(|| self.env_vars.get(name))
            .map(String::as_str)
    }

    pub fn is_dry_run(&self) -> bool {
        self.env_overrides
            .get(&self.config.dry_run_var)
            .is_some_and(|value| value == "true")
    }

    /// Variables handed to an isolated hook on top of the inherited environment:
    /// the overrides so far plus the published resolution.
    pub fn hook_env(&self) -> BTreeMap<String, String> {
        let mut env = self.env_overrides.clone();
        env.insert(self.config.resolved_key(), self.resolution.mode.to_string());
        env.insert(self.config.script_name_key(), self.resolution.script.clone());
        env.insert(self.config.error_code_key(), self.resolution.error_code.to_string());
        env
    }

    /// Records an early termination. The first one wins; later calls return `false`.
    pub fn terminate(&mut self, hook: impl Into<String>, code: i32, reason: ExitReason) -> bool {
        if self.termination.is_some() {
            return false;
        }
        self.exit_code = Some(code);
        self.termination = Some(Termination {
            hook: hook.into(),
            code,
            reason,
        });
        true
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.is_some()
    }

    pub fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    /// Exit status of the wrapped action. Ignored once terminated.
    pub fn record_exit_code(&mut self, code: i32) {
        if self.termination.is_none() {
            self.exit_code = Some(code);
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn enter(&mut self, state: InvocationState) {
        log::trace!("Invocation {} -> {}", self.id, state);
        self.states.push(state);
    }

    pub fn states(&self) -> &[InvocationState] {
        &self.states
    }
}

impl ModeSource for InvocationContext {
    fn lookup(&self, key: &str) -> Option<String> {
        self.env_var(key).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ModeScope;

    fn context(mode: Mode) -> InvocationContext {
        let resolution = Resolution {
            script: "build.sh".into(),
            mode,
            scope: ModeScope::Global,
            error_code: 1,
        };
        let env = HashMap::from([("HOME".to_string(), "/home/ci".to_string())]);
        InvocationContext::new(Arc::new(RunnerConfig::default()), resolution, env)
    }

    #[test]
    fn first_termination_wins() {
        let mut ctx = context(Mode::Ok);
        assert!(ctx.terminate("ok", 0, ExitReason::Ok));
        assert!(!ctx.terminate("error", 1, ExitReason::Error));

        assert_eq!(ctx.exit_code(), Some(0));
        assert_eq!(ctx.termination().unwrap().hook, "ok");
    }

    #[test]
    fn action_exit_code_never_overrides_termination() {
        let mut ctx = context(Mode::Exec);
        ctx.record_exit_code(3);
        assert_eq!(ctx.exit_code(), Some(3));

        ctx.terminate("timeout", 124, ExitReason::TimedOut);
        ctx.record_exit_code(0);
        assert_eq!(ctx.exit_code(), Some(124));
    }

    #[test]
    fn overrides_shadow_the_snapshot() {
        let mut ctx = context(Mode::Dry);
        assert_eq!(ctx.env_var("HOME"), Some("/home/ci"));
        assert!(!ctx.is_dry_run());

        ctx.set_env("HOME", "/tmp");
        ctx.set_env("DRY_RUN", "true");
        assert_eq!(ctx.env_var("HOME"), Some("/tmp"));
        assert!(ctx.is_dry_run());
    }

    #[test]
    fn hook_env_publishes_the_resolution() {
        let mut ctx = context(Mode::Timeout(4));
        ctx.set_env("FOO", "bar");

        let env = ctx.hook_env();
        assert_eq!(env.get("CI_MODE_RESOLVED").map(String::as_str), Some("TIMEOUT:4"));
        assert_eq!(env.get("CI_MODE_SCRIPT").map(String::as_str), Some("build.sh"));
        assert_eq!(env.get("FOO").map(String::as_str), Some("bar"));
    }
}
