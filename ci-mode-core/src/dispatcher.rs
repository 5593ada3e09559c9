use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;
use crate::action::command::CommandAction;
use crate::action::{ActionRequest, WrappedAction};
use crate::config::RunnerConfig;
use crate::context::{InvocationContext, InvocationState};
use crate::event::channel::{InvocationEventChannel, InvocationEventKind};
use crate::hook::isolated::run_isolated_hook;
use crate::hook::registry::{HookDescriptor, HookKind, HookRegistry};
use crate::hook::{ExitReason, HookAction, HookModel, HookPhase};
use crate::mode::Mode;
use crate::resolver::{ModeResolver, ModeScope, Resolution};

/// Exit status when the wrapped action or a TEST script cannot be started
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Final report of one invocation
#[derive(Debug, Clone)]
pub struct InvocationOutcome {
    pub invocation_id: Uuid,
    pub script: String,
    pub mode: Mode,
    pub scope: ModeScope,
    pub exit_code: i32,
    pub reason: ExitReason,
    /// Hook that ended the invocation early, if any
    pub terminated_by: Option<String>,
    pub action_ran: bool,
    pub env_overrides: BTreeMap<String, String>,
    /// Captured stdout of the wrapped action, when it captures it
    pub output: Option<String>,
    /// Non-contract lines printed by isolated hooks
    pub hook_output: Vec<String>,
    pub states: Vec<InvocationState>,
    pub duration: Duration,
}

/// Drives one invocation: resolve the mode, run begin hooks, run the wrapped
/// action unless a hook terminated, run end hooks, report.
///
/// Registered hooks run in ascending order whatever their [`HookModel`];
/// callers decide which model the built-in handlers are registered under.
pub struct Dispatcher {
    config: Arc<RunnerConfig>,
    registry: HookRegistry,
    env: HashMap<String, String>,
    working_dir: Option<PathBuf>,
    events: Option<InvocationEventChannel>,
}

impl Dispatcher {
    /// Dispatcher over the current process environment.
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: HookRegistry::new(),
            env: std::env::vars().collect(),
            working_dir: None,
            events: None,
        }
    }

    pub fn with_registry(mut self, registry: HookRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the environment snapshot the mode is resolved from.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    pub fn with_events(mut self, events: InvocationEventChannel) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Resolves the mode without running anything.
    pub fn resolve(&self, script: Option<&str>) -> Resolution {
        ModeResolver::new(&self.config).resolve(script, &self.env)
    }

    /// Runs one invocation to completion. Never fails: every failure ends up
    /// as an exit status in the outcome.
    pub async fn run(&self, script: Option<&str>, action: &dyn WrappedAction) -> InvocationOutcome {
        let started = Instant::now();
        let resolution = self.resolve(script);
        let mut ctx = InvocationContext::new(self.config.clone(), resolution, self.env.clone());
        ctx.working_dir = self.working_dir.clone();

        self.emit(&ctx, InvocationEventKind::InvocationStarted { script: ctx.script().to_string() });
        ctx.enter(InvocationState::ModeResolved);
        log::debug!(
            "Script '{}' resolved to {} ({})",
            ctx.script(),
            ctx.mode(),
            ctx.resolution().scope
        );
        self.emit(&ctx, InvocationEventKind::ModeResolved {
            mode: ctx.mode().to_string(),
            scope: ctx.resolution().scope,
        });

        let mut hook_output = Vec::new();

        ctx.enter(InvocationState::BeginHooksRunning);
        for hook in self.registry.hooks(HookPhase::Begin) {
            if ctx.is_terminated() {
                break;
            }
            self.run_hook(&mut ctx, hook, &mut hook_output).await;
        }

        let mut output = None;
        let action_ran = if ctx.is_terminated() {
            ctx.enter(InvocationState::Terminated);
            self.emit(&ctx, InvocationEventKind::ActionSkipped);
            false
        } else {
            ctx.enter(InvocationState::WrappedActionRunning);
            output = self.run_action(&mut ctx, action).await;
            true
        };

        ctx.enter(InvocationState::EndHooksRunning);
        for hook in self.registry.hooks(HookPhase::End) {
            self.run_hook(&mut ctx, hook, &mut hook_output).await;
        }

        // Whatever the hooks did, no timer may outlive the invocation
        if let Some(watcher) = ctx.watcher.as_mut() {
            if watcher.cancel() {
                self.emit(&ctx, InvocationEventKind::TimeoutCancelled);
            }
        }
        ctx.enter(InvocationState::Done);

        let exit_code = ctx.exit_code().unwrap_or(0);
        let (reason, terminated_by) = match ctx.termination() {
            Some(termination) => (termination.reason, Some(termination.hook.clone())),
            None => (ExitReason::Completed, None),
        };
        let duration = started.elapsed();
        self.emit(&ctx, InvocationEventKind::InvocationCompleted {
            exit_code,
            reason,
            duration_ms: duration.as_millis() as u64,
        });
        log::debug!("Invocation {} finished with {} ({})", ctx.id, exit_code, reason);

        InvocationOutcome {
            invocation_id: ctx.id,
            script: ctx.script().to_string(),
            mode: ctx.mode().clone(),
            scope: ctx.resolution().scope,
            exit_code,
            reason,
            terminated_by,
            action_ran,
            env_overrides: ctx.env_overrides().clone(),
            output,
            hook_output,
            states: ctx.states().to_vec(),
            duration,
        }
    }

    async fn run_hook(&self, ctx: &mut InvocationContext, hook: &HookDescriptor, hook_output: &mut Vec<String>) {
        match &hook.kind {
            HookKind::InProcess(mode_hook) => {
                let action = mode_hook.evaluate(ctx);
                if action.is_continue() {
                    return;
                }
                log::debug!("Hook '{}' fired: {}", hook.name, mode_hook.description());
                self.emit(ctx, InvocationEventKind::HookFired {
                    hook: hook.name.clone(),
                    phase: hook.phase,
                    model: HookModel::InProcess,
                });
                self.apply(ctx, &hook.name, action).await;
            }
            HookKind::Isolated(command) => {
                self.emit(ctx, InvocationEventKind::HookFired {
                    hook: hook.name.clone(),
                    phase: hook.phase,
                    model: HookModel::Isolated,
                });
                let env = ctx.hook_env();
                let run = run_isolated_hook(command, &env, ctx.working_dir.as_deref(), self.config.hook_timeout()).await;
                let run = match run {
                    Ok(run) => run,
                    Err(e) => {
                        // A broken hook must not break the build
                        log::warn!("Hook '{}' failed: {}", hook.name, e);
                        self.emit(ctx, InvocationEventKind::HookFailed {
                            hook: hook.name.clone(),
                            message: e.to_string(),
                        });
                        return;
                    }
                };

                for line in &run.transcript.passthrough {
                    if self.config.passthrough_hook_output {
                        println!("{line}");
                    }
                    hook_output.push(line.clone());
                }
                match run.exit_status {
                    Some(0) => {}
                    Some(status) if !run.transcript.is_terminated() => {
                        log::warn!("Hook '{}' exited with {} without a contract exit, ignored", hook.name, status);
                    }
                    Some(_) => {}
                    None => {
                        self.emit(ctx, InvocationEventKind::HookFailed {
                            hook: hook.name.clone(),
                            message: format!("killed after {:?}", self.config.hook_timeout()),
                        });
                    }
                }
                for ignored in &run.transcript.ignored {
                    log::debug!("Hook '{}': '{}' after exit directive ignored", hook.name, ignored);
                }

                for directive in run.transcript.actions {
                    self.emit(ctx, InvocationEventKind::ContractApplied {
                        hook: hook.name.clone(),
                        directive: directive.to_string(),
                    });
                    self.apply(ctx, &hook.name, directive.into()).await;
                }
            }
        }
    }

    async fn apply(&self, ctx: &mut InvocationContext, hook: &str, action: HookAction) {
        match action {
            HookAction::Continue => {}
            HookAction::SetEnv { name, value } => {
                log::debug!("Hook '{hook}' set {name}={value}");
                ctx.set_env(name, value);
            }
            HookAction::Exit { code, reason } => {
                if ctx.terminate(hook, code, reason) {
                    log::info!("Script '{}' terminated by '{}' with {} ({})", ctx.script(), hook, code, reason);
                    self.emit(ctx, InvocationEventKind::Terminated {
                        hook: hook.to_string(),
                        exit_code: code,
                        reason,
                    });
                } else {
                    log::debug!("Hook '{hook}' asked to exit with {code}, invocation already terminated");
                }
            }
            HookAction::ArmTimeout { seconds } => self.arm_timeout(ctx, hook, seconds),
            HookAction::CancelTimeout => {
                if let Some(watcher) = ctx.watcher.as_mut() {
                    if watcher.cancel() {
                        self.emit(ctx, InvocationEventKind::TimeoutCancelled);
                    }
                }
            }
            HookAction::Substitute { path } => self.substitute(ctx, hook, &path).await,
        }
    }

    fn arm_timeout(&self, ctx: &mut InvocationContext, hook: &str, seconds: u64) {
        if seconds == 0 {
            log::debug!("Hook '{hook}' asked for a zero timeout, nothing armed");
            return;
        }
        if ctx.watcher.as_ref().is_some_and(|watcher| watcher.is_pending()) {
            log::debug!("Hook '{hook}' asked for a timeout, one is already armed");
            return;
        }
        let watcher = crate::watcher::TimeoutWatcher::start(Duration::from_secs(seconds));
        log::debug!("Hook '{hook}' armed deadline {} for {seconds}s", watcher.id());
        ctx.watcher = Some(watcher);
        self.emit(ctx, InvocationEventKind::TimeoutArmed { seconds });
    }

    async fn substitute(&self, ctx: &mut InvocationContext, hook: &str, path: &Path) {
        if ctx.is_terminated() {
            return;
        }
        if !path.is_file() {
            log::warn!("Test script {} not found, running '{}' as usual", path.display(), ctx.script());
            return;
        }
        // Inherits our stdout, so the mock's lines are never read as directives
        let mock = CommandAction::script(path, &self.config.shell);
        let request = self.request(ctx);
        log::info!("Script '{}' replaced by {}", ctx.script(), path.display());

        match mock.run(&request).await {
            Ok(result) => {
                ctx.terminate(hook, result.exit_code, ExitReason::Substituted);
            }
            Err(e) => {
                log::warn!("Cannot run test script {}: {}", path.display(), e);
                ctx.terminate(hook, SPAWN_FAILURE_EXIT_CODE, ExitReason::SpawnFailed);
            }
        }
        if let Some(termination) = ctx.termination() {
            self.emit(ctx, InvocationEventKind::Terminated {
                hook: termination.hook.clone(),
                exit_code: termination.code,
                reason: termination.reason,
            });
        }
    }

    /// Runs the wrapped action, racing it against the deadline when one is armed.
    async fn run_action(&self, ctx: &mut InvocationContext, action: &dyn WrappedAction) -> Option<String> {
        let request = self.request(ctx);
        self.emit(ctx, InvocationEventKind::ActionStarted {
            command: action.describe(),
            dry_run: request.dry_run,
        });
        log::debug!("Running '{}'", action.describe());

        let running = action.run(&request);
        let finished = match ctx.watcher.as_mut() {
            Some(watcher) => {
                tokio::select! {
                    biased;
                    _ = watcher.expired() => None,
                    result = running => Some(result),
                }
            }
            None => Some(running.await),
        };

        match finished {
            Some(Ok(result)) => {
                self.emit(ctx, InvocationEventKind::ActionCompleted {
                    exit_code: result.exit_code,
                    duration_ms: result.duration.as_millis() as u64,
                });
                ctx.record_exit_code(result.exit_code);
                result.output
            }
            Some(Err(e)) => {
                log::error!("Cannot run '{}': {}", action.describe(), e);
                ctx.terminate(action.describe(), SPAWN_FAILURE_EXIT_CODE, ExitReason::SpawnFailed);
                None
            }
            None => {
                let seconds = ctx.watcher.as_ref().map(|watcher| watcher.duration().as_secs()).unwrap_or_default();
                log::warn!("Script '{}' timed out after {}s", ctx.script(), seconds);
                eprintln!("ci-mode: '{}' timed out after {}s", ctx.script(), seconds);
                self.emit(ctx, InvocationEventKind::TimeoutFired { seconds });
                ctx.terminate("timeout", self.config.timeout_exit_code, ExitReason::TimedOut);
                None
            }
        }
    }

    fn request(&self, ctx: &InvocationContext) -> ActionRequest {
        ActionRequest {
            env: ctx.env_overrides().clone(),
            working_dir: ctx.working_dir.clone(),
            dry_run: ctx.is_dry_run(),
        }
    }

    fn emit(&self, ctx: &InvocationContext, kind: InvocationEventKind) {
        if let Some(events) = &self.events {
            events.emit(ctx.id, kind);
        }
    }
}
