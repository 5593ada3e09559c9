use std::io::Write;
use std::path::Path;
use ci_mode_core::action::command::CommandAction;
use ci_mode_core::ci_error;
use ci_mode_core::config::RunnerConfig;
use ci_mode_core::dispatcher::Dispatcher;
use ci_mode_core::error::{CiModeError, CiResult};
use ci_mode_core::hook::discovery::discover_hooks;
use ci_mode_core::hook::registry::IsolatedCommand;
use ci_mode_core::hook::{HookModel, HookPhase};
use ci_mode_core::resolver::{ModeResolver, ProcessEnv};
use ci_mode_hooks::cache::{decide, is_forced};
use ci_mode_hooks::child::run_child;
use ci_mode_hooks::{in_process_registry, isolated_registry};
use crate::cli::{Cli, Commands};

/// Executes the parsed command line and returns the process exit status.
pub async fn execute(cli: Cli) -> CiResult<i32> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Run { ref script, model, ref command } => {
            let script = script.clone().or_else(|| command.first().and_then(|program| script_name(program)));
            run(&cli, config, script, model, command).await
        }
        Commands::Resolve { ref script } => {
            let resolution = ModeResolver::new(&config).resolve(script.as_deref(), &ProcessEnv);
            println!("{} ({})", resolution.mode, resolution.scope);
            Ok(0)
        }
        Commands::CacheDecision { ref marker, force } => {
            let marker = marker.as_deref().or(config.cache_marker.as_deref());
            let force = force || is_forced(std::env::var(config.force_build_key()).ok().as_deref());
            println!("{}", decide(marker, force));
            Ok(0)
        }
        Commands::Hook { ref name, phase } => hook(name, phase, config).await,
    }
}

fn load_config(cli: &Cli) -> CiResult<RunnerConfig> {
    let mut config = match &cli.config {
        Some(path) => RunnerConfig::from_file(path)?,
        None => RunnerConfig::default(),
    };
    if let Some(prefix) = &cli.prefix {
        config.prefix = prefix.clone();
    }
    if let Some(dir) = &cli.hooks_dir {
        config.hooks_dir = Some(dir.clone());
    }
    if let Some(marker) = &cli.cache_marker {
        config.cache_marker = Some(marker.clone());
    }
    config.validate()?;
    Ok(config)
}

fn script_name(program: &str) -> Option<String> {
    Path::new(program)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
}

async fn run(
    cli: &Cli,
    config: RunnerConfig,
    script: Option<String>,
    model: HookModel,
    command: &[String],
) -> CiResult<i32> {
    let Some((program, args)) = command.split_first() else {
        return ci_error!("no command to run");
    };

    let mut registry = match model {
        HookModel::InProcess => in_process_registry(),
        HookModel::Isolated => isolated_registry(&self_command(cli, &config)?),
    };
    if let Some(dir) = &config.hooks_dir {
        registry.extend(discover_hooks(dir));
    }
    log::debug!("{} hooks registered ({} model)", registry.len(), model);

    let action = CommandAction::new(program, args.to_vec());
    let dispatcher = Dispatcher::new(config).with_registry(registry);
    let outcome = dispatcher.run(script.as_deref(), &action).await;

    log::info!(
        "{} [{} from {}] -> {} ({})",
        outcome.script,
        outcome.mode,
        outcome.scope,
        outcome.exit_code,
        outcome.reason
    );
    Ok(outcome.exit_code)
}

/// This binary with the options an isolated child needs to rebuild the same configuration.
fn self_command(cli: &Cli, config: &RunnerConfig) -> CiResult<IsolatedCommand> {
    let exe = std::env::current_exe()
        .map_err(|e| CiModeError::io(format!("cannot locate the ci-mode binary: {e}")))?;

    let mut command = IsolatedCommand::new(exe).arg("--prefix").arg(config.prefix.clone());
    if let Some(path) = &cli.config {
        command = command.arg("--config").arg(path.to_string_lossy());
    }
    if let Some(marker) = &config.cache_marker {
        command = command.arg("--cache-marker").arg(marker.to_string_lossy());
    }
    Ok(command)
}

async fn hook(name: &str, phase: HookPhase, config: RunnerConfig) -> CiResult<i32> {
    let mut stdout = std::io::stdout();
    run_child(name, phase, config, std::env::vars().collect(), &mut stdout).await?;
    stdout.flush()?;
    Ok(0)
}
