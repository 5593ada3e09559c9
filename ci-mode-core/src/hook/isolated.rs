use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use crate::action::exit_code_of;
use crate::action::group::{own_group, GroupGuard};
use crate::contract::ContractTranscript;
use crate::error::{CiModeError, CiResult};
use crate::hook::registry::IsolatedCommand;

/// What an isolated hook left behind
#[derive(Debug, Clone, Default)]
pub struct IsolatedRun {
    pub transcript: ContractTranscript,
    /// `None` when the hook was killed for exceeding its time budget
    pub exit_status: Option<i32>,
}

impl IsolatedRun {
    pub fn timed_out(&self) -> bool {
        self.exit_status.is_none()
    }
}

/// Runs one isolated hook to completion and collects its contract transcript.
///
/// The hook inherits the dispatcher's environment plus `env`. Stderr is
/// inherited untouched; only stdout is part of the contract.
pub async fn run_isolated_hook(
    command: &IsolatedCommand,
    env: &BTreeMap<String, String>,
    working_dir: Option<&Path>,
    budget: Duration,
) -> CiResult<IsolatedRun> {
    let mut process = Command::new(&command.program);
    process
        .args(&command.args)
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);
    if let Some(dir) = working_dir {
        process.current_dir(dir);
    }

    let mut child = own_group(&mut process)
        .spawn()
        .map_err(|e| CiModeError::spawn(command.display(), e.to_string()))?;
    let mut group = GroupGuard::new(&child);
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| CiModeError::hook(command.display(), "stdout was not captured"))?;

    let mut transcript = ContractTranscript::default();
    let collect = async {
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            transcript.push_line(&line);
        }
        child.wait().await
    };

    let finished = tokio::time::timeout(budget, collect).await;
    match finished {
        Ok(status) => {
            group.release();
            let status = status.map_err(|e| CiModeError::hook(command.display(), e.to_string()))?;
            Ok(IsolatedRun {
                transcript,
                exit_status: Some(exit_code_of(status)),
            })
        }
        Err(_) => {
            drop(group);
            log::warn!("Hook '{}' exceeded {:?}, killed", command.display(), budget);
            Ok(IsolatedRun {
                transcript,
                exit_status: None,
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::contract::ContractAction;
    use std::fs;
    use tempfile::TempDir;

    // Run through `sh` rather than exec'ing a freshly written file (ETXTBSY under parallel tests)
    fn script(dir: &TempDir, name: &str, body: &str) -> IsolatedCommand {
        let path = dir.path().join(name);
        fs::write(&path, format!("{body}\n")).unwrap();
        IsolatedCommand::new("sh").arg(path.to_string_lossy())
    }

    #[tokio::test]
    async fn collects_directives_and_plain_output() {
        let dir = TempDir::new().unwrap();
        let hook = script(&dir, "hook.sh", "echo hello\necho contract:env:FOO=bar\necho contract:exit:42");

        let run = run_isolated_hook(&hook, &BTreeMap::new(), None, Duration::from_secs(5)).await.unwrap();

        assert_eq!(run.exit_status, Some(0));
        assert_eq!(run.transcript.passthrough, vec!["hello"]);
        assert_eq!(run.transcript.exit_code(), Some(42));
        assert_eq!(run.transcript.actions[0], ContractAction::SetEnv { name: "FOO".into(), value: "bar".into() });
    }

    #[tokio::test]
    async fn passes_environment_to_the_hook() {
        let dir = TempDir::new().unwrap();
        let hook = script(&dir, "hook.sh", "echo \"contract:env:SEEN=$CI_MODE_RESOLVED\"");
        let env = BTreeMap::from([("CI_MODE_RESOLVED".to_string(), "SKIP".to_string())]);

        let run = run_isolated_hook(&hook, &env, None, Duration::from_secs(5)).await.unwrap();

        assert_eq!(
            run.transcript.actions,
            vec![ContractAction::SetEnv { name: "SEEN".into(), value: "SKIP".into() }]
        );
    }

    #[tokio::test]
    async fn reports_non_zero_exit_status() {
        let dir = TempDir::new().unwrap();
        let hook = script(&dir, "hook.sh", "echo oops\nexit 3");

        let run = run_isolated_hook(&hook, &BTreeMap::new(), None, Duration::from_secs(5)).await.unwrap();

        assert_eq!(run.exit_status, Some(3));
        assert!(run.transcript.actions.is_empty());
    }

    #[tokio::test]
    async fn slow_hook_is_killed() {
        let dir = TempDir::new().unwrap();
        let hook = script(&dir, "hook.sh", "echo contract:env:EARLY=1\nexec sleep 30");

        let run = run_isolated_hook(&hook, &BTreeMap::new(), None, Duration::from_millis(300)).await.unwrap();

        assert!(run.timed_out());
        assert_eq!(run.transcript.actions.len(), 1);
    }

    #[tokio::test]
    async fn slow_hook_loses_its_background_jobs() {
        let dir = TempDir::new().unwrap();
        let late = dir.path().join("late");
        let hook = script(&dir, "hook.sh", &format!("(sleep 1; touch {}) &\nsleep 30", late.display()));

        let run = run_isolated_hook(&hook, &BTreeMap::new(), None, Duration::from_millis(300)).await.unwrap();
        assert!(run.timed_out());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!late.exists());
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let hook = IsolatedCommand::new("/no/such/hook");
        let error = run_isolated_hook(&hook, &BTreeMap::new(), None, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(error, CiModeError::SpawnError { .. }));
    }
}
