use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::Instant;
use crate::action::group::{own_group, GroupGuard};
use crate::action::{exit_code_of, ActionRequest, ActionResult, WrappedAction};
use crate::error::{CiModeError, CiResult};

/// Runs an external program as the wrapped action.
#[derive(Debug, Clone)]
pub struct CommandAction {
    program: PathBuf,
    args: Vec<String>,
    capture_output: bool,
}

impl CommandAction {
    pub fn new(program: impl Into<PathBuf>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            capture_output: false,
        }
    }

    /// A command line handed to the platform shell (`sh -c` or `cmd /C`).
    pub fn shell(command_string: impl Into<String>, shell: &str) -> Self {
        if cfg!(target_os = "windows") {
            Self::new("cmd", ["/C".to_string(), command_string.into()])
        } else {
            Self::new(shell, ["-c".to_string(), command_string.into()])
        }
    }

    /// A script file run by `shell`, whether or not it is executable.
    pub fn script(path: &Path, shell: &str) -> Self {
        Self::new(shell, [path.to_string_lossy().to_string()])
    }

    /// Capture stdout instead of inheriting it.
    pub fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait::async_trait]
impl WrappedAction for CommandAction {
    fn describe(&self) -> String {
        self.command_line()
    }

    async fn run(&self, request: &ActionRequest) -> CiResult<ActionResult> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(&request.env)
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(working_dir) = &request.working_dir {
            command.current_dir(working_dir);
        }

        command.stdout(if self.capture_output { Stdio::piped() } else { Stdio::inherit() });

        let start_time = Instant::now();
        let child = own_group(&mut command)
            .spawn()
            .map_err(|e| CiModeError::spawn(self.command_line(), e.to_string()))?;
        let mut group = GroupGuard::new(&child);
        let output = child
            .wait_with_output()
            .await
            .map_err(|e| CiModeError::spawn(self.command_line(), e.to_string()))?;
        group.release();

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        Ok(ActionResult {
            exit_code: exit_code_of(output.status),
            output: if self.capture_output { Some(stdout) } else { None },
            duration: start_time.elapsed(),
        })
    }
}
