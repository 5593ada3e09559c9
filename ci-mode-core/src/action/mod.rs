use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use crate::error::CiResult;

pub mod command;
pub(crate) mod group;

/// Everything the wrapped action gets to see from the invocation
#[derive(Debug, Clone, Default)]
pub struct ActionRequest {
    /// Variables set by hooks, applied on top of the inherited environment
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    pub exit_code: i32,
    /// Captured stdout, when the action captures it
    pub output: Option<String>,
    pub duration: Duration,
}

/// The script under test.
#[async_trait::async_trait]
pub trait WrappedAction: Send + Sync {
    /// Human readable form for logs
    fn describe(&self) -> String;

    /// Runs to completion. Dropping the future must stop the action.
    async fn run(&self, request: &ActionRequest) -> CiResult<ActionResult>;
}

/// Exit status as a shell reports it: signal deaths become `128 + signal`.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
