use std::path::PathBuf;
use std::str::FromStr;
use derive_more::Display;
use crate::context::InvocationContext;
use crate::contract::ContractAction;
use crate::error::CiModeError;

pub mod discovery;
pub mod isolated;
pub mod registry;

/// When a hook runs relative to the wrapped action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum HookPhase {
    #[display("begin")]
    Begin,
    #[display("end")]
    End,
}

impl FromStr for HookPhase {
    type Err = CiModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "begin" => Ok(Self::Begin),
            "end" => Ok(Self::End),
            other => Err(CiModeError::config(format!("unknown hook phase '{other}' (expected begin|end)"))),
        }
    }
}

/// How a hook is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum HookModel {
    /// Separate process; talks back through contract lines
    #[display("isolated")]
    Isolated,
    /// Same process; mutates the invocation context directly
    #[display("in-process")]
    InProcess,
}

impl FromStr for HookModel {
    type Err = CiModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "isolated" => Ok(Self::Isolated),
            "in-process" | "inprocess" => Ok(Self::InProcess),
            other => Err(CiModeError::config(format!(
                "unknown hook model '{other}' (expected isolated|in-process)"
            ))),
        }
    }
}

/// Why an invocation ended with its exit status. OK and SKIP share an exit
/// status but stay distinct for auditing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ExitReason {
    /// The wrapped action ran and its own status is reported
    #[display("completed")]
    Completed,
    #[display("ok")]
    Ok,
    #[display("skip")]
    Skip,
    #[display("error")]
    Error,
    /// A TEST script ran in place of the wrapped action
    #[display("substituted")]
    Substituted,
    /// An isolated hook printed an exit directive
    #[display("contract")]
    Contract,
    #[display("timed-out")]
    TimedOut,
    /// The build-cache hook decided there is nothing to do
    #[display("cached")]
    Cached,
    #[display("spawn-failed")]
    SpawnFailed,
}

/// Decision of a hook, independent from the execution model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookAction {
    Continue,
    SetEnv { name: String, value: String },
    Exit { code: i32, reason: ExitReason },
    ArmTimeout { seconds: u64 },
    CancelTimeout,
    /// Run this script instead of the wrapped action and exit with its status
    Substitute { path: PathBuf },
}

impl HookAction {
    /// Wire form for the isolated model. `Continue` prints nothing.
    pub fn to_contract(&self) -> Option<ContractAction> {
        match self {
            Self::Continue => None,
            Self::SetEnv { name, value } => Some(ContractAction::SetEnv {
                name: name.clone(),
                value: value.clone(),
            }),
            Self::Exit { code, .. } => Some(ContractAction::Exit(*code)),
            Self::ArmTimeout { seconds } => Some(ContractAction::ArmTimeout(*seconds)),
            Self::CancelTimeout => Some(ContractAction::CancelTimeout),
            Self::Substitute { path } => Some(ContractAction::Substitute(path.clone())),
        }
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

impl From<ContractAction> for HookAction {
    fn from(action: ContractAction) -> Self {
        match action {
            ContractAction::SetEnv { name, value } => Self::SetEnv { name, value },
            ContractAction::Exit(code) => Self::Exit { code, reason: ExitReason::Contract },
            ContractAction::ArmTimeout(seconds) => Self::ArmTimeout { seconds },
            ContractAction::CancelTimeout => Self::CancelTimeout,
            ContractAction::Substitute(path) => Self::Substitute { path },
        }
    }
}

/// Decision logic of one mode handler, shared by both execution models.
///
/// `evaluate` must return [`HookAction::Continue`] without any side effect
/// (logging included) when the resolved mode is not the one it handles:
/// every registered hook is invoked on every invocation.
pub trait ModeHook: Send + Sync {
    fn name(&self) -> &str;

    fn phase(&self) -> HookPhase {
        HookPhase::Begin
    }

    /// Ascending within a phase
    fn order(&self) -> u32;

    fn description(&self) -> &str {
        ""
    }

    fn evaluate(&self, context: &InvocationContext) -> HookAction;
}
