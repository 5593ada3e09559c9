//! Line protocol spoken by isolated hooks on their standard output.
//!
//! ```text
//! contract:exit:<integer>
//! contract:env:<NAME>=<value>
//! contract:timeout:<positive integer>
//! contract:timeout:cancel
//! contract:substitute:<path>
//! ```
//!
//! Anything else, including lines that look like a directive but carry an
//! invalid payload, is ordinary output. `exit` and `substitute` end the
//! hook's say: later directives are kept aside and never applied.

use std::fmt;
use std::path::PathBuf;
use lazy_static::lazy_static;
use regex::Regex;

pub const CONTRACT_PREFIX: &str = "contract:";

lazy_static! {
    static ref EXIT_LINE: Regex = Regex::new(r"^contract:exit:(-?[0-9]+)$").unwrap();
    static ref ENV_LINE: Regex = Regex::new(r"^contract:env:([A-Za-z_][A-Za-z0-9_]*)=(.*)$").unwrap();
    static ref TIMEOUT_LINE: Regex = Regex::new(r"^contract:timeout:([0-9]+|cancel)$").unwrap();
    static ref SUBSTITUTE_LINE: Regex = Regex::new(r"^contract:substitute:(\S.*)$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractAction {
    SetEnv { name: String, value: String },
    Exit(i32),
    ArmTimeout(u64),
    CancelTimeout,
    /// The dispatcher runs this script instead of the wrapped action
    Substitute(PathBuf),
}

impl ContractAction {
    /// Parses one output line. Trailing `\r`/`\n` are ignored.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if !line.starts_with(CONTRACT_PREFIX) {
            return None;
        }

        if let Some(captures) = EXIT_LINE.captures(line) {
            return captures[1].parse().ok().map(Self::Exit);
        }
        if let Some(captures) = ENV_LINE.captures(line) {
            return Some(Self::SetEnv {
                name: captures[1].to_string(),
                value: captures[2].to_string(),
            });
        }
        if let Some(captures) = TIMEOUT_LINE.captures(line) {
            return match &captures[1] {
                "cancel" => Some(Self::CancelTimeout),
                seconds => seconds.parse().ok().filter(|s| *s > 0).map(Self::ArmTimeout),
            };
        }
        if let Some(captures) = SUBSTITUTE_LINE.captures(line) {
            return Some(Self::Substitute(PathBuf::from(&captures[1])));
        }
        None
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exit(_) | Self::Substitute(_))
    }
}

impl fmt::Display for ContractAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetEnv { name, value } => write!(f, "{CONTRACT_PREFIX}env:{name}={value}"),
            Self::Exit(code) => write!(f, "{CONTRACT_PREFIX}exit:{code}"),
            Self::ArmTimeout(seconds) => write!(f, "{CONTRACT_PREFIX}timeout:{seconds}"),
            Self::CancelTimeout => write!(f, "{CONTRACT_PREFIX}timeout:cancel"),
            Self::Substitute(path) => write!(f, "{CONTRACT_PREFIX}substitute:{}", path.display()),
        }
    }
}

/// Output of one isolated hook split into directives and plain text.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ContractTranscript {
    /// Directives in emission order, up to and including the first terminal one.
    pub actions: Vec<ContractAction>,
    /// Lines that are not directives, in order.
    pub passthrough: Vec<String>,
    /// Directives emitted after a terminal one; never applied.
    pub ignored: Vec<ContractAction>,
}

impl ContractTranscript {
    pub fn push_line(&mut self, line: &str) {
        match ContractAction::parse(line) {
            Some(action) if self.is_terminated() => self.ignored.push(action),
            Some(action) => self.actions.push(action),
            None => self.passthrough.push(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.actions.last().is_some_and(ContractAction::is_terminal)
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.actions.last() {
            Some(ContractAction::Exit(code)) => Some(*code),
            _ => None,
        }
    }
}

impl<'a> FromIterator<&'a str> for ContractTranscript {
    fn from_iter<I: IntoIterator<Item = &'a str>>(lines: I) -> Self {
        let mut transcript = Self::default();
        for line in lines {
            transcript.push_line(line);
        }
        transcript
    }
}
