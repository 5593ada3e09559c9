use std::path::{Path, PathBuf};
use std::time::Duration;
use derive_more::Display;
use smart_default::SmartDefault;

const TIMEOUT_PREFIX: &str = "TIMEOUT:";
const TEST_PREFIX: &str = "TEST:";

/// Simulated outcome selected for a single script invocation.
///
/// Parsing is total: anything unrecognised becomes [`Mode::Exec`].
#[derive(Debug, Clone, PartialEq, Eq, Display, SmartDefault)]
pub enum Mode {
    /// Run the wrapped action unmodified.
    #[default]
    #[display("EXEC")]
    Exec,
    #[display("DRY")]
    Dry,
    #[display("OK")]
    Ok,
    #[display("ERROR")]
    Error,
    #[display("SKIP")]
    Skip,
    /// `TIMEOUT:<digits>`. Zero is representable so that the handler, not the
    /// parser, decides it is not applicable.
    #[display("TIMEOUT:{_0}")]
    Timeout(u64),
    /// Replace the wrapped action by the script at this path.
    #[display("TEST:{}", _0.display())]
    Test(PathBuf),
}

impl Mode {
    /// Parses a mode string.
    ///
    /// Fixed tags match exactly, `TIMEOUT:` needs only digits after it, and a
    /// path (bare or prefixed with `TEST:`) selects TEST only if the file exists.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        match value {
            "EXEC" => return Self::Exec,
            "DRY" => return Self::Dry,
            "OK" => return Self::Ok,
            "ERROR" => return Self::Error,
            "SKIP" => return Self::Skip,
            _ => {}
        }

        if let Some(seconds) = value.strip_prefix(TIMEOUT_PREFIX) {
            if !seconds.is_empty() && seconds.chars().all(|c| c.is_ascii_digit()) {
                // Digits that overflow u64 are malformed like any other non-number.
                return seconds.parse().map(Self::Timeout).unwrap_or_default();
            }
        }

        let candidate = value.strip_prefix(TEST_PREFIX).unwrap_or(value);
        if !candidate.is_empty() && Path::new(candidate).is_file() {
            return Self::Test(PathBuf::from(candidate));
        }

        Self::Exec
    }

    /// Deadline of an applicable TIMEOUT mode.
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Self::Timeout(seconds) if *seconds > 0 => Some(Duration::from_secs(*seconds)),
            _ => None,
        }
    }

    /// Substitute script of an applicable TEST mode.
    pub fn test_script(&self) -> Option<&Path> {
        match self {
            Self::Test(path) if path.is_file() => Some(path.as_path()),
            _ => None,
        }
    }

    pub fn is_exec(&self) -> bool {
        matches!(self, Self::Exec)
    }
}

impl From<&str> for Mode {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}
