use thiserror::Error;

/// Main error type for ci-mode operations
#[derive(Debug, Error)]
pub enum CiModeError {
    /// Configuration errors
    #[error("Configuration error{}: {message}", .path.as_ref().map(|p| format!(" in '{p}'")).unwrap_or_default())]
    ConfigError {
        message: String,
        path: Option<String>,
    },

    /// I/O and file system errors
    #[error("I/O error{}: {message}", .path.as_ref().map(|p| format!(" on '{p}'")).unwrap_or_default())]
    IoError {
        message: String,
        path: Option<String>,
    },

    /// A process (wrapped action, isolated hook or substituted script) could not be started
    #[error("Cannot run '{command}': {message}")]
    SpawnError {
        command: String,
        message: String,
    },

    /// Hook errors
    #[error("Hook '{name}' failed: {message}")]
    HookError {
        name: String,
        message: String,
    },

    /// A hook name that is not part of the built-in set
    #[error("Unknown hook '{0}'")]
    UnknownHook(String),

    /// Runtime execution errors
    #[error("Execution error: {message}")]
    ExecutionError {
        message: String,
    },
}

/// Result type alias for ci-mode operations
pub type CiResult<T> = Result<T, CiModeError>;

impl CiModeError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error bound to a file
    pub fn config_at(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Create an I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::IoError {
            message: message.into(),
            path: None,
        }
    }

    /// Create an I/O error with path
    pub fn io_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::IoError {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    pub fn spawn(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SpawnError {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn hook(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HookError {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::ExecutionError {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CiModeError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for CiModeError {
    fn from(error: serde_json::Error) -> Self {
        Self::config(format!("JSON error: {}", error))
    }
}

// Macro for creating execution errors
#[macro_export]
macro_rules! ci_error {
    ($msg:expr) => {
        Err($crate::error::CiModeError::execution($msg))
    };
    ($fmt:expr, $($arg:tt)*) => {
        Err($crate::error::CiModeError::execution(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_mentions_path() {
        let error = CiModeError::config_at("bad prefix", "ci-mode.json");
        assert_eq!(error.to_string(), "Configuration error in 'ci-mode.json': bad prefix");
        assert_eq!(CiModeError::config("oops").to_string(), "Configuration error: oops");
    }

    #[test]
    fn io_errors_convert() {
        let error: CiModeError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(error.to_string(), "I/O error: gone");
        assert_eq!(CiModeError::UnknownHook("begin/nope".into()).to_string(), "Unknown hook 'begin/nope'");
    }

    #[test]
    fn macro_builds_execution_error() {
        let result: CiResult<()> = ci_error!("failed after {} attempts", 3);
        assert!(matches!(
            result,
            Err(CiModeError::ExecutionError { ref message, .. }) if message == "failed after 3 attempts"
        ));
    }
}
