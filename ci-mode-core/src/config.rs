use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::Deserialize;
use smart_default::SmartDefault;
use crate::error::{CiModeError, CiResult};

/// Runner configuration. Every field has a default, so a partial JSON file is enough.
#[derive(Debug, Clone, PartialEq, Deserialize, SmartDefault)]
#[serde(default)]
pub struct RunnerConfig {
    /// Prefix of the mode keys: `<PREFIX>` (global) and `<PREFIX>_<script>` (per script)
    #[default = "CI_MODE"]
    pub prefix: String,
    /// Variable set to `true` by the DRY mode
    #[default = "DRY_RUN"]
    pub dry_run_var: String,
    /// Interpreter for shell commands and substituted TEST scripts
    #[default = "sh"]
    pub shell: String,
    /// Upper bound for a single isolated hook process
    #[default = 30]
    pub hook_timeout_secs: u64,
    /// Exit status reported when the TIMEOUT deadline wins
    #[default = 124]
    pub timeout_exit_code: i32,
    /// Echo non-contract lines printed by isolated hooks
    #[default = true]
    pub passthrough_hook_output: bool,
    /// Directory scanned for external isolated hooks
    pub hooks_dir: Option<PathBuf>,
    /// Marker file consulted by the build-cache skip hook
    pub cache_marker: Option<PathBuf>,
}

impl RunnerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> CiResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CiModeError::io_with_path(e.to_string(), path.display().to_string()))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| CiModeError::config_at(e.to_string(), path.display().to_string()))?;
        config.validate()?;
        log::debug!("Loaded runner configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> CiResult<()> {
        if self.prefix.is_empty() || !self.prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(CiModeError::config(format!(
                "prefix '{}' must be a non-empty [A-Za-z0-9_] identifier",
                self.prefix
            )));
        }
        if self.dry_run_var.is_empty() {
            return Err(CiModeError::config("dry_run_var cannot be empty"));
        }
        if self.shell.is_empty() {
            return Err(CiModeError::config("shell cannot be empty"));
        }
        Ok(())
    }

    pub fn hook_timeout(&self) -> Duration {
        Duration::from_secs(self.hook_timeout_secs)
    }

    /// `<PREFIX>`
    pub fn global_key(&self) -> &str {
        &self.prefix
    }

    /// `<PREFIX>_<sanitized script>`
    pub fn script_key(&self, sanitized_script: &str) -> String {
        format!("{}_{}", self.prefix, sanitized_script)
    }

    pub fn error_code_key(&self) -> String {
        format!("{}_ERROR_CODE", self.prefix)
    }

    pub fn force_build_key(&self) -> String {
        format!("{}_FORCE_BUILD", self.prefix)
    }

    /// Key under which the resolved mode is published to isolated hooks.
    pub fn resolved_key(&self) -> String {
        format!("{}_RESOLVED", self.prefix)
    }

    pub fn script_name_key(&self) -> String {
        format!("{}_SCRIPT", self.prefix)
    }
}
