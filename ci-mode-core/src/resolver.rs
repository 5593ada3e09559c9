use std::collections::HashMap;
use derive_more::Display;
use lazy_static::lazy_static;
use regex::Regex;
use crate::config::RunnerConfig;
use crate::mode::Mode;

/// Script name used when the caller does not provide one
pub const UNKNOWN_SCRIPT: &str = "unknown";

/// Exit status of ERROR mode when no error code is configured
pub const DEFAULT_ERROR_CODE: i32 = 1;

lazy_static! {
    static ref INVALID_KEY_CHARS: Regex = Regex::new(r"[^A-Za-z0-9_]").unwrap();
}

/// Replaces every character outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize_script_name(name: &str) -> String {
    INVALID_KEY_CHARS.replace_all(name, "_").into_owned()
}

/// Where the resolved mode came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ModeScope {
    #[display("script")]
    Script,
    #[display("global")]
    Global,
    #[display("default")]
    Default,
    /// Published by a parent dispatcher to an isolated hook
    #[display("inherited")]
    Inherited,
}

/// Key/value view over the mode configuration.
pub trait ModeSource {
    fn lookup(&self, key: &str) -> Option<String>;
}

impl ModeSource for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Reads straight from the process environment.
pub struct ProcessEnv;

impl ModeSource for ProcessEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub script: String,
    pub mode: Mode,
    pub scope: ModeScope,
    pub error_code: i32,
}

pub struct ModeResolver<'a> {
    config: &'a RunnerConfig,
}

impl<'a> ModeResolver<'a> {
    pub fn new(config: &'a RunnerConfig) -> Self {
        Self { config }
    }

    /// Resolves the mode for `script`: per-script key, then global key, then EXEC.
    ///
    /// An empty value counts as absent. Never fails.
    pub fn resolve(&self, script: Option<&str>, source: &dyn ModeSource) -> Resolution {
        let script = script
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_SCRIPT)
            .to_string();
        let script_key = self.config.script_key(&sanitize_script_name(&script));

        let lookup = |key: &str| source.lookup(key).filter(|value| !value.trim().is_empty());

        let (mode, scope) = if let Some(value) = lookup(&script_key) {
            (Mode::parse(&value), ModeScope::Script)
        } else if let Some(value) = lookup(self.config.global_key()) {
            (Mode::parse(&value), ModeScope::Global)
        } else {
            (Mode::Exec, ModeScope::Default)
        };

        let error_code = lookup(&self.config.error_code_key())
            .and_then(|value| value.trim().parse::<i32>().ok())
            .unwrap_or(DEFAULT_ERROR_CODE);

        Resolution { script, mode, scope, error_code }
    }

    /// Reads the resolution a parent dispatcher published for its isolated
    /// hooks, if there is one.
    pub fn inherited(&self, source: &dyn ModeSource) -> Option<Resolution> {
        let mode = source.lookup(&self.config.resolved_key())?;
        let script = source
            .lookup(&self.config.script_name_key())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_SCRIPT.to_string());
        let error_code = source
            .lookup(&self.config.error_code_key())
            .and_then(|value| value.trim().parse::<i32>().ok())
            .unwrap_or(DEFAULT_ERROR_CODE);

        Some(Resolution {
            script,
            mode: Mode::parse(&mode),
            scope: ModeScope::Inherited,
            error_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize_script_name("build.sh"), "build_sh");
        assert_eq!(sanitize_script_name("scripts/ci/deploy-prod.sh"), "scripts_ci_deploy_prod_sh");
        assert_eq!(sanitize_script_name("già"), "gi_");
        assert_eq!(sanitize_script_name("plain_Name_01"), "plain_Name_01");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for name in ["build.sh", "a b/c", "ünïcödé", "", "x__y", "./run me.sh"] {
            let once = sanitize_script_name(name);
            assert_eq!(sanitize_script_name(&once), once);
        }
    }

    #[test]
    fn script_scope_wins_over_global() {
        let config = RunnerConfig::default();
        let env = source(&[("CI_MODE_build_sh", "ERROR"), ("CI_MODE", "OK")]);

        let resolution = ModeResolver::new(&config).resolve(Some("build.sh"), &env);
        assert_eq!(resolution.mode, Mode::Error);
        assert_eq!(resolution.scope, ModeScope::Script);
    }

    #[test]
    fn global_scope_wins_over_default() {
        let config = RunnerConfig::default();
        let env = source(&[("CI_MODE_other_sh", "ERROR"), ("CI_MODE", "SKIP")]);

        let resolution = ModeResolver::new(&config).resolve(Some("build.sh"), &env);
        assert_eq!(resolution.mode, Mode::Skip);
        assert_eq!(resolution.scope, ModeScope::Global);
    }

    #[test]
    fn nothing_configured_defaults_to_exec() {
        let config = RunnerConfig::default();
        let resolution = ModeResolver::new(&config).resolve(Some("build.sh"), &HashMap::new());
        assert_eq!(resolution.mode, Mode::Exec);
        assert_eq!(resolution.scope, ModeScope::Default);
        assert_eq!(resolution.error_code, DEFAULT_ERROR_CODE);
    }

    #[test]
    fn missing_script_name_resolves_as_unknown() {
        let config = RunnerConfig::default();
        let env = source(&[("CI_MODE_unknown", "DRY")]);

        let resolution = ModeResolver::new(&config).resolve(None, &env);
        assert_eq!(resolution.script, UNKNOWN_SCRIPT);
        assert_eq!(resolution.mode, Mode::Dry);

        let resolution = ModeResolver::new(&config).resolve(Some(""), &env);
        assert_eq!(resolution.mode, Mode::Dry);
    }

    #[test]
    fn malformed_value_still_claims_its_scope() {
        let config = RunnerConfig::default();
        let env = source(&[("CI_MODE_build_sh", "TIMEOUT:abc"), ("CI_MODE", "OK")]);

        let resolution = ModeResolver::new(&config).resolve(Some("build.sh"), &env);
        assert_eq!(resolution.mode, Mode::Exec);
        assert_eq!(resolution.scope, ModeScope::Script);
    }

    #[test]
    fn error_code_is_read_with_fallback() {
        let config = RunnerConfig::default();
        let resolver = ModeResolver::new(&config);

        let env = source(&[("CI_MODE", "ERROR"), ("CI_MODE_ERROR_CODE", "7")]);
        assert_eq!(resolver.resolve(Some("build.sh"), &env).error_code, 7);

        let env = source(&[("CI_MODE", "ERROR"), ("CI_MODE_ERROR_CODE", "seven")]);
        assert_eq!(resolver.resolve(Some("build.sh"), &env).error_code, DEFAULT_ERROR_CODE);
    }

    #[test]
    fn inherited_resolution_is_taken_as_is() {
        let config = RunnerConfig::default();
        let resolver = ModeResolver::new(&config);
        let env = source(&[
            ("CI_MODE", "OK"),
            ("CI_MODE_RESOLVED", "TIMEOUT:3"),
            ("CI_MODE_SCRIPT", "build.sh"),
            ("CI_MODE_ERROR_CODE", "9"),
        ]);

        let resolution = resolver.inherited(&env).unwrap();
        assert_eq!(resolution.mode, Mode::Timeout(3));
        assert_eq!(resolution.scope, ModeScope::Inherited);
        assert_eq!(resolution.script, "build.sh");
        assert_eq!(resolution.error_code, 9);

        assert_eq!(resolver.inherited(&source(&[("CI_MODE", "OK")])), None);
    }

    #[test]
    fn custom_prefix_is_honoured() {
        let config = RunnerConfig { prefix: "HOOKS".into(), ..Default::default() };
        let env = source(&[("HOOKS_deploy", "OK"), ("CI_MODE_deploy", "ERROR")]);

        assert_eq!(ModeResolver::new(&config).resolve(Some("deploy"), &env).mode, Mode::Ok);
    }
}
