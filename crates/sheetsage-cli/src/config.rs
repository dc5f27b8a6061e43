// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use sheetsage_app::DEFAULT_ACCEPTED_EXTENSIONS;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::logging;

const APP_NAME: &str = "sheetsage";
const CONFIG_VERSION: i64 = 1;
const CONFIG_PATH_ENV: &str = "SHEETSAGE_CONFIG_PATH";
const BASE_URL_ENV: &str = "SHEETSAGE_API_BASE_URL";
const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT: &str = "30s";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub upload: Upload,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            upload: Upload::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Upload {
    pub accept: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub path: Option<String>,
    pub level: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = 1` and put values under [api], [upload], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.api.base_url
            && base_url.trim().is_empty()
        {
            bail!("api.base_url in {} must not be empty", path.display());
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)
                .with_context(|| format!("api.timeout in {}", path.display()))?;
            if parsed.is_zero() {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(accept) = &self.upload.accept {
            if accept.is_empty() {
                bail!(
                    "upload.accept in {} must list at least one extension",
                    path.display()
                );
            }
            if accept
                .iter()
                .any(|ext| ext.trim().trim_start_matches('.').is_empty())
            {
                bail!(
                    "upload.accept in {} contains an empty extension",
                    path.display()
                );
            }
        }

        if let Some(level) = &self.log.level {
            logging::parse_level(level)
                .with_context(|| format!("log.level in {}", path.display()))?;
        }

        Ok(())
    }

    /// Picks the service address: `flag`, then the environment, then the
    /// config file, then the built-in default.
    pub fn resolve_base_url(&self, flag: Option<&str>) -> String {
        let from_env = env::var(BASE_URL_ENV).ok();
        [flag, from_env.as_deref(), self.api.base_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/')
            .to_owned()
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn accepted_extensions(&self) -> Vec<String> {
        match &self.upload.accept {
            Some(accept) => accept
                .iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            None => DEFAULT_ACCEPTED_EXTENSIONS
                .iter()
                .map(|ext| (*ext).to_owned())
                .collect(),
        }
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log
            .path
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# sheetsage config\n# Place this file at: {}\n\nversion = 1\n\n[api]\n# Overridden by --api-base-url or {BASE_URL_ENV}\nbase_url = \"{DEFAULT_API_BASE_URL}\"\ntimeout = \"{DEFAULT_TIMEOUT}\"\n\n[upload]\naccept = [\"xlsx\", \"xls\"]\n\n[log]\n# Optional. Without a path nothing is logged.\n# path = \"/tmp/sheetsage.log\"\nlevel = \"{DEFAULT_LOG_LEVEL}\"\n",
            path.display(),
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        let secs = mins
            .checked_mul(60)
            .with_context(|| format!("timeout {raw:?} is too large"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 30s)")
}

#[cfg(test)]
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, env_lock, parse_duration};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.api_timeout()?, Duration::from_secs(30));
        assert_eq!(config.accepted_extensions(), vec!["xlsx", "xls"]);
        assert_eq!(config.log_path(), None);
        assert_eq!(config.log_level(), "info");
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[api]\nbase_url = \"http://analysis:8000\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[api], [upload], and [log]"));
        Ok(())
    }

    #[test]
    fn v1_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[api]\nbase_url = \"http://analysis:8000/\"\ntimeout = \"2m\"\n[upload]\naccept = [\".XLSX\"]\n[log]\npath = \"/tmp/sheetsage-test.log\"\nlevel = \"debug\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.api_timeout()?, Duration::from_secs(120));
        assert_eq!(config.accepted_extensions(), vec!["xlsx"]);
        assert_eq!(
            config.log_path(),
            Some(PathBuf::from("/tmp/sheetsage-test.log"))
        );
        assert_eq!(config.log_level(), "debug");
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn invalid_values_are_rejected() -> Result<()> {
        let cases = [
            ("version = 1\n[api]\ntimeout = \"0s\"\n", "must be positive"),
            ("version = 1\n[api]\nbase_url = \"  \"\n", "must not be empty"),
            ("version = 1\n[upload]\naccept = []\n", "at least one extension"),
            ("version = 1\n[upload]\naccept = [\".\"]\n", "empty extension"),
            ("version = 1\n[log]\nlevel = \"loud\"\n", "log.level"),
            (
                "version = 1\n[api]\ntimeout = \"307445734561825861m\"\n",
                "is too large",
            ),
        ];
        for (content, expected) in cases {
            let (_temp, path) = write_config(content)?;
            let error = Config::load(&path).expect_err("invalid config should fail");
            let message = format!("{error:#}");
            assert!(
                message.contains(expected),
                "expected {expected:?} in {message:?}"
            );
        }
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("SHEETSAGE_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("SHEETSAGE_CONFIG_PATH");
        }
        assert_eq!(resolved?, override_path);
        Ok(())
    }

    #[test]
    fn default_path_ends_in_app_config_file() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var("SHEETSAGE_CONFIG_PATH");
        }
        let path = Config::default_path()?;
        assert!(path.ends_with("sheetsage/config.toml"), "got {}", path.display());
        Ok(())
    }

    #[test]
    fn base_url_precedence_is_flag_env_config_default() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) =
            write_config("version = 1\n[api]\nbase_url = \"http://from-config:8000\"\n")?;
        let config = Config::load(&path)?;

        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("SHEETSAGE_API_BASE_URL", "http://from-env:8000/");
        }
        let with_flag = config.resolve_base_url(Some("http://from-flag:8000"));
        let with_env = config.resolve_base_url(None);
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("SHEETSAGE_API_BASE_URL");
        }
        let with_config = config.resolve_base_url(None);

        assert_eq!(with_flag, "http://from-flag:8000");
        assert_eq!(with_env, "http://from-env:8000");
        assert_eq!(with_config, "http://from-config:8000");
        assert_eq!(
            Config::default().resolve_base_url(Some("  ")),
            "http://localhost:8000"
        );
        Ok(())
    }

    #[test]
    fn timeout_parses_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        Ok(())
    }

    #[test]
    fn minute_timeouts_that_overflow_are_rejected() {
        let error = parse_duration("307445734561825861m").expect_err("overflow should fail");
        assert!(error.to_string().contains("is too large"));
        assert_eq!(
            parse_duration("307445734561825860m").ok(),
            Some(Duration::from_secs(307_445_734_561_825_860 * 60))
        );
    }

    #[test]
    fn timeout_rejects_invalid_duration() {
        let error = parse_duration("oops").expect_err("invalid duration should fail");
        assert!(error.to_string().contains(r#"duration "oops""#));
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("[api]"));
        assert!(example.contains("[upload]"));
        assert!(example.contains("[log]"));

        std::fs::write(&path, example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.api.base_url.as_deref(), Some("http://localhost:8000"));
        Ok(())
    }
}
