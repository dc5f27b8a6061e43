// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::env;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::filter::LevelFilter;

const LOG_LEVEL_ENV: &str = "SHEETSAGE_LOG";

pub fn parse_level(raw: &str) -> Result<LevelFilter> {
    raw.trim().parse::<LevelFilter>().map_err(|_| {
        anyhow!("invalid log level {raw:?}; use one of: off, error, warn, info, debug, trace")
    })
}

/// `SHEETSAGE_LOG` wins over the configured level when it is set.
fn resolve_level(configured: &str) -> Result<LevelFilter> {
    match env::var(LOG_LEVEL_ENV) {
        Ok(raw) if !raw.trim().is_empty() => {
            parse_level(&raw).with_context(|| format!("{LOG_LEVEL_ENV} environment variable"))
        }
        _ => parse_level(configured),
    }
}

/// Installs a global subscriber appending to `path`. The terminal belongs
/// to the UI, so without a path nothing is installed and events are dropped.
pub fn init(path: Option<&Path>, configured_level: &str) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let level = resolve_level(configured_level)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("install log subscriber")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_level, resolve_level};
    use crate::config::env_lock;
    use anyhow::Result;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn levels_parse_case_insensitively() -> Result<()> {
        assert_eq!(parse_level("info")?, LevelFilter::INFO);
        assert_eq!(parse_level(" DEBUG ")?, LevelFilter::DEBUG);
        assert_eq!(parse_level("off")?, LevelFilter::OFF);
        Ok(())
    }

    #[test]
    fn unknown_level_lists_choices() {
        let error = parse_level("loud").expect_err("unknown level should fail");
        assert!(error.to_string().contains("off, error, warn, info, debug, trace"));
    }

    #[test]
    fn env_level_overrides_configured_level() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("SHEETSAGE_LOG", "trace");
        }
        let from_env = resolve_level("warn");
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("SHEETSAGE_LOG");
        }
        assert_eq!(from_env?, LevelFilter::TRACE);
        assert_eq!(resolve_level("warn")?, LevelFilter::WARN);
        Ok(())
    }

    #[test]
    fn no_path_installs_nothing() -> Result<()> {
        super::init(None, "not-a-level")?;
        Ok(())
    }
}
