mod commands;

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{Context, Result};
use clap::Parser;
use railbook_core::config::{self, AppConfig};
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::commands::Cli;

/// Settings for the run plus where they came from, kept until logging is up.
#[derive(Debug)]
struct ResolvedConfig {
    config: AppConfig,
    path: PathBuf,
    created: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let ResolvedConfig {
        config,
        path,
        created,
    } = resolve_config(&cli)?;
    init_logging(&config.data_dir)?;
    if created {
        info!(path = %path.display(), "default configuration written");
    }
    info!(
        config = %path.display(),
        data_dir = %config.data_dir.display(),
        "configuration loaded"
    );

    let manager = config.persistence();
    let (mut session, report) = manager
        .load_all_with_report()
        .context("failed to load records")?;
    if !report.skipped.is_empty() {
        eprintln!(
            "warning: skipped {} malformed line(s); see the log for details",
            report.skipped.len()
        );
    }

    let mut stdout = std::io::stdout().lock();
    let outcome = commands::run(cli.command, &mut session, cli.json, &mut stdout);
    if let Err(err) = &outcome {
        error!("command failed: {err:#}");
    }

    session.close(&manager).context("failed to save records")?;
    info!("session closed");
    outcome
}

fn resolve_config(cli: &Cli) -> Result<ResolvedConfig> {
    let (path, created) = match &cli.config {
        Some(path) => (path.clone(), false),
        None => config::ensure_default_config().context("failed to write default config")?,
    };
    let config = AppConfig::load_from(&path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    let config = match &cli.data_dir {
        Some(dir) => config.with_data_dir(dir),
        None => config,
    };
    Ok(ResolvedConfig {
        config,
        path,
        created,
    })
}

fn init_logging(data_dir: &Path) -> Result<()> {
    let log_dir = data_dir.join("logs");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;
    let log_path = log_dir.join("railbook.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use tempfile::tempdir;

    #[test]
    fn explicit_config_and_data_dir_are_resolved_before_logging() -> Result<()> {
        let dir = tempdir()?;
        let config_file = dir.path().join("railbook.toml");
        fs::write(&config_file, "data_dir = \"/srv/rail\"\non_parse_error = \"fail\"\n")?;
        let data_dir = dir.path().join("data");

        let cli = Cli::try_parse_from([
            OsString::from("railbook"),
            OsString::from("--config"),
            config_file.clone().into_os_string(),
            OsString::from("--data-dir"),
            data_dir.clone().into_os_string(),
            OsString::from("summary"),
        ])?;
        let resolved = resolve_config(&cli)?;

        assert_eq!(resolved.path, config_file);
        assert!(!resolved.created);
        assert_eq!(resolved.config.data_dir, data_dir);
        assert_eq!(
            resolved.config.on_parse_error,
            railbook_core::ParsePolicy::Fail
        );
        Ok(())
    }
}
