//! Arguments and setup shared by every command.

use super::ProgressReporter;
use crate::Result;
use crate::config::StoreConfig;
use crate::store::{Store, StoreObserver};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, ValueEnum};
use core::time::Duration;
use ohno::{IntoAppError, bail};
use std::sync::Arc;

/// Color mode configuration for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Always use colors
    Always,

    /// Never use colors
    Never,

    /// Use colors if the output is a terminal, otherwise don't use colors
    Auto,
}

impl ColorMode {
    #[must_use]
    pub fn use_colors(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => {
                use std::io::{IsTerminal, stderr};
                stderr().is_terminal()
            }
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,

    /// Only error messages
    Error,

    /// Warning and error messages
    Warn,

    /// Info, warning, and error messages
    Info,

    /// Debug, info, warning, and error messages
    Debug,

    /// Trace, debug, info, warning, and error messages
    Trace,
}

/// Arguments accepted by every command
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to a store configuration file (TOML)
    #[arg(long, short = 'c', value_name = "PATH", global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", global = true)]
    pub log_level: LogLevel,
}

impl GlobalArgs {
    /// Initialize logging and load the store configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be loaded
    pub fn prepare(&self) -> Result<StoreConfig> {
        init_logging(self.log_level);
        StoreConfig::load(self.config.as_deref().map(Utf8Path::as_std_path))
    }

    /// A progress reporter that stays hidden when diagnostics are being logged
    #[must_use]
    pub fn progress_reporter(&self) -> Arc<ProgressReporter> {
        let delay = if self.log_level == LogLevel::None {
            Duration::from_millis(300)
        } else {
            Duration::from_hours(365 * 24)
        };

        Arc::new(ProgressReporter::new(delay, self.color.use_colors()))
    }
}

/// Arguments of commands that only read an existing store
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Path to the store file
    #[arg(long, short = 's', value_name = "PATH")]
    pub store: Utf8PathBuf,
}

/// Initialize logger based on log level
fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    // A logger may already be installed when several commands run in one process
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}

/// Opens a store on a blocking thread, reporting reconciliation progress.
///
/// # Errors
///
/// Returns an error if the store cannot be opened
pub async fn open_store(path: Utf8PathBuf, config: StoreConfig, progress: Arc<ProgressReporter>) -> Result<Store> {
    if !path.exists() {
        bail!("no store at '{path}'");
    }

    tokio::task::spawn_blocking(move || {
        let observer: Arc<dyn StoreObserver> = progress;
        Store::open_with(path.as_std_path(), config, vec![observer])
    })
    .await
    .into_app_err("store task panicked")?
}
