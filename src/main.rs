//! Medshare: patient history sharing with time-limited tokens.
//!
//! Main entry point for the command-line application.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use medshare::adapters::sanitize::{self, SanitizingMakeWriter};
use medshare::adapters::{InMemoryStorage, SqliteStorage, StorageError, SystemClock};
use medshare::cli::{self, App, Command, EXIT_USAGE, USAGE};
use medshare::config::{Config, LogMode, StorageTarget};
use medshare::ports::{MedicalRecordGateway, PatientGateway, ShareTokenGateway};

fn main() -> Result<ExitCode> {
    let config = Config::from_env();
    sanitize::set_max_bytes(config.sanitize_max_bytes);

    // Stdout carries the JSON responses, so logs never go there.
    let (writer, _guard) = match config.log_mode {
        LogMode::File => {
            if let Some(parent) = config.log_file.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.log_file)
                .with_context(|| format!("opening log file {}", config.log_file.display()))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    let command = match cli::parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            return Ok(ExitCode::from(EXIT_USAGE));
        }
    };

    let code = match config.storage {
        StorageTarget::Memory => {
            tracing::debug!("Using in-memory storage");
            execute(Arc::new(InMemoryStorage::new()), &command)
        }
        StorageTarget::Sqlite(path) => {
            tracing::debug!("Opening database at {}", path.display());
            let storage = SqliteStorage::new(&path)
                .with_context(|| format!("opening database {}", path.display()))?;
            execute(Arc::new(storage), &command)
        }
    };

    Ok(ExitCode::from(code))
}

fn execute<S>(storage: Arc<S>, command: &Command) -> u8
where
    S: PatientGateway<Error = StorageError>
        + MedicalRecordGateway<Error = StorageError>
        + ShareTokenGateway<Error = StorageError>,
{
    let app = App::new(storage, Arc::new(SystemClock));
    app.run(command, &mut std::io::stdout().lock(), &mut std::io::stderr().lock())
}
