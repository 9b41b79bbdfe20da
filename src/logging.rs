use std::{error::Error, fs, io, path::PathBuf, sync::Mutex};

use tracing_subscriber::EnvFilter;

use crate::AppResult;

pub const LOG_ENV: &str = "MARKLIST_LOG";
const DEFAULT_DIRECTIVE: &str = "marklist=info";

pub enum LogTarget {
    Stderr,
    File(PathBuf),
    /// The terminal UI owns stderr; without a log file nothing is recorded.
    Disabled,
}

pub fn init_logging(target: LogTarget) -> AppResult<()> {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    match target {
        LogTarget::Disabled => Ok(()),
        LogTarget::Stderr => {
            builder
                .with_writer(io::stderr)
                .try_init()
                .map_err(|err| err as Box<dyn Error>)?;
            Ok(())
        }
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|err| err as Box<dyn Error>)?;
            Ok(())
        }
    }
}
