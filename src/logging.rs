use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::Mutex,
};

use directories::BaseDirs;
use tracing_subscriber::EnvFilter;

use crate::{
    app::DIR_NAME,
    error::{Error, Result},
};

const LOG_FILE: &str = "swapgame.log";

pub fn default_log_file() -> Option<PathBuf> {
    let dirs = BaseDirs::new()?;
    Some(dirs.data_dir().join(DIR_NAME).join(LOG_FILE))
}

/// The terminal is in raw mode while playing, so everything goes to a file instead.
pub fn init(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}
