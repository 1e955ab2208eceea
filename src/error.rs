use std::io;

use thiserror::Error;

use crate::app::ReplayError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("round log: {0}")]
    Json(#[from] serde_json::Error),
    #[error("replay: {0}")]
    Replay(#[from] ReplayError),
    #[error("logging setup: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
