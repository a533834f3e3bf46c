//! Error type shared by every xconsole component.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to enter raw mode: {0}")]
    RawMode(#[source] io::Error),

    #[error("Failed to restore terminal: {0}")]
    Restore(#[source] io::Error),

    #[error("Terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Input stream closed")]
    InputClosed,

    #[error("Failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
