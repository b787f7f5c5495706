use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("Path not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    RawIo(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Message handler panicked: {0}")]
    HandlerPanic(String),

    #[error("{failed} of {total} files failed, first error: {first}")]
    Batch {
        failed: usize,
        total: usize,
        first: Box<AdapterError>,
    },
}

impl AdapterError {
    /// Attach a path to an I/O error, mapping `NotFound` to the dedicated variant.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            AdapterError::NotFound { path }
        } else {
            AdapterError::Io { path, source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            AdapterError::NotFound { .. } => true,
            AdapterError::RawIo(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;
