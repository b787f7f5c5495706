//! Per-file handler and acknowledgment.
//!
//! A file is never deleted while it is read. Deletion happens only when the
//! consumer acknowledges the message, so a file whose consumer failed is
//! picked up again on the next cycle.

use crate::config::FileOperation;
use crate::error::{AdapterError, Result};
use crate::message::{Message, ParamBag};
use crate::scan::Candidate;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Receives messages produced by a dispatch cycle.
///
/// Returning `Ok` means the message was consumed; the sink decides when to
/// call [`AckToken::acknowledge`].
pub trait MessageSink: Send + Sync {
    fn message_received(&self, message: Message, ack: AckToken) -> Result<()>;
}

impl<F> MessageSink for F
where
    F: Fn(Message, AckToken) -> Result<()> + Send + Sync,
{
    fn message_received(&self, message: Message, ack: AckToken) -> Result<()> {
        self(message, ack)
    }
}

/// Acknowledgment state of one delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckToken {
    pub path: PathBuf,
    pub operation: FileOperation,
    /// Read-only bit as seen at scan time
    pub read_only: bool,
}

impl AckToken {
    /// Finish the message: delete the file for `ReadAndDelete`.
    ///
    /// Returns whether a file was removed. A file that is already gone counts
    /// as handled; read-only files are left in place.
    pub fn acknowledge(&self) -> Result<bool> {
        if self.operation != FileOperation::ReadAndDelete {
            return Ok(false);
        }

        let metadata = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("{} already removed", self.path.display());
                return Ok(false);
            }
            Err(e) => return Err(AdapterError::io(&self.path, e)),
        };

        if self.read_only || metadata.permissions().readonly() {
            tracing::debug!("Leaving read-only file {}", self.path.display());
            return Ok(false);
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!("Deleted {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AdapterError::io(&self.path, e)),
        }
    }
}

/// Turns a matched file into a message.
#[derive(Debug, Clone)]
pub struct FileReader {
    operation: FileOperation,
    missing_response: Option<String>,
    empty_response: Option<String>,
}

impl FileReader {
    pub fn new(operation: FileOperation) -> Self {
        Self {
            operation,
            missing_response: None,
            empty_response: None,
        }
    }

    /// Payload used when a file is gone by the time it is read.
    pub fn missing_response(mut self, text: Option<String>) -> Self {
        self.missing_response = text.filter(|t| !t.trim().is_empty());
        self
    }

    /// Payload used instead of the content of an empty file.
    pub fn empty_response(mut self, text: Option<String>) -> Self {
        self.empty_response = text.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn operation(&self) -> FileOperation {
        self.operation
    }

    pub fn read(&self, candidate: &Candidate) -> Result<(Message, AckToken)> {
        let ack = AckToken {
            path: candidate.path.clone(),
            operation: self.operation,
            read_only: candidate.is_read_only(),
        };

        let data = match self.read_bytes(&candidate.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return match &self.missing_response {
                    Some(text) => {
                        tracing::info!(
                            "{} is missing, using substitute response",
                            candidate.path.display()
                        );
                        Ok((Message::text(text.as_str()), ack))
                    }
                    None => Err(AdapterError::NotFound {
                        path: candidate.path.clone(),
                    }),
                };
            }
            Err(e) => return Err(AdapterError::io(&candidate.path, e)),
        };

        if data.is_empty() {
            if let Some(text) = &self.empty_response {
                tracing::info!(
                    "{} is empty, using substitute response",
                    candidate.path.display()
                );
                return Ok((Message::text(text.as_str()), ack));
            }
        }

        tracing::debug!("Read {} ({} bytes)", candidate.path.display(), data.len());
        let message = Message::binary(data).with_params(ParamBag::from_candidate(candidate));
        Ok((message, ack))
    }

    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        let mut file = self.open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    #[cfg(windows)]
    fn open(&self, path: &Path) -> io::Result<File> {
        use std::os::windows::fs::OpenOptionsExt;
        use windows_sys::Win32::Storage::FileSystem::FILE_SHARE_READ;

        let share = if self.operation == FileOperation::ReadAndDelete {
            0
        } else {
            FILE_SHARE_READ
        };
        OpenOptions::new().read(true).share_mode(share).open(path)
    }

    #[cfg(not(windows))]
    fn open(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new().read(true).open(path)
    }
}
