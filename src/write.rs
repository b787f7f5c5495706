//! Guarded write path for outgoing messages.

use crate::error::{AdapterError, Result};
use crate::message::{keys, Message, ParamBag};
use crate::template;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

/// Parse format of the `CreationTime` parameter.
const CREATION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub append: bool,
    /// Apply the message's `CreationTime` to new files (ignored when appending)
    pub preserve_creation_time: bool,
}

/// Writes message payloads to files, one write at a time per engine.
#[derive(Debug, Default)]
pub struct WriteEngine {
    options: WriteOptions,
    gate: Mutex<()>,
}

impl WriteEngine {
    pub fn new(options: WriteOptions) -> Self {
        Self {
            options,
            gate: Mutex::new(()),
        }
    }

    pub fn options(&self) -> WriteOptions {
        self.options
    }

    /// Write `message` to `path`, creating missing directories.
    pub fn write(&self, path: &Path, message: &Message) -> Result<()> {
        let _guard = self.gate.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AdapterError::io(parent, e))?;
        }

        let mut open = OpenOptions::new();
        if self.options.append {
            open.append(true).create(true);
        } else {
            open.write(true).create(true).truncate(true);
        }

        let mut file = open.open(path).map_err(|e| AdapterError::io(path, e))?;
        file.write_all(message.payload.as_bytes())
            .map_err(|e| AdapterError::io(path, e))?;
        file.flush().map_err(|e| AdapterError::io(path, e))?;
        drop(file);

        tracing::debug!(
            "Wrote {} bytes to {}{}",
            message.payload.len(),
            path.display(),
            if self.options.append { " (append)" } else { "" }
        );

        if self.options.preserve_creation_time && !self.options.append {
            if let Some(created) = message.params.get_ignore_case(keys::CREATION_TIME) {
                if let Err(e) = preserve_creation_time(path, created) {
                    tracing::warn!("Failed to set creation time on {}: {}", path.display(), e);
                }
            }
        }

        Ok(())
    }
}

/// Resolve `directory/file_name` with tokens expanded against the message parameters.
pub fn target_path(directory: &str, file_name: &str, params: &ParamBag) -> PathBuf {
    template::expand_path(directory, params).join(template::expand(file_name, params))
}

fn parse_creation_time(value: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), CREATION_TIME_FORMAT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}

fn preserve_creation_time(path: &Path, value: &str) -> anyhow::Result<()> {
    let time = parse_creation_time(value)
        .ok_or_else(|| anyhow::anyhow!("unparseable creation time '{}'", value))?;
    set_created(path, SystemTime::from(time))
}

#[cfg(windows)]
fn set_created(path: &Path, time: SystemTime) -> anyhow::Result<()> {
    use std::fs::FileTimes;
    use std::os::windows::fs::FileTimesExt;

    let file = OpenOptions::new().write(true).open(path)?;
    file.set_times(FileTimes::new().set_created(time))?;
    Ok(())
}

/// No portable way to set a birth time; the last-write time carries it instead.
#[cfg(not(windows))]
fn set_created(path: &Path, time: SystemTime) -> anyhow::Result<()> {
    filetime::set_file_mtime(path, filetime::FileTime::from_system_time(time))?;
    Ok(())
}
