//! Typed adapter configuration.
//!
//! Each config type can describe its parameters (for whatever UI hosts the
//! adapters), be built from a string parameter bag, or be loaded from a TOML
//! file using the same PascalCase keys:
//!
//! ```toml
//! Path = "~/inbox"
//! Filter = "*.xml;*.json"
//! SortOptions = "CreationTimeUtcAscending"
//! MinFileAge = 5
//! ```

use crate::error::{AdapterError, Result};
use crate::message::ParamBag;
use crate::scan::{parse_filter_list, IncludeFlags, MatchRequest, SortOptions};
use crate::template::expand_tilde;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileOperation {
    Read,
    ReadAndDelete,
    Write,
    None,
}

impl FileOperation {
    pub const ALL: [FileOperation; 4] = [
        FileOperation::Read,
        FileOperation::ReadAndDelete,
        FileOperation::Write,
        FileOperation::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileOperation::Read => "Read",
            FileOperation::ReadAndDelete => "ReadAndDelete",
            FileOperation::Write => "Write",
            FileOperation::None => "None",
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, FileOperation::Read | FileOperation::ReadAndDelete)
    }
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileOperation {
    type Err = AdapterError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        FileOperation::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AdapterError::Validation(format!("unknown operation '{}'", s)))
    }
}

// =============================================================================
// Parameter descriptors
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Mandatory,
    Optional,
    Response,
    Performance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Text,
    Bool,
    /// Non-negative integer
    Integer,
    Choice(&'static [&'static str]),
}

/// Declarative description of one configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub key: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub category: Category,
    pub kind: ParamKind,
    pub default: &'static str,
    /// The default is not acceptable; a value must be supplied
    pub required: bool,
}

impl ParamDescriptor {
    const fn new(
        key: &'static str,
        display_name: &'static str,
        category: Category,
        kind: ParamKind,
        default: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            display_name,
            description,
            category,
            kind,
            default,
            required: false,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Check and normalize a raw string value into a TOML value of the right type.
    fn parse(&self, raw: &str) -> Result<toml::Value> {
        let raw = raw.trim();
        match self.kind {
            ParamKind::Text => Ok(toml::Value::String(raw.to_string())),
            ParamKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(toml::Value::Boolean(true)),
                "false" | "0" | "no" | "" => Ok(toml::Value::Boolean(false)),
                _ => Err(self.invalid(raw, "expected true or false")),
            },
            ParamKind::Integer => {
                let n: i64 = raw
                    .parse()
                    .map_err(|_| self.invalid(raw, "expected an integer"))?;
                if n < 0 {
                    return Err(self.invalid(raw, "must not be negative"));
                }
                Ok(toml::Value::Integer(n))
            }
            ParamKind::Choice(choices) => choices
                .iter()
                .find(|c| c.eq_ignore_ascii_case(raw))
                .map(|c| toml::Value::String(c.to_string()))
                .ok_or_else(|| {
                    self.invalid(raw, &format!("expected one of {}", choices.join(", ")))
                }),
        }
    }

    fn invalid(&self, raw: &str, why: &str) -> AdapterError {
        AdapterError::Validation(format!("{} = '{}': {}", self.key, raw, why))
    }
}

const SORT_CHOICES: &[&str] = &[
    "None",
    "NameAscending",
    "NameDescending",
    "CreationTimeUtcAscending",
    "CreationTimeUtcDescending",
];
const SOURCE_OPERATIONS: &[&str] = &["Read", "ReadAndDelete"];
const DESTINATION_OPERATIONS: &[&str] = &["Write", "Read", "ReadAndDelete", "None"];

/// Build a config from the descriptor-known keys of a parameter bag.
fn from_param_bag<T: DeserializeOwned>(
    descriptors: &[ParamDescriptor],
    params: &ParamBag,
) -> Result<T> {
    let mut table = toml::Table::new();
    for d in descriptors {
        if let Some(raw) = params.get_ignore_case(d.key) {
            table.insert(d.key.to_string(), d.parse(raw)?);
        }
    }
    Ok(toml::Value::Table(table).try_into()?)
}

fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|e| AdapterError::io(path, e))?;
    Ok(toml::from_str(&text)?)
}

fn require_path(key: &str, value: &str) -> Result<PathBuf> {
    if value.trim().is_empty() {
        return Err(AdapterError::Validation(format!("{} must not be blank", key)));
    }
    Ok(expand_tilde(Path::new(value.trim())))
}

/// Blank means "not configured".
fn non_blank(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

// =============================================================================
// Source
// =============================================================================

/// Settings of the polling file source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default, deny_unknown_fields)]
pub struct SourceConfig {
    pub path: String,
    pub filter: String,
    pub sort_options: SortOptions,
    /// Seconds a file must exist before it is picked up
    pub min_file_age: u64,
    pub include_sub_folders: bool,
    pub include_empty_files: bool,
    pub include_hidden_files: bool,
    pub include_read_only_files: bool,
    pub include_system_files: bool,
    pub include_temporary_files: bool,
    pub operation: FileOperation,
    pub empty_file_response: String,
    pub file_missing_response: String,
    pub is_two_way: bool,
    pub reply_path: String,
    pub reply_filename: String,
    /// Batch cap per cycle, 0 for no cap
    pub max_receive_count: usize,
    pub max_threads: usize,
    /// Milliseconds between cycles
    pub poll_interval: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            filter: "*".to_string(),
            sort_options: SortOptions::None,
            min_file_age: 0,
            include_sub_folders: false,
            include_empty_files: false,
            include_hidden_files: false,
            include_read_only_files: false,
            include_system_files: false,
            include_temporary_files: false,
            operation: FileOperation::ReadAndDelete,
            empty_file_response: String::new(),
            file_missing_response: String::new(),
            is_two_way: false,
            reply_path: String::new(),
            reply_filename: String::new(),
            max_receive_count: 100,
            max_threads: 1,
            poll_interval: 1000,
        }
    }
}

impl SourceConfig {
    pub fn describe() -> Vec<ParamDescriptor> {
        use Category::*;
        use ParamKind::*;
        vec![
            ParamDescriptor::new(
                "Path",
                "Path",
                Mandatory,
                Text,
                "",
                "Local folder or network share where files are read from.",
            )
            .required(),
            ParamDescriptor::new(
                "Filter",
                "Filter",
                Mandatory,
                Text,
                "*",
                "Collect only matching files. Separate multiple filters with , ; or |.",
            ),
            ParamDescriptor::new(
                "SortOptions",
                "Sort Options",
                Mandatory,
                Choice(SORT_CHOICES),
                "None",
                "Order in which files are picked up within each filter.",
            ),
            ParamDescriptor::new(
                "MinFileAge",
                "Minimum File Age",
                Optional,
                Integer,
                "0",
                "Seconds a file must exist before it is picked up.",
            ),
            ParamDescriptor::new(
                "IncludeSubFolders",
                "Include Sub-folders",
                Optional,
                Bool,
                "false",
                "Search sub-folders as well.",
            ),
            ParamDescriptor::new(
                "IncludeEmptyFiles",
                "Include Empty Files",
                Optional,
                Bool,
                "false",
                "Pick up files with no content.",
            ),
            ParamDescriptor::new(
                "IncludeHiddenFiles",
                "Include Hidden Files",
                Optional,
                Bool,
                "false",
                "Pick up hidden files.",
            ),
            ParamDescriptor::new(
                "IncludeReadOnlyFiles",
                "Include Read-only Files",
                Optional,
                Bool,
                "false",
                "Pick up read-only files. They are never deleted.",
            ),
            ParamDescriptor::new(
                "IncludeSystemFiles",
                "Include System Files",
                Optional,
                Bool,
                "false",
                "Pick up files marked as system files.",
            ),
            ParamDescriptor::new(
                "IncludeTemporaryFiles",
                "Include Temporary Files",
                Optional,
                Bool,
                "false",
                "Pick up files marked as temporary.",
            ),
            ParamDescriptor::new(
                "Operation",
                "Operation",
                Optional,
                Choice(SOURCE_OPERATIONS),
                "ReadAndDelete",
                "Delete files once their message has been acknowledged, or leave them.",
            ),
            ParamDescriptor::new(
                "EmptyFileResponse",
                "Empty File Response",
                Optional,
                Text,
                "",
                "Payload used instead of the content of an empty file.",
            ),
            ParamDescriptor::new(
                "FileMissingResponse",
                "File Missing Response",
                Optional,
                Text,
                "",
                "Payload used when a matched file has disappeared before it was read.",
            ),
            ParamDescriptor::new(
                "IsTwoWay",
                "Is Two Way",
                Response,
                Bool,
                "false",
                "Write response messages back to the file system.",
            ),
            ParamDescriptor::new(
                "ReplyPath",
                "Reply Path",
                Response,
                Text,
                "",
                "Folder response messages are written to.",
            ),
            ParamDescriptor::new(
                "ReplyFilename",
                "Reply Filename",
                Response,
                Text,
                "",
                "File name template for responses (Ex: %guid%.txt).",
            ),
            ParamDescriptor::new(
                "MaxReceiveCount",
                "Max Receive Count",
                Performance,
                Integer,
                "100",
                "Maximum files picked up per cycle, 0 for no limit.",
            ),
            ParamDescriptor::new(
                "MaxThreads",
                "Max Threads",
                Performance,
                Integer,
                "1",
                "Files delivered in parallel per cycle.",
            ),
            ParamDescriptor::new(
                "PollInterval",
                "Poll Interval",
                Performance,
                Integer,
                "1000",
                "Milliseconds between polling cycles.",
            ),
        ]
    }

    pub fn from_params(params: &ParamBag) -> Result<Self> {
        let config: Self = from_param_bag(&Self::describe(), params)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = load_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        require_path("Path", &self.path)?;
        parse_filter_list(&self.filter)?;
        if !self.operation.is_read() {
            return Err(AdapterError::Validation(format!(
                "Operation '{}' is not supported by a file source",
                self.operation
            )));
        }
        if self.max_threads == 0 {
            return Err(AdapterError::Validation("MaxThreads must be at least 1".to_string()));
        }
        if self.is_two_way {
            require_path("ReplyPath", &self.reply_path)?;
            if self.reply_filename.trim().is_empty() {
                return Err(AdapterError::Validation(
                    "ReplyFilename must not be blank when IsTwoWay is set".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn include_flags(&self) -> IncludeFlags {
        IncludeFlags {
            empty: self.include_empty_files,
            hidden: self.include_hidden_files,
            read_only: self.include_read_only_files,
            system: self.include_system_files,
            temporary: self.include_temporary_files,
        }
    }

    pub fn match_request(&self) -> Result<MatchRequest> {
        let root = require_path("Path", &self.path)?;
        Ok(MatchRequest::new(root, &self.filter)?
            .recurse(self.include_sub_folders)
            .include(self.include_flags())
            .min_age(Duration::from_secs(self.min_file_age))
            .sort(self.sort_options)
            .limit(self.batch_limit()))
    }

    pub fn batch_limit(&self) -> Option<usize> {
        (self.max_receive_count > 0).then_some(self.max_receive_count)
    }

    pub fn missing_response(&self) -> Option<String> {
        non_blank(&self.file_missing_response)
    }

    pub fn empty_response(&self) -> Option<String> {
        non_blank(&self.empty_file_response)
    }
}

// =============================================================================
// Destination
// =============================================================================

/// Settings of the file destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default, deny_unknown_fields)]
pub struct DestinationConfig {
    pub operation: FileOperation,
    /// Target folder; may contain `%tokens%`
    pub path: String,
    /// File name template for writes, wildcard filter for reads
    pub filename: String,
    pub append_to_existing: bool,
    pub preserve_creation_time: bool,
    pub empty_file_response: String,
    pub file_missing_response: String,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            operation: FileOperation::Write,
            path: String::new(),
            filename: "%guid%.txt".to_string(),
            append_to_existing: false,
            preserve_creation_time: false,
            empty_file_response: String::new(),
            file_missing_response: String::new(),
        }
    }
}

impl DestinationConfig {
    pub fn describe() -> Vec<ParamDescriptor> {
        use Category::*;
        use ParamKind::*;
        vec![
            ParamDescriptor::new(
                "Operation",
                "Operation",
                Mandatory,
                Choice(DESTINATION_OPERATIONS),
                "Write",
                "Operation to perform.",
            ),
            ParamDescriptor::new(
                "Path",
                "Path",
                Mandatory,
                Text,
                "",
                "Folder messages are written to or read from. Missing folders are created.",
            )
            .required(),
            ParamDescriptor::new(
                "Filename",
                "Filename",
                Mandatory,
                Text,
                "%guid%.txt",
                "File name template for outgoing messages, or the file(s) to read.",
            ),
            ParamDescriptor::new(
                "AppendToExisting",
                "Append To Existing Files",
                Optional,
                Bool,
                "false",
                "Append to an existing file instead of replacing it.",
            ),
            ParamDescriptor::new(
                "PreserveCreationTime",
                "Preserve Creation Time",
                Optional,
                Bool,
                "false",
                "Carry the source file's creation time over to the written file when possible.",
            ),
            ParamDescriptor::new(
                "EmptyFileResponse",
                "Empty File Response",
                Optional,
                Text,
                "",
                "Response content for an empty file. Blank returns the empty content.",
            ),
            ParamDescriptor::new(
                "FileMissingResponse",
                "File Missing Response",
                Optional,
                Text,
                "",
                "Response content for a missing file. Blank makes a missing file an error.",
            ),
        ]
    }

    pub fn from_params(params: &ParamBag) -> Result<Self> {
        let config: Self = from_param_bag(&Self::describe(), params)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = load_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.operation == FileOperation::None {
            return Ok(());
        }
        require_path("Path", &self.path)?;
        if self.filename.trim().is_empty() {
            return Err(AdapterError::Validation("Filename must not be blank".to_string()));
        }
        Ok(())
    }

    pub fn missing_response(&self) -> Option<String> {
        non_blank(&self.file_missing_response)
    }

    pub fn empty_response(&self) -> Option<String> {
        non_blank(&self.empty_file_response)
    }
}
