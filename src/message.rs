//! Message envelope: a payload plus a string parameter bag.

use crate::scan::Candidate;
use bytes::Bytes;
use chrono::{DateTime, TimeZone};
use std::collections::BTreeMap;
use std::fmt;

/// Format of the timestamp parameters: `yyyy-MM-dd HH:mm:ss.ffff`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parameter keys attached to every message read from a file.
pub mod keys {
    pub const NAME: &str = "Name";
    pub const FILE_NAME: &str = "FileName";
    pub const FILE_NAME_WITHOUT_EXTENSION: &str = "FileNameWithoutExtension";
    pub const EXTENSION: &str = "Extension";
    pub const FULL_NAME: &str = "FullName";
    pub const DIRECTORY_NAME: &str = "DirectoryName";
    pub const CREATION_TIME: &str = "CreationTime";
    pub const CREATION_TIME_UTC: &str = "CreationTimeUtc";
    pub const LAST_WRITE_TIME: &str = "LastWriteTime";
    pub const LAST_WRITE_TIME_UTC: &str = "LastWriteTimeUtc";
}

/// Key/value parameters carried alongside a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamBag {
    values: BTreeMap<String, String>,
}

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Lookup ignoring ASCII case of the key.
    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        self.get(key).or_else(|| {
            self.values
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str())
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The file parameters of a candidate.
    pub fn from_candidate(candidate: &Candidate) -> Self {
        let mut bag = Self::new();
        bag.set(keys::NAME, candidate.name.as_str());
        bag.set(keys::FILE_NAME, candidate.name.as_str());
        bag.set(
            keys::FILE_NAME_WITHOUT_EXTENSION,
            candidate.name_without_extension(),
        );
        bag.set(keys::EXTENSION, candidate.extension.as_str());
        bag.set(keys::FULL_NAME, candidate.path.to_string_lossy());
        bag.set(keys::DIRECTORY_NAME, candidate.directory.to_string_lossy());
        bag.set(keys::CREATION_TIME, format_timestamp(&candidate.created_local()));
        bag.set(keys::CREATION_TIME_UTC, format_timestamp(&candidate.created));
        bag.set(keys::LAST_WRITE_TIME, format_timestamp(&candidate.modified_local()));
        bag.set(keys::LAST_WRITE_TIME_UTC, format_timestamp(&candidate.modified));
        bag
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParamBag {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut bag = Self::new();
        for (k, v) in iter {
            bag.set(k, v);
        }
        bag
    }
}

/// `yyyy-MM-dd HH:mm:ss.ffff` (four fractional digits, truncated).
pub fn format_timestamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    let ten_thousandths = (time.timestamp_subsec_nanos() / 100_000).min(9_999);
    format!("{}.{:04}", time.format(TIMESTAMP_FORMAT), ten_thousandths)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Bytes),
}

impl Payload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(s) => s.as_bytes(),
            Payload::Binary(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A payload with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub payload: Payload,
    pub params: ParamBag,
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            payload: Payload::Text(text.into()),
            params: ParamBag::new(),
        }
    }

    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self {
            payload: Payload::Binary(data.into()),
            params: ParamBag::new(),
        }
    }

    pub fn with_params(mut self, params: ParamBag) -> Self {
        self.params = params;
        self
    }

    pub fn is_text(&self) -> bool {
        matches!(self.payload, Payload::Text(_))
    }

    /// Payload decoded as text (lossy for binary payloads).
    pub fn text_lossy(&self) -> String {
        match &self.payload {
            Payload::Text(s) => s.clone(),
            Payload::Binary(b) => String::from_utf8_lossy(b).into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::FileAttributes;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    #[test]
    fn test_format_timestamp() {
        let t = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_nano_opt(7, 5, 3, 123_456_789)
            .unwrap()
            .and_utc();
        assert_eq!(format_timestamp(&t), "2024-03-09 07:05:03.1234");

        let whole = NaiveDate::from_ymd_opt(2024, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap()
            .and_utc();
        assert_eq!(format_timestamp(&whole), "2024-12-31 23:59:59.0000");
    }

    #[test]
    fn test_params_from_candidate() {
        let created = NaiveDate::from_ymd_opt(2023, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
            .and_utc();
        let candidate = Candidate {
            name: "invoice.xml".to_string(),
            extension: ".xml".to_string(),
            path: PathBuf::from("/in/invoice.xml"),
            directory: PathBuf::from("/in"),
            size: 10,
            created,
            modified: created,
            attributes: FileAttributes::empty(),
        };

        let bag = ParamBag::from_candidate(&candidate);
        assert_eq!(bag.len(), 10);
        assert_eq!(bag.get(keys::NAME), Some("invoice.xml"));
        assert_eq!(bag.get(keys::FILE_NAME), Some("invoice.xml"));
        assert_eq!(bag.get(keys::FILE_NAME_WITHOUT_EXTENSION), Some("invoice"));
        assert_eq!(bag.get(keys::EXTENSION), Some(".xml"));
        assert_eq!(bag.get(keys::FULL_NAME), Some("/in/invoice.xml"));
        assert_eq!(bag.get(keys::DIRECTORY_NAME), Some("/in"));
        assert_eq!(bag.get(keys::CREATION_TIME_UTC), Some("2023-01-02 03:04:05.0000"));
        assert_eq!(bag.get(keys::LAST_WRITE_TIME_UTC), Some("2023-01-02 03:04:05.0000"));
        assert!(bag.contains(keys::CREATION_TIME));
        assert!(bag.contains(keys::LAST_WRITE_TIME));
    }

    #[test]
    fn test_get_ignore_case() {
        let bag: ParamBag = [("FileName", "a.txt")].into_iter().collect();
        assert_eq!(bag.get_ignore_case("filename"), Some("a.txt"));
        assert_eq!(bag.get("filename"), None);
    }

    #[test]
    fn test_payload_kinds() {
        let text = Message::text("hello");
        assert!(text.is_text());
        assert_eq!(text.payload.len(), 5);

        let bin = Message::binary(vec![0u8, 159, 146, 150]);
        assert!(!bin.is_text());
        assert_eq!(bin.payload.as_bytes(), &[0u8, 159, 146, 150]);
    }
}
