//! Adapter registry and the file source/destination adapters.

pub mod destination;
pub mod source;

pub use destination::FileDestination;
pub use source::FileSource;

use crate::config::{DestinationConfig, ParamDescriptor, SourceConfig};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Source,
    Destination,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterKind::Source => f.write_str("source"),
            AdapterKind::Destination => f.write_str("destination"),
        }
    }
}

/// Identity and parameter surface of a registered adapter.
#[derive(Debug, Clone, Copy)]
pub struct AdapterDescriptor {
    pub id: Uuid,
    pub kind: AdapterKind,
    pub name: &'static str,
    pub description: &'static str,
    pub supports_multithreading: bool,
    pub parameters: fn() -> Vec<ParamDescriptor>,
}

pub static ADAPTERS: &[AdapterDescriptor] = &[
    AdapterDescriptor {
        id: Uuid::from_u128(0x04496183_dfbd_4173_a8be_1dbc9aa996b7),
        kind: AdapterKind::Source,
        name: "file-source",
        description: "Source adapter for receiving messages from the local file system.",
        supports_multithreading: true,
        parameters: SourceConfig::describe,
    },
    AdapterDescriptor {
        id: Uuid::from_u128(0xb003a596_c2d0_4ad9_bd9d_358dea3c6498),
        kind: AdapterKind::Destination,
        name: "file-destination",
        description: "Destination adapter for sending messages to the local file system.",
        supports_multithreading: false,
        parameters: DestinationConfig::describe,
    },
];

/// Look up an adapter by name, kind or id.
pub fn find(key: &str) -> Option<&'static AdapterDescriptor> {
    let key = key.trim();
    ADAPTERS.iter().find(|a| {
        a.name.eq_ignore_ascii_case(key)
            || a.kind.to_string().eq_ignore_ascii_case(key)
            || Uuid::parse_str(key).map_or(false, |id| id == a.id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find() {
        assert_eq!(find("file-source").unwrap().kind, AdapterKind::Source);
        assert_eq!(find("Destination").unwrap().name, "file-destination");
        assert_eq!(
            find("04496183-DFBD-4173-A8BE-1DBC9AA996B7").unwrap().name,
            "file-source"
        );
        assert!(find("replace-text").is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(ADAPTERS[0].id, ADAPTERS[1].id);
        assert_eq!(
            ADAPTERS[1].id.to_string(),
            "b003a596-c2d0-4ad9-bd9d-358dea3c6498"
        );
    }

    #[test]
    fn test_parameters() {
        let params = (find("source").unwrap().parameters)();
        assert!(params.iter().any(|p| p.key == "MaxReceiveCount"));
        let params = (find("destination").unwrap().parameters)();
        assert!(params.iter().any(|p| p.key == "AppendToExisting"));
    }
}
