//! Drop-folder adapters: pick up files matching wildcard filters, hand them
//! to a consumer with at-least-once delivery, and write messages back out.
//!
//! - [`scan`] selects files (wildcards, attribute filters, settle window, sort).
//! - [`dispatch`] delivers a batch sequentially or on a bounded worker pool.
//! - [`write`] is the serialized write path.
//! - [`adapter`] wires typed [`config`] to the engines.

pub mod adapter;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod scan;
pub mod template;
pub mod write;

pub use error::{AdapterError, Result};
pub use message::{Message, ParamBag, Payload};
