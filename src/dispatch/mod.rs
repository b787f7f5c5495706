//! Batch dispatch of matched files with at-least-once delivery.
//!
//! ```text
//! can_pull? --> MatchPipeline (spawn_blocking) --> batch
//!                                                   |
//!                   max_threads == 1: in-order loop, checks run/suspend per item
//!                   max_threads  > 1: crossbeam queue + N blocking workers,
//!                                     checks cancellation between items
//!                                                   |
//!                   FileReader --> MessageSink --> AckToken::acknowledge (delete)
//! ```

pub mod context;
pub mod engine;
pub mod reader;

pub use context::{CancellationToken, DispatchContext};
pub use engine::{DispatchEngine, DispatchReport};
pub use reader::{AckToken, FileReader, MessageSink};
