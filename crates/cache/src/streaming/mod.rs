//! Streaming I/O for cache entries
//!
//! Content never passes through memory as a whole: writers stream a source
//! into a staging file while hashing it, readers stream a committed file
//! back out.

mod export;
mod reader;
mod staged;
mod writer;


pub use reader::CacheReader;
pub use writer::CacheWriter;

pub(crate) use export::copy_to_target;
pub(crate) use staged::StagedFile;
pub(crate) use writer::{stage_from, Staged};

/// Default copy buffer size
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;
