//! Error handling for the file cache
//!
//! Every error carries a recovery hint. Cache misses are not errors: lookups
//! return `Ok(None)` and the policy merge rejection is a plain `false`.

mod conversions;
mod display;
mod recovery;
mod types;

pub use types::*;
