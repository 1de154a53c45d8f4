//! Cache operations

mod files;
mod get;
mod misc;
mod put;
mod remove;
mod utils;

pub(crate) use remove::Discard;
pub(crate) use utils::check_cancelled;

/// Error type accepted from content providers
type BoxError = Box<dyn std::error::Error + Send + Sync>;
