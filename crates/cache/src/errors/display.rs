//! Display implementations for cache errors

use super::types::CacheError;
use std::fmt;

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io {
                path,
                operation,
                source,
                ..
            } => write!(
                f,
                "I/O error during {} on '{}': {}",
                operation,
                path.display(),
                source
            ),
            Self::Cancelled { operation } => write!(f, "Cache operation cancelled: {operation}"),
            Self::Provider { key, source, .. } => {
                write!(f, "Content provider failed for cache key {key}: {source}")
            }
            Self::Serialization {
                operation, source, ..
            } => write!(f, "Failed to {operation:?} cache key: {source}"),
            Self::Configuration { message, .. } => {
                write!(f, "Cache configuration error: {message}")
            }
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Provider { source, .. } => Some(source.as_ref()),
            Self::Serialization { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
