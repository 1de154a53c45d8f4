//! Shared helpers for cache integration tests

#![allow(dead_code)]

use filestash_cache::{CacheConfig, CacheReader, FileCache};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio::time::Sleep;
use walkdir::WalkDir;

/// A cache in its own temporary directory. Staging files are swept on every
/// collection pass.
pub async fn test_cache<K: ?Sized>() -> (FileCache<K>, TempDir) {
    filestash_utils::tracing::init_for_tests();
    let temp_dir = TempDir::new().unwrap();
    let cache = cache_at(temp_dir.path()).await;
    (cache, temp_dir)
}

pub async fn cache_at<K: ?Sized>(base_dir: &Path) -> FileCache<K> {
    let config = CacheConfig::builder()
        .with_base_dir(base_dir)
        .with_staging_grace(Duration::ZERO)
        .with_buffer_size(8 * 1024)
        .build()
        .unwrap();
    FileCache::new(config).await.unwrap()
}

pub async fn read_all(mut reader: CacheReader) -> Vec<u8> {
    let mut content = Vec::new();
    reader.read_to_end(&mut content).await.unwrap();
    assert!(reader.verify_integrity());
    content
}

/// Epoch-named directories under the base directory
pub fn epoch_dirs(base_dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(base_dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            name.len() == 16 && name.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        })
        .map(|entry| entry.path())
        .collect();
    dirs.sort();
    dirs
}

pub fn files_under(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .count()
}

/// Only the current epoch is left, with empty staging and graveyard
pub fn assert_no_garbage<K: ?Sized>(cache: &FileCache<K>) {
    let current = cache.current_epoch_dir();
    assert_eq!(epoch_dirs(cache.base_dir()), vec![current.clone()]);
    assert_eq!(files_under(&current.join("staging")), 0, "staging not empty");
    assert_eq!(files_under(&current.join("graveyard")), 0, "graveyard not empty");
}

/// Number of committed files in the current epoch
pub fn committed_files<K: ?Sized>(cache: &FileCache<K>) -> usize {
    files_under(&cache.current_epoch_dir().join("objects"))
}

/// Endless source that yields a small chunk every millisecond
pub struct Trickle {
    delay: Pin<Box<Sleep>>,
}

impl Trickle {
    pub fn new() -> Self {
        Self {
            delay: Box::pin(tokio::time::sleep(Duration::from_millis(1))),
        }
    }
}

impl AsyncRead for Trickle {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.delay.as_mut().poll(cx) {
            Poll::Ready(()) => {
                let n = buf.remaining().min(512);
                buf.put_slice(&vec![0x5a; n]);
                let next = tokio::time::Instant::now() + Duration::from_millis(1);
                self.delay.as_mut().reset(next);
                Poll::Ready(Ok(()))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
