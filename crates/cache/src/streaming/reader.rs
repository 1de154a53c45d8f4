//! Reader over a committed cache entry

use crate::catalog::EntryInfo;
use crate::errors::{CacheError, Result};
use pin_project_lite::pin_project;
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader, ReadBuf};

pin_project! {
    /// Streams a committed entry.
    ///
    /// The handle stays valid even if the entry is invalidated or collected
    /// while it is being read.
    pub struct CacheReader {
        #[pin]
        file: BufReader<File>,
        path: PathBuf,
        info: EntryInfo,
        hasher: Sha256,
        bytes_read: u64,
    }
}

impl CacheReader {
    /// Open a committed file. A file that vanished since lookup is `None`.
    pub(crate) async fn open(path: PathBuf, info: EntryInfo) -> Result<Option<Self>> {
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(path, "open committed file", e)),
        };

        Ok(Some(Self {
            file: BufReader::new(file),
            path,
            info,
            hasher: Sha256::new(),
            bytes_read: 0,
        }))
    }

    /// Metadata recorded when the entry was committed
    #[inline]
    pub fn info(&self) -> &EntryInfo {
        &self.info
    }

    /// Total size of the entry
    #[inline]
    pub fn len(&self) -> u64 {
        self.info.size_bytes
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.info.size_bytes == 0
    }

    #[inline]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Path the entry was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether everything read so far hashes to the recorded content hash.
    ///
    /// Only meaningful once the reader has been drained.
    pub fn verify_integrity(&self) -> bool {
        if self.bytes_read != self.info.size_bytes {
            return false;
        }
        hex::encode(self.hasher.clone().finalize()) == self.info.content_hash
    }
}

impl AsyncRead for CacheReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        let before = buf.filled().len();

        match this.file.poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let fresh = &buf.filled()[before..];
                this.hasher.update(fresh);
                *this.bytes_read += fresh.len() as u64;
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for CacheReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheReader")
            .field("path", &self.path)
            .field("info", &self.info)
            .field("bytes_read", &self.bytes_read)
            .finish()
    }
}
