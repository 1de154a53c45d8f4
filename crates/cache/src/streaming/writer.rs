//! Staging writer and commit protocol
//!
//! Content is streamed into a uniquely named file under the epoch's
//! `staging/` directory, then renamed onto its canonical name under
//! `objects/`. Readers therefore only ever observe complete files.

use crate::catalog::EntryInfo;
use crate::epoch::Epoch;
use crate::errors::{CacheError, Result};
use crate::keys::KeyStem;
use pin_project_lite::pin_project;
use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::SystemTime;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::staged::StagedFile;

pin_project! {
    /// Writer streaming content into a staging file.
    ///
    /// Dropping the writer removes the staging file.
    pub struct CacheWriter {
        #[pin]
        file: BufWriter<File>,
        staged: StagedFile,
        hasher: Sha256,
        bytes_written: u64,
    }
}

impl CacheWriter {
    /// Open a fresh staging file for `stem` in `epoch`
    pub(crate) async fn create(epoch: &Epoch, stem: &KeyStem, buffer_size: usize) -> Result<Self> {
        let path = epoch.staging_path(stem);
        let file = match open_new(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // Layout removed from under us
                epoch.ensure_layout().await?;
                match open_new(&path).await {
                    Ok(file) => file,
                    Err(e) => return Err(CacheError::io(path, "create staging file", e)),
                }
            }
            Err(e) => return Err(CacheError::io(path, "create staging file", e)),
        };

        trace!(path = %path.display(), "opened staging file");
        Ok(Self {
            file: BufWriter::with_capacity(buffer_size, file),
            staged: StagedFile::new(path),
            hasher: Sha256::new(),
            bytes_written: 0,
        })
    }

    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn staging_path(&self) -> &Path {
        self.staged.path()
    }

    /// Flush and close the staging file
    pub(crate) async fn finish(mut self, sync: bool) -> Result<Staged> {
        if let Err(e) = self.flush().await {
            let path = self.staged.path().to_path_buf();
            return Err(CacheError::io(path, "flush staging file", e));
        }

        let CacheWriter {
            file,
            staged,
            hasher,
            bytes_written,
        } = self;
        let file = file.into_inner();
        if sync {
            if let Err(e) = file.sync_all().await {
                let path = staged.path().to_path_buf();
                return Err(CacheError::io(path, "sync staging file", e));
            }
        }
        drop(file);

        Ok(Staged {
            file: staged,
            size_bytes: bytes_written,
            content_hash: hex::encode(hasher.finalize()),
        })
    }

    /// Close and remove the staging file
    pub(crate) async fn discard(self) {
        let CacheWriter { file, staged, .. } = self;
        drop(file);
        staged.discard().await;
    }
}

impl AsyncWrite for CacheWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.project();

        match this.file.poll_write(cx, buf) {
            Poll::Ready(Ok(n)) => {
                // Hash only what was accepted
                this.hasher.update(&buf[..n]);
                *this.bytes_written += n as u64;
                Poll::Ready(Ok(n))
            }
            other => other,
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().file.poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().file.poll_shutdown(cx)
    }
}

async fn open_new(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
}

/// A fully written staging file awaiting publication
#[derive(Debug)]
pub(crate) struct Staged {
    file: StagedFile,
    size_bytes: u64,
    content_hash: String,
}

impl Staged {
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Rename the staging file onto `target`.
    ///
    /// On failure the staging file is removed.
    pub async fn publish(self, target: &Path, epoch: &Epoch) -> Result<EntryInfo> {
        let mut result = tokio::fs::rename(self.file.path(), target).await;
        if matches!(&result, Err(e) if e.kind() == io::ErrorKind::NotFound)
            && tokio::fs::try_exists(self.file.path()).await.unwrap_or(false)
        {
            // objects/ vanished; the staging file itself is still there
            epoch.ensure_layout().await?;
            result = tokio::fs::rename(self.file.path(), target).await;
        }

        if let Err(e) = result {
            let path = target.to_path_buf();
            self.file.discard().await;
            return Err(CacheError::io(path, "commit staged file", e));
        }

        self.file.persist();
        Ok(EntryInfo {
            size_bytes: self.size_bytes,
            content_hash: self.content_hash,
            created_at: SystemTime::now(),
            epoch: epoch.id(),
        })
    }

    pub async fn discard(self) {
        self.file.discard().await;
    }
}

/// Stream `source` into a new staging file, honouring cancellation between
/// reads and writes.
pub(crate) async fn stage_from<R>(
    epoch: &Epoch,
    stem: &KeyStem,
    source: &mut R,
    cancel: &CancellationToken,
    buffer_size: usize,
    sync: bool,
) -> Result<Staged>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut writer = CacheWriter::create(epoch, stem, buffer_size).await?;
    let mut buffer = vec![0u8; buffer_size];

    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            read = source.read(&mut buffer) => Some(read),
        };
        let n = match read {
            None => {
                writer.discard().await;
                return Err(CacheError::cancelled("stage content"));
            }
            Some(Ok(0)) => break,
            Some(Ok(n)) => n,
            Some(Err(e)) => {
                let path = writer.staging_path().to_path_buf();
                writer.discard().await;
                return Err(CacheError::io(path, "read source stream", e));
            }
        };

        let written = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            written = writer.write_all(&buffer[..n]) => Some(written),
        };
        match written {
            None => {
                writer.discard().await;
                return Err(CacheError::cancelled("stage content"));
            }
            Some(Ok(())) => {}
            Some(Err(e)) => {
                let path = writer.staging_path().to_path_buf();
                writer.discard().await;
                return Err(CacheError::io(path, "write staging file", e));
            }
        }
    }

    trace!(bytes = writer.bytes_written(), "staged content");
    writer.finish(sync).await
}
