//! Copying entries out to caller-owned files

use crate::errors::{CacheError, Result};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::staged::StagedFile;

/// Temporary sibling of `target`, so the final rename stays on one filesystem
fn sibling_temp(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_name = format!(".{name}.{:016x}.tmp", Uuid::new_v4().as_u64_pair().0);
    target.with_file_name(temp_name)
}

/// Copy `source` into `target` through a temporary sibling file.
///
/// `target` is either left untouched or fully replaced. Returns the number of
/// bytes copied.
pub(crate) async fn copy_to_target<R>(
    source: &mut R,
    target: &Path,
    cancel: &CancellationToken,
    buffer_size: usize,
) -> Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let temp = StagedFile::new(sibling_temp(target));
    let file = match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp.path())
        .await
    {
        Ok(file) => file,
        Err(e) => {
            let path = temp.path().to_path_buf();
            // Nothing was created; keep the guard from touching the path
            temp.persist();
            return Err(CacheError::io(path, "create target temporary file", e));
        }
    };

    let mut writer = BufWriter::with_capacity(buffer_size, file);
    let mut buffer = vec![0u8; buffer_size];
    let mut copied = 0u64;

    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            read = source.read(&mut buffer) => Some(read),
        };
        let n = match read {
            None => {
                drop(writer);
                temp.discard().await;
                return Err(CacheError::cancelled("copy to target"));
            }
            Some(Ok(0)) => break,
            Some(Ok(n)) => n,
            Some(Err(e)) => return Err(fail(writer, temp, "read cache entry", e).await),
        };

        if let Err(e) = writer.write_all(&buffer[..n]).await {
            return Err(fail(writer, temp, "write target temporary file", e).await);
        }
        copied += n as u64;
    }

    if let Err(e) = writer.flush().await {
        return Err(fail(writer, temp, "flush target temporary file", e).await);
    }
    drop(writer);

    if cancel.is_cancelled() {
        temp.discard().await;
        return Err(CacheError::cancelled("copy to target"));
    }

    if let Err(e) = tokio::fs::rename(temp.path(), target).await {
        temp.discard().await;
        return Err(CacheError::io(target.to_path_buf(), "replace target file", e));
    }
    temp.persist();
    Ok(copied)
}

async fn fail<W>(
    writer: W,
    temp: StagedFile,
    operation: &'static str,
    error: io::Error,
) -> CacheError {
    let path = temp.path().to_path_buf();
    drop(writer);
    temp.discard().await;
    CacheError::io(path, operation, error)
}
