//! Atomic file writes
//!
//! Data is streamed into a uniquely named temporary file next to the
//! destination, flushed to disk, then renamed over the destination. Readers
//! see either no file (or the previous file) or the complete new one. A failed
//! or abandoned write removes its temporary file.

use pkgfetch_core::error::FetchError;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::CacheResult;

/// Size of the buffer moved per read/write round trip
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Destination written through a temporary sibling file.
///
/// Nothing appears at `dest` until [`commit`](Self::commit). Dropping the
/// value without committing deletes the temporary file.
pub struct AtomicFile {
    dest: PathBuf,
    temp: tempfile::NamedTempFile,
    writer: Box<dyn AsyncWrite + Send + Unpin>,
    written: u64,
}

impl AtomicFile {
    /// Open a temporary file next to `dest`
    pub fn create(dest: &Path) -> CacheResult<Self> {
        let temp = create_temp_file(dest).map_err(|e| write_error(dest, e))?;
        let file = temp.as_file().try_clone().map_err(|e| write_error(dest, e))?;

        Ok(Self {
            dest: dest.to_path_buf(),
            temp,
            writer: Box::new(tokio::fs::File::from_std(file)),
            written: 0,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_writer(mut self, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.writer = Box::new(writer);
        self
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Bytes accepted so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append `chunk`; returns once the writer has taken all of it
    pub async fn write(&mut self, chunk: &[u8]) -> CacheResult<()> {
        self.writer
            .write_all(chunk)
            .await
            .map_err(|e| write_error(&self.dest, e))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Flush to disk and rename over `dest`, returning the bytes written
    pub async fn commit(mut self) -> CacheResult<u64> {
        self.writer
            .flush()
            .await
            .map_err(|e| write_error(&self.dest, e))?;

        let Self { dest, temp, writer, written } = self;
        drop(writer);

        let file = temp.as_file().try_clone().map_err(|e| write_error(&dest, e))?;
        tokio::fs::File::from_std(file)
            .sync_all()
            .await
            .map_err(|e| write_error(&dest, e))?;

        temp.persist(&dest).map_err(|e| write_error(&dest, e.error))?;
        Ok(written)
    }
}

impl std::fmt::Debug for AtomicFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicFile")
            .field("dest", &self.dest)
            .field("temp", &self.temp.path())
            .field("written", &self.written)
            .finish()
    }
}

/// Copy `source` to `dest` atomically, returning the number of bytes written
pub async fn copy_file(source: &Path, dest: &Path) -> CacheResult<u64> {
    let file = tokio::fs::File::open(source)
        .await
        .map_err(|e| FetchError::SourceRead {
            path: source.to_path_buf(),
            source: e,
        })?;

    write_stream(file, source, dest).await
}

/// Write an in-memory buffer to `dest` atomically
pub async fn write_bytes(dest: &Path, bytes: &[u8]) -> CacheResult<u64> {
    write_stream(bytes, Path::new("<memory>"), dest).await
}

/// Stream `reader` into `dest` atomically.
///
/// `source` only labels read errors. Each buffer is written before the next
/// read, so the reader is consumed no faster than the disk accepts bytes.
pub async fn write_stream<R>(reader: R, source: &Path, dest: &Path) -> CacheResult<u64>
where
    R: AsyncRead + Unpin,
{
    stream_into(reader, source, AtomicFile::create(dest)?).await
}

pub(crate) async fn stream_into<R>(mut reader: R, source: &Path, mut file: AtomicFile) -> CacheResult<u64>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

    loop {
        let read = match reader.read(&mut buffer).await {
            Ok(read) => read,
            Err(e) => {
                let err = FetchError::SourceRead {
                    path: source.to_path_buf(),
                    source: e,
                };
                return Err(abandon(file, err));
            }
        };
        if read == 0 {
            break;
        }
        if let Err(err) = file.write(&buffer[..read]).await {
            return Err(abandon(file, err));
        }
    }

    file.commit().await
}

/// Drop the partial file and hand back the error
fn abandon(file: AtomicFile, err: FetchError) -> FetchError {
    warn!("Abandoning write to {}: {}", file.dest().display(), err);
    err
}

fn write_error(dest: &Path, source: io::Error) -> FetchError {
    FetchError::DestinationWrite {
        path: dest.to_path_buf(),
        source,
    }
}

/// Create the temporary sibling of `dest`: `.<file name>.<random>.tmp`
fn create_temp_file(dest: &Path) -> io::Result<tempfile::NamedTempFile> {
    let parent = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = dest
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no file name"))?
        .to_string_lossy()
        .into_owned();

    let temp = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name))
        .suffix(".tmp")
        .tempfile_in(parent)?;

    // NamedTempFile is created 0600; published files should be world-readable
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    Ok(temp)
}

#[cfg(test)]
mod tests;
