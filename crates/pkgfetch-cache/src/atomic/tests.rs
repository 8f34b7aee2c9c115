//! Unit tests for atomic writes

use super::*;
use std::pin::Pin;
use std::task::{Context, Poll};
use tempfile::tempdir;
use tokio::io::ReadBuf;

/// Yields one chunk, then fails like a dropped connection
struct InterruptedReader {
    chunk: Vec<u8>,
    served: bool,
}

impl AsyncRead for InterruptedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.served {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "stream interrupted",
            )));
        }
        self.served = true;
        let chunk = std::mem::take(&mut self.chunk);
        buf.put_slice(&chunk);
        Poll::Ready(Ok(()))
    }
}

/// Accepts `capacity` bytes, then reports a full disk
struct FullDiskWriter {
    capacity: usize,
    written: Vec<u8>,
}

impl AsyncWrite for FullDiskWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let room = self.capacity - self.written.len();
        if room == 0 {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "no space left on device")));
        }
        let n = room.min(buf.len());
        self.written.extend_from_slice(&buf[..n]);
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_copy_file_is_byte_identical() {
    let temp_dir = tempdir().unwrap();
    let source = temp_dir.path().join("package.tgz");
    let out_dir = temp_dir.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();

    // Larger than one buffer so the loop runs more than once
    let content: Vec<u8> = (0..COPY_BUFFER_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
    std::fs::write(&source, &content).unwrap();

    let dest = out_dir.join("bower-1.7.7.tgz");
    let copied = copy_file(&source, &dest).await.unwrap();

    assert_eq!(copied, content.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), content);
    // Source is copied, not moved
    assert!(source.exists());
    // No temporary files left behind
    assert_eq!(dir_entries(&out_dir), vec!["bower-1.7.7.tgz".to_string()]);
}

#[tokio::test]
async fn test_copy_replaces_existing_destination() {
    let temp_dir = tempdir().unwrap();
    let source = temp_dir.path().join("src.tgz");
    let dest = temp_dir.path().join("dest.tgz");
    std::fs::write(&source, b"new").unwrap();
    std::fs::write(&dest, b"old").unwrap();

    copy_file(&source, &dest).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"new");
}

#[tokio::test]
async fn test_missing_source_is_a_read_error() {
    let temp_dir = tempdir().unwrap();
    let source = temp_dir.path().join("missing.tgz");
    let dest = temp_dir.path().join("out.tgz");

    match copy_file(&source, &dest).await {
        Err(FetchError::SourceRead { path, .. }) => assert_eq!(path, source),
        other => panic!("Expected SourceRead error, got {:?}", other),
    }
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_missing_target_directory_is_a_write_error() {
    let temp_dir = tempdir().unwrap();
    let source = temp_dir.path().join("src.tgz");
    std::fs::write(&source, b"content").unwrap();
    let dest = temp_dir.path().join("absent").join("out.tgz");

    match copy_file(&source, &dest).await {
        Err(FetchError::DestinationWrite { path, .. }) => assert_eq!(path, dest),
        other => panic!("Expected DestinationWrite error, got {:?}", other),
    }
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_interrupted_stream_leaves_no_destination() {
    let temp_dir = tempdir().unwrap();
    let dest = temp_dir.path().join("out.tgz");
    let reader = InterruptedReader {
        chunk: vec![7u8; 1024],
        served: false,
    };

    let result = write_stream(reader, Path::new("registry"), &dest).await;

    assert!(matches!(result, Err(FetchError::SourceRead { .. })));
    assert!(!dest.exists());
    assert!(dir_entries(temp_dir.path()).is_empty());
}

#[tokio::test]
async fn test_interrupted_stream_keeps_previous_destination() {
    let temp_dir = tempdir().unwrap();
    let dest = temp_dir.path().join("out.tgz");
    std::fs::write(&dest, b"previous complete file").unwrap();

    let reader = InterruptedReader {
        chunk: vec![1u8; 4096],
        served: false,
    };
    assert!(write_stream(reader, Path::new("registry"), &dest).await.is_err());

    assert_eq!(std::fs::read(&dest).unwrap(), b"previous complete file");
    assert_eq!(dir_entries(temp_dir.path()), vec!["out.tgz".to_string()]);
}

#[tokio::test]
async fn test_full_disk_leaves_no_destination() {
    let temp_dir = tempdir().unwrap();
    let dest = temp_dir.path().join("out.tgz");
    let file = AtomicFile::create(&dest).unwrap().with_writer(FullDiskWriter {
        capacity: 100,
        written: Vec::new(),
    });
    let content = vec![9u8; COPY_BUFFER_SIZE + 10];

    match stream_into(&content[..], Path::new("registry"), file).await {
        Err(FetchError::DestinationWrite { path, source }) => {
            assert_eq!(path, dest);
            assert_eq!(source.to_string(), "no space left on device");
        }
        other => panic!("Expected DestinationWrite error, got {:?}", other),
    }
    assert!(!dest.exists());
    assert!(dir_entries(temp_dir.path()).is_empty());
}

#[tokio::test]
async fn test_uncommitted_file_is_discarded() {
    let temp_dir = tempdir().unwrap();
    let dest = temp_dir.path().join("out.tgz");

    let mut file = AtomicFile::create(&dest).unwrap();
    file.write(b"half a tarball").await.unwrap();
    assert_eq!(file.written(), 14);
    assert_eq!(dir_entries(temp_dir.path()).len(), 1);

    drop(file);
    assert!(dir_entries(temp_dir.path()).is_empty());
}

#[tokio::test]
async fn test_chunked_writes_commit_in_order() {
    let temp_dir = tempdir().unwrap();
    let dest = temp_dir.path().join("out.tgz");

    let mut file = AtomicFile::create(&dest).unwrap();
    file.write(b"first ").await.unwrap();
    assert!(!dest.exists());
    file.write(b"second").await.unwrap();

    assert_eq!(file.commit().await.unwrap(), 12);
    assert_eq!(std::fs::read(&dest).unwrap(), b"first second");
    assert_eq!(dir_entries(temp_dir.path()), vec!["out.tgz".to_string()]);
}

#[tokio::test]
async fn test_write_bytes() {
    let temp_dir = tempdir().unwrap();
    let dest = temp_dir.path().join("package.json");

    let written = write_bytes(&dest, br#"{"name":"bower"}"#).await.unwrap();
    assert_eq!(written, 16);
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), r#"{"name":"bower"}"#);
}

#[cfg(unix)]
#[tokio::test]
async fn test_written_files_are_world_readable() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = tempdir().unwrap();
    let dest = temp_dir.path().join("out.tgz");
    write_bytes(&dest, b"data").await.unwrap();

    let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o644);
}
