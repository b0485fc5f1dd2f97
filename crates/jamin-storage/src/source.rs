//! Byte sources for the upload transport.
//!
//! Each concrete origin of upload bytes has its own adapter; the caller picks
//! the adapter, the transport only ever calls [`ByteSource::read_all`].

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use jamin_processing::NormalizedFile;
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;

const READ_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Failed to read {origin}: {source}")]
    Io {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Source already consumed")]
    Consumed,
}

/// Something the transport can read an upload body from.
#[async_trait]
pub trait ByteSource: Send + Sync {
    async fn read_all(&self) -> Result<Bytes, ReadError>;

    /// Declared MIME type, if the source carries one.
    fn content_type(&self) -> Option<&str> {
        None
    }

    /// Original file name, if the source carries one.
    fn file_name(&self) -> Option<&str> {
        None
    }
}

/// Bytes that are already in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
    content_type: Option<String>,
    file_name: Option<String>,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            content_type: None,
            file_name: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    async fn read_all(&self) -> Result<Bytes, ReadError> {
        Ok(self.data.clone())
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }
}

/// A file on local disk, read when the transport asks for it.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    content_type: Option<String>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[async_trait]
impl ByteSource for FileSource {
    async fn read_all(&self) -> Result<Bytes, ReadError> {
        tokio::fs::read(&self.path)
            .await
            .map(Bytes::from)
            .map_err(|source| ReadError::Io {
                origin: self.path.display().to_string(),
                source,
            })
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

/// Any async reader. It can only be drained once.
pub struct ReaderSource {
    reader: Mutex<Option<Box<dyn AsyncRead + Send + Unpin>>>,
    content_type: Option<String>,
}

impl ReaderSource {
    pub fn new(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            reader: Mutex::new(Some(Box::new(reader))),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[async_trait]
impl ByteSource for ReaderSource {
    async fn read_all(&self) -> Result<Bytes, ReadError> {
        let mut reader = self.reader.lock().await.take().ok_or(ReadError::Consumed)?;

        let mut buffer = BytesMut::new();
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let n = reader.read(&mut chunk).await.map_err(|source| ReadError::Io {
                origin: "reader".to_string(),
                source,
            })?;
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);
        }

        Ok(buffer.freeze())
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

#[async_trait]
impl ByteSource for NormalizedFile {
    async fn read_all(&self) -> Result<Bytes, ReadError> {
        Ok(self.data().clone())
    }

    fn content_type(&self) -> Option<&str> {
        Some(NormalizedFile::content_type(self))
    }

    fn file_name(&self) -> Option<&str> {
        Some(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jamin_core::models::MediaBlob;

    #[tokio::test]
    async fn test_memory_source() {
        let source = MemorySource::new(Bytes::from_static(b"abc")).with_content_type("audio/wav");
        assert_eq!(source.read_all().await.unwrap(), Bytes::from_static(b"abc"));
        assert_eq!(source.content_type(), Some("audio/wav"));
    }

    #[tokio::test]
    async fn test_file_source_reads_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.webm");
        tokio::fs::write(&path, b"webm bytes").await.unwrap();

        let source = FileSource::new(&path);
        assert_eq!(source.read_all().await.unwrap(), Bytes::from_static(b"webm bytes"));
        assert_eq!(source.file_name(), Some("take.webm"));

        let missing = FileSource::new(dir.path().join("missing.webm"));
        assert!(matches!(missing.read_all().await, Err(ReadError::Io { .. })));
    }

    #[tokio::test]
    async fn test_reader_source_drains_once() {
        let data = vec![7u8; READ_CHUNK_SIZE * 2 + 10];
        let source = ReaderSource::new(std::io::Cursor::new(data.clone()));

        assert_eq!(source.read_all().await.unwrap().len(), data.len());
        assert!(matches!(source.read_all().await, Err(ReadError::Consumed)));
    }

    #[tokio::test]
    async fn test_normalized_file_is_a_source() {
        let file = jamin_processing::normalize_type(MediaBlob::new(
            "take.mp3",
            "",
            Bytes::from_static(b"ID3"),
        ));
        assert_eq!(ByteSource::content_type(&file), Some("audio/mpeg"));
        assert_eq!(file.read_all().await.unwrap(), Bytes::from_static(b"ID3"));
    }
}
