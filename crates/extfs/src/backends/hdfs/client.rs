//! Remote client boundary.
//!
//! The HDFS backend talks to the cluster only through these traits. A
//! connector turns [`ClientOptions`] into a live [`HdfsClient`]; the client
//! hands out single-direction streams.
//!
//! Contract expected from implementations:
//! - a stream is either a reader or a writer (created or appended), never both;
//! - files cannot be truncated in place;
//! - `stat` on a missing path returns [`FsError::NotFound`](crate::FsError::NotFound);
//! - data written to a writer becomes visible after `flush` or `close`.

use async_trait::async_trait;
use std::io::SeekFrom;
use std::sync::Arc;
use std::time::SystemTime;

use crate::config::ClientOptions;
use crate::error::FsResult;
use crate::types::FileInfo;

/// Builds client connections.
#[async_trait]
pub trait HdfsConnector: Send + Sync {
    async fn connect(&self, options: &ClientOptions) -> FsResult<Arc<dyn HdfsClient>>;
}

/// A connection to a cluster. Shared by every handle it opens.
///
/// All paths are absolute.
#[async_trait]
pub trait HdfsClient: Send + Sync + std::fmt::Debug {
    /// Open an existing file for reading.
    async fn open(&self, path: &str) -> FsResult<Box<dyn RemoteReader>>;

    /// Create a new file. Fails if the path exists or its parent is missing.
    async fn create(&self, path: &str) -> FsResult<Box<dyn RemoteWriter>>;

    /// Open an existing file for appending.
    async fn append(&self, path: &str) -> FsResult<Box<dyn RemoteWriter>>;

    async fn stat(&self, path: &str) -> FsResult<FileInfo>;

    /// Delete a path, recursively for directories.
    async fn remove(&self, path: &str) -> FsResult<()>;

    async fn rename(&self, from: &str, to: &str) -> FsResult<()>;

    async fn read_dir(&self, path: &str) -> FsResult<Vec<FileInfo>>;

    async fn mkdir_all(&self, path: &str, perm: u32) -> FsResult<()>;

    async fn chmod(&self, path: &str, mode: u32) -> FsResult<()>;

    async fn chtimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> FsResult<()>;

    /// Tear down the connection.
    async fn close(&self) -> FsResult<()>;
}

/// A read stream.
#[async_trait]
pub trait RemoteReader: Send + std::fmt::Debug {
    /// Absolute path of the file.
    fn name(&self) -> &str;

    async fn read(&mut self, buf: &mut [u8]) -> FsResult<usize>;

    async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> FsResult<usize>;

    async fn seek(&mut self, pos: SeekFrom) -> FsResult<u64>;

    /// Metadata captured when the stream was opened.
    fn stat(&self) -> FileInfo;

    async fn close(&mut self) -> FsResult<()>;
}

/// A write stream (created or appended).
#[async_trait]
pub trait RemoteWriter: Send + std::fmt::Debug {
    async fn write(&mut self, buf: &[u8]) -> FsResult<usize>;

    /// Push buffered data to the cluster.
    async fn flush(&mut self) -> FsResult<()>;

    /// Flush and release the file.
    async fn close(&mut self) -> FsResult<()>;
}
