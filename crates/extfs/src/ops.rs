//! Filesystem and file handle traits.
//!
//! [`FsOps`] is the operation set every backend provides; [`FileHandle`] is
//! the capability set of every open file. Paths passed to [`FsOps`] are
//! slash-delimited and relative to the filesystem's base directory.

use async_trait::async_trait;
use std::io::SeekFrom;
use std::time::SystemTime;

use crate::error::FsResult;
use crate::file::File;
use crate::types::{FileInfo, OpenFlags};

/// Core filesystem operations trait.
#[async_trait]
pub trait FsOps: Send + Sync {
    // ========================================================================
    // Basic
    // ========================================================================

    /// Absolute base directory every path is resolved against.
    fn base(&self) -> &str;

    /// Create (or truncate) a file and open it for writing.
    async fn create(&self, path: &str) -> FsResult<File>;

    /// Open a file for reading.
    async fn open(&self, path: &str) -> FsResult<File>;

    /// Open a file with explicit flags and permission bits.
    ///
    /// Backends reject flag combinations they cannot express.
    async fn open_file(&self, path: &str, flags: OpenFlags, perm: u32) -> FsResult<File>;

    /// Remove a file or empty directory.
    async fn remove(&self, path: &str) -> FsResult<()>;

    /// Remove a path and any children it contains.
    ///
    /// A missing path is not an error.
    async fn remove_all(&self, path: &str) -> FsResult<()>;

    /// Rename (move) `from` to `to`, replacing `to` if it is a file.
    async fn rename(&self, from: &str, to: &str) -> FsResult<()>;

    /// Get metadata for a path.
    async fn stat(&self, path: &str) -> FsResult<FileInfo>;

    // ========================================================================
    // Dir
    // ========================================================================

    /// List a directory, sorted by name.
    async fn read_dir(&self, path: &str) -> FsResult<Vec<FileInfo>>;

    /// Create a directory and any missing parents.
    ///
    /// Succeeds without doing anything if the path is already a directory.
    async fn mkdir_all(&self, path: &str, perm: u32) -> FsResult<()>;

    // ========================================================================
    // Change
    // ========================================================================

    /// Change permission bits.
    async fn chmod(&self, path: &str, mode: u32) -> FsResult<()>;

    /// Change access and modification times.
    async fn chtimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> FsResult<()>;

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Release backend resources.
    async fn close(&self) -> FsResult<()>;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Real location of `path` on the backend.
    fn abs(&self, path: &str) -> FsResult<String> {
        crate::sandbox::resolve(self.base(), path)
    }

    /// Check if a path exists.
    async fn exists(&self, path: &str) -> FsResult<bool> {
        match self.stat(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Read a whole file.
    async fn read_file(&self, path: &str) -> FsResult<Vec<u8>> {
        let mut file = self.open(path).await?;
        let data = file.read_to_end().await;
        file.close().await?;
        data
    }

    /// Create a file with the given contents.
    async fn write_file(&self, path: &str, data: &[u8]) -> FsResult<()> {
        let mut file = self.create(path).await?;
        let written = file.write_all(data).await;
        file.close().await?;
        written
    }
}

/// Capabilities of an open file.
///
/// A handle that cannot perform an operation fails that call with a mode
/// error (`ReadOnly`, `WriteOnly`, `Unsupported`) and stays usable.
#[async_trait]
pub trait FileHandle: Send {
    /// Path the handle was opened with, as seen by the backend.
    fn name(&self) -> &str;

    /// Read into `buf` from the cursor. Returns 0 at end of file.
    async fn read(&mut self, buf: &mut [u8]) -> FsResult<usize>;

    /// Read into `buf` from `offset` without moving the cursor.
    async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> FsResult<usize>;

    /// Write `buf` at the cursor.
    async fn write(&mut self, buf: &[u8]) -> FsResult<usize>;

    /// Write `buf` at `offset` without moving the cursor.
    async fn write_at(&mut self, buf: &[u8], offset: u64) -> FsResult<usize>;

    /// Move the cursor.
    async fn seek(&mut self, pos: SeekFrom) -> FsResult<u64>;

    /// Make written data durable.
    async fn sync(&mut self) -> FsResult<()>;

    /// Change the file size.
    async fn truncate(&mut self, size: u64) -> FsResult<()>;

    /// Metadata of the open file.
    async fn stat(&mut self) -> FsResult<FileInfo>;

    /// Release the handle. Closing twice is a no-op.
    async fn close(&mut self) -> FsResult<()>;

    /// Read from the cursor to end of file.
    async fn read_to_end(&mut self) -> FsResult<Vec<u8>> {
        let mut data = Vec::new();
        let mut chunk = vec![0u8; 8192];
        loop {
            let n = self.read(&mut chunk).await?;
            if n == 0 {
                return Ok(data);
            }
            data.extend_from_slice(&chunk[..n]);
        }
    }

    /// Write all of `buf`, retrying short writes.
    async fn write_all(&mut self, mut buf: &[u8]) -> FsResult<()> {
        while !buf.is_empty() {
            let n = self.write(buf).await?;
            if n == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::WriteZero).into());
            }
            buf = &buf[n..];
        }
        Ok(())
    }
}
