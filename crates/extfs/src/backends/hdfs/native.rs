//! Connector for real clusters, over the `hdfs-native` client.
//!
//! The namenode is the first configured address. The simple-auth user is
//! chosen by `hdfs-native` itself (Kerberos ticket or `HADOOP_USER_NAME`),
//! so [`ClientOptions::user`] is only logged here.
//!
//! `hdfs-native` writers have no hflush; written data becomes visible when
//! the handle is closed.

use async_trait::async_trait;
use bytes::Bytes;
use hdfs_native::file::{FileReader, FileWriter};
use hdfs_native::{Client, HdfsError, WriteOptions};
use std::collections::HashMap;
use std::fmt;
use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use super::client::{HdfsClient, HdfsConnector, RemoteReader, RemoteWriter};
use crate::config::ClientOptions;
use crate::error::{FsError, FsResult};
use crate::sandbox::base_name;
use crate::types::{FileInfo, FileType};

const USE_DATANODE_HOSTNAME: &str = "dfs.client.use.datanode.hostname";

/// Connects through `hdfs-native`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeConnector;

#[async_trait]
impl HdfsConnector for NativeConnector {
    async fn connect(&self, options: &ClientOptions) -> FsResult<Arc<dyn HdfsClient>> {
        let Some(address) = options.addresses.first() else {
            return Err(FsError::Config("no namenode address configured".into()));
        };
        if options.addresses.len() > 1 {
            warn!(
                using = %address,
                ignored = ?&options.addresses[1..],
                "hdfs-native connects to a single namenode"
            );
        }

        let mut conf = HashMap::new();
        conf.insert(
            USE_DATANODE_HOSTNAME.to_string(),
            options.use_datanode_hostname.to_string(),
        );

        let url = format!("hdfs://{address}");
        debug!(%url, user = %options.user, "hdfs-native connect");
        let client = Client::new_with_config(&url, conf).map_err(|e| map_error(&url, e))?;

        Ok(Arc::new(NativeClient {
            client,
            url,
            closed: AtomicBool::new(false),
        }))
    }
}

/// Map a client error onto the taxonomy, keeping not-found and
/// already-exists distinguishable.
fn map_error(path: &str, err: HdfsError) -> FsError {
    match err {
        HdfsError::FileNotFound(_) => FsError::not_found(path),
        HdfsError::AlreadyExists(_) => FsError::already_exists(path),
        HdfsError::IOError(e) => FsError::from_io(Path::new(path), e),
        // remote exceptions arrive by Java class name
        other => {
            let text = other.to_string();
            if text.contains("FileNotFoundException") {
                FsError::not_found(path)
            } else if text.contains("FileAlreadyExistsException") {
                FsError::already_exists(path)
            } else {
                FsError::other(format!("{path}: {text}"))
            }
        }
    }
}

fn millis(t: SystemTime) -> u64 {
    t.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn file_info(name: &str, status: &hdfs_native::client::FileStatus) -> FileInfo {
    FileInfo {
        name: name.to_string(),
        kind: if status.isdir {
            FileType::Directory
        } else {
            FileType::File
        },
        size: status.length as u64,
        perm: u32::from(status.permission),
        mtime: SystemTime::UNIX_EPOCH + Duration::from_millis(status.modification_time),
        atime: Some(SystemTime::UNIX_EPOCH + Duration::from_millis(status.access_time)),
        owner: Some(status.owner.clone()),
        group: Some(status.group.clone()),
    }
}

struct NativeClient {
    client: Client,
    url: String,
    closed: AtomicBool,
}

impl fmt::Debug for NativeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeClient")
            .field("url", &self.url)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl NativeClient {
    fn client(&self) -> FsResult<&Client> {
        if self.closed.load(Ordering::Acquire) {
            return Err(FsError::ClientClosed);
        }
        Ok(&self.client)
    }
}

#[async_trait]
impl HdfsClient for NativeClient {
    async fn open(&self, path: &str) -> FsResult<Box<dyn RemoteReader>> {
        let client = self.client()?;
        let status = client
            .get_file_info(path)
            .await
            .map_err(|e| map_error(path, e))?;
        if status.isdir {
            return Err(FsError::is_a_directory(path));
        }
        let reader = client.read(path).await.map_err(|e| map_error(path, e))?;

        Ok(Box::new(NativeReader {
            path: path.to_string(),
            info: file_info(base_name(path), &status),
            inner: reader,
            pos: 0,
        }))
    }

    async fn create(&self, path: &str) -> FsResult<Box<dyn RemoteWriter>> {
        let writer = self
            .client()?
            .create(path, WriteOptions::default())
            .await
            .map_err(|e| map_error(path, e))?;
        Ok(Box::new(NativeWriter {
            path: path.to_string(),
            inner: writer,
        }))
    }

    async fn append(&self, path: &str) -> FsResult<Box<dyn RemoteWriter>> {
        let writer = self
            .client()?
            .append(path)
            .await
            .map_err(|e| map_error(path, e))?;
        Ok(Box::new(NativeWriter {
            path: path.to_string(),
            inner: writer,
        }))
    }

    async fn stat(&self, path: &str) -> FsResult<FileInfo> {
        let status = self
            .client()?
            .get_file_info(path)
            .await
            .map_err(|e| map_error(path, e))?;
        Ok(file_info(base_name(path), &status))
    }

    async fn remove(&self, path: &str) -> FsResult<()> {
        let deleted = self
            .client()?
            .delete(path, true)
            .await
            .map_err(|e| map_error(path, e))?;
        if deleted {
            Ok(())
        } else {
            Err(FsError::not_found(path))
        }
    }

    async fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        self.client()?
            .rename(from, to, true)
            .await
            .map_err(|e| map_error(from, e))
    }

    async fn read_dir(&self, path: &str) -> FsResult<Vec<FileInfo>> {
        let statuses = self
            .client()?
            .list_status(path, false)
            .await
            .map_err(|e| map_error(path, e))?;
        Ok(statuses
            .iter()
            .map(|status| file_info(base_name(&status.path), status))
            .collect())
    }

    async fn mkdir_all(&self, path: &str, perm: u32) -> FsResult<()> {
        self.client()?
            .mkdirs(path, perm, true)
            .await
            .map_err(|e| map_error(path, e))
    }

    async fn chmod(&self, path: &str, mode: u32) -> FsResult<()> {
        self.client()?
            .set_permission(path, mode & 0o7777)
            .await
            .map_err(|e| map_error(path, e))
    }

    async fn chtimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> FsResult<()> {
        self.client()?
            .set_times(path, millis(mtime), millis(atime))
            .await
            .map_err(|e| map_error(path, e))
    }

    async fn close(&self) -> FsResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

struct NativeReader {
    path: String,
    info: FileInfo,
    inner: FileReader,
    pos: u64,
}

impl fmt::Debug for NativeReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeReader")
            .field("path", &self.path)
            .field("pos", &self.pos)
            .finish_non_exhaustive()
    }
}

impl NativeReader {
    async fn read_range(&self, buf: &mut [u8], offset: u64) -> FsResult<usize> {
        let len = (self.info.size.saturating_sub(offset) as usize).min(buf.len());
        if len == 0 {
            return Ok(0);
        }
        let data = self
            .inner
            .read_range(offset as usize, len)
            .await
            .map_err(|e| map_error(&self.path, e))?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

#[async_trait]
impl RemoteReader for NativeReader {
    fn name(&self) -> &str {
        &self.path
    }

    async fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        let n = self.read_range(buf, self.pos).await?;
        self.pos += n as u64;
        Ok(n)
    }

    async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> FsResult<usize> {
        self.read_range(buf, offset).await
    }

    async fn seek(&mut self, pos: SeekFrom) -> FsResult<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
            SeekFrom::End(delta) => self.info.size.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            FsError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek to a negative offset",
            ))
        })?;
        self.pos = target;
        Ok(target)
    }

    fn stat(&self) -> FileInfo {
        self.info.clone()
    }

    async fn close(&mut self) -> FsResult<()> {
        Ok(())
    }
}

struct NativeWriter {
    path: String,
    inner: FileWriter,
}

impl fmt::Debug for NativeWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeWriter")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RemoteWriter for NativeWriter {
    async fn write(&mut self, buf: &[u8]) -> FsResult<usize> {
        self.inner
            .write(Bytes::copy_from_slice(buf))
            .await
            .map_err(|e| map_error(&self.path, e))
    }

    async fn flush(&mut self) -> FsResult<()> {
        Ok(())
    }

    async fn close(&mut self) -> FsResult<()> {
        self.inner
            .close()
            .await
            .map_err(|e| map_error(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FsErrorKind;

    #[test]
    fn test_error_mapping() {
        let err = map_error("/a", HdfsError::FileNotFound("/a".into()));
        assert!(err.is_not_found());

        let err = map_error("/a", HdfsError::AlreadyExists("/a".into()));
        assert_eq!(err.kind(), FsErrorKind::AlreadyExists);

        let io = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert!(map_error("/a", HdfsError::IOError(io)).is_not_found());
    }

    #[tokio::test]
    async fn test_connect_needs_an_address() {
        let options = ClientOptions {
            addresses: Vec::new(),
            user: "tester".into(),
            use_datanode_hostname: false,
        };
        let err = NativeConnector.connect(&options).await.unwrap_err();
        assert_eq!(err.kind(), FsErrorKind::Config);
    }

    #[test]
    fn test_file_info_from_status() {
        let status = hdfs_native::client::FileStatus {
            path: "/warehouse/part-0".into(),
            length: 42,
            isdir: false,
            permission: 0o644,
            owner: "etl".into(),
            group: "supergroup".into(),
            modification_time: 1_000,
            access_time: 2_000,
            replication: Some(3),
            blocksize: Some(134_217_728),
        };
        let info = file_info(base_name(&status.path), &status);
        assert_eq!(info.name, "part-0");
        assert_eq!(info.size, 42);
        assert_eq!(info.perm, 0o644);
        assert_eq!(info.mtime, SystemTime::UNIX_EPOCH + Duration::from_secs(1));
        assert_eq!(info.owner.as_deref(), Some("etl"));
    }
}
