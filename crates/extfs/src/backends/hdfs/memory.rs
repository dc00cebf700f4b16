//! In-process HDFS cluster.
//!
//! Implements the remote client boundary with HDFS semantics: single
//! direction streams, no truncation, create fails on existing paths,
//! one writer per file, and written data visible only after a flush.
//! Used by the tests and for development without a real cluster.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::io::SeekFrom;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::SystemTime;

use super::client::{HdfsClient, HdfsConnector, RemoteReader, RemoteWriter};
use crate::config::ClientOptions;
use crate::error::{FsError, FsResult};
use crate::sandbox::{base_name, parent};
use crate::types::{DEFAULT_DIRECTORY_MODE, FileInfo, FileType};

/// Permission bits HDFS gives new files.
const DEFAULT_FILE_MODE: u32 = 0o644;

const SUPERGROUP: &str = "supergroup";

#[derive(Debug, Clone)]
struct Node {
    kind: FileType,
    data: Vec<u8>,
    perm: u32,
    mtime: SystemTime,
    atime: SystemTime,
    owner: String,
    /// A writer currently holds the lease on this file.
    leased: bool,
}

impl Node {
    fn new(kind: FileType, perm: u32, owner: &str) -> Self {
        let now = SystemTime::now();
        Self {
            kind,
            data: Vec::new(),
            perm,
            mtime: now,
            atime: now,
            owner: owner.to_string(),
            leased: false,
        }
    }

    fn info(&self, path: &str) -> FileInfo {
        FileInfo {
            name: base_name(path).to_string(),
            kind: self.kind,
            size: self.data.len() as u64,
            perm: self.perm,
            mtime: self.mtime,
            atime: Some(self.atime),
            owner: Some(self.owner.clone()),
            group: Some(SUPERGROUP.to_string()),
        }
    }
}

#[derive(Debug)]
struct Namespace {
    nodes: RwLock<BTreeMap<String, Node>>,
    requests: AtomicU64,
    connections: Mutex<Vec<ClientOptions>>,
}

/// An in-memory cluster. Clones share the same namespace.
#[derive(Debug, Clone)]
pub struct MemoryCluster {
    ns: Arc<Namespace>,
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCluster {
    /// Create an empty cluster containing only `/`.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "/".to_string(),
            Node::new(FileType::Directory, DEFAULT_DIRECTORY_MODE, "hdfs"),
        );
        Self {
            ns: Arc::new(Namespace {
                nodes: RwLock::new(nodes),
                requests: AtomicU64::new(0),
                connections: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Open a client directly, without going through a connector.
    pub fn client(&self, user: impl Into<String>) -> Arc<MemoryClient> {
        Arc::new(MemoryClient {
            ns: Arc::clone(&self.ns),
            user: user.into(),
            closed: AtomicBool::new(false),
        })
    }

    /// Total namespace requests served, across all clients.
    pub fn requests(&self) -> u64 {
        self.ns.requests.load(Ordering::Relaxed)
    }

    /// Options of every connection made through the connector.
    pub fn connections(&self) -> Vec<ClientOptions> {
        self.ns.connections.lock().clone()
    }
}

#[async_trait]
impl HdfsConnector for MemoryCluster {
    async fn connect(&self, options: &ClientOptions) -> FsResult<Arc<dyn HdfsClient>> {
        self.ns.connections.lock().push(options.clone());
        Ok(self.client(options.user.clone()))
    }
}

/// A client connection to a [`MemoryCluster`].
#[derive(Debug)]
pub struct MemoryClient {
    ns: Arc<Namespace>,
    user: String,
    closed: AtomicBool,
}

impl MemoryClient {
    /// Count a request and make sure the connection is still open.
    fn begin(&self) -> FsResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(FsError::ClientClosed);
        }
        self.ns.requests.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn check_parent_dir(nodes: &BTreeMap<String, Node>, path: &str) -> FsResult<()> {
        let Some(dir) = parent(path) else {
            return Err(FsError::already_exists(path));
        };
        match nodes.get(dir) {
            Some(node) if node.kind.is_dir() => Ok(()),
            Some(_) => Err(FsError::not_a_directory(dir)),
            None => Err(FsError::not_found(dir)),
        }
    }

    fn open_writer(&self, path: &str) -> MemoryWriter {
        MemoryWriter {
            ns: Arc::clone(&self.ns),
            path: path.to_string(),
            buffer: Vec::new(),
            released: false,
        }
    }
}

/// `true` if `path` is `dir` itself or lies beneath it.
fn within(path: &str, dir: &str) -> bool {
    path == dir
        || dir == "/"
        || path
            .strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[async_trait]
impl HdfsClient for MemoryClient {
    async fn open(&self, path: &str) -> FsResult<Box<dyn RemoteReader>> {
        self.begin()?;
        let mut nodes = self.ns.nodes.write();
        let node = nodes.get_mut(path).ok_or_else(|| FsError::not_found(path))?;
        if node.kind.is_dir() {
            return Err(FsError::is_a_directory(path));
        }
        node.atime = SystemTime::now();

        Ok(Box::new(MemoryReader {
            path: path.to_string(),
            info: node.info(path),
            data: node.data.clone(),
            pos: 0,
        }))
    }

    async fn create(&self, path: &str) -> FsResult<Box<dyn RemoteWriter>> {
        self.begin()?;
        let mut nodes = self.ns.nodes.write();
        if nodes.contains_key(path) {
            return Err(FsError::already_exists(path));
        }
        Self::check_parent_dir(&nodes, path)?;

        let mut node = Node::new(FileType::File, DEFAULT_FILE_MODE, &self.user);
        node.leased = true;
        nodes.insert(path.to_string(), node);
        Ok(Box::new(self.open_writer(path)))
    }

    async fn append(&self, path: &str) -> FsResult<Box<dyn RemoteWriter>> {
        self.begin()?;
        let mut nodes = self.ns.nodes.write();
        let node = nodes.get_mut(path).ok_or_else(|| FsError::not_found(path))?;
        if node.kind.is_dir() {
            return Err(FsError::is_a_directory(path));
        }
        if node.leased {
            return Err(FsError::other(format!(
                "{path} is already being written by another client"
            )));
        }

        node.leased = true;
        Ok(Box::new(self.open_writer(path)))
    }

    async fn stat(&self, path: &str) -> FsResult<FileInfo> {
        self.begin()?;
        let nodes = self.ns.nodes.read();
        nodes
            .get(path)
            .map(|node| node.info(path))
            .ok_or_else(|| FsError::not_found(path))
    }

    async fn remove(&self, path: &str) -> FsResult<()> {
        self.begin()?;
        if path == "/" {
            return Err(FsError::PermissionDenied("cannot remove root".into()));
        }
        let mut nodes = self.ns.nodes.write();
        if !nodes.contains_key(path) {
            return Err(FsError::not_found(path));
        }
        nodes.retain(|p, _| !within(p, path));
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        self.begin()?;
        let mut nodes = self.ns.nodes.write();
        if !nodes.contains_key(from) {
            return Err(FsError::not_found(from));
        }
        if from == to {
            return Ok(());
        }
        if within(to, from) {
            return Err(FsError::other(format!("cannot move {from} beneath itself")));
        }
        if let Some(existing) = nodes.get(to) {
            if existing.kind.is_dir() {
                return Err(FsError::already_exists(to));
            }
        }
        Self::check_parent_dir(&nodes, to)?;

        let moved: Vec<String> = nodes.keys().filter(|p| within(p, from)).cloned().collect();
        for old in moved {
            if let Some(node) = nodes.remove(&old) {
                let new = format!("{to}{}", &old[from.len()..]);
                nodes.insert(new, node);
            }
        }
        Ok(())
    }

    async fn read_dir(&self, path: &str) -> FsResult<Vec<FileInfo>> {
        self.begin()?;
        let nodes = self.ns.nodes.read();
        match nodes.get(path) {
            Some(node) if node.kind.is_dir() => {}
            Some(_) => return Err(FsError::not_a_directory(path)),
            None => return Err(FsError::not_found(path)),
        }

        Ok(nodes
            .iter()
            .filter(|(p, _)| p.as_str() != path && parent(p) == Some(path))
            .map(|(p, node)| node.info(p))
            .collect())
    }

    async fn mkdir_all(&self, path: &str, perm: u32) -> FsResult<()> {
        self.begin()?;
        let mut nodes = self.ns.nodes.write();

        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            match nodes.get(&current) {
                Some(node) if node.kind.is_dir() => {}
                Some(_) => return Err(FsError::not_a_directory(current)),
                None => {
                    nodes.insert(
                        current.clone(),
                        Node::new(FileType::Directory, perm, &self.user),
                    );
                }
            }
        }
        Ok(())
    }

    async fn chmod(&self, path: &str, mode: u32) -> FsResult<()> {
        self.begin()?;
        let mut nodes = self.ns.nodes.write();
        let node = nodes.get_mut(path).ok_or_else(|| FsError::not_found(path))?;
        node.perm = mode & 0o7777;
        Ok(())
    }

    async fn chtimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> FsResult<()> {
        self.begin()?;
        let mut nodes = self.ns.nodes.write();
        let node = nodes.get_mut(path).ok_or_else(|| FsError::not_found(path))?;
        node.atime = atime;
        node.mtime = mtime;
        Ok(())
    }

    async fn close(&self) -> FsResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Read stream over a snapshot of the file taken at open.
#[derive(Debug)]
struct MemoryReader {
    path: String,
    info: FileInfo,
    data: Vec<u8>,
    pos: u64,
}

impl MemoryReader {
    fn copy_from(&self, buf: &mut [u8], offset: u64) -> usize {
        let start = (offset as usize).min(self.data.len());
        let end = (start + buf.len()).min(self.data.len());
        buf[..end - start].copy_from_slice(&self.data[start..end]);
        end - start
    }
}

#[async_trait]
impl RemoteReader for MemoryReader {
    fn name(&self) -> &str {
        &self.path
    }

    async fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        let n = self.copy_from(buf, self.pos);
        self.pos += n as u64;
        Ok(n)
    }

    async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> FsResult<usize> {
        Ok(self.copy_from(buf, offset))
    }

    async fn seek(&mut self, pos: SeekFrom) -> FsResult<u64> {
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
            SeekFrom::End(delta) => (self.data.len() as u64).checked_add_signed(delta),
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

/// Write stream holding the file's lease.
#[derive(Debug)]
struct MemoryWriter {
    ns: Arc<Namespace>,
    path: String,
    buffer: Vec<u8>,
    released: bool,
}

impl MemoryWriter {
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(node) = self.ns.nodes.write().get_mut(&self.path) {
            node.leased = false;
        }
    }
}

#[async_trait]
impl RemoteWriter for MemoryWriter {
    async fn write(&mut self, buf: &[u8]) -> FsResult<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> FsResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let mut nodes = self.ns.nodes.write();
        let node = nodes
            .get_mut(&self.path)
            .ok_or_else(|| FsError::not_found(self.path.as_str()))?;
        node.data.append(&mut self.buffer);
        node.mtime = SystemTime::now();
        Ok(())
    }

    async fn close(&mut self) -> FsResult<()> {
        let flushed = self.flush().await;
        self.release();
        flushed
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> (MemoryCluster, Arc<MemoryClient>) {
        let cluster = MemoryCluster::new();
        let client = cluster.client("tester");
        (cluster, client)
    }

    #[tokio::test]
    async fn test_data_visible_after_flush() {
        let (_cluster, client) = client();
        client.mkdir_all("/d", 0o755).await.unwrap();

        let mut w = client.create("/d/f").await.unwrap();
        w.write(b"hello").await.unwrap();
        assert_eq!(client.stat("/d/f").await.unwrap().size, 0);

        w.flush().await.unwrap();
        assert_eq!(client.stat("/d/f").await.unwrap().size, 5);
        w.close().await.unwrap();

        let info = client.stat("/d/f").await.unwrap();
        assert_eq!(info.owner.as_deref(), Some("tester"));
        assert_eq!(info.perm, DEFAULT_FILE_MODE);
    }

    #[tokio::test]
    async fn test_create_requires_parent_and_absence() {
        let (_cluster, client) = client();

        let err = client.create("/missing/f").await.unwrap_err();
        assert!(err.is_not_found());

        client.create("/f").await.unwrap().close().await.unwrap();
        let err = client.create("/f").await.unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_single_writer_lease() {
        let (_cluster, client) = client();
        let mut w = client.create("/f").await.unwrap();

        assert!(client.append("/f").await.is_err());
        w.close().await.unwrap();

        let mut w = client.append("/f").await.unwrap();
        w.close().await.unwrap();

        // dropping without close still gives the lease back
        drop(client.append("/f").await.unwrap());
        client.append("/f").await.unwrap();
    }

    #[tokio::test]
    async fn test_reader_seek_and_read_at() {
        let (_cluster, client) = client();
        let mut w = client.create("/f").await.unwrap();
        w.write(b"hello world").await.unwrap();
        w.close().await.unwrap();

        let mut r = client.open("/f").await.unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(r.read_at(&mut buf, 6).await.unwrap(), 5);
        assert_eq!(&buf, b"world");
        assert_eq!(r.seek(SeekFrom::End(-5)).await.unwrap(), 6);
        assert!(r.seek(SeekFrom::Current(-100)).await.is_err());
        assert_eq!(r.read(&mut buf).await.unwrap(), 5);
        assert_eq!(r.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_is_recursive() {
        let (_cluster, client) = client();
        client.mkdir_all("/a/b/c", 0o755).await.unwrap();
        client.mkdir_all("/ab", 0o755).await.unwrap();

        client.remove("/a").await.unwrap();
        assert!(client.stat("/a/b/c").await.unwrap_err().is_not_found());
        assert!(client.stat("/ab").await.is_ok());
        assert!(client.remove("/a").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_rename_moves_subtree() {
        let (_cluster, client) = client();
        client.mkdir_all("/src/inner", 0o755).await.unwrap();
        client.create("/src/inner/f").await.unwrap().close().await.unwrap();

        client.rename("/src", "/dst").await.unwrap();
        assert!(client.stat("/dst/inner/f").await.is_ok());
        assert!(client.stat("/src").await.unwrap_err().is_not_found());

        let names: Vec<_> = client
            .read_dir("/")
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["dst"]);
    }

    #[tokio::test]
    async fn test_closed_client_rejects_requests() {
        let (cluster, client) = client();
        client.stat("/").await.unwrap();
        let served = cluster.requests();

        client.close().await.unwrap();
        assert!(matches!(client.stat("/").await, Err(FsError::ClientClosed)));
        assert_eq!(cluster.requests(), served);
    }
}
