//! The closed set of backends.

use async_trait::async_trait;
use std::time::SystemTime;

use crate::backends::{HdfsFs, LocalFs};
use crate::error::FsResult;
use crate::file::File;
use crate::ops::FsOps;
use crate::types::{FileInfo, OpenFlags};

/// Which backend a [`Filesystem`] is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    Hdfs,
}

/// A filesystem bound to one backend and one base directory.
#[derive(Debug, Clone)]
pub enum Filesystem {
    Local(LocalFs),
    Hdfs(HdfsFs),
}

impl Filesystem {
    pub fn kind(&self) -> BackendKind {
        match self {
            Filesystem::Local(_) => BackendKind::Local,
            Filesystem::Hdfs(_) => BackendKind::Hdfs,
        }
    }

    pub fn as_local(&self) -> Option<&LocalFs> {
        match self {
            Filesystem::Local(fs) => Some(fs),
            Filesystem::Hdfs(_) => None,
        }
    }

    pub fn as_hdfs(&self) -> Option<&HdfsFs> {
        match self {
            Filesystem::Hdfs(fs) => Some(fs),
            Filesystem::Local(_) => None,
        }
    }

    fn ops(&self) -> &dyn FsOps {
        match self {
            Filesystem::Local(fs) => fs,
            Filesystem::Hdfs(fs) => fs,
        }
    }
}

impl From<LocalFs> for Filesystem {
    fn from(fs: LocalFs) -> Self {
        Filesystem::Local(fs)
    }
}

impl From<HdfsFs> for Filesystem {
    fn from(fs: HdfsFs) -> Self {
        Filesystem::Hdfs(fs)
    }
}

#[async_trait]
impl FsOps for Filesystem {
    fn base(&self) -> &str {
        self.ops().base()
    }

    async fn create(&self, path: &str) -> FsResult<File> {
        self.ops().create(path).await
    }

    async fn open(&self, path: &str) -> FsResult<File> {
        self.ops().open(path).await
    }

    async fn open_file(&self, path: &str, flags: OpenFlags, perm: u32) -> FsResult<File> {
        self.ops().open_file(path, flags, perm).await
    }

    async fn remove(&self, path: &str) -> FsResult<()> {
        self.ops().remove(path).await
    }

    async fn remove_all(&self, path: &str) -> FsResult<()> {
        self.ops().remove_all(path).await
    }

    async fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        self.ops().rename(from, to).await
    }

    async fn stat(&self, path: &str) -> FsResult<FileInfo> {
        self.ops().stat(path).await
    }

    async fn read_dir(&self, path: &str) -> FsResult<Vec<FileInfo>> {
        self.ops().read_dir(path).await
    }

    async fn mkdir_all(&self, path: &str, perm: u32) -> FsResult<()> {
        self.ops().mkdir_all(path, perm).await
    }

    async fn chmod(&self, path: &str, mode: u32) -> FsResult<()> {
        self.ops().chmod(path, mode).await
    }

    async fn chtimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> FsResult<()> {
        self.ops().chtimes(path, atime, mtime).await
    }

    async fn close(&self) -> FsResult<()> {
        self.ops().close().await
    }
}
