//! Open file handles.

use async_trait::async_trait;
use std::io::SeekFrom;

use crate::backends::hdfs::{HdfsReader, HdfsWriter};
use crate::backends::local::LocalFile;
use crate::error::FsResult;
use crate::ops::FileHandle;
use crate::types::FileInfo;

/// An open file on any backend.
///
/// Distributed handles are bound to one direction; local handles may be
/// both readable and writable.
#[derive(Debug)]
pub enum File {
    Local(LocalFile),
    HdfsRead(HdfsReader),
    HdfsWrite(HdfsWriter),
}

impl File {
    /// Returns true for handles that accept reads.
    pub fn is_readable(&self) -> bool {
        match self {
            File::Local(f) => f.access().readable(),
            File::HdfsRead(_) => true,
            File::HdfsWrite(_) => false,
        }
    }

    /// Returns true for handles that accept writes.
    pub fn is_writable(&self) -> bool {
        match self {
            File::Local(f) => f.access().writable(),
            File::HdfsRead(_) => false,
            File::HdfsWrite(_) => true,
        }
    }
}

impl From<LocalFile> for File {
    fn from(f: LocalFile) -> Self {
        File::Local(f)
    }
}

impl From<HdfsReader> for File {
    fn from(f: HdfsReader) -> Self {
        File::HdfsRead(f)
    }
}

impl From<HdfsWriter> for File {
    fn from(f: HdfsWriter) -> Self {
        File::HdfsWrite(f)
    }
}

#[async_trait]
impl FileHandle for File {
    fn name(&self) -> &str {
        match self {
            File::Local(f) => f.name(),
            File::HdfsRead(f) => f.name(),
            File::HdfsWrite(f) => f.name(),
        }
    }

    async fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        match self {
            File::Local(f) => f.read(buf).await,
            File::HdfsRead(f) => f.read(buf).await,
            File::HdfsWrite(f) => f.read(buf).await,
        }
    }

    async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> FsResult<usize> {
        match self {
            File::Local(f) => f.read_at(buf, offset).await,
            File::HdfsRead(f) => f.read_at(buf, offset).await,
            File::HdfsWrite(f) => f.read_at(buf, offset).await,
        }
    }

    async fn write(&mut self, buf: &[u8]) -> FsResult<usize> {
        match self {
            File::Local(f) => f.write(buf).await,
            File::HdfsRead(f) => f.write(buf).await,
            File::HdfsWrite(f) => f.write(buf).await,
        }
    }

    async fn write_at(&mut self, buf: &[u8], offset: u64) -> FsResult<usize> {
        match self {
            File::Local(f) => f.write_at(buf, offset).await,
            File::HdfsRead(f) => f.write_at(buf, offset).await,
            File::HdfsWrite(f) => f.write_at(buf, offset).await,
        }
    }

    async fn seek(&mut self, pos: SeekFrom) -> FsResult<u64> {
        match self {
            File::Local(f) => f.seek(pos).await,
            File::HdfsRead(f) => f.seek(pos).await,
            File::HdfsWrite(f) => f.seek(pos).await,
        }
    }

    async fn sync(&mut self) -> FsResult<()> {
        match self {
            File::Local(f) => f.sync().await,
            File::HdfsRead(f) => f.sync().await,
            File::HdfsWrite(f) => f.sync().await,
        }
    }

    async fn truncate(&mut self, size: u64) -> FsResult<()> {
        match self {
            File::Local(f) => f.truncate(size).await,
            File::HdfsRead(f) => f.truncate(size).await,
            File::HdfsWrite(f) => f.truncate(size).await,
        }
    }

    async fn stat(&mut self) -> FsResult<FileInfo> {
        match self {
            File::Local(f) => f.stat().await,
            File::HdfsRead(f) => f.stat().await,
            File::HdfsWrite(f) => f.stat().await,
        }
    }

    async fn close(&mut self) -> FsResult<()> {
        match self {
            File::Local(f) => f.close().await,
            File::HdfsRead(f) => f.close().await,
            File::HdfsWrite(f) => f.close().await,
        }
    }
}
