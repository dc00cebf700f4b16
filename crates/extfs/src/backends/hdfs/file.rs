//! HDFS file handles.
//!
//! A remote stream is bound to one direction, so each handle answers the
//! operations of the other direction with a mode error.

use async_trait::async_trait;
use std::io::SeekFrom;

use super::client::{RemoteReader, RemoteWriter};
use crate::error::{FsError, FsResult};
use crate::ops::FileHandle;
use crate::types::FileInfo;

/// A read-only HDFS handle.
#[derive(Debug)]
pub struct HdfsReader {
    name: String,
    inner: Option<Box<dyn RemoteReader>>,
}

impl HdfsReader {
    pub(crate) fn new(reader: Box<dyn RemoteReader>) -> Self {
        Self {
            name: reader.name().to_string(),
            inner: Some(reader),
        }
    }

    fn reader(&mut self) -> FsResult<&mut Box<dyn RemoteReader>> {
        match self.inner.as_mut() {
            Some(reader) => Ok(reader),
            None => Err(FsError::Closed(self.name.clone())),
        }
    }
}

#[async_trait]
impl FileHandle for HdfsReader {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        self.reader()?.read(buf).await
    }

    async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> FsResult<usize> {
        self.reader()?.read_at(buf, offset).await
    }

    async fn write(&mut self, _buf: &[u8]) -> FsResult<usize> {
        Err(FsError::ReadOnly(self.name.clone()))
    }

    async fn write_at(&mut self, _buf: &[u8], _offset: u64) -> FsResult<usize> {
        Err(FsError::Unsupported("write_at"))
    }

    async fn seek(&mut self, pos: SeekFrom) -> FsResult<u64> {
        self.reader()?.seek(pos).await
    }

    async fn sync(&mut self) -> FsResult<()> {
        Ok(())
    }

    async fn truncate(&mut self, _size: u64) -> FsResult<()> {
        Err(FsError::Unsupported("truncate"))
    }

    async fn stat(&mut self) -> FsResult<FileInfo> {
        Ok(self.reader()?.stat())
    }

    async fn close(&mut self) -> FsResult<()> {
        match self.inner.take() {
            Some(mut reader) => reader.close().await,
            None => Ok(()),
        }
    }
}

/// A write-only HDFS handle, opened by create or append.
///
/// Data is not visible to readers until [`sync`](FileHandle::sync) or
/// [`close`](FileHandle::close).
#[derive(Debug)]
pub struct HdfsWriter {
    name: String,
    inner: Option<Box<dyn RemoteWriter>>,
}

impl HdfsWriter {
    pub(crate) fn new(name: impl Into<String>, writer: Box<dyn RemoteWriter>) -> Self {
        Self {
            name: name.into(),
            inner: Some(writer),
        }
    }

    fn writer(&mut self) -> FsResult<&mut Box<dyn RemoteWriter>> {
        match self.inner.as_mut() {
            Some(writer) => Ok(writer),
            None => Err(FsError::Closed(self.name.clone())),
        }
    }
}

#[async_trait]
impl FileHandle for HdfsWriter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&mut self, _buf: &mut [u8]) -> FsResult<usize> {
        Err(FsError::WriteOnly(self.name.clone()))
    }

    async fn read_at(&mut self, _buf: &mut [u8], _offset: u64) -> FsResult<usize> {
        Err(FsError::WriteOnly(self.name.clone()))
    }

    async fn write(&mut self, buf: &[u8]) -> FsResult<usize> {
        self.writer()?.write(buf).await
    }

    async fn write_at(&mut self, _buf: &[u8], _offset: u64) -> FsResult<usize> {
        Err(FsError::Unsupported("write_at"))
    }

    async fn seek(&mut self, _pos: SeekFrom) -> FsResult<u64> {
        Err(FsError::Unsupported("seek on a write handle"))
    }

    async fn sync(&mut self) -> FsResult<()> {
        self.writer()?.flush().await
    }

    async fn truncate(&mut self, _size: u64) -> FsResult<()> {
        Err(FsError::Unsupported("truncate"))
    }

    async fn stat(&mut self) -> FsResult<FileInfo> {
        Err(FsError::Unsupported("stat on a write handle"))
    }

    async fn close(&mut self) -> FsResult<()> {
        match self.inner.take() {
            Some(mut writer) => writer.close().await,
            None => Ok(()),
        }
    }
}
