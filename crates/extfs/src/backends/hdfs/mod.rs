//! HDFS backend.
//!
//! Remote files are read-only, create-only or append-only, and cannot be
//! truncated. [`HdfsFs::open_file`] maps the generic flag set onto those
//! three modes and rejects what cannot be expressed before any remote call.

mod client;
mod file;
mod memory;
#[cfg(feature = "hdfs-native")]
mod native;

pub use client::{HdfsClient, HdfsConnector, RemoteReader, RemoteWriter};
pub use file::{HdfsReader, HdfsWriter};
pub use memory::{MemoryClient, MemoryCluster};
#[cfg(feature = "hdfs-native")]
pub use native::NativeConnector;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::config::{ClientOptions, Config};
use crate::error::{FsError, FsResult};
use crate::file::File;
use crate::identity::HostIdentity;
use crate::ops::FsOps;
use crate::sandbox::{Sandbox, parent};
use crate::types::{AccessMode, DEFAULT_DIRECTORY_MODE, FileInfo, OpenFlags};

/// How a flag set maps onto the remote store's access modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdfsOpen {
    /// Open an existing file for reading.
    Read,
    /// Create the file if it is missing, otherwise append (or fail if
    /// `exclusive`).
    Create { exclusive: bool },
    /// Append to an existing file.
    Append,
}

/// Decide how to serve `flags`, rejecting combinations HDFS cannot express.
pub fn classify(flags: &OpenFlags) -> FsResult<HdfsOpen> {
    if flags.truncate {
        return Err(FsError::invalid_flags("HDFS does not support truncate"));
    }
    match flags.access {
        AccessMode::ReadWrite => Err(FsError::invalid_flags(
            "HDFS files can only be opened as read-only or write-only",
        )),
        AccessMode::WriteOnly if !flags.create && !flags.append => Err(FsError::invalid_flags(
            "HDFS files must be either created or opened for append",
        )),
        AccessMode::ReadOnly => Ok(HdfsOpen::Read),
        AccessMode::WriteOnly if flags.create => Ok(HdfsOpen::Create {
            exclusive: flags.exclusive,
        }),
        AccessMode::WriteOnly => Ok(HdfsOpen::Append),
    }
}

/// HDFS filesystem backend.
///
/// Paths resolve beneath the base directory exactly as for the local
/// backend. The client connection is shared by every handle this
/// filesystem opens and is released by [`close`](FsOps::close).
#[derive(Debug, Clone)]
pub struct HdfsFs {
    client: Arc<dyn HdfsClient>,
    sandbox: Sandbox,
    options: ClientOptions,
}

impl HdfsFs {
    /// Connect to a cluster and bind the filesystem to `base`.
    ///
    /// The remote user comes from `config`, then `identity`, then the
    /// default user.
    pub async fn connect(
        base: impl Into<String>,
        config: Config,
        connector: &dyn HdfsConnector,
        identity: &dyn HostIdentity,
    ) -> FsResult<Self> {
        let sandbox = Sandbox::new(base)?;
        let options = ClientOptions::resolve(config, identity);

        info!(
            base = %sandbox.base(),
            user = %options.user,
            addresses = ?options.addresses,
            use_datanode_hostname = options.use_datanode_hostname,
            "connecting to HDFS"
        );
        let client = connector.connect(&options).await?;

        Ok(Self {
            client,
            sandbox,
            options,
        })
    }

    /// The resolved connection parameters.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// The user remote calls are made as.
    pub fn user(&self) -> &str {
        &self.options.user
    }

    async fn create_file(&self, full: &str) -> FsResult<File> {
        if let Some(dir) = parent(full) {
            self.client.mkdir_all(dir, DEFAULT_DIRECTORY_MODE).await?;
        }
        debug!(path = %full, "hdfs create");
        let writer = self.client.create(full).await?;
        Ok(HdfsWriter::new(full, writer).into())
    }

    async fn open_read(&self, full: &str) -> FsResult<File> {
        debug!(path = %full, "hdfs open");
        let reader = self.client.open(full).await?;
        Ok(HdfsReader::new(reader).into())
    }

    async fn open_append(&self, full: &str) -> FsResult<File> {
        debug!(path = %full, "hdfs append");
        let writer = self.client.append(full).await?;
        Ok(HdfsWriter::new(full, writer).into())
    }
}

#[async_trait]
impl FsOps for HdfsFs {
    fn base(&self) -> &str {
        self.sandbox.base()
    }

    async fn create(&self, path: &str) -> FsResult<File> {
        let full = self.sandbox.resolve(path)?;
        self.create_file(&full).await
    }

    async fn open(&self, path: &str) -> FsResult<File> {
        let full = self.sandbox.resolve(path)?;
        self.open_read(&full).await
    }

    async fn open_file(&self, path: &str, flags: OpenFlags, _perm: u32) -> FsResult<File> {
        let full = self.sandbox.resolve(path)?;

        match classify(&flags)? {
            HdfsOpen::Read => self.open_read(&full).await,
            HdfsOpen::Create { exclusive } => match self.client.stat(&full).await {
                Ok(_) if exclusive => Err(FsError::already_exists(full)),
                Ok(_) => self.open_append(&full).await,
                Err(e) if e.is_not_found() => self.create_file(&full).await,
                Err(e) => Err(e),
            },
            HdfsOpen::Append => self.open_append(&full).await,
        }
    }

    async fn remove(&self, path: &str) -> FsResult<()> {
        let full = self.sandbox.resolve(path)?;
        debug!(path = %full, "hdfs remove");
        self.client.remove(&full).await
    }

    async fn remove_all(&self, path: &str) -> FsResult<()> {
        let full = self.sandbox.resolve(path)?;
        debug!(path = %full, "hdfs remove_all");
        match self.client.remove(&full).await {
            Err(e) if e.is_not_found() => Ok(()),
            result => result,
        }
    }

    async fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        let from = self.sandbox.resolve(from)?;
        let to = self.sandbox.resolve(to)?;

        self.client.stat(&from).await?;
        if let Some(dir) = parent(&to) {
            self.client.mkdir_all(dir, DEFAULT_DIRECTORY_MODE).await?;
        }

        debug!(%from, %to, "hdfs rename");
        self.client.rename(&from, &to).await
    }

    async fn stat(&self, path: &str) -> FsResult<FileInfo> {
        let full = self.sandbox.resolve(path)?;
        self.client.stat(&full).await
    }

    async fn read_dir(&self, path: &str) -> FsResult<Vec<FileInfo>> {
        let full = self.sandbox.resolve(path)?;
        let mut entries = self.client.read_dir(&full).await?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn mkdir_all(&self, path: &str, perm: u32) -> FsResult<()> {
        let full = self.sandbox.resolve(path)?;
        self.client.mkdir_all(&full, perm).await
    }

    async fn chmod(&self, path: &str, mode: u32) -> FsResult<()> {
        let full = self.sandbox.resolve(path)?;
        self.client.chmod(&full, mode).await
    }

    async fn chtimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> FsResult<()> {
        let full = self.sandbox.resolve(path)?;
        self.client.chtimes(&full, atime, mtime).await
    }

    async fn close(&self) -> FsResult<()> {
        info!(base = %self.sandbox.base(), "closing HDFS connection");
        self.client
            .close()
            .await
            .inspect_err(|e| warn!(error = %e, "failed to close HDFS connection"))
    }
}
