//! Uniform filesystem access over interchangeable storage backends.
//!
//! A connection URL picks the backend:
//!
//! ```no_run
//! use extfs::{Config, FileHandle, FsOps, new_filesystem};
//!
//! # async fn demo() -> extfs::FsResult<()> {
//! let fs = new_filesystem("file:///tmp/extfs", Config::new()).await?;
//!
//! let mut file = fs.create("demo1/test.txt").await?;
//! file.write_all(b"Hello world").await?;
//! file.close().await?;
//!
//! assert_eq!(fs.read_file("demo1/test.txt").await?, b"Hello world");
//! # Ok(())
//! # }
//! ```
//!
//! Every filesystem is bound to a base directory, and request paths cannot
//! climb out of it. Local files support any mix of reads, writes and seeks.
//! HDFS files are read-only, create-only or append-only; see
//! [`backends::hdfs`] for how open flags are mapped.

pub mod backends;
pub mod config;
pub mod error;
pub mod factory;
pub mod file;
pub mod filesystem;
pub mod identity;
pub mod ops;
pub mod sandbox;
pub mod types;

pub use backends::hdfs::{HdfsClient, HdfsConnector, HdfsFs, MemoryCluster};
#[cfg(feature = "hdfs-native")]
pub use backends::hdfs::NativeConnector;
pub use backends::local::LocalFs;
pub use config::{ClientOptions, Config};
pub use error::{FsError, FsErrorKind, FsResult};
pub use factory::{DEFAULT_URL, FilesystemFactory, new_filesystem};
pub use file::File;
pub use filesystem::{BackendKind, Filesystem};
pub use identity::{HostIdentity, StaticIdentity, SystemIdentity};
pub use ops::{FileHandle, FsOps};
pub use types::{AccessMode, FileInfo, FileType, OpenFlags, OpenRequest};
