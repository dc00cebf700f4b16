//! Shared helpers for integration tests.

use extfs::{Config, Filesystem, FilesystemFactory, MemoryCluster, StaticIdentity};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber. Honors RUST_LOG.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// A local filesystem rooted at a fresh temp directory.
#[allow(dead_code)]
pub async fn local_fs() -> (Filesystem, TempDir) {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let url = format!("file://{}", dir.path().display());
    let fs = FilesystemFactory::new()
        .build(&url, Config::new())
        .await
        .unwrap();
    (fs, dir)
}

/// An HDFS filesystem on a fresh in-memory cluster.
#[allow(dead_code)]
pub async fn hdfs_fs(base: &str) -> (Filesystem, MemoryCluster) {
    init_tracing();
    let cluster = MemoryCluster::new();
    let fs = FilesystemFactory::new()
        .with_connector(cluster.clone())
        .with_identity(StaticIdentity(Some("tester".into())))
        .build(&format!("hdfs://namenode:8020{base}"), Config::new())
        .await
        .unwrap();
    (fs, cluster)
}
