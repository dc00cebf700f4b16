//! Storage backend implementations.

pub mod hdfs;
pub mod local;

pub use hdfs::{HdfsFs, MemoryCluster};
pub use local::LocalFs;
