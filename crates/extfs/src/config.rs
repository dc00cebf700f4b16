//! Filesystem configuration.
//!
//! [`Config`] is what callers supply (in code or as a TOML file). It is
//! read once when a backend is built; [`ClientOptions`] is the resolved
//! form handed to a remote client connector.
//!
//! ```toml
//! user = "hadoop"
//! addresses = ["namenode-1:9000", "namenode-2:9000"]
//! use_datanode_hostname = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{FsError, FsResult};
use crate::identity::{HostIdentity, resolve_user};

/// Configurable options for a filesystem.
///
/// All fields are only used by remote backends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Which user the client acts as.
    pub user: Option<String>,

    /// Namenode addresses to connect to, in order.
    pub addresses: Vec<String>,

    /// Connect to datanodes by hostname (useful in multi-homed setups)
    /// rather than by IP address.
    pub use_datanode_hostname: bool,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the remote user.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Replace the namenode addresses.
    pub fn with_addresses<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.addresses = addresses.into_iter().map(Into::into).collect();
        self
    }

    /// Choose hostname rather than IP addressing for datanodes.
    pub fn with_use_datanode_hostname(mut self, use_hostname: bool) -> Self {
        self.use_datanode_hostname = use_hostname;
        self
    }

    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> FsResult<Self> {
        toml::from_str(s).map_err(|e| FsError::Config(e.to_string()))
    }

    /// Load a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> FsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| FsError::from_io(path, e))?;
        Self::from_toml_str(&text).map_err(|e| match e {
            FsError::Config(msg) => FsError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }
}

/// Resolved connection parameters for a remote client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Namenode addresses, in order.
    pub addresses: Vec<String>,
    /// The user every remote call is made as.
    pub user: String,
    /// Address datanodes by hostname.
    pub use_datanode_hostname: bool,
}

impl ClientOptions {
    /// Resolve options from a config, consulting `identity` only when no
    /// user is configured.
    pub fn resolve(config: Config, identity: &dyn HostIdentity) -> Self {
        let configured = config.user.as_deref().filter(|u| !u.is_empty());
        let host = match configured {
            Some(_) => None,
            None => identity.current_user(),
        };
        let user = resolve_user(configured, host);
        Self {
            addresses: config.addresses,
            user,
            use_datanode_hostname: config.use_datanode_hostname,
        }
    }
}
