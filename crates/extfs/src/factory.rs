//! Building filesystems from connection URLs.
//!
//! A URL names the backend by scheme and the base directory by path:
//!
//! - `file:///srv/data` → local filesystem rooted at `/srv/data`
//! - `hdfs://namenode:8020/warehouse` → HDFS rooted at `/warehouse`, with
//!   `namenode:8020` added to the configured addresses
//!
//! An empty URL means [`DEFAULT_URL`].

use percent_encoding::percent_decode_str;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::backends::hdfs::HdfsConnector;
use crate::backends::{HdfsFs, LocalFs};
use crate::config::Config;
use crate::error::{FsError, FsResult};
use crate::filesystem::Filesystem;
use crate::identity::{HostIdentity, SystemIdentity};
use crate::sandbox::is_absolute;

/// URL used when the caller gives none.
pub const DEFAULT_URL: &str = "file:///";

/// The parts of a connection URL the factory dispatches on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Target {
    scheme: String,
    authority: Option<String>,
    path: String,
}

impl Target {
    fn parse(raw: &str) -> FsResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::default());
        }
        // `file:` and `file://` would otherwise normalize to path `/`
        if let Some(scheme) = bare_scheme(raw) {
            return Ok(Self {
                scheme: scheme.to_ascii_lowercase(),
                ..Self::default()
            });
        }

        let url = match Url::parse(raw) {
            Ok(url) => url,
            // no scheme: a bare path
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                return Ok(Self {
                    path: decode_path(raw)?,
                    ..Self::default()
                });
            }
            Err(e) => return Err(e.into()),
        };

        let authority = url
            .host_str()
            .filter(|host| !host.is_empty())
            .map(|host| match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            });

        Ok(Self {
            scheme: url.scheme().to_ascii_lowercase(),
            authority,
            path: decode_path(url.path())?,
        })
    }

    fn is_empty(&self) -> bool {
        self.scheme.is_empty() && self.authority.is_none() && self.path.is_empty()
    }

    /// Only a scheme, with neither authority nor path.
    fn is_bare_scheme(&self, scheme: &str) -> bool {
        self.scheme == scheme && self.authority.is_none() && self.path.is_empty()
    }

    /// Base directory named by the path. Empty means the root.
    fn base(&self) -> FsResult<String> {
        if self.path.is_empty() {
            return Ok("/".to_string());
        }
        if !is_absolute(&self.path) {
            return Err(FsError::NeedAbsolutePath(self.path.clone()));
        }
        Ok(self.path.clone())
    }
}

/// The scheme of input like `file:` or `hdfs://` that names nothing else.
fn bare_scheme(raw: &str) -> Option<&str> {
    let head = raw.strip_suffix("//").unwrap_or(raw);
    let scheme = head.strip_suffix(':')?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

fn decode_path(path: &str) -> FsResult<String> {
    percent_decode_str(path)
        .decode_utf8()
        .map(|p| p.into_owned())
        .map_err(|e| FsError::Config(format!("URL path is not valid UTF-8: {e}")))
}

/// Builds [`Filesystem`]s from connection URLs.
///
/// HDFS support needs a connector. With the `hdfs-native` feature one is
/// registered by default; without it, `hdfs://` URLs fail with
/// [`FsError::NoClient`] until [`with_connector`](Self::with_connector).
pub struct FilesystemFactory {
    default_url: String,
    connector: Option<Arc<dyn HdfsConnector>>,
    identity: Arc<dyn HostIdentity>,
}

impl fmt::Debug for FilesystemFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilesystemFactory")
            .field("default_url", &self.default_url)
            .field("has_connector", &self.connector.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for FilesystemFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl FilesystemFactory {
    pub fn new() -> Self {
        Self {
            default_url: DEFAULT_URL.to_string(),
            connector: default_connector(),
            identity: Arc::new(SystemIdentity),
        }
    }

    /// Replace the URL substituted for empty input.
    pub fn with_default_url(mut self, url: impl Into<String>) -> Self {
        self.default_url = url.into();
        self
    }

    /// Register the connector used for `hdfs://` URLs.
    pub fn with_connector(mut self, connector: impl HdfsConnector + 'static) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Replace the host identity lookup.
    pub fn with_identity(mut self, identity: impl HostIdentity + 'static) -> Self {
        self.identity = Arc::new(identity);
        self
    }

    pub fn default_url(&self) -> &str {
        &self.default_url
    }

    /// Build a filesystem for `url`.
    pub async fn build(&self, url: &str, config: Config) -> FsResult<Filesystem> {
        let mut target = Target::parse(url)?;
        let default = Target::parse(&self.default_url)?;
        if target.is_empty() || target.is_bare_scheme(&default.scheme) {
            target = default;
        }

        debug!(
            scheme = %target.scheme,
            authority = ?target.authority,
            path = %target.path,
            "building filesystem"
        );

        match target.scheme.as_str() {
            "file" => Ok(LocalFs::new(target.base()?)?.into()),
            "hdfs" => {
                let base = target.base()?;
                let connector = self.connector.as_deref().ok_or(FsError::NoClient("hdfs"))?;

                let mut config = config;
                if let Some(authority) = target.authority {
                    config.addresses.push(authority);
                }
                let fs = HdfsFs::connect(base, config, connector, self.identity.as_ref()).await?;
                Ok(fs.into())
            }
            other => Err(FsError::UnsupportedScheme(other.to_string())),
        }
    }
}

#[cfg(feature = "hdfs-native")]
fn default_connector() -> Option<Arc<dyn HdfsConnector>> {
    Some(Arc::new(crate::backends::hdfs::NativeConnector))
}

#[cfg(not(feature = "hdfs-native"))]
fn default_connector() -> Option<Arc<dyn HdfsConnector>> {
    None
}

/// Build a filesystem for `url` with a default factory.
pub async fn new_filesystem(url: &str, config: Config) -> FsResult<Filesystem> {
    FilesystemFactory::new().build(url, config).await
}
