//! Path sandboxing.
//!
//! Every filesystem is bound to an absolute base directory. Request paths
//! are resolved lexically against that base with forward-slash semantics;
//! a path that climbs above its starting point is rejected before any
//! storage access happens.
//!
//! Resolution never consults the storage layer, so symbolic links inside
//! the base that point elsewhere are not detected.

use crate::error::{FsError, FsResult};

/// Returns true if `path` is absolute (starts with `/`).
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

/// Resolve `path` beneath `base`.
///
/// An empty path resolves to `base` itself. A leading `/` is taken as the
/// sandbox root, so `/include` and `include` are equivalent.
pub fn resolve(base: &str, path: &str) -> FsResult<String> {
    if !is_absolute(base) {
        return Err(FsError::NeedAbsolutePath(base.to_string()));
    }
    let segments = clean(path).ok_or_else(|| FsError::path_escapes_root(path))?;

    // base is absolute, so `..` can never climb out of it here
    let mut full = clean(base).unwrap_or_default();
    full.extend(segments);

    Ok(join(&full))
}

/// Collapse `.` and `..` segments.
///
/// Returns `None` if a relative path escapes upward. Rooted paths clamp
/// at the root, matching how an absolute path cannot go above `/`.
fn clean(path: &str) -> Option<Vec<&str>> {
    let rooted = is_absolute(path);
    let mut out: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if out.pop().is_none() && !rooted {
                    return None;
                }
            }
            name => out.push(name),
        }
    }

    Some(out)
}

/// Final element of a slash-delimited path; `/` for the root.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or("/")
}

/// Parent of a resolved absolute path; `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    let idx = trimmed.rfind('/')?;
    Some(if idx == 0 { "/" } else { &trimmed[..idx] })
}

fn join(segments: &[&str]) -> String {
    let mut s = String::with_capacity(segments.iter().map(|p| p.len() + 1).sum::<usize>() + 1);
    for segment in segments {
        s.push('/');
        s.push_str(segment);
    }
    if s.is_empty() {
        s.push('/');
    }
    s
}

/// A base directory that request paths are confined to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    base: String,
}

impl Sandbox {
    /// Bind a sandbox to `base`, which must be absolute.
    pub fn new(base: impl Into<String>) -> FsResult<Self> {
        let base = resolve(&base.into(), "")?;
        Ok(Self { base })
    }

    /// The cleaned base directory.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Resolve a request path to its real location.
    pub fn resolve(&self, path: &str) -> FsResult<String> {
        resolve(&self.base, path)
    }
}
