//! Core filesystem types.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Default permission bits for newly created files.
pub const DEFAULT_CREATE_MODE: u32 = 0o666;

/// Default permission bits for auto-created directories.
pub const DEFAULT_DIRECTORY_MODE: u32 = 0o755;

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        matches!(self, FileType::Symlink)
    }
}

/// Metadata for a file or directory, as returned by `stat` and `read_dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Final path element.
    pub name: String,
    /// File type.
    pub kind: FileType,
    /// Size in bytes.
    pub size: u64,
    /// Unix permission bits (e.g., 0o644).
    pub perm: u32,
    /// Last modification time.
    pub mtime: SystemTime,
    /// Last access time, when the backend tracks it.
    pub atime: Option<SystemTime>,
    /// Owning user, when the backend reports one.
    pub owner: Option<String>,
    /// Owning group, when the backend reports one.
    pub group: Option<String>,
}

impl FileInfo {
    /// Info for a regular file.
    pub fn file(name: impl Into<String>, size: u64, perm: u32) -> Self {
        let now = SystemTime::now();
        Self {
            name: name.into(),
            kind: FileType::File,
            size,
            perm,
            mtime: now,
            atime: Some(now),
            owner: None,
            group: None,
        }
    }

    /// Info for a directory.
    pub fn directory(name: impl Into<String>, perm: u32) -> Self {
        Self {
            kind: FileType::Directory,
            ..Self::file(name, 0, perm)
        }
    }

    /// Set the owner and group.
    pub fn with_owner(mut self, owner: impl Into<String>, group: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self.group = Some(group.into());
        self
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Direction of an open handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    #[default]
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn readable(&self) -> bool {
        matches!(self, AccessMode::ReadOnly | AccessMode::ReadWrite)
    }

    pub fn writable(&self) -> bool {
        matches!(self, AccessMode::WriteOnly | AccessMode::ReadWrite)
    }
}

/// Open file flags.
///
/// The POSIX `O_*` set with the access mode as an enum, so a handle
/// without a direction cannot be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFlags {
    /// Access direction.
    pub access: AccessMode,
    /// Append mode.
    pub append: bool,
    /// Create if not exists.
    pub create: bool,
    /// Truncate on open.
    pub truncate: bool,
    /// Exclusive create (fail if exists).
    pub exclusive: bool,
}

impl OpenFlags {
    /// Read-only access.
    pub fn read_only() -> Self {
        Self::default()
    }

    /// Write-only access.
    pub fn write_only() -> Self {
        Self {
            access: AccessMode::WriteOnly,
            ..Default::default()
        }
    }

    /// Read and write access.
    pub fn read_write() -> Self {
        Self {
            access: AccessMode::ReadWrite,
            ..Default::default()
        }
    }

    /// Also create the file if it does not exist.
    pub fn create(mut self) -> Self {
        self.create = true;
        self
    }

    /// Also open in append mode.
    pub fn append(mut self) -> Self {
        self.append = true;
        self
    }

    /// Also truncate on open.
    pub fn truncate(mut self) -> Self {
        self.truncate = true;
        self
    }

    /// Fail if the file already exists (only meaningful with `create`).
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }
}

/// What a caller intends to do with an opened file.
///
/// Converts into the [`OpenFlags`] each backend validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenRequest {
    /// Read an existing file.
    ReadOnly,
    /// Create the file, discarding any existing contents.
    CreateTruncate,
    /// Append to the file, creating it if absent.
    CreateOrAppend,
    /// Create the file; fail if it already exists.
    ExclusiveCreate,
    /// Append to an existing file.
    Append,
}

impl From<OpenRequest> for OpenFlags {
    fn from(request: OpenRequest) -> Self {
        match request {
            OpenRequest::ReadOnly => OpenFlags::read_only(),
            OpenRequest::CreateTruncate => OpenFlags::write_only().create().truncate(),
            OpenRequest::CreateOrAppend => OpenFlags::write_only().create().append(),
            OpenRequest::ExclusiveCreate => OpenFlags::write_only().create().exclusive(),
            OpenRequest::Append => OpenFlags::write_only().append(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type() {
        assert!(FileType::File.is_file());
        assert!(!FileType::File.is_dir());
        assert!(FileType::Directory.is_dir());
        assert!(FileType::Symlink.is_symlink());
    }

    #[test]
    fn test_file_info_constructors() {
        let file = FileInfo::file("a.txt", 1024, 0o644);
        assert!(file.is_file());
        assert_eq!(file.size, 1024);
        assert_eq!(file.perm, 0o644);

        let dir = FileInfo::directory("sub", 0o755).with_owner("hdfs", "supergroup");
        assert!(dir.is_dir());
        assert_eq!(dir.size, 0);
        assert_eq!(dir.owner.as_deref(), Some("hdfs"));
    }

    #[test]
    fn test_open_flags_builders() {
        let flags = OpenFlags::write_only().create().exclusive();
        assert_eq!(flags.access, AccessMode::WriteOnly);
        assert!(flags.create);
        assert!(flags.exclusive);
        assert!(!flags.truncate);

        assert!(OpenFlags::read_only().access.readable());
        assert!(!OpenFlags::read_only().access.writable());
        assert!(OpenFlags::read_write().access.readable());
        assert!(OpenFlags::read_write().access.writable());
    }

    #[test]
    fn test_open_request_mapping() {
        let flags: OpenFlags = OpenRequest::CreateOrAppend.into();
        assert!(flags.create && flags.append && !flags.truncate);

        let flags: OpenFlags = OpenRequest::CreateTruncate.into();
        assert!(flags.create && flags.truncate);

        assert_eq!(OpenFlags::from(OpenRequest::ReadOnly), OpenFlags::read_only());
    }
}
