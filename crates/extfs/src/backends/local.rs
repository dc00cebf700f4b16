//! Local filesystem backend.
//!
//! Provides access to a directory tree on the host, with every request
//! path confined to the configured base directory.

use async_trait::async_trait;
use filetime::FileTime;
use std::io::SeekFrom;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::debug;

use crate::error::{FsError, FsResult};
use crate::file::File;
use crate::ops::{FileHandle, FsOps};
use crate::sandbox::{Sandbox, base_name};
use crate::types::{
    AccessMode, DEFAULT_CREATE_MODE, DEFAULT_DIRECTORY_MODE, FileInfo, FileType, OpenFlags,
};

/// Local filesystem backend.
///
/// All operations are relative to the base. For example, if the base is
/// `/srv/data`, then `open("logs/a.txt")` opens `/srv/data/logs/a.txt`.
/// Parent directories are created on demand for create-mode opens and
/// rename destinations.
#[derive(Debug, Clone)]
pub struct LocalFs {
    sandbox: Sandbox,
}

impl LocalFs {
    /// Create a local filesystem rooted at `base`, which must be absolute.
    ///
    /// The base does not have to exist yet.
    pub fn new(base: impl Into<String>) -> FsResult<Self> {
        let sandbox = Sandbox::new(base)?;
        debug!(base = %sandbox.base(), "local filesystem");
        Ok(Self { sandbox })
    }

    fn underlying_path(&self, path: &str) -> FsResult<PathBuf> {
        self.sandbox.resolve(path).map(PathBuf::from)
    }

    async fn open_path(&self, full: PathBuf, flags: OpenFlags, perm: u32) -> FsResult<File> {
        let writable = flags.access.writable();
        if flags.truncate && !writable {
            return Err(FsError::invalid_flags("truncate requires write access"));
        }

        if flags.create {
            create_parent(&full).await?;
        }

        let mut opts = fs::OpenOptions::new();
        opts.read(flags.access.readable())
            .write(writable)
            .append(flags.append && writable)
            .truncate(flags.truncate)
            .mode(perm);
        match (flags.create, flags.exclusive) {
            (false, _) => {}
            // std refuses O_CREAT without write access, the kernel does not
            (true, exclusive) if !writable => {
                let excl = if exclusive { libc::O_EXCL } else { 0 };
                opts.custom_flags(libc::O_CREAT | excl);
            }
            (true, true) => {
                opts.create_new(true);
            }
            (true, false) => {
                opts.create(true);
            }
        }

        debug!(path = %full.display(), ?flags, "local open");
        let file = opts
            .open(&full)
            .await
            .map_err(|e| FsError::from_io(&full, e))?;

        Ok(LocalFile::new(full.display().to_string(), file, flags).into())
    }
}

/// Ensure the parent directory of `full` exists.
async fn create_parent(full: &Path) -> FsResult<()> {
    if let Some(parent) = full.parent() {
        fs::DirBuilder::new()
            .recursive(true)
            .mode(DEFAULT_DIRECTORY_MODE)
            .create(parent)
            .await
            .map_err(|e| FsError::from_io(parent, e))?;
    }
    Ok(())
}

/// Convert std::fs::Metadata to FileInfo.
fn file_info(name: &str, meta: &std::fs::Metadata) -> FileInfo {
    let kind = if meta.is_dir() {
        FileType::Directory
    } else if meta.file_type().is_symlink() {
        FileType::Symlink
    } else {
        FileType::File
    };

    FileInfo {
        name: name.to_string(),
        kind,
        size: meta.len(),
        perm: meta.permissions().mode() & 0o7777,
        mtime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        atime: meta.accessed().ok(),
        owner: Some(meta.uid().to_string()),
        group: Some(meta.gid().to_string()),
    }
}

#[async_trait]
impl FsOps for LocalFs {
    fn base(&self) -> &str {
        self.sandbox.base()
    }

    async fn create(&self, path: &str) -> FsResult<File> {
        let full = self.underlying_path(path)?;
        let flags = OpenFlags::read_write().create().truncate();
        self.open_path(full, flags, DEFAULT_CREATE_MODE).await
    }

    async fn open(&self, path: &str) -> FsResult<File> {
        let full = self.underlying_path(path)?;
        self.open_path(full, OpenFlags::read_only(), 0).await
    }

    async fn open_file(&self, path: &str, flags: OpenFlags, perm: u32) -> FsResult<File> {
        let full = self.underlying_path(path)?;
        self.open_path(full, flags, perm).await
    }

    async fn remove(&self, path: &str) -> FsResult<()> {
        let full = self.underlying_path(path)?;
        let meta = fs::symlink_metadata(&full)
            .await
            .map_err(|e| FsError::from_io(&full, e))?;

        debug!(path = %full.display(), "local remove");
        let result = if meta.is_dir() {
            fs::remove_dir(&full).await
        } else {
            fs::remove_file(&full).await
        };
        result.map_err(|e| FsError::from_io(&full, e))
    }

    async fn remove_all(&self, path: &str) -> FsResult<()> {
        let full = self.underlying_path(path)?;
        let meta = match fs::symlink_metadata(&full).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(FsError::from_io(&full, e)),
        };

        debug!(path = %full.display(), "local remove_all");
        let result = if meta.is_dir() {
            fs::remove_dir_all(&full).await
        } else {
            fs::remove_file(&full).await
        };
        match result {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(FsError::from_io(&full, e)),
            _ => Ok(()),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        let from_path = self.underlying_path(from)?;
        let to_path = self.underlying_path(to)?;

        // Missing source must fail before the destination tree is touched
        fs::symlink_metadata(&from_path)
            .await
            .map_err(|e| FsError::from_io(&from_path, e))?;

        create_parent(&to_path).await?;

        debug!(from = %from_path.display(), to = %to_path.display(), "local rename");
        fs::rename(&from_path, &to_path)
            .await
            .map_err(|e| FsError::from_io(&from_path, e))
    }

    async fn stat(&self, path: &str) -> FsResult<FileInfo> {
        let full = self.underlying_path(path)?;
        let meta = fs::metadata(&full)
            .await
            .map_err(|e| FsError::from_io(&full, e))?;
        Ok(file_info(base_name(&full.to_string_lossy()), &meta))
    }

    async fn read_dir(&self, path: &str) -> FsResult<Vec<FileInfo>> {
        let full = self.underlying_path(path)?;
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&full)
            .await
            .map_err(|e| FsError::from_io(&full, e))?;

        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| FsError::from_io(&full, e))?
        {
            let meta = entry
                .metadata()
                .await
                .map_err(|e| FsError::from_io(&entry.path(), e))?;
            entries.push(file_info(&entry.file_name().to_string_lossy(), &meta));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn mkdir_all(&self, path: &str, perm: u32) -> FsResult<()> {
        let full = self.underlying_path(path)?;
        fs::DirBuilder::new()
            .recursive(true)
            .mode(perm)
            .create(&full)
            .await
            .map_err(|e| FsError::from_io(&full, e))
    }

    async fn chmod(&self, path: &str, mode: u32) -> FsResult<()> {
        let full = self.underlying_path(path)?;
        fs::set_permissions(&full, std::fs::Permissions::from_mode(mode))
            .await
            .map_err(|e| FsError::from_io(&full, e))
    }

    async fn chtimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> FsResult<()> {
        let full = self.underlying_path(path)?;
        let atime = FileTime::from_system_time(atime);
        let mtime = FileTime::from_system_time(mtime);

        tokio::task::spawn_blocking(move || {
            filetime::set_file_times(&full, atime, mtime).map_err(|e| FsError::from_io(&full, e))
        })
        .await
        .map_err(|e| FsError::other(format!("chtimes task failed: {e}")))?
    }

    async fn close(&self) -> FsResult<()> {
        Ok(())
    }
}

/// An open file on the local backend.
#[derive(Debug)]
pub struct LocalFile {
    name: String,
    access: AccessMode,
    append: bool,
    inner: Option<fs::File>,
}

impl LocalFile {
    fn new(name: String, file: fs::File, flags: OpenFlags) -> Self {
        Self {
            name,
            access: flags.access,
            append: flags.append,
            inner: Some(file),
        }
    }

    /// Direction the file was opened with.
    pub fn access(&self) -> AccessMode {
        self.access
    }

    fn handle(&mut self) -> FsResult<(&mut fs::File, &str)> {
        match self.inner.as_mut() {
            Some(file) => Ok((file, self.name.as_str())),
            None => Err(FsError::Closed(self.name.clone())),
        }
    }

    fn check_readable(&self) -> FsResult<()> {
        if self.access.readable() {
            Ok(())
        } else {
            Err(FsError::WriteOnly(self.name.clone()))
        }
    }

    fn check_writable(&self) -> FsResult<()> {
        if self.access.writable() {
            Ok(())
        } else {
            Err(FsError::ReadOnly(self.name.clone()))
        }
    }
}

fn io_at(name: &str) -> impl Fn(std::io::Error) -> FsError + '_ {
    move |e| FsError::from_io(Path::new(name), e)
}

/// Read until `buf` is full or end of file.
async fn read_full(file: &mut fs::File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[async_trait]
impl FileHandle for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        self.check_readable()?;
        let (file, name) = self.handle()?;
        file.read(buf).await.map_err(io_at(name))
    }

    async fn read_at(&mut self, buf: &mut [u8], offset: u64) -> FsResult<usize> {
        self.check_readable()?;
        let (file, name) = self.handle()?;

        let pos = file.stream_position().await.map_err(io_at(name))?;
        file.seek(SeekFrom::Start(offset)).await.map_err(io_at(name))?;
        let result = read_full(file, buf).await.map_err(io_at(name));
        file.seek(SeekFrom::Start(pos)).await.map_err(io_at(name))?;
        result
    }

    async fn write(&mut self, buf: &[u8]) -> FsResult<usize> {
        self.check_writable()?;
        let (file, name) = self.handle()?;
        file.write(buf).await.map_err(io_at(name))
    }

    async fn write_at(&mut self, buf: &[u8], offset: u64) -> FsResult<usize> {
        self.check_writable()?;
        if self.append {
            return Err(FsError::Unsupported("write_at on a file opened for append"));
        }
        let (file, name) = self.handle()?;

        let pos = file.stream_position().await.map_err(io_at(name))?;
        file.seek(SeekFrom::Start(offset)).await.map_err(io_at(name))?;
        let result = file.write_all(buf).await.map(|()| buf.len()).map_err(io_at(name));
        file.seek(SeekFrom::Start(pos)).await.map_err(io_at(name))?;
        result
    }

    async fn seek(&mut self, pos: SeekFrom) -> FsResult<u64> {
        let (file, name) = self.handle()?;
        file.seek(pos).await.map_err(io_at(name))
    }

    async fn sync(&mut self) -> FsResult<()> {
        let (file, name) = self.handle()?;
        file.flush().await.map_err(io_at(name))?;
        file.sync_all().await.map_err(io_at(name))
    }

    async fn truncate(&mut self, size: u64) -> FsResult<()> {
        self.check_writable()?;
        let (file, name) = self.handle()?;
        file.set_len(size).await.map_err(io_at(name))
    }

    async fn stat(&mut self) -> FsResult<FileInfo> {
        let (file, name) = self.handle()?;
        // tokio hands writes to a blocking thread; wait for them to land
        file.flush().await.map_err(io_at(name))?;
        let meta = file.metadata().await.map_err(io_at(name))?;
        Ok(file_info(base_name(name), &meta))
    }

    async fn close(&mut self) -> FsResult<()> {
        let Some(mut file) = self.inner.take() else {
            return Ok(());
        };
        file.flush().await.map_err(io_at(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FsErrorKind;
    use crate::types::OpenRequest;
    use tempfile::TempDir;

    fn setup() -> (LocalFs, TempDir) {
        let dir = TempDir::new().unwrap();
        let fs = LocalFs::new(dir.path().to_str().unwrap()).unwrap();
        (fs, dir)
    }

    #[tokio::test]
    async fn test_create_names_full_path() {
        let (fs, dir) = setup();

        let mut f = fs.create("bar/qux").await.unwrap();
        assert_eq!(Path::new(f.name()), dir.path().join("bar").join("qux"));
        f.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let (fs, _dir) = setup();

        let mut f = fs.create("test.txt").await.unwrap();
        f.write_all(b"hello world").await.unwrap();
        f.close().await.unwrap();

        let mut f = fs.open("test.txt").await.unwrap();
        assert_eq!(f.read_to_end().await.unwrap(), b"hello world");
        f.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_create_truncates() {
        let (fs, _dir) = setup();

        fs.write_file("a.txt", b"long contents").await.unwrap();
        fs.write_file("a.txt", b"short").await.unwrap();
        assert_eq!(fs.read_file("a.txt").await.unwrap(), b"short");
    }

    #[tokio::test]
    async fn test_read_at_keeps_cursor() {
        let (fs, _dir) = setup();
        fs.write_file("test.txt", b"hello world").await.unwrap();

        let mut f = fs.open("test.txt").await.unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(f.read_at(&mut buf, 6).await.unwrap(), 5);
        assert_eq!(&buf, b"world");

        assert_eq!(f.read(&mut buf).await.unwrap(), 5);
        assert_eq!(&buf, b"hello");
    }

    #[tokio::test]
    async fn test_write_at_and_seek() {
        let (fs, _dir) = setup();

        let mut f = fs.create("test.txt").await.unwrap();
        f.write_all(b"hello world").await.unwrap();
        assert_eq!(f.write_at(b"HELLO", 0).await.unwrap(), 5);

        assert_eq!(f.seek(SeekFrom::Start(0)).await.unwrap(), 0);
        assert_eq!(f.read_to_end().await.unwrap(), b"HELLO world");
        f.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_truncate_handle() {
        let (fs, _dir) = setup();

        let mut f = fs.create("test.txt").await.unwrap();
        f.write_all(b"hello world").await.unwrap();
        f.truncate(5).await.unwrap();
        assert_eq!(f.stat().await.unwrap().size, 5);
        f.close().await.unwrap();

        assert_eq!(fs.read_file("test.txt").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_mode_errors() {
        let (fs, _dir) = setup();
        fs.write_file("test.txt", b"data").await.unwrap();

        let mut f = fs.open("test.txt").await.unwrap();
        assert!(matches!(f.write(b"x").await, Err(FsError::ReadOnly(_))));
        assert!(matches!(f.truncate(0).await, Err(FsError::ReadOnly(_))));

        let mut f = fs
            .open_file("test.txt", OpenRequest::Append.into(), 0o644)
            .await
            .unwrap();
        let mut buf = [0u8; 4];
        assert!(matches!(f.read(&mut buf).await, Err(FsError::WriteOnly(_))));
        assert!(matches!(f.write_at(b"x", 0).await, Err(FsError::Unsupported(_))));
        f.write_all(b"more").await.unwrap();
        f.close().await.unwrap();

        assert_eq!(fs.read_file("test.txt").await.unwrap(), b"datamore");
    }

    #[tokio::test]
    async fn test_open_file_flags() {
        let (fs, _dir) = setup();

        let flags = OpenFlags::write_only().create().exclusive();
        fs.open_file("new/x.txt", flags, 0o600).await.unwrap();
        assert_eq!(fs.stat("new/x.txt").await.unwrap().perm & 0o600, 0o600);

        let err = fs.open_file("new/x.txt", flags, 0o600).await.unwrap_err();
        assert_eq!(err.kind(), FsErrorKind::AlreadyExists);

        let err = fs
            .open_file("x.txt", OpenFlags::read_only().truncate(), 0)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FsErrorKind::InvalidFlags);

        let err = fs.open("missing.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_mkdir_and_read_dir_sorted() {
        let (fs, _dir) = setup();

        fs.mkdir_all("subdir/nested", 0o755).await.unwrap();
        fs.mkdir_all("subdir/nested", 0o755).await.unwrap();
        fs.write_file("zeta.txt", b"z").await.unwrap();
        fs.write_file("alpha.txt", b"a").await.unwrap();

        let entries = fs.read_dir("").await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.txt", "subdir", "zeta.txt"]);
        assert!(entries[1].is_dir());
        assert_eq!(entries[2].size, 1);
    }

    #[tokio::test]
    async fn test_mkdir_over_file_fails() {
        let (fs, _dir) = setup();
        fs.write_file("plain", b"").await.unwrap();
        assert!(fs.mkdir_all("plain", 0o755).await.is_err());
    }

    #[tokio::test]
    async fn test_rename_overwrites_and_creates_parents() {
        let (fs, _dir) = setup();
        fs.write_file("old.txt", b"content").await.unwrap();
        fs.write_file("deep/dir/new.txt", b"stale").await.unwrap();

        fs.rename("old.txt", "deep/dir/new.txt").await.unwrap();
        assert!(!fs.exists("old.txt").await.unwrap());
        assert_eq!(fs.read_file("deep/dir/new.txt").await.unwrap(), b"content");

        fs.rename("deep/dir/new.txt", "other/place.txt").await.unwrap();
        assert_eq!(fs.read_file("other/place.txt").await.unwrap(), b"content");
    }

    #[tokio::test]
    async fn test_rename_missing_source_has_no_side_effects() {
        let (fs, dir) = setup();

        let err = fs.rename("nope.txt", "a/b/c.txt").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!dir.path().join("a").exists());
    }

    #[tokio::test]
    async fn test_remove_and_remove_all() {
        let (fs, _dir) = setup();
        fs.write_file("tree/a/b.txt", b"b").await.unwrap();
        fs.write_file("single.txt", b"s").await.unwrap();

        fs.remove("single.txt").await.unwrap();
        assert!(fs.remove("single.txt").await.unwrap_err().is_not_found());
        assert!(fs.remove("tree").await.is_err());

        fs.remove_all("tree").await.unwrap();
        assert!(!fs.exists("tree").await.unwrap());
        fs.remove_all("tree").await.unwrap();
        fs.remove_all("never/existed").await.unwrap();
    }

    #[tokio::test]
    async fn test_path_escape_blocked() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("foo");
        let fs = LocalFs::new(base.to_str().unwrap()).unwrap();

        let err = fs.create("../foo").await.unwrap_err();
        assert_eq!(err.kind(), FsErrorKind::BoundaryViolation);
        let err = fs.open("../../../etc/passwd").await.unwrap_err();
        assert_eq!(err.kind(), FsErrorKind::BoundaryViolation);

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_chmod_and_chtimes() {
        let (fs, _dir) = setup();
        fs.write_file("f.txt", b"x").await.unwrap();

        fs.chmod("f.txt", 0o600).await.unwrap();
        assert_eq!(fs.stat("f.txt").await.unwrap().perm, 0o600);

        let when = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        fs.chtimes("f.txt", when, when).await.unwrap();
        let info = fs.stat("f.txt").await.unwrap();
        assert_eq!(info.mtime, when);
        assert_eq!(info.atime, Some(when));
    }

    #[tokio::test]
    async fn test_chtimes_on_write_only_file() {
        let (fs, _dir) = setup();
        fs.write_file("f.txt", b"x").await.unwrap();
        fs.chmod("f.txt", 0o200).await.unwrap();

        let when = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(2_000_000);
        fs.chtimes("f.txt", when, when).await.unwrap();
        assert_eq!(fs.stat("f.txt").await.unwrap().mtime, when);

        let err = fs.chtimes("missing.txt", when, when).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stat_sees_preceding_write() {
        let (fs, _dir) = setup();

        for round in 0..50 {
            let mut f = fs.create("test.txt").await.unwrap();
            f.write(b"hello world").await.unwrap();
            assert_eq!(f.stat().await.unwrap().size, 11, "round {round}");
            f.close().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_read_only_create() {
        let (fs, dir) = setup();

        let flags = OpenFlags::read_only().create();
        let mut f = fs.open_file("sub/ro.txt", flags, 0o640).await.unwrap();
        assert!(dir.path().join("sub/ro.txt").is_file());
        assert_eq!(f.read(&mut [0u8; 4]).await.unwrap(), 0);
        assert!(matches!(f.write(b"x").await, Err(FsError::ReadOnly(_))));
        f.close().await.unwrap();

        // existing file opens fine without exclusive
        fs.open_file("sub/ro.txt", flags, 0o640).await.unwrap();

        let err = fs
            .open_file("sub/ro.txt", flags.exclusive(), 0o640)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FsErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (fs, _dir) = setup();

        let mut f = fs.create("f.txt").await.unwrap();
        f.close().await.unwrap();
        f.close().await.unwrap();

        let err = f.write(b"late").await.unwrap_err();
        assert!(matches!(err, FsError::Closed(_)));
        fs.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_abs() {
        let fs = LocalFs::new("/cloudchain/test2").unwrap();
        assert_eq!(fs.abs("/include").unwrap(), "/cloudchain/test2/include");
        assert!(LocalFs::new("relative").is_err());
    }
}
