//! HDFS backend through the public API, against an in-memory cluster.

mod common;

use extfs::{FileHandle, FsError, FsErrorKind, FsOps, OpenFlags, OpenRequest};

#[tokio::test]
async fn invalid_flags_fail_before_any_remote_call() {
    let (fs, cluster) = common::hdfs_fs("/data").await;
    let before = cluster.requests();

    let flags = OpenFlags::write_only().create().truncate();
    let err = fs.open_file("f", flags, 0o644).await.unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::InvalidFlags);

    let err = fs
        .open_file("f", OpenFlags::read_only().truncate(), 0)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::InvalidFlags);

    let err = fs.open_file("f", OpenFlags::read_write(), 0).await.unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::InvalidFlags);

    assert_eq!(cluster.requests(), before);
}

#[tokio::test]
async fn write_append_on_existing_file() {
    let (fs, _cluster) = common::hdfs_fs("/data").await;
    fs.write_file("events.log", b"1\n").await.unwrap();

    let mut f = fs
        .open_file("events.log", OpenFlags::write_only().append(), 0o644)
        .await
        .unwrap();
    f.write_all(b"2\n").await.unwrap();
    assert_eq!(
        f.write_at(b"x", 0).await.unwrap_err().kind(),
        FsErrorKind::ModeViolation
    );
    f.close().await.unwrap();

    assert_eq!(fs.read_file("events.log").await.unwrap(), b"1\n2\n");
}

#[tokio::test]
async fn exclusive_create_on_existing_file() {
    let (fs, _cluster) = common::hdfs_fs("/data").await;
    fs.write_file("f", b"x").await.unwrap();

    let err = fs
        .open_file("f", OpenRequest::ExclusiveCreate.into(), 0o644)
        .await
        .unwrap_err();
    assert!(matches!(err, FsError::AlreadyExists(_)));
}

#[tokio::test]
async fn round_trip_and_listing() {
    let (fs, _cluster) = common::hdfs_fs("/cloudchain/test2").await;

    let mut f = fs.create("demo1/test.txt").await.unwrap();
    f.write_all(b"Hello world").await.unwrap();
    f.close().await.unwrap();
    fs.mkdir_all("include", 0o755).await.unwrap();

    assert_eq!(fs.read_file("demo1/test.txt").await.unwrap(), b"Hello world");
    assert_eq!(fs.abs("/include").unwrap(), "/cloudchain/test2/include");

    let names: Vec<_> = fs
        .read_dir("")
        .await
        .unwrap()
        .into_iter()
        .map(|info| info.name)
        .collect();
    assert_eq!(names, vec!["demo1", "include"]);

    let info = fs.stat("demo1/test.txt").await.unwrap();
    assert_eq!(info.size, 11);
    assert_eq!(info.owner.as_deref(), Some("tester"));
}

#[tokio::test]
async fn remove_all_missing_path() {
    let (fs, _cluster) = common::hdfs_fs("/data").await;
    fs.remove_all("never/existed").await.unwrap();
    fs.remove_all("never/existed").await.unwrap();
}

#[tokio::test]
async fn close_ends_the_session() {
    let (fs, _cluster) = common::hdfs_fs("/data").await;
    fs.close().await.unwrap();
    assert!(matches!(fs.stat("").await, Err(FsError::ClientClosed)));
}
