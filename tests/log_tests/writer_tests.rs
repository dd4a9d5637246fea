//! Tests for AppendLog
//!
//! These tests verify:
//! - Offsets returned by append
//! - Position tracking across reopen
//! - Truncation of a torn tail
//! - File locking between handles

use std::path::PathBuf;

use driftkv::log::AppendLog;
use driftkv::record::encode_record;
use driftkv::DriftError;
use tempfile::TempDir;

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.dat");
    (temp_dir, path)
}

#[test]
fn test_open_creates_file() {
    let (_temp, path) = setup_temp_log();

    let log = AppendLog::open(&path).unwrap();
    assert!(path.exists());
    assert_eq!(log.position(), 0);
    assert_eq!(log.path(), path.as_path());
}

#[test]
fn test_append_returns_offsets() {
    let (_temp, path) = setup_temp_log();
    let mut log = AppendLog::open(&path).unwrap();

    let first = encode_record("a", b"1", false, 1).unwrap();
    let second = encode_record("bb", b"22", false, 2).unwrap();

    assert_eq!(log.append(&first).unwrap(), 0);
    assert_eq!(log.append(&second).unwrap(), first.len() as u64);
    assert_eq!(log.position(), (first.len() + second.len()) as u64);

    log.force().unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), log.position());
}

#[test]
fn test_reopen_continues_at_end() {
    let (_temp, path) = setup_temp_log();
    let record = encode_record("k", b"v", false, 1).unwrap();

    {
        let mut log = AppendLog::open(&path).unwrap();
        log.append(&record).unwrap();
        log.force().unwrap();
    }

    let mut log = AppendLog::open(&path).unwrap();
    assert_eq!(log.position(), record.len() as u64);
    assert_eq!(log.append(&record).unwrap(), record.len() as u64);
}

#[test]
fn test_truncate() {
    let (_temp, path) = setup_temp_log();
    let mut log = AppendLog::open(&path).unwrap();

    let record = encode_record("k", b"value", false, 1).unwrap();
    log.append(&record).unwrap();
    log.append(&record[..5]).unwrap();

    log.truncate(record.len() as u64).unwrap();
    assert_eq!(log.position(), record.len() as u64);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), record.len() as u64);

    // Appends land right after the cut
    assert_eq!(log.append(&record).unwrap(), record.len() as u64);
}

#[test]
fn test_open_read_only_missing_file() {
    let (_temp, path) = setup_temp_log();
    assert!(AppendLog::open_read_only(&path).is_err());
    assert!(!path.exists());
}

#[test]
fn test_open_read_only_existing() {
    let (_temp, path) = setup_temp_log();
    std::fs::write(&path, b"0123456789").unwrap();

    let log = AppendLog::open_read_only(&path).unwrap();
    assert_eq!(log.position(), 10);
}

#[test]
fn test_second_writer_is_locked_out() {
    let (_temp, path) = setup_temp_log();

    let mut first = AppendLog::open(&path).unwrap();
    assert!(matches!(AppendLog::open(&path), Err(DriftError::Locked(_))));
    assert!(matches!(
        AppendLog::open_read_only(&path),
        Err(DriftError::Locked(_))
    ));

    let record = encode_record("k", b"v", false, 1).unwrap();
    assert_eq!(first.append(&record).unwrap(), 0);

    drop(first);
    let log = AppendLog::open(&path).unwrap();
    assert_eq!(log.position(), record.len() as u64);
}

#[test]
fn test_readers_share_the_lock() {
    let (_temp, path) = setup_temp_log();
    std::fs::write(&path, b"0123456789").unwrap();

    let first = AppendLog::open_read_only(&path).unwrap();
    let second = AppendLog::open_read_only(&path).unwrap();
    assert_eq!(first.position(), second.position());
    assert!(matches!(AppendLog::open(&path), Err(DriftError::Locked(_))));
}

#[test]
fn test_rename_keeps_handle() {
    let (temp, path) = setup_temp_log();
    let moved = temp.path().join("moved.dat");

    let mut log = AppendLog::open(&path).unwrap();
    let record = encode_record("k", b"v", false, 1).unwrap();
    log.append(&record).unwrap();

    log.rename_to(&moved).unwrap();
    assert_eq!(log.path(), moved.as_path());
    assert!(!path.exists());

    assert_eq!(log.append(&record).unwrap(), record.len() as u64);
    log.force().unwrap();
    assert_eq!(std::fs::metadata(&moved).unwrap().len(), 2 * record.len() as u64);
}
