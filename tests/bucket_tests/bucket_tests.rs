//! Tests for Bucket
//!
//! These tests verify:
//! - Direct and buffered writes
//! - Reads across segment boundaries
//! - Persistence across reopen
//! - Input validation happens before any I/O
//! - Torn tail repair and read-only mode
//! - Corrupt records are never cut away
//! - One writer per bucket

use std::path::Path;

use driftkv::bucket::validate_bucket_name;
use driftkv::log::AppendLog;
use driftkv::record::{encode_record, MAX_KEY_LEN};
use driftkv::{Bucket, BucketOptions, DriftError, WritePolicy};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn direct() -> BucketOptions {
    BucketOptions {
        write_policy: WritePolicy::Direct,
        ..BucketOptions::default()
    }
}

fn buffered(limit: usize) -> BucketOptions {
    BucketOptions {
        write_policy: WritePolicy::Buffered { limit },
        ..BucketOptions::default()
    }
}

fn setup_bucket(options: BucketOptions) -> (TempDir, Bucket) {
    let temp_dir = TempDir::new().unwrap();
    let bucket = Bucket::open(temp_dir.path(), "test", options).unwrap();
    (temp_dir, bucket)
}

fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).unwrap().len()
}

// =============================================================================
// Direct Write Tests
// =============================================================================

#[test]
fn test_put_get_direct() {
    let (_temp, bucket) = setup_bucket(direct());

    bucket.put("key1", b"value1").unwrap();
    assert_eq!(bucket.get("key1").unwrap(), Some(b"value1".to_vec()));
    assert!(bucket.contains("key1"));
    assert_eq!(bucket.len(), 1);

    // Durable on return
    assert!(file_len(bucket.data_path()) > 0);
}

#[test]
fn test_get_missing() {
    let (_temp, bucket) = setup_bucket(direct());

    assert_eq!(bucket.get("nope").unwrap(), None);
    assert!(!bucket.contains("nope"));
    assert_eq!(bucket.timestamp("nope"), None);
    assert!(bucket.is_empty());
}

#[test]
fn test_overwrite_keeps_latest() {
    let (_temp, bucket) = setup_bucket(direct());

    bucket.put("k", b"first").unwrap();
    let first_ts = bucket.timestamp("k").unwrap();
    bucket.put("k", b"second").unwrap();
    let second_ts = bucket.timestamp("k").unwrap();

    assert_eq!(bucket.get("k").unwrap(), Some(b"second".to_vec()));
    assert!(second_ts >= first_ts);
    assert_eq!(bucket.len(), 1);
}

#[test]
fn test_empty_value() {
    let (_temp, bucket) = setup_bucket(direct());

    bucket.put("empty", b"").unwrap();
    assert_eq!(bucket.get("empty").unwrap(), Some(Vec::new()));
    assert!(bucket.contains("empty"));
}

#[test]
fn test_delete_direct() {
    let (_temp, bucket) = setup_bucket(direct());

    bucket.put("k", b"v").unwrap();
    let len_before = file_len(bucket.data_path());

    assert!(bucket.delete("k").unwrap());
    assert_eq!(bucket.get("k").unwrap(), None);
    assert!(!bucket.contains("k"));
    assert!(file_len(bucket.data_path()) > len_before);
}

#[test]
fn test_delete_absent_writes_nothing() {
    let (_temp, bucket) = setup_bucket(direct());

    bucket.put("other", b"v").unwrap();
    let len_before = file_len(bucket.data_path());

    assert!(!bucket.delete("absent").unwrap());
    assert_eq!(file_len(bucket.data_path()), len_before);
}

#[test]
fn test_keys_sorted() {
    let (_temp, bucket) = setup_bucket(direct());

    for key in ["pear", "apple", "fig"] {
        bucket.put(key, b"x").unwrap();
    }
    bucket.delete("fig").unwrap();

    assert_eq!(bucket.keys(), vec!["apple".to_string(), "pear".to_string()]);
}

// =============================================================================
// Buffered Write Tests
// =============================================================================

#[test]
fn test_buffered_visible_before_flush() {
    let (_temp, bucket) = setup_bucket(buffered(4096));

    bucket.put("k", b"v").unwrap();

    assert_eq!(bucket.get("k").unwrap(), Some(b"v".to_vec()));
    assert!(bucket.contains("k"));
    assert_eq!(file_len(bucket.data_path()), 0);
    assert_eq!(bucket.stats().staged_writes, 1);
}

#[test]
fn test_buffered_flush() {
    let (_temp, bucket) = setup_bucket(buffered(4096));

    bucket.put("a", b"1").unwrap();
    bucket.put("b", b"2").unwrap();
    bucket.flush().unwrap();

    assert!(file_len(bucket.data_path()) > 0);
    assert!(bucket.index_path().exists());
    assert_eq!(bucket.stats().staged_writes, 0);
    assert_eq!(bucket.get("a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(bucket.get("b").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn test_buffered_auto_flush_past_limit() {
    let (_temp, bucket) = setup_bucket(buffered(100));

    bucket.put("a", &[0u8; 50]).unwrap();
    assert_eq!(file_len(bucket.data_path()), 0);

    bucket.put("b", &[0u8; 50]).unwrap();
    assert!(file_len(bucket.data_path()) > 0);
    assert_eq!(bucket.stats().staged_writes, 0);
}

#[test]
fn test_buffered_overwrite_stages_once() {
    let (_temp, bucket) = setup_bucket(buffered(4096));

    bucket.put("k", b"one").unwrap();
    bucket.put("k", b"two").unwrap();

    assert_eq!(bucket.stats().staged_writes, 1);
    bucket.flush().unwrap();
    assert_eq!(bucket.get("k").unwrap(), Some(b"two".to_vec()));
}

#[test]
fn test_buffered_delete_of_flushed_key() {
    let (_temp, bucket) = setup_bucket(buffered(4096));

    bucket.put("k", b"v").unwrap();
    bucket.flush().unwrap();

    assert!(bucket.delete("k").unwrap());
    assert!(!bucket.contains("k"));
    assert_eq!(bucket.len(), 0);
    assert!(bucket.keys().is_empty());

    bucket.flush().unwrap();
    assert_eq!(bucket.get("k").unwrap(), None);
}

#[test]
fn test_buffered_delete_of_staged_key() {
    let (_temp, bucket) = setup_bucket(buffered(4096));

    bucket.put("k", b"v").unwrap();
    assert!(bucket.delete("k").unwrap());
    assert_eq!(bucket.stats().staged_writes, 0);

    bucket.flush().unwrap();
    assert_eq!(file_len(bucket.data_path()), 0);
    assert!(!bucket.delete("k").unwrap());
}

#[test]
fn test_buffered_len_and_keys_merge_staging() {
    let (_temp, bucket) = setup_bucket(buffered(4096));

    bucket.put("a", b"1").unwrap();
    bucket.put("b", b"2").unwrap();
    bucket.flush().unwrap();

    bucket.put("c", b"3").unwrap();
    bucket.delete("a").unwrap();
    bucket.put("b", b"22").unwrap();

    assert_eq!(bucket.len(), 2);
    assert_eq!(bucket.keys(), vec!["b".to_string(), "c".to_string()]);
}

#[test]
fn test_close_flushes_staged_writes() {
    let temp = TempDir::new().unwrap();

    {
        let bucket = Bucket::open(temp.path(), "b", buffered(4096)).unwrap();
        bucket.put("k", b"v").unwrap();
        bucket.close().unwrap();
    }

    let bucket = Bucket::open(temp.path(), "b", buffered(4096)).unwrap();
    assert_eq!(bucket.get("k").unwrap(), Some(b"v".to_vec()));
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_reopen_direct_without_snapshot() {
    let temp = TempDir::new().unwrap();

    {
        let bucket = Bucket::open(temp.path(), "b", direct()).unwrap();
        bucket.put("a", b"1").unwrap();
        bucket.put("b", b"2").unwrap();
        bucket.delete("a").unwrap();
        // No close: the snapshot is never written
    }

    let bucket = Bucket::open(temp.path(), "b", direct()).unwrap();
    assert_eq!(bucket.get("a").unwrap(), None);
    assert_eq!(bucket.get("b").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn test_reopen_preserves_timestamps() {
    let temp = TempDir::new().unwrap();

    let ts = {
        let bucket = Bucket::open(temp.path(), "b", direct()).unwrap();
        bucket.put("k", b"v").unwrap();
        bucket.close().unwrap();
        bucket.timestamp("k").unwrap()
    };

    let bucket = Bucket::open(temp.path(), "b", direct()).unwrap();
    assert_eq!(bucket.timestamp("k"), Some(ts));

    // Stamps never go backwards, even across reopen
    bucket.put("k", b"w").unwrap();
    assert!(bucket.timestamp("k").unwrap() >= ts);
}

#[test]
fn test_reads_across_small_segments() {
    let temp = TempDir::new().unwrap();
    let options = BucketOptions {
        segment_size: 25,
        ..direct()
    };

    let bucket = Bucket::open(temp.path(), "seg", options).unwrap();
    for i in 0..50 {
        bucket
            .put(&format!("key{}", i), format!("value-{}", i).as_bytes())
            .unwrap();
    }

    assert!(bucket.stats().segments > 1);
    for i in 0..50 {
        assert_eq!(
            bucket.get(&format!("key{}", i)).unwrap(),
            Some(format!("value-{}", i).into_bytes())
        );
    }
}

#[test]
fn test_value_larger_than_segment() {
    let temp = TempDir::new().unwrap();
    let options = BucketOptions {
        segment_size: 16,
        ..direct()
    };

    let bucket = Bucket::open(temp.path(), "big", options).unwrap();
    let value: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    bucket.put("big", &value).unwrap();

    assert_eq!(bucket.get("big").unwrap(), Some(value));
}

#[test]
fn test_remap_is_harmless() {
    let (_temp, bucket) = setup_bucket(direct());

    bucket.put("k", b"v").unwrap();
    bucket.remap().unwrap();
    assert_eq!(bucket.get("k").unwrap(), Some(b"v".to_vec()));
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_key_too_long_rejected_without_io() {
    let (_temp, bucket) = setup_bucket(direct());

    let key = "k".repeat(MAX_KEY_LEN + 1);
    let err = bucket.put(&key, b"v").unwrap_err();

    assert!(matches!(err, DriftError::Validation(_)));
    assert_eq!(file_len(bucket.data_path()), 0);
}

#[test]
fn test_value_too_large_rejected() {
    let options = BucketOptions {
        max_value_size: 8,
        ..direct()
    };
    let (_temp, bucket) = setup_bucket(options);

    assert!(bucket.put("k", &[0u8; 8]).is_ok());
    let err = bucket.put("k", &[0u8; 9]).unwrap_err();
    assert!(matches!(err, DriftError::Validation(_)));
    assert_eq!(bucket.get("k").unwrap(), Some(vec![0u8; 8]));
}

#[test]
fn test_bucket_names() {
    assert!(validate_bucket_name("users").is_ok());
    assert!(validate_bucket_name("a-b_c.1").is_ok());
    assert!(validate_bucket_name("").is_err());
    assert!(validate_bucket_name(".hidden").is_err());
    assert!(validate_bucket_name("a/b").is_err());
    assert!(validate_bucket_name("a\\b").is_err());

    let temp = TempDir::new().unwrap();
    assert!(Bucket::open(temp.path(), "../escape", direct()).is_err());
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_torn_tail_is_truncated_on_open() {
    let temp = TempDir::new().unwrap();
    let data_path = temp.path().join("b.dat");

    let good_len = {
        let bucket = Bucket::open(temp.path(), "b", direct()).unwrap();
        bucket.put("a", b"1").unwrap();
        bucket.put("b", b"2").unwrap();
        file_len(&data_path)
    };

    // Simulate a crash halfway through an append
    let partial = encode_record("c", b"lost", false, 9).unwrap();
    AppendLog::open(&data_path)
        .unwrap()
        .append(&partial[..partial.len() / 2])
        .unwrap();

    let bucket = Bucket::open(temp.path(), "b", direct()).unwrap();
    assert_eq!(file_len(&data_path), good_len);
    assert_eq!(bucket.get("a").unwrap(), Some(b"1".to_vec()));
    assert!(!bucket.contains("c"));

    // New appends follow the last good record
    bucket.put("c", b"found").unwrap();
    drop(bucket);
    let bucket = Bucket::open(temp.path(), "b", direct()).unwrap();
    assert_eq!(bucket.get("c").unwrap(), Some(b"found".to_vec()));
}

#[test]
fn test_corrupt_record_fails_writable_open() {
    let temp = TempDir::new().unwrap();
    let data_path = temp.path().join("b.dat");

    {
        let bucket = Bucket::open(temp.path(), "b", direct()).unwrap();
        bucket.put("a", b"1").unwrap();
    }

    // Bad deleted flag in the middle of the file, valid record behind it
    let mut bad = encode_record("b", b"2", false, 2).unwrap();
    bad[13] = 0x7F;
    {
        let mut log = AppendLog::open(&data_path).unwrap();
        log.append(&bad).unwrap();
        log.append(&encode_record("c", b"3", false, 3).unwrap())
            .unwrap();
        log.force().unwrap();
    }
    let len = file_len(&data_path);

    assert!(matches!(
        Bucket::open(temp.path(), "b", direct()),
        Err(DriftError::Corruption(_))
    ));
    assert_eq!(file_len(&data_path), len);

    let options = BucketOptions {
        read_only: true,
        ..direct()
    };
    let bucket = Bucket::open(temp.path(), "b", options).unwrap();
    assert_eq!(bucket.get("a").unwrap(), Some(b"1".to_vec()));
    assert!(!bucket.contains("c"));
    assert_eq!(file_len(&data_path), len);
}

#[test]
fn test_repeated_recovery_is_stable() {
    let temp = TempDir::new().unwrap();

    {
        let bucket = Bucket::open(temp.path(), "b", direct()).unwrap();
        bucket.put("a", b"1").unwrap();
    }

    for _ in 0..3 {
        let bucket = Bucket::open(temp.path(), "b", direct()).unwrap();
        assert_eq!(bucket.keys(), vec!["a".to_string()]);
        assert_eq!(bucket.get("a").unwrap(), Some(b"1".to_vec()));
    }
}

// =============================================================================
// Read-only Tests
// =============================================================================

#[test]
fn test_read_only_bucket() {
    let temp = TempDir::new().unwrap();

    {
        let bucket = Bucket::open(temp.path(), "ro", direct()).unwrap();
        bucket.put("k", b"v").unwrap();
        bucket.close().unwrap();
    }

    let options = BucketOptions {
        read_only: true,
        ..direct()
    };
    let bucket = Bucket::open(temp.path(), "ro", options).unwrap();

    assert_eq!(bucket.get("k").unwrap(), Some(b"v".to_vec()));
    assert!(matches!(bucket.put("k", b"w"), Err(DriftError::ReadOnly(_))));
    assert!(matches!(bucket.delete("k"), Err(DriftError::ReadOnly(_))));
    assert!(matches!(bucket.compact(), Err(DriftError::ReadOnly(_))));
    bucket.close().unwrap();
}

#[test]
fn test_read_only_missing_bucket_fails() {
    let temp = TempDir::new().unwrap();
    let options = BucketOptions {
        read_only: true,
        ..direct()
    };

    assert!(Bucket::open(temp.path(), "absent", options).is_err());
    assert!(!temp.path().join("absent.dat").exists());
}

// =============================================================================
// Locking Tests
// =============================================================================

#[test]
fn test_second_writer_is_rejected() {
    let temp = TempDir::new().unwrap();
    let first = Bucket::open(temp.path(), "b", direct()).unwrap();

    assert!(matches!(
        Bucket::open(temp.path(), "b", direct()),
        Err(DriftError::Locked(_))
    ));
    let read_only = BucketOptions {
        read_only: true,
        ..direct()
    };
    assert!(matches!(
        Bucket::open(temp.path(), "b", read_only),
        Err(DriftError::Locked(_))
    ));

    first.put("x", b"first").unwrap();
    assert_eq!(first.get("x").unwrap(), Some(b"first".to_vec()));

    // Another bucket in the same directory is unaffected
    let other = Bucket::open(temp.path(), "c", direct()).unwrap();
    other.put("y", b"other").unwrap();

    drop(first);
    let reopened = Bucket::open(temp.path(), "b", direct()).unwrap();
    assert_eq!(reopened.get("x").unwrap(), Some(b"first".to_vec()));
}
