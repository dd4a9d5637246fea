//! Tests for the segmented reader
//!
//! These tests verify:
//! - Offset translation across equal and unequal segments
//! - Reads that straddle one or many segment boundaries
//! - Out-of-range detection
//! - Mapping real files with small segment sizes

use std::fs::OpenOptions;
use std::io::Write;

use driftkv::segment::{MappedReader, SegmentedReader};
use driftkv::DriftError;
use rand::Rng;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

/// 100 big-endian i32s (0..100) laid out as one 400 byte stream
fn int_stream() -> Vec<u8> {
    (0..100i32).flat_map(|i| i.to_be_bytes()).collect()
}

/// Split `bytes` into chunks of `size` (last one shorter)
fn split(bytes: &[u8], size: usize) -> Vec<Vec<u8>> {
    bytes.chunks(size).map(<[u8]>::to_vec).collect()
}

fn read_int(reader: &SegmentedReader<Vec<u8>>, index: u64) -> i32 {
    let bytes = reader.read(index * 4, 4).unwrap();
    i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

// =============================================================================
// Translation Tests
// =============================================================================

#[test]
fn test_every_int_across_25_byte_segments() {
    let reader = SegmentedReader::from_segments(split(&int_stream(), 25));

    assert_eq!(reader.segment_count(), 16);
    assert_eq!(reader.len(), 400);

    for i in 0..100 {
        assert_eq!(read_int(&reader, i), i as i32);
    }
}

#[test]
fn test_random_positions() {
    let reader = SegmentedReader::from_segments(split(&int_stream(), 25));
    let mut rng = rand::thread_rng();

    for _ in 0..1000 {
        let i = rng.gen_range(0..100u64);
        assert_eq!(read_int(&reader, i), i as i32);
    }
}

#[test]
fn test_various_segment_sizes() {
    let stream = int_stream();

    for size in [1, 3, 4, 7, 13, 64, 399, 400, 1000] {
        let reader = SegmentedReader::from_segments(split(&stream, size));
        assert_eq!(reader.len(), 400, "segment size {}", size);

        for i in 0..100 {
            assert_eq!(read_int(&reader, i), i as i32, "segment size {}", size);
        }
    }
}

#[test]
fn test_unequal_segments() {
    let stream = int_stream();
    let segments = vec![
        stream[..5].to_vec(),
        stream[5..6].to_vec(),
        Vec::new(),
        stream[6..200].to_vec(),
        stream[200..].to_vec(),
    ];
    let reader = SegmentedReader::from_segments(segments);

    // Empty segments are dropped
    assert_eq!(reader.segment_count(), 4);
    for i in 0..100 {
        assert_eq!(read_int(&reader, i), i as i32);
    }
}

#[test]
fn test_read_spanning_many_segments() {
    let stream = int_stream();
    let reader = SegmentedReader::from_segments(split(&stream, 3));

    let bytes = reader.read(10, 300).unwrap();
    assert_eq!(&bytes[..], &stream[10..310]);
}

#[test]
fn test_read_within_segment_borrows() {
    let reader = SegmentedReader::from_segments(split(&int_stream(), 100));
    let bytes = reader.read(8, 4).unwrap();
    assert!(matches!(bytes, std::borrow::Cow::Borrowed(_)));
}

#[test]
fn test_zero_length_read() {
    let reader = SegmentedReader::from_segments(split(&int_stream(), 25));
    assert!(reader.read(400, 0).unwrap().is_empty());
}

// =============================================================================
// Bounds Tests
// =============================================================================

#[test]
fn test_read_past_end() {
    let reader = SegmentedReader::from_segments(split(&int_stream(), 25));

    let err = reader.read(398, 4).unwrap_err();
    match err {
        DriftError::OutOfRange {
            offset,
            len,
            mapped,
        } => {
            assert_eq!(offset, 398);
            assert_eq!(len, 4);
            assert_eq!(mapped, 400);
        }
        other => panic!("Expected OutOfRange, got {:?}", other),
    }
}

#[test]
fn test_read_offset_overflow() {
    let reader = SegmentedReader::from_segments(split(&int_stream(), 25));
    assert!(reader.read(u64::MAX, 1).is_err());
}

#[test]
fn test_empty_reader() {
    let reader = SegmentedReader::<Vec<u8>>::from_segments(Vec::new());
    assert!(reader.is_empty());
    assert!(reader.read(0, 1).is_err());
}

// =============================================================================
// Cursor Tests
// =============================================================================

#[test]
fn test_cursor_sequential_reads() {
    let reader = SegmentedReader::from_segments(split(&int_stream(), 25));
    let mut cursor = reader.cursor(0);

    for i in 0..100i32 {
        let bytes = cursor.read_bytes(4).unwrap();
        assert_eq!(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), i);
    }
    assert_eq!(cursor.position(), 400);
    assert_eq!(cursor.remaining(), 0);
}

#[test]
fn test_cursor_skip_and_seek() {
    let reader = SegmentedReader::from_segments(split(&int_stream(), 25));
    let mut cursor = reader.cursor(0);

    cursor.skip(40).unwrap();
    assert_eq!(cursor.read_bytes(4).unwrap()[3], 10);

    cursor.seek(396);
    assert_eq!(cursor.read_bytes(4).unwrap()[3], 99);
    assert!(cursor.skip(1).is_err());
}

// =============================================================================
// Mapped File Tests
// =============================================================================

#[test]
fn test_map_file_small_segments() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ints.dat");
    let stream = int_stream();
    std::fs::write(&path, &stream).unwrap();

    let file = std::fs::File::open(&path).unwrap();
    let reader = MappedReader::map(&file, stream.len() as u64, 25).unwrap();

    assert_eq!(reader.segment_count(), 16);
    assert_eq!(&reader.read(0, 400).unwrap()[..], &stream[..]);
    assert_eq!(&reader.read(23, 4).unwrap()[..], &stream[23..27]);
}

#[test]
fn test_map_prefix_of_growing_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("grow.dat");
    std::fs::write(&path, b"hello").unwrap();

    let mut file = OpenOptions::new().read(true).append(true).open(&path).unwrap();
    let before = MappedReader::map(&file, 5, 4).unwrap();

    file.write_all(b" world").unwrap();
    let after = MappedReader::map(&file, 11, 4).unwrap();

    // The old mapping keeps its extent
    assert_eq!(before.len(), 5);
    assert!(before.read(5, 1).is_err());
    assert_eq!(&after.read(0, 11).unwrap()[..], b"hello world");
}

#[test]
fn test_map_rejects_zero_segment_size() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("zero.dat");
    std::fs::write(&path, b"abc").unwrap();

    let file = std::fs::File::open(&path).unwrap();
    assert!(matches!(
        MappedReader::map(&file, 3, 0),
        Err(DriftError::Config(_))
    ));
}

#[test]
fn test_map_empty_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("empty.dat");
    std::fs::write(&path, b"").unwrap();

    let file = std::fs::File::open(&path).unwrap();
    let reader = MappedReader::map(&file, 0, 1024).unwrap();
    assert!(reader.is_empty());
    assert_eq!(reader.segment_count(), 0);
    assert!(MappedReader::empty().is_empty());
}
