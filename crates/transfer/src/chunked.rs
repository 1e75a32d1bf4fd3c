use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::TransferError;

// ---------------------------------------------------------------------------
// ChunkRange / ChunkPlan
// ---------------------------------------------------------------------------

/// A contiguous byte range `[start, end)` of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    /// 0-based position of this chunk in the plan.
    pub index: u64,
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    /// Length of the range in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Ordered, restartable split of `total_len` bytes into `chunk_size` pieces.
///
/// Only lengths are involved; bytes are read from a [`ChunkSource`] when a
/// chunk is about to be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    total_len: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    /// Splits `total_len` bytes into ranges of `chunk_size` (last one may be shorter).
    pub fn split(total_len: u64, chunk_size: usize) -> Result<Self, TransferError> {
        if chunk_size == 0 {
            return Err(TransferError::InvalidChunkSize);
        }
        Ok(Self {
            total_len,
            chunk_size: chunk_size as u64,
        })
    }

    /// Number of chunks: `ceil(total_len / chunk_size)`.
    pub fn len(&self) -> u64 {
        self.total_len.div_ceil(self.chunk_size)
    }

    pub fn is_empty(&self) -> bool {
        self.total_len == 0
    }

    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Byte range of chunk `index`, or `None` past the end.
    pub fn range(&self, index: u64) -> Option<ChunkRange> {
        if index >= self.len() {
            return None;
        }
        let start = index * self.chunk_size;
        let end = (start + self.chunk_size).min(self.total_len);
        Some(ChunkRange { index, start, end })
    }

    /// Iterates the ranges in order. Each call starts from chunk 0.
    pub fn iter(&self) -> ChunkIter {
        ChunkIter {
            plan: *self,
            next: 0,
        }
    }
}

impl IntoIterator for &ChunkPlan {
    type Item = ChunkRange;
    type IntoIter = ChunkIter;

    fn into_iter(self) -> ChunkIter {
        self.iter()
    }
}

/// Iterator over the ranges of a [`ChunkPlan`].
#[derive(Debug, Clone)]
pub struct ChunkIter {
    plan: ChunkPlan,
    next: u64,
}

impl Iterator for ChunkIter {
    type Item = ChunkRange;

    fn next(&mut self) -> Option<ChunkRange> {
        let range = self.plan.range(self.next)?;
        self.next += 1;
        Some(range)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.plan.len() - self.next.min(self.plan.len())) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkIter {}

// ---------------------------------------------------------------------------
// Chunk sources
// ---------------------------------------------------------------------------

/// A byte source of known length that can materialize arbitrary ranges.
pub trait ChunkSource {
    /// Total length in bytes.
    fn total_len(&self) -> u64;

    /// Reads exactly the bytes covered by `range`.
    fn read_range(&mut self, range: &ChunkRange) -> Result<Vec<u8>, TransferError>;
}

impl ChunkSource for Vec<u8> {
    fn total_len(&self) -> u64 {
        self.len() as u64
    }

    fn read_range(&mut self, range: &ChunkRange) -> Result<Vec<u8>, TransferError> {
        if range.end > self.len() as u64 || range.start > range.end {
            return Err(TransferError::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                len: self.len() as u64,
            });
        }
        Ok(self[range.start as usize..range.end as usize].to_vec())
    }
}

/// A local file read chunk by chunk.
///
/// The size is captured when the file is opened; a file that shrinks
/// afterwards surfaces as an I/O error on the short read.
pub struct FileSource {
    file: std::fs::File,
    path: PathBuf,
    len: u64,
}

impl FileSource {
    /// Opens `path` for chunked reading.
    pub fn open(path: &Path) -> Result<Self, TransferError> {
        let file = std::fs::File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file,
            path: path.to_path_buf(),
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChunkSource for FileSource {
    fn total_len(&self) -> u64 {
        self.len
    }

    fn read_range(&mut self, range: &ChunkRange) -> Result<Vec<u8>, TransferError> {
        if range.end > self.len || range.start > range.end {
            return Err(TransferError::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                len: self.len,
            });
        }
        self.file.seek(SeekFrom::Start(range.start))?;
        let mut buf = vec![0u8; range.len() as usize];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    #[test]
    fn zero_chunk_size_rejected() {
        assert!(matches!(
            ChunkPlan::split(10, 0),
            Err(TransferError::InvalidChunkSize)
        ));
    }

    #[test]
    fn empty_source_has_no_chunks() {
        let plan = ChunkPlan::split(0, 4).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
        assert_eq!(plan.iter().count(), 0);
        assert!(plan.range(0).is_none());
    }

    #[test]
    fn last_chunk_is_remainder() {
        let plan = ChunkPlan::split(10, 4).unwrap();
        let ranges: Vec<_> = plan.iter().collect();
        assert_eq!(
            ranges,
            vec![
                ChunkRange { index: 0, start: 0, end: 4 },
                ChunkRange { index: 1, start: 4, end: 8 },
                ChunkRange { index: 2, start: 8, end: 10 },
            ]
        );
    }

    #[test]
    fn exact_multiple_keeps_full_last_chunk() {
        let plan = ChunkPlan::split(12, 4).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.range(2).unwrap().len(), 4);
    }

    #[test]
    fn ranges_partition_the_source() {
        for (n, s) in [(1u64, 1usize), (7, 3), (1000, 64), (524_288 * 3 + 1, 524_288)] {
            let plan = ChunkPlan::split(n, s).unwrap();
            assert_eq!(plan.len(), n.div_ceil(s as u64));
            assert_eq!(plan.iter().len() as u64, plan.len());

            let mut expected_start = 0;
            for (i, r) in plan.iter().enumerate() {
                assert_eq!(r.index, i as u64);
                assert_eq!(r.start, expected_start);
                assert!(r.len() > 0 && r.len() <= s as u64);
                expected_start = r.end;
            }
            assert_eq!(expected_start, n);
            assert_eq!(plan.iter().map(|r| r.len()).sum::<u64>(), n);
        }
    }

    #[test]
    fn plan_is_restartable() {
        let plan = ChunkPlan::split(9, 2).unwrap();
        let first: Vec<_> = plan.iter().collect();
        let second: Vec<_> = (&plan).into_iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn memory_source_reconstructs_bytes() {
        let original = b"The quick brown fox jumps over the lazy dog".to_vec();
        let mut source = original.clone();
        let plan = ChunkPlan::split(source.total_len(), 10).unwrap();

        let mut rebuilt = Vec::new();
        for range in &plan {
            rebuilt.extend(source.read_range(&range).unwrap());
        }
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn memory_source_rejects_out_of_bounds() {
        let mut source = vec![0u8; 4];
        let range = ChunkRange { index: 1, start: 4, end: 8 };
        assert!(matches!(
            source.read_range(&range),
            Err(TransferError::RangeOutOfBounds { len: 4, .. })
        ));
    }

    #[test]
    fn file_source_reads_ranges_in_any_order() {
        let dir = TempDir::new().unwrap();
        let path = create_test_file(dir.path(), "clip.mp4", b"AABBCCDDEE");
        let mut source = FileSource::open(&path).unwrap();
        assert_eq!(source.total_len(), 10);

        let plan = ChunkPlan::split(source.total_len(), 4).unwrap();
        let last = plan.range(2).unwrap();
        assert_eq!(source.read_range(&last).unwrap(), b"EE");
        let first = plan.range(0).unwrap();
        assert_eq!(source.read_range(&first).unwrap(), b"AABB");
    }

    #[test]
    fn file_source_reconstructs_file() {
        let dir = TempDir::new().unwrap();
        let original: Vec<u8> = (0..=255u8).cycle().take(5000).collect();
        let path = create_test_file(dir.path(), "photo.jpg", &original);

        let mut source = FileSource::open(&path).unwrap();
        let plan = ChunkPlan::split(source.total_len(), 512).unwrap();
        let mut rebuilt = Vec::new();
        for range in plan.iter() {
            rebuilt.extend(source.read_range(&range).unwrap());
        }
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn file_source_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = FileSource::open(&dir.path().join("missing.png"));
        assert!(matches!(result, Err(TransferError::Io(_))));
    }
}
