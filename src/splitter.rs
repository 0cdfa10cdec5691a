//! Line-aligned partitioning of the input into one range per scan worker.

use std::ops::Range;

use memchr::memchr;
use smallvec::SmallVec;

use crate::parser::LINE_TERMINATOR;
use crate::tracy;

/// `workers + 1` offsets; spills to the heap past 63 workers.
pub type Offsets = SmallVec<[usize; 64]>;

/// Splits `data` into `workers` contiguous ranges, each starting at the
/// beginning of a line.
///
/// Returns `workers + 1` non-decreasing offsets, `[0, .., data.len()]`. Range
/// `k` is `offsets[k]..offsets[k + 1]` and may be empty when there are fewer
/// lines than workers.
pub fn chunk_offsets(data: &[u8], workers: usize) -> Offsets {
    let _span = tracy::span!("splitter::chunk_offsets");

    let workers = workers.max(1);
    let len = data.len();
    let chunk_len = len.div_ceil(workers);

    let mut offsets = Offsets::with_capacity(workers + 1);
    offsets.push(0);

    for k in 1..workers {
        let prev = offsets[k - 1];
        let proposed = (k * chunk_len).max(prev);

        if proposed >= len {
            break;
        }

        match memchr(LINE_TERMINATOR, &data[proposed..]) {
            Some(pos) => offsets.push(proposed + pos + 1),
            // The rest of the data is one unterminated line
            None => break,
        }
    }

    offsets.resize(workers + 1, len);
    offsets
}

/// Convenience iterator over the ranges described by [`chunk_offsets`].
#[inline]
pub fn ranges(offsets: &[usize]) -> impl Iterator<Item = Range<usize>> + '_ {
    offsets.windows(2).map(|w| w[0]..w[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_line_aligned(data: &[u8], offsets: &[usize], workers: usize) {
        assert_eq!(offsets.len(), workers.max(1) + 1);
        assert_eq!(offsets[0], 0);
        assert_eq!(*offsets.last().unwrap(), data.len());

        for w in offsets.windows(2) {
            assert!(w[0] <= w[1], "offsets must be non-decreasing: {offsets:?}");
        }

        for &o in offsets {
            assert!(
                o == 0 || o == data.len() || data[o - 1] == LINE_TERMINATOR,
                "offset {o} doesn't start a line"
            );
        }
    }

    #[test]
    fn test_empty_input() {
        let offsets = chunk_offsets(b"", 4);
        assert_eq!(offsets.as_slice(), &[0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_single_worker() {
        let data = b"1.2.3.4\n5.6.7.8\n";
        let offsets = chunk_offsets(data, 1);
        assert_eq!(offsets.as_slice(), &[0, data.len()]);
    }

    #[test]
    fn test_zero_workers_is_one() {
        let data = b"1.2.3.4\n";
        assert_eq!(chunk_offsets(data, 0).as_slice(), &[0, data.len()]);
    }

    #[test]
    fn test_boundaries_land_after_terminators() {
        let data = b"1.2.3.4\n10.20.30.40\n5.6.7.8\n100.200.100.200\n9.9.9.9\n";
        for workers in 1..=16 {
            let offsets = chunk_offsets(data, workers);
            assert_line_aligned(data, &offsets, workers);
        }
    }

    #[test]
    fn test_uneven_length() {
        // 3 lines, 7 workers, length not divisible by 7
        let data = b"1.1.1.1\n22.22.22.22\n3.3.3.3";
        let offsets = chunk_offsets(data, 7);
        assert_line_aligned(data, &offsets, 7);

        let covered = ranges(&offsets).map(|r| r.len()).sum::<usize>();
        assert_eq!(covered, data.len());
    }

    #[test]
    fn test_fewer_lines_than_workers() {
        let data = b"1.2.3.4\n";
        let offsets = chunk_offsets(data, 8);
        assert_line_aligned(data, &offsets, 8);
        assert_eq!(ranges(&offsets).filter(|r| !r.is_empty()).count(), 1);
    }

    #[test]
    fn test_last_line_without_terminator_collapses() {
        let data = b"1.2.3.4\n255.255.255.255";
        let len = data.len();

        // The only boundary proposal falls inside the unterminated tail.
        let offsets = chunk_offsets(data, 2);
        assert_eq!(offsets.as_slice(), &[0, len, len]);

        // First proposal (6) finds the terminator at 7, the second one doesn't.
        let offsets = chunk_offsets(data, 4);
        assert_eq!(offsets.as_slice(), &[0, 8, len, len, len]);
    }

    #[test]
    fn test_long_line_spanning_several_chunks() {
        let mut data = b"1.1.1.1\n".to_vec();
        data.extend(std::iter::repeat_n(b'9', 100));
        data.extend_from_slice(b"\n2.2.2.2\n");

        let offsets = chunk_offsets(&data, 10);
        assert_line_aligned(&data, &offsets, 10);
    }

    #[test]
    fn test_ranges_partition_exactly() {
        let data = b"0.0.0.0\n1.1.1.1\n2.2.2.2\n3.3.3.3\n4.4.4.4\n";
        let offsets = chunk_offsets(data, 3);

        let mut next = 0;
        for r in ranges(&offsets) {
            assert_eq!(r.start, next);
            next = r.end;
        }
        assert_eq!(next, data.len());
    }
}
