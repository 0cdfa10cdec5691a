//! Parallel population count over the finished bitmap.

use std::io;

use crate::bitmap::{PresenceBitmap, SEGMENT_COUNT};
use crate::tracy;

/// Splits the 256 segments into `workers` contiguous groups of
/// `ceil(256 / workers)`, the last groups may be shorter or empty.
#[inline]
pub fn segment_ranges(workers: usize) -> impl Iterator<Item = std::ops::Range<usize>> {
    let workers = workers.max(1);
    let per_worker = SEGMENT_COUNT.div_ceil(workers);

    (0..workers).map(move |w| {
        let start = (w * per_worker).min(SEGMENT_COUNT);
        let end = (start + per_worker).min(SEGMENT_COUNT);
        start..end
    })
}

/// Counts every set bit of `bitmap` using `workers` threads.
///
/// Takes `&PresenceBitmap`, but must only be called once all markers are
/// done; [`crate::counter::UniqueCounter`] guarantees that by joining the
/// scan scope first.
pub fn count_parallel(bitmap: &PresenceBitmap, workers: usize) -> io::Result<u64> {
    let _span = tracy::span!("reducer::count_parallel");

    let segments = bitmap.segments();

    std::thread::scope(|s| -> io::Result<u64> {
        let handles = segment_ranges(workers)
            .filter(|r| !r.is_empty())
            .map(|range| {
                let segments = &segments[range];
                s.spawn(move || {
                    let _span = tracy::span!("reducer::worker");
                    segments.iter().map(|segment| segment.count_ones()).sum::<u64>()
                })
            })
            .collect::<Vec<_>>();

        let mut total = 0u64;
        for handle in handles {
            total += handle.join().map_err(|_| io::Error::new(
                io::ErrorKind::Other,
                "reduce worker panicked"
            ))?;
        }

        Ok(total)
    })
}

/// Single-threaded reference count.
#[inline]
pub fn count_sequential(bitmap: &PresenceBitmap) -> u64 {
    bitmap.segments().iter().map(|segment| segment.count_ones()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::Ipv4Addr;

    #[test]
    fn test_segment_ranges_cover_all_segments() {
        for workers in [1, 2, 3, 7, 16, 255, 256, 300] {
            let ranges = segment_ranges(workers).collect::<Vec<_>>();
            assert_eq!(ranges.len(), workers);

            let mut next = 0;
            for r in &ranges {
                assert!(r.start >= next, "ranges overlap for {workers} workers");
                if !r.is_empty() {
                    assert_eq!(r.start, next);
                    next = r.end;
                }
            }
            assert_eq!(next, SEGMENT_COUNT, "not covered for {workers} workers");
        }
    }

    #[test]
    fn test_count_empty_bitmap() {
        let bitmap = PresenceBitmap::new();
        assert_eq!(count_parallel(&bitmap, 4).unwrap(), 0);
    }

    #[test]
    fn test_count_matches_sequential() {
        let bitmap = PresenceBitmap::new();
        for first in [0u8, 1, 63, 64, 127, 128, 200, 255] {
            for rest in [0u32, 1, 63, 64, 1000, 0xFF_FFFF] {
                bitmap.mark(first, rest);
            }
        }

        let expected = count_sequential(&bitmap);
        assert_eq!(expected, 8 * 6);

        for workers in [1, 2, 3, 5, 8, 64, 256, 1000] {
            assert_eq!(count_parallel(&bitmap, workers).unwrap(), expected, "{workers} workers");
        }
    }

    #[test]
    fn test_count_extremes() {
        let bitmap = PresenceBitmap::new();
        bitmap.mark_addr(Ipv4Addr::new(0, 0, 0, 0));
        bitmap.mark_addr(Ipv4Addr::new(255, 255, 255, 255));

        assert_eq!(count_parallel(&bitmap, 3).unwrap(), 2);
    }
}
