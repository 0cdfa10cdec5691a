//! Direct-addressed presence bitmap over the whole IPv4 space
//!
//! The bitmap is split into 256 segments, one per first octet. Each segment
//! covers the remaining 24 bits of the address, i.e. 2^24 bits packed into
//! 2^18 `u64` words. The total is exactly 2^32 bits (512 MiB).
//!
//! All mutation goes through [`PresenceBitmap::mark`], a single relaxed
//! `fetch_or`. OR is commutative and idempotent, so concurrent writers to the
//! same word never lose an update and need no ordering between them. Readers
//! (the reducer) only run after every writer has been joined.

use std::mem;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::tracy;

/// One segment per possible first octet
pub const SEGMENT_COUNT: usize = 256;

/// 2^24 bits per segment / 64 bits per word
pub const SEGMENT_WORDS: usize = 1 << 18;

/// Number of meaningful bits in the remainder part of an address
pub const REST_MASK: u32 = 0x00FF_FFFF;

// We reinterpret a zeroed `Box<[u64]>` as `Box<[AtomicU64]>`, so layouts must agree.
const _: () = assert!(mem::size_of::<AtomicU64>() == mem::size_of::<u64>());
const _: () = assert!(mem::align_of::<AtomicU64>() == mem::align_of::<u64>());

pub struct Segment {
    words: Box<[AtomicU64]>,
}

impl Segment {
    fn zeroed() -> Self {
        // `vec![0; n]` goes through `alloc_zeroed`, so the pages stay
        // untouched (and non-resident) until something is marked in them.
        let zeroed = vec![0u64; SEGMENT_WORDS].into_boxed_slice();
        let len = zeroed.len();
        let ptr = Box::into_raw(zeroed) as *mut AtomicU64;

        let words = unsafe {
            // SAFETY: `AtomicU64` has the same size, alignment and bit validity
            // as `u64` (checked above), and we own the allocation exclusively.
            Box::from_raw(core::ptr::slice_from_raw_parts_mut(ptr, len))
        };

        Self { words }
    }

    #[inline(always)]
    pub fn words(&self) -> &[AtomicU64] {
        &self.words
    }

    /// Number of set bits in this segment.
    #[inline]
    pub fn count_ones(&self) -> u64 {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as u64)
            .sum()
    }
}

/// The presence bitmap. One instance per run, shared by reference between
/// all scan workers and then between all reducers.
pub struct PresenceBitmap {
    segments: Box<[Segment]>,
}

impl Default for PresenceBitmap {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PresenceBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceBitmap")
            .field("segments", &self.segments.len())
            .field("words_per_segment", &SEGMENT_WORDS)
            .finish()
    }
}

impl PresenceBitmap {
    pub fn new() -> Self {
        let _span = tracy::span!("PresenceBitmap::new");

        let segments = (0..SEGMENT_COUNT)
            .map(|_| Segment::zeroed())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self { segments }
    }

    /// Marks the address `first.rest` as seen.
    ///
    /// `rest` carries the last three octets; anything above bit 23 can only
    /// come from a malformed line and is dropped so the index stays in range.
    #[inline(always)]
    pub fn mark(&self, first: u8, rest: u32) {
        let rest = rest & REST_MASK;
        let word_idx = (rest >> 6) as usize;
        let bit_idx = rest & 63;

        // SAFETY: `first` < 256 == SEGMENT_COUNT and `rest >> 6` < 2^18 == SEGMENT_WORDS.
        let word = unsafe {
            self.segments
                .get_unchecked(first as usize)
                .words
                .get_unchecked(word_idx)
        };

        word.fetch_or(1u64 << bit_idx, Ordering::Relaxed);
    }

    #[inline]
    pub fn mark_addr(&self, addr: Ipv4Addr) {
        let (first, rest) = split_addr(addr);
        self.mark(first, rest);
    }

    #[inline]
    pub fn contains(&self, first: u8, rest: u32) -> bool {
        let rest = rest & REST_MASK;
        let word = self.segments[first as usize].words[(rest >> 6) as usize].load(Ordering::Relaxed);
        word & (1u64 << (rest & 63)) != 0
    }

    #[inline]
    pub fn contains_addr(&self, addr: Ipv4Addr) -> bool {
        let (first, rest) = split_addr(addr);
        self.contains(first, rest)
    }

    #[inline(always)]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Iterates over every marked address in ascending order.
    ///
    /// Walks the whole bitmap, meant for tests and small diagnostics only.
    pub fn iter_marked(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.segments.iter().enumerate().flat_map(|(first, segment)| {
            segment.words.iter().enumerate().flat_map(move |(word_idx, word)| {
                let mut bits = word.load(Ordering::Relaxed);
                std::iter::from_fn(move || {
                    if bits == 0 {
                        return None;
                    }
                    let bit = bits.trailing_zeros();
                    bits &= bits - 1;
                    let rest = ((word_idx as u32) << 6) | bit;
                    Some(join_addr(first as u8, rest))
                })
            })
        })
    }
}

/// Splits an address into the `(first octet, remaining 24 bits)` form used for
/// two-level addressing.
#[inline(always)]
pub const fn split_addr(addr: Ipv4Addr) -> (u8, u32) {
    let bits = addr.to_bits();
    ((bits >> 24) as u8, bits & REST_MASK)
}

#[inline(always)]
pub const fn join_addr(first: u8, rest: u32) -> Ipv4Addr {
    Ipv4Addr::from_bits(((first as u32) << 24) | (rest & REST_MASK))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_bitmap_is_empty() {
        let bitmap = PresenceBitmap::new();

        assert_eq!(bitmap.segments().len(), SEGMENT_COUNT);
        assert!(bitmap.segments().iter().all(|s| s.words().len() == SEGMENT_WORDS));
        assert!(!bitmap.contains(0, 0));
        assert!(!bitmap.contains(255, REST_MASK));
        assert_eq!(bitmap.iter_marked().next(), None);
    }

    #[test]
    fn test_mark_sets_exactly_one_bit() {
        let bitmap = PresenceBitmap::new();
        bitmap.mark(10, 0x01_02_03);

        assert!(bitmap.contains(10, 0x01_02_03));
        assert!(!bitmap.contains(10, 0x01_02_02));
        assert!(!bitmap.contains(11, 0x01_02_03));
        assert_eq!(bitmap.segments()[10].count_ones(), 1);
        assert_eq!(bitmap.iter_marked().collect::<Vec<_>>(), vec![Ipv4Addr::new(10, 1, 2, 3)]);
    }

    #[test]
    fn test_mark_is_idempotent() {
        let bitmap = PresenceBitmap::new();
        for _ in 0..1000 {
            bitmap.mark_addr(Ipv4Addr::new(192, 168, 0, 1));
        }

        assert_eq!(bitmap.segments()[192].count_ones(), 1);
        assert!(bitmap.contains_addr(Ipv4Addr::new(192, 168, 0, 1)));
    }

    #[test]
    fn test_mark_extremes() {
        let bitmap = PresenceBitmap::new();
        bitmap.mark_addr(Ipv4Addr::UNSPECIFIED);
        bitmap.mark_addr(Ipv4Addr::BROADCAST);

        let marked = bitmap.iter_marked().collect::<Vec<_>>();
        assert_eq!(marked, vec![Ipv4Addr::UNSPECIFIED, Ipv4Addr::BROADCAST]);
    }

    #[test]
    fn test_mark_masks_oversized_rest() {
        let bitmap = PresenceBitmap::new();
        // Only possible with malformed input; must not go out of bounds.
        bitmap.mark(1, u32::MAX);

        assert!(bitmap.contains(1, REST_MASK));
        assert_eq!(bitmap.segments()[1].count_ones(), 1);
    }

    #[test]
    fn test_concurrent_marks_same_word() {
        let bitmap = PresenceBitmap::new();

        std::thread::scope(|s| {
            for t in 0..8u32 {
                let bitmap = &bitmap;
                s.spawn(move || {
                    for round in 0..1000u32 {
                        // All threads hammer the same 64-bit word, each with
                        // its own bits, plus one bit shared by everyone.
                        bitmap.mark(7, t * 8 + round % 8);
                        bitmap.mark(7, 63);
                    }
                });
            }
        });

        assert_eq!(bitmap.segments()[7].count_ones(), 64);
        assert_eq!(bitmap.segments()[7].words()[0].load(Ordering::Relaxed), u64::MAX);
    }

    #[test]
    fn test_split_join_roundtrip() {
        for addr in [
            Ipv4Addr::new(0, 0, 0, 0),
            Ipv4Addr::new(1, 2, 3, 4),
            Ipv4Addr::new(127, 0, 0, 1),
            Ipv4Addr::new(255, 255, 255, 255),
        ] {
            let (first, rest) = split_addr(addr);
            assert_eq!(first, addr.octets()[0]);
            assert!(rest <= REST_MASK);
            assert_eq!(join_addr(first, rest), addr);
        }
    }
}
