//! Line scanning and dotted-decimal parsing
//!
//! The hot loop: find the next `\n` with `memchr`, parse the bytes in between
//! into `(first octet, last three octets)` and mark the bitmap. Nothing here
//! allocates.

use memchr::memchr_iter;

use crate::bitmap::PresenceBitmap;
use crate::tracy;
use crate::util::unlikely;

pub const LINE_TERMINATOR: u8 = b'\n';

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Any line is accepted and folded into some address. Fastest, and what
    /// clean input needs.
    #[default]
    Permissive,

    /// Lines that aren't exactly four dot-separated 1-3 digit octets in
    /// 0..=255 are skipped and counted as malformed.
    Strict,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    /// Non-empty lines seen
    pub lines: u64,
    /// Lines rejected by strict parsing (always 0 in permissive mode)
    pub malformed: u64,
}

impl ScanStats {
    #[inline]
    pub fn merge(&mut self, other: ScanStats) {
        self.lines += other.lines;
        self.malformed += other.malformed;
    }
}

/// Parses a dotted-decimal line without any validation.
///
/// Digits accumulate per segment with wrapping arithmetic; the first segment
/// becomes the first octet, every later one is shifted into the remainder.
/// Garbage in gives some well-defined number out, never a panic.
#[inline(always)]
pub fn parse_ipv4(line: &[u8]) -> (u8, u32) {
    let mut first = 0u8;
    let mut rest = 0u32;
    let mut current = 0u32;
    let mut seen_dot = false;

    for &b in line {
        if b == b'.' {
            if seen_dot {
                rest = (rest << 8) | current;
            } else {
                first = current as u8;
                seen_dot = true;
            }
            current = 0;
            continue;
        }

        current = current
            .wrapping_mul(10)
            .wrapping_add(b.wrapping_sub(b'0') as u32);
    }

    rest = (rest << 8) | current;
    (first, rest)
}

/// Parses a dotted-decimal line, returning `None` unless it is exactly
/// `a.b.c.d` with 1-3 digits per octet and every octet in 0..=255.
#[inline]
pub fn parse_ipv4_strict(line: &[u8]) -> Option<(u8, u32)> {
    let mut octets = [0u32; 4];
    let mut idx = 0;
    let mut digits = 0;

    for &b in line {
        match b {
            b'0'..=b'9' => {
                if digits == 3 {
                    return None;
                }
                octets[idx] = octets[idx] * 10 + (b - b'0') as u32;
                digits += 1;
            }
            b'.' => {
                if digits == 0 || idx == 3 {
                    return None;
                }
                idx += 1;
                digits = 0;
            }
            _ => return None,
        }
    }

    if idx != 3 || digits == 0 || octets.iter().any(|&o| o > 255) {
        return None;
    }

    let [a, b, c, d] = octets;
    Some((a as u8, (b << 16) | (c << 8) | d))
}

/// Scans every line of `range` and marks the parsed addresses in `bitmap`.
///
/// `range` must start at the beginning of a line. The last line doesn't need
/// a terminator. Empty lines are skipped.
pub fn scan_range(range: &[u8], bitmap: &PresenceBitmap, mode: ParseMode) -> ScanStats {
    let _span = tracy::span!("parser::scan_range");

    match mode {
        ParseMode::Permissive => scan_lines(range, bitmap, |line| Some(parse_ipv4(line))),
        ParseMode::Strict     => scan_lines(range, bitmap, parse_ipv4_strict),
    }
}

#[inline(always)]
fn scan_lines<P>(range: &[u8], bitmap: &PresenceBitmap, parse: P) -> ScanStats
where
    P: Fn(&[u8]) -> Option<(u8, u32)>,
{
    let mut stats = ScanStats::default();

    let mut visit = |line: &[u8]| {
        if unlikely(line.is_empty()) {
            return;
        }

        stats.lines += 1;
        match parse(line) {
            Some((first, rest)) => bitmap.mark(first, rest),
            None => stats.malformed += 1,
        }
    };

    let mut line_start = 0;
    for nl in memchr_iter(LINE_TERMINATOR, range) {
        visit(&range[line_start..nl]);
        line_start = nl + 1;
    }

    if line_start < range.len() {
        visit(&range[line_start..]);
    }

    stats
}
