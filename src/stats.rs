use std::fmt::{self, Display};
use std::time::Duration;

use crate::parser::ScanStats;
use crate::util::format_bytes;

/// Result of one counting run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
    /// Distinct addresses seen
    pub unique: u64,

    pub bytes: usize,
    pub lines: u64,
    pub malformed: u64,

    pub scan_threads: usize,
    pub reduce_threads: usize,

    pub alloc_time: Duration,
    pub scan_time: Duration,
    pub reduce_time: Duration,
}

impl Stats {
    #[inline]
    pub fn add_scan(&mut self, scan: ScanStats) {
        self.lines += scan.lines;
        self.malformed += scan.malformed;
    }

    #[inline]
    pub fn total_time(&self) -> Duration {
        self.alloc_time + self.scan_time + self.reduce_time
    }

    /// Input bytes per second of the scan phase, 0 for an instant scan.
    #[inline]
    pub fn scan_throughput(&self) -> f64 {
        let secs = self.scan_time.as_secs_f64();
        if secs > 0.0 { self.bytes as f64 / secs } else { 0.0 }
    }
}

impl Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Input:          {}", format_bytes(self.bytes))?;
        writeln!(f, "Lines:          {}", self.lines)?;
        if self.malformed > 0 {
            writeln!(f, "Malformed:      {}", self.malformed)?;
        }
        writeln!(f, "Unique:         {}", self.unique)?;
        if self.lines > 0 {
            let dup_ratio = 1.0 - self.unique as f64 / (self.lines - self.malformed).max(1) as f64;
            writeln!(f, "Duplicates:     {:.2}%", dup_ratio.max(0.0) * 100.0)?;
        }
        writeln!(f, "Scan threads:   {}", self.scan_threads)?;
        writeln!(f, "Reduce threads: {}", self.reduce_threads)?;
        writeln!(f, "Bitmap alloc:   {:.2?}", self.alloc_time)?;
        writeln!(f, "Scan:           {:.2?} ({}/s)", self.scan_time, format_bytes(self.scan_throughput() as usize))?;
        writeln!(f, "Reduce:         {:.2?}", self.reduce_time)?;
        write!(f,   "Total:          {:.2?}", self.total_time())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_scan() {
        let mut stats = Stats::default();
        stats.add_scan(ScanStats { lines: 10, malformed: 2 });
        stats.add_scan(ScanStats { lines: 5, malformed: 0 });

        assert_eq!(stats.lines, 15);
        assert_eq!(stats.malformed, 2);
    }

    #[test]
    fn test_total_time_sums_phases() {
        let stats = Stats {
            alloc_time: Duration::from_millis(5),
            scan_time: Duration::from_millis(40),
            reduce_time: Duration::from_millis(15),
            ..Default::default()
        };

        assert_eq!(stats.total_time(), Duration::from_millis(60));
        assert!(stats.to_string().contains("Total:"));
    }

    #[test]
    fn test_throughput_of_instant_scan_is_zero() {
        let stats = Stats { bytes: 1024, ..Default::default() };
        assert_eq!(stats.scan_throughput(), 0.0);
    }

    #[test]
    fn test_display_mentions_malformed_only_when_present() {
        let mut stats = Stats { unique: 2, lines: 3, bytes: 24, ..Default::default() };
        assert!(!stats.to_string().contains("Malformed"));

        stats.malformed = 1;
        let rendered = stats.to_string();
        assert!(rendered.contains("Malformed:      1"));
        assert!(rendered.contains("Unique:         2"));
    }
}
