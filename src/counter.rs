//! The whole run: map → split → scan in parallel → join → reduce in parallel.

use std::io;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use crate::bitmap::PresenceBitmap;
use crate::core_topology::CoreTopology;
use crate::input::MappedInput;
use crate::parser::{scan_range, ParseMode, ScanStats};
use crate::splitter::{chunk_offsets, ranges};
use crate::stats::Stats;
use crate::{eprintln_yellow, platform, reducer, tracy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub scan_threads: NonZeroUsize,
    pub reduce_threads: NonZeroUsize,
    pub mode: ParseMode,
    pub pin_threads: bool,
}

impl Default for Config {
    fn default() -> Self {
        let threads = crate::cli::default_threads();
        Self {
            scan_threads: threads,
            reduce_threads: threads,
            mode: ParseMode::default(),
            pin_threads: false,
        }
    }
}

impl Config {
    #[inline]
    pub fn with_threads(mut self, scan: usize, reduce: usize) -> Self {
        self.scan_threads = NonZeroUsize::new(scan).unwrap_or(NonZeroUsize::MIN);
        self.reduce_threads = NonZeroUsize::new(reduce).unwrap_or(NonZeroUsize::MIN);
        self
    }

    #[inline]
    pub const fn with_mode(mut self, mode: ParseMode) -> Self {
        self.mode = mode;
        self
    }
}

pub struct UniqueCounter {
    config: Config,
}

/// impl block of public API
impl UniqueCounter {
    #[inline]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Maps the file at `path` and counts its distinct addresses.
    ///
    /// The mapping is released when this returns, whether it succeeds or not.
    pub fn count_file(&self, path: impl AsRef<Path>) -> io::Result<Stats> {
        let _span = tracy::span!("UniqueCounter::count_file");

        let input = MappedInput::open(path)?;
        self.count_bytes(&input)
    }

    /// Counts the distinct addresses in an in-memory, newline-delimited buffer.
    pub fn count_bytes(&self, data: &[u8]) -> io::Result<Stats> {
        let _span = tracy::span!("UniqueCounter::count_bytes");

        let scan_threads = self.config.scan_threads.get();
        let reduce_threads = self.config.reduce_threads.get();

        let mut stats = Stats {
            bytes: data.len(),
            scan_threads,
            reduce_threads,
            ..Stats::default()
        };

        let now = Instant::now();
        let bitmap = PresenceBitmap::new();
        stats.alloc_time = now.elapsed();

        let now = Instant::now();
        stats.add_scan(self.scan_parallel(data, &bitmap)?);
        stats.scan_time = now.elapsed();

        tracy::message("scan done");
        tracy::plot_named("scan MB/s", stats.scan_throughput() / (1024.0 * 1024.0));

        // Every scan worker has been joined by now, the bitmap is read-only from here on.
        let now = Instant::now();
        stats.unique = reducer::count_parallel(&bitmap, reduce_threads)?;
        stats.reduce_time = now.elapsed();

        Ok(stats)
    }
}

// impl block of the core logic
impl UniqueCounter {
    fn scan_parallel(&self, data: &[u8], bitmap: &PresenceBitmap) -> io::Result<ScanStats> {
        let _span = tracy::span!("UniqueCounter::scan_parallel");

        let workers = self.config.scan_threads.get();
        let mode = self.config.mode;
        let offsets = chunk_offsets(data, workers);

        let topology = self.config.pin_threads.then(CoreTopology::detect);
        let topology = topology.as_ref();

        let pin_warned = &AtomicBool::new(false);

        thread::scope(|s| -> io::Result<ScanStats> {
            let handles = ranges(offsets.as_slice())
                .enumerate()
                .filter(|(_, range)| !range.is_empty())
                .map(|(worker_id, range)| {
                    let chunk = &data[range];

                    thread::Builder::new().spawn_scoped(s, move || {
                        if let Some(topology) = topology {
                            pin_worker(topology.worker_core(worker_id), pin_warned);
                        }

                        scan_range(chunk, bitmap, mode)
                    })
                })
                .collect::<io::Result<Vec<_>>>()?;

            let mut total = ScanStats::default();
            for handle in handles {
                let worker_stats = handle.join().map_err(|_| io::Error::new(
                    io::ErrorKind::Other,
                    "scan worker panicked"
                ))?;
                total.merge(worker_stats);
            }

            Ok(total)
        })
    }
}

/// Pins the calling scan worker to `core_id`, best effort.
///
/// The first failure across all workers sharing `warned` prints a warning,
/// later ones stay quiet. Returns `true` if this call printed it.
fn pin_worker(core_id: usize, warned: &AtomicBool) -> bool {
    match platform::pin_current_thread(core_id) {
        Err(e) if !warned.swap(true, Ordering::Relaxed) => {
            eprintln_yellow!("warning: couldn't pin scan thread to core {core_id}: {e}");
            true
        }
        _ => false,
    }
}

/// Counts the distinct addresses in `path` with the default configuration.
#[inline]
pub fn count_unique(path: impl AsRef<Path>) -> io::Result<u64> {
    UniqueCounter::new(Config::default())
        .count_file(path)
        .map(|stats| stats.unique)
}
