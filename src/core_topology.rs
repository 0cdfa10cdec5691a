use std::fs;
use std::num::NonZeroUsize;

use nohash_hasher::IntMap; // This is an overkill @Speed

#[inline]
fn num_cpus() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Which cores scan workers get pinned to. P-cores are handed out first.
#[derive(Debug, Clone)]
pub struct CoreTopology {
    pub p_cores: Box<[usize]>,
    pub e_cores: Box<[usize]>,
}

impl CoreTopology {
    /// Detect P-cores and E-cores on Linux by their base frequency
    pub fn detect() -> Self {
        let mut core_frequencies = IntMap::default();

        // -------------- Read base frequencies for all CPUs
        let entries = match fs::read_dir("/sys/devices/system/cpu") {
            Ok(entries) => entries,
            Err(_) => return Self::fallback(),
        };

        for entry in entries {
            let Ok(entry) = entry else { continue };
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            let Some(cpu_num) = name_str
                .strip_prefix("cpu")
                .and_then(|s| s.parse::<usize>().ok())
            else {
                continue
            };

            let freq_path = format!("/sys/devices/system/cpu/cpu{cpu_num}/cpufreq/base_frequency");
            if let Ok(Ok(freq)) = fs::read_to_string(&freq_path).map(|f| f.trim().parse::<u64>()) {
                core_frequencies.insert(cpu_num, freq);
            }
        }

        Self::from_frequencies(core_frequencies)
    }

    fn from_frequencies(core_frequencies: IntMap<usize, u64>) -> Self {
        if core_frequencies.len() < 2 {
            return Self::fallback();
        }

        // --------- Split at the midpoint between the slowest and fastest base clocks
        let min = core_frequencies.values().copied().min().unwrap_or(0);
        let max = core_frequencies.values().copied().max().unwrap_or(0);
        let threshold = min + (max - min) / 2;

        let (mut p_cores, mut e_cores): (Vec<_>, Vec<_>) = core_frequencies
            .iter()
            .partition(|&(_, &freq)| freq > threshold || min == max);

        // sort for deterministic behavior
        p_cores.sort_unstable();
        e_cores.sort_unstable();

        let p_cores = p_cores.into_iter().map(|(&cpu, _)| cpu).collect::<Box<[_]>>();
        let e_cores = e_cores.into_iter().map(|(&cpu, _)| cpu).collect::<Box<[_]>>();

        if p_cores.is_empty() {
            Self::fallback()
        } else {
            Self { p_cores, e_cores }
        }
    }

    /// Fallback when core detection fails - treat all cores as P-cores
    fn fallback() -> Self {
        Self {
            p_cores: (0..num_cpus()).collect(),
            e_cores: Box::default(),
        }
    }

    #[inline]
    pub fn is_hybrid(&self) -> bool {
        !self.e_cores.is_empty()
    }

    /// Core for the `worker_id`-th worker: P-cores round-robin, then
    /// E-cores once there are more workers than P-cores.
    #[inline]
    pub fn worker_core(&self, worker_id: usize) -> usize {
        let total = self.p_cores.len() + self.e_cores.len();
        if total == 0 {
            return worker_id % num_cpus();
        }

        let slot = worker_id % total;
        if slot < self.p_cores.len() {
            self.p_cores[slot]
        } else {
            self.e_cores[slot - self.p_cores.len()]
        }
    }
}
