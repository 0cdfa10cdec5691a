use std::io::{self, IsTerminal};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::OnceLock;

use clap::Parser;

use crate::counter::Config;
use crate::parser::ParseMode;

#[derive(Parser)]
#[command(
    name = "ipcount",
    about = "Count unique IPv4 addresses in a newline-delimited file",
    long_about = None,
    version = "1.0",
    arg_required_else_help = true,
)]
pub struct Cli {
    /// File with one dotted-decimal IPv4 address per line
    #[arg(value_name = "FILE")]
    pub path: PathBuf,

    /// Number of scan threads
    #[arg(short = 'j', long, value_name = "N", default_value_t = default_threads())]
    pub threads: NonZeroUsize,

    /// Number of threads for the final bit count
    #[arg(long, value_name = "N", default_value_t = default_threads())]
    pub reduce_threads: NonZeroUsize,

    /// Skip (and report) lines that aren't well-formed IPv4 addresses
    ///
    /// Without this flag every line is folded into some address, which is
    /// faster but counts garbage lines as if they were valid.
    #[arg(long)]
    pub strict: bool,

    /// Pin scan threads to CPU cores (Linux only)
    #[arg(long)]
    pub pin: bool,

    /// Print statistics at the end
    #[arg(short, long)]
    pub stats: bool,
}

impl Cli {
    #[inline(always)]
    pub const fn parse_mode(&self) -> ParseMode {
        if self.strict { ParseMode::Strict } else { ParseMode::Permissive }
    }
}

impl From<&Cli> for Config {
    #[inline]
    fn from(cli: &Cli) -> Self {
        Config {
            scan_threads: cli.threads,
            reduce_threads: cli.reduce_threads,
            mode: cli.parse_mode(),
            pin_threads: cli.pin,
        }
    }
}

#[inline]
pub fn default_threads() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

/// Colour diagnostics only when a human is looking at stderr.
#[inline]
pub fn should_enable_ansi_coloring() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| io::stderr().is_terminal())
}
