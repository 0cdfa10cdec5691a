#![allow(unused, unused_imports, dead_code, clippy::inline_always)]

pub use tracy_client::{span, Client};

/// Starts the profiler client when built with the `tracy` feature. Spans
/// created before this call (or without the feature) are no-ops.
#[inline(always)]
pub fn start() {
    #[cfg(feature = "tracy")] {
        _ = Client::start();
    }
}

/// # Panics
/// If no Tracy client is currently running.
#[inline(always)]
pub fn message(s: &str) {
    #[cfg(feature = "tracy")] {
        let c = Client::running().expect("message without a running Client");
        c.message(s, 0);
    }
}

/// Record a one-off plot value for a string name (creates plot if needed).
///
/// # Panics
/// If no Tracy client is currently running.
#[inline(always)]
pub fn plot_named(name: &str, value: f64) {
    #[cfg(feature = "tracy")] {
        let client = Client::running().expect("plot_named called without a running Client");
        let plot_name = tracy_client::PlotName::new_leak(name.into());
        client.plot(plot_name, value);
    }
}
