#[inline]
pub fn format_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;

    if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.2} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

// ---------------
// Nightly implementation
// ----------------------
#[cfg(all(feature = "use_nightly", nightly))]
mod imp {
    use core::intrinsics;

    #[inline(always)]
    pub const fn unlikely(b: bool) -> bool {
        intrinsics::unlikely(b)
    }
}

// ---------------
// Stable fallback
// ---------------
#[cfg(not(all(feature = "use_nightly", nightly)))]
mod imp {
    #[inline(always)]
    pub const fn unlikely(b: bool) -> bool { b }
}

pub use imp::*;

#[macro_export]
macro_rules! eprintln_red {
    ($($arg:tt)*) => {{
        if $crate::cli::should_enable_ansi_coloring() {
            eprintln!(concat!("\x1b[1;31m", "{}", "\x1b[0m"), format_args!($($arg)*));
        } else {
            eprintln!($($arg)*);
        }
    }};
}

#[macro_export]
macro_rules! eprintln_yellow {
    ($($arg:tt)*) => {{
        if $crate::cli::should_enable_ansi_coloring() {
            eprintln!(concat!("\x1b[1;33m", "{}", "\x1b[0m"), format_args!($($arg)*));
        } else {
            eprintln!($($arg)*);
        }
    }};
}

#[macro_export]
macro_rules! eprint_green {
    ($($arg:tt)*) => {{
        if $crate::cli::should_enable_ansi_coloring() {
            eprint!(concat!("\x1b[1;32m", "{}", "\x1b[0m"), format_args!($($arg)*));
        } else {
            eprint!($($arg)*);
        }
    }};
}

#[macro_export]
macro_rules! eprint_blue {
    ($($arg:tt)*) => {{
        if $crate::cli::should_enable_ansi_coloring() {
            eprint!(concat!("\x1b[1;34m", "{}", "\x1b[0m"), format_args!($($arg)*));
        } else {
            eprint!($($arg)*);
        }
    }};
}
