//! Platform-specific process and thread tweaks
//!
//! This module provides cross-platform abstractions for:
//! - Raising the process scheduling priority
//! - Pinning the calling thread to a single CPU core

use std::io;

pub trait Platform {
    /// Set process priority (-20 to 19, lower = higher priority)
    /// Returns Ok(()) on success, Err on failure
    fn set_process_priority(priority: i32) -> io::Result<()>;

    /// Restrict the calling thread to run on `core_id` only
    fn pin_current_thread(core_id: usize) -> io::Result<()>;
}

//
// Linux implementation
//

#[cfg(target_os = "linux")]
pub mod linux {
    use super::*;

    pub struct LinuxPlatform;

    impl Platform for LinuxPlatform {
        fn set_process_priority(priority: i32) -> io::Result<()> {
            let result = unsafe {
                libc::setpriority(libc::PRIO_PROCESS, 0, priority)
            };

            if result == -1 {
                Err(io::Error::last_os_error())
            } else {
                Ok(())
            }
        }

        fn pin_current_thread(core_id: usize) -> io::Result<()> {
            if core_id >= libc::CPU_SETSIZE as usize {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("core {core_id} is out of cpu_set_t range")
                ));
            }

            let result = unsafe {
                let mut cpuset: libc::cpu_set_t = std::mem::zeroed();
                libc::CPU_SET(core_id, &mut cpuset);
                libc::sched_setaffinity(0, std::mem::size_of_val(&cpuset), &cpuset)
            };

            if result < 0 {
                Err(io::Error::last_os_error())
            } else {
                Ok(())
            }
        }
    }
}

//
// macOS implementation
//

#[cfg(target_os = "macos")]
pub mod macos {
    use super::*;

    pub struct MacOSPlatform;

    impl Platform for MacOSPlatform {
        fn set_process_priority(priority: i32) -> io::Result<()> {
            let result = unsafe {
                libc::setpriority(libc::PRIO_PROCESS, 0, priority)
            };

            if result == -1 {
                Err(io::Error::last_os_error())
            } else {
                Ok(())
            }
        }

        // No hard affinity on macOS, the scheduler only takes hints.
        fn pin_current_thread(_core_id: usize) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Unsupported, "thread pinning is not supported on macOS"))
        }
    }
}

//
// Everything else: no-ops that report themselves as unsupported
//

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub mod fallback {
    use super::*;

    pub struct FallbackPlatform;

    impl Platform for FallbackPlatform {
        fn set_process_priority(_priority: i32) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Unsupported, "process priority is not supported on this platform"))
        }

        fn pin_current_thread(_core_id: usize) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Unsupported, "thread pinning is not supported on this platform"))
        }
    }
}

//
// Platform type alias for current OS
//

#[cfg(target_os = "linux")]
pub type CurrentPlatform = linux::LinuxPlatform;

#[cfg(target_os = "macos")]
pub type CurrentPlatform = macos::MacOSPlatform;

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub type CurrentPlatform = fallback::FallbackPlatform;

//
// Convenience functions using CurrentPlatform
//

#[inline]
pub fn set_process_priority(priority: i32) -> io::Result<()> {
    CurrentPlatform::set_process_priority(priority)
}

#[inline]
pub fn pin_current_thread(core_id: usize) -> io::Result<()> {
    CurrentPlatform::pin_current_thread(core_id)
}
