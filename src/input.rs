//! Read-only memory-mapped view over the input file
//!
//! The file handle and the mapping live and die together: dropping a
//! [`MappedInput`] unmaps the bytes and then closes the file, on every path
//! out of the caller's scope.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};

use crate::tracy;

pub struct MappedInput {
    // Field order matters: the map is dropped before the file it was made from.
    mmap: Option<Mmap>,
    _file: File,
    path: PathBuf,
}

impl MappedInput {
    /// Opens `path` and maps all of it.
    ///
    /// Fails if the file can't be opened, stat'd or mapped, or isn't a regular
    /// file. An empty file is
    /// fine and yields an empty view (zero-length mappings are rejected by
    /// the OS, so nothing gets mapped at all).
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let _span = tracy::span!("MappedInput::open");

        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(false)
            .open(path)?;

        let metadata = file.metadata()?;
        if !metadata.is_file() {
            // FIFOs, devices and procfs entries report a length we can't map
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{path} is not a regular file", path = path.display())
            ));
        }

        let size = metadata.len();
        let size = usize::try_from(size).map_err(|_| io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{path} is too large to map ({size} bytes)", path = path.display())
        ))?;

        let mmap = if size == 0 {
            None
        } else {
            let mmap = unsafe {
                // SAFETY: the map is read-only and we never hand out a way to
                // mutate it. Concurrent truncation by another process is out
                // of our control, like for every mmap-based reader.
                MmapOptions::new()
                    .offset(0)
                    .len(size)
                    .map(&file)?
            };

            advise_sequential(&mmap);
            Some(mmap)
        };

        Ok(Self { mmap, _file: file, path: path.to_owned() })
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline(always)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::ops::Deref for MappedInput {
    type Target = [u8];

    #[inline(always)]
    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// We read every byte exactly once front to back; let the kernel read ahead
/// aggressively. Best effort, failure is ignored.
#[inline]
fn advise_sequential(mmap: &Mmap) {
    #[cfg(unix)]
    unsafe {
        // mmap'd memory always starts page-aligned
        libc::madvise(
            mmap.as_ptr() as *mut _,
            mmap.len(),
            libc::MADV_SEQUENTIAL,
        );
    }

    #[cfg(not(unix))]
    let _ = mmap;
}
