//! Bounded byte sources for image analysis.
//!
//! A [`ByteSource`] owns the bytes of one candidate image for the duration
//! of a single analysis. Paths are memory-mapped read-only; open handles are
//! drained into memory. Both enforce [`IOLimits::max_file_size`] before any
//! data is touched, and release the file on drop.

pub mod error;

use crate::io::error::{IoError, Result};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Defines the resource limits for I/O operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IOLimits {
    /// The absolute maximum file size that can be opened.
    pub max_file_size: u64,
}

impl Default for IOLimits {
    fn default() -> Self {
        Self {
            max_file_size: 512 * 1024 * 1024, // 512MB
        }
    }
}

enum Backing {
    // memmap cannot map empty files
    Empty,
    Mapped(Mmap),
    Owned(Vec<u8>),
}

/// The complete contents of one candidate image.
pub struct ByteSource {
    path: PathBuf,
    backing: Backing,
}

fn check_size(path: &Path, size: u64, limits: &IOLimits) -> Result<()> {
    if size > limits.max_file_size {
        warn!(
            path = %path.display(),
            size,
            limit = limits.max_file_size,
            "File is too large"
        );
        return Err(IoError::FileTooLarge {
            limit: limits.max_file_size,
            found: size,
        });
    }
    Ok(())
}

impl ByteSource {
    /// Opens a file and memory-maps it.
    ///
    /// Fails if the file size exceeds `limits.max_file_size`.
    pub fn open<P: AsRef<Path>>(path: P, limits: &IOLimits) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();

        debug!(
            path = %path.display(),
            size = file_size,
            limits.max_file_size = limits.max_file_size,
            "Opening file for analysis"
        );
        check_size(path, file_size, limits)?;

        let backing = if file_size == 0 {
            Backing::Empty
        } else {
            // Safety: read-only map of a regular file; the map is dropped with the source.
            Backing::Mapped(unsafe { Mmap::map(&file)? })
        };

        Ok(Self {
            path: path.to_path_buf(),
            backing,
        })
    }

    /// Reads an open handle from its start to its end into memory.
    ///
    /// `path` is only recorded for reporting.
    pub fn from_reader<R: Read + Seek>(
        path: impl Into<PathBuf>,
        reader: &mut R,
        limits: &IOLimits,
    ) -> Result<Self> {
        let path = path.into();
        let size = reader.seek(SeekFrom::End(0))?;
        check_size(&path, size, limits)?;
        reader.seek(SeekFrom::Start(0))?;

        let mut buf = Vec::with_capacity(size as usize);
        // The handle may grow between the size check and the read
        reader
            .by_ref()
            .take(limits.max_file_size.saturating_add(1))
            .read_to_end(&mut buf)?;
        check_size(&path, buf.len() as u64, limits)?;

        debug!(path = %path.display(), size = buf.len(), "Read image from handle");
        Ok(Self {
            path,
            backing: Backing::Owned(buf),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.backing {
            Backing::Empty => &[],
            Backing::Mapped(map) => &map[..],
            Backing::Owned(buf) => buf.as_slice(),
        }
    }

    /// Returns the total size of the source in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
