//! Temporary storage of pre-rendered page images.
//!
//! The image processor writes every encoded page into a ZIP archive keyed by
//! its final path inside the EPUB (`OEBPS/Images/...`). The assembly engine
//! then reads stored sizes for partitioning and copies entries through to each
//! part without recompressing them.

use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use memmap2::{Mmap, MmapOptions};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};
use crate::partition::SizeLookup;
use crate::path_utils::path_to_string_lossy;

/// Writer side, used by image processors while rendering pages.
pub struct ImageStorageWriter {
    zip: ZipWriter<File>,
    options: SimpleFileOptions,
}

impl ImageStorageWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create image storage '{}': {}",
                    path_to_string_lossy(path),
                    e
                ),
            ))
        })?;
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        Ok(Self {
            zip: ZipWriter::new(file),
            options,
        })
    }

    /// Stores encoded image bytes under `key`.
    pub fn add(&mut self, key: &str, data: &[u8]) -> Result<()> {
        self.zip.start_file(key, self.options)?;
        self.zip.write_all(data)?;
        Ok(())
    }

    pub fn close(self) -> Result<()> {
        self.zip.finish()?;
        Ok(())
    }
}

/// Read-only view over the storage archive, shared by every part of a run.
///
/// The backing file is closed and removed when the reader is dropped, so an
/// early error return still cleans up.
pub struct ImageStorageReader {
    path: PathBuf,
    archive: Option<ZipArchive<Cursor<Mmap>>>,
    removed: bool,
}

impl ImageStorageReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to open image storage '{}': {}",
                    path_to_string_lossy(path),
                    e
                ),
            ))
        })?;
        let archive = match Self::map_archive(&file) {
            Ok(archive) => archive,
            Err(e) => {
                // no reader exists yet, so drop cannot clean up for us
                if let Err(remove_err) = std::fs::remove_file(path) {
                    warn!(
                        "Failed to remove image storage '{}': {}",
                        path_to_string_lossy(path),
                        remove_err
                    );
                }
                return Err(e);
            }
        };
        debug!(
            "Opened image storage '{}' with {} entries",
            path_to_string_lossy(path),
            archive.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            archive: Some(archive),
            removed: false,
        })
    }

    fn map_archive(file: &File) -> Result<ZipArchive<Cursor<Mmap>>> {
        // The storage file is private to the run and never written while mapped.
        let mmap = unsafe { MmapOptions::new().map(file)? };
        Ok(ZipArchive::new(Cursor::new(mmap))?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn archive(&mut self) -> Result<&mut ZipArchive<Cursor<Mmap>>> {
        self.archive
            .as_mut()
            .ok_or_else(|| Error::Unsupported("Image storage is closed".to_string()))
    }

    /// Stored (compressed) size of the entry `key`.
    pub fn size(&mut self, key: &str) -> Result<u64> {
        let entry = self.archive()?.by_name(key)?;
        Ok(entry.compressed_size())
    }

    pub fn contains(&self, key: &str) -> bool {
        match self.archive.as_ref() {
            Some(archive) => archive.index_for_name(key).is_some(),
            None => false,
        }
    }

    /// Copies the entry `key` into `dest` as-is, keeping its name and compression.
    pub fn copy_into<W: Write + Seek>(&mut self, key: &str, dest: &mut ZipWriter<W>) -> Result<()> {
        let entry = self.archive()?.by_name(key)?;
        dest.raw_copy_file(entry)?;
        Ok(())
    }

    /// Releases the mapping. Further lookups fail.
    pub fn close(&mut self) {
        self.archive = None;
    }

    /// Deletes the backing file. Removing twice, or a missing file, is not an error.
    pub fn remove(&mut self) -> Result<()> {
        if self.removed {
            return Ok(());
        }
        self.close();
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.removed = true;
        Ok(())
    }
}

impl SizeLookup for ImageStorageReader {
    fn size(&mut self, key: &str) -> Result<u64> {
        ImageStorageReader::size(self, key)
    }
}

impl Drop for ImageStorageReader {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            warn!(
                "Failed to remove image storage '{}': {}",
                path_to_string_lossy(&self.path),
                e
            );
        }
    }
}
