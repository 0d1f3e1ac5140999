//! Output archive of one EPUB part.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::path_utils::path_to_string_lossy;
use crate::storage::ImageStorageReader;

const MIMETYPE: &[u8] = b"application/epub+zip";

/// Thin wrapper over [`ZipWriter`] enforcing the EPUB container rules.
///
/// Readers identify the format from the first entry, so [`EpubZip::write_magic`]
/// has to be called before anything else.
pub struct EpubZip {
    zip: Option<ZipWriter<File>>,
    stored: SimpleFileOptions,
    deflated: SimpleFileOptions,
}

impl EpubZip {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create output file '{}': {}",
                    path_to_string_lossy(path),
                    e
                ),
            ))
        })?;

        let stored = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .unix_permissions(0o644);
        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        Ok(Self {
            zip: Some(ZipWriter::new(file)),
            stored,
            deflated,
        })
    }

    fn zip(&mut self) -> Result<&mut ZipWriter<File>> {
        self.zip
            .as_mut()
            .ok_or_else(|| Error::Unsupported("Zip writer not available".to_string()))
    }

    /// Writes the uncompressed `mimetype` entry.
    pub fn write_magic(&mut self) -> Result<()> {
        let options = self.stored;
        let zip = self.zip()?;
        zip.start_file("mimetype", options)?;
        zip.write_all(MIMETYPE)?;
        Ok(())
    }

    /// Writes a text entry, deflated.
    pub fn write_content(&mut self, name: &str, content: &[u8]) -> Result<()> {
        let options = self.deflated;
        let zip = self.zip()?;
        zip.start_file(name, options)?;
        zip.write_all(content)?;
        Ok(())
    }

    /// Writes already encoded image bytes, stored as-is.
    pub fn write_raw(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let options = self.stored;
        let zip = self.zip()?;
        zip.start_file(name, options)?;
        zip.write_all(data)?;
        Ok(())
    }

    /// Copies a pre-rendered page from the storage without recompressing it.
    pub fn copy(&mut self, storage: &mut ImageStorageReader, key: &str) -> Result<()> {
        let zip = self.zip()?;
        storage.copy_into(key, zip)
    }

    /// Writes the central directory. The archive is unusable before this.
    pub fn close(&mut self) -> Result<()> {
        if let Some(zip) = self.zip.take() {
            zip.finish()?;
        }
        Ok(())
    }
}
