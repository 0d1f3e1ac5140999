//! Common test utilities for the Tankobon crate.
//!
//! Provides a scripted image processor that fills the image storage the way a
//! real processor would, temp directory helpers and archive inspection.

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use rand::seq::SliceRandom;
use rand::{Rng, distributions::Alphanumeric};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tankobon::error::{Error, Result};
use tankobon::prelude::*;
use tempfile::TempDir;

#[allow(dead_code)]
pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates a unique temporary directory, removed when dropped.
#[allow(dead_code)]
pub fn setup_test_dir(name: &str) -> TempDir {
    let rand_string: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    tempfile::Builder::new()
        .prefix(&format!("tankobon-{}-{}-", name, rand_string))
        .tempdir()
        .unwrap()
}

/// Description of one source page the fake processor produces.
#[derive(Debug, Clone)]
pub struct PageSpec {
    pub dir: String,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub double_page: bool,
    /// Produces two halves (`part` 1 and 2) instead of one page.
    pub split: bool,
    pub error: Option<String>,
    /// Bytes stored for each produced image.
    pub payload: usize,
}

impl PageSpec {
    #[allow(dead_code)]
    pub fn new(dir: &str, name: &str) -> Self {
        Self {
            dir: dir.to_string(),
            name: name.to_string(),
            width: 600,
            height: 800,
            double_page: false,
            split: false,
            error: None,
            payload: 256,
        }
    }

    #[allow(dead_code)]
    pub fn sized(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[allow(dead_code)]
    pub fn double_page(mut self) -> Self {
        self.double_page = true;
        self
    }

    #[allow(dead_code)]
    pub fn split(mut self) -> Self {
        self.split = true;
        self
    }

    #[allow(dead_code)]
    pub fn failing(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }

    #[allow(dead_code)]
    pub fn payload(mut self, bytes: usize) -> Self {
        self.payload = bytes;
        self
    }
}

/// Image processor returning the scripted pages in shuffled order.
///
/// `load` writes every page into the image storage at `storage_path`, unless
/// the processor was created with [`FakeProcessor::without_storage`].
pub struct FakeProcessor {
    pages: Vec<PageSpec>,
    storage_path: Option<PathBuf>,
    format: ImageFormat,
    /// Texts requested for cover and title art, as `name:text`.
    pub art_requests: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeProcessor {
    pub fn new(pages: Vec<PageSpec>, storage_path: PathBuf) -> Self {
        Self {
            pages,
            storage_path: Some(storage_path),
            format: ImageFormat::Jpeg,
            art_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn without_storage(pages: Vec<PageSpec>) -> Self {
        Self {
            pages,
            storage_path: None,
            format: ImageFormat::Jpeg,
            art_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn art_requests(&self) -> Vec<String> {
        self.art_requests.lock().unwrap().clone()
    }

    fn images(&self) -> Vec<Image> {
        let mut images = Vec::new();
        for (id, spec) in self.pages.iter().enumerate() {
            let parts: &[u8] = if spec.split { &[1, 2] } else { &[0] };
            for &part in parts {
                let width = if spec.split { spec.width / 2 } else { spec.width };
                images.push(Image {
                    id,
                    part,
                    raw: (id == 0).then(|| dummy_image(spec.width, spec.height)),
                    width,
                    height: spec.height,
                    double_page: spec.double_page,
                    path: PathBuf::from(&spec.dir),
                    name: spec.name.clone(),
                    format: self.format,
                    original_aspect_ratio: spec.width as f64 / spec.height as f64,
                    error: spec.error.as_ref().map(|e| Error::Other(e.clone())),
                });
            }
        }
        images
    }
}

#[async_trait]
impl ImageProcessor for FakeProcessor {
    async fn load(&self) -> Result<Vec<Image>> {
        let mut images = self.images();

        if let Some(storage_path) = &self.storage_path {
            let mut storage = ImageStorageWriter::create(storage_path)?;
            for img in &images {
                let spec = &self.pages[img.id];
                let mut payload = vec![0u8; spec.payload];
                rand::thread_rng().fill(&mut payload[..]);
                storage.add(&img.epub_img_path(), &payload)?;
            }
            storage.close()?;
        }

        // real processors deliver results as their workers finish
        images.shuffle(&mut rand::thread_rng());
        Ok(images)
    }

    fn cover_title_data(&self, options: &CoverTitleOptions<'_>) -> Result<Vec<u8>> {
        self.art_requests
            .lock()
            .unwrap()
            .push(format!("{}:{}", options.name, options.text));
        let src = match options.src {
            Some(src) => src.clone(),
            None => dummy_image(60, 80),
        };
        let mut buf = Cursor::new(Vec::new());
        src.write_to(&mut buf, image::ImageFormat::Jpeg)?;
        Ok(buf.into_inner())
    }
}

/// Solid color image used as decoded cover pixels.
#[allow(dead_code)]
pub fn dummy_image(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
    DynamicImage::ImageRgb8(img)
}

/// Names of the archive entries, in archive order.
#[allow(dead_code)]
pub fn zip_entry_names(path: &Path) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Reads one text entry of an archive.
#[allow(dead_code)]
pub fn read_zip_entry(path: &Path, name: &str) -> String {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}

/// Checks an output file is a valid EPUB container with `mimetype` first.
#[allow(dead_code)]
pub fn assert_valid_epub(path: &Path) {
    assert!(path.is_file(), "Output EPUB does not exist: {:?}", path);
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let first = archive.by_index(0).unwrap();
    assert_eq!(first.name(), "mimetype");
    assert_eq!(first.compression(), zip::CompressionMethod::Stored);
}
