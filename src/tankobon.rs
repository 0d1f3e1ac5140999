use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::task::spawn_blocking;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::generator::PartWriter;
use crate::partition::Partitioner;
use crate::path_utils::{
    image_storage_path, part_output_path, path_to_string_lossy, validate_path,
};
use crate::processor::ImageProcessor;
use crate::progress::{ProgressOptions, new_progress};
use crate::report::FailureReport;
use crate::storage::ImageStorageReader;
use crate::tree::PathTree;
use crate::types::{EpubPart, Image, ImageOptions, TitlePage};

/// Publisher written in the package metadata.
pub const PUBLISHER: &str = "Tankobon";

const UPDATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

lazy_static! {
    static ref HEX_COLOR: Regex = Regex::new(r"^([0-9A-Fa-f]{3}|[0-9A-Fa-f]{6})$").unwrap();
}

/// Configuration of one assembly run, built declaratively.
///
/// The image processor must have written every pre-rendered page to the image
/// storage next to the output (`{output}.tmp`) before [`TankobonConfig::convert`]
/// opens it. The storage file is removed once the run ends, successfully or not.
///
/// ```rust,no_run
/// # use tankobon::prelude::*;
/// # async fn run(processor: Arc<dyn ImageProcessor>) -> tankobon::error::Result<()> {
/// let config = TankobonConfig::builder()
///     .title("My Comic")
///     .output(PathBuf::from("out/My Comic.epub"))
///     .limit_mb(200u64)
///     .build()?;
///
/// config.preflight_check()?;
/// let report = config.convert(processor).await?;
/// println!("{} pages failed", report.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, derive_builder::Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct TankobonConfig {
    /// Title of the work. Split runs append ` [i/n]` per part.
    pub title: String,

    #[builder(default = "\"Tankobon\".to_string()")]
    pub author: String,

    /// Output EPUB path. Split runs insert ` Part i of n` before the extension.
    pub output: PathBuf,

    /// Size ceiling of each part in MiB, `0` for a single part.
    #[builder(default)]
    pub limit_mb: u64,

    /// Drops a single top-level directory from the table of contents.
    #[builder(default)]
    pub strip_first_directory_from_toc: bool,

    #[builder(default)]
    pub title_page: TitlePage,

    /// Only print the table of contents, write nothing.
    #[builder(default)]
    pub dry: bool,

    /// With `dry`, also print the cover and the file tree.
    #[builder(default)]
    pub dry_verbose: bool,

    /// Disables the progress bar.
    #[builder(default)]
    pub quiet: bool,

    /// Reports progress as JSON lines on stdout.
    #[builder(default)]
    pub json: bool,

    #[builder(default)]
    pub image: ImageOptions,
}

impl TankobonConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err("Title must not be empty".to_string());
            }
        }
        if let Some(output) = &self.output {
            if output.as_os_str().is_empty() {
                return Err("Output path must not be empty".to_string());
            }
        }
        if let Some(image) = &self.image {
            let view = &image.view;
            if view.width == 0 || view.height == 0 {
                return Err(format!(
                    "View dimensions must be positive, got {}x{}",
                    view.width, view.height
                ));
            }
            if !view.aspect_ratio.is_finite()
                || (view.aspect_ratio != -1.0 && view.aspect_ratio < 0.0)
            {
                return Err(format!(
                    "Aspect ratio must be -1, 0 or positive, got {}",
                    view.aspect_ratio
                ));
            }
            for color in [&view.color.foreground, &view.color.background] {
                if !HEX_COLOR.is_match(color) {
                    return Err(format!("Invalid hex color: {}", color));
                }
            }
        }
        Ok(())
    }
}

impl TankobonConfig {
    pub fn builder() -> TankobonConfigBuilder {
        TankobonConfigBuilder::default()
    }

    /// Checks that the output can be written before any processing starts.
    ///
    /// The output directory is created when missing.
    pub fn preflight_check(&self) -> Result<&Self> {
        if self.title.trim().is_empty() {
            return Err(Error::Other("Title is required".to_string()));
        }
        validate_path(&self.output)?;

        if self.output.file_name().is_none() {
            return Err(Error::InvalidPath(
                self.output.clone(),
                "Output path has no file name".to_string(),
            ));
        }
        if self.output.is_dir() {
            return Err(Error::InvalidPath(
                self.output.clone(),
                "Output path is a directory".to_string(),
            ));
        }

        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
                debug!("Created output directory '{}'", path_to_string_lossy(parent));
            }
        }

        Ok(self)
    }

    /// Location of the pre-rendered image storage.
    pub fn image_storage(&self) -> PathBuf {
        image_storage_path(&self.output)
    }

    /// Loads the pages from `processor`, then writes every part.
    ///
    /// Returns the pages whose processing failed upstream; they are also
    /// printed to stderr. A dry run writes nothing and returns an empty report.
    pub async fn convert(self, processor: Arc<dyn ImageProcessor>) -> Result<FailureReport> {
        let images = processor.load().await?;
        info!("Loaded {} images for '{}'", images.len(), self.title);

        spawn_blocking(move || {
            if self.dry {
                let mut stderr = std::io::stderr();
                self.preview(images, &mut stderr)?;
                return Ok(FailureReport::default());
            }
            self.assemble(processor.as_ref(), images)
        })
        .await?
    }

    /// Prints the table of contents the run would produce, without any storage access.
    pub fn preview<W: Write>(&self, images: Vec<Image>, writer: &mut W) -> Result<()> {
        let partitioner = Partitioner::new(self.image.has_cover, self.limit_mb);
        let parts = partitioner.single_part(images)?;
        let Some(part) = parts.first() else {
            return Ok(());
        };

        writeln!(
            writer,
            "TOC:\n  - {}\n{}",
            self.title,
            self.tree(part.images.iter().map(Arc::as_ref), true)
        )?;
        if self.dry_verbose {
            if self.image.has_cover {
                writeln!(
                    writer,
                    "Cover:\n{}",
                    self.tree(std::iter::once(part.cover.as_ref()), false)
                )?;
            }
            writeln!(
                writer,
                "Files:\n{}",
                self.tree(part.images.iter().map(Arc::as_ref), false)
            )?;
        }
        Ok(())
    }

    fn tree<'a>(&self, images: impl Iterator<Item = &'a Image>, directories_only: bool) -> String {
        let mut tree = PathTree::new();
        for img in images {
            let file = (!directories_only).then_some(img.name.as_str());
            tree.add(&img.path, file);
        }
        tree.display_root(directories_only, self.strip_first_directory_from_toc)
            .write_string("")
    }

    fn assemble(&self, processor: &dyn ImageProcessor, images: Vec<Image>) -> Result<FailureReport> {
        let mut storage = ImageStorageReader::open(&self.image_storage())?;

        let partitioner = Partitioner::new(self.image.has_cover, self.limit_mb);
        let parts = partitioner.partition(images, &mut storage)?;
        let total = parts.len();

        let mut image_options = self.image.clone();
        image_options.view.normalize(&parts);
        info!(
            "Writing {} part(s) with a {}x{} view",
            total, image_options.view.width, image_options.view.height
        );

        self.write_parts(processor, &mut storage, &parts, &image_options)?;

        let report = FailureReport::from_parts(&parts, self.image.has_cover);
        report.print();

        // every part is on disk, a leftover storage file does not fail the run
        if let Err(e) = storage.remove() {
            warn!(
                "Failed to remove image storage '{}': {}",
                path_to_string_lossy(storage.path()),
                e
            );
        }
        Ok(report)
    }

    fn write_parts(
        &self,
        processor: &dyn ImageProcessor,
        storage: &mut ImageStorageReader,
        parts: &[EpubPart],
        image_options: &ImageOptions,
    ) -> Result<()> {
        let total = parts.len();
        let uid = Uuid::new_v4().to_string();
        let updated_at = Utc::now().format(UPDATED_AT_FORMAT).to_string();

        let writer = PartWriter {
            title: &self.title,
            author: &self.author,
            publisher: PUBLISHER,
            uid: &uid,
            updated_at: &updated_at,
            image_options,
            has_title_page: self.title_page.enabled(total),
            strip_first_directory: self.strip_first_directory_from_toc,
            processor,
        };

        let mut progress = new_progress(ProgressOptions {
            max: total,
            description: "Writing Part".to_string(),
            current_job: 2,
            total_job: 2,
            quiet: self.quiet,
            json: self.json,
        });

        for (index, part) in parts.iter().enumerate() {
            let path = part_output_path(&self.output, index + 1, total);
            writer.write_part(storage, part, index + 1, total, &path)?;
            info!("Wrote part {}/{} to '{}'", index + 1, total, path_to_string_lossy(&path));
            if let Err(e) = progress.add(1) {
                warn!("Failed to report progress: {}", e);
            }
        }
        if let Err(e) = progress.close() {
            warn!("Failed to report progress: {}", e);
        }
        Ok(())
    }
}
