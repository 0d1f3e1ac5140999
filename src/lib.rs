//! Tankobon - Comic Page to EPUB Assembly Library
//!
//! This crate assembles pre-rendered comic pages into fixed-layout EPUB
//! archives. Pages are sorted into reading order, split into parts that stay
//! under a size ceiling, and each part is written as a complete EPUB with its
//! own cover, optional title page, table of contents and blank interstitial
//! pages that keep left/right spreads aligned.
//!
//! Decoding, cropping and resizing pages is left to an [`ImageProcessor`]
//! implementation. It delivers the page descriptions and writes the encoded
//! pages into the image storage (see [`storage::ImageStorageWriter`]), which
//! the assembly reads sizes from and copies entries out of.
//!
//! # Getting Started
//!
//! ```rust,no_run
//! use tankobon::prelude::*;
//!
//! # async fn run(processor: Arc<dyn ImageProcessor>) -> tankobon::error::Result<()> {
//! let config = TankobonConfig::builder()
//!     .title("My Comic")
//!     .author("Jane Doe")
//!     .output(PathBuf::from("out/My Comic.epub"))
//!     .limit_mb(200u64)
//!     .title_page(TitlePage::MultiPartOnly)
//!     .build()?;
//!
//! config.preflight_check()?;
//! let report = config.convert(processor).await?;
//! if !report.is_empty() {
//!     eprintln!("{} pages could not be processed", report.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! A size limit of 200 MiB on a 450 MiB work produces `My Comic Part 1 of 3.epub`
//! through `My Comic Part 3 of 3.epub`.

pub mod error;
pub mod generator;
pub mod partition;
pub mod path_utils;
pub mod processor;
pub mod progress;
pub mod report;
pub mod storage;
pub mod tankobon;
pub mod tree;
pub mod types;
pub mod viewport;

pub use processor::{CoverTitleOptions, ImageProcessor, TextAlign};
pub use tankobon::TankobonConfig;
pub use tankobon::TankobonConfigBuilder;

pub use types::{
    Color, Direction, EpubPart, Image, ImageFormat, ImageOptions, TitlePage, View,
};

/// Prelude module for convenient imports.
///
/// Re-exports the configuration, the processor seam and the core types, so
/// `use tankobon::prelude::*;` is enough to drive a conversion.
pub mod prelude {
    pub use super::{
        Color, CoverTitleOptions, Direction, EpubPart, Image, ImageFormat, ImageOptions,
        ImageProcessor, TankobonConfig, TankobonConfigBuilder, TextAlign, TitlePage, View, error,
        types,
    };
    pub use crate::report::FailureReport;
    pub use crate::storage::{ImageStorageReader, ImageStorageWriter};
    pub use std::path::{Path, PathBuf};
    pub use std::sync::Arc;
}
