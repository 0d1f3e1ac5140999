//! Core data types and enums for the Tankobon assembly engine.
//!
//! This module defines the fundamental data structures used throughout Tankobon:
//! - Pages as delivered by the image processor (`Image`)
//! - Output archive slices (`EpubPart`)
//! - Rendering settings (`View`, `Color`, `ImageOptions`)
//! - Enumerations for various settings (`ImageFormat`, `Direction`, `TitlePage`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;

use crate::error::Error;

/// Encoding of the pre-rendered page images stored in the archive.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum ImageFormat {
    #[default]
    #[serde(rename = "jpeg")]
    Jpeg,
    #[serde(rename = "png")]
    Png,
}

impl ImageFormat {
    /// File extension used for image entries inside the archive.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// Defines the reading direction of the publication. `Rtl` is manga order.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ltr => write!(f, "ltr"),
            Direction::Rtl => write!(f, "rtl"),
        }
    }
}

/// When a title page is generated.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum TitlePage {
    Never,
    #[default]
    Always,
    /// Only when the work is split into more than one part.
    MultiPartOnly,
}

impl TitlePage {
    /// Resolves the policy for a run producing `total_parts` archives.
    pub fn enabled(&self, total_parts: usize) -> bool {
        match self {
            TitlePage::Never => false,
            TitlePage::Always => true,
            TitlePage::MultiPartOnly => total_parts > 1,
        }
    }
}

/// Foreground and background colors, as 3 or 6 digit hex strings without `#`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Color {
    pub foreground: String,
    pub background: String,
}

impl Default for Color {
    fn default() -> Self {
        Self {
            foreground: "000".to_string(),
            background: "FFF".to_string(),
        }
    }
}

/// Target rendering rectangle pages are composed against.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct View {
    pub width: u32,
    pub height: u32,
    /// `-1` keeps the device dimensions, `0` detects the ratio from the pages,
    /// a positive value forces that width/height ratio.
    pub aspect_ratio: f64,
    /// Disables blank interstitial pages and spread alignment.
    pub portrait_only: bool,
    pub color: Color,
}

impl Default for View {
    fn default() -> Self {
        Self {
            width: 1236,
            height: 1648,
            aspect_ratio: 0.0,
            portrait_only: false,
            color: Color::default(),
        }
    }
}

impl View {
    /// Content of the `viewport` meta tag of every page.
    pub fn viewport(&self) -> String {
        format!("width={},height={}", self.width, self.height)
    }
}

/// Settings describing how the pre-rendered images are laid out.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct ImageOptions {
    /// Use the first image as the shared cover instead of an ordinary page.
    pub has_cover: bool,
    pub reading_direction: Direction,
    /// Skip the blank page after the first half of a split double page.
    pub keep_double_page_if_split: bool,
    pub format: ImageFormat,
    pub view: View,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            has_cover: true,
            reading_direction: Direction::Ltr,
            keep_double_page_if_split: true,
            format: ImageFormat::Jpeg,
            view: View::default(),
        }
    }
}

/// One logical comic page as produced by the image processor.
#[derive(Debug, Default)]
pub struct Image {
    /// Ordinal position in reading order.
    pub id: usize,
    /// 0 when not split, 1/2 for the halves of a split double page.
    pub part: u8,
    /// Decoded pixels, only kept for images used as cover/title art.
    pub raw: Option<DynamicImage>,
    pub width: u32,
    pub height: u32,
    pub double_page: bool,
    /// Source-relative directory of the page.
    pub path: PathBuf,
    pub name: String,
    pub format: ImageFormat,
    /// Width/height of the source before any transform.
    pub original_aspect_ratio: f64,
    /// Terminal processing failure; the page slot is still written.
    pub error: Option<Error>,
}

impl Image {
    pub fn space_key(&self) -> String {
        format!("space_{}", self.id)
    }

    pub fn space_path(&self) -> String {
        format!("Text/{}.xhtml", self.space_key())
    }

    pub fn epub_space_path(&self) -> String {
        format!("OEBPS/{}", self.space_path())
    }

    pub fn page_key(&self) -> String {
        format!("page_{}_p{}", self.id, self.part)
    }

    pub fn page_path(&self) -> String {
        format!("Text/{}.xhtml", self.page_key())
    }

    pub fn epub_page_path(&self) -> String {
        format!("OEBPS/{}", self.page_path())
    }

    pub fn img_key(&self) -> String {
        format!("img_{}_p{}", self.id, self.part)
    }

    pub fn img_path(&self) -> String {
        format!("Images/{}.{}", self.img_key(), self.format.extension())
    }

    /// Key of the pre-rendered image, both in the image storage and in the archive.
    pub fn epub_img_path(&self) -> String {
        format!("OEBPS/{}", self.img_path())
    }

    /// Location of the page in the source, used in reports and previews.
    pub fn source_path(&self) -> PathBuf {
        self.path.join(&self.name)
    }

    /// Absolute positioning of the image centered in the view.
    ///
    /// `align` replaces the computed horizontal offset (e.g. `left:0`).
    pub fn img_style(&self, view_width: u32, view_height: u32, align: Option<&str>) -> String {
        let margin_w = (view_width as f64 - self.width as f64) / 2.0;
        let margin_h = (view_height as f64 - self.height as f64) / 2.0;
        let left = margin_w * 100.0 / view_width as f64;
        let top = margin_h * 100.0 / view_height as f64;

        let align = match align {
            Some(a) => a.to_string(),
            None => format!("left:{:.2}%", left),
        };

        format!(
            "width:{}px; height:{}px; top:{:.2}%; {};",
            self.width, self.height, top, align
        )
    }

    /// Segments of the source directory, in order, skipping `.` components.
    pub fn path_segments(&self) -> Vec<String> {
        path_segments(&self.path)
    }
}

pub(crate) fn path_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect()
}

/// One physical output archive: the shared cover plus a contiguous slice of pages.
#[derive(Debug, Clone)]
pub struct EpubPart {
    pub cover: Arc<Image>,
    pub images: Vec<Arc<Image>>,
}

impl EpubPart {
    /// Iterates the cover followed by every page of the part.
    pub fn all_images(&self) -> impl Iterator<Item = &Image> {
        std::iter::once(self.cover.as_ref()).chain(self.images.iter().map(|i| i.as_ref()))
    }
}
