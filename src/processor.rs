//! Interface to the image processor that prepares pages before assembly.
//!
//! Decoding, cropping, resizing and splitting pages happen upstream. The
//! processor hands over a complete list of [`Image`] descriptions, with the
//! encoded pages already written to the image storage, and renders the cover
//! and title art on request.

use async_trait::async_trait;
use image::DynamicImage;

use crate::error::Result;
use crate::types::Image;

/// Vertical placement of the text drawn over cover or title art.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Bottom,
    Center,
}

/// Typography parameters for cover and title art.
#[derive(Debug, Clone)]
pub struct CoverTitleOptions<'a> {
    /// Pixels of the cover page, when the processor kept them.
    pub src: Option<&'a DynamicImage>,
    /// `cover` or `title`, the base name of the produced entry.
    pub name: &'a str,
    /// Text to draw, empty for none.
    pub text: &'a str,
    pub align: TextAlign,
    /// Width of the text box, in percent of the image width.
    pub pct_width: u32,
    /// Margin around the text box, in percent of its size.
    pub pct_margin: u32,
    pub max_font_size: u32,
    pub border_size: u32,
}

impl<'a> CoverTitleOptions<'a> {
    /// Cover art: part indicator at the bottom.
    pub fn cover(src: Option<&'a DynamicImage>, text: &'a str) -> Self {
        Self {
            src,
            name: "cover",
            text,
            align: TextAlign::Bottom,
            pct_width: 50,
            pct_margin: 50,
            max_font_size: 96,
            border_size: 8,
        }
    }

    /// Title art: the title centered over the whole width.
    pub fn title(src: Option<&'a DynamicImage>, text: &'a str) -> Self {
        Self {
            src,
            name: "title",
            text,
            align: TextAlign::Center,
            pct_width: 100,
            pct_margin: 100,
            max_font_size: 64,
            border_size: 4,
        }
    }
}

/// Upstream collaborator producing the pages and the cover/title art.
#[async_trait]
pub trait ImageProcessor: Send + Sync {
    /// Processes every source page.
    ///
    /// Results may come back in any order; a page whose processing failed
    /// carries its error in [`Image::error`] instead of failing the call.
    async fn load(&self) -> Result<Vec<Image>>;

    /// Renders cover or title art and returns the encoded image bytes.
    fn cover_title_data(&self, options: &CoverTitleOptions<'_>) -> Result<Vec<u8>>;
}
