//! Splitting of the sorted page list into size-bounded EPUB parts.
//!
//! Each part's estimated size is a fixed base overhead (descriptors, cover and
//! title art) plus, for every page, the stored image size and a fixed markup
//! allowance. The ceiling is soft: a page is never split or dropped, and a part
//! always receives at least one page even if that page alone is too large.

use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::types::{EpubPart, Image};

/// Allowance for the XHTML page wrapping each image.
pub const XHTML_PAGE_SIZE: u64 = 1024;
/// Allowance for the descriptor entries (container, manifest, toc, style).
pub const DESCRIPTOR_SIZE: u64 = 128 * 1024;

const MB: u64 = 1024 * 1024;

/// Source of the stored size of a pre-rendered image, by storage key.
pub trait SizeLookup {
    fn size(&mut self, key: &str) -> Result<u64>;
}

impl<F> SizeLookup for F
where
    F: FnMut(&str) -> Result<u64>,
{
    fn size(&mut self, key: &str) -> Result<u64> {
        self(key)
    }
}

/// Sorts images into reading order: by `id`, then by split `part`.
///
/// The sort is stable so identical keys keep their delivery order.
pub fn sort_images(images: &mut [Image]) {
    images.par_sort_by(|a, b| (a.id, a.part).cmp(&(b.id, b.part)));
}

/// Computes part boundaries for a run.
#[derive(Debug, Clone, Copy)]
pub struct Partitioner {
    has_cover: bool,
    max_size: u64,
}

impl Partitioner {
    /// `limit_mb` of 0 means unbounded. Limits past `u64::MAX` bytes saturate.
    pub fn new(has_cover: bool, limit_mb: u64) -> Self {
        Self::with_max_size(has_cover, limit_mb.saturating_mul(MB))
    }

    /// Ceiling expressed in bytes, 0 means unbounded.
    pub fn with_max_size(has_cover: bool, max_size: u64) -> Self {
        Self {
            has_cover,
            max_size,
        }
    }

    /// Sorts the images and separates the shared cover from the pages.
    ///
    /// Without cover mode the first image is the cover *and* stays the first page.
    pub fn split_cover(&self, mut images: Vec<Image>) -> Result<(Arc<Image>, Vec<Arc<Image>>)> {
        if images.is_empty() {
            return Err(Error::NotFound("No image to assemble".to_string()));
        }
        sort_images(&mut images);

        let mut images: Vec<Arc<Image>> = images.into_iter().map(Arc::new).collect();
        let cover = if self.has_cover {
            images.remove(0)
        } else {
            Arc::clone(&images[0])
        };
        Ok((cover, images))
    }

    /// Puts every page in a single part, without any size lookup.
    pub fn single_part(&self, images: Vec<Image>) -> Result<Vec<EpubPart>> {
        let (cover, images) = self.split_cover(images)?;
        Ok(vec![EpubPart { cover, images }])
    }

    /// Walks the pages in reading order, closing a part whenever the next page
    /// would push a non-empty part past the ceiling.
    pub fn partition<S>(&self, images: Vec<Image>, sizes: &mut S) -> Result<Vec<EpubPart>>
    where
        S: SizeLookup + ?Sized,
    {
        let (cover, images) = self.split_cover(images)?;

        let base_size =
            DESCRIPTOR_SIZE.saturating_add(sizes.size(&cover.epub_img_path())?.saturating_mul(2));
        let mut current_size = base_size;
        let mut current_images: Vec<Arc<Image>> = Vec::new();
        let mut parts: Vec<EpubPart> = Vec::new();

        for img in images {
            let img_size = sizes.size(&img.epub_img_path())? + XHTML_PAGE_SIZE;
            if self.max_size > 0
                && !current_images.is_empty()
                && current_size.saturating_add(img_size) > self.max_size
            {
                debug!(
                    "Closing part {} with {} pages ({} bytes)",
                    parts.len() + 1,
                    current_images.len(),
                    current_size
                );
                parts.push(EpubPart {
                    cover: Arc::clone(&cover),
                    images: std::mem::take(&mut current_images),
                });
                current_size = base_size;
            }
            current_size = current_size.saturating_add(img_size);
            current_images.push(img);
        }

        if !current_images.is_empty() || parts.is_empty() {
            parts.push(EpubPart {
                cover: Arc::clone(&cover),
                images: current_images,
            });
        }

        info!("Pages split into {} part(s)", parts.len());
        Ok(parts)
    }
}
