//! Container writer: turns one [`EpubPart`] into a complete EPUB archive.
//!
//! Entries are written in a fixed order. Readers sniff the format from the
//! first entry, so `mimetype` always comes first, followed by the descriptors,
//! the cover, the optional title page and finally the pages.

use std::path::Path;

use log::debug;

use crate::error::Result;
use crate::processor::{CoverTitleOptions, ImageProcessor};
use crate::storage::ImageStorageReader;
use crate::types::{Direction, EpubPart, Image, ImageOptions};

pub mod archive;
pub mod content;
pub mod templates;

use archive::EpubZip;
use content::ContentOptions;
use templates::{APPLE_BOOKS, BlankTemplate, CONTAINER, PageTemplate, StyleTemplate};

/// Whether a blank page follows `img` to keep left/right pages aligned.
///
/// Never in portrait-only mode. Otherwise after a double page, after the first
/// half of a split page when split halves are not kept as a spread, and after
/// the last page of a part unless that page is a split half.
pub fn needs_blank_after(img: &Image, is_last: bool, options: &ImageOptions) -> bool {
    !options.view.portrait_only
        && (img.double_page
            || (!options.keep_double_page_if_split && img.part == 1)
            || (img.part == 0 && is_last))
}

/// Run-wide settings shared by every part of a conversion.
pub struct PartWriter<'a> {
    pub title: &'a str,
    pub author: &'a str,
    pub publisher: &'a str,
    pub uid: &'a str,
    pub updated_at: &'a str,
    /// Options with the view already normalized.
    pub image_options: &'a ImageOptions,
    pub has_title_page: bool,
    pub strip_first_directory: bool,
    pub processor: &'a dyn ImageProcessor,
}

impl PartWriter<'_> {
    /// Title of part `current` (1-based) out of `total`.
    pub fn part_title(&self, current: usize, total: usize) -> String {
        if total > 1 {
            format!("{} [{}/{}]", self.title, current, total)
        } else {
            self.title.to_string()
        }
    }

    /// Writes `part` to `path`. The first error aborts the part.
    pub fn write_part(
        &self,
        storage: &mut ImageStorageReader,
        part: &EpubPart,
        current: usize,
        total: usize,
        path: &Path,
    ) -> Result<()> {
        let title = self.part_title(current, total);
        let view = &self.image_options.view;

        let content = ContentOptions {
            title: &title,
            has_title_page: self.has_title_page,
            uid: self.uid,
            author: self.author,
            publisher: self.publisher,
            updated_at: self.updated_at,
            image_options: self.image_options,
            view,
            cover: &part.cover,
            images: &part.images,
            current,
            total,
        }
        .render()?;
        let toc = content::render_toc(
            &title,
            self.has_title_page,
            self.strip_first_directory,
            &part.images,
        )?;
        let style = StyleTemplate { view }.render();

        let mut epub = EpubZip::create(path)?;
        epub.write_magic()?;
        epub.write_content("META-INF/container.xml", CONTAINER.as_bytes())?;
        epub.write_content(
            "META-INF/com.apple.ibooks.display-options.xml",
            APPLE_BOOKS.as_bytes(),
        )?;
        epub.write_content("OEBPS/content.opf", content.as_bytes())?;
        epub.write_content("OEBPS/toc.xhtml", toc.as_bytes())?;
        epub.write_content("OEBPS/Text/style.css", style.as_bytes())?;

        self.write_cover(&mut epub, &part.cover, current, total)?;
        if self.has_title_page {
            self.write_title(&mut epub, &part.cover, &title)?;
        }

        let last = part.images.len().saturating_sub(1);
        for (index, img) in part.images.iter().enumerate() {
            self.write_image(&mut epub, storage, img)?;
            if needs_blank_after(img, index == last, self.image_options) {
                self.write_blank(&mut epub, img)?;
            }
        }

        epub.close()?;
        debug!(
            "Wrote {} pages to '{}'",
            part.images.len(),
            path.display()
        );
        Ok(())
    }

    fn art_path(&self, name: &str) -> String {
        format!("Images/{}.{}", name, self.image_options.format.extension())
    }

    fn write_cover(
        &self,
        epub: &mut EpubZip,
        cover: &Image,
        current: usize,
        total: usize,
    ) -> Result<()> {
        let view = &self.image_options.view;
        let (page_title, text) = if total > 1 {
            let text = format!("{} / {}", current, total);
            (format!("Cover {}", text), text)
        } else {
            ("Cover".to_string(), String::new())
        };

        let image_path = self.art_path("cover");
        let page = PageTemplate {
            title: &page_title,
            view,
            image_path: &image_path,
            image_style: &cover.img_style(view.width, view.height, None),
        }
        .render();
        epub.write_content("OEBPS/Text/cover.xhtml", page.as_bytes())?;

        let art = self
            .processor
            .cover_title_data(&CoverTitleOptions::cover(cover.raw.as_ref(), &text))?;
        epub.write_raw(&format!("OEBPS/{}", image_path), &art)
    }

    fn write_title(&self, epub: &mut EpubZip, cover: &Image, title: &str) -> Result<()> {
        let view = &self.image_options.view;
        let align = if view.portrait_only {
            None
        } else if self.image_options.reading_direction == Direction::Rtl {
            Some("right:0")
        } else {
            Some("left:0")
        };

        if !view.portrait_only {
            let blank = BlankTemplate {
                title: "Blank Page Title",
                view,
            }
            .render();
            epub.write_content("OEBPS/Text/space_title.xhtml", blank.as_bytes())?;
        }

        let image_path = self.art_path("title");
        let page = PageTemplate {
            title,
            view,
            image_path: &image_path,
            image_style: &cover.img_style(view.width, view.height, align),
        }
        .render();
        epub.write_content("OEBPS/Text/title.xhtml", page.as_bytes())?;

        let art = self
            .processor
            .cover_title_data(&CoverTitleOptions::title(cover.raw.as_ref(), title))?;
        epub.write_raw(&format!("OEBPS/{}", image_path), &art)
    }

    fn write_image(
        &self,
        epub: &mut EpubZip,
        storage: &mut ImageStorageReader,
        img: &Image,
    ) -> Result<()> {
        let view = &self.image_options.view;
        let page = PageTemplate {
            title: &format!("Image {} Part {}", img.id, img.part),
            view,
            image_path: &img.img_path(),
            image_style: &img.img_style(view.width, view.height, None),
        }
        .render();
        epub.write_content(&img.epub_page_path(), page.as_bytes())?;
        epub.copy(storage, &img.epub_img_path())
    }

    fn write_blank(&self, epub: &mut EpubZip, img: &Image) -> Result<()> {
        let blank = BlankTemplate {
            title: &format!("Blank Page {}", img.id),
            view: &self.image_options.view,
        }
        .render();
        epub.write_content(&img.epub_space_path(), blank.as_bytes())
    }
}
