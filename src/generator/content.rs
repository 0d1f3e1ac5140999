//! Package manifest (`content.opf`) and navigation document (`toc.xhtml`).
//!
//! Both documents list every entry of a part, so they share the blank page
//! policy of the part writer to stay consistent with the archive contents.

use std::sync::Arc;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{Error, Result};
use crate::generator::needs_blank_after;
use crate::tree::{Node, PathTree};
use crate::types::{Direction, Image, ImageOptions, View};

const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

type XmlWriter = Writer<Vec<u8>>;

fn new_document() -> Result<XmlWriter> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    Ok(writer)
}

fn finish_document(writer: XmlWriter) -> Result<String> {
    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Other(format!("Generated XML is not UTF-8: {}", e)))
}

fn start(writer: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut element = BytesStart::new(name);
    for attr in attrs {
        element.push_attribute(*attr);
    }
    writer.write_event(Event::Start(element))?;
    Ok(())
}

fn end(writer: &mut XmlWriter, name: &str) -> Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn empty(writer: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut element = BytesStart::new(name);
    for attr in attrs {
        element.push_attribute(*attr);
    }
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

fn text_element(
    writer: &mut XmlWriter,
    name: &str,
    attrs: &[(&str, &str)],
    text: &str,
) -> Result<()> {
    start(writer, name, attrs)?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    end(writer, name)
}

/// Everything the package manifest of one part is built from.
#[derive(Debug, Clone)]
pub struct ContentOptions<'a> {
    pub title: &'a str,
    pub has_title_page: bool,
    pub uid: &'a str,
    pub author: &'a str,
    pub publisher: &'a str,
    pub updated_at: &'a str,
    pub image_options: &'a ImageOptions,
    /// View after normalization.
    pub view: &'a View,
    pub cover: &'a Image,
    pub images: &'a [Arc<Image>],
    /// 1-based index of the part.
    pub current: usize,
    pub total: usize,
}

/// Alternates left/right spread placement along the spine.
struct SpreadCursor {
    rtl: bool,
    on_the_right: bool,
}

impl SpreadCursor {
    /// The cover opens the book alone, on the right for left-to-right reading.
    fn new(rtl: bool) -> Self {
        Self {
            rtl,
            on_the_right: rtl,
        }
    }

    fn next(&mut self, double_page: bool) -> &'static str {
        self.on_the_right = !self.on_the_right;
        if double_page {
            // a spread fills both sides, the next page starts a new pair
            self.on_the_right = !self.rtl;
            return "rendition:page-spread-center";
        }
        if self.on_the_right {
            "rendition:page-spread-right"
        } else {
            "rendition:page-spread-left"
        }
    }
}

struct ManifestItem {
    id: String,
    href: String,
    media_type: &'static str,
    properties: Option<&'static str>,
}

impl ManifestItem {
    fn new(id: impl Into<String>, href: impl Into<String>, media_type: &'static str) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            media_type,
            properties: None,
        }
    }

    fn with_properties(mut self, properties: &'static str) -> Self {
        self.properties = Some(properties);
        self
    }
}

struct SpineItem {
    idref: String,
    double_page: bool,
}

impl ContentOptions<'_> {
    fn is_last(&self, index: usize) -> bool {
        index + 1 == self.images.len()
    }

    fn manifest_items(&self) -> Vec<ManifestItem> {
        let format = self.image_options.format;
        let mut items = vec![
            ManifestItem::new("toc", "toc.xhtml", XHTML_MEDIA_TYPE).with_properties("nav"),
            ManifestItem::new("css", "Text/style.css", "text/css"),
            ManifestItem::new("page_cover", "Text/cover.xhtml", XHTML_MEDIA_TYPE),
            ManifestItem::new(
                "img_cover",
                format!("Images/cover.{}", format.extension()),
                format.media_type(),
            )
            .with_properties("cover-image"),
        ];

        if self.has_title_page {
            items.push(ManifestItem::new(
                "page_title",
                "Text/title.xhtml",
                XHTML_MEDIA_TYPE,
            ));
            items.push(ManifestItem::new(
                "img_title",
                format!("Images/title.{}", format.extension()),
                format.media_type(),
            ));
            if !self.image_options.view.portrait_only {
                items.push(ManifestItem::new(
                    "space_title",
                    "Text/space_title.xhtml",
                    XHTML_MEDIA_TYPE,
                ));
            }
        }

        for (index, img) in self.images.iter().enumerate() {
            items.push(ManifestItem::new(
                img.page_key(),
                img.page_path(),
                XHTML_MEDIA_TYPE,
            ));
            items.push(ManifestItem::new(
                img.img_key(),
                img.img_path(),
                img.format.media_type(),
            ));
            if needs_blank_after(img, self.is_last(index), self.image_options) {
                items.push(ManifestItem::new(
                    img.space_key(),
                    img.space_path(),
                    XHTML_MEDIA_TYPE,
                ));
            }
        }

        items
    }

    fn spine_items(&self) -> Vec<SpineItem> {
        let item = |idref: String, double_page: bool| SpineItem { idref, double_page };
        let mut items = vec![item("page_cover".to_string(), false)];

        if self.has_title_page {
            if !self.image_options.view.portrait_only {
                items.push(item("space_title".to_string(), false));
            }
            items.push(item("page_title".to_string(), false));
        }

        for (index, img) in self.images.iter().enumerate() {
            items.push(item(img.page_key(), img.double_page));
            if needs_blank_after(img, self.is_last(index), self.image_options) {
                items.push(item(img.space_key(), false));
            }
        }

        items
    }

    fn write_metadata(&self, writer: &mut XmlWriter) -> Result<()> {
        let portrait_only = self.image_options.view.portrait_only;
        let rtl = self.image_options.reading_direction == Direction::Rtl;
        let identifier = format!("urn:uuid:{}", self.uid);
        let resolution = format!("{}x{}", self.view.width, self.view.height);
        let current = self.current.to_string();

        start(
            writer,
            "metadata",
            &[
                ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
                ("xmlns:opf", "http://www.idpf.org/2007/opf"),
            ],
        )?;
        text_element(writer, "dc:identifier", &[("id", "ean")], &identifier)?;
        text_element(writer, "dc:title", &[], self.title)?;
        text_element(writer, "dc:language", &[], "en")?;
        text_element(writer, "dc:creator", &[], self.author)?;
        text_element(writer, "dc:publisher", &[], self.publisher)?;
        text_element(writer, "dc:contributor", &[], self.publisher)?;
        text_element(writer, "dc:date", &[], self.updated_at)?;
        text_element(
            writer,
            "meta",
            &[("property", "dcterms:modified")],
            self.updated_at,
        )?;
        empty(writer, "meta", &[("name", "cover"), ("content", "img_cover")])?;
        text_element(
            writer,
            "meta",
            &[("property", "rendition:layout")],
            "pre-paginated",
        )?;
        text_element(
            writer,
            "meta",
            &[("property", "rendition:spread")],
            if portrait_only { "none" } else { "auto" },
        )?;
        text_element(
            writer,
            "meta",
            &[("property", "rendition:orientation")],
            if portrait_only { "portrait" } else { "auto" },
        )?;
        empty(writer, "meta", &[("name", "fixed-layout"), ("content", "true")])?;
        empty(
            writer,
            "meta",
            &[("name", "original-resolution"), ("content", resolution.as_str())],
        )?;
        empty(writer, "meta", &[("name", "book-type"), ("content", "comic")])?;
        empty(
            writer,
            "meta",
            &[
                ("name", "primary-writing-mode"),
                (
                    "content",
                    if rtl { "horizontal-rl" } else { "horizontal-lr" },
                ),
            ],
        )?;
        empty(writer, "meta", &[("name", "zero-gutter"), ("content", "true")])?;
        empty(writer, "meta", &[("name", "zero-margin"), ("content", "true")])?;
        empty(
            writer,
            "meta",
            &[("name", "ke-border-color"), ("content", "#FFFFFF")],
        )?;
        empty(writer, "meta", &[("name", "ke-border-width"), ("content", "0")])?;
        empty(
            writer,
            "meta",
            &[
                ("name", "orientation-lock"),
                ("content", if portrait_only { "portrait" } else { "none" }),
            ],
        )?;
        empty(writer, "meta", &[("name", "region-mag"), ("content", "true")])?;

        if self.total > 1 {
            empty(
                writer,
                "meta",
                &[("name", "calibre:series"), ("content", self.title)],
            )?;
            empty(
                writer,
                "meta",
                &[("name", "calibre:series_index"), ("content", current.as_str())],
            )?;
            text_element(
                writer,
                "meta",
                &[("property", "belongs-to-collection"), ("id", "serie")],
                self.title,
            )?;
            text_element(
                writer,
                "meta",
                &[("refines", "#serie"), ("property", "collection-type")],
                "series",
            )?;
            text_element(
                writer,
                "meta",
                &[("refines", "#serie"), ("property", "group-position")],
                &current,
            )?;
        }

        end(writer, "metadata")
    }

    /// Renders `OEBPS/content.opf`.
    pub fn render(&self) -> Result<String> {
        let mut writer = new_document()?;
        start(
            &mut writer,
            "package",
            &[
                ("xmlns", "http://www.idpf.org/2007/opf"),
                ("unique-identifier", "ean"),
                ("version", "3.0"),
                ("prefix", "rendition: http://www.idpf.org/vocab/rendition/#"),
            ],
        )?;

        self.write_metadata(&mut writer)?;

        start(&mut writer, "manifest", &[])?;
        for item in self.manifest_items() {
            let mut attrs = vec![
                ("id", item.id.as_str()),
                ("href", item.href.as_str()),
                ("media-type", item.media_type),
            ];
            if let Some(properties) = item.properties {
                attrs.push(("properties", properties));
            }
            empty(&mut writer, "item", &attrs)?;
        }
        end(&mut writer, "manifest")?;

        let rtl = self.image_options.reading_direction == Direction::Rtl;
        let direction = self.image_options.reading_direction.to_string();
        start(
            &mut writer,
            "spine",
            &[("page-progression-direction", direction.as_str())],
        )?;
        let mut spread = SpreadCursor::new(rtl);
        for item in self.spine_items() {
            if self.image_options.view.portrait_only {
                empty(&mut writer, "itemref", &[("idref", item.idref.as_str())])?;
            } else {
                let properties = spread.next(item.double_page);
                empty(
                    &mut writer,
                    "itemref",
                    &[("idref", item.idref.as_str()), ("properties", properties)],
                )?;
            }
        }
        end(&mut writer, "spine")?;

        end(&mut writer, "package")?;
        finish_document(writer)
    }
}

fn write_toc_nodes(writer: &mut XmlWriter, nodes: &[Node]) -> Result<()> {
    for node in nodes.iter().filter(|n| !n.is_file()) {
        start(writer, "li", &[])?;
        let href = node.link.as_deref().unwrap_or("Text/cover.xhtml");
        text_element(writer, "a", &[("href", href)], &node.name)?;
        if node.children.iter().any(|c| !c.is_file()) {
            start(writer, "ol", &[])?;
            write_toc_nodes(writer, &node.children)?;
            end(writer, "ol")?;
        }
        end(writer, "li")?;
    }
    Ok(())
}

/// Renders `OEBPS/toc.xhtml`: the title page, then the source directories of
/// the part's pages, each linking to its first page.
pub fn render_toc(
    title: &str,
    has_title_page: bool,
    strip_first_directory: bool,
    images: &[Arc<Image>],
) -> Result<String> {
    let mut tree = PathTree::new();
    for img in images {
        tree.add_with_link(&img.path, None, Some(&img.page_path()));
    }
    let root = tree.display_root(true, strip_first_directory);

    let mut writer = new_document()?;
    start(
        &mut writer,
        "html",
        &[
            ("xmlns", "http://www.w3.org/1999/xhtml"),
            ("xmlns:epub", "http://www.idpf.org/2007/ops"),
        ],
    )?;
    start(&mut writer, "head", &[])?;
    text_element(&mut writer, "title", &[], title)?;
    end(&mut writer, "head")?;
    start(&mut writer, "body", &[])?;
    start(&mut writer, "nav", &[("epub:type", "toc"), ("id", "toc")])?;
    text_element(&mut writer, "h2", &[], title)?;
    start(&mut writer, "ol", &[])?;
    if has_title_page {
        start(&mut writer, "li", &[])?;
        text_element(&mut writer, "a", &[("href", "Text/title.xhtml")], title)?;
        end(&mut writer, "li")?;
    }
    if root.children.iter().any(|c| !c.is_file()) {
        write_toc_nodes(&mut writer, &root.children)?;
    } else if !has_title_page {
        // a navigation list needs at least one entry
        start(&mut writer, "li", &[])?;
        text_element(&mut writer, "a", &[("href", "Text/cover.xhtml")], title)?;
        end(&mut writer, "li")?;
    }
    end(&mut writer, "ol")?;
    end(&mut writer, "nav")?;
    end(&mut writer, "body")?;
    end(&mut writer, "html")?;
    finish_document(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn page(id: usize, dir: &str) -> Arc<Image> {
        Arc::new(Image {
            id,
            path: PathBuf::from(dir),
            name: format!("{:03}.jpg", id),
            ..Default::default()
        })
    }

    #[test]
    fn test_toc_strips_single_top_directory() -> Result<()> {
        let images = vec![page(1, "vol/ch1"), page(2, "vol/ch1"), page(3, "vol/ch2")];

        let toc = render_toc("Book", true, true, &images)?;
        assert!(toc.contains(r#"<a href="Text/title.xhtml">Book</a>"#));
        assert!(toc.contains(r#"<a href="Text/page_1_p0.xhtml">ch1</a>"#));
        assert!(toc.contains(r#"<a href="Text/page_3_p0.xhtml">ch2</a>"#));
        assert!(!toc.contains(">vol<"));

        let toc = render_toc("Book", true, false, &images)?;
        assert!(toc.contains(r#"<a href="Text/page_1_p0.xhtml">vol</a>"#));
        Ok(())
    }

    #[test]
    fn test_toc_without_directories_links_cover() -> Result<()> {
        let toc = render_toc("Flat", false, false, &[page(1, "")])?;
        assert!(toc.contains(r#"<a href="Text/cover.xhtml">Flat</a>"#));
        Ok(())
    }

    #[test]
    fn test_spread_cursor_alternates() {
        let mut ltr = SpreadCursor::new(false);
        assert_eq!(ltr.next(false), "rendition:page-spread-right");
        assert_eq!(ltr.next(false), "rendition:page-spread-left");
        assert_eq!(ltr.next(true), "rendition:page-spread-center");
        assert_eq!(ltr.next(false), "rendition:page-spread-left");
        assert_eq!(ltr.next(false), "rendition:page-spread-right");

        let mut rtl = SpreadCursor::new(true);
        assert_eq!(rtl.next(false), "rendition:page-spread-left");
        assert_eq!(rtl.next(false), "rendition:page-spread-right");
        assert_eq!(rtl.next(true), "rendition:page-spread-center");
        assert_eq!(rtl.next(false), "rendition:page-spread-right");
    }
}
