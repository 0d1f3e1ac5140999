//! Fixed templates of the EPUB container, each rendered from a typed context.

use lazy_static::lazy_static;
use quick_xml::escape::escape;
use regex::{Captures, Regex};

use crate::types::View;

pub const CONTAINER: &str = include_str!("../../templates/Container.xml");
pub const APPLE_BOOKS: &str = include_str!("../../templates/AppleBooks.xml");

const TEXT: &str = include_str!("../../templates/Text.xhtml");
const BLANK: &str = include_str!("../../templates/Blank.xhtml");
const STYLE: &str = include_str!("../../templates/Style.css");

lazy_static! {
    static ref NEWLINES: Regex = Regex::new(r"\n+").unwrap();
    static ref PLACEHOLDER: Regex = Regex::new(r"%(\w+)%").unwrap();
}

/// Substitutes every `%name%` placeholder in a single pass, so inserted values
/// are never scanned again. Unknown names are left untouched.
fn fill<F>(template: &str, value: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let filled = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        value(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });
    collapse_newlines(&filled)
}

/// Collapses runs of newlines left by empty substitutions.
fn collapse_newlines(rendered: &str) -> String {
    NEWLINES.replace_all(rendered, "\n").into_owned()
}

/// Page showing a single image: regular pages, cover and title.
#[derive(Debug, Clone)]
pub struct PageTemplate<'a> {
    pub title: &'a str,
    pub view: &'a View,
    /// Image path relative to `OEBPS/`.
    pub image_path: &'a str,
    pub image_style: &'a str,
}

impl PageTemplate<'_> {
    pub fn render(&self) -> String {
        fill(TEXT, |name| match name {
            "title" => Some(escape(self.title).into_owned()),
            "viewport" => Some(self.view.viewport()),
            "src" => Some(escape(self.image_path).into_owned()),
            "style" => Some(escape(self.image_style).into_owned()),
            _ => None,
        })
    }
}

/// Empty interstitial page.
#[derive(Debug, Clone)]
pub struct BlankTemplate<'a> {
    pub title: &'a str,
    pub view: &'a View,
}

impl BlankTemplate<'_> {
    pub fn render(&self) -> String {
        fill(BLANK, |name| match name {
            "title" => Some(escape(self.title).into_owned()),
            "viewport" => Some(self.view.viewport()),
            _ => None,
        })
    }
}

/// Stylesheet sized to the view.
#[derive(Debug, Clone)]
pub struct StyleTemplate<'a> {
    pub view: &'a View,
}

impl StyleTemplate<'_> {
    pub fn render(&self) -> String {
        fill(STYLE, |name| match name {
            "foreground" => Some(self.view.color.foreground.clone()),
            "background" => Some(self.view.color.background.clone()),
            "width" => Some(self.view.width.to_string()),
            "height" => Some(self.view.height.to_string()),
            _ => None,
        })
    }
}
