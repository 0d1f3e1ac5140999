//! Summary of the pages whose processing failed upstream.
//!
//! Failed pages are still written (their slot keeps the archive valid), so the
//! run succeeds and this report is the only place they surface.

use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;

use log::debug;

use crate::types::EpubPart;

/// One failing source image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFailure {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for ImageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error on image {}: {}", self.path.display(), self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailureReport {
    pub failures: Vec<ImageFailure>,
}

impl FailureReport {
    /// Collects failures across all parts.
    ///
    /// The shared cover is checked once, on the first part, and only in cover
    /// mode (otherwise it is also the first page). Split halves (`part != 0`)
    /// are skipped, so a failing double page is reported a single time.
    pub fn from_parts(parts: &[EpubPart], has_cover: bool) -> Self {
        let mut failures = Vec::new();
        for (index, part) in parts.iter().enumerate() {
            if index == 0 && has_cover {
                if let Some(error) = &part.cover.error {
                    failures.push(ImageFailure {
                        path: part.cover.source_path(),
                        message: error.to_string(),
                    });
                }
            }
            for img in part.images.iter().filter(|i| i.part == 0) {
                if let Some(error) = &img.error {
                    failures.push(ImageFailure {
                        path: img.source_path(),
                        message: error.to_string(),
                    });
                }
            }
        }
        Self { failures }
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// One line per failure, then an empty separator line if there was any.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for failure in &self.failures {
            writeln!(writer, "{}", failure)?;
        }
        if !self.is_empty() {
            writeln!(writer)?;
        }
        Ok(())
    }

    /// Best-effort print to stderr; never fails.
    pub fn print(&self) {
        if let Err(e) = self.write_to(&mut io::stderr()) {
            debug!("Failed to print failure report: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::Image;
    use std::sync::Arc;

    fn image(id: usize, part: u8, error: Option<&str>) -> Arc<Image> {
        Arc::new(Image {
            id,
            part,
            path: PathBuf::from("chap1"),
            name: format!("{:03}.jpg", id),
            error: error.map(|e| Error::Other(e.to_string())),
            ..Default::default()
        })
    }

    #[test]
    fn test_unsplit_failure_reported_once() {
        let parts = vec![EpubPart {
            cover: image(0, 0, None),
            images: vec![image(1, 0, Some("corrupt")), image(2, 0, None)],
        }];
        let report = FailureReport::from_parts(&parts, true);
        assert_eq!(report.len(), 1);
        assert_eq!(
            report.failures[0].to_string(),
            format!(
                "Error on image {}: Other error: corrupt",
                PathBuf::from("chap1").join("001.jpg").display()
            )
        );
    }

    #[test]
    fn test_split_halves_are_not_reported() {
        let parts = vec![EpubPart {
            cover: image(0, 0, None),
            images: vec![image(1, 1, Some("bad")), image(1, 2, Some("bad"))],
        }];
        assert!(FailureReport::from_parts(&parts, true).is_empty());
    }

    #[test]
    fn test_cover_checked_on_first_part_only() {
        let cover = image(0, 0, Some("cover failed"));
        let parts = vec![
            EpubPart {
                cover: Arc::clone(&cover),
                images: vec![image(1, 0, None)],
            },
            EpubPart {
                cover: Arc::clone(&cover),
                images: vec![image(2, 0, None)],
            },
        ];
        assert_eq!(FailureReport::from_parts(&parts, true).len(), 1);
        assert!(FailureReport::from_parts(&parts, false).is_empty());
    }

    #[test]
    fn test_write_to_adds_separator() -> io::Result<()> {
        let parts = vec![EpubPart {
            cover: image(0, 0, None),
            images: vec![image(1, 0, Some("x"))],
        }];
        let mut out = Vec::new();
        FailureReport::from_parts(&parts, true).write_to(&mut out)?;
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.lines().count(), 2);
        assert!(out.ends_with("\n\n"));

        let mut empty = Vec::new();
        FailureReport::default().write_to(&mut empty)?;
        assert!(empty.is_empty());
        Ok(())
    }
}
