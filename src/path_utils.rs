//! Path utilities: output naming for multi-part runs and path validation.

use crate::error::{Error, Result};

use std::path::{Path, PathBuf};

/// Converts a path to a string with fallback to lossy conversion.
pub fn path_to_string_lossy(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Checks a path for characters that break archive names or file systems.
///
/// # Arguments
///
/// * `path` - The path to validate
///
/// # Returns
///
/// * `Result<()>` - Ok if the path is valid, or an error describing the issue
pub fn validate_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidPath(
            path.to_path_buf(),
            "Path is empty".to_string(),
        ));
    }

    if path_to_string_lossy(path)
        .chars()
        .any(|c| matches!(c, '<' | '>' | '"' | '|' | '?' | '*') || c.is_control())
    {
        return Err(Error::InvalidPath(
            path.to_path_buf(),
            "Path contains invalid characters".to_string(),
        ));
    }

    Ok(())
}

/// Output file of part `index` (1-based) out of `total`.
///
/// A single part keeps `output` unchanged. Otherwise ` Part {i} of {n}` is
/// inserted before the extension, both numbers zero-padded to the digit count
/// of `total`: `book.epub` becomes `book Part 03 of 12.epub`.
pub fn part_output_path(output: &Path, index: usize, total: usize) -> PathBuf {
    if total <= 1 {
        return output.to_path_buf();
    }

    let width = total.to_string().len();
    let suffix = format!(" Part {:0width$} of {:0width$}", index, total, width = width);
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = match output.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };

    output.with_file_name(file_name)
}

/// Location of the temporary image storage for an output path: `{output}.tmp`.
pub fn image_storage_path(output: &Path) -> PathBuf {
    let mut path = output.as_os_str().to_os_string();
    path.push(".tmp");
    PathBuf::from(path)
}
