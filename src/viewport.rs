//! Viewport normalization from the aspect ratios observed in the pages.

use std::collections::HashMap;

use log::debug;

use crate::types::{EpubPart, View};

/// Precision used when grouping aspect ratios (4 decimal places).
const ASPECT_RATIO_PRECISION: f64 = 10_000.0;

/// Most frequent aspect ratio across every cover and page of `parts`.
///
/// Ratios are rounded to 4 decimals before counting. On equal counts the value
/// met first in reading order wins. Returns `None` when there is no image.
pub fn dominant_aspect_ratio(parts: &[EpubPart]) -> Option<f64> {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    let mut order: Vec<i64> = Vec::new();

    for image in parts.iter().flat_map(|p| p.all_images()) {
        let key = (image.original_aspect_ratio * ASPECT_RATIO_PRECISION).round() as i64;
        let count = counts.entry(key).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }

    let mut best: Option<(i64, usize)> = None;
    for key in order {
        let count = counts[&key];
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((key, count));
        }
    }

    best.map(|(key, _)| key as f64 / ASPECT_RATIO_PRECISION)
}

impl View {
    /// Fits the view to `ratio` (width/height) without growing past the device size.
    pub fn fit_aspect_ratio(&mut self, ratio: f64) {
        if ratio <= 0.0 || !ratio.is_finite() {
            return;
        }
        let alt_width = (self.height as f64 * ratio).floor() as u32;
        let alt_height = (self.width as f64 / ratio).floor() as u32;
        if alt_width > self.width {
            self.height = alt_height;
        } else {
            self.width = alt_width;
        }
    }

    /// Applies the aspect ratio policy to the view, in place.
    ///
    /// `-1` keeps the device size, `0` uses [`dominant_aspect_ratio`], anything
    /// else is used as the target ratio.
    pub fn normalize(&mut self, parts: &[EpubPart]) {
        if self.aspect_ratio == -1.0 {
            return;
        }

        let ratio = if self.aspect_ratio == 0.0 {
            match dominant_aspect_ratio(parts) {
                Some(r) => r,
                None => return,
            }
        } else {
            self.aspect_ratio
        };

        self.fit_aspect_ratio(ratio);
        debug!(
            "View normalized to {}x{} for aspect ratio {:.4}",
            self.width, self.height, ratio
        );
    }
}
