// SPDX-License-Identifier: GPL-3.0-only

//! Optical code decoding over a frame region
//!
//! Decoding itself is delegated to rqrr. This adapter crops the region,
//! prepares a grayscale image (downscaled when large), and translates each
//! hit's geometry back into frame coordinates by adding the crop origin.
//! A candidate whose payload fails to decode as text is dropped on its own;
//! the other candidates in the same frame are unaffected.

use crate::constants::DECODER_MAX_DIMENSION;
use crate::scan::types::{DetectedCode, PixelRect};
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Region decoder
///
/// Regions larger than `max_dimension` on either side are downscaled before
/// decoding and hit geometry is scaled back up afterwards.
pub struct CodeDecoder {
    max_dimension: u32,
}

impl Default for CodeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeDecoder {
    pub fn new() -> Self {
        Self {
            max_dimension: DECODER_MAX_DIMENSION,
        }
    }

    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    /// Decode all codes within `region` of `frame`.
    ///
    /// Returns raw hits in decoder order; the same payload may appear more
    /// than once (overlapping hits), so callers run [`dedup_detections`]
    /// over the result.
    pub fn decode_region(&self, frame: &RgbImage, region: PixelRect) -> Vec<DetectedCode> {
        if region.is_empty() {
            return Vec::new();
        }

        let crop = imageops::crop_imm(frame, region.x0, region.y0, region.width(), region.height())
            .to_image();
        let gray: GrayImage = image::DynamicImage::ImageRgb8(crop).to_luma8();

        let longest = gray.width().max(gray.height());
        let (gray, scale) = if self.max_dimension > 0 && longest > self.max_dimension {
            let scale = longest as f32 / self.max_dimension as f32;
            let new_w = ((gray.width() as f32 / scale) as u32).max(1);
            let new_h = ((gray.height() as f32 / scale) as u32).max(1);
            (imageops::resize(&gray, new_w, new_h, FilterType::Nearest), scale)
        } else {
            (gray, 1.0)
        };

        let mut prepared = rqrr::PreparedImage::prepare(gray);
        let grids = prepared.detect_grids();
        trace!(candidates = grids.len(), "Grid detection complete");

        let mut detections = Vec::with_capacity(grids.len());
        for grid in grids {
            let payload = match grid.decode() {
                Ok((_meta, content)) => content,
                Err(e) => {
                    debug!(error = %e, "Dropping undecodable candidate");
                    continue;
                }
            };

            let geometry = grid_bounds_to_frame(&grid.bounds, scale, region, frame);
            debug!(payload = %payload, ?geometry, "Decoded code");
            detections.push(DetectedCode::new(payload, geometry));
        }

        detections
    }
}

/// Convert rqrr corner points (crop space, possibly downscaled) into a
/// bounding rectangle in frame coordinates.
fn grid_bounds_to_frame(
    bounds: &[rqrr::Point; 4],
    scale: f32,
    region: PixelRect,
    frame: &RgbImage,
) -> PixelRect {
    let xs = bounds.iter().map(|p| p.x).collect::<Vec<_>>();
    let ys = bounds.iter().map(|p| p.y).collect::<Vec<_>>();
    let min_x = xs.iter().copied().min().unwrap_or(0).max(0) as f32 * scale;
    let max_x = xs.iter().copied().max().unwrap_or(0).max(0) as f32 * scale;
    let min_y = ys.iter().copied().min().unwrap_or(0).max(0) as f32 * scale;
    let max_y = ys.iter().copied().max().unwrap_or(0).max(0) as f32 * scale;

    let x0 = (region.x0 + min_x as u32).min(frame.width());
    let x1 = (region.x0 + max_x as u32).min(frame.width());
    let y0 = (region.y0 + min_y as u32).min(frame.height());
    let y1 = (region.y0 + max_y as u32).min(frame.height());

    PixelRect::new(x0.min(x1), y0.min(y1), x1, y1)
}

/// Collapse a raw per-frame hit list into a set with unique payloads.
///
/// When the same payload appears more than once (e.g. two overlapping
/// hits), the first occurrence's geometry is kept and the rest discarded.
pub fn dedup_detections(raw: Vec<DetectedCode>) -> Vec<DetectedCode> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter(|code| seen.insert(code.payload.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(payload: &str, x0: u32) -> DetectedCode {
        DetectedCode::new(payload.to_string(), PixelRect::new(x0, 0, x0 + 10, 10))
    }

    #[test]
    fn test_dedup_keeps_first_geometry() {
        let raw = vec![code("X", 0), code("X", 50), code("Y", 20)];
        let deduped = dedup_detections(raw);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].payload, "X");
        assert_eq!(deduped[0].geometry.x0, 0);
        assert_eq!(deduped[1].payload, "Y");
    }

    #[test]
    fn test_dedup_empty() {
        assert!(dedup_detections(Vec::new()).is_empty());
    }

    #[test]
    fn test_dedup_all_distinct() {
        let raw = vec![code("A", 0), code("B", 10), code("C", 20)];
        assert_eq!(dedup_detections(raw).len(), 3);
    }

    #[test]
    fn test_decode_empty_region_yields_nothing() {
        let frame = RgbImage::new(100, 100);
        let decoder = CodeDecoder::new();
        let region = PixelRect::new(50, 50, 50, 80);
        assert!(decoder.decode_region(&frame, region).is_empty());
    }

    #[test]
    fn test_decode_blank_region_yields_nothing() {
        let frame = RgbImage::new(100, 100);
        let decoder = CodeDecoder::new();
        assert!(decoder.decode_region(&frame, PixelRect::full(100, 100)).is_empty());
    }
}
