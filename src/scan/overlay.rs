// SPDX-License-Identifier: GPL-3.0-only

//! Overlay rendering
//!
//! Pure function of (frame, ROI rectangle, detection set) to an annotated
//! frame: the clamped ROI outline (green with detections, red without), a
//! red highlight per detected code, and a centered crosshair sized to 15%
//! of the shorter frame dimension. No state.

use crate::constants::{
    CROSSHAIR_COLOR, CROSSHAIR_FRACTION, DETECTION_COLOR, OVERLAY_LINE_THICKNESS,
    ROI_ACTIVE_COLOR, ROI_IDLE_COLOR,
};
use crate::scan::types::{DetectedCode, PixelRect};
use image::{Rgb, RgbImage};

/// Render annotations onto a copy of the raw frame.
pub fn render_overlay(frame: &RgbImage, roi: PixelRect, detections: &[DetectedCode]) -> RgbImage {
    let mut annotated = frame.clone();

    let roi_color = if detections.is_empty() {
        Rgb(ROI_IDLE_COLOR)
    } else {
        Rgb(ROI_ACTIVE_COLOR)
    };
    draw_rect_outline(&mut annotated, roi, roi_color);

    for code in detections {
        draw_rect_outline(&mut annotated, code.geometry, Rgb(DETECTION_COLOR));
    }

    draw_crosshair(&mut annotated);

    annotated
}

/// A blank (black) placeholder frame, published on shutdown to clear
/// downstream views.
pub fn blank_frame(width: u32, height: u32) -> RgbImage {
    RgbImage::new(width, height)
}

fn draw_rect_outline(image: &mut RgbImage, rect: PixelRect, color: Rgb<u8>) {
    if rect.is_empty() {
        return;
    }
    for t in 0..OVERLAY_LINE_THICKNESS {
        draw_hline(image, rect.x0, rect.x1, rect.y0.saturating_add(t), color);
        draw_hline(image, rect.x0, rect.x1, rect.y1.saturating_sub(1 + t), color);
        draw_vline(image, rect.x0.saturating_add(t), rect.y0, rect.y1, color);
        draw_vline(image, rect.x1.saturating_sub(1 + t), rect.y0, rect.y1, color);
    }
}

fn draw_crosshair(image: &mut RgbImage) {
    let (width, height) = image.dimensions();
    let size = (width.min(height) as f32 * CROSSHAIR_FRACTION) as u32;
    let half = size / 2;
    let cx = width / 2;
    let cy = height / 2;

    for t in 0..OVERLAY_LINE_THICKNESS {
        draw_hline(
            image,
            cx.saturating_sub(half),
            (cx + half).min(width),
            cy.saturating_add(t),
            Rgb(CROSSHAIR_COLOR),
        );
        draw_vline(
            image,
            cx.saturating_add(t),
            cy.saturating_sub(half),
            (cy + half).min(height),
            Rgb(CROSSHAIR_COLOR),
        );
    }
}

fn draw_hline(image: &mut RgbImage, x0: u32, x1: u32, y: u32, color: Rgb<u8>) {
    if y >= image.height() {
        return;
    }
    for x in x0..x1.min(image.width()) {
        image.put_pixel(x, y, color);
    }
}

fn draw_vline(image: &mut RgbImage, x: u32, y0: u32, y1: u32, color: Rgb<u8>) {
    if x >= image.width() {
        return;
    }
    for y in y0..y1.min(image.height()) {
        image.put_pixel(x, y, color);
    }
}
