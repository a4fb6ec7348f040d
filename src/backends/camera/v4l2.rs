// SPDX-License-Identifier: GPL-3.0-only

//! Local V4L2 capture source
//!
//! Opens a device node, negotiates a pixel format this crate can normalize
//! to RGB (native RGB3, MJPG via JPEG decode, or YUYV via BT.601 CPU
//! conversion), and pulls frames from a memory-mapped buffer stream.

use super::CaptureSource;
use super::types::{CaptureError, CaptureResult, Frame};
use image::RgbImage;
use ouroboros::self_referencing;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;

/// Pixel layouts the source knows how to normalize to RGB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelLayout {
    /// 24-bit packed RGB, used as-is
    Rgb3,
    /// Motion-JPEG, each buffer is a standalone JPEG image
    Mjpg,
    /// Packed 4:2:2 YUV (Y0 U Y1 V), converted on the CPU
    Yuyv,
}

impl PixelLayout {
    fn fourcc(self) -> v4l::FourCC {
        match self {
            PixelLayout::Rgb3 => v4l::FourCC::new(b"RGB3"),
            PixelLayout::Mjpg => v4l::FourCC::new(b"MJPG"),
            PixelLayout::Yuyv => v4l::FourCC::new(b"YUYV"),
        }
    }
}

/// Formats tried in order of preference (cheapest normalization first)
const PREFERRED_LAYOUTS: [PixelLayout; 3] =
    [PixelLayout::Rgb3, PixelLayout::Mjpg, PixelLayout::Yuyv];

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

/// V4L2 capture source for a local device node
pub struct V4l2Source {
    path: String,
    layout: PixelLayout,
    width: u32,
    height: u32,
    state: DeviceState,
    sequence: u64,
}

impl V4l2Source {
    /// Open a device and negotiate a supported pixel format.
    ///
    /// Any failure here is terminal for the loop instance that requested it.
    pub fn open(path: &str) -> CaptureResult<Self> {
        let mut device = v4l::Device::with_path(path)
            .map_err(|e| CaptureError::OpenFailed(format!("{}: {}", path, e)))?;

        let (layout, format) = negotiate_format(&mut device, path)?;

        info!(
            path,
            width = format.width,
            height = format.height,
            fourcc = ?format.fourcc,
            "Opened V4L2 capture source"
        );

        let state = DeviceStateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|e| CaptureError::OpenFailed(format!("buffer stream: {}", e)))
            },
        }
        .try_build()?;

        Ok(Self {
            path: path.to_string(),
            layout,
            width: format.width,
            height: format.height,
            state,
            sequence: 0,
        })
    }
}

impl CaptureSource for V4l2Source {
    fn read_frame(&mut self) -> CaptureResult<Frame> {
        let buf = self
            .state
            .with_mut(|fields| fields.stream.next().map(|(buf, _meta)| buf.to_vec()))
            .map_err(|e| CaptureError::FrameUnavailable(e.to_string()))?;

        let image = match self.layout {
            PixelLayout::Rgb3 => {
                let expected = (self.width * self.height * 3) as usize;
                if buf.len() < expected {
                    return Err(CaptureError::FrameUnavailable(format!(
                        "short RGB3 buffer: {} < {}",
                        buf.len(),
                        expected
                    )));
                }
                let mut pixels = buf;
                pixels.truncate(expected);
                RgbImage::from_raw(self.width, self.height, pixels).ok_or_else(|| {
                    CaptureError::FrameUnavailable("RGB3 buffer does not match dimensions".into())
                })?
            }
            PixelLayout::Mjpg => image::load_from_memory(&buf)
                .map_err(|e| CaptureError::FrameUnavailable(format!("JPEG decode: {}", e)))?
                .to_rgb8(),
            PixelLayout::Yuyv => {
                let pixels = yuyv_to_rgb(&buf, self.width, self.height);
                RgbImage::from_raw(self.width, self.height, pixels).ok_or_else(|| {
                    CaptureError::FrameUnavailable("YUYV conversion size mismatch".into())
                })?
            }
        };

        self.sequence += 1;
        Ok(Frame::new(image, self.sequence))
    }

    fn describe(&self) -> String {
        format!("v4l2:{}", self.path)
    }
}

/// Try the preferred pixel formats in order and return the first the device
/// accepts. Some drivers silently substitute a different fourcc, so the
/// format returned by `set_format` is the authority, not the request.
fn negotiate_format(
    device: &mut v4l::Device,
    path: &str,
) -> CaptureResult<(PixelLayout, v4l::Format)> {
    for layout in PREFERRED_LAYOUTS {
        let mut requested = device
            .format()
            .map_err(|e| CaptureError::OpenFailed(format!("query format: {}", e)))?;
        requested.fourcc = layout.fourcc();

        match device.set_format(&requested) {
            Ok(actual) if actual.fourcc == layout.fourcc() => {
                return Ok((layout, actual));
            }
            Ok(actual) => {
                debug!(path, requested = ?layout.fourcc(), got = ?actual.fourcc,
                    "Device substituted a different format");
            }
            Err(e) => {
                warn!(path, format = ?layout.fourcc(), error = %e, "Failed to set format");
            }
        }
    }

    Err(CaptureError::FormatNotSupported(format!(
        "{} offers none of RGB3/MJPG/YUYV",
        path
    )))
}

/// Convert packed YUYV (Y0 U Y1 V, 4 bytes per 2 pixels) to RGB using
/// BT.601 coefficients.
fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);

    for chunk in data.chunks_exact(4) {
        let y0 = chunk[0] as f32;
        let u = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v = chunk[3] as f32 - 128.0;

        for y in [y0, y1] {
            let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
            let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
            let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

            rgb.push(r);
            rgb.push(g);
            rgb.push(b);

            if rgb.len() >= pixel_count * 3 {
                break;
            }
        }
    }

    // Short device buffers pad out black rather than producing a torn image
    rgb.resize(pixel_count * 3, 0);
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_white_and_black() {
        // Y=235 U=V=128 is reference white; Y=16 is reference black
        let data = [235u8, 128, 16, 128];
        let rgb = yuyv_to_rgb(&data, 2, 1);
        assert_eq!(rgb.len(), 6);
        assert!(rgb[0] > 220 && rgb[1] > 220 && rgb[2] > 220);
        assert!(rgb[3] < 40 && rgb[4] < 40 && rgb[5] < 40);
    }

    #[test]
    fn test_yuyv_short_buffer_pads() {
        let data = [128u8, 128, 128, 128];
        // 4 pixels requested but the buffer only encodes 2
        let rgb = yuyv_to_rgb(&data, 4, 1);
        assert_eq!(rgb.len(), 12);
        assert_eq!(&rgb[6..], &[0, 0, 0, 0, 0, 0]);
    }
}
