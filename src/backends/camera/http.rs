// SPDX-License-Identifier: GPL-3.0-only

//! HTTP capture source
//!
//! Supports cameras that stream multipart MJPEG over HTTP as well as
//! endpoints that serve a single JPEG snapshot per request. The stream kind
//! is detected from the Content-Type of the initial response.

use super::CaptureSource;
use super::types::{CaptureError, CaptureResult, Frame};
use std::io::Read;
use tracing::info;

const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;

enum HttpStream {
    Mjpeg(MjpegStream),
    SingleJpeg,
}

/// HTTP MJPEG/JPEG capture source
pub struct HttpSource {
    url: String,
    stream: HttpStream,
    sequence: u64,
}

impl HttpSource {
    /// Connect to the stream URL. A connection failure is terminal for the
    /// loop instance that requested it.
    pub fn open(url: &str) -> CaptureResult<Self> {
        let response = ureq::get(url)
            .call()
            .map_err(|e| CaptureError::OpenFailed(format!("{}: {}", url, e)))?;

        let content_type = response.header("Content-Type").unwrap_or("").to_string();
        let stream = if content_type.to_lowercase().contains("multipart") {
            HttpStream::Mjpeg(MjpegStream::new(response.into_reader()))
        } else {
            HttpStream::SingleJpeg
        };

        info!(url, content_type, "Opened HTTP capture source");

        Ok(Self {
            url: url.to_string(),
            stream,
            sequence: 0,
        })
    }

    fn next_jpeg(&mut self) -> CaptureResult<Vec<u8>> {
        match &mut self.stream {
            HttpStream::Mjpeg(stream) => stream.read_next_jpeg(),
            HttpStream::SingleJpeg => fetch_single_jpeg(&self.url),
        }
    }
}

impl CaptureSource for HttpSource {
    fn read_frame(&mut self) -> CaptureResult<Frame> {
        let jpeg = self.next_jpeg()?;
        let image = image::load_from_memory(&jpeg)
            .map_err(|e| CaptureError::FrameUnavailable(format!("JPEG decode: {}", e)))?
            .to_rgb8();

        self.sequence += 1;
        Ok(Frame::new(image, self.sequence))
    }

    fn describe(&self) -> String {
        format!("http:{}", self.url)
    }
}

/// Incremental multipart MJPEG reader that scans for JPEG SOI/EOI markers
/// instead of trusting part boundaries.
struct MjpegStream {
    reader: Box<dyn Read + Send + Sync + 'static>,
    buffer: Vec<u8>,
}

impl MjpegStream {
    fn new(reader: Box<dyn Read + Send + Sync + 'static>) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(64 * 1024),
        }
    }

    fn read_next_jpeg(&mut self) -> CaptureResult<Vec<u8>> {
        let mut chunk = vec![0u8; 8192];
        loop {
            if let Some((start, end)) = find_jpeg_bounds(&self.buffer) {
                let frame = self.buffer[start..end].to_vec();
                self.buffer.drain(..end);
                return Ok(frame);
            }

            let read = self
                .reader
                .read(&mut chunk)
                .map_err(|e| CaptureError::FrameUnavailable(format!("read mjpeg chunk: {}", e)))?;
            if read == 0 {
                return Err(CaptureError::FrameUnavailable("mjpeg stream ended".into()));
            }
            self.buffer.extend_from_slice(&chunk[..read]);

            if self.buffer.len() > MAX_JPEG_BYTES * 2 {
                let keep = 2.min(self.buffer.len());
                let drain_len = self.buffer.len() - keep;
                self.buffer.drain(..drain_len);
            }
        }
    }
}

fn fetch_single_jpeg(url: &str) -> CaptureResult<Vec<u8>> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| CaptureError::FrameUnavailable(format!("fetch snapshot: {}", e)))?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| CaptureError::FrameUnavailable(format!("read snapshot: {}", e)))?;
    if bytes.is_empty() {
        return Err(CaptureError::FrameUnavailable("empty snapshot".into()));
    }
    Ok(bytes)
}

/// Locate one complete JPEG (SOI 0xFFD8 .. EOI 0xFFD9) in the buffer.
fn find_jpeg_bounds(buffer: &[u8]) -> Option<(usize, usize)> {
    let mut start = None;
    let mut i = 0;
    while i + 1 < buffer.len() {
        if buffer[i] == 0xFF && buffer[i + 1] == 0xD8 {
            start = Some(i);
            break;
        }
        i += 1;
    }
    let start = start?;
    let mut j = start + 2;
    while j + 1 < buffer.len() {
        if buffer[j] == 0xFF && buffer[j + 1] == 0xD9 {
            return Some((start, j + 2));
        }
        j += 1;
    }
    None
}
