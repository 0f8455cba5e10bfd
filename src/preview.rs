//! Scrub-preview extraction: one small JPEG per (file, timestamp) request.
//!
//! Every preview is generated fresh against an already-open decoder;
//! nothing is persisted.

use std::sync::Arc;

use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

use crate::error::PreviewError;
use crate::media::VideoFrame;
use crate::pool::{HandlePool, VideoKey};

/// Fixed output width of a scrub-preview thumbnail.
pub const PREVIEW_WIDTH: u32 = 180;

/// JPEG quality for previews (0–100).
pub const PREVIEW_JPEG_QUALITY: u8 = 50;

pub struct FramePreviewService {
    pool: Arc<HandlePool>,
}

impl FramePreviewService {
    pub fn new(pool: Arc<HandlePool>) -> Self {
        Self { pool }
    }

    /// Extracts the frame at/after `timestamp_secs` and returns it as an
    /// encoded JPEG, `PREVIEW_WIDTH` pixels wide.
    pub fn get_preview(
        &self,
        key: &VideoKey,
        timestamp_secs: f64,
    ) -> Result<Vec<u8>, PreviewError> {
        let timestamp_ms = (timestamp_secs.max(0.0) * 1000.0) as i64;
        let handle = self.pool.acquire(key)?;

        // Seek and read stay under one lock acquisition: interleaving a
        // seek from one request with the read of another would hand back
        // the wrong frame. Resize and encode work on an owned buffer and
        // run after the lock drops.
        let frame = {
            let mut guard = handle.lock();
            guard.touch();
            guard.source().seek_to_ms(timestamp_ms)?;
            guard
                .source()
                .next_frame()?
                .ok_or(PreviewError::FrameNotFound { timestamp_ms })?
        };

        log::trace!(
            target: "anisub::preview",
            "decoded {}x{} at {} ms for {}",
            frame.width,
            frame.height,
            timestamp_ms,
            key.path().display()
        );
        encode_preview_jpeg(frame)
    }
}

/// Proportional height for a `target_width`-wide thumbnail.
pub fn preview_height(width: u32, height: u32, target_width: u32) -> u32 {
    (height as f64 * target_width as f64 / width as f64).round() as u32
}

fn encode_preview_jpeg(frame: VideoFrame) -> Result<Vec<u8>, PreviewError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(PreviewError::Internal("decoder produced an empty frame".into()));
    }
    let (width, height) = (frame.width, frame.height);
    let rgb = RgbImage::from_raw(width, height, frame.data).ok_or_else(|| {
        PreviewError::Internal("frame buffer does not match its dimensions".into())
    })?;

    let target_height = preview_height(width, height, PREVIEW_WIDTH).max(1);
    let thumbnail = image::imageops::resize(&rgb, PREVIEW_WIDTH, target_height, FilterType::Triangle);

    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, PREVIEW_JPEG_QUALITY);
    thumbnail
        .write_with_encoder(encoder)
        .map_err(|e| PreviewError::Internal(format!("jpeg encode: {e}")))?;
    Ok(jpeg)
}
