//! Aspect-preserving resize onto a square black canvas (letterboxing).

use image::imageops::{self, FilterType};
use image::RgbImage;
use rayon::prelude::*;

use crate::video::types::Frame;

/// Where a source frame lands on a square canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Letterbox {
    /// Width after scaling
    pub width: u32,
    /// Height after scaling
    pub height: u32,
    /// Left margin
    pub offset_x: u32,
    /// Top margin
    pub offset_y: u32,
}

impl Letterbox {
    /// Fit a `width x height` frame inside a `target_size` square
    ///
    /// The scale both shrinks and enlarges. Margins use floor division, so
    /// when the leftover space is odd the right/bottom margin is one pixel
    /// wider than the left/top one.
    pub fn fit(width: u32, height: u32, target_size: u32) -> Self {
        if width == 0 || height == 0 || target_size == 0 {
            return Self { width: 0, height: 0, offset_x: 0, offset_y: 0 };
        }

        let target = f64::from(target_size);
        let scale = (target / f64::from(width)).min(target / f64::from(height));

        let new_width = scaled(width, scale, target_size);
        let new_height = scaled(height, scale, target_size);

        Self {
            width: new_width,
            height: new_height,
            offset_x: (target_size - new_width) / 2,
            offset_y: (target_size - new_height) / 2,
        }
    }
}

fn scaled(length: u32, scale: f64, target_size: u32) -> u32 {
    ((f64::from(length) * scale).round() as u32).clamp(1, target_size)
}

/// Resize `frame` to fit a `target_size x target_size` square and center it on black
///
/// Uses bilinear filtering. The input frame is left untouched; a frame that
/// already fits exactly is copied without resampling.
pub fn resize_and_pad(frame: &Frame, target_size: u32) -> Frame {
    let layout = Letterbox::fit(frame.width(), frame.height(), target_size);
    if layout.width == 0 || layout.height == 0 {
        return Frame::new_black(target_size, target_size);
    }

    let resampled: RgbImage;
    let resized = if (layout.width, layout.height) == (frame.width(), frame.height()) {
        frame.as_image()
    } else {
        resampled = imageops::resize(frame.as_image(), layout.width, layout.height, FilterType::Triangle);
        &resampled
    };

    let mut canvas = vec![0u8; Frame::byte_len(target_size, target_size)];
    let canvas_stride = target_size as usize * 3;
    let row_len = layout.width as usize * 3;
    let left = layout.offset_x as usize * 3;

    canvas
        .par_chunks_mut(canvas_stride)
        .skip(layout.offset_y as usize)
        .zip(resized.as_raw().par_chunks(row_len))
        .for_each(|(dst, src)| dst[left..left + row_len].copy_from_slice(src));

    Frame::from_rgb_bytes(target_size, target_size, canvas)
        .unwrap_or_else(|| Frame::new_black(target_size, target_size))
}
