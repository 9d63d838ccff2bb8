//! Rescaling of full-size masks consistently with a molding scale/padding.
//!
//! Used to keep ground-truth masks aligned with a resized image; independent
//! of the detection unmolding path.

use image::{imageops, imageops::FilterType, GrayImage};

use mrcnn_common::Padding;

/// Rescale and re-pad a set of masks with one scale and padding.
///
/// Each mask is handled independently and order is preserved: bilinear
/// resize by `scale` on both (rounded) dimensions, then zero padding by the
/// given per-edge amounts.
#[must_use]
pub fn resize_masks(masks: &[GrayImage], scale: f32, padding: &Padding) -> Vec<GrayImage> {
    masks
        .iter()
        .map(|mask| {
            let (w, h) = mask.dimensions();
            let new_w = (w as f32 * scale).round() as u32;
            let new_h = (h as f32 * scale).round() as u32;
            let resized = imageops::resize(mask, new_w, new_h, FilterType::Triangle);

            let mut canvas = GrayImage::new(
                new_w + padding.left + padding.right,
                new_h + padding.top + padding.bottom,
            );
            imageops::overlay(
                &mut canvas,
                &resized,
                i64::from(padding.left),
                i64::from(padding.top),
            );
            canvas
        })
        .collect()
}
