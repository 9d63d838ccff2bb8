//! Image preprocessing: resize, mean subtraction, layout conversion and
//! batch molding.
//!
//! All functions are pure; each returns a new buffer instead of editing its
//! input in place so the geometric laws (resize round trips, scale
//! composition) can be tested equationally.

use image::{imageops, imageops::FilterType, RgbImage};
use ndarray::{Array3, Array4, Axis};
use tracing::{debug, info};

use mrcnn_common::{ImageMeta, Padding, Window};

use crate::config::MoldConfig;
use crate::device::{CpuPlacement, DevicePlacement};
use crate::MoldingError;

/// Result of resizing one image for the network
#[derive(Debug, Clone)]
pub struct ResizedImage {
    /// The resized (and possibly padded) image
    pub image: RgbImage,
    /// Rectangle of real content within the processed frame
    pub window: Window,
    /// Uniform scale factor applied to both dimensions
    pub scale: f32,
    /// Zero padding applied to each edge
    pub padding: Padding,
}

/// Resize an image to fit the model bounds while preserving aspect ratio.
///
/// A nonzero `min_dim` upscales (never downscales) so the short side reaches
/// `min_dim`. A nonzero `max_dim` caps the long side, overriding the upscale
/// when the two conflict. With `do_padding` the result is centered on a
/// `max_dim` x `max_dim` zero canvas; the returned window marks where the
/// actual content landed.
///
/// Requesting padding without a nonzero `max_dim` is a programming error.
#[must_use]
pub fn resize_image(image: &RgbImage, min_dim: u32, max_dim: u32, do_padding: bool) -> ResizedImage {
    let (w, h) = image.dimensions();

    let mut scale = 1.0f32;
    if min_dim != 0 {
        // Scale up but not down
        scale = (min_dim as f32 / h.min(w) as f32).max(1.0);
    }
    if max_dim != 0 {
        let image_max = h.max(w);
        if (image_max as f32 * scale).round() > max_dim as f32 {
            scale = max_dim as f32 / image_max as f32;
        }
    }

    let resized = if scale == 1.0 {
        image.clone()
    } else {
        let new_w = (w as f32 * scale).round() as u32;
        let new_h = (h as f32 * scale).round() as u32;
        imageops::resize(image, new_w, new_h, FilterType::Triangle)
    };

    if !do_padding {
        let (w, h) = resized.dimensions();
        return ResizedImage {
            image: resized,
            window: Window::full(h, w),
            scale,
            padding: Padding::default(),
        };
    }

    assert!(max_dim > 0, "padding requires a nonzero canvas size");
    let (w, h) = resized.dimensions();
    assert!(
        h <= max_dim && w <= max_dim,
        "resized image {w}x{h} exceeds the {max_dim} canvas"
    );

    // Center the content: top/left take the floor half, bottom/right absorb
    // the remainder.
    let top = (max_dim - h) / 2;
    let bottom = max_dim - h - top;
    let left = (max_dim - w) / 2;
    let right = max_dim - w - left;

    let mut canvas = RgbImage::new(max_dim, max_dim);
    imageops::overlay(&mut canvas, &resized, i64::from(left), i64::from(top));

    ResizedImage {
        image: canvas,
        window: Window::new(top, left, h + top, w + left),
        scale,
        padding: Padding::new(top, bottom, left, right),
    }
}

/// Subtract the per-channel mean pixel, producing an `H x W x 3` float buffer.
///
/// `mean_pixel` is indexed in the image's R, G, B channel order. The channel
/// count is fixed at 3 by the `RgbImage` type.
#[must_use]
pub fn mold_image(image: &RgbImage, mean_pixel: [f32; 3]) -> Array3<f32> {
    let (w, h) = image.dimensions();
    let mut molded = Array3::zeros((h as usize, w as usize, 3));
    for (x, y, pixel) in image.enumerate_pixels() {
        for c in 0..3 {
            molded[[y as usize, x as usize, c]] = f32::from(pixel[c]) - mean_pixel[c];
        }
    }
    molded
}

/// Convert an interleaved `H x W x 3` buffer into the planar `3 x H x W`
/// layout the network consumes, in standard (contiguous) memory order.
#[must_use]
pub fn to_network_layout(molded: &Array3<f32>) -> Array3<f32> {
    molded
        .view()
        .permuted_axes([2, 0, 1])
        .as_standard_layout()
        .to_owned()
}

/// A batch of molded images ready for inference
#[derive(Debug, Clone)]
pub struct MoldedBatch {
    /// Network input, `[batch, 3, height, width]`
    pub images: Array4<f32>,
    /// Per-image bookkeeping, consumed later by unmolding
    pub metas: Vec<ImageMeta>,
    /// Content windows, one per image
    pub windows: Vec<Window>,
}

/// Mold a batch of images into one network-ready buffer.
///
/// Each image is independently resized, mean-subtracted and converted to the
/// planar layout; the per-image buffers are then stacked along a leading
/// batch dimension. A batch whose images mold to different dimensions is
/// rejected whole, as is an empty batch.
pub fn mold_inputs(images: &[RgbImage], config: &MoldConfig) -> Result<MoldedBatch, MoldingError> {
    mold_inputs_with(images, config, &CpuPlacement)
}

/// Mold a batch, issuing the device transfer through a specific placement.
///
/// When `config.gpu_count` is above 0 the stacked buffer is handed to
/// `placement` once, fire-and-forget; the inference engine owns any
/// synchronization beyond that.
pub fn mold_inputs_with(
    images: &[RgbImage],
    config: &MoldConfig,
    placement: &dyn DevicePlacement,
) -> Result<MoldedBatch, MoldingError> {
    if images.is_empty() {
        return Err(MoldingError::EmptyBatch);
    }

    debug!("Molding batch of {} images", images.len());

    let mut molded = Vec::with_capacity(images.len());
    let mut metas = Vec::with_capacity(images.len());
    let mut windows = Vec::with_capacity(images.len());

    for image in images {
        let resized = resize_image(
            image,
            config.image_min_dim,
            config.image_max_dim,
            config.image_padding,
        );
        let buffer = to_network_layout(&mold_image(&resized.image, config.mean_pixel));

        metas.push(ImageMeta::new(
            image.height(),
            image.width(),
            resized.window,
            config.num_classes,
        ));
        windows.push(resized.window);
        molded.push(buffer);
    }

    let expected = molded[0].dim();
    if let Some(index) = molded.iter().position(|m| m.dim() != expected) {
        return Err(MoldingError::InconsistentBatch {
            index,
            expected,
            found: molded[index].dim(),
        });
    }

    let views: Vec<_> = molded.iter().map(|m| m.view()).collect();
    let batch = ndarray::stack(Axis(0), &views)
        .map_err(|e| MoldingError::ShapeMismatch(e.to_string()))?;

    if config.gpu_count > 0 {
        placement.transfer(&batch)?;
    }

    info!(
        "Molded {} images into batch of shape {:?}",
        images.len(),
        batch.dim()
    );

    Ok(MoldedBatch {
        images: batch,
        metas,
        windows,
    })
}
