//! Detection unmolding: network output tensors back to image space.
//!
//! The network emits boxes in the coordinates of the molded (resized and
//! padded) frame, plus one low-resolution probability mask per class for
//! each detection. Unmolding maps the boxes back into the original image
//! frame, drops degenerate ones and decodes each retained detection's mask
//! into a full-size binary mask.

use image::{imageops, imageops::FilterType, GrayImage, ImageBuffer, Luma};
use ndarray::{s, Array2, ArrayView1, ArrayView2, ArrayView4};
use tracing::{debug, info};

use mrcnn_common::{BoundingBox, Window};

use crate::MoldingError;

/// Probability threshold separating mask foreground from background
const MASK_THRESHOLD: f32 = 0.5;

/// Columns per detection row: y1, x1, y2, x2, class id, score
const DETECTION_FIELDS: usize = 6;

/// Network detections with an explicit valid length.
///
/// The raw network buffer is fixed-capacity and zero-padded; the padded form
/// is accepted once at the boundary through [`RawDetections::from_padded`],
/// which replaces the first-zero-class-id sentinel convention with an
/// explicit row count. Rows are `[y1, x1, y2, x2, class_id, score]` in
/// molded-frame coordinates.
#[derive(Debug, Clone)]
pub struct RawDetections {
    rows: Array2<f32>,
}

impl RawDetections {
    /// Wrap a buffer in which every row is a real detection
    pub fn new(rows: Array2<f32>) -> Result<Self, MoldingError> {
        if rows.nrows() > 0 && rows.ncols() != DETECTION_FIELDS {
            return Err(MoldingError::ShapeMismatch(format!(
                "expected {} detection fields, got {}",
                DETECTION_FIELDS,
                rows.ncols()
            )));
        }
        Ok(Self { rows })
    }

    /// Wrap a fixed-capacity zero-padded buffer, truncating at the first row
    /// whose class id is zero (the background sentinel). If no row has a
    /// zero class id the whole buffer is valid.
    pub fn from_padded(buffer: Array2<f32>) -> Result<Self, MoldingError> {
        if buffer.nrows() > 0 && buffer.ncols() != DETECTION_FIELDS {
            return Err(MoldingError::ShapeMismatch(format!(
                "expected {} detection fields, got {}",
                DETECTION_FIELDS,
                buffer.ncols()
            )));
        }
        let valid = buffer
            .rows()
            .into_iter()
            .position(|row| row[4] == 0.0)
            .unwrap_or(buffer.nrows());
        Ok(Self {
            rows: buffer.slice(s![..valid, ..]).to_owned(),
        })
    }

    /// Number of valid detections
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.nrows()
    }

    /// True when there are no valid detections
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.nrows() == 0
    }

    fn row(&self, index: usize) -> ArrayView1<'_, f32> {
        self.rows.row(index)
    }
}

/// Detections mapped back into original image coordinates.
///
/// The four vectors run in parallel, preserving the relative order of the
/// input detections. All four are empty when every detection was filtered.
#[derive(Debug, Clone, Default)]
pub struct UnmoldedDetections {
    /// Integer boxes in original image coordinates
    pub boxes: Vec<BoundingBox>,
    /// Predicted class ids
    pub class_ids: Vec<u32>,
    /// Detection scores
    pub scores: Vec<f32>,
    /// Full-resolution binary masks, one per retained detection
    pub masks: Vec<GrayImage>,
}

impl UnmoldedDetections {
    /// An explicitly empty result set
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of retained detections
    #[must_use]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// True when every detection was filtered out
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

/// Map network detections back into the original image frame.
///
/// `masks` is the per-class low-resolution mask stack,
/// `[capacity, num_classes, mask_h, mask_w]`; each detection selects the
/// channel of its predicted class. `window` is the content rectangle the
/// molding step produced for this image and `original_size` is `(height,
/// width)` of the image before molding.
///
/// Boxes are shifted out of the padded frame, scaled by a single uniform
/// factor (avoiding anisotropic distortion), truncated to integers and
/// clamped to the image bounds; boxes left with no area are dropped. An
/// all-filtered result is an explicitly empty set, not an error.
pub fn unmold_detections(
    detections: &RawDetections,
    masks: ArrayView4<'_, f32>,
    original_size: (u32, u32),
    window: &Window,
) -> Result<UnmoldedDetections, MoldingError> {
    let (original_height, original_width) = original_size;
    let n = detections.len();
    if n == 0 {
        return Ok(UnmoldedDetections::empty());
    }

    let (capacity, num_classes, _, _) = masks.dim();
    if n > capacity {
        return Err(MoldingError::ShapeMismatch(format!(
            "{n} detections but mask stack holds {capacity}"
        )));
    }

    assert!(
        window.height() > 0 && window.width() > 0,
        "unmolding requires a non-empty window"
    );

    // One uniform scale from the molded frame back to the original image
    let h_scale = original_height as f32 / window.height() as f32;
    let w_scale = original_width as f32 / window.width() as f32;
    let scale = h_scale.min(w_scale);
    let shift_y = window.y1 as f32;
    let shift_x = window.x1 as f32;

    debug!("Unmolding {} detections with scale {:.4}", n, scale);

    let mut unmolded = UnmoldedDetections::empty();
    for i in 0..n {
        let row = detections.row(i);

        let y1 = ((row[0] - shift_y) * scale) as i32;
        let x1 = ((row[1] - shift_x) * scale) as i32;
        let y2 = ((row[2] - shift_y) * scale) as i32;
        let x2 = ((row[3] - shift_x) * scale) as i32;
        let bbox = BoundingBox::new(
            y1.clamp(0, original_height as i32),
            x1.clamp(0, original_width as i32),
            y2.clamp(0, original_height as i32),
            x2.clamp(0, original_width as i32),
        );

        // Zero-area boxes are a normal filtering case, not an error
        if bbox.is_degenerate() {
            continue;
        }

        let class_id = row[4] as u32;
        if class_id as usize >= num_classes {
            return Err(MoldingError::ClassOutOfRange {
                class_id,
                num_classes,
            });
        }

        let mask = masks.slice(s![i, class_id as usize, .., ..]);
        let full_mask = unmold_mask(mask, &bbox, original_size);

        unmolded.boxes.push(bbox);
        unmolded.class_ids.push(class_id);
        unmolded.scores.push(row[5]);
        unmolded.masks.push(full_mask);
    }

    info!("Retained {} of {} detections", unmolded.len(), n);

    Ok(unmolded)
}

/// Decode one low-resolution probability mask into a full-size binary mask.
///
/// The mask is bilinearly resized to the exact pixel size of `bbox`,
/// thresholded at 0.5 into {0, 255} and pasted into a zeroed canvas of the
/// original image size at the box location. Degenerate boxes must be
/// filtered out before this call and the box must lie within the image.
#[must_use]
pub fn unmold_mask(
    mask: ArrayView2<'_, f32>,
    bbox: &BoundingBox,
    original_size: (u32, u32),
) -> GrayImage {
    assert!(
        !bbox.is_degenerate(),
        "degenerate box reached mask reconstruction"
    );
    let (original_height, original_width) = original_size;
    assert!(
        bbox.y1 >= 0
            && bbox.x1 >= 0
            && bbox.y2 <= original_height as i32
            && bbox.x2 <= original_width as i32,
        "box must lie within the original image"
    );
    let box_width = bbox.width() as u32;
    let box_height = bbox.height() as u32;

    let (mask_h, mask_w) = mask.dim();
    let low: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(mask_w as u32, mask_h as u32, |x, y| {
            Luma([mask[[y as usize, x as usize]]])
        });
    let resized = imageops::resize(&low, box_width, box_height, FilterType::Triangle);

    let mut full = GrayImage::new(original_width, original_height);
    for (x, y, pixel) in resized.enumerate_pixels() {
        if pixel[0] > MASK_THRESHOLD {
            full.put_pixel(bbox.x1 as u32 + x, bbox.y1 as u32 + y, Luma([255]));
        }
    }
    full
}
