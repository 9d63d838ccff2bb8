/// Common types and utilities for the image molding/unmolding pipeline
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Processing errors
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Image processing error: {0}")]
    ImageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<image::ImageError> for ProcessingError {
    fn from(err: image::ImageError) -> Self {
        ProcessingError::ImageError(err.to_string())
    }
}

/// Result type for processing operations
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Sub-rectangle of a processed frame that holds real image content.
///
/// Everything outside the window is padding added to square the canvas.
/// Coordinates are in pixels within the processed frame, `y2 >= y1` and
/// `x2 >= x1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Top edge of the content rectangle
    pub y1: u32,
    /// Left edge of the content rectangle
    pub x1: u32,
    /// Bottom edge of the content rectangle (exclusive)
    pub y2: u32,
    /// Right edge of the content rectangle (exclusive)
    pub x2: u32,
}

impl Window {
    /// Create a new window
    #[must_use]
    pub fn new(y1: u32, x1: u32, y2: u32, x2: u32) -> Self {
        Self { y1, x1, y2, x2 }
    }

    /// Window covering an entire `height` x `width` frame
    #[must_use]
    pub fn full(height: u32, width: u32) -> Self {
        Self {
            y1: 0,
            x1: 0,
            y2: height,
            x2: width,
        }
    }

    /// Content height in pixels
    #[must_use]
    #[inline]
    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// Content width in pixels
    #[must_use]
    #[inline]
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }
}

/// Per-edge pixel padding applied when squaring a processed frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Padding {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Padding {
    /// Create a new padding descriptor
    #[must_use]
    pub fn new(top: u32, bottom: u32, left: u32, right: u32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }
}

/// Integer detection box in original image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Top edge
    pub y1: i32,
    /// Left edge
    pub x1: i32,
    /// Bottom edge (exclusive)
    pub y2: i32,
    /// Right edge (exclusive)
    pub x2: i32,
}

impl BoundingBox {
    /// Create a new bounding box
    #[must_use]
    pub fn new(y1: i32, x1: i32, y2: i32, x2: i32) -> Self {
        Self { y1, x1, y2, x2 }
    }

    /// Box height in pixels
    #[must_use]
    #[inline]
    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Box width in pixels
    #[must_use]
    #[inline]
    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    /// Box area in pixels
    #[must_use]
    #[inline]
    pub fn area(&self) -> i64 {
        i64::from(self.height()) * i64::from(self.width())
    }

    /// True when the box has zero or negative width or height.
    ///
    /// Such boxes show up in early training stages when the network weights
    /// are still mostly random and must be dropped before mask decoding.
    #[must_use]
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

/// Per-image bookkeeping recorded while molding a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMeta {
    /// Reserved slot, always 0
    pub tag: u32,
    /// Height of the image before molding
    pub original_height: u32,
    /// Width of the image before molding
    pub original_width: u32,
    /// Content window within the molded frame
    pub window: Window,
    /// Per-class active-set vector, zeroed (placeholder for class masking)
    pub active_class_ids: Vec<u32>,
}

impl ImageMeta {
    /// Create the metadata record for one molded image
    #[must_use]
    pub fn new(
        original_height: u32,
        original_width: u32,
        window: Window,
        num_classes: usize,
    ) -> Self {
        Self {
            tag: 0,
            original_height,
            original_width,
            window,
            active_class_ids: vec![0; num_classes],
        }
    }
}
