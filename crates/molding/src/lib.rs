//! Image molding and detection unmolding for Mask R-CNN style networks
//!
//! This crate prepares raw images for a region-proposal/segmentation network
//! and converts the network's raw output tensors back into image-space
//! detections and binary masks. The network itself is an external black box;
//! this crate owns the geometric/numeric transforms on both sides of it.
//!
//! # Features
//! - Aspect-preserving resize with optional centered square padding
//! - Per-channel mean subtraction and CHW tensor layout conversion
//! - Batch molding with per-image metadata (original size, content window)
//! - Detection unmolding: model-space boxes back to original coordinates
//! - Low-resolution probability masks decoded into full-size binary masks
//! - Ground-truth mask rescaling consistent with a given scale/padding
//!
//! # Example
//! ```
//! use mrcnn_molding::{mold_inputs, MoldConfig};
//! use image::RgbImage;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = MoldConfig {
//!     image_min_dim: 64,
//!     image_max_dim: 64,
//!     ..MoldConfig::default()
//! };
//!
//! let frames = vec![RgbImage::new(48, 32), RgbImage::new(20, 60)];
//! let batch = mold_inputs(&frames, &config)?;
//!
//! assert_eq!(batch.images.dim(), (2, 3, 64, 64));
//! assert_eq!(batch.metas[0].original_width, 48);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod device;
pub mod masks;
pub mod onnx;
pub mod postprocess;
pub mod preprocess;

use thiserror::Error;

use mrcnn_common::ProcessingError;

pub use config::MoldConfig;
pub use device::{CpuPlacement, DevicePlacement};
pub use masks::resize_masks;
pub use postprocess::{unmold_detections, unmold_mask, RawDetections, UnmoldedDetections};
pub use preprocess::{
    mold_image, mold_inputs, mold_inputs_with, resize_image, to_network_layout, MoldedBatch,
    ResizedImage,
};

/// Errors that can occur while molding inputs or unmolding outputs
#[derive(Debug, Error)]
pub enum MoldingError {
    #[error("empty image batch")]
    EmptyBatch,

    #[error("inconsistent batch: image {index} molded to {found:?}, expected {expected:?}")]
    InconsistentBatch {
        index: usize,
        expected: (usize, usize, usize),
        found: (usize, usize, usize),
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("device transfer failed: {0}")]
    DeviceTransfer(String),

    #[error("network output shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("class id {class_id} outside mask stack with {num_classes} classes")]
    ClassOutOfRange { class_id: u32, num_classes: usize },

    #[error("failed to extract network output: {0}")]
    OutputExtraction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MoldingError> for ProcessingError {
    fn from(err: MoldingError) -> Self {
        ProcessingError::Other(err.to_string())
    }
}
