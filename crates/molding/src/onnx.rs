//! ONNX Runtime boundary: typed extraction of raw network outputs.
//!
//! The network itself stays external; this module only converts the tensors
//! an `ort` session produced into the owned buffers the unmolder consumes.
//!
//! # Example
//! ```no_run
//! use mrcnn_molding::onnx::raw_outputs_from_session;
//! use mrcnn_molding::{mold_inputs, unmold_detections, MoldConfig};
//! use ort::{session::Session, value::TensorRef};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = MoldConfig::default();
//! let images = vec![image::open("image.jpg")?.to_rgb8()];
//! let batch = mold_inputs(&images, &config)?;
//!
//! let mut session = Session::builder()?.commit_from_file("mask_rcnn.onnx")?;
//! let input = TensorRef::from_array_view(batch.images.view())?;
//! let outputs = session.run(ort::inputs![input])?;
//!
//! let (detections, masks) = raw_outputs_from_session(&outputs)?;
//! let unmolded = unmold_detections(
//!     &detections,
//!     masks.view(),
//!     (images[0].height(), images[0].width()),
//!     &batch.windows[0],
//! )?;
//! # Ok(())
//! # }
//! ```

use ndarray::{Array2, Array4};
use ort::session::SessionOutputs;
use tracing::debug;

use crate::postprocess::RawDetections;
use crate::MoldingError;

/// Convert an extracted 2-D tensor into an owned array
pub fn tensor_to_array2(shape: &[i64], data: &[f32]) -> Result<Array2<f32>, MoldingError> {
    if shape.len() != 2 {
        return Err(MoldingError::ShapeMismatch(format!(
            "expected a 2D tensor, got {}D",
            shape.len()
        )));
    }
    let rows = shape[0] as usize;
    let cols = shape[1] as usize;
    Array2::from_shape_vec((rows, cols), data.to_vec())
        .map_err(|e| MoldingError::OutputExtraction(e.to_string()))
}

/// Convert an extracted 4-D tensor into an owned array
pub fn tensor_to_array4(shape: &[i64], data: &[f32]) -> Result<Array4<f32>, MoldingError> {
    if shape.len() != 4 {
        return Err(MoldingError::ShapeMismatch(format!(
            "expected a 4D tensor, got {}D",
            shape.len()
        )));
    }
    let dims = (
        shape[0] as usize,
        shape[1] as usize,
        shape[2] as usize,
        shape[3] as usize,
    );
    Array4::from_shape_vec(dims, data.to_vec())
        .map_err(|e| MoldingError::OutputExtraction(e.to_string()))
}

/// Extract one image's raw outputs from a session run.
///
/// Output 0 is the fixed-capacity zero-padded detections buffer
/// `[capacity, 6]`; output 1 is the per-class low-resolution mask stack
/// `[capacity, num_classes, mask_h, mask_w]`. The detections buffer is
/// truncated to its valid prefix here, so downstream code never sees the
/// zero-row sentinel convention.
pub fn raw_outputs_from_session(
    outputs: &SessionOutputs<'_>,
) -> Result<(RawDetections, Array4<f32>), MoldingError> {
    let (shape, data) = outputs[0]
        .try_extract_tensor::<f32>()
        .map_err(|e| MoldingError::OutputExtraction(format!("detections: {e}")))?;
    debug!("Detections tensor shape: {:?}", shape);
    let detections = RawDetections::from_padded(tensor_to_array2(shape.as_ref(), data)?)?;

    let (shape, data) = outputs[1]
        .try_extract_tensor::<f32>()
        .map_err(|e| MoldingError::OutputExtraction(format!("masks: {e}")))?;
    debug!("Mask stack tensor shape: {:?}", shape);
    let masks = tensor_to_array4(shape.as_ref(), data)?;

    Ok((detections, masks))
}
