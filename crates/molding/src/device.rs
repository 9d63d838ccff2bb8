//! Device placement seam for molded batches.
//!
//! Molding only issues the transfer; the inference engine supplies the real
//! implementation and owns any synchronization before the buffer is
//! consumed.

use ndarray::Array4;

use crate::MoldingError;

/// Destination for a molded batch when a GPU device count is configured.
///
/// The transfer is one-shot and fire-and-forget: no handle or completion
/// signal is returned through this seam.
pub trait DevicePlacement: Send + Sync + std::fmt::Debug {
    /// Issue the transfer of a molded batch to device memory
    fn transfer(&self, batch: &Array4<f32>) -> Result<(), MoldingError>;
}

/// Default placement that keeps the batch in host memory
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuPlacement;

impl DevicePlacement for CpuPlacement {
    fn transfer(&self, _batch: &Array4<f32>) -> Result<(), MoldingError> {
        Ok(())
    }
}
