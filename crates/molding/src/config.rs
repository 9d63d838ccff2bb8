//! Molding configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::MoldingError;

/// Configuration for molding images into network inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoldConfig {
    /// Smallest allowed side after resizing; 0 disables the upscale term
    pub image_min_dim: u32,
    /// Largest allowed side after resizing, and the square canvas size when
    /// padding is enabled; 0 disables the cap
    pub image_max_dim: u32,
    /// Pad the resized image to an `image_max_dim` square canvas
    pub image_padding: bool,
    /// Per-channel mean pixel in R, G, B order, subtracted during molding
    pub mean_pixel: [f32; 3],
    /// Number of classes the network predicts (including background)
    pub num_classes: usize,
    /// Number of GPU devices; a value above 0 issues a device transfer for
    /// the molded batch
    pub gpu_count: usize,
}

impl Default for MoldConfig {
    fn default() -> Self {
        Self {
            image_min_dim: 800,
            image_max_dim: 1024,
            image_padding: true,
            mean_pixel: [123.7, 116.8, 103.9],
            num_classes: 81,
            gpu_count: 0,
        }
    }
}

impl MoldConfig {
    /// Create a pass-through config that leaves image geometry untouched
    #[must_use]
    pub fn no_resize(num_classes: usize) -> Self {
        Self {
            image_min_dim: 0,
            image_max_dim: 0,
            image_padding: false,
            num_classes,
            ..Self::default()
        }
    }

    /// Load a config from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, MoldingError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: MoldConfig = serde_yaml::from_str(&contents)
            .map_err(|e| MoldingError::InvalidConfig(format!("failed to parse YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for contradictory settings
    pub fn validate(&self) -> Result<(), MoldingError> {
        if self.num_classes == 0 {
            return Err(MoldingError::InvalidConfig(
                "num_classes must be at least 1".to_string(),
            ));
        }
        if self.image_padding && self.image_max_dim == 0 {
            return Err(MoldingError::InvalidConfig(
                "image_padding requires a nonzero image_max_dim canvas".to_string(),
            ));
        }
        if self.image_min_dim != 0
            && self.image_max_dim != 0
            && self.image_min_dim > self.image_max_dim
        {
            return Err(MoldingError::InvalidConfig(format!(
                "image_min_dim {} exceeds image_max_dim {}",
                self.image_min_dim, self.image_max_dim
            )));
        }
        Ok(())
    }
}
