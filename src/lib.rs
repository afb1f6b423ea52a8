//! Dense CRF Mean-Field Refinement
//!
//! Sharpens noisy per-pixel classification maps into spatially and
//! color-coherent label maps. The engine builds a unary energy from raw
//! classifier scores, assembles Gaussian pairwise potentials from pixel
//! position and optional color, runs a fixed number of mean-field
//! update steps, and decodes the result into a hard label map.

pub mod buffers;
pub mod decode;
pub mod error;
pub mod filter;
pub mod mean_field;
pub mod pairwise;
pub mod unary;

// Re-export key types for easy usage
pub use error::CrfError;
pub use filter::{DenseGaussianFactory, DenseGaussianFilter};
pub use mean_field::{refine, ColorImage, CrfConfig, MeanFieldCrf, RefineResult};
pub use pairwise::{ColorKernel, FilterBackend, FilterBackendFactory, PositionKernel};

/// Width and height of a pixel region.
///
/// Used both for the padded allocation region and the effective content
/// region inside it; the effective extent never exceeds the padded one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageExtent {
    pub width: usize,
    pub height: usize,
}

impl ImageExtent {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub const fn area(&self) -> usize {
        self.width * self.height
    }
}
