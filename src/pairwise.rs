//! Pairwise potential construction.
//!
//! Each configured kernel becomes one potential term per image: a
//! feature matrix (one vector per effective pixel), a pixel count, and
//! a scalar weight, handed to the filtering backend. Terms live for one
//! image only and are rebuilt from that image's geometry and color.

use crate::ImageExtent;

/// A smoothness kernel over pixel position only.
#[derive(Clone, Copy, Debug)]
pub struct PositionKernel {
    pub weight: f32,
    pub sigma_xy: f32,
}

/// A bilateral kernel over pixel position and color.
#[derive(Clone, Copy, Debug)]
pub struct ColorKernel {
    pub weight: f32,
    pub sigma_xy: f32,
    pub sigma_rgb: f32,
}

/// One instantiated pairwise potential term.
///
/// `apply` adds `weight x kernel-filtered(input)` into `out` in place.
/// Implementations must be label-count agnostic and may use `tmp` as
/// scratch; none of the buffers outlive the call.
pub trait FilterBackend {
    fn apply(&self, out: &mut [f32], input: &[f32], tmp: &mut [f32], labels: usize);
}

/// Builds potential terms from per-image feature matrices.
///
/// `features` holds `pixels` vectors of `dim` floats in row-major pixel
/// order and is moved into the term. The backend's filtering algorithm
/// is not constrained here; only the additive-energy contract of
/// [`FilterBackend::apply`] matters.
pub trait FilterBackendFactory {
    fn build(
        &self,
        features: Vec<f32>,
        dim: usize,
        pixels: usize,
        weight: f32,
    ) -> Box<dyn FilterBackend>;
}

/// Feature matrix for a position kernel: `(x / sigma, y / sigma)` per
/// effective pixel in row-major order.
pub fn position_features(effective: ImageExtent, sigma_xy: f32) -> Vec<f32> {
    let mut features = Vec::with_capacity(effective.area() * 2);
    for y in 0..effective.height {
        for x in 0..effective.width {
            features.push(x as f32 / sigma_xy);
            features.push(y as f32 / sigma_xy);
        }
    }
    features
}

/// Feature matrix for a bilateral kernel:
/// `(x / sigma_xy, y / sigma_xy, c0 / sigma_rgb, c1 / sigma_rgb, c2 / sigma_rgb)`.
///
/// `color` is three planes over the padded region, already normalized
/// by the host; only the bandwidth division happens here.
pub fn bilateral_features(
    effective: ImageExtent,
    padded: ImageExtent,
    color: &[f32],
    sigma_xy: f32,
    sigma_rgb: f32,
) -> Vec<f32> {
    let plane = padded.area();
    let mut features = Vec::with_capacity(effective.area() * 5);
    for y in 0..effective.height {
        for x in 0..effective.width {
            let pix = y * padded.width + x;
            features.push(x as f32 / sigma_xy);
            features.push(y as f32 / sigma_xy);
            features.push(color[pix] / sigma_rgb);
            features.push(color[pix + plane] / sigma_rgb);
            features.push(color[pix + 2 * plane] / sigma_rgb);
        }
    }
    features
}

/// Instantiate the ordered potential list for one image: all position
/// kernels first, then all color kernels, each in declaration order.
///
/// Term order affects floating-point rounding during accumulation, so
/// it must stay stable across runs. Color kernels are skipped when no
/// color samples are supplied.
pub fn build_potentials(
    position_kernels: &[PositionKernel],
    color_kernels: &[ColorKernel],
    effective: ImageExtent,
    padded: ImageExtent,
    color: Option<&[f32]>,
    factory: &dyn FilterBackendFactory,
) -> Vec<Box<dyn FilterBackend>> {
    let pixels = effective.area();
    let mut potentials: Vec<Box<dyn FilterBackend>> = Vec::new();

    for kernel in position_kernels {
        let features = position_features(effective, kernel.sigma_xy);
        potentials.push(factory.build(features, 2, pixels, kernel.weight));
    }

    if let Some(color) = color {
        for kernel in color_kernels {
            let features =
                bilateral_features(effective, padded, color, kernel.sigma_xy, kernel.sigma_rgb);
            potentials.push(factory.build(features, 5, pixels, kernel.weight));
        }
    }

    potentials
}
