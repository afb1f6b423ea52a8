//! Mean-field inference engine.
//!
//! Runs a fixed number of variational update steps against the unary
//! energy plus the configured pairwise potentials, then decodes the
//! converged marginals into a hard label map. There is no convergence
//! check: output quality depends entirely on the configured iteration
//! count, and reproducing results requires the same count and the same
//! potential application order.

use crate::buffers::WorkBuffers;
use crate::decode::decode_map;
use crate::error::CrfError;
use crate::filter::DenseGaussianFactory;
use crate::pairwise::{
    build_potentials, ColorKernel, FilterBackend, FilterBackendFactory, PositionKernel,
};
use crate::unary::build_unary_energy;
use crate::ImageExtent;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Engine configuration, fixed at construction.
#[derive(Clone, Debug)]
pub struct CrfConfig {
    /// Number of mean-field update steps, applied unconditionally.
    pub iterations: usize,
    /// Position-only smoothness kernels, in application order.
    pub position_kernels: Vec<PositionKernel>,
    /// Position+color bilateral kernels, applied after the position kernels.
    pub color_kernels: Vec<ColorKernel>,
    /// Whether color input will ever be supplied to `process`.
    pub expects_color: bool,
}

impl Default for CrfConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            position_kernels: vec![PositionKernel { weight: 3.0, sigma_xy: 3.0 }],
            color_kernels: vec![ColorKernel { weight: 4.0, sigma_xy: 121.0, sigma_rgb: 5.0 }],
            expects_color: true,
        }
    }
}

impl CrfConfig {
    /// Build a configuration from the parallel-slice encoding used by
    /// upstream parameter files: `pos_w`/`pos_xy_std` for position
    /// kernels, `bi_w`/`bi_xy_std`/`bi_rgb_std` for color kernels.
    pub fn from_parts(
        iterations: usize,
        pos_w: &[f32],
        pos_xy_std: &[f32],
        bi_w: &[f32],
        bi_xy_std: &[f32],
        bi_rgb_std: &[f32],
        expects_color: bool,
    ) -> Result<Self, CrfError> {
        if pos_w.len() != pos_xy_std.len() {
            return Err(CrfError::KernelListMismatch {
                kind: "position",
                weights: pos_w.len(),
                bandwidths: pos_xy_std.len(),
            });
        }
        if bi_w.len() != bi_xy_std.len() {
            return Err(CrfError::KernelListMismatch {
                kind: "color",
                weights: bi_w.len(),
                bandwidths: bi_xy_std.len(),
            });
        }
        if bi_w.len() != bi_rgb_std.len() {
            return Err(CrfError::KernelListMismatch {
                kind: "color",
                weights: bi_w.len(),
                bandwidths: bi_rgb_std.len(),
            });
        }

        let position_kernels = pos_w
            .iter()
            .zip(pos_xy_std)
            .map(|(&weight, &sigma_xy)| PositionKernel { weight, sigma_xy })
            .collect();
        let color_kernels = (0..bi_w.len())
            .map(|i| ColorKernel {
                weight: bi_w[i],
                sigma_xy: bi_xy_std[i],
                sigma_rgb: bi_rgb_std[i],
            })
            .collect();

        let config = Self { iterations, position_kernels, color_kernels, expects_color };
        config.validate()?;
        Ok(config)
    }

    /// Check the cross-field invariants that cannot be expressed in the
    /// type itself.
    pub fn validate(&self) -> Result<(), CrfError> {
        if !self.expects_color && !self.color_kernels.is_empty() {
            return Err(CrfError::ColorKernelsWithoutColor);
        }
        if self.expects_color && self.color_kernels.is_empty() {
            return Err(CrfError::NoColorKernels);
        }
        Ok(())
    }
}

/// Planar color samples covering the padded region.
///
/// Exactly 3 channels, pre-normalized (e.g. mean-subtracted) by the
/// host; the engine performs no color preprocessing beyond the
/// bandwidth division in the kernel features.
#[derive(Clone, Copy, Debug)]
pub struct ColorImage<'a> {
    pub data: &'a [f32],
    pub channels: usize,
}

/// Mean-field dense CRF engine.
///
/// Owns the four working buffers and processes one image at a time;
/// per-image state (unary energy, potential terms) is fully re-derived
/// on every call, so only buffer capacity is shared across calls.
pub struct MeanFieldCrf {
    config: CrfConfig,
    backend: Box<dyn FilterBackendFactory>,
    buffers: WorkBuffers,
    labels: usize,
    padded: ImageExtent,
}

impl MeanFieldCrf {
    /// Create an engine with the brute-force Gaussian backend.
    pub fn new(config: CrfConfig) -> Result<Self, CrfError> {
        Self::with_backend(config, Box::new(DenseGaussianFactory))
    }

    /// Create an engine with a caller-supplied filtering backend.
    pub fn with_backend(
        config: CrfConfig,
        backend: Box<dyn FilterBackendFactory>,
    ) -> Result<Self, CrfError> {
        config.validate()?;
        Ok(Self {
            config,
            backend,
            buffers: WorkBuffers::new(),
            labels: 0,
            padded: ImageExtent::new(0, 0),
        })
    }

    /// Whether this engine consumes color input.
    pub fn uses_color(&self) -> bool {
        self.config.expects_color
    }

    pub fn config(&self) -> &CrfConfig {
        &self.config
    }

    /// Reserve capacity for images up to `padded` with `labels` labels.
    ///
    /// This is the only path that grows the working buffers; `process`
    /// fails rather than allocating when an image does not fit.
    pub fn reshape(&mut self, labels: usize, padded: ImageExtent) {
        debug_assert!(labels > 0);
        self.labels = labels;
        self.padded = padded;
        self.buffers.ensure(labels * padded.area());
    }

    /// Run inference for one image.
    ///
    /// `scores` holds raw per-label classifier scores as label-major
    /// planes over the padded region. `effective` is the content region
    /// (clamped to the padded extent). Results are written into the
    /// host-provided padded-size buffers: `scores_out` as label-major
    /// probability planes, `labels_out` as the argmax label per pixel,
    /// both zero-filled outside the effective region.
    pub fn process(
        &mut self,
        scores: &[f32],
        effective: ImageExtent,
        color: Option<ColorImage<'_>>,
        scores_out: &mut [f32],
        labels_out: &mut [u32],
    ) -> Result<(), CrfError> {
        let m = self.labels;
        let padded = self.padded;
        let plane = padded.area();

        if scores.len() != m * plane {
            return Err(CrfError::ScoreBufferMismatch { got: scores.len(), expected: m * plane });
        }
        if scores_out.len() < m * plane {
            return Err(CrfError::OutputBufferMismatch {
                got: scores_out.len(),
                expected: m * plane,
            });
        }
        if labels_out.len() < plane {
            return Err(CrfError::OutputBufferMismatch { got: labels_out.len(), expected: plane });
        }

        // content may be cropped (effective smaller than padded) or the
        // buffer may be padded with redundant values
        let effective = ImageExtent::new(
            effective.width.min(padded.width),
            effective.height.min(padded.height),
        );
        let elements = effective.area() * m;
        if elements > self.buffers.capacity() {
            return Err(CrfError::CapacityExceeded {
                requested: elements,
                capacity: self.buffers.capacity(),
            });
        }

        let color_data = if self.config.expects_color {
            let image = color.ok_or(CrfError::MissingColor)?;
            if image.channels != 3 {
                return Err(CrfError::ColorChannelMismatch { channels: image.channels });
            }
            if image.data.len() != 3 * plane {
                return Err(CrfError::ColorBufferMismatch {
                    got: image.data.len(),
                    expected: 3 * plane,
                });
            }
            Some(image.data)
        } else {
            None
        };

        build_unary_energy(scores, m, effective, padded, &mut self.buffers.unary);

        let potentials = build_potentials(
            &self.config.position_kernels,
            &self.config.color_kernels,
            effective,
            padded,
            color_data,
            self.backend.as_ref(),
        );

        log::debug!(
            "mean-field inference: {}x{} effective pixels, {} labels, {} potentials, {} iterations",
            effective.width,
            effective.height,
            m,
            potentials.len(),
            self.config.iterations
        );

        self.run_inference(effective.area(), &potentials);
        decode_map(&self.buffers.current, m, effective, padded, scores_out, labels_out);

        // potential terms are per-image; dropped here
        Ok(())
    }

    /// Backward-mode differentiation is not supported; this always
    /// fails so a caller can never mistake it for zero gradients.
    pub fn backward(&self) -> Result<(), CrfError> {
        Err(CrfError::UnsupportedBackward)
    }

    fn run_inference(&mut self, pixels: usize, potentials: &[Box<dyn FilterBackend>]) {
        let m = self.labels;
        let n = pixels * m;
        let WorkBuffers { unary, current, next, tmp, .. } = &mut self.buffers;
        let unary = &unary[..n];

        exp_and_normalize(&mut current[..n], unary, -1.0, m);

        for _ in 0..self.config.iterations {
            for (d, &u) in next[..n].iter_mut().zip(unary) {
                *d = -u;
            }
            for potential in potentials {
                potential.apply(&mut next[..n], &current[..n], &mut tmp[..n], m);
            }
            exp_and_normalize(&mut current[..n], &next[..n], 1.0, m);
        }
    }
}

/// Per-pixel softmax of the scaled input, shared by the start state
/// (`scale = -1` over the unary energy) and the update step
/// (`scale = +1` over the accumulated energy). The scaled max is
/// subtracted before exponentiating so the exp cannot explode.
pub(crate) fn exp_and_normalize(out: &mut [f32], input: &[f32], scale: f32, labels: usize) {
    debug_assert_eq!(out.len(), input.len());

    #[cfg(feature = "parallel")]
    out.par_chunks_mut(labels)
        .zip(input.par_chunks(labels))
        .for_each(|(o, b)| normalize_pixel(o, b, scale));

    #[cfg(not(feature = "parallel"))]
    for (o, b) in out.chunks_mut(labels).zip(input.chunks(labels)) {
        normalize_pixel(o, b, scale);
    }
}

#[inline]
fn normalize_pixel(out: &mut [f32], input: &[f32], scale: f32) {
    let mut mx = scale * input[0];
    for &v in &input[1..] {
        if mx < scale * v {
            mx = scale * v;
        }
    }
    let mut sum = 0.0;
    for (o, &v) in out.iter_mut().zip(input) {
        let e = (scale * v - mx).exp();
        *o = e;
        sum += e;
    }
    for o in out.iter_mut() {
        *o /= sum;
    }
}

/// One-shot convenience wrapper: build an engine, size it to the image,
/// and return freshly allocated outputs.
pub fn refine(
    scores: &[f32],
    labels: usize,
    effective: ImageExtent,
    padded: ImageExtent,
    color: Option<ColorImage<'_>>,
    config: &CrfConfig,
) -> Result<RefineResult, CrfError> {
    let mut engine = MeanFieldCrf::new(config.clone())?;
    engine.reshape(labels, padded);

    let mut out_scores = vec![0.0; labels * padded.area()];
    let mut label_map = vec![0u32; padded.area()];
    engine.process(scores, effective, color, &mut out_scores, &mut label_map)?;

    Ok(RefineResult { padded, labels, scores: out_scores, label_map })
}

/// Result of a one-shot [`refine`] call.
#[derive(Clone, Debug)]
pub struct RefineResult {
    /// Padded extent both output buffers cover.
    pub padded: ImageExtent,
    /// Number of labels.
    pub labels: usize,
    /// Marginal probabilities as label-major planes.
    pub scores: Vec<f32>,
    /// Winning label index per pixel.
    pub label_map: Vec<u32>,
}
