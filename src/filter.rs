//! Brute-force Gaussian filtering backend.
//!
//! Exact O(N^2) evaluation of the Gaussian affinity sum. A production
//! deployment would swap in an approximate high-dimensional filter
//! (e.g. a permutohedral lattice) through the same [`FilterBackend`]
//! contract; this reference path keeps the crate self-contained and is
//! what the tests and benches run against.

use crate::pairwise::{FilterBackend, FilterBackendFactory};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One pairwise potential term evaluated by direct summation.
///
/// The filtered value for pixel `i` is
/// `sum over j != i of exp(-||f_i - f_j||^2 / 2) * input[j]`,
/// accumulated per label and scaled by the term weight.
pub struct DenseGaussianFilter {
    features: Vec<f32>,
    dim: usize,
    pixels: usize,
    weight: f32,
}

impl DenseGaussianFilter {
    pub fn new(features: Vec<f32>, dim: usize, pixels: usize, weight: f32) -> Self {
        assert_eq!(features.len(), dim * pixels);
        Self { features, dim, pixels, weight }
    }

    fn filter_pixel(&self, i: usize, input: &[f32], out: &mut [f32], labels: usize) {
        let fi = &self.features[i * self.dim..(i + 1) * self.dim];
        out.fill(0.0);
        for j in 0..self.pixels {
            if j == i {
                continue;
            }
            let fj = &self.features[j * self.dim..(j + 1) * self.dim];
            let mut d2 = 0.0;
            for (a, b) in fi.iter().zip(fj) {
                let d = a - b;
                d2 += d * d;
            }
            let k = (-0.5 * d2).exp();
            let qj = &input[j * labels..(j + 1) * labels];
            for (o, &q) in out.iter_mut().zip(qj) {
                *o += k * q;
            }
        }
    }
}

impl FilterBackend for DenseGaussianFilter {
    fn apply(&self, out: &mut [f32], input: &[f32], tmp: &mut [f32], labels: usize) {
        let n = self.pixels * labels;
        let stage = &mut tmp[..n];
        let input = &input[..n];

        #[cfg(feature = "parallel")]
        stage
            .par_chunks_mut(labels)
            .enumerate()
            .for_each(|(i, chunk)| self.filter_pixel(i, input, chunk, labels));

        #[cfg(not(feature = "parallel"))]
        for (i, chunk) in stage.chunks_mut(labels).enumerate() {
            self.filter_pixel(i, input, chunk, labels);
        }

        for (o, &s) in out[..n].iter_mut().zip(stage.iter()) {
            *o += self.weight * s;
        }
    }
}

/// Default backend factory: one [`DenseGaussianFilter`] per kernel.
#[derive(Clone, Copy, Debug, Default)]
pub struct DenseGaussianFactory;

impl FilterBackendFactory for DenseGaussianFactory {
    fn build(
        &self,
        features: Vec<f32>,
        dim: usize,
        pixels: usize,
        weight: f32,
    ) -> Box<dyn FilterBackend> {
        Box::new(DenseGaussianFilter::new(features, dim, pixels, weight))
    }
}
