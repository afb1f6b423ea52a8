//! Unary energy construction from raw classifier scores.

use crate::ImageExtent;

/// Convert raw per-pixel per-label scores into a negative-log-softmax
/// energy over the effective region.
///
/// `scores` uses label-major planes over the padded region
/// (`(c * pad_h + h) * pad_w + w`), matching an NCHW host layout. The
/// energy is written pixel-major with effective-width stride
/// (`(h * eff_w + w) * labels + c`); entries outside the effective
/// region are left untouched and must never be read later.
///
/// The max is subtracted before exponentiating so the exp cannot
/// overflow, then each value is normalized and negated-logged.
pub fn build_unary_energy(
    scores: &[f32],
    labels: usize,
    effective: ImageExtent,
    padded: ImageExtent,
    out: &mut [f32],
) {
    let plane = padded.area();
    let mut exps = vec![0.0f32; labels];

    for h in 0..effective.height {
        for w in 0..effective.width {
            let pix = h * padded.width + w;

            let mut mx = scores[pix];
            for c in 1..labels {
                let v = scores[c * plane + pix];
                if mx < v {
                    mx = v;
                }
            }

            let mut sum = 0.0;
            for c in 0..labels {
                let e = (scores[c * plane + pix] - mx).exp();
                exps[c] = e;
                sum += e;
            }

            let base = (h * effective.width + w) * labels;
            for c in 0..labels {
                out[base + c] = -(exps[c] / sum).ln();
            }
        }
    }
}
