//! MAP decoding of the converged distribution.

use crate::ImageExtent;

/// Write the per-label score planes and the argmax label map for one
/// image, covering the full padded region.
///
/// `current` is the converged distribution, pixel-major over the
/// effective region. `scores_out` receives label-major planes over the
/// padded region and `labels_out` the winning label index per pixel;
/// both are zero-filled outside the effective region. Ties go to the
/// lowest label index (strictly-greater comparison while scanning
/// labels in increasing order).
pub fn decode_map(
    current: &[f32],
    labels: usize,
    effective: ImageExtent,
    padded: ImageExtent,
    scores_out: &mut [f32],
    labels_out: &mut [u32],
) {
    let plane = padded.area();
    scores_out[..labels * plane].fill(0.0);
    labels_out[..plane].fill(0);

    for h in 0..effective.height {
        for w in 0..effective.width {
            let base = (h * effective.width + w) * labels;
            let out_pix = h * padded.width + w;

            let mut mx = current[base];
            let mut imx = 0usize;
            scores_out[out_pix] = mx;

            for c in 1..labels {
                let v = current[base + c];
                scores_out[(c * padded.height + h) * padded.width + w] = v;
                if mx < v {
                    mx = v;
                    imx = c;
                }
            }

            labels_out[out_pix] = imx as u32;
        }
    }
}
