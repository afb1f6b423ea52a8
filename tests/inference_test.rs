use crf_refine::{
    refine, ColorImage, ColorKernel, CrfConfig, CrfError, ImageExtent, MeanFieldCrf,
    PositionKernel,
};

fn softmax2(a: f32, b: f32) -> (f32, f32) {
    let mx = a.max(b);
    let ea = (a - mx).exp();
    let eb = (b - mx).exp();
    (ea / (ea + eb), eb / (ea + eb))
}

#[test]
fn two_by_two_no_kernels_matches_plain_softmax() {
    // pixel-major scores [[2,0],[0,2],[1,1],[0,0]] as label-major planes
    let scores = vec![
        2.0, 0.0, 1.0, 0.0, // label 0
        0.0, 2.0, 1.0, 0.0, // label 1
    ];
    let extent = ImageExtent::new(2, 2);
    let config = CrfConfig {
        iterations: 5,
        position_kernels: Vec::new(),
        color_kernels: Vec::new(),
        expects_color: false,
    };

    let result = refine(&scores, 2, extent, extent, None, &config).unwrap();

    // ties at pixels 2 and 3 resolve to label 0
    assert_eq!(result.label_map, vec![0, 1, 0, 0]);

    // score maps stay at the start-state softmax across all iterations
    for pix in 0..4 {
        let (p0, p1) = softmax2(scores[pix], scores[4 + pix]);
        assert!((result.scores[pix] - p0).abs() < 1e-6);
        assert!((result.scores[4 + pix] - p1).abs() < 1e-6);
    }
}

#[test]
fn engine_reuse_across_growing_images() {
    let config = CrfConfig {
        iterations: 3,
        position_kernels: vec![PositionKernel { weight: 1.0, sigma_xy: 2.0 }],
        color_kernels: Vec::new(),
        expects_color: false,
    };
    let mut engine = MeanFieldCrf::new(config).unwrap();

    for size in [2usize, 3, 4, 4, 2] {
        let extent = ImageExtent::new(size, size);
        engine.reshape(2, extent);

        let plane = extent.area();
        let scores: Vec<f32> = (0..2 * plane).map(|i| (i as f32 * 0.61).cos()).collect();
        let mut out_scores = vec![0.0; 2 * plane];
        let mut out_labels = vec![0u32; plane];

        engine
            .process(&scores, extent, None, &mut out_scores, &mut out_labels)
            .unwrap();

        for pix in 0..plane {
            let sum = out_scores[pix] + out_scores[plane + pix];
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }
}

#[test]
fn smaller_image_runs_without_reallocation_after_reshape() {
    let config = CrfConfig {
        iterations: 2,
        position_kernels: vec![PositionKernel { weight: 1.0, sigma_xy: 1.0 }],
        color_kernels: Vec::new(),
        expects_color: false,
    };
    let mut engine = MeanFieldCrf::new(config).unwrap();

    // reserve for 4x4, then process a cropped 2x3 content region
    let padded = ImageExtent::new(4, 4);
    engine.reshape(3, padded);

    let plane = padded.area();
    let scores: Vec<f32> = (0..3 * plane).map(|i| (i % 5) as f32).collect();
    let mut out_scores = vec![0.0; 3 * plane];
    let mut out_labels = vec![0u32; plane];

    engine
        .process(
            &scores,
            ImageExtent::new(2, 3),
            None,
            &mut out_scores,
            &mut out_labels,
        )
        .unwrap();

    // outside the 2x3 effective region everything is zero-filled
    for h in 0..4 {
        for w in 0..4 {
            let inside = w < 2 && h < 3;
            let pix = h * 4 + w;
            if !inside {
                assert_eq!(out_labels[pix], 0);
                for c in 0..3 {
                    assert_eq!(out_scores[c * plane + pix], 0.0);
                }
            } else {
                let sum: f32 = (0..3).map(|c| out_scores[c * plane + pix]).sum();
                assert!((sum - 1.0).abs() < 1e-5);
            }
        }
    }
}

#[test]
fn bilateral_kernels_follow_color_edges() {
    // 4x1 image: left half prefers label 0 weakly, right half label 1,
    // with a sharp color edge in the middle. The bilateral kernel
    // couples same-color pixels, so each half stays coherent.
    let extent = ImageExtent::new(4, 1);
    let scores = vec![
        1.0, 0.8, 0.0, 0.0, // label 0
        0.0, 0.0, 0.8, 1.0, // label 1
    ];
    // planar RGB, mean-subtracted by the host
    let color = vec![
        -100.0, -100.0, 100.0, 100.0, // c0
        -100.0, -100.0, 100.0, 100.0, // c1
        -100.0, -100.0, 100.0, 100.0, // c2
    ];
    let config = CrfConfig {
        iterations: 5,
        position_kernels: vec![PositionKernel { weight: 1.0, sigma_xy: 3.0 }],
        color_kernels: vec![ColorKernel { weight: 4.0, sigma_xy: 10.0, sigma_rgb: 20.0 }],
        expects_color: true,
    };

    let result = refine(
        &scores,
        2,
        extent,
        extent,
        Some(ColorImage { data: &color, channels: 3 }),
        &config,
    )
    .unwrap();

    assert_eq!(result.label_map, vec![0, 0, 1, 1]);
    for pix in 0..4 {
        let sum = result.scores[pix] + result.scores[4 + pix];
        assert!((sum - 1.0).abs() < 1e-5);
    }
}

#[test]
fn refine_rejects_color_kernels_without_color_promise() {
    let config = CrfConfig {
        iterations: 1,
        position_kernels: Vec::new(),
        color_kernels: vec![ColorKernel { weight: 4.0, sigma_xy: 121.0, sigma_rgb: 5.0 }],
        expects_color: false,
    };
    let extent = ImageExtent::new(1, 1);

    let err = refine(&[0.0, 0.0], 2, extent, extent, None, &config);
    assert_eq!(err.unwrap_err(), CrfError::ColorKernelsWithoutColor);
}
