use image::{Rgb, RgbImage};
use ndarray::{s, Array2, Array4};

use mrcnn_common::{BoundingBox, Window};
use mrcnn_molding::{mold_inputs, unmold_detections, MoldConfig, RawDetections};

/// Create a test image with a diagonal gradient
fn create_test_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            ((x + y) % 256) as u8,
            ((x * 2) % 256) as u8,
            ((y * 2) % 256) as u8,
        ])
    })
}

/// Fixed-capacity zero-padded detections buffer in network output form
fn padded_detections(rows: &[[f32; 6]], capacity: usize) -> Array2<f32> {
    let mut buffer = Array2::zeros((capacity, 6));
    for (i, row) in rows.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            buffer[[i, j]] = *value;
        }
    }
    buffer
}

fn test_config() -> MoldConfig {
    MoldConfig {
        image_min_dim: 32,
        image_max_dim: 64,
        image_padding: true,
        num_classes: 4,
        ..Default::default()
    }
}

#[test]
fn test_molding_produces_uniform_batch_with_metadata() {
    let images = vec![create_test_image(48, 32), create_test_image(20, 60)];
    let batch = mold_inputs(&images, &test_config()).unwrap();

    assert_eq!(batch.images.dim(), (2, 3, 64, 64));

    // 32x48 fits untouched and is centered on the square canvas
    assert_eq!(batch.windows[0], Window::new(16, 8, 48, 56));
    // 60x20 is upscaled to the 64 cap and centered horizontally
    assert_eq!(batch.windows[1], Window::new(0, 21, 64, 42));

    for (meta, image) in batch.metas.iter().zip(&images) {
        assert_eq!(meta.tag, 0);
        assert_eq!(meta.original_height, image.height());
        assert_eq!(meta.original_width, image.width());
        assert_eq!(meta.active_class_ids, vec![0; 4]);
    }
    assert_eq!(batch.metas[0].window, batch.windows[0]);
}

#[test]
fn test_full_pipeline_maps_detections_into_original_frame() {
    let images = vec![create_test_image(48, 32)];
    let batch = mold_inputs(&images, &test_config()).unwrap();
    let window = batch.windows[0];

    // Network-style outputs: capacity 8, one real detection inside the
    // window, the rest zero-padded
    let raw = padded_detections(&[[20.0, 12.0, 40.0, 44.0, 1.0, 0.9]], 8);
    let detections = RawDetections::from_padded(raw).unwrap();
    assert_eq!(detections.len(), 1);

    let masks = Array4::ones((8, 4, 14, 14));
    let result = unmold_detections(&detections, masks.view(), (32, 48), &window).unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.boxes[0], BoundingBox::new(4, 4, 24, 36));
    assert_eq!(result.class_ids[0], 1);
    assert!((result.scores[0] - 0.9).abs() < 1e-6);

    // The decoded mask covers exactly the remapped box
    let mask = &result.masks[0];
    assert_eq!(mask.dimensions(), (48, 32));
    let foreground = mask.pixels().filter(|p| p[0] == 255).count();
    assert_eq!(foreground, 32 * 20);
}

#[test]
fn test_box_roundtrip_through_mold_and_unmold() {
    let images = vec![create_test_image(20, 60)];
    let batch = mold_inputs(&images, &test_config()).unwrap();
    let window = batch.windows[0];
    let scale = f64::from(window.height()) / 60.0;

    // A box drawn in the original 60x20 frame, mapped forward into the
    // molded frame the same way molding moved the pixels
    let original = [10.0, 5.0, 25.0, 15.0];
    let molded = [
        original[0] * scale + f64::from(window.y1),
        original[1] * scale + f64::from(window.x1),
        original[2] * scale + f64::from(window.y1),
        original[3] * scale + f64::from(window.x1),
    ];

    let raw = padded_detections(
        &[[
            molded[0] as f32,
            molded[1] as f32,
            molded[2] as f32,
            molded[3] as f32,
            2.0,
            0.8,
        ]],
        4,
    );
    let detections = RawDetections::from_padded(raw).unwrap();
    let masks = Array4::ones((4, 4, 14, 14));

    let result = unmold_detections(&detections, masks.view(), (60, 20), &window).unwrap();

    assert_eq!(result.len(), 1);
    let bbox = result.boxes[0];
    assert!((bbox.y1 - 10).abs() <= 1);
    assert!((bbox.x1 - 5).abs() <= 1);
    assert!((bbox.y2 - 25).abs() <= 1);
    assert!((bbox.x2 - 15).abs() <= 1);
}

#[test]
fn test_pipeline_with_unconverged_network_output() {
    // Early-training style output: every box degenerate after remapping
    let images = vec![create_test_image(48, 32)];
    let batch = mold_inputs(&images, &test_config()).unwrap();

    let raw = padded_detections(
        &[
            [20.0, 12.0, 20.0, 44.0, 1.0, 0.3],
            [25.0, 30.0, 40.0, 30.0, 3.0, 0.2],
        ],
        8,
    );
    let detections = RawDetections::from_padded(raw).unwrap();
    let masks = Array4::ones((8, 4, 14, 14));

    let result =
        unmold_detections(&detections, masks.view(), (32, 48), &batch.windows[0]).unwrap();

    assert!(result.is_empty());
    assert!(result.masks.is_empty());
}

#[test]
fn test_pipeline_selects_per_class_masks() {
    let images = vec![create_test_image(48, 32)];
    let batch = mold_inputs(&images, &test_config()).unwrap();

    // Foreground only on class 3's channel for detection 0 and class 1's
    // channel for detection 1
    let mut masks = Array4::zeros((8, 4, 14, 14));
    masks.slice_mut(s![0, 3, .., ..]).fill(1.0);
    masks.slice_mut(s![1, 1, .., ..]).fill(1.0);

    let raw = padded_detections(
        &[
            [20.0, 12.0, 40.0, 44.0, 3.0, 0.9],
            [24.0, 16.0, 32.0, 24.0, 1.0, 0.7],
        ],
        8,
    );
    let detections = RawDetections::from_padded(raw).unwrap();

    let result =
        unmold_detections(&detections, masks.view(), (32, 48), &batch.windows[0]).unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result.class_ids, vec![3, 1]);
    for (bbox, mask) in result.boxes.iter().zip(&result.masks) {
        let foreground = mask.pixels().filter(|p| p[0] == 255).count() as i64;
        assert_eq!(foreground, bbox.area());
    }
}
