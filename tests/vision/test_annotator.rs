// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Image annotator tests

use crate::common::{detection, test_image};
use flockscan::vision::{class_color, Annotation, AnnotatorConfig, ClassTag, ImageAnnotator};
use image::{Rgb, RgbImage};

const LABEL: &str = "Healthy: 90.00%";

fn annotation(x0: f32, y0: f32, x1: f32, y1: f32, tag: u32) -> Annotation {
    labeled(x0, y0, x1, y1, tag, LABEL)
}

fn labeled(x0: f32, y0: f32, x1: f32, y1: f32, tag: u32, label: &str) -> Annotation {
    Annotation {
        detection: detection(x0, y0, x1, y1, 0.9, tag),
        label: label.to_string(),
        color: class_color(ClassTag(tag)),
    }
}

/// Helper: Annotator backed by a system font, or None on hosts without one
fn font_annotator() -> Option<ImageAnnotator> {
    let annotator = ImageAnnotator::new(AnnotatorConfig::default()).unwrap();
    if annotator.has_font() {
        Some(annotator)
    } else {
        eprintln!("No system font available, skipping label drawing test");
        None
    }
}

/// Helper: True when any pixel in the region is close to the white label text
fn has_text_pixel(image: &RgbImage, x: u32, y: u32, w: u32, h: u32) -> bool {
    (y..y + h).any(|py| (x..x + w).any(|px| image.get_pixel(px, py).0[1] > 200))
}

/// Test 1: Boxes use the configured line width
#[test]
fn test_line_width_from_config() {
    let annotator = ImageAnnotator::new(AnnotatorConfig::default()).unwrap();
    assert_eq!(annotator.line_width(), 6);

    let base = image::RgbImage::new(100, 100);
    let out = annotator.annotate(&base, &[annotation(10.0, 10.0, 90.0, 90.0, 3)]);
    let color = class_color(ClassTag(3));

    for offset in 0..6 {
        assert_eq!(out.get_pixel(10 + offset, 50), &color);
    }
    assert_eq!(out.get_pixel(16, 50), &Rgb([0, 0, 0]));
}

/// Test 2: Boxes partly outside the image are clipped, not rejected
#[test]
fn test_box_clipped_to_image() {
    let base = test_image(50, 50);
    let out = ImageAnnotator::without_font(2).annotate(&base, &[annotation(-10.0, -10.0, 30.0, 30.0, 0)]);

    assert_eq!(out.dimensions(), (50, 50));
    assert_eq!(out.get_pixel(0, 10), &class_color(ClassTag(0)));
    assert_eq!(out.get_pixel(29, 10), &class_color(ClassTag(0)));
    assert_eq!(out.get_pixel(40, 40), base.get_pixel(40, 40));
}

/// Test 3: Different detector classes get different colors
#[test]
fn test_palette_distinguishes_classes() {
    let colors: Vec<Rgb<u8>> = (0..20).map(|t| class_color(ClassTag(t))).collect();
    for (i, a) in colors.iter().enumerate() {
        for b in colors.iter().skip(i + 1) {
            assert_ne!(a, b);
        }
    }
}

// =============================================================================
// Label tabs
// =============================================================================

/// Test 4: The label tab sits above a box that has room for it
#[test]
fn test_label_tab_drawn_above_box() {
    let Some(annotator) = font_annotator() else {
        return;
    };
    let (tab_w, tab_h) = annotator.label_tab_size(LABEL).unwrap();
    assert!(tab_h < 99 && tab_w < 280, "tab {}x{} too large", tab_w, tab_h);

    let base = RgbImage::new(320, 200);
    let out = annotator.annotate(&base, &[annotation(20.0, 100.0, 300.0, 190.0, 0)]);
    let color = class_color(ClassTag(0));

    // Padding row just above the box is tab fill, the row above the tab is untouched
    assert_eq!(out.get_pixel(21, 99), &color);
    assert_eq!(out.get_pixel(21, 100 - tab_h - 1), &Rgb([0, 0, 0]));
    assert!(has_text_pixel(&out, 20, 100 - tab_h, tab_w, tab_h));
}

/// Test 5: A box touching the top edge gets its tab inside the box
#[test]
fn test_label_tab_inside_box_at_top_edge() {
    let Some(annotator) = font_annotator() else {
        return;
    };
    let (tab_w, tab_h) = annotator.label_tab_size(LABEL).unwrap();
    assert!(tab_h > 8 && tab_h < 150 && tab_w < 270);

    let base = RgbImage::new(320, 200);
    let out = annotator.annotate(&base, &[annotation(20.0, 0.0, 300.0, 190.0, 0)]);

    // Bottom-right padding of the tab, well past the 6px outline
    assert_eq!(out.get_pixel(20 + tab_w - 2, tab_h - 2), &class_color(ClassTag(0)));
    assert_eq!(out.get_pixel(20 + tab_w - 2, tab_h + 2), &Rgb([0, 0, 0]));
    assert!(has_text_pixel(&out, 20, 0, tab_w, tab_h));
}

/// Test 6: An empty label draws the box but no tab
#[test]
fn test_empty_label_draws_no_tab() {
    let Some(annotator) = font_annotator() else {
        return;
    };
    assert_eq!(annotator.label_tab_size(""), None);

    let base = RgbImage::new(320, 200);
    let out = annotator.annotate(&base, &[labeled(20.0, 100.0, 300.0, 190.0, 0, "")]);

    assert_eq!(out.get_pixel(20, 100), &class_color(ClassTag(0)));
    assert_eq!(out.get_pixel(21, 99), &Rgb([0, 0, 0]));
    assert!(!has_text_pixel(&out, 0, 0, 320, 100));
}
