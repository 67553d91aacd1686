// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Draws labeled detection boxes onto a copy of the source image

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::PathBuf;
use tracing::{info, warn};

use super::detector::{ClassTag, DetectionBox};

/// Ultralytics palette, indexed by detector class tag
const PALETTE: [u32; 20] = [
    0xFF3838, 0xFF9D97, 0xFF701F, 0xFFB21D, 0xCFD231, 0x48F90A, 0x92CC17, 0x3DDB86, 0x1A9334,
    0x00D4BB, 0x2C99A8, 0x00C2FF, 0x344593, 0x6473FF, 0x0018EC, 0x8438FF, 0x520085, 0xCB38FF,
    0xFF95C8, 0xFF37C7,
];

const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Default box outline width in pixels
pub const DEFAULT_LINE_WIDTH: u32 = 6;

/// Fonts tried, in order, when no label font is configured
pub const SYSTEM_FONT_PATHS: [&str; 5] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// First readable system font, if any
pub fn load_system_font() -> Option<FontVec> {
    for path in &SYSTEM_FONT_PATHS {
        if let Ok(data) = std::fs::read(path) {
            if let Ok(font) = FontVec::try_from_vec(data) {
                info!("Loaded system font: {}", path);
                return Some(font);
            }
        }
    }
    None
}

/// Stable box color for a detector class
pub fn class_color(tag: ClassTag) -> Rgb<u8> {
    let hex = PALETTE[tag.0 as usize % PALETTE.len()];
    Rgb([(hex >> 16) as u8, (hex >> 8) as u8, hex as u8])
}

#[derive(Debug, Clone)]
pub struct AnnotatorConfig {
    pub line_width: u32,
    /// TrueType font for label tabs; system fonts are tried when unset
    pub font_path: Option<PathBuf>,
    pub font_scale: f32,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            line_width: DEFAULT_LINE_WIDTH,
            font_path: None,
            font_scale: 20.0,
        }
    }
}

/// One box to draw, with its display label and outline color
#[derive(Debug, Clone)]
pub struct Annotation {
    pub detection: DetectionBox,
    pub label: String,
    pub color: Rgb<u8>,
}

pub struct ImageAnnotator {
    line_width: u32,
    font: Option<FontVec>,
    font_scale: f32,
}

impl std::fmt::Debug for ImageAnnotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageAnnotator")
            .field("line_width", &self.line_width)
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl ImageAnnotator {
    /// Create an annotator with a label font
    ///
    /// A configured `font_path` must load. Without one the standard system
    /// font locations are searched, and labels are dropped only if none loads.
    pub fn new(config: AnnotatorConfig) -> Result<Self> {
        let font = match config.font_path {
            Some(ref path) => {
                let data = std::fs::read(path)
                    .with_context(|| format!("Failed to read font file {}", path.display()))?;
                let font = FontVec::try_from_vec(data)
                    .map_err(|_| anyhow::anyhow!("Failed to parse font file: {}", path.display()))?;
                info!("Loaded annotation font: {}", path.display());
                Some(font)
            }
            None => {
                let font = load_system_font();
                if font.is_none() {
                    warn!("No system font found, boxes will be drawn without labels");
                }
                font
            }
        };

        Ok(Self {
            line_width: config.line_width.max(1),
            font,
            font_scale: config.font_scale,
        })
    }

    /// Boxes only, no label text
    pub fn without_font(line_width: u32) -> Self {
        Self {
            line_width: line_width.max(1),
            font: None,
            font_scale: AnnotatorConfig::default().font_scale,
        }
    }

    pub fn line_width(&self) -> u32 {
        self.line_width
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Width and height of the filled tab behind `label`, when labels are drawn
    pub fn label_tab_size(&self, label: &str) -> Option<(u32, u32)> {
        let font = self.font.as_ref()?;
        if label.is_empty() {
            return None;
        }
        let (text_w, text_h) = text_size(PxScale::from(self.font_scale), font, label);
        let pad = self.label_padding();
        Some((text_w + 2 * pad, text_h + 2 * pad))
    }

    fn label_padding(&self) -> u32 {
        (self.line_width / 2).max(1)
    }

    /// Draw every annotation, in order, onto a copy of `base`
    ///
    /// `base` is never modified. Boxes that clamp to nothing are ignored.
    pub fn annotate(&self, base: &RgbImage, annotations: &[Annotation]) -> RgbImage {
        let mut canvas = base.clone();
        let (width, height) = canvas.dimensions();

        for annotation in annotations {
            let bounds = annotation.detection.pixel_bounds(width, height);
            if bounds.is_empty() {
                continue;
            }

            let (bw, bh) = (bounds.width(), bounds.height());
            let thickness = self.line_width.min(bw.div_ceil(2)).min(bh.div_ceil(2));
            for t in 0..thickness {
                let rect = Rect::at((bounds.x0 + t) as i32, (bounds.y0 + t) as i32)
                    .of_size(bw - 2 * t, bh - 2 * t);
                draw_hollow_rect_mut(&mut canvas, rect, annotation.color);
            }

            if let Some(ref font) = self.font {
                self.draw_label(&mut canvas, font, bounds.x0, bounds.y0, annotation);
            }
        }

        canvas
    }

    fn draw_label(
        &self,
        canvas: &mut RgbImage,
        font: &FontVec,
        x0: u32,
        y0: u32,
        annotation: &Annotation,
    ) {
        let Some((tab_w, tab_h)) = self.label_tab_size(&annotation.label) else {
            return;
        };
        let pad = self.label_padding();

        // Above the box when there is room, otherwise inside its top edge
        let tab_y = if y0 >= tab_h { y0 - tab_h } else { y0 };

        draw_filled_rect_mut(
            canvas,
            Rect::at(x0 as i32, tab_y as i32).of_size(tab_w.max(1), tab_h.max(1)),
            annotation.color,
        );
        draw_text_mut(
            canvas,
            TEXT_COLOR,
            (x0 + pad) as i32,
            (tab_y + pad) as i32,
            PxScale::from(self.font_scale),
            font,
            &annotation.label,
        );
    }
}
