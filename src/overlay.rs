//! Drawing search results for display.

use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::common::{BvrBox, BvrRecord, SearchResult, SearchSpec};
use crate::data::FsAccess;
use crate::error::BvrError;

pub const MATCH_COLOUR: Rgb<u8> = Rgb([0x23, 0xff, 0x2e]);
pub const OTHER_COLOUR: Rgb<u8> = Rgb([0xff, 0x38, 0x38]);
const LABEL_TEXT_COLOUR: Rgb<u8> = Rgb([255, 255, 255]);
const MATCH_THICKNESS: u32 = 3;
const OTHER_THICKNESS: u32 = 1;

#[derive(Debug, Clone)]
pub struct DisplayOptions {
    pub show_boxes: bool,
    /// Only draw boxes of selected classes.
    pub highlight_matches: bool,
    /// Draw `"<class> <confidence>"` tags on selected boxes when a font is given.
    pub show_labels: bool,
    pub grid_columns: usize,
    pub font_size: f32,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_boxes: true,
            highlight_matches: true,
            show_labels: false,
            grid_columns: 3,
            font_size: 15.0,
        }
    }
}

/// Colour and line thickness for a box of class `label`, or `None` when the
/// box is hidden.
pub fn box_style(label: &str, spec: &SearchSpec, options: &DisplayOptions) -> Option<(Rgb<u8>, u32)> {
    if spec.is_selected(label) {
        Some((MATCH_COLOUR, MATCH_THICKNESS))
    } else if !options.highlight_matches {
        Some((OTHER_COLOUR, OTHER_THICKNESS))
    } else {
        None
    }
}

fn draw_box(img: &mut RgbImage, bbox: &BvrBox, colour: Rgb<u8>, thickness: u32) {
    let (x, y, w, h) = bbox.as_xy_wh_i32();
    for i in 0..thickness as i32 {
        let (w, h) = (w - 2 * i, h - 2 * i);
        if w <= 0 || h <= 0 {
            break;
        }
        draw_hollow_rect_mut(img, Rect::at(x + i, y + i).of_size(w as u32, h as u32), colour);
    }
}

fn draw_label(img: &mut RgbImage, bbox: &BvrBox, text: &str, colour: Rgb<u8>, font: &FontArc, size: f32) {
    let scale = PxScale::from(size);
    let (text_width, text_height) = text_size(scale, font, text);
    let (x, y, _, _) = bbox.as_xy_wh_i32();
    draw_filled_rect_mut(img, Rect::at(x, y).of_size(text_width + 8, text_height + 4), colour);
    draw_text_mut(img, LABEL_TEXT_COLOUR, x + 4, y + 2, scale, font, text);
}

/// Draws the boxes of `record` onto `img` according to `spec` and `options`.
pub fn draw_detections(
    img: &mut RgbImage,
    record: &BvrRecord,
    spec: &SearchSpec,
    options: &DisplayOptions,
    font: Option<&FontArc>,
) {
    if !options.show_boxes {
        return;
    }
    for det in &record.detections {
        let Some((colour, thickness)) = box_style(&det.label, spec, options) else {
            continue;
        };
        draw_box(img, &det.bbox, colour, thickness);

        if let (true, true, Some(font)) = (spec.is_selected(&det.label), options.show_labels, font) {
            draw_label(img, &det.bbox, &det.label_with_confidence(), colour, font, options.font_size);
        }
    }
}

/// Opens the image of `record` and draws its overlay.
pub fn render_record(
    record: &BvrRecord,
    spec: &SearchSpec,
    options: &DisplayOptions,
    font: Option<&FontArc>,
) -> Result<RgbImage, BvrError> {
    let mut img = image::open(&record.image_path)?.to_rgb8();
    draw_detections(&mut img, record, spec, options, font);
    Ok(img)
}

/// Renders every record of `result` as a PNG inside `out_dir`.
///
/// One entry per record, in result order. A record whose image cannot be
/// opened yields an error entry and does not stop the others.
pub fn render_to_dir(
    result: &SearchResult,
    options: &DisplayOptions,
    font: Option<&FontArc>,
    out_dir: &Path,
) -> Result<Vec<Result<PathBuf, BvrError>>, BvrError> {
    FsAccess::create_directory(out_dir)?;

    Ok(result
        .records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let img = render_record(record, &result.spec, options, font)?;
            let stem = Path::new(&record.image_path)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            let out_path = out_dir.join(format!("{:04}_{}.png", i, stem));
            img.save(&out_path)?;
            Ok(out_path)
        })
        .collect())
}

/// Card text for a result: file name, then `class: count` for the selected
/// classes present in the image.
pub fn caption(record: &BvrRecord, spec: &SearchSpec) -> String {
    let items: Vec<String> = record
        .class_counts
        .iter()
        .filter(|(label, _)| spec.is_selected(label))
        .map(|(label, count)| format!("{}: {}", label, count))
        .collect();

    let body = if items.is_empty() {
        "No matches".to_string()
    } else {
        items.join(", ")
    };
    format!("{}\n{}", record.file_name(), body)
}

/// Splits records into rows of `columns` cards.
pub fn grid_rows(records: &[BvrRecord], columns: usize) -> Vec<&[BvrRecord]> {
    records.chunks(columns.max(1)).collect()
}
