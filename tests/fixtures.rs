#![allow(dead_code)]

use std::path::Path;

use bvr_search::common::{BvrBox, BvrRecord, MetadataCollection, RawDetection};
use bvr_search::detection_processing::build_record;
use image::{Rgb, RgbImage};

/// A record holding `n` boxes for each `(label, n)`.
pub(crate) fn record(image_path: &str, classes: &[(&str, u32)]) -> BvrRecord {
    let raw = classes
        .iter()
        .flat_map(|&(label, n)| {
            (0..n).map(move |i| {
                let offset = i as f32 * 10.0;
                RawDetection::new(label, 0.9, BvrBox::new(offset, offset, offset + 8.0, offset + 8.0))
            })
        })
        .collect();
    build_record(image_path, raw)
}

/// Image1 `{cat: 2, dog: 1}`, Image2 `{cat: 1}`.
pub(crate) fn cats_and_dogs() -> MetadataCollection {
    MetadataCollection::new(vec![
        record("raw/pets/image1.jpg", &[("cat", 2), ("dog", 1)]),
        record("raw/pets/image2.jpg", &[("cat", 1)]),
    ])
}

pub(crate) fn write_png(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
    img.save(path).unwrap();
}

pub(crate) fn paths(collection: &[BvrRecord]) -> Vec<&str> {
    collection.iter().map(|r| r.image_path.as_str()).collect()
}
