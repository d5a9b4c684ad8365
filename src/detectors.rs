//! Detector collaborators.
//!
//! The search core only needs per-image `(label, confidence, box)` output.
//! [`YoloLabelDetector`] supplies it from the label files a YOLO prediction
//! run writes with `save_txt`, one `<image stem>.txt` per image.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;

use crate::common::{BvrBox, ModelConfig, RawDetection};
use crate::utils;

/// Source of raw detections for a single image.
pub trait Detector: Send + Sync {
    /// Detector identifier.
    fn name(&self) -> &str;

    /// Detect objects in the image at `image_path`.
    ///
    /// Zero detections is a valid answer. An error means this image could not
    /// be processed.
    fn detect(&self, image_path: &Path) -> Result<Vec<RawDetection>>;
}

impl<F> Detector for F
where
    F: Fn(&Path) -> Result<Vec<RawDetection>> + Send + Sync,
{
    fn name(&self) -> &str {
        "fn"
    }

    fn detect(&self, image_path: &Path) -> Result<Vec<RawDetection>> {
        self(image_path)
    }
}

/// Reads YOLO prediction label files and turns them into labelled pixel boxes.
///
/// Each line is `class_id cx cy w h [conf]` with coordinates normalised to
/// the image size. Images without a label file have no detections.
#[derive(Debug, Clone)]
pub struct YoloLabelDetector {
    names: Vec<String>,
    labels_dir: Option<PathBuf>,
}

impl YoloLabelDetector {
    pub fn new(names: Vec<String>, labels_dir: Option<PathBuf>) -> Self {
        Self { names, labels_dir }
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let names_path = config
            .names_path
            .as_ref()
            .ok_or_else(|| anyhow!("a class names file is required (model.names_path)"))?;
        let names = load_class_names(names_path)?;
        log::debug!("Read {} class names from {}", names.len(), names_path.display());
        Ok(Self::new(names, config.labels_dir.clone()))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// `<labels_dir>/<stem>.txt`, where `labels_dir` defaults to `labels/`
    /// next to the image.
    pub fn label_file(&self, image_path: &Path) -> PathBuf {
        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = match &self.labels_dir {
            Some(dir) => dir.clone(),
            None => image_path.parent().unwrap_or_else(|| Path::new("")).join("labels"),
        };
        dir.join(format!("{}.txt", stem))
    }

    fn parse_line(&self, line: &str, img_width: f32, img_height: f32) -> Result<RawDetection> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 && fields.len() != 6 {
            bail!("expected 5 or 6 fields, found {}", fields.len());
        }

        let class_id: usize = fields[0]
            .parse()
            .with_context(|| format!("invalid class id '{}'", fields[0]))?;
        let label = self.names.get(class_id).ok_or_else(|| {
            anyhow!("class id {} is outside the {} known class names", class_id, self.names.len())
        })?;

        let mut values = [0f32; 5];
        values[4] = 1.0;
        for (slot, raw) in values.iter_mut().zip(&fields[1..]) {
            *slot = raw
                .parse()
                .with_context(|| format!("invalid number '{}'", raw))?;
            if !slot.is_finite() {
                bail!("non-finite value '{}'", raw);
            }
        }
        let [cx, cy, w, h, confidence] = values;

        let bbox = BvrBox::from_cxcy_wh(cx * img_width, cy * img_height, w * img_width, h * img_height)
            .clamp_to(img_width, img_height);
        Ok(RawDetection::new(label, confidence.clamp(0., 1.), bbox))
    }
}

impl Detector for YoloLabelDetector {
    fn name(&self) -> &str {
        "yolo-labels"
    }

    fn detect(&self, image_path: &Path) -> Result<Vec<RawDetection>> {
        let (width, height) = image::image_dimensions(image_path)
            .with_context(|| format!("failed to read image {}", image_path.display()))?;

        let label_file = self.label_file(image_path);
        if !label_file.is_file() {
            log::debug!("No label file for {}, treating as empty", image_path.display());
            return Ok(Vec::new());
        }

        let lines = utils::file_to_vec(&label_file)
            .with_context(|| format!("failed to read {}", label_file.display()))?;

        lines
            .iter()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                self.parse_line(line, width as f32, height as f32)
                    .with_context(|| format!("{}:{}", label_file.display(), i + 1))
            })
            .collect()
    }
}

/// Loads class names, either one per line or as a YOLO metadata dictionary
/// such as `{0: 'person', 1: 'bicycle'}`.
pub fn load_class_names(path: &Path) -> Result<Vec<String>> {
    let lines = utils::file_to_vec(path)
        .with_context(|| format!("failed to read class names from {}", path.display()))?;

    let is_dict = lines
        .iter()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| line.trim_start().starts_with('{'));

    let names = if is_dict {
        parse_names_dict(&lines.join(" "))?
    } else {
        lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    };

    if names.is_empty() {
        bail!("no class names found in {}", path.display());
    }
    Ok(names)
}

fn parse_names_dict(raw: &str) -> Result<Vec<String>> {
    let re = Regex::new(r#"(\d+)\s*:\s*(?:'([^']*)'|"([^"]*)")"#)?;
    let mut by_id: BTreeMap<usize, String> = BTreeMap::new();
    for caps in re.captures_iter(raw) {
        let id: usize = caps[1].parse()?;
        let name = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        by_id.insert(id, name);
    }

    let names: Vec<String> = by_id.values().cloned().collect();
    if by_id.keys().copied().ne(0..names.len()) {
        bail!("class ids in names dictionary are not contiguous from 0");
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_dictionary() {
        let names = parse_names_dict(r#"{0: 'person', 1: "traffic light", 2: 'yellow_lady slipper'}"#).unwrap();
        assert_eq!(names, vec!["person", "traffic light", "yellow_lady slipper"]);
    }

    #[test]
    fn names_dictionary_must_be_contiguous() {
        assert!(parse_names_dict("{0: 'a', 2: 'c'}").is_err());
    }

    #[test]
    fn parses_label_lines() {
        let detector = YoloLabelDetector::new(vec!["cat".into(), "dog".into()], None);
        let det = detector.parse_line("1 0.5 0.5 0.2 0.4 0.87", 100.0, 50.0).unwrap();
        assert_eq!(det.label, "dog");
        assert_eq!(det.confidence, 0.87);
        assert_eq!(det.bbox.xy1_xy2(), (40.0, 15.0, 60.0, 35.0));

        let no_conf = detector.parse_line("0 0.5 0.5 1.0 1.0", 10.0, 10.0).unwrap();
        assert_eq!(no_conf.confidence, 1.0);
    }

    #[test]
    fn rejects_unknown_ids_and_bad_lines() {
        let detector = YoloLabelDetector::new(vec!["cat".into()], None);
        assert!(detector.parse_line("3 0.5 0.5 0.2 0.2", 10.0, 10.0).is_err());
        assert!(detector.parse_line("0 0.5 0.5", 10.0, 10.0).is_err());
        assert!(detector.parse_line("0 a 0.5 0.2 0.2", 10.0, 10.0).is_err());
        assert!(detector.parse_line("0 nan 0.5 0.2 0.2 0.9", 10.0, 10.0).is_err());
        assert!(detector.parse_line("0 0.5 0.5 inf 0.2", 10.0, 10.0).is_err());
        assert!(detector.parse_line("0 0.5 0.5 0.2 0.2 NaN", 10.0, 10.0).is_err());
    }

    #[test]
    fn label_file_location() {
        let detector = YoloLabelDetector::new(vec![], None);
        assert_eq!(
            detector.label_file(Path::new("imgs/a.b.jpg")),
            PathBuf::from("imgs/labels/a.b.txt")
        );
        let detector = YoloLabelDetector::new(vec![], Some(PathBuf::from("runs/labels")));
        assert_eq!(
            detector.label_file(Path::new("imgs/x.png")),
            PathBuf::from("runs/labels/x.txt")
        );
    }
}
