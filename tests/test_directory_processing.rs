use std::fs;
use std::path::Path;

use anyhow::bail;
use bvr_search::common::{BvrBox, RawDetection};
use bvr_search::data::{self, build_index, load};
use bvr_search::detection_runners::{collect_images, process_directory, RunOptions};
use bvr_search::detectors::{load_class_names, Detector, YoloLabelDetector};
use bvr_search::BvrError;

mod fixtures;
use fixtures::write_png;

/// Reports one `cat` per digit in the file stem, fails on stems starting with `bad`.
fn count_digits(image_path: &Path) -> anyhow::Result<Vec<RawDetection>> {
    let stem = image_path.file_stem().unwrap().to_string_lossy().to_string();
    if stem.starts_with("bad") {
        bail!("cannot decode {}", stem);
    }
    let n = stem.chars().filter(|c| c.is_ascii_digit()).count();
    Ok((0..n)
        .map(|i| RawDetection::new("cat", 0.1 * (i + 1) as f32, BvrBox::new(0., 0., 4., 4.)))
        .collect())
}

#[test]
fn empty_directory_gives_empty_collection() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("raw").join("empty");
    fs::create_dir_all(&dir).unwrap();

    let report = process_directory(&dir, &count_digits, &RunOptions::new()).unwrap();
    assert!(report.records.is_empty());
    assert!(report.failures.is_empty());

    let saved = data::save(&report.records, &dir).unwrap();
    assert_eq!(fs::read_to_string(saved).unwrap().trim(), "[]");

    let index = build_index(&report.records);
    assert!(index.unique_classes.is_empty());
    assert!(index.count_options.is_empty());
}

#[test]
fn missing_directory_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("nope");
    assert!(matches!(
        process_directory(&missing, &count_digits, &RunOptions::new()),
        Err(BvrError::InvalidDirectory(_))
    ));

    let file = tmp.path().join("file.jpg");
    fs::write(&file, b"x").unwrap();
    assert!(matches!(collect_images(&file, &[".jpg".to_string()]), Err(BvrError::InvalidDirectory(_))));
}

#[test]
fn one_corrupt_image_among_nine_good_ones() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("raw").join("street");
    let labels = dir.join("labels");
    fs::create_dir_all(&labels).unwrap();

    for i in 0..9 {
        write_png(&dir.join(format!("img{}.png", i)), 40, 20);
    }
    fs::write(dir.join("broken.jpg"), b"definitely not a jpeg").unwrap();
    fs::write(labels.join("img0.txt"), "0 0.5 0.5 0.5 0.5 0.9\n1 0.25 0.25 0.1 0.2 0.8\n0 0.1 0.1 0.1 0.1 0.6\n").unwrap();
    fs::write(labels.join("img1.txt"), "1 0.5 0.5 1.0 1.0 0.1\n").unwrap();

    let names = tmp.path().join("names.txt");
    fs::write(&names, "person\ncar\n").unwrap();
    let detector = YoloLabelDetector::new(load_class_names(&names).unwrap(), None);

    let report = process_directory(&dir, &detector, &RunOptions::new()).unwrap();
    assert_eq!(report.records.len(), 9);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, dir.join("broken.jpg"));
    assert!(report.records.iter().all(|r| !r.image_path.ends_with("broken.jpg")));

    let img0 = &report.records[0];
    assert!(img0.image_path.ends_with("img0.png"));
    assert_eq!(img0.total_objects, 3);
    assert_eq!(img0.count_of("person"), 2);
    assert_eq!(img0.count_of("car"), 1);
    assert_eq!(img0.detections[0].bbox.xy1_xy2(), (10.0, 5.0, 30.0, 15.0));

    // below the default confidence threshold
    let img1 = &report.records[1];
    assert_eq!(img1.total_objects, 0);
    assert!(img1.unique_classes.is_empty());

    let err: BvrError = report.failures[0].clone().into();
    assert!(matches!(err, BvrError::ImageDetection { .. }));
}

#[test]
fn extensions_match_case_insensitively_and_once() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    for name in ["a.JPG", "b.jpg", "c.Png", "d.gif", "e.txt"] {
        fs::write(dir.join(name), b"").unwrap();
    }
    fs::create_dir(dir.join("nested.jpg")).unwrap();

    let extensions: Vec<String> = ["jpg", ".JPG", ".png"].iter().map(|e| e.to_string()).collect();
    let found = collect_images(dir, &extensions).unwrap();
    let names: Vec<String> = found
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["a.JPG", "b.jpg", "c.Png"]);
}

#[test]
fn failures_are_skipped_and_confidence_filtered() {
    let tmp = tempfile::tempdir().unwrap();
    for name in ["1.jpg", "22.jpg", "bad.jpg", "333.jpg"] {
        fs::write(tmp.path().join(name), b"").unwrap();
    }

    let options = RunOptions::new().with_conf_threshold(0.2);
    let report = process_directory(tmp.path(), &count_digits, &options).unwrap();

    let counts: Vec<u32> = report.records.iter().map(|r| r.count_of("cat")).collect();
    assert_eq!(counts, vec![0, 1, 2]);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].cause.contains("cannot decode bad"));
}

#[test]
fn parallel_run_matches_sequential_run() {
    let tmp = tempfile::tempdir().unwrap();
    for i in 0..40 {
        fs::write(tmp.path().join(format!("{:03}.png", i * 7)), b"").unwrap();
    }
    fs::write(tmp.path().join("bad_one.png"), b"").unwrap();

    let options = RunOptions::new().with_extensions(&[".png"]).with_conf_threshold(0.0);
    let sequential = process_directory(tmp.path(), &count_digits, &options).unwrap();
    let parallel = process_directory(tmp.path(), &count_digits, &options.clone().with_parallel(true)).unwrap();

    assert_eq!(sequential.records, parallel.records);
    assert_eq!(sequential.failures, parallel.failures);
    assert_eq!(parallel.records.len(), 40);
}

#[test]
fn plain_functions_act_as_detectors() {
    assert_eq!(count_digits.name(), "fn");
    let found = count_digits.detect(Path::new("12.jpg")).unwrap();
    assert_eq!(found.len(), 2);
}

#[test]
fn non_finite_label_values_fail_only_that_image() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("raw").join("odd");
    let labels = dir.join("labels");
    fs::create_dir_all(&labels).unwrap();
    write_png(&dir.join("a.png"), 10, 10);
    write_png(&dir.join("b.png"), 10, 10);
    write_png(&dir.join("c.png"), 10, 10);
    fs::write(labels.join("a.txt"), "0 nan 0.5 0.2 0.2 0.9\n").unwrap();
    fs::write(labels.join("b.txt"), "0 0.5 0.5 inf 0.2 0.9\n").unwrap();
    fs::write(labels.join("c.txt"), "0 0.5 0.5 0.2 0.2 0.9\n").unwrap();

    let detector = YoloLabelDetector::new(vec!["cat".to_string()], None);
    let report = process_directory(&dir, &detector, &RunOptions::new()).unwrap();

    assert_eq!(report.records.len(), 1);
    assert!(report.records[0].image_path.ends_with("c.png"));
    let failed: Vec<_> = report.failures.iter().map(|f| f.path.clone()).collect();
    assert_eq!(failed, vec![dir.join("a.png"), dir.join("b.png")]);

    let saved = data::save(&report.records, &dir).unwrap();
    assert_eq!(load(&saved).unwrap(), report.records);
}

#[test]
fn out_of_range_detector_output_fails_the_image() {
    let tmp = tempfile::tempdir().unwrap();
    for name in ["inf.jpg", "nan.jpg", "big.jpg", "ok.jpg"] {
        fs::write(tmp.path().join(name), b"").unwrap();
    }

    let detector = |path: &Path| -> anyhow::Result<Vec<RawDetection>> {
        let stem = path.file_stem().unwrap().to_string_lossy().to_string();
        let det = match stem.as_str() {
            "inf" => RawDetection::new("cat", f32::INFINITY, BvrBox::new(0., 0., 2., 2.)),
            "nan" => RawDetection::new("cat", 0.5, BvrBox { x1: f32::NAN, ..Default::default() }),
            "big" => RawDetection::new("cat", 7.5, BvrBox::new(0., 0., 2., 2.)),
            _ => RawDetection::new("cat", 0.5, BvrBox::new(0., 0., 2., 2.)),
        };
        Ok(vec![det])
    };
    let report = process_directory(tmp.path(), &detector, &RunOptions::new()).unwrap();

    assert_eq!(report.records.len(), 1);
    assert!(report.records[0].image_path.ends_with("ok.jpg"));
    assert_eq!(report.failures.len(), 3);
    assert!(report.records.iter().flat_map(|r| &r.detections).all(|d| (0.0..=1.0).contains(&d.confidence)));

    let saved = data::save(&report.records, tmp.path()).unwrap();
    assert_eq!(load(&saved).unwrap(), report.records);
}
