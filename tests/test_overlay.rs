use ab_glyph::FontArc;
use bvr_search::common::{BvrBox, MetadataCollection, RawDetection, SearchMode, SearchSpec};
use bvr_search::detection_processing::build_record;
use bvr_search::overlay::{draw_detections, render_record, render_to_dir, DisplayOptions, MATCH_COLOUR, OTHER_COLOUR};
use bvr_search::query_engine::evaluate;
use image::{Rgb, RgbImage};

mod fixtures;
use fixtures::write_png;

#[test]
fn renders_matches_and_reports_unreadable_images() {
    let tmp = tempfile::tempdir().unwrap();
    let image_path = tmp.path().join("street.png");
    write_png(&image_path, 64, 48);

    let collection = MetadataCollection::new(vec![
        build_record(
            &image_path.to_string_lossy(),
            vec![
                RawDetection::new("car", 0.9, BvrBox::new(4., 4., 30., 30.)),
                RawDetection::new("person", 0.7, BvrBox::new(40., 10., 60., 40.)),
            ],
        ),
        build_record(
            &tmp.path().join("gone.png").to_string_lossy(),
            vec![RawDetection::new("car", 0.5, BvrBox::new(0., 0., 5., 5.))],
        ),
    ]);
    let result = evaluate(&collection, &SearchSpec::new(&["car"], SearchMode::Any));
    assert_eq!(result.len(), 2);

    let out_dir = tmp.path().join("rendered");
    let outcomes = render_to_dir(&result, &DisplayOptions::default(), None, &out_dir).unwrap();
    assert_eq!(outcomes.len(), 2);

    let written = outcomes[0].as_ref().unwrap();
    assert!(written.is_file());
    let img = image::open(written).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (64, 48));
    assert_eq!(*img.get_pixel(4, 4), MATCH_COLOUR);
    assert_ne!(*img.get_pixel(40, 10), OTHER_COLOUR);

    assert!(outcomes[1].is_err());
}

#[test]
fn unselected_boxes_show_when_not_highlighting() {
    let tmp = tempfile::tempdir().unwrap();
    let image_path = tmp.path().join("yard.png");
    write_png(&image_path, 32, 32);

    let record = build_record(
        &image_path.to_string_lossy(),
        vec![
            RawDetection::new("cat", 0.9, BvrBox::new(2., 2., 10., 10.)),
            RawDetection::new("dog", 0.9, BvrBox::new(15., 15., 30., 30.)),
        ],
    );
    let spec = SearchSpec::new(&["cat"], SearchMode::Any);
    let options = DisplayOptions {
        highlight_matches: false,
        ..Default::default()
    };

    let img = render_record(&record, &spec, &options, None).unwrap();
    assert_eq!(*img.get_pixel(2, 2), MATCH_COLOUR);
    assert_eq!(*img.get_pixel(15, 15), OTHER_COLOUR);
    assert_ne!(*img.get_pixel(16, 16), OTHER_COLOUR);
}

#[test]
fn labels_are_drawn_with_a_font() {
    let font = FontArc::try_from_slice(include_bytes!("DejaVuSansMono.ttf")).unwrap();
    let record = build_record(
        "yard.png",
        vec![
            RawDetection::new("cat", 0.9, BvrBox::new(10., 10., 50., 40.)),
            RawDetection::new("dog", 0.9, BvrBox::new(60., 30., 110., 55.)),
        ],
    );
    let spec = SearchSpec::new(&["cat"], SearchMode::Any);
    let whitish = |img: &RgbImage| img.pixels().filter(|p| p[0] > 200 && p[2] > 200).count();

    let mut plain = RgbImage::new(120, 60);
    draw_detections(&mut plain, &record, &spec, &DisplayOptions::default(), Some(&font));
    assert_eq!(whitish(&plain), 0);
    assert_eq!(*plain.get_pixel(55, 12), Rgb([0, 0, 0]));

    let options = DisplayOptions {
        show_labels: true,
        ..Default::default()
    };
    let mut labelled = RgbImage::new(120, 60);
    draw_detections(&mut labelled, &record, &spec, &options, Some(&font));
    assert!(whitish(&labelled) > 0);
    assert_ne!(*labelled.get_pixel(55, 12), Rgb([0, 0, 0]));

    // no label for the unselected class
    assert_eq!(*labelled.get_pixel(100, 32), Rgb([0, 0, 0]));
}
