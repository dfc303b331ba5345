mod common;

use anyhow::Result;
use common::{init_logging, CenteredInput};
use facefit_vision::{
    CropDetector, FaceHint, FramingParams, Localizer, Point, Rect, RegionDetector, SearchParams,
};
use image::{DynamicImage, GrayImage};

#[test]
fn test_localize_through_adapter() -> Result<()> {
    init_logging();
    let image = GrayImage::new(640, 480);
    let localizer = Localizer::default();

    let mut det = CropDetector::new(&image, CenteredInput::new(50));
    let result = localizer.localize(&mut det)?;
    println!("{:?}", result);

    assert_eq!(result.fitted_frame, Some(Rect::new(273, 204, 96, 72)));
    let face = result.final_face.expect("final face");
    assert!(face.center().distance(&Point::new(320, 240)) <= 2.0);
    assert_eq!(result.probes, det.probes());
    assert_eq!(det.into_inner().calls, result.probes);
    Ok(())
}

#[test]
fn test_localize_around_hint_maps_back() -> Result<()> {
    let image = DynamicImage::ImageLuma8(GrayImage::new(640, 480));
    let hint = FaceHint::new(Point::new(320, 240), 40);
    let localizer = Localizer::new(SearchParams {
        accept_unstable_size: true,
        ..SearchParams::default()
    })?;

    let result =
        localizer.localize_around(&image, &hint, &FramingParams::default(), CenteredInput::new(50))?;
    println!("{:?}", result);

    // Search area is 2.5x the hinted radius on each side.
    let search = Rect::new(220, 140, 200, 200);
    let frame = result.position_frame.expect("position frame");
    assert!(search.contains(&frame));
    let face = result.final_face.expect("final face");
    assert!(
        face.center().distance(&hint.center) <= 4.0,
        "face {} too far from hint",
        face
    );
    Ok(())
}

#[test]
fn test_hint_outside_image_is_rejected() {
    let image = DynamicImage::ImageLuma8(GrayImage::new(64, 48));
    let hint = FaceHint::new(Point::new(100, 10), 5);
    let err = Localizer::default()
        .localize_around(&image, &hint, &FramingParams::default(), CenteredInput::new(5))
        .unwrap_err();
    assert!(matches!(
        err,
        facefit_vision::LocalizeError::DegenerateInput(_)
    ));
}

#[test]
fn test_empty_image_is_rejected() {
    let image = GrayImage::new(0, 0);
    let err = Localizer::default()
        .localize_gray(&image, CenteredInput::new(5))
        .unwrap_err();
    assert!(matches!(
        err,
        facefit_vision::LocalizeError::DegenerateInput(_)
    ));
}
