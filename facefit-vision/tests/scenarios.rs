mod common;

use anyhow::Result;
use common::{centered_face, init_logging, CenteredInput, Scripted};
use facefit_vision::{CropDetector, Localizer, Point, Rect, RegionDetector};
use image::GrayImage;

#[test]
fn test_centered_face_is_found_at_image_center() -> Result<()> {
    init_logging();
    let mut det = Scripted::new(640, 480, centered_face(100, 50 * 50));
    let result = Localizer::default().localize(&mut det)?;
    println!("{:?}", result);

    let face = result.final_face.expect("final face");
    let center = face.center();
    assert!(center.distance(&Point::new(320, 240)) <= 2.0, "center {:?}", center);
    assert!(result.size_stable);
    assert_eq!(result.probes, det.probes());
    Ok(())
}

#[test]
fn test_empty_oracle_terminates_quickly() -> Result<()> {
    let mut det = Scripted::new(640, 480, |_: &Rect| Vec::new());
    let result = Localizer::default().localize(&mut det)?;

    assert!(result.is_empty());
    assert_eq!(result.fitted_frame, None);
    assert_eq!(result.position_face, None);
    // The outer region, then the middle window of each axis scan.
    assert_eq!(det.probes(), 3);
    assert_eq!(result.probes, 3);
    Ok(())
}

#[test]
fn test_spurious_candidate_does_not_change_result() -> Result<()> {
    init_logging();
    let image = GrayImage::new(640, 480);
    let localizer = Localizer::default();

    let clean = localizer.localize(&mut CropDetector::new(&image, CenteredInput::new(50)))?;
    let noisy =
        localizer.localize(&mut CropDetector::new(&image, CenteredInput::with_spurious(50)))?;
    println!("clean: {:?}\nnoisy: {:?}", clean, noisy);

    assert!(clean.final_face.is_some());
    assert_eq!(clean, noisy);
    Ok(())
}

#[test]
fn test_scripted_spurious_candidate_ignored() -> Result<()> {
    let mut face = centered_face(100, 50 * 50);
    let mut det = Scripted::new(640, 480, move |probe: &Rect| {
        let mut faces = face(probe);
        faces.insert(0, Rect::new(probe.x, probe.y, 10, 10));
        faces
    });
    let result = Localizer::default().localize(&mut det)?;

    let mut clean = Scripted::new(640, 480, centered_face(100, 50 * 50));
    let expected = Localizer::default().localize(&mut clean)?;
    assert_eq!(result.final_face, expected.final_face);
    Ok(())
}
