use agrodetect::{validate, validate_image, ValidationError};
use image::{DynamicImage, ImageBuffer, Rgb};

#[test]
fn test_missing_image() {
    let (valid, reason) = validate(None);
    assert!(!valid);
    assert_eq!(reason, "No image provided");
    assert_eq!(validate_image(None), Err(ValidationError::NoImage));
}

#[test]
fn test_too_small() {
    let image = DynamicImage::new_rgb8(10, 10);
    let (valid, reason) = validate(Some(&image));
    assert!(!valid);
    assert!(reason.contains("minimum 50x50"), "reason was {}", reason);
}

#[test]
fn test_one_short_side_is_enough_to_reject() {
    for (w, h) in [(49, 500), (500, 49)] {
        let image = DynamicImage::new_rgb8(w, h);
        assert!(matches!(
            validate_image(Some(&image)),
            Err(ValidationError::TooSmall { .. })
        ));
    }
}

#[test]
fn test_standard_rgb_is_valid() {
    let image = DynamicImage::new_rgb8(224, 224);
    assert_eq!(validate(Some(&image)), (true, "Image is valid".to_string()));
}

#[test]
fn test_allowed_modes() {
    let images = [
        DynamicImage::new_rgb8(64, 64),
        DynamicImage::new_rgba8(64, 64),
        DynamicImage::new_luma8(64, 64),
        DynamicImage::new_rgb16(64, 64),
        DynamicImage::new_luma16(64, 64),
    ];
    for image in &images {
        assert!(validate(Some(image)).0, "{:?} rejected", image.color());
    }
}

#[test]
fn test_unsupported_mode_is_named() {
    let image = DynamicImage::new_luma_a8(64, 64);
    let (valid, reason) = validate(Some(&image));
    assert!(!valid);
    assert_eq!(reason, "Unsupported image mode: LA. Please upload RGB images");
}

#[test]
fn test_decoded_upload_is_valid() {
    let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(120, 90, Rgb([40, 160, 60]));
    let mut png = Vec::new();
    DynamicImage::ImageRgb8(buffer)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let decoded = image::load_from_memory(&png).unwrap();
    assert!(validate_image(Some(&decoded)).is_ok());
}
