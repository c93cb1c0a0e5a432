use image::{ColorType, DynamicImage};

use super::error::ValidationError;

pub const MIN_IMAGE_SIDE: u32 = 50;

pub const VALID_MESSAGE: &str = "Image is valid";

/// PIL-style name of an image's color mode.
///
/// Bit depth is ignored: a 16-bit RGB image reports `RGB`.
pub fn color_mode_name(image: &DynamicImage) -> String {
    match image.color() {
        ColorType::L8 | ColorType::L16 => "L".to_string(),
        ColorType::La8 | ColorType::La16 => "LA".to_string(),
        ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => "RGB".to_string(),
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => "RGBA".to_string(),
        other => format!("{:?}", other),
    }
}

fn is_supported_mode(mode: &str) -> bool {
    matches!(mode, "RGB" | "RGBA" | "L")
}

/// Checks that an image can be classified at all.
///
/// Rules are applied in order and the first failure is reported:
/// presence, minimum size, then color mode.
pub fn validate_image(image: Option<&DynamicImage>) -> Result<(), ValidationError> {
    let image = image.ok_or(ValidationError::NoImage)?;

    let (width, height) = (image.width(), image.height());
    if width < MIN_IMAGE_SIDE || height < MIN_IMAGE_SIDE {
        return Err(ValidationError::TooSmall {
            width,
            height,
            min: MIN_IMAGE_SIDE,
        });
    }

    let mode = color_mode_name(image);
    if !is_supported_mode(&mode) {
        return Err(ValidationError::UnsupportedMode(mode));
    }

    Ok(())
}

/// Flag-and-reason form of [`validate_image`] for display code.
pub fn validate(image: Option<&DynamicImage>) -> (bool, String) {
    match validate_image(image) {
        Ok(()) => (true, VALID_MESSAGE.to_string()),
        Err(e) => (false, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_is_checked_before_mode() {
        let image = DynamicImage::new_luma_a8(10, 10);
        assert!(matches!(
            validate_image(Some(&image)),
            Err(ValidationError::TooSmall { width: 10, height: 10, .. })
        ));
    }

    #[test]
    fn test_boundary_size_is_accepted() {
        let image = DynamicImage::new_rgb8(MIN_IMAGE_SIDE, MIN_IMAGE_SIDE);
        assert!(validate_image(Some(&image)).is_ok());
        let narrow = DynamicImage::new_rgb8(MIN_IMAGE_SIDE - 1, 400);
        assert!(validate_image(Some(&narrow)).is_err());
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(color_mode_name(&DynamicImage::new_luma16(1, 1)), "L");
        assert_eq!(color_mode_name(&DynamicImage::new_rgba16(1, 1)), "RGBA");
        assert_eq!(color_mode_name(&DynamicImage::new_rgb32f(1, 1)), "RGB");
        assert_eq!(color_mode_name(&DynamicImage::new_luma_a16(1, 1)), "LA");
    }
}
