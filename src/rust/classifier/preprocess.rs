use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use ndarray::Array4;
use serde::Deserialize;

use crate::model_manager::ModelError;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];
const DEFAULT_SIDE: u32 = 224;

/// Target size as written in a Hugging Face `preprocessor_config.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ImageSize {
    Exact { height: u32, width: u32 },
    ShortestEdge { shortest_edge: u32 },
    Square(u32),
}

impl Default for ImageSize {
    fn default() -> Self {
        ImageSize::Exact {
            height: DEFAULT_SIDE,
            width: DEFAULT_SIDE,
        }
    }
}

/// Image preprocessing pipeline for the classifier.
///
/// Mirrors the subset of the transformers image processor options that
/// ResNet/ViT-style checkpoints use: resize (optionally shortest-edge
/// plus center crop), rescale, per-channel normalization. Output is a
/// `[1, 3, H, W]` tensor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImagePreprocessor {
    #[serde(default = "default_true")]
    pub do_resize: bool,
    #[serde(default)]
    pub size: ImageSize,
    /// PIL resampling filter code
    #[serde(default = "default_resample")]
    pub resample: u8,
    #[serde(default)]
    pub crop_pct: Option<f32>,
    #[serde(default = "default_true")]
    pub do_rescale: bool,
    #[serde(default = "default_rescale_factor")]
    pub rescale_factor: f32,
    #[serde(default = "default_true")]
    pub do_normalize: bool,
    #[serde(default = "default_mean")]
    pub image_mean: Vec<f32>,
    #[serde(default = "default_std")]
    pub image_std: Vec<f32>,
}

fn default_true() -> bool {
    true
}

fn default_resample() -> u8 {
    2
}

fn default_rescale_factor() -> f32 {
    1.0 / 255.0
}

fn default_mean() -> Vec<f32> {
    IMAGENET_MEAN.to_vec()
}

fn default_std() -> Vec<f32> {
    IMAGENET_STD.to_vec()
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self {
            do_resize: true,
            size: ImageSize::default(),
            resample: default_resample(),
            crop_pct: None,
            do_rescale: true,
            rescale_factor: default_rescale_factor(),
            do_normalize: true,
            image_mean: default_mean(),
            image_std: default_std(),
        }
    }
}

impl ImagePreprocessor {
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let preprocessor: Self = serde_json::from_str(json)?;
        preprocessor.validate()?;
        Ok(preprocessor)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.image_mean.len() != 3 || self.image_std.len() != 3 {
            return Err(ModelError::InvalidConfig(format!(
                "image_mean and image_std need 3 entries, got {} and {}",
                self.image_mean.len(),
                self.image_std.len()
            )));
        }
        if self.image_std.iter().any(|s| *s == 0.0) {
            return Err(ModelError::InvalidConfig("image_std contains a zero".into()));
        }
        let side_ok = match self.size {
            ImageSize::Exact { height, width } => height > 0 && width > 0,
            ImageSize::ShortestEdge { shortest_edge } => shortest_edge > 0,
            ImageSize::Square(side) => side > 0,
        };
        if !side_ok {
            return Err(ModelError::InvalidConfig("size must be non-zero".into()));
        }
        if let Some(pct) = self.crop_pct {
            if !(pct > 0.0 && pct <= 1.0) {
                return Err(ModelError::InvalidConfig(format!("crop_pct {} out of range", pct)));
            }
        }
        Ok(())
    }

    fn filter(&self) -> FilterType {
        match self.resample {
            0 => FilterType::Nearest,
            1 => FilterType::Lanczos3,
            3 => FilterType::CatmullRom,
            _ => FilterType::Triangle,
        }
    }

    /// Height and width of the tensor this preprocessor produces.
    pub fn output_size(&self) -> Option<(u32, u32)> {
        if !self.do_resize {
            return None;
        }
        Some(match self.size {
            ImageSize::Exact { height, width } => (height, width),
            ImageSize::ShortestEdge { shortest_edge } => (shortest_edge, shortest_edge),
            ImageSize::Square(side) => (side, side),
        })
    }

    fn resize(&self, rgb: RgbImage) -> RgbImage {
        if !self.do_resize {
            return rgb;
        }
        let filter = self.filter();
        match self.size {
            ImageSize::Exact { height, width } => imageops::resize(&rgb, width, height, filter),
            ImageSize::Square(side) => imageops::resize(&rgb, side, side, filter),
            ImageSize::ShortestEdge { shortest_edge } => {
                let target = match self.crop_pct {
                    Some(pct) => (shortest_edge as f32 / pct).round() as u32,
                    None => shortest_edge,
                };
                let (w, h) = rgb.dimensions();
                let (new_w, new_h) = if w <= h {
                    (target, ((h as f32 * target as f32) / w as f32).round().max(1.0) as u32)
                } else {
                    (((w as f32 * target as f32) / h as f32).round().max(1.0) as u32, target)
                };
                let resized = imageops::resize(&rgb, new_w, new_h, filter);
                let x = new_w.saturating_sub(shortest_edge) / 2;
                let y = new_h.saturating_sub(shortest_edge) / 2;
                imageops::crop_imm(&resized, x, y, shortest_edge, shortest_edge).to_image()
            }
        }
    }

    /// Turns an image into model input.
    pub fn preprocess(&self, image: &DynamicImage) -> Array4<f32> {
        let rgb = self.resize(image.to_rgb8());
        let (width, height) = rgb.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in rgb.enumerate_pixels() {
            for c in 0..3 {
                let mut value = pixel[c] as f32;
                if self.do_rescale {
                    value *= self.rescale_factor;
                }
                if self.do_normalize {
                    value = (value - self.image_mean[c]) / self.image_std[c];
                }
                tensor[[0, c, y as usize, x as usize]] = value;
            }
        }
        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_default_shape() {
        let image = DynamicImage::new_rgb8(300, 180);
        let tensor = ImagePreprocessor::default().preprocess(&image);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_normalization_values() {
        let mut rgb = RgbImage::new(60, 60);
        for p in rgb.pixels_mut() {
            *p = Rgb([255, 0, 128]);
        }
        let pre = ImagePreprocessor {
            do_resize: false,
            image_mean: vec![0.5, 0.5, 0.5],
            image_std: vec![0.5, 0.5, 0.5],
            ..ImagePreprocessor::default()
        };
        let tensor = pre.preprocess(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(tensor.shape(), &[1, 3, 60, 60]);
        assert!((tensor[[0, 0, 10, 10]] - 1.0).abs() < 1e-5);
        assert!((tensor[[0, 1, 10, 10]] + 1.0).abs() < 1e-5);
        assert!(tensor[[0, 2, 10, 10]].abs() < 0.01);
    }

    #[test]
    fn test_parse_shortest_edge_config() {
        let json = r#"{
            "crop_pct": 0.875,
            "do_normalize": true,
            "do_resize": true,
            "image_processor_type": "ConvNextImageProcessor",
            "image_mean": [0.485, 0.456, 0.406],
            "image_std": [0.229, 0.224, 0.225],
            "resample": 3,
            "rescale_factor": 0.00392156862745098,
            "size": {"shortest_edge": 224}
        }"#;
        let pre = ImagePreprocessor::from_json(json).unwrap();
        assert_eq!(pre.size, ImageSize::ShortestEdge { shortest_edge: 224 });
        assert_eq!(pre.output_size(), Some((224, 224)));
        let tensor = pre.preprocess(&DynamicImage::new_rgb8(400, 300));
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_rejects_bad_normalization() {
        assert!(ImagePreprocessor::from_json(r#"{"image_mean": [0.5, 0.5]}"#).is_err());
        assert!(ImagePreprocessor::from_json(r#"{"image_std": [0.5, 0.0, 0.5]}"#).is_err());
        assert!(ImagePreprocessor::from_json(r#"{"size": 0}"#).is_err());
    }
}
