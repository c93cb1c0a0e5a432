use std::sync::Arc;

use agrodetect::{
    dataset_info, recommendations_for, recommendations_for_class, DiseaseClass, InferenceConnector,
    ModelError, ModelHandle, ModelSource, Severity,
};
use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};

/// Host without ONNX Runtime.
struct NoRuntime;

#[async_trait]
impl ModelSource for NoRuntime {
    fn describe(&self) -> String {
        "no-runtime".to_string()
    }

    async fn fetch(&self) -> Result<ModelHandle, ModelError> {
        Err(ModelError::RuntimeUnavailable("libonnxruntime not found".into()))
    }
}

#[tokio::test]
async fn test_upload_without_runtime_end_to_end() {
    let connector = InferenceConnector::new(Arc::new(NoRuntime));
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 300, Rgb([90, 140, 70])));

    let (valid, reason) = connector.validate(Some(&image));
    assert!(valid);
    assert_eq!(reason, "Image is valid");

    let result = connector.classify(&image).await.unwrap();
    assert!(result.is_simulated());
    assert!(DiseaseClass::labels().any(|label| label == result.predicted_label()));
    assert!(!connector.is_model_available().await);

    let advice = recommendations_for(result.predicted_label());
    assert!(!advice.actions.is_empty());
}

#[test]
fn test_healthy_labels_need_no_treatment() {
    for label in ["Tomato Healthy", "tomato healthy", "Apple healthy leaf", "HEALTHY"] {
        let record = recommendations_for(label);
        assert_eq!(record.status, "Healthy");
        assert_eq!(record.severity, Severity::Low);
        assert!(record.message.contains("healthy"));
    }
    assert_eq!(
        recommendations_for_class(DiseaseClass::TomatoHealthy),
        recommendations_for("Tomato Healthy")
    );
}

#[test]
fn test_unknown_disease_gets_generic_guidance() {
    let record = recommendations_for("Some Unknown Disease");
    assert_eq!(record.severity, Severity::Medium);
    assert_eq!(record.status, "Disease Detected");
    assert_eq!(record.message, "Disease detected: Some Unknown Disease");
    assert_eq!(record.actions.len(), 5);
    assert!(record.actions[0].contains("Isolate"));
    assert!(!record.prevention.is_empty());
}

#[test]
fn test_known_disease_guidance() {
    let record = recommendations_for("Potato Late Blight");
    assert_eq!(record.severity, Severity::High);
    assert!(record.message.contains("Late Blight"));
    assert_eq!(record.actions[0], "Remove and destroy infected plants immediately");

    let record = recommendations_for("Tomato Early Blight");
    assert_eq!(record.severity, Severity::Medium);
    assert_eq!(record.prevention.len(), 4);
}

#[test]
fn test_dataset_info_lists_vocabulary() {
    let info = dataset_info();
    assert_eq!(info.total_images, 1600);
    assert_eq!(info.classes, DiseaseClass::labels().collect::<Vec<_>>());
    assert_eq!(info.model_architecture, "ResNet-50");
}
