use std::fs;
use std::path::Path;
use std::time::Duration;

use agrodetect::{
    ensure_initialized, HubConfig, HubModelSource, InferenceConnector, InferencePath, ModelError,
    ModelInfo, ModelSource,
};
use image::{DynamicImage, Rgb, RgbImage};

/// Hub settings pointing at a closed local port so downloads fail fast.
fn offline_config(dir: &Path) -> HubConfig {
    HubConfig {
        models_dir: dir.to_path_buf(),
        endpoint: "http://127.0.0.1:9".to_string(),
        download_timeout: Duration::from_secs(5),
        ..HubConfig::default()
    }
}

fn place_files(source: &HubModelSource, model: &[u8], preprocessor: &str) -> Result<(), Box<dyn std::error::Error>> {
    let info = &source.config().model;
    let dir = source.config().models_dir.join(info.cache_name());
    fs::create_dir_all(&dir)?;
    fs::write(dir.join(&info.model_file), model)?;
    fs::write(dir.join(&info.preprocessor_file), preprocessor)?;
    Ok(())
}

fn files_present(source: &HubModelSource) -> (bool, bool) {
    let info: &ModelInfo = &source.config().model;
    let dir = source.config().models_dir.join(info.cache_name());
    (
        dir.join(&info.model_file).exists(),
        dir.join(&info.preprocessor_file).exists(),
    )
}

fn leaf() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(120, 120, Rgb([80, 150, 60])))
}

#[tokio::test]
async fn test_failed_download_degrades_to_demo_mode() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let connector = InferenceConnector::from_hub(offline_config(dir.path()));

    let classification = connector.classify_detailed(&leaf()).await?;
    assert_eq!(classification.path, InferencePath::ModelUnavailable);
    assert!(classification.result.is_simulated());
    assert!(!connector.is_model_available().await);

    let source = HubModelSource::new(offline_config(dir.path()));
    assert_eq!(files_present(&source), (false, false));
    Ok(())
}

#[tokio::test]
async fn test_invalid_preprocessor_config_is_removed() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let source = HubModelSource::new(offline_config(dir.path()));
    place_files(&source, b"garbage!!", r#"{"image_mean": [0.5]}"#)?;

    let err = source.prepare().await.unwrap_err();
    assert!(matches!(err, ModelError::InvalidConfig(_)), "got {:?}", err);
    assert_eq!(files_present(&source), (false, false));

    // Nothing is left to reuse, so the next attempt goes back to the network.
    let err = source.prepare().await.unwrap_err();
    assert!(matches!(err, ModelError::DownloadError(_)), "got {:?}", err);
    Ok(())
}

#[tokio::test]
async fn test_invalid_preprocessor_config_falls_back() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let source = HubModelSource::new(offline_config(dir.path()));
    place_files(&source, b"garbage!!", "not json")?;

    match source.fetch().await {
        Err(ModelError::InvalidConfig(_)) => assert!(ensure_initialized().is_ok()),
        Err(ModelError::RuntimeUnavailable(_)) => assert!(ensure_initialized().is_err()),
        other => panic!("unexpected fetch outcome: {:?}", other.map(|h| h.name)),
    }

    let connector = InferenceConnector::from_hub(offline_config(dir.path()));
    let classification = connector.classify_detailed(&leaf()).await?;
    assert_eq!(classification.path, InferencePath::ModelUnavailable);
    assert!(classification.result.is_simulated());
    Ok(())
}

#[tokio::test]
async fn test_corrupt_model_file_is_refetched() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let source = HubModelSource::new(offline_config(dir.path()));
    // Truncated model next to a valid config: both pass the unpinned check.
    place_files(&source, b"truncated", "{}")?;

    let first = source.fetch().await;
    if ensure_initialized().is_err() {
        assert!(matches!(first, Err(ModelError::RuntimeUnavailable(_))));
        return Ok(());
    }

    assert!(
        matches!(first, Err(ModelError::Runtime(_)) | Err(ModelError::InvalidModel(_))),
        "got {:?}",
        first.map(|h| h.name)
    );
    assert_eq!(files_present(&source), (false, false));

    for _ in 0..2 {
        let retry = source.fetch().await;
        assert!(
            matches!(retry, Err(ModelError::DownloadError(_))),
            "got {:?}",
            retry.map(|h| h.name)
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_manager_is_shared_across_calls() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let source = HubModelSource::new(offline_config(dir.path()));

    let first = source.manager().await?;
    let second = source.manager().await?;
    assert!(std::ptr::eq(first, second));
    Ok(())
}
