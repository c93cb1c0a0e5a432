use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::OnceCell;

use crate::classifier::{ImagePreprocessor, ModelHandle, OnnxImageModel};
use crate::model_manager::{ModelError, ModelInfo, ModelManager};
use crate::runtime::{self, RuntimeConfig};

/// Somewhere a ready-to-use model can be obtained from.
#[async_trait]
pub trait ModelSource: Send + Sync {
    /// Name used in log messages.
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<ModelHandle, ModelError>;
}

/// Settings for fetching the classifier from a Hugging Face style hub.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub models_dir: PathBuf,
    pub endpoint: String,
    pub model: ModelInfo,
    pub download_timeout: Duration,
    pub runtime: RuntimeConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            models_dir: ModelManager::get_default_models_dir(),
            endpoint: ModelManager::get_default_endpoint(),
            model: ModelInfo::default(),
            download_timeout: Duration::from_secs(300),
            runtime: RuntimeConfig::default(),
        }
    }
}

/// Downloads (or reuses) the ONNX export and preprocessor config, then
/// builds an ONNX Runtime session.
///
/// One [`ModelManager`] is shared by every fetch so downloads are
/// serialized. Artifacts that download fine but fail to load are deleted,
/// so the next retry starts from fresh files.
#[derive(Debug)]
pub struct HubModelSource {
    config: HubConfig,
    manager: OnceCell<ModelManager>,
}

impl HubModelSource {
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            manager: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub async fn manager(&self) -> Result<&ModelManager, ModelError> {
        self.manager
            .get_or_try_init(|| async {
                ModelManager::with_options(
                    &self.config.models_dir,
                    self.config.endpoint.clone(),
                    self.config.download_timeout,
                )
            })
            .await
    }

    /// Makes sure the artifacts are on disk and parses the preprocessor
    /// config. Returns the preprocessor and the model file path.
    pub async fn prepare(&self) -> Result<(ImagePreprocessor, PathBuf), ModelError> {
        let info = &self.config.model;
        let manager = self.manager().await?;
        manager.ensure_model_downloaded(info).await?;

        match ImagePreprocessor::from_file(manager.get_preprocessor_path(info)) {
            Ok(preprocessor) => Ok((preprocessor, manager.get_model_path(info))),
            Err(e) => {
                self.discard(manager);
                Err(e)
            }
        }
    }

    fn discard(&self, manager: &ModelManager) {
        warn!("Removing unusable files for {}", self.describe());
        if let Err(e) = manager.remove_download(&self.config.model) {
            warn!("Failed to remove model files: {}", e);
        }
    }
}

#[async_trait]
impl ModelSource for HubModelSource {
    fn describe(&self) -> String {
        format!("{}@{}", self.config.model.repo_id, self.config.model.revision)
    }

    async fn fetch(&self) -> Result<ModelHandle, ModelError> {
        // Checked first so hosts without the runtime never download anything.
        runtime::ensure_initialized()?;

        let (preprocessor, model_path) = self.prepare().await?;
        let runtime = self.config.runtime.clone();
        let model = tokio::task::spawn_blocking(move || OnnxImageModel::from_file(model_path, &runtime))
            .await
            .map_err(|e| ModelError::InvalidModel(format!("Session build task failed: {}", e)))?;
        let model = match model {
            Ok(model) => model,
            Err(e) => {
                self.discard(self.manager().await?);
                return Err(e);
            }
        };

        info!("Loaded classifier {}", self.describe());
        Ok(ModelHandle::new(self.config.model.repo_id.clone(), preprocessor, Arc::new(model)))
    }
}
