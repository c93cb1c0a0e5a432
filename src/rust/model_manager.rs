use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

pub const DEFAULT_REPO_ID: &str = "Warrior025/plant-disease-model";
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
    #[error("Invalid preprocessor config: {0}")]
    InvalidConfig(String),
    #[error("Invalid model: {0}")]
    InvalidModel(String),
    #[error("ONNX Runtime unavailable: {0}")]
    RuntimeUnavailable(String),
    #[error("Runtime error: {0}")]
    Runtime(#[from] ort::Error),
    #[error("Model acquisition timed out after {0:?}")]
    Timeout(Duration),
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::InvalidConfig(err.to_string())
    }
}

/// Where a model's artifacts live on the hub and what they should hash to.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub repo_id: String,
    pub revision: String,
    pub model_file: String,
    pub preprocessor_file: String,
    /// Expected SHA-256 of the model file; unchecked when `None`
    pub model_hash: Option<String>,
    /// Expected SHA-256 of the preprocessor config; unchecked when `None`
    pub preprocessor_hash: Option<String>,
}

impl Default for ModelInfo {
    fn default() -> Self {
        Self {
            repo_id: DEFAULT_REPO_ID.to_string(),
            revision: "main".to_string(),
            model_file: "model.onnx".to_string(),
            preprocessor_file: "preprocessor_config.json".to_string(),
            model_hash: None,
            preprocessor_hash: None,
        }
    }
}

impl ModelInfo {
    /// Directory name used for this repo in the local cache.
    pub fn cache_name(&self) -> String {
        self.repo_id.replace('/', "--")
    }

    pub fn file_url(&self, endpoint: &str, file: &str) -> String {
        format!(
            "{}/{}/resolve/{}/{}",
            endpoint.trim_end_matches('/'),
            self.repo_id,
            self.revision,
            file
        )
    }
}

#[derive(Clone, Debug)]
pub struct ModelManager {
    models_dir: PathBuf,
    endpoint: String,
    client: reqwest::Client,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        Self::resolve_models_dir(env::var_os("AGRODETECT_CACHE").map(PathBuf::from))
    }

    /// `$AGRODETECT_CACHE/models` when set, otherwise the first usable
    /// per-user cache location.
    fn resolve_models_dir(cache_override: Option<PathBuf>) -> PathBuf {
        if let Some(path) = cache_override {
            return path.join("models");
        }

        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("agrodetect").join("models");
        }

        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("agrodetect").join("models");
        }

        env::temp_dir().join("agrodetect").join("models")
    }

    /// Hub endpoint, honoring `HF_ENDPOINT` for mirrors.
    pub fn get_default_endpoint() -> String {
        env::var("HF_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string())
    }

    pub fn with_options<P: AsRef<Path>>(
        models_dir: P,
        endpoint: impl Into<String>,
        download_timeout: Duration,
    ) -> Result<Self, ModelError> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        let client = reqwest::Client::builder().timeout(download_timeout).build()?;
        Ok(Self {
            models_dir,
            endpoint: endpoint.into(),
            client,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn get_model_path(&self, info: &ModelInfo) -> PathBuf {
        self.models_dir.join(info.cache_name()).join(&info.model_file)
    }

    pub fn get_preprocessor_path(&self, info: &ModelInfo) -> PathBuf {
        self.models_dir.join(info.cache_name()).join(&info.preprocessor_file)
    }

    pub fn is_model_downloaded(&self, info: &ModelInfo) -> bool {
        let model_path = self.get_model_path(info);
        let preprocessor_path = self.get_preprocessor_path(info);
        log::debug!("Model path: {:?} (exists: {})", model_path, model_path.exists());
        log::debug!(
            "Preprocessor path: {:?} (exists: {})",
            preprocessor_path,
            preprocessor_path.exists()
        );
        model_path.exists() && preprocessor_path.exists()
    }

    pub async fn download_model(&self, info: &ModelInfo) -> Result<(), ModelError> {
        let _lock = self.download_lock.lock().await;

        let model_dir = self.models_dir.join(info.cache_name());
        log::info!("Creating model directory at {:?}", model_dir);
        fs::create_dir_all(&model_dir)?;

        let model_path = self.get_model_path(info);
        let model_result = self
            .ensure_file(info, &info.model_file, &model_path, info.model_hash.as_deref(), "model")
            .await;

        let preprocessor_path = self.get_preprocessor_path(info);
        let preprocessor_result = self
            .ensure_file(
                info,
                &info.preprocessor_file,
                &preprocessor_path,
                info.preprocessor_hash.as_deref(),
                "preprocessor",
            )
            .await;

        match (model_result, preprocessor_result) {
            (Ok(()), Ok(())) => {
                log::info!("Model and preprocessor ready to use");
                Ok(())
            }
            (Err(e), _) => {
                log::error!("Failed to setup model file: {}", e);
                let _ = self.remove_download(info);
                Err(e)
            }
            (_, Err(e)) => {
                log::error!("Failed to setup preprocessor file: {}", e);
                let _ = self.remove_download(info);
                Err(e)
            }
        }
    }

    async fn ensure_file(
        &self,
        info: &ModelInfo,
        file: &str,
        path: &Path,
        expected_hash: Option<&str>,
        file_type: &str,
    ) -> Result<(), ModelError> {
        if path.exists() {
            if self.verify_file(path, expected_hash)? {
                log::info!("Existing {} file verified successfully", file_type);
                return Ok(());
            }
            log::warn!("{} file verification failed, redownloading", file_type);
        }
        let url = info.file_url(&self.endpoint, file);
        self.download_and_verify_file(&url, path, expected_hash, file_type).await
    }

    fn hash_bytes(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Checks a file against its expected hash. Without an expected hash
    /// only presence and non-emptiness are checked.
    fn verify_file(&self, path: &Path, expected_hash: Option<&str>) -> Result<bool, ModelError> {
        let bytes = fs::read(path)?;
        if bytes.is_empty() {
            return Ok(false);
        }
        match expected_hash {
            Some(expected) => {
                let hash = Self::hash_bytes(&bytes);
                log::debug!("Calculated hash {} for {:?}, expected {}", hash, path, expected);
                Ok(hash.eq_ignore_ascii_case(expected))
            }
            None => Ok(true),
        }
    }

    pub fn verify_model(&self, info: &ModelInfo) -> Result<bool, ModelError> {
        let model_path = self.get_model_path(info);
        let preprocessor_path = self.get_preprocessor_path(info);

        if !model_path.exists() || !preprocessor_path.exists() {
            log::info!("One or both model files do not exist");
            return Ok(false);
        }

        let model_ok = self.verify_file(&model_path, info.model_hash.as_deref())?;
        let preprocessor_ok = self.verify_file(&preprocessor_path, info.preprocessor_hash.as_deref())?;
        log::info!(
            "Verification results: model {}, preprocessor {}",
            model_ok,
            preprocessor_ok
        );
        Ok(model_ok && preprocessor_ok)
    }

    async fn download_and_verify_file(
        &self,
        url: &str,
        path: &Path,
        expected_hash: Option<&str>,
        file_type: &str,
    ) -> Result<(), ModelError> {
        log::info!("Downloading {} file from {} to {:?}", file_type, url, path);
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        if let Some(expected) = expected_hash {
            let hash = Self::hash_bytes(&bytes);
            if !hash.eq_ignore_ascii_case(expected) {
                log::error!("{} hash mismatch: expected {}, got {}", file_type, expected, hash);
                return Err(ModelError::HashMismatch {
                    file_type: file_type.to_string(),
                    expected: expected.to_string(),
                    actual: hash,
                });
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Readers only ever see a missing file or a complete one.
        let partial = Self::partial_path(path);
        fs::write(&partial, &bytes)?;
        if !self.verify_file(&partial, expected_hash)? {
            let _ = fs::remove_file(&partial);
            return Err(ModelError::VerificationFailed);
        }
        fs::rename(&partial, path)?;

        log::info!("{} file downloaded and verified successfully", file_type);
        Ok(())
    }

    fn partial_path(path: &Path) -> PathBuf {
        let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".part");
        path.with_file_name(name)
    }

    pub fn remove_download(&self, info: &ModelInfo) -> Result<(), ModelError> {
        let model_path = self.get_model_path(info);
        let preprocessor_path = self.get_preprocessor_path(info);

        for path in [model_path, preprocessor_path] {
            for candidate in [Self::partial_path(&path), path] {
                if candidate.exists() {
                    fs::remove_file(&candidate)?;
                }
            }
        }
        Ok(())
    }

    /// Ensures that a model is downloaded and verified.
    /// If the model doesn't exist, it will be downloaded.
    /// If verification fails, it will be re-downloaded.
    pub async fn ensure_model_downloaded(&self, info: &ModelInfo) -> Result<(), ModelError> {
        if !self.is_model_downloaded(info) {
            log::info!("Model {} not found, downloading...", info.repo_id);
            self.download_model(info).await?;
        } else if !self.verify_model(info)? {
            log::info!("Model verification failed, re-downloading...");
            self.remove_download(info)?;
            self.download_model(info).await?;
        } else {
            log::info!("Model {} verified", info.repo_id);
        }
        Ok(())
    }
}
