use std::sync::OnceLock;

use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;

use crate::model_manager::ModelError;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

#[derive(Debug)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: GraphOptimizationLevel,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            inter_threads: 0, // Let ONNX Runtime decide
            intra_threads: 0, // Let ONNX Runtime decide
            optimization_level: GraphOptimizationLevel::Level3,
        }
    }
}

fn copy_level(level: &GraphOptimizationLevel) -> GraphOptimizationLevel {
    match level {
        GraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
        GraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
        GraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        GraphOptimizationLevel::Disable => GraphOptimizationLevel::Disable,
    }
}

impl Clone for RuntimeConfig {
    fn clone(&self) -> Self {
        Self {
            inter_threads: self.inter_threads,
            intra_threads: self.intra_threads,
            optimization_level: copy_level(&self.optimization_level),
        }
    }
}

fn init_onnx_environment() -> ort::Result<()> {
    ort::init().with_name("agrodetect").commit()?;
    Ok(())
}

/// Initializes the ONNX Runtime environment once per process.
///
/// The outcome is remembered: if the native library is missing, every
/// later call reports the same failure without retrying.
pub fn ensure_initialized() -> Result<(), ModelError> {
    // With `load-dynamic`, ort panics when the shared library cannot be loaded.
    INIT.get_or_init(|| match std::panic::catch_unwind(init_onnx_environment) {
        Ok(Ok(())) => {
            log::info!("ONNX Runtime environment initialized");
            Ok(())
        }
        Ok(Err(e)) => {
            log::warn!("ONNX Runtime is not available: {}", e);
            Err(e.to_string())
        }
        Err(_) => {
            log::warn!("ONNX Runtime library could not be loaded");
            Err("failed to load the ONNX Runtime library".to_string())
        }
    })
    .clone()
    .map_err(ModelError::RuntimeUnavailable)
}

pub fn is_available() -> bool {
    ensure_initialized().is_ok()
}

pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, ModelError> {
    ensure_initialized()?;
    let mut builder = Session::builder()?;

    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }
    builder = builder.with_optimization_level(copy_level(&config.optimization_level))?;

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialization_outcome_is_stable() {
        let first = ensure_initialized().is_ok();
        let second = ensure_initialized().is_ok();
        assert_eq!(first, second);
        assert_eq!(is_available(), first);
    }

    #[test]
    fn test_config_clone() {
        let config = RuntimeConfig {
            inter_threads: 2,
            intra_threads: 4,
            optimization_level: GraphOptimizationLevel::Level1,
        };
        let cloned = config.clone();
        assert_eq!(cloned.inter_threads, 2);
        assert_eq!(cloned.intra_threads, 4);
        assert!(matches!(cloned.optimization_level, GraphOptimizationLevel::Level1));
    }
}
