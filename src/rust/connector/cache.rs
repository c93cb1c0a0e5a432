use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::source::ModelSource;
use crate::classifier::ModelHandle;
use crate::model_manager::ModelError;

#[derive(Debug)]
enum Slot {
    Empty,
    Ready(Arc<ModelHandle>),
    Unavailable {
        reason: String,
        permanent: bool,
        since: Instant,
    },
}

enum Lookup {
    Hit(Arc<ModelHandle>),
    Skip(String),
    Miss,
}

/// Holds the loaded model for the connector that owns it.
///
/// Write-once, read-many. The lock is never held while fetching, so
/// callers racing on an empty cache may each fetch; the last successful
/// write wins. A missing runtime is remembered for the cache's lifetime,
/// other failures only for `retry_after`.
#[derive(Debug)]
pub struct ModelCache {
    slot: RwLock<Slot>,
    retry_after: Duration,
}

impl ModelCache {
    pub fn new(retry_after: Duration) -> Self {
        Self {
            slot: RwLock::new(Slot::Empty),
            retry_after,
        }
    }

    /// The cached handle, without attempting a fetch.
    pub fn get(&self) -> Option<Arc<ModelHandle>> {
        match &*self.slot.read().unwrap_or_else(PoisonError::into_inner) {
            Slot::Ready(handle) => Some(Arc::clone(handle)),
            _ => None,
        }
    }

    pub fn is_permanently_unavailable(&self) -> bool {
        matches!(
            &*self.slot.read().unwrap_or_else(PoisonError::into_inner),
            Slot::Unavailable { permanent: true, .. }
        )
    }

    pub fn clear(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Slot::Empty;
    }

    fn lookup(&self) -> Lookup {
        match &*self.slot.read().unwrap_or_else(PoisonError::into_inner) {
            Slot::Ready(handle) => Lookup::Hit(Arc::clone(handle)),
            Slot::Unavailable { reason, permanent: true, .. } => Lookup::Skip(reason.clone()),
            Slot::Unavailable { reason, since, .. } if since.elapsed() < self.retry_after => {
                Lookup::Skip(reason.clone())
            }
            _ => Lookup::Miss,
        }
    }

    /// Returns the cached handle, fetching it from `source` on a miss.
    ///
    /// Never fails: fetch errors and timeouts are logged, remembered and
    /// reported as `None`.
    pub async fn get_or_acquire(
        &self,
        source: &dyn ModelSource,
        timeout: Duration,
    ) -> Option<Arc<ModelHandle>> {
        match self.lookup() {
            Lookup::Hit(handle) => return Some(handle),
            Lookup::Skip(reason) => {
                debug!("Model still unavailable: {}", reason);
                return None;
            }
            Lookup::Miss => {}
        }

        info!("Acquiring model from {}", source.describe());
        let outcome = match tokio::time::timeout(timeout, source.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout(timeout)),
        };

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(handle) => {
                let handle = Arc::new(handle);
                *slot = Slot::Ready(Arc::clone(&handle));
                info!("Model {} cached", handle.name);
                Some(handle)
            }
            Err(e) => {
                warn!("Model unavailable, using demo mode: {}", e);
                // A concurrent caller may have succeeded in the meantime.
                if let Slot::Ready(handle) = &*slot {
                    return Some(Arc::clone(handle));
                }
                *slot = Slot::Unavailable {
                    reason: e.to_string(),
                    permanent: matches!(e, ModelError::RuntimeUnavailable(_)),
                    since: Instant::now(),
                };
                None
            }
        }
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}
