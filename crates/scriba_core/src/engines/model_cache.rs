//! Load-once cache for heavyweight engine handles.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::{StepError, StepResult};

/// Cache of loaded engine handles keyed by name.
///
/// The lock is held across the load, so two callers asking for the
/// same key never load it twice.
#[derive(Default)]
pub struct ModelCache {
    entries: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the handle under `key`, loading it on first use.
    ///
    /// A failed load caches nothing; the next call retries.
    pub fn get_or_create<T, F>(&self, key: &str, loader: F) -> StepResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> StepResult<T>,
    {
        let mut entries = self.entries.lock();

        if let Some(handle) = entries.get(key) {
            return handle.clone().downcast::<T>().map_err(|_| {
                StepError::precondition_failed(format!(
                    "cached handle '{key}' has a different type"
                ))
            });
        }

        tracing::debug!("loading '{}'", key);
        let handle = Arc::new(loader()?);
        entries.insert(key.to_string(), handle.clone());
        Ok(handle)
    }

    /// Number of loaded handles.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every loaded handle.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
