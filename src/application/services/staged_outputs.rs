use std::sync::Arc;

use tokio::runtime::Handle;

use crate::application::ports::StagingStore;
use crate::domain::StoragePath;

/// A converted image waiting in the staging store to be archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedOutput {
    pub index: usize,
    pub filename: String,
    pub path: StoragePath,
}

/// Owns the staged outputs of one job and deletes them on release.
///
/// Dropping the guard without calling [`StagedOutputs::release`] (for example
/// while unwinding from a panic) schedules the deletes on the current runtime.
pub struct StagedOutputs {
    store: Arc<dyn StagingStore>,
    outputs: Vec<StagedOutput>,
}

impl StagedOutputs {
    pub fn new(store: Arc<dyn StagingStore>) -> Self {
        Self {
            store,
            outputs: Vec::new(),
        }
    }

    pub fn push(&mut self, output: StagedOutput) {
        self.outputs.push(output);
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StagedOutput> {
        self.outputs.iter()
    }

    /// Deletes every staged object. Returns how many deletes succeeded.
    pub async fn release(mut self) -> usize {
        let outputs = std::mem::take(&mut self.outputs);
        delete_all(self.store.as_ref(), outputs).await
    }
}

impl Drop for StagedOutputs {
    fn drop(&mut self) {
        if self.outputs.is_empty() {
            return;
        }

        let outputs = std::mem::take(&mut self.outputs);
        let store = Arc::clone(&self.store);
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    delete_all(store.as_ref(), outputs).await;
                });
            }
            Err(_) => {
                tracing::warn!(
                    count = outputs.len(),
                    "Staged outputs dropped outside a runtime; objects left in staging store"
                );
            }
        }
    }
}

async fn delete_all(store: &dyn StagingStore, outputs: Vec<StagedOutput>) -> usize {
    let mut deleted = 0;
    for output in outputs {
        match store.delete(&output.path).await {
            Ok(()) => deleted += 1,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %output.path,
                    "Failed to delete staged output"
                );
            }
        }
    }
    deleted
}
