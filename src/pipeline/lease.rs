//! Scoped ownership of the render backend for one run.

use tracing::{debug, warn};

use crate::scrapers::{BackendLauncher, RenderBackend};

/// Holds the render backend, if the run needs one.
///
/// `release` is the normal path. A lease dropped without release (panic
/// unwinding past the pipeline, cancelled future) hands the backend to a
/// background task for shutdown.
pub struct BackendLease {
    backend: Option<Box<dyn RenderBackend>>,
}

impl BackendLease {
    /// Launch a backend when `needed`; otherwise hold nothing.
    pub async fn acquire(launcher: &dyn BackendLauncher, needed: bool) -> anyhow::Result<Self> {
        if !needed {
            debug!("Render backend not needed for this run");
            return Ok(Self::empty());
        }

        let backend = launcher.launch().await?;
        debug!("Render backend acquired");
        Ok(Self {
            backend: Some(backend),
        })
    }

    pub fn empty() -> Self {
        Self { backend: None }
    }

    pub fn backend(&self) -> Option<&dyn RenderBackend> {
        self.backend.as_deref()
    }

    /// Shut the backend down. Safe to call more than once.
    pub async fn release(&mut self) {
        if let Some(backend) = self.backend.take() {
            backend.shutdown().await;
            debug!("Render backend released");
        }
    }
}

impl Drop for BackendLease {
    fn drop(&mut self) {
        let Some(backend) = self.backend.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("Render backend lease dropped without release; shutting down in background");
                handle.spawn(backend.shutdown());
            }
            Err(_) => warn!("Render backend lease dropped outside a runtime; backend leaked"),
        }
    }
}
