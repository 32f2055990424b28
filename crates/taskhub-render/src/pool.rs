//! Bounded concurrency for PDF renders.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Semaphore;

use crate::error::RenderError;
use crate::renderer::DocumentRenderer;

/// Wraps a renderer so at most `max_concurrent` renders run at once,
/// whatever the number of jobs or users processed in parallel.
#[derive(Debug, Clone)]
pub struct RenderPool {
    inner: Arc<dyn DocumentRenderer>,
    permits: Arc<Semaphore>,
}

impl RenderPool {
    /// Create a pool of `max_concurrent` permits (at least one).
    pub fn new(inner: Arc<dyn DocumentRenderer>, max_concurrent: usize) -> Self {
        Self {
            inner,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }
}

#[async_trait]
impl DocumentRenderer for RenderPool {
    async fn render_pdf(&self, html: &str) -> Result<Bytes, RenderError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| RenderError::PoolClosed)?;
        self.inner.render_pdf(html).await
    }
}
