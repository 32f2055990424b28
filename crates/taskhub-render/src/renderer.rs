//! HTML to PDF seam.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::RenderError;

/// Prints an HTML document to PDF.
#[async_trait]
pub trait DocumentRenderer: Send + Sync + std::fmt::Debug + 'static {
    /// Render `html` to PDF bytes.
    async fn render_pdf(&self, html: &str) -> Result<Bytes, RenderError>;
}
