//! # taskhub-render
//!
//! Turns aggregated report data into documents: HTML templates printed to
//! PDF by headless Chromium behind a bounded render pool, and a minimal
//! XLSX workbook of the snapshot metrics.

pub mod chromium;
pub mod error;
pub mod pool;
pub mod renderer;
pub mod template;
pub mod trend;
pub mod xlsx;

pub use chromium::ChromiumRenderer;
pub use error::RenderError;
pub use pool::RenderPool;
pub use renderer::DocumentRenderer;
pub use xlsx::WorkbookBuilder;
