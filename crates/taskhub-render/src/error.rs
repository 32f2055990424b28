//! Rendering errors.

use thiserror::Error;

use taskhub_core::error::{AppError, ErrorKind};

/// Errors from PDF and workbook rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The browser binary could not be started.
    #[error("Failed to launch browser '{program}': {source}")]
    Launch {
        /// Executable that was spawned.
        program: String,
        /// Spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The render did not finish within the timeout; the process was killed.
    #[error("Render timed out after {0} seconds")]
    Timeout(u64),

    /// The browser exited with a failure status.
    #[error("Browser exited with code {code}: {stderr}")]
    ProcessFailed {
        /// Exit code, -1 when killed by a signal.
        code: i32,
        /// Tail of standard error.
        stderr: String,
    },

    /// The browser exited successfully but wrote no PDF.
    #[error("Expected PDF output not created: {0}")]
    OutputMissing(String),

    /// Temporary files could not be prepared.
    #[error("Render workspace error: {0}")]
    Workspace(#[from] std::io::Error),

    /// The workbook container could not be written.
    #[error("Workbook error: {0}")]
    Workbook(#[from] zip::result::ZipError),

    /// The render pool was shut down.
    #[error("Render pool closed")]
    PoolClosed,
}

impl RenderError {
    /// Whether the error affects every render rather than one document.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Launch { .. } | Self::Workspace(_) | Self::PoolClosed)
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        let kind = if err.is_infrastructure() {
            ErrorKind::ExternalService
        } else {
            ErrorKind::Render
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_failure_is_infrastructure() {
        let err = RenderError::Launch {
            program: "chromium".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
        };
        assert!(err.is_infrastructure());
        let app: AppError = err.into();
        assert_eq!(app.kind, ErrorKind::ExternalService);
        assert!(!app.kind.is_input_scoped());
    }

    #[test]
    fn test_timeout_is_user_scoped() {
        let app: AppError = RenderError::Timeout(30).into();
        assert_eq!(app.kind, ErrorKind::Render);
        assert!(app.kind.is_input_scoped());
    }
}
