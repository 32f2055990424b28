//! PDF rendering with a headless Chromium child process.
//!
//! Every render gets its own temporary directory holding the browser
//! profile, the HTML input and the PDF output, so concurrent renders never
//! share a profile. The directory is removed when the render returns.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;

use taskhub_core::config::RendererConfig;

use crate::error::RenderError;
use crate::renderer::DocumentRenderer;

const STDERR_LIMIT: usize = 2000;

/// [`DocumentRenderer`] spawning `chromium --headless --print-to-pdf`.
#[derive(Debug, Clone)]
pub struct ChromiumRenderer {
    program: String,
    extra_args: Vec<String>,
    timeout: Duration,
    temp_root: Option<PathBuf>,
}

impl ChromiumRenderer {
    /// Create a renderer from configuration.
    pub fn from_config(config: &RendererConfig) -> Self {
        Self {
            program: config.chromium_path.clone(),
            extra_args: config.extra_args.clone(),
            timeout: Duration::from_secs(config.timeout_seconds.max(1)),
            temp_root: (!config.temp_dir.is_empty()).then(|| PathBuf::from(&config.temp_dir)),
        }
    }

    fn workspace(&self) -> Result<tempfile::TempDir, RenderError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("taskhub-render-");
        let dir = match &self.temp_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    /// Command-line arguments for one render.
    pub fn arguments(&self, profile: &Path, html: &Path, pdf: &Path) -> Vec<String> {
        let mut args = vec![
            "--headless".to_string(),
            format!("--user-data-dir={}", profile.display()),
            format!("--print-to-pdf={}", pdf.display()),
            "--no-pdf-header-footer".to_string(),
            "--no-first-run".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push(format!("file://{}", html.display()));
        args
    }
}

#[async_trait]
impl DocumentRenderer for ChromiumRenderer {
    async fn render_pdf(&self, html: &str) -> Result<Bytes, RenderError> {
        let start = Instant::now();
        let workspace = self.workspace()?;
        let profile = workspace.path().join("profile");
        let html_path = workspace.path().join("report.html");
        let pdf_path = workspace.path().join("report.pdf");

        tokio::fs::create_dir_all(&profile).await?;
        tokio::fs::write(&html_path, html).await?;

        let mut cmd = Command::new(&self.program);
        cmd.args(self.arguments(&profile, &html_path, &pdf_path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| {
            tracing::error!(program = %self.program, error = %source, "Failed to launch browser");
            RenderError::Launch {
                program: self.program.clone(),
                source,
            }
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    timeout_seconds = self.timeout.as_secs(),
                    "Render timed out, browser killed"
                );
                return Err(RenderError::Timeout(self.timeout.as_secs()));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr
                .chars()
                .rev()
                .take(STDERR_LIMIT)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            return Err(RenderError::ProcessFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: tail,
            });
        }

        let pdf = match tokio::fs::read(&pdf_path).await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            _ => return Err(RenderError::OutputMissing(pdf_path.display().to_string())),
        };

        tracing::debug!(
            bytes = pdf.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Rendered PDF"
        );
        Ok(Bytes::from(pdf))
    }
}
