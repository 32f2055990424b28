//! Document renderer configuration.

use serde::{Deserialize, Serialize};

/// Headless browser settings for PDF rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Path or name of the Chromium executable.
    #[serde(default = "default_chromium_path")]
    pub chromium_path: String,
    /// Extra command-line flags passed to every browser invocation.
    #[serde(default = "default_extra_args")]
    pub extra_args: Vec<String>,
    /// Content-load timeout per render, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Maximum number of browser processes alive at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Directory for per-render temporary files. Empty uses the system
    /// temporary directory.
    #[serde(default)]
    pub temp_dir: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            chromium_path: default_chromium_path(),
            extra_args: default_extra_args(),
            timeout_seconds: default_timeout(),
            max_concurrent: default_max_concurrent(),
            temp_dir: String::new(),
        }
    }
}

fn default_chromium_path() -> String {
    "chromium".to_string()
}

fn default_extra_args() -> Vec<String> {
    vec!["--no-sandbox".to_string(), "--disable-gpu".to_string()]
}

fn default_timeout() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    2
}
