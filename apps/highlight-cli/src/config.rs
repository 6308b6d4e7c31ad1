//! Configuration file for the highlighter
//!
//! ```toml
//! [style]
//! color = "#FCED73"
//! opacity = 0.3
//!
//! [output]
//! prefix = "highlighted-"
//! ```

use anyhow::Context;
use highlight_core::{HighlightStyle, HIGHLIGHTED_PREFIX};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }

    /// The built-in defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Drawing style, falling back to the default yellow for unset fields.
    pub fn highlight_style(&self) -> anyhow::Result<HighlightStyle> {
        let base = match &self.style.color {
            Some(color) => HighlightStyle::from_hex(color, HighlightStyle::default().opacity)
                .context("Invalid [style] color")?,
            None => HighlightStyle::default(),
        };
        match self.style.opacity {
            Some(opacity) => base
                .with_opacity(opacity)
                .context("Invalid [style] opacity"),
            None => Ok(base),
        }
    }

    /// Where the highlighted copy of `input` goes unless a path is given.
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        input.with_file_name(format!("{}{}", self.output.prefix, name))
    }
}

/// `[style]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleConfig {
    /// `#RRGGBB`
    pub color: Option<String>,
    pub opacity: Option<f32>,
}

/// `[output]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

fn default_prefix() -> String {
    HIGHLIGHTED_PREFIX.to_string()
}
