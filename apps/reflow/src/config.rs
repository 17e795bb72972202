use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::layout::OverflowConfig;
use crate::restyle::anchored::DEFAULT_CODE_ROLE;
use crate::restyle::annotate::{default_annotations, AnnotationRule};
use crate::restyle::anomalies::default_orphan_markers;
use crate::restyle::classify::{default_rules, StyleRule};
use crate::restyle::fonts::FontConfig;
use crate::restyle::ordinal::OrdinalConfig;

/// Process configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Document snapshot to reflow.
    pub document_path: PathBuf,
    /// Paragraphs supplied by the loader.
    pub source_path: PathBuf,
    /// Where the mutated snapshot is written; nothing is written when unset.
    pub output_path: Option<PathBuf>,
    /// Pipeline settings; built-in defaults when unset.
    pub pipeline_path: Option<PathBuf>,
    pub max_surfaces: Option<usize>,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            document_path: require_env("REFLOW_DOCUMENT")?.into(),
            source_path: require_env("REFLOW_SOURCE")?.into(),
            output_path: optional_env("REFLOW_OUTPUT").map(PathBuf::from),
            pipeline_path: optional_env("REFLOW_CONFIG").map(PathBuf::from),
            max_surfaces: optional_env("REFLOW_MAX_SURFACES")
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("REFLOW_MAX_SURFACES must be a non-negative integer")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Pipeline settings from `REFLOW_CONFIG` (or defaults) with env overrides applied.
    pub fn pipeline(&self) -> Result<PipelineConfig> {
        let mut pipeline = match &self.pipeline_path {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(max) = self.max_surfaces {
            pipeline.overflow.max_surfaces = max;
        }
        Ok(pipeline)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline configuration
// ────────────────────────────────────────────────────────────────────────────

/// Everything a run needs besides the document itself. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Template instantiated for overflow surfaces.
    pub template: String,
    pub auto_create_pages: bool,
    pub overflow: OverflowConfig,
    pub style_rules: Vec<StyleRule>,
    pub annotations: Vec<AnnotationRule>,
    pub ordinal: OrdinalConfig,
    pub fonts: FontConfig,
    /// Role given to text inside anchored page items; `None` disables the pass.
    pub anchored_code_role: Option<String>,
    pub orphan_markers: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            template: "H-本文マスター".to_string(),
            auto_create_pages: true,
            overflow: OverflowConfig::default(),
            style_rules: default_rules(),
            annotations: default_annotations(),
            ordinal: OrdinalConfig::default(),
            fonts: FontConfig::default(),
            anchored_code_role: Some(DEFAULT_CODE_ROLE.to_string()),
            orphan_markers: default_orphan_markers(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid pipeline config {}", path.display()))
    }
}
