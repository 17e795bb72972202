mod config;
mod document;
mod errors;
mod layout;
mod pipeline;
mod restyle;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::document::{Document, Paragraph};

fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting reflow v{}", env!("CARGO_PKG_VERSION"));

    let pipeline = config.pipeline()?;
    info!(
        template = %pipeline.template,
        max_surfaces = pipeline.overflow.max_surfaces,
        "Pipeline config loaded"
    );

    let mut doc = Document::load(&config.document_path)
        .with_context(|| format!("Failed to load document {}", config.document_path.display()))?;
    let source = load_source(&config)?;
    info!(
        pages = doc.layout.page_count(),
        paragraphs = source.len(),
        "Inputs loaded"
    );

    let report = pipeline::run(&mut doc, source, &pipeline).context("Reflow run aborted")?;
    info!("{report}");
    if !report.anomalies.is_empty() {
        warn!(count = report.anomalies.len(), "Run finished with anomalies");
    }

    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(output) = &config.output_path {
        doc.save(output)
            .with_context(|| format!("Failed to write document {}", output.display()))?;
        info!(path = %output.display(), "Document written");
    }

    Ok(())
}

fn load_source(config: &Config) -> Result<Vec<Paragraph>> {
    let raw = std::fs::read_to_string(&config.source_path)
        .with_context(|| format!("Failed to read source {}", config.source_path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid source paragraphs in {}", config.source_path.display()))
}
