//! Pipeline: places imported paragraphs, resolves overflow, then runs the restyle passes.
//!
//! Steps, in order:
//! 1. Setup validation. Any failure here aborts before the document is touched.
//! 2. Redraw suspended for the rest of the run (restored on every exit path).
//! 3. Placement into a frame on the last page.
//! 4. Orphan-marker scan.
//! 5. Overflow resolution.
//! 6. Classification, annotation, ordinal lists, fonts.
//! 7. Anchored-object styling and role fonts.
//!
//! Per-item problems from step 3 on are counted in the `RunReport`, never raised.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::document::host::{RedrawControl, StyleCatalog, SurfaceFactory};
use crate::document::story::Paragraph;
use crate::document::Document;
use crate::errors::ReflowError;
use crate::layout::frames::obtain_frame;
use crate::layout::{resolve, StopReason};
use crate::restyle::anchored::style_anchored;
use crate::restyle::annotate::annotate;
use crate::restyle::anomalies::{find_orphan_markers, Anomaly};
use crate::restyle::classify::classify;
use crate::restyle::fonts::{enforce_role_font, normalize, Scope};
use crate::restyle::ordinal::OrdinalNormalizer;

// ────────────────────────────────────────────────────────────────────────────
// Redraw guard
// ────────────────────────────────────────────────────────────────────────────

/// Keeps host redraw off while alive and restores the prior state on drop.
pub struct RedrawSuspended<'a, H: RedrawControl> {
    host: &'a mut H,
    prior: bool,
}

impl<'a, H: RedrawControl> RedrawSuspended<'a, H> {
    pub fn new(host: &'a mut H) -> Self {
        let prior = host.redraw_enabled();
        host.set_redraw(false);
        RedrawSuspended { host, prior }
    }
}

impl<H: RedrawControl> Deref for RedrawSuspended<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        &*self.host
    }
}

impl<H: RedrawControl> DerefMut for RedrawSuspended<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        &mut *self.host
    }
}

impl<H: RedrawControl> Drop for RedrawSuspended<'_, H> {
    fn drop(&mut self) {
        self.host.set_redraw(self.prior);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Report
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: i64,
    pub initial_page_count: usize,
    pub surfaces_created: usize,
    pub overflow_stop: StopReason,
    pub thread_failures: usize,
    pub paragraphs_imported: usize,
    pub styles_mapped: usize,
    /// Target styles that were missing, each listed once.
    pub style_misses: BTreeSet<String>,
    /// Symbols added, keyed by annotation kind.
    pub symbols_added: BTreeMap<String, usize>,
    pub symbols_skipped: usize,
    pub fonts_replaced: usize,
    pub table_fonts_replaced: usize,
    pub font_read_failures: usize,
    pub ordinal_lists_fixed: usize,
    pub ordinal_resets: usize,
    pub anchored_styled: usize,
    pub role_fonts_applied: usize,
    pub anomalies: Vec<Anomaly>,
}

impl RunReport {
    fn new(run_id: Uuid, started_at: DateTime<Utc>, initial_page_count: usize) -> Self {
        RunReport {
            run_id,
            started_at,
            elapsed_ms: 0,
            initial_page_count,
            surfaces_created: 0,
            overflow_stop: StopReason::NotOverflowing,
            thread_failures: 0,
            paragraphs_imported: 0,
            styles_mapped: 0,
            style_misses: BTreeSet::new(),
            symbols_added: BTreeMap::new(),
            symbols_skipped: 0,
            fonts_replaced: 0,
            table_fonts_replaced: 0,
            font_read_failures: 0,
            ordinal_lists_fixed: 0,
            ordinal_resets: 0,
            anchored_styled: 0,
            role_fonts_applied: 0,
            anomalies: Vec::new(),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reflow run {} ({} ms)", self.run_id, self.elapsed_ms)?;
        writeln!(f, "  pages before run:     {}", self.initial_page_count)?;
        writeln!(f, "  surfaces created:     {}", self.surfaces_created)?;
        writeln!(f, "  paragraphs imported:  {}", self.paragraphs_imported)?;
        writeln!(f, "  styles mapped:        {}", self.styles_mapped)?;
        for (kind, added) in &self.symbols_added {
            writeln!(f, "  {kind} symbols added: {added}")?;
        }
        writeln!(
            f,
            "  ordinal lists fixed:  {} ({} resets)",
            self.ordinal_lists_fixed, self.ordinal_resets
        )?;
        writeln!(
            f,
            "  fonts replaced:       {} (+{} in tables)",
            self.fonts_replaced, self.table_fonts_replaced
        )?;
        writeln!(f, "  anchored text styled: {}", self.anchored_styled)?;
        writeln!(f, "  role fonts applied:   {}", self.role_fonts_applied)?;

        let skipped = self.symbols_skipped + self.font_read_failures + self.thread_failures;
        if self.anomalies.is_empty() && self.style_misses.is_empty() && skipped == 0 {
            return write!(f, "No anomalies detected");
        }
        writeln!(f, "Anomalies:")?;
        for miss in &self.style_misses {
            writeln!(f, "  - paragraph style '{miss}' not found")?;
        }
        if self.symbols_skipped > 0 {
            writeln!(f, "  - {} paragraphs left without a symbol", self.symbols_skipped)?;
        }
        if self.font_read_failures > 0 {
            writeln!(f, "  - {} runs with unreadable fonts", self.font_read_failures)?;
        }
        if self.thread_failures > 0 {
            writeln!(f, "  - {} frames failed to thread", self.thread_failures)?;
        }
        for anomaly in &self.anomalies {
            writeln!(f, "  - {anomaly}")?;
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Run
// ────────────────────────────────────────────────────────────────────────────

/// Rejects a run that cannot succeed and compiles the ordinal pattern. Touches nothing.
pub fn validate(doc: &Document, config: &PipelineConfig) -> Result<OrdinalNormalizer, ReflowError> {
    config.fonts.check_closed()?;
    let normalizer = OrdinalNormalizer::new(&config.ordinal)?;

    if config.auto_create_pages && !doc.templates.has_template(&config.template) {
        return Err(ReflowError::TemplateNotFound(config.template.clone()));
    }

    let required = config
        .annotations
        .iter()
        .map(|a| a.role.as_str())
        .chain(std::iter::once(config.ordinal.list_role.as_str()));
    for style in required {
        if !doc.styles.has_style(style) {
            return Err(ReflowError::StyleMissing(style.to_string()));
        }
    }

    if doc.layout.last_page().is_none() {
        return Err(ReflowError::NoPages);
    }
    Ok(normalizer)
}

/// Imports `source` at the end of `doc` and runs every pass over it.
pub fn run(
    doc: &mut Document,
    source: Vec<Paragraph>,
    config: &PipelineConfig,
) -> Result<RunReport, ReflowError> {
    let run_id = Uuid::new_v4();
    let _span = info_span!("reflow_run", %run_id).entered();
    let started_at = Utc::now();

    // Step 1: Setup validation
    let ordinal = validate(doc, config)?;
    let mut report = RunReport::new(run_id, started_at, doc.layout.page_count());

    // Step 2: Suspend redraw until the guard drops
    let mut guard = RedrawSuspended::new(doc);
    let doc: &mut Document = &mut guard;

    // Step 3: Place the source paragraphs on the last page
    let last_page = doc.layout.last_page().ok_or(ReflowError::NoPages)?;
    let (start_frame, _) = obtain_frame(&mut doc.layout, last_page, &config.overflow.fallback_margin)
        .ok_or(ReflowError::NoFrame(last_page.0))?;
    report.paragraphs_imported = source.len();
    let story_id = doc
        .place(start_frame, source)
        .ok_or(ReflowError::NoFrame(last_page.0))?;
    info!(
        paragraphs = report.paragraphs_imported,
        frame = start_frame.0,
        "Placed imported text"
    );

    // Step 4: Orphan markers
    report
        .anomalies
        .extend(find_orphan_markers(&doc.stories[story_id.0], &config.orphan_markers));

    // Step 5: Overflow
    if config.auto_create_pages {
        let signal = doc.capacity_for(story_id);
        let overflow = resolve(
            &mut doc.layout,
            &doc.templates,
            &signal,
            start_frame,
            &config.template,
            &config.overflow,
        );
        report.surfaces_created = overflow.surfaces_created;
        report.thread_failures = overflow.failures.len();
        if !matches!(overflow.stop, StopReason::NotOverflowing | StopReason::Cleared) {
            report.anomalies.push(Anomaly::OverflowRemaining {
                stop: overflow.stop.clone(),
            });
        }
        report.overflow_stop = overflow.stop;
    }

    let story = &mut doc.stories[story_id.0];

    // Step 6: Paragraph passes
    let classified = classify(story, &config.style_rules, &doc.styles);
    report.styles_mapped = classified.mapped;
    report.style_misses.extend(classified.misses);

    for rule in &config.annotations {
        let annotated = annotate(story, &rule.role, &rule.symbol);
        *report.symbols_added.entry(rule.kind.clone()).or_default() += annotated.added;
        report.symbols_skipped += annotated.skipped;
    }

    let ordinal = ordinal.normalize(story);
    report.ordinal_lists_fixed = ordinal.fixed;
    report.ordinal_resets = ordinal.resets;

    match config.fonts.target.resolve(&doc.fonts) {
        Some(target) => {
            let replaced = normalize(story, Scope::Story, &config.fonts.story_deny, &target);
            let tables = normalize(story, Scope::Tables, &config.fonts.table_deny, &target);
            report.fonts_replaced = replaced.replaced;
            report.table_fonts_replaced = tables.replaced;
            report.font_read_failures = replaced.unreadable + tables.unreadable;
        }
        None => {
            warn!(font = %config.fonts.target.primary, "Font target not installed; substitution skipped");
            report.anomalies.push(Anomaly::FontUnresolved {
                target: config.fonts.target.primary.clone(),
            });
        }
    }

    // Step 7: Anchored items and role fonts
    if let Some(role) = &config.anchored_code_role {
        if doc.styles.has_style(role) {
            report.anchored_styled = style_anchored(story, role);
        } else {
            warn!(role = %role, "Code style missing; anchored items left as is");
            report.anomalies.push(Anomaly::RoleMissing { role: role.clone() });
        }
    }

    for rule in &config.fonts.role_fonts {
        match rule.font.resolve(&doc.fonts) {
            Some(font) => report.role_fonts_applied += enforce_role_font(story, rule, &font),
            None => report.anomalies.push(Anomaly::FontUnresolved {
                target: rule.font.primary.clone(),
            }),
        }
    }

    report.elapsed_ms = (Utc::now() - started_at).num_milliseconds();
    info!(
        surfaces = report.surfaces_created,
        anomalies = report.anomalies.len(),
        elapsed_ms = report.elapsed_ms,
        "Reflow run complete"
    );
    Ok(report)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
