//! Font Normalizer: substitutes deny-listed faces with one canonical font.
//!
//! Font names are compared as `family\tstyle` strings. The same logical face shows
//! up under half-width, full-width and localized family names, so a deny pattern
//! is a set of substrings that must all be present rather than an exact name.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::host::FontCatalog;
use crate::document::story::{Story, TextRun};
use crate::errors::ReflowError;
use crate::restyle::{Outcome, SkipReason, LOG_SAMPLE};

// ────────────────────────────────────────────────────────────────────────────
// Configuration types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenyPattern {
    pub all_of: Vec<String>,
}

impl DenyPattern {
    pub fn new(parts: &[&str]) -> Self {
        DenyPattern {
            all_of: parts.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// An empty pattern matches nothing.
    pub fn matches(&self, font: &str) -> bool {
        !self.all_of.is_empty() && self.all_of.iter().all(|part| font.contains(part.as_str()))
    }
}

/// A font looked up by its primary name, then by each fallback in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontTarget {
    pub primary: String,
    #[serde(default)]
    pub fallbacks: Vec<String>,
}

impl FontTarget {
    pub fn new(primary: &str, fallbacks: &[&str]) -> Self {
        FontTarget {
            primary: primary.to_string(),
            fallbacks: fallbacks.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.fallbacks.iter().map(String::as_str))
    }

    /// Installed name of the first candidate the catalog knows.
    pub fn resolve(&self, catalog: &dyn FontCatalog) -> Option<String> {
        self.names().find_map(|name| catalog.find_font(name))
    }
}

/// Which runs a normalization pass visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Runs of the story's own paragraphs.
    Story,
    /// Runs inside cells of tables nested in the story's paragraphs.
    Tables,
}

/// Font and size forced onto every run of paragraphs with `role`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleFont {
    pub role: String,
    pub font: FontTarget,
    #[serde(default)]
    pub point_size: Option<f32>,
}

/// Size the book template sets marker and bullet paragraphs in.
pub const ROLE_POINT_SIZE: f32 = 14.817;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Deny patterns applied to the story's runs.
    pub story_deny: Vec<DenyPattern>,
    /// Deny patterns applied to table cell runs.
    pub table_deny: Vec<DenyPattern>,
    pub target: FontTarget,
    pub role_fonts: Vec<RoleFont>,
}

impl Default for FontConfig {
    fn default() -> Self {
        FontConfig {
            story_deny: vec![
                DenyPattern::new(&["MS", "明朝", "Bold"]),
                DenyPattern::new(&["ＭＳ", "明朝", "Bold"]),
            ],
            table_deny: vec![
                DenyPattern::new(&["MS", "明朝"]),
                DenyPattern::new(&["ＭＳ", "明朝"]),
                DenyPattern::new(&["Mincho"]),
            ],
            target: FontTarget::new("BIZ UDGothic\tRegular", &["BIZ UDゴシック\tRegular"]),
            role_fonts: vec![
                RoleFont {
                    role: "小項目".to_string(),
                    font: FontTarget::new("BIZ UDゴシック\tBold", &["BIZ UDGothic\tBold"]),
                    point_size: Some(ROLE_POINT_SIZE),
                },
                RoleFont {
                    role: "リスト".to_string(),
                    font: FontTarget::new(
                        "BIZ UDゴシック\tRegular",
                        &["BIZ UDGothic\tRegular", "BIZ UDゴシック"],
                    ),
                    point_size: Some(ROLE_POINT_SIZE),
                },
            ],
        }
    }
}

impl FontConfig {
    /// Rejects a target that one of the deny patterns would match again.
    pub fn check_closed(&self) -> Result<(), ReflowError> {
        let patterns = self.story_deny.iter().chain(self.table_deny.iter());
        for pattern in patterns {
            if let Some(name) = self.target.names().find(|n| pattern.matches(n)) {
                return Err(ReflowError::Config(format!(
                    "font target '{name}' matches deny pattern {:?}",
                    pattern.all_of
                )));
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Passes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontReport {
    pub replaced: usize,
    /// Runs whose font could not be read.
    pub unreadable: usize,
}

/// Replaces the font of every run in `scope` that matches one of `patterns`.
/// `target` is the already-resolved installed font name.
pub fn normalize(story: &mut Story, scope: Scope, patterns: &[DenyPattern], target: &str) -> FontReport {
    let mut report = FontReport::default();

    for para in story.paragraphs.iter_mut() {
        match scope {
            Scope::Story => {
                for run in para.runs.iter_mut() {
                    tally(&mut report, replace_run(run, patterns, target));
                }
            }
            Scope::Tables => {
                for run in para.table_runs_mut() {
                    tally(&mut report, replace_run(run, patterns, target));
                }
            }
        }
    }

    info!(
        ?scope,
        replaced = report.replaced,
        unreadable = report.unreadable,
        "Font normalization complete"
    );
    report
}

fn tally(report: &mut FontReport, outcome: Outcome) {
    match outcome {
        Outcome::Applied => report.replaced += 1,
        Outcome::Skipped(SkipReason::UnreadableFont) => {
            report.unreadable += 1;
            if report.unreadable <= LOG_SAMPLE {
                debug!("Run font unreadable; skipped");
            }
        }
        _ => {}
    }
}

fn replace_run(run: &mut TextRun, patterns: &[DenyPattern], target: &str) -> Outcome {
    let Some(font) = run.font.as_deref() else {
        return Outcome::Skipped(SkipReason::UnreadableFont);
    };
    if !patterns.iter().any(|p| p.matches(font)) {
        return Outcome::Unchanged;
    }
    run.font = Some(target.to_string());
    Outcome::Applied
}

/// Forces `font` (already resolved) and the rule's point size onto every run of
/// paragraphs with the rule's role. Returns the number of paragraphs touched.
pub fn enforce_role_font(story: &mut Story, rule: &RoleFont, font: &str) -> usize {
    let mut applied = 0;
    for (index, para) in story.paragraphs_with_role(&rule.role) {
        for run in para.runs.iter_mut() {
            run.font = Some(font.to_string());
            if let Some(size) = rule.point_size {
                run.point_size = Some(size);
            }
        }
        applied += 1;
        if applied <= LOG_SAMPLE {
            debug!(index, role = %rule.role, "Forced role font");
        }
    }
    info!(role = %rule.role, applied, "Role font enforcement complete");
    applied
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
