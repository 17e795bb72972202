//! Paragraph Classifier: maps source roles onto the target style vocabulary.
//!
//! A pure per-paragraph map: order does not matter and a second run is a no-op,
//! since mapped paragraphs carry target roles that no rule uses as a source
//! (identity rules report `Unchanged`).

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::host::StyleCatalog;
use crate::document::story::{Paragraph, Story};
use crate::restyle::{Outcome, SkipReason, LOG_SAMPLE};

/// `source -> target` role mapping, optionally stripping a leading marker glyph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleRule {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub strip_leading: Option<char>,
}

impl StyleRule {
    pub fn new(source: &str, target: &str) -> Self {
        StyleRule {
            source: source.to_string(),
            target: target.to_string(),
            strip_leading: None,
        }
    }

    pub fn stripping(mut self, marker: char) -> Self {
        self.strip_leading = Some(marker);
        self
    }
}

/// The role mapping used for word-processor imports into the book template.
pub fn default_rules() -> Vec<StyleRule> {
    vec![
        StyleRule::new("大項目", "大見出し1").stripping('■'),
        StyleRule::new("Heading 1", "大見出し1"),
        StyleRule::new("Heading 2", "大見出し1"),
        StyleRule::new("Heading 3", "見出し"),
        StyleRule::new("小項目", "小項目"),
        StyleRule::new("リスト", "リスト"),
        StyleRule::new("箇条書き", "リスト"),
        StyleRule::new("List Paragraph", "リスト"),
        StyleRule::new("リスト段落", "リスト段落"),
        StyleRule::new("標準", "Normal"),
        StyleRule::new("BodyText", "Normal"),
        StyleRule::new("Normal", "Normal"),
        StyleRule::new("演習タイトル", "演習タイトル"),
        StyleRule::new("図表番号", "図番号"),
        StyleRule::new("番号", "番号リスト"),
    ]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifyReport {
    pub mapped: usize,
    pub unchanged: usize,
    /// Target style names that were missing from the catalog, one entry per paragraph.
    pub misses: Vec<String>,
}

/// Applies `rules` to every paragraph of `story`.
pub fn classify(story: &mut Story, rules: &[StyleRule], catalog: &dyn StyleCatalog) -> ClassifyReport {
    let mut report = ClassifyReport::default();

    for (index, para) in story.paragraphs.iter_mut().enumerate() {
        let source = para.role.clone();
        match classify_paragraph(para, rules, catalog) {
            Outcome::Applied => {
                report.mapped += 1;
                if report.mapped <= LOG_SAMPLE {
                    debug!(index, from = %source, to = %para.role, "Mapped paragraph role");
                }
            }
            Outcome::Unchanged => report.unchanged += 1,
            Outcome::Skipped(SkipReason::StyleMissing(target)) => {
                debug!(index, %target, "Target style missing");
                report.misses.push(target);
            }
            Outcome::Skipped(_) => {}
        }
    }

    info!(
        mapped = report.mapped,
        misses = report.misses.len(),
        "Style mapping complete"
    );
    report
}

/// Maps one paragraph. The first rule whose `source` equals the role wins.
pub fn classify_paragraph(
    para: &mut Paragraph,
    rules: &[StyleRule],
    catalog: &dyn StyleCatalog,
) -> Outcome {
    let Some(rule) = rules.iter().find(|r| r.source == para.role) else {
        return Outcome::Skipped(SkipReason::NoRule);
    };
    if rule.target == para.role {
        return Outcome::Unchanged;
    }
    if !catalog.has_style(&rule.target) {
        return Outcome::Skipped(SkipReason::StyleMissing(rule.target.clone()));
    }

    if let Some(marker) = rule.strip_leading {
        strip_marker(para, marker);
    }
    para.role = rule.target.clone();
    Outcome::Applied
}

/// Removes one leading `marker` and the whitespace run after it.
/// Returns false (and leaves the text alone) when the text does not start with `marker`.
pub fn strip_marker(para: &mut Paragraph, marker: char) -> bool {
    if !para.text().starts_with(marker) {
        return false;
    }
    para.remove_leading(marker.len_utf8());
    para.trim_leading_whitespace();
    true
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
