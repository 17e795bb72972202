//! Ordinal List Normalizer: turns literal "1." prefixes into auto-numbered list paragraphs.
//!
//! # State machine
//! One forward pass over the story with a single flag, `reset_pending`:
//! - a title-role paragraph sets the flag and is never itself a list item
//! - a paragraph matching the ordinal pattern becomes a list item; it restarts
//!   numbering when the flag is set (clearing it) and continues otherwise
//! - anything else leaves the flag as it is, so introductory text between a title
//!   and its first step does not cancel the restart
//!
//! The literal digits are stripped once numbering is delegated to the list style,
//! otherwise every item would render its number twice.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::story::{Numbering, Story};
use crate::errors::ReflowError;
use crate::restyle::LOG_SAMPLE;

/// ASCII digits followed by `.`, `)` or whitespace (the ideographic space included).
/// Full-width digits (`１　概要`) number headings, not list items, so `\d` is not used.
pub const DEFAULT_ORDINAL_PATTERN: &str = r"^[0-9]+[.)\s　]";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrdinalConfig {
    pub pattern: String,
    /// Role whose paragraphs reset numbering for the next list item.
    pub title_role: String,
    /// Role assigned to detected list items.
    pub list_role: String,
    pub start_at: u32,
    /// Strip the literal number when the list style numbers automatically.
    pub auto_numbering: bool,
}

impl Default for OrdinalConfig {
    fn default() -> Self {
        OrdinalConfig {
            pattern: DEFAULT_ORDINAL_PATTERN.to_string(),
            title_role: "演習タイトル".to_string(),
            list_role: "番号リスト".to_string(),
            start_at: 1,
            auto_numbering: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrdinalReport {
    /// Paragraphs reclassified as list items.
    pub fixed: usize,
    /// List items that restart numbering.
    pub resets: usize,
    /// Paragraph indices of the restart points.
    pub restart_points: Vec<usize>,
}

/// Compiled form of `OrdinalConfig`.
#[derive(Debug, Clone)]
pub struct OrdinalNormalizer {
    pattern: Regex,
    title_role: String,
    list_role: String,
    start_at: u32,
    auto_numbering: bool,
}

impl OrdinalNormalizer {
    pub fn new(config: &OrdinalConfig) -> Result<Self, ReflowError> {
        let pattern = Regex::new(&config.pattern).map_err(|source| ReflowError::InvalidPattern {
            pattern: config.pattern.clone(),
            source,
        })?;
        Ok(OrdinalNormalizer {
            pattern,
            title_role: config.title_role.clone(),
            list_role: config.list_role.clone(),
            start_at: config.start_at,
            auto_numbering: config.auto_numbering,
        })
    }

    /// Byte length of the ordinal prefix at the very start of `text`, if any.
    fn prefix_len(&self, text: &str) -> Option<usize> {
        self.pattern
            .find(text)
            .filter(|m| m.start() == 0 && m.end() > 0)
            .map(|m| m.end())
    }

    pub fn normalize(&self, story: &mut Story) -> OrdinalReport {
        let mut report = OrdinalReport::default();
        let mut reset_pending = false;

        for (index, para) in story.paragraphs.iter_mut().enumerate() {
            if para.role == self.title_role {
                reset_pending = true;
                debug!(index, "Title paragraph; next list item restarts numbering");
                continue;
            }

            let text = para.text();
            let Some(prefix) = self.prefix_len(&text) else {
                continue;
            };

            para.role = self.list_role.clone();
            if reset_pending {
                para.numbering = Some(Numbering::Restart {
                    start_at: self.start_at,
                });
                reset_pending = false;
                report.resets += 1;
                report.restart_points.push(index);
            } else {
                para.numbering = Some(Numbering::Continue);
            }

            if self.auto_numbering {
                para.remove_leading(prefix);
                para.trim_leading_whitespace();
            }

            report.fixed += 1;
            if report.fixed <= LOG_SAMPLE {
                debug!(index, prefix = &text[..prefix], "Ordinal list item");
            }
        }

        info!(
            fixed = report.fixed,
            resets = report.resets,
            "Ordinal list normalization complete"
        );
        report
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
