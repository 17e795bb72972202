//! Anomalies: conditions the run cannot fix but the operator should see.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::document::story::Story;
use crate::layout::StopReason;

/// Paragraph texts that indicate an embedded table or object lost on import.
pub fn default_orphan_markers() -> Vec<String> {
    vec!["□".to_string(), "\u{FFFD}".to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// A paragraph holding nothing but a placeholder glyph.
    OrphanMarker { paragraph: usize, text: String },
    /// No candidate font name resolved; the pass was skipped.
    FontUnresolved { target: String },
    /// A pass's target role is not in the style catalog; the pass was skipped.
    RoleMissing { role: String },
    /// Overflow resolution ended with text still overflowing.
    OverflowRemaining { stop: StopReason },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::OrphanMarker { paragraph, text } => write!(
                f,
                "paragraph {paragraph} holds only {text:?} (unconverted table or object?)"
            ),
            Anomaly::FontUnresolved { target } => write!(f, "font '{target}' not found"),
            Anomaly::RoleMissing { role } => write!(f, "paragraph style '{role}' not found"),
            Anomaly::OverflowRemaining { stop } => {
                write!(f, "text still overflows (stopped: {stop:?})")
            }
        }
    }
}

/// One anomaly per paragraph whose text, with CR and LF removed, equals one of `markers`.
pub fn find_orphan_markers(story: &Story, markers: &[String]) -> Vec<Anomaly> {
    let found: Vec<Anomaly> = story
        .paragraphs
        .iter()
        .enumerate()
        .filter_map(|(index, para)| {
            let text: String = para
                .text()
                .chars()
                .filter(|c| !matches!(c, '\r' | '\n'))
                .collect();
            markers.iter().any(|m| *m == text).then(|| {
                warn!(index, text = %text, "Orphan marker paragraph");
                Anomaly::OrphanMarker {
                    paragraph: index,
                    text,
                }
            })
        })
        .collect();

    info!(found = found.len(), "Orphan marker scan complete");
    found
}
