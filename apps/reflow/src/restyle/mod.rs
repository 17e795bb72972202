// Paragraph passes run over a placed story after overflow is resolved:
// classification, symbol annotation, ordinal lists, fonts, anchored items, anomalies.
// Every pass is a full forward scan in paragraph order and reports counts.

pub mod anchored;
pub mod annotate;
pub mod anomalies;
pub mod classify;
pub mod fonts;
pub mod ordinal;

use serde::{Deserialize, Serialize};

/// Per-item debug lines are emitted for this many items per pass.
pub(crate) const LOG_SAMPLE: usize = 5;

/// Why a pass left an item alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No rule targets the item.
    NoRule,
    /// The target style is not in the catalog.
    StyleMissing(String),
    /// The paragraph already starts with the symbol.
    AlreadyMarked,
    /// Nothing but whitespace.
    Empty,
    /// The paragraph embeds a table, anchored item or object placeholder.
    InlineObject,
    /// The host could not report the run's font.
    UnreadableFont,
}

/// Result of applying a pass to one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// A rule matched but the item already had the target state.
    Unchanged,
    Skipped(SkipReason),
}
