//! Anchored-object styling: text inside page items anchored in the story is code.

use tracing::{debug, info};

use crate::document::story::Story;
use crate::restyle::annotate::is_blank;
use crate::restyle::LOG_SAMPLE;

/// Paragraph style the book template uses for code and command listings.
pub const DEFAULT_CODE_ROLE: &str = "コード・コマンド";

/// Assigns `role` to every non-blank paragraph inside items anchored in `story`,
/// descending into groups. Returns the number of paragraphs restyled.
pub fn style_anchored(story: &mut Story, role: &str) -> usize {
    let mut styled = 0;

    for para in story.paragraphs.iter_mut() {
        for item in para.anchored.iter_mut() {
            item.walk_paragraphs_mut(&mut |inner| {
                if inner.role == role || is_blank(&inner.text()) {
                    return;
                }
                inner.role = role.to_string();
                styled += 1;
                if styled <= LOG_SAMPLE {
                    debug!(role, "Styled anchored paragraph");
                }
            });
        }
    }

    info!(role, styled, "Anchored object styling complete");
    styled
}
