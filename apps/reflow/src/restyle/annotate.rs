//! List Annotator: prefixes paragraphs of a role with a presentation symbol.
//!
//! The symbol is typed into the text rather than produced by list numbering, so
//! the pass must recognise its own output: a paragraph already starting with the
//! symbol's glyph is left alone. Paragraphs that embed objects are never edited,
//! since inserting text in front of an inline object corrupts it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::story::{Paragraph, Story, OBJECT_REPLACEMENT};
use crate::restyle::{Outcome, SkipReason, LOG_SAMPLE};

/// One symbol-injection rule: every paragraph with `role` gets `symbol` prepended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRule {
    /// Report key, e.g. `marker` or `bullet`.
    pub kind: String,
    pub role: String,
    pub symbol: String,
}

pub fn default_annotations() -> Vec<AnnotationRule> {
    vec![
        AnnotationRule {
            kind: "marker".to_string(),
            role: "小項目".to_string(),
            symbol: "□ ".to_string(),
        },
        AnnotationRule {
            kind: "bullet".to_string(),
            role: "リスト".to_string(),
            symbol: "・ ".to_string(),
        },
    ]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotateReport {
    pub added: usize,
    /// Empty paragraphs and paragraphs with inline objects.
    pub skipped: usize,
    pub already_marked: usize,
    /// Additions that had to rebuild the paragraph text (included in `added`).
    pub rebuilt: usize,
}

/// Prepends `symbol` to every eligible paragraph with `role`.
pub fn annotate(story: &mut Story, role: &str, symbol: &str) -> AnnotateReport {
    let mut report = AnnotateReport::default();

    for (index, para) in story.paragraphs_with_role(role) {
        match annotate_paragraph(para, symbol) {
            (Outcome::Applied, rebuilt) => {
                report.added += 1;
                if rebuilt {
                    report.rebuilt += 1;
                }
                if report.added <= LOG_SAMPLE {
                    debug!(index, role, "Added leading symbol");
                }
            }
            (Outcome::Skipped(SkipReason::AlreadyMarked), _) => report.already_marked += 1,
            (Outcome::Skipped(SkipReason::InlineObject), _) => {
                warn!(index, role, "Paragraph embeds an object; symbol not added");
                report.skipped += 1;
            }
            (Outcome::Skipped(_), _) => report.skipped += 1,
            (Outcome::Unchanged, _) => {}
        }
    }

    info!(
        role,
        added = report.added,
        skipped = report.skipped,
        already_marked = report.already_marked,
        "Symbol annotation complete"
    );
    report
}

/// Annotates one paragraph. The flag is true when the text had to be rebuilt.
fn annotate_paragraph(para: &mut Paragraph, symbol: &str) -> (Outcome, bool) {
    let text = para.text();

    let glyph = symbol.trim_end();
    if !glyph.is_empty() && text.starts_with(glyph) {
        return (Outcome::Skipped(SkipReason::AlreadyMarked), false);
    }
    if is_blank(&text) {
        return (Outcome::Skipped(SkipReason::Empty), false);
    }
    if para.has_inline_object() || contains_object_codes(&text) {
        return (Outcome::Skipped(SkipReason::InlineObject), false);
    }

    match para.insert_leading(symbol) {
        Ok(()) => (Outcome::Applied, false),
        Err(e) => {
            debug!("Insertion point unavailable ({e}); rebuilding paragraph text");
            para.set_text(&format!("{symbol}{text}"));
            (Outcome::Applied, true)
        }
    }
}

/// True when nothing but whitespace (U+3000 included) remains.
pub fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

/// True when `text` holds an object placeholder or a control code other than TAB, LF, CR.
pub fn contains_object_codes(text: &str) -> bool {
    text.chars().any(|c| {
        c == OBJECT_REPLACEMENT || ((c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r'))
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::story::{PageItem, Table, TextRun};

    fn make_story() -> Story {
        Story::new(vec![
            Paragraph::new("小項目", "Setup"),
            Paragraph::new("Normal", "Body"),
            Paragraph::new("小項目", "Install"),
        ])
    }

    #[test]
    fn test_adds_symbol_to_role_only() {
        let mut story = make_story();
        let report = annotate(&mut story, "小項目", "□ ");
        assert_eq!(report.added, 2);
        assert_eq!(story.paragraphs[0].text(), "□ Setup");
        assert_eq!(story.paragraphs[1].text(), "Body");
        assert_eq!(story.paragraphs[2].text(), "□ Install");
    }

    #[test]
    fn test_second_run_adds_nothing() {
        let mut story = make_story();
        annotate(&mut story, "小項目", "□ ");
        let snapshot = story.clone();
        let second = annotate(&mut story, "小項目", "□ ");
        assert_eq!(second.added, 0);
        assert_eq!(second.already_marked, 2);
        assert_eq!(story, snapshot);
    }

    #[test]
    fn test_glyph_with_other_spacing_counts_as_marked() {
        let mut story = Story::new(vec![Paragraph::new("小項目", "□\u{3000}Setup")]);
        let report = annotate(&mut story, "小項目", "□ ");
        assert_eq!(report.added, 0);
        assert_eq!(report.already_marked, 1);
    }

    #[test]
    fn test_empty_paragraph_skipped() {
        let mut story = Story::new(vec![Paragraph::new("小項目", " \u{3000}\r")]);
        let report = annotate(&mut story, "小項目", "□ ");
        assert_eq!(report.skipped, 1);
        assert_eq!(report.added, 0);
        assert_eq!(story.paragraphs[0].text(), " \u{3000}\r");
    }

    #[test]
    fn test_sentinel_code_point_left_byte_for_byte() {
        let original = format!("See {OBJECT_REPLACEMENT} below");
        let mut story = Story::new(vec![Paragraph::new("リスト", &original)]);
        let report = annotate(&mut story, "リスト", "・ ");
        assert_eq!(report.skipped, 1);
        assert_eq!(report.added, 0);
        assert_eq!(story.paragraphs[0].text().as_bytes(), original.as_bytes());
    }

    #[test]
    fn test_control_code_skipped_but_tabs_allowed() {
        let mut story = Story::new(vec![
            Paragraph::new("リスト", "a\u{0007}b"),
            Paragraph::new("リスト", "a\tb\r"),
        ]);
        let report = annotate(&mut story, "リスト", "・ ");
        assert_eq!(report.skipped, 1);
        assert_eq!(report.added, 1);
        assert_eq!(story.paragraphs[1].text(), "・ a\tb\r");
    }

    #[test]
    fn test_capability_flag_skips() {
        let mut with_table = Paragraph::new("リスト", "cell text");
        with_table.tables.push(Table::default());
        let mut with_item = Paragraph::new("リスト", "figure");
        with_item.anchored.push(PageItem::Other { text: None });
        let mut story = Story::new(vec![with_table, with_item]);
        let report = annotate(&mut story, "リスト", "・ ");
        assert_eq!(report.skipped, 2);
        assert_eq!(story.paragraphs[0].text(), "cell text");
    }

    #[test]
    fn test_insertion_keeps_first_run_formatting() {
        let mut story = Story::new(vec![Paragraph::with_runs(
            "小項目",
            vec![TextRun::new("Bold", Some("B")), TextRun::new(" rest", Some("R"))],
        )]);
        let report = annotate(&mut story, "小項目", "□ ");
        assert_eq!(report.rebuilt, 0);
        assert_eq!(story.paragraphs[0].runs[0], TextRun::new("□ Bold", Some("B")));
        assert_eq!(story.paragraphs[0].runs[1], TextRun::new(" rest", Some("R")));
    }

    #[test]
    fn test_locked_insertion_point_falls_back_to_rebuild() {
        let mut para = Paragraph::new("小項目", "Locked");
        para.runs[0].locked = true;
        let mut story = Story::new(vec![para]);
        let report = annotate(&mut story, "小項目", "□ ");
        assert_eq!(report.added, 1);
        assert_eq!(report.rebuilt, 1);
        assert_eq!(story.paragraphs[0].text(), "□ Locked");
    }

    #[test]
    fn test_object_code_detection() {
        assert!(contains_object_codes("\u{FFFC}"));
        assert!(contains_object_codes("\u{0001}"));
        assert!(!contains_object_codes("tab\there\r\n"));
        assert!(is_blank("\u{3000} \n"));
        assert!(!is_blank("x"));
    }
}
