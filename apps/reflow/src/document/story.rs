//! Stories: the flowing text streams that frames display.
//!
//! A `Story` owns its paragraphs outright. Every pipeline pass mutates paragraphs
//! in place (role, leading characters, run fonts) and never removes or reorders them.
//! Character-level formatting lives on `TextRun`s, so edits that touch only the
//! start of a paragraph go through `insert_leading` / `remove_leading` and keep the
//! formatting of the untouched remainder intact.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// U+FFFC, the placeholder code point a host writes where an inline object sits.
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

/// Index of a story inside its `Document`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(pub usize);

#[derive(Debug, Error, PartialEq)]
pub enum EditError {
    #[error("paragraph has no text run to insert into")]
    NoInsertionPoint,
    #[error("first run of the paragraph rejects insertion")]
    Locked,
}

// ────────────────────────────────────────────────────────────────────────────
// Runs and paragraphs
// ────────────────────────────────────────────────────────────────────────────

/// A span of characters sharing one set of character attributes.
///
/// `font == None` means the host could not report the applied font for this run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub point_size: Option<f32>,
    /// The host refuses insertions inside this run (note or tracked-change ranges).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub locked: bool,
}

impl TextRun {
    pub fn new(text: impl Into<String>, font: Option<&str>) -> Self {
        TextRun {
            text: text.into(),
            font: font.map(String::from),
            point_size: None,
            locked: false,
        }
    }
}

/// Auto-numbering directive on an ordinal-list paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Numbering {
    /// Numbering restarts at `start_at` on this paragraph.
    Restart { start_at: u32 },
    /// Numbering continues from the previous ordinal-list paragraph.
    Continue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Structural role tag (a paragraph style name).
    pub role: String,
    #[serde(default)]
    pub runs: Vec<TextRun>,
    #[serde(default)]
    pub numbering: Option<Numbering>,
    /// Tables nested inline in this paragraph.
    #[serde(default)]
    pub tables: Vec<Table>,
    /// Page items anchored inline in this paragraph.
    #[serde(default)]
    pub anchored: Vec<PageItem>,
}

impl Paragraph {
    /// A paragraph with a single run carrying `text` and no font information.
    pub fn new(role: impl Into<String>, text: &str) -> Self {
        Paragraph {
            role: role.into(),
            runs: vec![TextRun::new(text, None)],
            numbering: None,
            tables: Vec::new(),
            anchored: Vec::new(),
        }
    }

    pub fn with_runs(role: impl Into<String>, runs: Vec<TextRun>) -> Self {
        Paragraph {
            role: role.into(),
            runs,
            numbering: None,
            tables: Vec::new(),
            anchored: Vec::new(),
        }
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn char_count(&self) -> usize {
        self.runs.iter().map(|r| r.text.chars().count()).sum()
    }

    /// True when the paragraph carries a nested table or an anchored page item.
    pub fn has_inline_object(&self) -> bool {
        !self.tables.is_empty() || !self.anchored.is_empty()
    }

    /// Inserts `s` at the first insertion point, inheriting the first run's attributes.
    pub fn insert_leading(&mut self, s: &str) -> Result<(), EditError> {
        let first = self.runs.first_mut().ok_or(EditError::NoInsertionPoint)?;
        if first.locked {
            return Err(EditError::Locked);
        }
        first.text.insert_str(0, s);
        Ok(())
    }

    /// Replaces the whole text with a single run. Character formatting other than
    /// the first run's font and size is lost.
    pub fn set_text(&mut self, text: &str) {
        let (font, point_size) = self
            .runs
            .first()
            .map(|r| (r.font.clone(), r.point_size))
            .unwrap_or((None, None));
        self.runs = vec![TextRun {
            text: text.to_string(),
            font,
            point_size,
            locked: false,
        }];
    }

    /// Removes the first `byte_len` bytes of the paragraph text across runs.
    ///
    /// `byte_len` must fall on a char boundary of `self.text()`. Runs emptied by the
    /// removal are dropped, except that the last run is kept so the paragraph still
    /// has an insertion point.
    pub fn remove_leading(&mut self, byte_len: usize) {
        let mut remaining = byte_len;
        for run in self.runs.iter_mut() {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(run.text.len());
            run.text.drain(..take);
            remaining -= take;
        }
        if self.runs.len() > 1 {
            let last = self.runs.len() - 1;
            let mut idx = 0;
            self.runs.retain(|r| {
                let keep = !r.text.is_empty() || idx == last;
                idx += 1;
                keep
            });
        }
    }

    /// Removes the leading whitespace run (Unicode whitespace, which includes U+3000).
    pub fn trim_leading_whitespace(&mut self) {
        let text = self.text();
        let trimmed = text.trim_start();
        let cut = text.len() - trimmed.len();
        if cut > 0 {
            self.remove_leading(cut);
        }
    }

    /// All runs of paragraphs inside this paragraph's nested table cells.
    pub fn table_runs_mut(&mut self) -> impl Iterator<Item = &mut TextRun> {
        self.tables
            .iter_mut()
            .flat_map(|t| t.cells.iter_mut())
            .flat_map(|c| c.paragraphs.iter_mut())
            .flat_map(|p| p.runs.iter_mut())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Nested content
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub paragraphs: Vec<Paragraph>,
}

/// A page item anchored inside a paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageItem {
    /// A text frame with its own paragraphs.
    TextContainer { paragraphs: Vec<Paragraph> },
    /// A group of further page items.
    Group { items: Vec<PageItem> },
    /// Any other item; `text` is present when the item's content type is text.
    Other {
        #[serde(default)]
        text: Option<Vec<Paragraph>>,
    },
}

impl PageItem {
    /// Visits every text-bearing paragraph inside this item, descending into groups.
    pub fn walk_paragraphs_mut(&mut self, visit: &mut dyn FnMut(&mut Paragraph)) {
        match self {
            PageItem::TextContainer { paragraphs } => paragraphs.iter_mut().for_each(visit),
            PageItem::Group { items } => {
                for item in items {
                    item.walk_paragraphs_mut(visit);
                }
            }
            PageItem::Other { text: Some(paragraphs) } => paragraphs.iter_mut().for_each(visit),
            PageItem::Other { text: None } => {}
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Story
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub paragraphs: Vec<Paragraph>,
}

impl Story {
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        Story { paragraphs }
    }

    /// Total characters, counting one paragraph separator per paragraph.
    pub fn char_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.char_count() + 1).sum()
    }

    pub fn paragraphs_with_role<'a>(
        &'a mut self,
        role: &'a str,
    ) -> impl Iterator<Item = (usize, &'a mut Paragraph)> + 'a {
        self.paragraphs
            .iter_mut()
            .enumerate()
            .filter(move |(_, p)| p.role == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_two_run_paragraph() -> Paragraph {
        Paragraph::with_runs(
            "body",
            vec![
                TextRun::new("ab", Some("Bold")),
                TextRun::new("cd", Some("Regular")),
            ],
        )
    }

    #[test]
    fn test_insert_leading_keeps_run_formatting() {
        let mut para = make_two_run_paragraph();
        para.insert_leading("□ ").unwrap();
        assert_eq!(para.text(), "□ abcd");
        assert_eq!(para.runs.len(), 2);
        assert_eq!(para.runs[0].font.as_deref(), Some("Bold"));
    }

    #[test]
    fn test_insert_leading_without_runs_fails() {
        let mut para = Paragraph::with_runs("body", vec![]);
        assert_eq!(para.insert_leading("x"), Err(EditError::NoInsertionPoint));
    }

    #[test]
    fn test_insert_leading_into_locked_run_fails() {
        let mut para = make_two_run_paragraph();
        para.runs[0].locked = true;
        assert_eq!(para.insert_leading("x"), Err(EditError::Locked));
        assert_eq!(para.text(), "abcd");
    }

    #[test]
    fn test_remove_leading_spans_runs() {
        let mut para = make_two_run_paragraph();
        para.remove_leading(3);
        assert_eq!(para.text(), "d");
        assert_eq!(para.runs.len(), 1);
        assert_eq!(para.runs[0].font.as_deref(), Some("Regular"));
    }

    #[test]
    fn test_remove_leading_everything_keeps_one_run() {
        let mut para = make_two_run_paragraph();
        para.remove_leading(4);
        assert_eq!(para.text(), "");
        assert_eq!(para.runs.len(), 1);
    }

    #[test]
    fn test_trim_leading_whitespace_handles_full_width_space() {
        let mut para = Paragraph::new("body", "\u{3000} \tIntro");
        para.trim_leading_whitespace();
        assert_eq!(para.text(), "Intro");
    }

    #[test]
    fn test_set_text_keeps_first_run_font() {
        let mut para = make_two_run_paragraph();
        para.set_text("new");
        assert_eq!(para.runs, vec![TextRun::new("new", Some("Bold"))]);
    }

    #[test]
    fn test_walk_paragraphs_descends_into_groups() {
        let mut item = PageItem::Group {
            items: vec![
                PageItem::TextContainer {
                    paragraphs: vec![Paragraph::new("a", "one")],
                },
                PageItem::Group {
                    items: vec![PageItem::Other {
                        text: Some(vec![Paragraph::new("a", "two")]),
                    }],
                },
                PageItem::Other { text: None },
            ],
        };
        let mut seen = Vec::new();
        item.walk_paragraphs_mut(&mut |p| seen.push(p.text()));
        assert_eq!(seen, vec!["one", "two"]);
    }

    #[test]
    fn test_has_inline_object_from_capabilities() {
        let mut para = Paragraph::new("body", "text");
        assert!(!para.has_inline_object());
        para.tables.push(Table::default());
        assert!(para.has_inline_object());
    }

    #[test]
    fn test_story_char_count_includes_separators() {
        let story = Story::new(vec![Paragraph::new("a", "abc"), Paragraph::new("a", "")]);
        assert_eq!(story.char_count(), 5);
    }
}
