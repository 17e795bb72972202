// In-memory composition host: layout arena, stories, catalogs and templates.
// A snapshot of this structure is what the CLI reads and writes.

pub mod host;
pub mod layout;
pub mod story;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ReflowError;

pub use host::{
    CapacityModel, FontCatalog, FontSet, HostError, OverflowSignal, RedrawControl, StyleCatalog,
    StyleSet, SurfaceFactory, Template, TemplateLibrary, TemplatePage,
};
pub use layout::{
    Bounds, Frame, FrameId, FrameOrigin, Layout, Page, PageId, PagePrefs, PageSide, SurfaceId,
    ThreadError,
};
pub use story::{Numbering, PageItem, Paragraph, Story, StoryId, TextRun};

/// Characters per square point used when a snapshot does not say otherwise.
/// Roughly 10.5pt CJK body text at solid leading.
pub const DEFAULT_CHARS_PER_SQUARE_PT: f32 = 0.009;

fn default_density() -> f32 {
    DEFAULT_CHARS_PER_SQUARE_PT
}

fn default_redraw() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub stories: Vec<Story>,
    #[serde(default)]
    pub styles: StyleSet,
    #[serde(default)]
    pub fonts: FontSet,
    #[serde(default)]
    pub templates: TemplateLibrary,
    #[serde(default = "default_density")]
    pub chars_per_square_pt: f32,
    #[serde(skip, default = "default_redraw")]
    redraw: bool,
}

impl Default for Document {
    fn default() -> Self {
        Document {
            layout: Layout::default(),
            stories: Vec::new(),
            styles: StyleSet::default(),
            fonts: FontSet::default(),
            templates: TemplateLibrary::default(),
            chars_per_square_pt: DEFAULT_CHARS_PER_SQUARE_PT,
            redraw: true,
        }
    }
}

impl Document {
    pub fn load(path: &Path) -> Result<Self, ReflowError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ReflowError> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Places `paragraphs` as a new story flowing from `frame`.
    pub fn place(&mut self, frame: FrameId, paragraphs: Vec<Paragraph>) -> Option<StoryId> {
        let id = StoryId(self.stories.len());
        self.layout.frames.get_mut(frame.0)?.story = Some(id);
        self.stories.push(Story::new(paragraphs));
        Some(id)
    }

    pub fn story(&self, id: StoryId) -> Option<&Story> {
        self.stories.get(id.0)
    }

    /// Overflow signal for the chain displaying `story`.
    pub fn capacity_for(&self, story: StoryId) -> CapacityModel {
        CapacityModel {
            story_chars: self.story(story).map(Story::char_count).unwrap_or(0),
            chars_per_square_pt: self.chars_per_square_pt,
        }
    }
}

impl RedrawControl for Document {
    fn redraw_enabled(&self) -> bool {
        self.redraw
    }

    fn set_redraw(&mut self, enabled: bool) {
        self.redraw = enabled;
    }
}
