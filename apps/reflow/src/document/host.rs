//! Host interfaces: the seams between the pipeline and the composition engine.
//!
//! The pipeline only ever asks the host yes/no and lookup questions (does this style
//! exist, does this frame overflow) and asks it to build surfaces from a template.
//! The in-memory implementations below back the CLI and the tests; a real host
//! binding implements the same traits.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::layout::{Bounds, FrameId, Layout, PageSide, SurfaceId};

#[derive(Debug, Error, PartialEq)]
pub enum HostError {
    #[error("template '{0}' does not exist")]
    UnknownTemplate(String),
    #[error("layout rejected surface construction: {0}")]
    Layout(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Traits
// ────────────────────────────────────────────────────────────────────────────

/// Resolves paragraph style names.
pub trait StyleCatalog {
    fn has_style(&self, name: &str) -> bool;
}

/// Resolves font names to the name of an installed font.
pub trait FontCatalog {
    fn find_font(&self, name: &str) -> Option<String>;
}

/// Instantiates new surfaces from a named template.
pub trait SurfaceFactory {
    fn has_template(&self, template: &str) -> bool;

    /// Appends a new surface built from `template` to the end of `layout`.
    fn instantiate(&self, layout: &mut Layout, template: &str) -> Result<SurfaceId, HostError>;
}

/// Reports whether a frame holds more text than it can display.
pub trait OverflowSignal {
    fn overflows(&self, layout: &Layout, frame: FrameId) -> bool;
}

/// Screen redraw switch, suspended for the duration of a run.
pub trait RedrawControl {
    fn redraw_enabled(&self) -> bool;
    fn set_redraw(&mut self, enabled: bool);
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory catalogs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleSet(pub BTreeSet<String>);

impl StyleSet {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StyleSet(names.into_iter().map(Into::into).collect())
    }
}

impl StyleCatalog for StyleSet {
    fn has_style(&self, name: &str) -> bool {
        self.0.contains(name)
    }
}

/// Installed fonts, by full name (`family\tstyle`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FontSet(pub BTreeSet<String>);

impl FontSet {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FontSet(names.into_iter().map(Into::into).collect())
    }
}

impl FontCatalog for FontSet {
    fn find_font(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Templates
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatePage {
    pub side: PageSide,
    #[serde(default)]
    pub frames: Vec<Bounds>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub pages: Vec<TemplatePage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateLibrary(pub BTreeMap<String, Template>);

impl SurfaceFactory for TemplateLibrary {
    fn has_template(&self, template: &str) -> bool {
        self.0.contains_key(template)
    }

    fn instantiate(&self, layout: &mut Layout, template: &str) -> Result<SurfaceId, HostError> {
        let def = self
            .0
            .get(template)
            .ok_or_else(|| HostError::UnknownTemplate(template.to_string()))?;

        let surface = layout.add_surface();
        for page in &def.pages {
            let side = if layout.prefs.facing_pages {
                page.side
            } else {
                PageSide::Single
            };
            layout
                .add_page(surface, side, page.frames.clone(), Some(template.to_string()))
                .ok_or_else(|| HostError::Layout(format!("surface {surface:?} vanished")))?;
        }
        Ok(surface)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Overflow
// ────────────────────────────────────────────────────────────────────────────

/// Area-proportional capacity model: a frame holds `area × chars_per_square_pt`
/// characters, and the last frame of a chain overflows when the chain as a whole
/// holds fewer characters than the story.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityModel {
    pub story_chars: usize,
    pub chars_per_square_pt: f32,
}

impl CapacityModel {
    pub fn frame_capacity(&self, layout: &Layout, frame: FrameId) -> usize {
        layout
            .frame(frame)
            .and_then(|f| f.bounds)
            .map(|b| (b.area() * self.chars_per_square_pt).floor() as usize)
            .unwrap_or(0)
    }
}

impl OverflowSignal for CapacityModel {
    fn overflows(&self, layout: &Layout, frame: FrameId) -> bool {
        match layout.frame(frame) {
            None => false,
            Some(f) if f.next.is_some() => false,
            Some(_) => {
                let capacity: usize = layout
                    .chain(frame)
                    .into_iter()
                    .map(|id| self.frame_capacity(layout, id))
                    .sum();
                capacity < self.story_chars
            }
        }
    }
}
