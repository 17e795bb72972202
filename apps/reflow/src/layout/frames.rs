//! Obtain-or-create: finding a frame on a page that text can be threaded into.
//!
//! Preference order:
//! 1. a template frame, overridden onto the page
//! 2. the largest untouched frame already on the page
//! 3. a new frame built from the fallback margins
//!
//! "Untouched" means no predecessor in a chain and no story of its own.

use serde::{Deserialize, Serialize};

use crate::document::layout::{Bounds, FrameId, FrameOrigin, Layout, PageId, PagePrefs, PageSide};

/// Fallback page margins in points. `inside` is the binding edge on facing pages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub inside: f32,
    pub outside: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Margins {
            top: 36.0,
            bottom: 36.0,
            inside: 54.0,
            outside: 36.0,
        }
    }
}

/// Which preference produced the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSource {
    TemplateOverride,
    LargestExisting,
    Fabricated,
}

/// Returns a frame on `page` that can take threaded text, creating one if needed.
/// `None` only when the page does not exist.
pub fn obtain_frame(
    layout: &mut Layout,
    page: PageId,
    margins: &Margins,
) -> Option<(FrameId, FrameSource)> {
    if let Some(frame) = override_template_frames(layout, page) {
        return Some((frame, FrameSource::TemplateOverride));
    }
    if let Some(frame) = largest_untouched(layout, page) {
        return Some((frame, FrameSource::LargestExisting));
    }
    let side = layout.page(page)?.side;
    let bounds = fabricated_bounds(&layout.prefs, side, margins);
    let frame = layout.add_frame(page, Some(bounds), FrameOrigin::Fabricated)?;
    Some((frame, FrameSource::Fabricated))
}

/// Moves every pending template frame onto the page and returns the first untouched one.
fn override_template_frames(layout: &mut Layout, page: PageId) -> Option<FrameId> {
    let masters = std::mem::take(&mut layout.page_mut(page)?.master_frames);
    if masters.is_empty() {
        return None;
    }
    let overridden: Vec<FrameId> = masters
        .into_iter()
        .filter_map(|bounds| layout.add_frame(page, Some(bounds), FrameOrigin::Overridden))
        .collect();
    overridden.into_iter().find(|&id| is_untouched(layout, id))
}

fn largest_untouched(layout: &Layout, page: PageId) -> Option<FrameId> {
    let page = layout.page(page)?;
    page.frames
        .iter()
        .copied()
        .filter(|&id| is_untouched(layout, id))
        .map(|id| {
            let area = layout
                .frame(id)
                .and_then(|f| f.bounds)
                .map(|b| b.area())
                .unwrap_or(0.0);
            (id, area)
        })
        // Strictly-greater keeps the first of equal-area frames.
        .fold(None, |best: Option<(FrameId, f32)>, (id, area)| match best {
            Some((_, best_area)) if best_area >= area => best,
            _ => Some((id, area)),
        })
        .map(|(id, _)| id)
}

fn is_untouched(layout: &Layout, id: FrameId) -> bool {
    layout
        .frame(id)
        .map(|f| f.prev.is_none() && f.story.is_none())
        .unwrap_or(false)
}

/// Text-area bounds inside the fallback margins.
///
/// On facing pages the inside margin sits on the right edge of a left-hand page and
/// on the left edge of a right-hand page.
pub fn fabricated_bounds(prefs: &PagePrefs, side: PageSide, margins: &Margins) -> Bounds {
    let (left, right) = if prefs.facing_pages && side == PageSide::Left {
        (margins.inside, prefs.width - margins.outside)
    } else {
        (margins.outside, prefs.width - margins.inside)
    };
    Bounds::new(margins.top, left, prefs.height - margins.bottom, right)
}
