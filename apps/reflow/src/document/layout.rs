//! Page geometry and frame threading.
//!
//! Frames, pages and surfaces live in flat arenas owned by `Layout` and refer to
//! each other by index. Threading is a pair of `prev`/`next` links between frame
//! indices, so rewiring the chain while the overflow resolver walks it can never
//! leave a dangling reference.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::story::StoryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(pub usize);

#[derive(Debug, Error, PartialEq)]
pub enum ThreadError {
    #[error("frame {0:?} does not exist")]
    UnknownFrame(FrameId),
    #[error("frame {0:?} is already threaded after another frame")]
    AlreadyThreaded(FrameId),
    #[error("frame {0:?} already has a successor")]
    NotTail(FrameId),
    #[error("threading {after:?} -> {frame:?} would close a loop")]
    Cycle { after: FrameId, frame: FrameId },
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

/// Geometric bounds in points: `[top, left, bottom, right]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub top: f32,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
}

impl Bounds {
    pub fn new(top: f32, left: f32, bottom: f32, right: f32) -> Self {
        Bounds {
            top,
            left,
            bottom,
            right,
        }
    }

    pub fn area(&self) -> f32 {
        ((self.bottom - self.top) * (self.right - self.left)).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSide {
    Left,
    Right,
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PagePrefs {
    pub width: f32,
    pub height: f32,
    pub facing_pages: bool,
}

impl Default for PagePrefs {
    /// A4 portrait, facing pages.
    fn default() -> Self {
        PagePrefs {
            width: 595.28,
            height: 841.89,
            facing_pages: true,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Arena entries
// ────────────────────────────────────────────────────────────────────────────

/// How a frame came to exist on its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOrigin {
    /// Drawn directly on the page.
    Local,
    /// A template frame overridden onto the page.
    Overridden,
    /// Built from fallback margins because the page had nothing usable.
    Fabricated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: FrameId,
    pub page: PageId,
    pub bounds: Option<Bounds>,
    pub origin: FrameOrigin,
    #[serde(default)]
    pub prev: Option<FrameId>,
    #[serde(default)]
    pub next: Option<FrameId>,
    #[serde(default)]
    pub story: Option<StoryId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub side: PageSide,
    #[serde(default)]
    pub frames: Vec<FrameId>,
    /// Frames provided by the applied template that have not been overridden yet.
    #[serde(default)]
    pub master_frames: Vec<Bounds>,
    #[serde(default)]
    pub template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub id: SurfaceId,
    pub pages: Vec<PageId>,
}

// ────────────────────────────────────────────────────────────────────────────
// Layout
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub prefs: PagePrefs,
    #[serde(default)]
    pub surfaces: Vec<Surface>,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub frames: Vec<Frame>,
}

impl Layout {
    pub fn new(prefs: PagePrefs) -> Self {
        Layout {
            prefs,
            ..Default::default()
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The last page in document order. Trailing surfaces without pages are skipped.
    pub fn last_page(&self) -> Option<PageId> {
        self.surfaces
            .iter()
            .rev()
            .find_map(|s| s.pages.last().copied())
    }

    pub fn frame(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(id.0)
    }

    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.get(id.0)
    }

    pub fn page_mut(&mut self, id: PageId) -> Option<&mut Page> {
        self.pages.get_mut(id.0)
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(id.0)
    }

    /// Appends an empty surface at the end of the document.
    pub fn add_surface(&mut self) -> SurfaceId {
        let id = SurfaceId(self.surfaces.len());
        self.surfaces.push(Surface { id, pages: Vec::new() });
        id
    }

    /// Appends a page to `surface`. Returns `None` if the surface does not exist.
    pub fn add_page(
        &mut self,
        surface: SurfaceId,
        side: PageSide,
        master_frames: Vec<Bounds>,
        template: Option<String>,
    ) -> Option<PageId> {
        let id = PageId(self.pages.len());
        self.surfaces.get_mut(surface.0)?.pages.push(id);
        self.pages.push(Page {
            id,
            side,
            frames: Vec::new(),
            master_frames,
            template,
        });
        Some(id)
    }

    /// Creates an unthreaded frame on `page`. Returns `None` if the page does not exist.
    pub fn add_frame(
        &mut self,
        page: PageId,
        bounds: Option<Bounds>,
        origin: FrameOrigin,
    ) -> Option<FrameId> {
        let id = FrameId(self.frames.len());
        self.pages.get_mut(page.0)?.frames.push(id);
        self.frames.push(Frame {
            id,
            page,
            bounds,
            origin,
            prev: None,
            next: None,
            story: None,
        });
        Some(id)
    }

    /// Follows `prev` links back to the first frame of the chain.
    pub fn head_of(&self, frame: FrameId) -> FrameId {
        let mut current = frame;
        let mut steps = 0;
        while let Some(prev) = self.frame(current).and_then(|f| f.prev) {
            current = prev;
            steps += 1;
            if steps > self.frames.len() {
                break;
            }
        }
        current
    }

    /// Follows `next` links forward to the last frame of the chain.
    pub fn tail_of(&self, frame: FrameId) -> FrameId {
        let mut current = frame;
        let mut steps = 0;
        while let Some(next) = self.frame(current).and_then(|f| f.next) {
            current = next;
            steps += 1;
            if steps > self.frames.len() {
                break;
            }
        }
        current
    }

    /// Frames of the chain containing `frame`, head first.
    pub fn chain(&self, frame: FrameId) -> Vec<FrameId> {
        let mut out = vec![self.head_of(frame)];
        while let Some(next) = out.last().and_then(|&id| self.frame(id)).and_then(|f| f.next) {
            if out.len() > self.frames.len() {
                break;
            }
            out.push(next);
        }
        out
    }

    /// Threads `frame` directly after `after`, so text flowing out of `after`
    /// continues in `frame`. The new frame inherits the chain's story.
    pub fn thread_after(&mut self, after: FrameId, frame: FrameId) -> Result<(), ThreadError> {
        let after_frame = self.frame(after).ok_or(ThreadError::UnknownFrame(after))?;
        let target = self.frame(frame).ok_or(ThreadError::UnknownFrame(frame))?;
        if after_frame.next.is_some() {
            return Err(ThreadError::NotTail(after));
        }
        if target.prev.is_some() {
            return Err(ThreadError::AlreadyThreaded(frame));
        }
        if after == frame || self.head_of(after) == frame {
            return Err(ThreadError::Cycle { after, frame });
        }
        let story = after_frame.story;

        self.frames[after.0].next = Some(frame);
        self.frames[frame.0].prev = Some(after);
        // A frame that already led a chain brings its successors along.
        for id in self.chain(frame) {
            self.frames[id.0].story = story;
        }
        Ok(())
    }

    /// Removes `frame` from its chain, linking its neighbours to each other.
    /// Story content is untouched; it simply flows through the remaining frames.
    pub fn unthread(&mut self, frame: FrameId) -> Result<(), ThreadError> {
        let (prev, next) = {
            let f = self.frame(frame).ok_or(ThreadError::UnknownFrame(frame))?;
            (f.prev, f.next)
        };
        if let Some(p) = prev {
            self.frames[p.0].next = next;
        }
        if let Some(n) = next {
            self.frames[n.0].prev = prev;
        }
        let f = &mut self.frames[frame.0];
        f.prev = None;
        f.next = None;
        f.story = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_layout_with_frames(n: usize) -> (Layout, Vec<FrameId>) {
        let mut layout = Layout::new(PagePrefs::default());
        let surface = layout.add_surface();
        let page = layout.add_page(surface, PageSide::Right, vec![], None).unwrap();
        let frames = (0..n)
            .map(|_| {
                layout
                    .add_frame(page, Some(Bounds::new(0.0, 0.0, 10.0, 10.0)), FrameOrigin::Local)
                    .unwrap()
            })
            .collect();
        (layout, frames)
    }

    #[test]
    fn test_thread_after_links_both_directions() {
        let (mut layout, f) = make_layout_with_frames(2);
        layout.frames[f[0].0].story = Some(StoryId(0));
        layout.thread_after(f[0], f[1]).unwrap();
        assert_eq!(layout.frame(f[0]).unwrap().next, Some(f[1]));
        assert_eq!(layout.frame(f[1]).unwrap().prev, Some(f[0]));
        assert_eq!(layout.frame(f[1]).unwrap().story, Some(StoryId(0)));
        assert_eq!(layout.tail_of(f[0]), f[1]);
        assert_eq!(layout.head_of(f[1]), f[0]);
    }

    #[test]
    fn test_thread_after_rejects_cycle() {
        let (mut layout, f) = make_layout_with_frames(2);
        layout.thread_after(f[0], f[1]).unwrap();
        assert_eq!(
            layout.thread_after(f[1], f[0]),
            Err(ThreadError::Cycle {
                after: f[1],
                frame: f[0]
            })
        );
        assert_eq!(
            layout.thread_after(f[1], f[1]),
            Err(ThreadError::Cycle {
                after: f[1],
                frame: f[1]
            })
        );
    }

    #[test]
    fn test_thread_after_rejects_non_tail_and_threaded_frames() {
        let (mut layout, f) = make_layout_with_frames(3);
        layout.thread_after(f[0], f[1]).unwrap();
        assert_eq!(layout.thread_after(f[0], f[2]), Err(ThreadError::NotTail(f[0])));
        assert_eq!(
            layout.thread_after(f[2], f[1]),
            Err(ThreadError::AlreadyThreaded(f[1]))
        );
        assert_eq!(
            layout.thread_after(f[2], FrameId(99)),
            Err(ThreadError::UnknownFrame(FrameId(99)))
        );
    }

    #[test]
    fn test_unthread_reroutes_chain() {
        let (mut layout, f) = make_layout_with_frames(3);
        layout.thread_after(f[0], f[1]).unwrap();
        layout.thread_after(f[1], f[2]).unwrap();
        layout.unthread(f[1]).unwrap();
        assert_eq!(layout.chain(f[0]), vec![f[0], f[2]]);
        assert_eq!(layout.frame(f[1]).unwrap().prev, None);
    }

    #[test]
    fn test_last_page_follows_surface_order() {
        let mut layout = Layout::new(PagePrefs::default());
        let s0 = layout.add_surface();
        layout.add_page(s0, PageSide::Left, vec![], None);
        let p1 = layout.add_page(s0, PageSide::Right, vec![], None);
        assert_eq!(layout.last_page(), p1);
        assert_eq!(layout.page_count(), 2);
    }

    #[test]
    fn test_last_page_skips_trailing_empty_surface() {
        let mut layout = Layout::new(PagePrefs::default());
        let s0 = layout.add_surface();
        let p0 = layout.add_page(s0, PageSide::Right, vec![], None);
        layout.add_surface();
        assert_eq!(layout.surfaces.len(), 2);
        assert_eq!(layout.last_page(), p0);
        assert_eq!(Layout::default().last_page(), None);
    }

    #[test]
    fn test_bounds_area_never_negative() {
        assert_eq!(Bounds::new(10.0, 0.0, 0.0, 10.0).area(), 0.0);
        assert_eq!(Bounds::new(0.0, 0.0, 2.0, 3.0).area(), 6.0);
    }
}
