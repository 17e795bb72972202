//! Overflow Resolver: threads new template surfaces onto a chain until the text fits.
//!
//! # Loop
//! - The tail of the chain is re-derived from its head every iteration.
//! - Each iteration asks the factory for one surface, then takes one usable frame
//!   per page (see `frames::obtain_frame`) and threads it after the tail.
//! - A surface stops being consumed as soon as the tail no longer overflows.
//! - `max_surfaces` bounds the number of surfaces created per call.
//!
//! Every exit returns the count of surfaces created so far. Surfaces already
//! threaded hold real text, so a partial result is reported rather than discarded.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::host::{OverflowSignal, SurfaceFactory};
use crate::document::layout::{FrameId, Layout, PageId};
use crate::layout::frames::{obtain_frame, Margins};

pub const DEFAULT_MAX_SURFACES: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverflowConfig {
    /// Upper bound on surfaces created by one `resolve` call.
    pub max_surfaces: usize,
    pub fallback_margin: Margins,
}

impl Default for OverflowConfig {
    fn default() -> Self {
        OverflowConfig {
            max_surfaces: DEFAULT_MAX_SURFACES,
            fallback_margin: Margins::default(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Report
// ────────────────────────────────────────────────────────────────────────────

/// Why the resolver loop ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The chain did not overflow to begin with.
    NotOverflowing,
    /// Overflow cleared.
    Cleared,
    /// `max_surfaces` surfaces were created and the chain still overflows.
    SurfaceLimit,
    /// The template produced a surface with no pages.
    EmptySurface,
    /// No page of the new surface yielded a frame.
    NoUsableFrames,
    /// A frame could not be threaded; see `OverflowReport::failures`.
    ThreadFailed,
    /// The factory refused to build a surface.
    FactoryFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadFailure {
    pub page: PageId,
    pub frame: FrameId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverflowReport {
    pub surfaces_created: usize,
    pub frames_threaded: usize,
    pub stop: StopReason,
    pub failures: Vec<ThreadFailure>,
}

impl OverflowReport {
    fn new() -> Self {
        OverflowReport {
            surfaces_created: 0,
            frames_threaded: 0,
            stop: StopReason::NotOverflowing,
            failures: Vec::new(),
        }
    }

    fn stop(mut self, reason: StopReason) -> Self {
        self.stop = reason;
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Resolver
// ────────────────────────────────────────────────────────────────────────────

/// Resolves overflow on the chain that contains `chain_head`.
pub fn resolve(
    layout: &mut Layout,
    factory: &dyn SurfaceFactory,
    signal: &dyn OverflowSignal,
    chain_head: FrameId,
    template: &str,
    config: &OverflowConfig,
) -> OverflowReport {
    let mut report = OverflowReport::new();
    let mut tail = layout.tail_of(chain_head);

    if !signal.overflows(layout, tail) {
        return report;
    }

    while signal.overflows(layout, tail) {
        if report.surfaces_created >= config.max_surfaces {
            warn!(
                surfaces = report.surfaces_created,
                max = config.max_surfaces,
                "Overflow resolver: surface limit reached with text still overflowing"
            );
            return report.stop(StopReason::SurfaceLimit);
        }

        let surface = match factory.instantiate(layout, template) {
            Ok(surface) => surface,
            Err(e) => {
                warn!(template, "Overflow resolver: factory failed: {e}");
                return report.stop(StopReason::FactoryFailed {
                    reason: e.to_string(),
                });
            }
        };
        report.surfaces_created += 1;

        let pages = layout
            .surface(surface)
            .map(|s| s.pages.clone())
            .unwrap_or_default();
        if pages.is_empty() {
            warn!(template, "Overflow resolver: template surface has no pages");
            return report.stop(StopReason::EmptySurface);
        }

        let mut used = 0usize;
        for page in pages {
            let Some((frame, source)) = obtain_frame(layout, page, &config.fallback_margin) else {
                continue;
            };

            if let Err(e) = layout.thread_after(tail, frame) {
                warn!(?page, ?frame, "Overflow resolver: threading failed: {e}");
                report.failures.push(ThreadFailure {
                    page,
                    frame,
                    reason: e.to_string(),
                });
                return report.stop(StopReason::ThreadFailed);
            }

            debug!(?page, ?frame, ?source, "Threaded frame");
            used += 1;
            report.frames_threaded += 1;
            tail = frame;

            if !signal.overflows(layout, tail) {
                break;
            }
        }

        if used == 0 {
            return report.stop(StopReason::NoUsableFrames);
        }
        tail = layout.tail_of(tail);
    }

    info!(
        surfaces = report.surfaces_created,
        frames = report.frames_threaded,
        "Overflow resolved"
    );
    report.stop(StopReason::Cleared)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::document::host::{CapacityModel, HostError, Template, TemplateLibrary, TemplatePage};
    use crate::document::layout::{Bounds, FrameOrigin, PagePrefs, PageSide, SurfaceId};

    struct AlwaysOverflows;

    impl OverflowSignal for AlwaysOverflows {
        fn overflows(&self, _layout: &Layout, _frame: FrameId) -> bool {
            true
        }
    }

    struct BrokenFactory;

    impl SurfaceFactory for BrokenFactory {
        fn has_template(&self, _template: &str) -> bool {
            true
        }

        fn instantiate(&self, _layout: &mut Layout, template: &str) -> Result<SurfaceId, HostError> {
            Err(HostError::UnknownTemplate(template.to_string()))
        }
    }

    /// Builds surfaces whose only page is missing from the layout.
    struct DanglingPageFactory;

    impl SurfaceFactory for DanglingPageFactory {
        fn has_template(&self, _template: &str) -> bool {
            true
        }

        fn instantiate(&self, layout: &mut Layout, _template: &str) -> Result<SurfaceId, HostError> {
            let surface = layout.add_surface();
            layout.surfaces[surface.0].pages.push(PageId(999));
            Ok(surface)
        }
    }

    fn make_spread_template(frames_per_page: usize) -> Template {
        Template {
            pages: vec![
                TemplatePage {
                    side: PageSide::Left,
                    frames: vec![Bounds::new(0.0, 0.0, 20.0, 20.0); frames_per_page],
                },
                TemplatePage {
                    side: PageSide::Right,
                    frames: vec![Bounds::new(0.0, 0.0, 20.0, 20.0); frames_per_page],
                },
            ],
        }
    }

    fn make_library(template: Template) -> TemplateLibrary {
        TemplateLibrary(BTreeMap::from([("H".to_string(), template)]))
    }

    /// One page, one 20×20 frame, threaded nowhere.
    fn make_start() -> (Layout, FrameId) {
        let mut layout = Layout::new(PagePrefs::default());
        let surface = layout.add_surface();
        let page = layout.add_page(surface, PageSide::Right, vec![], None).unwrap();
        let frame = layout
            .add_frame(page, Some(Bounds::new(0.0, 0.0, 20.0, 20.0)), FrameOrigin::Local)
            .unwrap();
        (layout, frame)
    }

    fn make_capacity(story_chars: usize) -> CapacityModel {
        // Each 20×20 frame holds 100 characters.
        CapacityModel {
            story_chars,
            chars_per_square_pt: 0.25,
        }
    }

    #[test]
    fn test_no_overflow_creates_nothing() {
        let (mut layout, start) = make_start();
        let library = make_library(make_spread_template(1));
        let report = resolve(
            &mut layout,
            &library,
            &make_capacity(50),
            start,
            "H",
            &OverflowConfig::default(),
        );
        assert_eq!(report.surfaces_created, 0);
        assert_eq!(report.stop, StopReason::NotOverflowing);
        assert_eq!(layout.surfaces.len(), 1);
    }

    #[test]
    fn test_overflow_clears_mid_surface() {
        let (mut layout, start) = make_start();
        let library = make_library(make_spread_template(1));
        // 150 chars: the start frame plus the left page of the first spread suffice.
        let report = resolve(
            &mut layout,
            &library,
            &make_capacity(150),
            start,
            "H",
            &OverflowConfig::default(),
        );
        assert_eq!(report.surfaces_created, 1);
        assert_eq!(report.frames_threaded, 1);
        assert_eq!(report.stop, StopReason::Cleared);
        assert_eq!(layout.chain(start).len(), 2);
    }

    #[test]
    fn test_overflow_spans_multiple_surfaces() {
        let (mut layout, start) = make_start();
        let library = make_library(make_spread_template(1));
        // 450 chars: start + 4 more frames = two spreads.
        let report = resolve(
            &mut layout,
            &library,
            &make_capacity(450),
            start,
            "H",
            &OverflowConfig::default(),
        );
        assert_eq!(report.surfaces_created, 2);
        assert_eq!(report.frames_threaded, 4);
        assert_eq!(report.stop, StopReason::Cleared);
        assert!(!make_capacity(450).overflows(&layout, layout.tail_of(start)));
    }

    #[test]
    fn test_surface_without_usable_frames_stops() {
        let (mut layout, start) = make_start();
        let report = resolve(
            &mut layout,
            &DanglingPageFactory,
            &AlwaysOverflows,
            start,
            "H",
            &OverflowConfig::default(),
        );
        assert_eq!(report.surfaces_created, 1);
        assert_eq!(report.frames_threaded, 0);
        assert_eq!(report.stop, StopReason::NoUsableFrames);
        assert_eq!(layout.chain(start), vec![start]);
    }

    #[test]
    fn test_surface_limit_bounds_the_loop() {
        let (mut layout, start) = make_start();
        let library = make_library(make_spread_template(1));
        let config = OverflowConfig {
            max_surfaces: 3,
            ..OverflowConfig::default()
        };
        let report = resolve(&mut layout, &library, &AlwaysOverflows, start, "H", &config);
        assert_eq!(report.surfaces_created, 3);
        assert_eq!(report.stop, StopReason::SurfaceLimit);
        // Two pages per spread, every page threaded.
        assert_eq!(layout.chain(start).len(), 7);
    }

    #[test]
    fn test_zero_max_surfaces_creates_nothing() {
        let (mut layout, start) = make_start();
        let library = make_library(make_spread_template(1));
        let config = OverflowConfig {
            max_surfaces: 0,
            ..OverflowConfig::default()
        };
        let report = resolve(&mut layout, &library, &AlwaysOverflows, start, "H", &config);
        assert_eq!(report.surfaces_created, 0);
        assert_eq!(report.stop, StopReason::SurfaceLimit);
    }

    #[test]
    fn test_empty_template_forces_exit() {
        let (mut layout, start) = make_start();
        let library = make_library(Template::default());
        let report = resolve(
            &mut layout,
            &library,
            &AlwaysOverflows,
            start,
            "H",
            &OverflowConfig::default(),
        );
        assert_eq!(report.surfaces_created, 1);
        assert_eq!(report.stop, StopReason::EmptySurface);
    }

    #[test]
    fn test_template_without_frames_fabricates() {
        let (mut layout, start) = make_start();
        let library = make_library(make_spread_template(0));
        let report = resolve(
            &mut layout,
            &library,
            &make_capacity(150),
            start,
            "H",
            &OverflowConfig::default(),
        );
        assert_eq!(report.stop, StopReason::Cleared);
        let threaded = layout.chain(start)[1];
        assert_eq!(layout.frame(threaded).unwrap().origin, FrameOrigin::Fabricated);
    }

    #[test]
    fn test_factory_failure_reports_partial_progress() {
        let (mut layout, start) = make_start();
        let report = resolve(
            &mut layout,
            &BrokenFactory,
            &AlwaysOverflows,
            start,
            "H",
            &OverflowConfig::default(),
        );
        assert_eq!(report.surfaces_created, 0);
        assert!(matches!(report.stop, StopReason::FactoryFailed { .. }));
    }

    #[test]
    fn test_thread_failure_is_recorded_not_raised() {
        // A misbehaving host that hands back a page carrying the chain's own frame.
        struct ReuseFactory(FrameId);

        impl SurfaceFactory for ReuseFactory {
            fn has_template(&self, _template: &str) -> bool {
                true
            }

            fn instantiate(&self, layout: &mut Layout, _template: &str) -> Result<SurfaceId, HostError> {
                let surface = layout.add_surface();
                let page = layout
                    .add_page(surface, PageSide::Right, vec![], None)
                    .ok_or_else(|| HostError::Layout("no page".into()))?;
                if let Some(p) = layout.page_mut(page) {
                    p.frames.push(self.0);
                }
                Ok(surface)
            }
        }

        let (mut layout, start) = make_start();
        let report = resolve(
            &mut layout,
            &ReuseFactory(start),
            &AlwaysOverflows,
            start,
            "H",
            &OverflowConfig::default(),
        );
        assert_eq!(report.surfaces_created, 1);
        assert_eq!(report.frames_threaded, 0);
        assert_eq!(report.stop, StopReason::ThreadFailed);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].frame, start);
        assert_eq!(layout.chain(start), vec![start]);
    }

    #[test]
    fn test_terminates_within_bound_for_any_capacity() {
        for chars in [0usize, 1, 99, 100, 101, 1_000, 100_000] {
            let (mut layout, start) = make_start();
            let library = make_library(make_spread_template(1));
            let config = OverflowConfig {
                max_surfaces: 5,
                ..OverflowConfig::default()
            };
            let report = resolve(&mut layout, &library, &make_capacity(chars), start, "H", &config);
            assert!(report.surfaces_created <= 5, "chars={chars}");
        }
    }
}
