//! Score renderer: lays out a score, draws it system by system onto a
//! [`Canvas`], and reports each step as a [`RenderEvent`].
//!
//! A pass always emits `PreRender`, one `PartialRenderFinished` per drawn
//! region, then either `RenderFinished` followed by `PostRenderFinished`, or
//! a single `Error`. Layout primitives read from the score are cached
//! between passes, so a resize only re-flows them.

mod bounds;
mod constants;
mod layout;
mod notes;
mod staff;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::canvas::{create_canvas, Canvas, Font, RenderPayload, TextAlign, TextBaseline};
use crate::error::{Error, ErrorEnvelope, Result};
use crate::model::Score;
use crate::settings::{ColorScheme, LayoutMode, Settings};
use bounds::BoundsLookupBuilder;
use constants::*;
use layout::{LayoutPrimitives, Metrics, SystemLayout};
use notes::{render_beats, BarPlacement};
use staff::*;

pub use bounds::{Bounds, BoundsLookup, ElementId};

// ═══════════════════════════════════════════════════════════════════════
// Events
// ═══════════════════════════════════════════════════════════════════════

/// Output of one region, or of the whole pass when `region` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    pub region: Option<usize>,
    /// Area covered, in page coordinates
    pub bounds: Bounds,
    pub payload: Option<RenderPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum RenderEvent {
    PreRender,
    PartialRenderFinished {
        result: RenderResult,
    },
    RenderFinished {
        result: RenderResult,
    },
    PostRenderFinished {
        #[serde(rename = "boundsLookup")]
        bounds_lookup: Arc<BoundsLookup>,
    },
    Error {
        stage: String,
        error: ErrorEnvelope,
    },
}

impl RenderEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RenderEvent::PreRender => "preRender",
            RenderEvent::PartialRenderFinished { .. } => "partialRenderFinished",
            RenderEvent::RenderFinished { .. } => "renderFinished",
            RenderEvent::PostRenderFinished { .. } => "postRenderFinished",
            RenderEvent::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderState {
    #[default]
    Idle,
    LayingOut,
    DrawingRegion(usize),
    PostProcessing,
}

type Listener = Box<dyn FnMut(&RenderEvent) + Send>;

// ═══════════════════════════════════════════════════════════════════════
// ScoreRenderer
// ═══════════════════════════════════════════════════════════════════════

pub struct ScoreRenderer {
    canvas: Box<dyn Canvas>,
    settings: Settings,
    score: Option<Arc<Score>>,
    track_indexes: Vec<usize>,
    width: f64,
    primitives: Option<LayoutPrimitives>,
    layout_generation: u64,
    state: RenderState,
    bounds_lookup: Option<Arc<BoundsLookup>>,
    listeners: Vec<Listener>,
}

impl ScoreRenderer {
    pub fn new(settings: Settings) -> Self {
        let canvas = create_canvas(settings.core.engine);
        Self::with_canvas(settings, canvas)
    }

    /// Renderer drawing onto a caller-supplied backend.
    pub fn with_canvas(settings: Settings, canvas: Box<dyn Canvas>) -> Self {
        Self {
            canvas,
            width: settings.display.width,
            settings,
            score: None,
            track_indexes: Vec::new(),
            primitives: None,
            layout_generation: 0,
            state: RenderState::Idle,
            bounds_lookup: None,
            listeners: Vec::new(),
        }
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&RenderEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Bumped every time cached layout is discarded.
    pub fn layout_generation(&self) -> u64 {
        self.layout_generation
    }

    /// Lookup exported by the last successful pass.
    pub fn bounds_lookup(&self) -> Option<Arc<BoundsLookup>> {
        self.bounds_lookup.clone()
    }

    pub fn has_cached_layout(&self) -> bool {
        self.primitives.is_some()
    }

    /// Lay out and draw `score`. An empty `track_indexes` renders the
    /// first track.
    #[tracing::instrument(skip(self, score), fields(generation = self.layout_generation))]
    pub fn render(&mut self, score: Arc<Score>, track_indexes: &[usize]) {
        let same_score = self
            .score
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &score));
        if !same_score && self.primitives.is_some() {
            self.discard_layout();
        }
        self.score = Some(score);
        self.track_indexes = track_indexes.to_vec();
        self.run_pass();
    }

    /// Drop cached layout. Emits nothing; the next render starts over.
    pub fn invalidate(&mut self) {
        if self.state != RenderState::Idle {
            debug!(state = ?self.state, "invalidated during a pass; its results are stale");
        }
        self.discard_layout();
    }

    /// Re-flow cached layout to `width`. Fixed layouts only record it.
    pub fn resize(&mut self, width: f64) {
        if !(width.is_finite() && width > 0.0) {
            warn!(width, "ignoring resize to a non-positive width");
            return;
        }
        let changed = (self.width - width).abs() > f64::EPSILON;
        self.width = width;

        if self.settings.display.layout_mode == LayoutMode::Horizontal {
            debug!(width, "horizontal layout does not reflow");
            return;
        }
        if !changed {
            debug!(width, "width unchanged");
            return;
        }
        if self.primitives.is_none() {
            debug!(width, "no cached layout; width applies to the next render");
            return;
        }
        info!(width, "reflowing");
        self.run_pass();
    }

    /// Apply new settings; visual changes discard cached layout first.
    pub fn update_settings(&mut self, settings: Settings) {
        let visual = self.settings.is_visual_change(&settings);
        if visual {
            self.invalidate();
        }
        if settings.core.engine != self.settings.core.engine {
            info!(engine = ?settings.core.engine, "switching canvas backend");
            self.canvas = create_canvas(settings.core.engine);
        }
        if settings.display.width != self.settings.display.width {
            self.width = settings.display.width;
        }
        self.settings = settings;
    }

    fn discard_layout(&mut self) {
        self.primitives = None;
        self.layout_generation += 1;
    }

    fn emit(&mut self, event: RenderEvent) {
        debug!(event = event.name(), "render event");
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    // ── Pass ─────────────────────────────────────────────────────────

    fn run_pass(&mut self) {
        if self.state != RenderState::Idle {
            warn!(state = ?self.state, "render pass requested while another is in flight");
            return;
        }
        self.bounds_lookup = None;
        self.emit(RenderEvent::PreRender);

        match self.execute_pass() {
            Ok(lookup) => {
                let lookup = Arc::new(lookup);
                self.bounds_lookup = Some(Arc::clone(&lookup));
                self.emit(RenderEvent::PostRenderFinished {
                    bounds_lookup: lookup,
                });
            }
            Err(err) => {
                let stage = match &err {
                    Error::RenderFailure { stage, .. } => *stage,
                    _ => "render",
                };
                error!(stage, error = %err, "render pass failed");
                // discard regions the backend is still holding
                if let Err(cleanup) = self.canvas.on_render_finished() {
                    debug!(error = %cleanup, "backend cleanup after failed pass");
                }
                self.emit(RenderEvent::Error {
                    stage: stage.to_owned(),
                    error: ErrorEnvelope::from_error(&err),
                });
            }
        }
        self.state = RenderState::Idle;
    }

    fn execute_pass(&mut self) -> Result<BoundsLookup> {
        self.state = RenderState::LayingOut;
        let metrics = Metrics::new(&self.settings.display);
        let primitives = match self.primitives.take() {
            Some(primitives) => primitives,
            None => {
                let score = self
                    .score
                    .clone()
                    .ok_or_else(|| failure("layout", Error::invalid_state("render pass without a score")))?;
                let primitives = layout::build_primitives(&score, &self.settings.display, &metrics)
                    .map_err(|e| failure("layout", e))?;
                debug!(
                    generation = self.layout_generation,
                    bars = primitives.columns.len(),
                    "layout primitives built"
                );
                primitives
            }
        };

        let result = self.draw_pass(&primitives, &metrics);
        self.primitives = Some(primitives);
        result
    }

    fn draw_pass(&mut self, primitives: &LayoutPrimitives, m: &Metrics) -> Result<BoundsLookup> {
        let tracks = resolve_tracks(&self.track_indexes, primitives.tracks.len())
            .map_err(|e| failure("layout", e))?;
        let systems = layout::flow(primitives, &tracks, self.width, &self.settings.display, m);
        info!(systems = systems.len(), width = self.width, ?tracks, "layout flowed");

        let mut builder = BoundsLookupBuilder::new();
        let mut total = Bounds::default();
        for system in &systems {
            self.state = RenderState::DrawingRegion(system.index);
            let (payload, batch) = draw_system(self.canvas.as_mut(), primitives, system, &self.settings, m)
                .map_err(|e| canvas_failure("draw", e))?;
            builder.add_batch(batch);

            let bounds = Bounds::new(0.0, system.y, system.width, system.height);
            total.w = total.w.max(bounds.w);
            total.h = bounds.bottom();
            self.emit(RenderEvent::PartialRenderFinished {
                result: RenderResult {
                    region: Some(system.index),
                    bounds,
                    payload: Some(payload),
                },
            });
            self.state = RenderState::LayingOut;
        }

        self.state = RenderState::PostProcessing;
        let payload = self
            .canvas
            .on_render_finished()
            .map_err(|e| canvas_failure("finalize", e))?;
        self.emit(RenderEvent::RenderFinished {
            result: RenderResult {
                region: None,
                bounds: total,
                payload,
            },
        });
        Ok(builder.finish())
    }
}

fn failure(stage: &'static str, err: Error) -> Error {
    match err {
        Error::RenderFailure { .. } => err,
        other => Error::render_failure(stage, other),
    }
}

/// The renderer owns every scope it opens, so canvas `InvalidState` is a
/// renderer bug: it panics in debug builds and fails the pass otherwise.
fn canvas_failure(stage: &'static str, err: Error) -> Error {
    debug_assert!(
        !matches!(err, Error::InvalidState(_)),
        "canvas contract violated during {stage}: {err}"
    );
    failure(stage, err)
}

/// Sorted, de-duplicated valid track indexes. Out-of-range entries are
/// dropped with a warning; an empty request means the first track.
fn resolve_tracks(requested: &[usize], track_count: usize) -> Result<Vec<usize>> {
    let mut tracks: Vec<usize> = if requested.is_empty() {
        vec![0]
    } else {
        requested.to_vec()
    };
    tracks.retain(|&track| {
        let valid = track < track_count;
        if !valid {
            warn!(track, track_count, "ignoring track index outside the score");
        }
        valid
    });
    tracks.sort_unstable();
    tracks.dedup();
    if tracks.is_empty() {
        return Err(Error::invalid_state(format!(
            "no renderable track among {requested:?} in a score with {track_count} track(s)"
        )));
    }
    Ok(tracks)
}

// ═══════════════════════════════════════════════════════════════════════
// Region drawing
// ═══════════════════════════════════════════════════════════════════════

fn reset_style(canvas: &mut dyn Canvas, colors: &ColorScheme) {
    canvas.set_color(colors.main_glyph);
    canvas.set_line_width(1.0);
    canvas.set_font(Font::default());
    canvas.set_text_align(TextAlign::Left);
    canvas.set_text_baseline(TextBaseline::Top);
}

fn draw_system(
    canvas: &mut dyn Canvas,
    primitives: &LayoutPrimitives,
    system: &SystemLayout,
    settings: &Settings,
    m: &Metrics,
) -> Result<(RenderPayload, Vec<(ElementId, Bounds)>)> {
    let colors = &settings.colors;
    let mut bounds = vec![(
        ElementId::System {
            system: system.index,
        },
        Bounds::new(0.0, system.y, system.width, system.height),
    )];

    canvas.begin_render(system.width, system.height)?;
    reset_style(canvas, colors);
    canvas.begin_group(&format!("system-{}", system.index))?;

    if system.show_header {
        if let Some(title) = &primitives.title {
            render_header(canvas, title, primitives.artist.as_deref(), system.width, m, colors)?;
        }
    }

    let first_top = system.staff_top(0, m);
    let last_bottom = system.staff_top(system.tracks.len().saturating_sub(1), m) + m.staff_height;
    if system.tracks.len() > 1 {
        let x = system.staff_left - m.px(BRACKET_WIDTH) - m.px(4.0);
        render_bracket(canvas, x, first_top, last_bottom, m, colors)?;
    }
    render_barline(canvas, system.staff_left + m.px(BARLINE_WIDTH), first_top, last_bottom, m, colors)?;

    for (slot, &track) in system.tracks.iter().enumerate() {
        let staff_top = system.staff_top(slot, m);
        canvas.begin_group(&format!("track-{track}-system-{}", system.index))?;
        render_staff_lines(canvas, system.staff_left, system.x_end, staff_top, m, colors)?;

        if system.show_track_names {
            render_track_name(
                canvas,
                &primitives.tracks[track].name,
                system.x_start,
                system.staff_left - system.x_start,
                staff_top,
                settings.display.track_name_orientation,
                m,
                colors,
            )?;
        }

        let clef = system
            .bars
            .iter()
            .find_map(|b| primitives.columns[b.column].staves[track].as_ref().map(|s| s.clef))
            .unwrap_or_default();
        render_clef(canvas, system.staff_left + m.px(6.0), staff_top, clef, m, colors)?;
        render_key_signature(
            canvas,
            system.staff_left + m.px(CLEF_SPACE),
            staff_top,
            clef,
            system.key_signature,
            m,
            colors,
        )?;

        for (b, placed) in system.bars.iter().enumerate() {
            let column = &primitives.columns[placed.column];
            let staff = column.staves.get(track).and_then(Option::as_ref);
            canvas.begin_group(&format!("bar-{track}-{}", column.index))?;

            let mut x = placed.x;
            if column.key_change {
                // the system prefix already shows the key on the first bar
                if b > 0 {
                    let staff_clef = staff.map_or(clef, |s| s.clef);
                    render_key_signature(canvas, x + m.px(2.0), staff_top, staff_clef, column.key_signature, m, colors)?;
                }
                x += layout::key_signature_width(column.key_signature, m) + m.px(4.0);
            }
            if let Some(time) = column.time_signature {
                render_time_signature(canvas, x, staff_top, time, m, colors)?;
            }
            if b == 0 && slot == 0 && column.index > 0 {
                render_bar_number(canvas, system.staff_left, staff_top, column.index + 1, m, colors)?;
            }

            if let Some(staff) = staff {
                bounds.push((
                    ElementId::Bar {
                        track,
                        bar: column.index,
                    },
                    Bounds::new(placed.x, system.y + staff_top, placed.width, m.staff_height),
                ));
                let at = BarPlacement {
                    column,
                    placed,
                    staff_top,
                    track,
                    page_y: system.y,
                    include_note_bounds: settings.core.include_note_bounds,
                };
                render_beats(canvas, staff, &at, m, colors, &mut bounds)?;
            }

            render_barline(canvas, placed.x + placed.width, staff_top, staff_top + m.staff_height, m, colors)?;
            canvas.end_group()?;
        }

        bounds.push((
            ElementId::Staff {
                system: system.index,
                track,
            },
            Bounds::new(
                system.staff_left,
                system.y + staff_top,
                system.x_end - system.staff_left,
                m.staff_height,
            ),
        ));
        canvas.end_group()?;
    }

    canvas.end_group()?;
    let payload = canvas.end_render()?;
    Ok((payload, bounds))
}
