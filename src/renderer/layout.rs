//! Layout computation: the cached per-bar data read once from the score,
//! and the flow step that groups bars into systems for a given width.
//!
//! Flow only ever reads [`LayoutPrimitives`], never the score, so a resize
//! is a re-flow of cached data.

use std::collections::HashMap;

use crate::canvas::MusicFontSymbol;
use crate::error::{Error, Result};
use crate::model::*;
use crate::settings::{DisplaySettings, LayoutMode, TrackNameOrientation};
use super::constants::*;

// ═══════════════════════════════════════════════════════════════════════
// Metrics
// ═══════════════════════════════════════════════════════════════════════

/// Scaled dimensions used by both layout and drawing.
#[derive(Debug, Clone, Copy)]
pub(super) struct Metrics {
    pub(super) scale: f64,
    pub(super) line_spacing: f64,
    pub(super) staff_height: f64,
    pub(super) staff_padding_top: f64,
    pub(super) staff_padding_bottom: f64,
    pub(super) track_gap: f64,
}

impl Metrics {
    pub(super) fn new(display: &DisplaySettings) -> Self {
        let scale = if display.scale.is_finite() && display.scale > 0.0 {
            display.scale
        } else {
            1.0
        };
        Self {
            scale,
            line_spacing: STAFF_LINE_SPACING * scale,
            staff_height: STAFF_HEIGHT * scale,
            staff_padding_top: STAFF_PADDING_TOP * scale,
            staff_padding_bottom: STAFF_PADDING_BOTTOM * scale,
            track_gap: TRACK_GAP * scale,
        }
    }

    pub(super) fn px(&self, v: f64) -> f64 {
        v * self.scale
    }

    /// Height of one track's staff block including its padding.
    pub(super) fn staff_block(&self) -> f64 {
        self.staff_padding_top + self.staff_height + self.staff_padding_bottom
    }

    /// Y of a staff position, in half spaces above the bottom line.
    pub(super) fn line_y(&self, staff_top: f64, line: i32) -> f64 {
        staff_top + self.staff_height - line as f64 * self.line_spacing / 2.0
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Cached layout primitives
// ═══════════════════════════════════════════════════════════════════════

pub(super) struct LayoutPrimitives {
    pub(super) title: Option<String>,
    pub(super) artist: Option<String>,
    pub(super) tracks: Vec<TrackPrimitive>,
    /// Bars of the rendered range, in document order
    pub(super) columns: Vec<BarColumn>,
}

pub(super) struct TrackPrimitive {
    pub(super) name: String,
}

/// One master bar across all tracks.
pub(super) struct BarColumn {
    /// Absolute bar index in the score
    pub(super) index: usize,
    /// Time signature drawn at the start of this bar
    pub(super) time_signature: Option<TimeSignature>,
    pub(super) key_signature: i32,
    pub(super) key_change: bool,
    pub(super) line_break: bool,
    /// Room for key/time changes before the first beat
    pub(super) prefix_width: f64,
    /// Beat centers relative to the content start, one per onset slot
    pub(super) onsets: Vec<f64>,
    pub(super) min_width: f64,
    /// Indexed by track; `None` when the track has no bar here
    pub(super) staves: Vec<Option<StaffBar>>,
}

impl BarColumn {
    fn fixed_width(&self, m: &Metrics) -> f64 {
        self.prefix_width + m.px(BAR_PADDING_LEFT) + m.px(BAR_PADDING_RIGHT)
    }
}

pub(super) struct StaffBar {
    pub(super) clef: Clef,
    pub(super) beats: Vec<BeatPrimitive>,
}

pub(super) struct BeatPrimitive {
    pub(super) slot: usize,
    pub(super) duration: Duration,
    pub(super) dots: u8,
    pub(super) notes: Vec<NotePrimitive>,
}

pub(super) struct NotePrimitive {
    /// Half staff spaces above the bottom line (0 = bottom line, 8 = top line)
    pub(super) line: i32,
    pub(super) accidental: Option<MusicFontSymbol>,
    pub(super) tie_to_next: bool,
}

/// Sharps are added in this step order, flats in reverse.
const SHARP_ORDER: [Step; 7] = [Step::F, Step::C, Step::G, Step::D, Step::A, Step::E, Step::B];

fn key_alteration(fifths: i32, step: Step) -> i32 {
    let count = fifths.unsigned_abs().min(7) as usize;
    if fifths > 0 && SHARP_ORDER[..count].contains(&step) {
        1
    } else if fifths < 0 && SHARP_ORDER[7 - count..].contains(&step) {
        -1
    } else {
        0
    }
}

fn accidental_symbol(alter: i32) -> MusicFontSymbol {
    match alter {
        a if a > 0 => MusicFontSymbol::AccidentalSharp,
        a if a < 0 => MusicFontSymbol::AccidentalFlat,
        _ => MusicFontSymbol::AccidentalNatural,
    }
}

pub(super) fn key_signature_width(fifths: i32, m: &Metrics) -> f64 {
    match fifths {
        f if f > 0 => f as f64 * m.px(KEY_SIG_SHARP_SPACE),
        f if f < 0 => f.unsigned_abs() as f64 * m.px(KEY_SIG_FLAT_SPACE),
        _ => 0.0,
    }
}

/// Staff positions are derived from octaves, so notes far outside the
/// written range are rejected before any arithmetic on them.
fn check_octaves(score: &Score, bars: std::ops::Range<usize>) -> Result<()> {
    for (t, track) in score.tracks.iter().enumerate() {
        let in_range = track.bars.iter().enumerate().skip(bars.start).take(bars.len());
        for (b, bar) in in_range {
            let mut notes = bar.beats.iter().flat_map(|beat| &beat.notes);
            if let Some(note) = notes.find(|n| !Note::OCTAVES.contains(&n.octave)) {
                return Err(Error::protocol(format!(
                    "track {t} bar {b}: octave {} is outside {}..={}",
                    note.octave,
                    Note::OCTAVES.start(),
                    Note::OCTAVES.end()
                )));
            }
        }
    }
    Ok(())
}

/// Read the score once and derive everything flow and drawing need.
pub(super) fn build_primitives(
    score: &Score,
    display: &DisplaySettings,
    m: &Metrics,
) -> Result<LayoutPrimitives> {
    let start = display.start_bar.max(1) - 1;
    let end = match display.bar_count {
        Some(count) => start.saturating_add(count).min(score.bar_count()),
        None => score.bar_count(),
    };
    if start > 0 && start >= score.bar_count() {
        return Err(Error::protocol(format!(
            "start bar {} is past the end of a {}-bar score",
            display.start_bar,
            score.bar_count()
        )));
    }

    check_octaves(score, start..end)?;

    let mut columns = Vec::with_capacity(end.saturating_sub(start));
    for index in start..end {
        let master = &score.master_bars[index];
        let previous = index.checked_sub(1).map(|i| &score.master_bars[i]);
        let first_in_range = index == start;

        let time_signature = match previous {
            Some(prev) if !first_in_range && prev.time_signature == master.time_signature => None,
            _ => Some(master.time_signature),
        };
        let key_change = !first_in_range
            && previous.is_some_and(|prev| prev.key_signature != master.key_signature);

        let mut prefix_width = 0.0;
        if time_signature.is_some() {
            prefix_width += m.px(TIME_SIG_SPACE);
        }
        if key_change {
            prefix_width += key_signature_width(master.key_signature, m) + m.px(4.0);
        }

        let staves: Vec<Option<(Clef, Vec<(f64, &Beat)>)>> = score
            .tracks
            .iter()
            .map(|track| {
                track.bars.get(index).map(|bar| {
                    let mut onset = 0.0;
                    let timed = bar
                        .beats
                        .iter()
                        .map(|beat| {
                            let at = onset;
                            onset += beat.quarters();
                            (at, beat)
                        })
                        .collect();
                    (bar.clef, timed)
                })
            })
            .collect();

        // Unique onsets across every track keep simultaneous beats aligned.
        let mut slots: Vec<f64> = Vec::new();
        let mut bar_end = master.time_signature.quarters();
        for (_, timed) in staves.iter().flatten() {
            for (at, beat) in timed {
                if !slots.iter().any(|s| (s - at).abs() < 1e-6) {
                    slots.push(*at);
                }
                bar_end = bar_end.max(at + beat.quarters());
            }
        }
        slots.sort_by(f64::total_cmp);
        let slot_of = |at: f64| {
            slots
                .iter()
                .position(|s| (s - at).abs() < 1e-6)
                .unwrap_or_default()
        };

        let mut staff_bars = Vec::with_capacity(staves.len());
        let mut slot_has_accidental = vec![false; slots.len()];
        for staff in staves {
            let Some((clef, timed)) = staff else {
                staff_bars.push(None);
                continue;
            };
            // accidentals already shown in this bar, by diatonic step
            let mut shown: HashMap<i32, i32> = HashMap::new();
            let beats = timed
                .into_iter()
                .map(|(at, beat)| {
                    let slot = slot_of(at);
                    let notes = beat
                        .notes
                        .iter()
                        .map(|note| {
                            let current = shown
                                .get(&note.diatonic())
                                .copied()
                                .unwrap_or_else(|| key_alteration(master.key_signature, note.step));
                            let accidental = (note.alter != current).then(|| {
                                shown.insert(note.diatonic(), note.alter);
                                slot_has_accidental[slot] = true;
                                accidental_symbol(note.alter)
                            });
                            NotePrimitive {
                                line: note.diatonic() - clef.bottom_line_step(),
                                accidental,
                                tie_to_next: note.tie_to_next,
                            }
                        })
                        .collect();
                    BeatPrimitive {
                        slot,
                        duration: beat.duration,
                        dots: beat.dots,
                        notes,
                    }
                })
                .collect();
            staff_bars.push(Some(StaffBar { clef, beats }));
        }

        let mut onsets = Vec::with_capacity(slots.len());
        let mut cursor = 0.0;
        for (i, at) in slots.iter().enumerate() {
            if slot_has_accidental[i] {
                cursor += m.px(ACCIDENTAL_SPACE);
            }
            onsets.push(cursor);
            let next = slots.get(i + 1).copied().unwrap_or(bar_end);
            cursor += m.px((next - at) * PER_QUARTER_WIDTH).max(m.px(MIN_BEAT_SPACING));
        }

        let fixed = prefix_width + m.px(BAR_PADDING_LEFT) + m.px(BAR_PADDING_RIGHT);
        columns.push(BarColumn {
            index,
            time_signature,
            key_signature: master.key_signature,
            key_change,
            line_break: master.line_break,
            prefix_width,
            onsets,
            min_width: (fixed + cursor).max(m.px(MIN_BAR_WIDTH)),
            staves: staff_bars,
        });
    }

    Ok(LayoutPrimitives {
        title: score.title.clone(),
        artist: score.artist.clone(),
        tracks: score
            .tracks
            .iter()
            .map(|t| TrackPrimitive {
                name: t.short_name.clone().unwrap_or_else(|| t.name.clone()),
            })
            .collect(),
        columns,
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Flow
// ═══════════════════════════════════════════════════════════════════════

pub(super) struct PlacedBar {
    /// Index into `LayoutPrimitives::columns`
    pub(super) column: usize,
    pub(super) x: f64,
    pub(super) width: f64,
    /// Factor applied to onset offsets when the bar is stretched
    pub(super) content_scale: f64,
}

impl PlacedBar {
    /// X of the beat center for `slot`.
    pub(super) fn onset_x(&self, column: &BarColumn, slot: usize, m: &Metrics) -> f64 {
        let offset = column.onsets.get(slot).copied().unwrap_or_default();
        self.x + column.prefix_width + m.px(BAR_PADDING_LEFT) + offset * self.content_scale
    }
}

pub(super) struct SystemLayout {
    /// Region index among the drawn systems
    pub(super) index: usize,
    /// Page y of the region's top edge
    pub(super) y: f64,
    pub(super) width: f64,
    pub(super) height: f64,
    /// Top padding before the first staff (margin and header)
    pub(super) top: f64,
    pub(super) show_header: bool,
    pub(super) show_track_names: bool,
    pub(super) x_start: f64,
    /// Left end of the staff lines, after the track name column
    pub(super) staff_left: f64,
    pub(super) x_end: f64,
    pub(super) key_signature: i32,
    pub(super) bars: Vec<PlacedBar>,
    /// Selected tracks with at least one bar in this system, ascending
    pub(super) tracks: Vec<usize>,
}

impl SystemLayout {
    pub(super) fn staff_top(&self, slot: usize, m: &Metrics) -> f64 {
        self.top + slot as f64 * (m.staff_block() + m.track_gap) + m.staff_padding_top
    }
}

fn names_width(display: &DisplaySettings, first: bool, m: &Metrics) -> f64 {
    if !(display.show_track_names && first) {
        return 0.0;
    }
    match display.track_name_orientation {
        TrackNameOrientation::Horizontal => m.px(TRACK_NAME_SPACE),
        TrackNameOrientation::Vertical => m.px(TRACK_NAME_SPACE_VERTICAL),
    }
}

fn system_prefix(display: &DisplaySettings, first: bool, key: i32, m: &Metrics) -> f64 {
    names_width(display, first, m) + m.px(CLEF_SPACE) + key_signature_width(key, m)
}

/// Selected tracks with at least one bar in `columns`, in selection order.
fn participating(columns: &[BarColumn], tracks: &[usize]) -> Vec<usize> {
    tracks
        .iter()
        .copied()
        .filter(|&t| columns.iter().any(|c| c.staves.get(t).is_some_and(Option::is_some)))
        .collect()
}

/// Group the cached bars into systems for `width`, keeping only systems in
/// which at least one of `tracks` has a bar.
pub(super) fn flow(
    primitives: &LayoutPrimitives,
    tracks: &[usize],
    width: f64,
    display: &DisplaySettings,
    m: &Metrics,
) -> Vec<SystemLayout> {
    let page_width = width.max(MIN_PAGE_WIDTH);
    let margin_left = m.px(PAGE_MARGIN_LEFT);
    let margin_right = m.px(PAGE_MARGIN_RIGHT);

    // (first column, column count, stretched) per system
    let mut lines: Vec<(usize, usize, bool)> = Vec::new();
    match display.layout_mode {
        LayoutMode::Horizontal => {
            if !primitives.columns.is_empty() {
                lines.push((0, primitives.columns.len(), false));
            }
        }
        LayoutMode::Page => {
            let mut start = 0;
            let mut used = 0.0;
            // lines before the first drawn one keep reserving the name column
            let mut drawn = false;
            for (ci, column) in primitives.columns.iter().enumerate() {
                let count = ci - start;
                let prefix = system_prefix(display, !drawn, primitives.columns[start].key_signature, m);
                let full = display.bars_per_row.is_some_and(|n| count >= n.max(1));
                let overflow = margin_left + prefix + used + column.min_width > page_width - margin_right;
                if count > 0 && (column.line_break || full || overflow) {
                    lines.push((start, count, true));
                    drawn |= !participating(&primitives.columns[start..ci], tracks).is_empty();
                    start = ci;
                    used = 0.0;
                }
                used += column.min_width;
            }
            if start < primitives.columns.len() {
                lines.push((start, primitives.columns.len() - start, false));
            }
        }
    }

    let mut systems = Vec::new();
    let mut y = 0.0;
    for (first, count, stretch) in lines {
        let columns = &primitives.columns[first..first + count];
        let participating = participating(columns, tracks);
        if participating.is_empty() {
            continue;
        }

        let index = systems.len();
        let lead = index == 0;
        let key_signature = columns[0].key_signature;
        let show_track_names = display.show_track_names && lead;
        let x_start = margin_left;
        let staff_left = x_start + names_width(display, lead, m);
        let prefix = system_prefix(display, lead, key_signature, m);
        let natural: f64 = columns.iter().map(|c| c.min_width).sum();
        let available = page_width - margin_right - x_start - prefix;
        let extra = if stretch && available > natural {
            available - natural
        } else {
            0.0
        };

        let mut x = x_start + prefix;
        let bars = columns
            .iter()
            .enumerate()
            .map(|(offset, column)| {
                let width = column.min_width + extra * column.min_width / natural.max(1e-6);
                let fixed = column.fixed_width(m);
                let content_scale = (width - fixed) / (column.min_width - fixed).max(1e-6);
                let placed = PlacedBar {
                    column: first + offset,
                    x,
                    width,
                    content_scale,
                };
                x += width;
                placed
            })
            .collect();
        let x_end = x;

        let show_header = lead && display.show_title && primitives.title.is_some();
        let mut top = if lead { m.px(PAGE_MARGIN_TOP) } else { 0.0 };
        if show_header {
            top += m.px(HEADER_HEIGHT);
        }
        let staves = participating.len() as f64;
        let height = top + staves * m.staff_block() + (staves - 1.0) * m.track_gap + m.px(SYSTEM_GAP);
        let width = match display.layout_mode {
            LayoutMode::Page => page_width,
            LayoutMode::Horizontal => x_end + margin_right,
        };

        systems.push(SystemLayout {
            index,
            y,
            width,
            height,
            top,
            show_header,
            show_track_names,
            x_start,
            staff_left,
            x_end,
            key_signature,
            bars,
            tracks: participating,
        });
        y += height;
    }

    if let Some(last) = systems.last_mut() {
        last.height += m.px(PAGE_MARGIN_BOTTOM);
    }
    systems
}
