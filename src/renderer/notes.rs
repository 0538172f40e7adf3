//! Note, rest, accidental, stem, flag, tie, and ledger line rendering.

use crate::canvas::{Canvas, MusicFontSymbol};
use crate::error::Result;
use crate::model::Duration;
use crate::settings::ColorScheme;
use super::bounds::{Bounds, ElementId};
use super::constants::*;
use super::layout::{BarColumn, BeatPrimitive, Metrics, PlacedBar, StaffBar};

/// Where one staff bar sits and where its rectangles go.
pub(super) struct BarPlacement<'a> {
    pub(super) column: &'a BarColumn,
    pub(super) placed: &'a PlacedBar,
    pub(super) staff_top: f64,
    pub(super) track: usize,
    /// Page y of the region, added to every recorded rectangle
    pub(super) page_y: f64,
    pub(super) include_note_bounds: bool,
}

fn notehead(duration: Duration) -> MusicFontSymbol {
    match duration {
        Duration::Whole => MusicFontSymbol::NoteheadWhole,
        Duration::Half => MusicFontSymbol::NoteheadHalf,
        _ => MusicFontSymbol::NoteheadBlack,
    }
}

fn rest_glyph(duration: Duration) -> (MusicFontSymbol, i32) {
    // whole rest hangs from the fourth line, the others sit on the middle
    match duration {
        Duration::Whole => (MusicFontSymbol::RestWhole, 6),
        Duration::Half => (MusicFontSymbol::RestHalf, 4),
        Duration::Quarter => (MusicFontSymbol::RestQuarter, 4),
        Duration::Eighth => (MusicFontSymbol::Rest8th, 4),
        Duration::Sixteenth => (MusicFontSymbol::Rest16th, 4),
    }
}

fn flag(duration: Duration, up: bool) -> Option<MusicFontSymbol> {
    match (duration, up) {
        (Duration::Eighth, true) => Some(MusicFontSymbol::Flag8thUp),
        (Duration::Eighth, false) => Some(MusicFontSymbol::Flag8thDown),
        (Duration::Sixteenth, true) => Some(MusicFontSymbol::Flag16thUp),
        (Duration::Sixteenth, false) => Some(MusicFontSymbol::Flag16thDown),
        _ => None,
    }
}

/// Draw every beat of one staff bar and record beat (and optionally note)
/// rectangles into `bounds`.
pub(super) fn render_beats(
    canvas: &mut dyn Canvas,
    staff: &StaffBar,
    at: &BarPlacement<'_>,
    m: &Metrics,
    colors: &ColorScheme,
    bounds: &mut Vec<(ElementId, Bounds)>,
) -> Result<()> {
    let bar_end = at.placed.x + at.placed.width - m.px(BAR_PADDING_RIGHT) / 2.0;
    for (i, beat) in staff.beats.iter().enumerate() {
        let x = at.placed.onset_x(at.column, beat.slot, m);
        let next_x = staff
            .beats
            .get(i + 1)
            .map(|b| at.placed.onset_x(at.column, b.slot, m))
            .unwrap_or(bar_end);

        let width = if beat.notes.is_empty() {
            render_rest(canvas, beat, x, at.staff_top, m, colors)?
        } else {
            render_chord(canvas, beat, i, x, next_x, at, m, colors, bounds)?
        };
        bounds.push((
            ElementId::Beat {
                track: at.track,
                bar: at.column.index,
                beat: i,
            },
            Bounds::new(x - width / 2.0, at.page_y + at.staff_top, width, m.staff_height),
        ));
    }
    Ok(())
}

/// Returns the drawn width.
fn render_rest(
    canvas: &mut dyn Canvas,
    beat: &BeatPrimitive,
    x: f64,
    staff_top: f64,
    m: &Metrics,
    colors: &ColorScheme,
) -> Result<f64> {
    let (symbol, line) = rest_glyph(beat.duration);
    let y = m.line_y(staff_top, line);
    canvas.set_color(colors.main_glyph);
    canvas.fill_music_font_symbol(x, y, m.scale, symbol, true)?;

    let advance = symbol.glyph_box().advance(m.scale);
    for d in 0..beat.dots {
        let dot_x = x + advance / 2.0 + m.px(DOT_OFFSET) * (d as f64 + 1.0);
        canvas.fill_music_font_symbol(dot_x, m.line_y(staff_top, 5), m.scale, MusicFontSymbol::AugmentationDot, false)?;
    }
    Ok(advance)
}

/// Returns the note head width.
#[allow(clippy::too_many_arguments)]
fn render_chord(
    canvas: &mut dyn Canvas,
    beat: &BeatPrimitive,
    beat_index: usize,
    x: f64,
    next_x: f64,
    at: &BarPlacement<'_>,
    m: &Metrics,
    colors: &ColorScheme,
    bounds: &mut Vec<(ElementId, Bounds)>,
) -> Result<f64> {
    let head = notehead(beat.duration);
    let head_w = head.glyph_box().advance(m.scale);
    let sp = m.line_spacing;
    let lowest = beat.notes.iter().map(|n| n.line).min().unwrap_or(4);
    let highest = beat.notes.iter().map(|n| n.line).max().unwrap_or(4);
    let stem_up = lowest.saturating_add(highest) < 8;

    // ledger lines
    canvas.set_color(colors.staff_line);
    let ledger_w = head_w + m.px(LEDGER_LINE_EXTEND) * 2.0;
    let thickness = m.px(STAFF_LINE_WIDTH);
    let below = (lowest..=-2).filter(|l| l % 2 == 0);
    let above = (10..=highest).filter(|l| l % 2 == 0);
    for line in below.chain(above) {
        let y = m.line_y(at.staff_top, line);
        canvas.fill_rect(x - ledger_w / 2.0, y - thickness / 2.0, ledger_w, thickness)?;
    }

    canvas.set_color(colors.main_glyph);
    for (n, note) in beat.notes.iter().enumerate() {
        let y = m.line_y(at.staff_top, note.line);
        canvas.fill_music_font_symbol(x, y, m.scale, head, true)?;

        if let Some(accidental) = note.accidental {
            let acc_w = accidental.glyph_box().advance(m.scale);
            canvas.fill_music_font_symbol(x - head_w / 2.0 - m.px(2.0) - acc_w, y, m.scale, accidental, false)?;
        }

        // dots sit in a space, never on a line
        let dot_y = if note.line % 2 == 0 { y - sp / 2.0 } else { y };
        for d in 0..beat.dots {
            let dot_x = x + head_w / 2.0 + m.px(DOT_OFFSET) * (d as f64 + 1.0);
            canvas.fill_music_font_symbol(dot_x, dot_y, m.scale, MusicFontSymbol::AugmentationDot, false)?;
        }

        if note.tie_to_next {
            render_tie(canvas, x + head_w / 2.0, next_x - head_w / 2.0, y, !stem_up, m)?;
        }

        if at.include_note_bounds {
            bounds.push((
                ElementId::Note {
                    track: at.track,
                    bar: at.column.index,
                    beat: beat_index,
                    note: n,
                },
                Bounds::new(x - head_w / 2.0, at.page_y + y - sp / 2.0, head_w, sp),
            ));
        }
    }

    if beat.duration != Duration::Whole {
        render_stem(canvas, beat.duration, x, head_w, lowest, highest, stem_up, at.staff_top, m)?;
    }
    Ok(head_w)
}

#[allow(clippy::too_many_arguments)]
fn render_stem(
    canvas: &mut dyn Canvas,
    duration: Duration,
    x: f64,
    head_w: f64,
    lowest: i32,
    highest: i32,
    up: bool,
    staff_top: f64,
    m: &Metrics,
) -> Result<()> {
    let stem_w = m.px(STEM_WIDTH);
    let length = m.px(STEM_LENGTH);
    let (stem_x, from, to) = if up {
        let x = x + head_w / 2.0 - stem_w / 2.0;
        let top = m.line_y(staff_top, highest) - length;
        (x, m.line_y(staff_top, lowest), top)
    } else {
        let x = x - head_w / 2.0 + stem_w / 2.0;
        let bottom = m.line_y(staff_top, lowest) + length;
        (x, m.line_y(staff_top, highest), bottom)
    };

    canvas.set_line_width(stem_w);
    canvas.begin_path()?;
    canvas.move_to(stem_x, from)?;
    canvas.line_to(stem_x, to)?;
    canvas.stroke()?;

    if let Some(symbol) = flag(duration, up) {
        canvas.fill_music_font_symbol(stem_x - stem_w / 2.0, to, m.scale, symbol, false)?;
    }
    Ok(())
}

/// Crescent between two heads, bulging above or below `y`.
fn render_tie(canvas: &mut dyn Canvas, x1: f64, x2: f64, y: f64, above: bool, m: &Metrics) -> Result<()> {
    if x2 <= x1 {
        return Ok(());
    }
    let dir = if above { -1.0 } else { 1.0 };
    let y = y + dir * m.line_spacing * 0.6;
    let height = m.px(TIE_HEIGHT) * dir;
    let inner = height - dir * m.px(1.5);
    let third = (x2 - x1) / 3.0;

    canvas.begin_path()?;
    canvas.move_to(x1, y)?;
    canvas.bezier_curve_to(x1 + third, y + height, x2 - third, y + height, x2, y)?;
    canvas.bezier_curve_to(x2 - third, y + inner, x1 + third, y + inner, x1, y)?;
    canvas.close_path()?;
    canvas.fill()
}
