//! Staff, clef, key/time signature, header, bracket, and barline rendering.

use crate::canvas::{time_signature_digits, Canvas, Font, FontStyle, MusicFontSymbol, TextAlign, TextBaseline};
use crate::error::Result;
use crate::model::{Clef, TimeSignature};
use crate::settings::{ColorScheme, TrackNameOrientation};
use super::constants::*;
use super::layout::{key_signature_width, Metrics};

// ═══════════════════════════════════════════════════════════════════════
// Header rendering
// ═══════════════════════════════════════════════════════════════════════

pub(super) fn render_header(
    canvas: &mut dyn Canvas,
    title: &str,
    artist: Option<&str>,
    width: f64,
    m: &Metrics,
    colors: &ColorScheme,
) -> Result<()> {
    let center_x = width / 2.0;
    let top = m.px(PAGE_MARGIN_TOP);

    canvas.set_color(colors.score_info);
    canvas.set_text_align(TextAlign::Center);
    canvas.set_text_baseline(TextBaseline::Bottom);
    canvas.set_font(Font::new(TEXT_FONT_FAMILY, m.px(TITLE_FONT_SIZE), FontStyle::Bold));
    canvas.fill_text(title, center_x, top + m.px(28.0))?;

    if let Some(artist) = artist {
        canvas.set_font(Font::new(TEXT_FONT_FAMILY, m.px(ARTIST_FONT_SIZE), FontStyle::Italic));
        canvas.fill_text(artist, center_x, top + m.px(50.0))?;
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Staff rendering
// ═══════════════════════════════════════════════════════════════════════

/// Square bracket joining the staves of a multi-track system, with curved
/// hooks at both ends.
pub(super) fn render_bracket(
    canvas: &mut dyn Canvas,
    x: f64,
    top_y: f64,
    bottom_y: f64,
    m: &Metrics,
    colors: &ColorScheme,
) -> Result<()> {
    let w = m.px(BRACKET_WIDTH);
    canvas.set_color(colors.bar_separator);
    canvas.fill_rect(x, top_y - w * 0.5, w * 0.6, bottom_y - top_y + w)?;

    for (y, dir) in [(top_y - w * 0.5, -1.0), (bottom_y + w * 0.5, 1.0)] {
        canvas.begin_path()?;
        canvas.move_to(x, y)?;
        canvas.quadratic_curve_to(x + w, y + dir * w * 0.1, x + w * 1.8, y + dir * w)?;
        canvas.line_to(x + w * 1.8, y + dir * (w - 1.5 * m.scale))?;
        canvas.quadratic_curve_to(x + w, y - dir * w * 0.3, x, y - dir * w * 0.5)?;
        canvas.close_path()?;
        canvas.fill()?;
    }
    Ok(())
}

pub(super) fn render_staff_lines(
    canvas: &mut dyn Canvas,
    x1: f64,
    x2: f64,
    staff_top: f64,
    m: &Metrics,
    colors: &ColorScheme,
) -> Result<()> {
    let thickness = m.px(STAFF_LINE_WIDTH);
    canvas.set_color(colors.staff_line);
    for i in 0..5 {
        let y = staff_top + i as f64 * m.line_spacing;
        canvas.fill_rect(x1, y - thickness / 2.0, x2 - x1, thickness)?;
    }
    Ok(())
}

pub(super) fn render_clef(
    canvas: &mut dyn Canvas,
    x: f64,
    staff_top: f64,
    clef: Clef,
    m: &Metrics,
    colors: &ColorScheme,
) -> Result<()> {
    // glyph origin sits on the line the clef names
    let (symbol, line) = match clef {
        Clef::G2 => (MusicFontSymbol::GClef, 2),
        Clef::F4 => (MusicFontSymbol::FClef, 6),
        Clef::C3 => (MusicFontSymbol::CClef, 4),
    };
    canvas.set_color(colors.main_glyph);
    canvas.fill_music_font_symbol(x, m.line_y(staff_top, line), m.scale, symbol, false)
}

// ═══════════════════════════════════════════════════════════════════════
// Key and time signatures
// ═══════════════════════════════════════════════════════════════════════

/// Staff positions of the key signature accidentals in treble clef.
const SHARP_LINES: [i32; 7] = [8, 5, 9, 6, 3, 7, 4];
const FLAT_LINES: [i32; 7] = [4, 7, 3, 6, 2, 5, 1];

fn clef_shift(clef: Clef) -> i32 {
    match clef {
        Clef::G2 => 0,
        Clef::F4 => -2,
        Clef::C3 => -1,
    }
}

/// Draw the key signature starting at `x`; returns the width used.
pub(super) fn render_key_signature(
    canvas: &mut dyn Canvas,
    x: f64,
    staff_top: f64,
    clef: Clef,
    fifths: i32,
    m: &Metrics,
    colors: &ColorScheme,
) -> Result<f64> {
    let count = fifths.unsigned_abs().min(7) as usize;
    let (symbol, lines, step) = if fifths > 0 {
        (MusicFontSymbol::AccidentalSharp, &SHARP_LINES, m.px(KEY_SIG_SHARP_SPACE))
    } else {
        (MusicFontSymbol::AccidentalFlat, &FLAT_LINES, m.px(KEY_SIG_FLAT_SPACE))
    };

    canvas.set_color(colors.main_glyph);
    for (i, line) in lines.iter().take(count).enumerate() {
        let y = m.line_y(staff_top, line + clef_shift(clef));
        canvas.fill_music_font_symbol(x + i as f64 * step, y, m.scale, symbol, false)?;
    }
    Ok(key_signature_width(fifths, m))
}

pub(super) fn render_time_signature(
    canvas: &mut dyn Canvas,
    x: f64,
    staff_top: f64,
    time: TimeSignature,
    m: &Metrics,
    colors: &ColorScheme,
) -> Result<()> {
    let center_x = x + m.px(TIME_SIG_SPACE) / 2.0;
    canvas.set_color(colors.main_glyph);
    canvas.fill_music_font_symbols(
        center_x,
        m.line_y(staff_top, 6),
        m.scale,
        &time_signature_digits(time.numerator),
        true,
    )?;
    canvas.fill_music_font_symbols(
        center_x,
        m.line_y(staff_top, 2),
        m.scale,
        &time_signature_digits(time.denominator),
        true,
    )
}

// ═══════════════════════════════════════════════════════════════════════
// Barlines, bar numbers, track names
// ═══════════════════════════════════════════════════════════════════════

/// Vertical line from `top_y` to `bottom_y` ending at `x`.
pub(super) fn render_barline(
    canvas: &mut dyn Canvas,
    x: f64,
    top_y: f64,
    bottom_y: f64,
    m: &Metrics,
    colors: &ColorScheme,
) -> Result<()> {
    let w = m.px(BARLINE_WIDTH);
    canvas.set_color(colors.bar_separator);
    canvas.fill_rect(x - w, top_y, w, bottom_y - top_y)
}

pub(super) fn render_bar_number(
    canvas: &mut dyn Canvas,
    x: f64,
    staff_top: f64,
    number: usize,
    m: &Metrics,
    colors: &ColorScheme,
) -> Result<()> {
    canvas.set_color(colors.bar_number);
    canvas.set_font(Font::new(TEXT_FONT_FAMILY, m.px(BAR_NUMBER_FONT_SIZE), FontStyle::Italic));
    canvas.set_text_align(TextAlign::Left);
    canvas.set_text_baseline(TextBaseline::Bottom);
    canvas.fill_text(&number.to_string(), x, staff_top - m.px(6.0))
}

/// Track label in the column left of the staff. Vertical labels read
/// bottom to top.
pub(super) fn render_track_name(
    canvas: &mut dyn Canvas,
    name: &str,
    x: f64,
    column_width: f64,
    staff_top: f64,
    orientation: TrackNameOrientation,
    m: &Metrics,
    colors: &ColorScheme,
) -> Result<()> {
    let mid_y = staff_top + m.staff_height / 2.0;
    canvas.set_color(colors.score_info);
    canvas.set_font(Font::new(TEXT_FONT_FAMILY, m.px(TRACK_NAME_FONT_SIZE), FontStyle::Plain));
    canvas.set_text_baseline(TextBaseline::Middle);

    match orientation {
        TrackNameOrientation::Horizontal => {
            canvas.set_text_align(TextAlign::Left);
            canvas.fill_text(name, x, mid_y)
        }
        TrackNameOrientation::Vertical => {
            let cx = x + column_width / 2.0;
            canvas.set_text_align(TextAlign::Center);
            canvas.begin_rotate(cx, mid_y, -90.0)?;
            canvas.fill_text(name, cx, mid_y)?;
            canvas.end_rotate()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{RenderPayload, SvgCanvas};
    use crate::settings::DisplaySettings;

    fn markup(canvas: &mut SvgCanvas) -> String {
        match canvas.end_render().unwrap() {
            RenderPayload::Svg { markup } => markup,
            other => panic!("expected svg, got {other:?}"),
        }
    }

    #[test]
    fn key_signature_draws_one_glyph_per_accidental() {
        let m = Metrics::new(&DisplaySettings::default());
        let mut canvas = SvgCanvas::new();
        canvas.begin_render(200.0, 100.0).unwrap();
        let width = render_key_signature(&mut canvas, 0.0, 20.0, Clef::G2, -3, &m, &ColorScheme::default()).unwrap();
        assert_eq!(width, 27.0);
        let svg = markup(&mut canvas);
        assert_eq!(svg.matches("&#xE260;").count(), 3);
    }

    #[test]
    fn vertical_track_name_is_rotated() {
        let m = Metrics::new(&DisplaySettings::default());
        let mut canvas = SvgCanvas::new();
        canvas.begin_render(200.0, 100.0).unwrap();
        render_track_name(
            &mut canvas,
            "Violin",
            10.0,
            20.0,
            30.0,
            TrackNameOrientation::Vertical,
            &m,
            &ColorScheme::default(),
        )
        .unwrap();
        assert_eq!(canvas.transform(), kurbo::Affine::IDENTITY);
        let svg = markup(&mut canvas);
        assert!(svg.contains("rotate(-90.00,20.00,50.00)"));
        assert!(svg.contains(">Violin</text>"));
    }

    #[test]
    fn time_signature_stacks_digits() {
        let m = Metrics::new(&DisplaySettings::default());
        let mut canvas = SvgCanvas::new();
        canvas.begin_render(200.0, 100.0).unwrap();
        render_time_signature(
            &mut canvas,
            0.0,
            20.0,
            TimeSignature { numerator: 12, denominator: 8 },
            &m,
            &ColorScheme::default(),
        )
        .unwrap();
        let svg = markup(&mut canvas);
        assert!(svg.contains("&#xE081;") && svg.contains("&#xE082;") && svg.contains("&#xE088;"));
    }
}
