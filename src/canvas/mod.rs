//! Drawing-surface contract.
//!
//! The renderer only ever talks to a `dyn Canvas`. Style state, path
//! building, group nesting and rotation scopes live in a shared
//! [`CanvasState`], so every backend enforces the same rules and the
//! backends only differ in how they put marks on their surface.

mod glyphs;
mod raster;
mod state;
mod svg;

use std::fmt;
use std::str::FromStr;

use kurbo::Affine;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::settings::Engine;

pub use glyphs::{time_signature_digits, GlyphBox, MusicFontSymbol, MUSIC_FONT_FAMILY, MUSIC_FONT_SIZE};
pub use raster::RasterCanvas;
pub use state::CanvasState;
pub use svg::SvgCanvas;

/// Build the backend selected by `engine`.
pub fn create_canvas(engine: Engine) -> Box<dyn Canvas> {
    match engine {
        Engine::Svg => Box::new(SvgCanvas::new()),
        Engine::Raster => Box::new(RasterCanvas::new()),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Style types
// ═══════════════════════════════════════════════════════════════════════

/// RGBA color, serialized as `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// CSS color value for vector output.
    pub fn to_css(&self) -> String {
        if self.a == 0xff {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!(
                "rgba({},{},{},{:.3})",
                self.r,
                self.g,
                self.b,
                self.a as f64 / 255.0
            )
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 0xff {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| format!("color '{s}' must start with '#'"))?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(format!("color '{s}' must be #rrggbb or #rrggbbaa"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("color '{s}': {e}"))
        };
        let a = if hex.len() == 8 { channel(6)? } else { 0xff };
        Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Plain,
    Bold,
    Italic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub family: String,
    pub size: f64,
    pub style: FontStyle,
}

impl Font {
    pub fn new(family: impl Into<String>, size: f64, style: FontStyle) -> Self {
        Self {
            family: family.into(),
            size,
            style,
        }
    }
}

/// `12px Arial`, used by a canvas until `set_font` is called.
impl Default for Font {
    fn default() -> Self {
        Self::new("Arial", 12.0, FontStyle::Plain)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextBaseline {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// Width of `text` in `font`, from average glyph advances. Font files are
/// not loaded by this crate, so every backend measures with this estimate.
pub fn estimate_text_width(font: &Font, text: &str) -> f64 {
    let em = match font.style {
        FontStyle::Bold => 0.65,
        _ => 0.6,
    };
    text.chars().count() as f64 * font.size * em
}

// ═══════════════════════════════════════════════════════════════════════
// Render payload
// ═══════════════════════════════════════════════════════════════════════

/// Backend-defined output of `end_render` / `on_render_finished`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RenderPayload {
    Svg { markup: String },
    Image { width: u32, height: u32, png: Vec<u8> },
}

// ═══════════════════════════════════════════════════════════════════════
// Canvas trait
// ═══════════════════════════════════════════════════════════════════════

/// A drawing surface. All coordinates are logical output units.
///
/// Every drawing call between `begin_render` and `end_render` returns
/// [`Error::InvalidState`](crate::Error::InvalidState) when it is issued out
/// of order; the provided methods route through [`CanvasState`] so backends
/// cannot diverge on those rules.
pub trait Canvas: Send {
    fn state(&self) -> &CanvasState;
    fn state_mut(&mut self) -> &mut CanvasState;

    // ── Style ────────────────────────────────────────────────────────

    fn color(&self) -> Color {
        self.state().color
    }

    fn set_color(&mut self, color: Color) {
        self.state_mut().color = color;
    }

    fn line_width(&self) -> f64 {
        self.state().line_width
    }

    fn set_line_width(&mut self, width: f64) {
        self.state_mut().line_width = width;
    }

    fn font(&self) -> &Font {
        &self.state().font
    }

    fn set_font(&mut self, font: Font) {
        self.state_mut().font = font;
    }

    fn text_align(&self) -> TextAlign {
        self.state().text_align
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.state_mut().text_align = align;
    }

    fn text_baseline(&self) -> TextBaseline {
        self.state().text_baseline
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.state_mut().text_baseline = baseline;
    }

    /// Transform currently applied by enclosing rotate scopes.
    fn transform(&self) -> Affine {
        self.state().transform()
    }

    // ── Paths ────────────────────────────────────────────────────────

    fn begin_path(&mut self) -> Result<()> {
        self.state_mut().begin_path()
    }

    fn move_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.state_mut().path_mut("move_to")?.move_to((x, y));
        Ok(())
    }

    fn line_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.state_mut().path_mut("line_to")?.line_to((x, y));
        Ok(())
    }

    fn bezier_curve_to(
        &mut self,
        cp1x: f64,
        cp1y: f64,
        cp2x: f64,
        cp2y: f64,
        x: f64,
        y: f64,
    ) -> Result<()> {
        self.state_mut()
            .path_mut("bezier_curve_to")?
            .curve_to((cp1x, cp1y), (cp2x, cp2y), (x, y));
        Ok(())
    }

    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) -> Result<()> {
        self.state_mut()
            .path_mut("quadratic_curve_to")?
            .quad_to((cpx, cpy), (x, y));
        Ok(())
    }

    fn close_path(&mut self) -> Result<()> {
        self.state_mut().path_mut("close_path")?.close_path();
        Ok(())
    }

    /// Fill the current path with the current color.
    fn fill(&mut self) -> Result<()>;

    /// Stroke the current path with the current color and line width.
    fn stroke(&mut self) -> Result<()>;

    // ── Immediate shapes ─────────────────────────────────────────────

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()>;
    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()>;
    fn fill_circle(&mut self, x: f64, y: f64, radius: f64) -> Result<()>;

    // ── Text and glyphs ──────────────────────────────────────────────

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<()>;

    fn measure_text(&self, text: &str) -> f64 {
        estimate_text_width(self.font(), text)
    }

    /// Draw `symbol` with its origin at `(x, y)`, or horizontally centered
    /// on `x` when `center_at_position` is set.
    fn fill_music_font_symbol(
        &mut self,
        x: f64,
        y: f64,
        scale: f64,
        symbol: MusicFontSymbol,
        center_at_position: bool,
    ) -> Result<()>;

    /// Draw a run of symbols left to right; centering applies to the run.
    fn fill_music_font_symbols(
        &mut self,
        x: f64,
        y: f64,
        scale: f64,
        symbols: &[MusicFontSymbol],
        center_at_position: bool,
    ) -> Result<()> {
        let advance = |s: &MusicFontSymbol| s.glyph_box().advance(scale);
        let mut cursor = if center_at_position {
            x - symbols.iter().map(advance).sum::<f64>() / 2.0
        } else {
            x
        };
        for symbol in symbols {
            self.fill_music_font_symbol(cursor, y, scale, *symbol, false)?;
            cursor += advance(symbol);
        }
        Ok(())
    }

    // ── Grouping and transforms ──────────────────────────────────────

    fn begin_group(&mut self, identifier: &str) -> Result<()>;
    fn end_group(&mut self) -> Result<()>;

    /// Rotate subsequent drawing by `angle` degrees around `(cx, cy)`.
    fn begin_rotate(&mut self, cx: f64, cy: f64, angle: f64) -> Result<()>;
    fn end_rotate(&mut self) -> Result<()>;

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Reset the surface to `width` x `height`.
    fn begin_render(&mut self, width: f64, height: f64) -> Result<()>;

    /// Finalize the current surface. Fails if a group or rotate scope is
    /// still open.
    fn end_render(&mut self) -> Result<RenderPayload>;

    /// One-time finalization after the last `end_render` of a session.
    /// Returns `None` when nothing was rendered since the previous call.
    fn on_render_finished(&mut self) -> Result<Option<RenderPayload>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_round_trips_through_strings() {
        let c: Color = "#1a2b3c".parse().unwrap();
        assert_eq!(c, Color::rgb(0x1a, 0x2b, 0x3c));
        assert_eq!(c.to_string(), "#1a2b3c");

        let translucent: Color = "#ff000080".parse().unwrap();
        assert_eq!(translucent.a, 0x80);
        assert_eq!(translucent.to_css(), "rgba(255,0,0,0.502)");

        assert!("red".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
    }

    #[test]
    fn text_estimate_scales_with_font() {
        let plain = Font::new("Georgia", 10.0, FontStyle::Plain);
        let bold = Font::new("Georgia", 10.0, FontStyle::Bold);
        assert_eq!(estimate_text_width(&plain, "abcd"), 24.0);
        assert!(estimate_text_width(&bold, "abcd") > 24.0);
    }

    #[test]
    fn factory_picks_backend() {
        let mut svg = create_canvas(Engine::Svg);
        svg.begin_render(10.0, 10.0).unwrap();
        assert!(matches!(svg.end_render().unwrap(), RenderPayload::Svg { .. }));

        let mut raster = create_canvas(Engine::Raster);
        raster.begin_render(10.0, 10.0).unwrap();
        assert!(matches!(
            raster.end_render().unwrap(),
            RenderPayload::Image { width: 10, height: 10, .. }
        ));
    }
}
