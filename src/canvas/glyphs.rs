//! Music font symbol table (SMuFL code points and bounding boxes).
//!
//! Boxes are in staff spaces with y pointing up, measured from the glyph
//! origin, as published in the Bravura font metadata.

/// Family name vector backends reference for music symbols.
pub const MUSIC_FONT_FAMILY: &str = "Bravura";

/// Music font size at scale 1.0. One staff space is a quarter of it.
pub const MUSIC_FONT_SIZE: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MusicFontSymbol {
    GClef,
    FClef,
    CClef,
    TimeSig0,
    TimeSig1,
    TimeSig2,
    TimeSig3,
    TimeSig4,
    TimeSig5,
    TimeSig6,
    TimeSig7,
    TimeSig8,
    TimeSig9,
    NoteheadWhole,
    NoteheadHalf,
    NoteheadBlack,
    AugmentationDot,
    AccidentalFlat,
    AccidentalNatural,
    AccidentalSharp,
    Flag8thUp,
    Flag8thDown,
    Flag16thUp,
    Flag16thDown,
    RestWhole,
    RestHalf,
    RestQuarter,
    Rest8th,
    Rest16th,
}

/// Glyph bounding box in staff spaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphBox {
    pub width: f64,
    /// Extent above the origin (positive = up).
    pub top: f64,
    /// Extent below the origin (negative = down).
    pub bottom: f64,
}

impl GlyphBox {
    const fn new(width: f64, top: f64, bottom: f64) -> Self {
        Self { width, top, bottom }
    }

    /// Horizontal advance in output units at the given scale.
    pub fn advance(&self, scale: f64) -> f64 {
        self.width * staff_space(scale)
    }

    /// `(left, top, width, height)` in output units (y down) for a glyph
    /// drawn with its origin at `(x, y)`.
    pub fn rect_at(&self, x: f64, y: f64, scale: f64) -> (f64, f64, f64, f64) {
        let sp = staff_space(scale);
        (x, y - self.top * sp, self.width * sp, (self.top - self.bottom) * sp)
    }
}

fn staff_space(scale: f64) -> f64 {
    MUSIC_FONT_SIZE * scale / 4.0
}

impl MusicFontSymbol {
    pub fn codepoint(self) -> u32 {
        use MusicFontSymbol::*;
        match self {
            GClef => 0xE050,
            FClef => 0xE062,
            CClef => 0xE05C,
            TimeSig0 => 0xE080,
            TimeSig1 => 0xE081,
            TimeSig2 => 0xE082,
            TimeSig3 => 0xE083,
            TimeSig4 => 0xE084,
            TimeSig5 => 0xE085,
            TimeSig6 => 0xE086,
            TimeSig7 => 0xE087,
            TimeSig8 => 0xE088,
            TimeSig9 => 0xE089,
            NoteheadWhole => 0xE0A2,
            NoteheadHalf => 0xE0A3,
            NoteheadBlack => 0xE0A4,
            AugmentationDot => 0xE1E7,
            AccidentalFlat => 0xE260,
            AccidentalNatural => 0xE261,
            AccidentalSharp => 0xE262,
            Flag8thUp => 0xE240,
            Flag8thDown => 0xE241,
            Flag16thUp => 0xE242,
            Flag16thDown => 0xE243,
            RestWhole => 0xE4E3,
            RestHalf => 0xE4E4,
            RestQuarter => 0xE4E5,
            Rest8th => 0xE4E6,
            Rest16th => 0xE4E7,
        }
    }

    pub fn glyph_box(self) -> GlyphBox {
        use MusicFontSymbol::*;
        match self {
            GClef => GlyphBox::new(2.684, 4.392, -2.632),
            FClef => GlyphBox::new(2.756, 1.048, -2.54),
            CClef => GlyphBox::new(2.796, 2.024, -2.024),
            TimeSig0 | TimeSig2 | TimeSig3 | TimeSig5 | TimeSig6 | TimeSig8 | TimeSig9 => {
                GlyphBox::new(1.8, 1.0, -1.0)
            }
            TimeSig1 => GlyphBox::new(1.26, 1.0, -1.0),
            TimeSig4 | TimeSig7 => GlyphBox::new(1.7, 1.0, -1.0),
            NoteheadWhole => GlyphBox::new(1.688, 0.5, -0.5),
            NoteheadHalf | NoteheadBlack => GlyphBox::new(1.18, 0.5, -0.5),
            AugmentationDot => GlyphBox::new(0.4, 0.2, -0.2),
            AccidentalFlat => GlyphBox::new(0.904, 1.756, -0.7),
            AccidentalNatural => GlyphBox::new(0.672, 1.364, -1.34),
            AccidentalSharp => GlyphBox::new(0.996, 1.4, -1.392),
            Flag8thUp => GlyphBox::new(1.056, 0.03, -3.24),
            Flag8thDown => GlyphBox::new(1.224, 3.232, -0.02),
            Flag16thUp => GlyphBox::new(1.116, 0.08, -3.252),
            Flag16thDown => GlyphBox::new(1.164, 3.228, 0.0),
            RestWhole => GlyphBox::new(1.128, 0.036, -0.54),
            RestHalf => GlyphBox::new(1.128, 0.54, -0.036),
            RestQuarter => GlyphBox::new(1.08, 1.492, -1.5),
            Rest8th => GlyphBox::new(0.988, 0.696, -1.004),
            Rest16th => GlyphBox::new(1.28, 0.716, -2.0),
        }
    }

    /// Whether the glyph is a note head or dot, drawn as an ellipse by
    /// backends without a font rasterizer.
    pub(crate) fn is_round(self) -> bool {
        matches!(
            self,
            MusicFontSymbol::NoteheadWhole
                | MusicFontSymbol::NoteheadHalf
                | MusicFontSymbol::NoteheadBlack
                | MusicFontSymbol::AugmentationDot
        )
    }

    pub(crate) fn is_hollow(self) -> bool {
        matches!(self, MusicFontSymbol::NoteheadWhole | MusicFontSymbol::NoteheadHalf)
    }
}

/// Digit glyphs for a time signature number.
pub fn time_signature_digits(value: u32) -> Vec<MusicFontSymbol> {
    use MusicFontSymbol::*;
    const DIGITS: [MusicFontSymbol; 10] = [
        TimeSig0, TimeSig1, TimeSig2, TimeSig3, TimeSig4, TimeSig5, TimeSig6, TimeSig7, TimeSig8,
        TimeSig9,
    ];
    value
        .to_string()
        .bytes()
        .map(|b| DIGITS[(b - b'0') as usize])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_digit_time_signature() {
        assert_eq!(
            time_signature_digits(12),
            vec![MusicFontSymbol::TimeSig1, MusicFontSymbol::TimeSig2]
        );
        assert_eq!(time_signature_digits(0), vec![MusicFontSymbol::TimeSig0]);
    }

    #[test]
    fn glyph_rect_is_scaled_staff_spaces() {
        let (x, y, w, h) = MusicFontSymbol::NoteheadBlack.glyph_box().rect_at(10.0, 20.0, 1.0);
        assert_eq!((x, y), (10.0, 15.0));
        assert!((w - 11.8).abs() < 1e-9);
        assert!((h - 10.0).abs() < 1e-9);

        let doubled = MusicFontSymbol::NoteheadBlack.glyph_box().advance(2.0);
        assert!((doubled - 23.6).abs() < 1e-9);
    }
}
