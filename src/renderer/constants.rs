//! Shared constants for the score renderer (output units at scale 1.0).

// ── Page & margins ──────────────────────────────────────────────────
pub(super) const PAGE_MARGIN_LEFT: f64 = 50.0;
pub(super) const PAGE_MARGIN_RIGHT: f64 = 30.0;
pub(super) const PAGE_MARGIN_TOP: f64 = 30.0;
pub(super) const PAGE_MARGIN_BOTTOM: f64 = 20.0;
pub(super) const MIN_PAGE_WIDTH: f64 = 200.0;

// ── Staff dimensions ────────────────────────────────────────────────
pub(super) const STAFF_LINE_SPACING: f64 = 10.0; // distance between staff lines
pub(super) const STAFF_HEIGHT: f64 = 40.0; // 5 lines, 4 spaces
pub(super) const STAFF_PADDING_TOP: f64 = 40.0; // room for stems and ledger lines above
pub(super) const STAFF_PADDING_BOTTOM: f64 = 40.0;
pub(super) const TRACK_GAP: f64 = 30.0; // between staves of different tracks
pub(super) const SYSTEM_GAP: f64 = 20.0;
pub(super) const BRACKET_WIDTH: f64 = 6.0;

// ── Header ──────────────────────────────────────────────────────────
pub(super) const HEADER_HEIGHT: f64 = 70.0; // space for title + artist
pub(super) const TITLE_FONT_SIZE: f64 = 22.0;
pub(super) const ARTIST_FONT_SIZE: f64 = 13.0;
pub(super) const TEXT_FONT_FAMILY: &str = "Georgia";

// ── Prefix widths ───────────────────────────────────────────────────
pub(super) const CLEF_SPACE: f64 = 34.0; // horizontal space for clef at system start
pub(super) const KEY_SIG_SHARP_SPACE: f64 = 10.0;
pub(super) const KEY_SIG_FLAT_SPACE: f64 = 9.0;
pub(super) const TIME_SIG_SPACE: f64 = 26.0;
pub(super) const TRACK_NAME_SPACE: f64 = 70.0;
pub(super) const TRACK_NAME_SPACE_VERTICAL: f64 = 24.0;
pub(super) const TRACK_NAME_FONT_SIZE: f64 = 12.0;
pub(super) const BAR_NUMBER_FONT_SIZE: f64 = 11.0;

// ── Bars and beats ──────────────────────────────────────────────────
pub(super) const MIN_BAR_WIDTH: f64 = 40.0;
pub(super) const BAR_PADDING_LEFT: f64 = 14.0;
pub(super) const BAR_PADDING_RIGHT: f64 = 12.0;
pub(super) const PER_QUARTER_WIDTH: f64 = 32.0;
pub(super) const MIN_BEAT_SPACING: f64 = 18.0;
pub(super) const ACCIDENTAL_SPACE: f64 = 10.0;

// ── Note dimensions ─────────────────────────────────────────────────
pub(super) const STEM_LENGTH: f64 = 35.0;
pub(super) const STEM_WIDTH: f64 = 1.2;
pub(super) const BARLINE_WIDTH: f64 = 1.0;
pub(super) const STAFF_LINE_WIDTH: f64 = 0.8;
pub(super) const LEDGER_LINE_EXTEND: f64 = 4.0;
pub(super) const TIE_HEIGHT: f64 = 6.0;
pub(super) const DOT_OFFSET: f64 = 4.0;
