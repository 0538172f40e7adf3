//! Score document model consumed by the renderer.
//!
//! These structures carry only what layout and drawing need: the bar grid
//! (master bars), the tracks with their bars, beats and notes. They travel
//! across the worker boundary as camelCase JSON.

use serde::{Deserialize, Serialize};

/// A complete score: one shared bar grid plus one or more tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    /// Title of the piece
    #[serde(default)]
    pub title: Option<String>,
    /// Artist or composer line shown under the title
    #[serde(default)]
    pub artist: Option<String>,
    /// Bar-level information shared by all tracks
    #[serde(default)]
    pub master_bars: Vec<MasterBar>,
    /// Tracks (instruments), in document order
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Score {
    /// Number of bars in the bar grid.
    pub fn bar_count(&self) -> usize {
        self.master_bars.len()
    }
}

/// Bar-level attributes shared by every track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MasterBar {
    pub time_signature: TimeSignature,
    /// Number of sharps (positive) or flats (negative)
    pub key_signature: i32,
    /// Force a new system to start at this bar
    pub line_break: bool,
}

/// Time signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Numerator (e.g., 3 in 3/4)
    pub numerator: u32,
    /// Denominator (e.g., 4 in 3/4)
    pub denominator: u32,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }
}

impl TimeSignature {
    /// Bar length in quarter notes.
    pub fn quarters(&self) -> f64 {
        self.numerator as f64 * 4.0 / self.denominator.max(1) as f64
    }
}

/// One instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    /// Bars of this track, aligned index-for-index with `Score::master_bars`.
    /// May be shorter than the bar grid.
    #[serde(default)]
    pub bars: Vec<Bar>,
}

/// One bar of one track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bar {
    pub clef: Clef,
    pub beats: Vec<Beat>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clef {
    /// Treble clef
    #[default]
    G2,
    /// Bass clef
    F4,
    /// Alto clef
    C3,
}

impl Clef {
    /// Diatonic step number (octave * 7 + step) of the bottom staff line.
    pub(crate) fn bottom_line_step(self) -> i32 {
        match self {
            Clef::G2 => 4 * 7 + Step::E.index(),
            Clef::F4 => 2 * 7 + Step::G.index(),
            Clef::C3 => 3 * 7 + Step::F.index(),
        }
    }
}

/// A rhythmic event: a chord of notes, or a rest when `notes` is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Beat {
    pub duration: Duration,
    pub dots: u8,
    pub notes: Vec<Note>,
}

impl Beat {
    pub fn is_rest(&self) -> bool {
        self.notes.is_empty()
    }

    /// Length in quarter notes including augmentation dots.
    pub fn quarters(&self) -> f64 {
        let base = self.duration.quarters();
        let mut total = base;
        let mut add = base;
        for _ in 0..self.dots {
            add /= 2.0;
            total += add;
        }
        total
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Duration {
    Whole,
    Half,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
}

impl Duration {
    pub fn quarters(self) -> f64 {
        match self {
            Duration::Whole => 4.0,
            Duration::Half => 2.0,
            Duration::Quarter => 1.0,
            Duration::Eighth => 0.5,
            Duration::Sixteenth => 0.25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub step: Step,
    pub octave: i32,
    /// Chromatic alteration: -1 flat, 1 sharp, 0 natural
    #[serde(default)]
    pub alter: i32,
    /// Tied into the following beat of the same track
    #[serde(default)]
    pub tie_to_next: bool,
}

impl Note {
    /// Octaves a note may be written in.
    pub const OCTAVES: std::ops::RangeInclusive<i32> = 0..=9;

    pub fn new(step: Step, octave: i32) -> Self {
        Self {
            step,
            octave,
            alter: 0,
            tie_to_next: false,
        }
    }

    /// Diatonic step number: octave * 7 + step.
    pub(crate) fn diatonic(&self) -> i32 {
        self.octave.saturating_mul(7).saturating_add(self.step.index())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    pub(crate) fn index(self) -> i32 {
        match self {
            Step::C => 0,
            Step::D => 1,
            Step::E => 2,
            Step::F => 3,
            Step::G => 4,
            Step::A => 5,
            Step::B => 6,
        }
    }
}
