//! Render settings.
//!
//! Every struct here deserializes with `#[serde(default)]`, so a partial JSON
//! object coming over the bridge is merged onto the defaults.

use serde::{Deserialize, Serialize};

use crate::canvas::Color;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub core: CoreSettings,
    pub display: DisplaySettings,
    pub colors: ColorScheme,
}

impl Settings {
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        Ok(Self::deserialize(value)?)
    }

    /// Apply a partial JSON object on top of these settings. Objects merge
    /// key by key; any other value replaces the current one.
    pub fn merged(&self, patch: &serde_json::Value) -> Result<Self> {
        let mut value = serde_json::to_value(self)?;
        merge_json(&mut value, patch);
        Self::from_json(&value)
    }

    /// Whether replacing `self` with `other` changes what gets drawn.
    ///
    /// Only `core.include_note_bounds` is non-visual: it changes what the
    /// bounds lookup records, never the layout.
    pub fn is_visual_change(&self, other: &Settings) -> bool {
        self.core.engine != other.core.engine
            || self.display != other.display
            || self.colors != other.colors
    }
}

fn merge_json(base: &mut serde_json::Value, patch: &serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                merge_json(base.entry(key.clone()).or_insert(serde_json::Value::Null), value);
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreSettings {
    /// Canvas backend used by the renderer.
    pub engine: Engine,
    /// Record a rectangle per note head in the bounds lookup.
    pub include_note_bounds: bool,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            engine: Engine::Svg,
            include_note_bounds: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Svg,
    Raster,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplaySettings {
    pub scale: f64,
    pub layout_mode: LayoutMode,
    /// Initial logical width of the output, before any resize.
    pub width: f64,
    /// Upper bound on bars per system; `None` fits as many as the width allows.
    pub bars_per_row: Option<usize>,
    /// First bar to render, 1-based.
    pub start_bar: usize,
    /// Number of bars to render; `None` renders to the end.
    pub bar_count: Option<usize>,
    pub show_title: bool,
    pub show_track_names: bool,
    pub track_name_orientation: TrackNameOrientation,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            scale: 1.0,
            layout_mode: LayoutMode::Page,
            width: 820.0,
            bars_per_row: None,
            start_bar: 1,
            bar_count: None,
            show_title: true,
            show_track_names: false,
            track_name_orientation: TrackNameOrientation::Horizontal,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Bars wrap into systems that fill the width; resizing reflows.
    #[default]
    Page,
    /// All bars on one system; the width has no effect on layout.
    Horizontal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackNameOrientation {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColorScheme {
    pub staff_line: Color,
    pub bar_separator: Color,
    pub main_glyph: Color,
    pub bar_number: Color,
    pub score_info: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            staff_line: Color::rgb(0x55, 0x55, 0x55),
            bar_separator: Color::rgb(0x33, 0x33, 0x33),
            main_glyph: Color::rgb(0x1a, 0x1a, 0x1a),
            bar_number: Color::rgb(0xc8, 0x00, 0x00),
            score_info: Color::rgb(0x1a, 0x1a, 0x1a),
        }
    }
}
