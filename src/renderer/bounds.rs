//! Hit-testing data exported after each render pass.
//!
//! Rectangles are collected per region while drawing and frozen into a
//! [`BoundsLookup`] once the pass completes; the lookup is never mutated
//! after it has been handed out.

use std::collections::HashMap;
use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in page coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.w && y >= self.y && y <= self.y + self.h
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }
}

/// Stable identifier of a drawn element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementId {
    System { system: usize },
    Staff { system: usize, track: usize },
    Bar { track: usize, bar: usize },
    Beat { track: usize, bar: usize, beat: usize },
    Note { track: usize, bar: usize, beat: usize, note: usize },
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ElementId::System { system } => write!(f, "system:{system}"),
            ElementId::Staff { system, track } => write!(f, "staff:{system}:{track}"),
            ElementId::Bar { track, bar } => write!(f, "bar:{track}:{bar}"),
            ElementId::Beat { track, bar, beat } => write!(f, "beat:{track}:{bar}:{beat}"),
            ElementId::Note { track, bar, beat, note } => {
                write!(f, "note:{track}:{bar}:{beat}:{note}")
            }
        }
    }
}

/// Immutable map from element id to rectangle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundsLookup {
    entries: Vec<(ElementId, Bounds)>,
    index: HashMap<ElementId, usize>,
}

impl BoundsLookup {
    pub fn get(&self, id: &ElementId) -> Option<Bounds> {
        self.index.get(id).map(|&i| self.entries[i].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in the order they were drawn.
    pub fn iter(&self) -> impl Iterator<Item = &(ElementId, Bounds)> {
        self.entries.iter()
    }

    /// Number of systems (regions) recorded.
    pub fn system_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(id, _)| matches!(id, ElementId::System { .. }))
            .count()
    }

    /// Bar under the point, as `(track, bar)`.
    pub fn find_bar(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        self.entries.iter().find_map(|(id, b)| match *id {
            ElementId::Bar { track, bar } if b.contains(x, y) => Some((track, bar)),
            _ => None,
        })
    }

    /// Beat under the point, as `(track, bar, beat)`.
    pub fn find_beat(&self, x: f64, y: f64) -> Option<(usize, usize, usize)> {
        self.entries.iter().find_map(|(id, b)| match *id {
            ElementId::Beat { track, bar, beat } if b.contains(x, y) => Some((track, bar, beat)),
            _ => None,
        })
    }
}

/// Serialized as an object keyed by the element id string.
impl Serialize for BoundsLookup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, bounds) in &self.entries {
            map.serialize_entry(&id.to_string(), bounds)?;
        }
        map.end()
    }
}

/// Accumulates rectangles during a pass.
#[derive(Default)]
pub(crate) struct BoundsLookupBuilder {
    entries: Vec<(ElementId, Bounds)>,
    index: HashMap<ElementId, usize>,
}

impl BoundsLookupBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add one region's rectangles. An id recorded twice keeps its first
    /// rectangle.
    pub(crate) fn add_batch(&mut self, batch: Vec<(ElementId, Bounds)>) {
        for (id, bounds) in batch {
            if self.index.contains_key(&id) {
                tracing::debug!(%id, "duplicate bounds entry ignored");
                continue;
            }
            self.index.insert(id, self.entries.len());
            self.entries.push((id, bounds));
        }
    }

    pub(crate) fn finish(self) -> BoundsLookup {
        BoundsLookup {
            entries: self.entries,
            index: self.index,
        }
    }
}
