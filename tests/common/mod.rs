//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use scorecanvas::{
    Bar, Beat, Clef, Duration, MasterBar, Note, RenderEvent, RenderResult, Score, ScoreRenderer,
    Step, Track,
};

pub fn fixture(name: &str) -> Arc<Score> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    Arc::new(serde_json::from_str(&text).expect("fixture is a valid score"))
}

/// Builds scores bar by bar; every track gets the same number of bars.
pub struct ScoreBuilder {
    score: Score,
}

impl ScoreBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            score: Score {
                title: Some(title.to_owned()),
                ..Score::default()
            },
        }
    }

    pub fn untitled() -> Self {
        Self {
            score: Score::default(),
        }
    }

    /// Append `count` 4/4 bars to the grid.
    pub fn bars(mut self, count: usize) -> Self {
        self.score
            .master_bars
            .extend(std::iter::repeat_with(MasterBar::default).take(count));
        self
    }

    pub fn line_break_at(mut self, bar: usize) -> Self {
        self.score.master_bars[bar].line_break = true;
        self
    }

    /// Track of quarter-note scales covering `bars` bars.
    pub fn track(mut self, name: &str, clef: Clef, bars: usize) -> Self {
        let octave = match clef {
            Clef::F4 => 3,
            _ => 4,
        };
        let steps = [Step::C, Step::D, Step::E, Step::F, Step::G, Step::A, Step::B];
        let bars = (0..bars)
            .map(|i| Bar {
                clef,
                beats: (0..4)
                    .map(|j| Beat {
                        duration: Duration::Quarter,
                        dots: 0,
                        notes: vec![Note::new(steps[(i + j) % 7], octave)],
                    })
                    .collect(),
            })
            .collect();
        self.score.tracks.push(Track {
            name: name.to_owned(),
            short_name: None,
            bars,
        });
        self
    }

    pub fn build(self) -> Arc<Score> {
        Arc::new(self.score)
    }
}

/// Collects renderer events for later inspection.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<RenderEvent>>>,
}

impl Recorder {
    pub fn attach(renderer: &mut ScoreRenderer) -> Self {
        let recorder = Self::default();
        let sink = Arc::clone(&recorder.events);
        renderer.add_listener(move |event| sink.lock().unwrap().push(event.clone()));
        recorder
    }

    pub fn take(&self) -> Vec<RenderEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(RenderEvent::name).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

/// The results carried by `partialRenderFinished` and `renderFinished`.
pub fn results(events: &[RenderEvent]) -> Vec<RenderResult> {
    events
        .iter()
        .filter_map(|event| match event {
            RenderEvent::PartialRenderFinished { result } | RenderEvent::RenderFinished { result } => {
                Some(result.clone())
            }
            _ => None,
        })
        .collect()
}
