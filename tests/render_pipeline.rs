//! Render pass tests: event order, regions, bounds, reflow, settings.

mod common;

use std::sync::Arc;

use common::{fixture, results, Recorder, ScoreBuilder};
use pretty_assertions::assert_eq;
use scorecanvas::{
    Clef, ElementId, Engine, ErrorKind, LayoutMode, RenderEvent, RenderPayload, RenderState,
    ScoreRenderer, Settings,
};

fn lookup_of(events: &[RenderEvent]) -> Arc<scorecanvas::BoundsLookup> {
    events
        .iter()
        .find_map(|event| match event {
            RenderEvent::PostRenderFinished { bounds_lookup } => Some(Arc::clone(bounds_lookup)),
            _ => None,
        })
        .expect("pass finished with a bounds lookup")
}

#[test]
fn two_system_score_renders_one_region_per_system() {
    let mut renderer = ScoreRenderer::new(Settings::default());
    let recorder = Recorder::attach(&mut renderer);
    renderer.render(fixture("two_systems.json"), &[0]);

    assert_eq!(
        recorder.names(),
        vec![
            "preRender",
            "partialRenderFinished",
            "partialRenderFinished",
            "renderFinished",
            "postRenderFinished"
        ]
    );

    let events = recorder.take();
    let lookup = lookup_of(&events);
    for bar in 0..8 {
        assert!(
            lookup.get(&ElementId::Bar { track: 0, bar }).is_some(),
            "missing bounds for bar {bar}"
        );
        assert!(lookup.get(&ElementId::Bar { track: 1, bar }).is_none());
    }
    assert_eq!(lookup.system_count(), 2);
    assert!(lookup.get(&ElementId::Staff { system: 1, track: 0 }).is_some());
    assert!(lookup.get(&ElementId::Staff { system: 0, track: 1 }).is_none());

    // bars of the second system sit below the first system
    let first = lookup.get(&ElementId::Bar { track: 0, bar: 3 }).unwrap();
    let second = lookup.get(&ElementId::Bar { track: 0, bar: 4 }).unwrap();
    assert!(second.y > first.bottom());
    assert_eq!(lookup.find_bar(second.x + 1.0, second.y + 1.0), Some((0, 4)));
}

#[test]
fn regions_tile_the_page() {
    let mut renderer = ScoreRenderer::new(Settings::default());
    let recorder = Recorder::attach(&mut renderer);
    renderer.render(fixture("two_systems.json"), &[0, 1]);

    let results = results(&recorder.take());
    assert_eq!(results.len(), 3);
    let (partials, finished) = results.split_at(2);
    assert_eq!(partials[0].region, Some(0));
    assert_eq!(partials[1].region, Some(1));
    assert_eq!(partials[1].bounds.y, partials[0].bounds.bottom());
    assert_eq!(finished[0].region, None);
    assert_eq!(finished[0].bounds.h, partials[1].bounds.bottom());

    match &finished[0].payload {
        Some(RenderPayload::Svg { markup }) => {
            assert!(markup.contains("Two Part Invention"));
            assert!(markup.contains("class=\"track-1-system-1\""));
        }
        other => panic!("expected combined svg, got {other:?}"),
    }
}

#[test]
fn note_bounds_follow_settings() {
    let mut settings = Settings::default();
    let score = fixture("two_systems.json");

    let mut renderer = ScoreRenderer::new(settings.clone());
    renderer.render(Arc::clone(&score), &[1]);
    let note = ElementId::Note { track: 1, bar: 0, beat: 0, note: 0 };
    assert!(renderer.bounds_lookup().unwrap().get(&note).is_none());

    settings.core.include_note_bounds = true;
    renderer.update_settings(settings);
    renderer.render(score, &[1]);
    let lookup = renderer.bounds_lookup().unwrap();
    let head = lookup.get(&note).unwrap();
    let beat = lookup.get(&ElementId::Beat { track: 1, bar: 0, beat: 0 }).unwrap();
    assert!(beat.contains(head.x + head.w / 2.0, beat.y + 1.0));
}

#[test]
fn repeated_resize_is_idempotent() {
    let score = ScoreBuilder::new("Etude").bars(12).track("Piano", Clef::G2, 12).build();
    let mut renderer = ScoreRenderer::new(Settings::default());
    let recorder = Recorder::attach(&mut renderer);
    renderer.render(score.clone(), &[]);
    recorder.clear();

    renderer.resize(480.0);
    let first = recorder.take();
    assert_eq!(first.first().map(RenderEvent::name), Some("preRender"));
    let lookup = renderer.bounds_lookup().unwrap();

    renderer.resize(480.0);
    assert!(recorder.take().is_empty());
    assert!(Arc::ptr_eq(&lookup, &renderer.bounds_lookup().unwrap()));

    // a reflow matches a fresh render at that width
    let mut settings = Settings::default();
    settings.display.width = 480.0;
    let mut fresh = ScoreRenderer::new(settings);
    let fresh_recorder = Recorder::attach(&mut fresh);
    fresh.render(score, &[]);
    let fresh_events = fresh_recorder.take();
    assert_eq!(*lookup_of(&fresh_events), *lookup);
    assert_eq!(results(&fresh_events), results(&first));
}

#[test]
fn narrower_width_produces_more_regions() {
    let score = ScoreBuilder::new("Etude").bars(12).track("Piano", Clef::G2, 12).build();
    let mut renderer = ScoreRenderer::new(Settings::default());
    renderer.render(score, &[]);
    let wide = renderer.bounds_lookup().unwrap().system_count();

    renderer.resize(420.0);
    let narrow = renderer.bounds_lookup().unwrap().system_count();
    assert!(narrow > wide, "{narrow} systems at 420 vs {wide} at 820");
}

#[test]
fn invalidate_then_render_matches_fresh_renderer() {
    let score = fixture("two_systems.json");

    let mut used = ScoreRenderer::new(Settings::default());
    let used_recorder = Recorder::attach(&mut used);
    used.render(Arc::clone(&score), &[0, 1]);
    used.invalidate();
    assert!(used_recorder.take().len() == 5);
    used.render(Arc::clone(&score), &[0, 1]);

    let mut fresh = ScoreRenderer::new(Settings::default());
    let fresh_recorder = Recorder::attach(&mut fresh);
    fresh.render(score, &[0, 1]);

    let used_events = used_recorder.take();
    let fresh_events = fresh_recorder.take();
    assert_eq!(results(&used_events), results(&fresh_events));
    assert_eq!(*lookup_of(&used_events), *lookup_of(&fresh_events));
}

#[test]
fn invalidate_emits_nothing() {
    let mut renderer = ScoreRenderer::new(Settings::default());
    let recorder = Recorder::attach(&mut renderer);
    renderer.invalidate();
    renderer.render(fixture("two_systems.json"), &[]);
    renderer.invalidate();
    assert_eq!(recorder.names().len(), 5);
    assert!(!renderer.has_cached_layout());
    assert_eq!(renderer.state(), RenderState::Idle);
}

#[test]
fn horizontal_layout_ignores_resize() {
    let mut settings = Settings::default();
    settings.display.layout_mode = LayoutMode::Horizontal;
    let mut renderer = ScoreRenderer::new(settings);
    let recorder = Recorder::attach(&mut renderer);
    renderer.render(fixture("two_systems.json"), &[0]);

    let events = recorder.take();
    assert_eq!(results(&events).len(), 2);
    assert_eq!(lookup_of(&events).system_count(), 1);

    renderer.resize(300.0);
    assert!(recorder.take().is_empty());
    assert_eq!(renderer.width(), 300.0);
}

#[test]
fn out_of_range_tracks_are_dropped() {
    let mut renderer = ScoreRenderer::new(Settings::default());
    let recorder = Recorder::attach(&mut renderer);
    renderer.render(fixture("two_systems.json"), &[1, 7, 1]);

    assert_eq!(recorder.names().last(), Some(&"postRenderFinished"));
    let lookup = renderer.bounds_lookup().unwrap();
    assert!(lookup.get(&ElementId::Bar { track: 1, bar: 0 }).is_some());
    assert!(lookup.get(&ElementId::Bar { track: 0, bar: 0 }).is_none());
}

#[test]
fn empty_score_fails_in_layout() {
    let mut renderer = ScoreRenderer::new(Settings::default());
    let recorder = Recorder::attach(&mut renderer);
    renderer.render(ScoreBuilder::untitled().bars(2).build(), &[]);

    let events = recorder.take();
    assert_eq!(events.len(), 2);
    match &events[1] {
        RenderEvent::Error { stage, error } => {
            assert_eq!(stage, "layout");
            assert_eq!(error.kind, ErrorKind::RenderFailure);
            assert!(error.stack.as_deref().unwrap_or_default().contains("no renderable track"));
        }
        other => panic!("expected error, got {other:?}"),
    }
}

#[test]
fn raster_engine_produces_png_regions() {
    let mut settings = Settings::default();
    settings.core.engine = Engine::Raster;
    let mut renderer = ScoreRenderer::new(settings);
    let recorder = Recorder::attach(&mut renderer);
    renderer.render(fixture("two_systems.json"), &[0]);

    let results = results(&recorder.take());
    for result in &results {
        match &result.payload {
            Some(RenderPayload::Image { width, height, png }) => {
                assert_eq!(*width as f64, result.bounds.w.ceil());
                assert_eq!(*height as f64, result.bounds.h.ceil());
                assert_eq!(&png[1..4], b"PNG");
            }
            other => panic!("expected png, got {other:?}"),
        }
    }
}

#[test]
fn switching_engine_recreates_the_backend() {
    let score = fixture("two_systems.json");
    let mut renderer = ScoreRenderer::new(Settings::default());
    let recorder = Recorder::attach(&mut renderer);
    renderer.render(Arc::clone(&score), &[0]);
    recorder.clear();

    let mut settings = renderer.settings().clone();
    settings.core.engine = Engine::Raster;
    renderer.update_settings(settings);
    assert!(!renderer.has_cached_layout());
    renderer.render(score, &[0]);

    let results = results(&recorder.take());
    assert!(matches!(results[0].payload, Some(RenderPayload::Image { .. })));
}

#[test]
fn vertical_track_names_are_rotated() {
    let mut settings = Settings::default();
    settings.display.show_track_names = true;
    settings.display.track_name_orientation = scorecanvas::settings::TrackNameOrientation::Vertical;
    let mut renderer = ScoreRenderer::new(settings);
    let recorder = Recorder::attach(&mut renderer);
    renderer.render(fixture("two_systems.json"), &[0, 1]);

    let results = results(&recorder.take());
    let Some(RenderPayload::Svg { markup }) = &results[0].payload else {
        panic!("expected svg");
    };
    assert_eq!(markup.matches("rotate(-90.00").count(), 2);
    assert!(markup.contains(">R.H.</text>"));
}
