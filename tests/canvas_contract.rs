//! Drawing-surface rules every backend must follow.

use kurbo::Affine;
use pretty_assertions::assert_eq;
use scorecanvas::canvas::{MusicFontSymbol, TextAlign};
use scorecanvas::{create_canvas, Canvas, Engine, ErrorKind, Font, RenderPayload};

const ENGINES: [Engine; 2] = [Engine::Svg, Engine::Raster];

fn backends() -> impl Iterator<Item = (Engine, Box<dyn Canvas>)> {
    ENGINES.into_iter().map(|engine| (engine, create_canvas(engine)))
}

#[test]
fn text_without_a_font_uses_the_default() {
    for (engine, mut canvas) in backends() {
        canvas.begin_render(120.0, 40.0).unwrap();
        assert_eq!(canvas.font(), &Font::default(), "{engine:?}");
        canvas.fill_text("Allegro", 10.0, 10.0).unwrap();
        assert_eq!(canvas.measure_text("Allegro"), 7.0 * 12.0 * 0.6);
        canvas.end_render().unwrap();
    }
}

#[test]
fn nested_rotations_restore_the_exact_transform() {
    for (engine, mut canvas) in backends() {
        canvas.begin_render(200.0, 200.0).unwrap();
        let mut seen = vec![canvas.transform()];
        for (i, angle) in [33.0, -90.0, 12.5, 180.0].into_iter().enumerate() {
            canvas.begin_rotate(10.0 * i as f64, 50.0, angle).unwrap();
            canvas.fill_rect(0.0, 0.0, 5.0, 5.0).unwrap();
            seen.push(canvas.transform());
        }
        seen.pop();
        while let Some(expected) = seen.pop() {
            canvas.end_rotate().unwrap();
            assert_eq!(canvas.transform(), expected, "{engine:?}");
        }
        assert_eq!(canvas.transform(), Affine::IDENTITY);
        canvas.end_render().unwrap();
    }
}

#[test]
fn open_scopes_fail_end_render() {
    for (engine, mut canvas) in backends() {
        canvas.begin_render(50.0, 50.0).unwrap();
        canvas.begin_group("bar-0-0").unwrap();
        let err = canvas.end_render().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState, "{engine:?}");
        assert!(err.to_string().contains("bar-0-0"));

        canvas.begin_render(50.0, 50.0).unwrap();
        canvas.begin_rotate(25.0, 25.0, 45.0).unwrap();
        assert_eq!(canvas.end_render().unwrap_err().kind(), ErrorKind::InvalidState);

        canvas.begin_render(50.0, 50.0).unwrap();
        assert_eq!(canvas.end_group().unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(canvas.end_rotate().unwrap_err().kind(), ErrorKind::InvalidState);
    }
}

#[test]
fn path_ops_need_begin_path() {
    for (engine, mut canvas) in backends() {
        canvas.begin_render(50.0, 50.0).unwrap();
        let err = canvas.line_to(5.0, 5.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState, "{engine:?}");
        assert_eq!(canvas.fill().unwrap_err().kind(), ErrorKind::InvalidState);

        canvas.begin_path().unwrap();
        canvas.move_to(0.0, 0.0).unwrap();
        canvas.line_to(5.0, 5.0).unwrap();
        canvas.stroke().unwrap();
        canvas.end_render().unwrap();
    }
}

#[test]
fn drawing_outside_a_render_fails() {
    for (engine, mut canvas) in backends() {
        let err = canvas.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState, "{engine:?}");
        assert!(canvas
            .fill_music_font_symbol(0.0, 0.0, 1.0, MusicFontSymbol::GClef, false)
            .is_err());
        assert_eq!(canvas.end_render().unwrap_err().kind(), ErrorKind::InvalidState);
    }
}

#[test]
fn style_survives_between_regions() {
    for (engine, mut canvas) in backends() {
        canvas.set_text_align(TextAlign::Right);
        canvas.set_line_width(3.0);
        canvas.begin_render(10.0, 10.0).unwrap();
        canvas.end_render().unwrap();
        canvas.begin_render(10.0, 10.0).unwrap();
        assert_eq!(canvas.text_align(), TextAlign::Right, "{engine:?}");
        assert_eq!(canvas.line_width(), 3.0);
        canvas.end_render().unwrap();
    }
}

#[test]
fn session_finish_combines_regions_once() {
    for (engine, mut canvas) in backends() {
        for height in [30.0, 50.0] {
            canvas.begin_render(80.0, height).unwrap();
            canvas
                .fill_music_font_symbols(40.0, 20.0, 1.0, &[MusicFontSymbol::TimeSig3, MusicFontSymbol::TimeSig4], true)
                .unwrap();
            canvas.end_render().unwrap();
        }
        match canvas.on_render_finished().unwrap() {
            Some(RenderPayload::Svg { markup }) => {
                assert_eq!(engine, Engine::Svg);
                assert!(markup.contains("viewBox=\"0 0 80.0 80.0\""));
            }
            Some(RenderPayload::Image { width, height, .. }) => {
                assert_eq!(engine, Engine::Raster);
                assert_eq!((width, height), (80, 80));
            }
            None => panic!("{engine:?} returned nothing"),
        }
        assert!(canvas.on_render_finished().unwrap().is_none());
    }
}
