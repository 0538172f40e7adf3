//! Raster canvas on tiny-skia. Each region renders into its own pixmap and
//! is encoded as PNG; `on_render_finished` stitches the regions of the
//! session into one image.
//!
//! Font files are not loaded here, so text and symbols without a geometric
//! form are drawn as their metric boxes. Note heads and dots are ellipses.

use kurbo::{Affine, BezPath, PathEl};
use tiny_skia::{
    FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform,
};

use super::glyphs::MusicFontSymbol;
use super::state::CanvasState;
use super::{Canvas, RenderPayload};
use crate::error::{Error, Result};

pub struct RasterCanvas {
    state: CanvasState,
    pixmap: Option<Pixmap>,
    regions: Vec<Pixmap>,
}

impl Default for RasterCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterCanvas {
    pub fn new() -> Self {
        Self {
            state: CanvasState::new(),
            pixmap: None,
            regions: Vec::new(),
        }
    }

    fn paint(&self) -> Paint<'static> {
        let c = self.state.color;
        let mut paint = Paint::default();
        paint.set_color_rgba8(c.r, c.g, c.b, c.a);
        paint.anti_alias = true;
        paint
    }

    /// Current pixmap plus the paint and transform to draw with.
    fn target(&mut self, op: &str) -> Result<(&mut Pixmap, Paint<'static>, Transform)> {
        self.state.ensure_rendering(op)?;
        let paint = self.paint();
        let transform = to_skia(self.state.transform());
        let pixmap = self
            .pixmap
            .as_mut()
            .ok_or_else(|| Error::invalid_state(format!("{op} without a surface")))?;
        Ok((pixmap, paint, transform))
    }

    fn stroke_style(&self) -> Stroke {
        Stroke {
            width: self.state.line_width as f32,
            ..Stroke::default()
        }
    }

    fn fill_box(&mut self, op: &str, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        let (pixmap, paint, transform) = self.target(op)?;
        if let Some(rect) = Rect::from_xywh(x as f32, y as f32, w as f32, h as f32) {
            pixmap.fill_rect(rect, &paint, transform, None);
        }
        Ok(())
    }
}

fn to_skia(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => pb.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

fn encode(pixmap: &Pixmap) -> Result<RenderPayload> {
    let png = pixmap
        .encode_png()
        .map_err(|e| Error::render_failure("encode", e.to_string()))?;
    Ok(RenderPayload::Image {
        width: pixmap.width(),
        height: pixmap.height(),
        png,
    })
}

impl Canvas for RasterCanvas {
    fn state(&self) -> &CanvasState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CanvasState {
        &mut self.state
    }

    fn fill(&mut self) -> Result<()> {
        let path = to_skia_path(self.state.path("fill")?);
        let (pixmap, paint, transform) = self.target("fill")?;
        if let Some(path) = path {
            pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
        }
        Ok(())
    }

    fn stroke(&mut self) -> Result<()> {
        let path = to_skia_path(self.state.path("stroke")?);
        let stroke = self.stroke_style();
        let (pixmap, paint, transform) = self.target("stroke")?;
        if let Some(path) = path {
            pixmap.stroke_path(&path, &paint, &stroke, transform, None);
        }
        Ok(())
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        self.fill_box("fill_rect", x, y, w, h)
    }

    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        let stroke = self.stroke_style();
        let (pixmap, paint, transform) = self.target("stroke_rect")?;
        if let Some(rect) = Rect::from_xywh(x as f32, y as f32, w as f32, h as f32) {
            let path = PathBuilder::from_rect(rect);
            pixmap.stroke_path(&path, &paint, &stroke, transform, None);
        }
        Ok(())
    }

    fn fill_circle(&mut self, x: f64, y: f64, radius: f64) -> Result<()> {
        let (pixmap, paint, transform) = self.target("fill_circle")?;
        if let Some(path) = PathBuilder::from_circle(x as f32, y as f32, radius as f32) {
            pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
        }
        Ok(())
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<()> {
        let rect = self.state.text_box(text, x, y);
        // lower half of the em box, roughly the x-height band
        let band = rect.height() * 0.5;
        self.fill_box("fill_text", rect.x0, rect.y1 - band, rect.width(), band * 0.6)
    }

    fn fill_music_font_symbol(
        &mut self,
        x: f64,
        y: f64,
        scale: f64,
        symbol: MusicFontSymbol,
        center_at_position: bool,
    ) -> Result<()> {
        let glyph = symbol.glyph_box();
        let x = if center_at_position {
            x - glyph.advance(scale) / 2.0
        } else {
            x
        };
        let (left, top, w, h) = glyph.rect_at(x, y, scale);
        if !symbol.is_round() {
            return self.fill_box("fill_music_font_symbol", left, top, w, h);
        }

        let hollow = symbol.is_hollow();
        let stroke = Stroke {
            width: (h * 0.18).max(1.0) as f32,
            ..Stroke::default()
        };
        let (pixmap, paint, transform) = self.target("fill_music_font_symbol")?;
        let Some(oval) = Rect::from_xywh(left as f32, top as f32, w as f32, h as f32)
            .and_then(PathBuilder::from_oval)
        else {
            return Ok(());
        };
        if hollow {
            pixmap.stroke_path(&oval, &paint, &stroke, transform, None);
        } else {
            pixmap.fill_path(&oval, &paint, FillRule::Winding, transform, None);
        }
        Ok(())
    }

    fn begin_group(&mut self, identifier: &str) -> Result<()> {
        self.state.push_group(identifier)
    }

    fn end_group(&mut self) -> Result<()> {
        self.state.pop_group().map(|_| ())
    }

    fn begin_rotate(&mut self, cx: f64, cy: f64, angle: f64) -> Result<()> {
        self.state.push_rotation(cx, cy, angle)
    }

    fn end_rotate(&mut self) -> Result<()> {
        self.state.pop_rotation()
    }

    fn begin_render(&mut self, width: f64, height: f64) -> Result<()> {
        self.state.begin_render(width, height)?;
        let w = (width.ceil() as u32).max(1);
        let h = (height.ceil() as u32).max(1);
        self.pixmap = Pixmap::new(w, h);
        if self.pixmap.is_none() {
            return Err(Error::invalid_state(format!(
                "cannot allocate a {w}x{h} surface"
            )));
        }
        Ok(())
    }

    fn end_render(&mut self) -> Result<RenderPayload> {
        self.state.end_render()?;
        let pixmap = self
            .pixmap
            .take()
            .ok_or_else(|| Error::invalid_state("end_render without a surface"))?;
        let payload = encode(&pixmap)?;
        self.regions.push(pixmap);
        Ok(payload)
    }

    fn on_render_finished(&mut self) -> Result<Option<RenderPayload>> {
        let regions = std::mem::take(&mut self.regions);
        if self.state.is_rendering() {
            return Err(Error::invalid_state("on_render_finished while a render is open"));
        }
        if regions.is_empty() {
            return Ok(None);
        }

        let width = regions.iter().map(Pixmap::width).max().unwrap_or(1);
        let height: u32 = regions.iter().map(Pixmap::height).sum();
        let mut page = Pixmap::new(width, height)
            .ok_or_else(|| Error::invalid_state(format!("cannot allocate a {width}x{height} page")))?;
        let mut y = 0i32;
        for region in &regions {
            page.draw_pixmap(
                0,
                y,
                region.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
            y += region.height() as i32;
        }
        encode(&page).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Color;

    fn alpha_at(pixmap: &Pixmap, x: u32, y: u32) -> u8 {
        pixmap.pixel(x, y).map(|p| p.alpha()).unwrap_or(0)
    }

    #[test]
    fn fill_rect_marks_pixels() {
        let mut canvas = RasterCanvas::new();
        canvas.begin_render(20.0, 20.0).unwrap();
        canvas.set_color(Color::rgb(0, 0, 0));
        canvas.fill_rect(5.0, 5.0, 10.0, 10.0).unwrap();

        let pixmap = canvas.pixmap.as_ref().unwrap();
        assert_eq!(alpha_at(pixmap, 10, 10), 255);
        assert_eq!(alpha_at(pixmap, 1, 1), 0);

        match canvas.end_render().unwrap() {
            RenderPayload::Image { width, height, png } => {
                assert_eq!((width, height), (20, 20));
                assert_eq!(&png[1..4], b"PNG");
            }
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn rotation_moves_marks() {
        let mut canvas = RasterCanvas::new();
        canvas.begin_render(40.0, 40.0).unwrap();
        canvas.begin_rotate(20.0, 20.0, 90.0).unwrap();
        // horizontal bar right of center lands below center after 90 degrees
        canvas.fill_rect(24.0, 19.0, 10.0, 2.0).unwrap();
        canvas.end_rotate().unwrap();

        let pixmap = canvas.pixmap.as_ref().unwrap();
        assert!(alpha_at(pixmap, 20, 30) > 0);
        assert_eq!(alpha_at(pixmap, 30, 20), 0);
    }

    #[test]
    fn stroke_before_begin_path_is_invalid() {
        let mut canvas = RasterCanvas::new();
        canvas.begin_render(10.0, 10.0).unwrap();
        let err = canvas.stroke().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidState);
    }

    #[test]
    fn render_finished_stitches_regions() {
        let mut canvas = RasterCanvas::new();
        for h in [10.0, 15.0] {
            canvas.begin_render(30.0, h).unwrap();
            canvas
                .fill_music_font_symbol(10.0, 5.0, 1.0, MusicFontSymbol::NoteheadBlack, true)
                .unwrap();
            canvas.end_render().unwrap();
        }
        match canvas.on_render_finished().unwrap() {
            Some(RenderPayload::Image { width, height, .. }) => assert_eq!((width, height), (30, 25)),
            other => panic!("expected stitched image, got {other:?}"),
        }
        assert!(canvas.on_render_finished().unwrap().is_none());
    }
}
