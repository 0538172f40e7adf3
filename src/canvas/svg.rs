//! SVG canvas — accumulates SVG elements per region and produces the final
//! documents.

use super::glyphs::{MusicFontSymbol, MUSIC_FONT_FAMILY, MUSIC_FONT_SIZE};
use super::state::CanvasState;
use super::{Canvas, FontStyle, RenderPayload, TextAlign, TextBaseline};
use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════
// SvgCanvas
// ═══════════════════════════════════════════════════════════════════════

/// A finished region kept for the combined document.
struct SvgRegion {
    width: f64,
    height: f64,
    body: String,
}

pub struct SvgCanvas {
    state: CanvasState,
    elements: Vec<String>,
    regions: Vec<SvgRegion>,
}

impl Default for SvgCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl SvgCanvas {
    pub fn new() -> Self {
        Self {
            state: CanvasState::new(),
            elements: Vec::new(),
            regions: Vec::new(),
        }
    }

    fn push(&mut self, op: &str, element: String) -> Result<()> {
        self.state.ensure_rendering(op)?;
        self.elements.push(element);
        Ok(())
    }

    fn body(&self) -> String {
        let mut body = String::new();
        for el in &self.elements {
            body.push_str("  ");
            body.push_str(el);
            body.push('\n');
        }
        body
    }
}

fn document(width: f64, height: f64, body: &str) -> String {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {:.1} {:.1}" width="{:.1}" height="{:.1}">"#,
        width, height, width, height
    );
    svg.push('\n');
    svg.push_str(body);
    svg.push_str("</svg>\n");
    svg
}

fn escape(content: &str) -> String {
    content
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl Canvas for SvgCanvas {
    fn state(&self) -> &CanvasState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CanvasState {
        &mut self.state
    }

    fn fill(&mut self) -> Result<()> {
        let d = self.state.path("fill")?.to_svg();
        let el = format!(
            r#"<path d="{}" fill="{}" stroke="none"/>"#,
            d,
            self.state.color.to_css()
        );
        self.push("fill", el)
    }

    fn stroke(&mut self) -> Result<()> {
        let d = self.state.path("stroke")?.to_svg();
        let el = format!(
            r#"<path d="{}" fill="none" stroke="{}" stroke-width="{:.2}" stroke-linecap="round"/>"#,
            d,
            self.state.color.to_css(),
            self.state.line_width
        );
        self.push("stroke", el)
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        let el = format!(
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
            x,
            y,
            w,
            h,
            self.state.color.to_css()
        );
        self.push("fill_rect", el)
    }

    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<()> {
        let el = format!(
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="none" stroke="{}" stroke-width="{:.2}"/>"#,
            x,
            y,
            w,
            h,
            self.state.color.to_css(),
            self.state.line_width
        );
        self.push("stroke_rect", el)
    }

    fn fill_circle(&mut self, x: f64, y: f64, radius: f64) -> Result<()> {
        let el = format!(
            r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}"/>"#,
            x,
            y,
            radius,
            self.state.color.to_css()
        );
        self.push("fill_circle", el)
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<()> {
        let anchor = match self.state.text_align {
            TextAlign::Left => "start",
            TextAlign::Center => "middle",
            TextAlign::Right => "end",
        };
        let baseline = match self.state.text_baseline {
            TextBaseline::Top => "hanging",
            TextBaseline::Middle => "central",
            TextBaseline::Bottom => "alphabetic",
        };
        let font = &self.state.font;
        let style = match font.style {
            FontStyle::Plain => "",
            FontStyle::Bold => r#" font-weight="bold""#,
            FontStyle::Italic => r#" font-style="italic""#,
        };
        let el = format!(
            r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.1}"{} fill="{}" text-anchor="{}" dominant-baseline="{}">{}</text>"#,
            x,
            y,
            escape(&font.family),
            font.size,
            style,
            self.state.color.to_css(),
            anchor,
            baseline,
            escape(text)
        );
        self.push("fill_text", el)
    }

    fn fill_music_font_symbol(
        &mut self,
        x: f64,
        y: f64,
        scale: f64,
        symbol: MusicFontSymbol,
        center_at_position: bool,
    ) -> Result<()> {
        let x = if center_at_position {
            x - symbol.glyph_box().advance(scale) / 2.0
        } else {
            x
        };
        let el = format!(
            r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.1}" fill="{}">&#x{:X};</text>"#,
            x,
            y,
            MUSIC_FONT_FAMILY,
            MUSIC_FONT_SIZE * scale,
            self.state.color.to_css(),
            symbol.codepoint()
        );
        self.push("fill_music_font_symbol", el)
    }

    fn begin_group(&mut self, identifier: &str) -> Result<()> {
        self.state.push_group(identifier)?;
        self.elements.push(format!(r#"<g class="{}">"#, escape(identifier)));
        Ok(())
    }

    fn end_group(&mut self) -> Result<()> {
        self.state.pop_group()?;
        self.elements.push("</g>".to_owned());
        Ok(())
    }

    fn begin_rotate(&mut self, cx: f64, cy: f64, angle: f64) -> Result<()> {
        self.state.push_rotation(cx, cy, angle)?;
        self.elements.push(format!(
            r#"<g transform="rotate({:.2},{:.2},{:.2})">"#,
            angle, cx, cy
        ));
        Ok(())
    }

    fn end_rotate(&mut self) -> Result<()> {
        self.state.pop_rotation()?;
        self.elements.push("</g>".to_owned());
        Ok(())
    }

    fn begin_render(&mut self, width: f64, height: f64) -> Result<()> {
        self.state.begin_render(width, height)?;
        self.elements.clear();
        Ok(())
    }

    fn end_render(&mut self) -> Result<RenderPayload> {
        let (width, height) = self.state.end_render()?;
        let body = self.body();
        self.elements.clear();
        let markup = document(width, height, &body);
        self.regions.push(SvgRegion { width, height, body });
        Ok(RenderPayload::Svg { markup })
    }

    fn on_render_finished(&mut self) -> Result<Option<RenderPayload>> {
        let regions = std::mem::take(&mut self.regions);
        if self.state.is_rendering() {
            return Err(Error::invalid_state("on_render_finished while a render is open"));
        }
        if regions.is_empty() {
            return Ok(None);
        }

        let width = regions.iter().map(|r| r.width).fold(0.0, f64::max);
        let height: f64 = regions.iter().map(|r| r.height).sum();
        let mut body = String::new();
        let mut y = 0.0;
        for region in regions {
            body.push_str(&format!("  <g transform=\"translate(0,{:.2})\">\n", y));
            body.push_str(&region.body);
            body.push_str("  </g>\n");
            y += region.height;
        }
        Ok(Some(RenderPayload::Svg {
            markup: document(width, height, &body),
        }))
    }
}
