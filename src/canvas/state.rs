use kurbo::{Affine, BezPath, Point, Rect};

use super::{Color, Font, TextAlign, TextBaseline};
use crate::error::{Error, Result};

/// Drawing state shared by all backends: current style, the path under
/// construction, open groups and the rotation stack.
#[derive(Debug, Clone)]
pub struct CanvasState {
    pub(crate) color: Color,
    pub(crate) line_width: f64,
    pub(crate) font: Font,
    pub(crate) text_align: TextAlign,
    pub(crate) text_baseline: TextBaseline,
    size: Option<(f64, f64)>,
    path: Option<BezPath>,
    groups: Vec<String>,
    saved_transforms: Vec<Affine>,
    transform: Affine,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasState {
    pub fn new() -> Self {
        Self {
            color: Color::BLACK,
            line_width: 1.0,
            font: Font::default(),
            text_align: TextAlign::Left,
            text_baseline: TextBaseline::Top,
            size: None,
            path: None,
            groups: Vec::new(),
            saved_transforms: Vec::new(),
            transform: Affine::IDENTITY,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start a surface. Style survives; path, groups and transforms reset.
    pub fn begin_render(&mut self, width: f64, height: f64) -> Result<()> {
        if !(width.is_finite() && height.is_finite()) || width < 0.0 || height < 0.0 {
            return Err(Error::invalid_state(format!(
                "begin_render with invalid size {width}x{height}"
            )));
        }
        self.size = Some((width, height));
        self.path = None;
        self.groups.clear();
        self.saved_transforms.clear();
        self.transform = Affine::IDENTITY;
        Ok(())
    }

    /// Close the surface and return its size.
    pub fn end_render(&mut self) -> Result<(f64, f64)> {
        let size = self
            .size
            .ok_or_else(|| Error::invalid_state("end_render without begin_render"))?;
        if let Some(open) = self.groups.last() {
            return Err(Error::invalid_state(format!(
                "end_render with {} unmatched group(s), innermost '{open}'",
                self.groups.len()
            )));
        }
        if !self.saved_transforms.is_empty() {
            return Err(Error::invalid_state(format!(
                "end_render with {} unmatched rotate scope(s)",
                self.saved_transforms.len()
            )));
        }
        self.size = None;
        self.path = None;
        Ok(size)
    }

    pub fn is_rendering(&self) -> bool {
        self.size.is_some()
    }

    pub fn size(&self) -> Option<(f64, f64)> {
        self.size
    }

    pub fn ensure_rendering(&self, op: &str) -> Result<()> {
        if self.is_rendering() {
            Ok(())
        } else {
            Err(Error::invalid_state(format!("{op} outside begin_render/end_render")))
        }
    }

    // ── Paths ────────────────────────────────────────────────────────

    pub fn begin_path(&mut self) -> Result<()> {
        self.ensure_rendering("begin_path")?;
        self.path = Some(BezPath::new());
        Ok(())
    }

    pub fn path_mut(&mut self, op: &str) -> Result<&mut BezPath> {
        self.ensure_rendering(op)?;
        self.path
            .as_mut()
            .ok_or_else(|| Error::invalid_state(format!("{op} before begin_path")))
    }

    pub fn path(&self, op: &str) -> Result<&BezPath> {
        self.ensure_rendering(op)?;
        self.path
            .as_ref()
            .ok_or_else(|| Error::invalid_state(format!("{op} before begin_path")))
    }

    // ── Groups ───────────────────────────────────────────────────────

    pub fn push_group(&mut self, identifier: &str) -> Result<()> {
        self.ensure_rendering("begin_group")?;
        self.groups.push(identifier.to_owned());
        Ok(())
    }

    pub fn pop_group(&mut self) -> Result<String> {
        self.ensure_rendering("end_group")?;
        self.groups
            .pop()
            .ok_or_else(|| Error::invalid_state("end_group without matching begin_group"))
    }

    pub fn group_depth(&self) -> usize {
        self.groups.len()
    }

    // ── Transforms ───────────────────────────────────────────────────

    pub fn push_rotation(&mut self, cx: f64, cy: f64, angle: f64) -> Result<()> {
        self.ensure_rendering("begin_rotate")?;
        self.saved_transforms.push(self.transform);
        self.transform =
            self.transform * Affine::rotate_about(angle.to_radians(), Point::new(cx, cy));
        Ok(())
    }

    pub fn pop_rotation(&mut self) -> Result<()> {
        self.ensure_rendering("end_rotate")?;
        self.transform = self
            .saved_transforms
            .pop()
            .ok_or_else(|| Error::invalid_state("end_rotate without matching begin_rotate"))?;
        Ok(())
    }

    pub fn transform(&self) -> Affine {
        self.transform
    }

    // ── Text ─────────────────────────────────────────────────────────

    /// Box covered by `text` drawn at `(x, y)` under the current alignment
    /// and baseline. Height is the font size.
    pub fn text_box(&self, text: &str, x: f64, y: f64) -> Rect {
        let width = super::estimate_text_width(&self.font, text);
        let height = self.font.size;
        let left = match self.text_align {
            TextAlign::Left => x,
            TextAlign::Center => x - width / 2.0,
            TextAlign::Right => x - width,
        };
        let top = match self.text_baseline {
            TextBaseline::Top => y,
            TextBaseline::Middle => y - height / 2.0,
            TextBaseline::Bottom => y - height,
        };
        Rect::new(left, top, left + width, top + height)
    }
}
