//! Renderer boundary
//!
//! Views never talk to a graphics API. They produce [`Painter`]s, and a
//! painter draws onto whatever [`Canvas`] the window backend hands it. The
//! canvas is a small immediate-mode surface: a transform stack, a clip stack
//! and a handful of primitives.
//!
//! [`RecordingCanvas`] records every call as a [`DrawCommand`]. Headless
//! windows use it as their surface and tests use it to assert on output.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::geometry::{Affine2D, Color, Point, Rect, Size};

/// Errors raised while drawing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The surface cannot take draw calls (no context, lost device, ...)
    #[error("render backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A transform could not be applied
    #[error("invalid transform: {0}")]
    InvalidTransform(String),
}

/// Drawing surface
pub trait Canvas {
    /// Fail early if the backend cannot draw right now
    fn check(&self) -> Result<(), RenderError> {
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State
    // ─────────────────────────────────────────────────────────────────────────

    /// Push a transform, composed after the current one
    fn push_transform(&mut self, transform: Affine2D);

    fn pop_transform(&mut self);

    /// Combined transform of the whole stack
    fn current_transform(&self) -> Affine2D;

    /// Restrict drawing to `rect` (in current coordinates)
    fn push_clip(&mut self, rect: Rect);

    fn pop_clip(&mut self);

    // ─────────────────────────────────────────────────────────────────────────
    // Primitives
    // ─────────────────────────────────────────────────────────────────────────

    /// Fill the whole surface
    fn clear(&mut self, color: Color);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f64);

    /// Draw a line of text with its top-left corner at `origin`
    fn draw_text(&mut self, text: &str, origin: Point, font_size: f64, color: Color);
}

/// Something that can draw itself
///
/// Painters are immutable snapshots: a view that changes produces a new
/// painter rather than mutating the one it handed out.
pub trait Painter {
    /// Area covered when drawn
    fn bounds(&self) -> Rect;

    /// Draw the part of the painter inside `roi` at `resolution` pixels per
    /// unit
    fn draw(&self, canvas: &mut dyn Canvas, roi: &Rect, resolution: Point) -> Result<(), RenderError>;
}

/// Shared painter handle, the value carried between views
pub type PainterRef = Rc<dyn Painter>;

impl fmt::Debug for dyn Painter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Painter")
            .field("bounds", &self.bounds())
            .finish_non_exhaustive()
    }
}

/// A recorded canvas call
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    PushTransform(Affine2D),
    PopTransform,
    PushClip(Rect),
    PopClip,
    Clear(Color),
    FillRect {
        rect: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        color: Color,
        width: f64,
    },
    Text {
        text: String,
        origin: Point,
        font_size: f64,
        color: Color,
    },
}

/// Canvas that records commands instead of drawing
#[derive(Debug)]
pub struct RecordingCanvas {
    commands: Vec<DrawCommand>,
    transform_stack: Vec<Affine2D>,
    clip_depth: usize,
    viewport: Size,
    available: bool,
}

impl RecordingCanvas {
    pub fn new(viewport: Size) -> Self {
        Self {
            commands: Vec::new(),
            transform_stack: vec![Affine2D::IDENTITY],
            clip_depth: 0,
            viewport,
            available: true,
        }
    }

    /// A canvas whose backend is gone; every [`check`](Canvas::check) fails
    pub fn unavailable(viewport: Size) -> Self {
        Self {
            available: false,
            ..Self::new(viewport)
        }
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Drop all recorded commands and reset the stacks
    pub fn reset(&mut self) {
        self.commands.clear();
        self.transform_stack = vec![Affine2D::IDENTITY];
        self.clip_depth = 0;
    }

    /// Text of every recorded text command, in draw order
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn check(&self) -> Result<(), RenderError> {
        if self.available {
            Ok(())
        } else {
            Err(RenderError::BackendUnavailable("recording canvas disabled".into()))
        }
    }

    fn push_transform(&mut self, transform: Affine2D) {
        self.commands.push(DrawCommand::PushTransform(transform));
        let combined = self.current_transform().then_after(&transform);
        self.transform_stack.push(combined);
    }

    fn pop_transform(&mut self) {
        self.commands.push(DrawCommand::PopTransform);
        if self.transform_stack.len() > 1 {
            self.transform_stack.pop();
        }
    }

    fn current_transform(&self) -> Affine2D {
        self.transform_stack
            .last()
            .copied()
            .unwrap_or(Affine2D::IDENTITY)
    }

    fn push_clip(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::PushClip(rect));
        self.clip_depth += 1;
    }

    fn pop_clip(&mut self) {
        self.commands.push(DrawCommand::PopClip);
        self.clip_depth = self.clip_depth.saturating_sub(1);
    }

    fn clear(&mut self, color: Color) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f64) {
        self.commands
            .push(DrawCommand::StrokeRect { rect, color, width });
    }

    fn draw_text(&mut self, text: &str, origin: Point, font_size: f64, color: Color) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            origin,
            font_size,
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_stack_composes() {
        let mut canvas = RecordingCanvas::new(Size::new(100.0, 100.0));
        canvas.push_transform(Affine2D::translation(10.0, 0.0));
        canvas.push_transform(Affine2D::scale(2.0, 2.0));
        let p = canvas.current_transform().transform_point(Point::new(1.0, 1.0));
        assert_eq!(p, Point::new(12.0, 2.0));

        canvas.pop_transform();
        canvas.pop_transform();
        canvas.pop_transform();
        assert_eq!(canvas.current_transform(), Affine2D::IDENTITY);
    }

    #[test]
    fn test_unavailable_canvas_fails_check() {
        let canvas = RecordingCanvas::unavailable(Size::ZERO);
        assert!(matches!(canvas.check(), Err(RenderError::BackendUnavailable(_))));
    }

    #[test]
    fn test_records_commands() {
        let mut canvas = RecordingCanvas::new(Size::new(10.0, 10.0));
        canvas.clear(Color::WHITE);
        canvas.draw_text("hi", Point::ZERO, 12.0, Color::BLACK);
        assert_eq!(canvas.commands().len(), 2);
        assert_eq!(canvas.texts(), vec!["hi"]);
        assert_eq!(canvas.take_commands().len(), 2);
        assert!(canvas.commands().is_empty());
    }
}
