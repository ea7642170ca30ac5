//! Stock painters
//!
//! Painters are immutable: a view that changes builds a new one and swaps it
//! into its output port.

use std::rc::Rc;

use pipeview_core::{
    Canvas, Color, DrawCommand, Painter, PainterRef, Point, RecordingCanvas, Rect, RenderError, Size,
};

/// Painter that covers nothing and draws nothing
///
/// What a view outputs while it has no content to show.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyPainter;

impl Painter for EmptyPainter {
    fn bounds(&self) -> Rect {
        Rect::ZERO
    }

    fn draw(&self, _canvas: &mut dyn Canvas, _roi: &Rect, _resolution: Point) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Shared handle to an [`EmptyPainter`]
pub fn empty_painter() -> PainterRef {
    Rc::new(EmptyPainter)
}

/// A single line of text with its top-left corner at the origin
#[derive(Clone, Debug, PartialEq)]
pub struct TextPainter {
    text: String,
    font_size: f64,
    color: Color,
    size: Size,
}

impl TextPainter {
    /// `size` is the measured extent of `text`
    pub fn new(text: impl Into<String>, font_size: f64, color: Color, size: Size) -> Self {
        Self {
            text: text.into(),
            font_size,
            color,
            size,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn font_size(&self) -> f64 {
        self.font_size
    }
}

impl Painter for TextPainter {
    fn bounds(&self) -> Rect {
        self.size.to_rect()
    }

    fn draw(&self, canvas: &mut dyn Canvas, roi: &Rect, _resolution: Point) -> Result<(), RenderError> {
        if self.text.is_empty() || !roi.intersects(&self.bounds()) {
            return Ok(());
        }
        canvas.draw_text(&self.text, Point::ZERO, self.font_size, self.color);
        Ok(())
    }
}

/// Solid rectangle with an optional outline
#[derive(Clone, Debug, PartialEq)]
pub struct RectPainter {
    rect: Rect,
    fill: Color,
    outline: Option<(Color, f64)>,
}

impl RectPainter {
    pub fn new(rect: Rect, fill: Color) -> Self {
        Self {
            rect,
            fill,
            outline: None,
        }
    }

    /// Stroke the rectangle's edge with `color` at `width`
    pub fn with_outline(mut self, color: Color, width: f64) -> Self {
        self.outline = Some((color, width));
        self
    }
}

impl Painter for RectPainter {
    fn bounds(&self) -> Rect {
        self.rect
    }

    fn draw(&self, canvas: &mut dyn Canvas, roi: &Rect, _resolution: Point) -> Result<(), RenderError> {
        if !roi.intersects(&self.rect) {
            return Ok(());
        }
        canvas.fill_rect(self.rect, self.fill);
        if let Some((color, width)) = self.outline {
            canvas.stroke_rect(self.rect, color, width);
        }
        Ok(())
    }
}

/// Painter that replays a recorded command list
///
/// Record once with [`RecordedPainter::record`], draw any number of times.
/// Recording is done against a [`RecordingCanvas`], so it never touches the
/// real backend.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedPainter {
    bounds: Rect,
    commands: Vec<DrawCommand>,
}

impl RecordedPainter {
    pub fn new(bounds: Rect, commands: Vec<DrawCommand>) -> Self {
        Self { bounds, commands }
    }

    /// Record whatever `f` draws
    pub fn record(bounds: Rect, f: impl FnOnce(&mut dyn Canvas)) -> Self {
        let mut canvas = RecordingCanvas::new(bounds.size);
        f(&mut canvas);
        Self {
            bounds,
            commands: canvas.take_commands(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }
}

impl Painter for RecordedPainter {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn draw(&self, canvas: &mut dyn Canvas, _roi: &Rect, _resolution: Point) -> Result<(), RenderError> {
        if self.commands.is_empty() {
            tracing::trace!(target: "pipeview::painter", "nothing recorded, skipping draw");
            return Ok(());
        }
        replay(canvas, &self.commands);
        Ok(())
    }
}

/// Issue `commands` against `canvas` in order
pub fn replay(canvas: &mut dyn Canvas, commands: &[DrawCommand]) {
    for command in commands {
        match command {
            DrawCommand::PushTransform(transform) => canvas.push_transform(*transform),
            DrawCommand::PopTransform => canvas.pop_transform(),
            DrawCommand::PushClip(rect) => canvas.push_clip(*rect),
            DrawCommand::PopClip => canvas.pop_clip(),
            DrawCommand::Clear(color) => canvas.clear(*color),
            DrawCommand::FillRect { rect, color } => canvas.fill_rect(*rect, *color),
            DrawCommand::StrokeRect { rect, color, width } => canvas.stroke_rect(*rect, *color, *width),
            DrawCommand::Text {
                text,
                origin,
                font_size,
                color,
            } => canvas.draw_text(text, *origin, *font_size, *color),
        }
    }
}
