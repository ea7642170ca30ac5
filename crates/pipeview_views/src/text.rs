//! Text measurement and the text view
//!
//! Views do not shape text. They ask a [`TextMeasurer`] how much room a
//! string takes and hand the string to the canvas. The measurer is injected
//! per view; [`EstimatedTextMeasurer`] is the fallback when no font system
//! is around.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pipeview_core::{
    install_protocol, Change, Color, Context, NodeCore, OutputPort, PainterRef, Port, Process, Rect,
    Size,
};

use crate::painters::TextPainter;

/// Text measurement result
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextMetrics {
    /// Width of the widest line
    pub width: f64,
    /// Height of all lines, line height included
    pub height: f64,
    /// Distance from baseline to top
    pub ascender: f64,
    /// Distance from baseline to bottom, typically negative
    pub descender: f64,
    pub line_count: u32,
}

impl TextMetrics {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Measures text for layout
pub trait TextMeasurer {
    fn measure(&self, text: &str, font_size: f64) -> TextMetrics;
}

/// Fixed-advance estimate
///
/// Every character is `char_width * font_size` wide and every line
/// `line_height * font_size` high. Conservative for proportional fonts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatedTextMeasurer {
    pub char_width: f64,
    pub line_height: f64,
}

impl Default for EstimatedTextMeasurer {
    fn default() -> Self {
        Self {
            char_width: 0.55,
            line_height: 1.2,
        }
    }
}

impl TextMeasurer for EstimatedTextMeasurer {
    fn measure(&self, text: &str, font_size: f64) -> TextMetrics {
        if text.is_empty() {
            return TextMetrics::default();
        }
        let mut line_count = 0u32;
        let mut widest = 0usize;
        for line in text.lines() {
            line_count += 1;
            widest = widest.max(line.chars().count());
        }
        // a trailing newline still starts a line
        if text.ends_with('\n') {
            line_count += 1;
        }

        TextMetrics {
            width: widest as f64 * font_size * self.char_width,
            height: f64::from(line_count) * font_size * self.line_height,
            ascender: font_size * 0.8,
            descender: font_size * -0.2,
            line_count,
        }
    }
}

/// How a [`TextView`] draws its text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_size: f64,
    pub color: Color,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            color: Color::BLACK,
        }
    }
}

/// Leaf view showing a line of text
///
/// Output `painter`. Changing the text marks the view dirty; the new painter
/// is built on the next pull.
pub struct TextView {
    core: NodeCore,
    painter: OutputPort<PainterRef>,
    text: RefCell<String>,
    style: Cell<TextStyle>,
    measurer: Rc<dyn TextMeasurer>,
}

impl TextView {
    pub fn new(text: impl Into<String>, ctx: &Context) -> Rc<Self> {
        Self::with_measurer(text, Rc::new(EstimatedTextMeasurer::default()), ctx)
    }

    pub fn with_measurer(
        text: impl Into<String>,
        measurer: Rc<dyn TextMeasurer>,
        ctx: &Context,
    ) -> Rc<Self> {
        let core = NodeCore::new("text", ctx);
        let painter = core.add_output("painter");
        let view = Rc::new(Self {
            core,
            painter,
            text: RefCell::new(text.into()),
            style: Cell::new(TextStyle::default()),
            measurer,
        });
        view.painter.set(view.build());
        install_protocol(&view);
        view
    }

    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn set_text(&self, text: impl Into<String>) {
        let text = text.into();
        if *self.text.borrow() == text {
            return;
        }
        tracing::debug!(target: "pipeview::text", %text, "text changed");
        *self.text.borrow_mut() = text;
        self.core.set_dirty();
    }

    pub fn style(&self) -> TextStyle {
        self.style.get()
    }

    pub fn set_style(&self, style: TextStyle) {
        if self.style.get() != style {
            self.style.set(style);
            self.core.set_dirty();
        }
    }

    /// The `painter` output
    pub fn output(&self) -> &Port {
        self.painter.port()
    }

    fn build(&self) -> PainterRef {
        let text = self.text.borrow();
        let style = self.style.get();
        let metrics = self.measurer.measure(&text, style.font_size);
        Rc::new(TextPainter::new(
            text.as_str(),
            style.font_size,
            style.color,
            metrics.size(),
        ))
    }
}

impl Process for TextView {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn update_outputs(&self) -> Change {
        let old = self.painter.value().map_or(Rect::ZERO, |p| p.bounds());
        let painter = self.build();
        let new = painter.bounds();
        self.painter.set(painter);
        Change::between(old, new)
    }
}
