//! Solid rectangle view

use std::cell::Cell;
use std::rc::Rc;

use pipeview_core::{
    install_protocol, Change, Color, Context, NodeCore, OutputPort, PainterRef, Port, Process, Rect,
};

use crate::painters::RectPainter;

/// Leaf view filling a rectangle
pub struct RectView {
    core: NodeCore,
    painter: OutputPort<PainterRef>,
    rect: Cell<Rect>,
    color: Cell<Color>,
}

impl RectView {
    pub fn new(rect: Rect, color: Color, ctx: &Context) -> Rc<Self> {
        let core = NodeCore::new("rect", ctx);
        let painter = core.add_output("painter");
        let view = Rc::new(Self {
            core,
            painter,
            rect: Cell::new(rect),
            color: Cell::new(color),
        });
        view.painter.set(view.build());
        install_protocol(&view);
        view
    }

    pub fn rect(&self) -> Rect {
        self.rect.get()
    }

    pub fn set_rect(&self, rect: Rect) {
        if self.rect.get() != rect {
            self.rect.set(rect);
            self.core.set_dirty();
        }
    }

    pub fn color(&self) -> Color {
        self.color.get()
    }

    pub fn set_color(&self, color: Color) {
        if self.color.get() != color {
            self.color.set(color);
            self.core.set_dirty();
        }
    }

    pub fn output(&self) -> &Port {
        self.painter.port()
    }

    fn build(&self) -> PainterRef {
        Rc::new(RectPainter::new(self.rect.get(), self.color.get()))
    }
}

impl Process for RectView {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn update_outputs(&self) -> Change {
        let old = self.painter.value().map_or(Rect::ZERO, |p| p.bounds());
        self.painter.set(self.build());
        Change::between(old, self.rect.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Tap;
    use pipeview_core::SignalKind;

    #[test]
    fn test_resize_reports_new_bounds() {
        let ctx = Context::new();
        let view = RectView::new(Rect::new(0.0, 0.0, 10.0, 5.0), Color::BLUE, &ctx);
        let tap = Tap::attach(view.output(), &ctx);
        assert_eq!(tap.pull().unwrap().bounds(), Rect::new(0.0, 0.0, 10.0, 5.0));

        view.set_rect(Rect::new(0.0, 0.0, 12.0, 5.0));
        tap.pull();
        assert_eq!(tap.sizes(), vec![Rect::new(0.0, 0.0, 12.0, 5.0)]);
        assert_eq!(view.core().stats().recomputes, 1);
    }

    #[test]
    fn test_color_change_is_content_only() {
        let ctx = Context::new();
        let view = RectView::new(Rect::new(0.0, 0.0, 1.0, 1.0), Color::BLUE, &ctx);
        let tap = Tap::attach(view.output(), &ctx);
        view.set_color(Color::GRAY);
        tap.pull();
        assert_eq!(
            tap.kinds(),
            vec![SignalKind::Modified, SignalKind::ContentChanged]
        );
        assert_eq!(view.color(), Color::GRAY);
    }
}
