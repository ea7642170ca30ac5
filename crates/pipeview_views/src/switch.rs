//! On/off switch
//!
//! [`Switch`] is a small composite: a label ([`TextView`]) and a toggle box
//! ([`SwitchImpl`]) side by side in a horizontal [`ContainerView`]. It
//! exports the container's `painter` and the toggle's `value`.

use std::cell::Cell;
use std::rc::Rc;

use pipeview_core::{
    install_protocol, Change, Color, Context, MouseButton, NodeCore, OutputPort, PainterRef, Port,
    Process, Rect, Result, SignalKind,
};

use crate::container::{ContainerView, Placing};
use crate::painters::RecordedPainter;
use crate::text::TextView;

const BOX_SIZE: f64 = 14.0;
const LABEL_SPACING: f64 = 4.0;

/// Toggle box
///
/// Outputs `painter` and `value`. An unclaimed left click inside the box
/// flips the value and claims the click.
pub struct SwitchImpl {
    core: NodeCore,
    painter: OutputPort<PainterRef>,
    value: OutputPort<bool>,
    state: Cell<bool>,
}

impl SwitchImpl {
    pub fn new(initial: bool, ctx: &Context) -> Rc<Self> {
        let core = NodeCore::new("switch", ctx);
        let painter = core.add_output("painter");
        let value = core.add_output("value");
        let view = Rc::new(Self {
            core,
            painter,
            value,
            state: Cell::new(initial),
        });
        view.update_outputs();
        install_protocol(&view);

        let weak = Rc::downgrade(&view);
        view.painter
            .port()
            .register_callback(SignalKind::MouseDown, view.core.id(), move |signal| {
                let Some(view) = weak.upgrade() else {
                    return;
                };
                let Some(&pointer) = signal.pointer() else {
                    return;
                };
                if signal.processed()
                    || pointer.button != Some(MouseButton::Left)
                    || !view.bounds().contains(pointer.position)
                {
                    return;
                }
                signal.mark_processed();
                view.set_value(!view.state.get());
            });
        view
    }

    /// Value as of the last pull
    pub fn value(&self) -> bool {
        self.value.value().unwrap_or(self.state.get())
    }

    pub fn set_value(&self, value: bool) {
        if self.state.get() == value {
            return;
        }
        tracing::debug!(target: "pipeview::switch", value, "toggled");
        self.state.set(value);
        self.core.set_dirty();
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, BOX_SIZE, BOX_SIZE)
    }

    pub fn painter_port(&self) -> &Port {
        self.painter.port()
    }

    pub fn value_port(&self) -> &Port {
        self.value.port()
    }

    fn draw_box(on: bool, bounds: Rect) -> PainterRef {
        Rc::new(RecordedPainter::record(bounds, |canvas| {
            canvas.fill_rect(bounds, Color::WHITE);
            if on {
                let inset = BOX_SIZE * 0.25;
                let mark = Rect::new(inset, inset, BOX_SIZE - 2.0 * inset, BOX_SIZE - 2.0 * inset);
                canvas.fill_rect(mark, Color::BLACK);
            }
            canvas.stroke_rect(bounds, Color::BLACK, 1.0);
        }))
    }
}

impl Process for SwitchImpl {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn update_outputs(&self) -> Change {
        let on = self.state.get();
        let old = self.painter.value().map_or(Rect::ZERO, |p| p.bounds());
        self.value.set(on);
        self.painter.set(Self::draw_box(on, self.bounds()));
        Change::between(old, self.bounds())
    }
}

/// Labelled switch
pub struct Switch {
    core: NodeCore,
    label: Rc<TextView>,
    toggle: Rc<SwitchImpl>,
    container: Rc<ContainerView>,
}

impl Switch {
    pub fn new(name: &str, ctx: &Context) -> Result<Self> {
        let core = NodeCore::new(format!("switch '{name}'"), ctx);
        let label = TextView::new(format!("{name}:"), ctx);
        let toggle = SwitchImpl::new(false, ctx);
        let container = ContainerView::new(
            Placing::Horizontal {
                spacing: LABEL_SPACING,
            },
            ctx,
        );

        container.add_input(label.output())?;
        container.add_input(toggle.painter_port())?;

        core.export_output(toggle.value_port().clone());
        core.export_output(container.output().clone());

        Ok(Self {
            core,
            label,
            toggle,
            container,
        })
    }

    /// `painter` or `value`
    pub fn output(&self, name: &str) -> Result<Port> {
        self.core.output(name)
    }

    pub fn painter(&self) -> &Port {
        self.container.output()
    }

    pub fn value_port(&self) -> &Port {
        self.toggle.value_port()
    }

    pub fn value(&self) -> bool {
        self.toggle.value()
    }

    pub fn set_value(&self, value: bool) {
        self.toggle.set_value(value);
    }

    pub fn label(&self) -> &Rc<TextView> {
        &self.label
    }
}
