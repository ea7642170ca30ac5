//! Zoom adapter
//!
//! Wraps one child painter and shows it scaled and shifted. The transform
//! from child space to the zoom's own space is
//!
//! ```text
//! T = U ∘ A      U(p) = scale · p + shift
//! ```
//!
//! where `A` is the autoscale fit (identity unless autoscaling) mapping the
//! child's bounds into the desired area, centred and aspect-preserving.
//!
//! With the gate modifier held (Ctrl by default) the wheel zooms around the
//! pointer and a left drag pans. The reset key restores `scale = 1`,
//! `shift = 0`. Everything the zoom does not claim is passed to the child,
//! with pointer positions mapped through `T⁻¹` by a backward filter on the
//! child's connection.

use std::cell::Cell;
use std::rc::Rc;

use pipeview_core::{
    filter_fn, install_protocol, Affine2D, Canvas, Change, Context, Direction, FilterFault,
    FilterVerdict, InputPort, Key, ModifierKey, MouseButton, NodeCore, OutputPort, Painter,
    PainterRef, Point, Port, Process, Rect, RenderError, Signal, SignalKind,
};
use serde::{Deserialize, Serialize};
use smallvec::smallvec;

use crate::error::{ConfigError, Result};
use crate::painters::empty_painter;
use crate::relay::relay;

/// Zoom behaviour
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    /// Scale factor per wheel tick
    pub zoom_step: f64,
    /// Extra factor on `zoom_step` while the boost modifier is held
    pub fast_factor: f64,
    /// Drag multiplier while the boost modifier is held
    pub drag_amplification: f64,
    /// Modifier that must be held for the zoom to claim pointer input
    pub gate: ModifierKey,
    pub boost: ModifierKey,
    pub reset_key: Key,
    /// Fit the child into the desired area before applying scale and shift
    pub autoscale: bool,
    /// Fixed target area for autoscaling; the consumer's `Resize` area is
    /// used when unset
    pub desired_size: Option<Rect>,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            zoom_step: 1.1,
            fast_factor: 2.0,
            drag_amplification: 10.0,
            gate: ModifierKey::Ctrl,
            boost: ModifierKey::Shift,
            reset_key: Key::R,
            autoscale: false,
            desired_size: None,
        }
    }
}

impl ZoomConfig {
    /// Parse and validate a configuration; missing keys take their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ZoomConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")))
            }
        };
        positive("zoom_step", self.zoom_step)?;
        positive("fast_factor", self.fast_factor)?;
        positive("drag_amplification", self.drag_amplification)?;
        if let Some(desired) = self.desired_size {
            if desired.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "desired_size must cover an area, got {desired:?}"
                )));
            }
        }
        Ok(())
    }

    /// Fit the child into the area the consumer offers
    pub fn autoscaled(mut self) -> Self {
        self.autoscale = true;
        self
    }

    /// Fit the child into `desired`
    pub fn desired_size(mut self, desired: Rect) -> Self {
        self.autoscale = true;
        self.desired_size = Some(desired);
        self
    }

    pub fn zoom_step(mut self, step: f64) -> Self {
        self.zoom_step = step;
        self
    }

    /// True if `Resize` signals set the autoscale target
    fn follows_resize(&self) -> bool {
        self.autoscale && self.desired_size.is_none()
    }
}

/// Child painter drawn through a fixed transform
#[derive(Debug)]
pub struct ZoomPainter {
    content: PainterRef,
    transform: Affine2D,
    bounds: Rect,
}

impl ZoomPainter {
    pub fn new(content: PainterRef, transform: Affine2D) -> Self {
        let bounds = transform.transform_rect(&content.bounds());
        Self {
            content,
            transform,
            bounds,
        }
    }

    fn empty() -> Self {
        Self {
            content: empty_painter(),
            transform: Affine2D::IDENTITY,
            bounds: Rect::ZERO,
        }
    }

    pub fn transform(&self) -> Affine2D {
        self.transform
    }
}

impl Painter for ZoomPainter {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn draw(&self, canvas: &mut dyn Canvas, roi: &Rect, resolution: Point) -> std::result::Result<(), RenderError> {
        let Some(inverse) = self.transform.invert() else {
            return Err(RenderError::InvalidTransform(format!(
                "zoom transform {:?} is not invertible",
                self.transform.elements
            )));
        };
        let local = inverse.transform_rect(roi);
        let magnification = self.transform.determinant().abs().sqrt();

        canvas.push_transform(self.transform);
        let drawn = self.content.draw(canvas, &local, resolution * magnification);
        canvas.pop_transform();
        drawn
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct ZoomState {
    scale: f64,
    shift: Point,
    dragging: bool,
    /// Last pointer position seen while dragging
    anchor: Point,
    /// Area from the most recent consumed `Resize`
    available: Option<Rect>,
}

impl Default for ZoomState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            shift: Point::ZERO,
            dragging: false,
            anchor: Point::ZERO,
            available: None,
        }
    }
}

/// Zoom and pan adapter around one child
pub struct ZoomView {
    core: NodeCore,
    config: ZoomConfig,
    content: InputPort<PainterRef>,
    painter: OutputPort<PainterRef>,
    state: Cell<ZoomState>,
}

impl ZoomView {
    pub fn new(ctx: &Context) -> Rc<Self> {
        Self::build(ZoomConfig::default(), ctx)
    }

    /// Zoom fitting its child into the area the consumer offers
    pub fn autoscaled(ctx: &Context) -> Rc<Self> {
        Self::build(ZoomConfig::default().autoscaled(), ctx)
    }

    /// Zoom fitting its child into `desired`
    pub fn with_desired_size(desired: Rect, ctx: &Context) -> Rc<Self> {
        Self::build(ZoomConfig::default().desired_size(desired), ctx)
    }

    pub fn with_config(config: ZoomConfig, ctx: &Context) -> Result<Rc<Self>> {
        config.validate()?;
        Ok(Self::build(config, ctx))
    }

    fn build(config: ZoomConfig, ctx: &Context) -> Rc<Self> {
        let core = NodeCore::new("zoom", ctx);
        let content = core.add_input("painter");
        let painter = core.add_output::<PainterRef>("painter");
        painter.set(Rc::new(ZoomPainter::empty()));

        let view = Rc::new(Self {
            core,
            config,
            content,
            painter,
            state: Cell::new(ZoomState::default()),
        });
        install_protocol(&view);
        view.install_filters_on_input_set();

        view.on(SignalKind::MouseDown, Self::on_mouse_down);
        view.on(SignalKind::MouseMove, Self::on_mouse_move);
        view.on(SignalKind::MouseUp, Self::on_mouse_up);
        view.on(SignalKind::KeyDown, Self::on_key_down);
        view.on(SignalKind::Resize, Self::on_resize);

        // whatever the handlers above leave unclaimed goes to the child
        for kind in [SignalKind::Input, SignalKind::Resize] {
            relay(&view, view.painter.port(), kind, |zoom: &ZoomView| {
                smallvec![zoom.content.port().clone()]
            });
        }
        view
    }

    fn on(self: &Rc<Self>, kind: SignalKind, handler: fn(&ZoomView, &mut Signal)) {
        let weak = Rc::downgrade(self);
        self.painter
            .port()
            .register_callback(kind, self.core.id(), move |signal| {
                if let Some(view) = weak.upgrade() {
                    handler(&view, signal);
                }
            });
    }

    /// Put the coordinate filters on every new child connection
    fn install_filters_on_input_set(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        self.content
            .port()
            .register_callback(SignalKind::InputSet, self.core.id(), move |_| {
                let Some(view) = weak.upgrade() else {
                    return;
                };
                let Some(link) = view.content.port().connection() else {
                    return;
                };

                let to_child = Rc::downgrade(&view);
                let to_parent = Rc::downgrade(&view);
                let attached = link
                    .attach_filter(
                        Direction::Backward,
                        filter_fn(move |signal| {
                            if let Some(view) = to_child.upgrade() {
                                signal.map_position(|p| view.invert(p))?;
                            }
                            Ok(FilterVerdict::Forward)
                        }),
                    )
                    .and_then(|()| {
                        link.attach_filter(
                            Direction::Forward,
                            filter_fn(move |signal| {
                                if let Some(view) = to_parent.upgrade() {
                                    signal.map_rect(|r| Ok(view.transform_for(r).transform_rect(&r)))?;
                                }
                                Ok(FilterVerdict::Forward)
                            }),
                        )
                    });
                if let Err(err) = attached {
                    tracing::warn!(target: "pipeview::zoom", "could not filter new content: {err}");
                }
            });
    }

    // =========================================================================
    // Ports
    // =========================================================================

    /// The child's `painter` input
    pub fn input(&self) -> &Port {
        self.content.port()
    }

    pub fn output(&self) -> &Port {
        self.painter.port()
    }

    pub fn config(&self) -> &ZoomConfig {
        &self.config
    }

    // =========================================================================
    // Transform state
    // =========================================================================

    pub fn scale(&self) -> f64 {
        self.state.get().scale
    }

    pub fn shift(&self) -> Point {
        self.state.get().shift
    }

    pub fn is_dragging(&self) -> bool {
        self.state.get().dragging
    }

    /// Scale by `step` keeping `anchor` (in zoom space) in place
    pub fn zoom(&self, step: f64, anchor: Point) {
        let mut state = self.state.get();
        state.scale *= step;
        state.shift = (state.shift - anchor) * step + anchor;
        self.state.set(state);
        tracing::debug!(
            target: "pipeview::zoom",
            scale = state.scale,
            shift = ?state.shift,
            "zoomed"
        );
        self.core.set_dirty();
    }

    /// Move the content by `delta`
    pub fn drag(&self, delta: Point) {
        let mut state = self.state.get();
        state.shift += delta;
        self.state.set(state);
        tracing::trace!(target: "pipeview::zoom", shift = ?state.shift, "dragged");
        self.core.set_dirty();
    }

    /// Back to `scale = 1`, `shift = 0`
    pub fn reset(&self) {
        let mut state = self.state.get();
        if state.scale == 1.0 && state.shift == Point::ZERO {
            return;
        }
        state.scale = 1.0;
        state.shift = Point::ZERO;
        self.state.set(state);
        tracing::debug!(target: "pipeview::zoom", "reset scale and shift");
        self.core.set_dirty();
    }

    /// Current child-to-zoom transform
    pub fn transform(&self) -> Affine2D {
        self.transform_for(self.content_bounds().unwrap_or(Rect::ZERO))
    }

    /// Bounds the next pull will report
    pub fn bounds(&self) -> Rect {
        match self.content_bounds() {
            Some(content) => self.transform_for(content).transform_rect(&content),
            None => Rect::ZERO,
        }
    }

    /// Part of the child visible through `viewport`, in child space
    pub fn visible_region(&self, viewport: &Rect) -> Option<Rect> {
        self.transform()
            .invert()
            .map(|inverse| inverse.transform_rect(viewport))
    }

    /// Map a point in zoom space to child space
    pub fn invert(&self, point: Point) -> std::result::Result<Point, FilterFault> {
        self.transform()
            .invert()
            .map(|inverse| inverse.transform_point(point))
            .ok_or_else(|| FilterFault::new(format!("zoom scale {} cannot be inverted", self.scale())))
    }

    fn content_bounds(&self) -> Option<Rect> {
        self.content.get().map(|painter| painter.bounds())
    }

    fn transform_for(&self, content: Rect) -> Affine2D {
        let state = self.state.get();
        let user = Affine2D::translation(state.shift.x, state.shift.y)
            .then_after(&Affine2D::scale(state.scale, state.scale));
        user.then_after(&self.fit(content))
    }

    fn fit(&self, content: Rect) -> Affine2D {
        if !self.config.autoscale {
            return Affine2D::IDENTITY;
        }
        let desired = self.config.desired_size.or(self.state.get().available);
        let Some(desired) = desired else {
            return Affine2D::IDENTITY;
        };
        if content.is_empty() || desired.is_empty() {
            return Affine2D::IDENTITY;
        }
        let s = (desired.width() / content.width()).min(desired.height() / content.height());
        let offset = desired.center() - content.center() * s;
        Affine2D::translation(offset.x, offset.y).then_after(&Affine2D::scale(s, s))
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    fn on_mouse_down(&self, signal: &mut Signal) {
        if signal.processed() {
            return;
        }
        let Some(&pointer) = signal.pointer() else {
            return;
        };
        if !pointer.modifiers.holds(self.config.gate) {
            return;
        }

        let mut step = self.config.zoom_step;
        if pointer.modifiers.holds(self.config.boost) {
            step *= self.config.fast_factor;
        }

        match pointer.button {
            Some(MouseButton::Left) => {
                signal.mark_processed();
                let mut state = self.state.get();
                state.dragging = true;
                state.anchor = pointer.position;
                self.state.set(state);
                tracing::trace!(target: "pipeview::zoom", at = ?pointer.position, "start dragging");
            }
            Some(MouseButton::WheelUp) => {
                signal.mark_processed();
                self.zoom(step, pointer.position);
            }
            Some(MouseButton::WheelDown) => {
                signal.mark_processed();
                self.zoom(1.0 / step, pointer.position);
            }
            // any other gated press is ours too
            _ => signal.mark_processed(),
        }
    }

    fn on_mouse_move(&self, signal: &mut Signal) {
        if signal.processed() {
            return;
        }
        let Some(&pointer) = signal.pointer() else {
            return;
        };
        let mut state = self.state.get();
        if !pointer.modifiers.holds(self.config.gate) || !state.dragging {
            return;
        }
        signal.mark_processed();

        if !pointer.buttons.left {
            state.dragging = false;
            self.state.set(state);
            tracing::trace!(target: "pipeview::zoom", "left button released, stop dragging");
            return;
        }

        let amplification = if pointer.modifiers.holds(self.config.boost) {
            self.config.drag_amplification
        } else {
            1.0
        };
        let moved = (pointer.position - state.anchor) * amplification;
        state.anchor = pointer.position;
        self.state.set(state);
        self.drag(moved);
    }

    fn on_mouse_up(&self, signal: &mut Signal) {
        let Some(&pointer) = signal.pointer() else {
            return;
        };
        let mut state = self.state.get();
        if state.dragging && pointer.button == Some(MouseButton::Left) {
            state.dragging = false;
            self.state.set(state);
            signal.mark_processed();
        }
    }

    fn on_key_down(&self, signal: &mut Signal) {
        if signal.processed() {
            return;
        }
        if signal.key().map(|k| k.key) == Some(self.config.reset_key) {
            signal.mark_processed();
            self.reset();
        }
    }

    fn on_resize(&self, signal: &mut Signal) {
        if signal.processed() || !self.config.follows_resize() {
            return;
        }
        let Some(area) = signal.rect() else {
            return;
        };
        signal.mark_processed();

        let old = self.bounds();
        let mut state = self.state.get();
        state.available = Some(area);
        self.state.set(state);
        tracing::debug!(target: "pipeview::zoom", ?area, "fitting into new area");

        if self.bounds() != old {
            self.core.set_dirty();
        }
    }
}

impl Process for ZoomView {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn update_outputs(&self) -> Change {
        let old = self.painter.value().map_or(Rect::ZERO, |p| p.bounds());
        let painter = match self.content.get() {
            Some(content) => {
                let transform = self.transform_for(content.bounds());
                ZoomPainter::new(content, transform)
            }
            None => ZoomPainter::empty(),
        };
        let new = painter.bounds();
        self.painter.set(Rc::new(painter));
        Change::between(old, new)
    }
}
