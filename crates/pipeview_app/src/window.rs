//! The window process node
//!
//! A [`Window`] consumes one painter and shows it in a [`WindowBase`]
//! backend. It is the outermost consumer of a scene, so it is where input
//! enters the graph and where `Update` pulls start:
//!
//! - platform events become backward signals fired at the painter's
//!   producer, each with `processed = false`; the caller learns whether
//!   anything claimed them
//! - a new producer, and every window resize, is told the region it may
//!   fill with a `Resize` signal
//! - each redraw opportunity issues one `Update` pull and draws only if the
//!   scene reported a content or size change since the last frame
//!
//! The window shows `region` (in scene units) stretched over its pixels.
//! Until the scene asks for something else the region is the pixel rect, so
//! one unit is one pixel.

use std::cell::Cell;
use std::rc::Rc;

use pipeview_core::{
    connect, Affine2D, ButtonsHeld, Color, Connection, Context, Diagnostic, DiagnosticKind,
    InputPort, Key, Modifiers, MouseButton, NodeCore, PainterRef, Point, Port, Rect, RenderError,
    Signal, SignalKind, Size, Slot,
};
use pipeview_platform::{create_window, ControlFlow, PlatformEvent, WindowBase, WindowConfig};

use crate::error::Result;

/// Driver between a window backend and a scene
pub struct Window<W: WindowBase = Box<dyn WindowBase>> {
    core: NodeCore,
    painter: InputPort<PainterRef>,
    backend: W,
    background: Color,

    // backward signals
    update: Slot,
    resize: Slot,
    key_down: Slot,
    key_up: Slot,
    mouse_down: Slot,
    mouse_up: Slot,
    mouse_move: Slot,

    /// Shown part of the scene, shared with the `InputSet` handler
    region: Rc<Cell<Rect>>,
    resolution: Size,
    /// A producer reported a change that has not been pulled yet
    modified: Rc<Cell<bool>>,
    /// The next redraw has something new to show
    content_changed: Rc<Cell<bool>>,
    showing_painter: bool,
    frames: u64,
}

impl Window {
    /// Open a window with the backend named in `config`
    pub fn open(config: &WindowConfig, ctx: &Context) -> Result<Self> {
        let backend = create_window(config)?;
        Ok(Window::new(backend, config.background, ctx))
    }
}

impl<W: WindowBase> Window<W> {
    pub fn new(backend: W, background: Color, ctx: &Context) -> Self {
        let core = NodeCore::new(format!("window '{}'", backend.caption()), ctx);
        let painter = core.add_input::<PainterRef>("painter");
        let port = painter.port();

        let resolution = backend.resolution();
        let region = Rc::new(Cell::new(resolution.to_rect()));
        let modified = Rc::new(Cell::new(false));
        let content_changed = Rc::new(Cell::new(true));
        let resize = port.register_slot(SignalKind::Resize);

        {
            let modified = modified.clone();
            let content_changed = content_changed.clone();
            port.register_callback(SignalKind::Modified, core.id(), move |signal| {
                modified.set(true);
                if signal.kind().is_a(SignalKind::ContentChanged) {
                    content_changed.set(true);
                }
            });
        }
        {
            let region = region.clone();
            let content_changed = content_changed.clone();
            let resize = resize.clone();
            port.register_callback(SignalKind::InputSet, core.id(), move |_| {
                content_changed.set(true);
                tracing::debug!(target: "pipeview::window", region = ?region.get(), "new painter");
                resize.emit(Signal::resize(region.get()));
            });
        }

        tracing::debug!(target: "pipeview::window", caption = %backend.caption(), ?resolution, "window created");
        Self {
            update: port.register_slot(SignalKind::Update),
            key_down: port.register_slot(SignalKind::KeyDown),
            key_up: port.register_slot(SignalKind::KeyUp),
            mouse_down: port.register_slot(SignalKind::MouseDown),
            mouse_up: port.register_slot(SignalKind::MouseUp),
            mouse_move: port.register_slot(SignalKind::MouseMove),
            resize,
            core,
            painter,
            backend,
            background,
            region,
            resolution,
            modified,
            content_changed,
            showing_painter: false,
            frames: 0,
        }
    }

    // =========================================================================
    // Scene
    // =========================================================================

    /// The `painter` input
    pub fn input(&self) -> &Port {
        self.painter.port()
    }

    /// Connect `output` as the painter to show
    pub fn attach(&self, output: impl AsRef<Port>) -> Result<Connection> {
        Ok(connect(output, &self.painter)?)
    }

    pub fn core(&self) -> &NodeCore {
        &self.core
    }

    pub fn backend(&self) -> &W {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut W {
        &mut self.backend
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn set_background(&mut self, color: Color) {
        if self.background != color {
            self.background = color;
            self.content_changed.set(true);
        }
    }

    /// Part of the scene shown, in scene units
    pub fn region(&self) -> Rect {
        self.region.get()
    }

    /// Size in pixels
    pub fn resolution(&self) -> Size {
        self.resolution
    }

    /// Frames presented so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Whether the next redraw will draw
    pub fn needs_redraw(&self) -> bool {
        self.content_changed.get() || self.modified.get()
    }

    /// Window pixels to scene units
    pub fn to_region(&self, pixel: Point) -> Point {
        let region = self.region.get();
        let (w, h) = (self.resolution.width, self.resolution.height);
        if w <= 0.0 || h <= 0.0 {
            return Point::new(region.min_x(), region.min_y());
        }
        Point::new(
            region.min_x() + pixel.x * region.width() / w,
            region.min_y() + pixel.y * region.height() / h,
        )
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Returns whether the scene claimed the key
    pub fn process_key_down(&self, key: Key, modifiers: Modifiers) -> bool {
        self.send(&self.key_down, Signal::key_down(key, modifiers))
    }

    pub fn process_key_up(&self, key: Key, modifiers: Modifiers) -> bool {
        self.send(&self.key_up, Signal::key_up(key, modifiers))
    }

    /// `position` is in window pixels
    pub fn process_button_down(&self, button: MouseButton, position: Point, modifiers: Modifiers) -> bool {
        let position = self.to_region(position);
        self.send(&self.mouse_down, Signal::mouse_down(button, position, modifiers))
    }

    pub fn process_button_up(&self, button: MouseButton, position: Point, modifiers: Modifiers) -> bool {
        let position = self.to_region(position);
        self.send(&self.mouse_up, Signal::mouse_up(button, position, modifiers))
    }

    pub fn process_mouse_move(&self, position: Point, buttons: ButtonsHeld, modifiers: Modifiers) -> bool {
        let position = self.to_region(position);
        self.send(&self.mouse_move, Signal::mouse_move(position, buttons, modifiers))
    }

    /// The backend changed size to `width` x `height` pixels
    pub fn process_resize(&mut self, width: u32, height: u32) -> bool {
        self.resolution = Size::new(f64::from(width), f64::from(height));
        let region = self.resolution.to_rect();
        self.region.set(region);
        self.content_changed.set(true);
        tracing::debug!(target: "pipeview::window", ?region, "resized");
        self.send(&self.resize, Signal::resize(region))
    }

    /// Drain the backend's events into the scene
    pub fn process_events(&mut self) -> ControlFlow {
        if self.backend.is_closed() {
            return ControlFlow::Exit;
        }
        for event in self.backend.poll_events() {
            match event {
                PlatformEvent::KeyDown { key, modifiers } => {
                    self.process_key_down(key, modifiers);
                }
                PlatformEvent::KeyUp { key, modifiers } => {
                    self.process_key_up(key, modifiers);
                }
                PlatformEvent::ButtonDown {
                    button,
                    position,
                    modifiers,
                } => {
                    self.process_button_down(button, position, modifiers);
                }
                PlatformEvent::ButtonUp {
                    button,
                    position,
                    modifiers,
                } => {
                    self.process_button_up(button, position, modifiers);
                }
                PlatformEvent::MouseMove {
                    position,
                    buttons,
                    modifiers,
                } => {
                    self.process_mouse_move(position, buttons, modifiers);
                }
                PlatformEvent::Resized { width, height } => {
                    self.process_resize(width, height);
                }
                PlatformEvent::CloseRequested => {
                    self.close();
                    return ControlFlow::Exit;
                }
            }
        }
        ControlFlow::Continue
    }

    /// Process pending events, then redraw
    pub fn step(&mut self) -> ControlFlow {
        let flow = self.process_events();
        if flow == ControlFlow::Continue {
            self.redraw();
        }
        flow
    }

    pub fn close(&mut self) {
        tracing::debug!(target: "pipeview::window", caption = %self.backend.caption(), "closing");
        self.backend.close();
    }

    pub fn is_closed(&self) -> bool {
        self.backend.is_closed()
    }

    fn send(&self, slot: &Slot, signal: Signal) -> bool {
        let kind = signal.kind();
        let processed = slot.emit(signal);
        tracing::trace!(target: "pipeview::window", ?kind, processed, "event");
        processed
    }

    // =========================================================================
    // Drawing
    // =========================================================================

    /// Pull the scene and draw it if it changed
    ///
    /// Returns whether a frame was presented. A backend that cannot draw is
    /// reported to the context's diagnostics and the frame is skipped; the
    /// next redraw tries again.
    pub fn redraw(&mut self) -> bool {
        match self.try_redraw() {
            Ok(drawn) => drawn,
            Err(err) => {
                tracing::warn!(target: "pipeview::window", "frame skipped: {err}");
                self.core.context().report(Diagnostic::new(
                    DiagnosticKind::RenderBackendUnavailable,
                    self.core.name(),
                    err.to_string(),
                ));
                false
            }
        }
    }

    /// [`redraw`](Self::redraw) without recovering render errors
    pub fn try_redraw(&mut self) -> Result<bool> {
        if self.backend.is_closed() {
            return Ok(false);
        }
        if self.modified.replace(false) {
            self.update.emit(Signal::update());
        }

        let painter = self.painter.get();
        if painter.is_some() != self.showing_painter {
            self.content_changed.set(true);
        }
        if !self.content_changed.get() {
            return Ok(false);
        }

        self.draw(painter.as_ref())?;
        self.backend.present();
        self.showing_painter = painter.is_some();
        self.content_changed.set(false);
        self.frames += 1;
        tracing::trace!(target: "pipeview::window", frame = self.frames, "presented");
        Ok(true)
    }

    fn draw(&mut self, painter: Option<&PainterRef>) -> std::result::Result<(), RenderError> {
        let region = self.region.get();
        let resolution = self.resolution;
        let canvas = self.backend.canvas();
        canvas.check()?;
        canvas.clear(self.background);

        let Some(painter) = painter else {
            return Ok(());
        };
        if region.is_empty() {
            return Ok(());
        }
        let pixels_per_unit = Point::new(
            resolution.width / region.width(),
            resolution.height / region.height(),
        );
        let to_pixels = Affine2D::scale(pixels_per_unit.x, pixels_per_unit.y)
            .then_after(&Affine2D::translation(-region.min_x(), -region.min_y()));

        canvas.push_transform(to_pixels);
        let drawn = painter.draw(canvas, &region, pixels_per_unit);
        canvas.pop_transform();
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeview_core::{CollectingSink, DrawCommand, NodeId, OutputPort};
    use pipeview_platform::HeadlessWindow;
    use pipeview_views::{RectView, ZoomView};
    use std::cell::RefCell;

    fn headless(width: u32, height: u32) -> HeadlessWindow {
        HeadlessWindow::new(&WindowConfig::new("test").size(width, height))
    }

    fn window(ctx: &Context) -> Window<HeadlessWindow> {
        Window::new(headless(200, 100), Color::WHITE, ctx)
    }

    fn fills(frame: &[DrawCommand]) -> Vec<Rect> {
        frame
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillRect { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_new_producer_receives_region() {
        let ctx = Context::new();
        let window = window(&ctx);
        let out = OutputPort::<PainterRef>::new("painter", NodeId::next(), &ctx);
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = seen.clone();
            out.port()
                .register_callback(SignalKind::Resize, NodeId::next(), move |s| {
                    seen.borrow_mut().extend(s.rect())
                });
        }
        window.attach(&out).unwrap();
        assert_eq!(*seen.borrow(), vec![Rect::new(0.0, 0.0, 200.0, 100.0)]);
    }

    #[test]
    fn test_redraw_only_after_change() {
        let ctx = Context::new();
        let mut window = window(&ctx);
        let rect = RectView::new(Rect::new(0.0, 0.0, 20.0, 10.0), Color::BLUE, &ctx);
        window.attach(rect.output()).unwrap();

        assert!(window.redraw());
        assert!(!window.redraw());
        assert_eq!(window.frames(), 1);

        rect.set_rect(Rect::new(0.0, 0.0, 30.0, 10.0));
        assert!(window.needs_redraw());
        assert!(window.redraw());
        let frame = window.backend().last_frame().unwrap();
        assert_eq!(frame[0], DrawCommand::Clear(Color::WHITE));
        assert_eq!(fills(frame), vec![Rect::new(0.0, 0.0, 30.0, 10.0)]);
        assert!(!window.redraw());
    }

    #[test]
    fn test_empty_window_draws_background_once() {
        let ctx = Context::new();
        let mut window = window(&ctx);
        assert!(window.redraw());
        assert_eq!(
            window.backend().last_frame(),
            Some(&[DrawCommand::Clear(Color::WHITE)][..])
        );
        assert!(!window.redraw());

        window.set_background(Color::BLACK);
        assert!(window.redraw());
    }

    #[test]
    fn test_disconnect_clears_frame() {
        let ctx = Context::new();
        let mut window = window(&ctx);
        let rect = RectView::new(Rect::new(0.0, 0.0, 20.0, 10.0), Color::BLUE, &ctx);
        let link = window.attach(rect.output()).unwrap();
        window.redraw();

        link.disconnect();
        assert!(window.redraw());
        assert!(fills(window.backend().last_frame().unwrap()).is_empty());
    }

    #[test]
    fn test_unavailable_backend_skips_frame() {
        let sink = Rc::new(CollectingSink::new());
        let ctx = Context::with_sink(sink.clone());
        let mut window = window(&ctx);
        window.backend_mut().set_surface_available(false);

        assert!(!window.redraw());
        assert_eq!(sink.count(DiagnosticKind::RenderBackendUnavailable), 1);
        assert!(window.backend().frames().is_empty());
        assert!(matches!(
            window.try_redraw(),
            Err(crate::AppError::Render(RenderError::BackendUnavailable(_)))
        ));

        window.backend_mut().set_surface_available(true);
        assert!(window.redraw());
        assert_eq!(window.frames(), 1);
    }

    #[test]
    fn test_events_reach_the_scene() {
        let ctx = Context::new();
        let mut window = window(&ctx);
        let zoom = ZoomView::new(&ctx);
        let rect = RectView::new(Rect::new(0.0, 0.0, 100.0, 100.0), Color::BLUE, &ctx);
        connect(rect.output(), zoom.input()).unwrap();
        window.attach(zoom.output()).unwrap();
        window.redraw();

        assert!(window.process_button_down(
            MouseButton::WheelUp,
            Point::new(50.0, 50.0),
            Modifiers::CTRL
        ));
        assert!((zoom.scale() - 1.1).abs() < 1e-9);
        assert!(!window.process_button_down(
            MouseButton::WheelUp,
            Point::new(50.0, 50.0),
            Modifiers::NONE
        ));

        assert!(window.redraw());
        assert!(!window.redraw());
    }

    #[test]
    fn test_process_events_dispatches_and_exits() {
        let ctx = Context::new();
        let mut window = window(&ctx);
        let zoom = ZoomView::new(&ctx);
        let rect = RectView::new(Rect::new(0.0, 0.0, 100.0, 100.0), Color::BLUE, &ctx);
        connect(rect.output(), zoom.input()).unwrap();
        window.attach(zoom.output()).unwrap();
        assert_eq!(window.step(), ControlFlow::Continue);

        let backend = window.backend_mut();
        backend.push_event(PlatformEvent::ButtonDown {
            button: MouseButton::WheelUp,
            position: Point::new(0.0, 0.0),
            modifiers: Modifiers::CTRL,
        });
        backend.push_event(PlatformEvent::Resized {
            width: 400,
            height: 300,
        });
        assert_eq!(window.step(), ControlFlow::Continue);
        assert!((zoom.scale() - 1.1).abs() < 1e-9);
        assert_eq!(window.region(), Rect::new(0.0, 0.0, 400.0, 300.0));
        assert_eq!(window.frames(), 2);

        window.backend_mut().push_event(PlatformEvent::CloseRequested);
        assert_eq!(window.process_events(), ControlFlow::Exit);
        assert!(window.is_closed());
        assert_eq!(window.step(), ControlFlow::Exit);
    }

    #[test]
    fn test_open_from_config() {
        let ctx = Context::new();
        let config = WindowConfig::new("viewer")
            .size(64, 48)
            .background(Color::GRAY);
        let window = Window::open(&config, &ctx).unwrap();
        assert_eq!(window.resolution(), Size::new(64.0, 48.0));
        assert_eq!(window.background(), Color::GRAY);
        assert_eq!(window.backend().caption(), "viewer");

        let native = config.backend(pipeview_platform::Backend::Native);
        assert!(matches!(
            Window::open(&native, &ctx),
            Err(crate::AppError::Platform(_))
        ));
    }

    #[test]
    fn test_pixels_map_to_region() {
        let ctx = Context::new();
        let mut window = window(&ctx);
        window.region.set(Rect::new(10.0, 20.0, 100.0, 50.0));
        assert!(window
            .to_region(Point::new(200.0, 100.0))
            .approx_eq(Point::new(110.0, 70.0), 1e-9));
        window.process_resize(0, 0);
        assert_eq!(window.to_region(Point::new(5.0, 5.0)), Point::ZERO);
    }
}
