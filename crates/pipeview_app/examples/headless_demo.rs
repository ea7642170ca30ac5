//! Headless Scene Demo
//!
//! Builds a small scene and drives it through a headless window with a
//! scripted sequence of platform events.
//!
//! Scene:
//! - a labelled switch above a rotated rectangle, stacked in a container
//! - the container inside a zoom fitted to the window
//!
//! Run with: RUST_LOG=pipeview=debug cargo run -p pipeview_app --example headless_demo

use pipeview_app::prelude::*;
use pipeview_core::{
    connect, ButtonsHeld, Color, Context, Key, Modifiers, MouseButton, Point, Rect, TracingSink,
};
use pipeview_platform::HeadlessWindow;
use pipeview_views::{ContainerView, Placing, RectView, RotateView, Switch, ZoomView};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let ctx = Context::with_sink(Rc::new(TracingSink));
    let config = WindowConfig::new("Headless Scene Demo")
        .size(640, 480)
        .background(Color::rgb(0.95, 0.95, 0.9));
    let mut window = Window::new(HeadlessWindow::new(&config), config.background, &ctx);

    // Build the scene
    let switch = Switch::new("rotate", &ctx)?;
    let rect = RectView::new(Rect::new(0.0, 0.0, 120.0, 60.0), Color::BLUE, &ctx);
    let rotate = RotateView::new(&ctx);
    connect(rect.output(), rotate.input())?;

    let column = ContainerView::new(Placing::Vertical { spacing: 8.0 }, &ctx);
    column.add_input(switch.painter())?;
    column.add_input(rotate.output())?;

    let zoom = ZoomView::autoscaled(&ctx);
    connect(column.output(), zoom.input())?;
    window.attach(zoom.output())?;

    // Script some input
    let script = [
        PlatformEvent::ButtonDown {
            button: MouseButton::WheelUp,
            position: Point::new(320.0, 240.0),
            modifiers: Modifiers::CTRL,
        },
        PlatformEvent::ButtonDown {
            button: MouseButton::Left,
            position: Point::new(300.0, 200.0),
            modifiers: Modifiers::CTRL,
        },
        PlatformEvent::MouseMove {
            position: Point::new(320.0, 210.0),
            buttons: ButtonsHeld::LEFT,
            modifiers: Modifiers::CTRL,
        },
        PlatformEvent::ButtonUp {
            button: MouseButton::Left,
            position: Point::new(320.0, 210.0),
            modifiers: Modifiers::CTRL,
        },
        PlatformEvent::Resized {
            width: 800,
            height: 600,
        },
        PlatformEvent::KeyDown {
            key: Key::R,
            modifiers: Modifiers::NONE,
        },
    ];

    let mut angle = 0.0;
    for event in script {
        window.backend_mut().push_event(event);
        if window.step() == ControlFlow::Exit {
            break;
        }
        if switch.value() {
            angle += 15.0;
            rotate.set_rotation(0.0, 0.0, 1.0, angle);
        }
        tracing::info!(
            frames = window.frames(),
            scale = zoom.scale(),
            shift = ?zoom.shift(),
            switch = switch.value(),
            "step"
        );
    }

    window.backend_mut().push_event(PlatformEvent::CloseRequested);
    while window.step() == ControlFlow::Continue {}

    tracing::info!(
        frames = window.backend().frames().len(),
        "closed after presenting frames"
    );
    Ok(())
}
