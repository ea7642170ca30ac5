//! Off-screen window backend
//!
//! Events are queued by the host (or a test) with
//! [`HeadlessWindow::push_event`]; frames are recorded with a
//! [`RecordingCanvas`] and kept after [`present`](WindowBase::present).

use std::collections::VecDeque;

use pipeview_core::{Canvas, DrawCommand, RecordingCanvas, Size};

use crate::event::PlatformEvent;
use crate::window::{WindowBase, WindowConfig};

/// Window without a screen
#[derive(Debug)]
pub struct HeadlessWindow {
    caption: String,
    resolution: Size,
    closed: bool,
    queue: VecDeque<PlatformEvent>,
    canvas: RecordingCanvas,
    frames: Vec<Vec<DrawCommand>>,
}

impl HeadlessWindow {
    pub fn new(config: &WindowConfig) -> Self {
        let resolution = config.resolution();
        Self {
            caption: config.caption.clone(),
            resolution,
            closed: false,
            queue: VecDeque::new(),
            canvas: RecordingCanvas::new(resolution),
            frames: Vec::new(),
        }
    }

    /// Queue an event for the next poll
    ///
    /// `Resized` takes effect on the window's resolution immediately, as a
    /// native window would have already changed size when it reports it.
    pub fn push_event(&mut self, event: PlatformEvent) {
        if let PlatformEvent::Resized { width, height } = event {
            self.resolution = Size::new(f64::from(width), f64::from(height));
            self.canvas.set_viewport(self.resolution);
        }
        self.queue.push_back(event);
    }

    /// Simulate a lost rendering surface
    pub fn set_surface_available(&mut self, available: bool) {
        self.canvas.set_available(available);
    }

    /// Every presented frame, oldest first
    pub fn frames(&self) -> &[Vec<DrawCommand>] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&[DrawCommand]> {
        self.frames.last().map(Vec::as_slice)
    }
}

impl WindowBase for HeadlessWindow {
    fn caption(&self) -> &str {
        &self.caption
    }

    fn resolution(&self) -> Size {
        self.resolution
    }

    fn close(&mut self) {
        if !self.closed {
            tracing::debug!(target: "pipeview::platform", caption = %self.caption, "closing headless window");
        }
        self.closed = true;
        self.queue.clear();
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn poll_events(&mut self) -> Vec<PlatformEvent> {
        self.queue.drain(..).collect()
    }

    fn canvas(&mut self) -> &mut dyn Canvas {
        &mut self.canvas
    }

    fn present(&mut self) {
        let frame = self.canvas.take_commands();
        self.canvas.reset();
        self.frames.push(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeview_core::{Color, Key, Modifiers};

    #[test]
    fn test_poll_drains_queue() {
        let mut window = HeadlessWindow::new(&WindowConfig::default());
        window.push_event(PlatformEvent::KeyDown {
            key: Key::R,
            modifiers: Modifiers::NONE,
        });
        window.push_event(PlatformEvent::CloseRequested);
        assert_eq!(window.poll_events().len(), 2);
        assert!(window.poll_events().is_empty());
    }

    #[test]
    fn test_resize_updates_resolution() {
        let mut window = HeadlessWindow::new(&WindowConfig::default().size(100, 50));
        assert_eq!(window.resolution(), Size::new(100.0, 50.0));
        window.push_event(PlatformEvent::Resized {
            width: 200,
            height: 80,
        });
        assert_eq!(window.resolution(), Size::new(200.0, 80.0));
    }

    #[test]
    fn test_present_keeps_frames() {
        let mut window = HeadlessWindow::new(&WindowConfig::default());
        window.canvas().clear(Color::BLACK);
        window.present();
        window.present();
        assert_eq!(window.frames().len(), 2);
        assert_eq!(window.frames()[0], vec![DrawCommand::Clear(Color::BLACK)]);
        assert_eq!(window.last_frame(), Some(&[][..]));
    }
}
