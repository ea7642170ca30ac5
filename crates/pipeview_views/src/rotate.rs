//! Rotate adapter
//!
//! Shows its child rotated about the child's centre. The rotation is given
//! as an axis and an angle in degrees; only its projection onto the view
//! plane is drawn, so a rotation about an in-plane axis foreshortens the
//! content and a quarter turn about one shows it edge-on.
//!
//! The reported bounds are the child's bounds moved so that the child's
//! centre sits at the origin. They do not grow with the rotation.

use std::cell::Cell;
use std::rc::Rc;

use pipeview_core::{
    filter_fn, install_protocol, Affine2D, Canvas, Change, Context, Direction, FilterFault,
    FilterVerdict, InputPort, NodeCore, OutputPort, Painter, PainterRef, Point, Port, Process,
    Rect, RenderError, SignalKind,
};
use smallvec::smallvec;

use crate::relay::relay;

/// Axis and angle of a rotation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rotation {
    pub axis: [f64; 3],
    /// Angle in degrees, counter-clockwise looking down the axis
    pub angle: f64,
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            axis: [0.0, 0.0, 1.0],
            angle: 0.0,
        }
    }
}

impl Rotation {
    pub fn new(x: f64, y: f64, z: f64, angle: f64) -> Self {
        Self {
            axis: [x, y, z],
            angle,
        }
    }

    /// Upper-left 2x2 block of the 3D rotation matrix
    ///
    /// A zero axis is no rotation.
    pub fn projected(&self) -> Affine2D {
        let [x, y, z] = self.axis;
        let norm = (x * x + y * y + z * z).sqrt();
        if norm == 0.0 || !norm.is_finite() {
            return Affine2D::IDENTITY;
        }
        let (kx, ky, kz) = (x / norm, y / norm, z / norm);
        let (s, c) = self.angle.to_radians().sin_cos();
        let t = 1.0 - c;
        Affine2D::linear(
            c + t * kx * kx,
            t * kx * ky - s * kz,
            t * kx * ky + s * kz,
            c + t * ky * ky,
        )
    }
}

/// Child painter drawn rotated about its centre
#[derive(Debug)]
pub struct RotatePainter {
    content: PainterRef,
    center: Point,
    transform: Affine2D,
    bounds: Rect,
}

impl RotatePainter {
    pub fn new(content: PainterRef, rotation: Rotation) -> Self {
        let size = content.bounds();
        let center = size.center();
        tracing::trace!(target: "pipeview::rotate", ?size, ?center, "content placed");
        Self {
            transform: rotation
                .projected()
                .then_after(&Affine2D::translation(-center.x, -center.y)),
            bounds: size.translate(-center),
            center,
            content,
        }
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn transform(&self) -> Affine2D {
        self.transform
    }
}

impl Painter for RotatePainter {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn draw(&self, canvas: &mut dyn Canvas, roi: &Rect, resolution: Point) -> Result<(), RenderError> {
        // edge-on there is no inverse; draw everything
        let local = self
            .transform
            .invert()
            .map_or_else(|| self.content.bounds(), |inverse| inverse.transform_rect(roi));

        canvas.push_transform(self.transform);
        let drawn = self.content.draw(canvas, &local, resolution);
        canvas.pop_transform();
        drawn
    }
}

/// Rotation adapter around one child
pub struct RotateView {
    core: NodeCore,
    content: InputPort<PainterRef>,
    painter: OutputPort<PainterRef>,
    rotation: Cell<Rotation>,
}

impl RotateView {
    pub fn new(ctx: &Context) -> Rc<Self> {
        let core = NodeCore::new("rotate", ctx);
        let content = core.add_input("painter");
        let painter = core.add_output::<PainterRef>("painter");
        painter.set(crate::painters::empty_painter());

        let view = Rc::new(Self {
            core,
            content,
            painter,
            rotation: Cell::new(Rotation::default()),
        });
        install_protocol(&view);

        let weak = Rc::downgrade(&view);
        view.content
            .port()
            .register_callback(SignalKind::InputSet, view.core.id(), move |_| {
                if let Some(view) = weak.upgrade() {
                    view.filter_new_content();
                }
            });
        for kind in [SignalKind::Input, SignalKind::Resize] {
            relay(&view, view.painter.port(), kind, |rotate: &RotateView| {
                smallvec![rotate.content.port().clone()]
            });
        }
        view
    }

    pub fn input(&self) -> &Port {
        self.content.port()
    }

    pub fn output(&self) -> &Port {
        self.painter.port()
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation.get()
    }

    /// Rotate by `angle` degrees about the axis `(x, y, z)`
    pub fn set_rotation(&self, x: f64, y: f64, z: f64, angle: f64) {
        let rotation = Rotation::new(x, y, z, angle);
        if self.rotation.get() == rotation {
            return;
        }
        tracing::debug!(target: "pipeview::rotate", ?rotation, "rotation changed");
        self.rotation.set(rotation);
        self.core.set_dirty();
    }

    /// Map a point in rotate space to child space
    pub fn invert(&self, point: Point) -> Result<Point, FilterFault> {
        let center = self
            .content
            .get()
            .map_or(Point::ZERO, |painter| painter.bounds().center());
        let rotation = self.rotation.get();
        let inverse = rotation.projected().invert().ok_or_else(|| {
            FilterFault::new(format!(
                "rotation by {} degrees about {:?} is edge-on",
                rotation.angle, rotation.axis
            ))
        })?;
        Ok(inverse.transform_point(point) + center)
    }

    fn filter_new_content(self: &Rc<Self>) {
        let Some(link) = self.content.port().connection() else {
            return;
        };
        let to_child = Rc::downgrade(self);
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
                    filter_fn(|signal| {
                        signal.map_rect(|r| Ok(r.translate(-r.center())))?;
                        Ok(FilterVerdict::Forward)
                    }),
                )
            });
        if let Err(err) = attached {
            tracing::warn!(target: "pipeview::rotate", "could not filter new content: {err}");
        }
    }
}

impl Process for RotateView {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn update_outputs(&self) -> Change {
        let old = self.painter.value().map_or(Rect::ZERO, |p| p.bounds());
        let painter: PainterRef = match self.content.get() {
            Some(content) => Rc::new(RotatePainter::new(content, self.rotation.get())),
            None => crate::painters::empty_painter(),
        };
        let new = painter.bounds();
        self.painter.set(painter);
        Change::between(old, new)
    }
}
