//! Container view
//!
//! Combines any number of child painters into one. Each child gets an input
//! port (`painter0`, `painter1`, ...) and a place computed by a [`Placing`]
//! strategy from the children's bounds. Input signals reaching the
//! container's output are passed to every child, with pointer positions
//! moved into the child's own space by a backward [`OffsetFilter`] on the
//! child's connection.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use pipeview_core::{
    connect, install_protocol, watch_input, Affine2D, Canvas, Change, Connection, Context,
    Direction, GraphError, InputPort, NodeCore, OffsetFilter, OutputPort, Painter, PainterRef,
    Point, Port, PortDirection, Process, Rect, RenderError, Result, SignalKind, ValueType,
};
use smallvec::SmallVec;

use crate::relay::relay;

/// How a container places its children
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Placing {
    /// Left to right, top edges aligned
    Horizontal { spacing: f64 },
    /// Top to bottom, left edges aligned
    Vertical { spacing: f64 },
    /// All children on top of each other, untranslated
    Overlay,
}

impl Default for Placing {
    fn default() -> Self {
        Placing::Horizontal { spacing: 0.0 }
    }
}

impl Placing {
    pub fn horizontal() -> Self {
        Placing::Horizontal { spacing: 0.0 }
    }

    pub fn vertical() -> Self {
        Placing::Vertical { spacing: 0.0 }
    }

    /// Offset for each child, given its bounds
    ///
    /// Children without content (`None`) get a zero offset and take no room.
    pub fn place(&self, bounds: &[Option<Rect>]) -> SmallVec<[Point; 4]> {
        let mut cursor = 0.0;
        let mut placed_any = false;
        bounds
            .iter()
            .map(|rect| {
                let Some(rect) = rect else {
                    return Point::ZERO;
                };
                match *self {
                    Placing::Overlay => Point::ZERO,
                    Placing::Horizontal { spacing } => {
                        if placed_any {
                            cursor += spacing;
                        }
                        placed_any = true;
                        let offset = Point::new(cursor - rect.min_x(), -rect.min_y());
                        cursor += rect.width();
                        offset
                    }
                    Placing::Vertical { spacing } => {
                        if placed_any {
                            cursor += spacing;
                        }
                        placed_any = true;
                        let offset = Point::new(-rect.min_x(), cursor - rect.min_y());
                        cursor += rect.height();
                        offset
                    }
                }
            })
            .collect()
    }
}

/// Children's painters drawn at their offsets
#[derive(Debug, Default)]
pub struct ContainerPainter {
    parts: Vec<(Point, PainterRef)>,
    bounds: Rect,
}

impl ContainerPainter {
    pub fn parts(&self) -> &[(Point, PainterRef)] {
        &self.parts
    }
}

impl Painter for ContainerPainter {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn draw(&self, canvas: &mut dyn Canvas, roi: &Rect, resolution: Point) -> std::result::Result<(), RenderError> {
        for (offset, painter) in &self.parts {
            let local = roi.translate(-*offset);
            if !local.intersects(&painter.bounds()) {
                continue;
            }
            canvas.push_transform(Affine2D::translation(offset.x, offset.y));
            let drawn = painter.draw(canvas, &local, resolution);
            canvas.pop_transform();
            drawn?;
        }
        Ok(())
    }
}

struct Part {
    input: InputPort<PainterRef>,
    offset: Rc<Cell<Point>>,
}

/// Composite laying out child views
pub struct ContainerView {
    core: NodeCore,
    placing: Placing,
    painter: OutputPort<PainterRef>,
    parts: RefCell<Vec<Part>>,
}

impl ContainerView {
    pub fn new(placing: Placing, ctx: &Context) -> Rc<Self> {
        let core = NodeCore::new("container", ctx);
        let painter = core.add_output::<PainterRef>("painter");
        painter.set(Rc::new(ContainerPainter::default()));
        let view = Rc::new(Self {
            core,
            placing,
            painter,
            parts: RefCell::new(Vec::new()),
        });
        install_protocol(&view);
        relay(&view, view.painter.port(), SignalKind::Input, |c: &ContainerView| {
            c.child_inputs()
        });
        view
    }

    pub fn placing(&self) -> Placing {
        self.placing
    }

    /// Add a child, fed from `producer`
    pub fn add_input(self: &Rc<Self>, producer: impl AsRef<Port>) -> Result<Connection> {
        let producer = producer.as_ref();
        let name = format!("painter{}", self.parts.borrow().len());

        // check before the input exists so a bad producer leaves no dangling port
        if producer.direction() != PortDirection::Output {
            return Err(GraphError::DirectionMismatch {
                port: producer.name().to_string(),
                expected: PortDirection::Output,
            });
        }
        let expected = ValueType::of::<PainterRef>();
        if producer.value_type() != expected {
            return Err(GraphError::TypeMismatch {
                output: producer.name().to_string(),
                input: name,
                expected: expected.name(),
                found: producer.value_type().name(),
            });
        }

        let input = self.core.add_input::<PainterRef>(&name);
        watch_input(self, input.port());
        let offset = Rc::new(Cell::new(Point::ZERO));
        self.parts.borrow_mut().push(Part {
            input: input.clone(),
            offset: offset.clone(),
        });

        let link = connect(producer, &input)?;
        link.attach_filter(Direction::Backward, OffsetFilter::shared(offset))?;
        tracing::debug!(target: "pipeview::container", input = %name, "child added");
        Ok(link)
    }

    /// Number of children
    pub fn len(&self) -> usize {
        self.parts.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.borrow().is_empty()
    }

    /// Current offset of child `index`
    pub fn offset(&self, index: usize) -> Option<Point> {
        self.parts.borrow().get(index).map(|p| p.offset.get())
    }

    pub fn output(&self) -> &Port {
        self.painter.port()
    }

    fn child_inputs(&self) -> SmallVec<[Port; 4]> {
        self.parts
            .borrow()
            .iter()
            .map(|part| part.input.port().clone())
            .collect()
    }
}

impl Process for ContainerView {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn update_outputs(&self) -> Change {
        let old = self.painter.value().map_or(Rect::ZERO, |p| p.bounds());

        let parts = self.parts.borrow();
        let painters: SmallVec<[Option<PainterRef>; 4]> =
            parts.iter().map(|part| part.input.get()).collect();
        let bounds: SmallVec<[Option<Rect>; 4]> = painters
            .iter()
            .map(|painter| painter.as_ref().map(|p| p.bounds()))
            .collect();
        let offsets = self.placing.place(&bounds);

        let mut placed = Vec::with_capacity(parts.len());
        let mut union = Rect::ZERO;
        for ((part, painter), offset) in parts.iter().zip(painters).zip(offsets) {
            part.offset.set(offset);
            if let Some(painter) = painter {
                union = union.union(&painter.bounds().translate(offset));
                placed.push((offset, painter));
            }
        }
        tracing::trace!(target: "pipeview::container", children = placed.len(), ?union, "recombined");

        self.painter.set(Rc::new(ContainerPainter {
            parts: placed,
            bounds: union,
        }));
        Change::between(old, union)
    }
}
