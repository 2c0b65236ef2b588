//! Typed collision predicate
//!
//! Every map query bottoms out in [`collides`]: a pairwise test between two
//! object views with an optional collision type override per side. Only the
//! pairs anchor-rect, anchor-circle, line-rect, line-circle, rect-rect,
//! rect-circle and circle-circle are supported.
//!
//! Boundaries: rects contain points on their border, rect/rect overlap is
//! open (touching edges do not collide) and circles are open discs.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::{Rect, intersect_line_line};

/// Per-object discriminator selecting the geometric test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionType {
    /// Never collides and never blocks
    None,
    /// The anchor point only
    #[default]
    Anchor,
    /// The bounding rect
    Rect,
    /// Disc of radius width/2 centred on the anchor
    Circle,
    /// Polyline or polygon points
    Line,
}

impl CollisionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollisionType::None => "none",
            CollisionType::Anchor => "anchor",
            CollisionType::Rect => "rect",
            CollisionType::Circle => "circle",
            CollisionType::Line => "line",
        }
    }
}

/// How much of the first operand must overlap the second
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overlap {
    /// Any overlap at all (symmetric)
    #[default]
    Partial,
    /// First operand entirely inside the second
    Full,
}

/// Borrowed geometry of one object, enough to run a collision test
#[derive(Debug, Clone, Copy)]
pub struct Collider<'a> {
    pub rect: Rect,
    pub anchor: Vec2,
    pub collision: CollisionType,
    /// Line points relative to the rect origin
    pub points: &'a [Vec2],
    /// Polygon (adds the closing edge) rather than polyline
    pub closed: bool,
}

impl Collider<'static> {
    pub fn point(p: Vec2) -> Self {
        Self {
            rect: Rect::new(p.x, p.y, 0.0, 0.0),
            anchor: p,
            collision: CollisionType::Anchor,
            points: &[],
            closed: false,
        }
    }

    pub fn rect(rect: Rect) -> Self {
        Self {
            rect,
            anchor: rect.center(),
            collision: CollisionType::Rect,
            points: &[],
            closed: false,
        }
    }

    pub fn circle(center: Vec2, radius: f32) -> Self {
        Self {
            rect: Rect::new(center.x - radius, center.y - radius, radius * 2.0, radius * 2.0),
            anchor: center,
            collision: CollisionType::Circle,
            points: &[],
            closed: false,
        }
    }
}

impl<'a> Collider<'a> {
    /// Same shape with its anchor moved to `anchor`
    pub fn at_anchor(self, anchor: Vec2) -> Self {
        let delta = anchor - self.anchor;
        Self {
            rect: Rect::new(self.rect.x + delta.x, self.rect.y + delta.y, self.rect.width, self.rect.height),
            anchor,
            ..self
        }
    }

    pub fn with_collision(self, collision: CollisionType) -> Self {
        Self { collision, ..self }
    }

    fn shape(&self, collision: CollisionType) -> Option<Shape<'a>> {
        match collision {
            CollisionType::None => None,
            CollisionType::Anchor => Some(Shape::Point(self.anchor)),
            CollisionType::Rect if self.rect.is_point() => Some(Shape::Point(self.rect.min())),
            CollisionType::Rect => Some(Shape::Rect(self.rect)),
            CollisionType::Circle => {
                let radius = self.rect.width / 2.0;
                if radius <= 0.0 {
                    Some(Shape::Point(self.anchor))
                } else {
                    Some(Shape::Circle {
                        center: self.anchor,
                        radius,
                    })
                }
            }
            CollisionType::Line => Some(Shape::Line {
                origin: self.rect.min(),
                points: self.points,
                closed: self.closed,
            }),
        }
    }
}

/// Resolved geometry after overrides and degenerate-shape folding
#[derive(Debug, Clone, Copy)]
enum Shape<'a> {
    Line {
        origin: Vec2,
        points: &'a [Vec2],
        closed: bool,
    },
    Rect(Rect),
    Circle {
        center: Vec2,
        radius: f32,
    },
    Point(Vec2),
}

impl Shape<'_> {
    /// Operand order for partial tests; lower goes first
    fn rank(&self) -> u8 {
        match self {
            Shape::Line { .. } => 0,
            Shape::Rect(_) => 1,
            Shape::Circle { .. } => 2,
            Shape::Point(_) => 3,
        }
    }

    fn bounds(&self) -> Rect {
        match *self {
            Shape::Line { origin, points, .. } => {
                Rect::bounding(points.iter().map(|p| origin + *p)).unwrap_or(Rect::new(origin.x, origin.y, 0.0, 0.0))
            }
            Shape::Rect(r) => r,
            Shape::Circle { center, radius } => {
                Rect::new(center.x - radius, center.y - radius, radius * 2.0, radius * 2.0)
            }
            Shape::Point(p) => Rect::new(p.x, p.y, 0.0, 0.0),
        }
    }

    fn contains_point(&self, p: Vec2) -> bool {
        match *self {
            Shape::Rect(r) => r.contains_point(p),
            Shape::Circle { center, radius } => center.distance_squared(p) < radius * radius,
            Shape::Point(q) => q == p,
            Shape::Line { .. } => false,
        }
    }
}

fn line_points(origin: Vec2, points: &[Vec2]) -> impl Iterator<Item = Vec2> + '_ {
    points.iter().map(move |p| origin + *p)
}

fn line_segments(origin: Vec2, points: &[Vec2], closed: bool) -> Vec<(Vec2, Vec2)> {
    let mut segments: Vec<(Vec2, Vec2)> = points
        .windows(2)
        .map(|w| (origin + w[0], origin + w[1]))
        .collect();
    if closed && points.len() > 2 {
        segments.push((origin + points[points.len() - 1], origin + points[0]));
    }
    segments
}

/// Closest point to `p` on segment `a`-`b`
fn closest_on_segment(a: Vec2, b: Vec2, p: Vec2) -> Vec2 {
    let d = b - a;
    let len2 = d.length_squared();
    if len2 == 0.0 {
        return a;
    }
    let t = ((p - a).dot(d) / len2).clamp(0.0, 1.0);
    a + d * t
}

fn line_hits_rect(origin: Vec2, points: &[Vec2], closed: bool, rect: &Rect) -> bool {
    if line_points(origin, points).any(|p| rect.contains_point(p)) {
        return true;
    }
    line_segments(origin, points, closed).into_iter().any(|(a, b)| {
        rect.edges()
            .iter()
            .any(|(e1, e2)| intersect_line_line(a, b, *e1, *e2).is_some())
    })
}

fn line_hits_circle(origin: Vec2, points: &[Vec2], closed: bool, center: Vec2, radius: f32) -> bool {
    let r2 = radius * radius;
    if points.len() == 1 {
        return (origin + points[0]).distance_squared(center) < r2;
    }
    line_segments(origin, points, closed)
        .into_iter()
        .any(|(a, b)| closest_on_segment(a, b, center).distance_squared(center) < r2)
}

fn partial(a: Shape, b: Shape) -> bool {
    match (a, b) {
        (Shape::Line { origin, points, closed }, Shape::Rect(r)) => line_hits_rect(origin, points, closed, &r),
        (Shape::Line { origin, points, closed }, Shape::Circle { center, radius }) => {
            line_hits_circle(origin, points, closed, center, radius)
        }
        (Shape::Rect(r1), Shape::Rect(r2)) => r1.overlaps(&r2),
        (Shape::Rect(r), Shape::Circle { center, radius }) => {
            r.clamp_point(center).distance_squared(center) < radius * radius
        }
        (Shape::Rect(r), Shape::Point(p)) => r.contains_point(p),
        (Shape::Circle { center: c1, radius: r1 }, Shape::Circle { center: c2, radius: r2 }) => {
            c1.distance_squared(c2) < (r1 + r2) * (r1 + r2)
        }
        (Shape::Circle { center, radius }, Shape::Point(p)) => center.distance_squared(p) < radius * radius,
        (Shape::Point(p), Shape::Point(q)) => p == q,
        _ => false,
    }
}

fn full(a: Shape, b: Shape) -> bool {
    match (a, b) {
        (Shape::Point(p), _) => b.contains_point(p),
        (Shape::Rect(r), _) => r.corners().iter().all(|c| b.contains_point(*c)),
        (Shape::Circle { center, radius }, Shape::Rect(outer)) => {
            outer.contains_rect(&Rect::new(center.x - radius, center.y - radius, radius * 2.0, radius * 2.0))
        }
        (Shape::Circle { center, radius }, Shape::Circle { center: c2, radius: r2 }) => {
            center.distance(c2) + radius <= r2
        }
        (Shape::Line { origin, points, .. }, _) => {
            !points.is_empty() && line_points(origin, points).all(|p| b.contains_point(p))
        }
        _ => false,
    }
}

/// Is a partial test between these two types defined?
pub fn supports_partial(a: CollisionType, b: CollisionType) -> bool {
    use CollisionType::*;
    matches!(
        (a, b),
        (Anchor, Rect)
            | (Rect, Anchor)
            | (Anchor, Circle)
            | (Circle, Anchor)
            | (Line, Rect)
            | (Rect, Line)
            | (Line, Circle)
            | (Circle, Line)
            | (Rect, Rect)
            | (Rect, Circle)
            | (Circle, Rect)
            | (Circle, Circle)
    )
}

/// Does `a` collide with `b`?
///
/// `type_a`/`type_b` replace the objects' own collision types when given.
/// With [`Overlap::Partial`] the test is symmetric. With [`Overlap::Full`]
/// it asks whether `a` lies entirely inside `b`, and only rect or circle can
/// contain. A `None` type on either side never collides. Unsupported pairs
/// log a warning and report no collision.
pub fn collides(
    a: &Collider,
    b: &Collider,
    overlap: Overlap,
    type_a: Option<CollisionType>,
    type_b: Option<CollisionType>,
) -> bool {
    let ta = type_a.unwrap_or(a.collision);
    let tb = type_b.unwrap_or(b.collision);
    let (Some(sa), Some(sb)) = (a.shape(ta), b.shape(tb)) else {
        return false;
    };

    let supported = match overlap {
        Overlap::Partial => supports_partial(ta, tb),
        Overlap::Full => matches!(tb, CollisionType::Rect | CollisionType::Circle),
    };
    if !supported {
        log::warn!(
            "collides: unsupported {:?} test {} vs {}",
            overlap,
            ta.as_str(),
            tb.as_str()
        );
        return false;
    }

    if !sa.bounds().touches(&sb.bounds()) {
        return false;
    }

    match overlap {
        Overlap::Partial => {
            if sa.rank() <= sb.rank() {
                partial(sa, sb)
            } else {
                partial(sb, sa)
            }
        }
        Overlap::Full => full(sa, sb),
    }
}
