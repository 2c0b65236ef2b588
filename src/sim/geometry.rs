//! Geometry primitives
//!
//! All angles are radians in [0, 2π), starting at 3 o'clock and increasing
//! clockwise (screen space, +y points down).

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use crate::{normalize_angle, project};

/// Distance between two points
#[inline]
pub fn distance(a: Vec2, b: Vec2) -> f32 {
    (b - a).length()
}

/// Heading from `from` to `to`, normalized to [0, 2π)
#[inline]
pub fn angle(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    normalize_angle(d.y.atan2(d.x))
}

/// Vector orthogonal to `v`: (x, y) -> (y, -x)
#[inline]
pub fn ortho(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}

/// Reflect `v` off a surface running along `surface`
///
/// The surface normal is `ortho(surface)` normalized; standard reflection
/// v' = v - 2(v·n)n.
#[inline]
pub fn reflect(v: Vec2, surface: Vec2) -> Vec2 {
    let normal = ortho(surface).normalize_or_zero();
    v - 2.0 * v.dot(normal) * normal
}

/// Axis-aligned rectangle, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Zero width and height
    #[inline]
    pub fn is_point(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }

    /// Top-left, top-right, bottom-right, bottom-left
    pub fn corners(&self) -> [Vec2; 4] {
        let (min, max) = (self.min(), self.max());
        [min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)]
    }

    /// Edges as segments, clockwise from the top edge
    pub fn edges(&self) -> [(Vec2, Vec2); 4] {
        let [tl, tr, br, bl] = self.corners();
        [(tl, tr), (tr, br), (br, bl), (bl, tl)]
    }

    /// Closed containment: points on the border are inside
    #[inline]
    pub fn contains_point(&self, p: Vec2) -> bool {
        self.x <= p.x && p.x <= self.x + self.width && self.y <= p.y && p.y <= self.y + self.height
    }

    /// Closed containment of a whole rect
    #[inline]
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.contains_point(other.min()) && self.contains_point(other.max())
    }

    /// Open overlap: rects that only touch do not overlap
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Closed overlap, used as a cheap prefilter
    #[inline]
    pub fn touches(&self, other: &Rect) -> bool {
        self.x <= other.x + other.width
            && other.x <= self.x + self.width
            && self.y <= other.y + other.height
            && other.y <= self.y + self.height
    }

    /// Point closest to `p` inside the rect
    #[inline]
    pub fn clamp_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min(), self.max())
    }

    /// Bounding rect of a point set
    pub fn bounding(points: impl IntoIterator<Item = Vec2>) -> Option<Rect> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Rect::new(min.x, min.y, max.x - min.x, max.y - min.y))
    }
}

/// Segment/segment intersection
///
/// Returns `None` for parallel segments (zero denominator) or when the
/// crossing lies outside either segment.
pub fn intersect_line_line(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> Option<Vec2> {
    let d = a2 - a1;
    let e = b2 - b1;
    let denom = d.perp_dot(e);
    if denom == 0.0 {
        return None;
    }
    let w = b1 - a1;
    let t = w.perp_dot(e) / denom;
    let u = w.perp_dot(d) / denom;
    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
        return None;
    }
    Some(a1 + d * t)
}

/// Segment/rect border intersections (0 to 2 points)
pub fn intersect_line_rect(a1: Vec2, a2: Vec2, rect: &Rect) -> Vec<Vec2> {
    let mut points: Vec<Vec2> = Vec::with_capacity(2);
    for (e1, e2) in rect.edges() {
        if let Some(p) = intersect_line_line(a1, a2, e1, e2) {
            // a hit exactly on a corner is reported by both edges
            if !points.iter().any(|q| q.distance_squared(p) < 1e-8) {
                points.push(p);
            }
        }
    }
    points
}

/// Segment/circle intersections (0, 1 for a tangent, or 2 points)
///
/// Only points on the segment itself are returned, not on the infinite line.
pub fn intersect_line_circle(a1: Vec2, a2: Vec2, center: Vec2, radius: f32) -> Vec<Vec2> {
    let p1 = a1 - center;
    let d = a2 - a1;
    let a = d.dot(d);
    if a == 0.0 {
        return Vec::new();
    }
    let b = 2.0 * p1.dot(d);
    let c = p1.dot(p1) - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }

    let ts: Vec<f32> = if disc == 0.0 {
        vec![-b / (2.0 * a)]
    } else {
        let root = disc.sqrt();
        vec![(-b - root) / (2.0 * a), (-b + root) / (2.0 * a)]
    };

    let mut points: Vec<Vec2> = Vec::with_capacity(2);
    for t in ts {
        if (0.0..=1.0).contains(&t) {
            let p = a1 + d * t;
            if !points.iter().any(|q| q.distance_squared(p) < 1e-10) {
                points.push(p);
            }
        }
    }
    points
}

/// Four-way facing label for a heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    Right,
    Down,
    Left,
    Up,
}

impl Facing {
    pub fn from_angle(a: f32) -> Self {
        use std::f32::consts::{FRAC_PI_4, PI, TAU};
        let a = normalize_angle(a);
        if a < FRAC_PI_4 {
            Facing::Right
        } else if a < PI - FRAC_PI_4 {
            Facing::Down
        } else if a < PI + FRAC_PI_4 {
            Facing::Left
        } else if a < TAU - FRAC_PI_4 {
            Facing::Up
        } else {
            Facing::Right
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Facing::Right => "Right",
            Facing::Down => "Down",
            Facing::Left => "Left",
            Facing::Up => "Up",
        }
    }
}
