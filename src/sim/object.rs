//! Game objects
//!
//! One struct covers every role an object can play on a map: sprite,
//! trigger, reference point/path or bounds region. Roles come from list
//! membership, not from the object itself.

use std::cell::OnceCell;
use std::collections::{BTreeMap, HashSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{Collider, CollisionType};
use super::geometry::Rect;

slotmap::new_key_type! {
    /// Stable handle to an object in the world arena
    pub struct ObjectId;
}

/// Authoring-tool custom data attached to an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Ints widen to floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(i) => Some(*i as f64),
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Tile image backing an object
///
/// `tileset` and `tile_number` are map independent; `gid` is only valid on
/// the map named by the object's `map_name` and is recomputed on every add.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRef {
    pub tileset: String,
    pub tile_number: u32,
    pub gid: u32,
}

/// Active movement descriptor; at most one per object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Move {
    /// Straight line toward `dest` at `speed` px/s
    Linear {
        dest: Vec2,
        speed: f32,
        #[serde(default)]
        slide: bool,
    },
    /// Circle around the reference object `center`
    ///
    /// `speed` is px/s along the circumference; negative goes the other way.
    Orbit {
        center: String,
        radius: f32,
        angle: f32,
        speed: f32,
        #[serde(default)]
        bounce: bool,
    },
    /// Travel along the reference polyline/polygon `path`
    ///
    /// `fraction` is the position along the path in [0, 1].
    Poly {
        path: String,
        #[serde(default)]
        fraction: f32,
        speed: f32,
        #[serde(default)]
        bounce: bool,
    },
}

/// Tag of a [`Move`], used to route movers to their mechanic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MoveKind {
    Linear,
    Orbit,
    Poly,
}

impl MoveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveKind::Linear => "Linear",
            MoveKind::Orbit => "Orbit",
            MoveKind::Poly => "Poly",
        }
    }
}

impl Move {
    pub fn kind(&self) -> MoveKind {
        match self {
            Move::Linear { .. } => MoveKind::Linear,
            Move::Orbit { .. } => MoveKind::Orbit,
            Move::Poly { .. } => MoveKind::Poly,
        }
    }
}

/// Cumulative distance table for a path
#[derive(Debug, Clone, PartialEq)]
pub struct PathMetrics {
    /// Distance from the first point to each vertex; polygons end with an
    /// extra entry for the closing edge back to the first point
    pub cumulative: Vec<f32>,
    pub total: f32,
}

/// Polyline or polygon points, relative to the owning object's x/y
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolyShape {
    pub points: Vec<Vec2>,
    #[serde(default)]
    pub closed: bool,
    #[serde(skip)]
    metrics: OnceCell<PathMetrics>,
}

impl PolyShape {
    pub fn new(points: Vec<Vec2>, closed: bool) -> Self {
        Self {
            points,
            closed,
            metrics: OnceCell::new(),
        }
    }

    /// Path length table, computed on first use
    pub fn metrics(&self) -> &PathMetrics {
        self.metrics.get_or_init(|| {
            let mut cumulative = Vec::with_capacity(self.points.len() + 1);
            let mut total = 0.0;
            let mut prev: Option<Vec2> = None;
            for p in &self.points {
                if let Some(q) = prev {
                    total += q.distance(*p);
                }
                cumulative.push(total);
                prev = Some(*p);
            }
            if self.closed && self.points.len() > 2 {
                total += self.points[self.points.len() - 1].distance(self.points[0]);
                cumulative.push(total);
            }
            PathMetrics { cumulative, total }
        })
    }

    /// Point `distance` along the path (relative to the object origin) and
    /// the heading of the segment it lies on
    pub fn locate(&self, distance: f32) -> Option<(Vec2, f32)> {
        let metrics = self.metrics();
        let n = self.points.len();
        if n == 0 {
            return None;
        }
        if n == 1 || metrics.total <= 0.0 {
            return Some((self.points[0], 0.0));
        }
        let d = distance.clamp(0.0, metrics.total);
        let segments = metrics.cumulative.len() - 1;
        let mut i = 0;
        while i + 1 < segments && metrics.cumulative[i + 1] < d {
            i += 1;
        }
        let a = self.points[i];
        let b = self.points[(i + 1) % n];
        let len = metrics.cumulative[i + 1] - metrics.cumulative[i];
        let t = if len > 0.0 { (d - metrics.cumulative[i]) / len } else { 0.0 };
        Some((a.lerp(b, t), super::geometry::angle(a, b)))
    }
}

/// A single game object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameObject {
    pub name: String,
    /// Free-form type string; trigger handlers are looked up by it
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Logical position; the rect moves with it
    pub anchor: Vec2,
    #[serde(default)]
    pub collision: CollisionType,
    #[serde(default)]
    pub poly: Option<PolyShape>,
    /// Map the object is on, or was last on
    pub map_name: String,
    #[serde(default)]
    pub tile: Option<TileRef>,
    #[serde(default)]
    pub movement: Option<Move>,
    /// Last heading produced by a movement mechanic
    #[serde(default)]
    pub direction: Option<f32>,
    /// Objects that never trigger this one (and that this one never triggers)
    #[serde(default)]
    pub do_not_trigger: HashSet<ObjectId>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl GameObject {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Anchor relative to the rect origin
    #[inline]
    pub fn anchor_offset(&self) -> Vec2 {
        self.anchor - Vec2::new(self.x, self.y)
    }

    pub fn collider(&self) -> Collider<'_> {
        let (points, closed) = match &self.poly {
            Some(poly) => (poly.points.as_slice(), poly.closed),
            None => (&[][..], false),
        };
        Collider {
            rect: self.rect(),
            anchor: self.anchor,
            collision: self.collision,
            points,
            closed,
        }
    }

    pub fn move_kind(&self) -> Option<MoveKind> {
        self.movement.as_ref().map(Move::kind)
    }

    /// Stop moving; safe to call when not moving
    pub fn clear_move(&mut self) {
        self.movement = None;
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.properties.insert(key.into(), value);
    }

    /// Best label for log messages
    pub fn label(&self) -> String {
        if !self.name.is_empty() {
            format!("object with name={}", self.name)
        } else if !self.kind.is_empty() {
            format!("object with type={}", self.kind)
        } else {
            "object".to_string()
        }
    }
}

/// Tile reference given at creation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TileSpec {
    /// Map-relative global tile id
    Gid(u32),
    /// Tileset-relative tile number
    Tile { tileset: String, tile_number: u32 },
}

/// Raw object description, normalized into a [`GameObject`] by
/// `World::check_object`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectDef {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Top-left rect; when absent it is derived from the anchor
    pub rect: Option<Rect>,
    /// Logical position; when absent it is derived from the rect
    pub anchor: Option<Vec2>,
    pub collision: Option<CollisionType>,
    pub poly: Option<PolyShape>,
    pub tile: Option<TileSpec>,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ObjectDef {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn with_rect(mut self, x: f32, y: f32, width: f32, height: f32) -> Self {
        self.rect = Some(Rect::new(x, y, width, height));
        self
    }

    pub fn with_anchor(mut self, x: f32, y: f32) -> Self {
        self.anchor = Some(Vec2::new(x, y));
        self
    }

    pub fn with_collision(mut self, collision: CollisionType) -> Self {
        self.collision = Some(collision);
        self
    }

    pub fn with_poly(mut self, points: Vec<Vec2>, closed: bool) -> Self {
        self.poly = Some(PolyShape::new(points, closed));
        self
    }

    pub fn with_tile(mut self, tile: TileSpec) -> Self {
        self.tile = Some(tile);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}
