//! Deterministic map simulation
//!
//! All simulation logic lives here:
//! - Fixed timestep only
//! - Maps stepped in name order, handlers in priority order
//! - Objects referenced by stable arena ids
//! - No I/O beyond the scenario loader

pub mod collision;
pub mod dispatch;
pub mod geometry;
pub mod map;
pub mod object;
pub mod scenario;
pub mod tick;
pub mod tileset;
pub mod world;

pub use collision::{Collider, CollisionType, Overlap, collides};
pub use dispatch::{Dispatcher, Phase, Registry, TriggerFlow};
pub use geometry::{Facing, Rect};
pub use map::{Layer, Map, MapId};
pub use object::{GameObject, Move, MoveKind, ObjectDef, ObjectId, PropertyValue, TileSpec};
pub use scenario::Scenario;
pub use tick::{MapStats, Simulation, TickReport};
pub use tileset::Tileset;
pub use world::{ObjectQuery, World};
