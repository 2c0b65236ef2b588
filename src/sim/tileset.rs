//! Tileset metadata
//!
//! Only what the simulation needs: tile counts for gid lookups and the
//! anchor point each tile image places its object at.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tileset {
    pub name: String,
    pub tile_width: f32,
    pub tile_height: f32,
    pub tile_count: u32,
    /// Anchor for every tile in the set, relative to the tile's top-left
    #[serde(default)]
    pub anchor: Option<Vec2>,
    /// Per-tile anchor overrides
    #[serde(default)]
    pub tile_anchors: BTreeMap<u32, Vec2>,
}

impl Tileset {
    pub fn new(name: impl Into<String>, tile_width: f32, tile_height: f32, tile_count: u32) -> Self {
        Self {
            name: name.into(),
            tile_width,
            tile_height,
            tile_count,
            anchor: None,
            tile_anchors: BTreeMap::new(),
        }
    }

    /// Most specific anchor for a tile: the tile's own, then the tileset's,
    /// then the tile centre
    pub fn anchor_for(&self, tile_number: u32) -> Vec2 {
        self.tile_anchors
            .get(&tile_number)
            .copied()
            .or(self.anchor)
            .unwrap_or(Vec2::new(self.tile_width / 2.0, self.tile_height / 2.0))
    }
}

/// A tileset as used by one map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilesetRef {
    pub name: String,
    pub first_gid: u32,
    pub tile_count: u32,
}

impl TilesetRef {
    #[inline]
    pub fn contains(&self, gid: u32) -> bool {
        gid >= self.first_gid && gid - self.first_gid < self.tile_count
    }
}
