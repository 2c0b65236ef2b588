//! Map container
//!
//! A map owns id lists only. Objects themselves live in the world arena, so
//! one object can sit on several lists (a holdable is both a sprite and a
//! trigger) without any shadow copies.

use std::collections::{BTreeMap, HashMap, HashSet};

use glam::Vec2;

use super::geometry::Rect;
use super::object::ObjectId;
use super::tileset::TilesetRef;
use super::world::World;
use crate::error::{SimError, SimResult};

/// Index of a map inside its world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapId(pub(crate) usize);

impl MapId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Object list selector
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    Sprites,
    Triggers,
    /// Static lookup points and paths, never simulated
    Reference,
    InBounds,
    OutOfBounds,
    /// Any other object layer from the authoring tool
    Named(String),
}

impl Layer {
    pub const BUILTIN: [Layer; 5] = [
        Layer::Sprites,
        Layer::Triggers,
        Layer::Reference,
        Layer::InBounds,
        Layer::OutOfBounds,
    ];

    pub fn from_name(name: &str) -> Self {
        match name {
            "sprites" => Layer::Sprites,
            "triggers" => Layer::Triggers,
            "reference" => Layer::Reference,
            "inBounds" => Layer::InBounds,
            "outOfBounds" => Layer::OutOfBounds,
            other => Layer::Named(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Layer::Sprites => "sprites",
            Layer::Triggers => "triggers",
            Layer::Reference => "reference",
            Layer::InBounds => "inBounds",
            Layer::OutOfBounds => "outOfBounds",
            Layer::Named(name) => name,
        }
    }

    /// Layers whose objects are always tested as rects
    pub fn forces_rect(&self) -> bool {
        matches!(self, Layer::Triggers | Layer::InBounds | Layer::OutOfBounds)
    }
}

/// Authoring-order layer descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct LayerInfo {
    pub name: String,
    pub visible: bool,
}

/// Follow-graph edge: `id` tracks its leader at `offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Follower {
    pub id: ObjectId,
    pub offset: Vec2,
}

/// Called when a move fails the location check; returns true if it made
/// room and the move is now valid
pub type BlockedMoveResolver = fn(&mut World, MapId, ObjectId, Vec2) -> bool;

#[derive(Debug, Clone)]
pub struct Map {
    pub name: String,
    /// Size in tiles
    pub width: u32,
    pub height: u32,
    pub tile_width: f32,
    pub tile_height: f32,
    tilesets: Vec<TilesetRef>,

    sprites: Vec<ObjectId>,
    triggers: Vec<ObjectId>,
    reference: Vec<ObjectId>,
    in_bounds: Vec<ObjectId>,
    out_of_bounds: Vec<ObjectId>,
    extra: BTreeMap<String, Vec<ObjectId>>,

    layers: Vec<LayerInfo>,
    visibility: u64,
    changed: bool,

    follow: HashMap<ObjectId, Vec<Follower>>,
    resolvers: Vec<BlockedMoveResolver>,
}

impl Map {
    pub fn new(name: impl Into<String>, width: u32, height: u32, tile_width: f32, tile_height: f32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            tile_width,
            tile_height,
            tilesets: Vec::new(),
            sprites: Vec::new(),
            triggers: Vec::new(),
            reference: Vec::new(),
            in_bounds: Vec::new(),
            out_of_bounds: Vec::new(),
            extra: BTreeMap::new(),
            layers: Vec::new(),
            visibility: 0,
            changed: false,
            follow: HashMap::new(),
            resolvers: Vec::new(),
        }
    }

    pub fn pixel_width(&self) -> f32 {
        self.width as f32 * self.tile_width
    }

    pub fn pixel_height(&self) -> f32 {
        self.height as f32 * self.tile_height
    }

    /// Outer bounds in pixels
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.pixel_width(), self.pixel_height())
    }

    // ---- tiles ----

    pub fn add_tileset(&mut self, name: impl Into<String>, first_gid: u32, tile_count: u32) {
        self.tilesets.push(TilesetRef {
            name: name.into(),
            first_gid,
            tile_count,
        });
    }

    pub fn tilesets(&self) -> &[TilesetRef] {
        &self.tilesets
    }

    pub fn has_tileset(&self, name: &str) -> bool {
        self.tilesets.iter().any(|t| t.name == name)
    }

    /// Map gid -> (tileset name, tileset tile number)
    pub fn find_tile(&self, gid: u32) -> SimResult<(String, u32)> {
        self.tilesets
            .iter()
            .find(|t| t.contains(gid))
            .map(|t| (t.name.clone(), gid - t.first_gid))
            .ok_or_else(|| SimError::UnknownGid {
                gid,
                map: self.name.clone(),
            })
    }

    /// (tileset name, tileset tile number) -> map gid
    pub fn find_gid(&self, tileset: &str, tile_number: u32) -> SimResult<u32> {
        let t = self
            .tilesets
            .iter()
            .find(|t| t.name == tileset)
            .ok_or_else(|| SimError::MissingTileset {
                tileset: tileset.to_string(),
                map: self.name.clone(),
            })?;
        if tile_number >= t.tile_count {
            return Err(SimError::TileOutOfRange {
                tileset: tileset.to_string(),
                tile_number,
                map: self.name.clone(),
            });
        }
        t.first_gid.checked_add(tile_number).ok_or_else(|| SimError::TileOutOfRange {
            tileset: tileset.to_string(),
            tile_number,
            map: self.name.clone(),
        })
    }

    // ---- object lists ----

    pub fn sprites(&self) -> &[ObjectId] {
        &self.sprites
    }

    pub fn triggers(&self) -> &[ObjectId] {
        &self.triggers
    }

    pub fn reference(&self) -> &[ObjectId] {
        &self.reference
    }

    pub fn in_bounds(&self) -> &[ObjectId] {
        &self.in_bounds
    }

    pub fn out_of_bounds(&self) -> &[ObjectId] {
        &self.out_of_bounds
    }

    /// Ids on a layer; unknown named layers are empty
    pub fn list(&self, layer: &Layer) -> &[ObjectId] {
        match layer {
            Layer::Sprites => &self.sprites,
            Layer::Triggers => &self.triggers,
            Layer::Reference => &self.reference,
            Layer::InBounds => &self.in_bounds,
            Layer::OutOfBounds => &self.out_of_bounds,
            Layer::Named(name) => self.extra.get(name).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    /// Named layers are created on demand
    fn list_mut(&mut self, layer: &Layer) -> &mut Vec<ObjectId> {
        match layer {
            Layer::Sprites => &mut self.sprites,
            Layer::Triggers => &mut self.triggers,
            Layer::Reference => &mut self.reference,
            Layer::InBounds => &mut self.in_bounds,
            Layer::OutOfBounds => &mut self.out_of_bounds,
            Layer::Named(name) => self.extra.entry(name.clone()).or_default(),
        }
    }

    pub fn contains(&self, layer: &Layer, id: ObjectId) -> bool {
        self.list(layer).contains(&id)
    }

    /// Every list `id` is a member of
    pub fn memberships(&self, id: ObjectId) -> Vec<Layer> {
        let mut layers: Vec<Layer> = Layer::BUILTIN
            .iter()
            .filter(|l| self.contains(l, id))
            .cloned()
            .collect();
        layers.extend(
            self.extra
                .iter()
                .filter(|(_, ids)| ids.contains(&id))
                .map(|(name, _)| Layer::Named(name.clone())),
        );
        layers
    }

    /// Names of the extra object layers
    pub fn named_layers(&self) -> impl Iterator<Item = &str> {
        self.extra.keys().map(String::as_str)
    }

    /// Append to a list; no-op if already a member
    pub(crate) fn insert_id(&mut self, layer: &Layer, id: ObjectId) {
        let list = self.list_mut(layer);
        if !list.contains(&id) {
            list.push(id);
        }
        self.changed = true;
    }

    /// Returns true if `id` was on the list
    pub(crate) fn remove_id(&mut self, layer: &Layer, id: ObjectId) -> bool {
        let list = self.list_mut(layer);
        let before = list.len();
        list.retain(|o| *o != id);
        let removed = list.len() != before;
        if removed {
            self.changed = true;
        }
        removed
    }

    // ---- follow graph ----

    pub fn followers(&self, leader: ObjectId) -> &[Follower] {
        self.follow.get(&leader).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn leader_of(&self, follower: ObjectId) -> Option<ObjectId> {
        self.follow
            .iter()
            .find(|(_, fs)| fs.iter().any(|f| f.id == follower))
            .map(|(leader, _)| *leader)
    }

    /// Is `target` reachable from `from` by following leader -> follower edges?
    pub fn leads_transitively(&self, from: ObjectId, target: ObjectId) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            for f in self.followers(id) {
                if f.id == target {
                    return true;
                }
                stack.push(f.id);
            }
        }
        false
    }

    /// `root` plus every transitive follower, leaders before followers
    pub fn follow_closure(&self, root: ObjectId) -> Vec<ObjectId> {
        let mut out = vec![root];
        let mut i = 0;
        while i < out.len() {
            for f in self.followers(out[i]) {
                if !out.contains(&f.id) {
                    out.push(f.id);
                }
            }
            i += 1;
        }
        out
    }

    pub(crate) fn push_follower(&mut self, leader: ObjectId, follower: Follower) {
        self.follow.entry(leader).or_default().push(follower);
    }

    /// Drop `follower` from whichever leader it follows
    pub(crate) fn unfollow(&mut self, follower: ObjectId) -> bool {
        let mut removed = false;
        self.follow.retain(|_, fs| {
            let before = fs.len();
            fs.retain(|f| f.id != follower);
            removed |= fs.len() != before;
            !fs.is_empty()
        });
        removed
    }

    pub(crate) fn take_followers(&mut self, leader: ObjectId) -> Vec<Follower> {
        self.follow.remove(&leader).unwrap_or_default()
    }

    pub(crate) fn set_followers(&mut self, leader: ObjectId, followers: Vec<Follower>) {
        if !followers.is_empty() {
            self.follow.insert(leader, followers);
        }
    }

    // ---- blocked-move resolvers ----

    /// Installing the same resolver twice is a no-op
    pub fn add_blocked_move_resolver(&mut self, resolver: BlockedMoveResolver) {
        if !self.resolvers.iter().any(|r| std::ptr::fn_addr_eq(*r, resolver)) {
            self.resolvers.push(resolver);
        }
    }

    pub fn blocked_move_resolvers(&self) -> &[BlockedMoveResolver] {
        &self.resolvers
    }

    // ---- layer visibility ----

    /// Register an authoring-order layer; returns its index
    pub fn add_layer(&mut self, name: impl Into<String>, visible: bool) -> usize {
        let index = self.layers.len();
        self.layers.push(LayerInfo {
            name: name.into(),
            visible,
        });
        if visible && index < 64 {
            self.visibility |= 1 << index;
        }
        index
    }

    pub fn layers(&self) -> &[LayerInfo] {
        &self.layers
    }

    pub fn layer_index(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name == name)
    }

    /// Returns false if no layer has that name
    pub fn set_layer_visibility_by_name(&mut self, name: &str, visible: bool) -> bool {
        match self.layer_index(name) {
            Some(index) => {
                self.set_layer_visibility_by_index(index, visible);
                true
            }
            None => false,
        }
    }

    pub fn set_layer_visibility_by_index(&mut self, index: usize, visible: bool) {
        if index >= 64 {
            log::warn!("Map {}: layer index {} is beyond the visibility mask", self.name, index);
            return;
        }
        let mask = if visible {
            self.visibility | (1 << index)
        } else {
            self.visibility & !(1 << index)
        };
        self.set_layer_visibility_mask(mask);
    }

    pub fn layer_visibility_by_name(&self, name: &str) -> Option<bool> {
        self.layer_index(name).map(|i| self.layer_visibility_by_index(i))
    }

    pub fn layer_visibility_by_index(&self, index: usize) -> bool {
        index < 64 && self.visibility & (1 << index) != 0
    }

    pub fn layer_visibility_mask(&self) -> u64 {
        self.visibility
    }

    /// Returns true if the mask differed from the current one
    pub fn set_layer_visibility_mask(&mut self, mask: u64) -> bool {
        if mask == self.visibility {
            return false;
        }
        self.visibility = mask;
        for (i, layer) in self.layers.iter_mut().enumerate().take(64) {
            layer.visible = mask & (1 << i) != 0;
        }
        self.changed = true;
        true
    }

    // ---- dirty flag ----

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn set_changed(&mut self) {
        self.changed = true;
    }

    pub fn reset_changed(&mut self) {
        self.changed = false;
    }
}
