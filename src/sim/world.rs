//! World: the object arena plus every map
//!
//! Object operations that touch both an object and its map's lists live
//! here, since maps only store ids.

use std::collections::{BTreeMap, HashMap, HashSet};

use glam::Vec2;
use slotmap::SlotMap;

use super::collision::{Collider, CollisionType, Overlap, collides, supports_partial};
use super::map::{Follower, Layer, Map, MapId};
use super::object::{GameObject, ObjectDef, ObjectId, TileRef, TileSpec};
use super::tileset::Tileset;
use crate::consts::PLAYER_TYPE;
use crate::error::{SimError, SimResult};
use crate::settings::Settings;

/// Filter for [`World::find_object`] and [`World::find_objects`]
///
/// Every criterion that is set must match.
#[derive(Debug, Clone)]
pub struct ObjectQuery<'a> {
    pub name: Option<&'a str>,
    pub kind: Option<&'a str>,
    pub collision: Option<CollisionType>,
    /// Object must collide with this probe
    pub collides_with: Option<(Collider<'a>, Overlap)>,
    pub exclude: Option<ObjectId>,
    pub layer: Layer,
}

impl Default for ObjectQuery<'_> {
    fn default() -> Self {
        Self {
            name: None,
            kind: None,
            collision: None,
            collides_with: None,
            exclude: None,
            layer: Layer::Sprites,
        }
    }
}

impl<'a> ObjectQuery<'a> {
    pub fn on(layer: Layer) -> Self {
        Self {
            layer,
            ..Default::default()
        }
    }

    pub fn name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn kind(mut self, kind: &'a str) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn collision(mut self, collision: CollisionType) -> Self {
        self.collision = Some(collision);
        self
    }

    pub fn colliding(mut self, probe: Collider<'a>, overlap: Overlap) -> Self {
        self.collides_with = Some((probe, overlap));
        self
    }

    pub fn exclude(mut self, id: ObjectId) -> Self {
        self.exclude = Some(id);
        self
    }
}

#[derive(Debug, Default)]
pub struct World {
    pub objects: SlotMap<ObjectId, GameObject>,
    maps: Vec<Map>,
    map_index: HashMap<String, MapId>,
    pub tilesets: BTreeMap<String, Tileset>,
    pub settings: Settings,
}

impl World {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    // ---- maps and tilesets ----

    pub fn add_tileset(&mut self, tileset: Tileset) {
        self.tilesets.insert(tileset.name.clone(), tileset);
    }

    /// Add a map; a map with the same name is replaced
    pub fn add_map(&mut self, map: Map) -> MapId {
        if let Some(&id) = self.map_index.get(&map.name) {
            log::warn!("Replacing map {}", map.name);
            self.maps[id.0] = map;
            return id;
        }
        let id = MapId(self.maps.len());
        self.map_index.insert(map.name.clone(), id);
        self.maps.push(map);
        id
    }

    pub fn map_id(&self, name: &str) -> SimResult<MapId> {
        self.map_index
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownMap(name.to_string()))
    }

    pub fn map(&self, id: MapId) -> &Map {
        &self.maps[id.0]
    }

    pub fn map_mut(&mut self, id: MapId) -> &mut Map {
        &mut self.maps[id.0]
    }

    pub fn map_ids(&self) -> impl Iterator<Item = MapId> + '_ {
        (0..self.maps.len()).map(MapId)
    }

    /// Map ids sorted by map name
    pub fn map_ids_by_name(&self) -> Vec<MapId> {
        let mut ids: Vec<MapId> = self.map_ids().collect();
        ids.sort_by(|a, b| self.map(*a).name.cmp(&self.map(*b).name));
        ids
    }

    // ---- objects ----

    pub fn object(&self, id: ObjectId) -> SimResult<&GameObject> {
        self.objects.get(id).ok_or(SimError::UnknownObject(id))
    }

    pub fn object_mut(&mut self, id: ObjectId) -> SimResult<&mut GameObject> {
        self.objects.get_mut(id).ok_or(SimError::UnknownObject(id))
    }

    /// Anchor offset a tile image imposes, if the object is tile backed
    fn tile_anchor(&self, tile: &TileRef) -> Option<Vec2> {
        self.tilesets.get(&tile.tileset).map(|ts| ts.anchor_for(tile.tile_number))
    }

    /// Normalize a raw definition into a complete object for `map`
    ///
    /// Rect only derives the anchor, anchor only derives the rect, neither
    /// puts the object at the origin. Tile references are resolved against
    /// the map's tileset table.
    pub fn check_object(&self, map: MapId, def: ObjectDef) -> SimResult<GameObject> {
        let m = self.map(map);

        let tile = match def.tile {
            Some(TileSpec::Gid(gid)) => {
                let (tileset, tile_number) = m.find_tile(gid)?;
                Some(TileRef {
                    tileset,
                    tile_number,
                    gid,
                })
            }
            Some(TileSpec::Tile { tileset, tile_number }) => {
                let gid = m.find_gid(&tileset, tile_number)?;
                Some(TileRef {
                    tileset,
                    tile_number,
                    gid,
                })
            }
            None => None,
        };
        let tileset = tile.as_ref().and_then(|t| self.tilesets.get(&t.tileset));

        let (width, height) = match (def.rect, tileset) {
            (Some(r), _) => (r.width, r.height),
            (None, Some(ts)) => (ts.tile_width, ts.tile_height),
            (None, None) => (0.0, 0.0),
        };
        let offset = tile
            .as_ref()
            .and_then(|t| self.tile_anchor(t))
            .unwrap_or(Vec2::new(width / 2.0, height / 2.0));

        let (origin, anchor) = match (def.rect, def.anchor) {
            (Some(r), Some(a)) => (r.min(), a),
            (Some(r), None) => (r.min(), r.min() + offset),
            (None, Some(a)) => (a - offset, a),
            (None, None) => (Vec2::ZERO, Vec2::ZERO),
        };

        Ok(GameObject {
            name: def.name,
            kind: def.kind,
            x: origin.x,
            y: origin.y,
            width,
            height,
            anchor,
            collision: def.collision.unwrap_or_default(),
            poly: def.poly,
            map_name: m.name.clone(),
            tile,
            movement: None,
            direction: None,
            do_not_trigger: HashSet::new(),
            properties: def.properties,
        })
    }

    /// Normalize `def`, insert it and add it to `layers` of `map`
    ///
    /// Objects placed on a trigger or bounds layer without a collision type
    /// get Rect collision.
    pub fn spawn(&mut self, map: MapId, mut def: ObjectDef, layers: &[Layer]) -> SimResult<ObjectId> {
        if def.collision.is_none() && layers.iter().any(Layer::forces_rect) {
            def.collision = Some(CollisionType::Rect);
        }
        let obj = self.check_object(map, def)?;
        let id = self.objects.insert(obj);
        for layer in layers {
            self.add_object(map, id, layer)?;
        }
        Ok(id)
    }

    /// Add `id` to a list of `map`
    ///
    /// Tile-backed objects get their gid recomputed for this map.
    pub fn add_object(&mut self, map: MapId, id: ObjectId, layer: &Layer) -> SimResult<()> {
        let gid = match &self.object(id)?.tile {
            Some(tile) => Some(self.map(map).find_gid(&tile.tileset, tile.tile_number)?),
            None => None,
        };
        let map_name = self.map(map).name.clone();
        let obj = self.object_mut(id)?;
        obj.map_name = map_name;
        if let (Some(tile), Some(gid)) = (obj.tile.as_mut(), gid) {
            tile.gid = gid;
        }
        self.map_mut(map).insert_id(layer, id);
        Ok(())
    }

    /// Returns true if the object was on that list
    pub fn remove_object(&mut self, map: MapId, id: ObjectId, layer: &Layer) -> bool {
        self.map_mut(map).remove_id(layer, id)
    }

    pub fn remove_object_from_all_layers(&mut self, map: MapId, id: ObjectId) {
        for layer in self.map(map).memberships(id) {
            self.map_mut(map).remove_id(&layer, id);
        }
        self.map_mut(map).set_changed();
    }

    /// Remove an object and all of its transitive followers from the map
    /// lists, the follow graph and the arena
    pub fn destroy_object(&mut self, map: MapId, id: ObjectId) -> SimResult<()> {
        self.object(id)?;
        let doomed = self.map(map).follow_closure(id);
        for d in &doomed {
            self.remove_object_from_all_layers(map, *d);
            let m = self.map_mut(map);
            m.take_followers(*d);
            m.unfollow(*d);
            self.objects.remove(*d);
        }
        log::debug!("Map {}: destroyed {} object(s)", self.map(map).name, doomed.len());
        Ok(())
    }

    // ---- queries ----

    /// All objects on the query's layer matching every criterion, in list order
    pub fn find_objects(&self, map: MapId, query: &ObjectQuery) -> Vec<ObjectId> {
        self.matching(map, query).collect()
    }

    /// First match, if any
    pub fn find_object(&self, map: MapId, query: &ObjectQuery) -> Option<ObjectId> {
        self.matching(map, query).next()
    }

    fn matching<'q>(&'q self, map: MapId, query: &'q ObjectQuery) -> impl Iterator<Item = ObjectId> + 'q {
        let forced = query.layer.forces_rect().then_some(CollisionType::Rect);
        self.map(map).list(&query.layer).iter().copied().filter(move |&id| {
            let Some(obj) = self.objects.get(id) else {
                return false;
            };
            if query.exclude == Some(id) {
                return false;
            }
            if query.kind.is_some_and(|k| obj.kind != k) {
                return false;
            }
            if query.name.is_some_and(|n| obj.name != n) {
                return false;
            }
            if query.collision.is_some_and(|c| obj.collision != c) {
                return false;
            }
            match &query.collides_with {
                Some((probe, overlap)) => collides(probe, &obj.collider(), *overlap, None, forced),
                None => true,
            }
        })
    }

    /// Warn about every missing property key; returns true if none are missing
    pub fn check_keys(&self, id: ObjectId, keys: &[&str]) -> bool {
        let Some(obj) = self.objects.get(id) else {
            log::warn!("check_keys: object {:?} does not exist", id);
            return false;
        };
        let mut ok = true;
        for key in keys {
            if !obj.properties.contains_key(*key) {
                log::warn!("Missing property {} in {}", key, obj.label());
                ok = false;
            }
        }
        ok
    }

    // ---- location ----

    /// Would `anchor` be a valid location for `id` on `map`?
    ///
    /// Checked in order: no collision type is always valid; players skip
    /// checks when player move checking is off; other sprites block (two
    /// anchors never block each other); the object must fit inside the map;
    /// out-of-bounds regions block; with no in-bounds regions (or when told
    /// to ignore them) it is valid; otherwise it must fit entirely inside a
    /// single in-bounds region.
    pub fn check_location(&self, map: MapId, id: ObjectId, anchor: Vec2, ignore_in_bounds: bool) -> bool {
        let Some(obj) = self.objects.get(id) else {
            return false;
        };
        if obj.collision == CollisionType::None {
            return true;
        }
        if obj.kind == PLAYER_TYPE && !self.settings.player_move_check {
            return true;
        }

        let m = self.map(map);
        let candidate = obj.collider().at_anchor(anchor);

        for &other_id in m.sprites() {
            if other_id == id {
                continue;
            }
            let Some(other) = self.objects.get(other_id) else {
                continue;
            };
            if !supports_partial(obj.collision, other.collision) {
                continue;
            }
            if collides(&candidate, &other.collider(), Overlap::Partial, None, None) {
                return false;
            }
        }

        if !collides(&candidate, &Collider::rect(m.bounds()), Overlap::Full, None, None) {
            return false;
        }

        let region = |rid: &ObjectId, overlap: Overlap| {
            self.objects
                .get(*rid)
                .is_some_and(|r| collides(&candidate, &r.collider(), overlap, None, Some(CollisionType::Rect)))
        };

        if m.out_of_bounds().iter().any(|rid| region(rid, Overlap::Partial)) {
            return false;
        }

        if m.in_bounds().is_empty() || ignore_in_bounds {
            return true;
        }

        m.in_bounds().iter().any(|rid| region(rid, Overlap::Full))
    }

    /// `check_location`, then give the map's blocked-move resolvers a
    /// chance to make room
    pub fn check_move(&mut self, map: MapId, id: ObjectId, anchor: Vec2) -> bool {
        if self.check_location(map, id, anchor, false) {
            return true;
        }
        let resolvers = self.map(map).blocked_move_resolvers().to_vec();
        resolvers.into_iter().any(|resolve| resolve(self, map, id, anchor))
    }

    /// Move the object so its anchor lands on `anchor`
    ///
    /// The rect keeps its offset from the anchor. No bounds clamping; callers
    /// validate first. Followers are carried along recursively.
    pub fn set_object_location_by_anchor(&mut self, map: MapId, id: ObjectId, anchor: Vec2) -> SimResult<()> {
        let mut visited = HashSet::new();
        self.place(map, id, anchor, &mut visited)
    }

    /// Move the object by its top-left corner; the anchor is derived from
    /// the tile image or the rect centre
    pub fn set_object_location_by_xy(&mut self, map: MapId, id: ObjectId, xy: Vec2) -> SimResult<()> {
        let obj = self.object(id)?;
        let offset = obj
            .tile
            .as_ref()
            .and_then(|t| self.tile_anchor(t))
            .unwrap_or(Vec2::new(obj.width / 2.0, obj.height / 2.0));
        let obj = self.object_mut(id)?;
        obj.x = xy.x;
        obj.y = xy.y;
        obj.anchor = xy + offset;
        let anchor = obj.anchor;
        self.map_mut(map).set_changed();

        let mut visited = HashSet::from([id]);
        self.place_followers(map, id, anchor, &mut visited)
    }

    fn place(&mut self, map: MapId, id: ObjectId, anchor: Vec2, visited: &mut HashSet<ObjectId>) -> SimResult<()> {
        if !visited.insert(id) {
            return Ok(());
        }
        let obj = self.object_mut(id)?;
        let offset = obj.anchor_offset();
        obj.anchor = anchor;
        obj.x = anchor.x - offset.x;
        obj.y = anchor.y - offset.y;
        self.map_mut(map).set_changed();
        self.place_followers(map, id, anchor, visited)
    }

    fn place_followers(
        &mut self,
        map: MapId,
        leader: ObjectId,
        anchor: Vec2,
        visited: &mut HashSet<ObjectId>,
    ) -> SimResult<()> {
        let followers = self.map(map).followers(leader).to_vec();
        for f in followers {
            self.place(map, f.id, anchor + f.offset, visited)?;
        }
        Ok(())
    }

    // ---- follow ----

    /// Make `follower` track `leader` at their current anchor difference
    ///
    /// A follower has one leader; an existing link is replaced.
    pub fn add_follower(&mut self, map: MapId, leader: ObjectId, follower: ObjectId) -> SimResult<()> {
        let leader_anchor = self.object(leader)?.anchor;
        let follower_anchor = self.object(follower)?.anchor;
        let m = self.map_mut(map);
        if leader == follower || m.leads_transitively(follower, leader) {
            return Err(SimError::FollowCycle { leader, follower });
        }
        m.unfollow(follower);
        m.push_follower(
            leader,
            Follower {
                id: follower,
                offset: follower_anchor - leader_anchor,
            },
        );
        Ok(())
    }

    /// Returns true if the link existed
    pub fn remove_follower(&mut self, map: MapId, leader: ObjectId, follower: ObjectId) -> bool {
        let m = self.map_mut(map);
        if m.followers(leader).iter().any(|f| f.id == follower) {
            m.unfollow(follower)
        } else {
            false
        }
    }

    /// Move an object, and recursively its followers, to `dest`
    ///
    /// Every list membership is recreated on the same-named list of `dest`.
    /// A follow link to a leader that stays behind is dropped.
    ///
    /// Every object in the follow closure is checked against `dest`'s tileset
    /// table first; on error nothing has moved.
    pub fn set_object_map(&mut self, src: MapId, id: ObjectId, dest: MapId) -> SimResult<()> {
        if src == dest {
            return Ok(());
        }
        for member in self.map(src).follow_closure(id) {
            if let Some(tile) = &self.object(member)?.tile {
                self.map(dest).find_gid(&tile.tileset, tile.tile_number)?;
            }
        }
        self.transfer(src, id, dest)
    }

    /// Move an already validated object and its followers
    fn transfer(&mut self, src: MapId, id: ObjectId, dest: MapId) -> SimResult<()> {
        self.map_mut(src).unfollow(id);
        let layers = self.map(src).memberships(id);
        for layer in &layers {
            self.map_mut(src).remove_id(layer, id);
        }
        for layer in &layers {
            self.add_object(dest, id, layer)?;
        }
        // an object on no list still changes maps
        let dest_name = self.map(dest).name.clone();
        self.object_mut(id)?.map_name = dest_name;

        let followers = self.map_mut(src).take_followers(id);
        self.map_mut(dest).set_followers(id, followers.clone());
        for f in followers {
            self.transfer(src, f.id, dest)?;
        }
        log::debug!(
            "Moved {:?} from {} to {}",
            id,
            self.map(src).name,
            self.map(dest).name
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn world() -> (World, MapId) {
        let mut world = World::new(Settings::default());
        let map = world.add_map(Map::new("start", 10, 10, 32.0, 32.0));
        (world, map)
    }

    fn sprite(world: &mut World, map: MapId, name: &str, x: f32, y: f32) -> ObjectId {
        world
            .spawn(map, ObjectDef::new(name, "npc").with_anchor(x, y), &[Layer::Sprites])
            .unwrap()
    }

    #[test]
    fn test_check_object_derives_geometry() {
        let (world, map) = world();
        let from_rect = world
            .check_object(map, ObjectDef::new("a", "").with_rect(10.0, 20.0, 30.0, 40.0))
            .unwrap();
        assert_eq!(from_rect.anchor, Vec2::new(25.0, 40.0));
        assert_eq!(from_rect.map_name, "start");

        let from_anchor = world
            .check_object(
                map,
                ObjectDef {
                    anchor: Some(Vec2::new(25.0, 40.0)),
                    rect: None,
                    ..ObjectDef::new("b", "")
                },
            )
            .unwrap();
        assert_eq!((from_anchor.x, from_anchor.y), (25.0, 40.0));

        let nothing = world.check_object(map, ObjectDef::default()).unwrap();
        assert_eq!(nothing.anchor, Vec2::ZERO);
        assert_eq!(nothing.collision, CollisionType::Anchor);
    }

    #[test]
    fn test_check_object_tile_anchor() {
        let (mut world, map) = world();
        let mut ts = Tileset::new("people", 32.0, 48.0, 16);
        ts.anchor = Some(Vec2::new(16.0, 44.0));
        world.add_tileset(ts);
        world.map_mut(map).add_tileset("people", 101, 16);

        let obj = world
            .check_object(map, ObjectDef::new("guard", "npc").with_rect(100.0, 100.0, 32.0, 48.0).with_tile(TileSpec::Gid(103)))
            .unwrap();
        let tile = obj.tile.as_ref().unwrap();
        assert_eq!((tile.tileset.as_str(), tile.tile_number, tile.gid), ("people", 2, 103));
        assert_eq!(obj.anchor, Vec2::new(116.0, 144.0));

        let bad = world.check_object(map, ObjectDef::new("x", "").with_tile(TileSpec::Gid(500)));
        assert!(matches!(bad, Err(SimError::UnknownGid { .. })));
    }

    #[test]
    fn test_none_collision_is_always_valid() {
        let (mut world, map) = world();
        let id = world
            .spawn(
                map,
                ObjectDef::new("ghost", "npc").with_anchor(5.0, 5.0).with_collision(CollisionType::None),
                &[Layer::Sprites],
            )
            .unwrap();
        for p in [Vec2::new(-1000.0, -1000.0), Vec2::new(1e6, 3.0), Vec2::new(50.0, 50.0)] {
            assert!(world.check_location(map, id, p, false));
        }
    }

    #[test]
    fn test_check_location_precedence() {
        let (mut world, map) = world();
        let mover = world
            .spawn(
                map,
                ObjectDef::new("box", "npc").with_rect(0.0, 0.0, 10.0, 10.0).with_collision(CollisionType::Rect),
                &[Layer::Sprites],
            )
            .unwrap();
        world
            .spawn(
                map,
                ObjectDef::new("wall", "npc").with_rect(100.0, 0.0, 20.0, 20.0).with_collision(CollisionType::Rect),
                &[Layer::Sprites],
            )
            .unwrap();

        assert!(world.check_location(map, mover, Vec2::new(50.0, 50.0), false));
        // overlaps the wall sprite
        assert!(!world.check_location(map, mover, Vec2::new(100.0, 10.0), false));
        // pokes out of the 320x320 map
        assert!(!world.check_location(map, mover, Vec2::new(318.0, 50.0), false));

        world
            .spawn(
                map,
                ObjectDef::new("pit", "").with_rect(200.0, 200.0, 40.0, 40.0).with_collision(CollisionType::Rect),
                &[Layer::OutOfBounds],
            )
            .unwrap();
        assert!(!world.check_location(map, mover, Vec2::new(198.0, 198.0), false));

        world
            .spawn(
                map,
                ObjectDef::new("room", "").with_rect(0.0, 0.0, 100.0, 100.0).with_collision(CollisionType::Rect),
                &[Layer::InBounds],
            )
            .unwrap();
        assert!(world.check_location(map, mover, Vec2::new(50.0, 50.0), false));
        // straddles the room edge
        assert!(!world.check_location(map, mover, Vec2::new(98.0, 50.0), false));
        assert!(world.check_location(map, mover, Vec2::new(98.0, 50.0), true));
    }

    #[test]
    fn test_in_bounds_regions_are_not_merged() {
        let (mut world, map) = world();
        let mover = world
            .spawn(
                map,
                ObjectDef::new("box", "npc").with_rect(45.0, 45.0, 10.0, 10.0).with_collision(CollisionType::Rect),
                &[Layer::Sprites],
            )
            .unwrap();
        for (name, x) in [("west", 0.0), ("east", 100.0)] {
            world
                .spawn(map, ObjectDef::new(name, "").with_rect(x, 0.0, 100.0, 100.0), &[Layer::InBounds])
                .unwrap();
        }

        assert!(world.check_location(map, mover, Vec2::new(50.0, 50.0), false));
        assert!(world.check_location(map, mover, Vec2::new(150.0, 50.0), false));
        // inside the union of both rooms but not inside either one
        assert!(!world.check_location(map, mover, Vec2::new(100.0, 50.0), false));
        assert!(world.check_location(map, mover, Vec2::new(100.0, 50.0), true));
    }

    #[test]
    fn test_line_sprite_ignores_unsupported_pairs() {
        let (mut world, map) = world();
        let rope = world
            .spawn(
                map,
                ObjectDef::new("rope", "npc")
                    .with_anchor(60.0, 60.0)
                    .with_poly(vec![Vec2::new(40.0, 50.0), Vec2::new(80.0, 50.0)], false)
                    .with_collision(CollisionType::Line),
                &[Layer::Sprites],
            )
            .unwrap();
        let post = sprite(&mut world, map, "post", 60.0, 50.0);

        // line vs anchor has no test, so the post never blocks the rope
        assert!(world.check_location(map, rope, Vec2::new(60.0, 60.0), false));
        let line = world.object(rope).unwrap().collider();
        let point = world.object(post).unwrap().collider();
        assert!(!collides(&line, &point, Overlap::Partial, None, None));
        assert!(!collides(&point, &line, Overlap::Partial, None, None));

        // a rect across the same line does block
        world
            .spawn(
                map,
                ObjectDef::new("crate", "npc").with_rect(55.0, 45.0, 10.0, 10.0).with_collision(CollisionType::Rect),
                &[Layer::Sprites],
            )
            .unwrap();
        assert!(!world.check_location(map, rope, Vec2::new(60.0, 60.0), false));
    }

    #[test]
    fn test_anchors_do_not_block_each_other() {
        let (mut world, map) = world();
        let a = sprite(&mut world, map, "a", 50.0, 50.0);
        sprite(&mut world, map, "b", 60.0, 50.0);
        assert!(world.check_location(map, a, Vec2::new(60.0, 50.0), false));
    }

    #[test]
    fn test_player_move_check_toggle() {
        let (mut world, map) = world();
        let player = world
            .spawn(map, ObjectDef::new("p1", PLAYER_TYPE).with_anchor(10.0, 10.0), &[Layer::Sprites])
            .unwrap();
        let npc = sprite(&mut world, map, "n", 10.0, 10.0);
        world.settings.player_move_check = false;
        assert!(world.check_location(map, player, Vec2::new(-50.0, 10.0), false));
        assert!(!world.check_location(map, npc, Vec2::new(-50.0, 10.0), false));
    }

    #[test]
    fn test_find_objects() {
        let (mut world, map) = world();
        let a = sprite(&mut world, map, "a", 50.0, 50.0);
        let b = sprite(&mut world, map, "b", 150.0, 50.0);
        let door = world
            .spawn(
                map,
                ObjectDef::new("door", "door").with_rect(140.0, 40.0, 20.0, 20.0),
                &[Layer::Triggers],
            )
            .unwrap();

        assert_eq!(world.find_object(map, &ObjectQuery::default().name("b")), Some(b));
        assert_eq!(world.find_objects(map, &ObjectQuery::default().kind("npc")), vec![a, b]);
        assert_eq!(world.find_objects(map, &ObjectQuery::default().kind("npc").exclude(a)), vec![b]);
        assert!(world.find_object(map, &ObjectQuery::default().kind("door")).is_none());

        // trigger objects are always tested as rects
        let found = world.find_object(
            map,
            &ObjectQuery::on(Layer::Triggers).colliding(Collider::point(Vec2::new(150.0, 50.0)), Overlap::Partial),
        );
        assert_eq!(found, Some(door));
        let missed = world.find_object(
            map,
            &ObjectQuery::on(Layer::Triggers).colliding(Collider::point(Vec2::new(50.0, 50.0)), Overlap::Partial),
        );
        assert_eq!(missed, None);
    }

    #[test]
    fn test_follow_offset() {
        let (mut world, map) = world();
        let leader = sprite(&mut world, map, "leader", 0.0, 0.0);
        let follower = sprite(&mut world, map, "follower", 10.0, -5.0);
        world.add_follower(map, leader, follower).unwrap();
        world.set_object_location_by_anchor(map, leader, Vec2::new(50.0, 50.0)).unwrap();
        assert_eq!(world.object(follower).unwrap().anchor, Vec2::new(60.0, 45.0));
        assert!(world.map(map).changed());
    }

    #[test]
    fn test_follow_is_transitive_and_acyclic() {
        let (mut world, map) = world();
        let a = sprite(&mut world, map, "a", 0.0, 0.0);
        let b = sprite(&mut world, map, "b", 10.0, 0.0);
        let c = sprite(&mut world, map, "c", 20.0, 0.0);
        world.add_follower(map, a, b).unwrap();
        world.add_follower(map, b, c).unwrap();
        assert!(matches!(world.add_follower(map, c, a), Err(SimError::FollowCycle { .. })));
        assert!(matches!(world.add_follower(map, a, a), Err(SimError::FollowCycle { .. })));

        world.set_object_location_by_anchor(map, a, Vec2::new(100.0, 100.0)).unwrap();
        assert_eq!(world.object(c).unwrap().anchor, Vec2::new(120.0, 100.0));

        assert!(world.remove_follower(map, b, c));
        assert!(!world.remove_follower(map, b, c));
        world.set_object_location_by_anchor(map, a, Vec2::new(0.0, 0.0)).unwrap();
        assert_eq!(world.object(c).unwrap().anchor, Vec2::new(120.0, 100.0));
    }

    #[test]
    fn test_location_by_anchor_keeps_rect_offset() {
        let (mut world, map) = world();
        let id = world
            .spawn(map, ObjectDef::new("a", "").with_rect(0.0, 0.0, 20.0, 10.0), &[Layer::Sprites])
            .unwrap();
        world.set_object_location_by_anchor(map, id, Vec2::new(-30.0, 400.0)).unwrap();
        let obj = world.object(id).unwrap();
        // no clamping to the map
        assert_eq!(obj.anchor, Vec2::new(-30.0, 400.0));
        assert_eq!((obj.x, obj.y), (-40.0, 395.0));

        world.set_object_location_by_xy(map, id, Vec2::new(100.0, 100.0)).unwrap();
        assert_eq!(world.object(id).unwrap().anchor, Vec2::new(110.0, 105.0));
    }

    #[test]
    fn test_set_object_map_moves_followers() {
        let (mut world, start) = world();
        let end = world.add_map(Map::new("end", 10, 10, 32.0, 32.0));
        let leader = sprite(&mut world, start, "leader", 100.0, 100.0);
        let f1 = sprite(&mut world, start, "f1", 110.0, 100.0);
        let f2 = sprite(&mut world, start, "f2", 100.0, 90.0);
        world.add_object(start, leader, &Layer::Triggers).unwrap();
        world.add_object(start, f2, &Layer::Named("decor".into())).unwrap();
        world.add_follower(start, leader, f1).unwrap();
        world.add_follower(start, leader, f2).unwrap();

        world.set_object_map(start, leader, end).unwrap();

        assert!(world.map(start).sprites().is_empty());
        assert!(world.map(start).triggers().is_empty());
        assert_eq!(world.map(end).sprites(), &[leader, f1, f2]);
        assert_eq!(world.map(end).triggers(), &[leader]);
        assert_eq!(world.map(end).list(&Layer::Named("decor".into())), &[f2]);
        for id in [leader, f1, f2] {
            assert_eq!(world.object(id).unwrap().map_name, "end");
        }
        let offsets: Vec<Vec2> = world.map(end).followers(leader).iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![Vec2::new(10.0, 0.0), Vec2::new(0.0, -10.0)]);

        world.set_object_location_by_anchor(end, leader, Vec2::new(50.0, 50.0)).unwrap();
        assert_eq!(world.object(f1).unwrap().anchor, Vec2::new(60.0, 50.0));
        assert_eq!(world.object(f2).unwrap().anchor, Vec2::new(50.0, 40.0));
    }

    #[test]
    fn test_follower_leaving_drops_link() {
        let (mut world, start) = world();
        let end = world.add_map(Map::new("end", 10, 10, 32.0, 32.0));
        let leader = sprite(&mut world, start, "leader", 100.0, 100.0);
        let follower = sprite(&mut world, start, "follower", 110.0, 100.0);
        world.add_follower(start, leader, follower).unwrap();

        world.set_object_map(start, follower, end).unwrap();
        assert!(world.map(start).followers(leader).is_empty());
        assert_eq!(world.map(end).leader_of(follower), None);
    }

    #[test]
    fn test_set_object_map_missing_tileset() {
        let (mut world, start) = world();
        let end = world.add_map(Map::new("end", 10, 10, 32.0, 32.0));
        world.add_tileset(Tileset::new("people", 32.0, 32.0, 4));
        world.map_mut(start).add_tileset("people", 1, 4);
        let id = world
            .spawn(start, ObjectDef::new("p", "").with_tile(TileSpec::Gid(2)), &[Layer::Sprites])
            .unwrap();
        let err = world.set_object_map(start, id, end).unwrap_err();
        assert!(matches!(err, SimError::MissingTileset { .. }));
        // nothing moved
        assert_eq!(world.map(start).sprites(), &[id]);

        world.map_mut(end).add_tileset("people", 41, 4);
        world.set_object_map(start, id, end).unwrap();
        assert_eq!(world.object(id).unwrap().tile.as_ref().unwrap().gid, 42);
    }

    #[test]
    fn test_set_object_map_checks_followers_first() {
        let (mut world, start) = world();
        let end = world.add_map(Map::new("end", 10, 10, 32.0, 32.0));
        world.add_tileset(Tileset::new("people", 32.0, 32.0, 4));
        world.map_mut(start).add_tileset("people", 1, 4);
        let leader = sprite(&mut world, start, "leader", 50.0, 50.0);
        let follower = world
            .spawn(
                start,
                ObjectDef::new("horse", "").with_tile(TileSpec::Gid(2)).with_anchor(100.0, 100.0),
                &[Layer::Sprites],
            )
            .unwrap();
        world.add_follower(start, leader, follower).unwrap();

        let err = world.set_object_map(start, leader, end).unwrap_err();
        assert!(matches!(err, SimError::MissingTileset { .. }));
        // leader and follower both stayed, still linked
        assert_eq!(world.map(start).sprites(), &[leader, follower]);
        assert!(world.map(end).sprites().is_empty());
        assert_eq!(world.map(start).leader_of(follower), Some(leader));
        assert!(world.map(end).followers(leader).is_empty());
        assert_eq!(world.object(leader).unwrap().map_name, "start");

        world.set_object_location_by_anchor(start, leader, Vec2::new(60.0, 50.0)).unwrap();
        assert_eq!(world.object(follower).unwrap().anchor, Vec2::new(110.0, 100.0));
    }

    #[test]
    fn test_destroy_removes_followers() {
        let (mut world, map) = world();
        let leader = sprite(&mut world, map, "leader", 0.0, 0.0);
        let follower = sprite(&mut world, map, "follower", 10.0, 0.0);
        let bystander = sprite(&mut world, map, "bystander", 20.0, 0.0);
        world.add_object(map, leader, &Layer::Triggers).unwrap();
        world.add_follower(map, leader, follower).unwrap();

        world.destroy_object(map, leader).unwrap();
        assert_eq!(world.map(map).sprites(), &[bystander]);
        assert!(world.map(map).triggers().is_empty());
        assert!(world.map(map).followers(leader).is_empty());
        assert!(world.object(leader).is_err());
        assert!(world.object(follower).is_err());
        assert!(matches!(world.destroy_object(map, leader), Err(SimError::UnknownObject(_))));
    }

    #[test]
    fn test_trigger_layers_default_to_rect() {
        let (mut world, map) = world();
        let door = world
            .spawn(map, ObjectDef::new("door", "door").with_rect(40.0, 40.0, 20.0, 20.0), &[Layer::Triggers])
            .unwrap();
        let explicit = world
            .spawn(
                map,
                ObjectDef::new("bell", "bell")
                    .with_anchor(10.0, 10.0)
                    .with_collision(CollisionType::Anchor),
                &[Layer::Triggers],
            )
            .unwrap();
        let npc = sprite(&mut world, map, "n", 45.0, 45.0);
        assert_eq!(world.object(door).unwrap().collision, CollisionType::Rect);
        assert_eq!(world.object(explicit).unwrap().collision, CollisionType::Anchor);
        assert_eq!(world.object(npc).unwrap().collision, CollisionType::Anchor);

        // an anchor sprite now collides with the trigger under its own types
        let walker = world.object(npc).unwrap().collider();
        let trigger = world.object(door).unwrap().collider();
        assert!(collides(&walker, &trigger, Overlap::Partial, None, None));
    }

    #[test]
    fn test_check_keys() {
        let (mut world, map) = world();
        let id = world
            .spawn(
                map,
                ObjectDef::new("lever", "lever").with_property("target", crate::sim::PropertyValue::String("door".into())),
                &[Layer::Triggers],
            )
            .unwrap();
        assert!(world.check_keys(id, &["target"]));
        assert!(!world.check_keys(id, &["target", "delay"]));
    }

    #[test]
    fn test_unknown_map() {
        let (world, _) = world();
        assert!(matches!(world.map_id("nowhere"), Err(SimError::UnknownMap(_))));
        assert!(world.map_id("start").is_ok());
    }
}
