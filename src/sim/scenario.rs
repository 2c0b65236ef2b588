//! Scenario files
//!
//! A scenario is the JSON description of a whole world: tilesets, then maps
//! with their layers and objects. Loading it normalizes every object through
//! `World::check_object`, then starts the declared moves and follow links
//! once every map is populated, so references may point at objects on any
//! layer.

use std::fs;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::map::{Layer, Map, MapId};
use super::object::{ObjectDef, ObjectId};
use super::tileset::Tileset;
use super::world::{ObjectQuery, World};
use crate::error::{SimError, SimResult};
use crate::mechanics::{linear, orbit, poly};
use crate::settings::Settings;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub tilesets: Vec<Tileset>,
    pub maps: Vec<MapDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDef {
    pub name: String,
    /// Size in tiles
    pub width: u32,
    pub height: u32,
    pub tile_width: f32,
    pub tile_height: f32,
    #[serde(default)]
    pub tilesets: Vec<MapTileset>,
    /// Authoring order; also the layer visibility bit order
    #[serde(default)]
    pub layers: Vec<LayerDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapTileset {
    pub name: String,
    pub first_gid: u32,
}

fn visible() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerDef {
    pub name: String,
    #[serde(default = "visible")]
    pub visible: bool,
    #[serde(default)]
    pub objects: Vec<ScenarioObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioObject {
    #[serde(flatten)]
    pub def: ObjectDef,
    /// Movement started once the world is built
    #[serde(default, rename = "move")]
    pub movement: Option<MoveDef>,
    /// Name of a sprite on the same map to follow
    #[serde(default)]
    pub follow: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MoveDef {
    Linear {
        dest: Vec2,
        speed: f32,
        #[serde(default)]
        slide: bool,
    },
    Orbit {
        center: String,
        speed: f32,
        #[serde(default)]
        bounce: bool,
        #[serde(default)]
        radius: Option<f32>,
        #[serde(default)]
        angle: Option<f32>,
    },
    Poly {
        path: String,
        speed: f32,
        #[serde(default)]
        bounce: bool,
        #[serde(default)]
        fraction: f32,
    },
}

/// Work deferred until every map is populated
struct Pending {
    map: MapId,
    id: ObjectId,
    movement: Option<MoveDef>,
    follow: Option<String>,
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let scenario = serde_json::from_str(&text)?;
        log::info!("Loaded scenario from {}", path.display());
        Ok(scenario)
    }

    /// Build a populated world
    ///
    /// The returned world's maps start clean (no dirty flags set).
    pub fn build(self, settings: Settings) -> SimResult<World> {
        let mut world = World::new(settings);
        for tileset in self.tilesets {
            world.add_tileset(tileset);
        }

        let mut pending = Vec::new();
        for def in self.maps {
            let map = Self::build_map(&mut world, def, &mut pending)?;
            log::debug!(
                "Map {}: {} sprites, {} triggers",
                world.map(map).name,
                world.map(map).sprites().len(),
                world.map(map).triggers().len()
            );
        }

        for p in pending {
            if let Some(leader) = p.follow {
                let leader_id = world
                    .find_object(p.map, &ObjectQuery::on(Layer::Sprites).name(&leader))
                    .ok_or_else(|| SimError::MissingReference {
                        mechanic: "follow",
                        name: leader.clone(),
                        map: world.map(p.map).name.clone(),
                    })?;
                world.add_follower(p.map, leader_id, p.id)?;
            }
            if let Some(movement) = p.movement {
                start_move(&mut world, p.map, p.id, movement)?;
            }
        }

        let ids: Vec<MapId> = world.map_ids().collect();
        for map in ids {
            world.map_mut(map).reset_changed();
        }
        Ok(world)
    }

    fn build_map(world: &mut World, def: MapDef, pending: &mut Vec<Pending>) -> SimResult<MapId> {
        let mut map = Map::new(def.name, def.width, def.height, def.tile_width, def.tile_height);
        for ts in &def.tilesets {
            let Some(tileset) = world.tilesets.get(&ts.name) else {
                return Err(SimError::MissingTileset {
                    tileset: ts.name.clone(),
                    map: map.name.clone(),
                });
            };
            map.add_tileset(ts.name.clone(), ts.first_gid, tileset.tile_count);
        }
        for layer in &def.layers {
            map.add_layer(layer.name.clone(), layer.visible);
        }
        let id = world.add_map(map);

        for layer_def in def.layers {
            let layer = Layer::from_name(&layer_def.name);
            for obj in layer_def.objects {
                let oid = world.spawn(id, obj.def, std::slice::from_ref(&layer))?;
                if obj.movement.is_some() || obj.follow.is_some() {
                    pending.push(Pending {
                        map: id,
                        id: oid,
                        movement: obj.movement,
                        follow: obj.follow,
                    });
                }
            }
        }
        Ok(id)
    }
}

fn start_move(world: &mut World, map: MapId, id: ObjectId, movement: MoveDef) -> SimResult<()> {
    match movement {
        MoveDef::Linear { dest, speed, slide } => linear::set_move_linear(world, map, id, dest, speed, slide),
        MoveDef::Orbit {
            center,
            speed,
            bounce,
            radius,
            angle,
        } => orbit::set_move_orbit(world, map, id, &center, speed, bounce, radius, angle),
        MoveDef::Poly {
            path,
            speed,
            bounce,
            fraction,
        } => poly::set_move_poly(world, map, id, &path, speed, fraction, bounce),
    }
}
