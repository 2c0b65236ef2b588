//! Typed simulation errors
//!
//! Structural failures (missing references, unknown maps, broken tile
//! tables) are returned to the owning `Simulation`, which fails only the
//! affected map for the current tick.

use std::path::PathBuf;

use thiserror::Error;

use crate::sim::ObjectId;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("map '{0}' does not exist")]
    UnknownMap(String),

    #[error("object {0:?} does not exist")]
    UnknownObject(ObjectId),

    #[error("tileset '{tileset}' is not used by map '{map}'")]
    MissingTileset { tileset: String, map: String },

    #[error("tile gid {gid} not found in map '{map}'")]
    UnknownGid { gid: u32, map: String },

    #[error("tile {tile_number} is outside tileset '{tileset}' in map '{map}'")]
    TileOutOfRange { tileset: String, tile_number: u32, map: String },

    #[error("{mechanic}: object '{name}' not found on the reference layer of map '{map}'")]
    MissingReference {
        mechanic: &'static str,
        name: String,
        map: String,
    },

    #[error("object '{0}' has no polyline or polygon points")]
    NotAPath(String),

    #[error("{follower:?} already leads {leader:?}, following would form a cycle")]
    FollowCycle {
        leader: ObjectId,
        follower: ObjectId,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimError>;
