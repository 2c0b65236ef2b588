//! Path following along a reference polyline or polygon

use std::f32::consts::PI;

use glam::Vec2;

use crate::error::{SimError, SimResult};
use crate::sim::dispatch::Registry;
use crate::sim::geometry::normalize_angle;
use crate::sim::{Layer, MapId, Move, MoveKind, ObjectId, ObjectQuery, World};

pub fn register(registry: &mut Registry) {
    registry.on_move(MoveKind::Poly, None, step_move_poly);
}

/// Follow the reference path `path` at `speed` px/s starting at `fraction`
/// of its length; negative speeds travel backwards
pub fn set_move_poly(
    world: &mut World,
    map: MapId,
    id: ObjectId,
    path: &str,
    speed: f32,
    fraction: f32,
    bounce: bool,
) -> SimResult<()> {
    world.object_mut(id)?.movement = Some(Move::Poly {
        path: path.to_string(),
        fraction: fraction.clamp(0.0, 1.0),
        speed,
        bounce,
    });
    world.map_mut(map).set_changed();
    Ok(())
}

pub fn clear_move_poly(world: &mut World, map: MapId, id: ObjectId) -> SimResult<()> {
    let obj = world.object_mut(id)?;
    if matches!(obj.movement, Some(Move::Poly { .. })) {
        obj.clear_move();
        world.map_mut(map).set_changed();
    }
    Ok(())
}

/// Where the next step lands on a path of length `total`
struct Advance {
    position: f32,
    speed: f32,
    /// Reached the end of an open, non-bouncing path
    finished: bool,
}

fn advance(position: f32, step: f32, speed: f32, total: f32, closed: bool, bounce: bool) -> Advance {
    let mut next = position + step;
    let mut speed = speed;
    let mut finished = false;
    if next < 0.0 {
        if bounce {
            next = -next;
            speed = -speed;
        } else if closed {
            next += total;
        } else {
            next = 0.0;
            finished = true;
        }
    } else if next > total {
        if bounce {
            next = total - (next - total);
            speed = -speed;
        } else if closed {
            next -= total;
        } else {
            next = total;
            finished = true;
        }
    }
    Advance {
        position: next.clamp(0.0, total),
        speed,
        finished,
    }
}

/// One tick of path following
pub fn step_move_poly(world: &mut World, map: MapId, id: ObjectId) -> SimResult<()> {
    let Some(Move::Poly {
        path,
        fraction,
        speed,
        bounce,
    }) = world.object(id)?.movement.clone()
    else {
        return Ok(());
    };

    let Some(path_id) = world.find_object(map, &ObjectQuery::on(Layer::Reference).name(&path)) else {
        clear_move_poly(world, map, id)?;
        return Err(SimError::MissingReference {
            mechanic: "poly",
            name: path,
            map: world.map(map).name.clone(),
        });
    };

    let path_obj = world.object(path_id)?;
    let Some(shape) = path_obj.poly.as_ref().filter(|p| !p.points.is_empty()) else {
        clear_move_poly(world, map, id)?;
        return Err(SimError::NotAPath(path));
    };
    let total = shape.metrics().total;
    if total <= 0.0 {
        log::warn!("Path {} has zero length", path);
        return clear_move_poly(world, map, id);
    }

    let step = world.settings.per_tick(speed);
    let adv = advance(fraction * total, step, speed, total, shape.closed, bounce);
    let Some((point, heading)) = shape.locate(adv.position) else {
        return clear_move_poly(world, map, id);
    };
    let target = Vec2::new(path_obj.x, path_obj.y) + point;
    let direction = if adv.speed < 0.0 {
        normalize_angle(heading + PI)
    } else {
        heading
    };

    if world.check_move(map, id, target) {
        let obj = world.object_mut(id)?;
        if let Some(Move::Poly { fraction, speed, .. }) = obj.movement.as_mut() {
            *fraction = adv.position / total;
            *speed = adv.speed;
        }
        obj.direction = Some(direction);
        world.set_object_location_by_anchor(map, id, target)?;
        if adv.finished {
            clear_move_poly(world, map, id)?;
        }
    } else if bounce {
        if let Some(Move::Poly { speed, .. }) = world.object_mut(id)?.movement.as_mut() {
            *speed = -*speed;
        }
    } else {
        clear_move_poly(world, map, id)?;
    }
    Ok(())
}
