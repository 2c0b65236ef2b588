//! Linear movement toward a destination point

use glam::Vec2;

use crate::consts::{ARRIVAL_EPSILON, MIN_STEP, STEP_SHRINK};
use crate::error::SimResult;
use crate::sim::dispatch::Registry;
use crate::sim::geometry::{angle, distance, project};
use crate::sim::{MapId, Move, MoveKind, ObjectId, World};

pub fn register(registry: &mut Registry) {
    registry.on_move(MoveKind::Linear, None, step_move_linear);
}

/// Start moving toward `dest` at `speed` px/s
pub fn set_move_linear(world: &mut World, map: MapId, id: ObjectId, dest: Vec2, speed: f32, slide: bool) -> SimResult<()> {
    world.object_mut(id)?.movement = Some(Move::Linear { dest, speed, slide });
    world.map_mut(map).set_changed();
    Ok(())
}

/// Stop a linear move; other moves are left alone
pub fn clear_move_linear(world: &mut World, map: MapId, id: ObjectId) -> SimResult<()> {
    let obj = world.object_mut(id)?;
    if matches!(obj.movement, Some(Move::Linear { .. })) {
        obj.clear_move();
        world.map_mut(map).set_changed();
    }
    Ok(())
}

/// Move `value` toward `target` by at most `step`
fn toward(value: f32, target: f32, step: f32) -> f32 {
    if target > value {
        (value + step).min(target)
    } else {
        (value - step).max(target)
    }
}

/// One tick of linear movement
///
/// The full step is tried first, then ever shorter steps along the same
/// heading. Sliding movers then try moving along x only, then y only. A
/// mover that cannot go anywhere stops.
pub fn step_move_linear(world: &mut World, map: MapId, id: ObjectId) -> SimResult<()> {
    let obj = world.object(id)?;
    let Some(Move::Linear { dest, speed, slide }) = obj.movement.clone() else {
        return Ok(());
    };
    let here = obj.anchor;
    let remaining = distance(here, dest);
    if remaining < ARRIVAL_EPSILON {
        return clear_move_linear(world, map, id);
    }

    let heading = angle(here, dest);
    world.object_mut(id)?.direction = Some(heading);

    let full = world.settings.per_tick(speed);
    let mut step = full;
    let mut target = None;
    while step > MIN_STEP {
        let candidate = if step >= remaining {
            dest
        } else {
            project(here, heading, step)
        };
        if world.check_move(map, id, candidate) {
            target = Some(candidate);
            break;
        }
        step *= STEP_SHRINK;
    }

    if target.is_none() && slide {
        let along_x = Vec2::new(toward(here.x, dest.x, full), here.y);
        let along_y = Vec2::new(here.x, toward(here.y, dest.y, full));
        if along_x != here && world.check_move(map, id, along_x) {
            target = Some(along_x);
        } else if along_y != here && world.check_move(map, id, along_y) {
            target = Some(along_y);
        }
    }

    let Some(target) = target else {
        log::debug!("Linear move of {:?} blocked, stopping", id);
        return clear_move_linear(world, map, id);
    };

    world.set_object_location_by_anchor(map, id, target)?;
    if distance(target, dest) < ARRIVAL_EPSILON || distance(here, target) < ARRIVAL_EPSILON {
        clear_move_linear(world, map, id)?;
    }
    Ok(())
}
