//! Pushable objects
//!
//! A mover blocked by a "pushable" sprite shoves it along the dominant axis
//! of its motion, just far enough to clear the spot it is moving into.
//! Only pushables lying ahead of the mover along that axis move. The
//! push is all or nothing: every pushable in the way must land on a valid
//! location and the mover must then fit, otherwise nothing moves.

use glam::Vec2;

use crate::consts::{PUSH_GAP, PUSH_MAX_DISTANCE, PUSHABLE_TYPE};
use crate::sim::dispatch::Registry;
use crate::sim::{Collider, CollisionType, Layer, MapId, ObjectId, ObjectQuery, Overlap, Rect, World};

/// Turn every pushable on the map into a rect and install the resolver
pub fn register(registry: &mut Registry) {
    registry.on_init("push", |world, map| {
        let pushables = world.find_objects(map, &ObjectQuery::on(Layer::Sprites).kind(PUSHABLE_TYPE));
        for id in &pushables {
            world.object_mut(*id)?.collision = CollisionType::Rect;
        }
        log::debug!("{} pushable(s) on {}", pushables.len(), world.map(map).name);
        world.map_mut(map).add_blocked_move_resolver(resolve_push);
        Ok(())
    });
}

/// Area the mover would occupy at its candidate anchor
fn footprint(candidate: &Collider) -> Rect {
    match candidate.collision {
        CollisionType::Anchor => Rect::new(candidate.anchor.x, candidate.anchor.y, 0.0, 0.0),
        CollisionType::Circle => {
            let r = candidate.rect.width / 2.0;
            Rect::new(candidate.anchor.x - r, candidate.anchor.y - r, r * 2.0, r * 2.0)
        }
        _ => candidate.rect,
    }
}

/// Is `rect` entirely ahead of `area` along `delta`'s dominant axis?
fn is_ahead(area: Rect, rect: Rect, delta: Vec2) -> bool {
    if delta.x.abs() >= delta.y.abs() {
        if delta.x > 0.0 {
            rect.x >= area.max().x
        } else {
            rect.max().x <= area.x
        }
    } else if delta.y > 0.0 {
        rect.y >= area.max().y
    } else {
        rect.max().y <= area.y
    }
}

/// Shift that moves `rect` clear of `area` travelling along `delta`'s
/// dominant axis
fn clearing_shift(area: Rect, rect: Rect, delta: Vec2) -> Vec2 {
    if delta.x.abs() >= delta.y.abs() {
        if delta.x > 0.0 {
            Vec2::new(area.max().x + PUSH_GAP - rect.x, 0.0)
        } else {
            Vec2::new(area.x - PUSH_GAP - rect.max().x, 0.0)
        }
    } else if delta.y > 0.0 {
        Vec2::new(0.0, area.max().y + PUSH_GAP - rect.y)
    } else {
        Vec2::new(0.0, area.y - PUSH_GAP - rect.max().y)
    }
}

/// Blocked-move resolver: push whatever pushables stand at `anchor`
pub fn resolve_push(world: &mut World, map: MapId, id: ObjectId, anchor: Vec2) -> bool {
    let Ok(mover) = world.object(id) else {
        return false;
    };
    if mover.kind == PUSHABLE_TYPE || mover.map_name != world.map(map).name {
        return false;
    }
    let delta = anchor - mover.anchor;
    let travel = delta.length();
    if travel <= 0.0 || travel > PUSH_MAX_DISTANCE {
        return false;
    }

    let current = footprint(&mover.collider());
    let candidate = mover.collider().at_anchor(anchor);
    let area = footprint(&candidate);
    let query = ObjectQuery::on(Layer::Sprites)
        .kind(PUSHABLE_TYPE)
        .exclude(id)
        .colliding(candidate, Overlap::Partial);
    let in_the_way = world.find_objects(map, &query);
    if in_the_way.is_empty() {
        return false;
    }

    let mut pushes = Vec::with_capacity(in_the_way.len());
    for pid in in_the_way {
        let Ok(p) = world.object(pid) else {
            return false;
        };
        // only what lies ahead gets pushed; anything beside or behind blocks
        if !is_ahead(current, p.rect(), delta) {
            log::trace!("{} is not ahead of the mover", p.label());
            return false;
        }
        let target = p.anchor + clearing_shift(area, p.rect(), delta);
        if !world.check_location(map, pid, target, false) {
            log::trace!("{} cannot be pushed to {:?}", p.label(), target);
            return false;
        }
        pushes.push((pid, p.anchor, target));
    }

    for &(pid, _, target) in &pushes {
        if let Err(err) = world.set_object_location_by_anchor(map, pid, target) {
            log::warn!("Push failed: {}", err);
            revert(world, map, &pushes);
            return false;
        }
    }

    if world.check_location(map, id, anchor, false) {
        true
    } else {
        revert(world, map, &pushes);
        false
    }
}

fn revert(world: &mut World, map: MapId, pushes: &[(ObjectId, Vec2, Vec2)]) {
    for &(pid, original, _) in pushes {
        if let Err(err) = world.set_object_location_by_anchor(map, pid, original) {
            log::warn!("Could not restore pushed object: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::PLAYER_TYPE;
    use crate::mechanics::linear::{self, set_move_linear};
    use crate::settings::{Settings, StepPolicy};
    use crate::sim::{Map, ObjectDef, Simulation};

    fn setup(crate_x: f32) -> (Simulation, MapId, ObjectId, ObjectId) {
        let mut world = World::new(Settings {
            step_policy: StepPolicy::All,
            ..Settings::default()
        });
        let map = world.add_map(Map::new("warehouse", 10, 10, 32.0, 32.0));
        let player = world
            .spawn(map, ObjectDef::new("p1", PLAYER_TYPE).with_anchor(50.0, 100.0), &[Layer::Sprites])
            .unwrap();
        let block = world
            .spawn(
                map,
                ObjectDef::new("crate", PUSHABLE_TYPE).with_rect(crate_x, 90.0, 20.0, 20.0),
                &[Layer::Sprites],
            )
            .unwrap();
        (Simulation::new(world), map, player, block)
    }

    fn attach(sim: &mut Simulation, map: MapId) {
        let mut registry = Registry::new();
        linear::register(&mut registry);
        register(&mut registry);
        sim.attach(map, registry).unwrap();
    }

    #[test]
    fn test_init_makes_pushables_rects() {
        let (mut sim, map, _, block) = setup(60.0);
        assert_eq!(sim.world.object(block).unwrap().collision, CollisionType::Anchor);
        attach(&mut sim, map);
        assert_eq!(sim.world.object(block).unwrap().collision, CollisionType::Rect);
        assert_eq!(sim.world.map(map).blocked_move_resolvers().len(), 1);
    }

    #[test]
    fn test_player_pushes_crate() {
        let (mut sim, map, player, block) = setup(60.0);
        attach(&mut sim, map);
        // 10 px per tick toward the crate
        set_move_linear(&mut sim.world, map, player, Vec2::new(150.0, 100.0), 300.0, false).unwrap();

        sim.run(5);
        let p = sim.world.object(player).unwrap().anchor;
        let c = sim.world.object(block).unwrap();
        assert!((p - Vec2::new(100.0, 100.0)).length() < 1e-3);
        // the crate sits just ahead of the player
        assert!(c.x > p.x && c.x - p.x < 0.01);
        assert_eq!(c.y, 90.0);
        assert!((c.anchor - Vec2::new(c.x + 10.0, 100.0)).length() < 1e-3);
    }

    #[test]
    fn test_crate_against_wall_blocks_player() {
        let (mut sim, map, player, block) = setup(80.0);
        let wall = sim
            .world
            .spawn(
                map,
                ObjectDef::new("wall", "wall")
                    .with_rect(100.0, 80.0, 20.0, 40.0)
                    .with_collision(CollisionType::Rect),
                &[Layer::Sprites],
            )
            .unwrap();
        attach(&mut sim, map);
        set_move_linear(&mut sim.world, map, player, Vec2::new(150.0, 100.0), 300.0, false).unwrap();

        sim.run(30);
        let p = sim.world.object(player).unwrap();
        assert!(p.movement.is_none());
        assert!(p.anchor.x < 80.0 && p.anchor.x > 79.9);
        let c = sim.world.object(block).unwrap();
        assert_eq!((c.x, c.y), (80.0, 90.0));
        assert_eq!(sim.world.object(wall).unwrap().x, 100.0);
    }

    #[test]
    fn test_no_push_for_teleports_or_pushables() {
        let (mut sim, map, player, block) = setup(60.0);
        attach(&mut sim, map);
        // more than the push distance away
        assert!(!resolve_push(&mut sim.world, map, player, Vec2::new(110.0, 100.0)));
        // pushables never push
        let other = sim
            .world
            .spawn(
                map,
                ObjectDef::new("crate2", PUSHABLE_TYPE)
                    .with_rect(20.0, 90.0, 20.0, 20.0)
                    .with_collision(CollisionType::Rect),
                &[Layer::Sprites],
            )
            .unwrap();
        assert!(!resolve_push(&mut sim.world, map, other, Vec2::new(45.0, 100.0)));
        assert_eq!(sim.world.object(block).unwrap().x, 60.0);
    }

    #[test]
    fn test_push_upward() {
        let (mut sim, map, player, block) = setup(40.0);
        attach(&mut sim, map);
        // the crate covers (40..60, 90..110); step up into it from below
        sim.world.set_object_location_by_anchor(map, player, Vec2::new(50.0, 115.0)).unwrap();
        assert!(sim.world.check_move(map, player, Vec2::new(50.0, 105.0)));
        let c = sim.world.object(block).unwrap();
        assert!((c.y + 20.0 - (105.0 - PUSH_GAP)).abs() < 1e-3);
        assert_eq!(c.x, 40.0);
    }

    #[test]
    fn test_crate_behind_mover_blocks() {
        let (mut sim, map, _, _) = setup(60.0);
        let mover = sim
            .world
            .spawn(
                map,
                ObjectDef::new("cart", "npc")
                    .with_rect(40.0, 40.0, 20.0, 20.0)
                    .with_collision(CollisionType::Rect),
                &[Layer::Sprites],
            )
            .unwrap();
        // touching the cart's lower-left corner once it steps right and down
        let behind = sim
            .world
            .spawn(
                map,
                ObjectDef::new("crate2", PUSHABLE_TYPE).with_rect(31.0, 61.0, 20.0, 20.0),
                &[Layer::Sprites],
            )
            .unwrap();
        attach(&mut sim, map);

        assert!(!sim.world.check_move(map, mover, Vec2::new(60.0, 55.0)));
        let c = sim.world.object(behind).unwrap();
        assert_eq!((c.x, c.y), (31.0, 61.0));
        assert_eq!(sim.world.object(mover).unwrap().anchor, Vec2::new(50.0, 50.0));
    }
}
