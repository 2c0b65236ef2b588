//! Orbit around a reference object

use crate::error::{SimError, SimResult};
use crate::sim::dispatch::Registry;
use crate::sim::geometry::{angle, distance, normalize_angle, project};
use crate::sim::{Layer, MapId, Move, MoveKind, ObjectId, ObjectQuery, World};

pub fn register(registry: &mut Registry) {
    registry.on_move(MoveKind::Orbit, None, step_move_orbit);
}

fn find_center(world: &World, map: MapId, center: &str) -> SimResult<ObjectId> {
    world
        .find_object(map, &ObjectQuery::on(Layer::Reference).name(center))
        .ok_or_else(|| SimError::MissingReference {
            mechanic: "orbit",
            name: center.to_string(),
            map: world.map(map).name.clone(),
        })
}

/// Orbit the reference object `center` at `speed` px/s
///
/// Radius and start angle default to the object's current distance and
/// heading from the centre.
#[allow(clippy::too_many_arguments)]
pub fn set_move_orbit(
    world: &mut World,
    map: MapId,
    id: ObjectId,
    center: &str,
    speed: f32,
    bounce: bool,
    radius: Option<f32>,
    start_angle: Option<f32>,
) -> SimResult<()> {
    let c = world.object(find_center(world, map, center)?)?.anchor;
    let here = world.object(id)?.anchor;
    world.object_mut(id)?.movement = Some(Move::Orbit {
        center: center.to_string(),
        radius: radius.unwrap_or_else(|| distance(c, here)),
        angle: start_angle.unwrap_or_else(|| angle(c, here)),
        speed,
        bounce,
    });
    world.map_mut(map).set_changed();
    Ok(())
}

pub fn clear_move_orbit(world: &mut World, map: MapId, id: ObjectId) -> SimResult<()> {
    let obj = world.object_mut(id)?;
    if matches!(obj.movement, Some(Move::Orbit { .. })) {
        obj.clear_move();
        world.map_mut(map).set_changed();
    }
    Ok(())
}

/// One tick of orbital movement
///
/// The angle advances by the step's share of the circumference. A blocked
/// orbiter reverses if it bounces and stops otherwise.
pub fn step_move_orbit(world: &mut World, map: MapId, id: ObjectId) -> SimResult<()> {
    let obj = world.object(id)?;
    let Some(Move::Orbit {
        center,
        radius,
        angle: current,
        speed,
        bounce,
    }) = obj.movement.clone()
    else {
        return Ok(());
    };
    let here = obj.anchor;

    let c = match find_center(world, map, &center) {
        Ok(cid) => world.object(cid)?.anchor,
        Err(err) => {
            clear_move_orbit(world, map, id)?;
            return Err(err);
        }
    };

    let step = world.settings.per_tick(speed);
    let next = if radius > f32::EPSILON {
        normalize_angle(current + step / radius)
    } else {
        current
    };
    let target = project(c, next, radius);

    if world.check_move(map, id, target) {
        let obj = world.object_mut(id)?;
        if let Some(Move::Orbit { angle, .. }) = obj.movement.as_mut() {
            *angle = next;
        }
        if target != here {
            obj.direction = Some(angle(here, target));
        }
        world.set_object_location_by_anchor(map, id, target)?;
    } else if bounce {
        if let Some(Move::Orbit { speed, .. }) = world.object_mut(id)?.movement.as_mut() {
            *speed = -*speed;
        }
    } else {
        clear_move_orbit(world, map, id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Settings, StepPolicy};
    use crate::sim::{CollisionType, Map, ObjectDef, Simulation};
    use glam::Vec2;
    use std::f32::consts::{PI, TAU};

    fn setup() -> (Simulation, MapId, ObjectId) {
        let mut world = World::new(Settings {
            step_policy: StepPolicy::All,
            ..Settings::default()
        });
        let map = world.add_map(Map::new("space", 10, 10, 32.0, 32.0));
        world
            .spawn(map, ObjectDef::new("sun", "").with_anchor(160.0, 160.0), &[Layer::Reference])
            .unwrap();
        let planet = world
            .spawn(map, ObjectDef::new("planet", "").with_anchor(260.0, 160.0), &[Layer::Sprites])
            .unwrap();
        let mut sim = Simulation::new(world);
        let mut registry = Registry::new();
        register(&mut registry);
        sim.attach(map, registry).unwrap();
        (sim, map, planet)
    }

    #[test]
    fn test_full_revolution() {
        let (mut sim, map, planet) = setup();
        // one revolution in 60 ticks at 30 ticks/s
        let speed = TAU * 100.0 * 30.0 / 60.0;
        set_move_orbit(&mut sim.world, map, planet, "sun", speed, false, None, None).unwrap();
        match &sim.world.object(planet).unwrap().movement {
            Some(Move::Orbit { radius, angle, .. }) => {
                assert!((radius - 100.0).abs() < 1e-4);
                assert!(angle.abs() < 1e-6);
            }
            other => panic!("unexpected move {:?}", other),
        }

        sim.run(30);
        let half = sim.world.object(planet).unwrap().anchor;
        assert!(half.distance(Vec2::new(60.0, 160.0)) < 0.05);

        sim.run(30);
        let obj = sim.world.object(planet).unwrap();
        assert!(obj.anchor.distance(Vec2::new(260.0, 160.0)) < 0.05);
        let Some(Move::Orbit { angle, .. }) = &obj.movement else {
            panic!("orbit was cleared");
        };
        assert!(angle.min(TAU - angle) < 1e-3);
    }

    #[test]
    fn test_bounce_reverses() {
        let (mut sim, map, planet) = setup();
        // a wall just below the sun's right side, in the clockwise path
        sim.world
            .spawn(
                map,
                ObjectDef::new("wall", "")
                    .with_rect(240.0, 200.0, 60.0, 20.0)
                    .with_collision(CollisionType::Rect),
                &[Layer::Sprites],
            )
            .unwrap();
        set_move_orbit(&mut sim.world, map, planet, "sun", 300.0, true, None, None).unwrap();

        sim.run(30);
        let obj = sim.world.object(planet).unwrap();
        let Some(Move::Orbit { speed, .. }) = &obj.movement else {
            panic!("bouncing orbit was cleared");
        };
        assert!(*speed < 0.0);
        // never got past the wall
        assert!(obj.anchor.y < 200.0);
    }

    #[test]
    fn test_blocked_without_bounce_stops() {
        let (mut sim, map, planet) = setup();
        // the orbit at radius 200 leaves the map
        set_move_orbit(&mut sim.world, map, planet, "sun", 300.0, false, Some(200.0), Some(PI)).unwrap();
        sim.run(1);
        assert!(sim.world.object(planet).unwrap().movement.is_none());
    }

    #[test]
    fn test_missing_center() {
        let (mut sim, map, planet) = setup();
        let err = set_move_orbit(&mut sim.world, map, planet, "moon", 100.0, false, None, None).unwrap_err();
        assert!(matches!(err, SimError::MissingReference { mechanic: "orbit", .. }));

        sim.world.object_mut(planet).unwrap().movement = Some(Move::Orbit {
            center: "moon".into(),
            radius: 50.0,
            angle: 0.0,
            speed: 100.0,
            bounce: false,
        });
        let report = sim.tick();
        assert_eq!(report.failures.len(), 1);
        assert!(sim.world.object(planet).unwrap().movement.is_none());
    }
}
