//! Fixed timestep simulation tick
//!
//! The [`Simulation`] owns the world and one dispatcher per attached map.
//! Each external tick steps the selected maps in name order; a map whose
//! handlers fail is logged and skipped for that tick, the rest carry on.

use std::time::{Duration, Instant};

use super::dispatch::{Dispatcher, Registry};
use super::map::{Layer, MapId};
use super::world::World;
use crate::consts::PLAYER_TYPE;
use crate::error::{SimError, SimResult};
use crate::settings::StepPolicy;

/// Step statistics for one map
#[derive(Debug, Clone, Copy, Default)]
pub struct MapStats {
    pub steps: u64,
    pub total: Duration,
}

impl MapStats {
    /// Average wall time per step in milliseconds
    pub fn average_ms(&self) -> f64 {
        if self.steps == 0 {
            return 0.0;
        }
        self.total.as_secs_f64() * 1000.0 / self.steps as f64
    }
}

/// Outcome of one [`Simulation::tick`]
#[derive(Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    /// Maps that were stepped, in step order (failed ones included)
    pub stepped: Vec<MapId>,
    pub failures: Vec<(MapId, SimError)>,
}

pub struct Simulation {
    pub world: World,
    dispatchers: Vec<Option<Dispatcher>>,
    stats: Vec<MapStats>,
    ticks: u64,
}

impl Simulation {
    pub fn new(world: World) -> Self {
        Self {
            world,
            dispatchers: Vec::new(),
            stats: Vec::new(),
            ticks: 0,
        }
    }

    /// Build a dispatcher for `map` from `registry`, running its init handlers
    ///
    /// Attaching again replaces the previous dispatcher.
    pub fn attach(&mut self, map: MapId, registry: Registry) -> SimResult<()> {
        let dispatcher = Dispatcher::build(registry, &mut self.world, map)?;
        let index = map.index();
        if self.dispatchers.len() <= index {
            self.dispatchers.resize_with(index + 1, || None);
            self.stats.resize(index + 1, MapStats::default());
        }
        self.dispatchers[index] = Some(dispatcher);
        log::info!("Attached map {}", self.world.map(map).name);
        Ok(())
    }

    pub fn is_attached(&self, map: MapId) -> bool {
        self.dispatchers.get(map.index()).is_some_and(Option::is_some)
    }

    /// Does the map have at least one player sprite?
    pub fn is_occupied(&self, map: MapId) -> bool {
        self.world.map(map).list(&Layer::Sprites).iter().any(|id| {
            self.world
                .objects
                .get(*id)
                .is_some_and(|o| o.kind == PLAYER_TYPE)
        })
    }

    /// Step one map regardless of the step policy
    pub fn step_map(&mut self, map: MapId) -> SimResult<()> {
        let Some(Some(dispatcher)) = self.dispatchers.get_mut(map.index()) else {
            return Err(SimError::UnknownMap(self.world.map(map).name.clone()));
        };
        let start = Instant::now();
        let result = dispatcher.step(&mut self.world, map);
        let stats = &mut self.stats[map.index()];
        stats.steps += 1;
        stats.total += start.elapsed();
        result
    }

    /// Advance every selected map by one tick
    pub fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport {
            tick: self.ticks,
            ..Default::default()
        };

        let policy = self.world.settings.step_policy;
        for map in self.world.map_ids_by_name() {
            if !self.is_attached(map) {
                continue;
            }
            if policy == StepPolicy::Occupied && !self.is_occupied(map) {
                continue;
            }
            report.stepped.push(map);
            if let Err(err) = self.step_map(map) {
                log::error!(
                    "Tick {}: map {} failed: {}",
                    self.ticks,
                    self.world.map(map).name,
                    err
                );
                report.failures.push((map, err));
            }
        }
        report
    }

    /// Run `n` ticks, returning the number of map failures
    pub fn run(&mut self, n: u64) -> usize {
        (0..n).map(|_| self.tick().failures.len()).sum()
    }

    /// Maps changed since the last call; their dirty flags are cleared
    pub fn take_changed_maps(&mut self) -> Vec<MapId> {
        let changed: Vec<MapId> = self
            .world
            .map_ids()
            .filter(|m| self.world.map(*m).changed())
            .collect();
        for m in &changed {
            self.world.map_mut(*m).reset_changed();
        }
        changed
    }

    pub fn stats(&self, map: MapId) -> MapStats {
        self.stats.get(map.index()).copied().unwrap_or_default()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Log per-map step statistics at info
    pub fn log_stats(&self) {
        for map in self.world.map_ids_by_name() {
            let stats = self.stats(map);
            if stats.steps > 0 {
                log::info!(
                    "Map {}: {} steps, avg {:.3} ms",
                    self.world.map(map).name,
                    stats.steps,
                    stats.average_ms()
                );
            }
        }
    }
}
