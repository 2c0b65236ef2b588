//! Mechanic registry and step dispatcher
//!
//! Mechanics register handlers per phase with an integer priority (lower
//! runs first, ties in registration order). A [`Dispatcher`] is built once
//! per map from a [`Registry`]: init handlers run alphabetically by name,
//! then every phase's handlers are sorted for good.
//!
//! Each tick runs, in order: step-start handlers, trigger handlers for every
//! sprite touching a trigger, movement handlers for every moving sprite, and
//! step-end handlers.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use super::collision::{Overlap, collides, supports_partial};
use super::map::{Layer, MapId};
use super::object::{MoveKind, ObjectId};
use super::world::World;
use crate::consts::DEFAULT_PRIORITY;
use crate::error::SimResult;

/// Dispatcher phases, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Init,
    StepStart,
    Trigger,
    StepMove,
    StepEnd,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Init => "Init",
            Phase::StepStart => "StepStart",
            Phase::Trigger => "Trigger",
            Phase::StepMove => "StepMove",
            Phase::StepEnd => "StepEnd",
        }
    }
}

/// Returned by trigger handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerFlow {
    #[default]
    Continue,
    /// Skip the remaining triggers for this sprite this tick
    Stop,
}

pub type InitFn = Box<dyn FnOnce(&mut World, MapId) -> SimResult<()>>;
pub type StepFn = Box<dyn FnMut(&mut World, MapId) -> SimResult<()>>;
/// Called as `(world, map, trigger, sprite)`
pub type TriggerFn = Box<dyn FnMut(&mut World, MapId, ObjectId, ObjectId) -> SimResult<TriggerFlow>>;
pub type MoveFn = Box<dyn FnMut(&mut World, MapId, ObjectId) -> SimResult<()>>;

struct Handler<F> {
    name: String,
    priority: i32,
    seq: usize,
    f: F,
}

fn sort_handlers<F>(handlers: &mut [Handler<F>]) {
    handlers.sort_by_key(|h| (h.priority, h.seq));
}

/// Insert or replace (same name) a handler
fn upsert<F>(list: &mut Vec<Handler<F>>, handler: Handler<F>, phase: Phase) {
    if let Some(existing) = list.iter_mut().find(|h| h.name == handler.name) {
        log::warn!("{} handler '{}' registered twice, keeping the last", phase.as_str(), handler.name);
        *existing = handler;
    } else {
        list.push(handler);
    }
}

/// Handler registrations for one map, consumed by [`Dispatcher::build`]
#[derive(Default)]
pub struct Registry {
    inits: Vec<(String, InitFn)>,
    step_start: Vec<Handler<StepFn>>,
    triggers: Vec<Handler<TriggerFn>>,
    moves: Vec<Handler<(MoveKind, MoveFn)>>,
    step_end: Vec<Handler<StepFn>>,
    seq: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&mut self) -> usize {
        self.seq += 1;
        self.seq
    }

    /// Runs once when the dispatcher is built
    pub fn on_init(
        &mut self,
        name: impl Into<String>,
        f: impl FnOnce(&mut World, MapId) -> SimResult<()> + 'static,
    ) -> &mut Self {
        self.inits.push((name.into(), Box::new(f)));
        self
    }

    pub fn on_step_start(
        &mut self,
        name: impl Into<String>,
        priority: Option<i32>,
        f: impl FnMut(&mut World, MapId) -> SimResult<()> + 'static,
    ) -> &mut Self {
        let handler = Handler {
            name: name.into(),
            priority: priority.unwrap_or(DEFAULT_PRIORITY),
            seq: self.next_seq(),
            f: Box::new(f) as StepFn,
        };
        upsert(&mut self.step_start, handler, Phase::StepStart);
        self
    }

    pub fn on_step_end(
        &mut self,
        name: impl Into<String>,
        priority: Option<i32>,
        f: impl FnMut(&mut World, MapId) -> SimResult<()> + 'static,
    ) -> &mut Self {
        let handler = Handler {
            name: name.into(),
            priority: priority.unwrap_or(DEFAULT_PRIORITY),
            seq: self.next_seq(),
            f: Box::new(f) as StepFn,
        };
        upsert(&mut self.step_end, handler, Phase::StepEnd);
        self
    }

    /// Handle triggers whose type is `trigger_type`
    pub fn on_trigger(
        &mut self,
        trigger_type: impl Into<String>,
        priority: Option<i32>,
        f: impl FnMut(&mut World, MapId, ObjectId, ObjectId) -> SimResult<TriggerFlow> + 'static,
    ) -> &mut Self {
        let handler = Handler {
            name: trigger_type.into(),
            priority: priority.unwrap_or(DEFAULT_PRIORITY),
            seq: self.next_seq(),
            f: Box::new(f) as TriggerFn,
        };
        upsert(&mut self.triggers, handler, Phase::Trigger);
        self
    }

    /// Move every sprite whose movement is of `kind`
    pub fn on_move(
        &mut self,
        kind: MoveKind,
        priority: Option<i32>,
        f: impl FnMut(&mut World, MapId, ObjectId) -> SimResult<()> + 'static,
    ) -> &mut Self {
        let handler = Handler {
            name: kind.as_str().to_string(),
            priority: priority.unwrap_or(DEFAULT_PRIORITY),
            seq: self.next_seq(),
            f: (kind, Box::new(f) as MoveFn),
        };
        upsert(&mut self.moves, handler, Phase::StepMove);
        self
    }

    /// Change a registered handler's priority; returns false if there is
    /// no such handler (init handlers have no priority)
    pub fn set_priority(&mut self, phase: Phase, name: &str, priority: i32) -> bool {
        fn set<F>(list: &mut [Handler<F>], name: &str, priority: i32) -> bool {
            match list.iter_mut().find(|h| h.name == name) {
                Some(h) => {
                    h.priority = priority;
                    true
                }
                None => false,
            }
        }
        match phase {
            Phase::Init => false,
            Phase::StepStart => set(&mut self.step_start, name, priority),
            Phase::Trigger => set(&mut self.triggers, name, priority),
            Phase::StepMove => set(&mut self.moves, name, priority),
            Phase::StepEnd => set(&mut self.step_end, name, priority),
        }
    }
}

/// Sorted handler tables for one map
pub struct Dispatcher {
    map_name: String,
    step_start: Vec<Handler<StepFn>>,
    triggers: Vec<Handler<TriggerFn>>,
    trigger_index: HashMap<String, usize>,
    moves: Vec<Handler<(MoveKind, MoveFn)>>,
    step_end: Vec<Handler<StepFn>>,
}

impl Dispatcher {
    /// Run init handlers (alphabetically) and freeze handler order
    pub fn build(registry: Registry, world: &mut World, map: MapId) -> SimResult<Self> {
        let Registry {
            mut inits,
            mut step_start,
            mut triggers,
            mut moves,
            mut step_end,
            ..
        } = registry;

        inits.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, init) in inits {
            log::debug!("Map {}: init {}", world.map(map).name, name);
            init(world, map)?;
        }

        sort_handlers(&mut step_start);
        sort_handlers(&mut triggers);
        sort_handlers(&mut moves);
        sort_handlers(&mut step_end);
        let trigger_index = triggers.iter().enumerate().map(|(i, h)| (h.name.clone(), i)).collect();

        let dispatcher = Self {
            map_name: world.map(map).name.clone(),
            step_start,
            triggers,
            trigger_index,
            moves,
            step_end,
        };
        log::debug!("Map {} handlers:\n{}", dispatcher.map_name, dispatcher.describe());
        Ok(dispatcher)
    }

    pub fn has_trigger_handler(&self, trigger_type: &str) -> bool {
        self.trigger_index.contains_key(trigger_type)
    }

    /// Handler table in run order, one line per handler
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for h in &self.step_start {
            let _ = writeln!(out, "{:<10} {:>4}  {}", Phase::StepStart.as_str(), h.priority, h.name);
        }
        for h in &self.triggers {
            let _ = writeln!(out, "{:<10} {:>4}  {}", Phase::Trigger.as_str(), h.priority, h.name);
        }
        for h in &self.moves {
            let _ = writeln!(out, "{:<10} {:>4}  {}", Phase::StepMove.as_str(), h.priority, h.name);
        }
        for h in &self.step_end {
            let _ = writeln!(out, "{:<10} {:>4}  {}", Phase::StepEnd.as_str(), h.priority, h.name);
        }
        out
    }

    fn on_map(world: &World, map: MapId, sprite: ObjectId) -> bool {
        world.objects.contains_key(sprite) && world.map(map).contains(&Layer::Sprites, sprite)
    }

    /// Triggers `sprite` currently touches, with their handler index, in
    /// handler priority order
    fn colliding_triggers(
        &self,
        world: &World,
        map: MapId,
        sprite: ObjectId,
        reported: &mut HashSet<ObjectId>,
    ) -> Vec<(ObjectId, usize)> {
        let Some(s) = world.objects.get(sprite) else {
            return Vec::new();
        };
        let collider = s.collider();
        let mut hits = Vec::new();
        for &tid in world.map(map).triggers() {
            if tid == sprite || s.do_not_trigger.contains(&tid) {
                continue;
            }
            let Some(t) = world.objects.get(tid) else {
                continue;
            };
            if t.do_not_trigger.contains(&sprite) || !supports_partial(s.collision, t.collision) {
                continue;
            }
            if !collides(&collider, &t.collider(), Overlap::Partial, None, None) {
                continue;
            }
            match self.trigger_index.get(&t.kind) {
                Some(&index) => hits.push((tid, index)),
                None => {
                    if reported.insert(tid) {
                        log::error!(
                            "Map {}: no trigger handler for type '{}' ({})",
                            self.map_name,
                            t.kind,
                            t.label()
                        );
                    }
                }
            }
        }
        // handler indices already follow priority order
        hits.sort_by_key(|(_, index)| *index);
        hits
    }

    /// Run one tick on `map`
    ///
    /// The first handler error aborts the rest of this map's tick.
    pub fn step(&mut self, world: &mut World, map: MapId) -> SimResult<()> {
        for h in &mut self.step_start {
            (h.f)(world, map)?;
        }

        let mut reported = HashSet::new();
        let sprites = world.map(map).sprites().to_vec();
        for sprite in sprites {
            if !Self::on_map(world, map, sprite) {
                continue;
            }
            let hits = self.colliding_triggers(world, map, sprite, &mut reported);
            for (trigger, index) in hits {
                if !Self::on_map(world, map, sprite) {
                    break;
                }
                if !world.objects.contains_key(trigger) {
                    continue;
                }
                let handler = &mut self.triggers[index];
                if (handler.f)(world, map, trigger, sprite)? == TriggerFlow::Stop {
                    break;
                }
            }
        }

        for h in &mut self.moves {
            let (kind, f) = &mut h.f;
            let sprites = world.map(map).sprites().to_vec();
            for sprite in sprites {
                if !Self::on_map(world, map, sprite) {
                    continue;
                }
                if world.objects.get(sprite).and_then(|o| o.move_kind()) == Some(*kind) {
                    f(world, map, sprite)?;
                }
            }
        }

        for h in &mut self.step_end {
            (h.f)(world, map)?;
        }
        Ok(())
    }
}
