//! Built-in mechanics
//!
//! Each mechanic is a plain module exposing `register(&mut Registry)` plus
//! its setter/clearer operations. Hosts pick the ones a map needs, or take
//! them all with [`register_builtin`].

pub mod linear;
pub mod orbit;
pub mod poly;
pub mod push;

use crate::sim::dispatch::Registry;

/// Linear, orbit and path movement
pub fn register_movement(registry: &mut Registry) {
    linear::register(registry);
    orbit::register(registry);
    poly::register(registry);
}

/// Every built-in mechanic, push included
pub fn register_builtin(registry: &mut Registry) {
    register_movement(registry);
    push::register(registry);
}
