//! Message contracts consumed by the plugin systems.
//!
//! Callbacks ride inside the events, so the intake systems drain the event
//! buffers by value; each callback is owned by exactly one consumer and
//! fires at most once.
use bevy::{math::Vec2, prelude::Event};

use crate::{astar::Heuristic, manager::PathCallback};

/// Asks the request manager for a path between two world positions.
#[derive(Event)]
pub struct RequestPath {
    pub start: Vec2,
    pub target: Vec2,
    pub heuristic: Heuristic,
    pub simplify: bool,
    pub callback: PathCallback,
}

/// Marks the cells nearest to each point, and their neighbors, walkable.
#[derive(Event)]
pub struct SetWalkable {
    pub points: Vec<Vec2>,
}

/// Rebuilds the grid wholesale from its stored probe and geometry.
///
/// Fails any in-flight search first; queued requests survive and run
/// against the rebuilt grid.
#[derive(Event)]
pub struct RequestRebuildGrid {
    pub callback: Option<Box<dyn FnOnce() + Send + Sync>>,
}

/// Resolves the world position of the grid's center cell.
#[derive(Event)]
pub struct RequestGridCenter {
    pub callback: Box<dyn FnOnce(Vec2) + Send + Sync>,
}
