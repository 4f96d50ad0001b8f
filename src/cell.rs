//! This module defines the `Cell` struct, one discretized grid location.
use bevy::math::{UVec2, Vec2};

use crate::{queue::Queueable, Cost};

/// A single location in a [`NavGrid`](crate::grid::NavGrid).
///
/// Pure data: the search algorithm mutates the score fields during a run
/// and obstacle edits flip `walkable` between runs. Scores are only
/// meaningful while the run that wrote them is alive; every run resets them
/// before touching the grid.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Grid coordinates of this cell.
    pub coords: UVec2,
    /// World-space center of this cell.
    pub world: Vec2,
    /// Whether agents may move through this cell.
    pub walkable: bool,
    /// Set for cells on the outer boundary of the grid.
    pub wall: bool,
    /// How many agents currently block this cell.
    pub occupancy: u32,
    /// Accumulated cost from the start of the current search run.
    pub(crate) g: Cost,
    /// Heuristic estimate to the current search target.
    pub(crate) h: Cost,
    /// Predecessor on the best known path, as grid coordinates.
    pub(crate) parent: Option<UVec2>,
    /// Slot in the open-set priority queue while enqueued.
    pub(crate) slot: Option<u32>,
}

impl Cell {
    pub(crate) fn new(coords: UVec2, world: Vec2, walkable: bool, wall: bool) -> Self {
        Cell {
            coords,
            world,
            walkable,
            wall,
            occupancy: u32::from(!walkable),
            g: 0,
            h: 0,
            parent: None,
            slot: None,
        }
    }

    /// Accumulated cost from the start of the current search run.
    pub fn g(&self) -> Cost {
        self.g
    }

    /// Heuristic estimate to the current search target.
    pub fn h(&self) -> Cost {
        self.h
    }

    /// Estimated total cost through this cell. Derived, never stored.
    pub fn f(&self) -> Cost {
        self.g + self.h
    }

    pub(crate) fn reset_search_state(&mut self) {
        self.g = 0;
        self.h = 0;
        self.parent = None;
        self.slot = None;
    }
}

impl Queueable for Cell {
    fn priority(&self) -> (Cost, Cost) {
        (self.f(), self.h)
    }

    fn queue_slot(&self) -> Option<u32> {
        self.slot
    }

    fn set_queue_slot(&mut self, slot: Option<u32>) {
        self.slot = slot;
    }
}
