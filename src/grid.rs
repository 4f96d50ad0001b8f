//! This module contains the `NavGrid` resource, the navigation grid that
//! searches run against.
use std::sync::Arc;
use std::time::Instant;

use bevy::{
    log,
    math::{UVec2, Vec2},
    prelude::Resource,
};
use ndarray::Array2;
use smallvec::SmallVec;
use thiserror::Error;

use crate::{cell::Cell, neighbor::Adjacency, FxIndexSet};

/// Samples the world for obstacles while the grid is built.
///
/// Implementations report whether anything blocking overlaps a circle of
/// `radius` around `world`; cells whose probe reports an overlap start out
/// unwalkable. Any `Fn(Vec2, f32) -> bool` closure qualifies.
pub trait ObstacleProbe: Send + Sync {
    fn blocked(&self, world: Vec2, radius: f32) -> bool;
}

impl<F> ObstacleProbe for F
where
    F: Fn(Vec2, f32) -> bool + Send + Sync,
{
    fn blocked(&self, world: Vec2, radius: f32) -> bool {
        self(world, radius)
    }
}

/// Structural failures while building a grid.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// The world rectangle rounds down to zero cells on an axis. No partial
    /// grid is produced.
    #[error("grid dimensions {width}x{height} are too small")]
    TooSmall { width: i32, height: i32 },
}

/// Builder for [`NavGrid`].
///
/// Example usage:
/// ```rust,no_run
/// use bevy::math::Vec2;
/// use bevy_wayfinder::prelude::*;
///
/// let grid = NavGridBuilder::new(Vec2::new(32.0, 32.0), 0.5)
///     .origin(Vec2::new(-16.0, -16.0))
///     .diagonal_adjacency()
///     .obstacle_probe(|world: Vec2, _radius: f32| world.length() < 2.0)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct NavGridBuilder {
    world_size: Vec2,
    cell_radius: f32,
    origin: Vec2,
    adjacency: Adjacency,
    probe: Arc<dyn ObstacleProbe>,
    movement_probe: Option<Arc<dyn ObstacleProbe>>,
}

impl NavGridBuilder {
    /// Starts a builder for a grid covering `world_size`, sampled every
    /// `2 * cell_radius` world units.
    pub fn new(world_size: Vec2, cell_radius: f32) -> Self {
        NavGridBuilder {
            world_size,
            cell_radius,
            origin: Vec2::ZERO,
            adjacency: Adjacency::Cardinal,
            probe: Arc::new(|_: Vec2, _: f32| false),
            movement_probe: None,
        }
    }

    /// World position of the grid's bottom-left corner. Defaults to the
    /// world origin.
    pub fn origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    /// Expands neighbors 8-connected instead of the default 4-connected.
    pub fn diagonal_adjacency(mut self) -> Self {
        self.adjacency = Adjacency::Ordinal;
        self
    }

    /// Obstacle test deciding initial walkability. Defaults to fully open.
    pub fn obstacle_probe<P: ObstacleProbe + 'static>(mut self, probe: P) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    /// Layers a movement grid over the same world rectangle with its own
    /// walkability rules (e.g. a collision layer over the navigation
    /// layer).
    pub fn movement_probe<P: ObstacleProbe + 'static>(mut self, probe: P) -> Self {
        self.movement_probe = Some(Arc::new(probe));
        self
    }

    /// Builds the grid, probing every cell.
    pub fn build(self) -> Result<NavGrid, GridError> {
        NavGrid::from_builder(&self)
    }
}

/// Dense navigation grid over a world rectangle.
///
/// Owns one [`Cell`] per sampled location. Rebuilt wholesale on demand;
/// there are no incremental size edits. Walkability can be toggled between
/// ticks at any time, with the caveat that a request observes the grid as
/// it is while the request is being processed, not as it was when
/// submitted.
#[derive(Resource)]
pub struct NavGrid {
    dimensions: UVec2,
    cell_radius: f32,
    origin: Vec2,
    adjacency: Adjacency,
    probe: Arc<dyn ObstacleProbe>,
    cells: Array2<Cell>,
    unwalkable: FxIndexSet<UVec2>,
    movement: Option<Box<NavGrid>>,
}

impl NavGrid {
    fn from_builder(builder: &NavGridBuilder) -> Result<Self, GridError> {
        let diameter = builder.cell_radius * 2.0;
        let width = (builder.world_size.x / diameter).round() as i32;
        let height = (builder.world_size.y / diameter).round() as i32;

        if width <= 0 || height <= 0 {
            return Err(GridError::TooSmall { width, height });
        }

        let movement = match &builder.movement_probe {
            Some(probe) => {
                let mut layer = builder.clone();
                layer.probe = probe.clone();
                layer.movement_probe = None;
                Some(Box::new(NavGrid::from_builder(&layer)?))
            }
            None => None,
        };

        let mut grid = NavGrid {
            dimensions: UVec2::new(width as u32, height as u32),
            cell_radius: builder.cell_radius,
            origin: builder.origin,
            adjacency: builder.adjacency,
            probe: builder.probe.clone(),
            cells: Array2::from_shape_fn((width as usize, height as usize), |(x, y)| {
                Cell::new(UVec2::new(x as u32, y as u32), Vec2::ZERO, true, false)
            }),
            unwalkable: FxIndexSet::default(),
            movement,
        };
        grid.populate();

        Ok(grid)
    }

    /// Probes every cell and refreshes the unwalkable bookkeeping.
    fn populate(&mut self) {
        let start = Instant::now();
        let diameter = self.cell_radius * 2.0;
        let radius = self.cell_radius;
        let UVec2 {
            x: width,
            y: height,
        } = self.dimensions;
        let origin = self.origin;
        let probe = self.probe.clone();

        for ((x, y), cell) in self.cells.indexed_iter_mut() {
            let world = origin + Vec2::new(x as f32 * diameter + radius, y as f32 * diameter + radius);
            let wall = x == 0 || y == 0 || x as u32 == width - 1 || y as u32 == height - 1;
            *cell = Cell::new(UVec2::new(x as u32, y as u32), world, true, wall);
        }

        #[cfg(feature = "parallel")]
        ndarray::Zip::from(&mut self.cells).par_for_each(|cell| {
            cell.walkable = !probe.blocked(cell.world, radius);
        });

        #[cfg(not(feature = "parallel"))]
        for cell in self.cells.iter_mut() {
            cell.walkable = !probe.blocked(cell.world, radius);
        }

        self.unwalkable.clear();
        for cell in self.cells.iter_mut() {
            cell.occupancy = u32::from(!cell.walkable);
            if !cell.walkable {
                self.unwalkable.insert(cell.coords);
            }
        }

        log::info!(
            "built {}x{} navigation grid in {:?}",
            width,
            height,
            start.elapsed()
        );
    }

    /// Rebuilds the grid wholesale from its stored geometry and probe, then
    /// cascades into the movement layer.
    pub fn rebuild(&mut self) {
        crate::timed!("grid rebuild", {
            self.populate();
        });

        if let Some(movement) = self.movement.as_mut() {
            movement.rebuild();
        }
    }

    /// Returns the dimensions of the grid in cells.
    pub fn dimensions(&self) -> UVec2 {
        self.dimensions
    }

    /// Returns the width of the grid.
    pub fn width(&self) -> u32 {
        self.dimensions.x
    }

    /// Returns the height of the grid.
    pub fn height(&self) -> u32 {
        self.dimensions.y
    }

    pub fn cell_radius(&self) -> f32 {
        self.cell_radius
    }

    pub fn adjacency(&self) -> Adjacency {
        self.adjacency
    }

    pub fn cell_count(&self) -> usize {
        (self.dimensions.x * self.dimensions.y) as usize
    }

    /// The optional movement layer over the same world rectangle.
    pub fn movement(&self) -> Option<&NavGrid> {
        self.movement.as_deref()
    }

    pub fn movement_mut(&mut self) -> Option<&mut NavGrid> {
        self.movement.as_deref_mut()
    }

    /// Checks if a position is within the bounds of the grid.
    pub fn in_bounds(&self, at: UVec2) -> bool {
        at.x < self.dimensions.x && at.y < self.dimensions.y
    }

    /// The cell at `at`. Panics when out of bounds.
    pub fn cell(&self, at: UVec2) -> &Cell {
        &self.cells[[at.x as usize, at.y as usize]]
    }

    pub(crate) fn cell_mut(&mut self, at: UVec2) -> &mut Cell {
        &mut self.cells[[at.x as usize, at.y as usize]]
    }

    pub(crate) fn cells(&self) -> &Array2<Cell> {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut Array2<Cell> {
        &mut self.cells
    }

    /// In-bounds neighbors of `at`, in the grid's fixed expansion order.
    ///
    /// Walkability is not filtered here; that is the search's concern.
    pub fn adjacents(&self, at: UVec2) -> SmallVec<[UVec2; 8]> {
        let mut neighbors = SmallVec::new();
        let origin = at.as_ivec2();

        for offset in self.adjacency.offsets() {
            let next = origin + *offset;
            if next.x >= 0 && next.y >= 0 {
                let next = next.as_uvec2();
                if self.in_bounds(next) {
                    neighbors.push(next);
                }
            }
        }

        neighbors
    }

    /// The cell whose world position is closest to `world` by squared
    /// distance.
    ///
    /// Exhaustive scan over every cell; callers must not assume sub-linear
    /// cost. Ties resolve to the first cell in scan order.
    pub fn nearest_cell(&self, world: Vec2) -> UVec2 {
        let mut best = UVec2::ZERO;
        let mut best_distance = f32::INFINITY;

        for cell in self.cells.iter() {
            let distance = cell.world.distance_squared(world);
            if distance < best_distance {
                best_distance = distance;
                best = cell.coords;
            }
        }

        best
    }

    /// Toggles walkability and maintains the unwalkable bookkeeping set.
    /// Out-of-bounds positions are ignored.
    pub fn set_walkable(&mut self, at: UVec2, state: bool) {
        if !self.in_bounds(at) {
            return;
        }

        self.cell_mut(at).walkable = state;
        if state {
            self.unwalkable.shift_remove(&at);
        } else {
            self.unwalkable.insert(at);
        }
    }

    /// Opens the cell nearest to each point, and that cell's neighbors.
    ///
    /// Used to reopen paths after external obstacle changes.
    pub fn mark_walkable_region(&mut self, points: &[Vec2]) {
        for point in points {
            let at = self.nearest_cell(*point);
            self.set_walkable(at, true);
            for adjacent in self.adjacents(at) {
                self.set_walkable(adjacent, true);
            }
        }
    }

    /// Currently unwalkable cells, in edit order.
    pub fn unwalkable_cells(&self) -> impl Iterator<Item = UVec2> + '_ {
        self.unwalkable.iter().copied()
    }

    /// Coordinates of the grid's center cell.
    pub fn center(&self) -> UVec2 {
        self.dimensions / 2
    }

    /// Records an agent blocking `at`.
    pub fn occupy(&mut self, at: UVec2) {
        if self.in_bounds(at) {
            self.cell_mut(at).occupancy += 1;
        }
    }

    /// Releases one agent from `at`.
    pub fn vacate(&mut self, at: UVec2) {
        if self.in_bounds(at) {
            let cell = self.cell_mut(at);
            cell.occupancy = cell.occupancy.saturating_sub(1);
        }
    }

    /// Clears scores, parents and queue slots on every cell. Every search
    /// run does this first so no state leaks between runs.
    pub(crate) fn reset_search_state(&mut self) {
        for cell in self.cells.iter_mut() {
            cell.reset_search_state();
        }
    }
}
