//! The A* search state machine and its distance heuristics.
use bevy::math::{UVec2, Vec2};
use rustc_hash::FxHashSet;
use strum::EnumIter;
use thiserror::Error;

use crate::{grid::NavGrid, path::Path, queue::PriorityQueue, Cost};

/// Distance metric used both as the search heuristic and as the edge cost
/// between adjacent cells.
///
/// All metrics are integer-valued; the ×14/×140 scaling keeps fractional
/// distances out of the heap ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter)]
pub enum Heuristic {
    /// Weighted four-direction metric: `14·(dx+dy) + 140·min(dx,dy)`.
    #[default]
    Manhattan,
    /// Unit cost per axis step: `dx + dy`.
    Diagonal,
    /// `⌊14·√(dx² + dy²)⌋`.
    Euclidean,
}

impl Heuristic {
    /// Distance between two grid coordinates under this metric.
    pub fn distance(self, a: UVec2, b: UVec2) -> Cost {
        let dx = a.x.abs_diff(b.x);
        let dy = a.y.abs_diff(b.y);

        match self {
            Heuristic::Manhattan => 14 * (dx + dy) + 140 * dx.min(dy),
            Heuristic::Diagonal => dx + dy,
            Heuristic::Euclidean => (14.0 * f64::from(dx * dx + dy * dy).sqrt()) as Cost,
        }
    }
}

/// Progress of a [`PathSearch`]. Both terminal states are final; a new
/// instance is required per request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchStatus {
    Running,
    Succeeded,
    Failed,
}

impl SearchStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SearchStatus::Running)
    }
}

/// Reconstruction could not trace the target back to the start.
///
/// The relaxation step never writes a parent cycle, so hitting this means
/// an invariant was broken elsewhere (e.g. the grid changed identity under
/// a live search). Not a routine outcome.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("no parent chain from {target} back to {start}")]
    NoParentChain { start: UVec2, target: UVec2 },
}

/// A single A* run over a [`NavGrid`], resumable in bounded steps.
///
/// Construction resets the grid's search state, so two live searches over
/// the same grid would corrupt each other;
/// [`PathRequestManager`](crate::manager::PathRequestManager) enforces the
/// one-at-a-time discipline.
pub struct PathSearch {
    start: UVec2,
    target: UVec2,
    heuristic: Heuristic,
    simplify: bool,
    open: PriorityQueue,
    closed: FxHashSet<UVec2>,
    status: SearchStatus,
    expansions: usize,
}

impl PathSearch {
    /// Prepares a search between the cells nearest to two world positions.
    pub fn new(
        grid: &mut NavGrid,
        start: Vec2,
        target: Vec2,
        heuristic: Heuristic,
        simplify: bool,
    ) -> Self {
        grid.reset_search_state();

        let start = grid.nearest_cell(start);
        let target = grid.nearest_cell(target);

        // Unwalkable cells never enter the open set, the start included; a
        // blocked start simply exhausts on the first step.
        let mut open = PriorityQueue::with_capacity(grid.cell_count());
        if grid.cell(start).walkable {
            grid.cell_mut(start).h = heuristic.distance(start, target);
            open.enqueue(grid.cells_mut(), start);
        }

        PathSearch {
            start,
            target,
            heuristic,
            simplify,
            open,
            closed: FxHashSet::default(),
            status: SearchStatus::Running,
            expansions: 0,
        }
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    pub fn start(&self) -> UVec2 {
        self.start
    }

    pub fn target(&self) -> UVec2 {
        self.target
    }

    /// Total cells expanded so far.
    pub fn expansions(&self) -> usize {
        self.expansions
    }

    /// Expands up to `budget` cells, then suspends.
    ///
    /// Call again on the next tick while this returns
    /// [`SearchStatus::Running`]; the result is identical to a single
    /// uninterrupted run.
    pub fn step(&mut self, grid: &mut NavGrid, budget: usize) -> SearchStatus {
        for _ in 0..budget {
            if self.status.is_terminal() {
                break;
            }

            let Some(current) = self.open.dequeue(grid.cells_mut()) else {
                self.status = SearchStatus::Failed;
                break;
            };
            self.expansions += 1;

            if current == self.target {
                self.status = SearchStatus::Succeeded;
                break;
            }

            self.closed.insert(current);

            for adjacent in grid.adjacents(current) {
                let cell = grid.cell(adjacent);
                if !cell.walkable || self.closed.contains(&adjacent) {
                    continue;
                }

                let tentative = grid.cell(current).g + self.heuristic.distance(current, adjacent);
                let queued = self.open.contains(grid.cells(), adjacent);

                if tentative < grid.cell(adjacent).g || !queued {
                    let cell = grid.cell_mut(adjacent);
                    cell.g = tentative;
                    cell.h = self.heuristic.distance(adjacent, self.target);
                    cell.parent = Some(current);

                    if queued {
                        self.open.reprioritize(grid.cells_mut(), adjacent);
                    } else {
                        self.open.enqueue(grid.cells_mut(), adjacent);
                    }
                }
            }
        }

        self.status
    }

    /// Runs the search to termination in one call.
    pub fn solve(&mut self, grid: &mut NavGrid) -> SearchStatus {
        crate::timed!("path search", {
            self.step(grid, usize::MAX)
        })
    }

    /// Reconstructs the waypoint list after the search succeeded.
    ///
    /// Walks parent references target → start, reverses into start → target
    /// order, and optionally collapses straight runs into their turn
    /// points.
    pub fn waypoints(&self, grid: &NavGrid) -> Result<Path, SearchError> {
        debug_assert_eq!(self.status, SearchStatus::Succeeded);

        let mut cells = Vec::new();
        let mut current = self.target;
        let mut hops = 0usize;

        while current != self.start {
            cells.push(current);
            hops += 1;

            match grid.cell(current).parent {
                Some(parent) if hops <= grid.cell_count() => current = parent,
                _ => {
                    return Err(SearchError::NoParentChain {
                        start: self.start,
                        target: self.target,
                    })
                }
            }
        }
        cells.push(self.start);
        cells.reverse();

        let cost = grid.cell(self.target).g;
        Ok(self.collapse(grid, &cells, cost))
    }

    /// Keeps the endpoints and every interior cell whose incoming and
    /// outgoing grid-direction vectors differ.
    fn collapse(&self, grid: &NavGrid, cells: &[UVec2], cost: Cost) -> Path {
        if !self.simplify || cells.len() < 3 {
            let waypoints = cells.iter().map(|&at| grid.cell(at).world).collect();
            return Path::new(waypoints, cost);
        }

        let mut waypoints = Vec::with_capacity(cells.len());
        waypoints.push(grid.cell(cells[0]).world);

        for window in cells.windows(3) {
            let incoming = window[1].as_ivec2() - window[0].as_ivec2();
            let outgoing = window[2].as_ivec2() - window[1].as_ivec2();
            if incoming != outgoing {
                waypoints.push(grid.cell(window[1]).world);
            }
        }

        waypoints.push(grid.cell(cells[cells.len() - 1]).world);
        Path::new(waypoints, cost)
    }
}
