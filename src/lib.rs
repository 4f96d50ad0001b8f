use std::hash::BuildHasherDefault;

use indexmap::IndexSet;
use rustc_hash::FxHasher;

pub mod astar;
pub mod cell;
pub mod events;
pub mod grid;
mod macros;
pub mod manager;
pub mod neighbor;
pub mod path;
pub mod plugin;
pub mod queue;

pub mod prelude {
    pub use crate::astar::{Heuristic, PathSearch, SearchError, SearchStatus};
    pub use crate::cell::Cell;
    pub use crate::events::{RequestGridCenter, RequestPath, RequestRebuildGrid, SetWalkable};
    pub use crate::grid::{GridError, NavGrid, NavGridBuilder, ObstacleProbe};
    pub use crate::manager::{PathCallback, PathRequest, PathRequestManager};
    pub use crate::neighbor::{Adjacency, CARDINAL_OFFSETS, ORDINAL_OFFSETS};
    pub use crate::path::Path;
    pub use crate::plugin::{PathingSet, WayfinderPlugin, WayfinderSettings};
    pub use crate::queue::{PriorityQueue, Queueable};
    pub use crate::Cost;
}

/// Integer cost unit shared by scores, heuristics and path totals.
///
/// Distances are fixed-point scaled so the heap ordering never compares
/// floats.
pub type Cost = u32;

pub(crate) type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;
