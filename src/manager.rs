//! FIFO serialization of path requests.
use std::collections::VecDeque;

use bevy::{log, math::Vec2, prelude::Resource};

use crate::{
    astar::{Heuristic, PathSearch, SearchStatus},
    grid::NavGrid,
    path::Path,
};

/// Completion callback for a path request.
///
/// Invoked exactly once with the waypoints (empty on failure) and a success
/// flag. Failure arrives through the same channel as success, never through
/// a separate signaling path.
pub type PathCallback = Box<dyn FnOnce(Path, bool) + Send + Sync>;

/// One pending search. Lives only in the manager's queue and is consumed
/// when its callback fires; never reused.
pub struct PathRequest {
    pub start: Vec2,
    pub target: Vec2,
    pub heuristic: Heuristic,
    pub simplify: bool,
    pub callback: PathCallback,
}

struct ActiveSearch {
    search: PathSearch,
    callback: PathCallback,
}

/// Serializes path requests: strict FIFO, at most one search in flight
/// system-wide, results dispatched in submission order.
///
/// A request observes the grid as it is when the request is processed, not
/// as it was when submitted; walkability edits between those two points are
/// deliberately visible.
#[derive(Resource, Default)]
pub struct PathRequestManager {
    queue: VecDeque<PathRequest>,
    active: Option<ActiveSearch>,
}

impl PathRequestManager {
    /// Enqueues a request and, when idle, immediately starts its search.
    ///
    /// The search performs no work until [`PathRequestManager::tick`] runs.
    pub fn request_path(
        &mut self,
        grid: &mut NavGrid,
        start: Vec2,
        target: Vec2,
        heuristic: Heuristic,
        simplify: bool,
        callback: impl FnOnce(Path, bool) + Send + Sync + 'static,
    ) {
        self.submit(
            grid,
            PathRequest {
                start,
                target,
                heuristic,
                simplify,
                callback: Box::new(callback),
            },
        );
    }

    /// [`PathRequestManager::request_path`] for an already assembled
    /// request.
    pub fn submit(&mut self, grid: &mut NavGrid, request: PathRequest) {
        self.queue.push_back(request);
        self.process_next(grid);
    }

    /// Whether a search is currently in flight.
    pub fn is_processing(&self) -> bool {
        self.active.is_some()
    }

    /// Requests waiting behind the in-flight search.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Spends up to `budget` cell expansions driving the in-flight search,
    /// rolling leftover budget into queued requests whenever a search
    /// terminates early.
    pub fn tick(&mut self, grid: &mut NavGrid, budget: usize) {
        let mut remaining = budget;

        while remaining > 0 {
            if self.active.is_none() {
                self.process_next(grid);
            }
            let Some(active) = self.active.as_mut() else {
                return;
            };

            let before = active.search.expansions();
            let status = active.search.step(grid, remaining);
            remaining = remaining.saturating_sub(active.search.expansions() - before);

            if status.is_terminal() {
                self.finish(grid, status);
            }
        }
    }

    /// Fails the in-flight search, if any, delivering `success = false` to
    /// its callback.
    ///
    /// Needed when the grid is rebuilt underneath an active search; its
    /// parent indices would dangle into the new cells. Queued requests are
    /// kept and will run against the rebuilt grid.
    pub fn fail_in_flight(&mut self) {
        if let Some(active) = self.active.take() {
            log::debug!("failing in-flight search");
            (active.callback)(Path::default(), false);
        }
    }

    fn process_next(&mut self, grid: &mut NavGrid) {
        if self.active.is_some() {
            return;
        }
        let Some(request) = self.queue.pop_front() else {
            return;
        };

        log::debug!(
            "starting path search {} -> {}",
            request.start,
            request.target
        );

        let search = PathSearch::new(
            grid,
            request.start,
            request.target,
            request.heuristic,
            request.simplify,
        );
        self.active = Some(ActiveSearch {
            search,
            callback: request.callback,
        });
    }

    fn finish(&mut self, grid: &mut NavGrid, status: SearchStatus) {
        let Some(active) = self.active.take() else {
            return;
        };

        let (path, success) = match status {
            SearchStatus::Succeeded => match active.search.waypoints(grid) {
                Ok(path) => (path, true),
                Err(err) => {
                    log::error!("path reconstruction failed: {err}");
                    (Path::default(), false)
                }
            },
            _ => (Path::default(), false),
        };

        log::debug!(
            "search finished: success={success} waypoints={} expansions={}",
            path.len(),
            active.search.expansions()
        );

        (active.callback)(path, success);
        self.process_next(grid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::NavGridBuilder;
    use bevy::math::UVec2;
    use std::sync::{Arc, Mutex};

    fn open_grid(size: u32) -> NavGrid {
        NavGridBuilder::new(Vec2::splat(size as f32), 0.5)
            .build()
            .unwrap()
    }

    fn world(x: u32, y: u32) -> Vec2 {
        Vec2::new(x as f32 + 0.5, y as f32 + 0.5)
    }

    type EventLog = Arc<Mutex<Vec<(&'static str, bool, usize)>>>;

    fn recording(log: &EventLog, tag: &'static str) -> impl FnOnce(Path, bool) + Send + Sync {
        let log = log.clone();
        move |path, success| log.lock().unwrap().push((tag, success, path.len()))
    }

    #[test]
    fn callbacks_fire_in_submission_order() {
        let mut grid = open_grid(5);
        let mut manager = PathRequestManager::default();
        let log: EventLog = Arc::default();

        for (tag, target) in [("a", world(4, 4)), ("b", world(4, 0)), ("c", world(0, 4))] {
            manager.request_path(
                &mut grid,
                world(0, 0),
                target,
                Heuristic::Diagonal,
                false,
                recording(&log, tag),
            );
        }

        assert!(manager.is_processing());
        assert_eq!(manager.queued(), 2);

        manager.tick(&mut grid, usize::MAX);

        let events = log.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], ("a", true, 9));
        assert_eq!(events[1].0, "b");
        assert_eq!(events[2].0, "c");
        assert!(events.iter().all(|event| event.1));
        assert!(!manager.is_processing());
    }

    #[test]
    fn failure_is_a_data_result_with_an_empty_path() {
        let mut grid = open_grid(5);
        // Enclose the target completely.
        for at in [
            UVec2::new(1, 2),
            UVec2::new(3, 2),
            UVec2::new(2, 1),
            UVec2::new(2, 3),
        ] {
            grid.set_walkable(at, false);
        }

        let mut manager = PathRequestManager::default();
        let log: EventLog = Arc::default();
        manager.request_path(
            &mut grid,
            world(0, 0),
            world(2, 2),
            Heuristic::Manhattan,
            false,
            recording(&log, "blocked"),
        );
        manager.tick(&mut grid, usize::MAX);

        assert_eq!(*log.lock().unwrap(), vec![("blocked", false, 0)]);
    }

    #[test]
    fn bounded_budget_suspends_between_ticks() {
        let mut grid = open_grid(8);
        let mut manager = PathRequestManager::default();
        let log: EventLog = Arc::default();
        manager.request_path(
            &mut grid,
            world(0, 0),
            world(7, 7),
            Heuristic::Manhattan,
            false,
            recording(&log, "slow"),
        );

        manager.tick(&mut grid, 1);
        assert!(manager.is_processing());
        assert!(log.lock().unwrap().is_empty());

        let mut ticks = 1;
        while manager.is_processing() {
            manager.tick(&mut grid, 1);
            ticks += 1;
            assert!(ticks < 1000, "search failed to terminate");
        }

        assert_eq!(log.lock().unwrap().len(), 1);
        assert!(log.lock().unwrap()[0].1);
    }

    #[test]
    fn edits_between_ticks_apply_to_later_requests() {
        let mut grid = open_grid(5);
        let mut manager = PathRequestManager::default();
        let log: EventLog = Arc::default();

        manager.request_path(
            &mut grid,
            world(0, 0),
            world(4, 4),
            Heuristic::Diagonal,
            false,
            recording(&log, "first"),
        );
        manager.request_path(
            &mut grid,
            world(0, 0),
            world(2, 2),
            Heuristic::Diagonal,
            false,
            recording(&log, "second"),
        );

        // Wall the second request's target off while it is still queued.
        for at in [
            UVec2::new(1, 2),
            UVec2::new(3, 2),
            UVec2::new(2, 1),
            UVec2::new(2, 3),
        ] {
            grid.set_walkable(at, false);
        }

        manager.tick(&mut grid, usize::MAX);

        let events = log.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, "first");
        assert!(events[0].1);
        assert_eq!(events[1], ("second", false, 0));
    }

    #[test]
    fn fail_in_flight_delivers_once_and_advances() {
        let mut grid = open_grid(5);
        let mut manager = PathRequestManager::default();
        let log: EventLog = Arc::default();

        manager.request_path(
            &mut grid,
            world(0, 0),
            world(4, 4),
            Heuristic::Manhattan,
            false,
            recording(&log, "aborted"),
        );
        manager.request_path(
            &mut grid,
            world(0, 0),
            world(4, 0),
            Heuristic::Manhattan,
            false,
            recording(&log, "queued"),
        );

        manager.fail_in_flight();
        assert_eq!(*log.lock().unwrap(), vec![("aborted", false, 0)]);

        manager.tick(&mut grid, usize::MAX);
        let events = log.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].0, "queued");
        assert!(events[1].1);
    }

    #[test]
    fn simplified_results_honor_the_request_flag() {
        let mut grid = open_grid(5);
        let mut manager = PathRequestManager::default();
        let log: EventLog = Arc::default();

        manager.request_path(
            &mut grid,
            world(0, 0),
            world(0, 4),
            Heuristic::Diagonal,
            true,
            recording(&log, "straight"),
        );
        manager.tick(&mut grid, usize::MAX);

        assert_eq!(*log.lock().unwrap(), vec![("straight", true, 2)]);
    }
}
