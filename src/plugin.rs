//! Bevy plugin wiring: messages in, grid edits and search driving per tick.
use bevy::{log, prelude::*};

use crate::{
    events::{RequestGridCenter, RequestPath, RequestRebuildGrid, SetWalkable},
    grid::NavGrid,
    manager::{PathRequest, PathRequestManager},
};

/// Adds the pathfinding message channel and the driver systems.
///
/// The [`NavGrid`] resource is inserted by the app once the world rectangle
/// is known; until then every system here is inert and incoming messages
/// are dropped with their buffers.
///
/// # Example
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_wayfinder::prelude::*;
///
/// fn main() {
///     App::new()
///         .add_plugins(WayfinderPlugin)
///         .add_systems(Startup, startup)
///         .run();
/// }
///
/// fn startup(mut commands: Commands) {
///     let grid = NavGridBuilder::new(Vec2::new(64.0, 64.0), 0.5)
///         .obstacle_probe(|world: Vec2, _radius: f32| world.length() < 4.0)
///         .build()
///         .unwrap();
///
///     commands.insert_resource(grid);
/// }
/// ```
#[derive(Default)]
pub struct WayfinderPlugin;

/// Tunables for the driver systems.
#[derive(Resource)]
pub struct WayfinderSettings {
    /// Cell expansions spent per `Update` tick, shared by the in-flight
    /// search and any queued searches it rolls into.
    pub step_budget: usize,
}

impl Default for WayfinderSettings {
    fn default() -> Self {
        WayfinderSettings { step_budget: 512 }
    }
}

/// System set containing all pathfinding systems.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathingSet;

impl Plugin for WayfinderPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<RequestPath>()
            .add_event::<SetWalkable>()
            .add_event::<RequestRebuildGrid>()
            .add_event::<RequestGridCenter>()
            .init_resource::<PathRequestManager>()
            .init_resource::<WayfinderSettings>()
            .add_systems(
                Update,
                (process_grid_messages, intake_path_requests, drive_search)
                    .chain()
                    .in_set(PathingSet),
            );
    }
}

fn process_grid_messages(
    grid: Option<ResMut<NavGrid>>,
    mut manager: ResMut<PathRequestManager>,
    mut rebuilds: ResMut<Events<RequestRebuildGrid>>,
    mut walkables: ResMut<Events<SetWalkable>>,
    mut centers: ResMut<Events<RequestGridCenter>>,
) {
    let Some(mut grid) = grid else { return };

    for message in rebuilds.drain() {
        // The active search's parent indices would dangle across a rebuild.
        manager.fail_in_flight();
        grid.rebuild();

        if let Some(callback) = message.callback {
            callback();
        }
    }

    for message in walkables.drain() {
        log::debug!("marking walkable region of {} points", message.points.len());
        grid.mark_walkable_region(&message.points);
    }

    for message in centers.drain() {
        let center = grid.center();
        (message.callback)(grid.cell(center).world);
    }
}

fn intake_path_requests(
    grid: Option<ResMut<NavGrid>>,
    mut manager: ResMut<PathRequestManager>,
    mut requests: ResMut<Events<RequestPath>>,
) {
    let Some(mut grid) = grid else { return };

    for request in requests.drain() {
        manager.submit(
            &mut grid,
            PathRequest {
                start: request.start,
                target: request.target,
                heuristic: request.heuristic,
                simplify: request.simplify,
                callback: request.callback,
            },
        );
    }
}

fn drive_search(
    grid: Option<ResMut<NavGrid>>,
    mut manager: ResMut<PathRequestManager>,
    settings: Res<WayfinderSettings>,
) {
    let Some(mut grid) = grid else { return };
    manager.tick(&mut grid, settings.step_budget);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        astar::Heuristic,
        grid::NavGridBuilder,
        path::Path,
    };
    use bevy::math::UVec2;
    use std::sync::{Arc, Mutex};

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(WayfinderPlugin);
        app.insert_resource(
            NavGridBuilder::new(Vec2::new(5.0, 5.0), 0.5)
                .build()
                .unwrap(),
        );
        app
    }

    fn world(x: u32, y: u32) -> Vec2 {
        Vec2::new(x as f32 + 0.5, y as f32 + 0.5)
    }

    fn request(target: Vec2, log: &Arc<Mutex<Vec<(Vec2, bool)>>>) -> RequestPath {
        let log = log.clone();
        RequestPath {
            start: world(0, 0),
            target,
            heuristic: Heuristic::Diagonal,
            simplify: false,
            callback: Box::new(move |_path: Path, success| {
                log.lock().unwrap().push((target, success));
            }),
        }
    }

    #[test]
    fn requests_resolve_in_submission_order() {
        let mut app = test_app();
        let log = Arc::new(Mutex::new(Vec::new()));

        for target in [world(4, 4), world(4, 0), world(0, 4)] {
            app.world_mut().send_event(request(target, &log));
        }

        app.update();

        let events = log.lock().unwrap();
        assert_eq!(
            events
                .iter()
                .map(|(target, _)| *target)
                .collect::<Vec<_>>(),
            vec![world(4, 4), world(4, 0), world(0, 4)]
        );
        assert!(events.iter().all(|(_, success)| *success));
    }

    #[test]
    fn set_walkable_message_opens_cells() {
        let mut app = test_app();

        app.world_mut()
            .resource_mut::<NavGrid>()
            .set_walkable(UVec2::new(2, 2), false);

        app.world_mut().send_event(SetWalkable {
            points: vec![world(2, 2)],
        });
        app.update();

        let grid = app.world().resource::<NavGrid>();
        assert!(grid.cell(UVec2::new(2, 2)).walkable);
    }

    #[test]
    fn center_message_reports_the_center_cell() {
        let mut app = test_app();
        let center = Arc::new(Mutex::new(None));

        let captured = center.clone();
        app.world_mut().send_event(RequestGridCenter {
            callback: Box::new(move |world| {
                *captured.lock().unwrap() = Some(world);
            }),
        });
        app.update();

        assert_eq!(*center.lock().unwrap(), Some(world(2, 2)));
    }

    #[test]
    fn rebuild_message_restores_the_probe_state() {
        let mut app = test_app();
        let rebuilt = Arc::new(Mutex::new(false));

        app.world_mut()
            .resource_mut::<NavGrid>()
            .set_walkable(UVec2::new(1, 1), false);

        let flag = rebuilt.clone();
        app.world_mut().send_event(RequestRebuildGrid {
            callback: Some(Box::new(move || {
                *flag.lock().unwrap() = true;
            })),
        });
        app.update();

        assert!(*rebuilt.lock().unwrap());
        let grid = app.world().resource::<NavGrid>();
        assert!(grid.cell(UVec2::new(1, 1)).walkable);
    }

    #[test]
    fn small_budgets_spread_a_search_over_ticks() {
        let mut app = test_app();
        app.world_mut()
            .resource_mut::<WayfinderSettings>()
            .step_budget = 1;

        let log = Arc::new(Mutex::new(Vec::new()));
        app.world_mut().send_event(request(world(4, 4), &log));

        app.update();
        assert!(log.lock().unwrap().is_empty());
        assert!(app.world().resource::<PathRequestManager>().is_processing());

        let mut updates = 1;
        while log.lock().unwrap().is_empty() {
            app.update();
            updates += 1;
            assert!(updates < 1000, "search failed to terminate");
        }

        assert_eq!(*log.lock().unwrap(), vec![(world(4, 4), true)]);
    }
}
