//! Deterministic executor for unit tests.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

use glam::Vec3;
use placement_assets::Layer;
use placement_common::{EntityId, Transform};
use placement_kernel::World;

use crate::job::{JobStatus, TileExecutor, TileJob};
use crate::slot::TileDescriptor;

#[derive(Debug, Default)]
pub struct JobLog {
    pub started: Vec<(i32, i32)>,
    pub discarded: usize,
    pub placed: usize,
}

/// Jobs finish after a fixed number of polls and place a fixed number of
/// objects, except on tiles listed in `empty_tiles`.
pub struct ScriptedExecutor {
    pub polls_to_finish: u32,
    pub placed_per_tile: usize,
    pub empty_tiles: HashSet<(i32, i32)>,
    pub log: Rc<RefCell<JobLog>>,
}

impl ScriptedExecutor {
    pub fn new(polls_to_finish: u32, placed_per_tile: usize) -> Self {
        Self {
            polls_to_finish,
            placed_per_tile,
            empty_tiles: HashSet::new(),
            log: Rc::default(),
        }
    }
}

pub struct ScriptedJob {
    remaining_polls: u32,
    count: usize,
    prefab: String,
    center: Vec3,
    log: Rc<RefCell<JobLog>>,
}

impl TileExecutor for ScriptedExecutor {
    type Job = ScriptedJob;

    fn start(&mut self, desc: &TileDescriptor, layer: &Arc<Layer>) -> ScriptedJob {
        self.log.borrow_mut().started.push((desc.x, desc.y));
        let count = if self.empty_tiles.contains(&(desc.x, desc.y)) {
            0
        } else {
            self.placed_per_tile
        };
        ScriptedJob {
            remaining_polls: self.polls_to_finish,
            count,
            prefab: layer.prefab.clone(),
            center: desc.world_bounds(layer.tile_size()).center(),
            log: self.log.clone(),
        }
    }
}

impl TileJob for ScriptedJob {
    fn poll(&mut self) -> JobStatus {
        self.remaining_polls = self.remaining_polls.saturating_sub(1);
        if self.remaining_polls == 0 {
            JobStatus::Finished
        } else {
            JobStatus::Running
        }
    }

    fn place(&mut self, world: &mut World) -> Vec<EntityId> {
        self.log.borrow_mut().placed += self.count;
        (0..self.count)
            .map(|_| world.spawn(self.prefab.clone(), Transform::from_position(self.center)))
            .collect()
    }

    fn discard(self) {
        self.log.borrow_mut().discarded += 1;
    }
}
