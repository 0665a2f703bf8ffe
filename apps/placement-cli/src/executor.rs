use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, TryRecvError};
use placement_assets::Layer;
use placement_common::{EntityId, Transform};
use placement_kernel::World;
use placement_tiles::{JobStatus, TileDescriptor, TileExecutor, TileJob};

use crate::scatter::scatter;

/// Runs tile scattering on the global rayon pool.
pub struct RayonExecutor {
    seed: u64,
}

impl RayonExecutor {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl TileExecutor for RayonExecutor {
    type Job = RayonJob;

    fn start(&mut self, desc: &TileDescriptor, layer: &Arc<Layer>) -> RayonJob {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let cancel = Arc::new(AtomicBool::new(false));

        let flag = cancel.clone();
        let desc = desc.clone();
        let task_layer = layer.clone();
        let seed = self.seed;
        rayon::spawn(move || {
            if flag.load(Ordering::Acquire) {
                return;
            }
            let placed = scatter(&desc, &task_layer, seed, &flag);
            // Receiver is gone if the job was discarded.
            let _ = tx.send(placed);
        });

        RayonJob {
            rx,
            cancel,
            result: None,
            prefab: layer.prefab.clone(),
        }
    }
}

pub struct RayonJob {
    rx: Receiver<Vec<Transform>>,
    cancel: Arc<AtomicBool>,
    result: Option<Vec<Transform>>,
    prefab: String,
}

impl TileJob for RayonJob {
    fn poll(&mut self) -> JobStatus {
        if self.result.is_some() {
            return JobStatus::Finished;
        }
        match self.rx.try_recv() {
            Ok(placed) => {
                self.result = Some(placed);
                JobStatus::Finished
            }
            Err(TryRecvError::Empty) => JobStatus::Running,
            Err(TryRecvError::Disconnected) => {
                tracing::warn!("tile task exited without a result");
                self.result = Some(Vec::new());
                JobStatus::Finished
            }
        }
    }

    fn place(&mut self, world: &mut World) -> Vec<EntityId> {
        self.result
            .take()
            .unwrap_or_default()
            .into_iter()
            .map(|transform| world.spawn(self.prefab.clone(), transform))
            .collect()
    }

    fn discard(self) {
        self.cancel.store(true, Ordering::Release);
    }
}
