use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;
use placement_assets::ResourceId;

/// One observer seeing one placement resource during a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityRequest {
    pub resource: ResourceId,
    pub camera_position: Vec3,
    pub camera_direction: Vec3,
}

/// Visibility reports collected between two updates.
///
/// Written from render threads, drained by the manager once per update.
#[derive(Debug, Default)]
pub struct VisibilityQueue {
    requests: Mutex<Vec<VisibilityRequest>>,
}

impl VisibilityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request unless an identical one is already queued.
    /// Returns `true` if it was added.
    pub fn submit(&self, resource: ResourceId, camera_position: Vec3, camera_direction: Vec3) -> bool {
        let request = VisibilityRequest {
            resource,
            camera_position,
            camera_direction,
        };

        let mut requests = self.requests.lock();
        if requests.contains(&request) {
            return false;
        }
        requests.push(request);
        true
    }

    /// Take every queued request, in submission order, leaving the queue empty.
    pub fn drain_all(&self) -> Vec<VisibilityRequest> {
        std::mem::take(&mut *self.requests.lock())
    }

    pub fn len(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.lock().is_empty()
    }
}

/// Cloneable handle for reporting visibility from any thread.
#[derive(Debug, Clone)]
pub struct VisibilityReporter {
    queue: Arc<VisibilityQueue>,
}

impl VisibilityReporter {
    pub(crate) fn new(queue: Arc<VisibilityQueue>) -> Self {
        Self { queue }
    }

    pub fn report(&self, resource: ResourceId, camera_position: Vec3, camera_direction: Vec3) -> bool {
        self.queue.submit(resource, camera_position, camera_direction)
    }
}
