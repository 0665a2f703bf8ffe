use std::collections::VecDeque;
use std::time::Duration;

/// Rolling window over recent update-phase durations.
#[derive(Debug)]
pub struct UpdateTimer {
    window: VecDeque<Duration>,
    capacity: usize,
}

impl UpdateTimer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, sample: Duration) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn average(&self) -> Duration {
        if self.window.is_empty() {
            return Duration::ZERO;
        }
        self.window.iter().sum::<Duration>() / self.window.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.window.iter().copied().max().unwrap_or_default()
    }
}
