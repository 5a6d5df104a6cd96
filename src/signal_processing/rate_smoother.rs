use std::collections::VecDeque;

/// Moving average over the last few positive rate estimates
///
/// Zero (or negative, or NaN) estimates mean "no estimate" and are skipped:
/// they neither enter the history nor clear it, so the displayed rate holds
/// its last value while the signal is lost.
#[derive(Debug, Clone)]
pub struct RateSmoother {
    history: VecDeque<f32>,
    capacity: usize,
}

impl RateSmoother {
    /// Create a smoother averaging up to `capacity` estimates (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Feed one instantaneous rate and return the smoothed rate
    ///
    /// With an empty history a non-positive `rate` is returned unchanged.
    pub fn observe(&mut self, rate: f32) -> f32 {
        if rate > 0.0 {
            if self.history.len() == self.capacity {
                self.history.pop_front();
            }
            self.history.push_back(rate);
        }

        self.current().unwrap_or(rate)
    }

    /// Mean of the current history, if any
    pub fn current(&self) -> Option<f32> {
        if self.history.is_empty() {
            return None;
        }
        let sum: f32 = self.history.iter().sum();
        Some(sum / self.history.len() as f32)
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}
