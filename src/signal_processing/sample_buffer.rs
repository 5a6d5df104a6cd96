use std::collections::VecDeque;

/// Fixed-capacity sample history for one channel
///
/// Appending past capacity evicts the oldest sample, so the buffer always
/// holds the most recent `capacity` samples in chronological order. Values
/// are stored as given; NaN and infinities are not sanitized here.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SampleBuffer {
    /// Create an empty buffer holding at most `capacity` samples (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append the newest sample, evicting the oldest when full
    pub fn append(&mut self, value: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// Copy of the current contents, oldest to newest
    pub fn snapshot(&self) -> Vec<f32> {
        self.samples.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_then_evicts_oldest() {
        let mut buffer = SampleBuffer::new(3);
        assert!(buffer.is_empty());

        buffer.append(1.0);
        buffer.append(2.0);
        assert!(!buffer.is_full());
        buffer.append(3.0);
        assert!(buffer.is_full());
        assert_eq!(buffer.snapshot(), vec![1.0, 2.0, 3.0]);

        buffer.append(4.0);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.snapshot(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_snapshot_is_detached_copy() {
        let mut buffer = SampleBuffer::new(2);
        buffer.append(1.0);
        let snapshot = buffer.snapshot();
        buffer.append(2.0);
        buffer.append(3.0);
        assert_eq!(snapshot, vec![1.0]);
    }

    #[test]
    fn test_non_finite_values_pass_through() {
        let mut buffer = SampleBuffer::new(2);
        buffer.append(f32::NAN);
        buffer.append(f32::INFINITY);
        let snapshot = buffer.snapshot();
        assert!(snapshot[0].is_nan());
        assert!(snapshot[1].is_infinite());
    }

    #[test]
    fn test_zero_capacity_clamped_and_clear() {
        let mut buffer = SampleBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.append(7.0);
        assert!(buffer.is_full());
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
