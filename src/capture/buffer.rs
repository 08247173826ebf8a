//! Bounded sample buffer for the active tracking session
//!
//! Holds accepted gaze samples in arrival order. Once the buffer is full,
//! every append evicts the oldest samples so the length stays at capacity.

use crate::capture::types::GazeSample;
use std::collections::VecDeque;

/// Default maximum number of buffered samples
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Counters describing buffer occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    pub len: usize,
    pub capacity: usize,
    /// Samples evicted since the buffer was created
    pub total_evicted: u64,
}

#[derive(Debug)]
pub struct SampleBuffer {
    samples: VecDeque<GazeSample>,
    capacity: usize,
    total_evicted: u64,
}

impl SampleBuffer {
    /// Create a buffer holding at most `capacity` samples (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            total_evicted: 0,
        }
    }

    /// Append a sample, trimming from the front if capacity is exceeded.
    ///
    /// Returns the number of samples evicted (0 when nothing was trimmed).
    pub fn append(&mut self, sample: GazeSample) -> usize {
        self.samples.push_back(sample);

        let mut evicted = 0;
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
            evicted += 1;
        }

        if evicted > 0 {
            self.total_evicted += evicted as u64;
            tracing::trace!(evicted, capacity = self.capacity, "Sample buffer trimmed");
        }
        evicted
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Read-only view over the buffered samples, oldest first
    pub fn all(&self) -> impl ExactSizeIterator<Item = &GazeSample> + '_ {
        self.samples.iter()
    }

    /// Move the contents out, leaving the buffer empty
    pub fn take_snapshot(&mut self) -> Vec<GazeSample> {
        self.samples.drain(..).collect()
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

    pub fn stats(&self) -> BufferStats {
        BufferStats {
            len: self.samples.len(),
            capacity: self.capacity,
            total_evicted: self.total_evicted,
        }
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
