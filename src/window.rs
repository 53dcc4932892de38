use std::collections::VecDeque;

use crate::model::{Sample, Series};

pub const DEFAULT_CAPACITY: usize = 15;

/// Capacity-bounded FIFO of samples in arrival order.
///
/// Timestamps are never inspected: duplicates and out-of-order samples are kept
/// exactly as pushed. Once full, every push evicts the single oldest sample.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleWindow {
    samples: VecDeque<Sample>,
    capacity: Option<usize>,
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl SampleWindow {
    /// A capacity of zero is treated as one; a window always keeps the latest sample.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            samples: VecDeque::new(),
            capacity: None,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        if let Some(cap) = self.capacity
            && self.samples.len() > cap
        {
            self.samples.pop_front();
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    pub fn to_series(&self) -> Series {
        Series {
            labels: self.samples.iter().map(|s| s.timestamp.clone()).collect(),
            values: self.samples.iter().map(|s| s.value).collect(),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }
}

#[cfg(test)]
#[path = "tests/window_tests.rs"]
mod tests;
