use crate::{constants::WINDOW_CAPACITY, error::Robd2Error};
use std::collections::VecDeque;

/// Bounded FIFO of the most recent O2 readings at the current altitude.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    values: VecDeque<f64>,
    capacity: usize,
}

impl SlidingWindow {
    /// # Errors
    ///
    /// Returns [`Robd2Error::ConfigError`] if `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self, Robd2Error> {
        if capacity == 0 {
            return Err(Robd2Error::ConfigError(
                "window capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self::with_valid_capacity(capacity))
    }

    fn with_valid_capacity(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a value, evicting the oldest one when full.
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::with_valid_capacity(WINDOW_CAPACITY)
    }
}
