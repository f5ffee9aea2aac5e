// slice.rs — Slice descriptors for row/column indexing
//
// A slice descriptor selects `start, start+step, ...` strictly below `stop`,
// mirroring the half-open range convention used everywhere else in the crate.
// INDEX nodes carry one descriptor per axis.

use serde::{Deserialize, Serialize};

/// A half-open, strided selection over one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SliceDescr {
    pub start: usize,
    pub stop: usize,
    pub step: usize,
}

impl SliceDescr {
    pub fn new(start: usize, stop: usize, step: usize) -> Self {
        debug_assert!(step >= 1, "slice step must be positive");
        SliceDescr { start, stop, step }
    }

    /// The full range over an axis of length `len`, with unit step.
    pub fn full(len: usize) -> Self {
        SliceDescr {
            start: 0,
            stop: len,
            step: 1,
        }
    }

    /// Number of indices the slice selects.
    pub fn len(&self) -> usize {
        if self.stop <= self.start {
            0
        } else {
            (self.stop - self.start + self.step - 1) / self.step
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The selected indices, in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        (self.start..self.stop).step_by(self.step)
    }
}
