use serde::{Deserialize, Serialize};

use crate::error::{SentryError, SentryResult};

use super::median::median;

pub const DEFAULT_WINDOW_CAPACITY: usize = 10;

/// One position reading for a joint of interest. The vertical axis is not
/// used for detection and is never carried.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub x: f32,
    pub z: f32,
}

impl PositionSample {
    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }
}

/// Per-axis median of one full window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedEstimate {
    pub x: f32,
    pub z: f32,
}

/// Fixed-capacity window of samples. Windows are disjoint: once full, the
/// buffer yields a single estimate and starts over empty.
#[derive(Debug)]
pub struct SampleBuffer {
    samples: Vec<PositionSample>,
    capacity: usize,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> SentryResult<Self> {
        if capacity == 0 {
            return Err(SentryError::InvalidInput(
                "sample window capacity must be at least 1".into(),
            ));
        }

        Ok(Self {
            samples: Vec::with_capacity(capacity),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn push(&mut self, sample: PositionSample) -> Option<SmoothedEstimate> {
        self.samples.push(sample);
        if self.samples.len() < self.capacity {
            return None;
        }

        let xs: Vec<f32> = self.samples.iter().map(|s| s.x).collect();
        let zs: Vec<f32> = self.samples.iter().map(|s| s.z).collect();
        self.samples.clear();

        match (median(&xs), median(&zs)) {
            (Ok(x), Ok(z)) => Some(SmoothedEstimate { x, z }),
            // capacity >= 1, so a full window always has at least one sample
            _ => unreachable!("full sample window was empty"),
        }
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self {
            samples: Vec::with_capacity(DEFAULT_WINDOW_CAPACITY),
            capacity: DEFAULT_WINDOW_CAPACITY,
        }
    }
}
