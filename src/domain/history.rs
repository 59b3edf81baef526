// Bounded recent-history buffer for dashboard trend charts
use super::telemetry::Sample;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 50;

/// Holds the `capacity` most recent samples in arrival order.
///
/// Samples are stored whole, so every metric series and the timestamp
/// series always have the same length. Eviction is FIFO: an append that
/// pushes the length past capacity drops the oldest sample.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append-then-trim.
    pub fn append(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Columnar copy of the current contents, oldest first.
    pub fn snapshot(&self) -> HistorySnapshot {
        let mut snapshot = HistorySnapshot::with_capacity(self.samples.len());
        for sample in &self.samples {
            let r = &sample.reading;
            snapshot.power.push(r.power);
            snapshot.performance.push(r.performance);
            snapshot.irradiation.push(r.irradiation);
            snapshot.temperature.push(r.temperature);
            snapshot.humidity.push(r.humidity);
            snapshot.timestamps.push(sample.captured_at.clone());
        }
        snapshot
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
}

/// Point-in-time copy of the history, one sequence per metric plus timestamps.
/// The i-th entry of every sequence describes the same sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub power: Vec<f64>,
    pub performance: Vec<f64>,
    pub irradiation: Vec<f64>,
    pub temperature: Vec<f64>,
    pub humidity: Vec<f64>,
    pub timestamps: Vec<String>,
}

impl HistorySnapshot {
    fn with_capacity(len: usize) -> Self {
        Self {
            power: Vec::with_capacity(len),
            performance: Vec::with_capacity(len),
            irradiation: Vec::with_capacity(len),
            temperature: Vec::with_capacity(len),
            humidity: Vec::with_capacity(len),
            timestamps: Vec::with_capacity(len),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// True when all six sequences have the same length.
    pub fn is_aligned(&self) -> bool {
        let n = self.timestamps.len();
        [
            self.power.len(),
            self.performance.len(),
            self.irradiation.len(),
            self.temperature.len(),
            self.humidity.len(),
        ]
        .iter()
        .all(|&len| len == n)
    }
}
