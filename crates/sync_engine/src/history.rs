//! Fixed-capacity drift history.

use ringbuf::{traits::*, HeapRb};

/// Ring of recent `delta_ms` values; the oldest is overwritten when full
pub struct DriftHistory {
    ring: HeapRb<f64>,
}

impl std::fmt::Debug for DriftHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriftHistory")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl DriftHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: HeapRb::new(capacity.max(1)),
        }
    }

    pub fn record(&mut self, delta_ms: f64) {
        if delta_ms.is_finite() {
            self.ring.push_overwrite(delta_ms);
        }
    }

    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity().get()
    }

    pub fn clear(&mut self) {
        self.ring.clear();
    }

    /// Mean absolute drift (ms), 0 when empty
    pub fn mean_abs(&self) -> f64 {
        let len = self.len();
        if len == 0 {
            return 0.0;
        }
        self.ring.iter().map(|d| d.abs()).sum::<f64>() / len as f64
    }

    /// Largest absolute drift (ms), 0 when empty
    pub fn max_abs(&self) -> f64 {
        self.ring.iter().map(|d| d.abs()).fold(0.0, f64::max)
    }
}
