// src/filter.rs - Output smoothing for the pump frequency
//
// A fixed-capacity moving average followed by a deadband gate.

/// Fixed-capacity FIFO of frequency samples. Once full, each push overwrites
/// the oldest sample.
#[derive(Debug, Clone)]
pub struct FrequencyWindow {
    samples: Vec<f64>,
    capacity: usize,
    /// Index of the slot the next sample goes into
    head: usize,
    len: usize,
}

impl FrequencyWindow {
    /// `capacity` is clamped to at least one slot.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: vec![0.0; capacity],
            capacity,
            head: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, sample: f64) {
        self.samples[self.head] = sample;
        self.head = (self.head + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    /// Mean of the held samples, `None` while empty.
    pub fn mean(&self) -> Option<f64> {
        if self.len == 0 {
            return None;
        }
        Some(self.iter().sum::<f64>() / self.len as f64)
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let start = (self.head + self.capacity - self.len) % self.capacity;
        (0..self.len).map(move |i| self.samples[(start + i) % self.capacity])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Deadband on the accepted output: a new value replaces the held one only
/// when it differs by at least `threshold`.
#[derive(Debug, Clone)]
pub struct Deadband {
    threshold: f64,
    accepted: f64,
}

impl Deadband {
    pub fn new(threshold: f64, initial: f64) -> Self {
        Self { threshold, accepted: initial }
    }

    /// Offer a candidate; returns true when it was accepted.
    pub fn offer(&mut self, candidate: f64) -> bool {
        if (candidate - self.accepted).abs() >= self.threshold {
            self.accepted = candidate;
            true
        } else {
            false
        }
    }

    pub fn accepted(&self) -> f64 {
        self.accepted
    }
}

/// Round to `decimals` places using the exact decimal value of `value`.
///
/// Scaling by a power of ten first would turn 5.2949999... into 529.5 and
/// round it up; formatting works on the stored binary value instead.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}
