//! Frame timing samples and the rolling throughput figure.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Frame time rounded to the nearest whole millisecond.
pub fn elapsed_ms(elapsed: Duration) -> u64 {
    (elapsed.as_micros() as u64 + 500) / 1_000
}

/// Bounded history of frame times in milliseconds; the oldest sample is
/// evicted once the window holds `capacity` samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleWindow {
    samples: VecDeque<u64>,
    capacity: usize,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample_ms: u64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample_ms);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn samples(&self) -> impl Iterator<Item = u64> + '_ {
        self.samples.iter().copied()
    }

    /// Arithmetic mean rounded to the nearest millisecond.
    pub fn mean(&self) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: u64 = self.samples.iter().sum();
        Some((sum as f64 / self.samples.len() as f64).round() as u64)
    }

    pub fn throughput(&self, triangles: u32) -> Option<Throughput> {
        self.mean().map(|mean_ms| Throughput {
            triangles,
            mean_ms,
            partial: !self.is_full(),
        })
    }
}

/// One throughput figure: `"<N> triangles rendered in <M> ms"`, with a
/// trailing `*` while the window is not yet full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throughput {
    pub triangles: u32,
    pub mean_ms: u64,
    /// Fewer samples than the window capacity.
    pub partial: bool,
}

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} triangles rendered in {} ms",
            self.triangles, self.mean_ms
        )?;
        if self.partial {
            f.write_str("*")?;
        }
        Ok(())
    }
}
