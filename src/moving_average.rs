//! Fixed-window moving average.
//!
//! The mean of the last N samples is maintained incrementally: each update
//! adjusts the stored average instead of re-summing the window. This keeps
//! updates O(1), at the price of floating point error that can accumulate
//! over long runs. The drift stays far below the KB/s resolution the health
//! checks compare against (see the comparison test below).

use std::collections::VecDeque;

/// Moving average over the most recent `capacity` samples.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    capacity: usize,
    samples: VecDeque<f64>,
    average: f64,
}

impl MovingAverage {
    /// Creates an empty moving average. A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
            average: 0.0,
        }
    }

    /// Adds a sample and returns the updated average.
    ///
    /// Once the window is full the oldest sample is evicted first.
    pub fn update(&mut self, value: f64) -> f64 {
        let mut len = self.samples.len();
        if len >= self.capacity {
            if let Some(oldest) = self.samples.pop_front() {
                self.average -= oldest / len as f64;
                len -= 1;
            }
        } else {
            // Rescale for the denominator growing from len to len + 1
            self.average -= self.average / (len + 1) as f64;
        }

        self.samples.push_back(value);
        len += 1;
        self.average += value / len as f64;

        self.average
    }

    /// Current average. 0.0 until the first sample arrives.
    pub fn average(&self) -> f64 {
        self.average
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if no sample has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of retained samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    const EPSILON: f64 = 1e-9;

    fn naive_mean(samples: &[f64]) -> f64 {
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    #[test]
    fn test_window_of_three() {
        let mut avg = MovingAverage::new(3);
        assert!((avg.update(10.0) - 10.0).abs() < EPSILON);
        assert!((avg.update(20.0) - 15.0).abs() < EPSILON);
        assert!((avg.update(30.0) - 20.0).abs() < EPSILON);

        // 10 is evicted, mean of {20, 30, 0}
        let value = avg.update(0.0);
        assert!((value - 50.0 / 3.0).abs() < 1e-6);
        assert_eq!(avg.len(), 3);
    }

    #[test]
    fn test_zero_capacity_clamps_to_one() {
        let mut avg = MovingAverage::new(0);
        assert_eq!(avg.capacity(), 1);
        avg.update(5.0);
        assert_eq!(avg.update(7.0), 7.0);
        assert_eq!(avg.len(), 1);
    }

    #[test]
    fn test_empty() {
        let avg = MovingAverage::new(4);
        assert!(avg.is_empty());
        assert_eq!(avg.average(), 0.0);
    }

    #[test]
    fn test_matches_naive_recomputation() {
        let mut rng = rand::thread_rng();

        for capacity in [1usize, 2, 5, 17] {
            let mut avg = MovingAverage::new(capacity);
            let mut window: VecDeque<f64> = VecDeque::new();

            for _ in 0..5_000 {
                let sample = rng.gen_range(0.0..100_000.0);
                avg.update(sample);

                window.push_back(sample);
                if window.len() > capacity {
                    window.pop_front();
                }

                let expected = naive_mean(window.make_contiguous());
                let drift = (avg.average() - expected).abs();
                // Well below 1 KB/s, the resolution thresholds are checked at
                assert!(
                    drift < 1e-3,
                    "capacity {}: drift {} (got {}, expected {})",
                    capacity,
                    drift,
                    avg.average(),
                    expected
                );
                assert!(avg.len() <= capacity);
            }
        }
    }
}
