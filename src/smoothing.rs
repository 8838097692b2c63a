use std::collections::VecDeque;

/// Simple moving average over the most recent `capacity` samples.
///
/// Every retained sample carries the same weight. Once full, each push evicts
/// the oldest sample.
#[derive(Clone, Debug)]
pub struct MovingAverage {
    window: VecDeque<f64>,
    capacity: usize,
}

impl MovingAverage {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample and return the mean of the window.
    pub fn push(&mut self, value: f64) -> f64 {
        while self.window.len() >= self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(value);
        self.window.iter().sum::<f64>() / self.window.len() as f64
    }

    /// Mean of the current window, if any samples are held.
    pub fn mean(&self) -> Option<f64> {
        if self.window.is_empty() {
            None
        } else {
            Some(self.window.iter().sum::<f64>() / self.window.len() as f64)
        }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_window_is_exact_mean() {
        let mut avg = MovingAverage::new(5);
        assert_eq!(avg.mean(), None);
        assert_eq!(avg.push(-10.0), -10.0);
        assert_eq!(avg.push(-20.0), -15.0);
        assert_eq!(avg.push(-30.0), -20.0);
        assert_eq!(avg.len(), 3);
    }

    #[test]
    fn full_window_drops_oldest() {
        let mut avg = MovingAverage::new(3);
        for v in [1.0, 2.0, 3.0] {
            avg.push(v);
        }
        // 1.0 falls out.
        assert_eq!(avg.push(10.0), 5.0);
        assert_eq!(avg.len(), 3);
        // 2.0 falls out.
        assert_eq!(avg.push(0.0), 13.0 / 3.0);
    }

    #[test]
    fn window_of_one_tracks_latest() {
        let mut avg = MovingAverage::new(0);
        assert_eq!(avg.capacity(), 1);
        assert_eq!(avg.push(4.0), 4.0);
        assert_eq!(avg.push(-7.5), -7.5);
    }
}
