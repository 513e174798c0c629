//! Cumulative activity statistics for elements and nodes.

/// Lifetime counters kept per bit and per cell, updated once per step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ElementStats {
    /// Steps on which the element was active.
    pub activation_count: u64,
    /// Activations divided by completed steps.
    pub activation_rate: f64,
    /// Predictions registered for this element (counted when they land,
    /// one step after they were made).
    pub prediction_count: u64,
    /// Predictions that came true, over all predictions.
    pub precision_rate: f64,
    prediction_hits: u64,
}

impl ElementStats {
    /// Folds one step into the counters. `predicted_one_step_ago` is the
    /// element's prediction flag from the previous step; a prediction counts
    /// as a hit when the element is active now.
    #[inline]
    pub fn record(&mut self, active_now: bool, predicted_one_step_ago: bool, time_step: u64) {
        if active_now {
            self.activation_count += 1;
        }
        if time_step > 0 {
            self.activation_rate = self.activation_count as f64 / time_step as f64;
        }
        if predicted_one_step_ago {
            self.prediction_count += 1;
            if active_now {
                self.prediction_hits += 1;
            }
            self.precision_rate = self.prediction_hits as f64 / self.prediction_count as f64;
        }
    }
}

/// Updates a node-level precision rate where each new observation carries as
/// much weight as the whole history before it.
#[inline]
pub fn discounted_precision(old: f64, hit: bool) -> f64 {
    (old + if hit { 1.0 } else { 0.0 }) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_sequence() {
        let mut precision = 0.0;
        let mut observed = Vec::new();
        for hit in [true, false, true] {
            precision = discounted_precision(precision, hit);
            observed.push(precision);
        }
        assert_eq!(observed, vec![0.5, 0.25, 0.625]);
    }

    #[test]
    fn counts_activations_and_hits() {
        let mut stats = ElementStats::default();
        stats.record(true, false, 1);
        stats.record(false, true, 2);
        stats.record(true, true, 3);
        assert_eq!(stats.activation_count, 2);
        assert!((stats.activation_rate - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats.prediction_count, 2);
        assert!((stats.precision_rate - 0.5).abs() < 1e-12);
    }
}
