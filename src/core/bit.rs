//! A single output bit of a sensor grid.

use crate::core::state::RollingWindow;
use crate::core::stats::ElementStats;

/// One bit of a sensor's 2D output grid, with its recent history.
///
/// `is_active` is written by the sensor when a record is encoded;
/// `is_predicted` is written by consuming regions whose proximal synapses
/// connect to this bit; `is_falsely_predicted` marks predictions that did not
/// come true one step later.
#[derive(Clone, Debug)]
pub struct Bit {
    /// Grid column.
    pub x: usize,
    /// Grid row.
    pub y: usize,
    /// Active flag per retained step.
    pub is_active: RollingWindow<bool>,
    /// Predicted flag per retained step.
    pub is_predicted: RollingWindow<bool>,
    /// Predicted-one-step-ago-but-inactive flag per retained step.
    pub is_falsely_predicted: RollingWindow<bool>,
    /// Lifetime activity counters.
    pub stats: ElementStats,
}

impl Bit {
    /// Creates an inactive bit at grid position (x, y).
    pub fn new(x: usize, y: usize, window: usize) -> Self {
        Bit {
            x,
            y,
            is_active: RollingWindow::new(window),
            is_predicted: RollingWindow::new(window),
            is_falsely_predicted: RollingWindow::new(window),
            stats: ElementStats::default(),
        }
    }

    /// Ages every window by one step.
    #[inline]
    pub fn next_step(&mut self) {
        self.is_active.rotate();
        self.is_predicted.rotate();
        self.is_falsely_predicted.rotate();
    }

    /// Folds the current step into the lifetime counters.
    pub(crate) fn record_stats(&mut self, time_step: u64) {
        let active = *self.is_active.at_curr_step();
        let predicted = *self.is_predicted.at_previous_step();
        self.stats.record(active, predicted, time_step);
    }
}
