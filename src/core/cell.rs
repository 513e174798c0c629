//! A cell within a region column.

use crate::core::segment::Segment;
use crate::core::state::RollingWindow;
use crate::core::stats::ElementStats;
use std::collections::BTreeMap;

/// Mirror of one cell, carrying the distal segments the external algorithm
/// reports for it.
#[derive(Clone, Debug)]
pub struct Cell {
    /// Global cell index as the external algorithm numbers it:
    /// `column_flat_index * cells_per_column + z`.
    pub index: usize,
    /// Depth within the owning column.
    pub z: usize,
    /// Chosen-for-learning flag per retained step.
    pub is_learning: RollingWindow<bool>,
    /// Active flag per retained step.
    pub is_active: RollingWindow<bool>,
    /// Predicted flag per retained step.
    pub is_predicted: RollingWindow<bool>,
    /// Predicted-one-step-ago-but-inactive flag per retained step.
    pub is_falsely_predicted: RollingWindow<bool>,
    /// Distal segment mirrors keyed by external segment index.
    pub segments: BTreeMap<usize, Segment>,
    /// Lifetime activity counters.
    pub stats: ElementStats,
}

impl Cell {
    /// Creates an inactive cell with no segments.
    pub fn new(index: usize, z: usize, window: usize) -> Self {
        Cell {
            index,
            z,
            is_learning: RollingWindow::new(window),
            is_active: RollingWindow::new(window),
            is_predicted: RollingWindow::new(window),
            is_falsely_predicted: RollingWindow::new(window),
            segments: BTreeMap::new(),
            stats: ElementStats::default(),
        }
    }

    /// Ages the cell by one step: rotates its windows, physically drops
    /// segments flagged removed on the previous step, then ages the
    /// survivors (which GC their own synapses the same way).
    pub fn next_step(&mut self) {
        self.is_learning.rotate();
        self.is_active.rotate();
        self.is_predicted.rotate();
        self.is_falsely_predicted.rotate();
        self.segments
            .retain(|_, segment| !*segment.is_removed.at_curr_step());
        for segment in self.segments.values_mut() {
            segment.next_step();
        }
    }

    /// The segment mirror for an external index, if tracked.
    #[inline]
    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(&index)
    }

    /// Folds the current step into the lifetime counters.
    pub(crate) fn record_stats(&mut self, time_step: u64) {
        let active = *self.is_active.at_curr_step();
        let predicted = *self.is_predicted.at_previous_step();
        self.stats.record(active, predicted, time_step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::segment::SegmentKind;

    #[test]
    fn flagged_segments_survive_one_step_then_vanish() {
        let mut cell = Cell::new(3, 1, 4);
        cell.segments.insert(0, Segment::new(SegmentKind::Distal, 4));
        cell.segments.insert(7, Segment::new(SegmentKind::Distal, 4));
        if let Some(segment) = cell.segments.get_mut(&7) {
            segment.flag_removed();
        }
        assert!(cell.segment(7).is_some());
        cell.next_step();
        assert!(cell.segment(7).is_none());
        assert!(cell.segment(0).is_some());
    }

    #[test]
    fn windows_rotate_together() {
        let mut cell = Cell::new(0, 0, 3);
        cell.is_active.set_for_curr_step(true);
        cell.is_learning.set_for_curr_step(true);
        cell.next_step();
        assert!(*cell.is_active.at_previous_step());
        assert!(*cell.is_learning.at_previous_step());
        assert!(!*cell.is_active.at_curr_step());
    }
}
