//! Segment mirrors: a column's feed-forward segment and the distal segments
//! of a cell.

use crate::core::state::RollingWindow;
use crate::core::synapse::Synapse;
use std::collections::BTreeMap;

/// Distinguishes the single feed-forward segment of a column from the lazily
/// created distal segments of a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    /// Feed-forward segment; exactly one per column, never removed.
    Proximal,
    /// Sequence segment on a cell; created and removed as the external
    /// algorithm reports them.
    Distal,
}

/// Mirror of one segment, holding its synapse mirrors keyed by the external
/// algorithm's synapse index.
#[derive(Clone, Debug)]
pub struct Segment {
    /// Proximal or distal.
    pub kind: SegmentKind,
    /// Active flag per retained step.
    pub is_active: RollingWindow<bool>,
    /// Predicted flag per retained step (proximal segments only; the external
    /// algorithm does not report distal predictions).
    pub is_predicted: RollingWindow<bool>,
    /// Predicted-but-wrong flag per retained step.
    pub is_falsely_predicted: RollingWindow<bool>,
    /// Set for one step before the segment is physically dropped.
    pub is_removed: RollingWindow<bool>,
    /// Synapse mirrors keyed by external synapse index.
    pub synapses: BTreeMap<usize, Synapse>,
}

impl Segment {
    /// Creates an empty segment of the given kind.
    pub fn new(kind: SegmentKind, window: usize) -> Self {
        Segment {
            kind,
            is_active: RollingWindow::new(window),
            is_predicted: RollingWindow::new(window),
            is_falsely_predicted: RollingWindow::new(window),
            is_removed: RollingWindow::new(window),
            synapses: BTreeMap::new(),
        }
    }

    /// Ages the segment by one step:
    /// - rotates its own windows,
    /// - physically drops synapses that were flagged removed on the previous
    ///   step (their flag still sits in the un-rotated current slot),
    /// - rotates the surviving synapses.
    pub fn next_step(&mut self) {
        self.is_active.rotate();
        self.is_predicted.rotate();
        self.is_falsely_predicted.rotate();
        self.is_removed.rotate();
        self.synapses
            .retain(|_, synapse| !*synapse.is_removed.at_curr_step());
        for synapse in self.synapses.values_mut() {
            synapse.next_step();
        }
    }

    /// Marks the segment for removal; the owning cell drops it on its next
    /// rotation.
    #[inline]
    pub fn flag_removed(&mut self) {
        self.is_removed.set_for_curr_step(true);
    }

    /// The synapse mirror for an external index, if tracked.
    #[inline]
    pub fn synapse(&self, index: usize) -> Option<&Synapse> {
        self.synapses.get(&index)
    }
}
