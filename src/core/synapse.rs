//! Synapse mirrors and the addresses they point at.
//!
//! A synapse here is a viewable copy of one connection inside an external
//! algorithm. Proximal synapses bind a column's feed-forward segment to an
//! element of a feeder node; distal synapses bind a cell's segment to another
//! cell of the same region. Mirrors are created lazily the first time the
//! algorithm reports the connection and are garbage-collected one step after
//! the algorithm stops reporting it.

use crate::core::state::RollingWindow;
use crate::types::NodeId;

/// Position of an element within its node's grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementRef {
    /// A sensor bit at grid position (x, y).
    Bit {
        /// Grid column.
        x: usize,
        /// Grid row.
        y: usize,
    },
    /// A region cell: flat column index plus depth within the column.
    Cell {
        /// Flat column index (x-major).
        column: usize,
        /// Depth within the column.
        z: usize,
    },
}

/// Non-owning address of an input element somewhere in the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InputRef {
    /// The node holding the element.
    pub node: NodeId,
    /// The element within that node.
    pub elem: ElementRef,
}

/// Mirror of one synapse reported by an external algorithm.
#[derive(Clone, Debug)]
pub struct Synapse {
    /// The input element this synapse reads from.
    pub input_elem: InputRef,
    /// Permanence value per retained step.
    pub permanence: RollingWindow<f32>,
    /// Whether the permanence cleared the connected threshold, per step.
    pub is_connected: RollingWindow<bool>,
    /// Predicted flag per retained step.
    pub is_predicted: RollingWindow<bool>,
    /// Predicted-but-wrong flag per retained step.
    pub is_falsely_predicted: RollingWindow<bool>,
    /// Set for one step before the synapse is physically dropped.
    pub is_removed: RollingWindow<bool>,
}

impl Synapse {
    /// Creates a fresh mirror bound to `input_elem`.
    pub fn new(input_elem: InputRef, window: usize) -> Self {
        Synapse {
            input_elem,
            permanence: RollingWindow::new(window),
            is_connected: RollingWindow::new(window),
            is_predicted: RollingWindow::new(window),
            is_falsely_predicted: RollingWindow::new(window),
            is_removed: RollingWindow::new(window),
        }
    }

    /// Ages every window by one step.
    #[inline]
    pub fn next_step(&mut self) {
        self.permanence.rotate();
        self.is_connected.rotate();
        self.is_predicted.rotate();
        self.is_falsely_predicted.rotate();
        self.is_removed.rotate();
    }

    /// Marks the synapse for removal; the owning segment drops it on its next
    /// rotation.
    #[inline]
    pub fn flag_removed(&mut self) {
        self.is_removed.set_for_curr_step(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bit_ref(x: usize, y: usize) -> InputRef {
        InputRef {
            node: 0,
            elem: ElementRef::Bit { x, y },
        }
    }

    #[test]
    fn starts_clean() {
        let synapse = Synapse::new(bit_ref(1, 2), 3);
        assert_eq!(*synapse.permanence.at_curr_step(), 0.0);
        assert!(!*synapse.is_connected.at_curr_step());
        assert!(!*synapse.is_removed.at_curr_step());
        assert_eq!(synapse.input_elem, bit_ref(1, 2));
    }

    #[test]
    fn removal_flag_ages_with_the_window() {
        let mut synapse = Synapse::new(bit_ref(0, 0), 3);
        synapse.flag_removed();
        assert!(*synapse.is_removed.at_curr_step());
        synapse.next_step();
        assert!(!*synapse.is_removed.at_curr_step());
        assert!(*synapse.is_removed.at_previous_step());
    }
}
