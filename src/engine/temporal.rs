//! Boundary trait for the external temporal (sequence) memory algorithm.

use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Construction knobs for a region's temporal memory, handed to the engine
/// together with the runtime geometry (column count and cells per column).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemporalParams {
    /// Permanence given to newly grown distal synapses.
    pub initial_permanence: f32,
    /// Permanence at which a distal synapse counts as connected.
    pub connected_permanence: f32,
    /// Active synapses a segment needs to be considered for learning.
    pub min_threshold: usize,
    /// Most synapses grown onto a segment in one step.
    pub max_new_synapse_count: usize,
    /// Permanence increment for reinforced synapses.
    pub permanence_increment: f32,
    /// Permanence decrement for punished synapses.
    pub permanence_decrement: f32,
    /// Connected active synapses a segment needs to turn predictive.
    pub activation_threshold: usize,
    /// Seed for the algorithm's internal randomness.
    pub seed: i64,
}

impl Default for TemporalParams {
    fn default() -> Self {
        TemporalParams {
            initial_permanence: 0.21,
            connected_permanence: 0.5,
            min_threshold: 10,
            max_new_synapse_count: 15,
            permanence_increment: 0.1,
            permanence_decrement: 0.1,
            activation_threshold: 12,
            seed: 42,
        }
    }
}

/// Sequence learner over a region's cells.
///
/// Cells are numbered globally (`column * cells_per_column + z`); segments and
/// synapses carry algorithm-assigned indices that are only meaningful through
/// the introspection calls below. The region mirrors whatever these calls
/// report and never mutates algorithm state directly.
pub trait TemporalPooling {
    /// Runs one time step over the set of feed-forward active columns.
    fn compute(&mut self, active_columns: &FxHashSet<usize>, learn: bool);

    /// Cells chosen for learning this step.
    fn winner_cells(&self) -> FxHashSet<usize>;

    /// Cells active this step.
    fn active_cells(&self) -> FxHashSet<usize>;

    /// Cells in the predictive state this step.
    fn predictive_cells(&self) -> FxHashSet<usize>;

    /// Distal segments active this step.
    fn active_segments(&self) -> FxHashSet<usize>;

    /// Segment indices currently attached to a cell.
    fn segments_for_cell(&self, cell: usize) -> Vec<usize>;

    /// Synapse indices currently attached to a segment.
    fn synapses_for_segment(&self, segment: usize) -> Vec<usize>;

    /// `(presynaptic cell, permanence)` for a synapse.
    fn synapse_data(&self, synapse: usize) -> (usize, f32);
}
