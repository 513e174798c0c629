//! Boundary trait for the external spatial pooling algorithm.

use serde::{Deserialize, Serialize};

/// Construction knobs for a region's spatial pooler, handed to the engine
/// together with the runtime geometry (input length and column count).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpatialParams {
    /// Extent of the input neighborhood each column may connect to.
    pub potential_radius: usize,
    /// Fraction of the potential neighborhood actually sampled.
    pub potential_pct: f64,
    /// Whether columns compete globally instead of within local neighborhoods.
    pub global_inhibition: bool,
    /// Target density of active columns; negative means unused.
    pub local_area_density: f64,
    /// Winners per inhibition area when `local_area_density` is unused.
    pub num_active_columns_per_inh_area: f64,
    /// Overlap a column needs before it can compete at all.
    pub stimulus_threshold: f64,
    /// Permanence decrement for synapses on inactive inputs.
    pub syn_perm_inactive_dec: f32,
    /// Permanence increment for synapses on active inputs.
    pub syn_perm_active_inc: f32,
    /// Permanence at which a synapse counts as connected.
    pub syn_perm_connected: f32,
    /// Minimum overlap duty cycle, as a fraction of the neighborhood maximum.
    pub min_pct_overlap_duty_cycle: f64,
    /// Minimum active duty cycle, as a fraction of the neighborhood maximum.
    pub min_pct_active_duty_cycle: f64,
    /// Steps over which duty cycles are averaged.
    pub duty_cycle_period: usize,
    /// Upper bound of the boost factor for starved columns.
    pub max_boost: f64,
    /// Seed for the algorithm's internal randomness.
    pub seed: i64,
}

impl Default for SpatialParams {
    fn default() -> Self {
        SpatialParams {
            potential_radius: 16,
            potential_pct: 0.5,
            global_inhibition: true,
            local_area_density: -1.0,
            num_active_columns_per_inh_area: 10.0,
            stimulus_threshold: 0.0,
            syn_perm_inactive_dec: 0.008,
            syn_perm_active_inc: 0.05,
            syn_perm_connected: 0.1,
            min_pct_overlap_duty_cycle: 0.001,
            min_pct_active_duty_cycle: 0.001,
            duty_cycle_period: 1000,
            max_boost: 10.0,
            seed: 42,
        }
    }
}

/// Feed-forward learner mapping input bit vectors to active columns.
///
/// One `compute` per time step, plus dense introspection of a column's
/// potential pool so the region can mirror its synapses:
/// - `permanences` returns one value per input index, zero outside the pool;
/// - `connected` returns the connected flag per input index.
pub trait SpatialPooling {
    /// Runs one time step and returns the active flag per column.
    fn compute(&mut self, input: &[bool], learn: bool) -> Vec<bool>;

    /// Dense permanence per input index for the column's potential pool.
    fn permanences(&self, column: usize) -> Vec<f32>;

    /// Dense connected flag per input index for the column.
    fn connected(&self, column: usize) -> Vec<bool>;
}
