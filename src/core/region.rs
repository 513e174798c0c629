//! A learning node: drives the external spatial and temporal algorithms and
//! mirrors their opaque state into inspectable columns, cells, segments, and
//! synapses.
//!
//! The region never owns algorithm state. Each step it feeds the algorithms,
//! then reconciles what they report against the mirrors it tracks:
//! - proximal (feed-forward) synapses appear the first time a nonzero
//!   permanence is reported for an input index and are bound to that index's
//!   input element,
//! - distal segments and synapses appear the first time the temporal
//!   algorithm reports their index for a cell,
//! - mirrors the algorithms stop reporting are flagged removed for one step,
//!   then dropped on the next rotation.

use crate::core::cell::Cell;
use crate::core::column::Column;
use crate::core::reconcile::reconcile;
use crate::core::segment::{Segment, SegmentKind};
use crate::core::state::{SimulationContext, MAX_STEPS};
use crate::core::synapse::{ElementRef, InputRef, Synapse};
use crate::engine::{HtmEngine, SpatialParams, SpatialPooling, TemporalParams, TemporalPooling};
use crate::error::{Result, ScopeError};
use crate::types::NodeId;
use fxhash::FxHashSet;
use log::debug;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_cells_per_column() -> usize {
    4
}

/// Configuration of a region node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Unique node name.
    pub name: String,
    /// Columns along x.
    pub width: usize,
    /// Columns along y.
    pub height: usize,
    /// Cells stacked in each column.
    #[serde(default = "default_cells_per_column")]
    pub cells_per_column: usize,
    /// Whether the spatial algorithm learns while stepping.
    #[serde(default = "default_true")]
    pub enable_spatial_learning: bool,
    /// Whether the temporal algorithm learns while stepping.
    #[serde(default = "default_true")]
    pub enable_temporal_learning: bool,
    /// Spatial pooler construction knobs.
    #[serde(default)]
    pub spatial: SpatialParams,
    /// Temporal memory construction knobs.
    #[serde(default)]
    pub temporal: TemporalParams,
}

impl RegionConfig {
    /// A region with default learning parameters.
    pub fn new(name: &str, width: usize, height: usize) -> Self {
        RegionConfig {
            name: name.to_string(),
            width,
            height,
            cells_per_column: default_cells_per_column(),
            enable_spatial_learning: true,
            enable_temporal_learning: true,
            spatial: SpatialParams::default(),
            temporal: TemporalParams::default(),
        }
    }
}

/// A learning node of the network.
pub struct Region {
    /// The node's configuration; learning flags may be toggled between steps.
    pub config: RegionConfig,
    /// Column grid in x-major order, allocated at initialization.
    pub columns: Vec<Column>,
    /// Mean feeder precision after the last statistics pass.
    pub stats_precision_rate: f64,
    input_map: Vec<InputRef>,
    feeders: Vec<NodeId>,
    spatial: Option<Box<dyn SpatialPooling>>,
    temporal: Option<Box<dyn TemporalPooling>>,
    predicted_inputs: Vec<InputRef>,
    window: usize,
    id: NodeId,
}

impl Region {
    /// Creates an unallocated region; `initialize` builds the grid and the
    /// algorithm instances.
    pub fn new(config: RegionConfig) -> Self {
        Region {
            config,
            columns: Vec::new(),
            stats_precision_rate: 0.0,
            input_map: Vec::new(),
            feeders: Vec::new(),
            spatial: None,
            temporal: None,
            predicted_inputs: Vec::new(),
            window: MAX_STEPS,
            id: 0,
        }
    }

    /// The node's name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Whether `initialize` has run.
    pub fn is_initialized(&self) -> bool {
        self.spatial.is_some()
    }

    /// Feeder nodes in link-declaration order.
    pub fn feeders(&self) -> &[NodeId] {
        &self.feeders
    }

    /// Flat input space: one element address per input bit, concatenated from
    /// the feeders in declaration order.
    pub fn input_map(&self) -> &[InputRef] {
        &self.input_map
    }

    /// The column at grid position (x, y).
    pub fn column(&self, x: usize, y: usize) -> Option<&Column> {
        if x < self.config.width && y < self.config.height {
            self.columns.get(x * self.config.height + y)
        } else {
            None
        }
    }

    pub(crate) fn cell_mut(&mut self, column: usize, z: usize) -> Option<&mut Cell> {
        self.columns
            .get_mut(column)
            .and_then(|column| column.cells.get_mut(z))
    }

    /// Allocates the column grid and constructs the external algorithms:
    /// - fails when no feeder is linked in,
    /// - builds the spatial pooler over the flat input space,
    /// - builds the temporal memory over `columns * cells_per_column` cells.
    pub fn initialize(
        &mut self,
        id: NodeId,
        feeders: Vec<NodeId>,
        input_map: Vec<InputRef>,
        engine: &dyn HtmEngine,
        ctx: &SimulationContext,
    ) -> Result<()> {
        if feeders.is_empty() {
            return Err(ScopeError::RegionHasNoFeeder(self.config.name.clone()));
        }
        if self.config.width == 0 || self.config.height == 0 {
            return Err(ScopeError::InvalidParameter(format!(
                "region '{}' has a zero-sized column grid",
                self.config.name
            )));
        }
        if self.config.cells_per_column == 0 {
            return Err(ScopeError::InvalidParameter(format!(
                "region '{}' needs at least one cell per column",
                self.config.name
            )));
        }
        let window = ctx.window;
        let mut columns = Vec::with_capacity(self.config.width * self.config.height);
        for x in 0..self.config.width {
            for y in 0..self.config.height {
                let flat = columns.len();
                columns.push(Column::new(x, y, flat, self.config.cells_per_column, window));
            }
        }
        self.spatial = Some(engine.spatial_pooler(
            input_map.len(),
            columns.len(),
            &self.config.spatial,
        )?);
        self.temporal = Some(engine.temporal_memory(
            columns.len(),
            self.config.cells_per_column,
            &self.config.temporal,
        )?);
        debug!(
            "region '{}': {} columns x {} cells over {} inputs",
            self.config.name,
            columns.len(),
            self.config.cells_per_column,
            input_map.len()
        );
        self.columns = columns;
        self.input_map = input_map;
        self.feeders = feeders;
        self.window = window;
        self.id = id;
        self.stats_precision_rate = 0.0;
        Ok(())
    }

    /// Runs one time step:
    /// - rotates every element window, garbage-collecting mirrors flagged
    ///   removed on the previous step,
    /// - feeds the input to the spatial algorithm and the resulting active
    ///   column set to the temporal algorithm,
    /// - reconciles the proximal and distal mirrors against what the
    ///   algorithms now report.
    ///
    /// A wrong-size input is rejected before any window rotates, so the
    /// failed call leaves the current step untouched.
    pub fn next_step(&mut self, input: &[bool]) -> Result<()> {
        if input.len() != self.input_map.len() {
            return Err(ScopeError::Engine(format!(
                "region '{}' received {} input bits, expected {}",
                self.config.name,
                input.len(),
                self.input_map.len()
            )));
        }
        self.predicted_inputs.clear();
        for column in &mut self.columns {
            column.next_step();
        }
        let learn_spatial = self.config.enable_spatial_learning;
        let active = match self.spatial.as_deref_mut() {
            Some(spatial) => spatial.compute(input, learn_spatial),
            None => return Err(ScopeError::NotInitialized),
        };
        if active.len() != self.columns.len() {
            return Err(ScopeError::Engine(format!(
                "spatial algorithm reported {} columns, region '{}' has {}",
                active.len(),
                self.config.name,
                self.columns.len()
            )));
        }
        let active_columns: FxHashSet<usize> = active
            .iter()
            .enumerate()
            .filter_map(|(index, &active)| active.then_some(index))
            .collect();
        let learn_temporal = self.config.enable_temporal_learning;
        match self.temporal.as_deref_mut() {
            Some(temporal) => temporal.compute(&active_columns, learn_temporal),
            None => return Err(ScopeError::NotInitialized),
        }
        self.update_spatial_elements(&active_columns)?;
        self.update_temporal_elements()
    }

    /// Mirrors the feed-forward side: proximal segment flags, lazy synapse
    /// creation for nonzero permanences, removal flags for permanences that
    /// dropped to zero, and prediction marks on connected input elements.
    fn update_spatial_elements(&mut self, active_columns: &FxHashSet<usize>) -> Result<()> {
        let spatial = match self.spatial.as_deref() {
            Some(spatial) => spatial,
            None => return Err(ScopeError::NotInitialized),
        };
        let predictive = match self.temporal.as_deref() {
            Some(temporal) => temporal.predictive_cells(),
            None => return Err(ScopeError::NotInitialized),
        };
        let window = self.window;
        let cells_per_column = self.config.cells_per_column;
        let input_len = self.input_map.len();
        let mut created = 0usize;
        let mut flagged = 0usize;
        for flat in 0..self.columns.len() {
            let is_active = active_columns.contains(&flat);
            let is_predicted =
                (0..cells_per_column).any(|z| predictive.contains(&(flat * cells_per_column + z)));

            // The pool is only pulled for columns a frontend would light up.
            let pool = if is_active || is_predicted {
                let permanences = spatial.permanences(flat);
                let connected = spatial.connected(flat);
                if permanences.len() != input_len || connected.len() != input_len {
                    return Err(ScopeError::Engine(format!(
                        "spatial pool for column {flat} reports {} permanences and {} connected flags over {input_len} inputs",
                        permanences.len(),
                        connected.len()
                    )));
                }
                Some((permanences, connected))
            } else {
                None
            };

            let input_map = &self.input_map;
            let segment = &mut self.columns[flat].proximal_segment;
            segment.is_active.set_for_curr_step(is_active);
            segment.is_predicted.set_for_curr_step(is_predicted);
            if *segment.is_predicted.at_previous_step() && !is_active {
                segment.is_falsely_predicted.set_for_curr_step(true);
            }

            if let Some((permanences, connected)) = pool {
                let reported: FxHashSet<usize> = permanences
                    .iter()
                    .enumerate()
                    .filter_map(|(index, &permanence)| (permanence > 0.0).then_some(index))
                    .collect();
                let (c, f) = reconcile(
                    &mut segment.synapses,
                    &reported,
                    |index| Synapse::new(input_map[index], window),
                    Synapse::flag_removed,
                );
                created += c;
                flagged += f;
                for &index in &reported {
                    if let Some(synapse) = segment.synapses.get_mut(&index) {
                        synapse.permanence.set_for_curr_step(permanences[index]);
                        synapse.is_connected.set_for_curr_step(connected[index]);
                    }
                }
            }

            if is_predicted {
                for synapse in segment.synapses.values_mut() {
                    if *synapse.is_connected.at_curr_step() {
                        synapse.is_predicted.set_for_curr_step(true);
                        self.predicted_inputs.push(synapse.input_elem);
                    }
                }
            }
            if *segment.is_falsely_predicted.at_curr_step() {
                for synapse in segment.synapses.values_mut() {
                    if *synapse.is_predicted.at_previous_step() {
                        synapse.is_falsely_predicted.set_for_curr_step(true);
                    }
                }
            }
        }
        if created + flagged > 0 {
            debug!(
                "region '{}': proximal synapses {created} created, {flagged} flagged removed",
                self.config.name
            );
        }
        Ok(())
    }

    /// Mirrors the sequence side: cell flags from the winner/active/predictive
    /// sets, plus the distal segment and synapse mirrors reported per cell.
    fn update_temporal_elements(&mut self) -> Result<()> {
        let temporal = match self.temporal.as_deref() {
            Some(temporal) => temporal,
            None => return Err(ScopeError::NotInitialized),
        };
        let winners = temporal.winner_cells();
        let actives = temporal.active_cells();
        let predictive = temporal.predictive_cells();
        let active_segments = temporal.active_segments();
        let window = self.window;
        let cells_per_column = self.config.cells_per_column;
        let connected_permanence = self.config.temporal.connected_permanence;
        let id = self.id;
        let mut created = 0usize;
        let mut flagged = 0usize;
        for column in &mut self.columns {
            for cell in &mut column.cells {
                let index = cell.index;
                cell.is_learning.set_for_curr_step(winners.contains(&index));
                let is_active = actives.contains(&index);
                cell.is_active.set_for_curr_step(is_active);
                cell.is_predicted
                    .set_for_curr_step(predictive.contains(&index));
                if *cell.is_predicted.at_previous_step() && !is_active {
                    cell.is_falsely_predicted.set_for_curr_step(true);
                }

                let reported: FxHashSet<usize> =
                    temporal.segments_for_cell(index).into_iter().collect();
                let (c, f) = reconcile(
                    &mut cell.segments,
                    &reported,
                    |_| Segment::new(SegmentKind::Distal, window),
                    Segment::flag_removed,
                );
                created += c;
                flagged += f;

                for (&seg_index, segment) in cell.segments.iter_mut() {
                    if !reported.contains(&seg_index) {
                        continue;
                    }
                    segment
                        .is_active
                        .set_for_curr_step(active_segments.contains(&seg_index));
                    let reported_synapses: FxHashSet<usize> =
                        temporal.synapses_for_segment(seg_index).into_iter().collect();
                    let (c, f) = reconcile(
                        &mut segment.synapses,
                        &reported_synapses,
                        |syn_index| {
                            let (presynaptic, _) = temporal.synapse_data(syn_index);
                            Synapse::new(cell_address(id, presynaptic, cells_per_column), window)
                        },
                        Synapse::flag_removed,
                    );
                    created += c;
                    flagged += f;
                    for &syn_index in &reported_synapses {
                        let (presynaptic, permanence) = temporal.synapse_data(syn_index);
                        if let Some(synapse) = segment.synapses.get_mut(&syn_index) {
                            synapse.permanence.set_for_curr_step(permanence);
                            synapse
                                .is_connected
                                .set_for_curr_step(permanence >= connected_permanence);
                            synapse.input_elem =
                                cell_address(id, presynaptic, cells_per_column);
                        }
                    }
                }
            }
        }
        if created + flagged > 0 {
            debug!(
                "region '{}': distal mirrors {created} created, {flagged} flagged removed",
                self.config.name
            );
        }
        Ok(())
    }

    /// Prediction marks for feeder elements gathered during the last step.
    /// The network applies them, since it owns the feeder nodes.
    pub(crate) fn take_predicted_inputs(&mut self) -> Vec<InputRef> {
        std::mem::take(&mut self.predicted_inputs)
    }

    /// Folds the step into per-cell counters and averages the feeders'
    /// precision into this region's precision.
    pub fn calculate_statistics(&mut self, feeder_precisions: &[f64], time_step: u64) {
        for column in &mut self.columns {
            for cell in &mut column.cells {
                cell.record_stats(time_step);
            }
        }
        if !feeder_precisions.is_empty() {
            self.stats_precision_rate =
                feeder_precisions.iter().sum::<f64>() / feeder_precisions.len() as f64;
        }
    }

    /// Per column (x-major), whether its surface cell is active this step.
    /// This is what consuming regions read as input.
    pub fn output(&self) -> Vec<bool> {
        self.columns
            .iter()
            .map(|column| {
                column
                    .cells
                    .first()
                    .map(|cell| *cell.is_active.at_curr_step())
                    .unwrap_or(false)
            })
            .collect()
    }
}

/// Address of a cell in this region's grid, from its global index.
fn cell_address(node: NodeId, cell_index: usize, cells_per_column: usize) -> InputRef {
    InputRef {
        node,
        elem: ElementRef::Cell {
            column: cell_index / cells_per_column,
            z: cell_index % cells_per_column,
        },
    }
}
