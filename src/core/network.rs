//! The node graph: structural edits, feed-forward phase scheduling, and the
//! step lifecycle.
//!
//! Nodes are linked into a DAG where sensors feed regions and regions feed
//! higher regions. Before anything runs, the graph is scheduled into phases:
//! phase 0 holds the sensors, and every later phase holds the nodes whose
//! feeders have all been placed in earlier phases. Stepping walks the phases
//! in order, so each region reads input produced on the same time step.

use crate::core::node::Node;
use crate::core::state::{SimulationContext, MAX_STEPS, MAX_STEPS_WITH_INFERENCE};
use crate::core::synapse::{ElementRef, InputRef};
use crate::engine::HtmEngine;
use crate::error::{Result, ScopeError};
use crate::types::NodeId;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// A feed-forward edge: `out_node`'s output becomes part of `in_node`'s input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Name of the feeding node.
    pub out_node: String,
    /// Name of the receiving node.
    pub in_node: String,
}

/// A graph of sensors and regions with a feed-forward schedule.
#[derive(Default)]
pub struct Network {
    nodes: Vec<Node>,
    links: Vec<Link>,
    phases: Vec<Vec<NodeId>>,
    initialized: bool,
    stats_precision_rate: f64,
}

impl Network {
    /// An empty network.
    pub fn new() -> Self {
        Network::default()
    }

    /// All nodes, in insertion order. `NodeId`s index into this slice.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All links, in declaration order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// The feed-forward schedule: node ids grouped by phase.
    pub fn phases(&self) -> &[Vec<NodeId>] {
        &self.phases
    }

    /// Whether `initialize` has run since the last structural edit.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Mean node precision after the last statistics pass.
    pub fn precision_rate(&self) -> f64 {
        self.stats_precision_rate
    }

    /// The node carrying this name.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.node_id(name).map(|id| &self.nodes[id])
    }

    /// Mutable view of the node carrying this name.
    pub fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        match self.node_id(name) {
            Some(id) => self.nodes.get_mut(id),
            None => None,
        }
    }

    fn node_id(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|node| node.name() == name)
    }

    /// Feeder ids of a node, in link-declaration order.
    fn feeder_ids(&self, id: NodeId) -> Vec<NodeId> {
        let name = self.nodes[id].name();
        self.links
            .iter()
            .filter(|link| link.in_node == name)
            .filter_map(|link| self.node_id(&link.out_node))
            .collect()
    }

    /// Adds a node; names must be unique. The schedule is rebuilt.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.node_id(node.name()).is_some() {
            return Err(ScopeError::DuplicateNodeName(node.name().to_string()));
        }
        debug!("adding node '{}'", node.name());
        self.nodes.push(node);
        self.initialized = false;
        self.prepare_phases()
    }

    /// Links `out_node`'s output into `in_node`'s input. Both nodes must
    /// exist, the receiver must be a region, and the edge must be new. A link
    /// that closes a cycle is rolled back and rejected.
    pub fn add_link(&mut self, out_node: &str, in_node: &str) -> Result<()> {
        if self.node_id(out_node).is_none() {
            return Err(ScopeError::UnknownNode(out_node.to_string()));
        }
        let in_id = match self.node_id(in_node) {
            Some(id) => id,
            None => return Err(ScopeError::UnknownNode(in_node.to_string())),
        };
        if self.nodes[in_id].is_sensor() {
            return Err(ScopeError::SensorCannotReceive(in_node.to_string()));
        }
        if self
            .links
            .iter()
            .any(|link| link.out_node == out_node && link.in_node == in_node)
        {
            return Err(ScopeError::DuplicateLink {
                out_node: out_node.to_string(),
                in_node: in_node.to_string(),
            });
        }
        debug!("adding link '{out_node}' -> '{in_node}'");
        let snapshot = self.phases.clone();
        self.links.push(Link {
            out_node: out_node.to_string(),
            in_node: in_node.to_string(),
        });
        if let Err(err) = self.prepare_phases() {
            self.links.pop();
            self.phases = snapshot;
            return Err(err);
        }
        self.initialized = false;
        Ok(())
    }

    /// Removes a node along with every link touching it.
    pub fn remove_node(&mut self, name: &str) -> Result<()> {
        let id = self
            .node_id(name)
            .ok_or_else(|| ScopeError::UnknownNode(name.to_string()))?;
        debug!("removing node '{name}'");
        self.nodes.remove(id);
        self.links
            .retain(|link| link.out_node != name && link.in_node != name);
        self.initialized = false;
        self.prepare_phases()
    }

    /// Removes one link.
    pub fn remove_link(&mut self, out_node: &str, in_node: &str) -> Result<()> {
        let index = self
            .links
            .iter()
            .position(|link| link.out_node == out_node && link.in_node == in_node)
            .ok_or_else(|| ScopeError::UnknownLink {
                out_node: out_node.to_string(),
                in_node: in_node.to_string(),
            })?;
        debug!("removing link '{out_node}' -> '{in_node}'");
        self.links.remove(index);
        self.initialized = false;
        self.prepare_phases()
    }

    /// Rebuilds the feed-forward schedule by repeated peeling: phase 0 is the
    /// sensors in declaration order; each later phase collects the nodes
    /// whose feeders have all been placed. Nodes hanging off unlinked parts
    /// of the graph stay unscheduled (initialize reports them); a remainder
    /// that waits on itself is a cycle.
    pub fn prepare_phases(&mut self) -> Result<()> {
        let mut phase_of: Vec<Option<usize>> = vec![None; self.nodes.len()];
        let mut phases: Vec<Vec<NodeId>> = Vec::new();

        let sensors: Vec<NodeId> = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(id, node)| node.is_sensor().then_some(id))
            .collect();
        for &id in &sensors {
            phase_of[id] = Some(0);
        }
        if !sensors.is_empty() {
            phases.push(sensors);
        }

        let feeder_ids: Vec<Vec<NodeId>> =
            (0..self.nodes.len()).map(|id| self.feeder_ids(id)).collect();

        loop {
            let mut next: Vec<NodeId> = Vec::new();
            for id in 0..self.nodes.len() {
                if phase_of[id].is_some() {
                    continue;
                }
                let feeders = &feeder_ids[id];
                if !feeders.is_empty() && feeders.iter().all(|&f| phase_of[f].is_some()) {
                    next.push(id);
                }
            }
            if next.is_empty() {
                break;
            }
            let phase = phases.len();
            for &id in &next {
                phase_of[id] = Some(phase);
            }
            phases.push(next);
        }

        // The peel stalls benignly on nodes fed (directly or transitively) by
        // an unlinked region. It stalls on a cycle exactly when some of the
        // remainder waits on itself.
        let mut waiting: Vec<bool> = (0..self.nodes.len())
            .map(|id| phase_of[id].is_none() && !feeder_ids[id].is_empty())
            .collect();
        loop {
            let mut drained = Vec::new();
            for id in 0..self.nodes.len() {
                if waiting[id] && feeder_ids[id].iter().all(|&f| !waiting[f]) {
                    drained.push(id);
                }
            }
            if drained.is_empty() {
                break;
            }
            for id in drained {
                waiting[id] = false;
            }
        }
        if waiting.iter().any(|&w| w) {
            return Err(ScopeError::CyclicGraph);
        }

        for link in &self.links {
            if let (Some(out_id), Some(in_id)) =
                (self.node_id(&link.out_node), self.node_id(&link.in_node))
            {
                if let (Some(out_phase), Some(in_phase)) = (phase_of[out_id], phase_of[in_id]) {
                    if out_phase >= in_phase {
                        return Err(ScopeError::CyclicGraph);
                    }
                }
            }
        }

        debug!(
            "scheduled {} of {} nodes into {} phases",
            phase_of.iter().filter(|p| p.is_some()).count(),
            self.nodes.len(),
            phases.len()
        );
        self.phases = phases;
        Ok(())
    }

    /// Flat input space of a region: one element address per input bit,
    /// concatenated from the feeders' configured geometry.
    fn build_input_map(&self, feeders: &[NodeId]) -> Vec<InputRef> {
        let mut map = Vec::new();
        for &feeder in feeders {
            match &self.nodes[feeder] {
                Node::Sensor(sensor) => {
                    for x in 0..sensor.config.width {
                        for y in 0..sensor.config.height {
                            map.push(InputRef {
                                node: feeder,
                                elem: ElementRef::Bit { x, y },
                            });
                        }
                    }
                }
                Node::Region(region) => {
                    let columns = region.config.width * region.config.height;
                    for column in 0..columns {
                        map.push(InputRef {
                            node: feeder,
                            elem: ElementRef::Cell { column, z: 0 },
                        });
                    }
                }
            }
        }
        map
    }

    /// Validates the whole graph, then allocates every node in phase order.
    /// Nothing is mutated until validation passes. The retained window is 30
    /// steps when any encoding has inference enabled, 10 otherwise; the
    /// returned context starts at time step 0.
    pub fn initialize(&mut self, engine: &dyn HtmEngine) -> Result<SimulationContext> {
        if self.nodes.is_empty() {
            return Err(ScopeError::EmptyNetwork);
        }
        self.prepare_phases()?;
        let mut scheduled = vec![false; self.nodes.len()];
        for phase in &self.phases {
            for &id in phase {
                scheduled[id] = true;
            }
        }
        for (id, node) in self.nodes.iter().enumerate() {
            if scheduled[id] {
                continue;
            }
            if self.feeder_ids(id).is_empty() {
                return Err(ScopeError::RegionHasNoFeeder(node.name().to_string()));
            }
            return Err(ScopeError::UnreachableNode(node.name().to_string()));
        }
        for node in &self.nodes {
            if let Node::Sensor(sensor) = node {
                if sensor.config.encodings.is_empty() {
                    return Err(ScopeError::NoEncodings(sensor.name().to_string()));
                }
            }
        }

        let inference = self.nodes.iter().any(|node| {
            node.as_sensor().is_some_and(|sensor| {
                sensor
                    .config
                    .encodings
                    .iter()
                    .any(|encoding| encoding.enable_inference)
            })
        });
        let window = if inference {
            MAX_STEPS_WITH_INFERENCE
        } else {
            MAX_STEPS
        };
        let ctx = SimulationContext::new(window);

        let order: Vec<NodeId> = self.phases.iter().flatten().copied().collect();
        for id in order {
            let feeders = self.feeder_ids(id);
            let input_map = self.build_input_map(&feeders);
            match &mut self.nodes[id] {
                Node::Sensor(sensor) => sensor.initialize(engine, &ctx)?,
                Node::Region(region) => region.initialize(id, feeders, input_map, engine, &ctx)?,
            }
        }
        self.initialized = true;
        self.stats_precision_rate = 0.0;
        info!(
            "network initialized: {} nodes in {} phases, window {window}",
            self.nodes.len(),
            self.phases.len()
        );
        Ok(ctx)
    }

    /// Runs one time step across the whole network:
    /// - walks the phases in order; each region reads its feeders' fresh
    ///   output, steps, and its prediction marks are applied to the feeder
    ///   elements they address,
    /// - then every sensor computes its predictions, so reconstruction sees
    ///   the marks the regions just left,
    /// - then statistics fold the step in.
    pub fn next_step(&mut self, ctx: &mut SimulationContext) -> Result<()> {
        if !self.initialized {
            return Err(ScopeError::NotInitialized);
        }
        ctx.time_step += 1;
        let order: Vec<NodeId> = self.phases.iter().flatten().copied().collect();
        for id in order {
            if self.nodes[id].is_sensor() {
                if let Some(sensor) = self.nodes[id].as_sensor_mut() {
                    sensor.next_step()?;
                }
            } else {
                let input = self.collect_input(id);
                let marks = match self.nodes[id].as_region_mut() {
                    Some(region) => {
                        region.next_step(&input)?;
                        region.take_predicted_inputs()
                    }
                    None => Vec::new(),
                };
                for mark in marks {
                    self.apply_prediction_mark(mark);
                }
            }
        }
        for node in &mut self.nodes {
            if let Node::Sensor(sensor) = node {
                sensor.compute_predictions(ctx.time_step)?;
            }
        }
        self.calculate_statistics(ctx);
        Ok(())
    }

    fn collect_input(&self, id: NodeId) -> Vec<bool> {
        let feeders = match self.nodes[id].as_region() {
            Some(region) => region.feeders().to_vec(),
            None => return Vec::new(),
        };
        let mut input = Vec::new();
        for feeder in feeders {
            input.extend(self.nodes[feeder].output());
        }
        input
    }

    fn apply_prediction_mark(&mut self, mark: InputRef) {
        match self.nodes.get_mut(mark.node) {
            Some(Node::Sensor(sensor)) => {
                if let ElementRef::Bit { x, y } = mark.elem {
                    if let Some(bit) = sensor.bit_mut(x, y) {
                        bit.is_predicted.set_for_curr_step(true);
                    }
                }
            }
            Some(Node::Region(region)) => {
                if let ElementRef::Cell { column, z } = mark.elem {
                    if let Some(cell) = region.cell_mut(column, z) {
                        cell.is_predicted.set_for_curr_step(true);
                    }
                }
            }
            None => {}
        }
    }

    /// Folds the step into every node's statistics, in phase order so feeder
    /// precisions are fresh when their consumers average them. The network's
    /// precision is the mean over all nodes.
    pub fn calculate_statistics(&mut self, ctx: &SimulationContext) {
        let order: Vec<NodeId> = self.phases.iter().flatten().copied().collect();
        for id in order {
            if self.nodes[id].is_sensor() {
                if let Some(sensor) = self.nodes[id].as_sensor_mut() {
                    sensor.calculate_statistics(ctx.time_step);
                }
            } else {
                let precisions: Vec<f64> = match self.nodes[id].as_region() {
                    Some(region) => region
                        .feeders()
                        .iter()
                        .map(|&feeder| self.nodes[feeder].precision_rate())
                        .collect(),
                    None => Vec::new(),
                };
                if let Some(region) = self.nodes[id].as_region_mut() {
                    region.calculate_statistics(&precisions, ctx.time_step);
                }
            }
        }
        if !self.nodes.is_empty() {
            self.stats_precision_rate = self
                .nodes
                .iter()
                .map(Node::precision_rate)
                .sum::<f64>()
                / self.nodes.len() as f64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::region::{Region, RegionConfig};
    use crate::core::sensor::{EncodingConfig, Sensor, SensorConfig};
    use crate::engine::{
        Classifier, ClassifierParams, DataSourceConfig, FieldEncoder, SpatialParams,
        SpatialPooling, TemporalParams, TemporalPooling,
    };
    use crate::types::FieldType;

    struct NullEngine;

    impl HtmEngine for NullEngine {
        fn spatial_pooler(
            &self,
            _input_len: usize,
            _columns: usize,
            _params: &SpatialParams,
        ) -> Result<Box<dyn SpatialPooling>> {
            Err(ScopeError::Engine("unavailable".into()))
        }

        fn temporal_memory(
            &self,
            _columns: usize,
            _cells_per_column: usize,
            _params: &TemporalParams,
        ) -> Result<Box<dyn TemporalPooling>> {
            Err(ScopeError::Engine("unavailable".into()))
        }

        fn field_encoder(&self, _encoding: &EncodingConfig) -> Result<Box<dyn FieldEncoder>> {
            Err(ScopeError::Engine("unavailable".into()))
        }

        fn classifier(&self, _params: &ClassifierParams) -> Result<Box<dyn Classifier>> {
            Err(ScopeError::Engine("unavailable".into()))
        }
    }

    fn sensor_node(name: &str) -> Node {
        let source = DataSourceConfig::Inline {
            fields: vec!["value".to_string()],
            rows: vec![vec!["1".to_string()]],
        };
        let mut config = SensorConfig::new(name, 2, 1, source);
        config
            .encodings
            .push(EncodingConfig::new("value", FieldType::Integer, "count"));
        Node::Sensor(Sensor::new(config))
    }

    fn region_node(name: &str) -> Node {
        Node::Region(Region::new(RegionConfig::new(name, 2, 1)))
    }

    #[test]
    fn duplicate_node_names_are_rejected() {
        let mut network = Network::new();
        network.add_node(sensor_node("input")).unwrap();
        let err = network.add_node(region_node("input")).unwrap_err();
        assert!(matches!(err, ScopeError::DuplicateNodeName(name) if name == "input"));
    }

    #[test]
    fn links_validate_their_endpoints() {
        let mut network = Network::new();
        network.add_node(sensor_node("input")).unwrap();
        network.add_node(region_node("pool")).unwrap();

        assert!(matches!(
            network.add_link("ghost", "pool"),
            Err(ScopeError::UnknownNode(name)) if name == "ghost"
        ));
        assert!(matches!(
            network.add_link("pool", "input"),
            Err(ScopeError::SensorCannotReceive(name)) if name == "input"
        ));
        network.add_link("input", "pool").unwrap();
        assert!(matches!(
            network.add_link("input", "pool"),
            Err(ScopeError::DuplicateLink { .. })
        ));
        assert!(matches!(
            network.remove_link("pool", "input"),
            Err(ScopeError::UnknownLink { .. })
        ));
    }

    #[test]
    fn diamond_schedules_into_three_phases() {
        let mut network = Network::new();
        network.add_node(sensor_node("input")).unwrap();
        network.add_node(region_node("left")).unwrap();
        network.add_node(region_node("right")).unwrap();
        network.add_node(region_node("top")).unwrap();
        network.add_link("input", "left").unwrap();
        network.add_link("input", "right").unwrap();
        network.add_link("left", "top").unwrap();
        network.add_link("right", "top").unwrap();

        assert_eq!(network.phases(), &[vec![0], vec![1, 2], vec![3]]);
    }

    #[test]
    fn prepare_phases_is_idempotent() {
        let mut network = Network::new();
        network.add_node(sensor_node("input")).unwrap();
        network.add_node(region_node("pool")).unwrap();
        network.add_link("input", "pool").unwrap();

        let before = network.phases().to_vec();
        network.prepare_phases().unwrap();
        assert_eq!(network.phases(), &before[..]);
    }

    #[test]
    fn a_cycle_is_rejected_and_rolled_back() {
        let mut network = Network::new();
        network.add_node(sensor_node("input")).unwrap();
        network.add_node(region_node("first")).unwrap();
        network.add_node(region_node("second")).unwrap();
        network.add_link("input", "first").unwrap();
        network.add_link("first", "second").unwrap();

        let phases = network.phases().to_vec();
        let err = network.add_link("second", "first").unwrap_err();
        assert!(matches!(err, ScopeError::CyclicGraph));
        assert_eq!(network.links().len(), 2);
        assert_eq!(network.phases(), &phases[..]);
    }

    #[test]
    fn removing_a_node_drops_its_links() {
        let mut network = Network::new();
        network.add_node(sensor_node("input")).unwrap();
        network.add_node(region_node("pool")).unwrap();
        network.add_node(region_node("top")).unwrap();
        network.add_link("input", "pool").unwrap();
        network.add_link("pool", "top").unwrap();

        network.remove_node("pool").unwrap();
        assert!(network.node("pool").is_none());
        assert!(network.links().is_empty());
    }

    #[test]
    fn empty_network_cannot_initialize() {
        let mut network = Network::new();
        assert!(matches!(
            network.initialize(&NullEngine),
            Err(ScopeError::EmptyNetwork)
        ));
    }

    #[test]
    fn regions_without_feeders_fail_initialize() {
        let mut network = Network::new();
        network.add_node(sensor_node("input")).unwrap();
        network.add_node(region_node("orphan")).unwrap();
        let err = network.initialize(&NullEngine).unwrap_err();
        assert!(matches!(err, ScopeError::RegionHasNoFeeder(name) if name == "orphan"));
    }

    #[test]
    fn nodes_fed_only_through_an_orphan_are_unreachable() {
        let mut network = Network::new();
        network.add_node(sensor_node("input")).unwrap();
        network.add_node(region_node("stranded")).unwrap();
        network.add_node(region_node("orphan")).unwrap();
        network.add_link("orphan", "stranded").unwrap();
        let err = network.initialize(&NullEngine).unwrap_err();
        assert!(matches!(err, ScopeError::UnreachableNode(name) if name == "stranded"));
    }

    #[test]
    fn stepping_before_initialize_fails() {
        let mut network = Network::new();
        network.add_node(sensor_node("input")).unwrap();
        let mut ctx = SimulationContext::new(10);
        assert!(matches!(
            network.next_step(&mut ctx),
            Err(ScopeError::NotInitialized)
        ));
    }
}
