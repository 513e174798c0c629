//! The two node kinds a network schedules.

use crate::core::region::Region;
use crate::core::sensor::Sensor;

/// A node of the network: either a record-driven input or a learning region.
pub enum Node {
    /// Learning node mirroring spatial and temporal algorithm state.
    Region(Region),
    /// Input node encoding records onto a bit grid.
    Sensor(Sensor),
}

impl Node {
    /// The node's unique name.
    pub fn name(&self) -> &str {
        match self {
            Node::Region(region) => region.name(),
            Node::Sensor(sensor) => sensor.name(),
        }
    }

    /// Grid width: columns for a region, bits for a sensor.
    pub fn width(&self) -> usize {
        match self {
            Node::Region(region) => region.config.width,
            Node::Sensor(sensor) => sensor.config.width,
        }
    }

    /// Grid height: columns for a region, bits for a sensor.
    pub fn height(&self) -> usize {
        match self {
            Node::Region(region) => region.config.height,
            Node::Sensor(sensor) => sensor.config.height,
        }
    }

    /// Whether this node produces input rather than consuming it.
    pub fn is_sensor(&self) -> bool {
        matches!(self, Node::Sensor(_))
    }

    /// Flat x-major activity snapshot, read by consuming regions.
    pub fn output(&self) -> Vec<bool> {
        match self {
            Node::Region(region) => region.output(),
            Node::Sensor(sensor) => sensor.output(),
        }
    }

    /// Prediction precision after the last statistics pass.
    pub fn precision_rate(&self) -> f64 {
        match self {
            Node::Region(region) => region.stats_precision_rate,
            Node::Sensor(sensor) => sensor.stats_precision_rate,
        }
    }

    /// The region inside, if this is one.
    pub fn as_region(&self) -> Option<&Region> {
        match self {
            Node::Region(region) => Some(region),
            Node::Sensor(_) => None,
        }
    }

    /// Mutable view of the region inside, if this is one.
    pub fn as_region_mut(&mut self) -> Option<&mut Region> {
        match self {
            Node::Region(region) => Some(region),
            Node::Sensor(_) => None,
        }
    }

    /// The sensor inside, if this is one.
    pub fn as_sensor(&self) -> Option<&Sensor> {
        match self {
            Node::Sensor(sensor) => Some(sensor),
            Node::Region(_) => None,
        }
    }

    /// Mutable view of the sensor inside, if this is one.
    pub fn as_sensor_mut(&mut self) -> Option<&mut Sensor> {
        match self {
            Node::Sensor(sensor) => Some(sensor),
            Node::Region(_) => None,
        }
    }
}
