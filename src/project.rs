//! The persisted network description.
//!
//! A project is the durable form of a network: its metadata plus the full
//! configuration of every node and link, with no runtime state. Projects
//! round-trip through two formats, pretty JSON for people and bincode for
//! speed, and `build` turns a loaded description back into a schedulable
//! network.

use crate::core::network::{Link, Network};
use crate::core::node::Node;
use crate::core::region::{Region, RegionConfig};
use crate::core::sensor::{Sensor, SensorConfig};
use crate::error::{Result, ScopeError};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// On-disk encoding of a project.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProjectFormat {
    /// Compact bincode.
    #[default]
    Binary,
    /// Pretty-printed JSON.
    Json,
}

impl fmt::Display for ProjectFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectFormat::Binary => write!(f, "binary"),
            ProjectFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for ProjectFormat {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "binary" | "bin" => Ok(ProjectFormat::Binary),
            "json" => Ok(ProjectFormat::Json),
            other => Err(ScopeError::InvalidParameter(format!(
                "unknown project format '{other}', expected 'binary' or 'json'"
            ))),
        }
    }
}

/// Configuration of one node, keyed by kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeDescription {
    /// A learning region.
    Region(RegionConfig),
    /// A record-driven sensor.
    Sensor(SensorConfig),
}

impl NodeDescription {
    /// The described node's name.
    pub fn name(&self) -> &str {
        match self {
            NodeDescription::Region(config) => &config.name,
            NodeDescription::Sensor(config) => &config.name,
        }
    }
}

/// A persisted network description.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Project name.
    #[serde(default)]
    pub name: String,
    /// Author attribution.
    #[serde(default)]
    pub author: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Node configurations, in insertion order.
    #[serde(default)]
    pub nodes: Vec<NodeDescription>,
    /// Feed-forward links.
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Project {
    /// A named project with no nodes yet.
    pub fn new(name: &str) -> Self {
        Project {
            name: name.to_string(),
            ..Project::default()
        }
    }

    /// Captures a network's structure. Runtime state (window histories,
    /// statistics, algorithm handles) is not part of a project.
    pub fn from_network(network: &Network) -> Self {
        let nodes = network
            .nodes()
            .iter()
            .map(|node| match node {
                Node::Region(region) => NodeDescription::Region(region.config.clone()),
                Node::Sensor(sensor) => NodeDescription::Sensor(sensor.config.clone()),
            })
            .collect();
        Project {
            nodes,
            links: network.links().to_vec(),
            ..Project::default()
        }
    }

    /// Builds the live network this description declares: nodes first, then
    /// links, with the feed-forward schedule prepared. The first
    /// configuration error aborts the build.
    pub fn build(&self) -> Result<Network> {
        let mut network = Network::new();
        for description in &self.nodes {
            let node = match description {
                NodeDescription::Region(config) => Node::Region(Region::new(config.clone())),
                NodeDescription::Sensor(config) => Node::Sensor(Sensor::new(config.clone())),
            };
            network.add_node(node)?;
        }
        for link in &self.links {
            network.add_link(&link.out_node, &link.in_node)?;
        }
        info!(
            "project '{}': built {} nodes and {} links",
            self.name,
            self.nodes.len(),
            self.links.len()
        );
        Ok(network)
    }

    /// Serializes to bytes in the given format.
    pub fn to_bytes(&self, format: ProjectFormat) -> Result<Vec<u8>> {
        match format {
            ProjectFormat::Binary => Ok(bincode::serialize(self)?),
            ProjectFormat::Json => Ok(serde_json::to_vec_pretty(self)?),
        }
    }

    /// Deserializes from bytes in the given format.
    pub fn from_bytes(bytes: &[u8], format: ProjectFormat) -> Result<Self> {
        match format {
            ProjectFormat::Binary => Ok(bincode::deserialize(bytes)?),
            ProjectFormat::Json => Ok(serde_json::from_slice(bytes)?),
        }
    }

    /// Writes the project to a file.
    pub fn save(&self, path: impl AsRef<Path>, format: ProjectFormat) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        match format {
            ProjectFormat::Binary => bincode::serialize_into(&mut writer, self)?,
            ProjectFormat::Json => serde_json::to_writer_pretty(&mut writer, self)?,
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads a project from a file.
    pub fn load(path: impl AsRef<Path>, format: ProjectFormat) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let project = match format {
            ProjectFormat::Binary => bincode::deserialize_from(&mut reader)?,
            ProjectFormat::Json => serde_json::from_reader(&mut reader)?,
        };
        Ok(project)
    }
}
