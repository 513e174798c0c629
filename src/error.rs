//! Error and result types shared across the crate.
//!
//! Configuration problems (bad graphs, bad encodings, missing data sources) and
//! runtime contract violations (out-of-range window reads, malformed records)
//! are all surfaced as [`ScopeError`] values so callers can report them instead
//! of aborting mid-simulation.

use thiserror::Error;

/// Everything that can go wrong while building, initializing, or stepping a network.
#[derive(Error, Debug)]
pub enum ScopeError {
    /// A parameter failed basic validation (zero-sized grid, empty window, ...).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A node name was referenced but no node carries it.
    #[error("node '{0}' not found in the network")]
    UnknownNode(String),

    /// A node with the same name already exists.
    #[error("a node named '{0}' already exists")]
    DuplicateNodeName(String),

    /// The same link was declared twice.
    #[error("link '{out_node}' -> '{in_node}' already exists")]
    DuplicateLink {
        /// Name of the feeding node.
        out_node: String,
        /// Name of the receiving node.
        in_node: String,
    },

    /// A link was removed that was never declared.
    #[error("link '{out_node}' -> '{in_node}' does not exist")]
    UnknownLink {
        /// Name of the feeding node.
        out_node: String,
        /// Name of the receiving node.
        in_node: String,
    },

    /// Sensors produce input; they cannot be on the receiving end of a link.
    #[error("sensor '{0}' cannot receive a link; only regions accept feeders")]
    SensorCannotReceive(String),

    /// The network has no nodes to schedule.
    #[error("the network has no nodes")]
    EmptyNetwork,

    /// The link graph loops back on itself; feed-forward phases cannot be built.
    #[error("the node graph contains a cycle")]
    CyclicGraph,

    /// A node cannot be reached from any sensor and would never execute.
    #[error("node '{0}' is not fed by any sensor")]
    UnreachableNode(String),

    /// Regions must receive input from at least one feeder node.
    #[error("region '{0}' has no feeder")]
    RegionHasNoFeeder(String),

    /// Sensors must declare at least one field encoding.
    #[error("sensor '{0}' declares no encodings")]
    NoEncodings(String),

    /// The combined encoder output does not fit the sensor's bit grid.
    #[error("encoder output of {width} bits does not fit sensor '{name}' ({capacity} bits)")]
    EncoderWidthOverflow {
        /// Sensor name.
        name: String,
        /// Total encoder width in bits.
        width: usize,
        /// Bits available on the sensor grid.
        capacity: usize,
    },

    /// The configured data source could not be opened.
    #[error("data source '{0}' is missing or cannot be opened")]
    DataSourceMissing(String),

    /// The record stream held no records even after rewinding.
    #[error("record stream for sensor '{0}' is empty")]
    RecordStreamExhausted(String),

    /// A record value could not be converted to its declared field type.
    #[error("record field '{field}' holds '{value}', which is not a valid {expected}")]
    MalformedRecord {
        /// Field name.
        field: String,
        /// Raw value as read from the source.
        value: String,
        /// The declared field type.
        expected: &'static str,
    },

    /// A record row carried the wrong number of values.
    #[error("record at line {line} has {got} values, expected {expected}")]
    RaggedRecord {
        /// 1-based line number within the source.
        line: u64,
        /// Values found on the row.
        got: usize,
        /// Values the header declared.
        expected: usize,
    },

    /// A record or encoder lookup referenced a field that does not exist.
    #[error("field '{0}' is not present")]
    MissingField(String),

    /// A rolling-window read went further back than the window retains.
    #[error("step {step} is outside the retained window of {window} steps")]
    StepOutOfRange {
        /// Requested steps-ago offset.
        step: usize,
        /// Window capacity.
        window: usize,
    },

    /// The network (or one of its nodes) was stepped before initialization.
    #[error("the network must be initialized before this operation")]
    NotInitialized,

    /// An external algorithm broke its documented contract.
    #[error("engine contract violation: {0}")]
    Engine(String),

    /// JSON encoding or decoding of a project failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary encoding or decoding of a project failed.
    #[error("binary serialization failed: {0}")]
    Binary(#[from] bincode::Error),

    /// An underlying I/O operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ScopeError>;
