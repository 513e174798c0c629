//! The network model: nodes, their inspectable elements, and the per-step
//! state histories a frontend scrubs through.

pub mod bit;
pub mod cell;
pub mod column;
pub mod network;
pub mod node;
pub mod reconcile;
pub mod region;
pub mod segment;
pub mod sensor;
pub mod state;
pub mod stats;
pub mod synapse;
