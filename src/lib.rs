//! # htm-scope
//!
//! A time-stepped Hierarchical Temporal Memory (HTM) network model built for
//! inspection. Every element a frontend can point at, bits, columns, cells,
//! segments, and synapses, keeps a rolling window of its recent states, so a
//! viewer can scrub backwards through the last steps of a simulation.
//!
//! - **Sensors** read records from a data source and encode fields into bit
//!   grids, with optional per-field prediction via reconstruction or an SDR
//!   classifier.
//! - **Regions** run spatial pooling and temporal memory over their feeders
//!   and mirror the algorithm state into inspectable element trees.
//! - **Networks** schedule sensors and regions into feed-forward phases and
//!   drive them one step at a time.
//! - **Projects** persist a network description to JSON or bincode and build
//!   it back.
//!
//! The learning algorithms themselves sit behind the [`engine::HtmEngine`]
//! trait; this crate models, tracks, and scores what they do.

pub mod core;
pub mod engine;
pub mod error;
pub mod project;
pub mod types;

pub use error::{Result, ScopeError};
