//! The boundary to the external learning-algorithm library.
//!
//! This crate models and drives an HTM network but does not implement the
//! learning algorithms. An [`HtmEngine`] supplies the concrete spatial pooler,
//! temporal memory, per-field encoders, classifiers, and record streams; the
//! model reaches them only through the traits in this module, and mirrors
//! whatever state their introspection calls report.

pub mod classifier;
pub mod encoder;
pub mod spatial;
pub mod stream;
pub mod temporal;

pub use classifier::{Classifier, ClassifierParams, ClassifierResult};
pub use encoder::{DecodedRange, FieldEncoder, MultiEncoder};
pub use spatial::{SpatialParams, SpatialPooling};
pub use stream::{DataSourceConfig, FileRecordStream, Record, RecordStream, VecRecordStream};
pub use temporal::{TemporalParams, TemporalPooling};

use crate::core::sensor::EncodingConfig;
use crate::error::Result;

/// Factory for the external collaborators a network needs at initialization.
///
/// Nodes own the boxed instances afterwards; the engine is only borrowed while
/// `Network::initialize` runs. `record_stream` has a default implementation
/// over the stock streams in [`stream`]; engines backed by other storage can
/// override it.
pub trait HtmEngine {
    /// Builds the spatial pooler for a region: `input_len` input bits feeding
    /// `columns` columns.
    fn spatial_pooler(
        &self,
        input_len: usize,
        columns: usize,
        params: &SpatialParams,
    ) -> Result<Box<dyn SpatialPooling>>;

    /// Builds the temporal memory for a region of `columns * cells_per_column`
    /// cells.
    fn temporal_memory(
        &self,
        columns: usize,
        cells_per_column: usize,
        params: &TemporalParams,
    ) -> Result<Box<dyn TemporalPooling>>;

    /// Builds the encoder for one declared field.
    fn field_encoder(&self, encoding: &EncodingConfig) -> Result<Box<dyn FieldEncoder>>;

    /// Builds a step-ahead classifier.
    fn classifier(&self, params: &ClassifierParams) -> Result<Box<dyn Classifier>>;

    /// Opens the record stream behind a data-source configuration.
    fn record_stream(&self, source: &DataSourceConfig) -> Result<Box<dyn RecordStream>> {
        stream::open_default(source)
    }
}
