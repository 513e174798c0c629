//! Scripted engine doubles shared by the integration suites.
//!
//! The doubles are deterministic stand-ins for the external learning library:
//! the spatial double wires column `c` straight to input bit `c`, the temporal
//! double predicts each active column's right-hand neighbor, and the encoder
//! double treats a text field as a literal bit pattern such as `"1010"`. With
//! one cell per column, every step of a simulation becomes hand-checkable.

#![allow(dead_code)]

use fxhash::FxHashSet;
use htm_scope::core::node::Node;
use htm_scope::core::region::{Region, RegionConfig};
use htm_scope::core::sensor::{EncodingConfig, Sensor, SensorConfig};
use htm_scope::engine::{
    Classifier, ClassifierParams, DataSourceConfig, DecodedRange, FieldEncoder, HtmEngine,
    SpatialParams, SpatialPooling, TemporalParams, TemporalPooling,
};
use htm_scope::error::{Result, ScopeError};
use htm_scope::types::{FieldType, FieldValue, ParamValue};

/// Spatial double: column `c` pools exactly input bit `c`, always connected,
/// and activates whenever its bit is set. Input bits past the last column are
/// ignored.
pub struct IdentitySpatial {
    inputs: usize,
    columns: usize,
}

impl SpatialPooling for IdentitySpatial {
    fn compute(&mut self, input: &[bool], _learn: bool) -> Vec<bool> {
        input[..self.columns].to_vec()
    }

    fn permanences(&self, column: usize) -> Vec<f32> {
        let mut dense = vec![0.0; self.inputs];
        dense[column] = 0.3;
        dense
    }

    fn connected(&self, column: usize) -> Vec<bool> {
        let mut dense = vec![false; self.inputs];
        dense[column] = true;
        dense
    }
}

/// Temporal double for one-cell columns: every active cell predicts its
/// right-hand neighbor (wrapping), and grows no segments.
pub struct ShiftTemporal {
    columns: usize,
    active: FxHashSet<usize>,
    predictive: FxHashSet<usize>,
}

impl ShiftTemporal {
    pub fn new(columns: usize) -> Self {
        ShiftTemporal {
            columns,
            active: FxHashSet::default(),
            predictive: FxHashSet::default(),
        }
    }
}

impl TemporalPooling for ShiftTemporal {
    fn compute(&mut self, active_columns: &FxHashSet<usize>, _learn: bool) {
        self.active = active_columns.clone();
        self.predictive = active_columns
            .iter()
            .map(|column| (column + 1) % self.columns)
            .collect();
    }

    fn winner_cells(&self) -> FxHashSet<usize> {
        self.active.clone()
    }

    fn active_cells(&self) -> FxHashSet<usize> {
        self.active.clone()
    }

    fn predictive_cells(&self) -> FxHashSet<usize> {
        self.predictive.clone()
    }

    fn active_segments(&self) -> FxHashSet<usize> {
        FxHashSet::default()
    }

    fn segments_for_cell(&self, _cell: usize) -> Vec<usize> {
        Vec::new()
    }

    fn synapses_for_segment(&self, _segment: usize) -> Vec<usize> {
        Vec::new()
    }

    fn synapse_data(&self, _synapse: usize) -> (usize, f32) {
        (0, 0.0)
    }
}

/// Encoder double: the field's text value is a literal bit pattern, one
/// character per bit. Decoding returns the pattern it sees.
pub struct BitPatternEncoder {
    pub width: usize,
}

impl FieldEncoder for BitPatternEncoder {
    fn width(&self) -> usize {
        self.width
    }

    fn encode_into(&mut self, value: &FieldValue, out: &mut [bool]) -> Result<()> {
        let pattern = value.to_string();
        for (index, slot) in out.iter_mut().enumerate() {
            *slot = pattern.as_bytes().get(index) == Some(&b'1');
        }
        Ok(())
    }

    fn scalar(&self, _value: &FieldValue) -> Option<f64> {
        None
    }

    fn bucket_index(&self, _value: &FieldValue) -> Option<usize> {
        None
    }

    fn decode(&self, bits: &[bool]) -> Vec<DecodedRange> {
        let ones = bits.iter().filter(|bit| **bit).count() as f64;
        let label: String = bits.iter().map(|bit| if *bit { '1' } else { '0' }).collect();
        vec![DecodedRange {
            min: ones,
            max: ones,
            label,
        }]
    }
}

/// Engine double wiring the scripted algorithms together. Encoder width comes
/// from the encoding's integer `n` parameter.
#[derive(Default)]
pub struct ScriptedEngine;

impl HtmEngine for ScriptedEngine {
    fn spatial_pooler(
        &self,
        input_len: usize,
        columns: usize,
        _params: &SpatialParams,
    ) -> Result<Box<dyn SpatialPooling>> {
        if columns > input_len {
            return Err(ScopeError::Engine(format!(
                "identity pooling needs one input bit per column, got {input_len} bits for {columns} columns"
            )));
        }
        Ok(Box::new(IdentitySpatial {
            inputs: input_len,
            columns,
        }))
    }

    fn temporal_memory(
        &self,
        columns: usize,
        cells_per_column: usize,
        _params: &TemporalParams,
    ) -> Result<Box<dyn TemporalPooling>> {
        if cells_per_column != 1 {
            return Err(ScopeError::Engine(
                "shift prediction assumes one cell per column".to_string(),
            ));
        }
        Ok(Box::new(ShiftTemporal::new(columns)))
    }

    fn field_encoder(&self, encoding: &EncodingConfig) -> Result<Box<dyn FieldEncoder>> {
        match encoding.encoder_params.get("n") {
            Some(ParamValue::Int(n)) => Ok(Box::new(BitPatternEncoder { width: *n as usize })),
            _ => Err(ScopeError::Engine(format!(
                "encoding '{}' needs an integer 'n' parameter",
                encoding.field_name
            ))),
        }
    }

    fn classifier(&self, _params: &ClassifierParams) -> Result<Box<dyn Classifier>> {
        Err(ScopeError::Engine("no classifier scripted".to_string()))
    }
}

/// A `width x 1` sensor replaying inline bit-pattern records, with inference
/// enabled on its single text field.
pub fn pattern_sensor(name: &str, width: usize, rows: &[&str]) -> Node {
    let source = DataSourceConfig::Inline {
        fields: vec!["bits".to_string()],
        rows: rows.iter().map(|row| vec![row.to_string()]).collect(),
    };
    let mut config = SensorConfig::new(name, width, 1, source);
    let mut encoding = EncodingConfig::new("bits", FieldType::Text, "pattern");
    encoding.enable_inference = true;
    encoding
        .encoder_params
        .insert("n".to_string(), ParamValue::Int(width as i64));
    config.encodings.push(encoding);
    Node::Sensor(Sensor::new(config))
}

/// A `width x 1` region with one cell per column, matching the doubles above.
pub fn shift_region(name: &str, width: usize) -> Node {
    let mut config = RegionConfig::new(name, width, 1);
    config.cells_per_column = 1;
    Node::Region(Region::new(config))
}
