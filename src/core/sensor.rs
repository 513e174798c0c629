//! A record-driven input node.
//!
//! A sensor reads one record per step from its data source, encodes the
//! declared fields through engine-supplied encoders, and exposes the result
//! as a 2D bit grid. Streams replay cyclically: at end of stream the sensor
//! rewinds once and continues from the first record.
//!
//! When inference is enabled for an encoding, the sensor also produces
//! predictions for that field, by one of two mutually exclusive policies:
//! - Reconstruction decodes the bits that consuming regions marked predicted
//!   back into value ranges,
//! - Classification asks an engine-supplied classifier for ranked step-ahead
//!   bucket likelihoods.

use crate::core::bit::Bit;
use crate::core::state::{RollingWindow, SimulationContext};
use crate::core::stats::discounted_precision;
use crate::engine::{
    Classifier, ClassifierParams, DataSourceConfig, HtmEngine, MultiEncoder, Record, RecordStream,
};
use crate::error::{Result, ScopeError};
use crate::types::{EncoderParams, FieldType, FieldValue};
use fnv::FnvHashMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_max_future_steps() -> usize {
    1
}

fn default_min_probability_threshold() -> f64 {
    0.001
}

fn default_max_predictions_per_step() -> usize {
    10
}

/// How a sensor turns prediction state back into field values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionsMethod {
    /// Decode the bits consuming regions marked predicted.
    #[default]
    Reconstruction,
    /// Ask a per-field classifier for step-ahead bucket likelihoods.
    Classification,
}

/// Declares how one record field lands on the sensor grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Record field this encoding reads.
    pub field_name: String,
    /// Declared type of the raw values.
    pub field_type: FieldType,
    /// Module of the encoder implementation, resolved by the engine.
    #[serde(default)]
    pub encoder_module: String,
    /// Class of the encoder implementation, resolved by the engine.
    pub encoder_class: String,
    /// Encoder construction parameters, passed through verbatim.
    #[serde(default)]
    pub encoder_params: EncoderParams,
    /// Whether predictions are produced for this field.
    #[serde(default)]
    pub enable_inference: bool,
    /// Future steps the classifier predicts.
    #[serde(default = "default_max_future_steps")]
    pub max_future_steps: usize,
    /// Predictions below this probability are dropped.
    #[serde(default = "default_min_probability_threshold")]
    pub min_probability_threshold: f64,
    /// At most this many predictions are kept per future step.
    #[serde(default = "default_max_predictions_per_step")]
    pub max_predictions_per_step: usize,
}

impl EncodingConfig {
    /// An encoding with inference disabled and default knobs.
    pub fn new(field_name: &str, field_type: FieldType, encoder_class: &str) -> Self {
        EncodingConfig {
            field_name: field_name.to_string(),
            field_type,
            encoder_module: String::new(),
            encoder_class: encoder_class.to_string(),
            encoder_params: EncoderParams::new(),
            enable_inference: false,
            max_future_steps: default_max_future_steps(),
            min_probability_threshold: default_min_probability_threshold(),
            max_predictions_per_step: default_max_predictions_per_step(),
        }
    }
}

/// Configuration of a sensor node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Unique node name.
    pub name: String,
    /// Bit grid columns.
    pub width: usize,
    /// Bit grid rows.
    pub height: usize,
    /// Where records come from.
    pub data_source: DataSourceConfig,
    /// How predictions are produced for inference-enabled encodings.
    #[serde(default)]
    pub predictions_method: PredictionsMethod,
    /// Whether classifiers keep learning while stepping.
    #[serde(default = "default_true")]
    pub enable_classifier_learning: bool,
    /// Field encodings, in bit-layout order.
    #[serde(default)]
    pub encodings: Vec<EncodingConfig>,
}

impl SensorConfig {
    /// A sensor with no encodings declared yet.
    pub fn new(name: &str, width: usize, height: usize, data_source: DataSourceConfig) -> Self {
        SensorConfig {
            name: name.to_string(),
            width,
            height,
            data_source,
            predictions_method: PredictionsMethod::default(),
            enable_classifier_learning: true,
            encodings: Vec::new(),
        }
    }
}

/// One ranked prediction for a field at some future step.
#[derive(Clone, Debug, PartialEq)]
pub struct PredictedValue {
    /// Lower bound of the predicted range.
    pub min: f64,
    /// Upper bound of the predicted range.
    pub max: f64,
    /// Display label: a category name or a formatted value.
    pub label: String,
    /// Likelihood assigned to this entry.
    pub probability: f64,
}

impl PredictedValue {
    /// Whether `value` falls inside this prediction. Numeric bounds widen to
    /// the enclosing whole numbers; non-numeric values compare by label.
    pub fn contains(&self, value: &FieldValue) -> bool {
        match value.as_scalar() {
            Some(v) => self.min.floor() <= v && v <= self.max.ceil(),
            None => self.label == value.to_string(),
        }
    }

    /// The prediction as a concrete field value: the range midpoint for
    /// numeric types, the label otherwise.
    pub fn best(&self, field_type: FieldType) -> FieldValue {
        let midpoint = (self.min + self.max) / 2.0;
        match field_type {
            FieldType::Boolean => FieldValue::Bool(midpoint >= 0.5),
            FieldType::Integer => FieldValue::Int(midpoint.round() as i64),
            FieldType::Decimal => FieldValue::Dec(midpoint),
            FieldType::DateTime | FieldType::Text => FieldValue::Text(self.label.clone()),
        }
    }
}

/// Runtime state of one declared encoding.
pub struct Encoding {
    /// The declaration this runtime was built from.
    pub config: EncodingConfig,
    /// Typed value of the current record, per retained step.
    pub current_value: RollingWindow<FieldValue>,
    /// Ranked predictions per future-step offset (index 0 holds the
    /// one-step-ahead list), per retained step.
    pub predicted_values: RollingWindow<Vec<Vec<PredictedValue>>>,
    /// Top one-step prediction, per retained step.
    pub best_predicted_value: RollingWindow<FieldValue>,
    classifier: Option<Box<dyn Classifier>>,
    offset: usize,
    width: usize,
}

impl Encoding {
    /// Ranked predictions for `steps_ahead` (1-based) at the current step.
    pub fn predictions(&self, steps_ahead: usize) -> &[PredictedValue] {
        self.predicted_values
            .at_curr_step()
            .get(steps_ahead.wrapping_sub(1))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `(offset, width)` of this field's bits in the sensor output.
    pub fn span(&self) -> (usize, usize) {
        (self.offset, self.width)
    }
}

/// An input node of the network.
pub struct Sensor {
    /// The node's configuration.
    pub config: SensorConfig,
    /// Bit grid in x-major order, allocated at initialization.
    pub bits: Vec<Bit>,
    /// Per-encoding runtime state, in declaration order.
    pub encodings: Vec<Encoding>,
    /// Discounted prediction precision after the last statistics pass.
    pub stats_precision_rate: f64,
    encoder: MultiEncoder,
    stream: Option<Box<dyn RecordStream>>,
}

impl Sensor {
    /// Creates an unallocated sensor; `initialize` builds the grid, the
    /// encoders, and the record stream.
    pub fn new(config: SensorConfig) -> Self {
        Sensor {
            config,
            bits: Vec::new(),
            encodings: Vec::new(),
            stats_precision_rate: 0.0,
            encoder: MultiEncoder::new(),
            stream: None,
        }
    }

    /// The node's name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Whether `initialize` has run.
    pub fn is_initialized(&self) -> bool {
        self.stream.is_some()
    }

    /// The bit at grid position (x, y).
    pub fn bit(&self, x: usize, y: usize) -> Option<&Bit> {
        if x < self.config.width && y < self.config.height {
            self.bits.get(x * self.config.height + y)
        } else {
            None
        }
    }

    pub(crate) fn bit_mut(&mut self, x: usize, y: usize) -> Option<&mut Bit> {
        if x < self.config.width && y < self.config.height {
            self.bits.get_mut(x * self.config.height + y)
        } else {
            None
        }
    }

    /// Runtime state of the encoding that reads `field`.
    pub fn encoding(&self, field: &str) -> Option<&Encoding> {
        self.encodings
            .iter()
            .find(|encoding| encoding.config.field_name == field)
    }

    /// Builds the per-field encoders, validates that their combined width
    /// fits the grid, allocates the bits, and opens the record stream.
    /// Duplicate field names are skipped with a warning. When the predictions
    /// method is Classification, every inference-enabled encoding gets its
    /// own classifier.
    pub fn initialize(&mut self, engine: &dyn HtmEngine, ctx: &SimulationContext) -> Result<()> {
        if self.config.encodings.is_empty() {
            return Err(ScopeError::NoEncodings(self.config.name.clone()));
        }
        let window = ctx.window;
        if self.config.width == 0 || self.config.height == 0 {
            return Err(ScopeError::InvalidParameter(format!(
                "sensor '{}' has a zero-sized bit grid",
                self.config.name
            )));
        }
        let mut encoder = MultiEncoder::new();
        let mut encodings = Vec::with_capacity(self.config.encodings.len());
        for config in &self.config.encodings {
            if encoder.has_field(&config.field_name) {
                warn!(
                    "sensor '{}': field '{}' is encoded twice, skipping the duplicate",
                    self.config.name, config.field_name
                );
                continue;
            }
            let offset = encoder.width();
            let field_encoder = engine.field_encoder(config)?;
            let width = field_encoder.width();
            encoder.add_encoder(&config.field_name, field_encoder)?;
            let classifier = if self.config.predictions_method == PredictionsMethod::Classification
                && config.enable_inference
            {
                let params = ClassifierParams {
                    steps: (1..=config.max_future_steps.max(1)).collect(),
                    ..ClassifierParams::default()
                };
                Some(engine.classifier(&params)?)
            } else {
                None
            };
            encodings.push(Encoding {
                config: config.clone(),
                current_value: RollingWindow::new(window),
                predicted_values: RollingWindow::new(window),
                best_predicted_value: RollingWindow::new(window),
                classifier,
                offset,
                width,
            });
        }
        let capacity = self.config.width * self.config.height;
        if encoder.width() > capacity {
            return Err(ScopeError::EncoderWidthOverflow {
                name: self.config.name.clone(),
                width: encoder.width(),
                capacity,
            });
        }
        let stream = engine.record_stream(&self.config.data_source)?;
        let mut bits = Vec::with_capacity(capacity);
        for x in 0..self.config.width {
            for y in 0..self.config.height {
                bits.push(Bit::new(x, y, window));
            }
        }
        debug!(
            "sensor '{}': {} fields over {} of {} bits",
            self.config.name,
            encodings.len(),
            encoder.width(),
            capacity
        );
        self.bits = bits;
        self.encodings = encodings;
        self.encoder = encoder;
        self.stream = Some(stream);
        self.stats_precision_rate = 0.0;
        Ok(())
    }

    /// Runs one time step: rotates all windows, pulls the next record
    /// (rewinding once at end of stream), converts the declared fields, and
    /// encodes them onto the bit grid. Bits predicted one step ago that did
    /// not activate are marked falsely predicted.
    pub fn next_step(&mut self) -> Result<()> {
        for bit in &mut self.bits {
            bit.next_step();
        }
        for encoding in &mut self.encodings {
            encoding.current_value.rotate();
            encoding.predicted_values.rotate();
            encoding.best_predicted_value.rotate();
        }
        let record = self.next_record()?;
        let mut values: FnvHashMap<String, FieldValue> = FnvHashMap::default();
        for encoding in &self.encodings {
            let field = &encoding.config.field_name;
            let raw = record.get(field).ok_or_else(|| ScopeError::MalformedRecord {
                field: field.clone(),
                value: String::new(),
                expected: encoding.config.field_type.label(),
            })?;
            let value =
                FieldValue::parse(raw, encoding.config.field_type).map_err(|err| match err {
                    ScopeError::MalformedRecord {
                        value, expected, ..
                    } => ScopeError::MalformedRecord {
                        field: field.clone(),
                        value,
                        expected,
                    },
                    other => other,
                })?;
            values.insert(field.clone(), value);
        }
        for encoding in &mut self.encodings {
            if let Some(value) = values.get(&encoding.config.field_name) {
                encoding.current_value.set_for_curr_step(value.clone());
            }
        }
        let mut pattern = vec![false; self.bits.len()];
        self.encoder.encode(&values, &mut pattern)?;
        for (bit, &active) in self.bits.iter_mut().zip(pattern.iter()) {
            bit.is_active.set_for_curr_step(active);
            if *bit.is_predicted.at_previous_step() && !active {
                bit.is_falsely_predicted.set_for_curr_step(true);
            }
        }
        Ok(())
    }

    fn next_record(&mut self) -> Result<Record> {
        let stream = match self.stream.as_deref_mut() {
            Some(stream) => stream,
            None => return Err(ScopeError::NotInitialized),
        };
        if let Some(record) = stream.next_record()? {
            return Ok(record);
        }
        debug!("sensor '{}': end of stream, rewinding", self.config.name);
        stream.rewind()?;
        stream
            .next_record()?
            .ok_or_else(|| ScopeError::RecordStreamExhausted(self.config.name.clone()))
    }

    /// Produces this step's predictions for every inference-enabled encoding.
    /// Runs after the consuming regions have stepped, so Reconstruction sees
    /// the prediction marks they left on the bits.
    pub fn compute_predictions(&mut self, time_step: u64) -> Result<()> {
        match self.config.predictions_method {
            PredictionsMethod::Reconstruction => self.reconstruct(),
            PredictionsMethod::Classification => self.classify(time_step),
        }
    }

    /// Decodes the predicted bit pattern back into per-field value ranges.
    fn reconstruct(&mut self) -> Result<()> {
        let width = self.encoder.width();
        let predicted: Vec<bool> = self
            .bits
            .iter()
            .take(width)
            .map(|bit| *bit.is_predicted.at_curr_step())
            .collect();
        let decoded = self.encoder.decode(&predicted);
        for encoding in &mut self.encodings {
            if !encoding.config.enable_inference {
                continue;
            }
            let ranges = decoded
                .iter()
                .find(|(name, _)| *name == encoding.config.field_name)
                .map(|(_, ranges)| ranges.as_slice())
                .unwrap_or(&[]);
            let list: Vec<PredictedValue> = ranges
                .iter()
                .map(|range| PredictedValue {
                    min: range.min,
                    max: range.max,
                    label: range.label.clone(),
                    probability: 1.0,
                })
                .collect();
            let best = list
                .first()
                .map(|prediction| prediction.best(encoding.config.field_type))
                .unwrap_or_default();
            encoding.predicted_values.set_for_curr_step(vec![list]);
            encoding.best_predicted_value.set_for_curr_step(best);
        }
        Ok(())
    }

    /// Feeds the classifiers and stores their ranked step-ahead predictions,
    /// pruned by probability threshold and per-step cap.
    fn classify(&mut self, time_step: u64) -> Result<()> {
        let pattern: Vec<usize> = self
            .bits
            .iter()
            .enumerate()
            .filter_map(|(index, bit)| (*bit.is_active.at_curr_step()).then_some(index))
            .collect();
        let learn = self.config.enable_classifier_learning;
        for encoding in &mut self.encodings {
            let classifier = match encoding.classifier.as_deref_mut() {
                Some(classifier) => classifier,
                None => continue,
            };
            let actual = encoding.current_value.at_curr_step().clone();
            let bucket = match self
                .encoder
                .bucket_index(&encoding.config.field_name, &actual)?
            {
                Some(bucket) => bucket,
                None => continue,
            };
            let result = classifier.compute(time_step, &pattern, bucket, &actual, learn, true)?;
            let steps = encoding.config.max_future_steps.max(1);
            let mut per_step: Vec<Vec<PredictedValue>> = Vec::with_capacity(steps);
            for step in 1..=steps {
                let probabilities = result
                    .probabilities
                    .get(&step)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                let mut list: Vec<PredictedValue> = probabilities
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| **p >= encoding.config.min_probability_threshold)
                    .map(|(bucket, &probability)| {
                        let value = result.actual_values.get(bucket).cloned().unwrap_or_default();
                        let scalar = value.as_scalar().unwrap_or(0.0);
                        PredictedValue {
                            min: scalar,
                            max: scalar,
                            label: value.to_string(),
                            probability,
                        }
                    })
                    .collect();
                list.sort_by(|a, b| b.probability.total_cmp(&a.probability));
                list.truncate(encoding.config.max_predictions_per_step);
                per_step.push(list);
            }
            let best = per_step
                .first()
                .and_then(|list| list.first())
                .map(|prediction| prediction.best(encoding.config.field_type))
                .unwrap_or_default();
            encoding.predicted_values.set_for_curr_step(per_step);
            encoding.best_predicted_value.set_for_curr_step(best);
        }
        Ok(())
    }

    /// Folds the step into per-bit counters and the sensor's discounted
    /// precision: a hit when any inference-enabled encoding's one-step
    /// prediction from the previous step contains the value read now.
    pub fn calculate_statistics(&mut self, time_step: u64) {
        for bit in &mut self.bits {
            bit.record_stats(time_step);
        }
        let mut any_inference = false;
        let mut hit = false;
        for encoding in &self.encodings {
            if !encoding.config.enable_inference {
                continue;
            }
            any_inference = true;
            let actual = encoding.current_value.at_curr_step();
            let predicted_then = encoding.predicted_values.at_previous_step();
            if predicted_then
                .first()
                .is_some_and(|list| list.iter().any(|p| p.contains(actual)))
            {
                hit = true;
            }
        }
        if any_inference {
            self.stats_precision_rate = discounted_precision(self.stats_precision_rate, hit);
        }
    }

    /// Flat x-major snapshot of the bit grid's active flags. This is what
    /// consuming regions read as input.
    pub fn output(&self) -> Vec<bool> {
        self.bits
            .iter()
            .map(|bit| *bit.is_active.at_curr_step())
            .collect()
    }
}
