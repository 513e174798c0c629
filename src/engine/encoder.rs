//! Field encoders: the boundary trait for external per-field encoders and the
//! concrete multi-field encoder that lays them out side by side.

use crate::error::{Result, ScopeError};
use crate::types::FieldValue;
use fnv::FnvHashMap;
use log::warn;

/// One decoded value range for a field, best guess first.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedRange {
    /// Lower bound of the range.
    pub min: f64,
    /// Upper bound of the range.
    pub max: f64,
    /// Human-readable description of the range (a category name for
    /// non-numeric encoders).
    pub label: String,
}

/// Encoder for a single record field, supplied by the engine.
///
/// Encoders own their bit layout: `encode_into` writes exactly `width()`
/// slots, `decode` inverts a (possibly predicted) bit pattern back into value
/// ranges, and `bucket_index` names the classifier bucket a value falls into.
pub trait FieldEncoder {
    /// Total bits this encoder writes.
    fn width(&self) -> usize;

    /// Encodes a value into `out`, which holds exactly `width()` slots.
    fn encode_into(&mut self, value: &FieldValue, out: &mut [bool]) -> Result<()>;

    /// Scalar view of a value as the algorithm sees it.
    fn scalar(&self, value: &FieldValue) -> Option<f64>;

    /// Classifier bucket for a value, when the encoder buckets values.
    fn bucket_index(&self, value: &FieldValue) -> Option<usize>;

    /// Inverse mapping from a bit pattern to value ranges, best first.
    fn decode(&self, bits: &[bool]) -> Vec<DecodedRange>;
}

/// A named field encoder positioned at a bit offset.
struct EncoderSlot {
    name: String,
    offset: usize,
    width: usize,
    encoder: Box<dyn FieldEncoder>,
}

/// Concatenates named per-field encoders into one bit array.
///
/// Fields keep their declaration order; each occupies `width()` bits starting
/// at the sum of the widths before it. Decoding splits a bit pattern back per
/// field and returns the ranges in the same order.
#[derive(Default)]
pub struct MultiEncoder {
    slots: Vec<EncoderSlot>,
}

impl MultiEncoder {
    /// An encoder with no fields yet.
    pub fn new() -> Self {
        MultiEncoder::default()
    }

    /// Appends a field encoder after the fields already declared. Duplicate
    /// field names are rejected; the sensor decides whether that is fatal.
    pub fn add_encoder(&mut self, name: &str, encoder: Box<dyn FieldEncoder>) -> Result<()> {
        if self.has_field(name) {
            return Err(ScopeError::InvalidParameter(format!(
                "field '{name}' is already encoded"
            )));
        }
        let offset = self.width();
        let width = encoder.width();
        self.slots.push(EncoderSlot {
            name: name.to_string(),
            offset,
            width,
            encoder,
        });
        Ok(())
    }

    /// Total bits across all fields.
    pub fn width(&self) -> usize {
        self.slots.last().map(|s| s.offset + s.width).unwrap_or(0)
    }

    /// Whether a field of this name was declared.
    pub fn has_field(&self, name: &str) -> bool {
        self.slots.iter().any(|s| s.name == name)
    }

    /// `(offset, width)` of a field's bits within the combined output.
    pub fn field_span(&self, name: &str) -> Option<(usize, usize)> {
        self.slots
            .iter()
            .find(|s| s.name == name)
            .map(|s| (s.offset, s.width))
    }

    /// Encodes every declared field from `values` into `out`, which must hold
    /// at least `width()` slots.
    pub fn encode(
        &mut self,
        values: &FnvHashMap<String, FieldValue>,
        out: &mut [bool],
    ) -> Result<()> {
        if out.len() < self.width() {
            return Err(ScopeError::InvalidParameter(format!(
                "encode buffer holds {} bits, {} required",
                out.len(),
                self.width()
            )));
        }
        for slot in &mut self.slots {
            let value = values
                .get(&slot.name)
                .ok_or_else(|| ScopeError::MissingField(slot.name.clone()))?;
            slot.encoder
                .encode_into(value, &mut out[slot.offset..slot.offset + slot.width])?;
        }
        Ok(())
    }

    /// Decodes a bit pattern per field, in declaration order. Patterns shorter
    /// than a field's span decode that field from an empty slice.
    pub fn decode(&self, bits: &[bool]) -> Vec<(String, Vec<DecodedRange>)> {
        self.slots
            .iter()
            .map(|slot| {
                let end = (slot.offset + slot.width).min(bits.len());
                let span = if slot.offset < end {
                    &bits[slot.offset..end]
                } else {
                    &[]
                };
                if span.len() < slot.width {
                    warn!(
                        "decode pattern covers {} of {} bits for field '{}'",
                        span.len(),
                        slot.width,
                        slot.name
                    );
                }
                (slot.name.clone(), slot.encoder.decode(span))
            })
            .collect()
    }

    /// Classifier bucket of `value` under the named field's encoder.
    pub fn bucket_index(&self, name: &str, value: &FieldValue) -> Result<Option<usize>> {
        let slot = self
            .slots
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ScopeError::MissingField(name.to_string()))?;
        Ok(slot.encoder.bucket_index(value))
    }

    /// Scalar view of `value` under the named field's encoder.
    pub fn scalar(&self, name: &str, value: &FieldValue) -> Result<Option<f64>> {
        let slot = self
            .slots
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ScopeError::MissingField(name.to_string()))?;
        Ok(slot.encoder.scalar(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Writes a value's low bits literally; decodes set bits as unit ranges.
    struct CountEncoder {
        width: usize,
    }

    impl FieldEncoder for CountEncoder {
        fn width(&self) -> usize {
            self.width
        }

        fn encode_into(&mut self, value: &FieldValue, out: &mut [bool]) -> Result<()> {
            let n = value.as_scalar().unwrap_or(0.0) as usize;
            for (i, slot) in out.iter_mut().enumerate() {
                *slot = i < n;
            }
            Ok(())
        }

        fn scalar(&self, value: &FieldValue) -> Option<f64> {
            value.as_scalar()
        }

        fn bucket_index(&self, value: &FieldValue) -> Option<usize> {
            value.as_scalar().map(|v| v as usize)
        }

        fn decode(&self, bits: &[bool]) -> Vec<DecodedRange> {
            let n = bits.iter().filter(|b| **b).count() as f64;
            vec![DecodedRange {
                min: n,
                max: n,
                label: format!("{n}"),
            }]
        }
    }

    fn values(pairs: &[(&str, FieldValue)]) -> FnvHashMap<String, FieldValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn fields_stack_at_offsets() {
        let mut multi = MultiEncoder::new();
        multi
            .add_encoder("a", Box::new(CountEncoder { width: 3 }))
            .unwrap();
        multi
            .add_encoder("b", Box::new(CountEncoder { width: 2 }))
            .unwrap();
        assert_eq!(multi.width(), 5);
        assert_eq!(multi.field_span("b"), Some((3, 2)));

        let mut out = vec![false; 5];
        multi
            .encode(
                &values(&[("a", FieldValue::Int(2)), ("b", FieldValue::Int(1))]),
                &mut out,
            )
            .unwrap();
        assert_eq!(out, vec![true, true, false, true, false]);
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let mut multi = MultiEncoder::new();
        multi
            .add_encoder("a", Box::new(CountEncoder { width: 1 }))
            .unwrap();
        assert!(multi
            .add_encoder("a", Box::new(CountEncoder { width: 1 }))
            .is_err());
    }

    #[test]
    fn missing_record_field_fails() {
        let mut multi = MultiEncoder::new();
        multi
            .add_encoder("a", Box::new(CountEncoder { width: 2 }))
            .unwrap();
        let mut out = vec![false; 2];
        let err = multi.encode(&values(&[]), &mut out).unwrap_err();
        assert!(matches!(err, ScopeError::MissingField(name) if name == "a"));
    }

    #[test]
    fn decode_splits_per_field() {
        let mut multi = MultiEncoder::new();
        multi
            .add_encoder("a", Box::new(CountEncoder { width: 2 }))
            .unwrap();
        multi
            .add_encoder("b", Box::new(CountEncoder { width: 3 }))
            .unwrap();
        let decoded = multi.decode(&[true, false, true, true, false]);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].0, "a");
        assert_eq!(decoded[0].1[0].min, 1.0);
        assert_eq!(decoded[1].1[0].min, 2.0);
    }
}
