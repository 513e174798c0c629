//! Boundary trait for the external step-ahead classifier.

use crate::error::Result;
use crate::types::FieldValue;
use fxhash::FxHashMap;

/// Construction knobs for a per-field classifier.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassifierParams {
    /// Future-step offsets the classifier predicts, usually `1..=n`.
    pub steps: Vec<usize>,
    /// Learning rate of the classifier's weight updates.
    pub alpha: f64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        ClassifierParams {
            steps: vec![1],
            alpha: 0.001,
        }
    }
}

/// Output of one classification step.
///
/// `actual_values[b]` is the value the classifier has associated with bucket
/// `b`; `probabilities[&step][b]` is the likelihood that bucket `b` is the
/// value `step` steps ahead. The two sides are parallel by bucket index.
#[derive(Clone, Debug, Default)]
pub struct ClassifierResult {
    /// Known actual values, by bucket index.
    pub actual_values: Vec<FieldValue>,
    /// Per future-step bucket probabilities.
    pub probabilities: FxHashMap<usize, Vec<f64>>,
}

/// Step-ahead classifier over a sensor's active bits.
pub trait Classifier {
    /// Feeds one step: the active bit pattern plus the bucket and actual value
    /// of the current input, returning bucket likelihoods per future step.
    fn compute(
        &mut self,
        record_num: u64,
        pattern: &[usize],
        bucket_idx: usize,
        actual_value: &FieldValue,
        learn: bool,
        infer: bool,
    ) -> Result<ClassifierResult>;
}
