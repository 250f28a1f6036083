//! Values stored in aggregation nodes.
//!
//! The set of kinds is closed: merge, serialization and display match on
//! every variant explicitly.

use super::histogram::Histogram;
use crate::utils::error::HistogramError;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// A node value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    IntSeq(Vec<i64>),
    FloatSeq(Vec<f64>),
    Histogram(Histogram),
}

/// Discriminant of a `Value`, ordered by merge precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    Int,
    Float,
    IntSeq,
    FloatSeq,
    Histogram,
}

impl ValueKind {
    pub fn label(self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::IntSeq => "int sequence",
            ValueKind::FloatSeq => "float sequence",
            ValueKind::Histogram => "histogram",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::IntSeq(_) => ValueKind::IntSeq,
            Value::FloatSeq(_) => ValueKind::FloatSeq,
            Value::Histogram(_) => ValueKind::Histogram,
        }
    }

    /// Combine two values of the same kind in place
    ///
    /// Scalars add, sequences concatenate (self first), histograms merge bin-wise.
    /// Returns `Ok(false)` without touching `self` when the kinds differ.
    ///
    /// # Errors
    /// * `HistogramError::BinningMismatch` - two histograms with different binning
    pub fn merge_same_kind(&mut self, other: &Value) -> Result<bool, HistogramError> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => *a += b,
            (Value::Float(a), Value::Float(b)) => *a += b,
            (Value::IntSeq(a), Value::IntSeq(b)) => a.extend_from_slice(b),
            (Value::FloatSeq(a), Value::FloatSeq(b)) => a.extend_from_slice(b),
            (Value::Histogram(a), Value::Histogram(b)) => a.merge(b)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Total order used to break ties between conflicting values
    ///
    /// Kinds order by precedence first, then contents compare element-wise
    /// (floats through `total_cmp`).
    pub fn canonical_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::IntSeq(a), Value::IntSeq(b)) => a.cmp(b),
            (Value::FloatSeq(a), Value::FloatSeq(b)) => cmp_floats(a, b),
            (Value::Histogram(a), Value::Histogram(b)) => a
                .lower()
                .total_cmp(&b.lower())
                .then(a.upper().total_cmp(&b.upper()))
                .then(a.num_bins().cmp(&b.num_bins()))
                .then_with(|| cmp_floats(a.counts(), b.counts())),
            (a, b) => a.kind().cmp(&b.kind()),
        }
    }
}

fn cmp_floats(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::IntSeq(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::FloatSeq(v)
    }
}

impl From<Histogram> for Value {
    fn from(v: Histogram) -> Self {
        Value::Histogram(v)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::IntSeq(v) => v.serialize(serializer),
            Value::FloatSeq(v) => v.serialize(serializer),
            Value::Histogram(h) => h.serialize(serializer),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::IntSeq(v) => write_list(f, v),
            Value::FloatSeq(v) => write_list(f, v),
            Value::Histogram(h) => write!(
                f,
                "histogram [{}, {}) x {} bins, total {}",
                h.lower(),
                h.upper(),
                h.num_bins(),
                h.total()
            ),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str("]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_same_kind() {
        let mut a = Value::Int(2);
        assert!(a.merge_same_kind(&Value::Int(3)).unwrap());
        assert_eq!(a, Value::Int(5));

        let mut seq = Value::FloatSeq(vec![1.0]);
        seq.merge_same_kind(&Value::FloatSeq(vec![2.0, 3.0])).unwrap();
        assert_eq!(seq, Value::FloatSeq(vec![1.0, 2.0, 3.0]));

        let mut mixed = Value::Int(1);
        assert!(!mixed.merge_same_kind(&Value::Float(1.0)).unwrap());
        assert_eq!(mixed, Value::Int(1));
    }

    #[test]
    fn test_canonical_order() {
        assert_eq!(Value::Int(100).canonical_cmp(&Value::Float(0.0)), Ordering::Less);
        assert_eq!(
            Value::FloatSeq(vec![1.0]).canonical_cmp(&Value::FloatSeq(vec![1.0, 0.0])),
            Ordering::Less
        );
        assert_eq!(Value::Float(2.0).canonical_cmp(&Value::Float(2.0)), Ordering::Equal);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::IntSeq(vec![1, 2]).to_string(), "[1, 2]");
        assert_eq!(Value::Int(7).to_string(), "7");
    }
}
