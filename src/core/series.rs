use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::InvariantViolation;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Epoch milliseconds, display only
    pub timestamp: i64,
    pub value: f64,
}

/// Measurements in ascending timestamp order. Position is identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    measurements: Vec<Measurement>,
}

impl TimeSeries {
    pub fn new(measurements: Vec<Measurement>) -> Result<Self, InvariantViolation> {
        if let Some(index) = measurements
            .windows(2)
            .position(|pair| pair[1].timestamp < pair[0].timestamp)
        {
            return Err(InvariantViolation::OutOfOrder { index: index + 1 });
        }
        Ok(Self { measurements })
    }

    /// Zips parallel timestamp and value sequences.
    pub fn from_parts(timestamps: &[i64], values: &[f64]) -> Result<Self, InvariantViolation> {
        if timestamps.len() != values.len() {
            return Err(InvariantViolation::LengthMismatch {
                timestamps: timestamps.len(),
                values: values.len(),
            });
        }
        Self::new(
            timestamps
                .iter()
                .zip(values)
                .map(|(&timestamp, &value)| Measurement { timestamp, value })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Measurement> {
        self.measurements.get(index)
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn values(&self) -> Vec<f64> {
        self.measurements.iter().map(|m| m.value).collect()
    }
}

/// Indices of flagged positions in the series that produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutlierSet {
    indices: BTreeSet<usize>,
}

impl OutlierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: usize) -> bool {
        self.indices.insert(index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    /// Every index must address a position of a series with `len` points.
    pub fn check_against(&self, len: usize) -> Result<(), InvariantViolation> {
        match self.indices.iter().next_back() {
            Some(&index) if index >= len => Err(InvariantViolation::IndexOutOfRange { index, len }),
            _ => Ok(()),
        }
    }
}

impl FromIterator<usize> for OutlierSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            indices: iter.into_iter().collect(),
        }
    }
}
