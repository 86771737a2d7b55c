//! Forecast result structure for holding point predictions.

/// Point predictions for a single series over a horizon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    values: Vec<f64>,
}

impl Forecast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Number of forecast steps.
    pub fn horizon(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Copy with every prediction clamped to be non-negative.
    /// Fleet counts cannot go below zero.
    pub fn clamped_non_negative(mut self) -> Self {
        for v in &mut self.values {
            *v = if v.is_finite() { v.max(0.0) } else { 0.0 };
        }
        self
    }
}
