use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// A batch of multivariate time series laid out `(case, channel, timepoint)`.
///
/// Values are stored flat in that order; `get(case, channel, t)` is
/// `data[(case * n_channels + channel) * n_timepoints + t]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesBatch {
    n_cases: usize,
    n_channels: usize,
    n_timepoints: usize,
    data: Vec<f64>,
}

impl TimeSeriesBatch {
    pub fn new(n_cases: usize, n_channels: usize, n_timepoints: usize, data: Vec<f64>) -> Result<Self> {
        if n_cases == 0 || n_channels == 0 || n_timepoints == 0 {
            return Err(Error::EmptyData);
        }
        let expected = n_cases * n_channels * n_timepoints;
        if data.len() != expected {
            return Err(Error::ShapeMismatch {
                expected: vec![expected],
                got: vec![data.len()],
            });
        }
        Ok(TimeSeriesBatch { n_cases, n_channels, n_timepoints, data })
    }

    /// Builds a batch from `cases[case][channel][t]`. Every case must have the
    /// same number of channels and every channel the same length.
    pub fn from_nested(cases: &[Vec<Vec<f64>>]) -> Result<Self> {
        let n_cases = cases.len();
        let n_channels = cases.first().map_or(0, |c| c.len());
        let n_timepoints = cases.first().and_then(|c| c.first()).map_or(0, |s| s.len());
        let mut data = Vec::with_capacity(n_cases * n_channels * n_timepoints);
        for case in cases {
            if case.len() != n_channels {
                return Err(Error::ShapeMismatch {
                    expected: vec![n_channels],
                    got: vec![case.len()],
                });
            }
            for series in case {
                if series.len() != n_timepoints {
                    return Err(Error::ShapeMismatch {
                        expected: vec![n_timepoints],
                        got: vec![series.len()],
                    });
                }
                data.extend_from_slice(series);
            }
        }
        TimeSeriesBatch::new(n_cases, n_channels, n_timepoints, data)
    }

    /// `(n_cases, n_channels, n_timepoints)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.n_cases, self.n_channels, self.n_timepoints)
    }

    pub fn get(&self, case: usize, channel: usize, t: usize) -> f64 {
        self.data[(case * self.n_channels + channel) * self.n_timepoints + t]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Transposes every case to `(timepoint, channel)`.
    pub fn to_sequences(&self) -> SequenceBatch {
        let samples = (0..self.n_cases)
            .map(|case| {
                let rows = (0..self.n_timepoints)
                    .map(|t| (0..self.n_channels).map(|ch| self.get(case, ch, t)).collect())
                    .collect();
                Matrix::from_data(rows)
            })
            .collect();
        SequenceBatch { samples, sample_shape: (self.n_timepoints, self.n_channels) }
    }
}

/// Cases in the internal `(timepoint, channel)` layout, one matrix each.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceBatch {
    samples: Vec<Matrix>,
    sample_shape: (usize, usize),
}

impl SequenceBatch {
    /// `(n_timepoints, n_channels)` shared by every sample.
    pub fn sample_shape(&self) -> (usize, usize) {
        self.sample_shape
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Matrix] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> TimeSeriesBatch {
        // 2 cases, 2 channels, 3 timepoints; value = case*100 + channel*10 + t
        let data = (0..2)
            .flat_map(|c| (0..2).flat_map(move |ch| (0..3).map(move |t| (c * 100 + ch * 10 + t) as f64)))
            .collect();
        TimeSeriesBatch::new(2, 2, 3, data).unwrap()
    }

    #[test]
    fn sequences_are_time_major() {
        let seq = batch().to_sequences();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.sample_shape(), (3, 2));
        let second = &seq.samples()[1];
        assert_eq!(second.row(2), &[102.0, 112.0]);
        assert_eq!(second.row(0), &[100.0, 110.0]);
    }

    #[test]
    fn nested_and_flat_agree() {
        let nested = vec![
            vec![vec![0.0, 1.0, 2.0], vec![10.0, 11.0, 12.0]],
            vec![vec![100.0, 101.0, 102.0], vec![110.0, 111.0, 112.0]],
        ];
        assert_eq!(TimeSeriesBatch::from_nested(&nested).unwrap(), batch());
    }

    #[test]
    fn ragged_input_is_rejected() {
        let nested = vec![vec![vec![0.0, 1.0]], vec![vec![0.0]]];
        assert!(matches!(TimeSeriesBatch::from_nested(&nested), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn wrong_length_and_empty_are_rejected() {
        assert!(matches!(TimeSeriesBatch::new(2, 2, 3, vec![0.0; 5]), Err(Error::ShapeMismatch { .. })));
        assert!(matches!(TimeSeriesBatch::new(0, 2, 3, vec![]), Err(Error::EmptyData)));
        assert!(matches!(TimeSeriesBatch::from_nested(&[]), Err(Error::EmptyData)));
    }
}
