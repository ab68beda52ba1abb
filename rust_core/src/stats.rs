//! Numeric primitives over stat sequences.
//!
//! Every function here is total: empty input yields zeros or an empty
//! series, never a panic or a NaN.

use crate::utils::round_to;
use serde::{Deserialize, Serialize};

/// Number of points in a KDE curve
pub const KDE_POINTS: usize = 100;

/// Arithmetic mean; 0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Trailing moving average with a shrinking window at the start.
///
/// Output length equals input length; entry `i` averages
/// `values[max(0, i + 1 - window)..=i]`.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut running = 0.0;

    for (i, v) in values.iter().enumerate() {
        running += v;
        if i >= window {
            running -= values[i - window];
        }
        let len = (i + 1).min(window);
        out.push(running / len as f64);
    }
    out
}

/// Population standard deviation; 0 for fewer than two values.
pub fn standard_deviation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Median; 0 for empty input.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// One point of a density curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KdePoint {
    pub x: f64,
    pub density: f64,
}

/// Silverman's rule-of-thumb bandwidth, with a floor for degenerate samples
fn silverman_bandwidth(values: &[f64]) -> f64 {
    let sd = standard_deviation(values);
    let n = values.len() as f64;
    let h = 1.06 * sd * n.powf(-0.2);
    if h > 1e-9 {
        h
    } else {
        1.0
    }
}

/// Gaussian kernel density estimate sampled at `KDE_POINTS` evenly spaced
/// points spanning the observed min..max.
///
/// Display only. Empty input gives an empty curve.
pub fn kde(values: &[f64]) -> Vec<KdePoint> {
    if values.is_empty() {
        return Vec::new();
    }

    let bandwidth = silverman_bandwidth(values);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // A constant series still gets a visible bump
    let (lo, hi) = if (max - min).abs() < 1e-9 {
        (min - bandwidth, max + bandwidth)
    } else {
        (min, max)
    };
    let step = (hi - lo) / (KDE_POINTS - 1) as f64;
    let norm = 1.0 / (values.len() as f64 * bandwidth * (2.0 * std::f64::consts::PI).sqrt());

    (0..KDE_POINTS)
        .map(|i| {
            let x = lo + step * i as f64;
            let density = values
                .iter()
                .map(|v| {
                    let u = (x - v) / bandwidth;
                    (-0.5 * u * u).exp()
                })
                .sum::<f64>()
                * norm;
            KdePoint {
                x: round_to(x, 2),
                density: round_to(density, 5),
            }
        })
        .collect()
}

/// Distribution of a stat relative to a line, for the prop spectrum chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropSpectrum {
    pub line: f64,
    pub curve: Vec<KdePoint>,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    /// Share of games strictly over the line
    pub pct_over: f64,
}

pub fn prop_spectrum(values: &[f64], line: f64) -> PropSpectrum {
    let over = values.iter().filter(|v| **v > line).count();
    let pct_over = if values.is_empty() {
        0.0
    } else {
        over as f64 / values.len() as f64
    };

    PropSpectrum {
        line,
        curve: kde(values),
        mean: round_to(mean(values), 2),
        median: round_to(median(values), 2),
        std_dev: round_to(standard_deviation(values), 2),
        pct_over: round_to(pct_over, 3),
    }
}
