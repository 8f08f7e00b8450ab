//! Seismic hazard curve, intensity-measure bins and hazard-fragility convolution.
//!
//! The hazard curve is treated as piecewise linear in log10-log10 space and extrapolated
//! linearly beyond its first and last anchor.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};

pub const DEFAULT_IM_RANGE: [f64; 2] = [0.1, 4.0];
pub const DEFAULT_NBINS: usize = 15;

const DEFAULT_CURVE: [(f64, f64); 6] = [
    (0.0608, 1e-2),
    (0.2124, 1e-3),
    (0.4, 1e-4),
    (0.629, 1e-5),
    (0.9344, 1e-6),
    (1.3055, 1e-7),
];

/// Annual frequency of exceedance as a function of intensity measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardCurve {
    points: Vec<(f64, f64)>,
}

impl Default for HazardCurve {
    fn default() -> Self {
        Self {
            points: DEFAULT_CURVE.to_vec(),
        }
    }
}

impl HazardCurve {
    /// Anchors must be positive with strictly increasing intensity measure.
    pub fn new(points: Vec<(f64, f64)>) -> DomainResult<Self> {
        if points.len() < 2 {
            return Err(DomainError::InvalidInput(format!(
                "hazard curve needs at least two points, got {}",
                points.len()
            )));
        }
        if let Some((im, freq)) = points.iter().find(|(im, f)| !(*im > 0.0 && *f > 0.0)) {
            return Err(DomainError::RangeError(format!(
                "hazard curve point ({}, {}) must be positive",
                im, freq
            )));
        }
        if points.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(DomainError::InvalidInput(
                "hazard curve intensity measures must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Exceedance frequency at `im`.
    pub fn frequency_at(&self, im: f64) -> f64 {
        let x = im.log10();
        let n = self.points.len();
        let segment = self
            .points
            .windows(2)
            .position(|w| x <= w[1].0.log10())
            .unwrap_or(n - 2);
        let (x0, y0) = (self.points[segment].0.log10(), self.points[segment].1.log10());
        let (x1, y1) = (
            self.points[segment + 1].0.log10(),
            self.points[segment + 1].1.log10(),
        );
        let y = y0 + (x - x0) * (y1 - y0) / (x1 - x0);
        10f64.powf(y)
    }
}

/// How intensity-measure bins are specified.
#[derive(Debug, Clone, PartialEq)]
pub enum ImBinning {
    /// `nbins` equal-width bins over `[lo, hi]`; midpoints are bin averages
    Range { lo: f64, hi: f64, nbins: usize },
    /// Bin edges; midpoints are geometric means of adjacent edges
    Extents(Vec<f64>),
    /// Bin midpoints; edges are geometric means of adjacent midpoints
    Midpoints(Vec<f64>),
}

impl Default for ImBinning {
    fn default() -> Self {
        ImBinning::Range {
            lo: DEFAULT_IM_RANGE[0],
            hi: DEFAULT_IM_RANGE[1],
            nbins: DEFAULT_NBINS,
        }
    }
}

impl ImBinning {
    /// Interpret an IM list: two entries are a range, more are extents.
    pub fn from_list(im: &[f64], nbins: usize) -> DomainResult<Self> {
        match im.len() {
            0 => Ok(ImBinning::Range {
                lo: DEFAULT_IM_RANGE[0],
                hi: DEFAULT_IM_RANGE[1],
                nbins,
            }),
            1 => Err(DomainError::InvalidInput(
                "intensity measure needs a range of two values or a list of bin extents"
                    .to_string(),
            )),
            2 => Ok(ImBinning::Range {
                lo: im[0],
                hi: im[1],
                nbins,
            }),
            _ => Ok(ImBinning::Extents(im.to_vec())),
        }
    }

    pub fn bins(&self) -> DomainResult<Bins> {
        match self {
            ImBinning::Range { lo, hi, nbins } => {
                if *nbins == 0 {
                    return Err(DomainError::RangeError(
                        "nbins must be greater than 0".to_string(),
                    ));
                }
                if !(*lo > 0.0 && hi > lo) {
                    return Err(DomainError::RangeError(format!(
                        "intensity measure range [{}, {}] must be positive and increasing",
                        lo, hi
                    )));
                }
                let step = (hi - lo) / *nbins as f64;
                let extents: Vec<f64> = (0..=*nbins).map(|i| lo + step * i as f64).collect();
                let midpoints = extents.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();
                Ok(Bins { midpoints, extents })
            }
            ImBinning::Extents(extents) => {
                check_increasing(extents, "bin extents")?;
                let midpoints = extents.windows(2).map(|w| (w[0] * w[1]).sqrt()).collect();
                Ok(Bins {
                    midpoints,
                    extents: extents.clone(),
                })
            }
            ImBinning::Midpoints(midpoints) => {
                check_increasing(midpoints, "bin midpoints")?;
                let inner: Vec<f64> = midpoints.windows(2).map(|w| (w[0] * w[1]).sqrt()).collect();
                let first = midpoints[0].powi(2) / inner[0];
                let last = midpoints[midpoints.len() - 1].powi(2) / inner[inner.len() - 1];
                let mut extents = Vec::with_capacity(midpoints.len() + 1);
                extents.push(first);
                extents.extend(inner);
                extents.push(last);
                Ok(Bins {
                    midpoints: midpoints.clone(),
                    extents,
                })
            }
        }
    }
}

fn check_increasing(values: &[f64], what: &str) -> DomainResult<()> {
    if values.len() < 2 {
        return Err(DomainError::InvalidInput(format!(
            "{} need at least two values",
            what
        )));
    }
    if values.iter().any(|v| !(*v > 0.0)) {
        return Err(DomainError::RangeError(format!("{} must be positive", what)));
    }
    if values.windows(2).any(|w| w[1] <= w[0]) {
        return Err(DomainError::InvalidInput(format!(
            "{} must be strictly increasing",
            what
        )));
    }
    Ok(())
}

/// Bin midpoints and the `nbins + 1` bin edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Bins {
    pub midpoints: Vec<f64>,
    pub extents: Vec<f64>,
}

impl Bins {
    pub fn len(&self) -> usize {
        self.midpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.midpoints.is_empty()
    }
}

/// Hazard evaluated on a set of bins.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedHazard {
    /// Bin midpoints
    pub im: Vec<f64>,
    /// Exceedance frequency at each midpoint
    pub frequencies: Vec<f64>,
    /// Frequency drop across each bin, `H(e_i) - H(e_{i+1})`
    pub deltas: Vec<f64>,
}

#[instrument(level = "debug", skip(curve, bins), fields(nbins = bins.len()))]
pub fn interpolate(curve: &HazardCurve, bins: &Bins) -> BinnedHazard {
    let frequencies = bins.midpoints.iter().map(|&x| curve.frequency_at(x)).collect();
    let at_extents: Vec<f64> = bins.extents.iter().map(|&x| curve.frequency_at(x)).collect();
    let deltas = at_extents.windows(2).map(|w| w[0] - w[1]).collect();
    debug!("hazard interpolated");
    BinnedHazard {
        im: bins.midpoints.clone(),
        frequencies,
        deltas,
    }
}

/// Risk of a fragility curve: `Σ fragility[bin] × delta[bin]`.
pub fn convolve(fragility: &[f64], deltas: &[f64]) -> DomainResult<f64> {
    if fragility.len() != deltas.len() {
        return Err(DomainError::LengthMismatch {
            left: fragility.len(),
            right: deltas.len(),
        });
    }
    Ok(fragility.iter().zip(deltas).map(|(f, d)| f * d).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn given_anchor_when_interpolating_then_exact_frequency() {
        let curve = HazardCurve::default();
        assert_relative_eq!(curve.frequency_at(0.4), 1e-4, max_relative = 1e-12);
        assert_relative_eq!(curve.frequency_at(0.0608), 1e-2, max_relative = 1e-12);
    }

    #[test]
    fn given_point_beyond_last_anchor_when_interpolating_then_extrapolates_last_segment() {
        let curve = HazardCurve::new(vec![(1.0, 1e-2), (10.0, 1e-4)]).unwrap();
        assert_relative_eq!(curve.frequency_at(100.0), 1e-6, max_relative = 1e-12);
        assert_relative_eq!(curve.frequency_at(0.1), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn given_invalid_curves_then_errors() {
        assert!(matches!(
            HazardCurve::new(vec![(1.0, 1e-2)]),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            HazardCurve::new(vec![(0.0, 1e-2), (1.0, 1e-3)]),
            Err(DomainError::RangeError(_))
        ));
    }

    #[test]
    fn given_range_when_binning_then_linspace_extents_and_mean_midpoints() {
        let bins = ImBinning::Range {
            lo: 0.1,
            hi: 0.5,
            nbins: 4,
        }
        .bins()
        .unwrap();
        assert_eq!(bins.extents.len(), 5);
        assert_relative_eq!(bins.extents[4], 0.5, epsilon = 1e-12);
        assert_relative_eq!(bins.midpoints[0], 0.15, epsilon = 1e-12);
    }

    #[test]
    fn given_extents_when_binning_then_geometric_midpoints() {
        let bins = ImBinning::Extents(vec![1.0, 4.0, 16.0]).bins().unwrap();
        assert_eq!(bins.midpoints, vec![2.0, 8.0]);
    }

    #[test]
    fn given_midpoints_when_binning_then_geometric_extents() {
        let bins = ImBinning::Midpoints(vec![2.0, 8.0]).bins().unwrap();
        assert_relative_eq!(bins.extents[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(bins.extents[1], 4.0, epsilon = 1e-12);
        assert_relative_eq!(bins.extents[2], 16.0, epsilon = 1e-12);
    }

    #[test]
    fn given_zero_bins_then_range_error() {
        assert!(matches!(
            ImBinning::from_list(&[0.1, 4.0], 0).unwrap().bins(),
            Err(DomainError::RangeError(_))
        ));
    }

    #[test]
    fn given_bins_when_interpolating_then_deltas_sum_to_frequency_drop() {
        let curve = HazardCurve::default();
        let bins = ImBinning::default().bins().unwrap();

        let hazard = interpolate(&curve, &bins);

        let total: f64 = hazard.deltas.iter().sum();
        let expected = curve.frequency_at(0.1) - curve.frequency_at(4.0);
        assert_relative_eq!(total, expected, max_relative = 1e-12);
        assert_eq!(hazard.frequencies.len(), DEFAULT_NBINS);
    }

    #[test]
    fn given_mismatched_lengths_when_convolving_then_errors() {
        assert_eq!(
            convolve(&[0.1, 0.2], &[1.0]).unwrap_err(),
            DomainError::LengthMismatch { left: 2, right: 1 }
        );
        assert_relative_eq!(convolve(&[0.5, 1.0], &[2.0, 3.0]).unwrap(), 4.0);
    }
}
