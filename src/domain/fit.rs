//! Normal distribution helpers and the lognormal fragility fit.

use std::f64::consts::PI;

use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};

const MAX_ITERATIONS: usize = 1000;
const TOLERANCE: f64 = 1e-12;

/// Standard normal probability density.
pub fn normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * PI).sqrt()
}

/// Standard normal cumulative distribution function.
///
/// Hastings approximation (A&S 26.2.17), absolute error below 7.5e-8.
pub fn normal_cdf(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    if z >= 8.0 {
        return 1.0;
    }
    if z <= -8.0 {
        return 0.0;
    }

    let (z_abs, negate) = if z < 0.0 { (-z, true) } else { (z, false) };

    const B0: f64 = 0.2316419;
    const B1: f64 = 0.319381530;
    const B2: f64 = -0.356563782;
    const B3: f64 = 1.781477937;
    const B4: f64 = -1.821255978;
    const B5: f64 = 1.330274429;

    let t = 1.0 / (1.0 + B0 * z_abs);
    let poly = t * (B1 + t * (B2 + t * (B3 + t * (B4 + t * B5))));
    let cdf = 1.0 - normal_pdf(z_abs) * poly;

    if negate {
        1.0 - cdf
    } else {
        cdf
    }
}

/// Lognormal CDF with the given median and logarithmic standard deviation.
pub fn lognormal_cdf(x: f64, median: f64, beta: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    normal_cdf((x / median).ln() / beta)
}

/// Fitted lognormal fragility parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LognormalFit {
    pub median: f64,
    pub beta: f64,
}

/// Least-squares fit of a lognormal CDF to fragility values.
///
/// Levenberg-Marquardt on `(median, beta)`, starting from the interpolated 50% crossing.
#[instrument(level = "debug", skip(im, fragility))]
pub fn fit_lognormal(im: &[f64], fragility: &[f64]) -> DomainResult<LognormalFit> {
    if im.len() != fragility.len() {
        return Err(DomainError::LengthMismatch {
            left: im.len(),
            right: fragility.len(),
        });
    }
    if im.len() < 2 {
        return Err(DomainError::InvalidInput(
            "lognormal fit needs at least two points".to_string(),
        ));
    }

    let mut params = [initial_median(im, fragility), 0.5];
    let mut lambda = 1e-3;
    let mut cost = sum_squares(im, fragility, params);

    for iteration in 0..MAX_ITERATIONS {
        // Normal equations J^T J and J^T r for the two parameters
        let (mut a11, mut a12, mut a22, mut g1, mut g2) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for (&x, &y) in im.iter().zip(fragility) {
            let z = (x / params[0]).ln() / params[1];
            let pdf = normal_pdf(z);
            let d_median = -pdf / (params[0] * params[1]);
            let d_beta = -pdf * z / params[1];
            let r = y - normal_cdf(z);
            a11 += d_median * d_median;
            a12 += d_median * d_beta;
            a22 += d_beta * d_beta;
            g1 += d_median * r;
            g2 += d_beta * r;
        }

        let (b11, b22) = (a11 * (1.0 + lambda), a22 * (1.0 + lambda));
        let det = b11 * b22 - a12 * a12;
        if det.abs() < f64::MIN_POSITIVE {
            break;
        }
        let step = [(b22 * g1 - a12 * g2) / det, (b11 * g2 - a12 * g1) / det];
        let candidate = [
            (params[0] + step[0]).max(f64::EPSILON),
            (params[1] + step[1]).max(f64::EPSILON),
        ];
        let candidate_cost = sum_squares(im, fragility, candidate);

        if candidate_cost < cost {
            let improvement = cost - candidate_cost;
            params = candidate;
            cost = candidate_cost;
            lambda = (lambda / 10.0).max(1e-12);
            if improvement < TOLERANCE * cost.max(TOLERANCE) {
                debug!(iteration, cost, "lognormal fit converged");
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > 1e12 {
                break;
            }
        }
    }

    if !params.iter().all(|p| p.is_finite()) {
        return Err(DomainError::InvalidInput(
            "lognormal fit did not converge".to_string(),
        ));
    }
    Ok(LognormalFit {
        median: params[0],
        beta: params[1],
    })
}

fn sum_squares(im: &[f64], fragility: &[f64], params: [f64; 2]) -> f64 {
    im.iter()
        .zip(fragility)
        .map(|(&x, &y)| (y - lognormal_cdf(x, params[0], params[1])).powi(2))
        .sum()
}

fn initial_median(im: &[f64], fragility: &[f64]) -> f64 {
    for i in 1..im.len() {
        let (y0, y1) = (fragility[i - 1], fragility[i]);
        if (y0 - 0.5) * (y1 - 0.5) <= 0.0 && y0 != y1 {
            return im[i - 1] + (0.5 - y0) * (im[i] - im[i - 1]) / (y1 - y0);
        }
    }
    // Curve never crosses 0.5: start from the middle of the range
    let mid = im.len() / 2;
    im[mid].max(f64::EPSILON)
}
