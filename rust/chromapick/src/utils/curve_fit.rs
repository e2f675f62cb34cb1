//! Bounded Levenberg-Marquardt fit of a three-parameter Gaussian.

use crate::errors::{
    InputValidationError,
    NumericalError,
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianParams {
    pub amplitude: f64,
    pub mean: f64,
    pub sigma: f64,
}

impl GaussianParams {
    fn to_array(self) -> [f64; 3] {
        [self.amplitude, self.mean, self.sigma]
    }

    fn from_array(p: [f64; 3]) -> Self {
        Self {
            amplitude: p[0],
            mean: p[1],
            sigma: p[2],
        }
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        let arg = (x - self.mean) / self.sigma;
        self.amplitude * (-0.5 * arg * arg).exp()
    }

    /// Partial derivatives with respect to (amplitude, mean, sigma).
    fn gradient(&self, x: f64) -> [f64; 3] {
        let arg = (x - self.mean) / self.sigma;
        let e = (-0.5 * arg * arg).exp();
        [
            e,
            self.amplitude * e * arg / self.sigma,
            self.amplitude * e * arg * arg / self.sigma,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamBounds {
    pub lower: GaussianParams,
    pub upper: GaussianParams,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub max_evaluations: usize,
    pub ftol: f64,
    pub xtol: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_evaluations: 2000,
            ftol: 1e-8,
            xtol: 1e-8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error(transparent)]
    InvalidInput(#[from] InputValidationError),
    #[error(transparent)]
    Numerical(#[from] NumericalError),
}

fn sum_sq_residuals(x: &[f64], y: &[f64], p: &GaussianParams) -> f64 {
    x.iter()
        .zip(y.iter())
        .map(|(xi, yi)| {
            let r = yi - p.evaluate(*xi);
            r * r
        })
        .sum()
}

/// Solves the 3x3 system `a * out = b` by Gaussian elimination with partial pivoting.
fn solve3(mut a: [[f64; 3]; 3], mut b: [f64; 3]) -> Option<[f64; 3]> {
    for col in 0..3 {
        let pivot_row = (col..3).max_by(|i, j| a[*i][col].abs().total_cmp(&a[*j][col].abs()))?;
        if a[pivot_row][col].abs() < 1e-300 {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);
        for row in (col + 1)..3 {
            let factor = a[row][col] / a[col][col];
            for k in col..3 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut out = [0.0; 3];
    for row in (0..3).rev() {
        let mut acc = b[row];
        for k in (row + 1)..3 {
            acc -= a[row][k] * out[k];
        }
        out[row] = acc / a[row][row];
    }
    Some(out)
}

fn validate(
    x: &[f64],
    y: &[f64],
    initial: &GaussianParams,
    bounds: &ParamBounds,
) -> Result<(), InputValidationError> {
    if x.len() != y.len() {
        return Err(InputValidationError::ExpectedSlicesSameLength {
            expected: x.len(),
            other: y.len(),
            context: "gaussian fit".to_string(),
        });
    }
    if x.len() < 3 {
        return Err(InputValidationError::TooFewPoints {
            required: 3,
            found: x.len(),
            context: "gaussian fit".to_string(),
        });
    }
    let lo = bounds.lower.to_array();
    let hi = bounds.upper.to_array();
    let p0 = initial.to_array();
    const NAMES: [&str; 3] = ["amplitude", "mean", "sigma"];
    for i in 0..3 {
        if !(lo[i] < hi[i]) {
            return Err(InputValidationError::invalid_parameter(
                NAMES[i],
                format!("[{}, {}]", lo[i], hi[i]),
                "lower bound must be strictly less than upper bound",
            ));
        }
        if !(lo[i] <= p0[i] && p0[i] <= hi[i]) {
            return Err(InputValidationError::invalid_parameter(
                NAMES[i],
                p0[i],
                "initial guess is outside of the bounds",
            ));
        }
    }
    if bounds.lower.sigma <= 0.0 {
        return Err(InputValidationError::invalid_parameter(
            "sigma",
            bounds.lower.sigma,
            "sigma must be bounded away from zero",
        ));
    }
    Ok(())
}

/// Fits `amplitude * exp(-(x - mean)^2 / (2 sigma^2))` to `(x, y)`.
///
/// Steps that leave the box are projected back onto it. The fit fails with
/// [`NumericalError::NonConvergence`] if neither tolerance is met within
/// `max_evaluations` model evaluations.
pub fn fit_gaussian(
    x: &[f64],
    y: &[f64],
    initial: GaussianParams,
    bounds: ParamBounds,
    options: FitOptions,
) -> Result<GaussianParams, FitError> {
    validate(x, y, &initial, &bounds)?;
    let lo = bounds.lower.to_array();
    let hi = bounds.upper.to_array();
    let project = |p: [f64; 3]| -> [f64; 3] {
        [
            p[0].clamp(lo[0], hi[0]),
            p[1].clamp(lo[1], hi[1]),
            p[2].clamp(lo[2], hi[2]),
        ]
    };

    let mut params = initial;
    let mut cost = sum_sq_residuals(x, y, &params);
    let mut evaluations = 1;
    let mut lambda = 1e-3;

    while evaluations < options.max_evaluations {
        let mut jtj = [[0.0; 3]; 3];
        let mut jtr = [0.0; 3];
        for (xi, yi) in x.iter().zip(y.iter()) {
            let g = params.gradient(*xi);
            let r = yi - params.evaluate(*xi);
            for a in 0..3 {
                jtr[a] += g[a] * r;
                for b in 0..3 {
                    jtj[a][b] += g[a] * g[b];
                }
            }
        }

        let mut damped = jtj;
        for (a, row) in damped.iter_mut().enumerate() {
            row[a] += lambda * jtj[a][a].max(1e-12);
        }
        let step = match solve3(damped, jtr) {
            Some(s) => s,
            None => {
                lambda *= 10.0;
                evaluations += 1;
                continue;
            }
        };

        let current = params.to_array();
        let candidate = project([
            current[0] + step[0],
            current[1] + step[1],
            current[2] + step[2],
        ]);
        let candidate = GaussianParams::from_array(candidate);
        let new_cost = sum_sq_residuals(x, y, &candidate);
        evaluations += 1;

        if !new_cost.is_finite() {
            return Err(NumericalError::NonFiniteResult {
                context: "gaussian fit cost".to_string(),
            }
            .into());
        }

        if new_cost <= cost {
            let cand = candidate.to_array();
            let step_norm = (0..3)
                .map(|i| (cand[i] - current[i]).powi(2))
                .sum::<f64>()
                .sqrt();
            let param_norm = current.iter().map(|v| v * v).sum::<f64>().sqrt();
            let reduction = cost - new_cost;
            params = candidate;
            cost = new_cost;
            lambda = (lambda / 3.0).max(1e-12);

            if reduction <= options.ftol * cost.max(f64::MIN_POSITIVE)
                || step_norm <= options.xtol * (param_norm + options.xtol)
            {
                return Ok(params);
            }
        } else {
            lambda *= 2.0;
            if lambda > 1e16 {
                // No direction reduces the cost, we are at a (bounded) minimum.
                return Ok(params);
            }
        }
    }

    Err(NumericalError::NonConvergence { evaluations }.into())
}
