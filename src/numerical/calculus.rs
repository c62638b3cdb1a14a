//! Numeric calculus over plain closures: a five-point centered derivative and Romberg
//! integration. The surface functions never fail, a failed integration is reported as NaN
//! (and logged); `romberg` itself returns a typed result.
use log::{trace, warn};
use thiserror::Error;

pub const DEFAULT_DERIVATIVE_STEP: f64 = 1e-3;
/// the convergence threshold is `10^-precision`
pub const DEFAULT_INTEGRATION_PRECISION: i32 = 8;
pub const DEFAULT_ROMBERG_MAX_ITERATIONS: usize = 20;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum IntegrationFailure {
    #[error("the integrand is not finite at x = {x}")]
    NonFinite { x: f64 },
    #[error("no convergence after {iterations} rows, last difference {difference:e}")]
    NotConverged { iterations: usize, difference: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RombergEstimate {
    pub value: f64,
    /// number of rows of the Romberg table that were built
    pub iterations: usize,
    /// difference between the last two diagonal entries
    pub difference: f64,
}

/// `(f(x-2h) - 8f(x-h) + 8f(x+h) - f(x+2h)) / 12h`
pub fn five_point_derivative<F>(f: F, x: f64, step: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    let y1 = f(x - 2.0 * step);
    let y2 = 8.0 * f(x - step);
    let y3 = 8.0 * f(x + step);
    let y4 = f(x + 2.0 * step);
    (y1 - y2 + y3 - y4) / (12.0 * step)
}

/// Integral of `f` over `[a, b]` by Richardson extrapolation of the trapezoid rule.
///
/// Row `i` of the table halves the step of row `i-1`:
/// `R[i][0] = R[i-1][0]/2 + h * sum f(midpoints)` and
/// `R[i][j] = (4^j R[i][j-1] - R[i-1][j-1]) / (4^j - 1)`.
/// Stops when two consecutive diagonal entries differ by less than `10^-precision`.
pub fn romberg<F>(
    f: F,
    a: f64,
    b: f64,
    precision: i32,
    max_iterations: usize,
) -> Result<RombergEstimate, IntegrationFailure>
where
    F: Fn(f64) -> f64,
{
    let tolerance = 10f64.powi(-precision);
    let sample = |x: f64| {
        let y = f(x);
        if y.is_finite() {
            Ok(y)
        } else {
            Err(IntegrationFailure::NonFinite { x })
        }
    };

    let mut h = b - a;
    let mut previous = vec![0.5 * h * (sample(a)? + sample(b)?)];
    let mut difference = f64::INFINITY;

    for i in 1..max_iterations.max(2) {
        h *= 0.5;
        let new_points = 1usize << (i - 1);
        let mut midpoints = 0.0;
        for j in 0..new_points {
            midpoints += sample(a + (2 * j + 1) as f64 * h)?;
        }

        let mut row = Vec::with_capacity(i + 1);
        row.push(0.5 * previous[0] + h * midpoints);
        let mut power = 1.0;
        for j in 1..=i {
            power *= 4.0;
            row.push((power * row[j - 1] - previous[j - 1]) / (power - 1.0));
        }

        difference = (row[i] - previous[i - 1]).abs();
        trace!("romberg row {}: {:e} (difference {:e})", i, row[i], difference);
        if difference < tolerance {
            return Ok(RombergEstimate {
                value: row[i],
                iterations: i + 1,
                difference,
            });
        }
        previous = row;
    }

    Err(IntegrationFailure::NotConverged {
        iterations: max_iterations,
        difference,
    })
}

/// `anchor.y + ∫ f` from `anchor.x` to `b`; NaN when the integration fails
pub fn antiderivative<F>(
    f: F,
    anchor_x: f64,
    anchor_y: f64,
    b: f64,
    precision: i32,
    max_iterations: usize,
) -> f64
where
    F: Fn(f64) -> f64,
{
    match romberg(f, anchor_x, b, precision, max_iterations) {
        Ok(estimate) => estimate.value + anchor_y,
        Err(failure) => {
            warn!("antiderivative from {} to {} failed: {}", anchor_x, b, failure);
            f64::NAN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_five_point_derivative() {
        let d = five_point_derivative(|x| x * x, 3.0, DEFAULT_DERIVATIVE_STEP);
        assert_relative_eq!(d, 6.0, epsilon = 1e-4);
        let d = five_point_derivative(f64::sin, 0.0, DEFAULT_DERIVATIVE_STEP);
        assert_relative_eq!(d, 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_romberg_linear() {
        let estimate = romberg(|x| x, 0.0, 2.0, 8, 20).unwrap();
        assert_relative_eq!(estimate.value, 2.0, epsilon = 1e-12);
        assert_eq!(estimate.iterations, 2);
    }

    #[test]
    fn test_romberg_smooth_functions() {
        let estimate = romberg(f64::exp, 0.0, 1.0, 10, 20).unwrap();
        assert_relative_eq!(estimate.value, std::f64::consts::E - 1.0, epsilon = 1e-9);
        let estimate = romberg(f64::sin, 0.0, std::f64::consts::PI, 10, 20).unwrap();
        assert_relative_eq!(estimate.value, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_romberg_reversed_bounds() {
        let estimate = romberg(|x| x * x, 3.0, 0.0, 8, 20).unwrap();
        assert_relative_eq!(estimate.value, -9.0, epsilon = 1e-9);
    }

    #[test]
    fn test_romberg_non_finite_sample() {
        let failure = romberg(|x| 1.0 / x, 0.0, 1.0, 8, 20).unwrap_err();
        assert_eq!(failure, IntegrationFailure::NonFinite { x: 0.0 });
        assert!(romberg(|_| f64::NAN, 0.0, 1.0, 8, 20).is_err());
    }

    #[test]
    fn test_romberg_iteration_cap() {
        // sqrt has an unbounded derivative at 0, a 3 row table cannot reach 1e-14
        let failure = romberg(f64::sqrt, 0.0, 1.0, 14, 3).unwrap_err();
        assert!(matches!(
            failure,
            IntegrationFailure::NotConverged { iterations: 3, .. }
        ));
    }

    #[test]
    fn test_antiderivative_adds_anchor() {
        let value = antiderivative(|x| x, 0.0, 0.0, 2.0, 8, 20);
        assert_relative_eq!(value, 2.0, epsilon = 1e-6);
        let value = antiderivative(|x| x, 1.0, 5.0, 2.0, 8, 20);
        assert_relative_eq!(value, 6.5, epsilon = 1e-9);
        assert!(antiderivative(|x| 1.0 / x, 0.0, 0.0, 1.0, 8, 20).is_nan());
    }
}
