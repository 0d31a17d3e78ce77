//! Smith (1967) geometric shadowing for a Gaussian slope distribution.

/// Complementary error function.
///
/// Chebyshev fit with a fractional error below 1.2e-7 everywhere (Numerical
/// Recipes `erfcc`), which holds in the far tail where the shadowing function
/// subtracts two nearly equal numbers.
pub(crate) fn erfc(x: f64) -> f64 {
    #![allow(clippy::excessive_precision)]
    const COEF: [f64; 10] = [
        -1.26551223,
        1.00002368,
        0.37409196,
        0.09678418,
        -0.18628806,
        0.27886807,
        -1.13520398,
        1.48851587,
        -0.82215223,
        0.17087277,
    ];

    let z = x.abs();
    let t = 1. / (1. + 0.5 * z);
    let poly = COEF.iter().rev().fold(0., |acc, c| c + t * acc);
    let ans = t * f64::exp(-z * z + poly);
    if x >= 0. {
        ans
    } else {
        2. - ans
    }
}

/// Smith's shadowing integral `Λ(μ) = ½ (e^{-μ²}/(√π μ) - erfc(μ))`.
///
/// `mu` is the cotangent of the propagation angle over `√2` times the rms
/// slope. It is non-negative and decreasing in `mu`.
pub(crate) fn smith_lambda(mu: f64) -> f64 {
    let lambda = 0.5 * (f64::exp(-mu * mu) / (std::f64::consts::PI.sqrt() * mu) - erfc(mu));
    // The fit error dominates the true value far in the tail
    lambda.max(0.)
}

/// Argument of [`smith_lambda`] for a direction at `theta` radians from
/// nadir over a surface with the given rms slope.
pub(crate) fn shadowing_argument(theta: f64, rms_slope: f64) -> f64 {
    1. / (theta.tan() * std::f64::consts::SQRT_2 * rms_slope)
}

/// Bistatic shadowing factor for the monostatic case: incident and scattered
/// directions coincide, so both contribute the same `Λ`.
pub(crate) fn monostatic(theta: f64, rms_slope: f64) -> f64 {
    let lambda = smith_lambda(shadowing_argument(theta, rms_slope));
    1. / (1. + 2. * lambda)
}

/// Shadowing factor along a single direction.
pub(crate) fn single(theta: f64, rms_slope: f64) -> f64 {
    let lambda = smith_lambda(shadowing_argument(theta, rms_slope));
    1. / (1. + lambda)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn erfc_values() {
        assert_abs_diff_eq!(erfc(0.), 1., epsilon = 1e-7);
        assert_relative_eq!(erfc(0.5), 0.4795001221869535, max_relative = 2e-7);
        assert_relative_eq!(erfc(1.), 0.15729920705028513, max_relative = 2e-7);
        assert_relative_eq!(erfc(3.), 2.209049699858544e-05, max_relative = 2e-7);
        assert_relative_eq!(erfc(-1.), 1.8427007929497148, max_relative = 2e-7);
    }

    #[test]
    fn lambda_limits() {
        // Steep slopes: shadowing grows without bound as μ → 0
        assert!(smith_lambda(0.01) > 10.);
        // Gentle slopes: no shadowing
        assert_abs_diff_eq!(smith_lambda(30.), 0., epsilon = 1e-12);

        let values: Vec<_> = [0.1, 0.5, 1., 2.].into_iter().map(smith_lambda).collect();
        assert!(values.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn factors_in_unit_interval() {
        for deg in [10., 30., 60., 85.] {
            let theta = f64::to_radians(deg);
            for slope in [0.01, 0.1, 0.5, 1.] {
                let both = monostatic(theta, slope);
                let one = single(theta, slope);
                assert!(both > 0. && both <= 1.);
                assert!(one >= both && one <= 1.);
            }
        }
    }
}
