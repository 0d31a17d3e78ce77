//! Complex arithmetic with explicit branch selection and domain checks.
//!
//! Only integer powers of complex values occur in the model. The one real
//! power, `-1.5` in the exponential spectrum, is taken of a real quantity.

use num_complex::Complex64;

use crate::error::I2emError;

/// Divisors with a magnitude below this are treated as zero.
pub(crate) const DIVISOR_EPSILON: f64 = 1e-12;

/// Square root on the causal branch.
///
/// The root with a non-negative real part is returned. When the real part is
/// exactly zero, the root with a non-positive imaginary part is chosen, so a
/// transmitted field `exp(-j k q |z|)` decays into the lower half-space for
/// the `ε = ε' - jε''` convention used throughout.
pub(crate) fn causal_sqrt(z: Complex64, what: &'static str) -> Result<Complex64, I2emError> {
    let z = finite(z, what)?;
    let root = z.sqrt();
    let root = if root.re < 0. || (root.re == 0. && root.im > 0.) {
        -root
    } else {
        root
    };
    Ok(root)
}

/// Complex division that refuses (near-)zero divisors.
pub(crate) fn checked_div(
    numerator: Complex64,
    denominator: Complex64,
    what: &'static str,
) -> Result<Complex64, I2emError> {
    let numerator = finite(numerator, what)?;
    let denominator = finite(denominator, what)?;
    if denominator.norm() < DIVISOR_EPSILON {
        return Err(I2emError::NumericalDomain(what));
    }
    finite(numerator / denominator, what)
}

/// Integer power of a complex number, rejecting overflow.
pub(crate) fn checked_powi(
    z: Complex64,
    exp: i32,
    what: &'static str,
) -> Result<Complex64, I2emError> {
    finite(finite(z, what)?.powi(exp), what)
}

/// Pass through `z` if both parts are finite.
pub(crate) fn finite(z: Complex64, what: &'static str) -> Result<Complex64, I2emError> {
    if z.is_finite() {
        Ok(z)
    } else {
        Err(I2emError::NumericalDomain(what))
    }
}

/// Pass through `x` if it is finite.
pub(crate) fn finite_real(x: f64, what: &'static str) -> Result<f64, I2emError> {
    if x.is_finite() {
        Ok(x)
    } else {
        Err(I2emError::NumericalDomain(what))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn sqrt_of_lossy_permittivity_has_positive_real_part() {
        let root = causal_sqrt(Complex64::new(11.3 - 0.25, -1.5), "test").unwrap();
        assert!(root.re > 0.);
        assert!(root.im < 0.);
        let back = root * root;
        assert_abs_diff_eq!(back.re, 11.05, epsilon = 1e-12);
        assert_abs_diff_eq!(back.im, -1.5, epsilon = 1e-12);
    }

    #[test]
    fn sqrt_of_negative_real_decays() {
        // Evanescent case: ε - sin²θ < 0 must give a purely attenuating root
        let root = causal_sqrt(Complex64::new(-4., 0.), "test").unwrap();
        assert_abs_diff_eq!(root.re, 0., epsilon = 1e-15);
        assert_abs_diff_eq!(root.im, -2., epsilon = 1e-12);

        let root = causal_sqrt(Complex64::new(-4., -0.), "test").unwrap();
        assert_abs_diff_eq!(root.im, -2., epsilon = 1e-12);
    }

    #[test]
    fn sqrt_rejects_nan() {
        assert_eq!(
            causal_sqrt(Complex64::new(f64::NAN, 0.), "root"),
            Err(I2emError::NumericalDomain("root"))
        );
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let one = Complex64::new(1., 0.);
        assert!(checked_div(one, Complex64::new(0., 1e-13), "ratio").is_err());
        assert!(checked_div(one, Complex64::new(f64::INFINITY, 0.), "ratio").is_err());

        let q = checked_div(Complex64::new(2., 2.), Complex64::new(0., 2.), "ratio").unwrap();
        assert_abs_diff_eq!(q.re, 1., epsilon = 1e-15);
        assert_abs_diff_eq!(q.im, -1., epsilon = 1e-15);
    }

    #[test]
    fn powers() {
        let z = Complex64::new(1., 1.);
        let sq = checked_powi(z, 2, "pow").unwrap();
        assert_abs_diff_eq!(sq.re, 0., epsilon = 1e-15);
        assert_abs_diff_eq!(sq.im, 2., epsilon = 1e-15);

        assert!(checked_powi(Complex64::new(1e200, 0.), 2, "pow").is_err());
    }
}
