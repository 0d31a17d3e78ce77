//! Fresnel reflection coefficients of a smooth dielectric half-space.
//!
//! Results stay finite towards grazing incidence, but the scattering model is
//! not validated there.

use num_complex::Complex64;

use super::complex::{causal_sqrt, checked_div};
use crate::error::I2emError;

/// Reflection coefficients at one local incidence angle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fresnel {
    /// Vertical (parallel) polarization
    pub rv: Complex64,
    /// Horizontal (perpendicular) polarization
    pub rh: Complex64,
    /// `sqrt(ε - sin²θ)`, the normalized vertical wavenumber in the lower
    /// medium. By Snell's law this is `sqrt(ε) cos θt`.
    pub transmitted: Complex64,
}

impl Fresnel {
    /// Coefficients for relative permittivity `eps` and incidence angle
    /// `theta` in radians.
    pub(crate) fn at_angle(eps: Complex64, theta: f64) -> Result<Self, I2emError> {
        let (sin, cos) = theta.sin_cos();
        let transmitted = causal_sqrt(eps - sin * sin, "transmitted wavenumber")?;

        let rv = checked_div(
            eps * cos - transmitted,
            eps * cos + transmitted,
            "vertical reflection coefficient",
        )?;
        let rh = checked_div(
            cos - transmitted,
            cos + transmitted,
            "horizontal reflection coefficient",
        )?;

        Ok(Self {
            rv,
            rh,
            transmitted,
        })
    }

    /// Average of the two polarizations, `(Rv - Rh) / 2`, which drives the
    /// cross-polarized return.
    pub(crate) fn cross(&self) -> Complex64 {
        (self.rv - self.rh) / 2.
    }
}

/// Reflection coefficients at normal incidence, `(Rv0, Rh0)`.
///
/// The two polarizations are degenerate there, `Rh0 = -Rv0`.
pub(crate) fn normal_incidence(eps: Complex64) -> Result<(Complex64, Complex64), I2emError> {
    let index = causal_sqrt(eps, "refractive index")?;
    let rv0 = checked_div(index - 1., index + 1., "normal incidence reflection")?;
    Ok((rv0, -rv0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const EPS: Complex64 = Complex64::new(11.3, -1.5);

    #[test]
    fn normal_incidence_matches_zero_angle() {
        let (rv0, rh0) = normal_incidence(EPS).unwrap();
        let at_zero = Fresnel::at_angle(EPS, 0.).unwrap();
        assert_abs_diff_eq!(at_zero.rv.re, rv0.re, epsilon = 1e-12);
        assert_abs_diff_eq!(at_zero.rv.im, rv0.im, epsilon = 1e-12);
        assert_abs_diff_eq!(at_zero.rh.re, rh0.re, epsilon = 1e-12);
        assert_abs_diff_eq!(at_zero.rh.im, rh0.im, epsilon = 1e-12);
    }

    #[test]
    fn lossless_values() {
        // ε = 4: Rv0 = (2 - 1) / (2 + 1)
        let (rv0, _) = normal_incidence(Complex64::new(4., 0.)).unwrap();
        assert_abs_diff_eq!(rv0.re, 1. / 3., epsilon = 1e-14);

        // Brewster angle for ε = 4 is atan(2), where Rv vanishes
        let brewster = 2f64.atan();
        let r = Fresnel::at_angle(Complex64::new(4., 0.), brewster).unwrap();
        assert_abs_diff_eq!(r.rv.norm(), 0., epsilon = 1e-12);
        assert!(r.rh.re < 0.);
    }

    #[test]
    fn magnitudes_bounded_for_lossy_medium() {
        for deg in [5., 20., 40., 60., 80., 89.9] {
            let r = Fresnel::at_angle(EPS, f64::to_radians(deg)).unwrap();
            assert!(r.rv.norm() <= 1.);
            assert!(r.rh.norm() <= 1.);
            assert!(r.transmitted.re > 0.);
            assert!(r.transmitted.im <= 0.);
        }
    }

    #[test]
    fn conductor_limit() {
        let r = Fresnel::at_angle(Complex64::new(1e9, -1e9), 0.5).unwrap();
        assert_abs_diff_eq!(r.rv.re, 1., epsilon = 1e-3);
        assert_abs_diff_eq!(r.rh.re, -1., epsilon = 1e-3);
        assert_abs_diff_eq!(r.cross().re, 1., epsilon = 1e-3);
    }

    #[test]
    fn snell_law() {
        let eps = Complex64::new(2.25, 0.);
        let theta = 0.6_f64;
        let r = Fresnel::at_angle(eps, theta).unwrap();
        let cos_t = r.transmitted / 1.5;
        let sin_t = (1. - cos_t.re * cos_t.re).sqrt();
        assert_abs_diff_eq!(1.5 * sin_t, theta.sin(), epsilon = 1e-12);
    }
}
