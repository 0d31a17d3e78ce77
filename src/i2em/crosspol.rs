//! Cross-polarized backscatter from the multiple-scattering term (IEMX).
//!
//! The single-scattering field has no cross-polarized component in the
//! backscatter direction, so VH comes entirely from the complementary field.
//! It is integrated over the directions `(r, φ)` of the intermediate wave,
//! with `r` the sine of its polar angle (the local slope direction), on the
//! fixed domain `r ∈ [0.1, 1]`, `φ ∈ [0, π]`.
//!
//! The quadrature is a fixed 48 × 32 point Gauss-Legendre product rule in
//! `(α, φ)` with `r = sin α`, which absorbs the `1/q` behaviour of the kernel
//! as `r → 1`.

use std::sync::OnceLock;

use num_complex::Complex64;

use super::complex::{causal_sqrt, checked_div, finite_real};
use super::quadrature::GaussLegendre;
use super::shadowing::smith_lambda;
use super::spectrum::{Spectrum, Truncation};
use crate::error::I2emError;

/// Number of Gauss-Legendre nodes along the slope angle `α`.
pub const SLOPE_ORDER: usize = 48;

/// Number of Gauss-Legendre nodes along the azimuth `φ`.
pub const AZIMUTH_ORDER: usize = 32;

/// Lower bound of `r = sin α`.
const MIN_SLOPE_SINE: f64 = 0.1;

/// Keeps `q = sqrt(1 + δ - r²)` away from zero at `r = 1`.
const GRAZING_OFFSET: f64 = 1e-4;

fn slope_rule() -> &'static GaussLegendre {
    static RULE: OnceLock<GaussLegendre> = OnceLock::new();
    RULE.get_or_init(|| GaussLegendre::new(SLOPE_ORDER))
}

fn azimuth_rule() -> &'static GaussLegendre {
    static RULE: OnceLock<GaussLegendre> = OnceLock::new();
    RULE.get_or_init(|| GaussLegendre::new(AZIMUTH_ORDER))
}

/// Everything the cross-polarized kernel needs for one call.
#[derive(Debug)]
pub(crate) struct CrossPolIntegral<'a> {
    pub eps: Complex64,
    /// Free-space wavenumber in rad/m
    pub wavenumber: f64,
    pub sin_theta: f64,
    pub cos_theta: f64,
    pub corr_len: f64,
    pub spectrum: Spectrum,
    pub rms_slope: f64,
    /// `(Rv - Rh) / 2` at the incidence angle
    pub reflection: Complex64,
    /// `(k σ cos θ)²`
    pub u2: f64,
    pub truncation: &'a Truncation,
}

impl CrossPolIntegral<'_> {
    /// Cross-polarized field coefficient `|F_vh|²` at `(r, φ)`, with
    /// `R± = 1 ± R`:
    ///
    /// `F_vh = rx ry / cos θ · [(b - c)(1 - 3R) - (b - c/ε) R+ + (a - d)(1 + 3R) - (a - d ε) R-]`
    ///
    /// where `a = R+/q`, `b = R-/q`, `c = R+/q_t` and `d = R-/q_t`.
    fn coefficient(&self, r: f64, phi: f64) -> Result<f64, I2emError> {
        let r2 = r * r;
        let (sin_phi, cos_phi) = phi.sin_cos();

        // Free-space and medium vertical wavenumbers of the intermediate wave
        let q = (1. + GRAZING_OFFSET - r2).sqrt();
        let qt = causal_sqrt(self.eps - r2, "cross-pol coefficient")?;

        let rr = self.reflection;
        let (rp, rm) = (1. + rr, 1. - rr);
        let a = rp / q;
        let b = rm / q;
        let c = checked_div(rp, qt, "cross-pol coefficient")?;
        let d = checked_div(rm, qt, "cross-pol coefficient")?;
        let c_eps = checked_div(c, self.eps, "cross-pol coefficient")?;

        let upper = (b - c) * (1. - 3. * rr) - (b - c_eps) * rp;
        let lower = (a - d) * (1. + 3. * rr) - (a - d * self.eps) * rm;
        let slopes = r * cos_phi * r * sin_phi / self.cos_theta;
        finite_real((slopes * (upper + lower)).norm_sqr(), "cross-pol coefficient")
    }

    /// Integrand at `(r, φ)`, including the polar Jacobian `r` and the
    /// shadowing of the intermediate wave.
    fn kernel(&self, r: f64, phi: f64) -> Result<f64, I2emError> {
        let (sin_phi, cos_phi) = phi.sin_cos();
        let rx = r * cos_phi;
        let ry = r * sin_phi;
        let q = (1. + GRAZING_OFFSET - r * r).sqrt();
        let coefficient = self.coefficient(r, phi)?;

        let shadowing = 1. / (1. + smith_lambda(q / (r * std::f64::consts::SQRT_2 * self.rms_slope)));

        // Spectra at the two stationary points, u ∓ k sin θ
        let k = self.wavenumber;
        let ln_u2 = self.u2.ln();
        let (minus, plus) = (1..=self.truncation.terms()).fold((0., 0.), |(minus, plus), n| {
            let weight = self.truncation.ln_poisson(n, ln_u2).exp() * k * k;
            let kappa_minus = k * (rx - self.sin_theta).hypot(ry);
            let kappa_plus = k * (rx + self.sin_theta).hypot(ry);
            (
                minus + weight * self.spectrum.weight(n, kappa_minus, self.corr_len),
                plus + weight * self.spectrum.weight(n, kappa_plus, self.corr_len),
            )
        });

        let value = 4. / (16. * std::f64::consts::PI) * coefficient * minus * plus * r;
        finite_real(value * shadowing, "cross-pol kernel")
    }

    /// Linear σ0_vh before shadowing of the incident and scattered waves.
    pub(crate) fn integrate(&self) -> Result<f64, I2emError> {
        let alpha_min = MIN_SLOPE_SINE.asin();
        let alpha_max = std::f64::consts::FRAC_PI_2;

        let mut total = 0.;
        for (alpha, w_alpha) in slope_rule().on(alpha_min, alpha_max) {
            let (r, jacobian) = alpha.sin_cos();
            let mut row = 0.;
            for (phi, w_phi) in azimuth_rule().on(0., std::f64::consts::PI) {
                row += w_phi * self.kernel(r, phi)?;
            }
            total += w_alpha * jacobian * row;
        }
        finite_real(total, "cross-pol integral")
    }
}
