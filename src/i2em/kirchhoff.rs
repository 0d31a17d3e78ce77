//! Single-scattering (Kirchhoff) field coefficients.

use num_complex::Complex64;

use super::complex::checked_div;
use super::spectrum::Truncation;
use crate::error::I2emError;

/// Kirchhoff field coefficients `f_vv = 2 Rv / cos θ` and
/// `f_hh = -2 Rh / cos θ` for the backscatter direction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct KirchhoffTerm {
    pub fvv: Complex64,
    pub fhh: Complex64,
    /// `k σ cos θ`
    u: f64,
}

impl KirchhoffTerm {
    /// Build from the (transition-corrected) reflection coefficients.
    pub(crate) fn new(
        rv: Complex64,
        rh: Complex64,
        cos_theta: f64,
        u: f64,
    ) -> Result<Self, I2emError> {
        let cos = Complex64::new(cos_theta, 0.);
        Ok(Self {
            fvv: checked_div(2. * rv, cos, "Kirchhoff coefficient")?,
            fhh: checked_div(-2. * rh, cos, "Kirchhoff coefficient")?,
            u,
        })
    }

    /// Amplitude of the order-n Kirchhoff field, normalized by `sqrt(n!)`
    /// and including the attenuation of the coherent field:
    ///
    /// `(2u)ⁿ e^{-2u²} / sqrt(n!)`
    pub(crate) fn amplitude(&self, order: usize, truncation: &Truncation) -> f64 {
        let u = self.u;
        f64::exp(
            order as f64 * (2. * u).ln() - 0.5 * truncation.log_factorial(order) - 2. * u * u,
        )
    }

    /// `(vv, hh)` order-n fields.
    pub(crate) fn fields(&self, order: usize, truncation: &Truncation) -> (Complex64, Complex64) {
        let a = self.amplitude(order, truncation);
        (a * self.fvv, a * self.fhh)
    }

    /// Backscatter with the complementary field switched off, as linear
    /// `(σ0_vv, σ0_hh)` before shadowing, for spectral weights `(n, W(n))`.
    pub(crate) fn sigma0(
        &self,
        wavenumber: f64,
        spectrum: impl Iterator<Item = (usize, f64)>,
        truncation: &Truncation,
    ) -> (f64, f64) {
        let (vv, hh) = spectrum.fold((0., 0.), |(vv, hh), (n, w)| {
            let a2 = self.amplitude(n, truncation).powi(2) * w;
            (vv + a2 * self.fvv.norm_sqr(), hh + a2 * self.fhh.norm_sqr())
        });
        let scale = 0.5 * wavenumber * wavenumber;
        (scale * vv, scale * hh)
    }
}
