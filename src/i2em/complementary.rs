//! Multiple-scattering (complementary) field and the reflection coefficient
//! transition of the improved IEM.

use log::debug;
use num_complex::Complex64;

use super::complex::{checked_div, checked_powi, finite_real, DIVISOR_EPSILON};
use super::fresnel::Fresnel;
use super::spectrum::{SpectrumSeries, Truncation};
use crate::error::I2emError;

/// Transition between the Fresnel coefficients at the local incidence angle
/// and at normal incidence (Wu, Chen & Fung, 2001).
///
/// Smooth surfaces are dominated by specular-like reflection at the
/// incidence angle, very rough ones by facets seen at normal incidence. The
/// weighting factor `T_f` in `[0, 1]` for the usual regime is built from the
/// same spectral series as the scattering terms.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Transition {
    /// `T_f`
    pub factor: f64,
}

impl Transition {
    pub(crate) fn new(
        local: &Fresnel,
        rv0: Complex64,
        sin_theta: f64,
        cos_theta: f64,
        u: f64,
        series: &SpectrumSeries,
    ) -> Result<Self, I2emError> {
        let s2 = sin_theta * sin_theta;
        let qt = local.transmitted;

        let ft = checked_div(
            8. * checked_powi(rv0, 2, "transition function")? * s2 * (cos_theta + qt),
            cos_theta * qt,
            "transition function",
        )?;

        // No dielectric contrast: nothing to blend
        if ft.norm() < DIVISOR_EPSILON {
            return Ok(Self { factor: 0. });
        }

        // Each sum is carried with Poisson weights e^{-u²} u²ⁿ/n!, a common
        // factor that cancels in the ratio.
        let truncation = series.truncation();
        let ln_u2 = (u * u).ln();
        let (a1, b1) = series.iter().fold((0., 0.), |(a1, b1), (n, w)| {
            let weight = truncation.ln_poisson(n, ln_u2).exp() * w;
            let growth = f64::exp((n + 1) as f64 * std::f64::consts::LN_2 - u * u);
            let b = (ft / 2. + growth * rv0 / cos_theta).norm_sqr();
            (a1 + weight, b1 + weight * b)
        });

        let st = finite_real(0.25 * ft.norm_sqr() * a1 / b1, "transition function")?;
        let st0 = 1. / (1. + checked_div(8. * rv0, cos_theta * ft, "transition function")?)
            .norm_sqr();
        let factor = finite_real(1. - st / st0, "transition function")?;
        debug!("reflection transition factor {factor:.6}");

        Ok(Self { factor })
    }

    /// Blend local and normal-incidence coefficients:
    /// `R_pt = R_p + (R_p0 - R_p) T_f`.
    pub(crate) fn blend(
        &self,
        local: &Fresnel,
        normal: (Complex64, Complex64),
    ) -> (Complex64, Complex64) {
        let (rv0, rh0) = normal;
        (
            local.rv + (rv0 - local.rv) * self.factor,
            local.rh + (rh0 - local.rh) * self.factor,
        )
    }
}

/// Complementary field coefficients for backscatter (Fung, Li & Chen, 1992,
/// non-magnetic medium):
///
/// `F_vv = 2 sin²θ (1 + Rv)² / cos θ · (1 - 1/ε)(1 + sin²θ / (ε cos²θ))`
///
/// `F_hh = -2 sin²θ (1 + Rh)² (ε - 1) / cos³θ`
///
/// Here `F` already holds the sum of the upward and downward re-radiated
/// contributions, each weighted by `uⁿ e^{-u²}` at every order. This is not
/// the monostatic limit of the bistatic I2EM, whose up/down terms split
/// between a first-order part and a `(2u)^{n-1} e^{-2u²}` part. Both reduce
/// to the small-perturbation field as `u → 0`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ComplementaryTerm {
    pub fvv: Complex64,
    pub fhh: Complex64,
    /// `k σ cos θ`
    u: f64,
}

impl ComplementaryTerm {
    pub(crate) fn new(
        eps: Complex64,
        local: &Fresnel,
        sin_theta: f64,
        cos_theta: f64,
        u: f64,
    ) -> Result<Self, I2emError> {
        let s2 = sin_theta * sin_theta;
        let c2 = cos_theta * cos_theta;
        let one = Complex64::new(1., 0.);

        let inv_eps = checked_div(one, eps, "complementary coefficient")?;
        let vv_medium = (1. - inv_eps)
            * (1. + checked_div(s2.into(), eps * c2, "complementary coefficient")?);
        let fvv = 2. * s2 / cos_theta
            * checked_powi(1. + local.rv, 2, "complementary coefficient")?
            * vv_medium;

        let fhh = -2. * s2 / (c2 * cos_theta)
            * checked_powi(1. + local.rh, 2, "complementary coefficient")?
            * (eps - 1.);

        Ok(Self { fvv, fhh, u })
    }

    /// Amplitude of the order-n complementary field, normalized by
    /// `sqrt(n!)` and with the attenuation shared with the Kirchhoff field:
    ///
    /// `uⁿ e^{-u²} / sqrt(n!) / 2`
    pub(crate) fn amplitude(&self, order: usize, truncation: &Truncation) -> f64 {
        let u = self.u;
        let ln_fact = truncation.log_factorial(order);
        0.5 * f64::exp(order as f64 * u.ln() - 0.5 * ln_fact - u * u)
    }

    /// `(vv, hh)` order-n fields.
    pub(crate) fn fields(&self, order: usize, truncation: &Truncation) -> (Complex64, Complex64) {
        let a = self.amplitude(order, truncation);
        (a * self.fvv, a * self.fhh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2em::fresnel::normal_incidence;
    use crate::i2em::kirchhoff::KirchhoffTerm;
    use crate::i2em::spectrum::Spectrum;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const EPS: Complex64 = Complex64::new(11.3, -1.5);

    fn series(u: f64) -> SpectrumSeries {
        let truncation = Truncation::adaptive(4. * u * u);
        SpectrumSeries::new(Spectrum::Gaussian, 62.83, 0.1, truncation)
    }

    /// First-order small perturbation amplitudes `α_vv` and `α_hh`.
    fn spm(eps: Complex64, theta: f64) -> (Complex64, Complex64) {
        let (s, c) = theta.sin_cos();
        let s2 = s * s;
        let sq = (eps - s2).sqrt();
        let avv = (eps - 1.) * (s2 - eps * (1. + s2)) / (eps * c + sq).powi(2);
        let ahh = (eps - 1.) / (c + sq).powi(2);
        (avv, ahh)
    }

    #[test]
    fn first_order_field_reduces_to_small_perturbation() {
        // (2kc) f + (kc) F / 2 = 4 k cos²θ α for the untransitioned
        // coefficients, with k = 1
        for deg in [10., 30., 50.] {
            let theta = f64::to_radians(deg);
            let (s, c) = theta.sin_cos();
            let local = Fresnel::at_angle(EPS, theta).unwrap();
            let kirchhoff = KirchhoffTerm::new(local.rv, local.rh, c, 0.).unwrap();
            let comp = ComplementaryTerm::new(EPS, &local, s, c, 0.).unwrap();

            let ivv = 2. * c * kirchhoff.fvv + c * comp.fvv / 2.;
            let ihh = 2. * c * kirchhoff.fhh + c * comp.fhh / 2.;
            let (avv, ahh) = spm(EPS, theta);
            assert_relative_eq!(ivv.norm(), 4. * c * c * avv.norm(), max_relative = 1e-10);
            assert_relative_eq!(ihh.norm(), 4. * c * c * ahh.norm(), max_relative = 1e-10);
        }
    }

    #[test]
    fn no_contrast_no_complementary_field() {
        let eps = Complex64::new(1., 0.);
        let theta = 0.5_f64;
        let (s, c) = theta.sin_cos();
        let local = Fresnel::at_angle(eps, theta).unwrap();
        let comp = ComplementaryTerm::new(eps, &local, s, c, 0.1).unwrap();
        assert_abs_diff_eq!(comp.fvv.norm(), 0., epsilon = 1e-15);
        assert_abs_diff_eq!(comp.fhh.norm(), 0., epsilon = 1e-15);

        let (rv0, _) = normal_incidence(eps).unwrap();
        let t = Transition::new(&local, rv0, s, c, 0.1, &series(0.1)).unwrap();
        assert_eq!(t.factor, 0.);
    }

    #[test]
    fn transition_factor_for_reference_surface() {
        let theta = f64::to_radians(30.);
        let (s, c) = theta.sin_cos();
        let u = 62.83 * 0.0025 * c;
        let local = Fresnel::at_angle(EPS, theta).unwrap();
        let normal = normal_incidence(EPS).unwrap();
        let t = Transition::new(&local, normal.0, s, c, u, &series(u)).unwrap();
        assert!(t.factor > 0. && t.factor < 1.);

        let (rvt, rht) = t.blend(&local, normal);
        // Blended coefficients lie between the two end members
        let lo = local.rv.norm().min(normal.0.norm());
        let hi = local.rv.norm().max(normal.0.norm());
        assert!(rvt.norm() >= lo - 1e-12 && rvt.norm() <= hi + 1e-12);
        assert!(rht.norm() <= 1.);
    }

    #[test]
    fn blend_end_members() {
        let local = Fresnel::at_angle(EPS, 0.4).unwrap();
        let normal = normal_incidence(EPS).unwrap();

        let (rv, rh) = Transition { factor: 0. }.blend(&local, normal);
        assert_eq!((rv, rh), (local.rv, local.rh));

        let (rv, rh) = Transition { factor: 1. }.blend(&local, normal);
        assert_abs_diff_eq!((rv - normal.0).norm(), 0., epsilon = 1e-15);
        assert_abs_diff_eq!((rh - normal.1).norm(), 0., epsilon = 1e-15);
    }

    #[test]
    fn amplitude_matches_direct_formula() {
        let u = 0.4;
        let series = series(u);
        let local = Fresnel::at_angle(EPS, 0.4).unwrap();
        let comp = ComplementaryTerm::new(EPS, &local, 0.4f64.sin(), 0.4f64.cos(), u).unwrap();
        let factorial = [1., 1., 2., 6.];
        for n in 1..=3 {
            let direct = 0.5 * u.powi(n as i32) * (-u * u).exp() / f64::sqrt(factorial[n]);
            assert_relative_eq!(comp.amplitude(n, series.truncation()), direct, max_relative = 1e-12);
        }
    }
}
