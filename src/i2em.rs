//! Improved Integral Equation Model (I2EM) backscatter from a rough
//! dielectric surface.
//!
//! The public entry points are [`backscatter`] for the like-polarized VV and
//! HH channels, [`crosspol`] for VH and [`backscatter_model`] for all three.
//! Each call is a pure function of its [`Inputs`]; the only data shared
//! between calls are the immutable quadrature rules of the cross-polarized
//! integral.

mod complementary;
mod complex;
mod crosspol;
mod fresnel;
mod kirchhoff;
mod quadrature;
mod shadowing;
mod spectrum;


use log::{debug, warn};
use num_complex::Complex64;

use crate::error::{DomainError, I2emError};
use complementary::{ComplementaryTerm, Transition};
use complex::finite_real;
use crosspol::CrossPolIntegral;
use fresnel::{normal_incidence, Fresnel};
use kirchhoff::KirchhoffTerm;
use spectrum::{SpectrumSeries, Truncation};

pub use crosspol::{AZIMUTH_ORDER, SLOPE_ORDER};
pub use spectrum::{Convergence, Spectrum, FIXED_SERIES_ORDER, MAX_SERIES_ORDER};

/// Speed of light in m/s
pub const SPEED_OF_LIGHT: f64 = 3.0e8;

/// Smallest linear σ0 converted to decibels, i.e. a -200 dB floor.
pub const SIGMA0_FLOOR: f64 = 1e-20;

/// Convert a linear backscattering coefficient to decibels.
pub fn to_db(sigma0: f64) -> f64 {
    10. * sigma0.max(SIGMA0_FLOOR).log10()
}

fn positive(value: f64, error: DomainError) -> Result<f64, DomainError> {
    if value.is_finite() && value > 0. {
        Ok(value)
    } else {
        Err(error)
    }
}

/// Statistics of the rough surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    /// RMS height in m
    pub rms_height: f64,
    /// Correlation length in m
    pub correlation_length: f64,
    /// Shape of the autocorrelation function
    pub spectrum: Spectrum,
}

impl Surface {
    /// Validate and build a surface.
    pub fn new(
        rms_height: f64,
        correlation_length: f64,
        spectrum: Spectrum,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            rms_height: positive(rms_height, DomainError::RmsHeight(rms_height))?,
            correlation_length: positive(
                correlation_length,
                DomainError::CorrelationLength(correlation_length),
            )?,
            spectrum,
        })
    }

    /// RMS slope of the surface.
    pub fn rms_slope(&self) -> f64 {
        self.spectrum
            .rms_slope(self.rms_height, self.correlation_length)
    }
}

/// Radar frequency and look angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    /// Frequency in GHz
    pub frequency: f64,
    /// Incidence angle in degrees
    pub incidence_angle: f64,
}

impl Geometry {
    /// Validate and build a geometry.
    pub fn new(frequency: f64, incidence_angle: f64) -> Result<Self, DomainError> {
        let frequency = positive(frequency, DomainError::Frequency(frequency))?;
        if !(incidence_angle > 0. && incidence_angle < 90.) {
            return Err(DomainError::IncidenceAngle(incidence_angle));
        }
        Ok(Self {
            frequency,
            incidence_angle,
        })
    }

    /// Free-space wavenumber in rad/m
    pub fn wavenumber(&self) -> f64 {
        2. * std::f64::consts::PI * self.frequency * 1e9 / SPEED_OF_LIGHT
    }

    /// Incidence angle in radians
    pub fn theta(&self) -> f64 {
        self.incidence_angle.to_radians()
    }
}

/// Validated inputs to one model evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inputs {
    /// Surface statistics
    pub surface: Surface,
    /// Sensor geometry
    pub geometry: Geometry,
    /// Relative permittivity, `ε' - jε''`
    pub permittivity: Complex64,
}

impl Inputs {
    /// Validate the scalar model parameters.
    ///
    /// `frequency` in GHz, `rms_height` and `correlation_length` in m,
    /// `incidence_angle` in degrees, the relative permittivity as its real
    /// part and its (non-negative) loss factor, and `spectrum_type` 1 for an
    /// exponential or 2 for a Gaussian correlation function.
    ///
    /// The first offending input found is reported. Nothing is clamped.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        frequency: f64,
        rms_height: f64,
        correlation_length: f64,
        incidence_angle: f64,
        eps_real: f64,
        eps_imag: f64,
        spectrum_type: i64,
    ) -> Result<Self, DomainError> {
        let geometry = Geometry::new(frequency, incidence_angle)?;
        let spectrum = Spectrum::try_from(spectrum_type)?;
        let surface = Surface::new(rms_height, correlation_length, spectrum)?;

        if !(eps_real.is_finite() && eps_real >= 1.) {
            return Err(DomainError::PermittivityReal(eps_real));
        }
        if !(eps_imag.is_finite() && eps_imag >= 0.) {
            return Err(DomainError::PermittivityImag(eps_imag));
        }

        Ok(Self {
            surface,
            geometry,
            permittivity: Complex64::new(eps_real, -eps_imag),
        })
    }

    /// `k σ cos θ`
    fn normalized_roughness(&self) -> f64 {
        self.geometry.wavenumber() * self.surface.rms_height * self.geometry.theta().cos()
    }
}

/// Validate a batch of points given as equally long columns.
///
/// Fails on mismatched lengths or on the first out-of-domain point, before
/// any point is evaluated.
#[allow(clippy::too_many_arguments)]
pub fn batch_inputs(
    frequency: &[f64],
    rms_height: &[f64],
    correlation_length: &[f64],
    incidence_angle: &[f64],
    eps_real: &[f64],
    eps_imag: &[f64],
    spectrum_type: i64,
) -> Result<Vec<Inputs>, I2emError> {
    let num_points = frequency.len();
    let lengths = [
        rms_height.len(),
        correlation_length.len(),
        incidence_angle.len(),
        eps_real.len(),
        eps_imag.len(),
    ];
    if lengths.iter().any(|&n| n != num_points) {
        return Err(I2emError::InconsistentInputs);
    }

    (0..num_points)
        .map(|point| {
            Inputs::new(
                frequency[point],
                rms_height[point],
                correlation_length[point],
                incidence_angle[point],
                eps_real[point],
                eps_imag[point],
                spectrum_type,
            )
            .map_err(|e| {
                warn!("point {point} rejected: {e}");
                I2emError::from(e)
            })
        })
        .collect()
}

/// How many spectral orders the cross-polarized integrand carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpectralTerms {
    /// Pick the order from the surface roughness, as for the like-polarized
    /// series
    #[default]
    Auto,
    /// Always use this many orders
    Fixed(usize),
}

/// Options of the cross-polarized model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrossPolSettings {
    /// Spectral series length
    pub spectral_terms: SpectralTerms,
}

impl CrossPolSettings {
    /// Settings matching the `auto_select` switch of the Python interface:
    /// adaptive when true, [`FIXED_SERIES_ORDER`] terms otherwise.
    pub fn auto_select(auto: bool) -> Self {
        let spectral_terms = if auto {
            SpectralTerms::Auto
        } else {
            SpectralTerms::Fixed(FIXED_SERIES_ORDER)
        };
        Self { spectral_terms }
    }
}

/// Like-polarized backscatter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoPolarized {
    /// σ0_vv in dB
    pub vv: f64,
    /// σ0_hh in dB
    pub hh: f64,
    /// σ0_vv in dB from the Kirchhoff field alone, before shadowing
    pub kirchhoff_vv: f64,
    /// σ0_hh in dB from the Kirchhoff field alone, before shadowing
    pub kirchhoff_hh: f64,
    /// Reflection transition factor `T_f`
    pub transition: f64,
    /// Number of spectral orders summed
    pub terms: usize,
    /// Status of the spectral series
    pub convergence: Convergence,
}

/// Cross-polarized backscatter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossPolarized {
    /// σ0_vh in dB
    pub vh: f64,
    /// Number of spectral orders in the integrand
    pub terms: usize,
    /// Status of the spectral series
    pub convergence: Convergence,
}

/// All three channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FullPolarized {
    /// σ0_vv in dB
    pub vv: f64,
    /// σ0_hh in dB
    pub hh: f64,
    /// σ0_vh in dB
    pub vh: f64,
    /// Degraded if either series is
    pub convergence: Convergence,
}

fn report(what: &str, terms: usize, convergence: Convergence) {
    match convergence {
        Convergence::Converged => debug!("{what}: series converged with {terms} orders"),
        Convergence::Degraded => warn!(
            "{what}: spectral series did not converge within {terms} orders, returning the partial sum"
        ),
    }
}

/// VV and HH backscattering coefficients.
///
/// Single and multiple scattering are summed coherently per spectral order
/// on one shared [`SpectrumSeries`]; the Fresnel coefficients of the
/// single-scattering field go through the Wu-Chen-Fung transition and the
/// result is corrected for Smith shadowing.
pub fn backscatter(inputs: &Inputs) -> Result<CoPolarized, I2emError> {
    let Inputs {
        surface,
        geometry,
        permittivity: eps,
    } = *inputs;

    let k = geometry.wavenumber();
    let theta = geometry.theta();
    let (sin_theta, cos_theta) = theta.sin_cos();
    let u = inputs.normalized_roughness();

    let series = SpectrumSeries::new(
        surface.spectrum,
        2. * k * sin_theta,
        surface.correlation_length,
        Truncation::adaptive((2. * u).powi(2)),
    );
    let truncation = series.truncation();

    let local = Fresnel::at_angle(eps, theta)?;
    let normal = normal_incidence(eps)?;
    let transition = Transition::new(&local, normal.0, sin_theta, cos_theta, u, &series)?;
    let (rvt, rht) = transition.blend(&local, normal);

    let kirchhoff = KirchhoffTerm::new(rvt, rht, cos_theta, u)?;
    let complementary = ComplementaryTerm::new(eps, &local, sin_theta, cos_theta, u)?;

    let (vv, hh) = series.iter().fold((0., 0.), |(vv, hh), (n, w)| {
        let (kvv, khh) = kirchhoff.fields(n, truncation);
        let (cvv, chh) = complementary.fields(n, truncation);
        (
            vv + (kvv + cvv).norm_sqr() * w,
            hh + (khh + chh).norm_sqr() * w,
        )
    });

    let shadow = shadowing::monostatic(theta, surface.rms_slope());
    let scale = 0.5 * k * k * shadow;
    let vv = finite_real(scale * vv, "VV backscatter")?;
    let hh = finite_real(scale * hh, "HH backscatter")?;
    let (kirchhoff_vv, kirchhoff_hh) = kirchhoff.sigma0(k, series.iter(), truncation);

    let terms = truncation.terms();
    let convergence = truncation.convergence();
    report("like-polarized", terms, convergence);
    debug!("shadowing {shadow:.6}, linear σ0 vv {vv:e} hh {hh:e}");

    Ok(CoPolarized {
        vv: to_db(vv),
        hh: to_db(hh),
        kirchhoff_vv: to_db(kirchhoff_vv),
        kirchhoff_hh: to_db(kirchhoff_hh),
        transition: transition.factor,
        terms,
        convergence,
    })
}

/// VH backscattering coefficient from the multiple-scattering integral.
pub fn crosspol(inputs: &Inputs, settings: &CrossPolSettings) -> Result<CrossPolarized, I2emError> {
    let Inputs {
        surface,
        geometry,
        permittivity: eps,
    } = *inputs;

    let theta = geometry.theta();
    let (sin_theta, cos_theta) = theta.sin_cos();
    let u = inputs.normalized_roughness();
    let rms_slope = surface.rms_slope();

    let truncation = match settings.spectral_terms {
        SpectralTerms::Auto => Truncation::adaptive(4. * u * u),
        SpectralTerms::Fixed(terms) => Truncation::fixed(terms),
    };

    let integral = CrossPolIntegral {
        eps,
        wavenumber: geometry.wavenumber(),
        sin_theta,
        cos_theta,
        corr_len: surface.correlation_length,
        spectrum: surface.spectrum,
        rms_slope,
        reflection: Fresnel::at_angle(eps, theta)?.cross(),
        u2: u * u,
        truncation: &truncation,
    }
    .integrate()?;

    let vh = finite_real(
        shadowing::single(theta, rms_slope) * integral,
        "VH backscatter",
    )?;

    let terms = truncation.terms();
    let convergence = truncation.convergence();
    report("cross-polarized", terms, convergence);

    Ok(CrossPolarized {
        vh: to_db(vh),
        terms,
        convergence,
    })
}

/// VV, HH and VH backscattering coefficients.
pub fn backscatter_model(
    inputs: &Inputs,
    settings: &CrossPolSettings,
) -> Result<FullPolarized, I2emError> {
    let co = backscatter(inputs)?;
    let cross = crosspol(inputs, settings)?;
    Ok(FullPolarized {
        vv: co.vv,
        hh: co.hh,
        vh: cross.vh,
        convergence: co.convergence.and(cross.convergence),
    })
}
