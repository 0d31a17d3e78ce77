//! Surface roughness spectra and the truncated spectral series.

use log::debug;
use smallvec::SmallVec;

use crate::error::DomainError;

/// Tolerance on the last series term, relative to `max(1, partial sum)`.
const SERIES_TOLERANCE: f64 = 1e-8;

/// Upper bound on the number of spectral orders.
pub const MAX_SERIES_ORDER: usize = 200;

/// Series length used by the cross-polarized model when adaptive selection
/// is switched off.
pub const FIXED_SERIES_ORDER: usize = 15;

/// Surface autocorrelation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spectrum {
    /// `ρ(ξ) = exp(-ξ/L)`
    Exponential,
    /// `ρ(ξ) = exp(-ξ²/L²)`
    Gaussian,
}

impl TryFrom<i64> for Spectrum {
    type Error = DomainError;

    /// Decode the numeric correlation-function code, 1 for exponential and
    /// 2 for Gaussian.
    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Spectrum::Exponential),
            2 => Ok(Spectrum::Gaussian),
            _ => Err(DomainError::SpectrumType(code)),
        }
    }
}

impl Spectrum {
    /// The n-th order roughness spectrum `W(n)(κ)` in m², for a correlation
    /// length `corr_len` in m and spectral argument `kappa` in rad/m.
    ///
    /// Both forms are well defined at `κ = 0`, where they reduce to `L²/n²`
    /// and `L²/(2n)`.
    pub fn weight(self, order: usize, kappa: f64, corr_len: f64) -> f64 {
        let n = order as f64;
        match self {
            Spectrum::Exponential => {
                let ratio = corr_len / n;
                ratio.powi(2) * (1. + (kappa * ratio).powi(2)).powf(-1.5)
            }
            Spectrum::Gaussian => {
                corr_len.powi(2) / (2. * n) * f64::exp(-(kappa * corr_len).powi(2) / (4. * n))
            }
        }
    }

    /// RMS surface slope for an rms height and correlation length.
    pub fn rms_slope(self, rms_height: f64, corr_len: f64) -> f64 {
        match self {
            Spectrum::Exponential => rms_height / corr_len,
            Spectrum::Gaussian => std::f64::consts::SQRT_2 * rms_height / corr_len,
        }
    }
}

/// Whether a spectral series met its tolerance before the order cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// The last term fell below the tolerance
    Converged,
    /// The cap was reached first; the partial sum is returned as the best
    /// estimate
    Degraded,
}

impl Convergence {
    /// Combine the status of two series: degraded if either is.
    pub fn and(self, other: Convergence) -> Convergence {
        match (self, other) {
            (Convergence::Converged, Convergence::Converged) => Convergence::Converged,
            _ => Convergence::Degraded,
        }
    }
}

/// Number of spectral orders and the `ln n!` table for them.
#[derive(Debug, Clone)]
pub(crate) struct Truncation {
    convergence: Convergence,
    /// `ln n!` for `n` in `0..=terms`
    log_factorial: SmallVec<[f64; 32]>,
}

impl Truncation {
    /// Pick the order from the series `Σ xⁿ/n!`.
    ///
    /// The order is the first `n >= 2` where `xⁿ/n!` drops below the
    /// tolerance times `max(1, partial sum)`. Terms and the partial sum are
    /// carried as logarithms so large arguments cannot overflow.
    pub(crate) fn adaptive(x: f64) -> Self {
        let ln_x = x.ln();
        let ln_tolerance = SERIES_TOLERANCE.ln();

        let mut log_factorial: SmallVec<[f64; 32]> = SmallVec::new();
        log_factorial.push(0.);
        let mut ln_sum = f64::NEG_INFINITY;

        for n in 1..=MAX_SERIES_ORDER {
            let ln_fact = log_factorial[n - 1] + (n as f64).ln();
            log_factorial.push(ln_fact);

            let ln_term = n as f64 * ln_x - ln_fact;
            ln_sum = log_add_exp(ln_sum, ln_term);
            if n >= 2 && ln_term <= ln_tolerance + ln_sum.max(0.) {
                return Self {
                    convergence: Convergence::Converged,
                    log_factorial,
                };
            }
        }

        Self {
            convergence: Convergence::Degraded,
            log_factorial,
        }
    }

    /// A fixed number of orders.
    pub(crate) fn fixed(terms: usize) -> Self {
        let terms = terms.clamp(1, MAX_SERIES_ORDER);
        let mut log_factorial: SmallVec<[f64; 32]> = SmallVec::with_capacity(terms + 1);
        log_factorial.push(0.);
        for n in 1..=terms {
            log_factorial.push(log_factorial[n - 1] + (n as f64).ln());
        }
        Self {
            convergence: Convergence::Converged,
            log_factorial,
        }
    }

    /// Number of orders, `N`.
    pub(crate) fn terms(&self) -> usize {
        self.log_factorial.len() - 1
    }

    pub(crate) fn convergence(&self) -> Convergence {
        self.convergence
    }

    /// `ln n!`
    pub(crate) fn log_factorial(&self, order: usize) -> f64 {
        self.log_factorial[order]
    }

    /// Logarithm of the Poisson weight `e^{-x} xⁿ / n!`, given `ln x`.
    ///
    /// The weights sum to one over all `n >= 0`, which keeps every order of
    /// `Σ xⁿ/n!` representable even for very rough surfaces.
    pub(crate) fn ln_poisson(&self, order: usize, ln_x: f64) -> f64 {
        order as f64 * ln_x - self.log_factorial(order) - ln_x.exp()
    }
}

/// `ln(eᵃ + eᵇ)` without overflow.
fn log_add_exp(a: f64, b: f64) -> f64 {
    let hi = a.max(b);
    if hi == f64::NEG_INFINITY {
        return hi;
    }
    hi + ((a - hi).exp() + (b - hi).exp()).ln()
}

/// Roughness spectrum `W(n)` for `n = 1..=N` at one spectral argument.
///
/// Built once per call and shared by every term that sums over spectral
/// orders, so they all use the same `N`.
#[derive(Debug, Clone)]
pub(crate) struct SpectrumSeries {
    truncation: Truncation,
    /// `W(n)`, index `n - 1`
    weights: SmallVec<[f64; 32]>,
}

impl SpectrumSeries {
    pub(crate) fn new(
        spectrum: Spectrum,
        kappa: f64,
        corr_len: f64,
        truncation: Truncation,
    ) -> Self {
        let weights: SmallVec<[f64; 32]> = (1..=truncation.terms())
            .map(|n| spectrum.weight(n, kappa, corr_len))
            .collect();
        debug!(
            "{spectrum:?} spectrum series with {} orders ({:?})",
            weights.len(),
            truncation.convergence()
        );
        Self {
            truncation,
            weights,
        }
    }

    pub(crate) fn truncation(&self) -> &Truncation {
        &self.truncation
    }

    /// Iterate over `(n, W(n))`.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.weights.iter().enumerate().map(|(i, &w)| (i + 1, w))
    }
}
