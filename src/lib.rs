//! I2EM radar backscatter
//!
//! NOTE: this module is intended for the interface between Rust and Python. The
//! real work happens in the other modules, and they do not use `pyo3`, its
//! only used here.

pub mod error;
pub mod i2em;

use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use error::I2emError;
use i2em::{Convergence, CrossPolSettings, Inputs};
use log::{debug, info, warn};
use ndarray::Array1;
use numpy::{PyArray1, PyReadonlyArray1, ToPyArray};
use pyo3::exceptions::{PyArithmeticError, PyValueError};
use pyo3::prelude::*;
use rayon::prelude::*;

impl From<I2emError> for PyErr {
    fn from(e: I2emError) -> Self {
        match e {
            I2emError::Domain(_) => PyValueError::new_err(e.to_string()),
            I2emError::NumericalDomain(_) => PyArithmeticError::new_err(e.to_string()),
            I2emError::InconsistentInputs => PyValueError::new_err(e.to_string()),
            I2emError::Cancelled => PyValueError::new_err(e.to_string()),
        }
    }
}

/// Backscattering coefficients for a batch of surfaces.
///
/// This is just a container of numpy arrays, each dimensioned as
/// (`num_points`, ).
#[pyclass]
struct SigmaNought {
    vv: Array1<f64>,
    hh: Array1<f64>,
    vh: Array1<f64>,
    degraded: Array1<bool>,
}

/// Implement all the "getters" for the Python properties
#[pymethods]
impl SigmaNought {
    #[getter]
    fn vv<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.vv.to_pyarray(py)
    }

    #[getter]
    fn hh<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.hh.to_pyarray(py)
    }

    #[getter]
    fn vh<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.vh.to_pyarray(py)
    }

    #[getter]
    fn degraded<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<bool>> {
        self.degraded.to_pyarray(py)
    }
}

impl SigmaNought {
    fn new(num_points: usize) -> Self {
        Self {
            vv: Array1::zeros(num_points),
            hh: Array1::zeros(num_points),
            vh: Array1::zeros(num_points),
            degraded: Array1::from_elem(num_points, false),
        }
    }
}

/// Like-polarized backscatter of a rough surface.
///
/// `frequency` in GHz, `rms_height` and `correlation_length` in m,
/// `incidence_angle` in degrees, the relative permittivity as `eps_real` and
/// the non-negative loss factor `eps_imag`, and `spectrum_type` 1 for an
/// exponential or 2 for a Gaussian correlation function.
///
/// Returns (`vv`, `hh`) in dB.
#[pyfunction]
#[pyo3(signature = (frequency, rms_height, correlation_length, incidence_angle, eps_real, eps_imag, spectrum_type))]
fn backscatter(
    frequency: f64,
    rms_height: f64,
    correlation_length: f64,
    incidence_angle: f64,
    eps_real: f64,
    eps_imag: f64,
    spectrum_type: i64,
) -> PyResult<(f64, f64)> {
    let inputs = Inputs::new(
        frequency,
        rms_height,
        correlation_length,
        incidence_angle,
        eps_real,
        eps_imag,
        spectrum_type,
    )
    .map_err(I2emError::from)?;
    let co = i2em::backscatter(&inputs)?;
    Ok((co.vv, co.hh))
}

/// Cross-polarized backscatter of a rough surface, in dB.
///
/// The inputs are the same as for `backscatter`. When `auto_select` is false
/// the spectral series has a fixed length instead of one picked from the
/// roughness.
#[pyfunction]
#[pyo3(signature = (frequency, rms_height, correlation_length, incidence_angle, eps_real, eps_imag, spectrum_type, auto_select=true))]
#[allow(clippy::too_many_arguments)]
fn crosspol(
    frequency: f64,
    rms_height: f64,
    correlation_length: f64,
    incidence_angle: f64,
    eps_real: f64,
    eps_imag: f64,
    spectrum_type: i64,
    auto_select: bool,
) -> PyResult<f64> {
    let inputs = Inputs::new(
        frequency,
        rms_height,
        correlation_length,
        incidence_angle,
        eps_real,
        eps_imag,
        spectrum_type,
    )
    .map_err(I2emError::from)?;
    let cross = i2em::crosspol(&inputs, &CrossPolSettings::auto_select(auto_select))?;
    Ok(cross.vh)
}

/// All three backscattering coefficients, as (`vv`, `hh`, `vh`) in dB.
#[pyfunction]
#[pyo3(signature = (frequency, rms_height, correlation_length, incidence_angle, eps_real, eps_imag, spectrum_type, auto_select=true))]
#[allow(clippy::too_many_arguments)]
fn backscatter_model(
    frequency: f64,
    rms_height: f64,
    correlation_length: f64,
    incidence_angle: f64,
    eps_real: f64,
    eps_imag: f64,
    spectrum_type: i64,
    auto_select: bool,
) -> PyResult<(f64, f64, f64)> {
    let inputs = Inputs::new(
        frequency,
        rms_height,
        correlation_length,
        incidence_angle,
        eps_real,
        eps_imag,
        spectrum_type,
    )
    .map_err(I2emError::from)?;
    let all = i2em::backscatter_model(&inputs, &CrossPolSettings::auto_select(auto_select))?;
    Ok((all.vv, all.hh, all.vh))
}

/// Compute the backscattering coefficients for many surfaces.
///
/// The following inputs are numpy arrays, all with shape (`num_points`, ):
///
/// `frequency`: radar frequency in GHz
///
/// `rms_height`: RMS surface height in m
///
/// `correlation_length`: surface correlation length in m
///
/// `incidence_angle`: incidence angle in degrees
///
/// `eps_real`: real part of the relative permittivity
///
/// `eps_imag`: loss factor of the relative permittivity (non-negative)
///
/// The correlation function `spectrum_type` (1 for exponential, 2 for
/// Gaussian) and `auto_select` apply to every point.
///
/// The returned backscattering coefficients are in dB. The `degraded` array
/// flags the points where a spectral series hit its order cap.
///
/// The number of worker threads is controlled by `num_threads`. It must be a
/// positive integer, or `None` to automatically choose the number of threads.
#[pyfunction]
#[pyo3(signature = (frequency, rms_height, correlation_length, incidence_angle, eps_real, eps_imag, spectrum_type, auto_select=true, num_threads=None))]
#[allow(clippy::too_many_arguments)]
fn backscatter_batch(
    py: Python<'_>,
    frequency: PyReadonlyArray1<'_, f64>,
    rms_height: PyReadonlyArray1<'_, f64>,
    correlation_length: PyReadonlyArray1<'_, f64>,
    incidence_angle: PyReadonlyArray1<'_, f64>,
    eps_real: PyReadonlyArray1<'_, f64>,
    eps_imag: PyReadonlyArray1<'_, f64>,
    spectrum_type: i64,
    auto_select: bool,
    num_threads: Option<usize>,
) -> PyResult<SigmaNought> {
    // Ensure everything is contiguous
    let frequency = frequency.as_slice()?;
    let rms_height = rms_height.as_slice()?;
    let correlation_length = correlation_length.as_slice()?;
    let incidence_angle = incidence_angle.as_slice()?;
    let eps_real = eps_real.as_slice()?;
    let eps_imag = eps_imag.as_slice()?;

    // Every point is validated before any of them is evaluated
    let inputs = i2em::batch_inputs(
        frequency,
        rms_height,
        correlation_length,
        incidence_angle,
        eps_real,
        eps_imag,
        spectrum_type,
    )?;
    let num_points = inputs.len();
    debug!("all {num_points} input points are in domain");

    let settings = CrossPolSettings::auto_select(auto_select);
    let mut results = Vec::new();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads.unwrap_or(0))
        .build()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;

    // These atomics keep track of how many points have finished and whether
    // it's time to cancel the computation or not
    let num_completed = AtomicUsize::new(0);
    let cancelled = AtomicBool::new(false);

    info!("Computing I2EM backscatter for {num_points} surfaces");

    pool.in_place_scope(|s| -> Result<(), PyErr> {
        s.spawn(|_| {
            inputs
                .par_iter()
                .map(|point| -> Result<_, I2emError> {
                    if cancelled.load(Ordering::Relaxed) {
                        return Err(I2emError::Cancelled);
                    }

                    let sigma = i2em::backscatter_model(point, &settings);
                    // One failed point fails the whole call, so stop the rest
                    if sigma.is_err() {
                        cancelled.store(true, Ordering::Relaxed);
                    }
                    sigma
                })
                .inspect(|_| {
                    num_completed.fetch_add(1, Ordering::Relaxed);
                })
                .collect_into_vec(&mut results);
        });

        // The work is done in the thread pool, but back here in the main
        // thread, handle progress reporting and checking for early
        // cancellation
        while !cancelled.load(Ordering::Relaxed) {
            if let Err(e) = py.check_signals() {
                cancelled.store(true, Ordering::Relaxed);
                return Err(e);
            }

            let num_completed = num_completed.load(Ordering::Relaxed);
            let progress = num_completed as f32 / num_points.max(1) as f32 * 100.;
            info!("Completed {num_completed}/{num_points} surfaces ({progress:0.2}%)");

            // All finished without cancelling early
            if num_completed == num_points {
                break;
            }

            py.allow_threads(|| {
                std::thread::sleep(Duration::from_millis(500));
            });
        }

        Ok(())
    })?;

    // Report the point that failed rather than the ones it cancelled
    if let Some(e) = results.iter().find_map(|sigma| match sigma {
        Err(e) if *e != I2emError::Cancelled => Some(*e),
        _ => None,
    }) {
        return Err(e.into());
    }

    // Copy the intermediate results to the output arrays
    debug!("copying backscatter output");
    let mut output = SigmaNought::new(num_points);
    results
        .into_iter()
        .enumerate()
        .try_for_each(|(index, sigma)| -> Result<_, I2emError> {
            let sigma = sigma?;
            output.vv[index] = sigma.vv;
            output.hh[index] = sigma.hh;
            output.vh[index] = sigma.vh;
            output.degraded[index] = sigma.convergence == Convergence::Degraded;
            Ok(())
        })?;

    let num_degraded = output.degraded.iter().filter(|&&d| d).count();
    if num_degraded > 0 {
        warn!("{num_degraded}/{num_points} surfaces did not reach series convergence");
    }

    Ok(output)
}

/// A Python module implemented in Rust.
#[pymodule]
fn pyi2em(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_function(wrap_pyfunction!(backscatter, m)?)?;
    m.add_function(wrap_pyfunction!(crosspol, m)?)?;
    m.add_function(wrap_pyfunction!(backscatter_model, m)?)?;
    m.add_function(wrap_pyfunction!(backscatter_batch, m)?)?;
    m.add_class::<SigmaNought>()?;
    Ok(())
}
