//! Error types of the backscatter model.

/// Possible I2EM errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum I2emError {
    /// An input is outside of its physical domain
    Domain(DomainError),
    /// An intermediate value would divide by zero or become non-finite. The
    /// payload names the quantity being computed.
    NumericalDomain(&'static str),
    /// Batch input arrays do not all have the same length
    InconsistentInputs,
    /// A batch computation was interrupted before it finished
    Cancelled,
}

/// The input that was rejected, along with its value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DomainError {
    /// Frequency in GHz must be finite and positive
    Frequency(f64),
    /// RMS height in m must be finite and positive
    RmsHeight(f64),
    /// Correlation length in m must be finite and positive
    CorrelationLength(f64),
    /// Incidence angle in degrees must lie strictly between 0 and 90
    IncidenceAngle(f64),
    /// Real part of the relative permittivity must be at least 1
    PermittivityReal(f64),
    /// Loss factor of the relative permittivity must be non-negative
    PermittivityImag(f64),
    /// Correlation function code must be 1 (exponential) or 2 (Gaussian)
    SpectrumType(i64),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::Frequency(v) => write!(f, "frequency must be positive, got {v} GHz"),
            DomainError::RmsHeight(v) => write!(f, "rms height must be positive, got {v} m"),
            DomainError::CorrelationLength(v) => {
                write!(f, "correlation length must be positive, got {v} m")
            }
            DomainError::IncidenceAngle(v) => {
                write!(f, "incidence angle must be in (0, 90) degrees, got {v}")
            }
            DomainError::PermittivityReal(v) => {
                write!(f, "real permittivity must be at least 1, got {v}")
            }
            DomainError::PermittivityImag(v) => {
                write!(f, "imaginary permittivity must be non-negative, got {v}")
            }
            DomainError::SpectrumType(v) => write!(
                f,
                "correlation function must be 1 (exponential) or 2 (Gaussian), got {v}"
            ),
        }
    }
}

impl std::fmt::Display for I2emError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            I2emError::Domain(e) => write!(f, "input out of domain: {e}"),
            I2emError::NumericalDomain(what) => {
                write!(f, "numerical domain error while computing {what}")
            }
            I2emError::InconsistentInputs => write!(f, "input arrays have different lengths"),
            I2emError::Cancelled => write!(f, "computation was cancelled"),
        }
    }
}

impl std::error::Error for DomainError {}

impl std::error::Error for I2emError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            I2emError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DomainError> for I2emError {
    fn from(e: DomainError) -> Self {
        I2emError::Domain(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn domain_error_is_the_source() {
        let e = I2emError::from(DomainError::IncidenceAngle(95.));
        let source = e.source().unwrap();
        assert_eq!(
            source.to_string(),
            "incidence angle must be in (0, 90) degrees, got 95"
        );
        assert!(e.to_string().ends_with(&source.to_string()));

        let boxed: Box<dyn Error> = Box::new(DomainError::SpectrumType(4));
        assert!(boxed.to_string().contains("got 4"));
        assert!(I2emError::NumericalDomain("VV backscatter").source().is_none());
    }
}
