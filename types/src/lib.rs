use std::fmt;

#[allow(non_camel_case_types)]
pub type c64 = num_complex::Complex<f64>;

#[allow(non_camel_case_types)]
pub type c32 = num_complex::Complex<f32>;

/// Failure kinds shared by every crate in the workspace.
///
/// Fatal kinds (`ShapeMismatch`, `NotPositiveDefinite`, `IoFailure`,
/// `BadConfiguration`, `BadOccupations`) abort the run; `NotConverged` is
/// reported at the component boundary together with the last state and the
/// driver decides whether to abort.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    ShapeMismatch(String),
    NotPositiveDefinite(String),
    NotConverged(String),
    IoFailure(String),
    BadConfiguration(String),
    BadOccupations(String),
}

impl Error {
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ShapeMismatch(_) => "shape-mismatch",
            Error::NotPositiveDefinite(_) => "non-positive-definite",
            Error::NotConverged(_) => "not-converged",
            Error::IoFailure(_) => "io-failure",
            Error::BadConfiguration(_) => "bad-configuration",
            Error::BadOccupations(_) => "bad-occupations",
        }
    }

    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::NotConverged(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let reason = match self {
            Error::ShapeMismatch(s)
            | Error::NotPositiveDefinite(s)
            | Error::NotConverged(s)
            | Error::IoFailure(s)
            | Error::BadConfiguration(s)
            | Error::BadOccupations(s) => s,
        };

        write!(f, "{}: {}", self.kind(), reason)
    }
}

impl std::error::Error for Error {}

#[test]
fn test_error_kinds() {
    let e = Error::BadConfiguration("missing cutoff".to_string());

    assert_eq!(e.kind(), "bad-configuration");
    assert!(e.is_fatal());
    assert!(!Error::NotConverged("scf".to_string()).is_fatal());

    let msg = format!("{}", e);
    assert_eq!(msg, "bad-configuration: missing cutoff");
}

#[test]
fn test_c64_layout() {
    let z = c64 { re: 1.5, im: -0.5 };

    assert_eq!(z.re, 1.5);
    assert_eq!(z.im, -0.5);
    assert_eq!(z * z.conj(), c64 { re: 2.5, im: 0.0 });
}
