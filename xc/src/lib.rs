//! Semi-local exchange-correlation functionals.
//!
//! Functionals evaluate pointwise on (channel densities, contracted
//! gradients) and return the energy density per unit volume together with
//! its density and sigma derivatives; the term assembly in `term` turns the
//! sigma derivatives into the divergence part of the potential by FFT
//! differentiation.

mod b88;
mod ldapz;
mod pbe;
mod term;

pub use term::XcTerm;

use types::Error;

/// Pointwise functional output: e is the energy density per unit volume,
/// dedn the per-channel density derivatives, dedsigma the derivatives with
/// respect to sigma = |grad n|^2 contractions (uu, ud, dd).
#[derive(Debug, Clone, Copy, Default)]
pub struct PointXc {
    pub e: f64,
    pub dedn: [f64; 2],
    pub dedsigma: [f64; 3],
}

pub trait XcFunctional: Send + Sync {
    fn requires_gradient(&self) -> bool {
        false
    }

    /// Supported channel counts (1 and/or 2).
    fn supports_nspin(&self, nspin: usize) -> bool;

    /// rho: up/down channel densities (rho[1] ignored for nspin 1).
    /// sigma: gradient contractions (ignored for LDA).
    fn evaluate(&self, rho: [f64; 2], sigma: [f64; 3], nspin: usize) -> PointXc;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XcKind {
    SlaterX,
    PzC,
    PbeX,
    RpbeX,
    PbeC,
    B88X,
}

pub fn functional(kind: XcKind) -> Box<dyn XcFunctional> {
    match kind {
        XcKind::SlaterX => Box::new(ldapz::SlaterX),
        XcKind::PzC => Box::new(ldapz::PzC),
        XcKind::PbeX => Box::new(pbe::PbeX { rpbe: false }),
        XcKind::RpbeX => Box::new(pbe::PbeX { rpbe: true }),
        XcKind::PbeC => Box::new(pbe::PbeC),
        XcKind::B88X => Box::new(b88::B88X),
    }
}

/// One weighted functional in a theory's exchange or correlation blend.
pub struct WeightedFunctional {
    pub coefficient: f64,
    pub functional: Box<dyn XcFunctional>,
}

pub fn blend(parts: &[(f64, XcKind)]) -> Vec<WeightedFunctional> {
    parts
        .iter()
        .map(|&(coefficient, kind)| WeightedFunctional {
            coefficient,
            functional: functional(kind),
        })
        .collect()
}

pub(crate) fn check_nspin(
    parts: &[WeightedFunctional],
    nspin: usize,
) -> Result<(), Error> {
    for p in parts {
        if !p.functional.supports_nspin(nspin) {
            return Err(Error::BadConfiguration(format!(
                "selected functional does not support {nspin} spin channels"
            )));
        }
    }

    Ok(())
}
