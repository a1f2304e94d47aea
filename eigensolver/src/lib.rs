//! Iterative eigensolvers for the Kohn-Sham subspace.
//!
//! The refinement pass is a steepest descent with a per-state quadratic line
//! search; the subspace pass builds phi^H H phi, diagonalizes it on the root
//! rank and rotates the orbitals into the eigenbasis.

use fields::OrbitalSet;
use gwconsts::*;
use matrix::Matrix;
use types::{c64, Error};

pub type HamOnSet<'a> = dyn FnMut(&OrbitalSet) -> Result<OrbitalSet, Error> + 'a;
pub type PrecOnSet<'a> = dyn FnMut(&mut OrbitalSet) + 'a;

/// A few steepest-descent steps per state, followed by orthonormalization.
///
/// Each step minimizes the Rayleigh quotient along the preconditioned
/// residual direction; the optimal step solves a 2x2 quadratic in the
/// (phi, residual) plane. The preconditioner damps the high-kinetic part of
/// the residual; pass a no-op closure to run unpreconditioned.
pub fn steepest_descent(
    ham: &mut HamOnSet,
    prec: &mut PrecOnSet,
    phi: &mut OrbitalSet,
    num_steps: usize,
) -> Result<(), Error> {
    let nst = phi.local_states();

    let mut hphi = ham(phi)?;

    for istep in 0..num_steps {
        let mut residual = hphi.clone();

        let eigenvalues = operations::overlap_diagonal(phi, &hphi)?;
        let norms = operations::overlap_diagonal(phi, phi)?;

        let evnorm: Vec<c64> = eigenvalues
            .iter()
            .zip(norms.iter())
            .map(|(e, n)| e / n.re)
            .collect();

        operations::shift(-1.0, &evnorm, phi, &mut residual);

        prec(&mut residual);

        let hresidual = ham(&residual)?;

        let m0 = operations::overlap_diagonal(&residual, &residual)?;
        let m1 = operations::overlap_diagonal(phi, &residual)?;
        let m2 = operations::overlap_diagonal(&residual, &hresidual)?;
        let m3 = operations::overlap_diagonal(phi, &hresidual)?;

        let mut lambda = vec![0.0; nst];

        for ist in 0..nst {
            let ca = (m0[ist] * m3[ist] - m2[ist] * m1[ist]).re;
            let cb = (norms[ist].re * m2[ist] - eigenvalues[ist] * m0[ist]).re;
            let cc = (eigenvalues[ist] * m1[ist] - m3[ist] * norms[ist].re).re;

            let disc = (cb * cb - 4.0 * ca * cc).max(0.0);
            let den = cb + disc.sqrt();

            // a vanishing denominator means the state is already converged
            lambda[ist] = if den.abs() < EPS14 { 0.0 } else { 2.0 * cc / den };
        }

        for ist in 0..nst {
            let l = lambda[ist];

            utility::add_and_scale(residual.state(ist), phi.state_mut(ist), l);

            if istep != num_steps - 1 {
                utility::add_and_scale(hresidual.state(ist), hphi.state_mut(ist), l);
            }
        }
    }

    operations::orthonormalize(phi)?;

    Ok(())
}

/// Build and diagonalize phi^H H phi, rotate phi into the eigenbasis and
/// return the subspace eigenvalues in ascending order.
pub fn subspace_diagonalize(ham: &mut HamOnSet, phi: &mut OrbitalSet) -> Result<Vec<f64>, Error> {
    let hphi = ham(phi)?;

    let mut m = operations::overlap(phi, &hphi)?;

    hermitize(&mut m);

    let comm = phi.layout().domain().clone();
    let (evals, evecs) = operations::diagonalize(&comm, &m);

    operations::rotate(&evecs, phi);

    Ok(evals)
}

/// Average away the round-off asymmetry of an almost-Hermitian matrix.
fn hermitize(m: &mut Matrix<c64>) {
    let n = m.nrow();

    for i in 0..n {
        for j in 0..i {
            let avg = 0.5 * (m[[i, j]] + m[[j, i]].conj());

            m[[i, j]] = avg;
            m[[j, i]] = avg.conj();
        }

        m[[i, i]] = c64 {
            re: m[[i, i]].re,
            im: 0.0,
        };
    }
}
