//! Collective reductions and dense subspace operations on orbital sets.

mod reduce;
pub use reduce::{reduce, reduce_c64};

use fields::OrbitalSet;
use gwmpi::Comm;
use matrix::Matrix;
use types::{c64, Error};

/// Overlap matrix M[i][j] = <phi_i | psi_j> with the dV metric, all-reduced
/// over the domain axis.
///
/// Dense subspace matrices need the full state range on each rank; runs with
/// a parallel states axis keep whole (spin, k) blocks per rank instead of
/// splitting one block, so within a block the states axis is serial.
pub fn overlap(a: &OrbitalSet, b: &OrbitalSet) -> Result<Matrix<c64>, Error> {
    a.matches(b)?;

    assert_eq!(
        a.layout().states().size(),
        1,
        "overlap requires a states-serial orbital set"
    );

    let n = a.num_states();
    let dv = a.layout().grid().volume_element();

    let mut m = Matrix::<c64>::new(n, n);

    for j in 0..n {
        let bj = b.state(j);

        for i in 0..n {
            m[[i, j]] = utility::zdot_product(a.state(i), bj) * dv;
        }
    }

    a.layout().domain().all_reduce_sum_c64(m.as_mut_slice());

    Ok(m)
}

/// Diagonal of the overlap: <phi_i | psi_i> dV.
pub fn overlap_diagonal(a: &OrbitalSet, b: &OrbitalSet) -> Result<Vec<c64>, Error> {
    a.matches(b)?;

    let dv = a.layout().grid().volume_element();

    let mut d: Vec<c64> = (0..a.local_states())
        .map(|j| utility::zdot_product(a.state(j), b.state(j)) * dv)
        .collect();

    a.layout().domain().all_reduce_sum_c64(&mut d);

    Ok(d)
}

/// target_j += factor * coef_j * phi_j.
pub fn shift(factor: f64, coefs: &[c64], phi: &OrbitalSet, target: &mut OrbitalSet) {
    assert_eq!(coefs.len(), phi.local_states());

    for j in 0..phi.local_states() {
        let c = coefs[j] * factor;

        utility::add_and_zscale(phi.state(j), target.state_mut(j), c);
    }
}

/// In-place Cholesky orthonormalization: phi <- phi L^{-H} with
/// <phi|phi> = L L^H. Fails with non-positive-definite when the set is
/// linearly dependent.
pub fn orthonormalize(phi: &mut OrbitalSet) -> Result<(), Error> {
    let m = overlap(phi, phi)?;

    let l = linalg::cholesky(&m)?;

    solve_lower_adjoint(&l, phi);

    Ok(())
}

/// phi <- phi U.
pub fn rotate(u: &Matrix<c64>, phi: &mut OrbitalSet) {
    let n = phi.num_states();

    assert_eq!(u.nrow(), n);
    assert_eq!(u.ncol(), n);

    let old = phi.clone();

    for j in 0..n {
        let col = phi.state_mut(j);
        col.iter_mut().for_each(|v| *v = c64 { re: 0.0, im: 0.0 });

        for k in 0..n {
            utility::add_and_zscale(old.state(k), col, u[[k, j]]);
        }
    }
}

/// xi <- xi L^{-H} for a lower-triangular L; the triangular rotation the ACE
/// construction applies after the Cholesky factorization.
pub fn rotate_trs(l: &Matrix<c64>, xi: &mut OrbitalSet) {
    solve_lower_adjoint(l, xi);
}

/// Column-by-column forward substitution of phi <- phi (L^H)^{-1}:
/// phi_j <- (phi_j - sum_{k<j} conj(L[j][k]) phi_k) / L[j][j].
fn solve_lower_adjoint(l: &Matrix<c64>, phi: &mut OrbitalSet) {
    let n = phi.num_states();

    for j in 0..n {
        for k in 0..j {
            let f = -l[[j, k]].conj();
            let (head, tail) = split_two_cols(phi, k, j);

            utility::add_and_zscale(head, tail, f);
        }

        let d = 1.0 / l[[j, j]].re;

        phi.state_mut(j).iter_mut().for_each(|v| *v *= d);
    }
}

/// Disjoint (&col_k, &mut col_j) views, k < j.
fn split_two_cols(phi: &mut OrbitalSet, k: usize, j: usize) -> (&[c64], &mut [c64]) {
    assert!(k < j);

    let npoints = phi.layout().local_len();
    let data = phi.matrix_mut().as_mut_slice();

    let (left, right) = data.split_at_mut(j * npoints);

    (
        &left[k * npoints..(k + 1) * npoints],
        &mut right[..npoints],
    )
}

/// Dense Hermitian diagonalization with identical eigenpairs on every rank:
/// the designated root factors, everyone else receives the broadcast.
pub fn diagonalize(comm: &Comm, m: &Matrix<c64>) -> (Vec<f64>, Matrix<c64>) {
    let n = m.nrow();

    let mut evals = vec![0.0; n];
    let mut evecs = Matrix::<c64>::new(n, n);

    if comm.rank() == 0 {
        let (e, v) = linalg::eigh(m);

        evals.copy_from_slice(&e);
        evecs.assign(&v);
    }

    comm.broadcast_f64(&mut evals, 0);
    comm.broadcast_c64(evecs.as_mut_slice(), 0);

    (evals, evecs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fields::Layout;
    use grid::RealGrid;
    use lattice::Cell;
    use vector3::Vector3f64;

    fn small_set(nstates: usize) -> OrbitalSet {
        let cell = Cell::cubic(6.0, 3).unwrap();
        let layout = Layout::serial(&RealGrid::with_sizes(&cell, [6, 6, 6]));

        OrbitalSet::new(&layout, nstates, Vector3f64::zeros(), 0)
    }

    #[test]
    fn test_orthonormalize_invariant() {
        let mut phi = small_set(6);
        phi.randomize();

        orthonormalize(&mut phi).unwrap();

        let m = overlap(&phi, &phi).unwrap();

        for i in 0..6 {
            for j in 0..6 {
                let expect = if i == j { 1.0 } else { 0.0 };
                assert!(
                    (m[[i, j]].re - expect).abs() < 1E-10,
                    "overlap[{i}][{j}] = {}",
                    m[[i, j]]
                );
                assert!(m[[i, j]].im.abs() < 1E-10);
            }
        }
    }

    #[test]
    fn test_shift_subtracts_component() {
        let mut phi = small_set(2);
        phi.randomize();
        orthonormalize(&mut phi).unwrap();

        let mut target = phi.clone();
        let coefs = overlap_diagonal(&phi, &target).unwrap();

        shift(-1.0, &coefs, &phi, &mut target);

        let res = overlap_diagonal(&target, &target).unwrap();

        for r in res {
            assert!(r.norm() < 1E-10);
        }
    }

    #[test]
    fn test_rotate_with_identity() {
        let mut phi = small_set(3);
        phi.randomize();

        let before = phi.clone();
        rotate(&Matrix::<c64>::identity(3), &mut phi);

        for j in 0..3 {
            for (a, b) in phi.state(j).iter().zip(before.state(j).iter()) {
                assert!((*a - *b).norm() < 1E-14);
            }
        }
    }

    #[test]
    fn test_diagonalize_broadcast_consistency() {
        let comm = gwmpi::ProcessGrid::serial();

        let mut m = Matrix::<c64>::new(3, 3);
        for i in 0..3 {
            for j in 0..3 {
                m[[i, j]] = c64 {
                    re: (i * j) as f64 + if i == j { 2.0 } else { 0.5 },
                    im: 0.1 * (i as f64 - j as f64),
                };
            }
        }

        let (e1, v1) = diagonalize(comm.full(), &m);
        let (e2, v2) = diagonalize(comm.full(), &m);

        assert_eq!(e1, e2);
        assert_eq!(v1.as_slice(), v2.as_slice());

        assert!(e1[0] <= e1[1] && e1[1] <= e1[2]);
    }
}
