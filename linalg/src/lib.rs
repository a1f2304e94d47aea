use matrix::Matrix;
use nalgebra::DMatrix;
use types::{c64, Error};

/// Eigen-decomposition of a real symmetric matrix.
///
/// Returns eigenvalues in ascending order with the matching eigenvectors in
/// the columns of the returned matrix.
pub fn eig(mat: &Matrix<f64>) -> (Vec<f64>, Matrix<f64>) {
    let n = mat.nrow();
    assert_eq!(n, mat.ncol(), "eig requires a square matrix");

    let m = DMatrix::<f64>::from_column_slice(n, n, mat.as_slice());

    let se = m.symmetric_eigen();

    sort_eigenpairs_f64(n, se.eigenvalues.as_slice(), se.eigenvectors.as_slice())
}

/// Eigen-decomposition of a complex Hermitian matrix.
///
/// Returns eigenvalues in ascending order with the matching eigenvectors in
/// the columns of the returned matrix. The decomposition is deterministic for
/// a given input, so repeated calls on the same matrix return bitwise-equal
/// eigenpairs.
pub fn eigh(mat: &Matrix<c64>) -> (Vec<f64>, Matrix<c64>) {
    let n = mat.nrow();
    assert_eq!(n, mat.ncol(), "eigh requires a square matrix");

    let m = DMatrix::<c64>::from_column_slice(n, n, mat.as_slice());

    let se = m.symmetric_eigen();

    sort_eigenpairs_c64(n, se.eigenvalues.as_slice(), se.eigenvectors.as_slice())
}

/// Lower Cholesky factor L of an SPD (or Hermitian positive-definite) matrix,
/// mat = L L^H.
pub fn cholesky(mat: &Matrix<c64>) -> Result<Matrix<c64>, Error> {
    let n = mat.nrow();
    assert_eq!(n, mat.ncol(), "cholesky requires a square matrix");

    let m = DMatrix::<c64>::from_column_slice(n, n, mat.as_slice());

    let chol = nalgebra::linalg::Cholesky::new(m).ok_or_else(|| {
        Error::NotPositiveDefinite(format!("Cholesky factorization failed for a {n}x{n} matrix"))
    })?;

    let l = chol.l();

    Ok(Matrix::<c64>::from_col_slice(n, n, l.as_slice()))
}

fn sort_eigenpairs_f64(n: usize, evals: &[f64], evecs: &[f64]) -> (Vec<f64>, Matrix<f64>) {
    let order = utility::argsort(evals);

    let mut sorted_vals = vec![0.0; n];
    let mut sorted_vecs = Matrix::<f64>::new(n, n);

    for (i, &j) in order.iter().enumerate() {
        sorted_vals[i] = evals[j];
        sorted_vecs.set_col(i, &evecs[j * n..(j + 1) * n]);
    }

    (sorted_vals, sorted_vecs)
}

fn sort_eigenpairs_c64(n: usize, evals: &[f64], evecs: &[c64]) -> (Vec<f64>, Matrix<c64>) {
    let order = utility::argsort(evals);

    let mut sorted_vals = vec![0.0; n];
    let mut sorted_vecs = Matrix::<c64>::new(n, n);

    for (i, &j) in order.iter().enumerate() {
        sorted_vals[i] = evals[j];
        sorted_vecs.set_col(i, &evecs[j * n..(j + 1) * n]);
    }

    (sorted_vals, sorted_vecs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use matrix::Dot;

    #[test]
    fn test_eigh_2x2() {
        let cm = Matrix::<c64>::from_row_slice(
            2,
            2,
            &[
                c64 { re: 1.0, im: 0.0 },
                c64 { re: 0.0, im: 0.01 },
                c64 { re: 0.0, im: -0.01 },
                c64 { re: 1.0, im: 0.0 },
            ],
        );

        let (e, v) = eigh(&cm);

        assert!((e[0] - 0.99).abs() < 1E-12);
        assert!((e[1] - 1.01).abs() < 1E-12);
        assert!(e[0] <= e[1]);

        // residual check: ||A v - e v|| small for each pair
        for ib in 0..2 {
            let mut av = vec![c64 { re: 0.0, im: 0.0 }; 2];
            cm.action(v.get_col(ib), &mut av);

            for i in 0..2 {
                let r = av[i] - v.get_col(ib)[i] * e[ib];
                assert!(r.norm() < 1E-12);
            }
        }
    }

    #[test]
    fn test_eigh_bitwise_reproducible() {
        let mut a = Matrix::<c64>::new(4, 4);

        for i in 0..4 {
            for j in 0..4 {
                let re = 1.0 / (1.0 + i as f64 + j as f64);
                let im = if i == j { 0.0 } else { 0.1 * (i as f64 - j as f64) };
                a[[i, j]] = c64 { re, im };
            }
        }

        let (e1, v1) = eigh(&a);
        let (e2, v2) = eigh(&a);

        assert_eq!(e1, e2);
        assert_eq!(v1.as_slice(), v2.as_slice());
    }

    #[test]
    fn test_cholesky_spd() {
        // A = B B^H + I is Hermitian positive definite
        let mut b = Matrix::<c64>::new(3, 3);

        for i in 0..3 {
            for j in 0..3 {
                b[[i, j]] = c64 {
                    re: (i + 2 * j) as f64 * 0.1,
                    im: (i as f64 - j as f64) * 0.05,
                };
            }
        }

        let mut a = b.dot(&b.adjoint());
        for i in 0..3 {
            a[[i, i]] += c64 { re: 1.0, im: 0.0 };
        }

        let l = cholesky(&a).unwrap();

        let rec = l.dot(&l.adjoint());

        for i in 0..3 {
            for j in 0..3 {
                assert!((rec[[i, j]] - a[[i, j]]).norm() < 1E-12);
            }
        }

        // strictly upper part of L is zero
        assert!(l[[0, 1]].norm() < 1E-14);
        assert!(l[[0, 2]].norm() < 1E-14);
        assert!(l[[1, 2]].norm() < 1E-14);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let mut a = Matrix::<c64>::identity(2);
        a[[1, 1]] = c64 { re: -1.0, im: 0.0 };

        let res = cholesky(&a);

        assert!(matches!(res, Err(Error::NotPositiveDefinite(_))));
    }
}
