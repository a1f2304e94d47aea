use crate::{Dot, Matrix};
use gwconsts::*;
use types::c64;

use nalgebra::DMatrix;
use num_traits::Zero;

impl Matrix<c64> {
    pub fn identity(n: usize) -> Matrix<c64> {
        let mut mat = Matrix::<c64>::new(n, n);

        for v in mat.as_mut_slice() {
            *v = c64::zero();
        }

        for i in 0..n {
            mat[[i, i]] = ONE_C64;
        }

        mat
    }

    pub fn adjoint(&self) -> Matrix<c64> {
        let mut t = Matrix::<c64>::new(self.ncol, self.nrow);

        for j in 0..self.ncol {
            for i in 0..self.nrow {
                t[[j, i]] = self[[i, j]].conj();
            }
        }

        t
    }

    pub fn diagonal(&self) -> Vec<c64> {
        let n = self.nrow.min(self.ncol);

        (0..n).map(|i| self[[i, i]]).collect()
    }

    pub fn sum(&self) -> c64 {
        self.data.iter().sum()
    }

    pub fn scale(&mut self, f: f64) {
        self.data.iter_mut().for_each(|v| *v *= f);
    }

    pub fn zscale(&mut self, f: c64) {
        self.data.iter_mut().for_each(|v| *v *= f);
    }

    /// vout = M * vin
    pub fn action(&self, vin: &[c64], vout: &mut [c64]) {
        assert_eq!(vin.len(), self.ncol);
        assert_eq!(vout.len(), self.nrow);

        vout.iter_mut().for_each(|x| *x = c64::zero());

        for i in 0..self.ncol {
            let col = self.get_col(i);
            let v = vin[i];

            for j in 0..self.nrow {
                vout[j] += col[j] * v;
            }
        }
    }

    pub fn inv(&mut self) {
        assert_eq!(self.nrow, self.ncol, "Matrix::inv requires a square matrix");

        let mat = DMatrix::<c64>::from_column_slice(self.nrow, self.ncol, self.as_slice());

        if let Some(inv) = mat.try_inverse() {
            self.data.copy_from_slice(inv.as_slice());
        } else {
            self.pinv();
        }
    }

    pub fn pinv(&mut self) {
        assert_eq!(
            self.nrow, self.ncol,
            "Matrix::pinv requires a square matrix"
        );

        let mat = DMatrix::<c64>::from_column_slice(self.nrow, self.ncol, self.as_slice());
        let pinv = mat
            .svd(true, true)
            .pseudo_inverse(EPS30)
            .expect("nalgebra SVD pseudo-inverse failed");

        self.data.copy_from_slice(pinv.as_slice());
    }
}

impl Dot for Matrix<c64> {
    type Output = Matrix<c64>;

    fn dot(&self, rhs: &Matrix<c64>) -> Matrix<c64> {
        assert_eq!(self.ncol, rhs.nrow);

        let mut out = Matrix::<c64>::new(self.nrow, rhs.ncol);

        for j in 0..rhs.ncol {
            let bcol = rhs.get_col(j);
            let ocol = out.get_mut_col(j);

            for (k, &b) in bcol.iter().enumerate() {
                let acol = &self.data[k * self.nrow..(k + 1) * self.nrow];

                for i in 0..acol.len() {
                    ocol[i] += acol[i] * b;
                }
            }
        }

        out
    }
}
