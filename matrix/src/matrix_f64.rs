use crate::{Dot, Matrix};

use nalgebra::DMatrix;

impl Matrix<f64> {
    pub fn identity(n: usize) -> Matrix<f64> {
        let mut mat = Matrix::<f64>::new(n, n);

        for i in 0..n {
            mat[[i, i]] = 1.0;
        }

        mat
    }

    pub fn transpose(&self) -> Matrix<f64> {
        let mut t = Matrix::<f64>::new(self.ncol, self.nrow);

        for j in 0..self.ncol {
            for i in 0..self.nrow {
                t[[j, i]] = self[[i, j]];
            }
        }

        t
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn scale(&mut self, f: f64) {
        self.data.iter_mut().for_each(|v| *v *= f);
    }

    pub fn inv(&mut self) {
        assert_eq!(self.nrow, self.ncol, "Matrix::inv requires a square matrix");

        let mat = DMatrix::<f64>::from_column_slice(self.nrow, self.ncol, self.as_slice());

        let inv = mat
            .try_inverse()
            .expect("Matrix::inv on a singular f64 matrix");

        self.data.copy_from_slice(inv.as_slice());
    }
}

impl Dot for Matrix<f64> {
    type Output = Matrix<f64>;

    fn dot(&self, rhs: &Matrix<f64>) -> Matrix<f64> {
        assert_eq!(self.ncol, rhs.nrow);

        let mut out = Matrix::<f64>::new(self.nrow, rhs.ncol);

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
