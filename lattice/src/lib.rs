use gwconsts::*;
use matrix::Matrix;
use types::Error;
use vector3::Vector3f64;

use std::{f64::consts, fmt};

/// Three lattice vectors stored as the columns of a 3x3 matrix.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Lattice {
    data: Matrix<f64>,
}

impl Lattice {
    pub fn new(a: &[f64], b: &[f64], c: &[f64]) -> Lattice {
        let mut data = Matrix::<f64>::new(3, 3);

        data.set_col(0, a);
        data.set_col(1, b);
        data.set_col(2, c);

        Lattice { data }
    }

    pub fn cubic(l: f64) -> Lattice {
        Lattice::new(&[l, 0.0, 0.0], &[0.0, l, 0.0], &[0.0, 0.0, l])
    }

    pub fn as_matrix(&self) -> &Matrix<f64> {
        &self.data
    }

    pub fn get_metric_tensor(&self) -> Matrix<f64> {
        let mut g = Matrix::<f64>::new(3, 3);

        let v = [self.get_vector_a(), self.get_vector_b(), self.get_vector_c()];

        for i in 0..3 {
            for j in 0..3 {
                g[[i, j]] = v[i].dot_product(&v[j]);
            }
        }

        g
    }

    // ( a x b ) . c
    pub fn volume(&self) -> f64 {
        let a = self.get_vector_a();
        let b = self.get_vector_b();
        let c = self.get_vector_c();

        a.cross_product(&b).dot_product(&c)
    }

    // ra = 2 pi (b x c) / volume, and cyclic
    pub fn reciprocal(&self) -> Lattice {
        let factor = 2.0 * consts::PI / self.volume();

        let a = self.get_vector_a();
        let b = self.get_vector_b();
        let c = self.get_vector_c();

        let ra = b.cross_product(&c) * factor;
        let rb = c.cross_product(&a) * factor;
        let rc = a.cross_product(&b) * factor;

        Lattice::new(&ra.to_vec(), &rb.to_vec(), &rc.to_vec())
    }

    pub fn get_vector_a(&self) -> Vector3f64 {
        let v = self.data.get_col(0);
        Vector3f64::new(v[0], v[1], v[2])
    }

    pub fn get_vector_b(&self) -> Vector3f64 {
        let v = self.data.get_col(1);
        Vector3f64::new(v[0], v[1], v[2])
    }

    pub fn get_vector_c(&self) -> Vector3f64 {
        let v = self.data.get_col(2);
        Vector3f64::new(v[0], v[1], v[2])
    }

    pub fn scaled_by(&mut self, f: f64) {
        self.data.as_mut_slice().iter_mut().for_each(|v| *v *= f);
    }

    pub fn frac_to_cart(&self, pos_f: &[f64], pos_c: &mut [f64]) {
        for i in 0..3 {
            pos_c[i] = 0.0;

            for j in 0..3 {
                pos_c[i] += self.data[[i, j]] * pos_f[j];
            }
        }
    }

    pub fn cart_to_frac(&self, pos_c: &[f64], pos_f: &mut [f64]) {
        let mut mat = self.data.clone();

        mat.inv();

        for i in 0..3 {
            pos_f[i] = 0.0;

            for j in 0..3 {
                pos_f[i] += mat[[i, j]] * pos_c[j];
            }
        }
    }
}

impl fmt::Display for Lattice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let a = self.get_vector_a();
        let b = self.get_vector_b();
        let c = self.get_vector_c();

        write!(
            f,
            "{}\n{:25.16}\t{:25.16}\t{:25.16}\n{:25.16}\t{:25.16}\t{:25.16}\n{:25.16}\t{:25.16}\t{:25.16}",
            "Lattice", a.x, a.y, a.z, b.x, b.y, b.z, c.x, c.y, c.z
        )
    }
}

/// A simulation cell: lattice vectors plus the number of periodic dimensions
/// (0 finite, 2 slab, 3 bulk). Periodic dimensions come first.
///
/// The cell is an immutable-by-value descriptor; fields, grids and orbital
/// sets copy it instead of sharing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    latt: Lattice,
    periodic_dimensions: usize,
}

impl Cell {
    pub fn new(a: &[f64], b: &[f64], c: &[f64], periodic_dimensions: usize) -> Result<Cell, Error> {
        if periodic_dimensions > 3 {
            return Err(Error::BadConfiguration(format!(
                "periodicity must be 0..=3, got {periodic_dimensions}"
            )));
        }

        let latt = Lattice::new(a, b, c);

        if latt.volume() <= EPS12 {
            return Err(Error::BadConfiguration(
                "lattice vectors must be linearly independent with positive volume".to_string(),
            ));
        }

        Ok(Cell {
            latt,
            periodic_dimensions,
        })
    }

    pub fn cubic(l: f64, periodic_dimensions: usize) -> Result<Cell, Error> {
        Cell::new(
            &[l, 0.0, 0.0],
            &[0.0, l, 0.0],
            &[0.0, 0.0, l],
            periodic_dimensions,
        )
    }

    pub fn latt(&self) -> &Lattice {
        &self.latt
    }

    pub fn periodic_dimensions(&self) -> usize {
        self.periodic_dimensions
    }

    pub fn volume(&self) -> f64 {
        self.latt.volume()
    }

    pub fn reciprocal(&self) -> Lattice {
        self.latt.reciprocal()
    }

    /// Contravariant (fractional) -> cartesian.
    pub fn frac_to_cart(&self, s: Vector3f64) -> Vector3f64 {
        let mut out = [0.0; 3];

        self.latt.frac_to_cart(s.as_slice(), &mut out);

        Vector3f64::new(out[0], out[1], out[2])
    }

    /// Cartesian -> contravariant (fractional).
    pub fn cart_to_frac(&self, r: Vector3f64) -> Vector3f64 {
        let mut out = [0.0; 3];

        self.latt.cart_to_frac(r.as_slice(), &mut out);

        Vector3f64::new(out[0], out[1], out[2])
    }

    /// Covariant components of a cartesian vector: projections on the
    /// lattice vectors (metric-lowered fractional coordinates).
    pub fn cart_to_covariant(&self, r: Vector3f64) -> Vector3f64 {
        Vector3f64::new(
            self.latt.get_vector_a().dot_product(&r),
            self.latt.get_vector_b().dot_product(&r),
            self.latt.get_vector_c().dot_product(&r),
        )
    }

    /// Minimum-image displacement along the periodic dimensions.
    pub fn wrap_displacement(&self, d: Vector3f64) -> Vector3f64 {
        let mut s = self.cart_to_frac(d);

        let sm = s.as_mut_slice();

        for dim in 0..self.periodic_dimensions {
            sm[dim] -= sm[dim].round();
        }

        self.frac_to_cart(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_reciprocal_duality() {
        let latt = Lattice::new(&[1.0, 0.1, 0.0], &[0.0, 1.0, 0.2], &[0.0, 0.3, 1.0]);
        let blatt = latt.reciprocal();

        // a_i . b_j = 2 pi delta_ij
        let av = [latt.get_vector_a(), latt.get_vector_b(), latt.get_vector_c()];
        let bv = [
            blatt.get_vector_a(),
            blatt.get_vector_b(),
            blatt.get_vector_c(),
        ];

        for i in 0..3 {
            for j in 0..3 {
                let expect = if i == j { 2.0 * std::f64::consts::PI } else { 0.0 };
                assert!((av[i].dot_product(&bv[j]) - expect).abs() < 1E-12);
            }
        }
    }

    #[test]
    fn test_frac_cart_roundtrip() {
        let latt = Lattice::new(&[3.0, 0.0, 0.0], &[1.0, 2.5, 0.0], &[0.0, 0.4, 4.0]);

        let pos_f = [0.2, 0.3, 0.4];
        let mut pos_c = [0.0; 3];
        let mut back = [0.0; 3];

        latt.frac_to_cart(&pos_f, &mut pos_c);
        latt.cart_to_frac(&pos_c, &mut back);

        for i in 0..3 {
            assert!((pos_f[i] - back[i]).abs() < 1E-12);
        }
    }

    #[test]
    fn test_cell_validation() {
        assert!(Cell::cubic(10.0, 3).is_ok());
        assert!(Cell::cubic(10.0, 4).is_err());

        // coplanar vectors
        let bad = Cell::new(
            &[1.0, 0.0, 0.0],
            &[2.0, 0.0, 0.0],
            &[0.0, 0.0, 1.0],
            3,
        );
        assert!(matches!(bad, Err(Error::BadConfiguration(_))));
    }

    #[test]
    fn test_minimum_image() {
        let cell = Cell::cubic(10.0, 3).unwrap();

        let d = cell.wrap_displacement(Vector3f64::new(9.0, -8.0, 4.0));

        assert!((d.x + 1.0).abs() < 1E-12);
        assert!((d.y - 2.0).abs() < 1E-12);
        assert!((d.z - 4.0).abs() < 1E-12);
    }

    #[test]
    fn test_finite_cell_does_not_wrap() {
        let cell = Cell::cubic(10.0, 0).unwrap();

        let d = cell.wrap_displacement(Vector3f64::new(9.0, -8.0, 4.0));

        assert!((d.x - 9.0).abs() < 1E-12);
        assert!((d.y + 8.0).abs() < 1E-12);
    }
}
