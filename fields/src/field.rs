use crate::Layout;
use ndarray::Array3;
use num::traits::Zero;
use types::{c64, Error};
use vector3::Vector3f64;

/// One function over the grid, stored as the local (n1 x n2 x nz_local)
/// slab, first index fastest.
#[derive(Clone)]
pub struct Field<T> {
    layout: Layout,
    data: Array3<T>,
}

impl<T: Copy + Default + Zero + std::ops::Mul<Output = T>> Field<T> {
    pub fn new(layout: &Layout) -> Field<T> {
        let shape = [
            layout.grid().get_n1(),
            layout.grid().get_n2(),
            layout.local_nz(),
        ];

        Field {
            layout: layout.clone(),
            data: Array3::new(shape),
        }
    }

    pub fn from_fn(layout: &Layout, mut f: impl FnMut(Vector3f64) -> T) -> Field<T> {
        let mut field = Field::new(layout);

        layout.for_each_local_point(|ip, ix, iy, iz| {
            field.data.as_mut_slice()[ip] = f(layout.grid().rvector(ix, iy, iz));
        });

        field
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        self.data.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data.as_mut_slice()
    }

    pub fn cubic(&self) -> &Array3<T> {
        &self.data
    }

    pub fn set_value(&mut self, v: T) {
        self.data.set_value(v);
    }

    /// Same layout, fresh zeroed storage.
    pub fn skeleton(&self) -> Field<T> {
        Field::new(&self.layout)
    }

    pub fn matches(&self, other: &Field<T>) -> Result<(), Error> {
        self.layout.matches(&other.layout)
    }
}

impl Field<f64> {
    pub fn scale(&mut self, f: f64) {
        self.data.as_mut_slice().iter_mut().for_each(|x| *x *= f);
    }

    pub fn add_assign(&mut self, other: &Field<f64>) {
        assert_eq!(self.data.len(), other.data.len());

        for (x, y) in self.data.as_mut_slice().iter_mut().zip(other.data.as_slice().iter()) {
            *x += *y;
        }
    }

    pub fn axpy(&mut self, alpha: f64, other: &Field<f64>) {
        assert_eq!(self.data.len(), other.data.len());

        for (x, y) in self.data.as_mut_slice().iter_mut().zip(other.data.as_slice().iter()) {
            *x += alpha * *y;
        }
    }

    /// \int f dV over the whole grid (all-reduced over the domain axis).
    pub fn integral(&self) -> f64 {
        let local: f64 = self.data.as_slice().iter().sum();

        self.layout.domain().sum_f64(local * self.layout.grid().volume_element())
    }

    /// \int f g dV.
    pub fn integral_product(&self, other: &Field<f64>) -> f64 {
        assert_eq!(self.data.len(), other.data.len());

        let local: f64 = self
            .data
            .as_slice()
            .iter()
            .zip(other.data.as_slice().iter())
            .map(|(a, b)| a * b)
            .sum();

        self.layout.domain().sum_f64(local * self.layout.grid().volume_element())
    }

    pub fn to_complex(&self) -> Field<c64> {
        let mut out = Field::<c64>::new(&self.layout);

        for (z, &x) in out.data.as_mut_slice().iter_mut().zip(self.data.as_slice().iter()) {
            *z = c64 { re: x, im: 0.0 };
        }

        out
    }
}

impl Field<c64> {
    pub fn scale(&mut self, f: f64) {
        self.data.as_mut_slice().iter_mut().for_each(|x| *x *= f);
    }

    pub fn zscale(&mut self, f: c64) {
        self.data.as_mut_slice().iter_mut().for_each(|x| *x *= f);
    }

    pub fn add_assign(&mut self, other: &Field<c64>) {
        assert_eq!(self.data.len(), other.data.len());

        for (x, y) in self.data.as_mut_slice().iter_mut().zip(other.data.as_slice().iter()) {
            *x += *y;
        }
    }

    /// \int f dV.
    pub fn integral(&self) -> c64 {
        let mut local: c64 = self.data.as_slice().iter().sum();
        local *= self.layout.grid().volume_element();

        let mut buf = [local];
        self.layout.domain().all_reduce_sum_c64(&mut buf);

        buf[0]
    }

    pub fn real_part(&self) -> Field<f64> {
        let mut out = Field::<f64>::new(&self.layout);

        for (x, z) in out.data.as_mut_slice().iter_mut().zip(self.data.as_slice().iter()) {
            *x = z.re;
        }

        out
    }
}
