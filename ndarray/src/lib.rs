use ndarray_crate::{Array3 as NdArray3, ShapeBuilder};
use num::traits::Zero;
use std::ops::{Index, IndexMut};

/// First-index-fastest 3-D array.
///
/// The column-major (`.f()`) layout keeps `ix` contiguous, which is the
/// ordering the FFT layer and the restart format both assume.
#[derive(Debug, Clone, PartialEq)]
pub struct Array3<T> {
    shape: [usize; 3],
    data: NdArray3<T>,
}

impl<T: Default + Clone> Default for Array3<T> {
    fn default() -> Self {
        Self {
            shape: [0, 0, 0],
            data: NdArray3::from_elem((0, 0, 0).f(), T::default()),
        }
    }
}

impl<T: Default + Copy + Zero + std::ops::Mul<Output = T>> Array3<T> {
    pub fn new(shape: [usize; 3]) -> Array3<T> {
        Array3 {
            shape,
            data: NdArray3::from_elem((shape[0], shape[1], shape[2]).f(), T::default()),
        }
    }

    pub fn from_vec(shape: [usize; 3], data: Vec<T>) -> Array3<T> {
        let nlen = shape[0] * shape[1] * shape[2];
        assert_eq!(data.len(), nlen);

        let data = NdArray3::from_shape_vec((shape[0], shape[1], shape[2]).f(), data)
            .expect("invalid Array3 shape/data length");

        Array3 { shape, data }
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        self.data
            .as_slice_memory_order()
            .expect("Array3 storage is contiguous")
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data
            .as_slice_memory_order_mut()
            .expect("Array3 storage is contiguous")
    }

    pub fn sum(&self) -> T {
        let mut s = T::zero();

        for v in self.data.iter() {
            s = s + *v;
        }

        s
    }

    pub fn set_value(&mut self, v: T) {
        self.data.iter_mut().for_each(|x| *x = v);
    }

    pub fn scale(&mut self, f: T) {
        self.data.iter_mut().for_each(|x| *x = *x * f);
    }

    pub fn add_assign(&mut self, other: &Array3<T>) {
        assert_eq!(self.shape, other.shape);

        for (x, y) in self.as_mut_slice().iter_mut().zip(other.as_slice().iter()) {
            *x = *x + *y;
        }
    }

    /// out = a .* b, element-wise.
    pub fn hadamard_product(a: &Array3<T>, b: &Array3<T>, out: &mut Array3<T>) {
        assert_eq!(a.shape, b.shape);
        assert_eq!(a.shape, out.shape);

        for ((x, y), z) in a
            .as_slice()
            .iter()
            .zip(b.as_slice().iter())
            .zip(out.as_mut_slice().iter_mut())
        {
            *z = *x * *y;
        }
    }
}

impl<T> Index<[usize; 3]> for Array3<T> {
    type Output = T;

    #[inline]
    fn index(&self, idx: [usize; 3]) -> &T {
        &self.data[(idx[0], idx[1], idx[2])]
    }
}

impl<T> IndexMut<[usize; 3]> for Array3<T> {
    #[inline]
    fn index_mut(&mut self, idx: [usize; 3]) -> &mut T {
        &mut self.data[(idx[0], idx[1], idx[2])]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array3_layout_first_index_fastest() {
        let mut a = Array3::<f64>::new([2, 3, 4]);

        a[[1, 0, 0]] = 10.0;
        a[[0, 1, 0]] = 20.0;
        a[[0, 0, 1]] = 30.0;

        let s = a.as_slice();

        assert_eq!(s[1], 10.0);
        assert_eq!(s[2], 20.0);
        assert_eq!(s[2 * 3], 30.0);
    }

    #[test]
    fn test_array3_ops() {
        let a = Array3::<f64>::from_vec([2, 2, 1], vec![1.0, 2.0, 3.0, 4.0]);
        let b = Array3::<f64>::from_vec([2, 2, 1], vec![5.0, 6.0, 7.0, 8.0]);

        assert_eq!(a.sum(), 10.0);

        let mut out = Array3::<f64>::new([2, 2, 1]);
        Array3::hadamard_product(&a, &b, &mut out);

        assert_eq!(out.as_slice(), &[5.0, 12.0, 21.0, 32.0]);

        let mut c = a.clone();
        c.scale(2.0);
        assert_eq!(c.as_slice(), &[2.0, 4.0, 6.0, 8.0]);

        c.add_assign(&a);
        assert_eq!(c.as_slice(), &[3.0, 6.0, 9.0, 12.0]);
    }
}
