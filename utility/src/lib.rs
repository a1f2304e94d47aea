use itertools::multizip;
use rand::Rng;
use types::c64;

const ZERO_C64: c64 = c64 { re: 0.0, im: 0.0 };

/// m quantum numbers for angular momentum l: [-l, ..., l].
pub fn get_quant_num_m(l: usize) -> Vec<i32> {
    (0..2 * l + 1).map(|im| im as i32 - l as i32).collect()
}

pub fn zdot_product(u: &[c64], v: &[c64]) -> c64 {
    assert_eq!(u.len(), v.len());

    multizip((u.iter(), v.iter()))
        .map(|(x, y)| x.conj() * (*y))
        .sum()
}

pub fn zdot_product_metric(u: &[c64], v: &[c64], metric: &[f64]) -> c64 {
    assert_eq!(u.len(), v.len());
    assert_eq!(u.len(), metric.len());

    multizip((u.iter(), v.iter(), metric.iter()))
        .map(|(x, y, m)| x.conj() * (*m) * (*y))
        .sum()
}

pub fn ddot_product(u: &[f64], v: &[f64]) -> f64 {
    assert_eq!(u.len(), v.len());

    multizip((u.iter(), v.iter()))
        .map(|(x, y)| (*x) * (*y))
        .sum()
}

pub fn add_and_scale(inp: &[c64], out: &mut [c64], factor: f64) {
    assert_eq!(inp.len(), out.len());

    for (x, y) in multizip((inp.iter(), out.iter_mut())) {
        *y += *x * factor;
    }
}

pub fn add_and_zscale(inp: &[c64], out: &mut [c64], factor: c64) {
    assert_eq!(inp.len(), out.len());

    for (x, y) in multizip((inp.iter(), out.iter_mut())) {
        *y += *x * factor;
    }
}

pub fn hadamard_product(a: &[c64], b: &[c64], c: &mut [c64]) {
    for (x, y, z) in multizip((a.iter(), b.iter(), c.iter_mut())) {
        *z = x * y;
    }
}

pub fn vec_norm(v: &[c64]) -> f64 {
    v.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt()
}

pub fn normalize_vector_c64(v: &mut [c64]) {
    let s = vec_norm(v);

    v.iter_mut().for_each(|x| *x /= s);
}

pub fn make_normalized_rand_vector(v: &mut [c64]) {
    let mut rng = rand::thread_rng();

    for y in v.iter_mut() {
        let t: f64 = rng.gen_range(0.1..1.0);
        let theta: f64 = rng.gen_range(0.0..2.0 * std::f64::consts::PI);

        *y = c64 {
            re: t * theta.cos(),
            im: t * theta.sin(),
        };
    }

    normalize_vector_c64(v);
}

pub fn argsort<T: PartialOrd>(v: &[T]) -> Vec<usize> {
    let mut idx = (0..v.len()).collect::<Vec<_>>();

    idx.sort_by(|&i, &j| v[i].partial_cmp(&v[j]).unwrap());

    idx
}

/// Signed FFT frequency index for a length-n axis: 0, 1, ..., n/2, -(n-1)/2, ..., -1.
#[inline]
pub fn fft_freq_index(i: usize, n: usize) -> i32 {
    if i <= n / 2 {
        i as i32
    } else {
        i as i32 - n as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quant_num_m() {
        assert_eq!(get_quant_num_m(0), vec![0]);
        assert_eq!(get_quant_num_m(2), vec![-2, -1, 0, 1, 2]);
    }

    #[test]
    fn test_zdot_conjugates_left() {
        let u = vec![c64 { re: 0.0, im: 1.0 }; 3];
        let v = vec![c64 { re: 2.0, im: 0.0 }; 3];

        let d = zdot_product(&u, &v);

        assert!((d.re - 0.0).abs() < 1E-14);
        assert!((d.im + 6.0).abs() < 1E-14);
    }

    #[test]
    fn test_normalized_rand_vector() {
        let mut v = vec![ZERO_C64; 64];

        make_normalized_rand_vector(&mut v);

        assert!((vec_norm(&v) - 1.0).abs() < 1E-12);
    }

    #[test]
    fn test_argsort() {
        let v = [3.0, 1.0, 2.0];

        assert_eq!(argsort(&v), vec![1, 2, 0]);
    }

    #[test]
    fn test_fft_freq_index() {
        assert_eq!(fft_freq_index(0, 6), 0);
        assert_eq!(fft_freq_index(3, 6), 3);
        assert_eq!(fft_freq_index(4, 6), -2);
        assert_eq!(fft_freq_index(5, 6), -1);
        assert_eq!(fft_freq_index(4, 7), -3);
    }
}
