use rayon::prelude::*;
use types::c64;

const BLOCK: usize = 1024;
const PARALLEL_MIN_LEN: usize = 8192;

/// Sum of kernel(i) over [0, N) with a two-level blocked tree.
///
/// Block-local partial sums feed a recursive pass over the partials, the
/// host-side mirror of the shared-memory device reduction. Determinism is
/// per-shape only; repartitioning reorders the additions within the
/// O(N ulp) round-off contract.
pub fn reduce<F>(n: usize, kernel: F) -> f64
where
    F: Fn(usize) -> f64 + Sync,
{
    reduce_dyn(n, &kernel)
}

fn reduce_dyn(n: usize, kernel: &(dyn Fn(usize) -> f64 + Sync)) -> f64 {
    if n == 0 {
        return 0.0;
    }

    if n < PARALLEL_MIN_LEN {
        let mut acc = 0.0;

        for i in 0..n {
            acc += kernel(i);
        }

        return acc;
    }

    let nblocks = n.div_ceil(BLOCK);

    let partials: Vec<f64> = (0..nblocks)
        .into_par_iter()
        .map(|ib| {
            let start = ib * BLOCK;
            let end = (start + BLOCK).min(n);

            let mut acc = 0.0;

            for i in start..end {
                acc += kernel(i);
            }

            acc
        })
        .collect();

    reduce_dyn(nblocks, &|i| partials[i])
}

/// Complex-accumulator variant.
pub fn reduce_c64<F>(n: usize, kernel: F) -> c64
where
    F: Fn(usize) -> c64 + Sync,
{
    let re = reduce(n, |i| kernel(i).re);
    let im = reduce(n, |i| kernel(i).im);

    c64 { re, im }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_identity_kernel_exact() {
        // sum_{i<N} i = N(N-1)/2 exactly in f64 for N up to 3^k <= 3e8
        let mut n: usize = 1;

        while n <= 300_000_000 {
            let s = reduce(n, |i| i as f64);
            let expect = (n as f64) * (n as f64 - 1.0) / 2.0;

            assert_eq!(s, expect, "N = {n}");

            n *= 3;
        }
    }

    #[test]
    fn test_reduce_empty_and_small() {
        assert_eq!(reduce(0, |_| 1.0), 0.0);
        assert_eq!(reduce(1, |_| 42.0), 42.0);
        assert_eq!(reduce(5, |i| i as f64), 10.0);
    }

    #[test]
    fn test_reduce_c64() {
        let s = reduce_c64(1000, |i| c64 {
            re: i as f64,
            im: 1.0,
        });

        assert_eq!(s.re, 499500.0);
        assert_eq!(s.im, 1000.0);
    }
}
