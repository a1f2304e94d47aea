/// Composite Simpson on a uniform grid; trailing 3/8 rule when the sample
/// count is even.
pub fn simpson(y: &[f64], dx: f64) -> f64 {
    let ntot = y.len();
    assert!(ntot >= 4, "simpson needs at least 4 samples");

    let n = if ntot % 2 == 0 { ntot - 3 } else { ntot };

    let mut s = 0.0;

    for i in (0..n - 2).step_by(2) {
        s += y[i] + 4.0 * y[i + 1] + y[i + 2];
    }

    s /= 3.0;

    if ntot % 2 == 0 {
        s += 0.375 * (y[ntot - 4] + 3.0 * y[ntot - 3] + 3.0 * y[ntot - 2] + y[ntot - 1]);
    }

    s * dx
}

/// Simpson on a non-uniform radial mesh given the local spacing table
/// rab[i] = dr/di.
pub fn simpson_rab(y: &[f64], rab: &[f64]) -> f64 {
    assert_eq!(y.len(), rab.len());

    let scaled: Vec<f64> = y.iter().zip(rab.iter()).map(|(a, b)| a * b).collect();

    simpson(&scaled, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simpson_polynomial() {
        // \int_0^1 x^2 dx = 1/3, Simpson is exact for cubics
        let n = 101;
        let dx = 1.0 / (n as f64 - 1.0);
        let y: Vec<f64> = (0..n).map(|i| (i as f64 * dx).powi(2)).collect();

        assert!((simpson(&y, dx) - 1.0 / 3.0).abs() < 1E-14);
    }

    #[test]
    fn test_simpson_even_count() {
        let n = 100;
        let dx = 1.0 / (n as f64 - 1.0);
        let y: Vec<f64> = (0..n).map(|i| (i as f64 * dx).powi(3)).collect();

        assert!((simpson(&y, dx) - 0.25).abs() < 1E-10);
    }

    #[test]
    fn test_simpson_rab_logarithmic_mesh() {
        // r(i) = r0 e^{a i}, rab(i) = a r(i); \int_0^{rmax} r dr = rmax^2/2
        let n = 1001;
        let r0 = 1.0E-4;
        let a = (10.0f64 / r0).ln() / (n as f64 - 1.0);

        let r: Vec<f64> = (0..n).map(|i| r0 * (a * i as f64).exp()).collect();
        let rab: Vec<f64> = r.iter().map(|x| a * x).collect();

        let integral = simpson_rab(&r, &rab);

        assert!((integral - 50.0).abs() < 1E-2);
    }
}
