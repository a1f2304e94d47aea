use gwconsts::*;
use std::f64::consts;
use vector3::Vector3f64;

pub fn erf(x: f64) -> f64 {
    libm::erf(x)
}

pub fn erfc(x: f64) -> f64 {
    libm::erfc(x)
}

/// Real spherical harmonic Y_lm evaluated at the direction of v.
///
/// Condon-Shortley phase convention, l up to 3. The value at v = 0 is taken
/// as the angular average (only Y_00 is nonzero there), which is the limit a
/// projector needs when a grid point coincides with the atom.
pub fn real_spherical_harmonics(l: usize, m: i32, v: Vector3f64) -> f64 {
    let rnorm = v.norm2();

    if l == 0 {
        return 0.5 / consts::PI.sqrt();
    }

    if rnorm < EPS12 {
        return 0.0;
    }

    let x = v.x / rnorm;
    let y = v.y / rnorm;
    let z = v.z / rnorm;

    match (l, m) {
        (1, -1) => -(3.0 / 4.0 / consts::PI).sqrt() * y,
        (1, 0) => (3.0 / 4.0 / consts::PI).sqrt() * z,
        (1, 1) => -(3.0 / 4.0 / consts::PI).sqrt() * x,

        (2, -2) => 0.5 * (15.0 / consts::PI).sqrt() * x * y,
        (2, -1) => 0.5 * (15.0 / consts::PI).sqrt() * y * z,
        (2, 0) => 0.25 * (5.0 / consts::PI).sqrt() * (2.0 * z * z - x * x - y * y),
        (2, 1) => 0.5 * (15.0 / consts::PI).sqrt() * z * x,
        (2, 2) => 0.25 * (15.0 / consts::PI).sqrt() * (x * x - y * y),

        (3, -3) => -0.25 * (35.0 / 2.0 / consts::PI).sqrt() * (3.0 * x * x - y * y) * y,
        (3, -2) => 0.5 * (105.0 / consts::PI).sqrt() * x * y * z,
        (3, -1) => -0.25 * (21.0 / 2.0 / consts::PI).sqrt() * y * (4.0 * z * z - x * x - y * y),
        (3, 0) => 0.25 * (7.0 / consts::PI).sqrt() * z * (2.0 * z * z - 3.0 * x * x - 3.0 * y * y),
        (3, 1) => -0.25 * (21.0 / 2.0 / consts::PI).sqrt() * x * (4.0 * z * z - x * x - y * y),
        (3, 2) => 0.25 * (105.0 / consts::PI).sqrt() * (x * x - y * y) * z,
        (3, 3) => -0.25 * (35.0 / 2.0 / consts::PI).sqrt() * (x * x - 3.0 * y * y) * x,

        _ => panic!("real_spherical_harmonics: unsupported (l, m) = ({l}, {m})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erf_limits() {
        assert!((erf(0.0)).abs() < 1E-15);
        assert!((erf(5.0) - 1.0).abs() < 1E-10);
        assert!((erfc(0.0) - 1.0).abs() < 1E-15);
        assert!((erf(1.0) + erfc(1.0) - 1.0).abs() < 1E-15);
    }

    #[test]
    fn test_ylm_orthonormality_on_sphere() {
        // quadrature over a Lebedev-free product grid in (theta, phi)
        let ntheta = 80;
        let nphi = 160;

        let pairs = [(0usize, 0i32), (1, -1), (1, 0), (1, 1), (2, 0), (2, 2)];

        for &(l1, m1) in pairs.iter() {
            for &(l2, m2) in pairs.iter() {
                let mut s = 0.0;

                for it in 0..ntheta {
                    let theta = (it as f64 + 0.5) * consts::PI / ntheta as f64;

                    for ip in 0..nphi {
                        let phi = ip as f64 * 2.0 * consts::PI / nphi as f64;

                        let v = Vector3f64::new(
                            theta.sin() * phi.cos(),
                            theta.sin() * phi.sin(),
                            theta.cos(),
                        );

                        let w = theta.sin() * (consts::PI / ntheta as f64)
                            * (2.0 * consts::PI / nphi as f64);

                        s += w
                            * real_spherical_harmonics(l1, m1, v)
                            * real_spherical_harmonics(l2, m2, v);
                    }
                }

                let expect = if l1 == l2 && m1 == m2 { 1.0 } else { 0.0 };

                assert!(
                    (s - expect).abs() < 1E-3,
                    "<Y_{l1}{m1}|Y_{l2}{m2}> = {s}"
                );
            }
        }
    }
}
