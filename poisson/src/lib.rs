//! Electrostatic Green-function inversion in reciprocal space.
//!
//! Periodic cells divide by |G|^2 with V(G=0) = 0; a non-neutral density in
//! the fully periodic case is a warning only, the monopole is dropped.
//! Finite and slab cells use truncated Coulomb kernels (spherical and
//! planar cutoffs) so the potential does not see periodic images along the
//! finite directions. Wire (1-D periodic) cells are not supported.

use fields::Field;
use gwconsts::*;
use space::Transform;
use tracing::warn;
use types::{c64, Error};

/// Solve nabla^2 V = -4 pi rho for the given density.
pub fn solve(trans: &Transform, density: &Field<c64>) -> Result<Field<c64>, Error> {
    density.layout().matches(trans.layout())?;

    let mut work = density.as_slice().to_vec();
    solve_in_place(trans, &mut work)?;

    let mut out = density.skeleton();
    out.as_mut_slice().copy_from_slice(&work);

    Ok(out)
}

/// Real-density convenience wrapper; the real and imaginary branches of the
/// complex solve are independent, so the real part carries the answer.
pub fn solve_real(trans: &Transform, density: &Field<f64>) -> Result<Field<f64>, Error> {
    let v = solve(trans, &density.to_complex())?;

    Ok(v.real_part())
}

/// In-place solve on a local slab; the workhorse for the per-pair solves of
/// the exchange operator.
pub fn solve_in_place(trans: &Transform, data: &mut [c64]) -> Result<(), Error> {
    if data.len() != trans.layout().local_len() {
        return Err(Error::ShapeMismatch(format!(
            "poisson density holds {} local values, layout expects {}",
            data.len(),
            trans.layout().local_len()
        )));
    }

    let periodicity = trans.layout().grid().cell().periodic_dimensions();

    if periodicity == 1 {
        return Err(Error::BadConfiguration(
            "unsupported periodicity: the wire-truncated Coulomb kernel is not implemented"
                .to_string(),
        ));
    }

    let mut g_data = vec![ZERO_C64; data.len()];
    trans.forward_slice(data, &mut g_data);

    if periodicity == 3 && trans.owns_g_zero() {
        let net = g_data[0].norm() * trans.layout().grid().volume_element();

        if net > EPS8 {
            warn!(
                net_charge = net,
                "non-neutral density in a fully periodic cell; dropping the G = 0 component"
            );
        }
    }

    apply_kernel(trans, periodicity, &mut g_data);

    trans.backward_slice(&g_data, data);

    Ok(())
}

fn apply_kernel(trans: &Transform, periodicity: usize, g_data: &mut [c64]) {
    match periodicity {
        3 => {
            for (v, &g2) in g_data.iter_mut().zip(trans.g2_local().iter()) {
                if g2 > EPS14 {
                    *v *= FOURPI / g2;
                } else {
                    *v = ZERO_C64;
                }
            }
        }

        0 => {
            // spherical-cutoff truncation: 4 pi (1 - cos(G Rc))/G^2 with
            // Rc half the smallest cell extent, 2 pi Rc^2 at G = 0
            let rc = half_min_extent(trans);

            for (v, &g2) in g_data.iter_mut().zip(trans.g2_local().iter()) {
                if g2 > EPS14 {
                    let g = g2.sqrt();
                    *v *= FOURPI * (1.0 - (g * rc).cos()) / g2;
                } else {
                    *v *= TWOPI * rc * rc;
                }
            }
        }

        2 => {
            // planar cutoff along the third lattice direction:
            // 4 pi/G^2 (1 - e^{-Gpar Rc} cos(Gz Rc)), -2 pi Rc^2 at G = 0
            let latt = trans.layout().grid().cell().latt();
            let cvec = latt.get_vector_c();
            let chat = cvec / cvec.norm2();
            let rc = 0.5 * cvec.norm2();

            for (v, (&g2, g)) in g_data
                .iter_mut()
                .zip(trans.g2_local().iter().zip(trans.g_local().iter()))
            {
                if g2 > EPS14 {
                    let gz = g.dot_product(&chat);
                    let gpar = (g2 - gz * gz).max(0.0).sqrt();

                    *v *= FOURPI / g2 * (1.0 - (-gpar * rc).exp() * (gz * rc).cos());
                } else {
                    *v *= -TWOPI * rc * rc;
                }
            }
        }

        other => panic!("poisson kernel called with periodicity {other}"),
    }
}

fn half_min_extent(trans: &Transform) -> f64 {
    let latt = trans.layout().grid().cell().latt();

    let la = latt.get_vector_a().norm2();
    let lb = latt.get_vector_b().norm2();
    let lc = latt.get_vector_c().norm2();

    0.5 * la.min(lb).min(lc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fields::Layout;
    use grid::RealGrid;
    use lattice::Cell;

    #[test]
    fn test_point_source_periodic() {
        // 100^3 grid, 10 Bohr cubic cell, rho = -1 at the origin
        let cell = Cell::cubic(10.0, 3).unwrap();
        let grid = RealGrid::from_spacing(&cell, 0.1).unwrap();
        assert_eq!(grid.size(), [100, 100, 100]);

        let layout = Layout::serial(&grid);
        let trans = Transform::new(&layout);

        let mut rho = Field::<c64>::new(&layout);
        rho.as_mut_slice()[0] = c64 { re: -1.0, im: 0.0 };

        let v = solve(&trans, &rho).unwrap();

        let mut sum_re = 0.0;
        let mut max_im = 0.0f64;

        for z in v.as_slice() {
            sum_re += z.re.abs();
            max_im = max_im.max(z.im.abs());
        }

        assert!(
            (sum_re - 59.7758543176).abs() < 1E-6,
            "sum |Re V| = {sum_re}"
        );
        assert!(max_im < 1E-12);
        assert!((v.as_slice()[0].re - -0.0241426581).abs() < 1E-9);
    }

    #[test]
    fn test_plane_wave_inversion() {
        // V(G) = 4 pi rho(G) / G^2 for a single mode
        let cell = Cell::cubic(10.0, 3).unwrap();
        let grid = RealGrid::with_sizes(&cell, [20, 20, 20]);
        let layout = Layout::serial(&grid);
        let trans = Transform::new(&layout);

        let kk = TWOPI / 10.0;
        let rho = Field::<c64>::from_fn(&layout, |r| c64 {
            re: (kk * r.x).cos(),
            im: (kk * r.x).sin(),
        });

        let v = solve(&trans, &rho).unwrap();

        let expect = FOURPI / (kk * kk);

        for (vz, rz) in v.as_slice().iter().zip(rho.as_slice().iter()) {
            assert!((*vz - *rz * expect).norm() < 1E-10);
        }
    }

    #[test]
    fn test_laplacian_roundtrip_invariant() {
        // -G^2/(4 pi) V(G) recovers rho(G) away from G = 0
        let cell = Cell::cubic(8.0, 3).unwrap();
        let grid = RealGrid::with_sizes(&cell, [12, 12, 12]);
        let layout = Layout::serial(&grid);
        let trans = Transform::new(&layout);

        let rho = Field::<c64>::from_fn(&layout, |r| c64 {
            re: (TWOPI / 8.0 * r.x).cos() * (TWOPI / 8.0 * 2.0 * r.y).sin(),
            im: 0.0,
        });

        let v = solve(&trans, &rho).unwrap();

        let rho_g = trans.to_fourier(&rho);
        let v_g = trans.to_fourier(&v);

        for ((rz, vz), &g2) in rho_g
            .as_slice()
            .iter()
            .zip(v_g.as_slice().iter())
            .zip(trans.g2_local().iter())
        {
            if g2 < EPS14 {
                continue;
            }

            let back = *vz * (g2 / FOURPI);
            let scale = rz.norm().max(1.0);

            assert!((back - rz).norm() / scale < 1E-12);
        }
    }

    #[test]
    fn test_finite_cell_uses_truncated_kernel() {
        let cell = Cell::cubic(16.0, 0).unwrap();
        let grid = RealGrid::with_sizes(&cell, [32, 32, 32]);
        let layout = Layout::serial(&grid);
        let trans = Transform::new(&layout);

        // Gaussian charge centered at the origin
        let alpha = 0.5;
        let norm = (alpha / std::f64::consts::PI).powf(1.5);
        let rho = Field::<f64>::from_fn(&layout, |r| norm * (-alpha * r.norm_sqr()).exp());

        let v = solve_real(&trans, &rho).unwrap();

        // V(r) = erf(sqrt(alpha) r)/r; compare a mid-range sample where the
        // truncation error is negligible
        let r_test = 2.0; // 4 grid points out along x
        let ip = 4; // (4,0,0)
        let expect = special_erf(alpha.sqrt() * r_test) / r_test;

        assert!(
            (v.as_slice()[ip] - expect).abs() < 5E-3,
            "V = {}, expected {expect}",
            v.as_slice()[ip]
        );
    }

    #[test]
    fn test_wire_periodicity_rejected() {
        let cell = Cell::cubic(10.0, 1).unwrap();
        let grid = RealGrid::with_sizes(&cell, [10, 10, 10]);
        let layout = Layout::serial(&grid);
        let trans = Transform::new(&layout);

        let rho = Field::<c64>::new(&layout);

        assert!(matches!(
            solve(&trans, &rho),
            Err(Error::BadConfiguration(_))
        ));
    }

    // local erf to keep the dev-dependency list flat
    fn special_erf(x: f64) -> f64 {
        // Abramowitz-Stegun 7.1.26
        let t = 1.0 / (1.0 + 0.3275911 * x);
        let poly = t
            * (0.254829592
                + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));

        1.0 - poly * (-x * x).exp()
    }
}
