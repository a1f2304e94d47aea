//! Forces on the ions: Hellmann-Feynman contraction of the electronic
//! density with the local-potential gradient, the non-local projector term
//! through projections of the orbital gradients, and the ion-ion part the
//! caller supplies from the Ewald sums.

use fields::{Field, OrbitalSet};
use gwconsts::*;
use ions::Ions;
use projector::{ProjectorAll, SphericalGrid};
use pspot::SpeciesSet;
use space::Transform;
use types::{c64, Error};
use vector3::Vector3f64;

const SIGMA_REACH: f64 = 9.0;

/// Total forces for the current electronic state.
///
/// `rho_total` is the total electronic density, `lots`/`occupations` the
/// orbital sets contributing to it, `ion_ion` the Ewald (or pair-sum) term.
pub fn calculate_forces(
    trans: &Transform,
    ions: &Ions,
    species: &SpeciesSet,
    rho_total: &Field<f64>,
    projectors: &ProjectorAll,
    lots: &[OrbitalSet],
    occupations: &[Vec<f64>],
    kweights: &[f64],
    ion_ion: &[Vector3f64],
) -> Result<Vec<Vector3f64>, Error> {
    let natoms = ions.len();

    assert_eq!(ion_ion.len(), natoms);

    let mut force = ion_ion.to_vec();

    local_force(trans, ions, species, rho_total, &mut force)?;
    nonlocal_force(trans, projectors, lots, occupations, kweights, &mut force);

    // forces are identical on every rank; the domain contributions were
    // all-reduced inside the pieces
    Ok(force)
}

/// Long-range part through the Hartree field of the electrons contracted
/// with each atom's Gaussian ionic density, short-range part through the
/// radial derivative of the tabulated correction.
fn local_force(
    trans: &Transform,
    ions: &Ions,
    species: &SpeciesSet,
    rho_total: &Field<f64>,
    force: &mut [Vector3f64],
) -> Result<(), Error> {
    let layout = trans.layout();
    let dv = layout.grid().volume_element();

    let v_hartree = poisson::solve_real(trans, rho_total)?;
    let grad_vh = trans.gradient(&v_hartree);

    for (iatom, (symbol, &position)) in ions
        .symbols()
        .iter()
        .zip(ions.positions().iter())
        .enumerate()
    {
        let sp = species.get(symbol)?;

        // F_lr = - \int rho_ion_a grad V_H[rho_e]
        let sphere = SphericalGrid::new(layout, position, SIGMA_REACH * sp.sigma());

        let mut f = Vector3f64::zeros();

        for (&idx, d) in sphere.indices().iter().zip(sphere.rel().iter()) {
            let w = sp.ionic_density(d.norm2()) * dv;

            f.x -= w * grad_vh[0].as_slice()[idx];
            f.y -= w * grad_vh[1].as_slice()[idx];
            f.z -= w * grad_vh[2].as_slice()[idx];
        }

        // F_sr = + \int rho_e v_sr'(|r - R|) rhat
        let rcut = sp.short_range_radius();

        if rcut > 0.0 {
            let sphere = SphericalGrid::new(layout, position, rcut);
            let h = 1E-4;

            for (&idx, d) in sphere.indices().iter().zip(sphere.rel().iter()) {
                let r = d.norm2();

                if r < EPS10 {
                    continue;
                }

                let dvdr =
                    (sp.short_range_potential(r + h) - sp.short_range_potential(r - h)) / (2.0 * h);

                let w = rho_total.as_slice()[idx] * dvdr * dv / r;

                f.x += w * d.x;
                f.y += w * d.y;
                f.z += w * d.z;
            }
        }

        let mut buf = [f.x, f.y, f.z];
        layout.domain().all_reduce_sum_f64(&mut buf);

        force[iatom].x += buf[0];
        force[iatom].y += buf[1];
        force[iatom].z += buf[2];
    }

    Ok(())
}

/// F_a = -2 sum_i occ_i sum_lm d_lm Re[ conj(<beta|phi_i>) <beta|grad phi_i> ].
fn nonlocal_force(
    trans: &Transform,
    projectors: &ProjectorAll,
    lots: &[OrbitalSet],
    occupations: &[Vec<f64>],
    kweights: &[f64],
    force: &mut [Vector3f64],
) {
    if projectors.is_empty() {
        return;
    }

    for ((phi, occ), &w) in lots.iter().zip(occupations.iter()).zip(kweights.iter()) {
        let grad = orbital_gradients(trans, phi);

        for p in projectors.iter() {
            let (c, g) = p.project_with_gradient(phi, &grad);
            let kb = p.kb_coefficients();

            let mut f = Vector3f64::zeros();

            for ist in 0..phi.local_states() {
                let fw = occ[ist] * w;

                if fw < EPS20 {
                    continue;
                }

                for ilm in 0..p.num_projectors() {
                    let cc = c[[ilm, ist]].conj();

                    f.x -= 2.0 * fw * kb[ilm] * (cc * g[0][[ilm, ist]]).re;
                    f.y -= 2.0 * fw * kb[ilm] * (cc * g[1][[ilm, ist]]).re;
                    f.z -= 2.0 * fw * kb[ilm] * (cc * g[2][[ilm, ist]]).re;
                }
            }

            // states axis holds disjoint state blocks
            let mut buf = [f.x, f.y, f.z];
            phi.layout().states().all_reduce_sum_f64(&mut buf);

            force[p.iatom()].x += buf[0];
            force[p.iatom()].y += buf[1];
            force[p.iatom()].z += buf[2];
        }
    }
}

/// Cartesian gradients of every orbital by FFT differentiation.
fn orbital_gradients(trans: &Transform, phi: &OrbitalSet) -> [OrbitalSet; 3] {
    let mut out = [phi.skeleton(), phi.skeleton(), phi.skeleton()];

    let npoints = phi.layout().local_len();
    let mut work = vec![ZERO_C64; npoints];
    let mut dwork = vec![ZERO_C64; npoints];

    for j in 0..phi.local_states() {
        trans.forward_slice(phi.state(j), &mut work);

        for (dir, set) in out.iter_mut().enumerate() {
            for ((d, &v), g) in dwork
                .iter_mut()
                .zip(work.iter())
                .zip(trans.g_local().iter())
            {
                let gc = [g.x, g.y, g.z][dir];

                *d = c64 {
                    re: -v.im * gc,
                    im: v.re * gc,
                };
            }

            trans.backward_slice(&dwork, set.state_mut(j));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomic;
    use fields::Layout;
    use grid::RealGrid;
    use lattice::Cell;
    use pspot::Species;

    #[test]
    fn test_symmetric_density_gives_zero_force() {
        // an atom at the origin inside its own spherically symmetric
        // electron cloud feels no net force
        let cell = Cell::cubic(12.0, 3).unwrap();
        let grid = RealGrid::with_sizes(&cell, [20, 20, 20]);
        let layout = Layout::serial(&grid);
        let trans = Transform::new(&layout);

        let mut species = SpeciesSet::new();
        species.insert(Species::local_erf("He", 2.0, 4.0, 0.6));

        let mut ions = Ions::new(cell);
        ions.insert("He", 4.0 * pspot::AMU_TO_AU, Vector3f64::zeros());

        let rho = atomic::atomic_guess_density(&layout, &ions, &species).unwrap();

        let projectors = ProjectorAll::new(Vec::new());

        let f = calculate_forces(
            &trans,
            &ions,
            &species,
            &rho,
            &projectors,
            &[],
            &[],
            &[],
            &[Vector3f64::zeros()],
        )
        .unwrap();

        assert!(f[0].norm2() < 1E-8, "residual force {}", f[0]);
    }

    #[test]
    fn test_displaced_cloud_pulls_ion() {
        // electron cloud centered at +x: the ion is pulled toward +x
        let cell = Cell::cubic(14.0, 3).unwrap();
        let grid = RealGrid::with_sizes(&cell, [28, 28, 28]);
        let layout = Layout::serial(&grid);
        let trans = Transform::new(&layout);

        let mut species = SpeciesSet::new();
        species.insert(Species::local_erf("H", 1.0, 1.008, 0.5));

        let mut ions = Ions::new(cell.clone());
        ions.insert("H", 1.008 * pspot::AMU_TO_AU, Vector3f64::zeros());

        let center = Vector3f64::new(1.0, 0.0, 0.0);
        let mut rho = Field::<f64>::from_fn(&layout, |r| {
            let d = cell.wrap_displacement(r - center);
            (-d.norm_sqr()).exp()
        });

        let q = rho.integral();
        rho.scale(1.0 / q);

        let projectors = ProjectorAll::new(Vec::new());

        let f = calculate_forces(
            &trans,
            &ions,
            &species,
            &rho,
            &projectors,
            &[],
            &[],
            &[],
            &[Vector3f64::zeros()],
        )
        .unwrap();

        assert!(f[0].x > 1E-4, "force {}", f[0]);
        assert!(f[0].y.abs() < 1E-6);
        assert!(f[0].z.abs() < 1E-6);
    }
}
