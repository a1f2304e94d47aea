//! Exact (Hartree-Fock) exchange with the ACE compression.
//!
//! The direct operator runs one Poisson solve per (HF orbital, state) pair:
//! rho_ij = conj(psi_j) phi_i, v_ij = poisson(rho_ij),
//! (EXX phi)_i += -1/2 alpha occ_j psi_j v_ij.
//! State-parallel runs rotate the HF block around the states ring with a
//! blocking send/recv/replace so each rank folds its block against the full
//! batch.
//!
//! ACE replaces the direct operator between updates: with xi = EXX phi and
//! M = phi^H xi, Cholesky-factor -M = L L^H and keep xi' = xi L^{-H}; the
//! application collapses to EXX_ACE phi = -xi' (xi'^H phi).

use fields::OrbitalSet;
use gwconsts::*;
use operations::{overlap, rotate_trs};
use space::Transform;
use types::{c64, Error};

pub enum ExxState {
    Disabled,
    Direct {
        hf_orbitals: OrbitalSet,
        hf_occupations: Vec<f64>,
    },
    Ace {
        xi: OrbitalSet,
    },
}

pub struct ExchangeOperator {
    coefficient: f64,
    use_ace: bool,
    state: ExxState,
}

impl ExchangeOperator {
    pub fn new(coefficient: f64, use_ace: bool) -> ExchangeOperator {
        ExchangeOperator {
            coefficient,
            use_ace,
            state: ExxState::Disabled,
        }
    }

    pub fn disabled() -> ExchangeOperator {
        ExchangeOperator::new(0.0, false)
    }

    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    pub fn enabled(&self) -> bool {
        self.coefficient != 0.0 && !matches!(self.state, ExxState::Disabled)
    }

    /// Refresh the operator from the current occupied orbitals and return
    /// the exchange energy E_x = 1/2 sum_i occ_i <phi_i|EXX phi_i>.
    pub fn update(
        &mut self,
        trans: &Transform,
        phi: &OrbitalSet,
        occupations: &[f64],
    ) -> Result<f64, Error> {
        if self.coefficient == 0.0 {
            self.state = ExxState::Disabled;
            return Ok(0.0);
        }

        let hf_orbitals = phi.clone();
        let hf_occupations = occupations.to_vec();

        let mut xi = phi.skeleton();
        direct_exchange(
            trans,
            &hf_orbitals,
            &hf_occupations,
            self.coefficient,
            phi,
            &mut xi,
        )?;

        let m = overlap(phi, &xi)?;

        let mut energy = 0.0;
        for (i, &occ) in hf_occupations.iter().enumerate() {
            energy += 0.5 * occ * m[[i, i]].re;
        }

        if self.use_ace {
            // -M is Hermitian positive definite for occupied orbitals
            let mut neg_m = m;
            neg_m.zscale(c64 { re: -1.0, im: 0.0 });

            let l = linalg::cholesky(&neg_m)?;

            rotate_trs(&l, &mut xi);

            self.state = ExxState::Ace { xi };
        } else {
            self.state = ExxState::Direct {
                hf_orbitals,
                hf_occupations,
            };
        }

        Ok(energy)
    }

    /// out += EXX phi with whatever representation is active.
    pub fn apply(
        &self,
        trans: &Transform,
        phi: &OrbitalSet,
        out: &mut OrbitalSet,
    ) -> Result<(), Error> {
        match &self.state {
            ExxState::Disabled => Ok(()),

            ExxState::Direct {
                hf_orbitals,
                hf_occupations,
            } => direct_exchange(
                trans,
                hf_orbitals,
                hf_occupations,
                self.coefficient,
                phi,
                out,
            ),

            ExxState::Ace { xi } => {
                let w = overlap(xi, phi)?;

                // out -= xi' (xi'^H phi)
                for j in 0..phi.num_states() {
                    let col = out.state_mut(j);

                    for k in 0..xi.num_states() {
                        utility::add_and_zscale(xi.state(k), col, -w[[k, j]]);
                    }
                }

                Ok(())
            }
        }
    }
}

/// The per-pair Poisson-solve operator, ring-rotated over the states axis.
fn direct_exchange(
    trans: &Transform,
    hf: &OrbitalSet,
    hf_occ: &[f64],
    coefficient: f64,
    phi: &OrbitalSet,
    out: &mut OrbitalSet,
) -> Result<(), Error> {
    phi.matches(out)?;

    let factor = -0.5 * coefficient;
    let comm = phi.layout().states().clone();

    if comm.size() == 1 {
        return block_exchange(trans, hf, hf_occ, factor, phi, out);
    }

    // pad the local HF block to the uniform ring block
    let part = hf.states_part();
    let block = part.block_size();
    let npoints = phi.layout().local_len();

    let mut ring = vec![ZERO_C64; block * npoints];
    let mut ring_occ = vec![ZERO_C64; block];

    for j in 0..hf.local_states() {
        ring[j * npoints..(j + 1) * npoints].copy_from_slice(hf.state(j));
        ring_occ[j] = c64 {
            re: hf_occ[j],
            im: 0.0,
        };
    }

    let me = comm.rank();
    let nproc = comm.size();

    let next = (me + 1) % nproc;
    let prev = (me + nproc - 1) % nproc;

    let mut ipart = me;

    for istep in 0..nproc {
        let nhf = part.local_size(ipart);

        block_exchange_slices(
            trans,
            &ring,
            &ring_occ,
            nhf,
            npoints,
            factor,
            phi,
            out,
        )?;

        if istep == nproc - 1 {
            break;
        }

        comm.sendrecv_replace_c64(&mut ring, prev, next);
        comm.sendrecv_replace_c64(&mut ring_occ, prev, next);

        ipart = (ipart + 1) % nproc;
    }

    Ok(())
}

fn block_exchange(
    trans: &Transform,
    hf: &OrbitalSet,
    hf_occ: &[f64],
    factor: f64,
    phi: &OrbitalSet,
    out: &mut OrbitalSet,
) -> Result<(), Error> {
    let npoints = phi.layout().local_len();

    let mut pair = vec![ZERO_C64; npoints];

    for j in 0..hf.local_states() {
        let occ = hf_occ[j];

        if occ < EPS20 {
            continue;
        }

        let psi_j = hf.state(j);

        for i in 0..phi.local_states() {
            for (p, (&a, &b)) in pair.iter_mut().zip(psi_j.iter().zip(phi.state(i).iter())) {
                *p = a.conj() * b;
            }

            poisson::solve_in_place(trans, &mut pair)?;

            let col = out.state_mut(i);

            for (o, (&v, &a)) in col.iter_mut().zip(pair.iter().zip(psi_j.iter())) {
                *o += factor * occ * a * v;
            }
        }
    }

    Ok(())
}

fn block_exchange_slices(
    trans: &Transform,
    ring: &[c64],
    ring_occ: &[c64],
    nhf: usize,
    npoints: usize,
    factor: f64,
    phi: &OrbitalSet,
    out: &mut OrbitalSet,
) -> Result<(), Error> {
    let mut pair = vec![ZERO_C64; npoints];

    for j in 0..nhf {
        let occ = ring_occ[j].re;

        if occ < EPS20 {
            continue;
        }

        let psi_j = &ring[j * npoints..(j + 1) * npoints];

        for i in 0..phi.local_states() {
            for (p, (&a, &b)) in pair.iter_mut().zip(psi_j.iter().zip(phi.state(i).iter())) {
                *p = a.conj() * b;
            }

            poisson::solve_in_place(trans, &mut pair)?;

            let col = out.state_mut(i);

            for (o, (&v, &a)) in col.iter_mut().zip(pair.iter().zip(psi_j.iter())) {
                *o += factor * occ * a * v;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fields::Layout;
    use grid::RealGrid;
    use lattice::Cell;
    use vector3::Vector3f64;

    fn setup() -> (Layout, Transform) {
        let cell = Cell::cubic(8.0, 3).unwrap();
        let grid = RealGrid::with_sizes(&cell, [10, 10, 10]);
        let layout = Layout::serial(&grid);
        let trans = Transform::new(&layout);

        (layout, trans)
    }

    #[test]
    fn test_disabled_operator_is_identity() {
        let (layout, trans) = setup();

        let mut phi = OrbitalSet::new(&layout, 2, Vector3f64::zeros(), 0);
        phi.randomize();

        let mut op = ExchangeOperator::disabled();

        let e = op.update(&trans, &phi, &[1.0, 1.0]).unwrap();
        assert_eq!(e, 0.0);
        assert!(!op.enabled());

        let mut out = phi.skeleton();
        op.apply(&trans, &phi, &mut out).unwrap();

        assert!(out.state(0).iter().all(|z| z.norm() == 0.0));
    }

    #[test]
    fn test_exchange_energy_is_negative() {
        let (layout, trans) = setup();

        let mut phi = OrbitalSet::new(&layout, 2, Vector3f64::zeros(), 0);
        phi.randomize();
        operations::orthonormalize(&mut phi).unwrap();

        let mut op = ExchangeOperator::new(1.0, false);

        let e = op.update(&trans, &phi, &[2.0, 2.0]).unwrap();

        assert!(e < 0.0, "E_x = {e}");
        assert!(op.enabled());
    }

    #[test]
    fn test_ace_matches_direct_on_span() {
        // on the orbitals the operator was built from, ACE reproduces the
        // direct operator exactly
        let (layout, trans) = setup();

        let mut phi = OrbitalSet::new(&layout, 3, Vector3f64::zeros(), 0);
        phi.randomize();
        operations::orthonormalize(&mut phi).unwrap();

        let occ = vec![2.0, 1.0, 1.0];

        let mut direct_op = ExchangeOperator::new(1.0, false);
        let e_direct = direct_op.update(&trans, &phi, &occ).unwrap();

        let mut ace_op = ExchangeOperator::new(1.0, true);
        let e_ace = ace_op.update(&trans, &phi, &occ).unwrap();

        assert!((e_direct - e_ace).abs() < 1E-10);

        let mut out_direct = phi.skeleton();
        direct_op.apply(&trans, &phi, &mut out_direct).unwrap();

        let mut out_ace = phi.skeleton();
        ace_op.apply(&trans, &phi, &mut out_ace).unwrap();

        for j in 0..3 {
            for (a, b) in out_direct.state(j).iter().zip(out_ace.state(j).iter()) {
                assert!((*a - *b).norm() < 1E-8, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_exchange_operator_is_hermitian() {
        let (layout, trans) = setup();

        let mut phi = OrbitalSet::new(&layout, 2, Vector3f64::zeros(), 0);
        phi.randomize();
        operations::orthonormalize(&mut phi).unwrap();

        let mut op = ExchangeOperator::new(0.25, false);
        op.update(&trans, &phi, &[2.0, 2.0]).unwrap();

        let mut vphi = phi.skeleton();
        op.apply(&trans, &phi, &mut vphi).unwrap();

        let m = overlap(&phi, &vphi).unwrap();

        for i in 0..2 {
            for j in 0..2 {
                assert!((m[[i, j]] - m[[j, i]].conj()).norm() < 1E-8);
            }
        }
    }
}
