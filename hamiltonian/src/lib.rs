//! The Kohn-Sham Hamiltonian:
//! H phi = T phi + V_loc phi + V_NL phi + V_EXX phi + V_ext(t) phi
//! with T applied as IFFT(1/2 |G + k + A(t)|^2 FFT(phi)), V_loc the
//! spin-channel scalar potential (ionic + Hartree + XC), V_NL the batched
//! Kleinman-Bylander projectors and V_ext the pluggable perturbation.

mod atomic;
mod forces;

pub use atomic::{
    atomic_guess_density, build_projectors, core_density, ionic_density, local_potential,
};
pub use forces::calculate_forces;

use exx::ExchangeOperator;
use fields::{Field, OrbitalSet};
use gwconsts::*;
use projector::ProjectorAll;
use space::Transform;
use types::{c64, Error};
use vector3::Vector3f64;

pub struct KsHamiltonian {
    scalar_potential: Vec<Field<f64>>,
    external_complex: Option<Field<c64>>,
    projectors: ProjectorAll,
    exchange: ExchangeOperator,
    vector_potential: Vector3f64,
}

impl KsHamiltonian {
    pub fn new(scalar_potential: Vec<Field<f64>>, projectors: ProjectorAll) -> KsHamiltonian {
        assert!(!scalar_potential.is_empty());

        KsHamiltonian {
            scalar_potential,
            external_complex: None,
            projectors,
            exchange: ExchangeOperator::disabled(),
            vector_potential: Vector3f64::zeros(),
        }
    }

    pub fn set_scalar_potential(&mut self, v: Vec<Field<f64>>) {
        assert!(!v.is_empty());

        self.scalar_potential = v;
    }

    pub fn scalar_potential(&self, spin_channel: usize) -> &Field<f64> {
        &self.scalar_potential[spin_channel.min(self.scalar_potential.len() - 1)]
    }

    pub fn set_external_potential(&mut self, v: Option<Field<c64>>) {
        self.external_complex = v;
    }

    pub fn set_vector_potential(&mut self, a: Vector3f64) {
        self.vector_potential = a;
    }

    pub fn vector_potential(&self) -> Vector3f64 {
        self.vector_potential
    }

    pub fn set_projectors(&mut self, projectors: ProjectorAll) {
        self.projectors = projectors;
    }

    pub fn projectors(&self) -> &ProjectorAll {
        &self.projectors
    }

    pub fn exchange(&self) -> &ExchangeOperator {
        &self.exchange
    }

    pub fn exchange_mut(&mut self) -> &mut ExchangeOperator {
        &mut self.exchange
    }

    /// H phi.
    pub fn apply(&self, trans: &Transform, phi: &OrbitalSet) -> Result<OrbitalSet, Error> {
        phi.layout().matches(trans.layout())?;

        let mut out = phi.skeleton();

        // kinetic term in reciprocal space
        let k = phi.kpoint() + self.vector_potential;
        let mut work = vec![ZERO_C64; phi.layout().local_len()];

        for j in 0..phi.local_states() {
            trans.forward_slice(phi.state(j), &mut work);

            for (v, g) in work.iter_mut().zip(trans.g_local().iter()) {
                let kg = *g + k;

                *v *= 0.5 * kg.norm_sqr();
            }

            let wg = work.clone();
            trans.backward_slice(&wg, out.state_mut(j));
        }

        // local potential, one channel per spin label
        let v = self.scalar_potential(phi.spin_index());

        for j in 0..phi.local_states() {
            let col = out.state_mut(j);

            for ((o, &p), &vv) in col
                .iter_mut()
                .zip(phi.state(j).iter())
                .zip(v.as_slice().iter())
            {
                *o += p * vv;
            }
        }

        // external complex perturbation potential
        if let Some(vext) = &self.external_complex {
            for j in 0..phi.local_states() {
                let col = out.state_mut(j);

                for ((o, &p), &vv) in col
                    .iter_mut()
                    .zip(phi.state(j).iter())
                    .zip(vext.as_slice().iter())
                {
                    *o += p * vv;
                }
            }
        }

        // non-local projectors
        self.projectors.apply(phi, &mut out);

        // exact exchange
        self.exchange.apply(trans, phi, &mut out)?;

        Ok(out)
    }

    /// Occupation-weighted kinetic energy of a lot.
    pub fn kinetic_energy(
        &self,
        trans: &Transform,
        phi: &OrbitalSet,
        occupations: &[f64],
        kweight: f64,
    ) -> f64 {
        let k = phi.kpoint() + self.vector_potential;
        let dv = phi.layout().grid().volume_element();
        let ntot = phi.layout().grid().ntotf64();

        let mut work = vec![ZERO_C64; phi.layout().local_len()];
        let mut energy = 0.0;

        for j in 0..phi.local_states() {
            if occupations[j] < EPS20 {
                continue;
            }

            trans.forward_slice(phi.state(j), &mut work);

            let mut t = 0.0;

            for (v, g) in work.iter().zip(trans.g_local().iter()) {
                let kg = *g + k;

                t += 0.5 * kg.norm_sqr() * v.norm_sqr();
            }

            // Parseval: sum_G |FFT|^2 = N sum_r |phi|^2
            energy += occupations[j] * kweight * t * dv / ntot;
        }

        let mut buf = [energy];
        phi.layout().domain().all_reduce_sum_f64(&mut buf);

        buf[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fields::Layout;
    use grid::RealGrid;
    use lattice::Cell;

    fn setup() -> (Layout, Transform) {
        let cell = Cell::cubic(8.0, 3).unwrap();
        let grid = RealGrid::with_sizes(&cell, [12, 12, 12]);
        let layout = Layout::serial(&grid);
        let trans = Transform::new(&layout);

        (layout, trans)
    }

    fn free_hamiltonian(layout: &Layout) -> KsHamiltonian {
        KsHamiltonian::new(vec![Field::<f64>::new(layout)], ProjectorAll::new(Vec::new()))
    }

    #[test]
    fn test_plane_wave_kinetic_eigenvalue() {
        let (layout, trans) = setup();
        let ham = free_hamiltonian(&layout);

        // phi = e^{iGx} with G = 2 pi/L: H phi = G^2/2 phi
        let g = TWOPI / 8.0;

        let mut phi = OrbitalSet::new(&layout, 1, Vector3f64::zeros(), 0);
        let layout2 = layout.clone();
        {
            let col = phi.state_mut(0);
            layout2.for_each_local_point(|ip, ix, iy, iz| {
                let r = layout2.grid().rvector(ix, iy, iz);
                col[ip] = c64 {
                    re: (g * r.x).cos(),
                    im: (g * r.x).sin(),
                };
            });
        }

        let hphi = ham.apply(&trans, &phi).unwrap();

        let expect = 0.5 * g * g;

        for (h, p) in hphi.state(0).iter().zip(phi.state(0).iter()) {
            assert!((*h - *p * expect).norm() < 1E-10);
        }
    }

    #[test]
    fn test_constant_potential_shifts_spectrum() {
        let (layout, trans) = setup();

        let mut v = Field::<f64>::new(&layout);
        v.set_value(0.7);

        let ham = KsHamiltonian::new(vec![v], ProjectorAll::new(Vec::new()));

        let mut phi = OrbitalSet::new(&layout, 2, Vector3f64::zeros(), 0);
        phi.randomize();
        operations::orthonormalize(&mut phi).unwrap();

        let hphi = ham.apply(&trans, &phi).unwrap();

        let free = free_hamiltonian(&layout);
        let tphi = free.apply(&trans, &phi).unwrap();

        for j in 0..2 {
            for ((h, t), p) in hphi
                .state(j)
                .iter()
                .zip(tphi.state(j).iter())
                .zip(phi.state(j).iter())
            {
                assert!((*h - *t - *p * 0.7).norm() < 1E-12);
            }
        }
    }

    #[test]
    fn test_vector_potential_shifts_kinetic() {
        let (layout, trans) = setup();

        let mut ham = free_hamiltonian(&layout);
        ham.set_vector_potential(Vector3f64::new(0.2, 0.0, 0.0));

        // constant state: H phi = 1/2 |A|^2 phi
        let mut phi = OrbitalSet::new(&layout, 1, Vector3f64::zeros(), 0);
        phi.state_mut(0).iter_mut().for_each(|z| {
            *z = c64 { re: 1.0, im: 0.0 };
        });

        let hphi = ham.apply(&trans, &phi).unwrap();

        let expect = 0.5 * 0.2 * 0.2;

        for h in hphi.state(0) {
            assert!((h.re - expect).abs() < 1E-12);
            assert!(h.im.abs() < 1E-12);
        }
    }

    #[test]
    fn test_kinetic_energy_of_plane_wave() {
        let (layout, trans) = setup();
        let ham = free_hamiltonian(&layout);

        let g = TWOPI / 8.0;
        let dv = layout.grid().volume_element();

        let mut phi = OrbitalSet::new(&layout, 1, Vector3f64::zeros(), 0);
        let layout2 = layout.clone();
        let norm = 1.0 / (dv * layout2.grid().ntotf64()).sqrt();
        {
            let col = phi.state_mut(0);
            layout2.for_each_local_point(|ip, ix, iy, iz| {
                let r = layout2.grid().rvector(ix, iy, iz);
                col[ip] = c64 {
                    re: norm * (g * r.x).cos(),
                    im: norm * (g * r.x).sin(),
                };
            });
        }

        let ekin = ham.kinetic_energy(&trans, &phi, &[2.0], 1.0);

        assert!((ekin - 2.0 * 0.5 * g * g).abs() < 1E-10);
    }
}
