//! Real-time propagation of the Kohn-Sham orbitals:
//! i d/dt phi = H(t) phi, integrated with ETRS (default) or Crank-Nicolson.
//!
//! ETRS: half-step with exp(-i dt/2 H(t)), rebuild H from the advanced
//! density, half-step with exp(-i dt/2 H(t+dt)); each exponential is a
//! fourth-order Taylor expansion. Crank-Nicolson solves
//! (1 + i dt/2 H) phi_{n+1} = (1 - i dt/2 H) phi_n by fixed-point sweeps.
//!
//! After every step an observer receives an immutable view of the state; it
//! can read, not mutate.

use density::SpinDensity;
use electrons::Electrons;
use energy::Energy;
use ewald::Ewald;
use fields::Field;
use gwconsts::*;
use hamiltonian::KsHamiltonian;
use ions::{IonPropagator, Ions};
use observables::{density_at_q, dipole};
use options::{PropagatorScheme, RealTimeOptions, TheoryOptions};
use perturbations::Perturbation;
use projector::ProjectorAll;
use pspot::SpeciesSet;
use space::Transform;
use types::{c64, Error};
use vector3::Vector3f64;

/// Immutable per-step view handed to the observer.
pub struct RealTimeData<'a> {
    step: usize,
    time: f64,
    ions: &'a Ions,
    forces: &'a [Vector3f64],
    energy: &'a Energy,
    density_total: &'a Field<f64>,
    perturbation: &'a Perturbation,
}

impl<'a> RealTimeData<'a> {
    pub fn iter(&self) -> usize {
        self.step
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn coordinates(&self, iatom: usize) -> Vector3f64 {
        self.ions.positions()[iatom]
    }

    pub fn velocities(&self, iatom: usize) -> Vector3f64 {
        self.ions.velocities()[iatom]
    }

    pub fn forces(&self, iatom: usize) -> Vector3f64 {
        self.forces[iatom]
    }

    pub fn num_atoms(&self) -> usize {
        self.ions.len()
    }

    pub fn energy(&self) -> f64 {
        self.energy.total()
    }

    pub fn dipole(&self) -> Vector3f64 {
        dipole(self.density_total)
    }

    pub fn density_at_q(&self, q: Vector3f64) -> c64 {
        density_at_q(self.density_total, q)
    }

    /// The configured envelope of the active perturbation at `time`.
    pub fn envelope(&self) -> f64 {
        match self.perturbation {
            Perturbation::Laser { envelope, .. } => envelope.value(self.time),
            Perturbation::Ixs {
                twidth,
                tdelay,
                envelope,
                ..
            } => {
                let x = (self.time - tdelay) / (2.0 * twidth);
                (-x * x).exp() * envelope.value(self.time)
            }
            _ => 0.0,
        }
    }
}

/// Propagate the electronic state over `options.num_steps` steps of
/// `options.dt`, optionally moving the ions through `ion_propagator`.
#[allow(clippy::too_many_arguments)]
pub fn propagate<F>(
    ions: &mut Ions,
    el: &mut Electrons,
    species: &SpeciesSet,
    theory: &TheoryOptions,
    options: &RealTimeOptions,
    perturbation: &Perturbation,
    ion_propagator: &dyn IonPropagator,
    mut observer: F,
) -> Result<(), Error>
where
    F: FnMut(&RealTimeData),
{
    let layout = el.layout().clone();
    let trans = Transform::new(&layout);

    let dt = options.dt;
    let numsteps = options.num_steps;

    let spin = el.spin();

    let xc_term = xc::XcTerm::new(
        &theory.functional.exchange_parts(),
        &theory.functional.correlation_parts(),
        spin.components(),
    )?;

    let includes_hartree = theory.functional.includes_hartree();

    // t = 0 kick
    if perturbation.has_kick() {
        for phi in el.lots_mut() {
            perturbation.apply_kick(phi);
        }
    }

    let mut rho = el.calculate_density()?;

    let core = hamiltonian::core_density(&layout, ions, species)?;

    let (mut vion, projectors, mut ewald) = ion_fields(&trans, ions, species)?;

    let mut ham = KsHamiltonian::new(
        vec![Field::<f64>::new(&layout); spin.spin_channels()],
        projectors,
    );

    let mut energy = Energy::new();

    update_hamiltonian(
        &mut ham,
        &trans,
        &vion,
        &rho,
        core.as_ref(),
        &xc_term,
        includes_hartree,
        perturbation,
        0.0,
        &mut energy,
    )?;

    account_energy(&trans, &mut energy, el, &ham, ewald.as_ref())?;

    let mut forces = vec![Vector3f64::zeros(); ions.len()];

    if ion_propagator.needs_force() {
        forces = hamiltonian::calculate_forces(
            &trans,
            ions,
            species,
            &rho.total(),
            ham.projectors(),
            el.lots(),
            &el.occupations,
            el.lot_kweights(),
            &ion_force(ewald.as_ref(), ions),
        )?;
    }

    let density_total = rho.total();

    observer(&RealTimeData {
        step: 0,
        time: 0.0,
        ions,
        forces: &forces,
        energy: &energy,
        density_total: &density_total,
        perturbation,
    });

    for istep in 0..numsteps {
        let time = istep as f64 * dt;

        // move the ions to t + dt; the ionic potential terms follow
        if !ions.is_empty() {
            let before = ions.positions().to_vec();

            ion_propagator.propagate_positions(
                dt,
                ions,
                if ion_propagator.needs_force() {
                    Some(&forces)
                } else {
                    None
                },
            );

            let moved = ions
                .positions()
                .iter()
                .zip(before.iter())
                .any(|(a, b)| (*a - *b).norm_sqr() > EPS30);

            if moved {
                let rebuilt = ion_fields(&trans, ions, species)?;
                vion = rebuilt.0;
                ewald = rebuilt.2;

                ham.set_projectors(rebuilt.1);
            }
        }

        match options.propagator {
            PropagatorScheme::Etrs => {
                // half-step with H(t)
                apply_exponential(&trans, &ham, el, 0.5 * dt)?;

                // H(t + dt) from the advanced density
                rho = el.calculate_density()?;
                update_hamiltonian(
                    &mut ham,
                    &trans,
                    &vion,
                    &rho,
                    core.as_ref(),
                    &xc_term,
                    includes_hartree,
                    perturbation,
                    time + dt,
                    &mut energy,
                )?;

                // half-step with H(t + dt)
                apply_exponential(&trans, &ham, el, 0.5 * dt)?;
            }

            PropagatorScheme::CrankNicolson => {
                crank_nicolson_step(&trans, &ham, el, dt, options.cn_iterations)?;
            }
        }

        // state at t + dt
        rho = el.calculate_density()?;
        update_hamiltonian(
            &mut ham,
            &trans,
            &vion,
            &rho,
            core.as_ref(),
            &xc_term,
            includes_hartree,
            perturbation,
            time + dt,
            &mut energy,
        )?;

        account_energy(&trans, &mut energy, el, &ham, ewald.as_ref())?;

        if ion_propagator.needs_force() {
            forces = hamiltonian::calculate_forces(
                &trans,
                ions,
                species,
                &rho.total(),
                ham.projectors(),
                el.lots(),
                &el.occupations,
                el.lot_kweights(),
                &ion_force(ewald.as_ref(), ions),
            )?;

            ion_propagator.propagate_velocities(dt, ions, &forces);
        }

        let density_total = rho.total();

        observer(&RealTimeData {
            step: istep + 1,
            time: (istep + 1) as f64 * dt,
            ions,
            forces: &forces,
            energy: &energy,
            density_total: &density_total,
            perturbation,
        });
    }

    Ok(())
}

fn ion_fields(
    trans: &Transform,
    ions: &Ions,
    species: &SpeciesSet,
) -> Result<(Field<f64>, ProjectorAll, Option<Ewald>), Error> {
    if ions.is_empty() {
        return Ok((
            Field::<f64>::new(trans.layout()),
            ProjectorAll::new(Vec::new()),
            None,
        ));
    }

    let vion = hamiltonian::local_potential(trans, ions, species)?;
    let projectors = hamiltonian::build_projectors(trans.layout(), ions, species)?;

    let zions = ions.zions(species)?;
    let ewald = Ewald::new(ions.cell(), ions.positions(), &zions, trans.recip());

    Ok((vion, projectors, Some(ewald)))
}

fn ion_force(ewald: Option<&Ewald>, ions: &Ions) -> Vec<Vector3f64> {
    ewald
        .map(|e| e.get_force().to_vec())
        .unwrap_or_else(|| vec![Vector3f64::zeros(); ions.len()])
}

#[allow(clippy::too_many_arguments)]
fn update_hamiltonian(
    ham: &mut KsHamiltonian,
    trans: &Transform,
    vion: &Field<f64>,
    rho: &SpinDensity,
    core: Option<&Field<f64>>,
    xc_term: &xc::XcTerm,
    includes_hartree: bool,
    perturbation: &Perturbation,
    time: f64,
    energy: &mut Energy,
) -> Result<(), Error> {
    let (vks, parts) = scf::ks_potential(trans, vion, rho, core, xc_term, includes_hartree)?;

    ham.set_scalar_potential(vks);

    energy.hartree = parts.hartree_energy;
    energy.xc = parts.exc;
    energy.nvxc = parts.nvxc;
    energy.external = vion.integral_product(&rho.total());

    if perturbation.has_potential() {
        let mut vext = Field::<c64>::new(trans.layout());
        perturbation.potential(time, &mut vext);

        ham.set_external_potential(Some(vext));
    } else {
        ham.set_external_potential(None);
    }

    if perturbation.has_vector_potential() {
        ham.set_vector_potential(perturbation.vector_potential(time));
    }

    Ok(())
}

fn account_energy(
    trans: &Transform,
    energy: &mut Energy,
    el: &Electrons,
    ham: &KsHamiltonian,
    ewald: Option<&Ewald>,
) -> Result<(), Error> {
    energy.ion = ewald.map_or(0.0, |e| e.get_energy());

    let mut eig = 0.0;
    let mut kin = 0.0;

    for i in 0..el.num_lots() {
        let phi = el.lot(i);
        let w = el.lot_kweights()[i];
        let occ = &el.occupations[i];

        kin += ham.kinetic_energy(trans, phi, occ, w);

        let hphi = ham.apply(trans, phi)?;
        let d = operations::overlap_diagonal(phi, &hphi)?;

        for (j, z) in d.iter().enumerate() {
            eig += w * occ[j] * z.re;
        }
    }

    energy.eigenvalues = eig;
    energy.kinetic = kin;

    Ok(())
}

/// phi <- exp(-i tau H) phi by a fourth-order Taylor expansion.
fn apply_exponential(
    trans: &Transform,
    ham: &KsHamiltonian,
    el: &mut Electrons,
    tau: f64,
) -> Result<(), Error> {
    const ORDER: usize = 4;

    for i in 0..el.num_lots() {
        let phi = el.lot(i).clone();

        let mut acc = phi.clone();
        let mut term = phi;

        for n in 1..=ORDER {
            let hterm = ham.apply(trans, &term)?;

            // term <- (-i tau / n) H term
            let factor = c64 {
                re: 0.0,
                im: -tau / n as f64,
            };

            term = hterm;

            for j in 0..term.local_states() {
                for v in term.state_mut(j) {
                    *v *= factor;
                }
            }

            for j in 0..acc.local_states() {
                let col = acc.state_mut(j);

                for (x, y) in col.iter_mut().zip(term.state(j).iter()) {
                    *x += *y;
                }
            }
        }

        *el.lot_mut(i) = acc;
    }

    Ok(())
}

/// Fixed-point solve of (1 + i dt/2 H) phi_{n+1} = (1 - i dt/2 H) phi_n.
fn crank_nicolson_step(
    trans: &Transform,
    ham: &KsHamiltonian,
    el: &mut Electrons,
    dt: f64,
    iterations: usize,
) -> Result<(), Error> {
    let half = c64 {
        re: 0.0,
        im: -0.5 * dt,
    };

    for i in 0..el.num_lots() {
        let phi_n = el.lot(i).clone();

        // rhs = (1 - i dt/2 H) phi_n
        let hphi = ham.apply(trans, &phi_n)?;
        let mut rhs = phi_n.clone();

        for j in 0..rhs.local_states() {
            let col = rhs.state_mut(j);

            for (x, y) in col.iter_mut().zip(hphi.state(j).iter()) {
                *x += half * *y;
            }
        }

        // phi^{k+1} = rhs - i dt/2 H phi^k
        let mut phi = phi_n;

        for _ in 0..iterations {
            let hphi = ham.apply(trans, &phi)?;

            let mut next = rhs.clone();

            for j in 0..next.local_states() {
                let col = next.state_mut(j);

                for (x, y) in col.iter_mut().zip(hphi.state(j).iter()) {
                    *x += half * *y;
                }
            }

            phi = next;
        }

        *el.lot_mut(i) = phi;
    }

    Ok(())
}
