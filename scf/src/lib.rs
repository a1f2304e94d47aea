//! The self-consistent ground-state driver.
//!
//! Per iteration: build the Kohn-Sham potential from the current density,
//! refine the orbitals (steepest descent), rotate them through the subspace
//! diagonalization, solve the Fermi level, rebuild the density, account the
//! total energy and mix. A run that exhausts `scf_max_iter` reports
//! `NotConverged` but still returns the last state.

mod potential;
pub use potential::{ks_potential, PotentialParts};

use density::SpinDensity;
use electrons::{Electrons, SpinScheme};
use energy::Energy;
use ewald::Ewald;
use fields::{Field, Layout, OrbitalSet};
use grid::RealGrid;
use gwconsts::*;
use gwmpi::ProcessGrid;
use hamiltonian::KsHamiltonian;
use ions::Ions;
use kpts::KMesh;
use options::{ElectronsOptions, TheoryOptions};
use projector::ProjectorAll;
use pspot::SpeciesSet;
use space::Transform;
use exx::ExchangeOperator;
use tracing::{info, warn};
use types::Error;
use vector3::Vector3f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    Converged { iterations: usize },
    NotConverged,
}

pub struct ScfResult {
    pub energy: Energy,
    pub electrons: Electrons,
    pub density: SpinDensity,
    pub fermi_level: f64,
    pub iterations: usize,
    pub convergence: Convergence,
    pub magnetization: Vector3f64,
    pub forces: Vec<Vector3f64>,
}

pub fn run(
    pgrid: &ProcessGrid,
    ions: &Ions,
    species: &SpeciesSet,
    theory: &TheoryOptions,
    el_opts: &ElectronsOptions,
) -> Result<ScfResult, Error> {
    let cell = ions.cell().clone();

    let grid = match (el_opts.cutoff, el_opts.spacing) {
        (Some(ecut), _) => RealGrid::from_cutoff(&cell, ecut)?,
        (None, Some(h)) => RealGrid::from_spacing(&cell, h)?,
        (None, None) => {
            return Err(Error::BadConfiguration(
                "electrons options carry neither a cutoff nor a spacing".to_string(),
            ))
        }
    };

    let layout = Layout::new(&grid, pgrid);

    // density-space transform, and the cutoff-masked one the Hamiltonian uses
    let trans = Transform::new(&layout);
    let trans_wfc = match el_opts.cutoff {
        Some(ecut) => Transform::with_cutoff(&layout, ecut),
        None => Transform::new(&layout),
    };

    let nelec = ions.num_electrons(species)? + el_opts.extra_electrons;

    if nelec <= 0.0 {
        return Err(Error::BadConfiguration(format!(
            "total electron count must be positive, got {nelec}"
        )));
    }

    let spin = el_opts.spin;
    let nstates = ((nelec / 2.0).ceil() as usize).max(1) + el_opts.extra_states;

    let kmesh = KMesh::uniform(el_opts.kpoints);

    let mut el = Electrons::new(
        &layout,
        &cell,
        &kmesh,
        spin,
        nstates,
        nelec,
        el_opts.temperature,
    )?;

    el.randomize()?;

    // aufbau starting occupations through the usual mu solve on index
    // placeholders
    let sm = smearing::new("fd");
    {
        let fake: Vec<Vec<f64>> = (0..el.num_lots())
            .map(|_| (0..nstates).map(|j| j as f64).collect())
            .collect();

        let mu = fermilevel::get_fermi_level(
            &fake,
            el.lot_kweights(),
            sm.as_ref(),
            el_opts.temperature.max(100.0),
            spin.max_occ(),
            nelec,
        )?;

        el.occupations = fermilevel::compute_occupations(
            &fake,
            sm.as_ref(),
            el_opts.temperature.max(100.0),
            spin.max_occ(),
            mu,
        );
    }

    // ion-derived, fixed for the run
    let (vion, projectors, ewald) = ion_terms(&trans, ions, species)?;
    let core = hamiltonian::core_density(&layout, ions, species)?;

    // starting density
    let mut rho = initial_density(&layout, ions, species, spin, nelec)?;

    let xc_term = xc::XcTerm::new(
        &theory.functional.exchange_parts(),
        &theory.functional.correlation_parts(),
        spin.components(),
    )?;

    let exx_coefficient = theory.functional.exchange_coefficient();

    if exx_coefficient != 0.0 && el.num_lots() != 1 {
        return Err(Error::BadConfiguration(
            "exact exchange supports a single (spin, k) block".to_string(),
        ));
    }

    let mut ham = KsHamiltonian::new(
        vec![Field::<f64>::new(&layout); spin.spin_channels()],
        projectors,
    );

    *ham.exchange_mut() = ExchangeOperator::new(exx_coefficient, theory.use_ace);

    let mut mixer = mixing::new(
        el_opts.mixing_scheme,
        el_opts.mixing_alpha,
        el_opts.mixing_history,
    );

    let includes_hartree = theory.functional.includes_hartree();
    let ion_energy = ewald.as_ref().map_or(0.0, |e| e.get_energy());

    let mut energy = Energy::new();
    let mut fermi_level = 0.0;
    let mut total_prev = 0.0;
    let mut convergence = Convergence::NotConverged;
    let mut iterations = 0;

    if pgrid.is_root() {
        println!(
            "    {:>4} {:>25} {:>14} {:>14} {:>14}",
            "iter", "E_total(Ha)", "dE(Ha)", "drho", "Ef(Ha)"
        );
    }

    for scf_iter in 1..=el_opts.scf_max_iter {
        iterations = scf_iter;

        // Step 1: Kohn-Sham potential from the current density.
        let (vks, _parts) =
            ks_potential(&trans, &vion, &rho, core.as_ref(), &xc_term, includes_hartree)?;
        ham.set_scalar_potential(vks);

        // Step 2: refresh the exact-exchange operator.
        if exx_coefficient != 0.0 && (scf_iter - 1) % theory.exx_update_every.max(1) == 0 {
            let occ0 = el.occupations[0].clone();
            let phi0 = el.lot(0).clone();

            energy.exact_exchange = ham
                .exchange_mut()
                .update(&trans_wfc, &phi0, &occ0)?;
        }

        // Step 3: iterative refinement + subspace diagonalization per lot.
        for i in 0..el.num_lots() {
            let mut phi = el.lot(i).clone();

            {
                let mut apply = |p: &OrbitalSet| ham.apply(&trans_wfc, p);
                let mut prec = |r: &mut OrbitalSet| kinetic_preconditioner(&trans_wfc, r);

                eigensolver::steepest_descent(
                    &mut apply,
                    &mut prec,
                    &mut phi,
                    el_opts.eigensolver_steps,
                )?;

                let evals = eigensolver::subspace_diagonalize(&mut apply, &mut phi)?;
                el.eigenvalues[i].copy_from_slice(&evals);
            }

            *el.lot_mut(i) = phi;
        }

        // Step 4: occupations through the Fermi-level solve.
        fermi_level = fermilevel::get_fermi_level(
            &el.eigenvalues,
            el.lot_kweights(),
            sm.as_ref(),
            el_opts.temperature,
            spin.max_occ(),
            nelec,
        )?;

        el.occupations = fermilevel::compute_occupations(
            &el.eigenvalues,
            sm.as_ref(),
            el_opts.temperature,
            spin.max_occ(),
            fermi_level,
        );

        // Step 5: output density.
        let rho_out = el.calculate_density()?;

        // Step 6: energy accounting on the output density.
        let out_parts = energy_terms(
            &trans,
            &trans_wfc,
            &vion,
            &rho_out,
            core.as_ref(),
            &xc_term,
            includes_hartree,
            &ham,
            &el,
        )?;

        energy.eigenvalues = el.eigenvalue_sum();
        energy.kinetic = out_parts.kinetic;
        energy.hartree = out_parts.hartree;
        energy.external = out_parts.external;
        energy.nonlocal = out_parts.nonlocal;
        energy.xc = out_parts.exc;
        energy.nvxc = out_parts.nvxc;
        energy.ion = ion_energy;

        let total = energy.total();
        let de = (total - total_prev).abs();
        total_prev = total;

        // Step 7: density change.
        let drho = density_change(&rho, &rho_out);

        if pgrid.is_root() {
            println!(
                "    {:>4} {:>25.12E} {:>14.3E} {:>14.3E} {:>14.6E}",
                scf_iter, total, de, drho, fermi_level
            );
        }

        let converged =
            scf_iter > 1 && de < el_opts.energy_tolerance && drho < el_opts.density_tolerance;

        if converged {
            convergence = Convergence::Converged {
                iterations: scf_iter,
            };

            rho = rho_out;

            info!(iterations = scf_iter, total, "scf converged");
            break;
        }

        // Step 8: mix toward the next trial density.
        mix_density(mixer.as_mut(), &mut rho, &rho_out);
    }

    if convergence == Convergence::NotConverged {
        warn!(
            iterations = el_opts.scf_max_iter,
            "scf did not converge; returning the last state"
        );
    }

    let magnetization = rho.total_magnetization();

    // forces for the converged state
    let forces = if ions.is_empty() {
        Vec::new()
    } else {
        let ion_ion = ewald
            .as_ref()
            .map(|e| e.get_force().to_vec())
            .unwrap_or_else(|| vec![Vector3f64::zeros(); ions.len()]);

        hamiltonian::calculate_forces(
            &trans,
            ions,
            species,
            &rho.total(),
            ham.projectors(),
            el.lots(),
            &el.occupations,
            el.lot_kweights(),
            &ion_ion,
        )?
    };

    Ok(ScfResult {
        energy,
        electrons: el,
        density: rho,
        fermi_level,
        iterations,
        convergence,
        magnetization,
        forces,
    })
}

/// Damp the high-kinetic part of an eigensolver residual:
/// r(G) <- r(G) / (1 + |G|^2/2).
fn kinetic_preconditioner(trans: &Transform, r: &mut fields::OrbitalSet) {
    let npoints = r.layout().local_len();
    let mut g = vec![types::c64 { re: 0.0, im: 0.0 }; npoints];
    let mut gr = vec![types::c64 { re: 0.0, im: 0.0 }; npoints];

    for j in 0..r.local_states() {
        trans.forward_slice(r.state(j), &mut g);

        for (v, &g2) in g.iter_mut().zip(trans.g2_local().iter()) {
            *v *= 1.0 / (1.0 + 0.5 * g2);
        }

        gr.copy_from_slice(&g);
        trans.backward_slice(&gr, r.state_mut(j));
    }
}

fn ion_terms(
    trans: &Transform,
    ions: &Ions,
    species: &SpeciesSet,
) -> Result<(Field<f64>, ProjectorAll, Option<Ewald>), Error> {
    let layout = trans.layout();

    if ions.is_empty() {
        return Ok((
            Field::<f64>::new(layout),
            ProjectorAll::new(Vec::new()),
            None,
        ));
    }

    let vion = hamiltonian::local_potential(trans, ions, species)?;
    let projectors = hamiltonian::build_projectors(layout, ions, species)?;

    let zions = ions.zions(species)?;
    let ewald = Ewald::new(
        ions.cell(),
        ions.positions(),
        &zions,
        trans.recip(),
    );

    Ok((vion, projectors, Some(ewald)))
}

fn initial_density(
    layout: &Layout,
    ions: &Ions,
    species: &SpeciesSet,
    spin: SpinScheme,
    nelec: f64,
) -> Result<SpinDensity, Error> {
    let total = if ions.is_empty() {
        // homogeneous-gas start
        let mut f = Field::<f64>::new(layout);
        f.set_value(nelec / layout.grid().cell().volume());
        f
    } else {
        hamiltonian::atomic_guess_density(layout, ions, species)?
    };

    let mut rho = SpinDensity::new(layout, spin.components())?;

    match &mut rho {
        SpinDensity::NonSpin(ch) => *ch = total,
        SpinDensity::Spin(up, dn) => {
            let mut half = total;
            half.scale(0.5);
            *up = half.clone();
            *dn = half;
        }
        SpinDensity::Ncl(_) => {
            return Err(Error::BadConfiguration(
                "non-collinear ground-state runs are not supported".to_string(),
            ))
        }
    }

    rho.normalize(nelec);

    Ok(rho)
}

struct EnergyTerms {
    kinetic: f64,
    hartree: f64,
    external: f64,
    nonlocal: f64,
    exc: f64,
    nvxc: f64,
}

#[allow(clippy::too_many_arguments)]
fn energy_terms(
    trans: &Transform,
    trans_wfc: &Transform,
    vion: &Field<f64>,
    rho_out: &SpinDensity,
    core: Option<&Field<f64>>,
    xc_term: &xc::XcTerm,
    includes_hartree: bool,
    ham: &KsHamiltonian,
    el: &Electrons,
) -> Result<EnergyTerms, Error> {
    let rho_tot = rho_out.total();

    let hartree = if includes_hartree {
        let vh = poisson::solve_real(trans, &rho_tot)?;
        0.5 * vh.integral_product(&rho_tot)
    } else {
        0.0
    };

    let xc_eval = xc_term.evaluate(trans, rho_out, core)?;

    let external = vion.integral_product(&rho_tot);

    let mut kinetic = 0.0;
    let mut nonlocal = 0.0;

    for i in 0..el.num_lots() {
        kinetic += ham.kinetic_energy(
            trans_wfc,
            el.lot(i),
            &el.occupations[i],
            el.lot_kweights()[i],
        );

        nonlocal += nonlocal_energy(ham, el.lot(i), &el.occupations[i], el.lot_kweights()[i]);
    }

    Ok(EnergyTerms {
        kinetic,
        hartree,
        external,
        nonlocal,
        exc: xc_eval.exc,
        nvxc: xc_eval.nvxc,
    })
}

/// sum_i occ_i sum_a,lm d_lm |<beta_lm|phi_i>|^2.
fn nonlocal_energy(ham: &KsHamiltonian, phi: &OrbitalSet, occ: &[f64], kweight: f64) -> f64 {
    let mut e = 0.0;

    for p in ham.projectors().iter() {
        let c = p.project(phi);
        let kb = p.kb_coefficients();

        for ist in 0..phi.local_states() {
            if occ[ist] < EPS20 {
                continue;
            }

            for ilm in 0..p.num_projectors() {
                e += occ[ist] * kweight * kb[ilm] * c[[ilm, ist]].norm_sqr();
            }
        }
    }

    e
}

fn density_change(rho_in: &SpinDensity, rho_out: &SpinDensity) -> f64 {
    let dv = rho_in.layout().grid().volume_element();

    let mut local = 0.0;

    for ch in 0..rho_in.components() {
        for (a, b) in rho_in
            .channel(ch)
            .as_slice()
            .iter()
            .zip(rho_out.channel(ch).as_slice().iter())
        {
            local += (a - b).abs();
        }
    }

    rho_in.layout().domain().sum_f64(local * dv)
}

fn mix_density(mixer: &mut dyn mixing::Mixing, rho: &mut SpinDensity, rho_out: &SpinDensity) {
    let nch = rho.components();
    let npoints = rho.channel(0).len();

    let mut input = Vec::with_capacity(nch * npoints);
    let mut residual = Vec::with_capacity(nch * npoints);

    for ch in 0..nch {
        input.extend_from_slice(rho.channel(ch).as_slice());

        for (a, b) in rho
            .channel(ch)
            .as_slice()
            .iter()
            .zip(rho_out.channel(ch).as_slice().iter())
        {
            residual.push(b - a);
        }
    }

    mixer.mix(&mut input, &residual);

    for ch in 0..nch {
        rho.channel_mut(ch)
            .as_mut_slice()
            .copy_from_slice(&input[ch * npoints..(ch + 1) * npoints]);
    }
}

#[cfg(test)]
mod tests;
