use super::*;
use lattice::Cell;
use options::Functional;
use pspot::Species;

fn heg_setup(nelec: f64, kpoints: [usize; 3]) -> (Ions, SpeciesSet, ElectronsOptions) {
    let cell = Cell::cubic(6.0, 3).unwrap();
    let ions = Ions::new(cell);
    let species = SpeciesSet::new();

    let el_opts = ElectronsOptions::default()
        .cutoff(10.0)
        .extra_electrons(nelec)
        .extra_states(2)
        .temperature(300.0)
        .kpoints(kpoints);

    (ions, species, el_opts)
}

#[test]
fn test_homogeneous_gas_lda_converges() {
    let pgrid = ProcessGrid::serial();
    let (ions, species, el_opts) = heg_setup(2.0, [1, 1, 1]);

    let theory = TheoryOptions::default().functional(Functional::Lda);

    let result = run(&pgrid, &ions, &species, &theory, &el_opts).unwrap();

    assert!(matches!(result.convergence, Convergence::Converged { .. }));

    // charge conservation
    assert!((result.density.total_charge() - 2.0).abs() < 1E-8);

    // eigenvalues ascending within each lot
    for evals in &result.electrons.eigenvalues {
        assert!(evals.windows(2).all(|w| w[0] <= w[1] + 1E-10));
    }

    // uniform gas: no dipole-scale structure, kinetic bounded by the
    // occupied plane-wave levels
    assert!(result.energy.kinetic >= 0.0);
    assert!(result.energy.xc < 0.0);
    assert!(result.magnetization.norm2() < 1E-10);
}

#[test]
fn test_homogeneous_gas_with_kpoints() {
    let pgrid = ProcessGrid::serial();
    let (ions, species, el_opts) = heg_setup(4.0, [1, 1, 3]);

    let theory = TheoryOptions::default().functional(Functional::Lda);

    let result = run(&pgrid, &ions, &species, &theory, &el_opts).unwrap();

    assert_eq!(result.electrons.num_lots(), 3);
    assert!((result.density.total_charge() - 4.0).abs() < 1E-8);

    // the Gamma lot holds the lowest level
    let e_gamma = result.electrons.eigenvalues[0][0];
    for evals in &result.electrons.eigenvalues[1..] {
        assert!(evals[0] >= e_gamma - 1E-10);
    }
}

#[test]
fn test_single_atom_non_interacting() {
    // one erf-screened well, non-interacting electrons: the scf reduces to
    // one eigenproblem; hartree and xc stay exactly zero
    let cell = Cell::cubic(10.0, 3).unwrap();

    let mut species = SpeciesSet::new();
    species.insert(Species::local_erf("He", 2.0, 4.0026, 0.8));

    let mut ions = Ions::new(cell);
    ions.insert("He", 4.0026 * pspot::AMU_TO_AU, Vector3f64::zeros());

    let el_opts = ElectronsOptions::default()
        .cutoff(15.0)
        .extra_states(2)
        .temperature(300.0);

    let theory = TheoryOptions::default().functional(Functional::NonInteracting);

    let pgrid = ProcessGrid::serial();
    let result = run(&pgrid, &ions, &species, &theory, &el_opts).unwrap();

    assert!(matches!(result.convergence, Convergence::Converged { .. }));
    assert_eq!(result.energy.hartree, 0.0);
    assert_eq!(result.energy.xc, 0.0);
    assert_eq!(result.energy.exact_exchange, 0.0);

    // bound ground state below the vacuum level
    assert!(result.electrons.eigenvalues[0][0] < 0.0);

    // the atom sits at a symmetry point: residual force is small
    assert!(result.forces[0].norm2() < 1E-3, "force {}", result.forces[0]);

    // orthonormality invariant after the run
    let phi = result.electrons.lot(0);
    let m = operations::overlap(phi, phi).unwrap();

    for i in 0..phi.num_states() {
        for j in 0..phi.num_states() {
            let expect = if i == j { 1.0 } else { 0.0 };
            assert!((m[[i, j]].re - expect).abs() < 1E-10);
            assert!(m[[i, j]].im.abs() < 1E-10);
        }
    }
}

#[test]
fn test_missing_grid_spec_is_fatal() {
    let pgrid = ProcessGrid::serial();

    let cell = Cell::cubic(6.0, 3).unwrap();
    let ions = Ions::new(cell);
    let species = SpeciesSet::new();

    let el_opts = ElectronsOptions {
        extra_electrons: 2.0,
        ..ElectronsOptions::default()
    };

    let theory = TheoryOptions::default();

    let res = run(&pgrid, &ions, &species, &theory, &el_opts);

    assert!(matches!(res, Err(Error::BadConfiguration(_))));
}

#[test]
fn test_hartree_fock_ace_runs() {
    // tiny Hartree-Fock run exercising the ACE update path end to end
    let pgrid = ProcessGrid::serial();
    let (ions, species, mut el_opts) = heg_setup(2.0, [1, 1, 1]);
    el_opts.scf_max_iter = 12;

    let theory = TheoryOptions::default().functional(Functional::HartreeFock);

    let result = run(&pgrid, &ions, &species, &theory, &el_opts).unwrap();

    // exchange energy is negative and the state is returned even if the
    // loop hit the iteration cap
    assert!(result.energy.exact_exchange < 0.0);
    assert!((result.density.total_charge() - 2.0).abs() < 1E-8);
}
