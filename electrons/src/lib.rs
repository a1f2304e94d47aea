//! The electronic state of a calculation: one orbital set per (spin, k)
//! block, with eigenvalues and occupations alongside.

use density::SpinDensity;
use fields::{Layout, OrbitalSet};
use kpts::KMesh;
use lattice::Cell;
use types::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpinScheme {
    Unpolarized,
    Polarized,
    NonCollinear,
}

impl SpinScheme {
    pub fn components(&self) -> usize {
        match self {
            SpinScheme::Unpolarized => 1,
            SpinScheme::Polarized => 2,
            SpinScheme::NonCollinear => 4,
        }
    }

    /// Highest occupation a single state can carry.
    pub fn max_occ(&self) -> f64 {
        match self {
            SpinScheme::Unpolarized => 2.0,
            _ => 1.0,
        }
    }

    /// Independent collinear channels.
    pub fn spin_channels(&self) -> usize {
        match self {
            SpinScheme::Polarized => 2,
            _ => 1,
        }
    }
}

pub struct Electrons {
    spin: SpinScheme,
    nelec: f64,
    temperature: f64,
    kmesh: KMesh,
    lots: Vec<OrbitalSet>,
    lot_kweights: Vec<f64>,
    pub eigenvalues: Vec<Vec<f64>>,
    pub occupations: Vec<Vec<f64>>,
}

impl Electrons {
    pub fn new(
        layout: &Layout,
        cell: &Cell,
        kmesh: &KMesh,
        spin: SpinScheme,
        nstates: usize,
        nelec: f64,
        temperature: f64,
    ) -> Result<Electrons, Error> {
        if nstates == 0 {
            return Err(Error::BadConfiguration(
                "an orbital set needs at least one state".to_string(),
            ));
        }

        if spin == SpinScheme::NonCollinear {
            return Err(Error::BadConfiguration(
                "non-collinear orbital sets are not supported by this driver".to_string(),
            ));
        }

        let mut lots = Vec::new();
        let mut lot_kweights = Vec::new();

        for ispin in 0..spin.spin_channels() {
            for ik in 0..kmesh.len() {
                let kcart = kmesh.cart(ik, cell);

                lots.push(OrbitalSet::new(layout, nstates, kcart, ispin));
                lot_kweights.push(kmesh.weight(ik));
            }
        }

        let nlots = lots.len();

        Ok(Electrons {
            spin,
            nelec,
            temperature,
            kmesh: kmesh.clone(),
            lots,
            lot_kweights,
            eigenvalues: vec![vec![0.0; nstates]; nlots],
            occupations: vec![vec![0.0; nstates]; nlots],
        })
    }

    pub fn spin(&self) -> SpinScheme {
        self.spin
    }

    pub fn num_electrons(&self) -> f64 {
        self.nelec
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn kmesh(&self) -> &KMesh {
        &self.kmesh
    }

    pub fn num_lots(&self) -> usize {
        self.lots.len()
    }

    pub fn num_states(&self) -> usize {
        self.lots[0].num_states()
    }

    pub fn layout(&self) -> &Layout {
        self.lots[0].layout()
    }

    pub fn lot(&self, i: usize) -> &OrbitalSet {
        &self.lots[i]
    }

    pub fn lot_mut(&mut self, i: usize) -> &mut OrbitalSet {
        &mut self.lots[i]
    }

    pub fn lots(&self) -> &[OrbitalSet] {
        &self.lots
    }

    pub fn lots_mut(&mut self) -> &mut [OrbitalSet] {
        &mut self.lots
    }

    pub fn lot_kweights(&self) -> &[f64] {
        &self.lot_kweights
    }

    /// Randomized, orthonormalized starting guess.
    pub fn randomize(&mut self) -> Result<(), Error> {
        for phi in self.lots.iter_mut() {
            phi.randomize();
            operations::orthonormalize(phi)?;
        }

        Ok(())
    }

    /// Occupation-weighted eigenvalue sum.
    pub fn eigenvalue_sum(&self) -> f64 {
        let mut s = 0.0;

        for (i, (evals, occ)) in self
            .eigenvalues
            .iter()
            .zip(self.occupations.iter())
            .enumerate()
        {
            let w = self.lot_kweights[i];

            for (&e, &f) in evals.iter().zip(occ.iter()) {
                s += w * e * f;
            }
        }

        s
    }

    pub fn calculate_density(&self) -> Result<SpinDensity, Error> {
        density::calculate(
            &self.lots,
            &self.occupations,
            &self.lot_kweights,
            self.spin.components(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid::RealGrid;

    fn setup(spin: SpinScheme) -> (Layout, Cell, KMesh) {
        let cell = Cell::cubic(6.0, 3).unwrap();
        let grid = RealGrid::with_sizes(&cell, [8, 8, 8]);
        let _ = spin;

        (Layout::serial(&grid), cell, KMesh::uniform([1, 1, 2]))
    }

    #[test]
    fn test_lot_structure_polarized() {
        let (layout, cell, kmesh) = setup(SpinScheme::Polarized);

        let el = Electrons::new(
            &layout,
            &cell,
            &kmesh,
            SpinScheme::Polarized,
            4,
            6.0,
            300.0,
        )
        .unwrap();

        // 2 spins x 2 k-points
        assert_eq!(el.num_lots(), 4);
        assert_eq!(el.lot(0).spin_index(), 0);
        assert_eq!(el.lot(2).spin_index(), 1);
        assert_eq!(el.lot_kweights(), &[0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_density_from_randomized_guess() {
        let (layout, cell, kmesh) = setup(SpinScheme::Unpolarized);

        let mut el = Electrons::new(
            &layout,
            &cell,
            &kmesh,
            SpinScheme::Unpolarized,
            3,
            4.0,
            300.0,
        )
        .unwrap();

        el.randomize().unwrap();

        for occ in el.occupations.iter_mut() {
            occ.copy_from_slice(&[2.0, 2.0, 0.0]);
        }

        let rho = el.calculate_density().unwrap();

        assert!((rho.total_charge() - 4.0).abs() < 1E-8);
    }

    #[test]
    fn test_eigenvalue_sum() {
        let (layout, cell, kmesh) = setup(SpinScheme::Unpolarized);

        let mut el = Electrons::new(
            &layout,
            &cell,
            &kmesh,
            SpinScheme::Unpolarized,
            2,
            2.0,
            0.0,
        )
        .unwrap();

        el.eigenvalues[0].copy_from_slice(&[-1.0, 1.0]);
        el.eigenvalues[1].copy_from_slice(&[-0.5, 0.5]);
        el.occupations[0].copy_from_slice(&[2.0, 0.0]);
        el.occupations[1].copy_from_slice(&[2.0, 0.0]);

        // 0.5*(-2.0) + 0.5*(-1.0)
        assert!((el.eigenvalue_sum() + 1.5).abs() < 1E-12);
    }

    #[test]
    fn test_non_collinear_rejected() {
        let (layout, cell, kmesh) = setup(SpinScheme::NonCollinear);

        let res = Electrons::new(
            &layout,
            &cell,
            &kmesh,
            SpinScheme::NonCollinear,
            2,
            2.0,
            0.0,
        );

        assert!(matches!(res, Err(Error::BadConfiguration(_))));
    }
}
