//! Atomic positions, velocities and the sub-propagators that move them
//! during real-time runs.

use lattice::Cell;
use pspot::SpeciesSet;
use types::Error;
use vector3::Vector3f64;

#[derive(Clone)]
pub struct Ions {
    cell: Cell,
    symbols: Vec<String>,
    positions: Vec<Vector3f64>,
    velocities: Vec<Vector3f64>,
    masses: Vec<f64>,
}

impl Ions {
    pub fn new(cell: Cell) -> Ions {
        Ions {
            cell,
            symbols: Vec::new(),
            positions: Vec::new(),
            velocities: Vec::new(),
            masses: Vec::new(),
        }
    }

    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    pub fn insert(&mut self, symbol: &str, mass: f64, position: Vector3f64) {
        self.symbols.push(symbol.to_string());
        self.positions.push(position);
        self.velocities.push(Vector3f64::zeros());
        self.masses.push(mass);
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
        self.positions.clear();
        self.velocities.clear();
        self.masses.clear();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn positions(&self) -> &[Vector3f64] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [Vector3f64] {
        &mut self.positions
    }

    pub fn velocities(&self) -> &[Vector3f64] {
        &self.velocities
    }

    pub fn velocities_mut(&mut self) -> &mut [Vector3f64] {
        &mut self.velocities
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    /// Valence charges per atom from the registered species.
    pub fn zions(&self, species: &SpeciesSet) -> Result<Vec<f64>, Error> {
        self.symbols
            .iter()
            .map(|s| species.get(s).map(|sp| sp.zval()))
            .collect()
    }

    pub fn num_electrons(&self, species: &SpeciesSet) -> Result<f64, Error> {
        Ok(self.zions(species)?.iter().sum())
    }
}

/// The hook the real-time driver calls around each step. `needs_force`
/// decides whether forces are assembled at all.
pub trait IonPropagator {
    fn needs_force(&self) -> bool;

    fn propagate_positions(&self, dt: f64, ions: &mut Ions, forces: Option<&[Vector3f64]>);

    fn propagate_velocities(&self, dt: f64, ions: &mut Ions, forces: &[Vector3f64]);
}

/// Ions stay where they are.
pub struct Fixed;

impl IonPropagator for Fixed {
    fn needs_force(&self) -> bool {
        false
    }

    fn propagate_positions(&self, _dt: f64, _ions: &mut Ions, _forces: Option<&[Vector3f64]>) {}

    fn propagate_velocities(&self, _dt: f64, _ions: &mut Ions, _forces: &[Vector3f64]) {}
}

/// Constant-velocity drift after an initial impulsive kick; no forces.
pub struct Impulsive;

impl IonPropagator for Impulsive {
    fn needs_force(&self) -> bool {
        false
    }

    fn propagate_positions(&self, dt: f64, ions: &mut Ions, _forces: Option<&[Vector3f64]>) {
        let velocities = ions.velocities().to_vec();

        for (r, v) in ions.positions_mut().iter_mut().zip(velocities.iter()) {
            *r += *v * dt;
        }
    }

    fn propagate_velocities(&self, _dt: f64, _ions: &mut Ions, _forces: &[Vector3f64]) {}
}

/// Velocity Verlet, split into the half-kick + drift and the closing
/// half-kick the driver calls once the new forces exist.
pub struct VelocityVerlet;

impl IonPropagator for VelocityVerlet {
    fn needs_force(&self) -> bool {
        true
    }

    fn propagate_positions(&self, dt: f64, ions: &mut Ions, forces: Option<&[Vector3f64]>) {
        let forces = forces.expect("velocity Verlet needs forces for the position update");
        let masses = ions.masses().to_vec();

        {
            let velocities = ions.velocities_mut();

            for ((v, f), &m) in velocities.iter_mut().zip(forces.iter()).zip(masses.iter()) {
                *v += *f * (0.5 * dt / m);
            }
        }

        let velocities = ions.velocities().to_vec();

        for (r, v) in ions.positions_mut().iter_mut().zip(velocities.iter()) {
            *r += *v * dt;
        }
    }

    fn propagate_velocities(&self, dt: f64, ions: &mut Ions, forces: &[Vector3f64]) {
        let masses = ions.masses().to_vec();

        for ((v, f), &m) in ions
            .velocities_mut()
            .iter_mut()
            .zip(forces.iter())
            .zip(masses.iter())
        {
            *v += *f * (0.5 * dt / m);
        }
    }
}
