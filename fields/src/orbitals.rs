use crate::{Field, Layout};
use gwmpi::BlockPart;
use matrix::Matrix;
use types::{c64, Error};
use vector3::Vector3f64;

/// A batch of Kohn-Sham orbitals sharing one grid.
///
/// Storage is a (local points x local states) column-major matrix; each
/// orbital is a contiguous column. The state axis is block-partitioned over
/// the "states" process axis, grid points over the "domain" axis.
#[derive(Clone)]
pub struct OrbitalSet {
    layout: Layout,
    kpoint: Vector3f64,
    spin_index: usize,
    nstates: usize,
    spart: BlockPart,
    data: Matrix<c64>,
}

impl OrbitalSet {
    pub fn new(layout: &Layout, nstates: usize, kpoint: Vector3f64, spin_index: usize) -> OrbitalSet {
        let spart = BlockPart::new(nstates, layout.states().size());
        let local_states = spart.local_size(layout.states().rank());

        OrbitalSet {
            layout: layout.clone(),
            kpoint,
            spin_index,
            nstates,
            spart,
            data: Matrix::<c64>::new(layout.local_len(), local_states),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn kpoint(&self) -> Vector3f64 {
        self.kpoint
    }

    pub fn spin_index(&self) -> usize {
        self.spin_index
    }

    /// Global number of states; known on every rank.
    pub fn num_states(&self) -> usize {
        self.nstates
    }

    pub fn local_states(&self) -> usize {
        self.spart.local_size(self.layout.states().rank())
    }

    pub fn states_part(&self) -> BlockPart {
        self.spart
    }

    pub fn global_state_index(&self, j: usize) -> usize {
        self.spart.start(self.layout.states().rank()) + j
    }

    pub fn state(&self, j: usize) -> &[c64] {
        self.data.get_col(j)
    }

    pub fn state_mut(&mut self, j: usize) -> &mut [c64] {
        self.data.get_mut_col(j)
    }

    pub fn matrix(&self) -> &Matrix<c64> {
        &self.data
    }

    pub fn matrix_mut(&mut self) -> &mut Matrix<c64> {
        &mut self.data
    }

    /// Same shape, k-point and spin, fresh zeroed storage.
    pub fn skeleton(&self) -> OrbitalSet {
        OrbitalSet::new(&self.layout, self.nstates, self.kpoint, self.spin_index)
    }

    pub fn set_zero(&mut self) {
        self.data.set_value(c64 { re: 0.0, im: 0.0 });
    }

    pub fn assign(&mut self, other: &OrbitalSet) {
        self.data.assign(&other.data);
    }

    pub fn matches(&self, other: &OrbitalSet) -> Result<(), Error> {
        self.layout.matches(other.layout())?;

        if self.nstates != other.nstates {
            return Err(Error::ShapeMismatch(format!(
                "orbital sets hold {} vs {} states",
                self.nstates, other.nstates
            )));
        }

        Ok(())
    }

    /// Element-wise update over (point, state) pairs:
    /// f(local point, local state, value).
    pub fn update_each(&mut self, mut f: impl FnMut(usize, usize, &mut c64)) {
        for j in 0..self.local_states() {
            let col = self.data.get_mut_col(j);

            for (ip, v) in col.iter_mut().enumerate() {
                f(ip, j, v);
            }
        }
    }

    /// Fill with normalized random vectors; the usual starting guess before
    /// orthonormalization.
    pub fn randomize(&mut self) {
        let dv = self.layout.grid().volume_element();

        for j in 0..self.local_states() {
            let col = self.data.get_mut_col(j);

            utility::make_normalized_rand_vector(col);

            // normalize in the dV metric
            let s = 1.0 / dv.sqrt();
            col.iter_mut().for_each(|x| *x *= s);
        }
    }

    /// Extract one orbital as a standalone field.
    pub fn extract(&self, j: usize) -> Field<c64> {
        let mut f = Field::<c64>::new(&self.layout);

        f.as_mut_slice().copy_from_slice(self.state(j));

        f
    }
}
