//! Distributed field containers.
//!
//! A `Field` is one function on the grid; an `OrbitalSet` is a batch of
//! functions sharing a grid. Grid points are split along the slowest (z)
//! axis over the "domain" process axis; orbital indices are split over the
//! "states" axis. Local blocks are contiguous, sized ceil(N/P) with the
//! remainder on the last rank.

mod field;
mod orbitals;

pub use field::Field;
pub use orbitals::OrbitalSet;

use grid::RealGrid;
use gwmpi::{BlockPart, Comm, ProcessGrid};
use types::Error;
use vector3::Vector3f64;

/// Grid plus its process-grid decomposition. Copied by value into every
/// container; the cell and grid descriptors are immutable.
#[derive(Clone)]
pub struct Layout {
    grid: RealGrid,
    domain: Comm,
    states: Comm,
    zpart: BlockPart,
}

impl Layout {
    pub fn new(grid: &RealGrid, pgrid: &ProcessGrid) -> Layout {
        let zpart = BlockPart::new(grid.get_n3(), pgrid.domain().size());

        Layout {
            grid: grid.clone(),
            domain: pgrid.domain().clone(),
            states: pgrid.states().clone(),
            zpart,
        }
    }

    pub fn serial(grid: &RealGrid) -> Layout {
        Layout::new(grid, &ProcessGrid::serial())
    }

    pub fn grid(&self) -> &RealGrid {
        &self.grid
    }

    pub fn domain(&self) -> &Comm {
        &self.domain
    }

    pub fn states(&self) -> &Comm {
        &self.states
    }

    pub fn zpart(&self) -> BlockPart {
        self.zpart
    }

    /// Number of z planes held locally.
    pub fn local_nz(&self) -> usize {
        self.zpart.local_size(self.domain.rank())
    }

    /// First global z plane held locally.
    pub fn z0(&self) -> usize {
        self.zpart.start(self.domain.rank())
    }

    /// Local storage length.
    pub fn local_len(&self) -> usize {
        self.grid.get_n1() * self.grid.get_n2() * self.local_nz()
    }

    #[inline]
    pub fn local_index(&self, ix: usize, iy: usize, izloc: usize) -> usize {
        ix + self.grid.get_n1() * (iy + self.grid.get_n2() * izloc)
    }

    /// Cartesian coordinates of the local point (ix, iy, izloc).
    pub fn rvector_local(&self, ix: usize, iy: usize, izloc: usize) -> Vector3f64 {
        self.grid.rvector(ix, iy, self.z0() + izloc)
    }

    /// Visit every local point: f(linear_local, ix, iy, iz_global).
    pub fn for_each_local_point(&self, mut f: impl FnMut(usize, usize, usize, usize)) {
        let n1 = self.grid.get_n1();
        let n2 = self.grid.get_n2();
        let z0 = self.z0();

        let mut ip = 0;

        for izloc in 0..self.local_nz() {
            for iy in 0..n2 {
                for ix in 0..n1 {
                    f(ip, ix, iy, z0 + izloc);
                    ip += 1;
                }
            }
        }
    }

    pub fn matches(&self, other: &Layout) -> Result<(), Error> {
        self.grid.shape_matches(other.grid())?;

        if self.zpart != other.zpart {
            return Err(Error::ShapeMismatch(
                "domain partitions disagree".to_string(),
            ));
        }

        Ok(())
    }
}
