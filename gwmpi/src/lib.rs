//! Process environment and collective primitives.
//!
//! The engine is bulk-synchronous over a 2-D Cartesian process grid whose
//! axes partition orbital indices ("states") and grid points ("domain").
//! Every collective below must be called in the same global order on every
//! participating rank; there are no point-to-point fallbacks.
//!
//! The default build runs the same contracts over the in-process single-rank
//! communicator; the `mpi` feature switches the transport to MPI. Kernel code
//! never touches a global communicator: the environment is acquired once at
//! program entry and the communicators it hands out are passed down
//! explicitly.

mod part;
pub use part::BlockPart;

#[cfg(not(feature = "mpi"))]
mod serial;
#[cfg(not(feature = "mpi"))]
pub use serial::{Comm, Environment};

#[cfg(feature = "mpi")]
mod dist;
#[cfg(feature = "mpi")]
pub use dist::{Comm, Environment};

use types::Error;

/// The 2-D Cartesian process grid.
///
/// `states` connects ranks that share a domain coordinate (collectives over
/// orbital indices, projector ring rotation, EXX ring rotation); `domain`
/// connects ranks that share a states coordinate (grid-point reductions,
/// FFT all-to-all).
#[derive(Clone)]
pub struct ProcessGrid {
    full: Comm,
    states: Comm,
    domain: Comm,
}

impl ProcessGrid {
    pub fn new(world: &Comm, n_states_ranks: usize, n_domain_ranks: usize) -> Result<ProcessGrid, Error> {
        if n_states_ranks * n_domain_ranks != world.size() {
            return Err(Error::BadConfiguration(format!(
                "process grid {} x {} does not match communicator size {}",
                n_states_ranks,
                n_domain_ranks,
                world.size()
            )));
        }

        let states_coord = world.rank() / n_domain_ranks;
        let domain_coord = world.rank() % n_domain_ranks;

        let states = world.split(domain_coord, states_coord);
        let domain = world.split(states_coord, domain_coord);

        Ok(ProcessGrid {
            full: world.clone(),
            states,
            domain,
        })
    }

    /// Single-rank grid; the degenerate layout every test runs on.
    pub fn serial() -> ProcessGrid {
        let c = Comm::serial();

        ProcessGrid {
            full: c.clone(),
            states: c.clone(),
            domain: c,
        }
    }

    pub fn full(&self) -> &Comm {
        &self.full
    }

    pub fn states(&self) -> &Comm {
        &self.states
    }

    pub fn domain(&self) -> &Comm {
        &self.domain
    }

    pub fn is_root(&self) -> bool {
        self.full.rank() == 0
    }
}

/// Turn a local fatal error into a deterministic collective abort: every rank
/// broadcasts agreement on whether a failure happened before any rank
/// unwinds, so the program fails on all ranks together.
pub fn collective_error_check(comm: &Comm, local: Result<(), Error>) -> Result<(), Error> {
    let mut flag = [if local.is_err() { 1i32 } else { 0i32 }];

    comm.all_reduce_max_i32(&mut flag);

    if flag[0] != 0 {
        match local {
            Err(e) => Err(e),
            Ok(()) => Err(Error::IoFailure(
                "collective operation failed on another rank".to_string(),
            )),
        }
    } else {
        Ok(())
    }
}
