use types::{c64, Error};

/// In-process single-rank communicator. Collectives are the identity; the
/// call sites still observe the collective calling contract so the MPI
/// transport can be swapped in without touching them.
#[derive(Debug, Clone)]
pub struct Comm {
    rank: usize,
    size: usize,
}

pub struct Environment {
    world: Comm,
}

impl Environment {
    pub fn init() -> Result<Environment, Error> {
        Ok(Environment {
            world: Comm::serial(),
        })
    }

    pub fn world(&self) -> &Comm {
        &self.world
    }
}

impl Comm {
    pub fn serial() -> Comm {
        Comm { rank: 0, size: 1 }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_root(&self) -> bool {
        self.rank == 0
    }

    pub fn split(&self, _color: usize, _key: usize) -> Comm {
        Comm::serial()
    }

    pub fn barrier(&self) {}

    pub fn all_reduce_sum_f64(&self, _buf: &mut [f64]) {}

    pub fn all_reduce_sum_c64(&self, _buf: &mut [c64]) {}

    pub fn all_reduce_max_i32(&self, _buf: &mut [i32]) {}

    pub fn broadcast_f64(&self, _buf: &mut [f64], _root: usize) {}

    pub fn broadcast_c64(&self, _buf: &mut [c64], _root: usize) {}

    pub fn broadcast_i32(&self, _buf: &mut [i32], _root: usize) {}

    pub fn broadcast_u8(&self, _buf: &mut [u8], _root: usize) {}

    /// Uniform-count all-to-all; with one rank this is a copy.
    pub fn all_to_all_c64(&self, send: &[c64], recv: &mut [c64]) {
        assert_eq!(send.len(), recv.len());

        recv.copy_from_slice(send);
    }

    /// Ring exchange; with one rank source == dest == self, so the buffer is
    /// already in place.
    pub fn sendrecv_replace_c64(&self, _buf: &mut [c64], dest: usize, source: usize) {
        assert_eq!(dest, 0);
        assert_eq!(source, 0);
    }

    pub fn sum_f64(&self, x: f64) -> f64 {
        x
    }
}
