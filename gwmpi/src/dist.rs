use mpi::collective::SystemOperation;
use mpi::topology::{Color, SimpleCommunicator};
use mpi::traits::*;

use std::sync::Arc;
use types::{c64, Error};

/// MPI-backed communicator. Complex buffers are reinterpreted as
/// twice-as-long f64 buffers for reductions and broadcasts, so no
/// `MPI_DOUBLE_COMPLEX` support is required of the transport.
#[derive(Clone)]
pub struct Comm {
    inner: Arc<SimpleCommunicator>,
}

pub struct Environment {
    _universe: mpi::environment::Universe,
    world: Comm,
}

impl Environment {
    pub fn init() -> Result<Environment, Error> {
        let universe = mpi::initialize()
            .ok_or_else(|| Error::BadConfiguration("MPI initialization failed".to_string()))?;

        let world = Comm {
            inner: Arc::new(universe.world()),
        };

        Ok(Environment {
            _universe: universe,
            world,
        })
    }

    pub fn world(&self) -> &Comm {
        &self.world
    }
}

fn as_f64_slice(buf: &mut [c64]) -> &mut [f64] {
    unsafe { std::slice::from_raw_parts_mut(buf.as_mut_ptr() as *mut f64, buf.len() * 2) }
}

impl Comm {
    /// Self-communicator fallback used by unit tests run under mpiexec -n 1.
    pub fn serial() -> Comm {
        Comm {
            inner: Arc::new(SimpleCommunicator::self_comm()),
        }
    }

    pub fn rank(&self) -> usize {
        self.inner.rank() as usize
    }

    pub fn size(&self) -> usize {
        self.inner.size() as usize
    }

    pub fn is_root(&self) -> bool {
        self.rank() == 0
    }

    pub fn split(&self, color: usize, key: usize) -> Comm {
        let sub = self
            .inner
            .split_by_color_with_key(Color::with_value(color as i32), key as i32)
            .expect("communicator split produced no subgroup");

        Comm {
            inner: Arc::new(sub),
        }
    }

    pub fn barrier(&self) {
        self.inner.barrier();
    }

    pub fn all_reduce_sum_f64(&self, buf: &mut [f64]) {
        let send = buf.to_vec();

        self.inner
            .all_reduce_into(&send[..], buf, SystemOperation::sum());
    }

    pub fn all_reduce_sum_c64(&self, buf: &mut [c64]) {
        self.all_reduce_sum_f64(as_f64_slice(buf));
    }

    pub fn all_reduce_max_i32(&self, buf: &mut [i32]) {
        let send = buf.to_vec();

        self.inner
            .all_reduce_into(&send[..], buf, SystemOperation::max());
    }

    pub fn broadcast_f64(&self, buf: &mut [f64], root: usize) {
        self.inner.process_at_rank(root as i32).broadcast_into(buf);
    }

    pub fn broadcast_c64(&self, buf: &mut [c64], root: usize) {
        self.broadcast_f64(as_f64_slice(buf), root);
    }

    pub fn broadcast_i32(&self, buf: &mut [i32], root: usize) {
        self.inner.process_at_rank(root as i32).broadcast_into(buf);
    }

    pub fn broadcast_u8(&self, buf: &mut [u8], root: usize) {
        self.inner.process_at_rank(root as i32).broadcast_into(buf);
    }

    pub fn all_to_all_c64(&self, send: &[c64], recv: &mut [c64]) {
        assert_eq!(send.len(), recv.len());
        assert_eq!(send.len() % self.size(), 0);

        let sendf =
            unsafe { std::slice::from_raw_parts(send.as_ptr() as *const f64, send.len() * 2) };

        self.inner.all_to_all_into(sendf, as_f64_slice(recv));
    }

    pub fn sendrecv_replace_c64(&self, buf: &mut [c64], dest: usize, source: usize) {
        let send = buf.to_vec();
        let sendf =
            unsafe { std::slice::from_raw_parts(send.as_ptr() as *const f64, send.len() * 2) };

        mpi::point_to_point::send_receive_into(
            sendf,
            &self.inner.process_at_rank(dest as i32),
            as_f64_slice(buf),
            &self.inner.process_at_rank(source as i32),
        );
    }

    pub fn sum_f64(&self, x: f64) -> f64 {
        let mut v = [x];

        self.all_reduce_sum_f64(&mut v);

        v[0]
    }
}
