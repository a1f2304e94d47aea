use crate::Mixing;
use fifo::FIFO;
use gwconsts::*;
use matrix::Matrix;
use types::c64;

/// Pulay (DIIS) mixing on the density residual history.
pub struct MixingPulay {
    alpha: f64,
    vin: FIFO<Vec<f64>>,
    vres: FIFO<Vec<f64>>,
    niter: usize,
}

impl MixingPulay {
    pub fn new(alpha: f64, history: usize) -> MixingPulay {
        MixingPulay {
            alpha,
            vin: FIFO::new(history.max(2)),
            vres: FIFO::new(history.max(2)),
            niter: 0,
        }
    }
}

impl Mixing for MixingPulay {
    fn mix(&mut self, input: &mut [f64], residual: &[f64]) {
        assert_eq!(input.len(), residual.len());

        self.niter += 1;

        self.vin.push(input.to_vec());
        self.vres.push(residual.to_vec());

        if self.niter == 1 {
            for (x, r) in input.iter_mut().zip(residual.iter()) {
                *x += self.alpha * r;
            }

            return;
        }

        let coef = compute_coef(&self.vres);

        input.iter_mut().for_each(|x| *x = 0.0);

        for (j, &c) in coef.iter().enumerate() {
            let tin = &self.vin[j];
            let tres = &self.vres[j];

            for (i, x) in input.iter_mut().enumerate() {
                *x += c * (tin[i] + self.alpha * tres[i]);
            }
        }
    }
}

/// Residual-overlap system: minimize |sum_j c_j r_j| with sum c_j = 1.
fn compute_coef(vres: &FIFO<Vec<f64>>) -> Vec<f64> {
    let n = vres.len();

    let mut a = Matrix::<c64>::new(n, n);

    for i in 0..n {
        for j in 0..n {
            let d = utility::ddot_product(&vres[j], &vres[i]);

            a[[j, i]] = c64 { re: d, im: 0.0 };
        }
    }

    a.pinv();

    let s = a.sum();

    let mut coef = vec![0.0; n];

    if s.norm() < EPS30 {
        // degenerate history; fall back to the newest entry
        coef[n - 1] = 1.0;
        return coef;
    }

    for (i, c) in coef.iter_mut().enumerate() {
        let mut f = c64 { re: 0.0, im: 0.0 };

        for j in 0..n {
            f += a[[j, i]];
        }

        *c = (f / s).re;
    }

    coef
}
