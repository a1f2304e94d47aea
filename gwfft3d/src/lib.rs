use rustfft::{Fft, FftPlanner};
use std::sync::Arc;
use types::c64;

/// Planned 3-D complex-to-complex FFT over a first-index-fastest array.
///
/// Neither direction applies a normalization; the transform layer divides by
/// N_total on the inverse pass.
pub struct GWFFT3D {
    n: [usize; 3],
    fwd: [Arc<dyn Fft<f64>>; 3],
    bwd: [Arc<dyn Fft<f64>>; 3],
}

impl GWFFT3D {
    pub fn new(n1: usize, n2: usize, n3: usize) -> GWFFT3D {
        let mut planner = FftPlanner::<f64>::new();

        let fwd = [
            planner.plan_fft_forward(n1),
            planner.plan_fft_forward(n2),
            planner.plan_fft_forward(n3),
        ];

        let bwd = [
            planner.plan_fft_inverse(n1),
            planner.plan_fft_inverse(n2),
            planner.plan_fft_inverse(n3),
        ];

        GWFFT3D {
            n: [n1, n2, n3],
            fwd,
            bwd,
        }
    }

    pub fn shape(&self) -> [usize; 3] {
        self.n
    }

    /// r -> G, e^{-iG.r} convention, unnormalized.
    pub fn fft3d(&self, slice_in: &[c64], slice_out: &mut [c64]) {
        self.transform(slice_in, slice_out, &self.fwd);
    }

    /// G -> r, e^{+iG.r} convention, unnormalized.
    pub fn ifft3d(&self, slice_in: &[c64], slice_out: &mut [c64]) {
        self.transform(slice_in, slice_out, &self.bwd);
    }

    fn transform(&self, slice_in: &[c64], slice_out: &mut [c64], plans: &[Arc<dyn Fft<f64>>; 3]) {
        let [n1, n2, n3] = self.n;
        let ntot = n1 * n2 * n3;

        assert_eq!(slice_in.len(), ntot, "fft3d input length mismatch");
        assert_eq!(slice_out.len(), ntot, "fft3d output length mismatch");

        slice_out.copy_from_slice(slice_in);

        // axis 1: contiguous lines
        for chunk in slice_out.chunks_exact_mut(n1) {
            plans[0].process(chunk);
        }

        // axis 2: stride n1
        let mut line = vec![c64 { re: 0.0, im: 0.0 }; n2];

        for iz in 0..n3 {
            for ix in 0..n1 {
                let base = ix + iz * n1 * n2;

                for iy in 0..n2 {
                    line[iy] = slice_out[base + iy * n1];
                }

                plans[1].process(&mut line);

                for iy in 0..n2 {
                    slice_out[base + iy * n1] = line[iy];
                }
            }
        }

        // axis 3: stride n1*n2
        let stride = n1 * n2;
        let mut line = vec![c64 { re: 0.0, im: 0.0 }; n3];

        for iy in 0..n2 {
            for ix in 0..n1 {
                let base = ix + iy * n1;

                for iz in 0..n3 {
                    line[iz] = slice_out[base + iz * stride];
                }

                plans[2].process(&mut line);

                for iz in 0..n3 {
                    slice_out[base + iz * stride] = line[iz];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_fft_roundtrip() {
        let (n1, n2, n3) = (6, 5, 4);
        let ntot = n1 * n2 * n3;

        let fft = GWFFT3D::new(n1, n2, n3);

        let vin: Vec<c64> = (0..ntot)
            .map(|i| c64 {
                re: (0.3 * i as f64).sin(),
                im: (0.7 * i as f64).cos(),
            })
            .collect();

        let mut vg = vec![c64 { re: 0.0, im: 0.0 }; ntot];
        let mut vout = vec![c64 { re: 0.0, im: 0.0 }; ntot];

        fft.fft3d(&vin, &mut vg);
        fft.ifft3d(&vg, &mut vout);

        for (a, b) in vin.iter().zip(vout.iter()) {
            let d = *a - *b / ntot as f64;
            assert!(d.norm() < 1E-13);
        }
    }

    #[test]
    fn test_fft_single_mode() {
        // e^{+2 pi i x k0/n1} must land on bin (k0, 0, 0) with weight N
        let (n1, n2, n3) = (8, 3, 3);
        let ntot = n1 * n2 * n3;
        let k0 = 2usize;

        let fft = GWFFT3D::new(n1, n2, n3);

        let mut vin = vec![c64 { re: 0.0, im: 0.0 }; ntot];

        for iz in 0..n3 {
            for iy in 0..n2 {
                for ix in 0..n1 {
                    let phase = 2.0 * PI * (ix * k0) as f64 / n1 as f64;
                    vin[ix + n1 * (iy + n2 * iz)] = c64 {
                        re: phase.cos(),
                        im: phase.sin(),
                    };
                }
            }
        }

        let mut vg = vec![c64 { re: 0.0, im: 0.0 }; ntot];
        fft.fft3d(&vin, &mut vg);

        for iz in 0..n3 {
            for iy in 0..n2 {
                for ix in 0..n1 {
                    let v = vg[ix + n1 * (iy + n2 * iz)];
                    let expect = if ix == k0 && iy == 0 && iz == 0 {
                        ntot as f64
                    } else {
                        0.0
                    };

                    assert!((v.re - expect).abs() < 1E-9);
                    assert!(v.im.abs() < 1E-9);
                }
            }
        }
    }
}
