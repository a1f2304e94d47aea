use gwconsts::*;
use lattice::Cell;
use types::{c64, Error};
use utility::fft_freq_index;
use vector3::Vector3f64;

use std::fmt;

/// Uniform real-space grid over a cell.
///
/// Point (ix,iy,iz) sits at the cartesian position of the signed fractional
/// coordinate (s1,s2,s3), s_i = wrap(i)/n_i with the FFT wrap convention, so
/// finite cells are centered on the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct RealGrid {
    cell: Cell,
    n: [usize; 3],
}

impl RealGrid {
    /// Grid spacing from the plane-wave-equivalent cutoff:
    /// h_i <= pi * sqrt(1/(2 E_cut)).
    pub fn from_cutoff(cell: &Cell, ecut: f64) -> Result<RealGrid, Error> {
        if ecut <= 0.0 {
            return Err(Error::BadConfiguration(format!(
                "cutoff energy must be positive, got {ecut}"
            )));
        }

        let gmax = (2.0 * ecut).sqrt();

        let latt = cell.latt();
        let lengths = [
            latt.get_vector_a().norm2(),
            latt.get_vector_b().norm2(),
            latt.get_vector_c().norm2(),
        ];

        let mut n = [0usize; 3];

        for i in 0..3 {
            let nmin = (2.0 * gmax * lengths[i] / TWOPI).ceil() as usize;

            n[i] = good_fft_size(nmin.max(2));
        }

        Ok(RealGrid {
            cell: cell.clone(),
            n,
        })
    }

    /// Grid sizes from an explicit spacing target.
    pub fn from_spacing(cell: &Cell, spacing: f64) -> Result<RealGrid, Error> {
        if spacing <= 0.0 {
            return Err(Error::BadConfiguration(format!(
                "grid spacing must be positive, got {spacing}"
            )));
        }

        let latt = cell.latt();
        let lengths = [
            latt.get_vector_a().norm2(),
            latt.get_vector_b().norm2(),
            latt.get_vector_c().norm2(),
        ];

        let mut n = [0usize; 3];

        for i in 0..3 {
            let nmin = (lengths[i] / spacing).round().max(2.0) as usize;

            n[i] = good_fft_size(nmin);
        }

        Ok(RealGrid {
            cell: cell.clone(),
            n,
        })
    }

    /// Exact sizes, no rounding. Used by tests that pin a grid.
    pub fn with_sizes(cell: &Cell, n: [usize; 3]) -> RealGrid {
        RealGrid {
            cell: cell.clone(),
            n,
        }
    }

    pub fn cell(&self) -> &Cell {
        &self.cell
    }

    pub fn size(&self) -> [usize; 3] {
        self.n
    }

    pub fn get_n1(&self) -> usize {
        self.n[0]
    }

    pub fn get_n2(&self) -> usize {
        self.n[1]
    }

    pub fn get_n3(&self) -> usize {
        self.n[2]
    }

    pub fn ntot(&self) -> usize {
        self.n[0] * self.n[1] * self.n[2]
    }

    pub fn ntotf64(&self) -> f64 {
        self.ntot() as f64
    }

    pub fn volume_element(&self) -> f64 {
        self.cell.volume() / self.ntotf64()
    }

    pub fn spacing(&self) -> [f64; 3] {
        let latt = self.cell.latt();

        [
            latt.get_vector_a().norm2() / self.n[0] as f64,
            latt.get_vector_b().norm2() / self.n[1] as f64,
            latt.get_vector_c().norm2() / self.n[2] as f64,
        ]
    }

    #[inline]
    pub fn linear_index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        ix + self.n[0] * (iy + self.n[1] * iz)
    }

    /// Cartesian coordinates of grid point (ix,iy,iz).
    pub fn rvector(&self, ix: usize, iy: usize, iz: usize) -> Vector3f64 {
        let s = Vector3f64::new(
            fft_freq_index(ix, self.n[0]) as f64 / self.n[0] as f64,
            fft_freq_index(iy, self.n[1]) as f64 / self.n[1] as f64,
            fft_freq_index(iz, self.n[2]) as f64 / self.n[2] as f64,
        );

        self.cell.frac_to_cart(s)
    }

    pub fn shape_matches(&self, other: &RealGrid) -> Result<(), Error> {
        if self.n != other.n {
            return Err(Error::ShapeMismatch(format!(
                "grid {:?} vs {:?}",
                self.n, other.n
            )));
        }

        Ok(())
    }
}

impl fmt::Display for RealGrid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} x {} x {}", self.n[0], self.n[1], self.n[2])
    }
}

/// The reciprocal dual of a real-space grid: one G vector per FFT index,
/// with an optional spherical cutoff mask applied after forward transforms.
#[derive(Debug, Clone)]
pub struct ReciprocalGrid {
    n: [usize; 3],
    g: Vec<Vector3f64>,
    g2: Vec<f64>,
    ecut: Option<f64>,
}

impl ReciprocalGrid {
    pub fn new(grid: &RealGrid) -> ReciprocalGrid {
        let blatt = grid.cell().reciprocal();
        let [n1, n2, n3] = grid.size();

        let mut g = Vec::with_capacity(n1 * n2 * n3);
        let mut g2 = Vec::with_capacity(n1 * n2 * n3);

        let ba = blatt.get_vector_a();
        let bb = blatt.get_vector_b();
        let bc = blatt.get_vector_c();

        for iz in 0..n3 {
            let mz = fft_freq_index(iz, n3) as f64;

            for iy in 0..n2 {
                let my = fft_freq_index(iy, n2) as f64;

                for ix in 0..n1 {
                    let mx = fft_freq_index(ix, n1) as f64;

                    let gv = ba * mx + bb * my + bc * mz;

                    g2.push(gv.norm_sqr());
                    g.push(gv);
                }
            }
        }

        ReciprocalGrid {
            n: grid.size(),
            g,
            g2,
            ecut: None,
        }
    }

    pub fn with_cutoff(grid: &RealGrid, ecut: f64) -> ReciprocalGrid {
        let mut rg = ReciprocalGrid::new(grid);
        rg.ecut = Some(ecut);
        rg
    }

    pub fn size(&self) -> [usize; 3] {
        self.n
    }

    pub fn ntot(&self) -> usize {
        self.n[0] * self.n[1] * self.n[2]
    }

    pub fn gvectors(&self) -> &[Vector3f64] {
        &self.g
    }

    pub fn g2(&self) -> &[f64] {
        &self.g2
    }

    pub fn gmax(&self) -> f64 {
        self.g2.iter().cloned().fold(0.0, f64::max).sqrt()
    }

    pub fn cutoff(&self) -> Option<f64> {
        self.ecut
    }

    /// Zero every coefficient with |G|^2/2 > E_cut. A no-op when no cutoff
    /// is attached.
    pub fn apply_cutoff_mask(&self, data: &mut [c64]) {
        let Some(ecut) = self.ecut else {
            return;
        };

        assert_eq!(data.len(), self.g2.len());

        let two_ecut = 2.0 * ecut;

        for (v, &g2) in data.iter_mut().zip(self.g2.iter()) {
            if g2 > two_ecut {
                *v = ZERO_C64;
            }
        }
    }
}

/// Smallest 2/3/5/7-smooth integer >= n; FFT lengths with large prime
/// factors are slow on every backend.
pub fn good_fft_size(n: usize) -> usize {
    let mut tn = n;

    while !is_smooth(tn) {
        tn += 1;
    }

    tn
}

fn is_smooth(n_to_check: usize) -> bool {
    const FACTORS: [usize; 4] = [2, 3, 5, 7];

    let mut tn = n_to_check;

    for f in FACTORS {
        while tn % f == 0 && tn != 1 {
            tn /= f;
        }
    }

    tn == 1
}
