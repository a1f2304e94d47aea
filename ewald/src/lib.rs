//! Ion-ion electrostatics: Ewald summation for periodic cells, direct pair
//! sums for finite ones.

use grid::ReciprocalGrid;
use gwconsts::*;
use lattice::Cell;
use special::erfc;
use types::c64;
use vector3::{Vector3f64, Vector3i32};

pub struct Ewald {
    energy: f64,
    force: Vec<Vector3f64>,
}

impl Ewald {
    /// `positions` are cartesian, `zions` the valence charges per atom.
    pub fn new(cell: &Cell, positions: &[Vector3f64], zions: &[f64], recip: &ReciprocalGrid) -> Ewald {
        assert_eq!(positions.len(), zions.len());

        if cell.periodic_dimensions() == 0 {
            return Ewald::finite(positions, zions);
        }

        let gmax = recip.gmax();

        // kernel cut at 1e-30 fixes the splitting width and real-space reach
        let eta = get_eta_based_on_gcut(gmax, EPS30);
        let rmax = get_rmax_based_on_eta(eta, EPS30);

        let nn_cells = make_near_cells(cell, rmax);

        let natoms = positions.len();

        let energy_r = energy_real_space(cell, positions, zions, eta, &nn_cells, rmax);
        let energy_g = energy_g_space(cell, positions, zions, recip, eta);
        let energy_g0 = energy_self_and_background(cell, zions, eta);

        let energy = energy_r + energy_g + energy_g0;

        let mut force = vec![Vector3f64::zeros(); natoms];

        force_real_space(cell, positions, zions, eta, &nn_cells, rmax, &mut force);
        force_g_space(cell, positions, zions, recip, eta, &mut force);

        Ewald { energy, force }
    }

    fn finite(positions: &[Vector3f64], zions: &[f64]) -> Ewald {
        let natoms = positions.len();

        let mut energy = 0.0;
        let mut force = vec![Vector3f64::zeros(); natoms];

        for a in 0..natoms {
            for b in 0..a {
                let d = positions[a] - positions[b];
                let r = d.norm2();

                energy += zions[a] * zions[b] / r;

                let f = d * (zions[a] * zions[b] / (r * r * r));

                force[a] += f;
                force[b] += -f;
            }
        }

        Ewald { energy, force }
    }

    pub fn get_energy(&self) -> f64 {
        self.energy
    }

    pub fn get_force(&self) -> &[Vector3f64] {
        &self.force
    }
}

// 4 pi / G^2 exp(-G^2 / 4 eta) = eps at G = gmax
fn get_eta_based_on_gcut(gmax: f64, eps: f64) -> f64 {
    let g2 = gmax * gmax;

    -0.25 * g2 / (eps * g2 / FOURPI).ln()
}

fn get_rmax_based_on_eta(eta: f64, eps: f64) -> f64 {
    let mut rmax = 0.1;

    while erfc(rmax * eta.sqrt()) > rmax * eps {
        rmax += 0.1;
    }

    rmax
}

fn make_near_cells(cell: &Cell, rmax: f64) -> Vec<Vector3i32> {
    let latt = cell.latt();

    let a = latt.get_vector_a();
    let b = latt.get_vector_b();
    let c = latt.get_vector_c();

    let na = (rmax / a.norm2()).ceil() as i32 + 2;
    let nb = (rmax / b.norm2()).ceil() as i32 + 2;
    let nc = (rmax / c.norm2()).ceil() as i32 + 2;

    let mut cells = Vec::new();

    for ia in -na..=na {
        for ib in -nb..=nb {
            for ic in -nc..=nc {
                let t = a * ia as f64 + b * ib as f64 + c * ic as f64;

                if t.norm2() < rmax + a.norm2() + b.norm2() + c.norm2() {
                    cells.push(Vector3i32 {
                        x: ia,
                        y: ib,
                        z: ic,
                    });
                }
            }
        }
    }

    cells
}

fn energy_real_space(
    cell: &Cell,
    positions: &[Vector3f64],
    zions: &[f64],
    eta: f64,
    nn_cells: &[Vector3i32],
    rmax: f64,
) -> f64 {
    let latt = cell.latt();
    let sqrt_eta = eta.sqrt();

    let mut energy = 0.0;

    for (a, &ra) in positions.iter().enumerate() {
        for (b, &rb) in positions.iter().enumerate() {
            for t in nn_cells {
                let shift = latt.get_vector_a() * t.x as f64
                    + latt.get_vector_b() * t.y as f64
                    + latt.get_vector_c() * t.z as f64;

                let d = ra - rb + shift;
                let r = d.norm2();

                if r < EPS10 || r > rmax {
                    continue;
                }

                energy += 0.5 * zions[a] * zions[b] * erfc(sqrt_eta * r) / r;
            }
        }
    }

    energy
}

fn force_real_space(
    cell: &Cell,
    positions: &[Vector3f64],
    zions: &[f64],
    eta: f64,
    nn_cells: &[Vector3i32],
    rmax: f64,
    force: &mut [Vector3f64],
) {
    let latt = cell.latt();
    let sqrt_eta = eta.sqrt();

    for (a, &ra) in positions.iter().enumerate() {
        for (b, &rb) in positions.iter().enumerate() {
            for t in nn_cells {
                let shift = latt.get_vector_a() * t.x as f64
                    + latt.get_vector_b() * t.y as f64
                    + latt.get_vector_c() * t.z as f64;

                let d = ra - rb + shift;
                let r = d.norm2();

                if r < EPS10 || r > rmax {
                    continue;
                }

                let pref = zions[a] * zions[b]
                    * (erfc(sqrt_eta * r) / r
                        + 2.0 * sqrt_eta / PI.sqrt() * (-eta * r * r).exp())
                    / (r * r);

                force[a] += d * pref;
            }
        }
    }
}

fn energy_g_space(
    cell: &Cell,
    positions: &[Vector3f64],
    zions: &[f64],
    recip: &ReciprocalGrid,
    eta: f64,
) -> f64 {
    let volume = cell.volume();

    let mut energy = 0.0;

    for (g, &g2) in recip.gvectors().iter().zip(recip.g2().iter()) {
        if g2 < EPS14 {
            continue;
        }

        let mut s = c64 { re: 0.0, im: 0.0 };

        for (z, r) in zions.iter().zip(positions.iter()) {
            let phase = g.dot_product(r);

            s += c64 {
                re: z * phase.cos(),
                im: z * phase.sin(),
            };
        }

        energy += (-0.25 * g2 / eta).exp() / g2 * s.norm_sqr();
    }

    energy * TWOPI / volume
}

fn force_g_space(
    cell: &Cell,
    positions: &[Vector3f64],
    zions: &[f64],
    recip: &ReciprocalGrid,
    eta: f64,
    force: &mut [Vector3f64],
) {
    let volume = cell.volume();

    for (g, &g2) in recip.gvectors().iter().zip(recip.g2().iter()) {
        if g2 < EPS14 {
            continue;
        }

        let mut s = c64 { re: 0.0, im: 0.0 };

        for (z, r) in zions.iter().zip(positions.iter()) {
            let phase = g.dot_product(r);

            s += c64 {
                re: z * phase.cos(),
                im: z * phase.sin(),
            };
        }

        let kern = FOURPI / volume * (-0.25 * g2 / eta).exp() / g2;

        for (a, r) in positions.iter().enumerate() {
            let phase = g.dot_product(r);
            let ega = c64 {
                re: phase.cos(),
                im: -phase.sin(),
            };

            // F = -(4 pi / V) kern G z_a Im[ e^{-i G.Ra} S(G) ]
            force[a] += *g * (-kern * zions[a] * (ega * s).im);
        }
    }
}

fn energy_self_and_background(cell: &Cell, zions: &[f64], eta: f64) -> f64 {
    let z2: f64 = zions.iter().map(|z| z * z).sum();
    let ztot: f64 = zions.iter().sum();

    -(eta / PI).sqrt() * z2 - PI * ztot * ztot / (2.0 * cell.volume() * eta)
}
