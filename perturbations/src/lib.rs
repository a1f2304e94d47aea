//! Time-dependent external perturbations.
//!
//! The set is closed: none, an instantaneous kick, a laser pulse through its
//! vector potential, and the IXS spatially modulated potential. Every
//! propagator step fans out over the capability set: `has_potential`
//! contributions add to the scalar potential, `has_vector_potential` ones
//! enter the canonical momentum of the kinetic term.

use fields::{Field, OrbitalSet};
use gwconsts::*;
use types::c64;
use vector3::Vector3f64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Envelope {
    Constant,
    Sin { frequency: f64 },
    Cos { frequency: f64 },
    Gaussian { center: f64, width: f64 },
}

impl Envelope {
    pub fn value(&self, time: f64) -> f64 {
        match *self {
            Envelope::Constant => 1.0,
            Envelope::Sin { frequency } => (frequency * time).sin(),
            Envelope::Cos { frequency } => (frequency * time).cos(),
            Envelope::Gaussian { center, width } => {
                let x = (time - center) / width;
                (-0.5 * x * x).exp()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Perturbation {
    None,
    /// Instantaneous phase twist exp(i k.r) applied once at t = 0.
    Kick { k: Vector3f64 },
    /// Vector-potential pulse A(t) = amplitude * envelope(t).
    Laser {
        amplitude: Vector3f64,
        envelope: Envelope,
    },
    /// Spatially modulated pulse
    /// A/sqrt(2 pi)/tau exp(-((t - t0)/(2 tau))^2) exp(i q.r).
    Ixs {
        amplitude: f64,
        q: Vector3f64,
        tdelay: f64,
        twidth: f64,
        envelope: Envelope,
    },
}

impl Perturbation {
    pub fn has_potential(&self) -> bool {
        matches!(self, Perturbation::Ixs { .. })
    }

    pub fn has_vector_potential(&self) -> bool {
        matches!(self, Perturbation::Laser { .. })
    }

    pub fn has_uniform_electric_field(&self) -> bool {
        false
    }

    pub fn has_kick(&self) -> bool {
        matches!(self, Perturbation::Kick { .. })
    }

    /// Add the scalar-potential contribution at `time` on the grid.
    pub fn potential(&self, time: f64, out: &mut Field<c64>) {
        let Perturbation::Ixs {
            amplitude,
            q,
            tdelay,
            twidth,
            envelope,
        } = self
        else {
            return;
        };

        let x = (time - tdelay) / (2.0 * twidth);
        let strength =
            amplitude / (TWOPI.sqrt() * twidth) * (-x * x).exp() * envelope.value(time);

        if strength.abs() < EPS30 {
            return;
        }

        let layout = out.layout().clone();
        let data = out.as_mut_slice();

        layout.for_each_local_point(|ip, ix, iy, iz| {
            let r = layout.grid().rvector(ix, iy, iz);
            let phase = q.dot_product(&r);

            data[ip] += c64 {
                re: strength * phase.cos(),
                im: strength * phase.sin(),
            };
        });
    }

    /// Vector potential entering the canonical momentum.
    pub fn vector_potential(&self, time: f64) -> Vector3f64 {
        match self {
            Perturbation::Laser {
                amplitude,
                envelope,
            } => *amplitude * envelope.value(time),
            _ => Vector3f64::zeros(),
        }
    }

    pub fn uniform_electric_field(&self, _time: f64) -> Vector3f64 {
        Vector3f64::zeros()
    }

    /// Apply the t = 0 phase twist to an orbital set.
    pub fn apply_kick(&self, phi: &mut OrbitalSet) {
        let Perturbation::Kick { k } = self else {
            return;
        };

        let layout = phi.layout().clone();
        let nst = phi.local_states();

        for ist in 0..nst {
            let col = phi.state_mut(ist);

            layout.for_each_local_point(|ip, ix, iy, iz| {
                let r = layout.grid().rvector(ix, iy, iz);
                let phase = k.dot_product(&r);

                col[ip] *= c64 {
                    re: phase.cos(),
                    im: phase.sin(),
                };
            });
        }
    }
}
