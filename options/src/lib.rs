//! Option bundles and their persisted form.
//!
//! Each bundle saves to a directory with one plain-text file per value:
//! enumerations as lowercase keywords, numerics in scientific notation with
//! 17 significant digits. A missing file means "use the default"; unknown
//! files are ignored.

mod persist;
mod theory;

pub use persist::{load_value, save_value};
pub use theory::{Functional, TheoryOptions};

use electrons::SpinScheme;
use gwconsts::*;
use mixing::MixingScheme;
use std::path::Path;
use types::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct ElectronsOptions {
    pub cutoff: Option<f64>,
    pub spacing: Option<f64>,
    pub extra_states: usize,
    pub extra_electrons: f64,
    /// Electronic temperature in Kelvin.
    pub temperature: f64,
    pub spin: SpinScheme,
    pub kpoints: [usize; 3],

    // self-consistency knobs
    pub scf_max_iter: usize,
    pub energy_tolerance: f64,
    pub density_tolerance: f64,
    pub mixing_scheme: MixingScheme,
    pub mixing_alpha: f64,
    pub mixing_history: usize,
    pub eigensolver_steps: usize,
}

impl Default for ElectronsOptions {
    fn default() -> ElectronsOptions {
        ElectronsOptions {
            cutoff: None,
            spacing: None,
            extra_states: 0,
            extra_electrons: 0.0,
            temperature: 0.0,
            spin: SpinScheme::Unpolarized,
            kpoints: [1, 1, 1],
            scf_max_iter: 200,
            energy_tolerance: EPS8,
            density_tolerance: EPS6,
            mixing_scheme: MixingScheme::Pulay,
            mixing_alpha: 0.3,
            mixing_history: 5,
            eigensolver_steps: 5,
        }
    }
}

impl ElectronsOptions {
    pub fn cutoff(mut self, ecut: f64) -> Self {
        self.cutoff = Some(ecut);
        self
    }

    pub fn spacing(mut self, h: f64) -> Self {
        self.spacing = Some(h);
        self
    }

    pub fn extra_states(mut self, n: usize) -> Self {
        self.extra_states = n;
        self
    }

    pub fn extra_electrons(mut self, n: f64) -> Self {
        self.extra_electrons = n;
        self
    }

    pub fn temperature(mut self, t: f64) -> Self {
        self.temperature = t;
        self
    }

    pub fn spin(mut self, s: SpinScheme) -> Self {
        self.spin = s;
        self
    }

    pub fn kpoints(mut self, k: [usize; 3]) -> Self {
        self.kpoints = k;
        self
    }

    pub fn save(&self, dirname: &Path) -> Result<(), Error> {
        persist::create_dir(dirname)?;

        if let Some(v) = self.cutoff {
            save_value(&dirname.join("cutoff"), &format!("{v:.16E}"))?;
        }

        if let Some(v) = self.spacing {
            save_value(&dirname.join("spacing"), &format!("{v:.16E}"))?;
        }

        save_value(&dirname.join("extra_states"), &self.extra_states.to_string())?;
        save_value(
            &dirname.join("extra_electrons"),
            &format!("{:.16E}", self.extra_electrons),
        )?;
        save_value(
            &dirname.join("temperature"),
            &format!("{:.16E}", self.temperature),
        )?;
        save_value(&dirname.join("spin"), spin_keyword(self.spin))?;
        save_value(
            &dirname.join("kpoints"),
            &format!("{} {} {}", self.kpoints[0], self.kpoints[1], self.kpoints[2]),
        )?;
        save_value(&dirname.join("scf_max_iter"), &self.scf_max_iter.to_string())?;
        save_value(
            &dirname.join("energy_tolerance"),
            &format!("{:.16E}", self.energy_tolerance),
        )?;
        save_value(
            &dirname.join("density_tolerance"),
            &format!("{:.16E}", self.density_tolerance),
        )?;
        save_value(
            &dirname.join("mixing"),
            match self.mixing_scheme {
                MixingScheme::Linear => "linear",
                MixingScheme::Pulay => "pulay",
            },
        )?;
        save_value(
            &dirname.join("mixing_alpha"),
            &format!("{:.16E}", self.mixing_alpha),
        )?;

        Ok(())
    }

    pub fn load(dirname: &Path) -> Result<ElectronsOptions, Error> {
        let mut opts = ElectronsOptions::default();

        if let Some(s) = load_value(&dirname.join("cutoff"))? {
            opts.cutoff = Some(parse_f64(&s)?);
        }

        if let Some(s) = load_value(&dirname.join("spacing"))? {
            opts.spacing = Some(parse_f64(&s)?);
        }

        if let Some(s) = load_value(&dirname.join("extra_states"))? {
            opts.extra_states = parse_usize(&s)?;
        }

        if let Some(s) = load_value(&dirname.join("extra_electrons"))? {
            opts.extra_electrons = parse_f64(&s)?;
        }

        if let Some(s) = load_value(&dirname.join("temperature"))? {
            opts.temperature = parse_f64(&s)?;
        }

        if let Some(s) = load_value(&dirname.join("spin"))? {
            opts.spin = parse_spin(&s)?;
        }

        if let Some(s) = load_value(&dirname.join("kpoints"))? {
            let parts: Vec<usize> = s
                .split_whitespace()
                .map(parse_usize)
                .collect::<Result<_, _>>()?;

            if parts.len() != 3 {
                return Err(Error::IoFailure(format!("malformed kpoints value '{s}'")));
            }

            opts.kpoints = [parts[0], parts[1], parts[2]];
        }

        if let Some(s) = load_value(&dirname.join("scf_max_iter"))? {
            opts.scf_max_iter = parse_usize(&s)?;
        }

        if let Some(s) = load_value(&dirname.join("energy_tolerance"))? {
            opts.energy_tolerance = parse_f64(&s)?;
        }

        if let Some(s) = load_value(&dirname.join("density_tolerance"))? {
            opts.density_tolerance = parse_f64(&s)?;
        }

        if let Some(s) = load_value(&dirname.join("mixing"))? {
            opts.mixing_scheme = match s.as_str() {
                "linear" => MixingScheme::Linear,
                "pulay" => MixingScheme::Pulay,
                other => {
                    return Err(Error::BadConfiguration(format!(
                        "unknown mixing scheme '{other}'"
                    )))
                }
            };
        }

        if let Some(s) = load_value(&dirname.join("mixing_alpha"))? {
            opts.mixing_alpha = parse_f64(&s)?;
        }

        Ok(opts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagatorScheme {
    Etrs,
    CrankNicolson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IonDynamicsScheme {
    Static,
    Impulsive,
    Verlet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RealTimeOptions {
    /// Time step in atomic units.
    pub dt: f64,
    pub num_steps: usize,
    pub propagator: PropagatorScheme,
    pub ion_dynamics: IonDynamicsScheme,
    /// Crank-Nicolson fixed-point sweeps.
    pub cn_iterations: usize,
}

impl Default for RealTimeOptions {
    fn default() -> RealTimeOptions {
        RealTimeOptions {
            dt: 0.01,
            num_steps: 100,
            propagator: PropagatorScheme::Etrs,
            ion_dynamics: IonDynamicsScheme::Static,
            cn_iterations: 6,
        }
    }
}

impl RealTimeOptions {
    pub fn dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn num_steps(mut self, n: usize) -> Self {
        self.num_steps = n;
        self
    }

    pub fn etrs(mut self) -> Self {
        self.propagator = PropagatorScheme::Etrs;
        self
    }

    pub fn crank_nicolson(mut self) -> Self {
        self.propagator = PropagatorScheme::CrankNicolson;
        self
    }

    pub fn save(&self, dirname: &Path) -> Result<(), Error> {
        persist::create_dir(dirname)?;

        save_value(&dirname.join("dt"), &format!("{:.16E}", self.dt))?;
        save_value(&dirname.join("num_steps"), &self.num_steps.to_string())?;
        save_value(
            &dirname.join("propagator"),
            match self.propagator {
                PropagatorScheme::Etrs => "etrs",
                PropagatorScheme::CrankNicolson => "crank-nicolson",
            },
        )?;
        save_value(
            &dirname.join("ion_dynamics"),
            match self.ion_dynamics {
                IonDynamicsScheme::Static => "static",
                IonDynamicsScheme::Impulsive => "impulsive",
                IonDynamicsScheme::Verlet => "verlet",
            },
        )?;

        Ok(())
    }

    pub fn load(dirname: &Path) -> Result<RealTimeOptions, Error> {
        let mut opts = RealTimeOptions::default();

        if let Some(s) = load_value(&dirname.join("dt"))? {
            opts.dt = parse_f64(&s)?;
        }

        if let Some(s) = load_value(&dirname.join("num_steps"))? {
            opts.num_steps = parse_usize(&s)?;
        }

        if let Some(s) = load_value(&dirname.join("propagator"))? {
            opts.propagator = match s.as_str() {
                "etrs" => PropagatorScheme::Etrs,
                "crank-nicolson" => PropagatorScheme::CrankNicolson,
                other => {
                    return Err(Error::BadConfiguration(format!(
                        "unknown propagator '{other}'"
                    )))
                }
            };
        }

        if let Some(s) = load_value(&dirname.join("ion_dynamics"))? {
            opts.ion_dynamics = match s.as_str() {
                "static" => IonDynamicsScheme::Static,
                "impulsive" => IonDynamicsScheme::Impulsive,
                "verlet" => IonDynamicsScheme::Verlet,
                other => {
                    return Err(Error::BadConfiguration(format!(
                        "unknown ion dynamics '{other}'"
                    )))
                }
            };
        }

        Ok(opts)
    }
}

fn spin_keyword(s: SpinScheme) -> &'static str {
    match s {
        SpinScheme::Unpolarized => "unpolarized",
        SpinScheme::Polarized => "polarized",
        SpinScheme::NonCollinear => "non-collinear",
    }
}

fn parse_spin(s: &str) -> Result<SpinScheme, Error> {
    match s {
        "unpolarized" => Ok(SpinScheme::Unpolarized),
        "polarized" => Ok(SpinScheme::Polarized),
        "non-collinear" => Ok(SpinScheme::NonCollinear),
        other => Err(Error::BadConfiguration(format!(
            "unknown spin scheme '{other}'"
        ))),
    }
}

pub(crate) fn parse_f64(s: &str) -> Result<f64, Error> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| Error::IoFailure(format!("malformed numeric value '{s}'")))
}

pub(crate) fn parse_usize(s: &str) -> Result<usize, Error> {
    s.trim()
        .parse::<usize>()
        .map_err(|_| Error::IoFailure(format!("malformed integer value '{s}'")))
}
