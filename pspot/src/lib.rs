//! Norm-conserving pseudopotential species data.
//!
//! A species carries the valence count, the local ionic potential split into
//! a long-range erf-screened Coulomb tail plus a tabulated short-range
//! correction, the Kleinman-Bylander projector channels, and optional atomic
//! and core densities. Pseudopotential file parsing lives outside the core;
//! parsed radial tables enter through `Species::from_tables`.

use gwconsts::*;
use special::erf;
use std::collections::HashMap;
use types::Error;

pub const AMU_TO_AU: f64 = 1822.888486;

/// Radial function sampled on a uniform mesh starting at r = 0.
#[derive(Debug, Clone)]
pub struct RadialTable {
    dr: f64,
    f: Vec<f64>,
}

impl RadialTable {
    pub fn new(dr: f64, f: Vec<f64>) -> RadialTable {
        assert!(dr > 0.0, "radial mesh spacing must be positive");
        assert!(f.len() >= 2, "radial table needs at least two samples");

        RadialTable { dr, f }
    }

    pub fn from_fn(dr: f64, n: usize, mut f: impl FnMut(f64) -> f64) -> RadialTable {
        RadialTable::new(dr, (0..n).map(|i| f(i as f64 * dr)).collect())
    }

    pub fn rcut(&self) -> f64 {
        (self.f.len() - 1) as f64 * self.dr
    }

    /// Linear interpolation; zero beyond the table.
    pub fn value(&self, r: f64) -> f64 {
        if r < 0.0 {
            return self.f[0];
        }

        let x = r / self.dr;
        let i = x as usize;

        if i + 1 >= self.f.len() {
            return 0.0;
        }

        let w = x - i as f64;

        self.f[i] * (1.0 - w) + self.f[i + 1] * w
    }

    /// 4 pi \int f(r) r^2 dr over the table.
    pub fn radial_integral(&self) -> f64 {
        let y: Vec<f64> = self
            .f
            .iter()
            .enumerate()
            .map(|(i, &v)| v * (i as f64 * self.dr).powi(2))
            .collect();

        FOURPI * integral::simpson(&y, self.dr)
    }
}

/// One Kleinman-Bylander projector channel: |beta_l> d_l <beta_l|.
#[derive(Debug, Clone)]
pub struct ProjectorChannel {
    pub l: usize,
    pub kb_energy: f64,
    pub radial: RadialTable,
}

#[derive(Debug, Clone)]
pub struct Species {
    symbol: String,
    zval: f64,
    mass: f64,
    sigma: f64,
    vloc_sr: Option<RadialTable>,
    projectors: Vec<ProjectorChannel>,
    rho_atom: Option<RadialTable>,
    rho_core: Option<RadialTable>,
}

impl Species {
    /// Species from externally parsed radial tables. `vloc` is the full
    /// local potential; the erf-screened -z/r tail is subtracted here so the
    /// remainder is short-ranged.
    #[allow(clippy::too_many_arguments)]
    pub fn from_tables(
        symbol: &str,
        zval: f64,
        mass_amu: f64,
        sigma: f64,
        vloc: &RadialTable,
        projectors: Vec<ProjectorChannel>,
        rho_atom: Option<RadialTable>,
        rho_core: Option<RadialTable>,
    ) -> Species {
        let dr = vloc.dr;
        let n = vloc.f.len();

        let sr = RadialTable::from_fn(dr, n, |r| {
            vloc.value(r) - long_range_potential(zval, sigma, r)
        });

        Species {
            symbol: symbol.to_string(),
            zval,
            mass: mass_amu * AMU_TO_AU,
            sigma,
            vloc_sr: Some(sr),
            projectors,
            rho_atom,
            rho_core,
        }
    }

    /// Purely local erf-screened Coulomb species: the analytic fixture used
    /// by tests and jellium-like runs. The short-range correction vanishes
    /// identically.
    pub fn local_erf(symbol: &str, zval: f64, mass_amu: f64, sigma: f64) -> Species {
        Species {
            symbol: symbol.to_string(),
            zval,
            mass: mass_amu * AMU_TO_AU,
            sigma,
            vloc_sr: None,
            projectors: Vec::new(),
            rho_atom: None,
            rho_core: None,
        }
    }

    pub fn with_projectors(mut self, projectors: Vec<ProjectorChannel>) -> Species {
        self.projectors = projectors;
        self
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn zval(&self) -> f64 {
        self.zval
    }

    /// Ion mass in atomic units (electron masses).
    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn projectors(&self) -> &[ProjectorChannel] {
        &self.projectors
    }

    pub fn num_projectors_lm(&self) -> usize {
        self.projectors.iter().map(|p| 2 * p.l + 1).sum()
    }

    pub fn max_l(&self) -> usize {
        self.projectors.iter().map(|p| p.l).max().unwrap_or(0)
    }

    pub fn projector_radius(&self) -> f64 {
        self.projectors
            .iter()
            .map(|p| p.radial.rcut())
            .fold(0.0, f64::max)
    }

    /// Long-range part of the local potential: -z erf(r/(sqrt2 sigma))/r.
    pub fn long_range_potential(&self, r: f64) -> f64 {
        long_range_potential(self.zval, self.sigma, r)
    }

    /// Short-range correction on top of the erf tail; zero for the analytic
    /// species.
    pub fn short_range_potential(&self, r: f64) -> f64 {
        self.vloc_sr.as_ref().map_or(0.0, |t| t.value(r))
    }

    pub fn short_range_radius(&self) -> f64 {
        self.vloc_sr.as_ref().map_or(0.0, |t| t.rcut())
    }

    /// Gaussian ionic charge density whose Hartree potential is the erf
    /// tail; integrates to -zval.
    pub fn ionic_density(&self, r: f64) -> f64 {
        let s2 = self.sigma * self.sigma;
        let norm = (TWOPI * s2).powf(1.5);

        -self.zval * (-0.5 * r * r / s2).exp() / norm
    }

    pub fn rho_atom(&self) -> Option<&RadialTable> {
        self.rho_atom.as_ref()
    }

    pub fn has_nlcc(&self) -> bool {
        self.rho_core.is_some()
    }

    pub fn rho_core(&self) -> Option<&RadialTable> {
        self.rho_core.as_ref()
    }
}

fn long_range_potential(zval: f64, sigma: f64, r: f64) -> f64 {
    let rs = r / (sigma * 2.0f64.sqrt());

    if rs < EPS8 {
        // erf(x)/x -> 2/sqrt(pi) as x -> 0
        -zval * 2.0 / (PI.sqrt() * sigma * 2.0f64.sqrt())
    } else {
        -zval * erf(rs) / r
    }
}

/// Species keyed by symbol; the per-calculation pseudopotential registry.
#[derive(Default)]
pub struct SpeciesSet {
    map: HashMap<String, Species>,
}

impl SpeciesSet {
    pub fn new() -> SpeciesSet {
        SpeciesSet::default()
    }

    pub fn insert(&mut self, sp: Species) {
        self.map.insert(sp.symbol().to_string(), sp);
    }

    pub fn get(&self, symbol: &str) -> Result<&Species, Error> {
        self.map.get(symbol).ok_or_else(|| {
            Error::BadConfiguration(format!("no pseudopotential registered for species {symbol}"))
        })
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.map.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radial_table_interpolation() {
        let t = RadialTable::from_fn(0.1, 101, |r| r * r);

        assert!((t.value(0.55) - 0.305).abs() < 1E-12); // linear between 0.25 and 0.36
        assert_eq!(t.value(11.0), 0.0);
        assert!((t.rcut() - 10.0).abs() < 1E-12);
    }

    #[test]
    fn test_ionic_density_integrates_to_minus_z() {
        let sp = Species::local_erf("Ne", 8.0, 20.18, 0.6);

        // 4 pi \int rho r^2 dr
        let dr = 0.01;
        let n = 1000;
        let y: Vec<f64> = (0..n)
            .map(|i| {
                let r = i as f64 * dr;
                sp.ionic_density(r) * r * r
            })
            .collect();

        let q = FOURPI * integral::simpson(&y, dr);

        assert!((q + 8.0).abs() < 1E-8, "q = {q}");
    }

    #[test]
    fn test_long_range_matches_coulomb_far_away() {
        let sp = Species::local_erf("H", 1.0, 1.008, 0.5);

        let v = sp.long_range_potential(5.0);

        assert!((v + 1.0 / 5.0).abs() < 1E-10);

        // finite at the origin
        assert!(sp.long_range_potential(0.0).is_finite());
    }

    #[test]
    fn test_from_tables_short_range_is_short_ranged() {
        let zval = 4.0;
        let sigma = 0.6;

        // a fake local potential equal to the pure erf tail plus a bump
        let vloc = RadialTable::from_fn(0.05, 200, |r| {
            let rs = r / (sigma * 2.0f64.sqrt());
            let tail = if r < 1E-8 {
                -zval * 2.0 / (PI.sqrt() * sigma * 2.0f64.sqrt())
            } else {
                -zval * erf(rs) / r
            };

            tail + 0.5 * (-r * r).exp()
        });

        let sp = Species::from_tables("Si", zval, 28.085, sigma, &vloc, Vec::new(), None, None);

        assert!((sp.short_range_potential(0.0) - 0.5).abs() < 1E-10);
        assert!(sp.short_range_potential(4.0).abs() < 1E-6);
    }

    #[test]
    fn test_species_set_lookup() {
        let mut set = SpeciesSet::new();
        set.insert(Species::local_erf("H", 1.0, 1.008, 0.5));

        assert!(set.get("H").is_ok());
        assert!(matches!(set.get("Xx"), Err(Error::BadConfiguration(_))));
    }

    #[test]
    fn test_projector_counting() {
        let ch = |l| ProjectorChannel {
            l,
            kb_energy: 1.0,
            radial: RadialTable::from_fn(0.1, 20, |r| (-r).exp()),
        };

        let sp = Species::local_erf("C", 4.0, 12.01, 0.5).with_projectors(vec![ch(0), ch(1)]);

        assert_eq!(sp.num_projectors_lm(), 4);
        assert_eq!(sp.max_l(), 1);
        assert!((sp.projector_radius() - 1.9).abs() < 1E-12);
    }
}
