use std::fmt;

/// Total-energy bookkeeping.
///
/// total = sum_i f_i eps_i - E_H + E_xc - \int rho v_xc - E_x + E_ion-ion
///         + E_core-correction
/// where the eigenvalue sum double-counts the Hartree, XC and exact-exchange
/// interactions; the correction terms remove them.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Energy {
    /// Occupation-weighted eigenvalue sum.
    pub eigenvalues: f64,
    /// Kinetic energy, kept for reporting.
    pub kinetic: f64,
    /// Hartree energy 1/2 \int rho V_H.
    pub hartree: f64,
    /// \int rho V_ext (local ionic + external perturbation).
    pub external: f64,
    /// Non-local pseudopotential expectation value.
    pub nonlocal: f64,
    /// XC energy.
    pub xc: f64,
    /// \int rho v_xc, the XC double-counting term.
    pub nvxc: f64,
    /// Exact-exchange energy (positive magnitude convention).
    pub exact_exchange: f64,
    /// Ion-ion interaction.
    pub ion: f64,
    /// NLCC contribution already folded into xc; kept separate for reports.
    pub core_correction: f64,
}

impl Energy {
    pub fn new() -> Energy {
        Energy::default()
    }

    pub fn total(&self) -> f64 {
        self.eigenvalues - self.hartree + self.xc - self.nvxc - self.exact_exchange
            + self.ion
            + self.core_correction
    }

    pub fn field(&self, name: &str) -> Option<f64> {
        match name {
            "total" => Some(self.total()),
            "kinetic" => Some(self.kinetic),
            "eigenvalues" => Some(self.eigenvalues),
            "hartree" => Some(self.hartree),
            "external" => Some(self.external),
            "non-local" => Some(self.nonlocal),
            "xc" => Some(self.xc),
            "nvxc" => Some(self.nvxc),
            "exact-exchange" => Some(self.exact_exchange),
            "ion" => Some(self.ion),
            _ => None,
        }
    }
}

impl fmt::Display for Energy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "  total          = {:.16e}", self.total())?;
        writeln!(f, "  kinetic        = {:.16e}", self.kinetic)?;
        writeln!(f, "  eigenvalues    = {:.16e}", self.eigenvalues)?;
        writeln!(f, "  hartree        = {:.16e}", self.hartree)?;
        writeln!(f, "  external       = {:.16e}", self.external)?;
        writeln!(f, "  non-local      = {:.16e}", self.nonlocal)?;
        writeln!(f, "  xc             = {:.16e}", self.xc)?;
        writeln!(f, "  exact-exchange = {:.16e}", self.exact_exchange)?;
        write!(f, "  ion            = {:.16e}", self.ion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_composition() {
        let e = Energy {
            eigenvalues: -2.0,
            hartree: 0.5,
            xc: -1.0,
            nvxc: -1.3,
            exact_exchange: 0.2,
            ion: 3.0,
            ..Energy::default()
        };

        let expect = -2.0 - 0.5 + (-1.0) - (-1.3) - 0.2 + 3.0;

        assert!((e.total() - expect).abs() < 1E-14);
    }

    #[test]
    fn test_field_lookup() {
        let mut e = Energy::new();
        e.kinetic = 1.5;

        assert_eq!(e.field("kinetic"), Some(1.5));
        assert_eq!(e.field("bogus"), None);
        assert!(e.field("total").is_some());
    }
}
