//! Input-unit conversion; everything internal is atomic units.

use gwconsts::*;
use types::Error;

pub fn is_length_unit(u: &str) -> bool {
    matches!(
        u,
        "bohr" | "b" | "angstrom" | "a" | "nm" | "nanometer"
    )
}

pub fn length_to_bohr(u: &str) -> Result<f64, Error> {
    match u {
        "bohr" | "b" => Ok(1.0),
        "angstrom" | "a" => Ok(ANG_TO_BOHR),
        "nm" | "nanometer" => Ok(10.0 * ANG_TO_BOHR),
        other => Err(Error::BadConfiguration(format!(
            "unknown length unit '{other}'"
        ))),
    }
}

pub fn energy_to_hartree(u: &str) -> Result<f64, Error> {
    match u {
        "hartree" | "ha" => Ok(1.0),
        "rydberg" | "ry" => Ok(RY_TO_HA),
        "ev" | "electronvolt" => Ok(EV_TO_HA),
        other => Err(Error::BadConfiguration(format!(
            "unknown energy unit '{other}'"
        ))),
    }
}

#[allow(dead_code)]
pub fn time_to_atomic(u: &str) -> Result<f64, Error> {
    match u {
        "atomictime" | "aut" => Ok(1.0),
        "fs" | "femtosecond" => Ok(FS_TO_AUT),
        other => Err(Error::BadConfiguration(format!(
            "unknown time unit '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_tables() {
        assert!((length_to_bohr("angstrom").unwrap() - 1.8897261328856434).abs() < 1E-6);
        assert_eq!(length_to_bohr("bohr").unwrap(), 1.0);
        assert!((energy_to_hartree("ev").unwrap() - 0.036749).abs() < 1E-5);
        assert!((time_to_atomic("fs").unwrap() - 41.341374).abs() < 1E-4);
        assert!(length_to_bohr("parsec").is_err());
    }
}
