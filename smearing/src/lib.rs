mod fd;
use fd::*;

pub trait Smearing {
    /// Occupation in [0, 1] of a level at `electron_energy` for the given
    /// Fermi level and electronic temperature (Kelvin).
    fn get_occupation_number(
        &self,
        fermi_level: f64,
        temperature: f64,
        electron_energy: f64,
    ) -> f64;
}

pub fn new(smearing_scheme: &str) -> Box<dyn Smearing> {
    match smearing_scheme {
        "fd" => Box::new(SmearingFD {}),
        other => panic!("unsupported smearing_scheme '{}'", other),
    }
}
