use crate::Smearing;
use gwconsts::*;

pub struct SmearingFD {}

impl Smearing for SmearingFD {
    fn get_occupation_number(
        &self,
        fermi_level: f64,
        temperature: f64,
        electron_energy: f64,
    ) -> f64 {
        let kbt = (BOLTZMANN_CONSTANT * temperature).max(EPS30);

        let x = (electron_energy - fermi_level) / kbt;

        // guard the exponential for deep/high levels
        if x > 500.0 {
            0.0
        } else if x < -500.0 {
            1.0
        } else {
            1.0 / (x.exp() + 1.0)
        }
    }
}
