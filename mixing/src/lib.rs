mod linear;
use linear::*;

mod pulay;
use pulay::*;

/// Density mixer. `mix` receives the current input density and the residual
/// (output - input) of the step just taken and overwrites the input with the
/// next trial density.
pub trait Mixing {
    fn mix(&mut self, input: &mut [f64], residual: &[f64]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixingScheme {
    Linear,
    Pulay,
}

pub fn new(scheme: MixingScheme, alpha: f64, history: usize) -> Box<dyn Mixing> {
    match scheme {
        MixingScheme::Linear => Box::new(MixingLinear::new(alpha)),
        MixingScheme::Pulay => Box::new(MixingPulay::new(alpha, history)),
    }
}
