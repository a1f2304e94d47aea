use crate::Mixing;

pub struct MixingLinear {
    alpha: f64,
}

impl MixingLinear {
    pub fn new(alpha: f64) -> MixingLinear {
        MixingLinear { alpha }
    }
}

impl Mixing for MixingLinear {
    fn mix(&mut self, input: &mut [f64], residual: &[f64]) {
        assert_eq!(input.len(), residual.len());

        for (x, r) in input.iter_mut().zip(residual.iter()) {
            *x += self.alpha * r;
        }
    }
}
