//! Becke 88 gradient exchange, unpolarized branch.

use crate::{PointXc, XcFunctional};
use gwconsts::*;

const T13: f64 = 1.0 / 3.0;
const T43: f64 = 4.0 / 3.0;

const BETA: f64 = 0.0042;

fn asinh(x: f64) -> f64 {
    (x + (x * x + 1.0).sqrt()).ln()
}

pub struct B88X;

impl XcFunctional for B88X {
    fn requires_gradient(&self) -> bool {
        true
    }

    fn supports_nspin(&self, nspin: usize) -> bool {
        nspin == 1
    }

    fn evaluate(&self, rho: [f64; 2], sigma: [f64; 3], _nspin: usize) -> PointXc {
        let mut out = PointXc::default();

        let n = rho[0].max(0.0);

        if n < EPS20 {
            return out;
        }

        // per-spin variables at zeta = 0: n_s = n/2, |grad n_s| = |grad n|/2
        let ns = 0.5 * n;
        let grad_ns = 0.5 * sigma[0].max(0.0).sqrt();
        let x = grad_ns / ns.powf(T43);

        let sh = asinh(x);
        let denom = 1.0 + 6.0 * BETA * x * sh;
        let g = x * x / denom;

        let cx = -0.75 * (3.0 / PI).powf(T13);
        let s = 2.0f64.powf(T13) * cx;

        // both spin channels contribute equally
        let e_lda = 2.0 * s * ns.powf(T43);
        let e_gga = -2.0 * BETA * ns.powf(T43) * g;

        out.e = e_lda + e_gga;

        // dg/dx
        let dsh = 1.0 / (x * x + 1.0).sqrt();
        let dg = (2.0 * x * denom - x * x * 6.0 * BETA * (sh + x * dsh)) / (denom * denom);

        // chain rule through (ns, x); dns/dn = 1/2, dx/dn = -4/3 x / n,
        // dx/dsigma = x / (2 sigma)
        let de_dns = T43 * 2.0 * s * ns.powf(T13) - 2.0 * BETA * (T43 * ns.powf(T13) * g);
        let dx_dn = -T43 * x / n;

        out.dedn[0] = de_dns * 0.5 - 2.0 * BETA * ns.powf(T43) * dg * dx_dn;

        if sigma[0] > EPS30 {
            let dx_dsigma = 0.5 * x / sigma[0];
            out.dedsigma[0] = -2.0 * BETA * ns.powf(T43) * dg * dx_dsigma;
        }

        out
    }
}
