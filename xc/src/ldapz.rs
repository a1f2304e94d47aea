//! Slater exchange and Perdew-Zunger correlation, both spin branches.

use crate::{PointXc, XcFunctional};
use gwconsts::*;

const T13: f64 = 1.0 / 3.0;
const T43: f64 = 4.0 / 3.0;

pub struct SlaterX;

impl XcFunctional for SlaterX {
    fn supports_nspin(&self, nspin: usize) -> bool {
        nspin == 1 || nspin == 2
    }

    fn evaluate(&self, rho: [f64; 2], _sigma: [f64; 3], nspin: usize) -> PointXc {
        let cx = -0.75 * (3.0 / PI).powf(T13);

        let mut out = PointXc::default();

        if nspin == 1 {
            let n = rho[0].max(0.0);

            out.e = cx * n.powf(T43);
            out.dedn[0] = T43 * cx * n.powf(T13);
        } else {
            // E_x[n_up, n_dn] = (E_x[2 n_up] + E_x[2 n_dn]) / 2
            let s = 2.0f64.powf(T13) * cx;

            for ch in 0..2 {
                let n = rho[ch].max(0.0);

                out.e += s * n.powf(T43);
                out.dedn[ch] = T43 * s * n.powf(T13);
            }
        }

        out
    }
}

/// PZ'81 parameters, unpolarized and fully polarized sets.
struct PzParams {
    gamma: f64,
    beta1: f64,
    beta2: f64,
    a: f64,
    b: f64,
    c: f64,
    d: f64,
}

const PZ_U: PzParams = PzParams {
    gamma: -0.1423,
    beta1: 1.0529,
    beta2: 0.3334,
    a: 0.0311,
    b: -0.048,
    c: 0.0020,
    d: -0.0116,
};

const PZ_P: PzParams = PzParams {
    gamma: -0.0843,
    beta1: 1.3981,
    beta2: 0.2611,
    a: 0.01555,
    b: -0.0269,
    c: 0.0007,
    d: -0.0048,
};

/// (ec, vc) per particle at density parameter rs.
fn pz_branch(rs: f64, p: &PzParams) -> (f64, f64) {
    if rs > 1.0 {
        let rroot = rs.sqrt();
        let dt = 1.0 + p.beta1 * rroot + p.beta2 * rs;

        let ec = p.gamma / dt;

        let nt = 1.0 + 7.0 / 6.0 * p.beta1 * rroot + T43 * p.beta2 * rs;

        (ec, ec * nt / dt)
    } else {
        let rln = rs.ln();

        let ec = p.a * rln + p.b + p.c * rs * rln + p.d * rs;

        let vc = p.a * rln + (p.b - p.a / 3.0)
            + 2.0 / 3.0 * p.c * rs * rln
            + (2.0 * p.d - p.c) * rs / 3.0;

        (ec, vc)
    }
}

/// von Barth-Hedin interpolation weight.
fn f_zeta(zeta: f64) -> (f64, f64) {
    let denom = 2.0f64.powf(T43) - 2.0;

    let f = ((1.0 + zeta).powf(T43) + (1.0 - zeta).powf(T43) - 2.0) / denom;
    let df = T43 * ((1.0 + zeta).powf(T13) - (1.0 - zeta).powf(T13)) / denom;

    (f, df)
}

pub struct PzC;

impl XcFunctional for PzC {
    fn supports_nspin(&self, nspin: usize) -> bool {
        nspin == 1 || nspin == 2
    }

    fn evaluate(&self, rho: [f64; 2], _sigma: [f64; 3], nspin: usize) -> PointXc {
        let mut out = PointXc::default();

        let n = if nspin == 1 {
            rho[0].max(0.0)
        } else {
            (rho[0] + rho[1]).max(0.0)
        };

        if n < EPS30 {
            return out;
        }

        let rs = (3.0 / (FOURPI * n)).powf(T13);

        if nspin == 1 {
            let (ec, vc) = pz_branch(rs, &PZ_U);

            out.e = n * ec;
            out.dedn[0] = vc;
        } else {
            let zeta = ((rho[0] - rho[1]) / n).clamp(-1.0, 1.0);

            let (ec_u, vc_u) = pz_branch(rs, &PZ_U);
            let (ec_p, vc_p) = pz_branch(rs, &PZ_P);
            let (f, df) = f_zeta(zeta);

            let ec = ec_u + f * (ec_p - ec_u);

            out.e = n * ec;

            let vc_base = vc_u + f * (vc_p - vc_u);
            let dec = (ec_p - ec_u) * df;

            out.dedn[0] = vc_base + dec * (1.0 - zeta);
            out.dedn[1] = vc_base + dec * (-1.0 - zeta);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pz_continuity_at_rs_one() {
        let (el, _) = pz_branch(1.0 - 1E-9, &PZ_U);
        let (eh, _) = pz_branch(1.0 + 1E-9, &PZ_U);

        assert!((el - eh).abs() < 1E-4);
    }

    #[test]
    fn test_pz_polarized_interpolation_limits() {
        let f = PzC;

        let n = 0.2;

        // zeta = 0 recovers the unpolarized branch
        let unpol = f.evaluate([n, 0.0], [0.0; 3], 1);
        let para = f.evaluate([n / 2.0, n / 2.0], [0.0; 3], 2);
        assert!((unpol.e - para.e).abs() < 1E-12);

        // zeta = 1 recovers the fully polarized parameter set
        let ferro = f.evaluate([n, 0.0], [0.0; 3], 2);
        let rs = (3.0 / (FOURPI * n)).powf(T13);
        let (ec_p, _) = pz_branch(rs, &PZ_P);
        assert!((ferro.e - n * ec_p).abs() < 1E-12);
    }

    #[test]
    fn test_f_zeta_bounds() {
        let (f0, _) = f_zeta(0.0);
        let (f1, _) = f_zeta(1.0);

        assert!(f0.abs() < 1E-14);
        assert!((f1 - 1.0).abs() < 1E-14);
    }
}
