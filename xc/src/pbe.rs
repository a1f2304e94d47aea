//! PBE exchange (with the RPBE enhancement variant) and PBE correlation on
//! the PW92 local base. Unpolarized branch only; the polarized request is
//! rejected at term construction.

use crate::{PointXc, XcFunctional};
use gwconsts::*;

const T13: f64 = 1.0 / 3.0;
const T43: f64 = 4.0 / 3.0;

const KAPPA: f64 = 0.804;
const MU: f64 = 0.2195149727645171;

pub struct PbeX {
    pub rpbe: bool,
}

impl XcFunctional for PbeX {
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

        let cx = -0.75 * (3.0 / PI).powf(T13);
        let ex_lda = cx * n.powf(T43);

        // s^2 = sigma / (4 (3 pi^2)^{2/3} n^{8/3})
        let c_s = 4.0 * (3.0 * PI * PI).powf(2.0 / 3.0);
        let s2 = sigma[0].max(0.0) / (c_s * n.powf(8.0 / 3.0));

        let (f, df_ds2) = if self.rpbe {
            let e = (-MU * s2 / KAPPA).exp();
            (1.0 + KAPPA * (1.0 - e), MU * e)
        } else {
            let d = 1.0 + MU * s2 / KAPPA;
            (1.0 + KAPPA - KAPPA / d, MU / (d * d))
        };

        out.e = ex_lda * f;

        let ds2_dn = -8.0 / 3.0 * s2 / n;
        let ds2_dsigma = 1.0 / (c_s * n.powf(8.0 / 3.0));

        out.dedn[0] = T43 * cx * n.powf(T13) * f + ex_lda * df_ds2 * ds2_dn;
        out.dedsigma[0] = ex_lda * df_ds2 * ds2_dsigma;

        out
    }
}

// PW92 unpolarized parameters
const PW_A: f64 = 0.031091;
const PW_A1: f64 = 0.21370;
const PW_B1: f64 = 7.5957;
const PW_B2: f64 = 3.5876;
const PW_B3: f64 = 1.6382;
const PW_B4: f64 = 0.49294;

/// (ec, dec/drs) per particle.
fn pw92(rs: f64) -> (f64, f64) {
    let q0 = -2.0 * PW_A * (1.0 + PW_A1 * rs);
    let dq0 = -2.0 * PW_A * PW_A1;

    let sq = rs.sqrt();
    let q1 = 2.0 * PW_A * (PW_B1 * sq + PW_B2 * rs + PW_B3 * rs * sq + PW_B4 * rs * rs);
    let dq1 = PW_A * (PW_B1 / sq + 2.0 * PW_B2 + 3.0 * PW_B3 * sq + 4.0 * PW_B4 * rs);

    let arg = 1.0 + 1.0 / q1;
    let lg = arg.ln();

    let ec = q0 * lg;
    let dec = dq0 * lg - q0 * dq1 / (q1 * q1 * arg);

    (ec, dec)
}

pub struct PbeC;

const BETA_C: f64 = 0.06672455060314922;

impl XcFunctional for PbeC {
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

        let gamma = (1.0 - 2.0f64.ln()) / (PI * PI);
        let bg = BETA_C / gamma;

        let rs = (3.0 / (FOURPI * n)).powf(T13);
        let (ec, dec_drs) = pw92(rs);
        let drs_dn = -rs / (3.0 * n);
        let dec_dn = dec_drs * drs_dn;

        // t^2 = sigma pi / (16 (3 pi^2)^{1/3} n^{7/3})
        let c_t = PI / (16.0 * (3.0 * PI * PI).powf(T13));
        let t2 = sigma[0].max(0.0) * c_t / n.powf(7.0 / 3.0);

        let expo = (-ec / gamma).exp();
        let denom_a = expo - 1.0;

        // A -> infinity as ec -> 0-; the H term vanishes there
        let a = if denom_a.abs() < EPS30 {
            1.0 / EPS30
        } else {
            bg / denom_a
        };

        let d = 1.0 + a * t2 + a * a * t2 * t2;
        let u = t2 * (1.0 + a * t2) / d;

        let h = gamma * (1.0 + bg * u).ln();

        out.e = n * (ec + h);

        let dh_du = BETA_C / (1.0 + bg * u);

        let du_dt2 = ((1.0 + 2.0 * a * t2) * d
            - (t2 + a * t2 * t2) * (a + 2.0 * a * a * t2))
            / (d * d);
        let du_da = (t2 * t2 * d - (t2 + a * t2 * t2) * (t2 + 2.0 * a * t2 * t2)) / (d * d);

        let da_dec = a * a * expo / BETA_C;

        let dt2_dn = -7.0 / 3.0 * t2 / n;
        let dt2_dsigma = c_t / n.powf(7.0 / 3.0);

        let dh_dn = dh_du * (du_dt2 * dt2_dn + du_da * da_dec * dec_dn);

        out.dedn[0] = ec + h + n * (dec_dn + dh_dn);
        out.dedsigma[0] = n * dh_du * du_dt2 * dt2_dsigma;

        out
    }
}
