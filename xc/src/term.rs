//! Assembly of the XC energy and potential on a spin density.

use crate::{blend, check_nspin, WeightedFunctional, XcKind};
use density::SpinDensity;
use fields::Field;
use gwconsts::*;
use space::Transform;
use types::Error;

pub struct XcEvaluation {
    /// XC energy.
    pub exc: f64,
    /// \int rho . v_xc dV, without the core correction; the double-counting
    /// term of the total energy.
    pub nvxc: f64,
    /// Potential channels, as many as the input density carries.
    pub potential: Vec<Field<f64>>,
}

pub struct XcTerm {
    exchange: Vec<WeightedFunctional>,
    correlation: Vec<WeightedFunctional>,
}

impl XcTerm {
    pub fn new(
        exchange_parts: &[(f64, XcKind)],
        correlation_parts: &[(f64, XcKind)],
        spin_components: usize,
    ) -> Result<XcTerm, Error> {
        let exchange = blend(exchange_parts);
        let correlation = blend(correlation_parts);

        let nspin_eval = spin_components.min(2);

        check_nspin(&exchange, nspin_eval)?;
        check_nspin(&correlation, nspin_eval)?;

        Ok(XcTerm {
            exchange,
            correlation,
        })
    }

    /// No functional attached (non-interacting / Hartree / pure HF runs).
    pub fn is_empty(&self) -> bool {
        self.exchange.is_empty() && self.correlation.is_empty()
    }

    pub fn requires_gradient(&self) -> bool {
        self.exchange
            .iter()
            .chain(self.correlation.iter())
            .any(|p| p.functional.requires_gradient())
    }

    pub fn evaluate(
        &self,
        trans: &Transform,
        spin_density: &SpinDensity,
        core_density: Option<&Field<f64>>,
    ) -> Result<XcEvaluation, Error> {
        let layout = spin_density.layout().clone();
        let comps = spin_density.components();
        let nspin = comps.min(2);

        if self.is_empty() {
            return Ok(XcEvaluation {
                exc: 0.0,
                nvxc: 0.0,
                potential: (0..comps).map(|_| Field::<f64>::new(&layout)).collect(),
            });
        }

        // channel densities without and with the core correction
        let bare = process_density(spin_density);

        let mut full = bare.clone();
        if let Some(core) = core_density {
            for ch in full.iter_mut() {
                ch.axpy(1.0 / nspin as f64, core);
            }
        }

        // gradients and sigma contractions for the GGA parts
        let needs_grad = self.requires_gradient();

        let grads: Vec<[Field<f64>; 3]> = if needs_grad {
            full.iter().map(|ch| trans.gradient(ch)).collect()
        } else {
            Vec::new()
        };

        let npoints = layout.local_len();

        let mut e_density = vec![0.0; npoints];
        let mut vrho: Vec<Vec<f64>> = (0..nspin).map(|_| vec![0.0; npoints]).collect();
        let mut dedsigma = vec![0.0; npoints];

        for part in self.exchange.iter().chain(self.correlation.iter()) {
            for ip in 0..npoints {
                let rho = [
                    full[0].as_slice()[ip],
                    if nspin == 2 { full[1].as_slice()[ip] } else { 0.0 },
                ];

                let sigma = if needs_grad && part.functional.requires_gradient() {
                    let g = &grads[0];
                    let s = g[0].as_slice()[ip] * g[0].as_slice()[ip]
                        + g[1].as_slice()[ip] * g[1].as_slice()[ip]
                        + g[2].as_slice()[ip] * g[2].as_slice()[ip];
                    [s, 0.0, 0.0]
                } else {
                    [0.0; 3]
                };

                let out = part.functional.evaluate(rho, sigma, nspin);

                e_density[ip] += part.coefficient * out.e;

                for ch in 0..nspin {
                    vrho[ch][ip] += part.coefficient * out.dedn[ch];
                }

                dedsigma[ip] += part.coefficient * out.dedsigma[0];
            }
        }

        // v -= 2 div(dedsigma grad n), the gradient part of the potential
        if needs_grad {
            let mut div = vec![0.0; npoints];

            for dir in 0..3 {
                let mut w = Field::<f64>::new(&layout);

                for (x, (&ds, &g)) in w
                    .as_mut_slice()
                    .iter_mut()
                    .zip(dedsigma.iter().zip(grads[0][dir].as_slice().iter()))
                {
                    *x = ds * g;
                }

                let dw = trans.gradient(&w);

                for (d, &x) in div.iter_mut().zip(dw[dir].as_slice().iter()) {
                    *d += x;
                }
            }

            for (v, &d) in vrho[0].iter_mut().zip(div.iter()) {
                *v -= 2.0 * d;
            }
        }

        // energy integral
        let dv = layout.grid().volume_element();
        let exc_local: f64 = e_density.iter().sum::<f64>() * dv;
        let exc = layout.domain().sum_f64(exc_local);

        // nvxc excludes the core correction
        let mut nvxc_local = 0.0;

        for ch in 0..nspin {
            for (v, b) in vrho[ch].iter().zip(bare[ch].as_slice().iter()) {
                nvxc_local += v * b;
            }
        }

        let nvxc = layout.domain().sum_f64(nvxc_local * dv);

        // potential channels back in the input representation
        let potential = project_potential(spin_density, &layout, &vrho);

        Ok(XcEvaluation {
            exc,
            nvxc,
            potential,
        })
    }
}

/// Collapse the spin density onto the evaluation channels: identity for 1
/// and 2 components; the 4-component case diagonalizes pointwise to
/// (n_tot +- |m|)/2. Negative channel values are clamped to zero.
fn process_density(spin_density: &SpinDensity) -> Vec<Field<f64>> {
    match spin_density {
        SpinDensity::NonSpin(f) => {
            let mut ch = f.clone();
            clamp_negative(&mut ch);
            vec![ch]
        }

        SpinDensity::Spin(up, dn) => {
            let mut chu = up.clone();
            let mut chd = dn.clone();
            clamp_negative(&mut chu);
            clamp_negative(&mut chd);
            vec![chu, chd]
        }

        SpinDensity::Ncl(f) => {
            let layout = f[0].layout().clone();
            let mut chu = Field::<f64>::new(&layout);
            let mut chd = Field::<f64>::new(&layout);

            let n = f[0].len();

            for ip in 0..n {
                let dtot = f[0].as_slice()[ip] + f[1].as_slice()[ip];
                let dd = f[0].as_slice()[ip] - f[1].as_slice()[ip];
                let dpol = (dd * dd
                    + 4.0
                        * (f[2].as_slice()[ip] * f[2].as_slice()[ip]
                            + f[3].as_slice()[ip] * f[3].as_slice()[ip]))
                    .sqrt();

                chu.as_mut_slice()[ip] = (0.5 * (dtot + dpol)).max(0.0);
                chd.as_mut_slice()[ip] = (0.5 * (dtot - dpol)).max(0.0);
            }

            vec![chu, chd]
        }
    }
}

fn clamp_negative(f: &mut Field<f64>) {
    for v in f.as_mut_slice() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
}

/// Map the evaluated channel potentials back onto the input representation;
/// the non-collinear case rebuilds the 4-component potential along the local
/// magnetization direction.
fn project_potential(
    spin_density: &SpinDensity,
    layout: &fields::Layout,
    vrho: &[Vec<f64>],
) -> Vec<Field<f64>> {
    match spin_density {
        SpinDensity::NonSpin(_) => {
            let mut v = Field::<f64>::new(layout);
            v.as_mut_slice().copy_from_slice(&vrho[0]);
            vec![v]
        }

        SpinDensity::Spin(_, _) => {
            let mut vu = Field::<f64>::new(layout);
            let mut vd = Field::<f64>::new(layout);
            vu.as_mut_slice().copy_from_slice(&vrho[0]);
            vd.as_mut_slice().copy_from_slice(&vrho[1]);
            vec![vu, vd]
        }

        SpinDensity::Ncl(f) => {
            let mut out: Vec<Field<f64>> = (0..4).map(|_| Field::<f64>::new(layout)).collect();

            let n = f[0].len();

            for ip in 0..n {
                let v00 = 0.5 * (vrho[0][ip] + vrho[1][ip]);
                let dv = 0.5 * (vrho[0][ip] - vrho[1][ip]);

                let mz = f[0].as_slice()[ip] - f[1].as_slice()[ip];
                let mx = 2.0 * f[2].as_slice()[ip];
                let my = 2.0 * f[3].as_slice()[ip];
                let mnorm = (mx * mx + my * my + mz * mz).sqrt();

                if mnorm < EPS20 {
                    out[0].as_mut_slice()[ip] = v00;
                    out[1].as_mut_slice()[ip] = v00;
                } else {
                    out[0].as_mut_slice()[ip] = v00 + dv * mz / mnorm;
                    out[1].as_mut_slice()[ip] = v00 - dv * mz / mnorm;
                    out[2].as_mut_slice()[ip] = dv * mx / mnorm;
                    out[3].as_mut_slice()[ip] = dv * my / mnorm;
                }
            }

            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fields::Layout;
    use grid::RealGrid;
    use lattice::Cell;

    fn setup(n: [usize; 3], l: f64) -> (Layout, Transform) {
        let cell = Cell::new(
            &[l, 0.0, 0.0],
            &[0.0, 1.339805825242718 * l, 0.0],
            &[0.0, 0.0, 0.4368932038834951 * l],
            3,
        )
        .unwrap();

        let grid = RealGrid::with_sizes(&cell, n);
        let layout = Layout::serial(&grid);
        let trans = Transform::new(&layout);

        (layout, trans)
    }

    #[test]
    fn test_lda_x_on_analytic_density() {
        // box 10.3 x 13.8 x 4.5 Bohr, rho = max(0, cos(k.r) + 1) normalized
        // to 42 electrons, LDA exchange on the unpolarized branch
        let (layout, trans) = setup([104, 138, 45], 10.3);

        let lx = 10.3;
        let ly = 1.339805825242718 * 10.3;
        let lz = 0.4368932038834951 * 10.3;

        let kx = TWOPI / lx;
        let ky = TWOPI / ly;
        let kz = TWOPI / lz;

        let mut rho = SpinDensity::NonSpin(Field::<f64>::from_fn(&layout, |r| {
            ((kx * r.x + ky * r.y + kz * r.z).cos() + 1.0).max(0.0)
        }));

        rho.normalize(42.0);

        let term = XcTerm::new(&[(1.0, XcKind::SlaterX)], &[], 1).unwrap();
        let eval = term.evaluate(&trans, &rho, None).unwrap();

        assert!(
            (eval.exc - -14.0558385758).abs() < 1E-6,
            "E_x = {}",
            eval.exc
        );

        // for pure LDA exchange: nvxc = (4/3) exc
        assert!((eval.nvxc - 4.0 / 3.0 * eval.exc).abs() < 1E-8);
    }

    #[test]
    fn test_lda_x_spin_scaling_on_grid() {
        // fully polarized exchange is 2^{1/3} times the unpolarized value
        let (layout, trans) = setup([20, 27, 10], 10.3);

        let profile = Field::<f64>::from_fn(&layout, |r| ((0.6 * r.x).cos() + 1.2).max(0.0));

        let unpol = SpinDensity::NonSpin(profile.clone());

        let mut zero = profile.clone();
        zero.set_value(0.0);
        let ferro = SpinDensity::Spin(profile.clone(), zero);

        let term1 = XcTerm::new(&[(1.0, XcKind::SlaterX)], &[], 1).unwrap();
        let term2 = XcTerm::new(&[(1.0, XcKind::SlaterX)], &[], 2).unwrap();

        let e1 = term1.evaluate(&trans, &unpol, None).unwrap().exc;
        let e2 = term2.evaluate(&trans, &ferro, None).unwrap().exc;

        assert!((e2 - 2.0f64.powf(1.0 / 3.0) * e1).abs() < 1E-10);
    }

    #[test]
    fn test_core_correction_changes_exc_not_nvxc_base() {
        let (layout, trans) = setup([12, 12, 12], 8.0);

        let rho = SpinDensity::NonSpin(Field::<f64>::from_fn(&layout, |r| {
            0.2 + 0.05 * (0.5 * r.x).cos()
        }));

        let core = Field::<f64>::from_fn(&layout, |r| 0.1 * (-r.norm_sqr()).exp());

        let term = XcTerm::new(&[(1.0, XcKind::SlaterX)], &[(1.0, XcKind::PzC)], 1).unwrap();

        let plain = term.evaluate(&trans, &rho, None).unwrap();
        let cored = term.evaluate(&trans, &rho, Some(&core)).unwrap();

        assert!(cored.exc < plain.exc);

        // nvxc integrates the electronic density only, but against the
        // core-corrected potential
        let n = rho.total_charge();
        assert!(plain.nvxc.abs() > 0.0);
        assert!(n > 0.0);
    }

    #[test]
    fn test_ncl_reduces_to_collinear() {
        // magnetization along z: the 4-component result matches the
        // 2-component one
        let (layout, trans) = setup([10, 10, 10], 8.0);

        let up = Field::<f64>::from_fn(&layout, |r| 0.3 + 0.1 * (0.4 * r.x).cos());
        let dn = Field::<f64>::from_fn(&layout, |r| 0.2 + 0.05 * (0.4 * r.y).cos());

        let collinear = SpinDensity::Spin(up.clone(), dn.clone());

        let zero = {
            let mut z = up.clone();
            z.set_value(0.0);
            z
        };
        let ncl = SpinDensity::Ncl([up, dn, zero.clone(), zero]);

        let term = XcTerm::new(&[(1.0, XcKind::SlaterX)], &[(1.0, XcKind::PzC)], 2).unwrap();
        let term4 = XcTerm::new(&[(1.0, XcKind::SlaterX)], &[(1.0, XcKind::PzC)], 4).unwrap();

        let a = term.evaluate(&trans, &collinear, None).unwrap();
        let b = term4.evaluate(&trans, &ncl, None).unwrap();

        assert!((a.exc - b.exc).abs() < 1E-10);
        assert!((a.nvxc - b.nvxc).abs() < 1E-10);

        // potential channels agree
        for (x, y) in a.potential[0]
            .as_slice()
            .iter()
            .zip(b.potential[0].as_slice().iter())
        {
            assert!((x - y).abs() < 1E-10);
        }
    }
}
