//! Spin-resolved electronic density.
//!
//! 1 component: unpolarized. 2 components: collinear up/down. 4 components:
//! non-collinear (n_upup, n_dndn, Re n_updn, Im n_updn); the total density
//! is the trace and the magnetization is (2 c2, 2 c3, c0 - c1).

use enum_as_inner::EnumAsInner;
use fields::{Field, Layout, OrbitalSet};
use types::Error;
use vector3::Vector3f64;

#[derive(Clone, EnumAsInner)]
pub enum SpinDensity {
    NonSpin(Field<f64>),
    Spin(Field<f64>, Field<f64>),
    Ncl([Field<f64>; 4]),
}

impl SpinDensity {
    pub fn new(layout: &Layout, spin_components: usize) -> Result<SpinDensity, Error> {
        match spin_components {
            1 => Ok(SpinDensity::NonSpin(Field::new(layout))),
            2 => Ok(SpinDensity::Spin(Field::new(layout), Field::new(layout))),
            4 => Ok(SpinDensity::Ncl([
                Field::new(layout),
                Field::new(layout),
                Field::new(layout),
                Field::new(layout),
            ])),
            other => Err(Error::BadConfiguration(format!(
                "spin densities carry 1, 2 or 4 components, got {other}"
            ))),
        }
    }

    pub fn components(&self) -> usize {
        match self {
            SpinDensity::NonSpin(_) => 1,
            SpinDensity::Spin(_, _) => 2,
            SpinDensity::Ncl(_) => 4,
        }
    }

    pub fn layout(&self) -> &Layout {
        match self {
            SpinDensity::NonSpin(f) => f.layout(),
            SpinDensity::Spin(f, _) => f.layout(),
            SpinDensity::Ncl(f) => f[0].layout(),
        }
    }

    pub fn channel(&self, i: usize) -> &Field<f64> {
        match self {
            SpinDensity::NonSpin(f) => {
                assert_eq!(i, 0);
                f
            }
            SpinDensity::Spin(up, dn) => match i {
                0 => up,
                1 => dn,
                _ => panic!("spin density has 2 channels"),
            },
            SpinDensity::Ncl(f) => &f[i],
        }
    }

    pub fn channel_mut(&mut self, i: usize) -> &mut Field<f64> {
        match self {
            SpinDensity::NonSpin(f) => {
                assert_eq!(i, 0);
                f
            }
            SpinDensity::Spin(up, dn) => match i {
                0 => up,
                1 => dn,
                _ => panic!("spin density has 2 channels"),
            },
            SpinDensity::Ncl(f) => &mut f[i],
        }
    }

    /// Trace of the spin density.
    pub fn total(&self) -> Field<f64> {
        match self {
            SpinDensity::NonSpin(f) => f.clone(),
            SpinDensity::Spin(up, dn) => {
                let mut t = up.clone();
                t.add_assign(dn);
                t
            }
            SpinDensity::Ncl(f) => {
                let mut t = f[0].clone();
                t.add_assign(&f[1]);
                t
            }
        }
    }

    /// \int rho_total dV.
    pub fn total_charge(&self) -> f64 {
        self.total().integral()
    }

    /// Integrated magnetization vector; zero for the unpolarized case.
    pub fn total_magnetization(&self) -> Vector3f64 {
        match self {
            SpinDensity::NonSpin(_) => Vector3f64::zeros(),
            SpinDensity::Spin(up, dn) => {
                Vector3f64::new(0.0, 0.0, up.integral() - dn.integral())
            }
            SpinDensity::Ncl(f) => Vector3f64::new(
                2.0 * f[2].integral(),
                2.0 * f[3].integral(),
                f[0].integral() - f[1].integral(),
            ),
        }
    }

    /// Scale so the total charge equals nelec.
    pub fn normalize(&mut self, nelec: f64) {
        let q = self.total_charge();

        assert!(q > 0.0, "cannot normalize a non-positive density");

        let s = nelec / q;

        for i in 0..self.components() {
            self.channel_mut(i).scale(s);
        }
    }

    pub fn skeleton(&self) -> SpinDensity {
        SpinDensity::new(self.layout(), self.components()).expect("valid component count")
    }
}

/// rho = sum_lots w_k sum_i f_i |phi_i|^2, accumulated into the channel the
/// lot's spin index selects and all-reduced over the states axis.
pub fn calculate(
    lots: &[OrbitalSet],
    occupations: &[Vec<f64>],
    kweights: &[f64],
    spin_components: usize,
) -> Result<SpinDensity, Error> {
    assert!(!lots.is_empty());
    assert_eq!(lots.len(), occupations.len());
    assert_eq!(lots.len(), kweights.len());

    if spin_components == 4 {
        return Err(Error::BadConfiguration(
            "non-collinear density accumulation requires spinor orbital sets".to_string(),
        ));
    }

    let layout = lots[0].layout().clone();
    let mut rho = SpinDensity::new(&layout, spin_components)?;

    for ((phi, occ), &w) in lots.iter().zip(occupations.iter()).zip(kweights.iter()) {
        assert_eq!(occ.len(), phi.local_states());

        let channel = rho.channel_mut(phi.spin_index().min(spin_components - 1));
        let data = channel.as_mut_slice();

        for j in 0..phi.local_states() {
            let f = occ[j] * w;

            if f < gwconsts::EPS20 {
                continue;
            }

            for (d, z) in data.iter_mut().zip(phi.state(j).iter()) {
                *d += f * z.norm_sqr();
            }
        }
    }

    // partial sums live on each states-axis rank
    for i in 0..rho.components() {
        let ch = rho.channel_mut(i);
        let comm = layout.states().clone();

        comm.all_reduce_sum_f64(ch.as_mut_slice());
    }

    Ok(rho)
}
