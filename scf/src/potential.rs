//! Assembly of the local Kohn-Sham potential from the current density.

use density::SpinDensity;
use fields::Field;
use space::Transform;
use types::Error;
use xc::XcTerm;

pub struct PotentialParts {
    pub hartree_energy: f64,
    pub exc: f64,
    pub nvxc: f64,
}

/// V_KS = V_ion^loc + V_H[rho] + V_xc[rho], one channel per collinear spin.
/// The non-interacting theory drops the electronic Hartree term.
pub fn ks_potential(
    trans: &Transform,
    vion: &Field<f64>,
    rho: &SpinDensity,
    core: Option<&Field<f64>>,
    xc_term: &XcTerm,
    includes_hartree: bool,
) -> Result<(Vec<Field<f64>>, PotentialParts), Error> {
    let rho_tot = rho.total();

    let (vh, hartree_energy) = if includes_hartree {
        let vh = poisson::solve_real(trans, &rho_tot)?;
        let eh = 0.5 * vh.integral_product(&rho_tot);

        (vh, eh)
    } else {
        (rho_tot.skeleton(), 0.0)
    };

    let xc_eval = xc_term.evaluate(trans, rho, core)?;

    let nch = rho.components().min(2);

    let mut vks = Vec::with_capacity(nch);

    for ch in 0..nch {
        let mut v = vion.clone();

        v.add_assign(&vh);
        v.add_assign(&xc_eval.potential[ch]);

        vks.push(v);
    }

    Ok((
        vks,
        PotentialParts {
            hartree_energy,
            exc: xc_eval.exc,
            nvxc: xc_eval.nvxc,
        },
    ))
}
