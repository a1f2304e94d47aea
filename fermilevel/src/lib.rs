//! Fermi-level solve: bisection in mu so the occupation-weighted state count
//! matches the electron count.

use gwconsts::*;
use smearing::Smearing;
use types::Error;

/// Total electron count at a trial Fermi level.
///
/// `evals` holds one eigenvalue list per (spin, k) block, `kweights` the
/// matching weights; `max_occ` is 2 for the unpolarized treatment and 1
/// otherwise.
pub fn count_electrons(
    evals: &[Vec<f64>],
    kweights: &[f64],
    smearing: &dyn Smearing,
    temperature: f64,
    max_occ: f64,
    fermi: f64,
) -> f64 {
    let mut ntot = 0.0;

    for (block, &w) in evals.iter().zip(kweights.iter()) {
        for &e in block.iter() {
            ntot += max_occ * w * smearing.get_occupation_number(fermi, temperature, e);
        }
    }

    ntot
}

/// Solve for mu with sum_i f_i(mu, T) = nelec.
///
/// Fatal when mu cannot be bracketed (more electrons than states can hold,
/// or an empty spectrum).
pub fn get_fermi_level(
    evals: &[Vec<f64>],
    kweights: &[f64],
    smearing: &dyn Smearing,
    temperature: f64,
    max_occ: f64,
    nelec: f64,
) -> Result<f64, Error> {
    let emin = evals
        .iter()
        .flat_map(|b| b.iter())
        .cloned()
        .fold(f64::INFINITY, f64::min);
    let emax = evals
        .iter()
        .flat_map(|b| b.iter())
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);

    if !emin.is_finite() || !emax.is_finite() {
        return Err(Error::BadOccupations(
            "empty eigenvalue spectrum in the Fermi-level solve".to_string(),
        ));
    }

    let width = (BOLTZMANN_CONSTANT * temperature).max(EPS6);

    let mut lower = emin - 30.0 * width - 1.0;
    let mut upper = emax + 30.0 * width + 1.0;

    let count =
        |mu: f64| count_electrons(evals, kweights, smearing, temperature, max_occ, mu);

    if count(upper) < nelec - EPS10 {
        return Err(Error::BadOccupations(format!(
            "cannot bracket the Fermi level: {} states hold at most {:.3} electrons, need {:.3}",
            evals.iter().map(|b| b.len()).sum::<usize>(),
            count(upper),
            nelec
        )));
    }

    let mut fermi = 0.5 * (lower + upper);

    for _ in 0..200 {
        fermi = 0.5 * (lower + upper);
        let ntot = count(fermi);

        if (ntot - nelec).abs() < EPS12 {
            break;
        }

        if ntot > nelec {
            upper = fermi;
        } else {
            lower = fermi;
        }
    }

    Ok(fermi)
}

/// Occupations at a solved Fermi level, one list per (spin, k) block.
pub fn compute_occupations(
    evals: &[Vec<f64>],
    smearing: &dyn Smearing,
    temperature: f64,
    max_occ: f64,
    fermi: f64,
) -> Vec<Vec<f64>> {
    evals
        .iter()
        .map(|block| {
            block
                .iter()
                .map(|&e| max_occ * smearing.get_occupation_number(fermi, temperature, e))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fermi_level_half_filling() {
        // two degenerate pairs, 2 electrons with max_occ 2: mu between them
        let evals = vec![vec![-1.0, -1.0, 1.0, 1.0]];
        let sm = smearing::new("fd");

        let mu = get_fermi_level(&evals, &[1.0], sm.as_ref(), 300.0, 2.0, 4.0).unwrap();

        assert!((mu - 0.0).abs() < 1E-6);

        let occ = compute_occupations(&evals, sm.as_ref(), 300.0, 2.0, mu);
        let ntot: f64 = occ[0].iter().sum();

        assert!((ntot - 4.0).abs() < 1E-10);
        assert!((occ[0][0] - 2.0).abs() < 1E-8);
        assert!(occ[0][2] < 1E-8);
    }

    #[test]
    fn test_fermi_level_with_kweights() {
        let evals = vec![vec![-0.5, 0.5], vec![-0.4, 0.6]];
        let kweights = [0.5, 0.5];
        let sm = smearing::new("fd");

        let mu = get_fermi_level(&evals, &kweights, sm.as_ref(), 300.0, 2.0, 2.0).unwrap();

        let n = count_electrons(&evals, &kweights, sm.as_ref(), 300.0, 2.0, mu);

        assert!((n - 2.0).abs() < 1E-10);
    }

    #[test]
    fn test_fractional_occupation_at_temperature() {
        // an odd electron count forces a partially filled level
        let evals = vec![vec![-1.0, 0.0, 1.0]];
        let sm = smearing::new("fd");

        let mu = get_fermi_level(&evals, &[1.0], sm.as_ref(), 5000.0, 2.0, 3.0).unwrap();

        let occ = compute_occupations(&evals, sm.as_ref(), 5000.0, 2.0, mu);

        assert!((occ[0].iter().sum::<f64>() - 3.0).abs() < 1E-10);
        assert!(occ[0][1] > 0.5 && occ[0][1] < 1.5);
    }

    #[test]
    fn test_unbracketable_mu_is_fatal() {
        // 1 state, max_occ 2, but 4 electrons requested
        let evals = vec![vec![0.0]];
        let sm = smearing::new("fd");

        let res = get_fermi_level(&evals, &[1.0], sm.as_ref(), 300.0, 2.0, 4.0);

        assert!(matches!(res, Err(Error::BadOccupations(_))));
    }
}
