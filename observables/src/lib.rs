//! Scalar observables of the electronic state.

use fields::Field;
use gwconsts::*;
use types::c64;
use vector3::Vector3f64;

/// Electronic dipole \int rho(r) r dV with the centered coordinate
/// convention of the grid.
pub fn dipole(rho: &Field<f64>) -> Vector3f64 {
    let layout = rho.layout().clone();
    let data = rho.as_slice();

    let mut dip = Vector3f64::zeros();

    layout.for_each_local_point(|ip, ix, iy, iz| {
        let r = layout.grid().rvector(ix, iy, iz);

        dip += r * data[ip];
    });

    dip = dip * layout.grid().volume_element();

    let mut buf = [dip.x, dip.y, dip.z];
    layout.domain().all_reduce_sum_f64(&mut buf);

    Vector3f64::new(buf[0], buf[1], buf[2])
}

/// rho(q) = \int rho(r) e^{i q.r} dV, the IXS companion observable.
pub fn density_at_q(rho: &Field<f64>, q: Vector3f64) -> c64 {
    let layout = rho.layout().clone();
    let data = rho.as_slice();

    let mut acc = ZERO_C64;

    layout.for_each_local_point(|ip, ix, iy, iz| {
        let r = layout.grid().rvector(ix, iy, iz);
        let phase = q.dot_product(&r);

        acc += c64 {
            re: data[ip] * phase.cos(),
            im: data[ip] * phase.sin(),
        };
    });

    acc *= layout.grid().volume_element();

    let mut buf = [acc];
    layout.domain().all_reduce_sum_c64(&mut buf);

    buf[0]
}

/// Damped-window Fourier transform of a real-time series.
///
/// Trapezoid quadrature with the cubic damp 1 - 3 x^2 + 2 x^3 (x = t/t_max);
/// the damp vanishes on the last sample, so it drops out of the sum.
/// Output length is maxw/dw + 1.
pub fn spectrum(maxw: f64, dw: f64, time: &[f64], time_series: &[f64]) -> Vec<c64> {
    assert_eq!(time.len(), time_series.len());
    assert!(time.len() >= 2, "spectrum needs a time series");

    let ntime = time.len();
    let nfreq = (maxw / dw) as usize + 1;

    let tmax = time[ntime - 1];

    let mut freq_series = Vec::with_capacity(nfreq);

    for ifreq in 0..nfreq {
        let ww = dw * ifreq as f64;

        let mut sum = c64 {
            re: 0.5 * (time[1] - time[0]) * time_series[0],
            im: 0.0,
        };

        for itime in 1..ntime - 1 {
            debug_assert!(time[itime] > time[itime - 1]);

            let fract = time[itime] / tmax;
            let damp_factor = 1.0 - 3.0 * fract * fract + 2.0 * fract * fract * fract;

            let weight = 0.5 * damp_factor * (time[itime + 1] - time[itime - 1]);
            let phase = ww * time[itime];

            sum += c64 {
                re: weight * phase.cos() * time_series[itime],
                im: weight * phase.sin() * time_series[itime],
            };
        }

        freq_series.push(sum);
    }

    freq_series
}
