//! Atom-centered non-local Kleinman-Bylander projectors.
//!
//! Each atom owns a spherical grid (the grid points within the projector
//! radius) and a dense (points x n_lm) matrix of radial x Y_lm values.
//! Application is gather -> project -> all-reduce -> KB scale ->
//! backproject -> scatter-add. The batched container pads every atom to the
//! largest sphere and projector count, trading memory for uniform kernels.

use fields::{Layout, OrbitalSet};
use gwconsts::*;
use matrix::Matrix;
use pspot::Species;
use special::real_spherical_harmonics;
use types::c64;
use vector3::Vector3f64;

/// Grid points within a cutoff radius of a center, with their displacement
/// vectors (minimum image along periodic dimensions).
pub struct SphericalGrid {
    indices: Vec<usize>,
    rel: Vec<Vector3f64>,
}

impl SphericalGrid {
    pub fn new(layout: &Layout, center: Vector3f64, radius: f64) -> SphericalGrid {
        let mut indices = Vec::new();
        let mut rel = Vec::new();

        let cell = layout.grid().cell().clone();
        let r2 = radius * radius;

        layout.for_each_local_point(|ip, ix, iy, iz| {
            let r = layout.grid().rvector(ix, iy, iz);
            let d = cell.wrap_displacement(r - center);

            if d.norm_sqr() <= r2 {
                indices.push(ip);
                rel.push(d);
            }
        });

        SphericalGrid { indices, rel }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn rel(&self) -> &[Vector3f64] {
        &self.rel
    }
}

/// Projector matrix for one atom.
pub struct Projector {
    iatom: usize,
    sphere: SphericalGrid,
    nlm: usize,
    // (points x nlm), each projector function a contiguous column
    matrix: Matrix<f64>,
    kb: Vec<f64>,
    volume_element: f64,
}

impl Projector {
    pub fn new(layout: &Layout, species: &Species, position: Vector3f64, iatom: usize) -> Projector {
        Projector::with_subsampling(layout, species, position, iatom, 1)
    }

    /// Double-grid construction: each projector value is the average over an
    /// n_sub^3 sub-cell stencil around the grid point, which integrates the
    /// sharp radial profile instead of sampling it. n_sub = 1 is plain
    /// point sampling.
    pub fn with_subsampling(
        layout: &Layout,
        species: &Species,
        position: Vector3f64,
        iatom: usize,
        n_sub: usize,
    ) -> Projector {
        assert!(n_sub >= 1);

        let radius = species.projector_radius();
        let sphere = SphericalGrid::new(layout, position, radius);

        let nlm = species.num_projectors_lm();
        let npoints = sphere.len();

        let mut matrix = Matrix::<f64>::new(npoints, nlm);
        let mut kb = Vec::with_capacity(nlm);

        let stencil = subcell_stencil(layout, n_sub);
        let weight = 1.0 / stencil.len() as f64;

        let mut ilm = 0;

        for channel in species.projectors() {
            let l = channel.l;

            for m in utility::get_quant_num_m(l) {
                let col = matrix.get_mut_col(ilm);

                for (ip, d) in sphere.rel().iter().enumerate() {
                    let mut acc = 0.0;

                    for s in &stencil {
                        let ds = *d + *s;
                        acc += channel.radial.value(ds.norm2())
                            * real_spherical_harmonics(l, m, ds);
                    }

                    col[ip] = weight * acc;
                }

                kb.push(channel.kb_energy);
                ilm += 1;
            }
        }

        Projector {
            iatom,
            sphere,
            nlm,
            matrix,
            kb,
            volume_element: layout.grid().volume_element(),
        }
    }

    pub fn iatom(&self) -> usize {
        self.iatom
    }

    pub fn num_projectors(&self) -> usize {
        self.nlm
    }

    pub fn sphere(&self) -> &SphericalGrid {
        &self.sphere
    }

    pub fn kb_coefficients(&self) -> &[f64] {
        &self.kb
    }

    /// Raw projections c[lm][ist] = dV sum_p P[p][lm] phi[p][ist],
    /// all-reduced over the ranks sharing the sphere.
    pub fn project(&self, phi: &OrbitalSet) -> Matrix<c64> {
        let nst = phi.local_states();
        let mut c = Matrix::<c64>::new(self.nlm, nst);

        for ist in 0..nst {
            let col = phi.state(ist);

            for ilm in 0..self.nlm {
                let p = self.matrix.get_col(ilm);

                let mut acc = ZERO_C64;

                for (ip, &idx) in self.sphere.indices().iter().enumerate() {
                    acc += col[idx] * p[ip];
                }

                c[[ilm, ist]] = acc * self.volume_element;
            }
        }

        phi.layout().domain().all_reduce_sum_c64(c.as_mut_slice());

        c
    }

    /// vnl_acc += sum_lm |beta_lm> d_lm <beta_lm|phi>.
    pub fn apply(&self, phi: &OrbitalSet, vnl_acc: &mut OrbitalSet) {
        if self.nlm == 0 {
            return;
        }

        let mut c = self.project(phi);

        for ist in 0..phi.local_states() {
            for ilm in 0..self.nlm {
                c[[ilm, ist]] *= self.kb[ilm];
            }
        }

        self.backproject_add(&c, vnl_acc);
    }

    /// out[p][ist] += sum_lm P[p][lm] c[lm][ist], scattered into the grid.
    pub fn backproject_add(&self, c: &Matrix<c64>, out: &mut OrbitalSet) {
        for ist in 0..out.local_states() {
            let col = out.state_mut(ist);

            for ilm in 0..self.nlm {
                let p = self.matrix.get_col(ilm);
                let coeff = c[[ilm, ist]];

                for (ip, &idx) in self.sphere.indices().iter().enumerate() {
                    col[idx] += coeff * p[ip];
                }
            }
        }
    }

    /// <beta_lm | phi> plus the same projections of the three cartesian
    /// gradient components; the force assembly contracts them.
    pub fn project_with_gradient(
        &self,
        phi: &OrbitalSet,
        grad: &[OrbitalSet; 3],
    ) -> (Matrix<c64>, [Matrix<c64>; 3]) {
        let c = self.project(phi);
        let g = [
            self.project(&grad[0]),
            self.project(&grad[1]),
            self.project(&grad[2]),
        ];

        (c, g)
    }
}

/// Sub-cell displacement stencil for the double-grid option: offsets of the
/// n_sub^3 sample points inside one grid cell, centered on the point.
fn subcell_stencil(layout: &Layout, n_sub: usize) -> Vec<Vector3f64> {
    if n_sub == 1 {
        return vec![Vector3f64::zeros()];
    }

    let cell = layout.grid().cell().clone();
    let [n1, n2, n3] = layout.grid().size();

    let mut stencil = Vec::with_capacity(n_sub * n_sub * n_sub);

    for i in 0..n_sub {
        for j in 0..n_sub {
            for k in 0..n_sub {
                let frac = Vector3f64::new(
                    ((i as f64 + 0.5) / n_sub as f64 - 0.5) / n1 as f64,
                    ((j as f64 + 0.5) / n_sub as f64 - 0.5) / n2 as f64,
                    ((k as f64 + 0.5) / n_sub as f64 - 0.5) / n3 as f64,
                );

                stencil.push(cell.frac_to_cart(frac));
            }
        }
    }

    stencil
}

/// All atoms collapsed into uniform-size padded blocks.
pub struct ProjectorAll {
    projectors: Vec<Projector>,
    max_nlm: usize,
    max_points: usize,
}

impl ProjectorAll {
    pub fn new(projectors: Vec<Projector>) -> ProjectorAll {
        let max_nlm = projectors.iter().map(|p| p.nlm).max().unwrap_or(0);
        let max_points = projectors.iter().map(|p| p.sphere.len()).max().unwrap_or(0);

        ProjectorAll {
            projectors,
            max_nlm,
            max_points,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.projectors.is_empty() || self.max_nlm == 0
    }

    pub fn len(&self) -> usize {
        self.projectors.len()
    }

    pub fn max_nlm(&self) -> usize {
        self.max_nlm
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projector> {
        self.projectors.iter()
    }

    /// V_NL phi accumulated over every atom.
    pub fn apply(&self, phi: &OrbitalSet, vnl_acc: &mut OrbitalSet) {
        for p in &self.projectors {
            p.apply(phi, vnl_acc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid::RealGrid;
    use lattice::Cell;
    use pspot::{ProjectorChannel, RadialTable, Species};

    fn test_species() -> Species {
        let radial = RadialTable::from_fn(0.05, 61, |r| (-r * r).exp());

        Species::local_erf("X", 1.0, 1.0, 0.5).with_projectors(vec![
            ProjectorChannel {
                l: 0,
                kb_energy: 2.0,
                radial: radial.clone(),
            },
            ProjectorChannel {
                l: 1,
                kb_energy: -1.0,
                radial,
            },
        ])
    }

    fn layout() -> Layout {
        let cell = Cell::cubic(8.0, 3).unwrap();
        Layout::serial(&RealGrid::with_sizes(&cell, [16, 16, 16]))
    }

    #[test]
    fn test_sphere_size_and_center() {
        let lay = layout();
        let sphere = SphericalGrid::new(&lay, Vector3f64::zeros(), 1.0);

        // all displacements within the radius, origin included
        assert!(!sphere.is_empty());
        assert!(sphere.rel().iter().all(|d| d.norm2() <= 1.0 + 1E-12));

        // sphere volume ~ (4/3) pi / dV points
        let dv = lay.grid().volume_element();
        let expect = FOURPI / 3.0 / dv;
        let count = sphere.len() as f64;

        assert!((count - expect).abs() / expect < 0.2, "count = {count}");
    }

    #[test]
    fn test_sphere_wraps_periodic_images() {
        let lay = layout();

        // a center near the cell corner picks up points across the boundary
        let sphere = SphericalGrid::new(&lay, Vector3f64::new(3.9, 0.0, 0.0), 1.0);
        let plain = SphericalGrid::new(&lay, Vector3f64::zeros(), 1.0);

        assert_eq!(sphere.len(), plain.len());
    }

    #[test]
    fn test_projector_m_count() {
        let lay = layout();
        let sp = test_species();

        let p = Projector::new(&lay, &sp, Vector3f64::zeros(), 0);

        // l = 0 contributes 1, l = 1 contributes 3
        assert_eq!(p.num_projectors(), 4);
        assert_eq!(p.kb_coefficients(), &[2.0, -1.0, -1.0, -1.0]);
    }

    #[test]
    fn test_apply_is_hermitian() {
        let lay = layout();
        let sp = test_species();

        let p = Projector::new(&lay, &sp, Vector3f64::new(0.25, -0.1, 0.4), 0);

        let mut phi = OrbitalSet::new(&lay, 2, Vector3f64::zeros(), 0);
        phi.randomize();
        operations::orthonormalize(&mut phi).unwrap();

        let mut vphi = phi.skeleton();
        p.apply(&phi, &mut vphi);

        let m = operations::overlap(&phi, &vphi).unwrap();

        // <phi_i|V|phi_j> must be Hermitian
        for i in 0..2 {
            for j in 0..2 {
                let d = m[[i, j]] - m[[j, i]].conj();
                assert!(d.norm() < 1E-10);
            }
        }
    }

    #[test]
    fn test_batched_padding_bounds() {
        let lay = layout();
        let sp = test_species();

        let pa = ProjectorAll::new(vec![
            Projector::new(&lay, &sp, Vector3f64::zeros(), 0),
            Projector::new(&lay, &sp, Vector3f64::new(2.0, 2.0, 2.0), 1),
        ]);

        assert_eq!(pa.len(), 2);
        assert_eq!(pa.max_nlm(), 4);
        assert!(pa.iter().all(|p| p.sphere().len() <= pa.max_points()));
    }

    #[test]
    fn test_double_grid_matches_point_sampling_for_smooth_radial() {
        // a slowly varying radial profile: sub-sampling changes nothing
        let lay = layout();
        let sp = test_species();

        let plain = Projector::new(&lay, &sp, Vector3f64::zeros(), 0);
        let fine = Projector::with_subsampling(&lay, &sp, Vector3f64::zeros(), 0, 2);

        assert_eq!(plain.num_projectors(), fine.num_projectors());
        assert_eq!(plain.sphere().len(), fine.sphere().len());

        let mut phi = OrbitalSet::new(&lay, 1, Vector3f64::zeros(), 0);
        phi.randomize();

        let c_plain = plain.project(&phi);
        let c_fine = fine.project(&phi);

        for ilm in 0..plain.num_projectors() {
            let a = c_plain[[ilm, 0]];
            let b = c_fine[[ilm, 0]];

            assert!((a - b).norm() < 0.05 * a.norm().max(1E-3), "{a} vs {b}");
        }
    }
}
