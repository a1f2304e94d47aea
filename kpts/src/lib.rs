use lattice::Cell;
use utility::fft_freq_index;
use vector3::Vector3f64;

/// Uniform Gamma-centered Brillouin-zone mesh with equal weights.
#[derive(Debug, Clone)]
pub struct KMesh {
    k_frac: Vec<Vector3f64>,
    k_weight: Vec<f64>,
    k_mesh: [usize; 3],
}

impl KMesh {
    pub fn gamma() -> KMesh {
        KMesh::uniform([1, 1, 1])
    }

    pub fn uniform(k_mesh: [usize; 3]) -> KMesh {
        let nk = k_mesh[0] * k_mesh[1] * k_mesh[2];
        assert!(nk > 0, "empty k-point mesh");

        let mut k_frac = Vec::with_capacity(nk);

        for i3 in 0..k_mesh[2] {
            for i2 in 0..k_mesh[1] {
                for i1 in 0..k_mesh[0] {
                    // fold to (-1/2, 1/2]
                    k_frac.push(Vector3f64::new(
                        fft_freq_index(i1, k_mesh[0]) as f64 / k_mesh[0] as f64,
                        fft_freq_index(i2, k_mesh[1]) as f64 / k_mesh[1] as f64,
                        fft_freq_index(i3, k_mesh[2]) as f64 / k_mesh[2] as f64,
                    ));
                }
            }
        }

        let k_weight = vec![1.0 / nk as f64; nk];

        KMesh {
            k_frac,
            k_weight,
            k_mesh,
        }
    }

    pub fn len(&self) -> usize {
        self.k_frac.len()
    }

    pub fn is_empty(&self) -> bool {
        self.k_frac.is_empty()
    }

    pub fn mesh(&self) -> [usize; 3] {
        self.k_mesh
    }

    pub fn frac(&self, ik: usize) -> Vector3f64 {
        self.k_frac[ik]
    }

    pub fn weight(&self, ik: usize) -> f64 {
        self.k_weight[ik]
    }

    pub fn weights(&self) -> &[f64] {
        &self.k_weight
    }

    /// Crystal momentum in cartesian coordinates.
    pub fn cart(&self, ik: usize, cell: &Cell) -> Vector3f64 {
        let blatt = cell.reciprocal();
        let s = self.k_frac[ik];

        blatt.get_vector_a() * s.x + blatt.get_vector_b() * s.y + blatt.get_vector_c() * s.z
    }
}
