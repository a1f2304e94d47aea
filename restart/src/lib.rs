//! Binary restart directories.
//!
//! Layout: a header with the grid dimensions, the cell vectors in atomic
//! units, the spin-component count, the k-point count, the state count and a
//! precision code; then the payload in canonical
//! (spin, k, state, ix, iy, iz) ordering, ix fastest, little-endian. A
//! companion `result` directory holds the energy record and scalar metrics
//! as plain text with 17 significant digits.
//!
//! Writes happen on the root rank; every rank agrees on the outcome through
//! a collective error check before anyone unwinds.

use density::SpinDensity;
use energy::Energy;
use fields::OrbitalSet;
use gwmpi::Comm;
use lattice::Cell;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use types::{c64, Error};
use vector3::Vector3f64;

pub const PRECISION_F32: u32 = 0;
pub const PRECISION_F64: u32 = 1;
pub const PRECISION_C64: u32 = 2;
pub const PRECISION_C128: u32 = 3;

struct Header {
    dims: [u32; 3],
    cell: [f64; 9],
    spin_components: u32,
    num_kpoints: u32,
    num_states: u32,
    precision: u32,
}

impl Header {
    fn write(&self, out: &mut impl Write) -> std::io::Result<()> {
        for d in self.dims {
            out.write_all(&d.to_le_bytes())?;
        }

        for c in self.cell {
            out.write_all(&c.to_le_bytes())?;
        }

        out.write_all(&self.spin_components.to_le_bytes())?;
        out.write_all(&self.num_kpoints.to_le_bytes())?;
        out.write_all(&self.num_states.to_le_bytes())?;
        out.write_all(&self.precision.to_le_bytes())?;

        Ok(())
    }

    fn read(inp: &mut impl Read) -> std::io::Result<Header> {
        let mut u = [0u8; 4];
        let mut f = [0u8; 8];

        let mut dims = [0u32; 3];
        for d in dims.iter_mut() {
            inp.read_exact(&mut u)?;
            *d = u32::from_le_bytes(u);
        }

        let mut cell = [0.0f64; 9];
        for c in cell.iter_mut() {
            inp.read_exact(&mut f)?;
            *c = f64::from_le_bytes(f);
        }

        inp.read_exact(&mut u)?;
        let spin_components = u32::from_le_bytes(u);
        inp.read_exact(&mut u)?;
        let num_kpoints = u32::from_le_bytes(u);
        inp.read_exact(&mut u)?;
        let num_states = u32::from_le_bytes(u);
        inp.read_exact(&mut u)?;
        let precision = u32::from_le_bytes(u);

        Ok(Header {
            dims,
            cell,
            spin_components,
            num_kpoints,
            num_states,
            precision,
        })
    }
}

fn cell_vectors(cell: &Cell) -> [f64; 9] {
    let a = cell.latt().get_vector_a();
    let b = cell.latt().get_vector_b();
    let c = cell.latt().get_vector_c();

    [a.x, a.y, a.z, b.x, b.y, b.z, c.x, c.y, c.z]
}

/// Save the orbital lot to `dir/orbitals`. Serial-domain layout only: the
/// payload is the canonical global ordering.
pub fn save_orbitals(
    comm: &Comm,
    dir: &Path,
    lots: &[OrbitalSet],
    spin_channels: usize,
    num_kpoints: usize,
) -> Result<(), Error> {
    let local = save_orbitals_local(dir, lots, spin_channels, num_kpoints);

    gwmpi::collective_error_check(comm, local)
}

fn save_orbitals_local(
    dir: &Path,
    lots: &[OrbitalSet],
    spin_channels: usize,
    num_kpoints: usize,
) -> Result<(), Error> {
    assert_eq!(lots.len(), spin_channels * num_kpoints);

    let layout = lots[0].layout();
    let [n1, n2, n3] = layout.grid().size();

    fs::create_dir_all(dir)
        .map_err(|e| Error::IoFailure(format!("cannot create '{}': {e}", dir.display())))?;

    let path = dir.join("orbitals");
    let file = fs::File::create(&path)
        .map_err(|e| Error::IoFailure(format!("cannot create '{}': {e}", path.display())))?;
    let mut out = std::io::BufWriter::new(file);

    let header = Header {
        dims: [n1 as u32, n2 as u32, n3 as u32],
        cell: cell_vectors(layout.grid().cell()),
        spin_components: spin_channels as u32,
        num_kpoints: num_kpoints as u32,
        num_states: lots[0].num_states() as u32,
        precision: PRECISION_C128,
    };

    let io_err =
        |e: std::io::Error| Error::IoFailure(format!("write to '{}': {e}", path.display()));

    header.write(&mut out).map_err(io_err)?;

    for phi in lots {
        for ist in 0..phi.num_states() {
            for z in phi.state(ist) {
                out.write_all(&z.re.to_le_bytes()).map_err(io_err)?;
                out.write_all(&z.im.to_le_bytes()).map_err(io_err)?;
            }
        }
    }

    out.flush().map_err(io_err)
}

/// Load orbitals saved by `save_orbitals` into a matching lot.
pub fn load_orbitals(
    comm: &Comm,
    dir: &Path,
    lots: &mut [OrbitalSet],
) -> Result<(), Error> {
    let local = load_orbitals_local(dir, lots);

    gwmpi::collective_error_check(comm, local)
}

fn load_orbitals_local(dir: &Path, lots: &mut [OrbitalSet]) -> Result<(), Error> {
    let path = dir.join("orbitals");
    let file = fs::File::open(&path)
        .map_err(|e| Error::IoFailure(format!("cannot open '{}': {e}", path.display())))?;
    let mut inp = std::io::BufReader::new(file);

    let io_err =
        |e: std::io::Error| Error::IoFailure(format!("read from '{}': {e}", path.display()));

    let header = Header::read(&mut inp).map_err(io_err)?;

    let layout = lots[0].layout().clone();
    let [n1, n2, n3] = layout.grid().size();

    if header.dims != [n1 as u32, n2 as u32, n3 as u32]
        || header.num_states != lots[0].num_states() as u32
        || header.spin_components as usize * header.num_kpoints as usize != lots.len()
    {
        return Err(Error::ShapeMismatch(format!(
            "restart file '{}' was written for {}x{}x{} / {} states",
            path.display(),
            header.dims[0],
            header.dims[1],
            header.dims[2],
            header.num_states
        )));
    }

    if header.precision != PRECISION_C128 {
        return Err(Error::IoFailure(format!(
            "restart precision code {} is not complex double",
            header.precision
        )));
    }

    let mut f = [0u8; 8];

    for phi in lots.iter_mut() {
        for ist in 0..phi.num_states() {
            for z in phi.state_mut(ist).iter_mut() {
                inp.read_exact(&mut f).map_err(io_err)?;
                let re = f64::from_le_bytes(f);
                inp.read_exact(&mut f).map_err(io_err)?;
                let im = f64::from_le_bytes(f);

                *z = c64 { re, im };
            }
        }
    }

    Ok(())
}

/// Save the density channels to `dir/density` with the same header layout
/// (state count = channel count).
pub fn save_density(comm: &Comm, dir: &Path, rho: &SpinDensity) -> Result<(), Error> {
    let local = save_density_local(dir, rho);

    gwmpi::collective_error_check(comm, local)
}

fn save_density_local(dir: &Path, rho: &SpinDensity) -> Result<(), Error> {
    let layout = rho.layout().clone();
    let [n1, n2, n3] = layout.grid().size();

    fs::create_dir_all(dir)
        .map_err(|e| Error::IoFailure(format!("cannot create '{}': {e}", dir.display())))?;

    let path = dir.join("density");
    let file = fs::File::create(&path)
        .map_err(|e| Error::IoFailure(format!("cannot create '{}': {e}", path.display())))?;
    let mut out = std::io::BufWriter::new(file);

    let io_err =
        |e: std::io::Error| Error::IoFailure(format!("write to '{}': {e}", path.display()));

    let header = Header {
        dims: [n1 as u32, n2 as u32, n3 as u32],
        cell: cell_vectors(layout.grid().cell()),
        spin_components: rho.components() as u32,
        num_kpoints: 1,
        num_states: rho.components() as u32,
        precision: PRECISION_F64,
    };

    header.write(&mut out).map_err(io_err)?;

    for i in 0..rho.components() {
        for v in rho.channel(i).as_slice() {
            out.write_all(&v.to_le_bytes()).map_err(io_err)?;
        }
    }

    out.flush().map_err(io_err)
}

pub fn load_density(comm: &Comm, dir: &Path, rho: &mut SpinDensity) -> Result<(), Error> {
    let local = load_density_local(dir, rho);

    gwmpi::collective_error_check(comm, local)
}

fn load_density_local(dir: &Path, rho: &mut SpinDensity) -> Result<(), Error> {
    let path = dir.join("density");
    let file = fs::File::open(&path)
        .map_err(|e| Error::IoFailure(format!("cannot open '{}': {e}", path.display())))?;
    let mut inp = std::io::BufReader::new(file);

    let io_err =
        |e: std::io::Error| Error::IoFailure(format!("read from '{}': {e}", path.display()));

    let header = Header::read(&mut inp).map_err(io_err)?;

    if header.spin_components != rho.components() as u32 {
        return Err(Error::ShapeMismatch(format!(
            "density restart holds {} components, expected {}",
            header.spin_components,
            rho.components()
        )));
    }

    let mut f = [0u8; 8];

    for i in 0..rho.components() {
        for v in rho.channel_mut(i).as_mut_slice() {
            inp.read_exact(&mut f).map_err(io_err)?;
            *v = f64::from_le_bytes(f);
        }
    }

    Ok(())
}

/// The scalar outcome of a run: energies, iteration count, magnetization.
pub struct ResultRecord {
    pub energy: Energy,
    pub iterations: usize,
    pub converged: bool,
    pub magnetization: Vector3f64,
}

pub fn save_result(comm: &Comm, dir: &Path, record: &ResultRecord) -> Result<(), Error> {
    let local = save_result_local(dir, record);

    gwmpi::collective_error_check(comm, local)
}

fn save_result_local(dir: &Path, record: &ResultRecord) -> Result<(), Error> {
    let rdir = dir.join("result");

    fs::create_dir_all(&rdir)
        .map_err(|e| Error::IoFailure(format!("cannot create '{}': {e}", rdir.display())))?;

    let write = |name: &str, value: String| -> Result<(), Error> {
        fs::write(rdir.join(name), format!("{value}\n"))
            .map_err(|e| Error::IoFailure(format!("cannot save result '{name}': {e}")))
    };

    for name in [
        "total",
        "kinetic",
        "eigenvalues",
        "hartree",
        "external",
        "non-local",
        "xc",
        "nvxc",
        "exact-exchange",
        "ion",
    ] {
        let v = record.energy.field(name).unwrap();
        write(&format!("energy_{name}"), format!("{v:.16E}"))?;
    }

    write("iterations", record.iterations.to_string())?;
    write(
        "converged",
        if record.converged { "true" } else { "false" }.to_string(),
    )?;
    write(
        "magnetization",
        format!(
            "{:.16E} {:.16E} {:.16E}",
            record.magnetization.x, record.magnetization.y, record.magnetization.z
        ),
    )?;

    Ok(())
}

pub fn load_result_value(dir: &Path, name: &str) -> Result<String, Error> {
    let path = dir.join("result").join(name);

    fs::read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| Error::IoFailure(format!("cannot read '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fields::Layout;
    use grid::RealGrid;
    use vector3::Vector3f64;

    fn layout() -> Layout {
        let cell = Cell::cubic(5.0, 3).unwrap();
        Layout::serial(&RealGrid::with_sizes(&cell, [4, 4, 4]))
    }

    #[test]
    fn test_orbitals_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let comm = Comm::serial();
        let lay = layout();

        let mut phi = OrbitalSet::new(&lay, 3, Vector3f64::zeros(), 0);
        phi.randomize();

        let lots = vec![phi];

        save_orbitals(&comm, dir.path(), &lots, 1, 1).unwrap();

        let mut loaded = vec![lots[0].skeleton()];
        load_orbitals(&comm, dir.path(), &mut loaded).unwrap();

        for j in 0..3 {
            assert_eq!(lots[0].state(j), loaded[0].state(j));
        }
    }

    #[test]
    fn test_orbitals_shape_check() {
        let dir = tempfile::tempdir().unwrap();
        let comm = Comm::serial();
        let lay = layout();

        let phi = OrbitalSet::new(&lay, 3, Vector3f64::zeros(), 0);
        save_orbitals(&comm, dir.path(), &[phi], 1, 1).unwrap();

        let mut wrong = vec![OrbitalSet::new(&lay, 4, Vector3f64::zeros(), 0)];
        let res = load_orbitals(&comm, dir.path(), &mut wrong);

        assert!(matches!(res, Err(Error::ShapeMismatch(_))));
    }

    #[test]
    fn test_density_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let comm = Comm::serial();
        let lay = layout();

        let mut rho = SpinDensity::new(&lay, 2).unwrap();
        rho.channel_mut(0).set_value(0.25);
        rho.channel_mut(1).set_value(0.5);

        save_density(&comm, dir.path(), &rho).unwrap();

        let mut loaded = SpinDensity::new(&lay, 2).unwrap();
        load_density(&comm, dir.path(), &mut loaded).unwrap();

        assert_eq!(rho.channel(1).as_slice(), loaded.channel(1).as_slice());
    }

    #[test]
    fn test_result_record() {
        let dir = tempfile::tempdir().unwrap();
        let comm = Comm::serial();

        let mut energy = Energy::new();
        energy.kinetic = 35.7656102196;
        energy.ion = 0.0;

        let record = ResultRecord {
            energy,
            iterations: 17,
            converged: true,
            magnetization: Vector3f64::zeros(),
        };

        save_result(&comm, dir.path(), &record).unwrap();

        let kin = load_result_value(dir.path(), "energy_kinetic").unwrap();
        assert!(kin.starts_with("3.57656102196"));

        let iters = load_result_value(dir.path(), "iterations").unwrap();
        assert_eq!(iters, "17");

        // missing file is an io failure
        assert!(load_result_value(dir.path(), "energy_bogus").is_err());
    }

    #[test]
    fn test_missing_restart_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        let comm = Comm::serial();
        let lay = layout();

        let mut lots = vec![OrbitalSet::new(&lay, 2, Vector3f64::zeros(), 0)];
        let res = load_orbitals(&comm, dir.path(), &mut lots);

        assert!(matches!(res, Err(Error::IoFailure(_))));
    }
}
