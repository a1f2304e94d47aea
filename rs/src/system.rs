//! Cell and ion-list persistence for the command surface, plus the built-in
//! analytic species table the runs use in place of a pseudopotential parser.

use ions::Ions;
use lattice::Cell;
use pspot::{Species, SpeciesSet};
use std::fs;
use std::path::Path;
use types::Error;
use vector3::Vector3f64;

pub const SYSTEM_DIR: &str = "system";

pub fn save_cell_cubic(dir: &Path, l: f64, periodicity: usize) -> Result<(), Error> {
    // validate before persisting
    Cell::cubic(l, periodicity)?;

    save_cell_lattice_unchecked(
        dir,
        &[l, 0.0, 0.0, 0.0, l, 0.0, 0.0, 0.0, l],
        periodicity,
    )
}

pub fn save_cell_lattice(dir: &Path, v: &[f64; 9], periodicity: usize) -> Result<(), Error> {
    Cell::new(&v[0..3], &v[3..6], &v[6..9], periodicity)?;

    save_cell_lattice_unchecked(dir, v, periodicity)
}

fn save_cell_lattice_unchecked(dir: &Path, v: &[f64; 9], periodicity: usize) -> Result<(), Error> {
    fs::create_dir_all(dir)
        .map_err(|e| Error::IoFailure(format!("cannot create '{}': {e}", dir.display())))?;

    let mut text = String::new();

    for row in v.chunks(3) {
        text.push_str(&format!("{:.16E} {:.16E} {:.16E}\n", row[0], row[1], row[2]));
    }

    text.push_str(&format!("{periodicity}\n"));

    fs::write(dir.join("cell"), text)
        .map_err(|e| Error::IoFailure(format!("cannot save cell: {e}")))
}

pub fn append_ion(dir: &Path, symbol: &str, position: [f64; 3]) -> Result<(), Error> {
    builtin_species(symbol)?; // reject unknown species at input time

    fs::create_dir_all(dir)
        .map_err(|e| Error::IoFailure(format!("cannot create '{}': {e}", dir.display())))?;

    let line = format!(
        "{symbol} {:.16E} {:.16E} {:.16E}\n",
        position[0], position[1], position[2]
    );

    let path = dir.join("ions");
    let mut existing = match fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(Error::IoFailure(format!("cannot read ion list: {e}"))),
    };

    existing.push_str(&line);

    fs::write(&path, existing).map_err(|e| Error::IoFailure(format!("cannot save ion list: {e}")))
}

pub fn clear_ions(dir: &Path) -> Result<(), Error> {
    let path = dir.join("ions");

    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::IoFailure(format!("cannot clear ion list: {e}"))),
    }
}

pub fn load_system(dir: &Path) -> Result<(Ions, SpeciesSet), Error> {
    let cell_text = fs::read_to_string(dir.join("cell")).map_err(|_| {
        Error::BadConfiguration("no cell defined; run 'rs cell ...' first".to_string())
    })?;

    let mut numbers = Vec::new();

    for line in cell_text.lines().take(3) {
        for tok in line.split_whitespace() {
            numbers.push(tok.parse::<f64>().map_err(|_| {
                Error::IoFailure(format!("malformed cell file entry '{tok}'"))
            })?);
        }
    }

    if numbers.len() != 9 {
        return Err(Error::IoFailure("malformed cell file".to_string()));
    }

    let periodicity = cell_text
        .lines()
        .nth(3)
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(3);

    let cell = Cell::new(&numbers[0..3], &numbers[3..6], &numbers[6..9], periodicity)?;

    let mut ions = Ions::new(cell);
    let mut species = SpeciesSet::new();

    match fs::read_to_string(dir.join("ions")) {
        Ok(text) => {
            for line in text.lines() {
                let tok: Vec<&str> = line.split_whitespace().collect();

                if tok.len() != 4 {
                    return Err(Error::IoFailure(format!("malformed ion line '{line}'")));
                }

                let symbol = tok[0];
                let pos: Vec<f64> = tok[1..]
                    .iter()
                    .map(|t| {
                        t.parse::<f64>().map_err(|_| {
                            Error::IoFailure(format!("malformed ion coordinate '{t}'"))
                        })
                    })
                    .collect::<Result<_, _>>()?;

                let sp = builtin_species(symbol)?;
                let mass = sp.mass();

                if !species.contains(symbol) {
                    species.insert(sp);
                }

                ions.insert(symbol, mass, Vector3f64::new(pos[0], pos[1], pos[2]));
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::IoFailure(format!("cannot read ion list: {e}"))),
    }

    Ok((ions, species))
}

/// Built-in erf-screened local species for the light elements. The radial
/// pseudopotential library is an external collaborator; its parsed tables
/// would enter through `Species::from_tables` instead.
pub fn builtin_species(symbol: &str) -> Result<Species, Error> {
    let table: &[(&str, f64, f64, f64)] = &[
        ("H", 1.0, 1.008, 0.50),
        ("He", 2.0, 4.0026, 0.60),
        ("Li", 1.0, 6.94, 0.70),
        ("Be", 2.0, 9.0122, 0.65),
        ("B", 3.0, 10.81, 0.60),
        ("C", 4.0, 12.011, 0.55),
        ("N", 5.0, 14.007, 0.55),
        ("O", 6.0, 15.999, 0.55),
        ("F", 7.0, 18.998, 0.55),
        ("Ne", 8.0, 20.180, 0.60),
        ("Na", 1.0, 22.990, 0.80),
        ("Mg", 2.0, 24.305, 0.75),
        ("Al", 3.0, 26.982, 0.70),
        ("Si", 4.0, 28.085, 0.65),
        ("P", 5.0, 30.974, 0.60),
        ("S", 6.0, 32.06, 0.60),
        ("Cl", 7.0, 35.45, 0.60),
        ("Ar", 8.0, 39.948, 0.60),
    ];

    for &(sym, zval, mass, sigma) in table {
        if sym == symbol {
            return Ok(Species::local_erf(sym, zval, mass, sigma));
        }
    }

    Err(Error::BadConfiguration(format!(
        "no built-in species for symbol '{symbol}'"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path();

        save_cell_cubic(path, 15.0, 0).unwrap();
        append_ion(path, "Ne", [0.0, 0.0, 0.0]).unwrap();

        let (ions, species) = load_system(path).unwrap();

        assert_eq!(ions.len(), 1);
        assert_eq!(ions.cell().periodic_dimensions(), 0);
        assert!((ions.num_electrons(&species).unwrap() - 8.0).abs() < 1E-12);

        clear_ions(path).unwrap();
        let (ions, _) = load_system(path).unwrap();
        assert!(ions.is_empty());
    }

    #[test]
    fn test_unknown_species_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let res = append_ion(dir.path(), "Uuo", [0.0, 0.0, 0.0]);

        assert!(matches!(res, Err(Error::BadConfiguration(_))));
    }

    #[test]
    fn test_missing_cell_is_user_error() {
        let dir = tempfile::tempdir().unwrap();

        let res = load_system(dir.path());

        assert!(matches!(res, Err(Error::BadConfiguration(_))));
    }
}
