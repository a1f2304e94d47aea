//! Command surface of the engine.
//!
//! State lives in the working directory: option bundles under
//! `options_theory`, `options_electrons` and `options_real_time` (one value
//! per file), the cell and ion list under `system`, restart payloads and the
//! result record under `restart`. Numeric output is printed with 17
//! significant digits on the root rank only. Exit code 0 on success, 1 on
//! any user or runtime error.

mod system;
mod units;

use electrons::SpinScheme;
use gwmpi::{Environment, ProcessGrid};
use ions::{Fixed, Impulsive, IonPropagator, VelocityVerlet};
use options::{
    ElectronsOptions, Functional, IonDynamicsScheme, RealTimeOptions, TheoryOptions,
};
use perturbations::Perturbation;
use std::path::Path;
use types::Error;

const THEORY_DIR: &str = "options_theory";
const ELECTRONS_DIR: &str = "options_electrons";
const REAL_TIME_DIR: &str = "options_real_time";
const RESTART_DIR: &str = "restart";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let env = match Environment::init() {
        Ok(env) => env,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();

    match dispatch(&env, &args) {
        Ok(()) => {}
        Err(e) => {
            // one diagnostic line on the root rank; everyone exits together
            if env.world().is_root() {
                eprintln!("error: {e}");
            }

            std::process::exit(1);
        }
    }
}

fn dispatch(env: &Environment, args: &[String]) -> Result<(), Error> {
    let Some(command) = args.first() else {
        return Err(Error::BadConfiguration(
            "usage: rs {cell|ions|electrons|theory|run|result} ...".to_string(),
        ));
    };

    let rest = &args[1..];

    match command.as_str() {
        "cell" => command_cell(rest),
        "ions" => command_ions(rest),
        "electrons" => command_electrons(rest),
        "theory" => command_theory(rest),
        "run" => command_run(env, rest),
        "result" => command_result(env, rest),
        other => Err(Error::BadConfiguration(format!("unknown command '{other}'"))),
    }
}

fn command_cell(args: &[String]) -> Result<(), Error> {
    match args.first().map(String::as_str) {
        Some("cubic") => {
            let l_raw = parse_f64_arg(args.get(1), "cell cubic L")?;
            let mut idx = 2;

            let l = match args.get(idx).map(String::as_str) {
                Some(u) if units::is_length_unit(u) => {
                    idx += 1;
                    l_raw * units::length_to_bohr(u)?
                }
                _ => l_raw,
            };

            let periodicity = parse_periodicity(&args[idx.min(args.len())..])?;

            system::save_cell_cubic(Path::new(system::SYSTEM_DIR), l, periodicity)
        }

        Some("lattice") => {
            if args.len() < 10 {
                return Err(Error::BadConfiguration(
                    "cell lattice needs nine vector components".to_string(),
                ));
            }

            let mut v = [0.0; 9];
            for (i, x) in v.iter_mut().enumerate() {
                *x = parse_f64_arg(args.get(1 + i), "cell lattice component")?;
            }

            let mut idx = 10;
            if let Some(u) = args.get(idx).map(String::as_str) {
                if units::is_length_unit(u) {
                    let f = units::length_to_bohr(u)?;
                    v.iter_mut().for_each(|x| *x *= f);
                    idx += 1;
                }
            }

            let periodicity = parse_periodicity(&args[idx.min(args.len())..])?;

            system::save_cell_lattice(Path::new(system::SYSTEM_DIR), &v, periodicity)
        }

        _ => Err(Error::BadConfiguration(
            "usage: rs cell {cubic L [unit] | lattice a1 a2 a3 ...} [periodicity P]".to_string(),
        )),
    }
}

fn command_ions(args: &[String]) -> Result<(), Error> {
    match args.first().map(String::as_str) {
        Some("add") => {
            let symbol = args
                .get(1)
                .ok_or_else(|| Error::BadConfiguration("ions add needs a symbol".to_string()))?;

            let x = parse_f64_arg(args.get(2), "ion position")?;
            let y = parse_f64_arg(args.get(3), "ion position")?;
            let z = parse_f64_arg(args.get(4), "ion position")?;

            let factor = match args.get(5).map(String::as_str) {
                Some(u) => units::length_to_bohr(u)?,
                None => 1.0,
            };

            system::append_ion(
                Path::new(system::SYSTEM_DIR),
                symbol,
                [x * factor, y * factor, z * factor],
            )
        }

        Some("clear") => system::clear_ions(Path::new(system::SYSTEM_DIR)),

        _ => Err(Error::BadConfiguration(
            "usage: rs ions {add SYMBOL X Y Z [unit] | clear}".to_string(),
        )),
    }
}

fn command_electrons(args: &[String]) -> Result<(), Error> {
    let dir = Path::new(ELECTRONS_DIR);
    let mut opts = ElectronsOptions::load(dir)?;

    match args.first().map(String::as_str) {
        Some("cutoff") => {
            let v = parse_f64_arg(args.get(1), "cutoff")?;
            let f = match args.get(2).map(String::as_str) {
                Some(u) => units::energy_to_hartree(u)?,
                None => 1.0,
            };

            opts.cutoff = Some(v * f);
        }

        Some("spacing") => {
            let v = parse_f64_arg(args.get(1), "spacing")?;
            let f = match args.get(2).map(String::as_str) {
                Some(u) => units::length_to_bohr(u)?,
                None => 1.0,
            };

            opts.spacing = Some(v * f);
        }

        Some("extra_states") => {
            opts.extra_states = parse_usize_arg(args.get(1), "extra_states")?;
        }

        Some("extra_electrons") => {
            opts.extra_electrons = parse_f64_arg(args.get(1), "extra_electrons")?;
        }

        Some("temperature") => {
            let v = parse_f64_arg(args.get(1), "temperature")?;

            // stored in Kelvin; energy units convert through k_B
            opts.temperature = match args.get(2).map(String::as_str) {
                None | Some("k") | Some("kelvin") => v,
                Some(u) => v * units::energy_to_hartree(u)? / gwconsts::BOLTZMANN_CONSTANT,
            };
        }

        Some("spin") => {
            opts.spin = match args.get(1).map(String::as_str) {
                Some("unpolarized") => SpinScheme::Unpolarized,
                Some("polarized") => SpinScheme::Polarized,
                Some("non-collinear") => SpinScheme::NonCollinear,
                other => {
                    return Err(Error::BadConfiguration(format!(
                        "unknown spin scheme {other:?}"
                    )))
                }
            };
        }

        Some("kpoints") => {
            opts.kpoints = [
                parse_usize_arg(args.get(1), "kpoints")?,
                parse_usize_arg(args.get(2), "kpoints")?,
                parse_usize_arg(args.get(3), "kpoints")?,
            ];
        }

        _ => {
            return Err(Error::BadConfiguration(
                "usage: rs electrons {cutoff E [unit] | spacing L [unit] | extra_states N | \
                 extra_electrons N | temperature T [unit] | spin SCHEME | kpoints N1 N2 N3}"
                    .to_string(),
            ))
        }
    }

    opts.save(dir)
}

fn command_theory(args: &[String]) -> Result<(), Error> {
    let keyword = args.first().ok_or_else(|| {
        Error::BadConfiguration(
            "usage: rs theory {non-interacting|hartree|hartree-fock|lda|pbe|rpbe|pbe0|b3lyp}"
                .to_string(),
        )
    })?;

    let functional = Functional::from_keyword(keyword)?;

    let opts = TheoryOptions::load(Path::new(THEORY_DIR))
        .unwrap_or_default()
        .functional(functional);

    opts.save(Path::new(THEORY_DIR))
}

fn command_run(env: &Environment, args: &[String]) -> Result<(), Error> {
    let theory = TheoryOptions::load(Path::new(THEORY_DIR))?;
    let el_opts = ElectronsOptions::load(Path::new(ELECTRONS_DIR))?;

    let (ions, species) = system::load_system(Path::new(system::SYSTEM_DIR))?;

    let pgrid = ProcessGrid::new(env.world(), 1, env.world().size())?;

    match args.first().map(String::as_str) {
        Some("ground-state") => {
            let result = scf::run(&pgrid, &ions, &species, &theory, &el_opts)?;

            let record = restart::ResultRecord {
                energy: result.energy,
                iterations: result.iterations,
                converged: matches!(result.convergence, scf::Convergence::Converged { .. }),
                magnetization: result.magnetization,
            };

            restart::save_result(env.world(), Path::new(RESTART_DIR), &record)?;
            restart::save_density(env.world(), Path::new(RESTART_DIR), &result.density)?;
            restart::save_orbitals(
                env.world(),
                Path::new(RESTART_DIR),
                result.electrons.lots(),
                result.electrons.spin().spin_channels(),
                result.electrons.kmesh().len(),
            )?;

            if env.world().is_root() {
                println!("{}", result.energy);
            }

            Ok(())
        }

        Some("real-time") => {
            let rt_opts = RealTimeOptions::load(Path::new(REAL_TIME_DIR))?;

            // continue from the ground state when a restart exists,
            // otherwise converge one first
            let result = scf::run(&pgrid, &ions, &species, &theory, &el_opts)?;

            let mut ions = ions;
            let mut el = result.electrons;

            let propagator: Box<dyn IonPropagator> = match rt_opts.ion_dynamics {
                IonDynamicsScheme::Static => Box::new(Fixed),
                IonDynamicsScheme::Impulsive => Box::new(Impulsive),
                IonDynamicsScheme::Verlet => Box::new(VelocityVerlet),
            };

            let is_root = env.world().is_root();

            realtime::propagate(
                &mut ions,
                &mut el,
                &species,
                &theory,
                &rt_opts,
                &Perturbation::None,
                propagator.as_ref(),
                |data| {
                    if is_root {
                        println!(
                            "step {:9} :  t = {:9.3}  e = {:.12}",
                            data.iter(),
                            data.time(),
                            data.energy()
                        );
                    }
                },
            )?;

            Ok(())
        }

        _ => Err(Error::BadConfiguration(
            "usage: rs run {ground-state | real-time}".to_string(),
        )),
    }
}

fn command_result(env: &Environment, args: &[String]) -> Result<(), Error> {
    if !env.world().is_root() {
        return Ok(());
    }

    let dir = Path::new(RESTART_DIR);

    match args.first().map(String::as_str) {
        Some("energy") => {
            let field = args.get(1).map(String::as_str).unwrap_or("total");

            let value = restart::load_result_value(dir, &format!("energy_{field}"))?;
            println!("{value}");

            Ok(())
        }

        Some("iterations") => {
            let value = restart::load_result_value(dir, "iterations")?;
            println!("{value}");

            Ok(())
        }

        Some("magnetization") => {
            let value = restart::load_result_value(dir, "magnetization")?;
            let parts: Vec<&str> = value.split_whitespace().collect();

            match args.get(1).map(String::as_str) {
                None => println!("{value}"),
                Some("x") => println!("{}", parts[0]),
                Some("y") => println!("{}", parts[1]),
                Some("z") => println!("{}", parts[2]),
                Some(other) => {
                    return Err(Error::BadConfiguration(format!(
                        "unknown magnetization axis '{other}'"
                    )))
                }
            }

            Ok(())
        }

        _ => Err(Error::BadConfiguration(
            "usage: rs result {energy [field] | magnetization [axis] | iterations}".to_string(),
        )),
    }
}

fn parse_f64_arg(arg: Option<&String>, what: &str) -> Result<f64, Error> {
    arg.ok_or_else(|| Error::BadConfiguration(format!("missing value for {what}")))?
        .parse::<f64>()
        .map_err(|_| Error::BadConfiguration(format!("malformed value for {what}")))
}

fn parse_usize_arg(arg: Option<&String>, what: &str) -> Result<usize, Error> {
    arg.ok_or_else(|| Error::BadConfiguration(format!("missing value for {what}")))?
        .parse::<usize>()
        .map_err(|_| Error::BadConfiguration(format!("malformed value for {what}")))
}

/// Accepts a bare trailing number or the two-token `periodicity P` form;
/// absent means fully periodic.
fn parse_periodicity(args: &[String]) -> Result<usize, Error> {
    let token = match args.first().map(String::as_str) {
        None => return Ok(3),
        Some("periodicity") => args.get(1).map(String::as_str).ok_or_else(|| {
            Error::BadConfiguration("periodicity needs a value".to_string())
        })?,
        Some(s) => s,
    };

    token
        .parse::<usize>()
        .map_err(|_| Error::BadConfiguration(format!("malformed periodicity '{token}'")))
}
