//! Parsing Options.
//! `pnsim run -m model.json ...` 运行仿真；`pnsim mrna -i input.json -o model.json` 生成翻译模型。

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use std::error::Error;
use std::path::PathBuf;

use crate::config::RunConfig;
use crate::sim::{FiringPolicy, SnapshotPolicy};

fn make_options_parser() -> clap::Command {
    let run = Command::new("run")
        .about("Simulate a model file")
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .value_name("FILE")
                .help("Model definition (.json, .ron, .yaml)")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Run configuration in TOML; defaults are used if the file is missing")
                .default_value("pnsim.toml")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("samples")
                .short('o')
                .long("samples")
                .value_name("FILE")
                .help("Write the sampled trajectory of the first replicate as CSV")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("events")
                .short('e')
                .long("events")
                .value_name("FILE")
                .help("Write the event log of the first replicate as CSV")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("report")
                .short('r')
                .long("report")
                .value_name("FILE")
                .help("Path to file where the run report will be stored")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("replicates")
                .short('n')
                .long("replicates")
                .value_parser(value_parser!(usize)),
        )
        .arg(Arg::new("seed").long("seed").value_parser(value_parser!(u64)))
        .arg(
            Arg::new("horizon")
                .long("horizon")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("max-events")
                .long("max-events")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .help("Sample on a fixed time grid instead of after every event")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("policy")
                .short('p')
                .long("policy")
                .value_parser(["gillespie", "timed", "uniform_step"]),
        );

    let mrna = Command::new("mrna")
        .about("Generate a translation model from chain sequences")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .default_value("model.json")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("ribosomes")
                .long("ribosomes")
                .help("Gate initiation on a pool of free ribosomes")
                .action(ArgAction::SetTrue),
        );

    Command::new("pnsim")
        .no_binary_name(true)
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .subcommand(run)
        .subcommand(mrna)
}

/// Command-line overrides on top of the TOML run configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    pub model: PathBuf,
    pub config: PathBuf,
    pub samples: Option<PathBuf>,
    pub events: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub replicates: Option<usize>,
    pub seed: Option<u64>,
    pub horizon: Option<f64>,
    pub max_events: Option<usize>,
    pub interval: Option<f64>,
    pub policy: Option<FiringPolicy>,
}

impl RunOptions {
    fn from_matches(matches: &ArgMatches) -> Result<Self, Box<dyn Error>> {
        let policy = match matches.get_one::<String>("policy") {
            Some(name) => Some(name.parse::<FiringPolicy>()?),
            None => None,
        };
        Ok(RunOptions {
            model: matches
                .get_one::<PathBuf>("model")
                .cloned()
                .ok_or("missing --model")?,
            config: matches
                .get_one::<PathBuf>("config")
                .cloned()
                .unwrap_or_default(),
            samples: matches.get_one::<PathBuf>("samples").cloned(),
            events: matches.get_one::<PathBuf>("events").cloned(),
            report: matches.get_one::<PathBuf>("report").cloned(),
            replicates: matches.get_one::<usize>("replicates").copied(),
            seed: matches.get_one::<u64>("seed").copied(),
            horizon: matches.get_one::<f64>("horizon").copied(),
            max_events: matches.get_one::<usize>("max-events").copied(),
            interval: matches.get_one::<f64>("interval").copied(),
            policy,
        })
    }

    /// Flags given on the command line win over the file.
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(replicates) = self.replicates {
            config.replicates = replicates;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(horizon) = self.horizon {
            config.horizon = Some(horizon);
        }
        if let Some(max_events) = self.max_events {
            config.max_events = max_events;
        }
        if let Some(interval) = self.interval {
            config.snapshot = SnapshotPolicy::Interval { interval };
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MrnaOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub ribosomes: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Options {
    Run(RunOptions),
    Mrna(MrnaOptions),
}

impl Options {
    pub fn parse_from_args(flags: &[String]) -> Result<Self, Box<dyn Error>> {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags.iter())?;
        match matches.subcommand() {
            Some(("run", sub)) => Ok(Options::Run(RunOptions::from_matches(sub)?)),
            Some(("mrna", sub)) => Ok(Options::Mrna(MrnaOptions {
                input: sub
                    .get_one::<PathBuf>("input")
                    .cloned()
                    .ok_or("missing --input")?,
                output: sub
                    .get_one::<PathBuf>("output")
                    .cloned()
                    .unwrap_or_default(),
                ribosomes: sub.get_flag("ribosomes"),
            })),
            _ => Err("UnsupportedSubcommand".into()),
        }
    }
}
