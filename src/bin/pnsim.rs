use anyhow::{Context, Result};
use log::{debug, info};

use mrna_pnet::config::RunConfig;
use mrna_pnet::model::ModelDefinition;
use mrna_pnet::model::mrna::MrnaInput;
use mrna_pnet::net::io;
use mrna_pnet::options::{MrnaOptions, Options, RunOptions};
use mrna_pnet::report::SimulationReport;
use mrna_pnet::sim::{Simulation, derive_seeds};

fn main() {
    if std::env::var("PN_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PN_LOG")
            .write_style("PN_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match Options::parse_from_args(&args) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };
    debug!("pnsim options: {:?}", options);

    let result = match &options {
        Options::Run(run) => run_simulation(run),
        Options::Mrna(mrna) => generate_mrna_model(mrna),
    };
    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run_simulation(options: &RunOptions) -> Result<()> {
    let mut config = RunConfig::load_from_file(&options.config)?;
    options.apply(&mut config);
    config.validate()?;

    let net = ModelDefinition::load_net(&options.model)
        .with_context(|| format!("Failed to load model: {:?}", options.model))?;
    info!(
        "loaded {:?}: {} places, {} transitions",
        options.model,
        net.places_len(),
        net.transitions_len()
    );

    let sim = Simulation::new(&net)?;
    let initial = net.initial_marking();
    let outcomes = if config.replicates == 1 {
        vec![sim.run(&initial, &config)?]
    } else {
        let seeds = derive_seeds(config.seed, config.replicates);
        sim.replicate(&initial, &config, &seeds)?
    };

    if let Some(first) = outcomes.first() {
        info!(
            "first run stopped with {:?} after {} events at t={}",
            first.stop, first.events, first.final_time
        );
        if let Some(path) = &options.samples {
            first
                .trajectory
                .write_csv(path)
                .with_context(|| format!("Failed to write samples: {:?}", path))?;
        }
        if let Some(path) = &options.events {
            first
                .trajectory
                .write_events_csv(path)
                .with_context(|| format!("Failed to write events: {:?}", path))?;
        }
    }

    let report = SimulationReport::new(options.model.display().to_string(), &net, &config, &outcomes);
    match &options.report {
        Some(path) => report
            .save_to_file(path)
            .with_context(|| format!("Failed to write report: {:?}", path))?,
        None => println!("{report}"),
    }
    Ok(())
}

fn generate_mrna_model(options: &MrnaOptions) -> Result<()> {
    let input: MrnaInput = io::read(&options.input)
        .with_context(|| format!("Failed to read mRNA input: {:?}", options.input))?;
    let model = input.to_model(options.ribosomes)?;
    // fail early if the generated model does not build
    model.build()?;
    model
        .write(&options.output)
        .with_context(|| format!("Failed to write model: {:?}", options.output))?;
    info!(
        "wrote {:?}: {} places, {} transitions",
        options.output,
        model.places.len(),
        model.transitions.len()
    );
    Ok(())
}
