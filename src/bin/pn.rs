use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use rayon::prelude::*;

use petri_engine::analysis::StateGraph;
use petri_engine::api::{self, FireRequest, KBoundedRequest, NetRequest};
use petri_engine::config::{EngineConfig, ExploreSettings};
use petri_engine::net::{Net, NetModel, io};
use petri_engine::options::{Limits, Options, PnCommand};
use petri_engine::report::AnalysisReport;
use petri_engine::simulation::Session;

fn main() -> Result<()> {
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
            eprintln!("{}", err);
            std::process::exit(2);
        }
    };
    log::debug!("PN options: {:?}", options);

    let config = EngineConfig::load_from_file(&options.config)?;
    match options.command {
        PnCommand::Enabled { net, marking } => {
            let response = api::enabled(&NetRequest {
                net: load_model(&net)?,
                marking,
            })?;
            for transition in response.enabled {
                println!("{}", transition);
            }
        }
        PnCommand::Fire {
            net,
            transition,
            marking,
            output,
        } => {
            let response = api::fire(&FireRequest {
                net: load_model(&net)?,
                transition_id: transition,
                marking,
            })?;
            println!("{}", io::to_json_string(&response.marking)?);
            if let Some(output) = output {
                io::write_model(&output, &response.net)?;
                log::info!("updated net written to {}", output.display());
            }
        }
        PnCommand::Explore {
            nets,
            limits,
            output,
        } => explore_all(&nets, &limits, output.as_deref(), &config.explore)?,
        PnCommand::Simulate { net, steps, seed } => {
            let mut session = Session::with_seed(load_model(&net)?, seed.or(config.simulation.seed))?;
            let summary = session.run(steps.unwrap_or(config.simulation.run_steps))?;
            for (i, entry) in session.history().entries().iter().enumerate() {
                let marking = session.net().marking_to_map(&entry.marking);
                println!(
                    "#{} {} {}",
                    i,
                    entry.fired.as_deref().unwrap_or("<initial>"),
                    io::to_json_string(&marking)?
                );
            }
            if summary.deadlocked {
                println!("deadlock after {} firings", summary.fired.len());
            }
        }
        PnCommand::Graph {
            net,
            marking,
            limits,
            output,
        } => {
            let model = load_model(&net)?;
            let compiled = Net::new(&model)?;
            let start = match marking {
                Some(map) => compiled.marking_from_map(&map)?,
                None => compiled.initial_marking(),
            };
            let explore = config
                .explore
                .resolve(limits.k, limits.max_depth, limits.max_states);
            if explore.max_states > config.explore.max_states_cap {
                bail!(
                    "--max-states {} exceeds the configured cap of {}",
                    explore.max_states,
                    config.explore.max_states_cap
                );
            }
            let (graph, report) = StateGraph::explore(&compiled, &start, explore)?;
            if report.hit_limits {
                log::warn!("state graph is partial: exploration limits were reached");
            }
            match output {
                Some(output) => {
                    graph
                        .write_dot(&output)
                        .with_context(|| format!("Failed to write {}", output.display()))?;
                    log::info!(
                        "{} states, {} edges written to {}",
                        graph.state_count(),
                        graph.edge_count(),
                        output.display()
                    );
                }
                None => println!("{}", graph.dot()),
            }
        }
    }
    Ok(())
}

fn load_model(path: &Path) -> Result<NetModel> {
    let model =
        io::read_model(path).with_context(|| format!("Failed to load net {}", path.display()))?;
    if let Ok(net) = Net::new(&model) {
        net.log_diagnostics();
    }
    Ok(model)
}

fn explore_all(
    nets: &[std::path::PathBuf],
    limits: &Limits,
    output: Option<&Path>,
    settings: &ExploreSettings,
) -> Result<()> {
    let results: Vec<Result<AnalysisReport>> = nets
        .par_iter()
        .map(|path| {
            let net = load_model(path)?;
            let started = Instant::now();
            let request = KBoundedRequest {
                net,
                marking: None,
                k: limits.k,
                max_depth: limits.max_depth,
                max_states: limits.max_states,
            };
            let result = api::analyze_k_bounded(&request, settings)
                .with_context(|| format!("Failed to explore {}", path.display()))?;
            Ok(AnalysisReport::new(
                path.display().to_string(),
                result,
                started.elapsed(),
            ))
        })
        .collect();

    if let Some(dir) = output {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let mut failures = 0;
    for (path, result) in nets.iter().zip(results) {
        match result {
            Ok(report) => match output {
                Some(dir) => {
                    let stem = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "net".to_string());
                    let target = dir.join(format!("{}.report", stem));
                    report.save_to_file(&target)?;
                    log::info!("report for {} saved to {}", path.display(), target.display());
                }
                None => println!("{}", report),
            },
            Err(err) => {
                failures += 1;
                eprintln!("{:#}", err);
            }
        }
    }

    if failures > 0 {
        return Err(anyhow!("{} of {} nets failed", failures, nets.len()));
    }
    Ok(())
}
