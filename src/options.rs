//! Parsing Options.
//! `pn [--config FILE] <enabled|fire|explore|simulate|graph> ...`

use clap::{Arg, ArgMatches, Command, value_parser};
use std::error::Error;
use std::path::PathBuf;

use crate::api::SparseMarking;
use crate::net::Weight;

/// 命令行给出的探索上限，缺省项取自配置文件。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Limits {
    pub k: Option<Weight>,
    pub max_depth: Option<usize>,
    pub max_states: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PnCommand {
    Enabled {
        net: PathBuf,
        marking: Option<SparseMarking>,
    },
    Fire {
        net: PathBuf,
        transition: String,
        marking: Option<SparseMarking>,
        output: Option<PathBuf>,
    },
    Explore {
        nets: Vec<PathBuf>,
        limits: Limits,
        output: Option<PathBuf>,
    },
    Simulate {
        net: PathBuf,
        steps: Option<usize>,
        seed: Option<u64>,
    },
    Graph {
        net: PathBuf,
        marking: Option<SparseMarking>,
        limits: Limits,
        output: Option<PathBuf>,
    },
}

fn net_arg() -> Arg {
    Arg::new("net")
        .value_name("NET")
        .help("Net model file (.json or .ron)")
        .required(true)
        .value_parser(value_parser!(PathBuf))
}

fn marking_arg() -> Arg {
    Arg::new("marking")
        .short('m')
        .long("marking")
        .value_name("JSON")
        .help("Sparse marking such as '{\"P1\": 2}'; unlisted places are empty")
}

fn output_arg(help: &'static str) -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("FILE")
        .help(help)
        .value_parser(value_parser!(PathBuf))
}

fn limit_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("k")
                .short('k')
                .long("k")
                .help("Token bound to check every place against")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("max-depth")
                .long("max-depth")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("max-states")
                .long("max-states")
                .value_parser(value_parser!(usize)),
        )
}

fn make_options_parser() -> clap::Command {
    let parser = Command::new("pn")
        .no_binary_name(true)
        .version("v0.1.0")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Engine configuration (TOML)")
                .default_value("pn.toml")
                .value_parser(value_parser!(PathBuf)),
        )
        .subcommand(
            Command::new("enabled")
                .about("List the transitions enabled at a marking")
                .arg(net_arg())
                .arg(marking_arg()),
        )
        .subcommand(
            Command::new("fire")
                .about("Fire one transition and print the resulting marking")
                .arg(net_arg())
                .arg(
                    Arg::new("transition")
                        .value_name("TRANSITION")
                        .required(true),
                )
                .arg(marking_arg())
                .arg(output_arg("Write the updated net model here")),
        )
        .subcommand(limit_args(
            Command::new("explore")
                .about("Bounded reachability analysis of one or more nets")
                .arg(
                    Arg::new("net")
                        .value_name("NET")
                        .required(true)
                        .num_args(1..)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(output_arg("Directory for per-net reports")),
        ))
        .subcommand(
            Command::new("simulate")
                .about("Fire random enabled transitions and print the history")
                .arg(net_arg())
                .arg(
                    Arg::new("steps")
                        .short('n')
                        .long("steps")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(value_parser!(u64)),
                ),
        )
        .subcommand(limit_args(
            Command::new("graph")
                .about("Export the explored state graph as DOT")
                .arg(net_arg())
                .arg(marking_arg())
                .arg(output_arg("DOT file; printed to stdout when omitted")),
        ));
    parser
}

fn parse_marking(matches: &ArgMatches) -> Result<Option<SparseMarking>, Box<dyn Error>> {
    match matches.get_one::<String>("marking") {
        Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
        None => Ok(None),
    }
}

fn parse_limits(matches: &ArgMatches) -> Limits {
    Limits {
        k: matches.get_one::<u64>("k").copied(),
        max_depth: matches.get_one::<usize>("max-depth").copied(),
        max_states: matches.get_one::<usize>("max-states").copied(),
    }
}

fn required_path(matches: &ArgMatches, id: &str) -> Result<PathBuf, Box<dyn Error>> {
    matches
        .get_one::<PathBuf>(id)
        .cloned()
        .ok_or_else(|| format!("missing argument <{}>", id).into())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub config: PathBuf,
    pub command: PnCommand,
}

impl Options {
    pub fn parse_from_args(flags: &[String]) -> Result<Self, Box<dyn Error>> {
        let app = make_options_parser();
        let matches = app.try_get_matches_from(flags.iter())?;
        let config = required_path(&matches, "config")?;

        let command = match matches.subcommand() {
            Some(("enabled", sub)) => PnCommand::Enabled {
                net: required_path(sub, "net")?,
                marking: parse_marking(sub)?,
            },
            Some(("fire", sub)) => PnCommand::Fire {
                net: required_path(sub, "net")?,
                transition: sub
                    .get_one::<String>("transition")
                    .cloned()
                    .ok_or("missing argument <TRANSITION>")?,
                marking: parse_marking(sub)?,
                output: sub.get_one::<PathBuf>("output").cloned(),
            },
            Some(("explore", sub)) => PnCommand::Explore {
                nets: sub
                    .get_many::<PathBuf>("net")
                    .map(|nets| nets.cloned().collect())
                    .unwrap_or_default(),
                limits: parse_limits(sub),
                output: sub.get_one::<PathBuf>("output").cloned(),
            },
            Some(("simulate", sub)) => PnCommand::Simulate {
                net: required_path(sub, "net")?,
                steps: sub.get_one::<usize>("steps").copied(),
                seed: sub.get_one::<u64>("seed").copied(),
            },
            Some(("graph", sub)) => PnCommand::Graph {
                net: required_path(sub, "net")?,
                marking: parse_marking(sub)?,
                limits: parse_limits(sub),
                output: sub.get_one::<PathBuf>("output").cloned(),
            },
            _ => return Err("UnsupportedCommand")?,
        };

        Ok(Options { config, command })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_owned).collect()
    }

    #[test]
    fn test_parse_explore_many_nets() {
        let options =
            Options::parse_from_args(&args("explore a.json b.ron -k 2 --max-states 50")).unwrap();
        assert_eq!(options.config, PathBuf::from("pn.toml"));
        assert_eq!(
            options.command,
            PnCommand::Explore {
                nets: vec![PathBuf::from("a.json"), PathBuf::from("b.ron")],
                limits: Limits {
                    k: Some(2),
                    max_depth: None,
                    max_states: Some(50),
                },
                output: None,
            }
        );
    }

    #[test]
    fn test_parse_fire_with_marking() {
        let mut flags = args("--config engine.toml fire net.json T1 --marking");
        flags.push(r#"{"P1": 2}"#.to_owned());
        let options = Options::parse_from_args(&flags).unwrap();
        assert_eq!(options.config, PathBuf::from("engine.toml"));
        match options.command {
            PnCommand::Fire {
                transition,
                marking,
                ..
            } => {
                assert_eq!(transition, "T1");
                assert_eq!(marking.unwrap()["P1"], 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_from_args_err() {
        assert!(Options::parse_from_args(&args("detect -k deadlock")).is_err());
        assert!(Options::parse_from_args(&args("explore")).is_err());
        assert!(Options::parse_from_args(&args("simulate net.json --steps many")).is_err());
        let mut flags = args("enabled net.json -m");
        flags.push("not json".to_owned());
        assert!(Options::parse_from_args(&flags).is_err());
    }
}
