//! `mlo-runner` command-line entry point

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use mlo_catalog::{ScenarioCatalog, Suite};
use mlo_runner::logging::init_tracing;
use mlo_runner::{OrchestratorConfig, Protocol, RunClock, RunSelection, Scheduler, Strategy};
use std::path::PathBuf;
use std::sync::Arc;

fn cli() -> Command {
    Command::new("mlo-runner")
        .version(mlo_runner::VERSION)
        .about("Run MLO simulation scenarios in parallel")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("suite")
                .long("suite")
                .default_value("basic")
                .value_parser(value_parser!(Suite))
                .help("Built-in scenario suite (basic or extreme)"),
        )
        .arg(
            Arg::new("catalog")
                .long("catalog")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .conflicts_with("suite")
                .help("Load the scenario catalog from a TOML file instead of a suite"),
        )
        .arg(
            Arg::new("categories")
                .long("categories")
                .num_args(1..)
                .action(ArgAction::Append)
                .help("Test categories to run (default: all)"),
        )
        .arg(
            Arg::new("strategies")
                .long("strategies")
                .num_args(1..)
                .action(ArgAction::Append)
                .value_parser(value_parser!(Strategy))
                .help("Strategies to test: RoundRobin, Greedy, Reliability, SLA-MLO (default: all)"),
        )
        .arg(
            Arg::new("protocols")
                .long("protocols")
                .num_args(1..)
                .action(ArgAction::Append)
                .value_parser(value_parser!(Protocol))
                .help("Protocols to test: UDP, TCP, Mixed (default: all)"),
        )
        .arg(
            Arg::new("workers")
                .long("workers")
                .value_parser(value_parser!(usize))
                .help("Number of parallel workers (default: all available CPU cores)"),
        )
        .arg(
            Arg::new("simulator-dir")
                .long("simulator-dir")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Simulator checkout used as the working directory of every run"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECS")
                .value_parser(value_parser!(u64))
                .help("Kill a run after this many seconds (default: no limit)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the final report as JSON"),
        )
        .arg(
            Arg::new("list-scenarios")
                .long("list-scenarios")
                .action(ArgAction::SetTrue)
                .help("List all available test scenarios and exit"),
        )
}

fn load_catalog(matches: &ArgMatches) -> anyhow::Result<ScenarioCatalog> {
    if let Some(path) = matches.get_one::<PathBuf>("catalog") {
        return ScenarioCatalog::from_path(path)
            .with_context(|| format!("loading catalog {}", path.display()));
    }
    let suite = matches
        .get_one::<Suite>("suite")
        .copied()
        .unwrap_or_default();
    suite
        .load()
        .with_context(|| format!("loading built-in suite {suite}"))
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<OrchestratorConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => OrchestratorConfig::from_path(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => OrchestratorConfig::default(),
    };

    if let Some(&workers) = matches.get_one::<usize>("workers") {
        config = config.with_workers(workers);
    }
    if let Some(dir) = matches.get_one::<PathBuf>("simulator-dir") {
        config = config.with_simulator_dir(dir);
    }
    if let Some(&secs) = matches.get_one::<u64>("timeout") {
        config = config.with_run_timeout_secs(secs);
    }

    config.validate()?;
    Ok(config)
}

fn selection(matches: &ArgMatches) -> RunSelection {
    RunSelection {
        categories: matches
            .get_many::<String>("categories")
            .map(|v| v.cloned().collect()),
        strategies: matches
            .get_many::<Strategy>("strategies")
            .map(|v| v.copied().collect()),
        protocols: matches
            .get_many::<Protocol>("protocols")
            .map(|v| v.copied().collect()),
    }
}

async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let catalog = load_catalog(matches)?;

    if matches.get_flag("list-scenarios") {
        print!("{}", catalog.listing());
        return Ok(());
    }

    let config = load_config(matches)?;
    config.prepare_dirs().await?;

    let clock = RunClock::now();
    tracing::info!("MLO simulation runner initializing");
    tracing::info!("Output CSV: {}", config.csv_path().display());
    tracing::info!("Log files: {}", config.log_dir_path().display());

    let scheduler = Scheduler::new(
        Arc::new(catalog),
        config.invocation_builder(),
        Arc::new(config.process_executor(clock.label())),
    )
    .with_pool(config.worker_pool())
    .with_log_dir(config.log_dir_path());

    let report = scheduler.run(&selection(matches), clock).await?;

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    let matches = cli().get_matches();

    if let Err(e) = run(&matches).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn selection_flags_parse() {
        let matches = cli()
            .try_get_matches_from([
                "mlo-runner",
                "--categories",
                "baseline",
                "mobility",
                "--strategies",
                "greedy",
                "SLA-MLO",
                "--protocols",
                "UDP",
            ])
            .unwrap();
        let selection = selection(&matches);

        assert_eq!(
            selection.categories,
            Some(vec!["baseline".to_string(), "mobility".to_string()])
        );
        assert_eq!(
            selection.strategies,
            Some(vec![Strategy::Greedy, Strategy::SlaMlo])
        );
        assert_eq!(selection.protocols, Some(vec![Protocol::Udp]));
    }

    #[test]
    fn invalid_strategy_is_rejected() {
        assert!(cli()
            .try_get_matches_from(["mlo-runner", "--strategies", "Random"])
            .is_err());
    }

    #[test]
    fn flags_override_config() {
        let matches = cli()
            .try_get_matches_from([
                "mlo-runner",
                "--workers",
                "3",
                "--simulator-dir",
                "/opt/ns3",
                "--timeout",
                "60",
            ])
            .unwrap();
        let config = load_config(&matches).unwrap();

        assert_eq!(config.workers, Some(3));
        assert_eq!(config.simulator_dir, PathBuf::from("/opt/ns3"));
        assert_eq!(config.run_timeout_secs, Some(60));
    }

    #[test]
    fn zero_workers_is_fatal() {
        let matches = cli()
            .try_get_matches_from(["mlo-runner", "--workers", "0"])
            .unwrap();
        assert!(load_config(&matches).is_err());
    }

    #[test]
    fn suite_selection() {
        let matches = cli()
            .try_get_matches_from(["mlo-runner", "--suite", "extreme"])
            .unwrap();
        assert_eq!(load_catalog(&matches).unwrap().len(), 9);
    }
}
