//! CLI entry point (component G): flag parsing, logger setup, and the
//! orchestration tying together prior-type loading, protocol loading, the
//! TU pipeline, and the final solve/report.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{ArgGroup, Parser};
use tracing_subscriber::EnvFilter;

use flightcheck::cache::TuCache;
use flightcheck::config::{AnalysisConfig, ScalarMode};
use flightcheck::context::AnalysisContext;
use flightcheck::protocol::ProtocolDefinitionSource;
use flightcheck::{algebra::TypeSystem, daemon, pipeline, prior_types, protocol, solve};

/// Checks C/C++ autopilot source for unit-of-measure and coordinate-frame
/// errors.
#[derive(Parser, Debug)]
#[command(
    name = "flightcheck",
    about = "checks source code for unit conversion and coordinate-frame errors",
    group(ArgGroup::new("protocol_source").required(true).args(["message_definition", "flex_module_api_url"])),
)]
struct Cli {
    /// Path to the directory containing a compile_commands.json file.
    #[arg(short = 'c', long = "compilation-database")]
    compilation_database: PathBuf,

    /// Path to XML file containing the message spec (MAVLink or CMASI/MDM).
    #[arg(short = 'm', long = "message-definition")]
    message_definition: Option<PathBuf>,

    /// Base URL of the LMCP flex-module API.
    #[arg(long = "flex-module-api-url")]
    flex_module_api_url: Option<String>,

    /// Path to JSON file describing previously known types.
    #[arg(short = 'p', long = "prior-types")]
    prior_types: PathBuf,

    /// Run forever, waiting for SIGHUP between runs.
    #[arg(short = 'd', long = "run-as-daemon")]
    run_as_daemon: bool,

    /// Use a power-of-ten representation of unit scalars.
    #[arg(long = "power-of-10")]
    power_of_ten: bool,

    /// Do not use scalar prefixes; speeds up analysis at the cost of
    /// ignoring unit-conversion factors (pure dimension checking).
    #[arg(long = "disable-scalar-prefixes")]
    disable_scalar_prefixes: bool,

    /// Files sa4u does not need to analyze, matched by basename.
    #[arg(short = 'i', long = "ignore-files")]
    ignore_files: Vec<String>,

    /// Directory to cache per-translation-unit analysis results in.
    #[arg(long = "serialize-analysis")]
    serialize_analysis: Option<PathBuf>,

    /// Raise logging verbosity (repeatable).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn protocol_source(&self) -> ProtocolDefinitionSource {
        let location = self
            .flex_module_api_url
            .clone()
            .or_else(|| self.message_definition.as_ref().map(|p| p.to_string_lossy().into_owned()))
            .expect("clap enforces exactly one of message-definition/flex-module-api-url");
        ProtocolDefinitionSource::from_location(location)
    }

    fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            scalar_mode: if self.power_of_ten { ScalarMode::PowerOfTen } else { ScalarMode::Rational },
            enable_scalar_prefixes: !self.disable_scalar_prefixes,
            ignore_files: self.ignore_files.iter().cloned().collect(),
            cache_dir: self.serialize_analysis.clone(),
            run_as_daemon: self.run_as_daemon,
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.analysis_config();
    let protocol_src = Arc::new(cli.protocol_source());
    let cache = Arc::new(TuCache::new(config.cache_dir.clone()));

    let priors = Arc::new(
        prior_types::load(&cli.prior_types)
            .with_context(|| format!("loading prior types from {}", cli.prior_types.display()))?,
    );

    if config.run_as_daemon {
        let gate = Arc::new(daemon::RunGate::new());
        daemon::spawn_signal_handlers(Arc::clone(&gate)).context("installing signal handlers")?;
        loop {
            gate.wait_for_run().await;
            println!("---Started---");
            run_once(&cli, &config, &priors, &protocol_src, &cache).await?;
            println!("---END RUN---");
        }
    } else {
        println!("---Started---");
        run_once(&cli, &config, &priors, &protocol_src, &cache).await?;
        Ok(())
    }
}

/// One full analysis pass: load protocol definitions, dispatch the TU
/// pipeline, merge every result into a fresh global solver, and report.
async fn run_once(
    cli: &Cli,
    config: &AnalysisConfig,
    priors: &Arc<Vec<prior_types::VariableDescription>>,
    protocol_src: &Arc<ProtocolDefinitionSource>,
    cache: &Arc<TuCache>,
) -> Result<()> {
    let start = std::time::Instant::now();

    let z3_config = z3::Config::new();
    let ctx = z3::Context::new(&z3_config);
    let sys = TypeSystem::new(&ctx, config);
    let global_solver = solve::build_global_solver(&ctx);
    let mut global_analysis = AnalysisContext::new();

    prior_types::apply_all(priors, &sys, &global_solver, &mut global_analysis);
    protocol::load_message_definitions(protocol_src, &sys, &global_solver, &mut global_analysis)
        .await
        .context("loading protocol definitions")?;
    let mut all_assumptions: Vec<z3::ast::Bool<'_>> = global_analysis.take_tu_assertions().into_iter().map(|label| z3::ast::Bool::new_const(&ctx, label)).collect();

    let results = pipeline::run(
        &cli.compilation_database,
        config,
        Arc::clone(priors),
        Arc::clone(protocol_src),
        Arc::clone(cache),
    )
    .context("running translation-unit pipeline")?;

    tracing::info!(translation_units = results.len(), elapsed = ?start.elapsed(), "parsing complete");

    for stu in &results {
        let assumptions = solve::merge_serialized_tu(&ctx, &global_solver, stu);
        all_assumptions.extend(assumptions);
    }

    let solve_start = std::time::Instant::now();
    match solve::check(&global_solver, &all_assumptions) {
        Ok(solve::CheckOutcome::Sat) => {
            tracing::info!(elapsed = ?solve_start.elapsed(), "no unit or frame errors found");
        }
        Ok(solve::CheckOutcome::Unsat(core)) => {
            tracing::info!(elapsed = ?solve_start.elapsed(), findings = core.len(), "analysis found errors");
            solve::report_unsat(&core);
        }
        Err(err) => {
            tracing::warn!(%err, "solver could not decide satisfiability within the timeout");
        }
    }

    Ok(())
}
