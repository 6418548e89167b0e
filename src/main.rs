//! limno CLI - run lake-problem experiments and inspect configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use limno::{
    Config, Evaluator, ExperimentDesign, ExperimentRunner, ParallelEvaluator, ReleasePolicy,
    SequentialEvaluator,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "limno")]
#[command(version)]
#[command(about = "Exploratory modelling of the shallow-lake pollution problem")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios against randomly sampled release policies
    Run {
        /// Number of scenarios (overrides config)
        #[arg(short, long)]
        scenarios: Option<usize>,

        /// Number of sampled policies (overrides config)
        #[arg(short, long)]
        policies: Option<usize>,

        /// Base seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Output JSONL path (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force sequential evaluation
        #[arg(long)]
        sequential: bool,
    },

    /// Run scenarios with no release at all (the unforced system)
    Baseline {
        /// Number of scenarios (overrides config)
        #[arg(short, long)]
        scenarios: Option<usize>,

        /// Base seed (overrides config)
        #[arg(long)]
        seed: Option<u64>,

        /// Output JSONL path (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force sequential evaluation
        #[arg(long)]
        sequential: bool,
    },

    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

fn print_example_config() {
    let example = r#"# limno configuration file

[model]
alpha = 0.41       # utility weight on releases
nsamples = 150     # Monte Carlo replications per evaluation
horizon = 100      # planning horizon in years

[experiment]
scenarios = 1000
policies = 4
seed = 42

[evaluator]
workers = 0        # 0 = one per core
sequential = false

[output]
path = "output/results.jsonl"
track_timing = true
"#;
    println!("{example}");
}

fn build_evaluator(config: &Config, force_sequential: bool) -> Result<Box<dyn Evaluator>> {
    if force_sequential || config.evaluator.sequential {
        Ok(Box::new(SequentialEvaluator))
    } else {
        let evaluator = ParallelEvaluator::new(config.evaluator.workers)
            .context("Failed to build parallel evaluator")?;
        Ok(Box::new(evaluator))
    }
}

fn print_summary(stats: &limno::RunStats, output: &std::path::Path) {
    println!("\n=== Experiment Complete ===");
    println!("Scenarios:   {}", stats.scenarios);
    println!("Policies:    {}", stats.policies);
    println!("Cases:       {}", stats.total_cases);
    println!("Completed:   {}", stats.completed);
    println!("Failed:      {}", stats.failed);
    println!("Runtime:     {:.1}s", stats.runtime_secs);
    println!("Throughput:  {:.1}/s", stats.throughput_per_sec);
    println!("Output:      {output:?}");
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Example => {
            print_example_config();
            Ok(())
        }

        Commands::Validate => {
            let config = Config::from_file(&cli.config)
                .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

            info!("Configuration is valid");
            info!(
                "  Model: alpha={}, nsamples={}, horizon={}",
                config.model.alpha, config.model.nsamples, config.model.horizon
            );
            info!(
                "  Experiment: {} scenarios x {} policies, seed {}",
                config.experiment.scenarios, config.experiment.policies, config.experiment.seed
            );
            Ok(())
        }

        Commands::Run {
            scenarios,
            policies,
            seed,
            output,
            sequential,
        } => {
            let mut config = load_or_default(&cli.config)?;
            if let Some(s) = scenarios {
                config.experiment.scenarios = s;
            }
            if let Some(p) = policies {
                config.experiment.policies = p;
            }
            if let Some(s) = seed {
                config.experiment.seed = s;
            }
            if let Some(o) = output {
                config.output.path = o;
            }
            config.validate().context("Invalid configuration")?;

            let design = ExperimentDesign::sample(
                config.experiment.scenarios,
                config.experiment.policies,
                config.experiment.seed,
            );
            let evaluator = build_evaluator(&config, sequential)?;
            let output_path = config.output.path.clone();

            let runner = ExperimentRunner::new(config);
            let stats = runner.run(&design, evaluator.as_ref(), &output_path)?;
            print_summary(&stats, &output_path);
            Ok(())
        }

        Commands::Baseline {
            scenarios,
            seed,
            output,
            sequential,
        } => {
            let mut config = load_or_default(&cli.config)?;
            if let Some(s) = scenarios {
                config.experiment.scenarios = s;
            }
            if let Some(s) = seed {
                config.experiment.seed = s;
            }
            if let Some(o) = output {
                config.output.path = o;
            }
            config.experiment.policies = 1;
            config.validate().context("Invalid configuration")?;

            let design = ExperimentDesign::with_policies(
                config.experiment.scenarios,
                vec![ReleasePolicy::zero()],
                config.experiment.seed,
            );
            let evaluator = build_evaluator(&config, sequential)?;
            let output_path = config.output.path.clone();

            let runner = ExperimentRunner::new(config);
            let stats = runner.run(&design, evaluator.as_ref(), &output_path)?;
            print_summary(&stats, &output_path);
            Ok(())
        }
    }
}

/// Load the config file if it exists; otherwise fall back to defaults so
/// `limno run --scenarios 100` works without one.
fn load_or_default(path: &std::path::Path) -> Result<Config> {
    if path.exists() {
        Config::from_file(path).with_context(|| format!("Failed to load config from {path:?}"))
    } else {
        Ok(Config::default())
    }
}
