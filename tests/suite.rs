//! Suite entry point.
//!
//! This file is the test binary that runs login scenarios against a live
//! deployment. Run with:
//!
//! ```text
//! cargo test --test suite -- [--scenarios DIR] [--tag TAG] [--name NAME]
//! ```
//!
//! Missing required environment variables abort the run before any test
//! executes. Set `E2E_SKIP_UNCONFIGURED=1` on machines without a target to
//! skip instead.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use webmail_e2e::scenario::Scenario;
use webmail_e2e::{Config, E2eError, E2eResult, SuiteRunner};

#[derive(Parser, Debug)]
#[command(name = "webmail-e2e")]
#[command(about = "Login-flow E2E suite for the webmail platform")]
struct Args {
    /// Directory of scenario YAML files; the built-in matrix when omitted
    #[arg(short, long)]
    scenarios: Option<PathBuf>,

    /// Run only scenarios carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only the scenario with this name
    #[arg(short, long)]
    name: Option<String>,

    /// Output directory for the JSON report
    #[arg(short, long, default_value = "target/e2e")]
    output: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("info".parse().expect("static directive")),
        )
        .init();

    let args = Args::parse();

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e @ E2eError::MissingEnv(_)) => {
            if Config::skip_unconfigured() {
                eprintln!("suite skipped: {e}");
                return;
            }
            eprintln!("configuration error: {e}");
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(2);
        }
    };

    let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
    match rt.block_on(run(args, config)) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    }
}

async fn run(args: Args, config: Arc<Config>) -> E2eResult<bool> {
    config.log_summary();

    let mut scenarios = match &args.scenarios {
        Some(dir) => Scenario::load_all(dir)?,
        None => Scenario::builtin(),
    };
    if let Some(tag) = &args.tag {
        scenarios = Scenario::filter_by_tag(scenarios, tag);
    }
    if let Some(name) = &args.name {
        scenarios.retain(|s| &s.name == name);
        if scenarios.is_empty() {
            return Err(E2eError::ScenarioParse(format!("scenario not found: {name}")));
        }
    }

    let runner = SuiteRunner::new(config);
    let results = runner.run_all(scenarios).await;
    runner.write_results(&args.output, &results)?;

    Ok(results.failed == 0)
}
