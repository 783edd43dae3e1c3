use clap::{CommandFactory, Parser};
use line_pipeline::driver;
use line_pipeline::{PipelineConfig, Registry};
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Stream stdin lines through a chain of text-processing stages
#[derive(Debug, Parser)]
#[command(name = "line-pipeline", version)]
struct Cli {
    /// Maximum number of items in each stage's queue
    #[arg(allow_negative_numbers = true)]
    queue_size: i64,

    /// Stages to run, in order
    #[arg(required = true, num_args = 1..)]
    stages: Vec<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn print_usage(registry: &Registry) {
    eprintln!("{}", Cli::command().render_usage());
    eprintln!(
        "  available stages: {}",
        registry.names().collect::<Vec<_>>().join(", ")
    );
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let registry = Registry::builtin();
    let config = PipelineConfig::new(cli.queue_size, cli.stages);

    match driver::run(&config, &registry, io::stdin().lock()) {
        Ok(report) => {
            if !report.is_clean() {
                tracing::warn!(errors = report.errors.len(), "pipeline shut down with errors");
            }
            println!("Pipeline shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "pipeline failed");
            eprintln!("Error: {}", e);
            if e.kind() == line_pipeline::ErrorKind::Config {
                print_usage(&registry);
            }
            ExitCode::FAILURE
        }
    }
}
