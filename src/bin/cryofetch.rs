use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use cryofetch::batch::{BatchResult, BatchRunner, CancellationToken, ProgressSink};
use cryofetch::config::ConfigLoader;
use cryofetch::endpoints::EndpointRegistry;
use cryofetch::http::HttpMirrorClient;
use cryofetch::output::{JsonOutput, LogOutput};
use cryofetch::probe::MirrorClient;
use cryofetch::resolver::FallbackResolver;
use cryofetch::rsync::RsyncMirrorClient;
use cryofetch::signal::cancel_on_signal;
use cryofetch::store::OutputStore;

#[derive(Parser)]
#[command(name = "cryofetch")]
#[command(about = "Fetch PDB, EMDB and EMPIAR artifacts, falling back across wwPDB mirrors")]
#[command(version)]
struct Cli {
    /// Batch config file. Defaults to $CRYOFETCH_CONFIG, then ./cryofetch.json.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(result) => map_exit_code(&result),
        Err(report) => {
            eprintln!("{report:?}");
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(result: &BatchResult) -> ExitCode {
    if result.unresolved_count() > 0 || result.cancelled {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: Cli) -> miette::Result<BatchResult> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match cli.config.as_deref() {
        Some(path) => ConfigLoader::resolve(Some(path)),
        None => ConfigLoader::resolve_from_env(),
    }
    .into_diagnostic()?;

    let http = HttpMirrorClient::new(config.http_timeout).into_diagnostic()?;
    let rsync = RsyncMirrorClient::new(&config.rsync_program, config.rsync_timeout);
    let resolver = FallbackResolver::new(EndpointRegistry::builtin(), MirrorClient::new(http, rsync));
    let runner = BatchRunner::new(resolver, OutputStore::new(config.output.clone()));

    let cancel = CancellationToken::new();
    if let Err(err) = cancel_on_signal(cancel.clone()) {
        warn!(error = %err, "signal handlers unavailable, batch cannot be interrupted");
    }

    let sink: &dyn ProgressSink = if config.json { &JsonOutput } else { &LogOutput };
    let result = runner
        .run(&config.requests, sink, &cancel)
        .into_diagnostic()?;

    if config.json {
        JsonOutput::print_batch(&result).into_diagnostic()?;
    } else {
        print_summary(&result);
    }
    Ok(result)
}

fn print_summary(result: &BatchResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}cryofetch summary{reset}");
    for item in &result.items {
        let color = if item.is_resolved() { green } else { yellow };
        println!("{color}{}{reset}", item.summary_line());
    }
    println!(
        "{green}resolved: {}{reset}  {yellow}unresolved: {}{reset}",
        result.resolved_count(),
        result.unresolved_count()
    );
    if result.cancelled {
        println!("{yellow}batch cancelled before completion{reset}");
    }
}
