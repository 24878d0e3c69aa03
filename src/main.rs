//! Command-line entry point for the traffic generator.

use std::path::{Path, PathBuf};

use anyhow::Context;
use argh::FromArgs;
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;
use yansi::Paint;

use tgran::config::{Config, UdpConfig};
use tgran::{report, udp, AggregateRecord, ClientPool, RankWeightModel, Scheduler};

/// Synthetic traffic generator: rate-paced HTTP page measurements with
/// Zipf-Mandelbrot target selection, plus a fixed-count UDP blaster.
#[derive(Debug, FromArgs)]
struct Args {
    #[argh(subcommand)]
    command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Http(HttpArgs),
    Udp(UdpArgs),
}

/// Run the rate-paced HTTP measurement workload.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "http")]
struct HttpArgs {
    /// path to the yaml configuration file
    #[argh(option, short = 'c')]
    config: PathBuf,
}

/// Send a fixed number of UDP packets to one target.
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "udp")]
struct UdpArgs {
    /// path to the yaml configuration file
    #[argh(option, short = 'c')]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Args = argh::from_env();
    match args.command {
        Command::Http(args) => run_http(args).await,
        Command::Udp(args) => run_udp(args).await,
    }
}

fn load_config<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = std::fs::File::open(path).context("failed to open config file")?;
    serde_yaml::from_reader(file).context("failed to parse config YAML")
}

async fn run_http(args: HttpArgs) -> anyhow::Result<()> {
    let config: Config = load_config(&args.config)?;
    tracing::debug!(?config);

    let targets = config.resolve_targets()?;
    let model = RankWeightModel::new(targets.len(), config.zipf.q, config.zipf.s)?;
    let pool = ClientPool::new(&config.source_addrs)?;
    tracing::info!(
        targets = targets.len(),
        clients = pool.len(),
        num_requests = config.num_requests,
        rate = config.requests_per_second,
        "starting traffic run"
    );

    let scheduler = Scheduler::builder(targets, model, pool)
        .rate(config.requests_per_second)
        .num_requests(config.num_requests)
        .max_in_flight(config.max_in_flight)
        .subfetch_concurrency(config.subfetch_concurrency)
        .timeout(config.request_timeout)
        .build()?;

    let records = scheduler.run().await;
    let aggregate = AggregateRecord::from_records(&records);

    report::write_log(&config.log_file, &records, aggregate.as_ref())
        .with_context(|| format!("failed to write request log {}", config.log_file.display()))?;
    report::print_summary(aggregate.as_ref());

    Ok(())
}

async fn run_udp(args: UdpArgs) -> anyhow::Result<()> {
    let config: UdpConfig = load_config(&args.config)?;
    tracing::debug!(?config);

    let report = udp::blast(&config).await?;
    println!(
        "{} {} packets in {:.2?} ({:.2} KB/s)",
        "## UDP BLAST".bold(),
        report.packets_sent.bold().blue(),
        report.elapsed,
        report.throughput_kbps()
    );

    Ok(())
}
