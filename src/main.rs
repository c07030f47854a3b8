mod config;
mod history;
mod probers;
mod render;
mod scheduler;
mod state;

use clap::Parser;
use config::Config;
use render::Theme;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "multiping")]
#[command(version)]
struct Cli {
    /// Path to the YAML host list.
    #[arg(required_unless_present = "print_default_config")]
    config: Option<String>,
    /// Seconds between probe rounds.
    #[arg(long, default_value_t = 1)]
    interval_secs: u64,
    /// Print a sample configuration and exit.
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }
    let Some(config_path) = cli.config else {
        // clap enforces the positional unless --print-default-config.
        return;
    };

    let cfg = match Config::load_from_file(&config_path) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    let mut endpoints = state::build_endpoints(&cfg);
    info!(
        hosts = endpoints.len(),
        interval_secs = cli.interval_secs,
        history_length = cfg.history_length,
        "starting multiping"
    );

    let theme = Theme::new(cfg.history_length);
    let hostname = local_hostname();

    // The write position shared by every probe's ring. Fixed before each
    // tick's dispatch and advanced only here, after the tick's barrier.
    let mut slot = cfg.history_length - 1;
    let mut ticker = tokio::time::interval(Duration::from_secs(cli.interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received, exiting");
                break;
            }
            _ = ticker.tick() => {
                scheduler::run_tick(&mut endpoints, slot).await;
                render::draw(&endpoints, slot, &theme, hostname.as_deref());
                slot = if slot == 0 { cfg.history_length - 1 } else { slot - 1 };
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout belongs to the chart; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn local_hostname() -> Option<String> {
    let output = std::process::Command::new("hostname").output().ok()?;
    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
