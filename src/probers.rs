use crate::state::ProbeOutcome;
use regex::Regex;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time;
use tracing::debug;

/// Deadline handed to the system ping, in seconds (`-W`).
const ICMP_DEADLINE_SECS: u32 = 1;
/// TCP handshake deadline.
const TCP_DEADLINE: Duration = Duration::from_millis(500);

/// One ICMP echo via the system `ping` binary. Liveness is the exit
/// status; latency comes from the round-trip summary in its output.
pub async fn probe_icmp(ip: Ipv4Addr) -> ProbeOutcome {
    let output = match Command::new("ping")
        .arg("-c")
        .arg("1")
        .arg("-W")
        .arg(ICMP_DEADLINE_SECS.to_string())
        .arg(ip.to_string())
        .output()
        .await
    {
        Ok(output) => output,
        Err(err) => {
            debug!(ip = %ip, error = %err, "failed to run ping");
            return ProbeOutcome::failure();
        }
    };

    if !output.status.success() {
        return ProbeOutcome::failure();
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    ProbeOutcome {
        alive: true,
        latency_ms: parse_round_trip_avg(&stdout),
    }
}

/// Pull the average round-trip time out of ping's summary line, e.g.
/// `rtt min/avg/max/mdev = 14.905/15.086/15.267/0.181 ms` (Linux) or
/// `round-trip min/avg/max/stddev = 15.086/15.086/15.086/0.000 ms`
/// (BSD/macOS). Returns `None` when the line is missing or the average
/// is not a number; the host may still be alive in that case.
pub fn parse_round_trip_avg(text: &str) -> Option<f64> {
    static RTT_SUMMARY: OnceLock<Regex> = OnceLock::new();
    let re = RTT_SUMMARY.get_or_init(|| {
        Regex::new(r"(?i)(?:rtt|round-trip)[^=]*=\s*([0-9.]+|nan)/([0-9.]+|nan)/")
            .expect("static pattern compiles")
    });
    let caps = re.captures(text)?;
    let avg = caps.get(2)?.as_str();
    if avg.eq_ignore_ascii_case("nan") {
        return None;
    }
    avg.parse().ok()
}

/// One TCP connect attempt. Every failure cause (refused, timeout,
/// unreachable, reset) collapses to a plain failure outcome.
pub async fn probe_tcp(ip: Ipv4Addr, port: u16) -> ProbeOutcome {
    let addr = SocketAddr::from((ip, port));
    let start = Instant::now();

    match time::timeout(TCP_DEADLINE, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => ProbeOutcome {
            alive: true,
            latency_ms: Some(start.elapsed().as_secs_f64() * 1000.0),
        },
        Ok(Err(err)) => {
            debug!(address = %addr, error = %err, "tcp connect failed");
            ProbeOutcome::failure()
        }
        Err(_elapsed) => {
            debug!(address = %addr, "tcp connect timeout");
            ProbeOutcome::failure()
        }
    }
}
