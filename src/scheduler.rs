use crate::config::Protocol;
use crate::probers;
use crate::state::{Endpoint, ProbeOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::debug;

/// Most probes allowed in flight at once within a tick.
const MAX_IN_FLIGHT: usize = 20;
/// How long the tick waits for any single outcome before writing it off
/// as a failure.
const RESULT_WAIT: Duration = Duration::from_millis(500);

/// Run one tick: probe every endpoint once and record every outcome into
/// history slot `slot`. Returns only after all outcomes are recorded, so
/// a tick is a barrier: no result from this tick lands after the next
/// tick begins.
///
/// A result that misses `RESULT_WAIT` is recorded as a failure and the
/// straggling task is abandoned, not cancelled; whatever it eventually
/// produces is discarded.
pub async fn run_tick(endpoints: &mut [Endpoint], slot: usize) {
    // Pessimistically mark every probe down before dispatching anything.
    for endpoint in endpoints.iter_mut() {
        for probe in &mut endpoint.probes {
            probe.premark(slot);
        }
    }

    let limiter = Arc::new(Semaphore::new(MAX_IN_FLIGHT));
    let mut tasks: Vec<(usize, usize, JoinHandle<ProbeOutcome>)> = Vec::new();

    for (endpoint_idx, endpoint) in endpoints.iter().enumerate() {
        let ip = endpoint.ip;
        for (probe_idx, probe) in endpoint.probes.iter().enumerate() {
            let limiter = Arc::clone(&limiter);
            let protocol = probe.protocol;
            let port = probe.port;
            let handle = tokio::spawn(async move {
                let _permit = limiter.acquire().await.ok();
                match (protocol, port) {
                    (Protocol::Icmp, _) => probers::probe_icmp(ip).await,
                    (Protocol::Tcp, Some(port)) => probers::probe_tcp(ip, port).await,
                    // Config validation guarantees TCP probes carry a port.
                    (Protocol::Tcp, None) => ProbeOutcome::failure(),
                }
            });
            tasks.push((endpoint_idx, probe_idx, handle));
        }
    }

    for (endpoint_idx, probe_idx, handle) in tasks {
        let outcome = match time::timeout(RESULT_WAIT, handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                debug!(error = %err, "probe task failed to complete");
                ProbeOutcome::failure()
            }
            Err(_elapsed) => {
                debug!(
                    ip = %endpoints[endpoint_idx].ip,
                    "probe result not ready in time, recording failure"
                );
                ProbeOutcome::failure()
            }
        };
        endpoints[endpoint_idx].probes[probe_idx].record(slot, outcome);
    }
}
