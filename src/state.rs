use crate::config::{Config, EndpointSpec, Protocol};
use crate::history::{symbol_for, Ring, Symbol};
use chrono::Local;
use std::net::Ipv4Addr;

/// A monitored host: fixed identity plus its ordered probes. Built once
/// from config; membership never changes while running.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub ip: Ipv4Addr,
    pub description: String,
    pub probes: Vec<Probe>,
}

/// One reachability check against an endpoint, with its rolling history.
/// Mutated in place every tick by the scheduler via `premark`/`record`.
#[derive(Debug, Clone)]
pub struct Probe {
    pub protocol: Protocol,
    /// Always `Some` for TCP, always `None` for ICMP.
    pub port: Option<u16>,
    pub history: Ring,
    /// Last observed latency; `None` means no response.
    pub latency_ms: Option<f64>,
    /// Set once at the first failing tick of a down-streak, cleared on
    /// the next success.
    pub last_seen: Option<String>,
    /// TCP only: mirrors the last liveness outcome.
    pub service: Option<ServiceState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Open,
    Closed,
}

impl ServiceState {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceState::Open => "open",
            ServiceState::Closed => "closed",
        }
    }
}

/// Result of a single probe execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeOutcome {
    pub alive: bool,
    pub latency_ms: Option<f64>,
}

impl ProbeOutcome {
    pub const fn failure() -> Self {
        Self {
            alive: false,
            latency_ms: None,
        }
    }
}

impl Endpoint {
    pub fn from_spec(spec: &EndpointSpec, history_length: usize) -> Self {
        Self {
            ip: spec.ip,
            description: spec.description.clone(),
            probes: spec
                .probes
                .iter()
                .map(|p| Probe::new(p.protocol, p.port, history_length))
                .collect(),
        }
    }
}

/// Build the runtime model for a validated config.
pub fn build_endpoints(cfg: &Config) -> Vec<Endpoint> {
    cfg.endpoints
        .iter()
        .map(|spec| Endpoint::from_spec(spec, cfg.history_length))
        .collect()
}

impl Probe {
    pub fn new(protocol: Protocol, port: Option<u16>, history_length: usize) -> Self {
        Self {
            protocol,
            port,
            history: Ring::new(history_length),
            latency_ms: None,
            last_seen: None,
            service: None,
        }
    }

    /// Pessimistic write before the tick's probes run: if the tick is
    /// interrupted or a result never arrives, the slot shows down rather
    /// than a stale symbol from the previous lap.
    pub fn premark(&mut self, slot: usize) {
        self.history.write(slot, Symbol::Down);
        self.latency_ms = None;
    }

    /// Apply one tick's outcome to the slot written by `premark`.
    pub fn record(&mut self, slot: usize, outcome: ProbeOutcome) {
        if outcome.alive {
            self.history.write(slot, symbol_for(outcome.latency_ms));
            self.latency_ms = Some(outcome.latency_ms.unwrap_or(0.0));
            self.last_seen = None;
            if self.protocol == Protocol::Tcp {
                self.service = Some(ServiceState::Open);
            }
        } else {
            self.history.write(slot, Symbol::Down);
            self.latency_ms = None;
            if self.protocol == Protocol::Tcp {
                self.service = Some(ServiceState::Closed);
            }
            if self.last_seen.is_none() {
                self.last_seen = Some(format!("Last seen: {}", Local::now().format("%c")));
            }
        }
    }

    pub fn label(&self) -> String {
        match (self.protocol, self.port) {
            (Protocol::Tcp, Some(port)) => format!("TCP port {port}"),
            (Protocol::Tcp, None) => "TCP".to_string(),
            (Protocol::Icmp, _) => "ICMP".to_string(),
        }
    }

    /// Plain status text; styling is the presenter's job.
    pub fn status_text(&self) -> String {
        match self.latency_ms {
            Some(ms) => format!("{ms:.1}ms"),
            None => "DOWN".to_string(),
        }
    }
}
