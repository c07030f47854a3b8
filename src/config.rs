use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

/// Validated monitoring plan: one entry per endpoint, probes already
/// expanded (port ranges flattened, defaults applied).
#[derive(Debug, Clone)]
pub struct Config {
    pub history_length: usize,
    pub endpoints: Vec<EndpointSpec>,
}

#[derive(Debug, Clone)]
pub struct EndpointSpec {
    pub ip: Ipv4Addr,
    pub description: String,
    pub probes: Vec<ProbeSpec>,
}

#[derive(Debug, Clone, Copy)]
pub struct ProbeSpec {
    pub protocol: Protocol,
    /// Always `Some` for TCP, always `None` for ICMP.
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Icmp,
    Tcp,
}

/// Raw YAML document shape, before validation and probe expansion.
#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    hosts: Vec<HashMap<String, Option<RawHost>>>,
    #[serde(default)]
    ignore_self: bool,
    #[serde(default = "default_history_length")]
    history_length: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawHost {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tests: Option<Vec<RawTest>>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawTest {
    #[serde(default = "default_protocol")]
    protocol: String,
    #[serde(default)]
    port: Option<RawPort>,
}

/// A port is either a plain number or a `"start-end"` inclusive range
/// string that expands to one probe per port.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawPort {
    Number(u16),
    Text(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("config validation error: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let raw: RawConfig = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        let self_ips = if raw.ignore_self {
            local_addresses()?
        } else {
            Vec::new()
        };
        Self::from_raw(raw, &self_ips)
    }

    fn from_raw(raw: RawConfig, self_ips: &[String]) -> Result<Self, ConfigError> {
        if raw.history_length == 0 {
            return Err(ConfigError::Validation(
                "history_length must be >= 1".to_string(),
            ));
        }

        let mut endpoints = Vec::new();
        for item in &raw.hosts {
            for (ip_text, entry) in item {
                if self_ips.iter().any(|own| own == ip_text) {
                    continue;
                }
                let ip: Ipv4Addr = ip_text.parse().map_err(|_| {
                    ConfigError::Validation(format!("invalid IPv4 address: {ip_text}"))
                })?;
                let entry = entry.clone().unwrap_or_default();
                let description = entry.description.unwrap_or_else(|| ip_text.clone());
                let probes = match &entry.tests {
                    Some(tests) if !tests.is_empty() => expand_tests(ip_text, tests)?,
                    _ => vec![ProbeSpec {
                        protocol: Protocol::Icmp,
                        port: None,
                    }],
                };
                endpoints.push(EndpointSpec {
                    ip,
                    description,
                    probes,
                });
            }
        }

        Ok(Self {
            history_length: raw.history_length,
            endpoints,
        })
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn expand_tests(ip: &str, tests: &[RawTest]) -> Result<Vec<ProbeSpec>, ConfigError> {
    let mut probes = Vec::new();
    for test in tests {
        match parse_protocol(ip, &test.protocol)? {
            Protocol::Icmp => probes.push(ProbeSpec {
                protocol: Protocol::Icmp,
                port: None,
            }),
            Protocol::Tcp => {
                let spec = test.port.as_ref().ok_or_else(|| {
                    ConfigError::Validation(format!("TCP test for {ip} must specify a port"))
                })?;
                for port in expand_ports(ip, spec)? {
                    probes.push(ProbeSpec {
                        protocol: Protocol::Tcp,
                        port: Some(port),
                    });
                }
            }
        }
    }
    Ok(probes)
}

fn parse_protocol(ip: &str, text: &str) -> Result<Protocol, ConfigError> {
    if text.eq_ignore_ascii_case("icmp") {
        Ok(Protocol::Icmp)
    } else if text.eq_ignore_ascii_case("tcp") {
        Ok(Protocol::Tcp)
    } else {
        Err(ConfigError::Validation(format!(
            "unsupported protocol '{text}' for {ip}: expected ICMP or TCP"
        )))
    }
}

fn expand_ports(ip: &str, spec: &RawPort) -> Result<Vec<u16>, ConfigError> {
    match spec {
        RawPort::Number(port) => {
            check_port(ip, *port)?;
            Ok(vec![*port])
        }
        RawPort::Text(text) => match text.split_once('-') {
            Some((start, end)) => {
                let start = parse_port(ip, start)?;
                let end = parse_port(ip, end)?;
                if start > end {
                    return Err(ConfigError::Validation(format!(
                        "port range '{text}' for {ip} is empty: start exceeds end"
                    )));
                }
                Ok((start..=end).collect())
            }
            None => {
                let port = parse_port(ip, text)?;
                Ok(vec![port])
            }
        },
    }
}

fn parse_port(ip: &str, text: &str) -> Result<u16, ConfigError> {
    let port: u16 = text
        .trim()
        .parse()
        .map_err(|_| ConfigError::Validation(format!("invalid port '{}' for {ip}", text.trim())))?;
    check_port(ip, port)?;
    Ok(port)
}

fn check_port(ip: &str, port: u16) -> Result<(), ConfigError> {
    if port == 0 {
        return Err(ConfigError::Validation(format!(
            "port for {ip} must be in 1..65535"
        )));
    }
    Ok(())
}

/// Addresses assigned to this machine, for `ignore_self`.
fn local_addresses() -> Result<Vec<String>, ConfigError> {
    let output = Command::new("hostname").arg("-i").output().map_err(|err| {
        ConfigError::Validation(format!(
            "ignore_self: failed to query local addresses: {err}"
        ))
    })?;
    Ok(String::from_utf8_lossy(&output.stdout)
        .split_whitespace()
        .map(str::to_string)
        .collect())
}

const fn default_history_length() -> usize {
    35
}

fn default_protocol() -> String {
    "ICMP".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(text: &str) -> Result<Config, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(text).expect("valid test YAML");
        Config::from_raw(raw, &[])
    }

    #[test]
    fn port_range_expands_to_one_probe_per_port() {
        let cfg = parse(
            "hosts:\n  - \"10.0.0.1\":\n      tests:\n        - protocol: TCP\n          port: \"8000-8002\"\n",
        )
        .expect("range config must load");
        assert_eq!(cfg.endpoints.len(), 1);
        let probes = &cfg.endpoints[0].probes;
        assert_eq!(probes.len(), 3);
        let ports: Vec<u16> = probes.iter().filter_map(|p| p.port).collect();
        assert_eq!(ports, vec![8000, 8001, 8002]);
        assert!(probes.iter().all(|p| p.protocol == Protocol::Tcp));
    }

    #[test]
    fn host_without_tests_gets_single_icmp_probe() {
        let cfg = parse("hosts:\n  - \"10.0.0.1\":\n      description: gateway\n")
            .expect("minimal config must load");
        assert_eq!(cfg.history_length, 35);
        let endpoint = &cfg.endpoints[0];
        assert_eq!(endpoint.description, "gateway");
        assert_eq!(endpoint.probes.len(), 1);
        assert_eq!(endpoint.probes[0].protocol, Protocol::Icmp);
        assert_eq!(endpoint.probes[0].port, None);
    }

    #[test]
    fn description_defaults_to_ip() {
        let cfg = parse("hosts:\n  - \"10.0.0.7\": {}\n").expect("config must load");
        assert_eq!(cfg.endpoints[0].description, "10.0.0.7");
    }

    #[test]
    fn invalid_ipv4_is_fatal() {
        let err = parse("hosts:\n  - \"not-an-ip\": {}\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("not-an-ip"));
    }

    #[test]
    fn tcp_test_requires_port() {
        let err = parse("hosts:\n  - \"10.0.0.1\":\n      tests:\n        - protocol: TCP\n")
            .unwrap_err();
        assert!(err.to_string().contains("must specify a port"));
    }

    #[test]
    fn malformed_port_specs_are_fatal() {
        for port in ["\"80a-90\"", "\"100-90\"", "0", "\"9000-\""] {
            let text = format!(
                "hosts:\n  - \"10.0.0.1\":\n      tests:\n        - protocol: TCP\n          port: {port}\n"
            );
            assert!(parse(&text).is_err(), "port spec {port} must be rejected");
        }
    }

    #[test]
    fn quoted_single_port_is_accepted() {
        let cfg = parse(
            "hosts:\n  - \"10.0.0.1\":\n      tests:\n        - protocol: TCP\n          port: \"443\"\n",
        )
        .expect("quoted port must load");
        assert_eq!(cfg.endpoints[0].probes[0].port, Some(443));
    }

    #[test]
    fn unknown_protocol_is_fatal() {
        let err = parse("hosts:\n  - \"10.0.0.1\":\n      tests:\n        - protocol: UDP\n")
            .unwrap_err();
        assert!(err.to_string().contains("unsupported protocol"));
    }

    #[test]
    fn missing_hosts_key_fails_to_parse() {
        assert!(serde_yaml::from_str::<RawConfig>("ignore_self: true\n").is_err());
    }

    #[test]
    fn ignore_self_skips_own_addresses() {
        let raw: RawConfig = serde_yaml::from_str(
            "ignore_self: true\nhosts:\n  - \"10.0.0.1\": {}\n  - \"10.0.0.2\": {}\n",
        )
        .expect("valid test YAML");
        let cfg = Config::from_raw(raw, &["10.0.0.1".to_string()]).expect("config must load");
        assert_eq!(cfg.endpoints.len(), 1);
        assert_eq!(cfg.endpoints[0].ip, "10.0.0.2".parse::<Ipv4Addr>().unwrap());
    }

    #[test]
    fn zero_history_length_is_fatal() {
        let err = parse("history_length: 0\nhosts:\n  - \"10.0.0.1\": {}\n").unwrap_err();
        assert!(err.to_string().contains("history_length"));
    }

    #[test]
    fn load_from_file_reads_and_validates() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "history_length: 5\nhosts:\n  - \"127.0.0.1\": {{}}\n").expect("write");
        let cfg = Config::load_from_file(file.path()).expect("file config must load");
        assert_eq!(cfg.history_length, 5);
        assert_eq!(cfg.endpoints.len(), 1);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = Config::load_from_file("/nonexistent/multiping.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn example_config_parses() {
        let raw: RawConfig =
            serde_yaml::from_str(Config::example_yaml()).expect("example must parse");
        let cfg = Config::from_raw(raw, &[]).expect("example must validate");
        assert!(!cfg.endpoints.is_empty());
    }
}
