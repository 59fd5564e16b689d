//! Configuration file loading.
//!
//! The on-disk format is a line-oriented ASCII directive file; lines may
//! appear in any order and blank lines are ignored. This module is the
//! external collaborator the core consumes through a validated
//! [`RouterConfig`] — parsing lives here so the daemon still has a real
//! config loader, but nothing downstream depends on the file format.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// A configured neighbour: the port we send to, the direct metric to
/// reach it, and its router-id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborConfig {
    pub output_port: u16,
    pub metric: u8,
    pub neighbor_id: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub period: u64,
    pub timeout: u64,
    pub garbage: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            period: 30,
            timeout: 180,
            garbage: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    pub router_id: u16,
    pub input_ports: Vec<u16>,
    pub outputs: Vec<NeighborConfig>,
    pub timers: TimerConfig,
}

/// Read and parse a config file from disk.
pub fn load(path: &Path) -> Result<RouterConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content)
}

/// Parse directive text already read into memory.
pub fn parse(content: &str) -> Result<RouterConfig, ConfigError> {
    let mut router_id = None;
    let mut input_ports = None;
    let mut outputs = None;
    let mut timers = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.splitn(2, char::is_whitespace);
        let keyword = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("").trim();

        match keyword {
            "router-id" => {
                if router_id.is_some() {
                    return Err(ConfigError::DuplicateDirective("router-id"));
                }
                router_id = Some(parse_router_id(rest)?);
            }
            "input-ports" => {
                if input_ports.is_some() {
                    return Err(ConfigError::DuplicateDirective("input-ports"));
                }
                input_ports = Some(parse_input_ports(rest)?);
            }
            "outputs" => {
                if outputs.is_some() {
                    return Err(ConfigError::DuplicateDirective("outputs"));
                }
                outputs = Some(parse_outputs(rest)?);
            }
            "timers" => {
                if timers.is_some() {
                    return Err(ConfigError::DuplicateDirective("timers"));
                }
                timers = Some(parse_timers(rest)?);
            }
            other => return Err(ConfigError::UnknownDirective(other.to_string())),
        }
    }

    let router_id = router_id.ok_or(ConfigError::MissingDirective("router-id"))?;
    let input_ports = input_ports.ok_or(ConfigError::MissingDirective("input-ports"))?;
    let outputs = outputs.ok_or(ConfigError::MissingDirective("outputs"))?;
    let timers = timers.unwrap_or_default();

    for neighbor in &outputs {
        if input_ports.contains(&neighbor.output_port) {
            return Err(ConfigError::OutputInputOverlap(neighbor.output_port));
        }
    }

    Ok(RouterConfig {
        router_id,
        input_ports,
        outputs,
        timers,
    })
}

fn parse_router_id(rest: &str) -> Result<u16, ConfigError> {
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    if tokens.len() != 1 {
        return Err(ConfigError::InvalidRouterId(rest.to_string()));
    }
    let value: u32 = tokens[0]
        .parse()
        .map_err(|_| ConfigError::InvalidRouterId(tokens[0].to_string()))?;
    if !(1..=64000).contains(&value) {
        return Err(ConfigError::InvalidRouterId(tokens[0].to_string()));
    }
    Ok(value as u16)
}

fn csv_items(rest: &str) -> Vec<&str> {
    rest.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

fn parse_input_ports(rest: &str) -> Result<Vec<u16>, ConfigError> {
    let items = csv_items(rest);
    if items.is_empty() {
        return Err(ConfigError::EmptyInputPorts);
    }

    let mut seen = HashSet::new();
    let mut ports = Vec::with_capacity(items.len());
    for item in items {
        let value: u32 = item
            .parse()
            .map_err(|_| ConfigError::InvalidInputPort(item.to_string()))?;
        if !(1024..=64000).contains(&value) {
            return Err(ConfigError::InvalidInputPort(item.to_string()));
        }
        let port = value as u16;
        if !seen.insert(port) {
            return Err(ConfigError::DuplicateInputPort(port));
        }
        ports.push(port);
    }
    Ok(ports)
}

fn parse_outputs(rest: &str) -> Result<Vec<NeighborConfig>, ConfigError> {
    let items = csv_items(rest);
    if items.is_empty() {
        return Err(ConfigError::EmptyOutputs);
    }

    let mut outputs = Vec::with_capacity(items.len());
    for item in items {
        let fields: Vec<&str> = item.split('-').collect();
        let [port_str, metric_str, neighbor_str]: [&str; 3] = fields
            .try_into()
            .map_err(|_| ConfigError::MalformedOutput(item.to_string()))?;

        let port: u32 = port_str
            .parse()
            .map_err(|_| ConfigError::InvalidOutputPort(port_str.to_string()))?;
        if !(1024..=64000).contains(&port) {
            return Err(ConfigError::InvalidOutputPort(port_str.to_string()));
        }

        let metric: u32 = metric_str
            .parse()
            .map_err(|_| ConfigError::InvalidMetric(metric_str.to_string()))?;
        if !(1..=15).contains(&metric) {
            return Err(ConfigError::InvalidMetric(metric_str.to_string()));
        }

        let neighbor_id: u32 = neighbor_str
            .parse()
            .map_err(|_| ConfigError::InvalidNeighborId(neighbor_str.to_string()))?;
        if !(1..=64000).contains(&neighbor_id) {
            return Err(ConfigError::InvalidNeighborId(neighbor_str.to_string()));
        }

        outputs.push(NeighborConfig {
            output_port: port as u16,
            metric: metric as u8,
            neighbor_id: neighbor_id as u16,
        });
    }
    Ok(outputs)
}

fn parse_timers(rest: &str) -> Result<TimerConfig, ConfigError> {
    let items = csv_items(rest);
    if items.len() != 3 {
        return Err(ConfigError::MalformedTimers(rest.to_string()));
    }

    let parse_one = |s: &str| -> Result<u64, ConfigError> {
        s.parse()
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| ConfigError::InvalidTimerValue(s.to_string()))
    };

    let period = parse_one(items[0])?;
    let timeout = parse_one(items[1])?;
    let garbage = parse_one(items[2])?;

    if timeout != 6 * period || garbage != 4 * period {
        return Err(ConfigError::TimerRatioViolation {
            period,
            timeout,
            garbage,
        });
    }

    Ok(TimerConfig {
        period,
        timeout,
        garbage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> &'static str {
        "router-id 1\n\
         input-ports 6110\n\
         outputs 6111-1-2, 6112-5-3\n\
         timers 5, 30, 20\n"
    }

    #[test]
    fn parses_a_complete_file() {
        let config = parse(sample()).unwrap();
        assert_eq!(config.router_id, 1);
        assert_eq!(config.input_ports, vec![6110]);
        assert_eq!(
            config.outputs,
            vec![
                NeighborConfig {
                    output_port: 6111,
                    metric: 1,
                    neighbor_id: 2
                },
                NeighborConfig {
                    output_port: 6112,
                    metric: 5,
                    neighbor_id: 3
                },
            ]
        );
        assert_eq!(
            config.timers,
            TimerConfig {
                period: 5,
                timeout: 30,
                garbage: 20
            }
        );
    }

    #[test]
    fn directive_order_does_not_matter() {
        let shuffled = "timers 5, 30, 20\noutputs 6111-1-2\ninput-ports 6110\nrouter-id 1\n";
        assert_eq!(parse(shuffled).unwrap(), parse(sample()).unwrap());
    }

    #[test]
    fn defaults_timers_when_absent() {
        let without_timers = "router-id 1\ninput-ports 6110\noutputs 6111-1-2\n";
        let config = parse(without_timers).unwrap();
        assert_eq!(config.timers, TimerConfig::default());
    }

    #[test]
    fn rejects_unknown_directive() {
        let bad = "router-id 1\ninput-ports 6110\noutputs 6111-1-2\nbogus 1\n";
        assert!(matches!(
            parse(bad),
            Err(ConfigError::UnknownDirective(_))
        ));
    }

    #[test]
    fn rejects_missing_directive() {
        let bad = "input-ports 6110\noutputs 6111-1-2\n";
        assert!(matches!(
            parse(bad),
            Err(ConfigError::MissingDirective("router-id"))
        ));
    }

    #[test]
    fn rejects_router_id_out_of_range() {
        let bad = "router-id 70000\ninput-ports 6110\noutputs 6111-1-2\n";
        assert!(matches!(parse(bad), Err(ConfigError::InvalidRouterId(_))));
    }

    #[test]
    fn rejects_duplicate_input_port() {
        let bad = "router-id 1\ninput-ports 6110, 6110\noutputs 6111-1-2\n";
        assert!(matches!(
            parse(bad),
            Err(ConfigError::DuplicateInputPort(6110))
        ));
    }

    #[test]
    fn rejects_output_input_overlap() {
        let bad = "router-id 1\ninput-ports 6110\noutputs 6110-1-2\n";
        assert!(matches!(
            parse(bad),
            Err(ConfigError::OutputInputOverlap(6110))
        ));
    }

    #[test]
    fn rejects_timer_ratio_violation() {
        let bad = "router-id 1\ninput-ports 6110\noutputs 6111-1-2\ntimers 5, 31, 20\n";
        assert!(matches!(
            parse(bad),
            Err(ConfigError::TimerRatioViolation { .. })
        ));
    }

    #[test]
    fn rejects_metric_out_of_range() {
        let bad = "router-id 1\ninput-ports 6110\noutputs 6111-16-2\n";
        assert!(matches!(parse(bad), Err(ConfigError::InvalidMetric(_))));
    }

    #[test]
    fn load_reads_a_config_file_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("router.conf");
        std::fs::write(&path, sample()).expect("write config");

        let config = load(&path).unwrap();
        assert_eq!(config.router_id, 1);
        assert_eq!(config.input_ports, vec![6110]);
    }

    #[test]
    fn load_reports_io_error_for_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.conf");
        assert!(matches!(load(&path), Err(ConfigError::Io { .. })));
    }
}
