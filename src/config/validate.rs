// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{Arity, ConfigFile, RawConfigFile, StreamKind};
use crate::errors::{ExecStreamError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ExecStreamError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.scheduler, raw.stream))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_streams(cfg)?;
    validate_scheduler_section(cfg)?;
    validate_stream_inputs(cfg)?;
    validate_stream_shapes(cfg)?;
    validate_fan_out(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_streams(cfg: &RawConfigFile) -> Result<()> {
    if cfg.stream.is_empty() {
        return Err(ExecStreamError::ConfigError(
            "config must contain at least one [stream.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_scheduler_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.scheduler.quantum == Some(0) {
        return Err(ExecStreamError::ConfigError(
            "[scheduler].quantum must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.scheduler.buffer_capacity == 0 {
        return Err(ExecStreamError::ConfigError(
            "[scheduler].buffer_capacity must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_stream_inputs(cfg: &RawConfigFile) -> Result<()> {
    for (name, stream) in cfg.stream.iter() {
        for input in stream.inputs.iter() {
            if input == name {
                return Err(ExecStreamError::ConfigError(format!(
                    "stream '{name}' cannot read from itself"
                )));
            }
            if !cfg.stream.contains_key(input) {
                return Err(ExecStreamError::ConfigError(format!(
                    "stream '{name}' has unknown input '{input}'"
                )));
            }
        }
        let arity_ok = match stream.kind.arity() {
            Arity::None => stream.inputs.is_empty(),
            Arity::One => stream.inputs.len() == 1,
            Arity::AtLeastOne => !stream.inputs.is_empty(),
        };
        if !arity_ok {
            return Err(ExecStreamError::ConfigError(format!(
                "stream '{name}' of kind {} cannot take {} input(s)",
                stream.kind.name(),
                stream.inputs.len()
            )));
        }
    }
    Ok(())
}

fn validate_stream_shapes(cfg: &RawConfigFile) -> Result<()> {
    for (name, stream) in cfg.stream.iter() {
        match &stream.kind {
            StreamKind::MockProducer { columns, .. } if columns.is_empty() => {
                return Err(ExecStreamError::ConfigError(format!(
                    "mock producer '{name}' needs at least one column"
                )));
            }
            StreamKind::Values { rows } => {
                let width = rows.first().map_or(0, Vec::len);
                if width == 0 || rows.iter().any(|r| r.len() != width) {
                    return Err(ExecStreamError::ConfigError(format!(
                        "values stream '{name}' needs non-empty rows of equal width"
                    )));
                }
            }
            StreamKind::Sort { keys, order, .. } if keys.is_empty() || order.len() > keys.len() => {
                return Err(ExecStreamError::ConfigError(format!(
                    "sort '{name}' needs keys and at most one order per key"
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_fan_out(cfg: &RawConfigFile) -> Result<()> {
    for (name, stream) in cfg.stream.iter() {
        let consumers = cfg
            .stream
            .values()
            .flat_map(|s| s.inputs.iter())
            .filter(|i| *i == name)
            .count();
        if consumers > 1 && !stream.kind.fans_out() {
            return Err(ExecStreamError::ConfigError(format!(
                "stream '{name}' feeds {consumers} streams; put a splitter in between"
            )));
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: input -> stream.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.stream.keys() {
        graph.add_node(name.as_str());
    }

    for (name, stream) in cfg.stream.iter() {
        for input in stream.inputs.iter() {
            graph.add_edge(input.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(ExecStreamError::GraphCycle(format!(
            "cycle detected in stream graph involving stream '{}'",
            cycle.node_id()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(toml_str)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn rejects_empty_config() {
        let err = parse("").unwrap_err();
        assert!(matches!(err, ExecStreamError::ConfigError(_)));
    }

    #[test]
    fn rejects_wrong_arity() {
        let err = parse(
            r#"
            [stream.a]
            kind = "values"
            rows = [[1]]

            [stream.b]
            kind = "values"
            inputs = ["a"]
            rows = [[2]]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot take 1 input"), "{err}");
    }

    #[test]
    fn only_splitters_fan_out() {
        let err = parse(
            r#"
            [stream.a]
            kind = "values"
            rows = [[1]]

            [stream.s1]
            kind = "sort"
            inputs = ["a"]
            keys = [0]

            [stream.s2]
            kind = "sort"
            inputs = ["a"]
            keys = [0]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("splitter"), "{err}");
    }

    #[test]
    fn rejects_zero_quantum() {
        let err = parse(
            r#"
            [scheduler]
            quantum = 0

            [stream.a]
            kind = "values"
            rows = [[1]]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("quantum"), "{err}");
    }

    #[test]
    fn detects_cycles() {
        let err = parse(
            r#"
            [stream.a]
            kind = "sort"
            inputs = ["b"]
            keys = [0]

            [stream.b]
            kind = "sort"
            inputs = ["a"]
            keys = [0]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ExecStreamError::GraphCycle(_)), "{err}");
    }
}
