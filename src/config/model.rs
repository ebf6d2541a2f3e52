// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::buffer::DEFAULT_BUFFER_CAPACITY;
use crate::operators::barrier::BarrierMode;
use crate::operators::generators::{
    ColumnGenerator, ConstColumnGenerator, RepeatingSeqColumnGenerator, SeqColumnGenerator,
};
use crate::types::SortOrder;

/// Graph description exactly as read from TOML, before validation.
///
/// ```toml
/// [scheduler]
/// quantum = 64
/// buffer_capacity = 4096
///
/// [stream.numbers]
/// kind = "mock_producer"
/// rows = 100
/// columns = ["ramp", "repeat:5"]
///
/// [stream.sorted]
/// kind = "sort"
/// inputs = ["numbers"]
/// keys = [1, 0]
/// order = ["desc", "asc"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    /// Streams from `[stream.<name>]`, keyed by stream name.
    #[serde(default)]
    pub stream: BTreeMap<String, StreamConfig>,
}

/// A validated graph description. Only obtainable through
/// `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub scheduler: SchedulerSection,
    pub stream: BTreeMap<String, StreamConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        scheduler: SchedulerSection,
        stream: BTreeMap<String, StreamConfig>,
    ) -> Self {
        Self { scheduler, stream }
    }

    /// Names of the streams that read from `name`, in name order.
    pub fn consumers_of(&self, name: &str) -> Vec<&str> {
        self.stream
            .iter()
            .filter(|(_, s)| s.inputs.iter().any(|i| i == name))
            .map(|(n, _)| n.as_str())
            .collect()
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Maximum tuples per invocation. Unlimited when omitted.
    #[serde(default)]
    pub quantum: Option<u32>,

    /// Capacity in bytes of every edge buffer.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

fn default_buffer_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            quantum: None,
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

/// `[stream.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Producers feeding this stream, in input order.
    #[serde(default)]
    pub inputs: Vec<String>,

    #[serde(flatten)]
    pub kind: StreamKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamKind {
    MockProducer {
        rows: u64,
        columns: Vec<ColumnSpec>,
        /// Emit zero rows in bulk instead of generated values.
        #[serde(default)]
        lean: bool,
        #[serde(default)]
        echo: bool,
    },
    Values {
        rows: Vec<Vec<i64>>,
    },
    Splitter,
    Merge,
    Barrier {
        #[serde(default)]
        mode: BarrierMode,
        #[serde(default)]
        check_row_counts: bool,
    },
    Sort {
        keys: Vec<usize>,
        #[serde(default)]
        order: Vec<SortOrder>,
        #[serde(default)]
        discard_duplicates: bool,
    },
}

/// Number of inputs a kind accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    None,
    One,
    AtLeastOne,
}

impl StreamKind {
    pub fn name(&self) -> &'static str {
        match self {
            StreamKind::MockProducer { .. } => "mock_producer",
            StreamKind::Values { .. } => "values",
            StreamKind::Splitter => "splitter",
            StreamKind::Merge => "merge",
            StreamKind::Barrier { .. } => "barrier",
            StreamKind::Sort { .. } => "sort",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            StreamKind::MockProducer { .. } | StreamKind::Values { .. } => Arity::None,
            StreamKind::Splitter | StreamKind::Sort { .. } => Arity::One,
            StreamKind::Merge | StreamKind::Barrier { .. } => Arity::AtLeastOne,
        }
    }

    pub fn fans_out(&self) -> bool {
        matches!(self, StreamKind::Splitter)
    }
}

/// Column generator spec: `ramp`, `seq:<start>:<step>`, `repeat:<n>` or
/// `const:<v>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ColumnSpec {
    Ramp,
    Seq { start: i64, step: i64 },
    Repeat(i64),
    Const(i64),
}

impl ColumnSpec {
    pub fn generator(&self) -> Box<dyn ColumnGenerator> {
        match *self {
            ColumnSpec::Ramp => Box::new(SeqColumnGenerator::new(0, 1)),
            ColumnSpec::Seq { start, step } => Box::new(SeqColumnGenerator::new(start, step)),
            ColumnSpec::Repeat(n) => Box::new(RepeatingSeqColumnGenerator::new(n)),
            ColumnSpec::Const(v) => Box::new(ConstColumnGenerator::new(v)),
        }
    }
}

fn parse_int(s: &str, spec: &str) -> Result<i64, String> {
    s.trim()
        .parse()
        .map_err(|_| format!("invalid number '{s}' in column spec '{spec}'"))
}

impl FromStr for ColumnSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        match parts.as_slice() {
            ["ramp"] => Ok(ColumnSpec::Ramp),
            ["seq", start, step] => Ok(ColumnSpec::Seq {
                start: parse_int(start, s)?,
                step: parse_int(step, s)?,
            }),
            ["repeat", n] => {
                let n = parse_int(n, s)?;
                if n < 1 {
                    return Err(format!("repeat count must be >= 1 in '{s}'"));
                }
                Ok(ColumnSpec::Repeat(n))
            }
            ["const", v] => Ok(ColumnSpec::Const(parse_int(v, s)?)),
            _ => Err(format!(
                "unknown column spec '{s}' (expected ramp, seq:<start>:<step>, repeat:<n> or const:<v>)"
            )),
        }
    }
}

impl TryFrom<String> for ColumnSpec {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSpec::Ramp => write!(f, "ramp"),
            ColumnSpec::Seq { start, step } => write!(f, "seq:{start}:{step}"),
            ColumnSpec::Repeat(n) => write!(f, "repeat:{n}"),
            ColumnSpec::Const(v) => write!(f, "const:{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_specs_parse() {
        assert_eq!("ramp".parse::<ColumnSpec>(), Ok(ColumnSpec::Ramp));
        assert_eq!(
            "seq:5:-1".parse::<ColumnSpec>(),
            Ok(ColumnSpec::Seq { start: 5, step: -1 })
        );
        assert_eq!("repeat:9".parse::<ColumnSpec>(), Ok(ColumnSpec::Repeat(9)));
        assert_eq!("const:3".parse::<ColumnSpec>(), Ok(ColumnSpec::Const(3)));
        assert!("repeat:0".parse::<ColumnSpec>().is_err());
        assert!("zigzag".parse::<ColumnSpec>().is_err());
    }

    #[test]
    fn stream_sections_deserialize_by_kind() {
        let raw: RawConfigFile = toml::from_str(
            r#"
            [stream.src]
            kind = "mock_producer"
            rows = 10
            columns = ["ramp", "repeat:3"]

            [stream.sorted]
            kind = "sort"
            inputs = ["src"]
            keys = [1]
            order = ["desc"]
            "#,
        )
        .unwrap();

        assert_eq!(raw.scheduler.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
        assert!(raw.scheduler.quantum.is_none());
        match &raw.stream["src"].kind {
            StreamKind::MockProducer { rows, columns, lean, .. } => {
                assert_eq!(*rows, 10);
                assert_eq!(columns, &vec![ColumnSpec::Ramp, ColumnSpec::Repeat(3)]);
                assert!(!lean);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        let sorted = &raw.stream["sorted"];
        assert_eq!(sorted.inputs, vec!["src".to_string()]);
        assert_eq!(sorted.kind.arity(), Arity::One);
    }
}
