// src/tuple.rs

//! Minimal tuple model shared by buffers and operators.
//!
//! Tuples travel through buffers as owned `Vec<Datum>` values; only their
//! byte footprint matters to the buffer protocol, which is what
//! [`tuple_byte_count`] computes.

use std::fmt;

use serde::Deserialize;

/// Attribute type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Boolean,
    Int64,
    Char,
    Varbinary,
}

impl DataType {
    /// Integral native types (the ones a mock producer can synthesize).
    pub fn is_integral(self) -> bool {
        matches!(self, DataType::Boolean | DataType::Int64)
    }

    /// Marshalled width in bytes, or `None` for variable-width types.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            DataType::Boolean | DataType::Char => Some(1),
            DataType::Int64 => Some(8),
            DataType::Varbinary => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub data_type: DataType,
    pub nullable: bool,
}

impl AttributeDescriptor {
    pub fn new(data_type: DataType, nullable: bool) -> Self {
        Self {
            data_type,
            nullable,
        }
    }

    pub fn int64() -> Self {
        Self::new(DataType::Int64, false)
    }

    pub fn nullable_int64() -> Self {
        Self::new(DataType::Int64, true)
    }
}

/// Ordered list of attribute descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TupleDescriptor {
    attrs: Vec<AttributeDescriptor>,
}

impl TupleDescriptor {
    pub fn new(attrs: Vec<AttributeDescriptor>) -> Self {
        Self { attrs }
    }

    /// `n` non-nullable `Int64` columns.
    pub fn int64s(n: usize) -> Self {
        Self::new(vec![AttributeDescriptor::int64(); n])
    }

    pub fn push(&mut self, attr: AttributeDescriptor) {
        self.attrs.push(attr);
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attrs.iter()
    }

    pub fn attr(&self, i: usize) -> Option<&AttributeDescriptor> {
        self.attrs.get(i)
    }

    /// Width of every tuple with this shape, if all attributes are fixed width.
    pub fn fixed_byte_count(&self) -> Option<usize> {
        self.attrs
            .iter()
            .map(|a| a.data_type.fixed_width())
            .sum::<Option<usize>>()
    }

    /// Descriptor made of the projected attributes.
    pub fn project(&self, proj: &[usize]) -> Option<TupleDescriptor> {
        proj.iter()
            .map(|&i| self.attrs.get(i).copied())
            .collect::<Option<Vec<_>>>()
            .map(TupleDescriptor::new)
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Datum {
    Null,
    Bool(bool),
    Int(i64),
    Char(u8),
    Bytes(Vec<u8>),
}

impl Datum {
    pub fn byte_count(&self) -> usize {
        match self {
            Datum::Null => 0,
            Datum::Bool(_) | Datum::Char(_) => 1,
            Datum::Int(_) => 8,
            // length prefix + payload
            Datum::Bytes(b) => 2 + b.len(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Datum::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Datum::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Zero value of the given type, as produced by a lean mock producer.
    pub fn zero(data_type: DataType) -> Datum {
        match data_type {
            DataType::Boolean => Datum::Bool(false),
            DataType::Int64 => Datum::Int(0),
            DataType::Char => Datum::Char(0),
            DataType::Varbinary => Datum::Bytes(Vec::new()),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "NULL"),
            Datum::Bool(b) => write!(f, "{b}"),
            Datum::Int(v) => write!(f, "{v}"),
            Datum::Char(c) => write!(f, "{}", *c as char),
            Datum::Bytes(bytes) => {
                write!(f, "0x")?;
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

pub type Tuple = Vec<Datum>;

/// Bytes a tuple occupies in a buffer.
pub fn tuple_byte_count(tuple: &[Datum]) -> usize {
    tuple.iter().map(Datum::byte_count).sum()
}

/// Comma-separated rendering used by the CLI.
pub fn format_tuple(tuple: &[Datum]) -> String {
    tuple
        .iter()
        .map(Datum::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience constructor for all-integer tuples.
pub fn int_tuple(values: &[i64]) -> Tuple {
    values.iter().map(|&v| Datum::Int(v)).collect()
}
