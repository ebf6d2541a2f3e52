// src/operators/bitmap.rs

//! Rid bitmaps and the in-memory bitmap index.
//!
//! An entry covers a segment of rids starting at a multiple of 8; bit `b` of
//! byte `i` stands for rid `start + 8 * i + b`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::tuple::{AttributeDescriptor, DataType, Datum, Tuple, TupleDescriptor};

pub type SharedBitmapIndex = Arc<Mutex<BitmapIndex>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapEntry {
    pub keys: Vec<Datum>,
    pub start_rid: u64,
    pub bits: Vec<u8>,
}

impl BitmapEntry {
    /// Entry holding the single rid `rid`.
    pub fn singleton(keys: Vec<Datum>, rid: u64) -> Self {
        Self {
            keys,
            start_rid: rid & !7,
            bits: vec![1 << (rid & 7)],
        }
    }

    pub fn rids(&self) -> impl Iterator<Item = u64> + '_ {
        self.bits.iter().enumerate().flat_map(move |(i, byte)| {
            (0..8)
                .filter(move |b| byte & (1 << b) != 0)
                .map(move |b| self.start_rid + 8 * i as u64 + b)
        })
    }

    /// OR another bitmap for the same segment into this one.
    pub fn merge_bits(&mut self, bits: &[u8]) {
        if self.bits.len() < bits.len() {
            self.bits.resize(bits.len(), 0);
        }
        for (dst, src) in self.bits.iter_mut().zip(bits) {
            *dst |= src;
        }
    }

    /// `(keys..., start_rid, bitmap)`
    pub fn to_tuple(&self) -> Tuple {
        let mut tuple = self.keys.clone();
        tuple.push(Datum::Int(self.start_rid as i64));
        tuple.push(Datum::Bytes(self.bits.clone()));
        tuple
    }

    pub fn from_tuple(mut tuple: Tuple) -> Option<Self> {
        let bits = tuple.pop()?.as_bytes()?.to_vec();
        let start_rid = u64::try_from(tuple.pop()?.as_int()?).ok()?;
        Some(Self {
            keys: tuple,
            start_rid,
            bits,
        })
    }
}

/// Entries ordered by `(keys, start_rid)`.
#[derive(Debug, Clone)]
pub struct BitmapIndex {
    key_desc: TupleDescriptor,
    entries: BTreeMap<(Vec<Datum>, u64), Vec<u8>>,
}

impl BitmapIndex {
    pub fn new(key_desc: TupleDescriptor) -> Self {
        Self {
            key_desc,
            entries: BTreeMap::new(),
        }
    }

    pub fn shared(self) -> SharedBitmapIndex {
        Arc::new(Mutex::new(self))
    }

    pub fn key_count(&self) -> usize {
        self.key_desc.len()
    }

    /// Shape of an entry tuple: the keys, then start rid and bitmap.
    pub fn entry_desc(&self) -> TupleDescriptor {
        let mut desc = self.key_desc.clone();
        desc.push(AttributeDescriptor::int64());
        desc.push(AttributeDescriptor::new(DataType::Varbinary, false));
        desc
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an entry, ORing it into an existing one for the same segment.
    pub fn splice(&mut self, entry: BitmapEntry) {
        let BitmapEntry {
            keys,
            start_rid,
            bits,
        } = entry;
        let slot = self.entries.entry((keys, start_rid)).or_default();
        if slot.len() < bits.len() {
            slot.resize(bits.len(), 0);
        }
        for (dst, src) in slot.iter_mut().zip(&bits) {
            *dst |= src;
        }
    }

    /// Entries whose leading keys equal `prefix`, in key order.
    pub fn search(&self, prefix: &[Datum]) -> Vec<BitmapEntry> {
        self.entries
            .range((prefix.to_vec(), 0)..)
            .take_while(|((keys, _), _)| keys.starts_with(prefix))
            .map(|((keys, start_rid), bits)| BitmapEntry {
                keys: keys.clone(),
                start_rid: *start_rid,
                bits: bits.clone(),
            })
            .collect()
    }
}
